//! Provider sync pipeline.
//!
//! Drives one on-demand sync for a user and provider: resolve the provider,
//! load the stored credential, record a sync run, then walk the provider's
//! courses and their items, upserting rows keyed by external id. A failing
//! course-list fetch fails the whole run; a failing per-course item fetch
//! only skips that course's items; a failing row write only skips the
//! counter.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, Set};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::crypto::CryptoKey;
use crate::error::{ApiError, not_found, sync_failed};
use crate::models::{course, item};
use crate::providers::{ProviderCredentials, Registry, RegistryError, RemoteCourse};
use crate::repositories::{
    CourseRepository, IntegrationRepository, IntegrationSecretRepository, ItemRepository,
    ProfileRepository, SyncCounters, SyncRunRepository,
};

/// Errors surfaced by the sync pipeline
#[derive(Debug, Error)]
pub enum SyncError {
    /// No integration row for this user and provider
    #[error("{0} integration not found")]
    IntegrationNotFound(String),
    /// Integration exists but holds no access token
    #[error("{0} access token not found")]
    CredentialsNotFound(String),
    /// Unknown provider slug
    #[error(transparent)]
    UnknownProvider(#[from] RegistryError),
    /// The course list fetch failed; the run has been marked failed
    #[error("Failed to sync {provider} data: {message}")]
    ProviderFailed { provider: String, message: String },
    /// A database operation outside the per-row upserts failed
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::IntegrationNotFound(provider) => not_found(&format!(
                "{} integration not found. Please connect {} first.",
                provider, provider
            )),
            SyncError::CredentialsNotFound(provider) => {
                not_found(&format!("{} access token not found", provider))
            }
            SyncError::UnknownProvider(err) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                &err.to_string(),
            ),
            SyncError::ProviderFailed { provider, message } => sync_failed(&provider, &message),
            SyncError::Database(err) => err.into(),
        }
    }
}

/// Status for synced and manually created items, decided at write time
/// against the given clock and never re-validated later.
pub fn status_for_due_at(due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> &'static str {
    match due_at {
        Some(due) if due < now => "overdue",
        Some(_) => "pending",
        None => "no_due_date",
    }
}

/// Runs one provider sync for a user, returning the row counters.
#[instrument(skip(db, crypto_key), fields(provider = %provider_slug, user_id = %user_id))]
pub async fn run_provider_sync(
    db: &Arc<DatabaseConnection>,
    crypto_key: &CryptoKey,
    user_id: &Uuid,
    provider_slug: &str,
) -> Result<SyncCounters, SyncError> {
    let provider = Registry::get_provider(provider_slug)?;
    let display = provider.display_name();

    let integrations = IntegrationRepository::new(db.clone());
    let secrets = IntegrationSecretRepository::new(db.clone(), crypto_key.clone());
    let profiles = ProfileRepository::new(db.clone());
    let courses = CourseRepository::new(db.clone());
    let items = ItemRepository::new(db.clone());
    let runs = SyncRunRepository::new(db.clone());

    let integration = integrations
        .find_by_owner_and_provider(user_id, provider_slug)
        .await?
        .ok_or_else(|| SyncError::IntegrationNotFound(display.to_string()))?;

    let access_token = secrets
        .get_secret(&integration.id, "access_token")
        .await?
        .ok_or_else(|| SyncError::CredentialsNotFound(display.to_string()))?;

    // Users on a self-hosted instance store its URL next to the token
    let base_url_key = format!("{}_url", provider_slug);
    let base_url = secrets
        .get_secret(&integration.id, &base_url_key)
        .await?
        .unwrap_or_else(|| provider.default_base_url().to_string());

    profiles.ensure_exists(user_id).await?;

    let run = runs
        .create_running(user_id, &integration.id, provider_slug)
        .await?;

    let credentials = ProviderCredentials {
        base_url,
        access_token,
    };
    let metric_labels = vec![("provider", provider_slug.to_string())];
    let started = Instant::now();

    let remote_courses = match provider.fetch_courses(&credentials).await {
        Ok(remote_courses) => remote_courses,
        Err(err) => {
            let message = err.to_string();
            runs.mark_failed(&run.id, &message).await?;
            counter!("sync_runs_failed_total", &metric_labels).increment(1);
            return Err(SyncError::ProviderFailed {
                provider: display.to_string(),
                message,
            });
        }
    };

    info!(count = remote_courses.len(), "Fetched provider courses");

    let mut counters = SyncCounters::default();

    for remote_course in &remote_courses {
        let course_link = upsert_course(
            &courses,
            user_id,
            provider_slug,
            remote_course,
            &mut counters,
        )
        .await?;

        let remote_items = match provider.fetch_course_items(&credentials, remote_course).await {
            Ok(remote_items) => remote_items,
            Err(err) => {
                warn!(
                    course = %remote_course.external_id,
                    error = %err,
                    "Item fetch failed, skipping this course's items"
                );
                continue;
            }
        };

        let now = Utc::now();

        for remote_item in &remote_items {
            let status = status_for_due_at(remote_item.due_at, now);

            let existing = items
                .find_by_external_id(user_id, &remote_item.external_id)
                .await?;

            match existing {
                Some(current) => {
                    let update = item::ActiveModel {
                        title: Set(remote_item.title.clone()),
                        description: Set(remote_item.description.clone()),
                        item_type: Set(remote_item.item_type.clone()),
                        status: Set(status.to_string()),
                        due_at: Set(remote_item.due_at.map(Into::into)),
                        points_possible: Set(remote_item.points_possible),
                        external_url: Set(remote_item.external_url.clone()),
                        metadata: Set(Some(remote_item.metadata.clone())),
                        ..Default::default()
                    };
                    match items.update_by_id(user_id, &current.id, update).await {
                        Ok(_) => counters.items_updated += 1,
                        Err(err) => warn!(error = %err, "Failed to update synced item"),
                    }
                }
                None => {
                    let active = item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        owner_id: Set(*user_id),
                        course_id: Set(course_link),
                        title: Set(remote_item.title.clone()),
                        description: Set(remote_item.description.clone()),
                        item_type: Set(remote_item.item_type.clone()),
                        status: Set(status.to_string()),
                        due_at: Set(remote_item.due_at.map(Into::into)),
                        points_possible: Set(remote_item.points_possible),
                        external_id: Set(Some(remote_item.external_id.clone())),
                        external_source: Set(Some(provider_slug.to_string())),
                        external_url: Set(remote_item.external_url.clone()),
                        metadata: Set(Some(remote_item.metadata.clone())),
                        ..Default::default()
                    };
                    match items.create(active).await {
                        Ok(_) => counters.items_created += 1,
                        Err(err) => warn!(error = %err, "Failed to insert synced item"),
                    }
                }
            }
        }
    }

    runs.mark_completed(&run.id, &counters).await?;

    histogram!("sync_duration_seconds", &metric_labels).record(started.elapsed().as_secs_f64());
    counter!("sync_items_created_total", &metric_labels).increment(counters.items_created as u64);
    counter!("sync_items_updated_total", &metric_labels).increment(counters.items_updated as u64);

    info!(
        items_created = counters.items_created,
        items_updated = counters.items_updated,
        courses_created = counters.courses_created,
        courses_updated = counters.courses_updated,
        "Provider sync completed"
    );

    Ok(counters)
}

/// Upserts one remote course, returning its row id for item linkage.
///
/// A row write failure is logged and skips the counter; the sync then
/// carries on with the course's items unlinked.
async fn upsert_course(
    courses: &CourseRepository,
    user_id: &Uuid,
    provider_slug: &str,
    remote_course: &RemoteCourse,
    counters: &mut SyncCounters,
) -> Result<Option<Uuid>, SyncError> {
    let existing = courses
        .find_by_external_id(user_id, &remote_course.external_id)
        .await?;

    match existing {
        Some(current) => {
            let update = course::ActiveModel {
                title: Set(remote_course.title.clone()),
                code: Set(remote_course.code.clone()),
                term: Set(remote_course.term.clone()),
                external_url: Set(remote_course.external_url.clone()),
                metadata: Set(Some(remote_course.metadata.clone())),
                ..Default::default()
            };
            match courses.update_by_id(user_id, &current.id, update).await {
                Ok(updated) => {
                    counters.courses_updated += 1;
                    Ok(Some(updated.id))
                }
                Err(err) => {
                    warn!(error = %err, "Failed to update synced course");
                    Ok(Some(current.id))
                }
            }
        }
        None => {
            let active = course::ActiveModel {
                id: Set(Uuid::new_v4()),
                owner_id: Set(*user_id),
                title: Set(remote_course.title.clone()),
                code: Set(remote_course.code.clone()),
                term: Set(remote_course.term.clone()),
                external_id: Set(Some(remote_course.external_id.clone())),
                external_source: Set(Some(provider_slug.to_string())),
                external_url: Set(remote_course.external_url.clone()),
                metadata: Set(Some(remote_course.metadata.clone())),
                ..Default::default()
            };
            match courses.create(active).await {
                Ok(created) => {
                    counters.courses_created += 1;
                    Ok(Some(created.id))
                }
                Err(err) => {
                    warn!(error = %err, "Failed to insert synced course");
                    Ok(None)
                }
            }
        }
    }
}
