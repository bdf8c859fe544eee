//! ICS calendar import pipeline.
//!
//! Parses uploaded or fetched calendar content, classifies each VEVENT, and
//! inserts non-duplicate events as items under a synthetic import course.
//! Duplicates are recognized by calendar UID against items already imported
//! into the same course, so importing the same file twice creates nothing.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{course, item, source};
use crate::repositories::{CourseRepository, ItemRepository, ProfileRepository, SourceRepository};

pub mod classify;
pub mod parser;

pub use classify::classify_event;
pub use parser::{IcsEvent, IcsParseError, parse_calendar, parse_ics_datetime};

/// Course code stamped on the synthetic import course
const IMPORT_COURSE_CODE: &str = "ICS";
/// Term label stamped on the synthetic import course
const IMPORT_COURSE_TERM: &str = "ICS Import";

/// Errors surfaced by the calendar import pipeline
#[derive(Debug, Error)]
pub enum ImportError {
    /// The content did not parse as a calendar
    #[error("Invalid ICS file format")]
    InvalidFormat(#[from] IcsParseError),
    /// A database write failed while setting up the import course or source
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Counters reported back from one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub items_created: u64,
    pub items_skipped: u64,
    pub total_events: u64,
}

/// Imports calendar content for a user.
///
/// Creates (or reuses) the synthetic import course named after the source,
/// plus a manual source row beneath it, then walks the parsed events:
/// summary-less events, UID duplicates, and rows that fail to insert are
/// skipped and counted, everything else becomes an item. Every event lands
/// in exactly one of the two counters.
pub async fn import_calendar(
    db: &Arc<DatabaseConnection>,
    user_id: &Uuid,
    content: &str,
    source_name: &str,
    source_url: Option<&str>,
) -> Result<ImportStats, ImportError> {
    let events = parse_calendar(content)?;

    let profiles = ProfileRepository::new(db.clone());
    let courses = CourseRepository::new(db.clone());
    let sources = SourceRepository::new(db.clone());
    let items = ItemRepository::new(db.clone());

    profiles.ensure_exists(user_id).await?;

    // Reuse the import course across runs so UID dedup sees earlier rows
    let course = match courses
        .find_by_title_and_code(user_id, source_name, IMPORT_COURSE_CODE)
        .await?
    {
        Some(existing) => existing,
        None => {
            courses
                .create(course::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    owner_id: Set(*user_id),
                    title: Set(source_name.to_string()),
                    code: Set(Some(IMPORT_COURSE_CODE.to_string())),
                    term: Set(Some(IMPORT_COURSE_TERM.to_string())),
                    ..Default::default()
                })
                .await?
        }
    };

    let source = match sources
        .find_by_course_and_provider(user_id, &course.id, "manual")
        .await?
    {
        Some(existing) => existing,
        None => {
            sources
                .create(source::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    owner_id: Set(*user_id),
                    course_id: Set(course.id),
                    provider: Set("manual".to_string()),
                    display_name: Set(Some(source_name.to_string())),
                    external_course_id: Set(source_url.map(str::to_string)),
                    status: Set("active".to_string()),
                    ..Default::default()
                })
                .await?
        }
    };

    let mut seen_uids: HashSet<String> = items
        .find_by_course_and_external_source(user_id, &course.id, "ics")
        .await?
        .iter()
        .filter_map(|item| {
            item.raw_ref
                .as_ref()
                .and_then(|raw| raw.get("ics_uid"))
                .and_then(|uid| uid.as_str())
                .map(str::to_string)
        })
        .collect();

    let mut stats = ImportStats {
        total_events: events.len() as u64,
        ..Default::default()
    };
    let now = Utc::now();

    for event in &events {
        let Some(summary) = event.summary.as_deref() else {
            stats.items_skipped += 1;
            continue;
        };

        if let Some(uid) = event.uid.as_deref() {
            if seen_uids.contains(uid) {
                stats.items_skipped += 1;
                continue;
            }
        }

        let description = event.description.as_deref().unwrap_or("");
        let item_type = classify_event(summary, description);

        let due_at = event.end.or(event.start);
        let status = match due_at {
            Some(due) if due < now => "missed",
            Some(_) => "upcoming",
            None => "no_due_date",
        };

        let raw_ref = json!({
            "ics_uid": event.uid,
            "ics_source": source_name,
            "description": description,
            "location": event.location,
            "organizer": event.organizer,
            "categories": event.categories,
            "priority": event.priority,
            "import_date": now.to_rfc3339(),
        });

        let insert = items
            .create(item::ActiveModel {
                id: Set(Uuid::new_v4()),
                owner_id: Set(*user_id),
                course_id: Set(Some(course.id)),
                source_id: Set(Some(source.id)),
                title: Set(summary.to_string()),
                item_type: Set(item_type.to_string()),
                status: Set(status.to_string()),
                due_at: Set(due_at.map(Into::into)),
                external_source: Set(Some("ics".to_string())),
                raw_ref: Set(Some(raw_ref)),
                ..Default::default()
            })
            .await;

        match insert {
            Ok(_) => {
                stats.items_created += 1;
                if let Some(uid) = event.uid.as_deref() {
                    seen_uids.insert(uid.to_string());
                }
            }
            Err(err) => {
                warn!(error = %err, "Failed to insert imported calendar item");
                stats.items_skipped += 1;
            }
        }
    }

    counter!("ics_items_created_total").increment(stats.items_created);
    counter!("ics_items_skipped_total").increment(stats.items_skipped);

    info!(
        items_created = stats.items_created,
        items_skipped = stats.items_skipped,
        total_events = stats.total_events,
        "ICS import completed"
    );

    Ok(stats)
}
