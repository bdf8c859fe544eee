//! Tracing setup and per-request trace ids.
//!
//! The subscriber is installed once at startup; every request then gets a
//! trace id that rides along as a request extension and a task-local, so
//! error responses built anywhere below the middleware can echo it back.

use std::any::type_name_of_val;
use std::sync::OnceLock;

use axum::{extract::Request, middleware::Next, response::Response};
use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

/// Correlation id attached to one request.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static ACTIVE_TRACE_CONTEXT: TraceContext;
}

/// Errors from installing the global telemetry pipeline.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber and the `log` bridge exactly once.
///
/// Repeat calls are no-ops, and a subscriber installed by someone else
/// (usually a test harness) is left in place with a warning rather than
/// treated as fatal.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INIT.set(()).is_err() {
        return Ok(());
    }

    install_log_bridge();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format.as_str() {
        "pretty" => registry.with(fmt::layer().pretty()).try_init(),
        _ => registry.with(fmt::layer().json()).try_init(),
    };

    if let Err(err) = result {
        eprintln!("Warning: tracing subscriber already installed ({err}); keeping the existing one");
    }

    Ok(())
}

// The bridge routes `log::` records (sea-orm, sqlx) into tracing. A second
// install attempt fails by design; that only matters when the registered
// logger is not ours.
fn install_log_bridge() {
    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        let installed = type_name_of_val(log::logger());
        if !installed.contains("LogTracer") {
            eprintln!("Warning: log bridge install failed ({err}); `log::` records will bypass tracing");
        }
    }
}

/// Runs `future` with the given trace context bound to the task.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_TRACE_CONTEXT.scope(context, future).await
}

/// The trace id bound to the running task, if any.
pub fn current_trace_id() -> Option<String> {
    ACTIVE_TRACE_CONTEXT
        .try_with(|ctx| ctx.trace_id.clone())
        .ok()
}

/// Middleware assigning every request a trace id, visible both as a request
/// extension and through the task-local for error responses built deeper in
/// the call stack.
pub async fn trace_middleware(mut request: Request, next: Next) -> Response {
    let context = TraceContext {
        trace_id: uuid::Uuid::new_v4().simple().to_string(),
    };

    request.extensions_mut().insert(context.clone());
    with_trace_context(context, next.run(request)).await
}
