//! Webhook HTTP server
//!
//! # Endpoints
//!
//! - `GET /` - liveness message for the webhook URL
//! - `POST /` - submit a form (JSON object or urlencoded form)
//! - `GET /health` - health check

use crate::intake::Submission;
use crate::pipeline::IntakePipeline;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

pub const ACTIVE_MESSAGE: &str = "Webhook URL is active and ready to receive requests.";
pub const SUCCESS_MESSAGE: &str = "Form data received, processed, and analyzed successfully.";

/// Request bodies that cannot become a submission
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("JSON body must be an object")]
    NotAnObject,
}

/// Build the axum router
pub fn build_router(pipeline: Arc<IntakePipeline>) -> Router {
    Router::new()
        .route("/", get(webhook_active).post(receive_submission))
        .route("/health", get(health_check))
        .with_state(pipeline)
}

/// Bind `bind_addr` and serve until Ctrl-C
pub async fn run(pipeline: Arc<IntakePipeline>, bind_addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    log::info!("🚀 Webhook server listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("🛑 Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

async fn webhook_active() -> &'static str {
    ACTIVE_MESSAGE
}

async fn health_check() -> &'static str {
    "ok"
}

/// POST / - process one form submission
async fn receive_submission(
    State(pipeline): State<Arc<IntakePipeline>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let submission = match parse_body(content_type, &body) {
        Ok(submission) => submission,
        Err(e) => {
            log::warn!("⚠️  Rejected submission body: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match pipeline.handle_submission(submission).await {
        Ok(_) => (StatusCode::OK, SUCCESS_MESSAGE.to_string()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}

/// Decode a request body by content type
///
/// `application/json` must hold an object; anything else is read as a
/// urlencoded form.
pub fn parse_body(content_type: &str, body: &[u8]) -> Result<Submission, BodyError> {
    if content_type.to_ascii_lowercase().starts_with("application/json") {
        return match serde_json::from_slice(body)? {
            Value::Object(map) => Ok(map),
            _ => Err(BodyError::NotAnObject),
        };
    }

    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
    Ok(expand_form_pairs(pairs))
}

/// Turn `fields[email][value]=x` style keys into nested maps
///
/// Keys that are not well-formed bracket paths are kept as-is. A repeated
/// key keeps its last value.
pub fn expand_form_pairs(pairs: Vec<(String, String)>) -> Submission {
    let mut root = Map::new();
    for (key, value) in pairs {
        let path = bracket_path(&key).unwrap_or_else(|| vec![key.as_str()]);
        insert_path(&mut root, &path, Value::String(value));
    }
    root
}

fn bracket_path(key: &str) -> Option<Vec<&str>> {
    let open = key.find('[')?;
    let (base, mut rest) = key.split_at(open);
    if base.is_empty() {
        return None;
    }

    let mut path = vec![base];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let segment = &inner[..close];
        if segment.is_empty() {
            return None;
        }
        path.push(segment);
        rest = &inner[close + 1..];
    }
    Some(path)
}

fn insert_path(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            map.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
