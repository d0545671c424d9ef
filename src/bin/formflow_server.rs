//! Webhook intake server
//!
//! Usage:
//!   cargo run --release --bin formflow_server
//!
//! Environment variables:
//!   FORMFLOW_DB_PATH - SQLite database path (default: unset, in-memory sheets)
//!   FORMFLOW_BIND_ADDR - Listen address (default: 0.0.0.0:8080)
//!   FORMFLOW_NOTIFY_WEBHOOK_URL - Mail gateway (default: unset, log only)
//!   RUST_LOG - Log filter (default: info)
//!
//! See `PipelineConfig::from_env` for the remaining settings.

use dotenv::dotenv;
use formflow::notify::{LogNotifier, Notifier, WebhookNotifier};
use formflow::sheet::{MemoryStore, SqliteStore, TabularStore};
use formflow::{server, IntakePipeline, PipelineConfig};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 formflow webhook server");

    let config = PipelineConfig::from_env();
    config.validate()?;

    info!("   ├─ Retries: {} x {}ms", config.max_retries, config.retry_delay_ms);
    info!("   ├─ Retention: {} days", config.data_retention_days);
    info!("   ├─ Anomaly threshold: {}σ", config.anomaly_threshold);
    info!(
        "   └─ Notifications: {}{}",
        if config.email_notification { "on" } else { "off" },
        if config.notify_flagged_only { " (flagged only)" } else { "" }
    );

    let store: Arc<dyn TabularStore> = match &config.db_path {
        Some(path) => {
            info!("🔧 Opening SQLite store at {}", path);
            Arc::new(SqliteStore::open(path)?)
        }
        None => {
            warn!("⚠️  FORMFLOW_DB_PATH not set, sheets are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            let webhook = WebhookNotifier::new(url.as_str())?;
            info!("📧 Relaying notifications to {}", webhook.url());
            Arc::new(webhook)
        }
        None => Arc::new(LogNotifier::new()),
    };

    if config.email_notification && config.email_address.is_empty() {
        warn!("⚠️  FORMFLOW_EMAIL_ADDRESS is empty");
    }

    let bind_addr = config.bind_addr.clone();
    let pipeline = Arc::new(IntakePipeline::new(config, store, notifier));

    server::run(pipeline, &bind_addr).await?;
    Ok(())
}
