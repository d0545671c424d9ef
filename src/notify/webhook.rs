//! Notifier that relays messages to an HTTP mail gateway
//!
//! Each message is POSTed as JSON:
//!
//! ```json
//! {"to": "ops@example.com", "subject": "...", "body": "..."}
//! ```
//!
//! Any non-2xx response is a `NotifyError::Status`.

use super::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = GatewayMessage {
            to: address,
            subject,
            body,
        };

        let response = self.client.post(&self.url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("⚠️  Mail gateway {} returned {}", self.url, status);
            return Err(NotifyError::Status(status.as_u16()));
        }

        log::debug!("📧 Relayed notification '{}' to {}", subject, self.url);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    type Inbox = Arc<Mutex<Vec<Value>>>;

    async fn spawn_gateway(status: StatusCode) -> (String, Inbox) {
        let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/send",
                post(
                    move |State(inbox): State<Inbox>, Json(message): Json<Value>| async move {
                        inbox.lock().unwrap().push(message);
                        status
                    },
                ),
            )
            .with_state(inbox.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/send", addr), inbox)
    }

    #[tokio::test]
    async fn test_webhook_posts_message() {
        let (url, inbox) = spawn_gateway(StatusCode::OK).await;
        let notifier = WebhookNotifier::new(url.as_str()).unwrap();
        assert_eq!(notifier.url(), url);

        notifier
            .send("ops@example.com", "New High Priority Submission: Contact", "body text")
            .await
            .unwrap();

        let received = inbox.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["to"], "ops@example.com");
        assert_eq!(received[0]["subject"], "New High Priority Submission: Contact");
        assert_eq!(received[0]["body"], "body text");
    }

    #[tokio::test]
    async fn test_webhook_maps_error_status() {
        let (url, _inbox) = spawn_gateway(StatusCode::BAD_GATEWAY).await;
        let notifier = WebhookNotifier::new(url).unwrap();

        let err = notifier.send("a@b.c", "s", "b").await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(502)));
    }
}
