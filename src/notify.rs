//! Notification delivery for lead events
//!
//! Delivery is best-effort: callers log failures and carry on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

pub const LEAD_CREATED_SUBJECT: &str = "A lead has been created";
pub const LEAD_CREATED_BODY: &str = "Go to the site to see the new lead!";

/// Sender and recipients for outgoing notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub from: String,
    pub to: Vec<String>,
}

/// An outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

impl Notification {
    pub fn lead_created(mail: &MailSettings) -> Self {
        Self {
            subject: LEAD_CREATED_SUBJECT.to_string(),
            body: LEAD_CREATED_BODY.to_string(),
            from: mail.from.clone(),
            to: mail.to.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            subject = %notification.subject,
            from = %notification.from,
            to = ?notification.to,
            "Notification"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to an HTTP endpoint (a mail relay)
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// `timeout` bounds the whole request, so a stalled relay cannot hold
    /// up the caller
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("leadbook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Notification delivery failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Notification rejected: {} - {}",
                status, text
            )));
        }

        Ok(())
    }
}

/// Send and swallow the outcome; failures only reach the log
pub async fn send_best_effort(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.send(notification).await {
        tracing::warn!(subject = %notification.subject, "Failed to send notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn mail() -> MailSettings {
        MailSettings {
            from: "test@test.com".to_string(),
            to: vec!["test2@test.com".to_string()],
        }
    }

    #[test]
    fn test_lead_created_message() {
        let notification = Notification::lead_created(&mail());
        assert_eq!(notification.subject, "A lead has been created");
        assert_eq!(notification.body, "Go to the site to see the new lead!");
        assert_eq!(notification.from, "test@test.com");
        assert_eq!(notification.to, vec!["test2@test.com".to_string()]);
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notification = Notification::lead_created(&mail());
        assert!(LogNotifier.send(&notification).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_posts_json() {
        let server = MockServer::start().await;
        let notification = Notification::lead_created(&mail());

        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_json(serde_json::json!({
                "subject": "A lead has been created",
                "body": "Go to the site to see the new lead!",
                "from": "test@test.com",
                "to": ["test2@test.com"],
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/notify", server.uri()), TIMEOUT).unwrap();
        notifier.send(&notification).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("relay down"))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), TIMEOUT).unwrap();
        let result = notifier.send(&Notification::lead_created(&mail())).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("relay down"));
    }

    #[tokio::test]
    async fn test_send_best_effort_swallows_errors() {
        // Nothing listens on this port
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/notify", TIMEOUT).unwrap();
        send_best_effort(&notifier, &Notification::lead_created(&mail())).await;
    }

    #[tokio::test]
    async fn test_stalled_relay_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), Duration::from_millis(200)).unwrap();
        let notification = Notification::lead_created(&mail());

        let result = tokio::time::timeout(Duration::from_secs(5), notifier.send(&notification))
            .await
            .expect("send outlived the client timeout");
        assert!(result.is_err());

        tokio::time::timeout(
            Duration::from_secs(5),
            send_best_effort(&notifier, &notification),
        )
        .await
        .expect("best-effort send outlived the client timeout");
    }
}
