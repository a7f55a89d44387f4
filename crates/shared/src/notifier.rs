use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::NotifyOutcome;

/// Body posted to the delivery webhook
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotifyPayload {
    pub sender_email: String,
    pub recipient_email: String,
    pub subject: String,
    pub html_content: String,
    pub csv_url: String,
    pub date: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Hands the rendered digest off for delivery. Failures never abort a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &NotifyPayload) -> NotifyOutcome;
}

pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, webhook_url })
    }

    async fn post(&self, url: &str, payload: &NotifyPayload) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(NotifyError::Status { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: &NotifyPayload) -> NotifyOutcome {
        let Some(url) = self.webhook_url.as_deref() else {
            warn!("ZAPIER_WEBHOOK_URL not set, skipping email");
            return NotifyOutcome::Skipped;
        };

        match self.post(url, payload).await {
            Ok(()) => {
                info!("Webhook triggered successfully");
                NotifyOutcome::Delivered
            }
            Err(e) => {
                warn!("Webhook delivery failed: {}", e);
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NotifyPayload {
        NotifyPayload {
            sender_email: "a@example.com".to_string(),
            recipient_email: "b@example.com".to_string(),
            subject: "📰 Your Daily Newsletter".to_string(),
            html_content: "<html></html>".to_string(),
            csv_url: "https://example.com/x.csv".to_string(),
            date: "2025-03-05".to_string(),
        }
    }

    #[test]
    fn test_payload_field_names() {
        let json = serde_json::to_value(payload()).unwrap();
        for key in [
            "sender_email",
            "recipient_email",
            "subject",
            "html_content",
            "csv_url",
            "date",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_status_error_message() {
        let err = NotifyError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "oops".to_string(),
        };
        assert_eq!(err.to_string(), "webhook returned 500 Internal Server Error: oops");
    }

    #[tokio::test]
    async fn test_missing_webhook_url_skips() {
        let notifier = WebhookNotifier::new(None).unwrap();
        assert_eq!(notifier.notify(&payload()).await, NotifyOutcome::Skipped);
    }

    /// Serve one HTTP request on a loopback port with a canned status line,
    /// returning the webhook URL and the captured request body.
    async fn one_shot_webhook(
        status_line: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then exactly Content-Length bytes of body
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before body");
                request.extend_from_slice(&buf[..n]);
            }

            let body = "mail service down";
            let response = format!(
                "{}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&request[header_end..]).into_owned()
        });

        (format!("http://{}/hook", addr), handle)
    }

    #[tokio::test]
    async fn test_server_error_status_is_reported_as_failed() {
        let (url, server) = one_shot_webhook("HTTP/1.1 500 Internal Server Error").await;
        let notifier = WebhookNotifier::new(Some(url)).unwrap();

        let outcome = notifier.notify(&payload()).await;
        assert_eq!(
            outcome,
            NotifyOutcome::Failed(
                "webhook returned 500 Internal Server Error: mail service down".to_string()
            )
        );

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["date"], "2025-03-05");
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_still_a_failure() {
        let (url, server) = one_shot_webhook("HTTP/1.1 202 Accepted").await;
        let notifier = WebhookNotifier::new(Some(url)).unwrap();

        let outcome = notifier.notify(&payload()).await;
        assert!(matches!(outcome, NotifyOutcome::Failed(ref reason) if reason.contains("202")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_ok_status_is_delivered() {
        let (url, server) = one_shot_webhook("HTTP/1.1 200 OK").await;
        let notifier = WebhookNotifier::new(Some(url)).unwrap();

        assert_eq!(notifier.notify(&payload()).await, NotifyOutcome::Delivered);
        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["subject"], "📰 Your Daily Newsletter");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_a_failure_not_an_error() {
        // Port 9 on localhost is the discard service and is essentially never listening
        let notifier = WebhookNotifier::new(Some("http://127.0.0.1:9/hook".to_string())).unwrap();
        let outcome = notifier.notify(&payload()).await;
        assert!(matches!(outcome, NotifyOutcome::Failed(_)));
    }
}
