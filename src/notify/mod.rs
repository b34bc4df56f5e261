//! Webhook notifications.
//!
//! Delivery is best effort: a failed POST is logged and dropped. By the time
//! anything is sent the snapshot has already been saved, so a lost message
//! never rolls back state.

pub mod message;

use crate::config::{ProxyConfig, WebhookConfig};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, content: &str) -> Result<(), NotifyError>;

    /// Deliver and log the outcome. Returns whether delivery succeeded.
    async fn notify(&self, content: &str) -> bool {
        match self.deliver(content).await {
            Ok(()) => {
                info!("notification sent");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to send notification");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    msgtype: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    content: &'a str,
}

impl<'a> TextPayload<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            msgtype: "text",
            text: TextContent { content },
        }
    }
}

pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(webhook: &WebhookConfig, proxy: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(webhook.timeout_secs));
        if proxy.enabled {
            builder = builder.proxy(reqwest::Proxy::all(&proxy.url)?);
        }
        Ok(Self {
            url: webhook.url.clone(),
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, content: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&TextPayload::new(content))
            .send()
            .await?;

        if resp.status() != reqwest::StatusCode::OK {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }
        Ok(())
    }
}
