//! Leaderboard fetcher.
//!
//! Pulls one page of model results per task id from the stats API:
//! `GET {base_url}/models?task_id=..&page=..&size=..`.
//!
//! Never retries. A failed request is "no data this cycle" and the monitor
//! simply tries again on its next tick.

use crate::config::ApiConfig;
use crate::leaderboard::LeaderboardPage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed for task {task_id}: {source}")]
    Http {
        task_id: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("API error for task {task_id}: {status} - {body}")]
    Status {
        task_id: u64,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Anything that can hand back a leaderboard page for a task id.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    async fn fetch_page(&self, task_id: u64) -> Result<LeaderboardPage, FetchError>;

    /// Like `fetch_page` but folds every failure into `None` after logging it.
    async fn fetch(&self, task_id: u64) -> Option<LeaderboardPage> {
        match self.fetch_page(task_id).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(task_id, error = %e, "leaderboard fetch failed");
                None
            }
        }
    }
}

pub struct HttpFetcher {
    base_url: String,
    page: u32,
    page_size: u32,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page: config.page,
            page_size: config.page_size,
            client,
        })
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }
}

#[async_trait]
impl LeaderboardSource for HttpFetcher {
    async fn fetch_page(&self, task_id: u64) -> Result<LeaderboardPage, FetchError> {
        let url = self.models_url();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("task_id", task_id.to_string()),
                ("page", self.page.to_string()),
                ("size", self.page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|source| FetchError::Http { task_id, source })?;

        info!(task_id, url = %url, status = %resp.status(), "leaderboard request");

        if resp.status() != reqwest::StatusCode::OK {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                task_id,
                status,
                body,
            });
        }

        let page: LeaderboardPage = resp
            .json()
            .await
            .map_err(|source| FetchError::Http { task_id, source })?;

        debug!(
            task_id,
            items = page.items.len(),
            total = ?page.total,
            "fetched leaderboard page"
        );

        Ok(page)
    }
}
