//! The polling loop.
//!
//! Each iteration fetches every configured task id (concurrently, read-only),
//! then reconciles and notifies one task at a time in configured order.
//! A panic anywhere inside an iteration is caught at the iteration boundary,
//! followed by a short back-off. Shutdown is only observed between
//! iterations, never in the middle of a reconciliation.

use crate::config::MonitorConfig;
use crate::leaderboard::fetcher::LeaderboardSource;
use crate::notify::message::MessageBuilder;
use crate::notify::Notifier;
use crate::reconcile::{Reconciler, Reconciliation};
use crate::store::SnapshotStore;
use chrono::Local;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub task_ids: Vec<u64>,
    pub interval: Duration,
    pub retry_backoff: Duration,
    pub always_notify: bool,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            task_ids: config.task_ids.clone(),
            interval: config.interval(),
            retry_backoff: config.retry_backoff(),
            always_notify: config.always_notify,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationSummary {
    pub iteration: u64,
    pub pages_fetched: usize,
    pub found: usize,
    pub changes: usize,
    pub notifications_sent: usize,
}

pub struct Monitor<Src, N, S> {
    settings: MonitorSettings,
    source: Src,
    notifier: N,
    reconciler: Reconciler<S>,
    messages: MessageBuilder,
    shutdown: CancellationToken,
}

impl<Src, N, S> Monitor<Src, N, S>
where
    Src: LeaderboardSource,
    N: Notifier,
    S: SnapshotStore,
{
    pub fn new(
        settings: MonitorSettings,
        source: Src,
        notifier: N,
        reconciler: Reconciler<S>,
        messages: MessageBuilder,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings,
            source,
            notifier,
            reconciler,
            messages,
            shutdown,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// Runs until the shutdown token is cancelled. Returns the number of
    /// iterations started (failed ones included).
    pub async fn run(&mut self) -> u64 {
        let mut iteration = 0u64;

        info!(
            tasks = ?self.settings.task_ids,
            wallets = self.reconciler.watch_set().len(),
            interval_secs = self.settings.interval.as_secs(),
            "monitor started"
        );

        while !self.shutdown.is_cancelled() {
            iteration += 1;
            info!(iteration, "starting check");

            let pause = match AssertUnwindSafe(self.run_iteration(iteration))
                .catch_unwind()
                .await
            {
                Ok(summary) => {
                    info!(
                        iteration,
                        pages = summary.pages_fetched,
                        found = summary.found,
                        changes = summary.changes,
                        notified = summary.notifications_sent,
                        "check complete"
                    );
                    self.settings.interval
                }
                Err(panic) => {
                    error!(
                        iteration,
                        error = %panic_message(&*panic),
                        backoff_secs = self.settings.retry_backoff.as_secs(),
                        "check failed, backing off"
                    );
                    self.settings.retry_backoff
                }
            };

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        info!(iterations = iteration, "monitor shutting down");
        iteration
    }

    /// One pass over every task id.
    pub async fn run_iteration(&mut self, iteration: u64) -> IterationSummary {
        let mut summary = IterationSummary {
            iteration,
            ..IterationSummary::default()
        };

        let pages = join_all(
            self.settings
                .task_ids
                .iter()
                .map(|&task_id| self.source.fetch(task_id)),
        )
        .await;

        for (&task_id, page) in self.settings.task_ids.iter().zip(pages) {
            let Some(page) = page else {
                debug!(task_id, "no data this cycle");
                continue;
            };
            summary.pages_fetched += 1;

            let result = self.reconciler.reconcile(task_id, &page.items);
            summary.found += result.found.len();
            summary.changes += result.changes.len();

            if !should_notify(self.settings.always_notify, &result) {
                debug!(task_id, "nothing to report");
                continue;
            }

            let message = self.messages.build(task_id, &result, Local::now());
            if self.notifier.notify(&message).await {
                summary.notifications_sent += 1;
            }
        }

        summary
    }
}

/// With `always_notify` any watched wallet on the board is reported;
/// otherwise only movements and first sightings are.
fn should_notify(always_notify: bool, result: &Reconciliation) -> bool {
    if always_notify {
        !result.found.is_empty() || !result.changes.is_empty()
    } else {
        !result.changes.is_empty() || !result.discovered.is_empty()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
