//! Change detection between a fetched leaderboard page and the snapshot.
//!
//! One `reconcile` call is one load → merge → save of the whole snapshot.
//! It takes `&mut self`, so two calls can never interleave on the store.

use crate::leaderboard::{Rank, Score, WalletRecord};
use crate::store::{SnapshotEntry, SnapshotStore};
use std::collections::HashSet;
use tracing::{debug, error, info};

/// A watched wallet whose rank or score moved since it was last seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Normalized address.
    pub wallet: String,
    pub old_rank: Rank,
    pub new_rank: Rank,
    pub old_score: Score,
    pub new_score: Score,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Watched records on the page, ascending by score, unknown scores last.
    pub found: Vec<WalletRecord>,
    /// In page order.
    pub changes: Vec<ChangeRecord>,
    /// Normalized wallets with no prior snapshot entry, in page order.
    pub discovered: Vec<String>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.found.is_empty() && self.changes.is_empty()
    }
}

pub struct Reconciler<S> {
    store: S,
    watch_set: HashSet<String>,
}

impl<S: SnapshotStore> Reconciler<S> {
    /// `watch_set` must already be normalized (see `MonitorConfig::watch_set`).
    pub fn new(store: S, watch_set: HashSet<String>) -> Self {
        Self { store, watch_set }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn watch_set(&self) -> &HashSet<String> {
        &self.watch_set
    }

    pub fn reconcile(&mut self, task_id: u64, page: &[WalletRecord]) -> Reconciliation {
        let mut result = Reconciliation::default();
        if page.is_empty() {
            debug!(task_id, "empty page, nothing to reconcile");
            return result;
        }

        let mut snapshot = self.store.load();

        for record in page {
            let wallet = record.normalized_wallet();
            if wallet.is_empty() || !self.watch_set.contains(&wallet) {
                continue;
            }

            let current = SnapshotEntry {
                rank: record.rank,
                score: record.score,
            };

            // Upsert first: the previous entry comes back for the diff.
            match snapshot.upsert(wallet.clone(), current) {
                Some(previous) if previous != current => {
                    result.changes.push(ChangeRecord {
                        wallet,
                        old_rank: previous.rank,
                        new_rank: current.rank,
                        old_score: previous.score,
                        new_score: current.score,
                    });
                }
                Some(_) => {}
                None => result.discovered.push(wallet),
            }

            result.found.push(record.clone());
        }

        if !result.found.is_empty() {
            if let Err(e) = self.store.save(&snapshot) {
                error!(task_id, error = %e, "failed to save snapshot");
            }
        }

        result
            .found
            .sort_by(|a, b| a.score.ascending_unknown_last(&b.score));

        if !result.found.is_empty() {
            info!(task_id, "matched wallets:");
            for record in &result.found {
                info!(
                    "  - rank {}: {} (score {:.4})",
                    record.rank, record.wallet, record.score
                );
            }
        }
        info!(
            task_id,
            checked = page.len(),
            found = result.found.len(),
            changes = result.changes.len(),
            discovered = result.discovered.len(),
            "wallet check complete"
        );

        result
    }
}
