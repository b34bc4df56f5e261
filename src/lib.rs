//! Leaderboard watcher: polls the stats API for a set of task ids, diffs the
//! watched wallets against the last saved snapshot and reports new sightings
//! and rank/score changes to a webhook.

pub mod config;
pub mod leaderboard;
pub mod monitor;
pub mod notify;
pub mod reconcile;
pub mod shutdown;
pub mod store;
