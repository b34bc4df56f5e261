//! Plain-text report for one task's reconciliation.

use crate::leaderboard::{Rank, UNKNOWN_PLACEHOLDER};
use crate::reconcile::Reconciliation;
use chrono::{DateTime, Local};

const WARN_MARKER: &str = "⚠️ ";
const OK_MARKER: &str = "✅ ";

pub struct MessageBuilder {
    app_name: String,
    rank_alert_threshold: i64,
}

impl MessageBuilder {
    pub fn new(app_name: impl Into<String>, rank_alert_threshold: i64) -> Self {
        Self {
            app_name: app_name.into(),
            rank_alert_threshold,
        }
    }

    /// Marker prefix for a rank; empty when the rank is unknown.
    pub fn rank_marker(&self, rank: Rank) -> &'static str {
        match rank {
            Rank::Known(r) if r > self.rank_alert_threshold => WARN_MARKER,
            Rank::Known(_) => OK_MARKER,
            Rank::Unknown => "",
        }
    }

    pub fn build(&self, task_id: u64, result: &Reconciliation, at: DateTime<Local>) -> String {
        let mut lines = vec![
            format!("🔍 [{} - Model Task {}]", self.app_name, task_id),
            format!("⏰ Time: {}\n", at.format("%Y-%m-%d %H:%M:%S")),
            "📊 Wallets found:\n".to_string(),
        ];

        for record in &result.found {
            lines.push(format!("👛 Wallet: {}", record.wallet));
            lines.push(format!("💯 Score: {}", record.score));
            lines.push(format!("🏆 Rank: {}{}", self.rank_marker(record.rank), record.rank));
            lines.push(format!(
                "🕒 Finalized: {}\n",
                record.finalized_at.as_deref().unwrap_or(UNKNOWN_PLACEHOLDER)
            ));
        }

        if !result.changes.is_empty() {
            lines.push("\n📈 Rank changes:".to_string());
            for change in &result.changes {
                lines.push(format!("👛 Wallet: {}", change.wallet));
                lines.push(format!(
                    "🔄 Rank: {} -> {}{}",
                    change.old_rank,
                    self.rank_marker(change.new_rank),
                    change.new_rank
                ));
                lines.push(format!(
                    "📊 Score: {} -> {}\n",
                    change.old_score, change.new_score
                ));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{Score, WalletRecord};
    use crate::reconcile::ChangeRecord;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 11, 2, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_rank_markers() {
        let builder = MessageBuilder::new("Flock Monitor", 20);
        assert_eq!(builder.rank_marker(Rank::Known(20)), OK_MARKER);
        assert_eq!(builder.rank_marker(Rank::Known(21)), WARN_MARKER);
        assert_eq!(builder.rank_marker(Rank::Unknown), "");
    }

    #[test]
    fn test_message_contents() {
        let builder = MessageBuilder::new("Flock Monitor", 20);
        let result = Reconciliation {
            found: vec![
                WalletRecord {
                    wallet: "0xABC".to_string(),
                    rank: Rank::Known(3),
                    score: Score::Known(1.5),
                    finalized_at: Some("2024-11-01T12:00:00".to_string()),
                },
                WalletRecord {
                    wallet: "0xdef".to_string(),
                    rank: Rank::Known(42),
                    score: Score::Unknown,
                    finalized_at: None,
                },
            ],
            changes: vec![ChangeRecord {
                wallet: "0xabc".to_string(),
                old_rank: Rank::Known(5),
                new_rank: Rank::Known(3),
                old_score: Score::Known(1.23),
                new_score: Score::Known(1.5),
            }],
            discovered: vec!["0xdef".to_string()],
        };

        let msg = builder.build(17, &result, at());

        assert!(msg.starts_with("🔍 [Flock Monitor - Model Task 17]"));
        assert!(msg.contains("⏰ Time: 2024-11-02 08:30:00"));
        assert!(msg.contains("👛 Wallet: 0xABC"));
        assert!(msg.contains("🏆 Rank: ✅ 3"));
        assert!(msg.contains("🏆 Rank: ⚠️ 42"));
        assert!(msg.contains("💯 Score: n/a"));
        assert!(msg.contains("🕒 Finalized: n/a"));
        assert!(msg.contains("🔄 Rank: 5 -> ✅ 3"));
        assert!(msg.contains("📊 Score: 1.23 -> 1.5"));
    }

    #[test]
    fn test_no_change_section_without_changes() {
        let builder = MessageBuilder::new("Flock Monitor", 20);
        let result = Reconciliation {
            found: vec![WalletRecord {
                wallet: "0xabc".to_string(),
                rank: Rank::Unknown,
                score: Score::Unknown,
                finalized_at: None,
            }],
            ..Reconciliation::default()
        };

        let msg = builder.build(17, &result, at());

        assert!(!msg.contains("Rank changes"));
        assert!(msg.contains("🏆 Rank: n/a"));
    }
}
