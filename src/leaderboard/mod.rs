//! Leaderboard data model.
//!
//! The stats API is loose about types: ranks and scores may be missing,
//! null, numeric strings or floats. Everything is folded into the
//! `Rank` / `Score` sum types here so the rest of the crate never has to
//! second-guess a JSON value.

pub mod fetcher;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Placeholder rendered for any value the API did not report.
pub const UNKNOWN_PLACEHOLDER: &str = "n/a";

/// Leaderboard position. `Unknown` when the API omitted it or sent junk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rank {
    Known(i64),
    #[default]
    Unknown,
}

/// Leaderboard score. `Unknown` when the API omitted it or sent junk.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Score {
    Known(f64),
    #[default]
    Unknown,
}

impl Rank {
    pub fn known(&self) -> Option<i64> {
        match self {
            Rank::Known(r) => Some(*r),
            Rank::Unknown => None,
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            }),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.map_or(Rank::Unknown, Rank::Known)
    }
}

impl Score {
    pub fn known(&self) -> Option<f64> {
        match self {
            Score::Known(s) => Some(*s),
            Score::Unknown => None,
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|f| f.is_finite())
            .map_or(Score::Unknown, Score::Known)
    }

    /// Ascending order with every `Unknown` after every known score.
    pub fn ascending_unknown_last(&self, other: &Score) -> Ordering {
        match (self, other) {
            (Score::Known(a), Score::Known(b)) => a.total_cmp(b),
            (Score::Known(_), Score::Unknown) => Ordering::Less,
            (Score::Unknown, Score::Known(_)) => Ordering::Greater,
            (Score::Unknown, Score::Unknown) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Known(r) => fmt::Display::fmt(r, f),
            Rank::Unknown => f.pad(UNKNOWN_PLACEHOLDER),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Known(s) => fmt::Display::fmt(s, f),
            Score::Unknown => f.pad(UNKNOWN_PLACEHOLDER),
        }
    }
}

// Unknown is persisted as JSON null.

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.known().serialize(serializer)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.known().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Rank::from_json(value.as_ref()))
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Score::from_json(value.as_ref()))
    }
}

/// One entry of the model leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    /// Address as the API spelled it. Use [`normalize_wallet`] before comparing.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub wallet: String,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default, rename = "submission_phase_score")]
    pub score: Score,
    #[serde(default, deserialize_with = "lenient_text")]
    pub finalized_at: Option<String>,
}

impl WalletRecord {
    pub fn normalized_wallet(&self) -> String {
        normalize_wallet(&self.wallet)
    }
}

/// One page of `/models` results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub items: Vec<WalletRecord>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: Option<u64>,
}

/// Case-folds a wallet address so `0xABC` and `0xabc` are the same key.
pub fn normalize_wallet(address: &str) -> String {
    address.trim().to_lowercase()
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}

/// Descriptive text field: strings as-is, other scalars via their JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_record_parsing() {
        let page: LeaderboardPage = serde_json::from_str(
            r#"{"items": [
                {"wallet": "0xABC", "rank": 5, "submission_phase_score": 1.23, "finalized_at": "2024-11-02"},
                {"wallet": "0xdef", "rank": "7", "submission_phase_score": "0.5"},
                {"wallet": null, "rank": null},
                {"wallet": "0x111", "rank": 3.0, "submission_phase_score": "unknown"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(page.items.len(), 4);
        assert_eq!(page.items[0].rank, Rank::Known(5));
        assert_eq!(page.items[0].score, Score::Known(1.23));
        assert_eq!(page.items[1].rank, Rank::Known(7));
        assert_eq!(page.items[1].score, Score::Known(0.5));
        assert_eq!(page.items[2].wallet, "");
        assert_eq!(page.items[2].rank, Rank::Unknown);
        assert_eq!(page.items[2].score, Score::Unknown);
        assert_eq!(page.items[3].rank, Rank::Known(3));
        assert_eq!(page.items[3].score, Score::Unknown);
    }

    #[test]
    fn test_descriptive_fields_never_reject_page() {
        let page: LeaderboardPage = serde_json::from_str(
            r#"{"total": "many", "items": [
                {"wallet": "0xabc", "rank": 5, "submission_phase_score": 1.23, "finalized_at": 1730000000},
                {"wallet": "0xdef", "rank": 6, "finalized_at": {"at": "noon"}},
                {"wallet": "0x111", "rank": 7, "finalized_at": null}
            ]}"#,
        )
        .unwrap();

        assert_eq!(page.total, None);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].finalized_at.as_deref(), Some("1730000000"));
        assert_eq!(page.items[0].score, Score::Known(1.23));
        assert_eq!(page.items[1].finalized_at.as_deref(), Some(r#"{"at":"noon"}"#));
        assert_eq!(page.items[2].finalized_at, None);

        let page: LeaderboardPage = serde_json::from_str(r#"{"total": -3, "items": []}"#).unwrap();
        assert_eq!(page.total, None);
        let page: LeaderboardPage = serde_json::from_str(r#"{"total": 120, "items": []}"#).unwrap();
        assert_eq!(page.total, Some(120));
    }

    #[test]
    fn test_missing_items_is_empty_page() {
        let page: LeaderboardPage = serde_json::from_str(r#"{"detail": "nope"}"#).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_unknown_formats_as_placeholder() {
        assert_eq!(format!("{:.4}", Score::Unknown), "n/a");
        assert_eq!(format!("{:.4}", Score::Known(1.5)), "1.5000");
        assert_eq!(Rank::Unknown.to_string(), "n/a");
        assert_eq!(Rank::Known(12).to_string(), "12");
    }

    #[test]
    fn test_unknown_sorts_last() {
        let mut scores = vec![Score::Unknown, Score::Known(2.0), Score::Known(-1.0), Score::Unknown];
        scores.sort_by(|a, b| a.ascending_unknown_last(b));
        assert_eq!(
            scores,
            vec![Score::Known(-1.0), Score::Known(2.0), Score::Unknown, Score::Unknown]
        );
    }

    #[test]
    fn test_normalize_wallet() {
        assert_eq!(normalize_wallet("  0xAbC "), "0xabc");
    }
}
