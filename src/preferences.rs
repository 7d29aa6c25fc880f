// 🧠 Preference Confidence Model - learned per-user preference scores
//
// Every interaction can deposit small confidence weights into
// (user, category, value) cells. Confidence only ever accumulates
// (clamped at 1.0) until the user explicitly resets. The model also owns
// the append-only behavior log that drives the adaptive threshold.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::Intent;
use crate::error::Result;

// ============================================================================
// DETECTION CATALOG
// ============================================================================

/// One keyword hit in a message, mapped to a preference cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub category: String,
    pub value: String,
    pub weight: f64,
}

impl Detection {
    pub fn new(category: &str, value: &str, weight: f64) -> Self {
        Detection {
            category: category.to_string(),
            value: value.to_string(),
            weight,
        }
    }
}

/// Keyword -> (category, value, weight). Bilingual, banking-domain.
const KEYWORD_PREFERENCES: &[(&str, &str, &str, f64)] = &[
    ("solde", "banking", "balance_check", 0.4),
    ("balance", "banking", "balance_check", 0.4),
    ("compte", "banking", "account_management", 0.3),
    ("comptes", "banking", "account_management", 0.3),
    ("account", "banking", "account_management", 0.3),
    ("iban", "banking", "account_management", 0.3),
    ("rib", "banking", "account_management", 0.3),
    ("virement", "transaction", "transfer", 0.5),
    ("virer", "transaction", "transfer", 0.4),
    ("transfer", "transaction", "transfer", 0.4),
    ("transférer", "transaction", "transfer", 0.4),
    ("transactions", "banking", "history", 0.3),
    ("historique", "banking", "history", 0.3),
    ("mouvements", "banking", "history", 0.3),
    ("carte", "banking", "card", 0.4),
    ("crédit", "banking", "credit", 0.4),
    ("prêt", "banking", "credit", 0.4),
    ("loan", "banking", "credit", 0.4),
    ("épargne", "banking", "savings", 0.3),
    ("savings", "banking", "savings", 0.3),
    ("livret", "banking", "savings", 0.3),
    ("investir", "finance", "investment", 0.3),
    ("placement", "finance", "investment", 0.3),
    ("bourse", "finance", "investment", 0.3),
    ("assurance", "banking", "insurance", 0.3),
];

static KEYWORD_MATCHERS: Lazy<Vec<(Regex, Detection)>> = Lazy::new(|| {
    KEYWORD_PREFERENCES
        .iter()
        .map(|(keyword, category, value, weight)| {
            let pattern = format!(r"\b{}\b", regex::escape(keyword));
            (
                Regex::new(&pattern).expect("preference keyword pattern"),
                Detection::new(category, value, *weight),
            )
        })
        .collect()
});

/// Scan a message for preference-bearing keywords (whole words only).
pub fn analyze_message(text: &str) -> Vec<Detection> {
    let lower = text.to_lowercase();

    KEYWORD_MATCHERS
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .map(|(_, detection)| detection.clone())
        .collect()
}

// ============================================================================
// PERSISTED ENTRIES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub category: String,
    pub value: String,
    pub confidence: f64,
    pub last_updated: String,
}

/// Record detections for a user. Each entry is a single atomic UPSERT:
/// existing confidence accumulates additively and is clamped at 1.0.
pub fn record_detections(conn: &Connection, user_id: &str, detections: &[Detection]) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let mut recorded = 0;

    for detection in detections {
        conn.execute(
            "INSERT INTO user_preferences
                (user_id, preference_category, preference_value, confidence_score, last_updated)
             VALUES (?1, ?2, ?3, MIN(1.0, ?4), ?5)
             ON CONFLICT(user_id, preference_category, preference_value)
             DO UPDATE SET
                confidence_score = MIN(1.0, confidence_score + excluded.confidence_score),
                last_updated = excluded.last_updated",
            params![
                user_id,
                detection.category,
                detection.value,
                detection.weight,
                now
            ],
        )?;
        recorded += 1;
    }

    if recorded > 0 {
        debug!(user_id, recorded, "recorded preference detections");
    }

    Ok(recorded)
}

/// Highest-confidence preferences first.
pub fn top_preferences(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<PreferenceEntry>> {
    let mut stmt = conn.prepare(
        "SELECT preference_category, preference_value, confidence_score, last_updated
         FROM user_preferences
         WHERE user_id = ?1
         ORDER BY confidence_score DESC, last_updated DESC",
    )?;

    let entries = stmt
        .query_map(params![user_id], |row| {
            Ok(PreferenceEntry {
                category: row.get(0)?,
                value: row.get(1)?,
                confidence: row.get(2)?,
                last_updated: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(entries.into_iter().take(limit).collect())
}

/// Delete all preference rows for a user. The behavior log is untouched:
/// history stays, learned scores go.
pub fn reset_preferences(conn: &Connection, user_id: &str) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM user_preferences WHERE user_id = ?1",
        params![user_id],
    )?;

    Ok(deleted)
}

// ============================================================================
// INTENT PREDICTION
// ============================================================================

/// Preference-derived intent guess for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub primary_intent: Intent,
    pub confidence: f64,
    pub suggested_actions: Vec<String>,
}

/// Fixed (category, value) -> intent table.
fn preference_to_intent(category: &str, value: &str) -> Intent {
    match (category, value) {
        ("banking", "balance_check") => Intent::BalanceInquiry,
        ("account", "primary_account") => Intent::BalanceInquiry,
        ("transaction", "transfer") => Intent::Transfer,
        ("banking", "history") => Intent::TransactionHistory,
        ("banking", "account_management") => Intent::AccountManagement,
        ("banking", "card") => Intent::ProductInquiry,
        ("banking", "credit") => Intent::ProductInquiry,
        ("banking", "insurance") => Intent::ProductInquiry,
        ("banking", "savings") => Intent::Investment,
        ("finance", "investment") => Intent::Investment,
        _ => Intent::Unknown,
    }
}

/// Predict the user's likely intent from accumulated preferences.
///
/// An unknown user is not an error: confidence 0.0, no suggestions.
pub fn predict_intent(conn: &Connection, user_id: &str) -> Result<Prediction> {
    let top = top_preferences(conn, user_id, 3)?;

    let Some(best) = top.first() else {
        return Ok(Prediction {
            primary_intent: Intent::Unknown,
            confidence: 0.0,
            suggested_actions: Vec::new(),
        });
    };

    Ok(Prediction {
        primary_intent: preference_to_intent(&best.category, &best.value),
        confidence: best.confidence,
        suggested_actions: top.iter().map(|p| p.value.clone()).collect(),
    })
}

// ============================================================================
// BEHAVIOR LOG & ADAPTIVE THRESHOLD
// ============================================================================

/// Append one behavior log entry. Entries are never mutated.
pub fn log_action(
    conn: &Connection,
    user_id: &str,
    action_type: &str,
    details: &serde_json::Value,
    session_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO user_behavior_log (user_id, action_type, action_details, timestamp, session_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            action_type,
            serde_json::to_string(details)?,
            Utc::now().to_rfc3339(),
            session_id,
        ],
    )?;

    Ok(())
}

pub fn interaction_count(conn: &Connection, user_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM user_behavior_log WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?)
}

/// Confidence the system requires before acting autonomously on an
/// inferred intent. Newer users need more certainty.
pub fn adaptive_threshold(conn: &Connection, user_id: &str) -> Result<f64> {
    let interactions = interaction_count(conn, user_id)?;

    Ok(if interactions > 50 {
        0.6
    } else if interactions > 20 {
        0.7
    } else {
        0.8
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_confidence_accumulates_monotonically() {
        let conn = test_conn();
        let detection = vec![Detection::new("transaction", "transfer", 0.4)];

        let mut last = 0.0;
        for _ in 0..5 {
            record_detections(&conn, "alice", &detection).unwrap();
            let top = top_preferences(&conn, "alice", 1).unwrap();
            let confidence = top[0].confidence;
            assert!(confidence >= last, "confidence must never decrease");
            assert!(confidence <= 1.0, "confidence must be clamped at 1.0");
            last = confidence;
        }

        // 0.4 + 0.4 + 0.4 clamps at 1.0 on the third hit
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_detection_creates_at_weight() {
        let conn = test_conn();
        record_detections(&conn, "bob", &[Detection::new("banking", "card", 0.4)]).unwrap();

        let top = top_preferences(&conn, "bob", 1).unwrap();
        assert!((top[0].confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_predict_intent_for_unknown_user() {
        let conn = test_conn();
        let prediction = predict_intent(&conn, "nobody").unwrap();

        assert_eq!(prediction.primary_intent, Intent::Unknown);
        assert_eq!(prediction.confidence, 0.0);
        assert!(prediction.suggested_actions.is_empty());
    }

    #[test]
    fn test_predict_intent_uses_highest_confidence_cell() {
        let conn = test_conn();
        record_detections(
            &conn,
            "carol",
            &[
                Detection::new("banking", "card", 0.3),
                Detection::new("transaction", "transfer", 0.5),
            ],
        )
        .unwrap();
        record_detections(&conn, "carol", &[Detection::new("transaction", "transfer", 0.3)])
            .unwrap();

        let prediction = predict_intent(&conn, "carol").unwrap();
        assert_eq!(prediction.primary_intent, Intent::Transfer);
        assert!((prediction.confidence - 0.8).abs() < 1e-9);
        assert_eq!(prediction.suggested_actions[0], "transfer");
    }

    #[test]
    fn test_adaptive_threshold_tiers() {
        let conn = test_conn();
        let details = serde_json::json!({});

        assert_eq!(adaptive_threshold(&conn, "dave").unwrap(), 0.8);

        for _ in 0..21 {
            log_action(&conn, "dave", "message", &details, None).unwrap();
        }
        assert_eq!(adaptive_threshold(&conn, "dave").unwrap(), 0.7);

        for _ in 0..30 {
            log_action(&conn, "dave", "message", &details, None).unwrap();
        }
        assert_eq!(adaptive_threshold(&conn, "dave").unwrap(), 0.6);
    }

    #[test]
    fn test_reset_deletes_preferences_but_keeps_log() {
        let conn = test_conn();
        record_detections(&conn, "erin", &[Detection::new("banking", "savings", 0.3)]).unwrap();
        log_action(&conn, "erin", "message", &serde_json::json!({}), Some("s1")).unwrap();

        let deleted = reset_preferences(&conn, "erin").unwrap();
        assert_eq!(deleted, 1);
        assert!(top_preferences(&conn, "erin", 10).unwrap().is_empty());
        assert_eq!(interaction_count(&conn, "erin").unwrap(), 1);
    }

    #[test]
    fn test_analyze_message_whole_words_only() {
        let detections = analyze_message("Quel est le solde de mon compte ?");
        let values: Vec<&str> = detections.iter().map(|d| d.value.as_str()).collect();
        assert!(values.contains(&"balance_check"));
        assert!(values.contains(&"account_management"));

        // "transfert" must not hit the "transfer" keyword
        let none = analyze_message("le transfert interbancaire");
        assert!(!none.iter().any(|d| d.value == "transfer"));
    }

    #[test]
    fn test_detections_isolated_per_user() {
        let conn = test_conn();
        record_detections(&conn, "u1", &[Detection::new("banking", "card", 0.4)]).unwrap();

        assert!(top_preferences(&conn, "u2", 5).unwrap().is_empty());
    }
}
