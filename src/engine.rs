// 🤖 Assistant engine - the conversational banking pipeline
//
// One explicit context object constructed at startup and handed to callers;
// no hidden global state. The external conversational loop feeds it raw text
// plus a user id and formats the structured outcomes into replies.
//
// Pipeline per message:
//   classify -> (command short-circuit) -> predict -> merge -> threshold gate
//   -> route -> feedback into the preference model

use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::accounts::{self, Account, TransferView};
use crate::classifier::{classify, Classification, Intent, IntentResult, UserCommand};
use crate::error::Result;
use crate::merge::{empty_prediction, merge};
use crate::money::Amount;
use crate::preferences::{self, Prediction};
use crate::transfer::{self, TransferRecord};

const HISTORY_LIMIT: usize = 5;

/// Acknowledgement for a session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAck {
    Exit,
    Cleared,
    SwitchedUser(String),
}

/// Structured answer to a classified banking intent. Natural-language
/// rendering belongs to the caller.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Balance of one resolved account.
    Balance { account: Account },
    /// No specific account asked for: aggregate over the user's accounts.
    TotalBalance { total: Amount, accounts: usize },
    AccountDetails { account: Account },
    AccountList { accounts: Vec<Account>, total: Amount },
    History { account: Account, transfers: Vec<TransferView> },
    /// Transfer intent recognized; execution goes through `execute_transfer`.
    TransferGuidance { suggested_amount: Option<Amount> },
    /// The entities did not resolve to any account.
    NoSuchAccount { searched: String },
    /// Intent recognized but outside the ledger (products, investing, ...).
    Informational { intent: Intent, suggestions: Vec<String> },
    /// Confidence below the user's adaptive threshold: ask, don't act.
    Clarification {
        intent: Intent,
        confidence: f64,
        suggestions: Vec<String>,
    },
}

/// One turn of the conversation.
#[derive(Debug, Clone)]
pub enum Reply {
    Command(CommandAck),
    Answer {
        result: IntentResult,
        outcome: Outcome,
    },
}

/// Process-wide assistant context: owns the store connection and a session id
/// for the behavior log.
pub struct Assistant {
    conn: Connection,
    session_id: String,
}

impl Assistant {
    pub fn new(conn: Connection) -> Self {
        Assistant {
            conn,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Open (or create) the shared database file and set up the schema.
    pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        crate::db::setup_database(&conn)?;
        Ok(Assistant::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Handle one raw user message.
    pub fn handle_message(&self, user_id: &str, text: &str) -> Result<Reply> {
        let base = match classify(text) {
            Classification::Command(cmd) => {
                debug!(user_id, ?cmd, "session command");
                return Ok(Reply::Command(match cmd {
                    UserCommand::Exit => CommandAck::Exit,
                    UserCommand::Clear => CommandAck::Cleared,
                    UserCommand::SwitchUser(name) => CommandAck::SwitchedUser(name),
                }));
            }
            Classification::Intent(result) => result,
        };

        // Personalization degrades gracefully: a broken preference store
        // must never fail the request.
        let predicted = self.predict_or_default(user_id);
        let threshold = preferences::adaptive_threshold(&self.conn, user_id).unwrap_or_else(|e| {
            warn!(user_id, error = %e, "adaptive threshold unavailable, using strictest tier");
            0.8
        });

        let merged = merge(base, &predicted);
        debug!(
            user_id,
            intent = %merged.intent,
            confidence = merged.confidence,
            method = ?merged.method,
            "merged intent"
        );

        self.learn_from_message(user_id, text, &merged);

        let outcome = if merged.confidence < threshold {
            Outcome::Clarification {
                intent: merged.intent,
                confidence: merged.confidence,
                suggestions: predicted.suggested_actions.clone(),
            }
        } else {
            self.route(user_id, &merged, &predicted)?
        };

        Ok(Reply::Answer {
            result: merged,
            outcome,
        })
    }

    /// Execute a transfer on behalf of a user. This is the function the
    /// external tool loop calls once it has both account numbers.
    pub fn execute_transfer(
        &mut self,
        user_id: &str,
        from_account: &str,
        to_account: &str,
        amount: Amount,
    ) -> Result<TransferRecord> {
        let record = transfer::transfer(&mut self.conn, user_id, from_account, to_account, amount)?;

        // Completed transfers feed the preference model too
        let detections = vec![preferences::Detection::new("transaction", "transfer", 0.3)];
        if let Err(e) = preferences::record_detections(&self.conn, user_id, &detections) {
            warn!(user_id, error = %e, "could not record transfer preference");
        }
        if let Err(e) = preferences::log_action(
            &self.conn,
            user_id,
            "transfer",
            &json!({
                "transfer_id": record.id,
                "from_account": record.from_account,
                "to_account": record.to_account,
                "amount": record.amount.to_string(),
            }),
            Some(&self.session_id),
        ) {
            warn!(user_id, error = %e, "could not log transfer action");
        }

        Ok(record)
    }

    /// Forget everything learned about a user. The behavior log stays.
    pub fn reset_preferences(&self, user_id: &str) -> Result<usize> {
        preferences::reset_preferences(&self.conn, user_id)
    }

    fn predict_or_default(&self, user_id: &str) -> Prediction {
        match preferences::predict_intent(&self.conn, user_id) {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(user_id, error = %e, "preference store unavailable, using base classification only");
                empty_prediction()
            }
        }
    }

    /// Feed the classified interaction back into the preference model.
    /// All failures degrade to warnings.
    fn learn_from_message(&self, user_id: &str, text: &str, merged: &IntentResult) {
        let detections = preferences::analyze_message(text);
        if !detections.is_empty() {
            if let Err(e) = preferences::record_detections(&self.conn, user_id, &detections) {
                warn!(user_id, error = %e, "could not record detections");
            }
        }

        let details = json!({
            "message": text,
            "detected_intent": merged.intent.as_str(),
            "confidence": merged.confidence,
            "method": merged.method,
        });
        if let Err(e) = preferences::log_action(
            &self.conn,
            user_id,
            "intent_detection",
            &details,
            Some(&self.session_id),
        ) {
            warn!(user_id, error = %e, "could not log interaction");
        }
    }

    /// Route a confident intent to the ledger.
    fn route(
        &self,
        user_id: &str,
        merged: &IntentResult,
        predicted: &Prediction,
    ) -> Result<Outcome> {
        let entities = &merged.entities;
        let scope = Some(user_id);

        Ok(match merged.intent {
            Intent::BalanceInquiry => {
                if entities.account_id.is_some() || entities.account_type.is_some() {
                    match accounts::resolve(&self.conn, entities, scope)? {
                        Some(account) => Outcome::Balance { account },
                        None => Outcome::NoSuchAccount {
                            searched: searched_label(entities),
                        },
                    }
                } else {
                    let list = accounts::list_accounts(&self.conn, scope)?;
                    Outcome::TotalBalance {
                        total: accounts::total_balance(&self.conn, scope)?,
                        accounts: list.len(),
                    }
                }
            }
            Intent::AccountInfo => match accounts::resolve(&self.conn, entities, scope)? {
                Some(account) => Outcome::AccountDetails { account },
                None => Outcome::NoSuchAccount {
                    searched: searched_label(entities),
                },
            },
            Intent::AccountList => {
                let list = accounts::list_accounts(&self.conn, scope)?;
                let total = accounts::total_balance(&self.conn, scope)?;
                Outcome::AccountList {
                    accounts: list,
                    total,
                }
            }
            Intent::TransactionHistory => match accounts::resolve(&self.conn, entities, scope)? {
                Some(account) => {
                    let transfers = accounts::recent_transfers(
                        &self.conn,
                        &account.number,
                        scope,
                        HISTORY_LIMIT,
                    )?;
                    Outcome::History { account, transfers }
                }
                None => Outcome::NoSuchAccount {
                    searched: searched_label(entities),
                },
            },
            Intent::Transfer => Outcome::TransferGuidance {
                suggested_amount: entities.amount,
            },
            Intent::ProductInquiry
            | Intent::Investment
            | Intent::AccountManagement
            | Intent::Unknown => Outcome::Informational {
                intent: merged.intent,
                suggestions: predicted.suggested_actions.clone(),
            },
        })
    }
}

fn searched_label(entities: &crate::classifier::ExtractedEntities) -> String {
    entities
        .account_id
        .clone()
        .or_else(|| entities.account_type.clone())
        .unwrap_or_else(|| "account".to_string())
}

// ============================================================================
// TESTS
// ============================================================================
