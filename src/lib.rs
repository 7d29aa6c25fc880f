// Teller Core - Conversational banking intent resolution + transfer engine
// Exposes all modules for use in the conversational loop, demo CLI, and tests

pub mod accounts;
pub mod classifier;
pub mod db;
pub mod engine;
pub mod error;
pub mod merge;
pub mod money;
pub mod preferences;
pub mod transfer;

// Re-export commonly used types
pub use accounts::{
    get_account_by_name, get_account_by_number, list_accounts, recent_transfers, resolve,
    total_balance, Account, Direction, TransferView,
};
pub use classifier::{
    classify, classify_intent, detect_command, extract_entities, Classification,
    ExtractedEntities, Intent, IntentResult, MergeMethod, UserCommand,
};
pub use db::{create_account, seed_demo_accounts, setup_database};
pub use engine::{Assistant, CommandAck, Outcome, Reply};
pub use error::{Result, TellerError};
pub use merge::{empty_prediction, merge};
pub use money::Amount;
pub use preferences::{
    adaptive_threshold, analyze_message, interaction_count, log_action, predict_intent,
    record_detections, reset_preferences, top_preferences, Detection, PreferenceEntry, Prediction,
};
pub use transfer::{transfer, TransferRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
