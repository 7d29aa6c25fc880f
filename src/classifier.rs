// 🔎 Pattern Intent Classifier - keywords + regex scoring over raw text
//
// Pure function over the input text and fixed catalogs: no store access,
// no side effects. Command detection always wins over banking scoring.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::money::Amount;

// ============================================================================
// INTENT CATALOG
// ============================================================================

/// Closed catalog of banking intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    BalanceInquiry,
    Transfer,
    TransactionHistory,
    AccountList,
    AccountInfo,
    ProductInquiry,
    Investment,
    AccountManagement,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::BalanceInquiry => "balance_inquiry",
            Intent::Transfer => "transfer",
            Intent::TransactionHistory => "transaction_history",
            Intent::AccountList => "account_list",
            Intent::AccountInfo => "account_info",
            Intent::ProductInquiry => "product_inquiry",
            Intent::Investment => "investment",
            Intent::AccountManagement => "account_management",
            Intent::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the final intent was decided (see merge.rs for the policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMethod {
    /// Rule scoring and preference prediction agreed.
    Consensus,
    /// A strong preference signal replaced the rule-based guess.
    Override,
    /// The rule-based guess stood on its own confidence.
    Base,
    /// Neither side was confident; the better weak guess won.
    Fallback,
}

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Entities pulled out of the text, independent of intent scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// First 10-12 digit token, if any (account numbers are that shape).
    pub account_id: Option<String>,
    /// First account-type synonym found (lowercased).
    pub account_type: Option<String>,
    /// First numeric token with optional currency suffix.
    pub amount: Option<Amount>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none() && self.account_type.is_none() && self.amount.is_none()
    }
}

/// Transient classification result. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Certainty in [0, 1], capped at 0.95.
    pub confidence: f64,
    pub entities: ExtractedEntities,
    pub method: MergeMethod,
    /// The losing guess, kept for observability when method == Fallback.
    pub alternative: Option<(Intent, f64)>,
}

/// Session-level commands bypass intent scoring entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    Exit,
    Clear,
    SwitchUser(String),
}

/// Outcome of classifying one message: a command or a scored banking intent.
#[derive(Debug, Clone)]
pub enum Classification {
    Command(UserCommand),
    Intent(IntentResult),
}

// ============================================================================
// FIXED CATALOGS
// ============================================================================

const EXIT_COMMANDS: &[&str] = &["exit", "quit", "bye", "goodbye", "au revoir"];
const CLEAR_COMMANDS: &[&str] = &["clear", "cls", "effacer"];

const KEYWORD_WEIGHT: f64 = 0.3;
const PATTERN_WEIGHT: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 0.95;
const UNKNOWN_CONFIDENCE: f64 = 0.2;
/// Confidence assigned when nothing scored but an account number is present.
const IMPLIED_ACCOUNT_CONFIDENCE: f64 = 0.5;

struct IntentSpec {
    intent: Intent,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
    confidence_boost: f64,
}

fn entry(
    intent: Intent,
    keywords: &'static [&'static str],
    patterns: &[&str],
    confidence_boost: f64,
) -> IntentSpec {
    IntentSpec {
        intent,
        keywords,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("intent catalog pattern"))
            .collect(),
        confidence_boost,
    }
}

/// Catalog declaration order breaks score ties: first declared wins.
static CATALOG: Lazy<Vec<IntentSpec>> = Lazy::new(|| {
    vec![
        entry(
            Intent::BalanceInquiry,
            &["balance", "solde", "combien", "montant", "disponible"],
            &[
                r"(?:quel est|combien|montant).*(?:solde|balance)",
                r"(?:solde|balance).*(?:compte|account)",
                r"combien.*(?:argent|euros?|dollars?)",
            ],
            0.1,
        ),
        entry(
            Intent::Transfer,
            &["transfer", "virer", "envoyer", "transférer", "virement"],
            &[
                r"(?:virer|transférer|envoyer).*(?:\d+|euros?|dollars?)",
                r"(?:faire|effectuer).*(?:virement|transfer)",
                r"(?:je veux|j'aimerais).*(?:virer|transférer)",
            ],
            0.15,
        ),
        entry(
            Intent::TransactionHistory,
            &["history", "historique", "transactions", "opérations", "mouvements"],
            &[
                r"(?:voir|afficher|montrer).*(?:historique|history|transactions)",
                r"(?:dernières?|récentes?).*(?:transactions|opérations)",
                r"(?:historique|history).*(?:compte|account)",
            ],
            0.1,
        ),
        entry(
            Intent::AccountList,
            &["mes comptes", "tous mes comptes", "liste comptes"],
            &[
                r"(?:liste|afficher|montrer).*comptes",
                r"tous mes comptes",
            ],
            0.1,
        ),
        entry(
            Intent::AccountInfo,
            &["informations", "détails", "infos", "renseignements"],
            &[
                r"(?:informations?|détails?|infos?).*(?:compte|account)",
                r"(?:info|détail) compte",
            ],
            0.1,
        ),
        entry(
            Intent::ProductInquiry,
            &["produit", "service", "offre", "carte", "crédit", "prêt"],
            &[
                r"(?:quel|quelle).*(?:produit|service|offre)",
                r"(?:carte|card).*(?:crédit|credit|bancaire)",
                r"(?:prêt|loan|crédit)",
            ],
            0.1,
        ),
        entry(
            Intent::Investment,
            &["investir", "placement", "épargne", "investment", "saving"],
            &[
                r"(?:investir|placer).*(?:argent|euros?|dollars?)",
                r"(?:épargne|saving|placement)",
                r"(?:portefeuille|portfolio).*(?:investment|investissement)",
            ],
            0.2,
        ),
        entry(
            Intent::AccountManagement,
            &["compte", "account", "ouvrir", "fermer", "créer"],
            &[
                r"(?:ouvrir|créer|fermer).*compte",
                r"(?:nouveau|new).*compte",
                r"(?:gestion|management).*compte",
            ],
            0.1,
        ),
    ]
});

static ACCOUNT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{10,12}\b").expect("account id pattern"));

static ACCOUNT_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(compte courant|compte épargne|checking|savings|épargne|courant|livret)\b")
        .expect("account type pattern")
});

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+(?:[.,]\d{1,2})?\s*(?:€|euros?|dollars?|\$)?").expect("amount pattern")
});

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Classify one raw user message.
///
/// Commands short-circuit: "exit" quits even if the rest of the session was
/// about transfers.
pub fn classify(text: &str) -> Classification {
    if let Some(cmd) = detect_command(text) {
        return Classification::Command(cmd);
    }
    Classification::Intent(classify_intent(text))
}

/// Check the small fixed command vocabulary.
pub fn detect_command(text: &str) -> Option<UserCommand> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    if EXIT_COMMANDS.contains(&lower.as_str()) {
        return Some(UserCommand::Exit);
    }
    if CLEAR_COMMANDS.contains(&lower.as_str()) {
        return Some(UserCommand::Clear);
    }
    if let Some(rest) = lower.strip_prefix("user ") {
        if !rest.trim().is_empty() {
            // Preserve the original casing of the user name
            return Some(UserCommand::SwitchUser(trimmed[5..].trim().to_string()));
        }
    }

    None
}

/// Score every intent in the catalog and return the best guess.
pub fn classify_intent(text: &str) -> IntentResult {
    let lower = text.trim().to_lowercase();
    let entities = extract_entities(&lower);

    let mut best: Option<(Intent, f64)> = None;

    for entry in CATALOG.iter() {
        let keyword_hits = entry.keywords.iter().filter(|k| lower.contains(*k)).count();
        let pattern_hits = entry.patterns.iter().filter(|p| p.is_match(&lower)).count();

        let mut score = keyword_hits as f64 * KEYWORD_WEIGHT + pattern_hits as f64 * PATTERN_WEIGHT;
        if score > 0.0 {
            score += entry.confidence_boost;
        }

        // Strictly greater: ties keep the earlier catalog entry
        match best {
            Some((_, s)) if score <= s => {}
            _ if score > 0.0 => best = Some((entry.intent, score)),
            _ => {}
        }
    }

    let (intent, confidence) = match best {
        Some((intent, score)) => (intent, score.min(MAX_CONFIDENCE)),
        None if entities.account_id.is_some() => {
            // A bare account number still implies the user wants account info
            (Intent::AccountInfo, IMPLIED_ACCOUNT_CONFIDENCE)
        }
        None => (Intent::Unknown, UNKNOWN_CONFIDENCE),
    };

    IntentResult {
        intent,
        confidence,
        entities,
        method: MergeMethod::Base,
        alternative: None,
    }
}

/// Extract account id / account type / amount, independent of scoring.
pub fn extract_entities(text: &str) -> ExtractedEntities {
    let lower = text.to_lowercase();

    let account_id = ACCOUNT_ID_RE.find(&lower).map(|m| m.as_str().to_string());
    let account_type = ACCOUNT_TYPE_RE
        .find(&lower)
        .map(|m| m.as_str().to_string());

    // Account-number-shaped tokens are not amounts
    let amount = AMOUNT_RE
        .find_iter(&lower)
        .filter(|m| {
            let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
            !(m.as_str().trim() == digits && (10..=12).contains(&digits.len()))
        })
        .find_map(|m| Amount::parse_user_input(m.as_str()));

    ExtractedEntities {
        account_id,
        account_type,
        amount,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_detection_short_circuits() {
        // Banking keywords in the same message must not matter for commands
        assert_eq!(detect_command("exit"), Some(UserCommand::Exit));
        assert_eq!(detect_command("  QUIT  "), Some(UserCommand::Exit));
        assert_eq!(detect_command("clear"), Some(UserCommand::Clear));
        assert_eq!(
            detect_command("user Alice"),
            Some(UserCommand::SwitchUser("Alice".to_string()))
        );

        match classify("exit") {
            Classification::Command(UserCommand::Exit) => {}
            other => panic!("expected exit command, got {:?}", other),
        }
    }

    #[test]
    fn test_command_is_exact_match_only() {
        // "exit" buried in a sentence is not a command
        assert_eq!(detect_command("how do I exit my savings plan"), None);
        assert_eq!(detect_command("user "), None);
    }

    #[test]
    fn test_balance_inquiry_french() {
        let result = classify_intent("Quel est mon solde ?");
        assert_eq!(result.intent, Intent::BalanceInquiry);
        assert!(result.confidence > 0.0);
        assert_eq!(result.method, MergeMethod::Base);
    }

    #[test]
    fn test_transfer_intent_with_amount() {
        let result = classify_intent("Je veux virer 100€ vers mon compte épargne");
        assert_eq!(result.intent, Intent::Transfer);
        assert!(result.confidence > 0.5);
        assert_eq!(result.entities.amount, Some(Amount::from_major(100)));
        assert_eq!(result.entities.account_type.as_deref(), Some("compte épargne"));
    }

    #[test]
    fn test_history_intent() {
        let result = classify_intent("montre moi l'historique de mon compte");
        assert_eq!(result.intent, Intent::TransactionHistory);
    }

    #[test]
    fn test_bare_account_number_defaults_to_account_info() {
        let result = classify_intent("1234567890");
        assert_eq!(result.intent, Intent::AccountInfo);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.entities.account_id.as_deref(), Some("1234567890"));
    }

    #[test]
    fn test_unknown_intent() {
        let result = classify_intent("what a lovely day");
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.2);
    }

    #[test]
    fn test_confidence_capped() {
        // Pile up keywords and patterns well past the cap
        let result =
            classify_intent("virement transfer virer envoyer transférer 100 euros virement");
        assert_eq!(result.intent, Intent::Transfer);
        assert!(result.confidence <= 0.95);
    }

    #[test]
    fn test_entity_extraction_is_independent() {
        let result = classify_intent("blah 1111111111 blah");
        assert_eq!(result.entities.account_id.as_deref(), Some("1111111111"));
        // The 10-digit token is an account number, never an amount
        assert_eq!(result.entities.amount, None);
    }

    #[test]
    fn test_amount_extraction_first_numeric_token() {
        let e = extract_entities("virer 250,50€ de 1111111111 vers 2222222222");
        assert_eq!(e.amount, Some(Amount::from_minor(25050)));
        assert_eq!(e.account_id.as_deref(), Some("1111111111"));
    }
}
