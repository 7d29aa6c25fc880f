// 🔀 Intent Merge Engine - consensus / override / base / fallback
//
// Combines the rule-based classification with the preference-derived
// prediction. A confident rule match can only be displaced by an even
// more confident personalization signal; with two weak guesses the
// better one still wins instead of surfacing "unknown".

use crate::classifier::{Intent, IntentResult, MergeMethod};
use crate::preferences::Prediction;

/// Confidence above which one side may decide the merge on its own.
const STRONG_SIGNAL: f64 = 0.7;
/// Bonus applied when both sides agree.
const CONSENSUS_BONUS: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;

/// Merge policy, evaluated in this exact order:
/// 1. consensus - same intent on both sides
/// 2. override - preference prediction above 0.7
/// 3. base - rule classification above 0.7
/// 4. fallback - better of two weak guesses (tie goes to the base)
pub fn merge(base: IntentResult, predicted: &Prediction) -> IntentResult {
    if base.intent == predicted.primary_intent {
        let confidence =
            ((base.confidence + predicted.confidence) / 2.0 + CONSENSUS_BONUS).min(MAX_CONFIDENCE);
        return IntentResult {
            confidence,
            method: MergeMethod::Consensus,
            alternative: None,
            ..base
        };
    }

    if predicted.confidence > STRONG_SIGNAL {
        return IntentResult {
            intent: predicted.primary_intent,
            confidence: predicted.confidence,
            method: MergeMethod::Override,
            alternative: Some((base.intent, base.confidence)),
            ..base
        };
    }

    if base.confidence > STRONG_SIGNAL {
        return IntentResult {
            method: MergeMethod::Base,
            alternative: Some((predicted.primary_intent, predicted.confidence)),
            ..base
        };
    }

    if base.confidence >= predicted.confidence {
        IntentResult {
            method: MergeMethod::Fallback,
            alternative: Some((predicted.primary_intent, predicted.confidence)),
            ..base
        }
    } else {
        IntentResult {
            intent: predicted.primary_intent,
            confidence: predicted.confidence,
            method: MergeMethod::Fallback,
            alternative: Some((base.intent, base.confidence)),
            ..base
        }
    }
}

/// Prediction for a user the system knows nothing about.
pub fn empty_prediction() -> Prediction {
    Prediction {
        primary_intent: Intent::Unknown,
        confidence: 0.0,
        suggested_actions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ExtractedEntities;

    fn base(intent: Intent, confidence: f64) -> IntentResult {
        IntentResult {
            intent,
            confidence,
            entities: ExtractedEntities::default(),
            method: MergeMethod::Base,
            alternative: None,
        }
    }

    fn predicted(intent: Intent, confidence: f64) -> Prediction {
        Prediction {
            primary_intent: intent,
            confidence,
            suggested_actions: Vec::new(),
        }
    }

    #[test]
    fn test_consensus_boosts_confidence() {
        let result = merge(
            base(Intent::Transfer, 0.6),
            &predicted(Intent::Transfer, 0.8),
        );
        assert_eq!(result.intent, Intent::Transfer);
        assert_eq!(result.method, MergeMethod::Consensus);
        // (0.6 + 0.8) / 2 + 0.1 = 0.8
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_consensus_capped_at_095() {
        let result = merge(
            base(Intent::BalanceInquiry, 0.95),
            &predicted(Intent::BalanceInquiry, 0.95),
        );
        assert!(result.confidence <= 0.95);
    }

    #[test]
    fn test_strong_base_wins_over_weak_prediction() {
        // base 0.9 / intent X, predicted 0.5 / intent Y -> base wins
        let result = merge(
            base(Intent::BalanceInquiry, 0.9),
            &predicted(Intent::Transfer, 0.5),
        );
        assert_eq!(result.method, MergeMethod::Base);
        assert_eq!(result.intent, Intent::BalanceInquiry);
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_strong_prediction_overrides_weak_base() {
        // base 0.4 / intent X, predicted 0.85 / intent Y -> override
        let result = merge(
            base(Intent::BalanceInquiry, 0.4),
            &predicted(Intent::Transfer, 0.85),
        );
        assert_eq!(result.method, MergeMethod::Override);
        assert_eq!(result.intent, Intent::Transfer);
        assert!((result.confidence - 0.85).abs() < 1e-9);
        assert_eq!(result.alternative, Some((Intent::BalanceInquiry, 0.4)));
    }

    #[test]
    fn test_fallback_keeps_the_better_weak_guess() {
        let result = merge(
            base(Intent::AccountInfo, 0.3),
            &predicted(Intent::Investment, 0.5),
        );
        assert_eq!(result.method, MergeMethod::Fallback);
        assert_eq!(result.intent, Intent::Investment);
        assert_eq!(result.alternative, Some((Intent::AccountInfo, 0.3)));
    }

    #[test]
    fn test_fallback_tie_goes_to_base() {
        let result = merge(
            base(Intent::AccountInfo, 0.4),
            &predicted(Intent::Investment, 0.4),
        );
        assert_eq!(result.method, MergeMethod::Fallback);
        assert_eq!(result.intent, Intent::AccountInfo);
    }

    #[test]
    fn test_override_happens_before_base_check() {
        // Both strong but mismatched: prediction is checked first
        let result = merge(
            base(Intent::BalanceInquiry, 0.8),
            &predicted(Intent::Transfer, 0.9),
        );
        assert_eq!(result.method, MergeMethod::Override);
        assert_eq!(result.intent, Intent::Transfer);
    }

    #[test]
    fn test_empty_prediction_never_overrides() {
        let result = merge(base(Intent::BalanceInquiry, 0.3), &empty_prediction());
        assert_eq!(result.method, MergeMethod::Fallback);
        assert_eq!(result.intent, Intent::BalanceInquiry);
    }
}
