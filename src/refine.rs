//! Post-selection confidence adjustments.
//!
//! Applied to the best-scoring subject only. The tables below are the whole
//! heuristic; tune them here rather than in the engine.

use crate::amount::Amount;
use crate::matcher::round_confidence;
use crate::record::{TransactionRecord, TransactionType};

/// Item words that mark a billable medical procedure.
pub const PROCEDURE_KEYWORDS: &[&str] = &["검사", "처치", "수술"];

/// Bonus for revenue records whose item names a procedure.
pub const PROCEDURE_BONUS: f64 = 0.1;

/// `(minimum absolute amount, bonus)`, largest tier first. Only the first
/// matching tier applies.
pub const HIGH_VALUE_TIERS: &[(i64, f64)] = &[(10_000_000, 0.08), (1_000_000, 0.05)];

/// Returns `confidence` raised by the applicable bonuses, clamped to 1.0.
pub fn refine_classification(
    record: &TransactionRecord,
    tx_type: TransactionType,
    confidence: f64,
) -> f64 {
    let mut refined = confidence;

    if tx_type == TransactionType::Revenue {
        if let Some(item) = record.item.as_deref() {
            if PROCEDURE_KEYWORDS.iter().any(|kw| item.contains(kw)) {
                refined += PROCEDURE_BONUS;
            }
        }
    }

    if let Some(amount) = record.amount {
        refined += high_value_bonus(amount);
    }

    round_confidence(refined.min(1.0))
}

fn high_value_bonus(amount: Amount) -> f64 {
    let magnitude = amount.abs();
    HIGH_VALUE_TIERS
        .iter()
        .find(|(floor, _)| magnitude >= Amount::from_whole(*floor))
        .map_or(0.0, |(_, bonus)| *bonus)
}
