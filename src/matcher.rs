//! Confidence scoring of one record against one account subject.
//!
//! The score is the sum of three independent parts, clamped to 1.0:
//! a fixed weight per rule that holds, a weight scaled by keyword overlap,
//! and a bonus when the record's type lines up with the subject's category.

use crate::catalog::{AccountSubject, Rule};
use crate::record::{TransactionRecord, TransactionType};
use serde::Serialize;

/// Added for every rule of the subject that holds against the record.
pub const RULE_HIT_WEIGHT: f64 = 0.3;

/// Multiplied by the fraction of record tokens that match a subject keyword.
pub const KEYWORD_WEIGHT: f64 = 0.4;

/// Added when the transaction type matches the subject's category.
pub const ALIGNMENT_BONUS: f64 = 0.2;

/// Rounds to four decimals so bucket boundaries compare as written
/// (0.3 + 0.3 + 0.2 is exactly 0.8).
pub fn round_confidence(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Score of a record against a single subject, with the rules that fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub confidence: f64,
    pub matched_rules: Vec<Rule>,
}

/// Scores `record` against `account`. The result is always within `[0, 1]`.
pub fn score(
    record: &TransactionRecord,
    account: &AccountSubject,
    tx_type: TransactionType,
) -> RuleMatch {
    let matched_rules: Vec<Rule> = account
        .rules
        .iter()
        .filter(|rule| rule_holds(rule, record))
        .cloned()
        .collect();

    let rule_part = matched_rules.len() as f64 * RULE_HIT_WEIGHT;
    let keyword_part = keyword_overlap(record, &account.keywords) * KEYWORD_WEIGHT;
    let alignment_part = if tx_type.category() == account.category {
        ALIGNMENT_BONUS
    } else {
        0.0
    };

    RuleMatch {
        confidence: round_confidence((rule_part + keyword_part + alignment_part).min(1.0)),
        matched_rules,
    }
}

/// Evaluates a single rule against a record.
pub fn rule_holds(rule: &Rule, record: &TransactionRecord) -> bool {
    let patient_type = record.patient_type.as_deref();
    let item = record.item.as_deref();
    let vendor = record.vendor.as_deref();

    match rule {
        Rule::PatientType(value) => patient_type == Some(value.as_str()),
        Rule::InsuranceType(value) => match patient_type {
            Some(field) if !value.is_empty() && !field.is_empty() => {
                field.contains(value.as_str()) || value.contains(field)
            }
            _ => false,
        },
        Rule::Department(value) => record.department.as_deref() == Some(value.as_str()),
        Rule::ServiceType(value) | Rule::ItemCategory(value) | Rule::ExpenseType(value) => {
            contains(item, value)
        }
        Rule::VendorType(value) | Rule::Vendor(value) => contains(vendor, value),
        Rule::NoInsurance(enabled) => *enabled && patient_type.map_or(true, str::is_empty),
        Rule::Default(enabled) => *enabled,
    }
}

fn contains(field: Option<&str>, value: &str) -> bool {
    !value.is_empty() && field.map_or(false, |f| f.contains(value))
}

/// Fraction of the record's tokens (longer than one character) that match a
/// keyword, case-insensitively, with containment in either direction.
pub fn keyword_overlap(record: &TransactionRecord, keywords: &[String]) -> f64 {
    let text = record.search_text().to_lowercase();
    let tokens: Vec<&str> = text
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .collect();
    if tokens.is_empty() {
        return 0.0;
    }

    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let hits = tokens
        .iter()
        .filter(|token| {
            keywords
                .iter()
                .any(|kw| token.contains(kw.as_str()) || kw.contains(**token))
        })
        .count();

    hits as f64 / tokens.len() as f64
}
