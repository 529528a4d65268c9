//! Pre-scoring checks on a normalized record.

use crate::error::RecordError;
use crate::record::{RecordDate, TransactionRecord};

/// Outcome of [`validate`]. Warnings never make a record invalid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<RecordError>,
    pub warnings: Vec<String>,
}

/// Item, amount and a real date are required; vendor and department are not.
pub fn validate(record: &TransactionRecord) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if record.item.is_none() {
        errors.push(RecordError::MissingField("item"));
    }

    if record.amount.is_none() {
        match &record.unparsed_amount {
            Some(raw) => errors.push(RecordError::InvalidField {
                field: "amount",
                value: raw.clone(),
            }),
            None => errors.push(RecordError::MissingField("amount")),
        }
    }

    match &record.date {
        None => errors.push(RecordError::MissingField("date")),
        Some(date) if date.parse().is_none() => errors.push(RecordError::InvalidField {
            field: "date",
            value: match date {
                RecordDate::Text(s) => s.clone(),
                RecordDate::Timestamp(ms) => ms.to_string(),
            },
        }),
        Some(_) => {}
    }

    if record.vendor.is_none() {
        warnings.push("missing vendor".to_string());
    }
    if record.department.is_none() {
        warnings.push("missing department".to_string());
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
