//! Normalized view of a raw ledger row.
//!
//! Raw rows arrive as JSON-style mappings whose keys may be Korean or English
//! column names. [`TransactionRecord::normalize`] probes each canonical field
//! through an ordered synonym list and coerces what it finds; a field that is
//! absent or has an unexpected shape simply stays `None`.

use crate::amount::Amount;
use crate::catalog::Category;
use crate::error::RecordError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

pub const DATE_KEYS: &[&str] = &[
    "날짜",
    "일자",
    "거래일자",
    "거래일",
    "date",
    "transactionDate",
    "transaction_date",
];
pub const ITEM_KEYS: &[&str] = &["항목", "내용", "적요", "품목", "item", "description"];
pub const AMOUNT_KEYS: &[&str] = &["금액", "amount", "거래금액"];
pub const VENDOR_KEYS: &[&str] = &["거래처", "거래처명", "업체", "vendor", "supplier"];
pub const DEPARTMENT_KEYS: &[&str] = &["부서", "진료과", "department", "dept"];
pub const PATIENT_TYPE_KEYS: &[&str] = &[
    "환자유형",
    "보험유형",
    "보험구분",
    "patientType",
    "patient_type",
    "insuranceType",
    "insurance_type",
];
pub const NOTE_KEYS: &[&str] = &["비고", "메모", "note", "memo"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%Y%m%d", "%Y. %m. %d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Date cell as it appeared in the row. Validity is checked by
/// [`crate::validation`], not during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordDate {
    Text(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
}

impl RecordDate {
    /// Interprets the date, returning `None` when it is not a real calendar date.
    pub fn parse(&self) -> Option<NaiveDate> {
        match self {
            RecordDate::Text(s) => {
                let s = s.trim();
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .or_else(|| {
                        DATETIME_FORMATS
                            .iter()
                            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                            .map(|dt| dt.date())
                    })
                    .or_else(|| {
                        DateTime::parse_from_rfc3339(s)
                            .ok()
                            .map(|dt| dt.date_naive())
                    })
            }
            RecordDate::Timestamp(ms) => {
                DateTime::from_timestamp_millis(*ms).map(|dt| dt.date_naive())
            }
        }
    }
}

/// Canonical fields extracted from a raw row. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub date: Option<RecordDate>,
    pub item: Option<String>,
    pub amount: Option<Amount>,
    pub vendor: Option<String>,
    pub department: Option<String>,
    pub patient_type: Option<String>,
    pub note: Option<String>,

    /// Raw text of an amount that was present but could not be parsed.
    #[serde(skip)]
    pub unparsed_amount: Option<String>,
}

impl TransactionRecord {
    /// Extracts the canonical fields from a raw row.
    ///
    /// Fails only when the row is not a mapping at all or when none of its
    /// keys is a known synonym.
    pub fn normalize(raw: &Value) -> Result<Self, RecordError> {
        let map = match raw {
            Value::Object(map) => map,
            Value::Null => return Err(RecordError::Malformed("null row".to_string())),
            other => {
                return Err(RecordError::Malformed(format!(
                    "expected a mapping, got {}",
                    json_kind(other)
                )))
            }
        };

        let recognized = [
            DATE_KEYS,
            ITEM_KEYS,
            AMOUNT_KEYS,
            VENDOR_KEYS,
            DEPARTMENT_KEYS,
            PATIENT_TYPE_KEYS,
            NOTE_KEYS,
        ]
        .iter()
        .any(|keys| keys.iter().any(|k| map.contains_key(*k)));
        if !recognized {
            return Err(RecordError::Malformed("no recognizable fields".to_string()));
        }

        let amount_cell = probe(map, AMOUNT_KEYS);
        let amount = amount_cell.and_then(Amount::from_value);
        let unparsed_amount = match (amount_cell, amount) {
            (Some(cell), None) => Some(cell_text(cell)),
            _ => None,
        };

        Ok(TransactionRecord {
            date: probe(map, DATE_KEYS).and_then(date_value),
            item: text_field(map, ITEM_KEYS),
            amount,
            vendor: text_field(map, VENDOR_KEYS),
            department: text_field(map, DEPARTMENT_KEYS),
            patient_type: text_field(map, PATIENT_TYPE_KEYS),
            note: text_field(map, NOTE_KEYS),
            unparsed_amount,
        })
    }

    /// Item, vendor, note and department joined by spaces, for keyword matching.
    pub fn search_text(&self) -> String {
        [&self.item, &self.vendor, &self.note, &self.department]
            .iter()
            .filter_map(|f| f.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// First synonym whose value is non-null and not a blank string.
fn probe<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| map.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match probe(map, keys)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn date_value(value: &Value) -> Option<RecordDate> {
    match value {
        Value::String(s) => Some(RecordDate::Text(s.trim().to_string())),
        Value::Number(n) => n.as_i64().map(RecordDate::Timestamp),
        _ => None,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Direction of money flow, derived from the amount's sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Revenue,
    Expense,
}

impl TransactionType {
    /// The catalog category a record of this type is routed to.
    pub fn category(&self) -> Category {
        match self {
            TransactionType::Revenue => Category::Revenue,
            TransactionType::Expense => Category::Expense,
        }
    }
}

/// Positive amounts are revenue, negative ones expense. Zero cannot be routed.
pub fn determine_transaction_type(
    record: &TransactionRecord,
) -> Result<TransactionType, RecordError> {
    let amount = record.amount.ok_or(RecordError::MissingField("amount"))?;
    if amount.is_zero() {
        Err(RecordError::ZeroAmount)
    } else if amount.is_positive() {
        Ok(TransactionType::Revenue)
    } else {
        Ok(TransactionType::Expense)
    }
}
