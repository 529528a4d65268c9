//! Classification engine.
//!
//! Drives each raw row through normalize, validate, type determination,
//! scoring against every candidate subject, refinement and bucketing, then
//! folds the whole batch into [`BatchResult`]. Rows are processed strictly in
//! input order; a bad row only ever affects its own result.

use crate::amount::Amount;
use crate::catalog::{AccountSubject, Category, Rule, RuleCatalog};
use crate::error::{ClassifierError, RecordError, Result};
use crate::matcher::{self, round_confidence, RuleMatch};
use crate::record::{determine_transaction_type, TransactionRecord, TransactionType};
use crate::refine::refine_classification;
use crate::statistics::{generate_statistics, Statistics};
use crate::threshold::{AccuracyFeedback, ConfidenceThreshold, DEFAULT_THRESHOLD};
use crate::validation::validate;
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::{Read, Write};
use std::time::Instant;

/// Distance below the threshold that still counts as `uncertain`.
pub const DEFAULT_UNCERTAIN_MARGIN: f64 = 0.2;

/// Tunable engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting confidence threshold, clamped into the allowed range.
    pub initial_threshold: f64,
    pub uncertain_margin: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_threshold: DEFAULT_THRESHOLD,
            uncertain_margin: DEFAULT_UNCERTAIN_MARGIN,
        }
    }
}

/// Terminal outcome of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Classified,
    Uncertain,
    Failed,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bucket::Classified => "classified",
            Bucket::Uncertain => "uncertain",
            Bucket::Failed => "failed",
        })
    }
}

/// Classification of a single input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// 0-based position in the input batch.
    pub row: usize,
    /// The row exactly as supplied.
    pub record: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<TransactionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    /// Name of the chosen subject; `None` for failed rows.
    pub account: Option<String>,
    pub account_code: Option<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub confidence: f64,
    pub matched_rules: Vec<Rule>,
    pub bucket: Bucket,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ClassificationResult {
    fn failed(row: usize, raw: &Value, errors: Vec<String>) -> Self {
        ClassificationResult {
            row,
            record: raw.clone(),
            normalized: None,
            transaction_type: None,
            account: None,
            account_code: None,
            category: None,
            subcategory: None,
            confidence: 0.0,
            matched_rules: Vec::new(),
            bucket: Bucket::Failed,
            errors,
            warnings: Vec::new(),
        }
    }

    /// Normalized amount, when the row had one.
    pub fn amount(&self) -> Option<Amount> {
        self.normalized.as_ref().and_then(|r| r.amount)
    }
}

/// Everything a batch call produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total_rows: usize,
    pub classified: Vec<ClassificationResult>,
    pub uncertain: Vec<ClassificationResult>,
    pub failed: Vec<ClassificationResult>,
    pub statistics: Statistics,
    pub processing_time_ms: u64,
}

impl BatchResult {
    /// All results merged back into input order.
    pub fn in_input_order(&self) -> Vec<&ClassificationResult> {
        let mut all: Vec<_> = self
            .classified
            .iter()
            .chain(&self.uncertain)
            .chain(&self.failed)
            .collect();
        all.sort_by_key(|r| r.row);
        all
    }

    /// Writes one CSV line per input row, in input order.
    pub fn write_csv_report<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["row", "bucket", "account", "category", "confidence", "errors"])?;

        for result in self.in_input_order() {
            csv_writer.write_record([
                result.row.to_string(),
                result.bucket.to_string(),
                result.account.clone().unwrap_or_default(),
                result.category.map(|c| c.to_string()).unwrap_or_default(),
                format!("{:.4}", result.confidence),
                result.errors.join("; "),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the whole batch as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// The classification engine.
///
/// Holds the read-only catalog and the shared threshold. All methods take
/// `&self`, so one engine can serve concurrent batches behind an `Arc`; each
/// record reads the threshold in effect when it is bucketed.
#[derive(Debug)]
pub struct ClassifierEngine {
    catalog: RuleCatalog,
    threshold: ConfidenceThreshold,
    uncertain_margin: f64,
}

impl ClassifierEngine {
    /// Creates an engine, rejecting an unusable catalog before any record is seen.
    pub fn new(catalog: RuleCatalog, config: EngineConfig) -> Result<Self> {
        catalog.validate()?;
        if !config.uncertain_margin.is_finite() || config.uncertain_margin < 0.0 {
            return Err(ClassifierError::Configuration(format!(
                "uncertain margin must be a non-negative number, got {}",
                config.uncertain_margin
            )));
        }

        let threshold = ConfidenceThreshold::new(config.initial_threshold);
        info!(
            "Classifier ready: {} subjects, threshold {:.2}",
            catalog.len(),
            threshold.get()
        );

        Ok(ClassifierEngine {
            catalog,
            threshold,
            uncertain_margin: config.uncertain_margin,
        })
    }

    /// Engine over the built-in hospital catalog with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(RuleCatalog::hospital_default(), EngineConfig::default())
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.threshold.get()
    }

    /// Sets the threshold directly, clamped. Returns the stored value.
    pub fn set_confidence_threshold(&self, value: f64) -> f64 {
        self.threshold.set(value)
    }

    /// Moves the threshold one step in response to accuracy feedback.
    pub fn adjust_confidence_threshold(&self, feedback: AccuracyFeedback) -> f64 {
        self.threshold.adjust(feedback)
    }

    /// Classifies a single raw row.
    pub fn classify_one(&self, raw: &Value) -> ClassificationResult {
        self.classify_row(0, raw)
    }

    /// Classifies every row. Never fails on bad rows; they land in `failed`.
    pub fn classify_transactions(&self, records: &[Value]) -> BatchResult {
        let started = Instant::now();

        let mut classified = Vec::new();
        let mut uncertain = Vec::new();
        let mut failed = Vec::new();

        for (row, raw) in records.iter().enumerate() {
            let result = self.classify_row(row, raw);
            match result.bucket {
                Bucket::Classified => classified.push(result),
                Bucket::Uncertain => uncertain.push(result),
                Bucket::Failed => failed.push(result),
            }
        }

        let statistics = generate_statistics(records.len(), &classified, &uncertain, &failed);
        let processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            "Classified {} rows: {} classified, {} uncertain, {} failed in {} ms",
            records.len(),
            classified.len(),
            uncertain.len(),
            failed.len(),
            processing_time_ms
        );

        BatchResult {
            total_rows: records.len(),
            classified,
            uncertain,
            failed,
            statistics,
            processing_time_ms,
        }
    }

    /// Highest-scoring active subject of the record's category.
    ///
    /// Ties go to the subject declared first in the catalog.
    pub fn best_match(
        &self,
        record: &TransactionRecord,
        tx_type: TransactionType,
    ) -> std::result::Result<(&AccountSubject, RuleMatch), RecordError> {
        let category = tx_type.category();
        let mut best: Option<(&AccountSubject, RuleMatch)> = None;

        for subject in self.catalog.candidates(category) {
            let candidate = matcher::score(record, subject, tx_type);
            let better = match &best {
                Some((_, current)) => candidate.confidence > current.confidence,
                None => true,
            };
            if better {
                best = Some((subject, candidate));
            }
        }

        best.ok_or(RecordError::NoCandidates(category))
    }

    fn classify_row(&self, row: usize, raw: &Value) -> ClassificationResult {
        let record = match TransactionRecord::normalize(raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Row {}: {}", row, e);
                return ClassificationResult::failed(row, raw, vec![e.to_string()]);
            }
        };

        let report = validate(&record);
        let tx_type = determine_transaction_type(&record);

        let mut errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        if let Err(RecordError::ZeroAmount) = tx_type {
            errors.push(RecordError::ZeroAmount.to_string());
        }

        let mut result = ClassificationResult::failed(row, raw, Vec::new());
        result.warnings = report.warnings;

        let tx_type = match tx_type {
            Ok(tx_type) if errors.is_empty() => tx_type,
            _ => {
                debug!("Row {}: rejected ({})", row, errors.join("; "));
                result.errors = errors;
                result.normalized = Some(record);
                return result;
            }
        };
        result.transaction_type = Some(tx_type);

        let (subject, matched) = match self.best_match(&record, tx_type) {
            Ok(best) => best,
            Err(e) => {
                warn!("Row {}: {}", row, e);
                result.errors = vec![e.to_string()];
                result.normalized = Some(record);
                return result;
            }
        };

        let confidence = refine_classification(&record, tx_type, matched.confidence);
        let threshold = self.threshold.get();
        let bucket = if confidence >= threshold {
            Bucket::Classified
        } else if confidence >= round_confidence(threshold - self.uncertain_margin) {
            Bucket::Uncertain
        } else {
            Bucket::Failed
        };

        debug!(
            "Row {}: {} -> {} ({:.3}, threshold {:.2}, {})",
            row, tx_type.category(), subject.name, confidence, threshold, bucket
        );

        result.confidence = confidence;
        result.bucket = bucket;
        result.normalized = Some(record);
        if bucket == Bucket::Failed {
            result.errors = vec![RecordError::NoConfidentMatch.to_string()];
        } else {
            result.account = Some(subject.name.clone());
            result.account_code = Some(subject.code.clone());
            result.category = Some(subject.category);
            result.subcategory = Some(subject.subcategory.clone());
            result.matched_rules = matched.matched_rules;
        }
        result
    }
}

/// Reads CSV rows as header-keyed mappings.
///
/// Cells are trimmed and empty cells left out. A row the CSV reader cannot
/// parse becomes `null` so it is still accounted for as a failed record.
pub fn read_csv_records<R: Read>(reader: R) -> Result<Vec<Value>> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for (row_idx, result) in csv_reader.records().enumerate() {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row

        match result {
            Ok(row) => {
                let map: Map<String, Value> = headers
                    .iter()
                    .zip(row.iter())
                    .filter(|(_, cell)| !cell.is_empty())
                    .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
                    .collect();
                records.push(Value::Object(map));
            }
            Err(e) => {
                warn!("Row {}: CSV parse error: {}", row_num, e);
                records.push(Value::Null);
            }
        }
    }

    Ok(records)
}

/// Reads a JSON array of records.
pub fn read_json_records<R: Read>(reader: R) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_reader(reader)?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(ClassifierError::InvalidInput(
            "expected a JSON array of records".to_string(),
        )),
    }
}
