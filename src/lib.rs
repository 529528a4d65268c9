//! # Ledger Classifier
//!
//! A rule-driven classifier that sorts hospital ledger entries into a fixed
//! taxonomy of account subjects (insurance revenue, drug expense, payroll, ...).
//!
//! ## Design Principles
//!
//! - **Rules as data**: the catalog is a list of value objects passed to the engine
//! - **Per-record failure**: bad rows are attributed, never batch-fatal
//! - **Bounded tuning**: the confidence threshold only moves in clamped steps
//! - **Deterministic**: same catalog, threshold and input order give the same result
//!
//! ## Example
//!
//! ```
//! use ledger_classifier::ClassifierEngine;
//! use serde_json::json;
//!
//! let engine = ClassifierEngine::with_defaults().unwrap();
//! let batch = engine.classify_transactions(&[json!({
//!     "날짜": "2024-01-25",
//!     "항목": "직원 급여",
//!     "금액": -3000000,
//!     "거래처": "내부"
//! })]);
//! assert_eq!(batch.classified[0].account.as_deref(), Some("급여"));
//! ```

pub mod amount;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod record;
pub mod refine;
pub mod statistics;
pub mod threshold;
pub mod validation;

pub use amount::Amount;
pub use catalog::{AccountSubject, Category, Rule, RuleCatalog};
pub use engine::{
    read_csv_records, read_json_records, BatchResult, Bucket, ClassificationResult,
    ClassifierEngine, EngineConfig,
};
pub use error::{ClassifierError, RecordError, Result};
pub use matcher::RuleMatch;
pub use record::{determine_transaction_type, RecordDate, TransactionRecord, TransactionType};
pub use statistics::{generate_statistics, Statistics, Tally};
pub use threshold::AccuracyFeedback;
pub use validation::{validate, ValidationReport};
