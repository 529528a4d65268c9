//! Ledger Classifier CLI
//!
//! Reads ledger rows from a CSV or JSON file, classifies them and writes the
//! per-row outcome to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ledger.csv > classified.csv
//! cargo run -- ledger.json --threshold 0.75 --json
//! ```
//!
//! # Options
//!
//! - `--catalog <file>`: JSON rule catalog replacing the built-in one
//! - `--threshold <value>`: starting confidence threshold (clamped to 0.6..=0.9)
//! - `--accuracy <value>`: apply one accuracy feedback step before classifying
//! - `--json`: print the full batch result as JSON instead of the CSV report
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `info` to control logging verbosity

use ledger_classifier::{
    read_csv_records, read_json_records, AccuracyFeedback, ClassifierEngine, ClassifierError,
    EngineConfig, Result, RuleCatalog,
};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Options {
    input: String,
    catalog: Option<String>,
    threshold: Option<f64>,
    accuracy: Option<f64>,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut input = None;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalog" => options.catalog = Some(flag_value(&mut iter, arg)?.to_string()),
            "--threshold" => {
                options.threshold = Some(parse_number(flag_value(&mut iter, arg)?, arg)?)
            }
            "--accuracy" => {
                options.accuracy = Some(parse_number(flag_value(&mut iter, arg)?, arg)?)
            }
            "--json" => options.json = true,
            other if other.starts_with("--") => {
                return Err(ClassifierError::InvalidArgument(format!("unknown option {}", other)))
            }
            other => input = Some(other.to_string()),
        }
    }

    options.input = input.ok_or(ClassifierError::MissingArgument)?;
    Ok(options)
}

fn flag_value<'a, I: Iterator<Item = &'a String>>(iter: &mut I, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| ClassifierError::InvalidArgument(format!("{} needs a value", flag)))
}

fn parse_number(value: &str, flag: &str) -> Result<f64> {
    value.parse().map_err(|_| {
        ClassifierError::InvalidArgument(format!("{} expects a number, got {}", flag, value))
    })
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args)?;

    let catalog = match &options.catalog {
        Some(path) => RuleCatalog::from_json_file(path)?,
        None => RuleCatalog::hospital_default(),
    };
    let mut config = EngineConfig::default();
    if let Some(threshold) = options.threshold {
        config.initial_threshold = threshold;
    }
    let engine = ClassifierEngine::new(catalog, config)?;

    if let Some(accuracy) = options.accuracy {
        engine.adjust_confidence_threshold(AccuracyFeedback { accuracy });
    }

    let file = File::open(&options.input)?;
    let reader = BufReader::new(file);
    let is_json = Path::new(&options.input)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    let records = if is_json {
        read_json_records(reader)?
    } else {
        read_csv_records(reader)?
    };

    let batch = engine.classify_transactions(&records);

    let stdout = io::stdout();
    let handle = stdout.lock();
    if options.json {
        batch.write_json(handle)?;
    } else {
        batch.write_csv_report(handle)?;
    }

    Ok(())
}
