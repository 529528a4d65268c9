//! Edge case tests for the classification engine.
//!
//! Drives the public library API with the kinds of rows a real ledger export
//! produces, including broken ones.

use ledger_classifier::{
    determine_transaction_type, AccountSubject, AccuracyFeedback, Amount, Bucket, Category,
    ClassifierEngine, ClassifierError, EngineConfig, RecordError, Rule, RuleCatalog,
    TransactionRecord, TransactionType,
};
use serde_json::{json, Value};

fn engine() -> ClassifierEngine {
    ClassifierEngine::with_defaults().unwrap()
}

/// A mixed batch whose scores spread over the whole confidence range.
fn mixed_batch() -> Vec<Value> {
    vec![
        json!({"날짜": "2024-01-15", "보험유형": "건강보험", "금액": 50000, "항목": "외래진료비"}),
        json!({"날짜": "2024-01-15", "항목": "의약품 구입", "금액": -200000, "거래처": "한국제약"}),
        json!({"날짜": "2024-01-25", "항목": "직원 급여", "금액": -3000000, "거래처": "내부"}),
        json!({"날짜": "2024-01-31", "항목": "전기 요금", "금액": -450000, "거래처": "한국전력공사"}),
        json!({"날짜": "2024-02-01", "항목": "기타 지출", "금액": -1000}),
        json!({"날짜": "2024-02-01", "항목": "기타 잡수입", "금액": 2000}),
        json!({"날짜": "2024-02-02", "항목": "진료 소모품", "금액": -30000}),
        json!({"날짜": "2024-02-03", "항목": "알수없는내역", "금액": -1000}),
        json!({"날짜": "2024-02-03", "항목": "혈액검사", "금액": 40000, "환자유형": "일반"}),
    ]
}

// ==================== CONCRETE SCENARIOS ====================

#[test]
fn test_health_insurance_outpatient_fee() {
    let result = engine().classify_one(&json!({
        "날짜": "2024-01-15",
        "보험유형": "건강보험",
        "금액": 50000,
        "항목": "외래진료비"
    }));

    assert_eq!(result.account.as_deref(), Some("건보수익"));
    assert!(result.confidence > 0.8);
    assert_eq!(result.bucket, Bucket::Classified);
}

#[test]
fn test_drug_purchase() {
    let result = engine().classify_one(&json!({
        "날짜": "2024-01-15",
        "항목": "의약품 구입",
        "금액": -200000,
        "거래처": "한국제약"
    }));

    assert_eq!(result.account.as_deref(), Some("의약품비"));
    assert!(result.confidence > 0.8);
    assert_eq!(result.category, Some(Category::Expense));
}

#[test]
fn test_staff_payroll() {
    let result = engine().classify_one(&json!({
        "날짜": "2024-01-25",
        "항목": "직원 급여",
        "금액": -3000000,
        "거래처": "내부"
    }));

    assert_eq!(result.account.as_deref(), Some("급여"));
    assert!(result.confidence > 0.9);
}

#[test]
fn test_zero_amount_only() {
    let result = engine().classify_one(&json!({"금액": 0}));

    assert_eq!(result.bucket, Bucket::Failed);
    assert!(result.errors.iter().any(|e| e.contains("zero amount")));
}

// ==================== TYPE DETERMINATION ====================

#[test]
fn test_transaction_type_follows_sign() {
    let record = |units: i64| TransactionRecord {
        amount: Some(Amount::from_whole(units)),
        ..Default::default()
    };

    assert_eq!(determine_transaction_type(&record(1)), Ok(TransactionType::Revenue));
    assert_eq!(determine_transaction_type(&record(-1)), Ok(TransactionType::Expense));
    assert_eq!(determine_transaction_type(&record(0)), Err(RecordError::ZeroAmount));
}

#[test]
fn test_zero_written_as_string_is_zero() {
    let result = engine().classify_one(&json!({
        "날짜": "2024-01-15",
        "항목": "외래진료비",
        "금액": " 0 "
    }));
    assert_eq!(result.errors, vec!["zero amount"]);
}

// ==================== MALFORMED INPUT ====================

#[test]
fn test_empty_batch() {
    let batch = engine().classify_transactions(&[]);

    assert_eq!(batch.total_rows, 0);
    assert!(batch.classified.is_empty());
    assert!(batch.uncertain.is_empty());
    assert!(batch.failed.is_empty());
    assert_eq!(batch.statistics.success_rate, 0.0);
}

#[test]
fn test_malformed_rows_all_fail_without_panicking() {
    let records = vec![
        Value::Null,
        json!({}),
        json!({"날짜": "2024-99-99", "항목": "의약품 구입", "금액": "많음"}),
        json!("just a string"),
        json!([{"금액": 100}]),
    ];

    let batch = engine().classify_transactions(&records);

    assert_eq!(batch.total_rows, 5);
    assert_eq!(batch.failed.len(), 5);
    assert!(batch.failed.iter().all(|r| !r.errors.is_empty()));

    let bad_fields = &batch.failed[2].errors;
    assert!(bad_fields.contains(&"invalid amount: 많음".to_string()));
    assert!(bad_fields.contains(&"invalid date: 2024-99-99".to_string()));
}

#[test]
fn test_failed_rows_keep_original_record() {
    let raw = json!({"unrelated": "column"});
    let result = engine().classify_one(&raw);

    assert_eq!(result.bucket, Bucket::Failed);
    assert_eq!(result.record, raw);
    assert_eq!(result.errors, vec!["malformed record: no recognizable fields"]);
}

#[test]
fn test_missing_required_fields_are_itemized() {
    let result = engine().classify_one(&json!({"거래처": "한국제약"}));

    assert_eq!(
        result.errors,
        vec!["missing item", "missing amount", "missing date"]
    );
}

#[test]
fn test_missing_optional_fields_only_warn() {
    let result = engine().classify_one(&json!({
        "날짜": "2024-01-25",
        "항목": "직원 급여",
        "금액": -3000000
    }));

    assert_ne!(result.bucket, Bucket::Failed);
    assert!(result.warnings.contains(&"missing vendor".to_string()));
    assert!(result.warnings.contains(&"missing department".to_string()));
}

#[test]
fn test_english_column_names() {
    let result = engine().classify_one(&json!({
        "date": "2024-01-15",
        "description": "의약품 구입",
        "amount": "-200,000",
        "supplier": "한국제약"
    }));

    assert_eq!(result.account.as_deref(), Some("의약품비"));
}

// ==================== CONFIDENCE ====================

#[test]
fn test_confidence_always_within_unit_interval() {
    let batch = engine().classify_transactions(&mixed_batch());

    for result in batch.in_input_order() {
        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "row {} confidence {}",
            result.row,
            result.confidence
        );
    }
}

#[test]
fn test_catch_all_scores_at_least_alignment_bonus() {
    let engine = engine();
    let record = TransactionRecord {
        item: Some("분류 불가".to_string()),
        ..Default::default()
    };

    for tx_type in [TransactionType::Revenue, TransactionType::Expense] {
        let catch_all = engine
            .catalog()
            .candidates(tx_type.category())
            .find(|s| s.is_catch_all())
            .unwrap();
        let m = ledger_classifier::matcher::score(&record, catch_all, tx_type);
        assert!(m.confidence >= 0.2);
    }
}

#[test]
fn test_procedure_bonus_lifts_revenue() {
    // 일반수익: patient_type 0.3 + no keyword + alignment 0.2 = 0.5, then +0.1
    let result = engine().classify_one(&json!({
        "날짜": "2024-02-03",
        "항목": "혈액검사",
        "금액": 40000,
        "환자유형": "일반"
    }));

    assert_eq!(result.bucket, Bucket::Uncertain);
    assert_eq!(result.account.as_deref(), Some("일반수익"));
    assert!((result.confidence - 0.6).abs() < 1e-9);
}

// ==================== THRESHOLD ====================

#[test]
fn test_raising_threshold_never_grows_classified() {
    let records = mixed_batch();
    let engine = engine();

    let mut previous = usize::MAX;
    for step in 0..=6 {
        let threshold = 0.6 + step as f64 * 0.05;
        engine.set_confidence_threshold(threshold);
        let classified = engine.classify_transactions(&records).classified.len();
        assert!(
            classified <= previous,
            "threshold {} classified {} > {}",
            threshold,
            classified,
            previous
        );
        previous = classified;
    }
}

#[test]
fn test_threshold_feedback_is_clamped() {
    let engine = engine();

    for _ in 0..50 {
        let t = engine.adjust_confidence_threshold(AccuracyFeedback { accuracy: 1.0 });
        assert!((0.6..=0.9).contains(&t));
    }
    assert_eq!(engine.confidence_threshold(), 0.6);

    for _ in 0..50 {
        let t = engine.adjust_confidence_threshold(AccuracyFeedback { accuracy: 0.0 });
        assert!((0.6..=0.9).contains(&t));
    }
    assert_eq!(engine.confidence_threshold(), 0.9);
}

#[test]
fn test_initial_threshold_is_clamped() {
    let config = EngineConfig {
        initial_threshold: 0.99,
        ..Default::default()
    };
    let engine = ClassifierEngine::new(RuleCatalog::hospital_default(), config).unwrap();
    assert_eq!(engine.confidence_threshold(), 0.9);
}

#[test]
fn test_engine_is_shareable_across_threads() {
    use std::sync::Arc;
    use std::thread;

    let engine = Arc::new(engine());
    let records = Arc::new(mixed_batch());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let records = Arc::clone(&records);
            thread::spawn(move || engine.classify_transactions(&records).total_rows)
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), records.len());
    }
}

// ==================== CATALOG ====================

#[test]
fn test_catalog_without_catch_all_is_fatal() {
    let catalog = RuleCatalog::new(vec![AccountSubject::new(
        "E1",
        "의약품비",
        Category::Expense,
        "재료비",
    )
    .with_rule(Rule::ItemCategory("의약품".to_string()))]);

    let err = ClassifierEngine::new(catalog, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, ClassifierError::Configuration(_)));
}

#[test]
fn test_inactive_subject_is_never_chosen() {
    let catalog = RuleCatalog::new(vec![
        AccountSubject::new("E1", "의약품비", Category::Expense, "재료비")
            .with_keywords(&["의약품"])
            .with_rule(Rule::ItemCategory("의약품".to_string()))
            .inactive(),
        AccountSubject::new("E9", "기타비용", Category::Expense, "")
            .with_rule(Rule::Default(true)),
    ]);
    let engine = ClassifierEngine::new(catalog, EngineConfig::default()).unwrap();
    engine.set_confidence_threshold(0.6);

    let result = engine.classify_one(&json!({
        "날짜": "2024-01-15",
        "항목": "의약품",
        "금액": -1000
    }));
    assert_eq!(result.account.as_deref(), Some("기타비용"));
}

// ==================== STATISTICS ====================

#[test]
fn test_statistics_for_repeated_account() {
    let batch = engine().classify_transactions(&[
        json!({"날짜": "2024-01-15", "항목": "의약품 구입", "금액": -200000, "거래처": "한국제약"}),
        json!({"날짜": "2024-01-20", "항목": "의약품 구입", "금액": -150000, "거래처": "한국제약"}),
        json!({"날짜": "2024-01-25", "항목": "직원 급여", "금액": -3000000, "거래처": "내부"}),
    ]);

    let drugs = batch.statistics.account_distribution["의약품비"];
    assert_eq!(drugs.count, 2);
    assert_eq!(drugs.amount, Amount::from_whole(-350_000));
    assert_eq!(batch.statistics.success_rate, 1.0);
}
