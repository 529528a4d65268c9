//! Batch-level summaries over classified records.

use crate::amount::Amount;
use crate::engine::ClassificationResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Count and signed amount total of a group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub count: usize,
    pub amount: Amount,
}

impl Tally {
    fn add(&mut self, amount: Option<Amount>) {
        self.count += 1;
        if let Some(amount) = amount {
            self.amount += amount;
        }
    }
}

/// Distribution and success-rate summary of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_rows: usize,
    pub classified_count: usize,
    pub uncertain_count: usize,
    pub failed_count: usize,
    pub success_rate: f64,
    pub avg_confidence: f64,
    pub by_category: BTreeMap<String, Tally>,
    pub by_subcategory: BTreeMap<String, Tally>,
    pub account_distribution: BTreeMap<String, Tally>,
    /// Uncertain and failed records.
    pub unclassified: Tally,
}

/// Tallies the `classified` results by category, subcategory and account.
///
/// Uncertain and failed results only feed the `unclassified` tally.
pub fn generate_statistics(
    total_rows: usize,
    classified: &[ClassificationResult],
    uncertain: &[ClassificationResult],
    failed: &[ClassificationResult],
) -> Statistics {
    let mut stats = Statistics {
        total_rows,
        classified_count: classified.len(),
        uncertain_count: uncertain.len(),
        failed_count: failed.len(),
        ..Default::default()
    };

    for result in classified {
        let amount = result.amount();
        if let Some(category) = result.category {
            stats
                .by_category
                .entry(category.to_string())
                .or_default()
                .add(amount);
        }
        if let Some(subcategory) = &result.subcategory {
            stats
                .by_subcategory
                .entry(subcategory.clone())
                .or_default()
                .add(amount);
        }
        if let Some(account) = &result.account {
            stats
                .account_distribution
                .entry(account.clone())
                .or_default()
                .add(amount);
        }
    }

    for result in uncertain.iter().chain(failed) {
        stats.unclassified.add(result.amount());
    }

    if total_rows > 0 {
        stats.success_rate = classified.len() as f64 / total_rows as f64;
    }
    if !classified.is_empty() {
        stats.avg_confidence =
            classified.iter().map(|r| r.confidence).sum::<f64>() / classified.len() as f64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ClassifierEngine;
    use serde_json::json;

    #[test]
    fn test_distribution_counts_and_amounts() {
        let engine = ClassifierEngine::with_defaults().unwrap();
        let batch = engine.classify_transactions(&[
            json!({"날짜": "2024-01-25", "항목": "직원 급여", "금액": -3000000, "거래처": "내부"}),
            json!({"날짜": "2024-02-25", "항목": "직원 급여", "금액": "-2,500,000", "거래처": "내부"}),
            json!({"날짜": "2024-01-15", "항목": "의약품 구입", "금액": -200000, "거래처": "한국제약"}),
        ]);
        let stats = &batch.statistics;

        let payroll = stats.account_distribution["급여"];
        assert_eq!(payroll.count, 2);
        assert_eq!(payroll.amount, Amount::from_whole(-5_500_000));

        assert_eq!(stats.account_distribution["의약품비"].count, 1);
        assert_eq!(stats.by_category["expense"].count, 3);
        assert_eq!(stats.by_category["expense"].amount, Amount::from_whole(-5_700_000));
        assert_eq!(stats.by_subcategory["인건비"].count, 2);
        assert_eq!(stats.by_subcategory["재료비"].count, 1);
        assert_eq!(stats.success_rate, 1.0);
        assert_eq!(stats.unclassified.count, 0);
    }

    #[test]
    fn test_unclassified_and_rates() {
        let engine = ClassifierEngine::with_defaults().unwrap();
        let batch = engine.classify_transactions(&[
            json!({"날짜": "2024-01-25", "항목": "직원 급여", "금액": -3000000, "거래처": "내부"}),
            json!({"날짜": "2024-01-25", "항목": "알수없는내역", "금액": -1000}),
            json!(null),
            json!({"금액": 0}),
        ]);
        let stats = &batch.statistics;

        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.classified_count, 1);
        assert_eq!(stats.failed_count, 3);
        assert_eq!(stats.success_rate, 0.25);
        assert_eq!(stats.avg_confidence, 1.0);
        assert_eq!(stats.unclassified.count, 3);
        assert_eq!(stats.unclassified.amount, Amount::from_whole(-1000));
    }

    #[test]
    fn test_empty_batch() {
        let stats = generate_statistics(0, &[], &[], &[]);
        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_confidence, 0.0);
        assert!(stats.account_distribution.is_empty());
    }
}
