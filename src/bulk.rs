//! Bulk CSV upload
//!
//! Scores every row of an uploaded transaction file and records the
//! results in the history.

use crate::dataset::Dataset;
use crate::history::TransactionHistory;
use crate::prediction::{PredictionService, Predictor};
use crate::{DashboardError, TransactionForm};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "transaction_amount",
    "kyc_verified",
    "account_age_days",
    "channel",
    "timestamp",
];

/// Number of row errors kept in the result
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Summary of a processed upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUploadResult {
    pub upload_id: String,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub fraud_count: usize,
    pub legitimate_count: usize,
    pub offline_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
    pub processing_time_ms: f64,
}

impl BulkUploadResult {
    pub fn message(&self) -> String {
        format!(
            "Successfully processed {} transactions from CSV",
            self.processed_rows
        )
    }
}

/// Score every row of `dataset`. Fails only when required columns are
/// missing; bad rows are counted and skipped.
pub fn process_upload<S, R>(
    dataset: &Dataset,
    predictor: &mut Predictor<S, R>,
    history: &mut TransactionHistory,
) -> crate::Result<BulkUploadResult>
where
    S: PredictionService,
    R: Rng,
{
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| dataset.column_index(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::MissingColumns(missing));
    }

    let start = Instant::now();
    let mut result = BulkUploadResult {
        upload_id: uuid::Uuid::new_v4().to_string(),
        total_rows: dataset.row_count(),
        processed_rows: 0,
        fraud_count: 0,
        legitimate_count: 0,
        offline_count: 0,
        error_count: 0,
        errors: Vec::new(),
        processing_time_ms: 0.0,
    };

    for row in 0..dataset.row_count() {
        let form = TransactionForm {
            amount: dataset.value(row, "transaction_amount").to_string(),
            kyc_verified: dataset.value(row, "kyc_verified").to_string(),
            account_age_days: dataset.value(row, "account_age_days").to_string(),
            channel: dataset.value(row, "channel").to_string(),
            timestamp: dataset.value(row, "timestamp").to_string(),
        };

        let input = match form.validate() {
            Ok(input) => input,
            Err(e) => {
                // file line, counting the header
                let line = row + 2;
                warn!(line, error = %e, "Skipping invalid upload row");
                result.error_count += 1;
                if result.errors.len() < MAX_REPORTED_ERRORS {
                    result.errors.push(format!("Row {}: {}", line, e));
                }
                continue;
            }
        };

        let prediction = predictor.predict(&input);
        if prediction.is_fraud() {
            result.fraud_count += 1;
        } else {
            result.legitimate_count += 1;
        }
        if prediction.is_fallback() {
            result.offline_count += 1;
        }
        history.record(&input, &prediction);
        result.processed_rows += 1;
    }

    result.processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        upload_id = %result.upload_id,
        processed = result.processed_rows,
        fraud = result.fraud_count,
        errors = result.error_count,
        "Bulk upload processed"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_scorer::MockScorer;
    use crate::prediction::OfflineService;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn offline_predictor() -> Predictor<OfflineService, StdRng> {
        Predictor::new(OfflineService, MockScorer::new(), StdRng::seed_from_u64(21))
    }

    #[test]
    fn test_valid_upload() {
        let ds = Dataset::parse(
            "transaction_amount,kyc_verified,account_age_days,channel,timestamp\n\
             120.50,Yes,400,domestic,2025-11-03T10:00:00\n\
             75000,No,5,international,2025-11-01T03:00:00\n\
             8000,Yes,200,mobile,2025-11-04T18:30:00",
        );
        let mut history = TransactionHistory::new();
        let result = process_upload(&ds, &mut offline_predictor(), &mut history).unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.processed_rows, 3);
        assert_eq!(result.fraud_count + result.legitimate_count, 3);
        assert_eq!(result.offline_count, 3);
        assert_eq!(result.error_count, 0);
        assert_eq!(history.len(), 3);
        assert_eq!(history.entries()[0].amount, 8000.0);
        assert_eq!(result.message(), "Successfully processed 3 transactions from CSV");
    }

    #[test]
    fn test_missing_columns() {
        let ds = Dataset::parse("transaction_amount,channel\n10,online");
        let mut history = TransactionHistory::new();
        let err = process_upload(&ds, &mut offline_predictor(), &mut history).unwrap_err();

        match err {
            DashboardError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["kyc_verified", "account_age_days", "timestamp"])
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(history.is_empty());
    }

    #[test]
    fn test_invalid_rows_counted() {
        let mut text =
            String::from("transaction_amount,kyc_verified,account_age_days,channel,timestamp\n");
        for _ in 0..12 {
            text.push_str("-5,Yes,10,online,2025-11-03T10:00:00\n");
        }
        text.push_str("50,Yes,10,online,2025-11-03T10:00:00\n");
        text.push_str("50,Yes,10,online\n");

        let mut history = TransactionHistory::new();
        let result =
            process_upload(&Dataset::parse(&text), &mut offline_predictor(), &mut history)
                .unwrap();

        assert_eq!(result.total_rows, 14);
        assert_eq!(result.processed_rows, 1);
        assert_eq!(result.error_count, 13);
        assert_eq!(result.errors.len(), MAX_REPORTED_ERRORS);
        assert!(result.errors[0].starts_with("Row 2: Invalid amount"));
        assert!(result.errors[9].starts_with("Row 11: "));
        assert_eq!(history.len(), 1);
    }
}
