//! # Fraud Dashboard
//!
//! Client-side core of a fraud detection dashboard.
//!
//! ## Features
//!
//! - **Offline Scoring**: Mock fraud scorer used whenever the prediction API is unreachable
//! - **Unified Predictions**: One tagged result type for remote and mocked verdicts
//! - **Business Rules**: The backend's rule engine for rule-augmented verdicts
//! - **CSV Analytics**: Data-quality report with type inference and correlations
//! - **Transaction History**: Bounded local history with CSV export
//! - **Bulk Upload**: Score every row of an uploaded transaction CSV
//!
//! Nothing here talks to the network directly. Remote calls go through the
//! [`prediction::PredictionService`] seam and fall back to [`MockScorer`].

pub mod analytics;
pub mod bulk;
pub mod config;
pub mod dataset;
pub mod history;
pub mod mock_scorer;
pub mod prediction;
pub mod rule_engine;
pub mod store;

pub use analytics::{analyze, ColumnType, CorrelationMatrix, Report};
pub use bulk::{process_upload, BulkUploadResult};
pub use crate::config::DashboardConfig;
pub use dataset::Dataset;
pub use history::{HistoryEntry, HistoryStats, TransactionHistory};
pub use mock_scorer::{MockScorer, ScorerConfig};
pub use prediction::{
    AlertSeverity, OfflineService, Prediction, PredictionService, PredictionSource, Predictor,
    ServiceError,
};
pub use rule_engine::{RuleEngine, RuleEngineConfig, RuleEvaluation, RuleId};
pub use store::LocalStore;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Form validation errors
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid account age: {0}")]
    InvalidAccountAge(String),

    #[error("Invalid KYC status: {0}")]
    InvalidKyc(String),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Payment channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Domestic,
    International,
    Online,
    Atm,
    Mobile,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Domestic,
        Channel::International,
        Channel::Online,
        Channel::Atm,
        Channel::Mobile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Domestic => "domestic",
            Channel::International => "international",
            Channel::Online => "online",
            Channel::Atm => "atm",
            Channel::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidChannel(s.to_string()))
    }
}

/// Transaction submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub amount: f64,
    pub kyc_verified: bool,
    pub account_age_days: u32,
    pub channel: Channel,
    pub timestamp: NaiveDateTime,
}

/// Fraud verdict shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudVerdict {
    pub is_fraud: bool,
    pub risk_score: f64,
    pub rules_triggered: Vec<String>,
    pub explanation: String,
}

impl FraudVerdict {
    /// Status label used in exports and the history table
    pub fn status(&self) -> &'static str {
        if self.is_fraud {
            "Fraud"
        } else {
            "Legitimate"
        }
    }

    /// Export as JSON
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Raw, unvalidated transaction fields as they come from a form or a CSV row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionForm {
    pub amount: String,
    pub kyc_verified: String,
    pub account_age_days: String,
    pub channel: String,
    pub timestamp: String,
}

impl TransactionForm {
    /// Validate every field, stopping at the first invalid one
    pub fn validate(&self) -> std::result::Result<TransactionInput, ValidationError> {
        let amount = required("amount", &self.amount)?;
        let amount: f64 = amount
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(format!("'{}' is not a number", amount)))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let kyc_verified = parse_kyc(required("kyc_verified", &self.kyc_verified)?)?;

        let age = required("account_age_days", &self.account_age_days)?;
        let account_age_days: u32 = age.parse().map_err(|_| {
            ValidationError::InvalidAccountAge(format!("'{}' is not a non-negative integer", age))
        })?;

        let channel = required("channel", &self.channel)?.parse()?;
        let timestamp = parse_timestamp(required("timestamp", &self.timestamp)?)?;

        Ok(TransactionInput {
            amount,
            kyc_verified,
            account_age_days,
            channel,
            timestamp,
        })
    }
}

fn required<'a>(name: &str, value: &'a str) -> std::result::Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(name.to_string()))
    } else {
        Ok(trimmed)
    }
}

fn parse_kyc(value: &str) -> std::result::Result<bool, ValidationError> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "verified" | "1" => Ok(true),
        "no" | "false" | "pending" | "unverified" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidKyc(value.to_string())),
    }
}

/// Parse an ISO-8601 timestamp, with or without offset or seconds
pub fn parse_timestamp(value: &str) -> std::result::Result<NaiveDateTime, ValidationError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ValidationError::InvalidTimestamp(value.to_string()))
}
