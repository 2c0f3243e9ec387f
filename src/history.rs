//! Local transaction history
//!
//! Newest entries first, bounded to the most recent `max_entries` saves.

use crate::prediction::{AlertSeverity, Prediction, PredictionSource};
use crate::{Channel, TransactionInput};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_ENTRIES: usize = 100;

pub const EXPORT_HEADER: [&str; 7] = [
    "ID",
    "Amount",
    "KYC Verified",
    "Account Age",
    "Channel",
    "Date & Time",
    "Status",
];

const UTF8_BOM: &str = "\u{feff}";

/// History settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// One saved prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub amount: f64,
    pub kyc_verified: bool,
    pub account_age_days: u32,
    pub channel: Channel,
    pub timestamp: NaiveDateTime,
    pub is_fraud: bool,
    pub risk_score: f64,
    #[serde(default)]
    pub rules_triggered: Vec<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub alert: Option<AlertSeverity>,
    pub saved_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(input: &TransactionInput, prediction: &Prediction) -> Self {
        let remote_id = match &prediction.source {
            PredictionSource::Remote { transaction_id, .. } => transaction_id.clone(),
            PredictionSource::Fallback { .. } => None,
        };

        Self {
            id: remote_id.unwrap_or_else(generate_id),
            amount: input.amount,
            kyc_verified: input.kyc_verified,
            account_age_days: input.account_age_days,
            channel: input.channel,
            timestamp: input.timestamp,
            is_fraud: prediction.verdict.is_fraud,
            risk_score: prediction.verdict.risk_score,
            rules_triggered: prediction.verdict.rules_triggered.clone(),
            explanation: prediction.verdict.explanation.clone(),
            offline: prediction.is_fallback(),
            alert: prediction.alert_severity(),
            saved_at: Utc::now(),
        }
    }

    pub fn status(&self) -> &'static str {
        if self.is_fraud {
            "Fraud"
        } else {
            "Legitimate"
        }
    }

    fn export_row(&self) -> [String; 7] {
        [
            self.id.clone(),
            format!("{:.2}", self.amount),
            if self.kyc_verified { "Yes" } else { "No" }.to_string(),
            self.account_age_days.to_string(),
            self.channel.to_string(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.status().to_string(),
        ]
    }
}

fn generate_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN-{}", &uuid[..12])
}

/// Aggregate figures over the saved history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_transactions: usize,
    pub fraud_count: usize,
    pub legitimate_count: usize,
    /// Percent of saved transactions marked as fraud
    pub fraud_rate: f64,
    pub total_amount: f64,
    pub avg_amount: f64,
    pub avg_risk_score: f64,
    pub offline_predictions: usize,
}

/// Bounded, newest-first transaction history
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHistory {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for TransactionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionHistory {
    pub fn new() -> Self {
        Self::with_config(&HistoryConfig::default())
    }

    pub fn with_config(config: &HistoryConfig) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: config.max_entries.max(1),
        }
    }

    /// Rebuild from stored entries, keeping the newest `max_entries`
    pub fn from_entries(mut entries: Vec<HistoryEntry>, config: &HistoryConfig) -> Self {
        let max_entries = config.max_entries.max(1);
        entries.truncate(max_entries);
        Self {
            entries,
            max_entries,
        }
    }

    /// Save a prediction and return the new entry's id
    pub fn record(&mut self, input: &TransactionInput, prediction: &Prediction) -> String {
        self.push(HistoryEntry::new(input, prediction))
    }

    pub fn push(&mut self, entry: HistoryEntry) -> String {
        let id = entry.id.clone();
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
        id
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries that raised a fraud alert
    pub fn alerts(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| e.alert.is_some())
    }

    /// Average amount of saved transactions, if any
    pub fn average_amount(&self) -> Option<f64> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.iter().map(|e| e.amount).sum::<f64>() / self.entries.len() as f64)
        }
    }

    pub fn stats(&self) -> HistoryStats {
        let total = self.entries.len();
        if total == 0 {
            return HistoryStats::default();
        }

        let fraud_count = self.entries.iter().filter(|e| e.is_fraud).count();
        let total_amount: f64 = self.entries.iter().map(|e| e.amount).sum();
        let total_risk: f64 = self.entries.iter().map(|e| e.risk_score).sum();

        HistoryStats {
            total_transactions: total,
            fraud_count,
            legitimate_count: total - fraud_count,
            fraud_rate: fraud_count as f64 / total as f64 * 100.0,
            total_amount,
            avg_amount: total_amount / total as f64,
            avg_risk_score: total_risk / total as f64,
            offline_predictions: self.entries.iter().filter(|e| e.offline).count(),
        }
    }

    /// CSV export: UTF-8 BOM, every field quoted, newest first
    pub fn export_csv(&self) -> crate::Result<String> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(Vec::new());

        writer.write_record(EXPORT_HEADER)?;
        for entry in &self.entries {
            writer.write_record(entry.export_row())?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        let body = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(format!("{}{}", UTF8_BOM, body))
    }

    pub fn export_to_path<P: AsRef<Path>>(&self, path: P) -> crate::Result<usize> {
        std::fs::write(path, self.export_csv()?)?;
        Ok(self.entries.len())
    }
}
