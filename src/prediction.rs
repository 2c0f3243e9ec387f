//! Unified prediction results
//!
//! The prediction API and the offline scorer disagree on field names
//! (`is_fraud`, `fraud`, `prediction == 1`, ...). Everything is normalised
//! here into a single [`Prediction`] so display code never has to guess.

use crate::mock_scorer::MockScorer;
use crate::{FraudVerdict, TransactionInput};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Remote service failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Where a verdict came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PredictionSource {
    Remote {
        transaction_id: Option<String>,
        fraud_probability: Option<f64>,
        model_version: Option<String>,
        processing_time_ms: Option<f64>,
    },
    Fallback {
        reason: String,
    },
}

/// Alert severity attached to fraudulent predictions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
}

impl AlertSeverity {
    pub fn from_risk(risk_score: f64) -> Self {
        if risk_score > 0.8 {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Medium => write!(f, "medium"),
            AlertSeverity::High => write!(f, "high"),
        }
    }
}

/// A verdict tagged with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verdict: FraudVerdict,
    pub source: PredictionSource,
}

impl Prediction {
    pub fn fallback(verdict: FraudVerdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            source: PredictionSource::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, PredictionSource::Fallback { .. })
    }

    pub fn is_fraud(&self) -> bool {
        self.verdict.is_fraud
    }

    /// Severity of the alert this prediction raises, if any
    pub fn alert_severity(&self) -> Option<AlertSeverity> {
        self.verdict
            .is_fraud
            .then(|| AlertSeverity::from_risk(self.verdict.risk_score))
    }

    /// Adapt a `/predict` response body
    pub fn from_remote(body: &Value) -> Result<Self, ServiceError> {
        let obj = body
            .as_object()
            .ok_or_else(|| ServiceError::Malformed("response is not a JSON object".to_string()))?;

        let fraud_probability = number_field(obj.get("fraud_probability"));
        let risk_score = number_field(obj.get("risk_score"))
            .or(fraud_probability)
            .or_else(|| number_field(obj.get("probability")))
            .ok_or_else(|| ServiceError::Malformed("no risk score in response".to_string()))?;

        let is_fraud = if let Some(flag) = obj.get("is_fraud").and_then(bool_like) {
            flag
        } else if let Some(flag) = obj.get("fraud").and_then(bool_like) {
            flag
        } else if let Some(p) = obj.get("prediction") {
            p.as_i64() == Some(1) || p.as_f64() == Some(1.0) || p.as_bool() == Some(true)
        } else {
            return Err(ServiceError::Malformed(
                "no fraud flag in response".to_string(),
            ));
        };

        let rules_triggered = match obj.get("rules_triggered") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => {
                s.split(',').map(|r| r.trim().to_string()).collect()
            }
            _ => Vec::new(),
        };

        let explanation = ["llm_explanation", "explanation", "reason"]
            .iter()
            .filter_map(|k| obj.get(*k).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            verdict: FraudVerdict {
                is_fraud,
                risk_score: risk_score.clamp(0.0, 1.0),
                rules_triggered,
                explanation,
            },
            source: PredictionSource::Remote {
                transaction_id: obj
                    .get("transaction_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                fraud_probability,
                model_version: obj
                    .get("model_version")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                processing_time_ms: number_field(obj.get("processing_time_ms")),
            },
        })
    }
}

fn number_field(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn bool_like(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i == 1),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "fraud" => Some(true),
            "false" | "0" | "no" | "legitimate" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Remote prediction endpoint (`POST /predict`)
pub trait PredictionService {
    fn predict(&self, input: &TransactionInput) -> Result<Value, ServiceError>;
}

impl<F> PredictionService for F
where
    F: Fn(&TransactionInput) -> Result<Value, ServiceError>,
{
    fn predict(&self, input: &TransactionInput) -> Result<Value, ServiceError> {
        self(input)
    }
}

/// Service used when no backend is configured; every call fails
#[derive(Debug, Clone, Default)]
pub struct OfflineService;

impl PredictionService for OfflineService {
    fn predict(&self, _input: &TransactionInput) -> Result<Value, ServiceError> {
        Err(ServiceError::Unreachable(
            "no prediction backend configured".to_string(),
        ))
    }
}

/// Calls the prediction service and substitutes the mock scorer on failure
pub struct Predictor<S, R> {
    service: S,
    scorer: MockScorer,
    rng: R,
}

impl<S: PredictionService, R: Rng> Predictor<S, R> {
    pub fn new(service: S, scorer: MockScorer, rng: R) -> Self {
        Self {
            service,
            scorer,
            rng,
        }
    }

    /// Always returns a prediction; failures degrade to the mock scorer
    pub fn predict(&mut self, input: &TransactionInput) -> Prediction {
        let failure = match self.service.predict(input) {
            Ok(body) => match Prediction::from_remote(&body) {
                Ok(prediction) => {
                    debug!(
                        risk_score = prediction.verdict.risk_score,
                        is_fraud = prediction.verdict.is_fraud,
                        "Remote prediction received"
                    );
                    return prediction;
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        warn!(error = %failure, "Prediction service failed, using offline scorer");
        let verdict = self.scorer.score(input, &mut self.rng);
        Prediction::fallback(verdict, failure.to_string())
    }

    pub fn scorer(&self) -> &MockScorer {
        &self.scorer
    }
}
