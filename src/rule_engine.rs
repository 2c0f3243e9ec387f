//! Business rule engine
//!
//! Mirrors the rules the scoring backend applies on top of its model, so a
//! model probability coming back from the API can be turned into the same
//! rule-augmented verdict offline.

use crate::{Channel, FraudVerdict, TransactionInput};
use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Rule identifiers, in priority order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    HighAmount,
    UnverifiedKycInternational,
    OddHours,
    NewAccountHighAmount,
    WeekendHighAmount,
}

impl RuleId {
    pub const ALL: [RuleId; 5] = [
        RuleId::HighAmount,
        RuleId::UnverifiedKycInternational,
        RuleId::OddHours,
        RuleId::NewAccountHighAmount,
        RuleId::WeekendHighAmount,
    ];

    /// Name as reported in `rules_triggered`
    pub fn name(&self) -> &'static str {
        match self {
            RuleId::HighAmount => "high_amount_rule",
            RuleId::UnverifiedKycInternational => "unverified_kyc_international",
            RuleId::OddHours => "odd_hours_rule",
            RuleId::NewAccountHighAmount => "new_account_high_amount",
            RuleId::WeekendHighAmount => "weekend_high_amount",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleId::HighAmount => "Flag transactions above 5x user average amount",
            RuleId::UnverifiedKycInternational => {
                "Flag international transactions with unverified KYC"
            }
            RuleId::OddHours => "Flag transactions during odd hours (2AM-4AM)",
            RuleId::NewAccountHighAmount => "Flag high amounts from accounts < 30 days old",
            RuleId::WeekendHighAmount => "Flag high amount transactions on weekends",
        }
    }

    /// Score contributed when the rule fires
    pub fn score(&self) -> f64 {
        match self {
            RuleId::HighAmount => 0.8,
            RuleId::UnverifiedKycInternational => 0.9,
            RuleId::OddHours => 0.6,
            RuleId::NewAccountHighAmount => 0.7,
            RuleId::WeekendHighAmount => 0.5,
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rule engine thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Multiple of the user's average amount that counts as high
    pub high_amount_multiplier: f64,
    /// First hour (inclusive) of the odd-hours window
    pub odd_hours_start: u32,
    /// Last hour (inclusive) of the odd-hours window
    pub odd_hours_end: u32,
    pub new_account_days: u32,
    pub new_account_amount: f64,
    pub weekend_amount: f64,
    /// Model probability above which the model alone marks fraud
    pub fraud_threshold: f64,
    pub model_weight: f64,
    pub rule_weight: f64,
    /// Average used when the user has no history yet
    pub default_user_average: f64,
    pub disabled_rules: Vec<RuleId>,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            high_amount_multiplier: 5.0,
            odd_hours_start: 2,
            odd_hours_end: 4,
            new_account_days: 30,
            new_account_amount: 5_000.0,
            weekend_amount: 10_000.0,
            fraud_threshold: 0.3,
            model_weight: 0.7,
            rule_weight: 0.3,
            default_user_average: 1_000.0,
            disabled_rules: Vec::new(),
        }
    }
}

/// Outcome of running every active rule against a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub triggered: Vec<RuleId>,
    pub reasons: Vec<String>,
    /// Highest score among triggered rules, 0 when none fired
    pub score: f64,
}

impl RuleEvaluation {
    pub fn any_triggered(&self) -> bool {
        !self.triggered.is_empty()
    }

    pub fn reason(&self) -> String {
        if self.reasons.is_empty() {
            "No rules triggered".to_string()
        } else {
            self.reasons.join("; ")
        }
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.triggered.iter().map(|r| r.name().to_string()).collect()
    }
}

/// Business rule engine
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: RuleEngineConfig,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuleEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    pub fn is_active(&self, rule: RuleId) -> bool {
        !self.config.disabled_rules.contains(&rule)
    }

    pub fn active_rules(&self) -> Vec<RuleId> {
        RuleId::ALL
            .into_iter()
            .filter(|r| self.is_active(*r))
            .collect()
    }

    /// Run all active rules. A non-positive `user_avg_amount` falls back to
    /// the configured default.
    pub fn evaluate(&self, input: &TransactionInput, user_avg_amount: f64) -> RuleEvaluation {
        let avg = if user_avg_amount > 0.0 {
            user_avg_amount
        } else {
            self.config.default_user_average
        };

        let mut triggered = Vec::new();
        let mut reasons = Vec::new();

        for rule in self.active_rules() {
            if let Some(reason) = self.check(rule, input, avg) {
                triggered.push(rule);
                reasons.push(reason);
            }
        }

        let score = triggered.iter().map(RuleId::score).fold(0.0, f64::max);

        RuleEvaluation {
            triggered,
            reasons,
            score,
        }
    }

    fn check(&self, rule: RuleId, input: &TransactionInput, avg: f64) -> Option<String> {
        let amount = input.amount;
        match rule {
            RuleId::HighAmount => (amount > self.config.high_amount_multiplier * avg).then(|| {
                format!(
                    "Amount {} is {:.1}x higher than average",
                    crate::mock_scorer::format_amount(amount),
                    amount / avg
                )
            }),
            RuleId::UnverifiedKycInternational => {
                (input.channel == Channel::International && !input.kyc_verified)
                    .then(|| "International transaction with unverified KYC".to_string())
            }
            RuleId::OddHours => {
                let hour = input.timestamp.hour();
                (self.config.odd_hours_start..=self.config.odd_hours_end)
                    .contains(&hour)
                    .then(|| format!("Transaction at unusual hour ({:02}:00)", hour))
            }
            RuleId::NewAccountHighAmount => (input.account_age_days
                < self.config.new_account_days
                && amount > self.config.new_account_amount)
                .then(|| {
                    format!(
                        "High amount {} from new account ({} days)",
                        crate::mock_scorer::format_amount(amount),
                        input.account_age_days
                    )
                }),
            RuleId::WeekendHighAmount => {
                let weekend = matches!(input.timestamp.weekday(), Weekday::Sat | Weekday::Sun);
                (weekend && amount > self.config.weekend_amount).then(|| {
                    format!(
                        "High weekend transaction ({})",
                        crate::mock_scorer::format_amount(amount)
                    )
                })
            }
        }
    }

    /// Blend a model probability with the rule outcome into a verdict
    pub fn combine(&self, model_probability: f64, evaluation: &RuleEvaluation) -> FraudVerdict {
        let probability = model_probability.clamp(0.0, 1.0);
        let model_flagged = probability > self.config.fraud_threshold;
        let rules_flagged = evaluation.any_triggered();
        let is_fraud = model_flagged || rules_flagged;

        let risk_score = (self.config.model_weight * probability
            + self.config.rule_weight * evaluation.score)
            .clamp(0.0, 1.0);

        let explanation = match (model_flagged, rules_flagged) {
            (true, true) => format!(
                "Both AI model (confidence: {:.1}%) and business rules flagged this transaction. Rules: {}",
                probability * 100.0,
                evaluation.reason()
            ),
            (true, false) => format!(
                "AI model flagged with {:.1}% fraud probability",
                probability * 100.0
            ),
            (false, true) => format!("Business rules flagged: {}", evaluation.reason()),
            (false, false) => format!(
                "Transaction appears legitimate (AI confidence: {:.1}%)",
                probability * 100.0
            ),
        };

        FraudVerdict {
            is_fraud,
            risk_score,
            rules_triggered: evaluation.rule_names(),
            explanation,
        }
    }

    /// Evaluate and combine in one step
    pub fn assess(
        &self,
        input: &TransactionInput,
        model_probability: f64,
        user_avg_amount: f64,
    ) -> FraudVerdict {
        let evaluation = self.evaluate(input, user_avg_amount);
        self.combine(model_probability, &evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn create_test_input(amount: f64, timestamp: &str) -> TransactionInput {
        TransactionInput {
            amount,
            kyc_verified: true,
            account_age_days: 365,
            channel: Channel::Domestic,
            timestamp: NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S").unwrap(),
        }
    }

    // 2025-11-05 is a Wednesday
    const WEEKDAY_NOON: &str = "2025-11-05T12:00:00";

    #[test]
    fn test_no_rules_triggered() {
        let engine = RuleEngine::new();
        let eval = engine.evaluate(&create_test_input(500.0, WEEKDAY_NOON), 1000.0);

        assert!(!eval.any_triggered());
        assert_eq!(eval.score, 0.0);
        assert_eq!(eval.reason(), "No rules triggered");
    }

    #[test]
    fn test_high_amount_relative_to_average() {
        let engine = RuleEngine::new();
        let eval = engine.evaluate(&create_test_input(6_000.0, WEEKDAY_NOON), 1000.0);

        assert_eq!(eval.triggered, vec![RuleId::HighAmount]);
        assert_eq!(eval.score, 0.8);
        assert!(eval.reason().contains("6.0x higher than average"));
    }

    #[test]
    fn test_unknown_average_uses_default() {
        let engine = RuleEngine::new();
        let eval = engine.evaluate(&create_test_input(6_000.0, WEEKDAY_NOON), 0.0);
        assert!(eval.triggered.contains(&RuleId::HighAmount));
    }

    #[test]
    fn test_unverified_international() {
        let engine = RuleEngine::new();
        let mut input = create_test_input(100.0, WEEKDAY_NOON);
        input.channel = Channel::International;
        input.kyc_verified = false;

        let eval = engine.evaluate(&input, 1000.0);
        assert_eq!(eval.triggered, vec![RuleId::UnverifiedKycInternational]);
        assert_eq!(eval.score, 0.9);
    }

    #[test]
    fn test_odd_hours() {
        let engine = RuleEngine::new();
        let eval = engine.evaluate(&create_test_input(100.0, "2025-11-05T03:15:00"), 1000.0);
        assert_eq!(eval.triggered, vec![RuleId::OddHours]);
        assert!(eval.reason().contains("(03:00)"));

        let eval = engine.evaluate(&create_test_input(100.0, "2025-11-05T05:00:00"), 1000.0);
        assert!(!eval.any_triggered());
    }

    #[test]
    fn test_weekend_and_new_account() {
        let engine = RuleEngine::new();
        // 2025-11-08 is a Saturday
        let mut input = create_test_input(12_000.0, "2025-11-08T12:00:00");
        input.account_age_days = 10;

        let eval = engine.evaluate(&input, 20_000.0);
        assert_eq!(
            eval.triggered,
            vec![RuleId::NewAccountHighAmount, RuleId::WeekendHighAmount]
        );
        assert_eq!(eval.score, 0.7);
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let engine = RuleEngine::with_config(RuleEngineConfig {
            disabled_rules: vec![RuleId::OddHours],
            ..Default::default()
        });
        let eval = engine.evaluate(&create_test_input(100.0, "2025-11-05T03:00:00"), 1000.0);

        assert!(!eval.any_triggered());
        assert_eq!(engine.active_rules().len(), 4);
    }

    #[test]
    fn test_combine_weights() {
        let engine = RuleEngine::new();
        let mut input = create_test_input(100.0, WEEKDAY_NOON);
        input.channel = Channel::International;
        input.kyc_verified = false;

        let verdict = engine.assess(&input, 0.5, 1000.0);
        assert!(verdict.is_fraud);
        assert!((verdict.risk_score - (0.7 * 0.5 + 0.3 * 0.9)).abs() < 1e-12);
        assert_eq!(verdict.rules_triggered, vec!["unverified_kyc_international"]);
        assert!(verdict.explanation.starts_with("Both AI model"));
    }

    #[test]
    fn test_combine_legitimate() {
        let engine = RuleEngine::new();
        let verdict = engine.assess(&create_test_input(100.0, WEEKDAY_NOON), 0.1, 1000.0);

        assert!(!verdict.is_fraud);
        assert!((verdict.risk_score - 0.07).abs() < 1e-12);
        assert_eq!(
            verdict.explanation,
            "Transaction appears legitimate (AI confidence: 10.0%)"
        );
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(RuleId::HighAmount.to_string(), "high_amount_rule");
        assert_eq!(RuleId::ALL.len(), 5);
        assert!(RuleId::OddHours.description().contains("odd hours"));
    }
}
