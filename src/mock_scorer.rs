//! Offline fraud scorer
//!
//! Produces a plausible verdict when the prediction API cannot be reached so
//! the dashboard never blocks on the network. All randomness comes from the
//! caller's generator.

use crate::{Channel, FraudVerdict, TransactionInput};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const RULE_AMOUNT_THRESHOLD: &str = "Amount exceeds threshold";
pub const RULE_NEW_ACCOUNT: &str = "New account with limited history";
pub const RULE_KYC_PENDING: &str = "KYC verification pending";
pub const RULE_HIGH_MOBILE: &str = "High mobile transaction";

pub const MIN_RISK: f64 = 0.05;
pub const MAX_RISK: f64 = 0.95;

/// Mock scorer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Amount above which a transaction is considered large
    pub amount_threshold: f64,
    /// Mobile transactions above this amount are flagged
    pub mobile_amount_threshold: f64,
    /// Accounts younger than this (days) are flagged
    pub new_account_days: u32,
    /// Lower bound of the random baseline
    pub baseline_min: f64,
    /// Upper bound of the random baseline
    pub baseline_max: f64,
    /// Baseline multiplier for legitimate verdicts; keeps them in the low band
    pub legitimate_scale: f64,
    /// Risk added per triggered rule
    pub rule_risk_increment: f64,
    /// Chance that a single triggered rule marks the transaction as fraud
    pub flip_probability: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            amount_threshold: 10_000.0,
            mobile_amount_threshold: 5_000.0,
            new_account_days: 30,
            baseline_min: 0.7,
            baseline_max: 1.0,
            legitimate_scale: 0.25,
            rule_risk_increment: 0.15,
            flip_probability: 0.7,
        }
    }
}

const FRAUD_TEMPLATES: [&str; 4] = [
    "This {amount} {channel} transaction from an account only {age} old shows several hallmarks of fraud and should be held for review.",
    "Our offline model flagged this {channel} payment of {amount}: the account is {age} old and the pattern matches known fraud cases.",
    "A {amount} {channel} transaction on an account {age} old is unusual enough that we recommend blocking it until the customer confirms.",
    "Risk signals are elevated for this {channel} transfer of {amount}; with an account age of {age}, manual verification is advised.",
];

const LEGITIMATE_TEMPLATES: [&str; 4] = [
    "This {amount} {channel} transaction is consistent with normal activity for an account {age} old.",
    "No strong fraud signals were found in this {channel} payment of {amount} from an account {age} old.",
    "The {channel} transaction of {amount} looks routine; the account has been open {age} and nothing stands out.",
    "Based on the amount ({amount}), the {channel} channel and an account age of {age}, this transaction appears legitimate.",
];

/// Offline fraud scorer
#[derive(Debug, Clone, Default)]
pub struct MockScorer {
    config: ScorerConfig,
}

impl MockScorer {
    /// Create a scorer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom configuration
    pub fn with_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score a transaction. Never fails, whatever the input.
    pub fn score<R: Rng + ?Sized>(&self, input: &TransactionInput, rng: &mut R) -> FraudVerdict {
        let rules_triggered = self.triggered_rules(input);

        let (low, high) = self.baseline_bounds();
        let baseline = rng.gen_range(low..=high);

        let flip = self.config.flip_probability.clamp(0.0, 1.0);
        let mut is_fraud = false;
        for _ in &rules_triggered {
            if rng.gen_bool(flip) {
                is_fraud = true;
            }
        }

        // only legitimate verdicts are scaled out of the baseline band
        let mut risk = if is_fraud {
            baseline
        } else {
            baseline * self.config.legitimate_scale
        };
        risk += rules_triggered.len() as f64 * self.config.rule_risk_increment;

        let risk_score = if risk.is_finite() {
            risk.clamp(MIN_RISK, MAX_RISK)
        } else {
            MAX_RISK
        };

        FraudVerdict {
            is_fraud,
            risk_score,
            rules_triggered: rules_triggered.into_iter().map(str::to_string).collect(),
            explanation: explain(input, is_fraud, rng),
        }
    }

    /// Names of the rules the transaction trips, in evaluation order
    pub fn triggered_rules(&self, input: &TransactionInput) -> Vec<&'static str> {
        [
            self.check_amount(input),
            self.check_account_age(input),
            self.check_kyc(input),
            self.check_mobile(input),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn baseline_bounds(&self) -> (f64, f64) {
        let a = self.config.baseline_min;
        let b = self.config.baseline_max;
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn check_amount(&self, input: &TransactionInput) -> Option<&'static str> {
        (input.amount > self.config.amount_threshold).then_some(RULE_AMOUNT_THRESHOLD)
    }

    fn check_account_age(&self, input: &TransactionInput) -> Option<&'static str> {
        (input.account_age_days < self.config.new_account_days).then_some(RULE_NEW_ACCOUNT)
    }

    fn check_kyc(&self, input: &TransactionInput) -> Option<&'static str> {
        (!input.kyc_verified).then_some(RULE_KYC_PENDING)
    }

    fn check_mobile(&self, input: &TransactionInput) -> Option<&'static str> {
        (input.channel == Channel::Mobile && input.amount > self.config.mobile_amount_threshold)
            .then_some(RULE_HIGH_MOBILE)
    }
}

fn explain<R: Rng + ?Sized>(input: &TransactionInput, is_fraud: bool, rng: &mut R) -> String {
    let pool: &[&str] = if is_fraud {
        &FRAUD_TEMPLATES
    } else {
        &LEGITIMATE_TEMPLATES
    };
    let template = pool[rng.gen_range(0..pool.len())];

    template
        .replace("{amount}", &format_amount(input.amount))
        .replace("{channel}", input.channel.as_str())
        .replace("{age}", &format_age(input.account_age_days))
}

/// `$12,345.60` style with a leading minus for negative amounts
pub fn format_amount(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", amount.abs());
    let (whole, fraction) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}${}.{}", sign, grouped, fraction)
}

fn format_age(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}
