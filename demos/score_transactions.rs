//! Transaction scoring example
//!
//! Scores a few transactions with the offline scorer, runs the backend rule
//! engine on the same inputs and saves everything to an in-memory history.

use fraud_dashboard::{
    MockScorer, OfflineService, Predictor, RuleEngine, TransactionForm, TransactionHistory,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    println!("=== Fraud Dashboard Scoring ===\n");

    let forms = [
        ("Routine domestic payment", "120.50", "yes", "400", "domestic", "2025-11-03T10:15:00"),
        ("Large transfer from a new account", "75000", "no", "5", "international", "2025-11-01T03:00:00"),
        ("Mid-size mobile purchase", "8000", "yes", "200", "mobile", "2025-11-04T18:30:00"),
        ("Negative amount", "-10", "yes", "10", "online", "2025-11-04T18:30:00"),
    ];

    let mut predictor = Predictor::new(OfflineService, MockScorer::new(), StdRng::seed_from_u64(7));
    let engine = RuleEngine::new();
    let mut history = TransactionHistory::new();

    for (i, (label, amount, kyc, age, channel, timestamp)) in forms.iter().enumerate() {
        println!("{}. {}", i + 1, label);
        let form = TransactionForm {
            amount: amount.to_string(),
            kyc_verified: kyc.to_string(),
            account_age_days: age.to_string(),
            channel: channel.to_string(),
            timestamp: timestamp.to_string(),
        };

        let input = match form.validate() {
            Ok(input) => input,
            Err(e) => {
                println!("   Rejected: {}\n", e);
                continue;
            }
        };

        let prediction = predictor.predict(&input);
        println!("   Status: {}", prediction.verdict.status());
        println!("   Risk Score: {:.2}", prediction.verdict.risk_score);
        println!("   Rules: {:?}", prediction.verdict.rules_triggered);
        println!("   Explanation: {}", prediction.verdict.explanation);

        let backend = engine.assess(&input, 0.4, 1000.0);
        println!("   Backend rules: {}", backend.explanation);
        println!("   Backend risk: {:.3}", backend.risk_score);

        let id = history.record(&input, &prediction);
        println!("   Saved as {}\n", id);
    }

    let stats = history.stats();
    println!("History: {} saved, {} fraud", stats.total_transactions, stats.fraud_count);
    match history.export_csv() {
        Ok(csv) => println!("\n{}", csv.trim_start_matches('\u{feff}')),
        Err(e) => println!("Export failed: {}", e),
    }
}
