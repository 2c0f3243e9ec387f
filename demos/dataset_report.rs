//! Dataset analytics example
//!
//! Profiles a small transaction dataset with a fraud label column.

use fraud_dashboard::{analyze, Dataset};

const SAMPLE: &str = "\
transaction_id,amount,account_age_days,timestamp,channel,is_fraud
T1,120.50,400,2025-11-03 10:15:00,domestic,0
T2,75000,5,2025-11-01 03:00:00,international,1
T3,8000,200,2025-11-04 18:30:00,mobile,0
T4,,30,2025-11-05 12:00:00,online,0
T5,15000,12,2025-11-08 02:45:00,online,1
T3,8000,200,2025-11-04 18:30:00,mobile,0
";

fn main() {
    println!("=== Dataset Report ===\n");

    let dataset = Dataset::parse(SAMPLE);
    let report = analyze(&dataset);

    println!("1. Basic statistics");
    println!("   Rows: {}", report.basic.total_rows);
    println!("   Columns: {}", report.basic.total_columns);
    println!("   Empty cells: {}", report.basic.empty_cells);
    println!();

    println!("2. Quality");
    println!("   Completeness: {:.2}%", report.quality.completeness);
    println!("   Consistency: {:.2}%", report.quality.consistency);
    println!("   Uniqueness: {:.2}%", report.quality.uniqueness);
    println!("   Overall: {:.2}%", report.quality.overall);
    println!();

    println!("3. Column types");
    for column in &report.columns {
        println!("   {}: {}", column.name, column.inferred_type);
    }
    println!();

    println!("4. Correlations");
    for (a, b, r) in report.correlation.strong_pairs(0.5) {
        println!("   {} / {}: {:.3}", a, b, r);
    }
    println!();

    if let Some(fraud) = &report.fraud {
        println!("5. Fraud label '{}'", fraud.column);
        println!("   Fraud: {}", fraud.fraud_count);
        println!("   Legitimate: {}", fraud.legitimate_count);
        println!("   Ratio: {:.2}%", fraud.fraud_ratio);
        println!();
    }

    match report.to_json() {
        Ok(json) => println!("JSON report:\n{}", json),
        Err(e) => println!("Serialization failed: {}", e),
    }
}
