use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fraud_dashboard::{analyze, Dataset, MockScorer, TransactionForm};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn make_csv(rows: usize) -> String {
    let mut text = String::from("id,amount,account_age_days,timestamp,channel,is_fraud\n");
    for i in 0..rows {
        text.push_str(&format!(
            "T{},{}.{:02},{},2025-11-{:02} {:02}:15:00,{},{}\n",
            i,
            (i * 37) % 20_000,
            i % 100,
            (i * 13) % 900,
            i % 28 + 1,
            i % 24,
            ["domestic", "online", "mobile"][i % 3],
            u8::from(i % 17 == 0)
        ));
    }
    text
}

fn bench_analytics(c: &mut Criterion) {
    let text = make_csv(5_000);

    c.bench_function("parse 5k row csv", |b| {
        b.iter(|| Dataset::parse(black_box(&text)))
    });

    let dataset = Dataset::parse(&text);
    c.bench_function("analyze 5k rows", |b| b.iter(|| analyze(black_box(&dataset))));
}

fn bench_scorer(c: &mut Criterion) {
    let scorer = MockScorer::new();
    let input = TransactionForm {
        amount: "12500".to_string(),
        kyc_verified: "no".to_string(),
        account_age_days: "10".to_string(),
        channel: "mobile".to_string(),
        timestamp: "2025-11-01T03:00:00".to_string(),
    }
    .validate()
    .unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    c.bench_function("mock score", |b| {
        b.iter(|| scorer.score(black_box(&input), &mut rng))
    });
}

criterion_group!(benches, bench_analytics, bench_scorer);
criterion_main!(benches);
