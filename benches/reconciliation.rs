//! Benchmarks for payload reconciliation
//!
//! Run with: cargo bench --bench reconciliation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use crowdcheck::domain::models::Value;
use crowdcheck::domain::ports::ReconcilerOverrides;
use crowdcheck::services::reconcile_payloads;

/// A transcribed register page with `rows` rows; every third entry misreads
/// one surname and every fifth drops the last row.
fn create_entries(entries: usize, rows: usize) -> Vec<Value> {
    (0..entries)
        .map(|e| {
            let row_count = if e % 5 == 4 { rows - 1 } else { rows };
            let records: Vec<_> = (0..row_count)
                .map(|r| {
                    let surname = if e % 3 == 2 && r == e % rows {
                        format!("Smyth{r}")
                    } else {
                        format!("Smith{r}")
                    };
                    json!({"surname": surname, "age": 20 + r, "parish": "St Mary"})
                })
                .collect();
            Value::from(json!({"page": 7, "records": records}))
        })
        .collect()
}

fn bench_reconcile_payloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reconcile payloads");
    let overrides = ReconcilerOverrides::new();

    for &(entries, rows) in &[(3, 10), (5, 40), (10, 200)] {
        let payloads = create_entries(entries, rows);
        group.throughput(Throughput::Elements((entries * rows) as u64));
        group.bench_with_input(
            BenchmarkId::new("records", format!("{entries}x{rows}")),
            &payloads,
            |b, payloads| b.iter(|| reconcile_payloads(black_box(payloads), &overrides)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile_payloads);
criterion_main!(benches);
