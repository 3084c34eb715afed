use criterion::{Criterion, black_box, criterion_group, criterion_main};
use floodgate::store::InMemoryCounterStore;
use floodgate::{Actor, AntiFlood, AntiFloodConfig, Pay2Verifier};

const SECRET: &str = "bench-secret";

fn notification() -> String {
    serde_json::json!({
        "invoice_number": "IN2212956367",
        "external_number": "TN121750056778",
        "amount": 1,
        "handling_fee": 0,
        "currency_code": "USD",
        "description": "Start (month)",
        "status": "paid"
    })
    .to_string()
}

fn bench_verify_and_decrypt(c: &mut Criterion) {
    let verifier = Pay2Verifier::new(SECRET);
    let envelope = verifier.seal(notification().as_bytes());
    let forged = Pay2Verifier::new("other").seal(notification().as_bytes());

    let mut group = c.benchmark_group("pay2");
    group.bench_function("verify_and_decrypt", |b| {
        b.iter(|| verifier.verify_and_decrypt(black_box(&envelope)))
    });
    group.bench_function("reject_forged", |b| {
        b.iter(|| verifier.verify_and_decrypt(black_box(&forged)))
    });
    group.bench_function("seal", |b| {
        let payload = notification();
        b.iter(|| verifier.seal(black_box(payload.as_bytes())))
    });
    group.finish();
}

fn bench_antiflood_check(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let limiter = AntiFlood::new(InMemoryCounterStore::default(), AntiFloodConfig::default());
    let actor = Actor::user("42");

    c.bench_function("antiflood_check_in_memory", |b| {
        b.to_async(&rt).iter(|| async {
            limiter
                .check(black_box(&actor), "login", Some(u32::MAX), None)
                .await
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_verify_and_decrypt, bench_antiflood_check);
criterion_main!(benches);
