//! Permission engine benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gatehouse_authz::PermissionEngine;
use tokio::runtime::Runtime;

async fn engine_with_rules(count: usize) -> PermissionEngine {
    let engine = PermissionEngine::in_memory().await.unwrap();
    for i in 0..count {
        engine
            .add_subject_to_role(&format!("user-{}", i), &format!("group-{}", i % 10))
            .await
            .unwrap();
        engine
            .add_permission(&format!("group-{}", i % 10), &format!("/r/{}/", i), &["GET", "POST"])
            .await
            .unwrap();
    }
    engine
}

fn bench_authorize(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("authorize");

    for rule_count in [10, 100, 1000].iter() {
        let engine = rt.block_on(engine_with_rules(*rule_count));

        group.bench_with_input(BenchmarkId::new("allowed", rule_count), rule_count, |b, &count| {
            let resource = format!("/r/{}/item", count - 1);
            let subject = format!("user-{}", count - 1);
            b.to_async(&rt)
                .iter(|| async { black_box(engine.authorize(&subject, &resource, "GET").await) });
        });

        group.bench_with_input(BenchmarkId::new("denied", rule_count), rule_count, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(engine.authorize("nobody", "/nowhere", "GET").await) });
        });
    }

    group.finish();
}

fn bench_transitive_groups(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = rt.block_on(async {
        let engine = PermissionEngine::in_memory().await.unwrap();
        for depth in 0..16 {
            engine
                .add_subject_to_role(&format!("level-{}", depth), &format!("level-{}", depth + 1))
                .await
                .unwrap();
        }
        engine.add_permission("level-16", "/", &["ALL"]).await.unwrap();
        engine
    });

    c.bench_function("authorize_depth_16", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(engine.authorize("level-0", "/deep", "DELETE").await) });
    });
}

criterion_group!(benches, bench_authorize, bench_transitive_groups);
criterion_main!(benches);
