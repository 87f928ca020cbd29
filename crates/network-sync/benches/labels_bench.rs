//! 레이블 정책 벤치마크
//!
//! 이벤트마다 호출되는 범위 판정과 목표 네트워크 계산의 비용을 측정합니다.

use std::collections::HashMap;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use dragonify_core::types::ContainerInfo;
use dragonify_network_sync::LabelPolicy;
use dragonify_network_sync::labels::{NETWORKS_LABEL, PROJECT_LABEL, SERVICE_LABEL, dns_alias};

fn container(network_count: usize) -> ContainerInfo {
    let networks = (0..network_count)
        .map(|i| format!("net-{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    ContainerInfo {
        id: "0123456789abcdef".to_owned(),
        names: vec!["ix-bench-web-1".to_owned()],
        labels: HashMap::from([
            (PROJECT_LABEL.to_owned(), "ix-bench".to_owned()),
            (SERVICE_LABEL.to_owned(), "web".to_owned()),
            (NETWORKS_LABEL.to_owned(), networks),
        ]),
        networks: Default::default(),
        network_mode: "bridge".to_owned(),
    }
}

fn bench_desired_networks(c: &mut Criterion) {
    let policy = LabelPolicy::new(
        "ix-",
        true,
        vec!["apps-internal".to_owned(), "shared".to_owned()],
    );

    let mut group = c.benchmark_group("desired_networks");
    for count in [1_usize, 8, 64] {
        let target = container(count);
        group.bench_function(format!("{count}_networks"), |b| {
            b.iter(|| policy.desired_networks(black_box(&target)))
        });
    }
    group.finish();
}

fn bench_scope_and_alias(c: &mut Criterion) {
    let policy = LabelPolicy::new("ix-", false, Vec::new());
    let target = container(1);

    c.bench_function("is_in_scope", |b| {
        b.iter(|| policy.is_in_scope(black_box(&target)))
    });
    c.bench_function("dns_alias", |b| b.iter(|| dns_alias(black_box(&target))));
}

criterion_group!(benches, bench_desired_networks, bench_scope_and_alias);
criterion_main!(benches);
