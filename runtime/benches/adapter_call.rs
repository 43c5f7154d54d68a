//! Adapter call benchmarks
//!
//! Measures a full synchronous call: scope construction, a fresh execution
//! context, the HTTP cycle and response marshalling.
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;
use vellox_runtime::{Adapter, Request};
use vellox_testing::apps::{LifespanProbe, echo_app, json_app};

fn bench_json_call(c: &mut Criterion) {
    let probe = LifespanProbe::new();
    let adapter = Adapter::builder(probe.wrap(json_app(&json!({"Hello": "World"}))))
        .lifespan("on")
        .build()
        .expect("valid configuration");
    adapter.startup().expect("startup completes");

    c.bench_function("adapter_call_json", |b| {
        b.iter(|| {
            let response = adapter
                .call(black_box(Request::new("GET", "/")))
                .expect("call succeeds");
            black_box(response);
        });
    });

    adapter.shutdown();
}

fn bench_echo_body_sizes(c: &mut Criterion) {
    let adapter = Adapter::builder(echo_app())
        .lifespan("off")
        .build()
        .expect("valid configuration");

    let mut group = c.benchmark_group("adapter_call_echo");
    for size in [0_usize, 1024, 64 * 1024] {
        let body = vec![0xAB_u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{size}_bytes"), |b| {
            b.iter(|| {
                let request = Request::new("POST", "/")
                    .with_header("content-type", "application/octet-stream")
                    .with_body(body.clone());
                let response = adapter.call(request).expect("call succeeds");
                black_box(response);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_json_call, bench_echo_body_sizes);
criterion_main!(benches);
