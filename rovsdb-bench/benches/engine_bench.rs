//! Correlation engine benchmarks.

use async_trait::async_trait;
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rovsdb_client::{Arity, HandlerTable, RpcEngine, Transport};
use serde_json::{json, Value as Json};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Swallows outbound bytes so only the engine itself is measured.
struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn send(&self, _data: Bytes) -> io::Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

fn bench_call_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = RpcEngine::new(
        Arc::new(NullTransport),
        HandlerTable::new(),
        Duration::from_secs(60),
    );

    let mut group = c.benchmark_group("engine_call");
    group.throughput(Throughput::Elements(1));

    group.bench_function("round_trip", |b| {
        let mut id = 0u64;
        b.to_async(&rt).iter(|| {
            id += 1;
            let id = id.to_string();
            let engine = engine.clone();
            async move {
                let handle = engine
                    .call::<i64>(id.clone(), "echo", vec![json!(1)])
                    .await
                    .unwrap();
                engine
                    .handle_message(json!({"id": id, "result": 7, "error": null}))
                    .await
                    .unwrap();
                black_box(handle.wait().await.unwrap())
            }
        });
    });

    group.finish();
}

fn bench_notification_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut handlers = HandlerTable::new();
    handlers
        .register("echo", Arity::at_least(0), |params| Ok(Json::Array(params)))
        .unwrap();
    let engine = RpcEngine::new(
        Arc::new(NullTransport),
        handlers,
        Duration::from_secs(60),
    );
    let notification = json!({"method": "echo", "params": [1, 2, 3], "id": null});

    let mut group = c.benchmark_group("engine_dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("notification", |b| {
        b.to_async(&rt).iter(|| {
            let engine = engine.clone();
            let message = notification.clone();
            async move { black_box(engine.handle_message(message).await.unwrap()) }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_call_round_trip, bench_notification_dispatch);

criterion_main!(benches);
