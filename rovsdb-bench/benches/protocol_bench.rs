//! Protocol encoding/decoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rovsdb_protocol::{
    decode_transact_reply, Decoder, Encoder, Operation, Request, Row, Value,
};
use serde_json::json;
use uuid::Uuid;

fn create_test_row(columns: usize) -> Row {
    let mut row = Row::new()
        .with("_uuid", Uuid::from_u128(0x42))
        .with("ports", Value::set(["eth0", "eth1", "eth2"]));
    for i in 0..columns {
        row.insert(format!("column_{i}"), format!("value_{i}"));
    }
    row
}

fn create_transact_request(operations: usize) -> Request {
    let mut params = vec![json!("Open_vSwitch")];
    for i in 0..operations {
        let op = Operation::insert("Bridge", create_test_row(4).with("index", i as i64));
        params.push(serde_json::to_value(&op).unwrap());
    }
    Request::new("bench-1", "transact", params)
}

fn create_update_notification(rows: usize) -> Request {
    let mut table = serde_json::Map::new();
    for i in 0..rows {
        table.insert(
            Uuid::from_u128(i as u128).to_string(),
            json!({"new": {"name": format!("br{i}"), "datapath_id": i}}),
        );
    }
    Request::notification("update", vec![json!("m1"), json!({ "Bridge": table })])
}

fn bench_value_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_encode");

    for size in [10, 100, 1000] {
        let value = Value::set((0..size).map(|i| i as i64));

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &value, |b, value| {
            b.iter(|| black_box(value.to_json()));
        });
    }

    group.finish();
}

fn bench_value_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_decode");

    for size in [10, 100, 1000] {
        let encoded = Value::set((0..size).map(|i| i as i64)).to_json();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| black_box(Value::from_json(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_row_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_decode");

    for size in [4, 16, 64] {
        let encoded = create_test_row(size).to_json();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| black_box(Row::from_json(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_request_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encode");

    for size in [1, 10, 100] {
        let request = create_transact_request(size);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| black_box(Encoder::encode_request(request).unwrap()));
        });
    }

    group.finish();
}

fn bench_stream_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decode");

    for count in [1, 10, 100] {
        let mut stream = Vec::new();
        for _ in 0..count {
            stream.extend_from_slice(&Encoder::encode_request(&create_update_notification(8)).unwrap());
        }

        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &stream, |b, stream| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(stream);
                while let Some(message) = decoder.decode_message().unwrap() {
                    black_box(message);
                }
            });
        });
    }

    group.finish();
}

fn bench_transact_reply_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("transact_reply_decode");

    for size in [1, 10, 100] {
        let rows: Vec<_> = (0..size).map(|i| create_test_row(4).with("index", i as i64).to_json()).collect();
        let reply = json!([{ "rows": rows }]);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &reply, |b, reply| {
            b.iter(|| black_box(decode_transact_reply(reply, 1).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_value_encode,
    bench_value_decode,
    bench_row_decode,
    bench_request_encode,
    bench_stream_decode,
    bench_transact_reply_decode,
);

criterion_main!(benches);
