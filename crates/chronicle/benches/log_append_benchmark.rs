//! Benchmark for log recording.
//!
//! TARGET: 500,000 entries per second into memory
//!
//! Run with: cargo bench --package chronicle --bench log_append_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use chronicle::model::{encode_message, types};
use chronicle::replay::{LogStreamReader, LogStreamWriter};
use chronicle::{ActorId, Message};
use std::io::Cursor;

fn sample_payload() -> Vec<u8> {
    let msg = Message::new(types::INFO_ACTOR_UPDATED)
        .about(ActorId::generate())
        .with("position", [10.0_f32, 20.0, 0.5])
        .with("heading", 1.57_f64)
        .with("fuel", 0.8_f64)
        .with("callsign", "VIPER 1");
    encode_message(&msg).unwrap()
}

fn benchmark_append(c: &mut Criterion) {
    let payload = sample_payload();

    let mut group = c.benchmark_group("log_append");
    group.throughput(Throughput::Elements(10_000));
    group.sample_size(20);

    group.bench_function("10k_entries_to_memory", |b| {
        b.iter(|| {
            let mut writer = LogStreamWriter::from_sink(Vec::with_capacity(1 << 20), "bench");
            for i in 0..10_000u64 {
                writer.append(i * 16_000, black_box(&payload)).unwrap();
            }
            black_box(writer.close(10_000 * 16_000).unwrap())
        });
    });

    group.finish();
}

fn benchmark_read_back(c: &mut Criterion) {
    let payload = sample_payload();
    let mut bytes = Vec::new();
    let mut writer = LogStreamWriter::from_sink(&mut bytes, "bench");
    for i in 0..10_000u64 {
        writer.append(i * 16_000, &payload).unwrap();
    }
    writer.close(10_000 * 16_000).unwrap();

    let mut group = c.benchmark_group("log_read");
    group.throughput(Throughput::Elements(10_000));
    group.sample_size(20);

    group.bench_function("10k_entries_from_memory", |b| {
        b.iter(|| {
            let mut reader = LogStreamReader::from_source(Cursor::new(bytes.as_slice()), "bench").unwrap();
            let mut count = 0u32;
            while let Some(entry) = reader.next_entry().unwrap() {
                black_box(&entry);
                count += 1;
            }
            black_box(count)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_append, benchmark_read_back);
criterion_main!(benches);
