//! Criterion benchmarks for unified_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use unified_logger::core::formatter::WebhookPayload;
use unified_logger::prelude::*;
use unified_logger::{LocalSink, MessageFormatter};

fn sample_record() -> LogRecord {
    LogRecord::new(LogLevel::Warn, "Request to /api/orders took 1840ms").with_metadata(
        Metadata::new()
            .with_field("route", "/api/orders")
            .with_field("status", 200i64)
            .with_field("cached", false),
    )
}

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));
    let record = sample_record();

    group.bench_function("text_line", |b| {
        b.iter(|| OutputFormat::Text.render(black_box(&record), &TimestampFormat::Iso8601));
    });

    group.bench_function("json_line", |b| {
        b.iter(|| OutputFormat::Json.render(black_box(&record), &TimestampFormat::Iso8601));
    });

    group.bench_function("webhook_payload", |b| {
        b.iter(|| WebhookPayload::from_record(black_box(&record), "bench", 1900).to_json());
    });

    group.finish();
}

fn bench_message_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_processing");
    group.throughput(Throughput::Elements(1));

    let plain = MessageFormatter::default();
    let filtered = MessageFormatter::new(
        10_000,
        &["password".to_string(), "token".to_string(), "secret".to_string()],
    );
    let long = "x".repeat(20_000);

    group.bench_function("no_filters", |b| {
        b.iter(|| plain.process_message(black_box("user 42 logged in")));
    });

    group.bench_function("three_filters", |b| {
        b.iter(|| filtered.process_message(black_box("user 42 logged in")));
    });

    group.bench_function("truncate_long", |b| {
        b.iter(|| plain.process_message(black_box(&long)));
    });

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime");
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let logger = UnifiedLogger::builder()
        .min_level(LogLevel::Info)
        .sink(LocalSink::new(temp_dir.path().join("bench.log")).expect("Failed to create sink"))
        .build();

    group.bench_function("local_sink", |b| {
        b.iter(|| runtime.block_on(logger.info(black_box("Benchmark message"))));
    });

    group.bench_function("suppressed_by_level", |b| {
        b.iter(|| runtime.block_on(logger.debug(black_box("Filtered message"))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_formatting,
    bench_message_processing,
    bench_dispatch
);
criterion_main!(benches);
