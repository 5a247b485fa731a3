//! Tokenizer benchmarks.
//!
//! Run with: `cargo bench`

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ps_object_parser::Tokenizer;

fn token_count(source: &[u8]) -> usize {
    let mut tok = Tokenizer::new(Cursor::new(source.to_vec())).unwrap();
    let mut count = 0;
    loop {
        match tok.next_token() {
            Ok(_) => count += 1,
            Err(_) => break,
        }
    }
    count
}

fn bench_flat_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer");

    let source = b"123 3.14 true /Name (hi there) <4869> [1 2 3 4 5]";
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("flat_values", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

fn bench_nested_dict(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer_dict");

    let source =
        b"<< /Type /Page /Parent 1 0 R /Resources << /Font << /F1 2 0 R >> >> /MediaBox [0 0 612 792] >>";
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("page_dict", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

fn bench_large_buffer_refill(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer_refill");

    // Exceeds BUFSIZ (4096) so the benchmark exercises at least one
    // mid-array buffer refill.
    let mut source = Vec::new();
    source.push(b'[');
    for i in 0..2000 {
        source.extend_from_slice(format!("{i} ").as_bytes());
    }
    source.push(b']');
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("long_array", |b| {
        b.iter(|| token_count(black_box(&source)))
    });

    group.finish();
}

fn bench_hex_and_literal_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer_strings");

    group.bench_function("hex_string", |b| {
        b.iter(|| token_count(black_box(b"<48656c6c6f2c20776f726c6421>")))
    });

    group.bench_function("literal_string_with_escapes", |b| {
        b.iter(|| token_count(black_box(b"(line one\\nline two\\t(nested) end)")))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_flat_values,
    bench_nested_dict,
    bench_large_buffer_refill,
    bench_hex_and_literal_strings
);
criterion_main!(benches);
