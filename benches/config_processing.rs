//! 配置处理基准测试
//!
//! 测试配置解析和缓存查询的性能

use confwatch::config::{ConfigCache, KeyValueLoader, ParsedFile};
use confwatch::PlatformWatcher;
use criterion::{criterion_group, criterion_main, Criterion};
use std::fs;
use std::hint::black_box;

fn sample_content(lines: usize) -> String {
    let mut content = String::new();
    for i in 0..lines {
        content.push_str(&format!("key_{i} = value_{i}\n"));
        if i % 10 == 0 {
            content.push_str("# 没有等号的行会被跳过\n");
        }
    }
    content
}

/// 配置解析基准测试
fn config_parsing_benchmark(c: &mut Criterion) {
    let small = sample_content(10);
    let large = sample_content(1000);

    c.bench_function("parse_small_file", |b| {
        b.iter(|| black_box(ParsedFile::parse(black_box(&small))))
    });

    c.bench_function("parse_large_file", |b| {
        b.iter(|| black_box(ParsedFile::parse(black_box(&large))))
    });
}

/// 缓存查询基准测试
fn cache_lookup_benchmark(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().expect("创建临时目录失败");
    for i in 0..50 {
        fs::write(dir.path().join(format!("file_{i}")), sample_content(100)).expect("写入失败");
    }

    let cache = ConfigCache::with_parts(KeyValueLoader::new(), PlatformWatcher::default());
    assert!(cache.watch_directory(dir.path()));

    c.bench_function("cache_lookup_hit", |b| {
        b.iter(|| black_box(cache.load(black_box("file_25"), black_box("key_50"))))
    });

    c.bench_function("cache_lookup_miss", |b| {
        b.iter(|| black_box(cache.load(black_box("file_25"), black_box("missing"))))
    });
}

criterion_group!(benches, config_parsing_benchmark, cache_lookup_benchmark);
criterion_main!(benches);
