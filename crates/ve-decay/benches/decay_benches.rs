//! Criterion benchmarks for ve-decay critical operations.
//!
//! Covers: fixed-point products, fresh checkpoint derivation, and the
//! week-stride walk across a full maximum-length lock.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ve_core::constants::{MAX_LOCK_DURATION, TOKEN, WEEK};
use ve_core::traits::DecayCurve;
use ve_decay::{mul_div, walk, LinearDecay};

fn bench_mul_div(c: &mut Criterion) {
    let a = 123_456_789 * TOKEN;
    c.bench_function("mul_div", |b| {
        b.iter(|| mul_div(black_box(a), black_box(1_000_000_000_000_000_000), black_box(3 * WEEK as u128)))
    });
}

fn bench_fresh_point(c: &mut Criterion) {
    let engine = LinearDecay::new();
    c.bench_function("fresh_point", |b| {
        b.iter(|| {
            engine.fresh_point(
                black_box(1_000 * TOKEN),
                black_box(52 * WEEK),
                MAX_LOCK_DURATION,
                black_box(0),
            )
        })
    });
}

fn bench_walk_full_lock(c: &mut Criterion) {
    let engine = LinearDecay::new();
    // 208 locks, one expiring at every week boundary.
    let mut schedule = BTreeMap::new();
    let mut total = ve_core::types::Point::ZERO;
    for week in 1..=208u64 {
        let p = engine
            .fresh_point(1_000 * TOKEN, week * WEEK, MAX_LOCK_DURATION, 0)
            .unwrap();
        total.bias += p.bias;
        total.slope += p.slope;
        schedule.insert(week * WEEK, p.slope);
    }

    c.bench_function("walk_208_weeks", |b| {
        b.iter(|| {
            walk(&engine, black_box(&total), MAX_LOCK_DURATION, |ts| {
                schedule.get(&ts).copied().unwrap_or(0)
            })
        })
    });
}

criterion_group!(benches, bench_mul_div, bench_fresh_point, bench_walk_full_lock);
criterion_main!(benches);
