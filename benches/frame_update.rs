//! Benchmarks for the per-frame CPU work.
//!
//! Run with: `cargo bench`

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;

use backdrop::particles::{ParticleConfig, ParticleField};
use backdrop::prelude::*;
use backdrop::terrain::Terrain;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_particle_jitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("particle_jitter");

    for count in [50u32, 1_000, 10_000] {
        let config = ParticleConfig {
            count,
            ..Default::default()
        };
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(1));
        let mut t = 0.0f32;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                t += 1.0 / 60.0;
                field.update(black_box(t));
            })
        });
    }

    group.finish();
}

fn bench_terrain_shade(c: &mut Criterion) {
    let config = EffectsConfig::default();
    let mut terrain = Terrain::new(&config.terrain, &config.theme);
    terrain.update(3.0);

    c.bench_function("terrain_shade_grid", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..=20 {
                for j in 0..=20 {
                    let uv = Vec2::new(i as f32 / 20.0, j as f32 / 20.0);
                    let x = uv.x * 20.0 - 10.0;
                    let z = 10.0 - uv.y * 20.0;
                    acc += terrain.shade(x, z, uv)[3];
                }
            }
            black_box(acc)
        })
    });
}

fn bench_trail_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("trail");

    group.bench_function("pointer_move", |b| {
        let mut layer = EffectsLayer::mount(EffectsConfig::default().with_seed(1)).unwrap();
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            layer.handle_pointer_move(black_box((i % 1280) as f32), black_box((i % 720) as f32));
        })
    });

    group.bench_function("frame_with_decay", |b| {
        let start = Instant::now();
        let mut layer = EffectsLayer::mount_at(EffectsConfig::default().with_seed(1), start).unwrap();
        let mut now = start;
        b.iter(|| {
            for k in 0..3 {
                layer.handle_pointer_move(k as f32, k as f32);
            }
            now += Duration::from_millis(16);
            layer.poll_timers(now);
            layer.update(1.0 / 60.0);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_particle_jitter, bench_terrain_shade, bench_trail_events);
criterion_main!(benches);
