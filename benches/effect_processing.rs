//! Per-effect `process_block` throughput, at the buffer sizes a real host
//! would actually use.
//!
//! Grounded in `alexnodeland-quiver`'s `benches/audio_performance.rs` (the
//! closest in-pack example of a criterion harness over a DSP crate): same
//! sample-rate/buffer-size sweep shape, scaled down to this crate's five
//! effects instead of quiver's patchable graph.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sox_dsp_core::effect::Effect;
use sox_dsp_core::registry::{EffectKind, ALL_EFFECT_KINDS};

const SAMPLE_RATE: f64 = 48_000.0;
const BUFFER_SIZES: [usize; 3] = [64, 256, 1024];

fn make_buffer(channel_count: usize, block_size: usize) -> Vec<Vec<f64>> {
    (0..channel_count)
        .map(|_| {
            (0..block_size)
                .map(|i| ((i as f64) * 0.01).sin())
                .collect()
        })
        .collect()
}

fn bench_effect(c: &mut Criterion, kind: EffectKind) {
    let mut group = c.benchmark_group(format!("process_block/{}", kind.name()));
    for &block_size in &BUFFER_SIZES {
        group.throughput(Throughput::Elements(block_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &block_size| {
            let mut effect = kind.construct();
            effect.prepare(SAMPLE_RATE);
            let mut buffer = make_buffer(2, block_size);
            let mut time_position = 0.0;
            b.iter(|| {
                effect.process_block(time_position, black_box(&mut buffer));
                time_position += block_size as f64 / SAMPLE_RATE;
            });
        });
    }
    group.finish();
}

fn bench_all_effects(c: &mut Criterion) {
    for kind in ALL_EFFECT_KINDS {
        bench_effect(c, kind);
    }
}

criterion_group!(benches, bench_all_effects);
criterion_main!(benches);
