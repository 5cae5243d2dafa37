//! Benchmarks for waveform rendering and WAV decoding
//!
//! The comparison tab redraws both canvases on every resize, so bar
//! reduction has to stay well under a frame even for a full 10 s capture.
//!
//! ```bash
//! cargo bench --bench waveform
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pronunciation_guide::decode::parse_wav;
use pronunciation_guide::waveform::{self, RecordingSurface, WaveformConfig, USER_COLOR};
use std::hint::black_box;

/// Synthetic voiced signal: a decaying 220 Hz tone
fn generate_samples(seconds: usize, rate: usize) -> Vec<f32> {
    (0..seconds * rate)
        .map(|i| {
            let t = i as f32 / rate as f32;
            (t * 220.0 * std::f32::consts::TAU).sin() * (-t * 0.3).exp()
        })
        .collect()
}

/// 16-bit mono WAV payload
fn generate_wav(seconds: usize, rate: u32) -> Vec<u8> {
    let samples = generate_samples(seconds, rate as usize);
    let data: Vec<u8> = samples
        .iter()
        .flat_map(|s| ((s * 32767.0) as i16).to_le_bytes())
        .collect();
    let mut out = Vec::with_capacity(44 + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data.len()) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.extend_from_slice(&(rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&data);
    out
}

/// Benchmark bar reduction for typical recording lengths
fn bench_amplitude_bars(c: &mut Criterion) {
    let mut group = c.benchmark_group("amplitude_bars");

    for seconds in [1, 3, 10] {
        let samples = generate_samples(seconds, 48_000);
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(seconds), &samples, |b, samples| {
            b.iter(|| black_box(waveform::amplitude_bars(black_box(samples), 100, 1.0)));
        });
    }

    group.finish();
}

/// Benchmark a full canvas paint
fn bench_render(c: &mut Criterion) {
    let config = WaveformConfig::default();
    let samples = generate_samples(10, 48_000);

    c.bench_function("render_samples_10s", |b| {
        b.iter(|| {
            let mut surface = RecordingSurface::new(600.0, 120.0);
            waveform::render(&mut surface, Some(black_box(&samples)), USER_COLOR, &config);
            black_box(surface);
        });
    });

    c.bench_function("render_fallback", |b| {
        b.iter(|| {
            let mut surface = RecordingSurface::new(600.0, 120.0);
            waveform::render(&mut surface, None, USER_COLOR, &config);
            black_box(surface);
        });
    });
}

/// Benchmark WAV parsing
fn bench_parse_wav(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_wav");

    for seconds in [1, 10] {
        let wav = generate_wav(seconds, 16_000);
        group.throughput(Throughput::Bytes(wav.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(seconds), &wav, |b, wav| {
            b.iter(|| black_box(parse_wav(black_box(wav))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_amplitude_bars, bench_render, bench_parse_wav);

criterion_main!(benches);
