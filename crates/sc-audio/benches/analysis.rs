use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sc_audio::analyser::Analyser;
use sc_audio::beat::BeatDetector;
use sc_audio::pitch::PitchDetector;
use sc_audio::spectrum::SpectrumPipeline;
use sc_core::config::AnalyserConfig;

fn harmonic_spectrum(n: usize, period: usize) -> Vec<f32> {
    (0..n)
        .map(|k| {
            let phase = 2.0 * std::f32::consts::PI * (k % period) as f32 / period as f32;
            0.5 + 0.5 * phase.cos()
        })
        .collect()
}

fn bench_beat(c: &mut Criterion) {
    let config = AnalyserConfig::default();
    let mut detector = BeatDetector::new(&config).unwrap();
    let spectrum = harmonic_spectrum(config.block_size, 16);
    c.bench_function("beat_estimate_16x44", |b| {
        b.iter(|| {
            let (volume, _) = detector.estimate(black_box(&spectrum));
            black_box(volume);
        });
    });
}

fn bench_pitch(c: &mut Criterion) {
    let config = AnalyserConfig::default();
    let mut detector = PitchDetector::new(&config).unwrap();
    let spectrum = harmonic_spectrum(config.block_size, 16);
    c.bench_function("pitch_estimate_1024", |b| {
        b.iter(|| black_box(detector.estimate(black_box(&spectrum))[0]));
    });
}

fn bench_block(c: &mut Criterion) {
    let config = AnalyserConfig::default();
    let mut pipeline = SpectrumPipeline::new(config.block_size);
    let mut analyser = Analyser::new(config).unwrap();
    let samples: Vec<f32> = (0..pipeline.fft_size())
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
        .collect();
    c.bench_function("samples_to_frame_2048", |b| {
        b.iter(|| {
            let spectrum = pipeline.process(black_box(&samples));
            black_box(analyser.process(spectrum).volume);
        });
    });
}

criterion_group!(benches, bench_beat, bench_pitch, bench_block);
criterion_main!(benches);
