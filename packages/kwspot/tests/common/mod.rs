//! Shared fixtures: synthetic audio and resource files on disk.
#![allow(dead_code)]

use std::{f32::consts::PI, path::PathBuf, sync::Arc};

use kwspot::{
    CborSave, KeywordSpec, ModelParams, PcmChunker, keyword::build_from_samples,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tempfile::TempDir;

pub const SAMPLE_RATE: f32 = 16_000.0;
pub const FRAME: usize = 512;
const AMPLITUDE: f32 = 0.3 * 32_767.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sum of equal-amplitude sines, `frames * FRAME` samples long.
pub fn tones(freqs: &[f32], frames: usize) -> Vec<i16> {
    (0..frames * FRAME)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE;
            let v: f32 = freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum();
            (AMPLITUDE * v / freqs.len() as f32) as i16
        })
        .collect()
}

/// Linear chirp from `f0` to `f1` Hz, built by phase accumulation.
pub fn chirp(f0: f32, f1: f32, frames: usize) -> Vec<i16> {
    let len = frames * FRAME;
    let mut phase = 0.0f32;
    (0..len)
        .map(|n| {
            let f = f0 + (f1 - f0) * n as f32 / len as f32;
            phase = (phase + 2.0 * PI * f / SAMPLE_RATE) % (2.0 * PI);
            (AMPLITUDE * phase.sin()) as i16
        })
        .collect()
}

/// Seeded uniform noise with the given peak amplitude (full scale = 1.0).
pub fn noise(seed: u64, frames: usize, peak: f32) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames * FRAME)
        .map(|_| (rng.random_range(-peak..=peak) * 32_767.0) as i16)
        .collect()
}

pub fn silence(frames: usize) -> Vec<i16> {
    vec![0; frames * FRAME]
}

/// The synthetic keyword: a two-tone chord, a single tone, then a rising
/// chirp. 24 frames of 512 samples.
pub fn keyword_pcm() -> Vec<i16> {
    let mut pcm = tones(&[600.0, 1_800.0], 8);
    pcm.extend(tones(&[1_200.0], 6));
    pcm.extend(chirp(400.0, 3_000.0, 10));
    pcm
}

pub const KEYWORD_FRAMES: usize = 24;

/// Mix `b` into `a` sample by sample (saturating).
pub fn mix(a: &[i16], b: &[i16]) -> Vec<i16> {
    a.iter().zip(b).map(|(x, y)| x.saturating_add(*y)).collect()
}

pub fn frames(pcm: &[i16]) -> Vec<Vec<i16>> {
    PcmChunker::new(pcm, FRAME).collect()
}

pub fn model() -> ModelParams {
    ModelParams::default()
}

pub fn keyword_for(model: &ModelParams) -> KeywordSpec {
    build_from_samples("synth", &model.features, [("synth-1", keyword_pcm())])
        .expect("synthetic keyword builds")
}

pub fn parts() -> (Arc<ModelParams>, Arc<KeywordSpec>) {
    let m = model();
    let k = keyword_for(&m);
    (Arc::new(m), Arc::new(k))
}

/// Model and keyword written to a fresh temp dir.
pub struct Resources {
    pub dir: TempDir,
    pub model: PathBuf,
    pub keyword: PathBuf,
}

pub fn write_resources(model: &ModelParams, keyword: &KeywordSpec) -> Resources {
    let dir = tempfile::tempdir().expect("tempdir");
    let model_path = dir.path().join("model.kwm");
    let keyword_path = dir.path().join("synth.kwk");
    model.save_to_file(&model_path).expect("write model");
    keyword.save_to_file(&keyword_path).expect("write keyword");
    Resources {
        dir,
        model: model_path,
        keyword: keyword_path,
    }
}

pub fn default_resources() -> Resources {
    let m = model();
    let k = keyword_for(&m);
    write_resources(&m, &k)
}

/// Indices of the frames that fired.
pub fn detections(spotter: &mut kwspot::KeywordSpotter, pcm: &[i16]) -> Vec<usize> {
    frames(pcm)
        .iter()
        .enumerate()
        .filter_map(|(i, f)| spotter.process(f).expect("frame accepted").then_some(i))
        .collect()
}

/// Background-noise-free stream: silence, keyword, silence.
pub fn keyword_stream(lead: usize, tail: usize) -> Vec<i16> {
    let mut pcm = silence(lead);
    pcm.extend(keyword_pcm());
    pcm.extend(silence(tail));
    pcm
}

/// Deterministic random frame offsets for jitter-style tests.
pub fn random_leads(seed: u64, n: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(5..40)).collect()
}
