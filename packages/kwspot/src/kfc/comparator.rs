//! KFC comparator: frame distance, probability mapping and offline
//! template-to-template scoring.

use core::cmp::min;

use super::{FeatureVector, dtw::Dtw};

/// Local distance between two frames in `[0, 2]`.
///
/// Two silent frames match perfectly; a silent frame against a voiced one is
/// a fixed mismatch of `1.0`. Voiced frames use `1 - cosine_similarity`.
#[inline]
pub fn frame_distance(a: &FeatureVector, b: &FeatureVector) -> f32 {
    match (a.silent, b.silent) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => (1.0 - cosine_similarity(&a.coeffs, &b.coeffs)).clamp(0.0, 2.0),
    }
}

/// Cosine similarity ∈ \[-1, 1\] (truncated to min length when slices differ).
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = min(a.len(), b.len());
    if n == 0 {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for i in 0..n {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 { dot / denom } else { 0.0 }
}

/// Logistic map from a normalised alignment cost to a `[0, 1]` score.
/// `score_ref` maps to `0.5`; lower costs score higher. Non-finite costs
/// score `0.0`.
#[inline]
pub fn cost_to_probability(cost: f32, score_ref: f32) -> f32 {
    if !cost.is_finite() {
        return 0.0;
    }
    1.0 / (1.0 + ((cost - score_ref) / score_ref).exp())
}

/// Dynamic-time-warping **KFC comparator** for whole sequences.
///
/// Used while building keyword files to report how consistent the
/// recordings are; the live path scores frame by frame instead.
///
/// ```
/// # use kwspot::kfc::{FeatureVector, KfcComparator};
/// let voiced = |c: f32| FeatureVector { coeffs: vec![c, 1.0], energy_db: -20.0, silent: false };
/// let a = vec![voiced(0.1), voiced(0.5), voiced(0.9)];
/// let mut cmp = KfcComparator::new(0.22, 5);
/// assert!(cmp.compare(&a, &a) > 0.7);
/// ```
#[derive(Debug)]
pub struct KfcComparator {
    score_ref: f32,
    band_size: u16,
    dtw: Dtw,
}

impl Clone for KfcComparator {
    fn clone(&self) -> Self {
        Self::new(self.score_ref, self.band_size)
    }
}

impl KfcComparator {
    /// * `score_ref` - reference cost that maps to 0.5 probability
    /// * `band_size` - Sakoe-Chiba band width (frames) for the DTW window
    pub fn new(score_ref: f32, band_size: u16) -> Self {
        Self {
            score_ref,
            band_size,
            dtw: Dtw::new(),
        }
    }

    /// Compare two feature sequences and return a **0-1 score**.
    ///
    /// The band is widened to the length difference so sequences of
    /// different duration can always be aligned.
    pub fn compare(&mut self, a: &[FeatureVector], b: &[FeatureVector]) -> f32 {
        let window = (self.band_size as usize).max(a.len().abs_diff(b.len()));
        let cost = self.dtw.compute(a, b, frame_distance, Some(window));
        let norm = cost / (a.len() + b.len()).max(1) as f32;
        cost_to_probability(norm, self.score_ref)
    }
}
