//! Model parameters: the immutable bundle loaded once per engine.
//!
//! The bundle is a CBOR document (see [`crate::persist`]) made of three
//! sections: how features are computed, how templates are scored and how
//! scores turn into detections.

use serde::{Deserialize, Serialize};

use crate::{
    config::{BandPassConfig, ScoreMode},
    constants::*,
    decision::Sensitivity,
    persist::{CborLoad, CborSave},
};

/// Feature-extraction layout. Keyword templates record the layout they were
/// computed with and must match the model exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Sample rate of the incoming PCM (Hz).
    pub sample_rate: usize,
    /// Samples per `process` call.
    pub frame_length: usize,
    /// Samples per analysis window (`>= frame_length`).
    pub window_length: usize,
    /// Triangular mel filters.
    pub mel_bins: usize,
    /// Cepstral coefficients kept per frame.
    pub coeffs: usize,
    /// Lower filter-bank edge (Hz).
    pub low_freq: f32,
    /// Upper filter-bank edge (Hz).
    pub high_freq: f32,
    /// Pre-emphasis coefficient.
    pub pre_emphasis: f32,
    /// Energy floor below which a frame counts as silent (dBFS).
    pub silence_floor_db: f32,
    /// Per-frame dynamic range of the log-mel energies (dB).
    pub mel_dynamic_range_db: f32,
    /// Optional band-pass pre-filter.
    pub band_pass: Option<BandPassConfig>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: DETECTOR_INTERNAL_SAMPLE_RATE,
            frame_length: DEFAULT_FRAME_LENGTH,
            window_length: DEFAULT_WINDOW_LENGTH,
            mel_bins: KFC_MEL_BINS,
            coeffs: KFC_COEFFS,
            low_freq: KFC_LOW_FREQ,
            high_freq: KFC_HIGH_FREQ,
            pre_emphasis: PRE_EMPHASIS,
            silence_floor_db: SILENCE_FLOOR_DB,
            mel_dynamic_range_db: MEL_DYNAMIC_RANGE_DB,
            band_pass: None,
        }
    }
}

impl FeatureConfig {
    /// FFT length: the analysis window rounded up to a power of two.
    /// Saturates at `usize::MAX` for windows too long to round up.
    pub fn fft_size(&self) -> usize {
        self.window_length
            .checked_next_power_of_two()
            .unwrap_or(usize::MAX)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample_rate must be positive".into());
        }
        if self.frame_length == 0 {
            return Err("frame_length must be positive".into());
        }
        if self.window_length < self.frame_length {
            return Err(format!(
                "window_length ({}) must be >= frame_length ({})",
                self.window_length, self.frame_length
            ));
        }
        if self.window_length > MAX_WINDOW_LENGTH {
            return Err(format!(
                "window_length ({}) exceeds {MAX_WINDOW_LENGTH}",
                self.window_length
            ));
        }
        let power_bins = self.fft_size() / 2 + 1;
        if self.mel_bins > MAX_MEL_BINS.min(power_bins) {
            return Err(format!(
                "mel_bins ({}) must not exceed {}",
                self.mel_bins,
                MAX_MEL_BINS.min(power_bins)
            ));
        }
        if self.coeffs == 0 || self.coeffs >= self.mel_bins {
            return Err(format!(
                "coeffs ({}) must be within 1..mel_bins ({})",
                self.coeffs, self.mel_bins
            ));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if !(self.low_freq >= 0.0 && self.low_freq < self.high_freq && self.high_freq <= nyquist)
        {
            return Err(format!(
                "filter bank edges {}..{} Hz must lie within 0..{nyquist} Hz",
                self.low_freq, self.high_freq
            ));
        }
        if !(0.0..1.0).contains(&self.pre_emphasis) {
            return Err(format!("pre_emphasis {} outside [0, 1)", self.pre_emphasis));
        }
        if !self.silence_floor_db.is_finite() {
            return Err("silence_floor_db must be finite".into());
        }
        if !(self.mel_dynamic_range_db.is_finite() && self.mel_dynamic_range_db > 0.0) {
            return Err(format!(
                "mel_dynamic_range_db {} must be positive",
                self.mel_dynamic_range_db
            ));
        }
        if let Some(bp) = &self.band_pass {
            if !(bp.low_cutoff > 0.0 && bp.low_cutoff < bp.high_cutoff && bp.high_cutoff < nyquist)
            {
                return Err(format!(
                    "band-pass {}..{} Hz must lie strictly within 0..{nyquist} Hz",
                    bp.low_cutoff, bp.high_cutoff
                ));
            }
        }
        Ok(())
    }
}

/// Streaming alignment knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Normalised cost mapped to the logistic mid-point.
    pub score_ref: f32,
    /// Sakoe-Chiba band half-width (frames).
    pub band_size: u16,
    /// Extra cost per non-diagonal step.
    pub step_penalty: f32,
    /// Aggregation across reference templates.
    pub score_mode: ScoreMode,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            score_ref: DETECTOR_DEFAULT_REFERENCE,
            band_size: COMPARATOR_DEFAULT_BAND_SIZE,
            step_penalty: COMPARATOR_DEFAULT_STEP_PENALTY,
            score_mode: ScoreMode::default(),
        }
    }
}

/// Threshold curve and peak-picking behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Threshold at sensitivity `0.0`.
    pub threshold_strict: f32,
    /// Threshold at sensitivity `1.0`.
    pub threshold_lenient: f32,
    /// Consecutive above-threshold frames before a candidate counts.
    pub min_scores: usize,
    /// Fire as soon as a candidate counts instead of waiting for its peak.
    pub eager: bool,
    /// Upper bound on frames spent following a rising peak.
    pub max_pending_frames: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            threshold_strict: DETECTOR_THRESHOLD_STRICT,
            threshold_lenient: DETECTOR_THRESHOLD_LENIENT,
            min_scores: DETECTOR_DEFAULT_MIN_SCORES,
            eager: false,
            max_pending_frames: DETECTOR_DEFAULT_MAX_PENDING,
        }
    }
}

impl DecisionConfig {
    /// Linear interpolation between the strict and lenient thresholds.
    /// Non-increasing in `sensitivity`.
    pub fn threshold_for(&self, sensitivity: Sensitivity) -> f32 {
        let s = sensitivity.get();
        self.threshold_strict + (self.threshold_lenient - self.threshold_strict) * s
    }
}

/// The complete model bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// File format version header.
    version: u8,
    pub features: FeatureConfig,
    pub scoring: ScoringConfig,
    pub decision: DecisionConfig,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::new(
            FeatureConfig::default(),
            ScoringConfig::default(),
            DecisionConfig::default(),
        )
    }
}

impl CborLoad for ModelParams {}
impl CborSave for ModelParams {}

impl ModelParams {
    pub fn new(features: FeatureConfig, scoring: ScoringConfig, decision: DecisionConfig) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            features,
            scoring,
            decision,
        }
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Samples per `process` call.
    #[inline]
    pub fn frame_length(&self) -> usize {
        self.features.frame_length
    }

    /// Structural validation; the message names the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported model format version {} (expected {MODEL_FORMAT_VERSION})",
                self.version
            ));
        }
        self.features.validate()?;

        let s = &self.scoring;
        if !(s.score_ref.is_finite() && s.score_ref > 0.0) {
            return Err(format!("score_ref must be positive, got {}", s.score_ref));
        }
        if !(s.step_penalty.is_finite() && s.step_penalty >= 0.0) {
            return Err(format!(
                "step_penalty must be non-negative, got {}",
                s.step_penalty
            ));
        }

        let d = &self.decision;
        if !(0.0 < d.threshold_lenient
            && d.threshold_lenient <= d.threshold_strict
            && d.threshold_strict < 1.0)
        {
            return Err(format!(
                "thresholds must satisfy 0 < lenient ({}) <= strict ({}) < 1",
                d.threshold_lenient, d.threshold_strict
            ));
        }
        if d.min_scores == 0 {
            return Err("min_scores must be at least 1".into());
        }
        if d.max_pending_frames == 0 {
            return Err("max_pending_frames must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let m = ModelParams::default();
        assert!(m.validate().is_ok());
        assert_eq!(m.frame_length(), 512);
        assert_eq!(m.features.fft_size(), 512);
    }

    #[test]
    fn window_shorter_than_frame_is_rejected() {
        let mut m = ModelParams::default();
        m.features.window_length = 256;
        assert!(m.validate().unwrap_err().contains("window_length"));
    }

    #[test]
    fn oversized_layouts_are_rejected() {
        let mut m = ModelParams::default();
        m.features.window_length = 1 << 40;
        assert!(m.validate().unwrap_err().contains("window_length"));

        m.features.window_length = usize::MAX;
        assert_eq!(m.features.fft_size(), usize::MAX);
        assert!(m.validate().is_err());

        let mut m = ModelParams::default();
        m.features.mel_bins = 300;
        assert!(m.validate().unwrap_err().contains("mel_bins"));

        // more filters than power bins
        m.features.frame_length = 64;
        m.features.window_length = 64;
        m.features.mel_bins = 40;
        assert!(m.validate().unwrap_err().contains("mel_bins"));
    }

    #[test]
    fn non_positive_dynamic_range_is_rejected() {
        let mut m = ModelParams::default();
        for range in [0.0, -10.0, f32::NAN] {
            m.features.mel_dynamic_range_db = range;
            assert!(m.validate().is_err());
        }
    }

    #[test]
    fn inverted_threshold_curve_is_rejected() {
        let mut m = ModelParams::default();
        m.decision.threshold_lenient = 0.9;
        assert!(m.validate().is_err());
    }

    #[test]
    fn band_pass_above_nyquist_is_rejected() {
        let mut m = ModelParams::default();
        m.features.band_pass = Some(BandPassConfig {
            low_cutoff: 100.0,
            high_cutoff: 9_000.0,
        });
        assert!(m.validate().is_err());
    }

    #[test]
    fn future_version_is_rejected() {
        let mut m = ModelParams::default();
        m.version = MODEL_FORMAT_VERSION + 1;
        assert!(m.validate().unwrap_err().contains("version"));
    }

    #[test]
    fn threshold_curve_is_monotone() {
        let d = DecisionConfig::default();
        let mut last = f32::INFINITY;
        for i in 0..=10 {
            let s = Sensitivity::new(i as f32 / 10.0).unwrap();
            let t = d.threshold_for(s);
            assert!(t <= last);
            last = t;
        }
        approx::assert_abs_diff_eq!(
            d.threshold_for(Sensitivity::new(0.0).unwrap()),
            DETECTOR_THRESHOLD_STRICT
        );
        approx::assert_abs_diff_eq!(
            d.threshold_for(Sensitivity::new(1.0).unwrap()),
            DETECTOR_THRESHOLD_LENIENT
        );
    }

    #[test]
    fn cbor_round_trip() {
        let mut m = ModelParams::default();
        m.features.window_length = 768;
        let buf = m.save_to_buffer().unwrap();
        assert_eq!(ModelParams::load_from_buffer(&buf).unwrap(), m);
    }
}
