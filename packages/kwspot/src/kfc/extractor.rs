use std::{collections::TryReserveError, f32::consts::PI, sync::Arc};

use rustfft::{Fft, FftPlanner, num_complex::Complex32};
use serde::{Deserialize, Serialize};

use crate::{
    audio::BandPassFilter,
    constants::LOG_FLOOR,
    frame::{SampleHistory, try_filled},
    model::FeatureConfig,
};

/// Compact spectral summary of one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Cepstral coefficients c1..=cN.
    pub coeffs: Vec<f32>,
    /// Frame energy (dBFS) before pre-emphasis.
    pub energy_db: f32,
    /// Energy below the configured silence floor.
    pub silent: bool,
}

impl FeatureVector {
    fn zeroed(coeffs: usize) -> Result<Self, TryReserveError> {
        Ok(Self {
            coeffs: try_filled(coeffs, 0.0)?,
            energy_db: 0.0,
            silent: true,
        })
    }
}

/// Streaming **Mel-frequency cepstral coefficient** extractor.
///
/// *No* heap allocation occurs while extracting:
/// all scratch buffers are pre-allocated in `new`.
///
/// ```
/// # use kwspot::{kfc::FeatureExtractor, model::FeatureConfig};
/// let cfg = FeatureConfig::default();
/// let mut kfc = FeatureExtractor::new(&cfg)?;
/// let frame = vec![0i16; cfg.frame_length];
/// let fv = kfc.extract(&frame);
/// assert_eq!(fv.coeffs.len(), cfg.coeffs);
/// assert!(fv.silent);
/// # Ok::<(), std::collections::TryReserveError>(())
/// ```
pub struct FeatureExtractor {
    // configuration
    frame_length: usize,
    pre_emphasis: f32,
    silence_floor_db: f32,
    mel_floor: f32, // linear, relative to the strongest bin

    // stream state
    history: SampleHistory,
    last_sample: f32,
    band_pass: Option<BandPassFilter>,

    // cached DSP bits
    fft: Arc<dyn Fft<f32>>,
    hamming: Vec<f32>,
    filter_bank: Vec<MelFilter>,
    dct: Vec<f32>, // [coeff][mel_bin], flattened

    // scratch
    samples: Vec<f32>,
    fft_buf: Vec<Complex32>,
    fft_scratch: Vec<Complex32>,
    power: Vec<f32>,
    mel_energies: Vec<f32>,
    out: FeatureVector,
}

impl FeatureExtractor {
    /// Build an extractor for `cfg`. Only allocation can fail.
    ///
    /// Every buffer is reserved before the FFT is planned, so an oversized
    /// layout is reported instead of aborting inside the planner.
    pub fn new(cfg: &FeatureConfig) -> Result<Self, TryReserveError> {
        let fft_size = cfg.fft_size();
        let power_bins = fft_size / 2 + 1;

        let fft_buf = try_filled(fft_size, Complex32::new(0.0, 0.0))?;
        let power = try_filled(power_bins, 0.0)?;
        let samples = try_filled(cfg.frame_length, 0.0)?;
        let history = SampleHistory::new(cfg.window_length, cfg.frame_length)?;
        let mel_energies = try_filled(cfg.mel_bins, 0.0)?;
        let out = FeatureVector::zeroed(cfg.coeffs)?;

        let mut hamming = try_filled(cfg.window_length, 0.0)?;
        let denom = (cfg.window_length.max(2) - 1) as f32;
        for (n, w) in hamming.iter_mut().enumerate() {
            *w = 0.54 - 0.46 * ((2.0 * PI * n as f32) / denom).cos();
        }

        let filter_bank = mel_filter_bank(
            cfg.sample_rate,
            fft_size,
            cfg.mel_bins,
            cfg.low_freq,
            cfg.high_freq,
        )?;

        let mut dct = try_filled(cfg.coeffs.saturating_mul(cfg.mel_bins), 0.0)?;
        let n = cfg.mel_bins as f32;
        for k in 1..=cfg.coeffs {
            for m in 0..cfg.mel_bins {
                dct[(k - 1) * cfg.mel_bins + m] = ((PI / n) * (m as f32 + 0.5) * k as f32).cos();
            }
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let fft_scratch = try_filled(fft.get_inplace_scratch_len(), Complex32::new(0.0, 0.0))?;

        Ok(Self {
            frame_length: cfg.frame_length,
            pre_emphasis: cfg.pre_emphasis,
            silence_floor_db: cfg.silence_floor_db,
            mel_floor: 10f32.powf(-cfg.mel_dynamic_range_db / 10.0),
            history,
            last_sample: 0.0,
            band_pass: cfg
                .band_pass
                .as_ref()
                .map(|bp| BandPassFilter::from_config(cfg.sample_rate, bp)),
            fft,
            hamming,
            filter_bank,
            dct,
            samples,
            fft_buf,
            fft_scratch,
            power,
            mel_energies,
            out,
        })
    }

    /// Samples expected by [`extract`](Self::extract).
    #[inline]
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Compute the feature vector of one frame.
    ///
    /// `pcm.len()` must equal [`frame_length`](Self::frame_length); the
    /// facade enforces this before calling.
    pub fn extract(&mut self, pcm: &[i16]) -> &FeatureVector {
        debug_assert_eq!(pcm.len(), self.frame_length);

        // 1) i16 → f32, optional band-pass
        for (dst, &s) in self.samples.iter_mut().zip(pcm) {
            *dst = s as f32 / 32_768.0;
        }
        if let Some(bp) = &mut self.band_pass {
            bp.filter(&mut self.samples);
        }

        // 2) frame energy & silence flag
        let mean_sq =
            self.samples.iter().map(|s| s * s).sum::<f32>() / self.samples.len().max(1) as f32;
        let energy_db = 10.0 * (mean_sq + LOG_FLOOR).log10();
        self.out.energy_db = energy_db;
        self.out.silent = energy_db < self.silence_floor_db;

        // 3) pre-emphasis, carrying the last raw sample across frames
        let mut prev = self.last_sample;
        for s in self.samples.iter_mut() {
            let raw = *s;
            *s = raw - self.pre_emphasis * prev;
            prev = raw;
        }
        self.last_sample = prev;
        self.history.push(&self.samples);

        // 4) window + zero-padded FFT
        let window = self.history.window();
        for (i, dst) in self.fft_buf.iter_mut().enumerate() {
            *dst = match (window.get(i), self.hamming.get(i)) {
                (Some(&x), Some(&w)) => Complex32::new(x * w, 0.0),
                _ => Complex32::new(0.0, 0.0),
            };
        }
        self.fft
            .process_with_scratch(&mut self.fft_buf, &mut self.fft_scratch);

        // 5) power spectrum
        for (p, c) in self.power.iter_mut().zip(&self.fft_buf) {
            *p = c.norm_sqr();
        }

        // 6) mel filter bank → log energies, clamped to the dynamic range
        let mut peak = 0.0f32;
        for (e, filt) in self.mel_energies.iter_mut().zip(&self.filter_bank) {
            *e = filt.apply(&self.power);
            peak = peak.max(*e);
        }
        let floor = peak * self.mel_floor;
        for e in self.mel_energies.iter_mut() {
            *e = (e.max(floor) + LOG_FLOOR).ln();
        }

        // 7) DCT-II, c0 (overall level) dropped
        let mel_bins = self.mel_energies.len();
        for (k, out) in self.out.coeffs.iter_mut().enumerate() {
            let row = &self.dct[k * mel_bins..(k + 1) * mel_bins];
            *out = row
                .iter()
                .zip(&self.mel_energies)
                .map(|(c, e)| c * e)
                .sum::<f32>();
        }

        &self.out
    }

    /// Forget all stream history (pre-filter, pre-emphasis, retained tail).
    pub fn reset(&mut self) {
        self.history.reset();
        self.last_sample = 0.0;
        if let Some(bp) = &mut self.band_pass {
            bp.reset();
        }
    }
}

// ---------- helpers --------------------------------------------------------

/// One triangular filter stored sparsely as `(first power bin, weights)`.
struct MelFilter {
    start: usize,
    weights: Vec<f32>,
}

impl MelFilter {
    #[inline]
    fn apply(&self, power: &[f32]) -> f32 {
        power
            .iter()
            .skip(self.start)
            .zip(&self.weights)
            .map(|(p, w)| p * w)
            .sum()
    }
}

/// Area-normalised triangular filters between `low` and `high` Hz, so a flat
/// spectrum maps to flat mel energies.
fn mel_filter_bank(
    sr: usize,
    fft_size: usize,
    mel_bins: usize,
    low: f32,
    high: f32,
) -> Result<Vec<MelFilter>, TryReserveError> {
    let power_bins = fft_size / 2 + 1;
    let bin_hz = sr as f32 / fft_size as f32;
    let mel_low = freq_to_mel(low);
    let mel_step = (freq_to_mel(high) - mel_low) / mel_bins.saturating_add(1) as f32;
    let mut edges = try_filled(mel_bins.saturating_add(2), 0.0)?;
    for (i, edge) in edges.iter_mut().enumerate() {
        *edge = mel_to_freq(mel_low + i as f32 * mel_step);
    }

    let mut bank = Vec::new();
    bank.try_reserve_exact(mel_bins)?;
    for i in 0..mel_bins {
        let (f_left, f_center, f_right) = (edges[i], edges[i + 1], edges[i + 2]);
        let start = ((f_left / bin_hz).ceil() as usize).min(power_bins);
        let end = ((f_right / bin_hz).floor() as usize + 1).min(power_bins);

        let mut weights = try_filled(end.saturating_sub(start), 0.0)?;
        for (j, w) in weights.iter_mut().enumerate() {
            let freq = (start + j) as f32 * bin_hz;
            *w = if freq <= f_center {
                (freq - f_left) / (f_center - f_left)
            } else {
                (f_right - freq) / (f_right - f_center)
            }
            .max(0.0);
        }
        let area: f32 = weights.iter().sum();
        if area > 0.0 {
            weights.iter_mut().for_each(|w| *w /= area);
        }
        bank.push(MelFilter { start, weights });
    }
    Ok(bank)
}

#[inline]
fn freq_to_mel(f: f32) -> f32 {
    1127.0 * (1.0 + f / 700.0).ln()
}
#[inline]
fn mel_to_freq(m: f32) -> f32 {
    700.0 * ((m / 1127.0).exp() - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, len: usize, offset: usize) -> Vec<i16> {
        (0..len)
            .map(|n| {
                let t = (n + offset) as f32 / 16_000.0;
                (0.3 * 32_767.0 * (2.0 * PI * freq * t).sin()) as i16
            })
            .collect()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn silence_is_flagged() {
        let cfg = FeatureConfig::default();
        let mut kfc = FeatureExtractor::new(&cfg).unwrap();
        let fv = kfc.extract(&vec![0; cfg.frame_length]);
        assert!(fv.silent);
        assert!(fv.energy_db < cfg.silence_floor_db);
        assert!(fv.coeffs.iter().all(|c| c.abs() < 1e-2));
    }

    #[test]
    fn tone_is_voiced_and_gain_invariant() {
        let cfg = FeatureConfig::default();
        let loud = tone(1_000.0, cfg.frame_length, 0);
        let quiet: Vec<i16> = loud.iter().map(|&s| s / 4).collect();

        let a = FeatureExtractor::new(&cfg).unwrap().extract(&loud).clone();
        let b = FeatureExtractor::new(&cfg).unwrap().extract(&quiet).clone();
        assert!(!a.silent && !b.silent);
        assert!(a.energy_db > b.energy_db + 10.0);
        assert!(cosine(&a.coeffs, &b.coeffs) > 0.95);
    }

    #[test]
    fn different_tones_differ() {
        let cfg = FeatureConfig::default();
        let low = FeatureExtractor::new(&cfg)
            .unwrap()
            .extract(&tone(400.0, cfg.frame_length, 0))
            .clone();
        let high = FeatureExtractor::new(&cfg)
            .unwrap()
            .extract(&tone(3_000.0, cfg.frame_length, 0))
            .clone();
        assert!(cosine(&low.coeffs, &high.coeffs) < 0.95);
    }

    #[test]
    fn extraction_is_bit_reproducible() {
        let cfg = FeatureConfig {
            window_length: 800,
            ..FeatureConfig::default()
        };
        let frames: Vec<Vec<i16>> = (0..6)
            .map(|i| tone(500.0 + 200.0 * i as f32, cfg.frame_length, i * cfg.frame_length))
            .collect();
        let run = || {
            let mut kfc = FeatureExtractor::new(&cfg).unwrap();
            frames
                .iter()
                .map(|f| kfc.extract(f).clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn reset_restores_fresh_state() {
        let cfg = FeatureConfig {
            window_length: 1_024,
            ..FeatureConfig::default()
        };
        let frame = tone(700.0, cfg.frame_length, 0);
        let mut kfc = FeatureExtractor::new(&cfg).unwrap();
        let first = kfc.extract(&frame).clone();
        kfc.extract(&tone(2_000.0, cfg.frame_length, 0));
        kfc.reset();
        assert_eq!(kfc.extract(&frame), &first);
    }

    #[test]
    fn low_noise_floor_does_not_reshape_a_tone() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let cfg = FeatureConfig::default();
        let clean = tone(1_000.0, cfg.frame_length, 0);
        let mut rng = StdRng::seed_from_u64(3);
        let noisy: Vec<i16> = clean
            .iter()
            .map(|&s| s.saturating_add((rng.random_range(-0.01f32..=0.01) * 32_767.0) as i16))
            .collect();

        let a = FeatureExtractor::new(&cfg).unwrap().extract(&clean).clone();
        let b = FeatureExtractor::new(&cfg).unwrap().extract(&noisy).clone();
        assert!(cosine(&a.coeffs, &b.coeffs) > 0.95);
    }

    #[test]
    fn oversized_layout_is_an_allocation_error() {
        let cfg = FeatureConfig {
            window_length: usize::MAX / 2 + 2,
            ..FeatureConfig::default()
        };
        assert_eq!(cfg.fft_size(), usize::MAX);
        assert!(FeatureExtractor::new(&cfg).is_err());

        let cfg = FeatureConfig {
            mel_bins: usize::MAX,
            ..FeatureConfig::default()
        };
        assert!(FeatureExtractor::new(&cfg).is_err());
    }

    #[test]
    fn filter_bank_covers_configured_range() {
        let bank = mel_filter_bank(16_000, 512, 40, 60.0, 7_600.0).unwrap();
        assert_eq!(bank.len(), 40);
        for f in &bank {
            let area: f32 = f.weights.iter().sum();
            assert!(area == 0.0 || (area - 1.0).abs() < 1e-4);
        }
        assert!(bank.last().unwrap().start < 257);
    }
}
