//! Second-order band-pass IIR used as an optional front-end pre-filter.

use crate::config::BandPassConfig;
use core::f32::consts::PI;

/// RBJ biquad configured as **band-pass** (0 dB peak gain).
///
/// The delay line persists across calls so consecutive frames are filtered
/// as one continuous signal.
#[derive(Clone, Debug)]
pub struct BandPassFilter {
    /* feed-forward */
    a0: f32,
    a1: f32,
    a2: f32,
    /* feed-back */
    b1: f32,
    b2: f32,
    /* 2-sample delay-line (x[n-k], y[n-k]) */
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandPassFilter {
    /// Create a new filter with the given low / high cut-offs (Hz).
    pub fn new(sample_rate: f32, low_cut: f32, high_cut: f32) -> Self {
        Self::design(sample_rate, low_cut, high_cut)
    }

    pub fn from_config(sample_rate: usize, cfg: &BandPassConfig) -> Self {
        Self::new(sample_rate as f32, cfg.low_cutoff, cfg.high_cutoff)
    }

    /// Process **in-place** (mono) buffer.
    #[inline]
    pub fn filter(&mut self, signal: &mut [f32]) {
        let (a0, a1, a2, b1, b2) = (self.a0, self.a1, self.a2, self.b1, self.b2);
        let (mut x1, mut x2, mut y1, mut y2) = (self.x1, self.x2, self.y1, self.y2);

        for s in signal {
            let x0 = *s;
            let y0 = a0 * x0 + a1 * x1 + a2 * x2 /* feed-forward */
                     - b1 * y1 - b2 * y2; /* feed-back */
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
            *s = y0;
        }

        self.x1 = x1;
        self.x2 = x2;
        self.y1 = y1;
        self.y2 = y2;
    }

    /// Zero internal delay-line.
    #[inline]
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    fn design(sr: f32, low: f32, high: f32) -> Self {
        // Cook-book RBJ band-pass centred on the geometric mean of the edges.
        let f0 = (low * high).sqrt();
        let q = f0 / (high - low);
        let w0 = 2.0 * PI * f0 / sr;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let norm = 1.0 / (1.0 + alpha);
        Self {
            a0: alpha * norm,
            a1: 0.0,
            a2: -alpha * norm,
            b1: -2.0 * cos_w0 * norm,
            b2: (1.0 - alpha) * norm,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f32 / 16_000.0).sin())
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn passes_centre_rejects_dc() {
        let mut f = BandPassFilter::new(16_000.0, 300.0, 3_000.0);
        let mut dc = vec![1.0f32; 4_000];
        f.filter(&mut dc);
        assert!(dc[3_000..].iter().all(|v| v.abs() < 1e-2));

        f.reset();
        let centre = (300.0f32 * 3_000.0).sqrt();
        let mut t = tone(centre, 8_000);
        f.filter(&mut t);
        approx::assert_abs_diff_eq!(rms(&t[4_000..]), rms(&tone(centre, 4_000)), epsilon = 0.05);
    }

    #[test]
    fn state_carries_across_blocks() {
        let signal = tone(1_000.0, 1_024);
        let mut whole = signal.clone();
        BandPassFilter::new(16_000.0, 300.0, 3_000.0).filter(&mut whole);

        let mut f = BandPassFilter::new(16_000.0, 300.0, 3_000.0);
        let mut split = signal;
        let (a, b) = split.split_at_mut(512);
        f.filter(a);
        f.filter(b);
        assert_eq!(whole, split);
    }
}
