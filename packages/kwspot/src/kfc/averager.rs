use thiserror::Error;

use super::{FeatureVector, comparator::frame_distance, dtw::Dtw};

/// Errors that can arise while averaging KFC templates.
#[derive(Debug, Error)]
pub enum AveragerError {
    #[error("need at least two templates to average")]
    NotEnoughTemplates,
    #[error("template {0} is empty")]
    EmptyTemplate(usize),
    #[error("DTW failed to retrieve path")]
    MissingPath,
}

/// DTW-aligned template averager.
pub struct KfcAverager;

impl KfcAverager {
    /// Compute the **DTW-aligned** average of a set of templates.
    ///
    /// * `templates` - feature sequences, **all non-empty**. The first one
    ///   fixes the length of the result, so callers pass the longest first.
    /// * The energy of every averaged frame is the mean of the aligned
    ///   energies; it is flagged silent when that mean falls below
    ///   `silence_floor_db`.
    pub fn average(
        templates: &[Vec<FeatureVector>],
        silence_floor_db: f32,
    ) -> Result<Vec<FeatureVector>, AveragerError> {
        if templates.len() < 2 {
            return Err(AveragerError::NotEnoughTemplates);
        }
        if let Some(i) = templates.iter().position(Vec::is_empty) {
            return Err(AveragerError::EmptyTemplate(i));
        }

        let mut current = templates[0].clone();
        let mut seen = 1.0f32;
        let mut dtw = Dtw::new();

        for tpl in &templates[1..] {
            let cost = dtw.compute(&current, tpl, frame_distance, None);
            if !cost.is_finite() {
                return Err(AveragerError::MissingPath);
            }
            let path = dtw.path().ok_or(AveragerError::MissingPath)?;

            // 1. Accumulate every template frame aligned to each result frame.
            let frame_count = current.len();
            let coeff_count = current[0].coeffs.len();
            let mut sums = vec![vec![0.0f32; coeff_count]; frame_count];
            let mut energy = vec![0.0f32; frame_count];
            let mut hits = vec![0usize; frame_count];

            for &[x, y] in path {
                for (acc, val) in sums[x].iter_mut().zip(&tpl[y].coeffs) {
                    *acc += *val;
                }
                energy[x] += tpl[y].energy_db;
                hits[x] += 1;
            }

            // 2. Fold into the running mean.
            let next_seen = seen + 1.0;
            for (i, frame) in current.iter_mut().enumerate() {
                if hits[i] == 0 {
                    continue;
                }
                let n = hits[i] as f32;
                for (c, acc) in frame.coeffs.iter_mut().zip(&sums[i]) {
                    *c = (*c * seen + acc / n) / next_seen;
                }
                frame.energy_db = (frame.energy_db * seen + energy[i] / n) / next_seen;
                frame.silent = frame.energy_db < silence_floor_db;
            }
            seen = next_seen;
        }

        Ok(current)
    }
}
