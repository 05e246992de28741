//! Acoustic scorer: per-frame keyword probability.
//!
//! Every reference template gets its own [`StreamingAlignment`]; the
//! per-template probabilities are folded into one frame score according to
//! the model's [`ScoreMode`]. The rolling state is allocated once and reused.

pub mod alignment;

use std::{collections::TryReserveError, sync::Arc};

pub use alignment::StreamingAlignment;

use crate::{
    config::ScoreMode,
    frame::try_filled,
    keyword::KeywordSpec,
    kfc::{FeatureVector, cost_to_probability},
    model::ScoringConfig,
};

pub struct AcousticScorer {
    keyword: Arc<KeywordSpec>,
    alignments: Vec<StreamingAlignment>,
    score_ref: f32,
    score_mode: ScoreMode,
    // per-template scratch, overwritten every frame
    scores: Vec<f32>,
}

impl AcousticScorer {
    pub fn new(cfg: &ScoringConfig, keyword: Arc<KeywordSpec>) -> Result<Self, TryReserveError> {
        let mut alignments = Vec::new();
        alignments.try_reserve_exact(keyword.reference_count())?;
        for tpl in keyword.references() {
            alignments.push(StreamingAlignment::new(
                tpl.len(),
                cfg.band_size,
                cfg.step_penalty,
            )?);
        }
        let scores = try_filled(alignments.len(), 0.0)?;
        Ok(Self {
            keyword,
            alignments,
            score_ref: cfg.score_ref,
            score_mode: cfg.score_mode,
            scores,
        })
    }

    /// Advance every alignment by one frame and return the aggregated
    /// keyword probability in `[0, 1]`.
    pub fn score(&mut self, frame: &FeatureVector) -> f32 {
        for ((align, tpl), out) in self
            .alignments
            .iter_mut()
            .zip(self.keyword.references())
            .zip(self.scores.iter_mut())
        {
            *out = cost_to_probability(align.advance(tpl, frame), self.score_ref);
        }
        aggregate(self.score_mode, &mut self.scores)
    }

    /// Forget all rolling alignment state.
    pub fn reset(&mut self) {
        self.alignments.iter_mut().for_each(StreamingAlignment::reset);
    }
}

/// Select a unified score from all per-template scores. May reorder `v`.
pub fn aggregate(mode: ScoreMode, v: &mut [f32]) -> f32 {
    if v.is_empty() {
        return 0.0;
    }
    match mode {
        ScoreMode::Average => v.iter().sum::<f32>() / v.len() as f32,
        ScoreMode::Max => v.iter().copied().fold(0.0, f32::max),
        ScoreMode::Median => percentile(v, 50.0),
        ScoreMode::P25 => percentile(v, 25.0),
        ScoreMode::P75 => percentile(v, 75.0),
        ScoreMode::P80 => percentile(v, 80.0),
        ScoreMode::P90 => percentile(v, 90.0),
        ScoreMode::P95 => percentile(v, 95.0),
    }
}

#[inline]
fn percentile(v: &mut [f32], p: f32) -> f32 {
    v.sort_unstable_by(|a, b| a.total_cmp(b));
    let pos = p / 100.0 * (v.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        v[lo]
    } else {
        let d = pos - lo as f32;
        v[lo] * (1.0 - d) + v[hi] * d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureConfig;
    use approx::assert_abs_diff_eq;
    use indexmap::IndexMap;

    fn voiced(coeffs: &[f32]) -> FeatureVector {
        let mut c = coeffs.to_vec();
        c.resize(FeatureConfig::default().coeffs, 0.0);
        FeatureVector {
            coeffs: c,
            energy_db: -20.0,
            silent: false,
        }
    }

    fn silent() -> FeatureVector {
        FeatureVector {
            coeffs: vec![0.0; FeatureConfig::default().coeffs],
            energy_db: -90.0,
            silent: true,
        }
    }

    fn keyword() -> Arc<KeywordSpec> {
        let tpl = vec![
            voiced(&[1.0, 0.0, 0.0]),
            voiced(&[0.0, 1.0, 0.0]),
            voiced(&[0.0, 0.0, 1.0]),
            voiced(&[1.0, 1.0, 1.0]),
        ];
        let mut templates = IndexMap::new();
        templates.insert("one".to_owned(), tpl.clone());
        templates.insert("two".to_owned(), tpl[1..].to_vec());
        Arc::new(KeywordSpec::new("kw", FeatureConfig::default(), templates, None))
    }

    #[test]
    fn aggregation_modes() {
        let base = [0.1f32, 0.9, 0.5, 0.3];
        let run = |m| aggregate(m, &mut base.clone());
        assert_abs_diff_eq!(run(ScoreMode::Max), 0.9);
        assert_abs_diff_eq!(run(ScoreMode::Average), 0.45, epsilon = 1e-6);
        assert_abs_diff_eq!(run(ScoreMode::Median), 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(run(ScoreMode::P25), 0.25, epsilon = 1e-6);
        assert!(run(ScoreMode::P95) <= 0.9 && run(ScoreMode::P95) > run(ScoreMode::P75));
        assert_eq!(aggregate(ScoreMode::Median, &mut []), 0.0);
    }

    #[test]
    fn match_scores_high_and_silence_low() {
        let kw = keyword();
        let mut scorer = AcousticScorer::new(&ScoringConfig::default(), kw.clone()).unwrap();

        let mut silence_max = 0.0f32;
        for _ in 0..20 {
            silence_max = silence_max.max(scorer.score(&silent()));
        }
        assert!(silence_max < 0.1, "silence scored {silence_max}");

        let tpl = kw.templates["one"].clone();
        let last = tpl.iter().map(|f| scorer.score(f)).last().unwrap();
        assert!(last > 0.7, "match scored {last}");
    }

    #[test]
    fn reset_is_equivalent_to_fresh() {
        let kw = keyword();
        let cfg = ScoringConfig::default();
        let stream: Vec<_> = kw.templates["one"].iter().chain(&kw.templates["two"]).cloned().collect();

        let mut used = AcousticScorer::new(&cfg, kw.clone()).unwrap();
        for f in &stream {
            used.score(f);
        }
        used.reset();
        let mut fresh = AcousticScorer::new(&cfg, kw).unwrap();
        for f in &stream {
            assert_eq!(used.score(f), fresh.score(f));
        }
    }
}
