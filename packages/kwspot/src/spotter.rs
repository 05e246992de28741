//! The engine facade.
//!
//! A [`KeywordSpotter`] owns the whole per-stream pipeline:
//!
//! ```text
//! &[i16] frame ─► FeatureExtractor ─► AcousticScorer ─► DecisionEngine ─► bool
//! ```
//!
//! Model parameters and the keyword specification are immutable and held
//! behind `Arc`, so several spotters (one per audio stream) can share them.
//! Everything else is rolling state allocated once at construction.

use std::{path::Path, sync::Arc};

use log::{debug, info};

use crate::{
    config::SpotterConfig,
    decision::{DecisionEngine, Sensitivity},
    error::SpotterError,
    keyword::KeywordSpec,
    kfc::FeatureExtractor,
    model::ModelParams,
    persist::{CborLoad, PersistError},
    scoring::AcousticScorer,
};

/// Streaming single-keyword detector.
///
/// Feed exactly [`frame_length`](Self::frame_length) samples per
/// [`process`](Self::process) call; the result is `true` on the one frame
/// where an utterance of the keyword is judged to end.
pub struct KeywordSpotter {
    model: Arc<ModelParams>,
    keyword: Arc<KeywordSpec>,
    sensitivity: Sensitivity,

    extractor: FeatureExtractor,
    scorer: AcousticScorer,
    decision: DecisionEngine,

    last_score: f32,
    frames: u64,
}

impl KeywordSpotter {
    /// Load both resources from disk.
    ///
    /// Fails with [`Status::InvalidArgument`] for a sensitivity outside
    /// `[0, 1]` (checked before any I/O), [`Status::IoError`] when either
    /// file is unreadable, corrupt or the two do not belong together, and
    /// [`Status::OutOfMemory`] when the rolling state cannot be allocated.
    ///
    /// [`Status::InvalidArgument`]: crate::Status::InvalidArgument
    /// [`Status::IoError`]: crate::Status::IoError
    /// [`Status::OutOfMemory`]: crate::Status::OutOfMemory
    pub fn new(
        model_path: impl AsRef<Path>,
        keyword_path: impl AsRef<Path>,
        sensitivity: f32,
    ) -> Result<Self, SpotterError> {
        let sensitivity = Sensitivity::new(sensitivity)?;
        let model_path = model_path.as_ref();
        let model: ModelParams = load(model_path)?;
        model
            .validate()
            .map_err(|reason| invalid_data(model_path, reason))?;
        Self::load_keyword(Arc::new(model), keyword_path.as_ref(), sensitivity)
    }

    /// Like [`new`](Self::new) but reuses already loaded model parameters.
    pub fn with_shared_model(
        model: Arc<ModelParams>,
        keyword_path: impl AsRef<Path>,
        sensitivity: f32,
    ) -> Result<Self, SpotterError> {
        let sensitivity = Sensitivity::new(sensitivity)?;
        model.validate().map_err(SpotterError::InvalidArgument)?;
        Self::load_keyword(model, keyword_path.as_ref(), sensitivity)
    }

    /// Build from in-memory resources. Invalid or mismatched resources are
    /// reported as invalid arguments.
    pub fn from_parts(
        model: Arc<ModelParams>,
        keyword: Arc<KeywordSpec>,
        sensitivity: f32,
    ) -> Result<Self, SpotterError> {
        let sensitivity = Sensitivity::new(sensitivity)?;
        model.validate().map_err(SpotterError::InvalidArgument)?;
        keyword.validate().map_err(SpotterError::InvalidArgument)?;
        check_compatible(&model, &keyword).map_err(SpotterError::InvalidArgument)?;
        Self::assemble(model, keyword, sensitivity)
    }

    /// Build from a runtime configuration.
    pub fn from_config(cfg: &SpotterConfig) -> Result<Self, SpotterError> {
        Self::new(&cfg.model_path, &cfg.keyword_path, cfg.sensitivity)
    }

    fn load_keyword(
        model: Arc<ModelParams>,
        keyword_path: &Path,
        sensitivity: Sensitivity,
    ) -> Result<Self, SpotterError> {
        let keyword: KeywordSpec = load(keyword_path)?;
        keyword
            .validate()
            .and_then(|()| check_compatible(&model, &keyword))
            .map_err(|reason| invalid_data(keyword_path, reason))?;
        Self::assemble(model, Arc::new(keyword), sensitivity)
    }

    fn assemble(
        model: Arc<ModelParams>,
        keyword: Arc<KeywordSpec>,
        sensitivity: Sensitivity,
    ) -> Result<Self, SpotterError> {
        let extractor = FeatureExtractor::new(&model.features)?;
        let scorer = AcousticScorer::new(&model.scoring, keyword.clone())?;
        let decision = DecisionEngine::new(&model.decision, sensitivity);

        info!(
            "keyword spotter ready: keyword {:?}, {} references, frame {} @ {} Hz, sensitivity {:.2} (threshold {:.3})",
            keyword.name,
            keyword.reference_count(),
            model.features.frame_length,
            model.features.sample_rate,
            sensitivity.get(),
            decision.threshold(),
        );

        Ok(Self {
            model,
            keyword,
            sensitivity,
            extractor,
            scorer,
            decision,
            last_score: 0.0,
            frames: 0,
        })
    }

    /* ─────────────────────────── processing ───────────────────────────── */

    /// Run one frame through the pipeline.
    ///
    /// The only failure is a frame whose length differs from
    /// [`frame_length`](Self::frame_length); the engine state is left
    /// untouched in that case.
    pub fn process(&mut self, pcm: &[i16]) -> Result<bool, SpotterError> {
        let expected = self.frame_length();
        if pcm.len() != expected {
            return Err(SpotterError::invalid(format!(
                "frame must hold {expected} samples, got {}",
                pcm.len()
            )));
        }

        let features = self.extractor.extract(pcm);
        let score = self.scorer.score(features);
        self.last_score = score;
        self.frames += 1;

        let fired = self.decision.update(score);
        if fired {
            self.scorer.reset();
            debug!(
                "detected {:?} at frame {} (score {score:.3})",
                self.keyword.name,
                self.frames - 1
            );
        }
        Ok(fired)
    }

    /// Clear all streaming state so the next frame starts an unrelated
    /// stream.
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.scorer.reset();
        self.decision.reset();
        self.last_score = 0.0;
        self.frames = 0;
    }

    /* ───────────────────────────── queries ────────────────────────────── */

    /// Samples per [`process`](Self::process) call; fixed by the model.
    #[inline]
    pub fn frame_length(&self) -> usize {
        self.model.features.frame_length
    }

    #[inline]
    pub fn sample_rate(&self) -> usize {
        self.model.features.sample_rate
    }

    #[inline]
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity.get()
    }

    /// Score a frame must reach to count as a candidate.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.decision.threshold()
    }

    pub fn keyword_name(&self) -> &str {
        &self.keyword.name
    }

    /// Aggregated keyword probability of the most recent frame.
    #[inline]
    pub fn last_score(&self) -> f32 {
        self.last_score
    }

    /// Shared model parameters, for building further spotters.
    pub fn model(&self) -> &Arc<ModelParams> {
        &self.model
    }
}

/* ─────────────────────────────── helpers ──────────────────────────────── */

fn load<T: CborLoad>(path: &Path) -> Result<T, SpotterError> {
    T::load_from_file(path).map_err(|e| match e {
        PersistError::Io(source) => SpotterError::Io {
            path: path.to_path_buf(),
            source,
        },
        PersistError::Cbor(reason) => invalid_data(path, reason),
    })
}

fn invalid_data(path: &Path, reason: String) -> SpotterError {
    SpotterError::InvalidData {
        path: path.to_path_buf(),
        reason,
    }
}

fn check_compatible(model: &ModelParams, keyword: &KeywordSpec) -> Result<(), String> {
    if keyword.features != model.features {
        return Err(format!(
            "keyword {:?} was built with a different feature configuration than the model",
            keyword.name
        ));
    }
    Ok(())
}
