//! Streaming decision engine.
//!
//! Turns the per-frame keyword score into at most one detection per
//! utterance. The engine is a two-state machine:
//!
//! * `Idle` - counting consecutive frames at or above threshold.
//! * `Pending` - a candidate has been accepted; follow its peak and fire on
//!   the first frame whose score drops below the best one seen (or when the
//!   pending budget runs out).
//!
//! With `eager` set, the `Pending` state is skipped and the engine fires on
//! the frame the candidate is accepted.

use crate::{error::SpotterError, model::DecisionConfig};

/// Detection sensitivity in `[0, 1]`. Higher means fewer misses and more
/// false alarms.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Sensitivity(f32);

impl Sensitivity {
    /// Rejects NaN and anything outside `[0, 1]`.
    pub fn new(value: f32) -> Result<Self, SpotterError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SpotterError::invalid(format!(
                "sensitivity must be within [0, 1], got {value}"
            )))
        }
    }

    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Sensitivity {
    type Error = SpotterError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(crate::constants::DEFAULT_SENSITIVITY)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DecisionState {
    Idle { hits: usize },
    Pending { best: f32, frames: usize },
}

/// Score → boolean event.
#[derive(Debug)]
pub struct DecisionEngine {
    threshold: f32,
    min_scores: usize,
    eager: bool,
    max_pending: usize,
    state: DecisionState,
}

impl DecisionEngine {
    pub fn new(cfg: &DecisionConfig, sensitivity: Sensitivity) -> Self {
        Self {
            threshold: cfg.threshold_for(sensitivity),
            min_scores: cfg.min_scores.max(1),
            eager: cfg.eager,
            max_pending: cfg.max_pending_frames.max(1),
            state: DecisionState::Idle { hits: 0 },
        }
    }

    /// Threshold derived from the sensitivity.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `true` while a candidate is being followed.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, DecisionState::Pending { .. })
    }

    pub fn reset(&mut self) {
        self.state = DecisionState::Idle { hits: 0 };
    }

    /// Feed one frame score. Returns `true` on the frame that fires; the
    /// engine is back in `Idle` afterwards.
    pub fn update(&mut self, score: f32) -> bool {
        let fire = match self.state {
            DecisionState::Idle { hits } => {
                if score < self.threshold {
                    self.state = DecisionState::Idle { hits: 0 };
                    false
                } else if hits + 1 < self.min_scores {
                    self.state = DecisionState::Idle { hits: hits + 1 };
                    false
                } else if self.eager || self.max_pending == 1 {
                    true
                } else {
                    self.state = DecisionState::Pending {
                        best: score,
                        frames: 1,
                    };
                    false
                }
            }
            DecisionState::Pending { best, frames } => {
                if score < best || frames + 1 >= self.max_pending {
                    true
                } else {
                    self.state = DecisionState::Pending {
                        best: score,
                        frames: frames + 1,
                    };
                    false
                }
            }
        };
        if fire {
            self.reset();
        }
        fire
    }
}
