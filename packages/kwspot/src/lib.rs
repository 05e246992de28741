//! kwspot - public crate root
//! ==========================
//! Streaming single-keyword spotter (KFC front-end + banded DTW scorer).
//!
//! * Construct a [`KeywordSpotter`] from a model-parameters file, a keyword
//!   file and a sensitivity in `[0, 1]`.
//! * Feed it exactly [`KeywordSpotter::frame_length`] mono 16-bit samples
//!   per [`KeywordSpotter::process`] call.
//! * The call returns `true` on the single frame where an utterance of the
//!   keyword ends.
//!
//! ```no_run
//! use kwspot::{KeywordSpotter, PcmChunker};
//!
//! # fn main() -> Result<(), kwspot::SpotterError> {
//! let mut spotter = KeywordSpotter::new("model.kwm", "hey_computer.kwk", 0.5)?;
//! let audio: Vec<i16> = capture();
//! for frame in PcmChunker::new(&audio, spotter.frame_length()) {
//!     if spotter.process(&frame)? {
//!         println!("keyword!");
//!     }
//! }
//! # Ok(()) }
//! # fn capture() -> Vec<i16> { Vec::new() }
//! ```
#![deny(unsafe_code)]

/* ────────────────────────  sub-modules  ─────────────────────────────── */
pub mod audio;
pub mod config;
pub mod constants;
pub mod decision;
pub mod error;
pub mod frame;
pub mod keyword;
pub mod kfc;
pub mod model;
pub mod persist;
pub mod scoring;
pub mod spotter;

/* ─────────────────────  public façade & re-exports  ─────────────────── */
pub use config::{BandPassConfig, ScoreMode, SpotterConfig};
pub use constants::DEFAULT_FRAME_LENGTH;
pub use decision::Sensitivity;
pub use error::{SpotterError, Status};
pub use frame::PcmChunker;
pub use keyword::KeywordSpec;
pub use model::ModelParams;
pub use persist::{CborLoad, CborSave};
pub use spotter::KeywordSpotter;

/// Result alias used across the public API.
pub type Result<T> = std::result::Result<T, SpotterError>;

/// Crate version, fixed at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version string of the engine.
#[inline]
pub fn version() -> &'static str {
    VERSION
}
