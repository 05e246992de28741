//! Keyword specification: the reference templates of the one keyword a
//! spotter listens for, plus the tools to build them from recordings.

mod build;
mod spec;

pub use build::{BuilderError, build_from_samples, build_from_wav_buffers, build_from_wav_files};
pub use spec::KeywordSpec;
