//! Keyword feature computation (KFC): the per-frame front-end plus the
//! offline tools used to turn recordings into reference templates.

mod averager;
mod comparator;
mod dtw;
mod extractor;
mod wav_file_extractor;

pub use averager::{AveragerError, KfcAverager};
pub use comparator::{KfcComparator, cosine_similarity, cost_to_probability, frame_distance};
pub use dtw::Dtw;
pub use extractor::{FeatureExtractor, FeatureVector};
pub use wav_file_extractor::{ExtractorError, KfcWavFileExtractor};
