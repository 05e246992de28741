//! Build a [`KeywordSpec`] from recorded samples of the keyword.
//!
//! Every sample runs through a fresh feature extractor configured like the
//! model, loses its leading and trailing silent frames and becomes one
//! reference template. Two or more samples also yield a DTW-aligned average.

use std::{collections::TryReserveError, io::Cursor, path::Path};

use indexmap::IndexMap;
use log::{debug, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use thiserror::Error;

use super::KeywordSpec;
use crate::{
    constants::{DETECTOR_DEFAULT_REFERENCE, MIN_TEMPLATE_VOICED_FRAMES},
    kfc::{
        AveragerError, ExtractorError, FeatureVector, KfcAverager, KfcComparator,
        KfcWavFileExtractor,
    },
    model::{FeatureConfig, ModelParams},
};

/// Samples scoring below this against the average are reported as outliers.
const OUTLIER_SCORE: f32 = 0.5;

/// Errors returned while constructing a [`KeywordSpec`].
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("no samples provided")]
    Empty,
    #[error("keyword name is empty")]
    EmptyName,
    #[error("duplicate sample name {0:?}")]
    Duplicate(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sample {name:?}: {source}")]
    Wav {
        name: String,
        #[source]
        source: ExtractorError,
    },
    #[error(
        "sample {name:?} has {voiced} voiced frames, need at least {min}",
        min = MIN_TEMPLATE_VOICED_FRAMES
    )]
    TooShort { name: String, voiced: usize },
    #[error("average: {0}")]
    Average(#[from] AveragerError),
    #[error("invalid feature configuration: {0}")]
    InvalidFeatures(String),
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Build from raw 16-bit mono samples at `features.sample_rate`.
///
/// ```
/// # use kwspot::{keyword::build_from_samples, model::FeatureConfig};
/// let cfg = FeatureConfig::default();
/// let tone: Vec<i16> = (0..8_000)
///     .map(|n| ((n as f32 * 0.2).sin() * 8_000.0) as i16)
///     .collect();
/// let kw = build_from_samples("beep", &cfg, [("beep-1", tone)])?;
/// assert_eq!(kw.templates.len(), 1);
/// assert!(kw.average.is_none());
/// # Ok::<(), kwspot::keyword::BuilderError>(())
/// ```
pub fn build_from_samples<I, S, P>(
    name: impl Into<String>,
    features: &FeatureConfig,
    samples: I,
) -> Result<KeywordSpec, BuilderError>
where
    I: IntoIterator<Item = (S, P)>,
    S: Into<String>,
    P: AsRef<[i16]> + Sync,
{
    let name = name.into();
    if name.trim().is_empty() {
        return Err(BuilderError::EmptyName);
    }
    check_features(features)?;

    let samples = collect_unique(samples)?;

    // ---------- feature extraction (parallel if rayon available) ---------
    #[cfg(feature = "rayon")]
    let extracted: Vec<_> = samples
        .par_iter()
        .map(|(n, pcm)| extract_template(n, pcm.as_ref(), features))
        .collect::<Result<_, _>>()?;

    #[cfg(not(feature = "rayon"))]
    let extracted: Vec<_> = samples
        .iter()
        .map(|(n, pcm)| extract_template(n, pcm.as_ref(), features))
        .collect::<Result<_, _>>()?;

    let mut templates = IndexMap::with_capacity(extracted.len());
    for ((n, _), tpl) in samples.into_iter().zip(extracted) {
        templates.insert(n, tpl);
    }

    let average = compute_avg(&templates, features.silence_floor_db)?;
    report_outliers(&templates, average.as_deref());

    let spec = KeywordSpec::new(name, features.clone(), templates, average);
    debug!(
        "built keyword {:?}: {} templates, average {}",
        spec.name,
        spec.templates.len(),
        if spec.average.is_some() { "yes" } else { "no" }
    );
    Ok(spec)
}

/// Build from in-memory WAV files, `(sample name, wav bytes)`.
pub fn build_from_wav_buffers<I, S, B>(
    name: impl Into<String>,
    features: &FeatureConfig,
    wavs: I,
) -> Result<KeywordSpec, BuilderError>
where
    I: IntoIterator<Item = (S, B)>,
    S: Into<String>,
    B: AsRef<[u8]>,
{
    let decoded = wavs
        .into_iter()
        .map(|(n, bytes)| {
            let n = n.into();
            match KfcWavFileExtractor::read_pcm(Cursor::new(bytes.as_ref()), features.sample_rate) {
                Ok(pcm) => Ok((n, pcm)),
                Err(source) => Err(BuilderError::Wav { name: n, source }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    build_from_samples(name, features, decoded)
}

/// Convenience: build from a **list of WAV file paths**; sample names are the
/// file names.
pub fn build_from_wav_files(
    name: impl Into<String>,
    features: &FeatureConfig,
    paths: &[impl AsRef<Path>],
) -> Result<KeywordSpec, BuilderError> {
    let buffers = paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            let fname = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let buf = std::fs::read(path).map_err(|source| BuilderError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Ok::<_, BuilderError>((fname, buf))
        })
        .collect::<Result<Vec<_>, _>>()?;
    build_from_wav_buffers(name, features, buffers)
}

/* ----------------------------------------------------------------------- */

fn check_features(features: &FeatureConfig) -> Result<(), BuilderError> {
    ModelParams::new(features.clone(), Default::default(), Default::default())
        .validate()
        .map_err(BuilderError::InvalidFeatures)
}

fn collect_unique<I, S, P>(samples: I) -> Result<Vec<(String, P)>, BuilderError>
where
    I: IntoIterator<Item = (S, P)>,
    S: Into<String>,
{
    let mut out: Vec<(String, P)> = Vec::new();
    for (n, pcm) in samples {
        let n = n.into();
        if out.iter().any(|(seen, _)| *seen == n) {
            return Err(BuilderError::Duplicate(n));
        }
        out.push((n, pcm));
    }
    if out.is_empty() {
        return Err(BuilderError::Empty);
    }
    Ok(out)
}

fn extract_template(
    name: &str,
    pcm: &[i16],
    features: &FeatureConfig,
) -> Result<Vec<FeatureVector>, BuilderError> {
    let frames = KfcWavFileExtractor::compute_from_samples(pcm, features)?;
    let trimmed = trim_silence(frames);
    let voiced = trimmed.iter().filter(|f| !f.silent).count();
    if voiced < MIN_TEMPLATE_VOICED_FRAMES {
        return Err(BuilderError::TooShort {
            name: name.to_owned(),
            voiced,
        });
    }
    debug!("sample {name:?}: {} frames ({voiced} voiced)", trimmed.len());
    Ok(trimmed)
}

/// Drop leading and trailing silent frames.
pub(crate) fn trim_silence(mut frames: Vec<FeatureVector>) -> Vec<FeatureVector> {
    let Some(first) = frames.iter().position(|f| !f.silent) else {
        return Vec::new();
    };
    let last = frames.iter().rposition(|f| !f.silent).unwrap_or(first);
    frames.truncate(last + 1);
    frames.drain(..first);
    frames
}

/// DTW-aligned average template (if >1 sample), longest template first.
fn compute_avg(
    templates: &IndexMap<String, Vec<FeatureVector>>,
    silence_floor_db: f32,
) -> Result<Option<Vec<FeatureVector>>, AveragerError> {
    if templates.len() <= 1 {
        return Ok(None);
    }
    let mut sorted: Vec<Vec<FeatureVector>> = templates.values().cloned().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    KfcAverager::average(&sorted, silence_floor_db).map(Some)
}

fn report_outliers(
    templates: &IndexMap<String, Vec<FeatureVector>>,
    average: Option<&[FeatureVector]>,
) {
    let Some(avg) = average else { return };
    let mut cmp = KfcComparator::new(DETECTOR_DEFAULT_REFERENCE, u16::MAX);
    for (name, tpl) in templates {
        let score = cmp.compare(tpl, avg);
        if score < OUTLIER_SCORE {
            warn!("sample {name:?} matches the average poorly (score {score:.3})");
        } else {
            debug!("sample {name:?} vs average: {score:.3}");
        }
    }
}
