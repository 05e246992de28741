//! Runtime configuration.
//!
//! [`SpotterConfig`] is what an embedding service or the CLI reads from TOML:
//! where the two resources live and how sensitive the spotter should be.
//! The shared knobs ([`ScoreMode`], [`BandPassConfig`]) are also stored inside
//! the model parameters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::constants::DEFAULT_SENSITIVITY;

/* --------------------------------------------------------------------- */
/*  Shared enums / sub-configs                                           */

/// How per-template probabilities are folded into one frame score.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Max,
    Average,
    Median,
    P25,
    P75,
    P80,
    P90,
    P95,
}

/// Optional band-pass pre-filter applied ahead of feature extraction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandPassConfig {
    /// Lower cut-off (Hz).
    pub low_cutoff: f32,
    /// Upper cut-off (Hz).
    pub high_cutoff: f32,
}

/* --------------------------------------------------------------------- */
/*  SpotterConfig                                                        */

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Where to find the resources and which sensitivity to run with.
///
/// ```toml
/// model_path   = "models/default.kwm"
/// keyword_path = "keywords/hey_computer.kwk"
/// sensitivity  = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotterConfig {
    /// Model parameters file (CBOR).
    pub model_path: PathBuf,
    /// Keyword specification file (CBOR).
    pub keyword_path: PathBuf,
    /// Detection sensitivity within `[0, 1]`.
    pub sensitivity: f32,
}

impl Default for SpotterConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.kwm"),
            keyword_path: PathBuf::from("keyword.kwk"),
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

impl SpotterConfig {
    /// Parse from a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Cheap sanity checks that need no I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(ConfigError::Invalid(format!(
                "sensitivity must be within [0, 1], got {}",
                self.sensitivity
            )));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("model_path is empty".into()));
        }
        if self.keyword_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("keyword_path is empty".into()));
        }
        Ok(())
    }

    /// Create a configuration pointing at the given resources.
    pub fn with_paths(model_path: impl Into<PathBuf>, keyword_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            keyword_path: keyword_path.into(),
            ..Default::default()
        }
    }

    /// Set the sensitivity.
    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn toml_with_defaults() {
        let cfg = SpotterConfig::from_toml_str(r#"keyword_path = "kw/hey.kwk""#).unwrap();
        assert_eq!(cfg.keyword_path, PathBuf::from("kw/hey.kwk"));
        assert_eq!(cfg.model_path, PathBuf::from("model.kwm"));
        assert_eq!(cfg.sensitivity, DEFAULT_SENSITIVITY);
    }

    #[test]
    fn toml_rejects_out_of_range_sensitivity() {
        let err = SpotterConfig::from_toml_str("sensitivity = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn toml_rejects_garbage() {
        assert!(matches!(
            SpotterConfig::from_toml_str("sensitivity = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kwspot.toml");
        std::fs::write(
            &path,
            "model_path = \"a.kwm\"\nkeyword_path = \"b.kwk\"\nsensitivity = 0.25\n",
        )
        .unwrap();
        let cfg = SpotterConfig::load(&path).unwrap();
        assert_eq!(cfg, SpotterConfig::with_paths("a.kwm", "b.kwk").with_sensitivity(0.25));
    }

    #[test]
    fn score_mode_parses_lowercase() {
        assert_eq!(ScoreMode::from_str("p90").unwrap(), ScoreMode::P90);
        assert_eq!(ScoreMode::Median.to_string(), "median");
    }
}
