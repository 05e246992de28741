use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{KEYWORD_FORMAT_VERSION, MIN_TEMPLATE_VOICED_FRAMES},
    kfc::FeatureVector,
    model::FeatureConfig,
    persist::{CborLoad, CborSave},
};

/// Acoustic description of the single keyword to detect.
///
/// Holds one reference template per recorded sample (in recording order) and
/// optionally their DTW-aligned average. Every template was extracted with
/// `features`, which must match the model the keyword is used with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeywordSpec {
    version: u8,
    /// Human-readable keyword name (e.g. `"hey computer"`).
    pub name: String,
    /// Front-end layout the templates were computed with.
    pub features: FeatureConfig,
    /// Reference templates keyed by sample name.
    pub templates: IndexMap<String, Vec<FeatureVector>>,
    /// DTW-aligned average of all templates (two or more samples only).
    pub average: Option<Vec<FeatureVector>>,
}

impl CborLoad for KeywordSpec {}
impl CborSave for KeywordSpec {}

impl KeywordSpec {
    pub fn new(
        name: impl Into<String>,
        features: FeatureConfig,
        templates: IndexMap<String, Vec<FeatureVector>>,
        average: Option<Vec<FeatureVector>>,
    ) -> Self {
        Self {
            version: KEYWORD_FORMAT_VERSION,
            name: name.into(),
            features,
            templates,
            average,
        }
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// All reference sequences the scorer aligns against, average first.
    pub fn references(&self) -> impl Iterator<Item = &[FeatureVector]> {
        self.average
            .as_deref()
            .into_iter()
            .chain(self.templates.values().map(Vec::as_slice))
    }

    /// Number of sequences yielded by [`references`](Self::references).
    pub fn reference_count(&self) -> usize {
        self.templates.len() + usize::from(self.average.is_some())
    }

    /// Structural validation; the message names the offending template.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != KEYWORD_FORMAT_VERSION {
            return Err(format!(
                "unsupported keyword format version {} (expected {KEYWORD_FORMAT_VERSION})",
                self.version
            ));
        }
        if self.name.trim().is_empty() {
            return Err("keyword name is empty".into());
        }
        if self.templates.is_empty() {
            return Err("keyword holds no templates".into());
        }

        let coeffs = self.features.coeffs;
        let named = self
            .templates
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .chain(self.average.as_deref().map(|avg| ("<average>", avg)));
        for (name, tpl) in named {
            if let Some(bad) = tpl.iter().position(|f| f.coeffs.len() != coeffs) {
                return Err(format!(
                    "template {name:?} frame {bad} has {} coefficients, expected {coeffs}",
                    tpl[bad].coeffs.len()
                ));
            }
            if tpl.iter().any(|f| f.coeffs.iter().any(|c| !c.is_finite())) {
                return Err(format!("template {name:?} contains non-finite values"));
            }
            let voiced = tpl.iter().filter(|f| !f.silent).count();
            if voiced < MIN_TEMPLATE_VOICED_FRAMES {
                return Err(format!(
                    "template {name:?} has {voiced} voiced frames, need at least {MIN_TEMPLATE_VOICED_FRAMES}"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced(c: f32) -> FeatureVector {
        FeatureVector {
            coeffs: vec![c; FeatureConfig::default().coeffs],
            energy_db: -20.0,
            silent: false,
        }
    }

    fn spec(avg: bool) -> KeywordSpec {
        let mut templates = IndexMap::new();
        templates.insert("b.wav".to_owned(), vec![voiced(1.0); 4]);
        templates.insert("a.wav".to_owned(), vec![voiced(2.0); 5]);
        KeywordSpec::new(
            "hey",
            FeatureConfig::default(),
            templates,
            avg.then(|| vec![voiced(1.5); 6]),
        )
    }

    #[test]
    fn references_put_average_first_and_keep_order() {
        let s = spec(true);
        let lens: Vec<usize> = s.references().map(<[_]>::len).collect();
        assert_eq!(lens, vec![6, 4, 5]);
        assert_eq!(s.reference_count(), 3);

        let s = spec(false);
        assert_eq!(s.references().count(), 2);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_catches_bad_templates() {
        let mut s = spec(false);
        s.templates.insert("short".into(), vec![voiced(1.0); 2]);
        assert!(s.validate().unwrap_err().contains("voiced"));

        let mut s = spec(false);
        s.templates["a.wav"][0].coeffs.pop();
        assert!(s.validate().unwrap_err().contains("coefficients"));

        let mut s = spec(false);
        s.templates.clear();
        assert!(s.validate().is_err());

        let mut s = spec(true);
        s.version = KEYWORD_FORMAT_VERSION + 1;
        assert!(s.validate().unwrap_err().contains("version"));
    }

    #[test]
    fn cbor_round_trip_keeps_template_order() {
        let s = spec(true);
        let buf = s.save_to_buffer().unwrap();
        let back = KeywordSpec::load_from_buffer(&buf).unwrap();
        assert_eq!(back, s);
        assert_eq!(
            back.templates.keys().collect::<Vec<_>>(),
            vec!["b.wav", "a.wav"]
        );
    }
}
