//! **KFC feature extraction from recorded samples**
//!
//! 1. Decode WAV → mono `i16` (first channel) at the model sample rate.
//! 2. Cut into `frame_length` frames, zero-padding the last one.
//! 3. Run a fresh [`FeatureExtractor`] frame by frame.

use std::{collections::TryReserveError, io::Read};

use hound::{SampleFormat, WavReader};
use thiserror::Error;

use super::{FeatureExtractor, FeatureVector};
use crate::{frame::PcmChunker, model::FeatureConfig};

/* ─────────────────────── error handling ─────────────────────── */

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("unsupported wav format: {bits}-bit {format:?}")]
    Unsupported { bits: u16, format: SampleFormat },
    #[error("sample rate {found} Hz does not match the model's {expected} Hz")]
    SampleRate { found: u32, expected: usize },
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/* ─────────────────────── public API ─────────────────────────── */

pub struct KfcWavFileExtractor;

impl KfcWavFileExtractor {
    /// Extract the feature sequence of raw 16-bit samples.
    pub fn compute_from_samples(
        pcm: &[i16],
        cfg: &FeatureConfig,
    ) -> Result<Vec<FeatureVector>, TryReserveError> {
        let mut kfc = FeatureExtractor::new(cfg)?;
        let chunks = PcmChunker::new(pcm, cfg.frame_length);
        let mut out = Vec::new();
        out.try_reserve_exact(chunks.len())?;
        for frame in chunks {
            out.push(kfc.extract(&frame).clone());
        }
        Ok(out)
    }

    /// Decode to mono 16-bit PCM, keeping the first channel.
    pub fn read_pcm<R: Read>(reader: R, expected_rate: usize) -> Result<Vec<i16>, ExtractorError> {
        let mut wav = WavReader::new(reader)?;
        let spec = wav.spec();
        if spec.sample_rate as usize != expected_rate {
            return Err(ExtractorError::SampleRate {
                found: spec.sample_rate,
                expected: expected_rate,
            });
        }
        let channels = spec.channels.max(1) as usize;
        let bits = spec.bits_per_sample;
        if !matches!(
            (spec.sample_format, bits),
            (SampleFormat::Int, 1..=32) | (SampleFormat::Float, 32)
        ) {
            return Err(ExtractorError::Unsupported {
                bits,
                format: spec.sample_format,
            });
        }

        // the header length is untrusted, reserve without aborting
        let mut pcm = Vec::new();
        pcm.try_reserve_exact(wav.len() as usize / channels)?;

        match (spec.sample_format, bits) {
            (SampleFormat::Int, 1..=16) => {
                for s in wav.samples::<i16>().step_by(channels) {
                    pcm.push(s? << (16 - bits));
                }
            }
            (SampleFormat::Int, _) => {
                for s in wav.samples::<i32>().step_by(channels) {
                    pcm.push((s? >> (bits - 16)) as i16);
                }
            }
            _ => {
                for s in wav.samples::<f32>().step_by(channels) {
                    pcm.push((s?.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                }
            }
        }
        Ok(pcm)
    }
}
