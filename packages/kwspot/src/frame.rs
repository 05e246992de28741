//! Frame plumbing.
//!
//! The engine consumes exactly one frame per call and never buffers partial
//! frames. [`SampleHistory`] keeps the analysis window (the new frame plus
//! the retained tail of earlier frames) and [`PcmChunker`] is the caller-side
//! helper that cuts arbitrary-length audio into frames.

use std::collections::TryReserveError;

/// Allocate a `len`-element vector filled with `value`, reporting allocation
/// failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, value);
    Ok(v)
}

/// Fixed-length sliding analysis window.
///
/// Holds the last `window_length` samples; every [`push`](Self::push) shifts
/// out the oldest `frame_length` samples. Starts out as silence.
#[derive(Debug)]
pub struct SampleHistory {
    window: Vec<f32>,
    frame_length: usize,
}

impl SampleHistory {
    pub fn new(window_length: usize, frame_length: usize) -> Result<Self, TryReserveError> {
        debug_assert!(window_length >= frame_length);
        Ok(Self {
            window: try_filled(window_length, 0.0)?,
            frame_length,
        })
    }

    /// Append one frame of samples.
    pub fn push(&mut self, frame: &[f32]) {
        debug_assert_eq!(frame.len(), self.frame_length);
        let tail = self.window.len() - self.frame_length;
        self.window.copy_within(self.frame_length.., 0);
        self.window[tail..].copy_from_slice(frame);
    }

    /// Current analysis window, oldest sample first.
    #[inline]
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    #[inline]
    pub fn reset(&mut self) {
        self.window.fill(0.0);
    }
}

/// Cuts a PCM buffer into `frame_length` chunks; the last partial chunk is
/// zero-padded.
///
/// ```
/// use kwspot::PcmChunker;
///
/// let pcm = vec![1i16; 1000];
/// let frames: Vec<Vec<i16>> = PcmChunker::new(&pcm, 512).collect();
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[1][488..], [0i16; 24]);
/// ```
pub struct PcmChunker<'a> {
    pcm: &'a [i16],
    frame_length: usize,
}

impl<'a> PcmChunker<'a> {
    pub fn new(pcm: &'a [i16], frame_length: usize) -> Self {
        Self {
            pcm,
            frame_length: frame_length.max(1),
        }
    }
}

impl Iterator for PcmChunker<'_> {
    type Item = Vec<i16>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pcm.is_empty() {
            return None;
        }
        let take = self.pcm.len().min(self.frame_length);
        let mut frame = Vec::with_capacity(self.frame_length);
        frame.extend_from_slice(&self.pcm[..take]);
        frame.resize(self.frame_length, 0);
        self.pcm = &self.pcm[take..];
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.pcm.len().div_ceil(self.frame_length);
        (n, Some(n))
    }
}

impl ExactSizeIterator for PcmChunker<'_> {}
