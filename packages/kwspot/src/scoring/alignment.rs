//! Streaming open-begin DTW against one reference template.
//!
//! Only two columns are kept: the alignment of every template prefix against
//! the stream up to the previous frame, and the one being filled. Each cell
//! remembers the stream frame its path started at, so the length-normalised
//! cost and the band check need no back-pointers.

use std::collections::TryReserveError;

use crate::{
    frame::try_filled,
    kfc::{FeatureVector, frame_distance},
};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cell {
    /// Accumulated (unnormalised) path cost.
    cost: f32,
    /// Stream frame the path entered template frame 0.
    start: u64,
}

impl Cell {
    const UNREACHABLE: Self = Self {
        cost: f32::INFINITY,
        start: 0,
    };
}

#[derive(Debug)]
pub struct StreamingAlignment {
    prev: Vec<Cell>,
    curr: Vec<Cell>,
    band: u64,
    step_penalty: f32,
    frame_index: u64,
}

impl StreamingAlignment {
    /// Columns sized for a `template_len`-frame template.
    pub fn new(
        template_len: usize,
        band: u16,
        step_penalty: f32,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            prev: try_filled(template_len, Cell::UNREACHABLE)?,
            curr: try_filled(template_len, Cell::UNREACHABLE)?,
            band: band as u64,
            step_penalty,
            frame_index: 0,
        })
    }

    pub fn reset(&mut self) {
        self.prev.fill(Cell::UNREACHABLE);
        self.curr.fill(Cell::UNREACHABLE);
        self.frame_index = 0;
    }

    /// Extend every alignment by one stream frame.
    ///
    /// Returns the length-normalised cost of the best path that ends on the
    /// current frame having consumed the whole template, or `f32::INFINITY`
    /// if no such path fits the band yet.
    pub fn advance(&mut self, template: &[FeatureVector], frame: &FeatureVector) -> f32 {
        debug_assert_eq!(template.len(), self.curr.len());
        let t = self.frame_index;

        for (i, tpl) in template.iter().enumerate() {
            let d = frame_distance(frame, tpl);
            let m = i as u64 + 1;

            // diagonal first: ties keep the diagonal
            let diag = if i == 0 {
                Cell { cost: 0.0, start: t }
            } else {
                self.prev[i - 1]
            };
            let candidates = [
                (diag, 2.0 * d),
                (
                    if i == 0 { Cell::UNREACHABLE } else { self.curr[i - 1] },
                    d + self.step_penalty,
                ),
                (self.prev[i], d + self.step_penalty),
            ];

            let mut best = Cell::UNREACHABLE;
            let mut best_norm = f32::INFINITY;
            for (from, step) in candidates {
                if !from.cost.is_finite() {
                    continue;
                }
                let n = t - from.start + 1;
                if n.abs_diff(m) > self.band {
                    continue;
                }
                let cost = from.cost + step;
                let norm = cost / (n + m) as f32;
                if norm < best_norm {
                    best_norm = norm;
                    best = Cell {
                        cost,
                        start: from.start,
                    };
                }
            }
            self.curr[i] = best;
        }

        let result = match self.curr.last() {
            Some(last) if last.cost.is_finite() => {
                let n = t - last.start + 1;
                last.cost / (n + self.curr.len() as u64) as f32
            }
            _ => f32::INFINITY,
        };

        std::mem::swap(&mut self.prev, &mut self.curr);
        self.frame_index += 1;
        result
    }
}
