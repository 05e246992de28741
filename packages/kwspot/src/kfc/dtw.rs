//! Offline Dynamic-Time-Warping used while building keyword files.
//!
//!  * The cost matrix is flattened into a single `Vec<f32>` and reused
//!    between calls.
//!  * Optional Sakoe-Chiba band window (pass `Some(band_size)`).
//!  * The distance function is supplied per call, so the same instance can
//!    align any element type.
//!
//! The streaming counterpart lives in [`crate::scoring::alignment`].

use std::cmp;

/// 2-D index helper for a flattened `(rows × cols)` buffer.
#[inline(always)]
fn idx(row: usize, col: usize, cols: usize) -> usize {
    row * cols + col
}

#[derive(Debug, Default)]
pub struct Dtw {
    rows: usize,
    cols: usize,
    /// Last accumulated cost matrix (flattened).
    cost: Vec<f32>,
    /// (row, col) pairs of the last optimal path.
    path: Vec<[usize; 2]>,
}

impl Dtw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated cost of the best alignment of `a` against `b`.
    ///
    /// Returns `f32::INFINITY` when either side is empty or the band is too
    /// narrow to connect the two corners.
    pub fn compute<T>(
        &mut self,
        a: &[T],
        b: &[T],
        dist: impl Fn(&T, &T) -> f32,
        window: Option<usize>,
    ) -> f32 {
        self.rows = a.len();
        self.cols = b.len();
        self.path.clear();

        if self.rows == 0 || self.cols == 0 {
            return f32::INFINITY;
        }

        let needed = self.rows * self.cols;
        if self.cost.len() < needed {
            self.cost.resize(needed, f32::INFINITY);
        }
        let cols = self.cols;
        let cost = &mut self.cost[..needed];
        cost.fill(f32::INFINITY);

        let w = window.unwrap_or(usize::MAX);

        for r in 0..self.rows {
            let start = r.saturating_sub(w);
            let end = cmp::min(cols - 1, r.saturating_add(w));
            for c in start..=end {
                let best_prev = if r == 0 && c == 0 {
                    0.0
                } else {
                    let up = if r > 0 { cost[idx(r - 1, c, cols)] } else { f32::INFINITY };
                    let left = if c > 0 { cost[idx(r, c - 1, cols)] } else { f32::INFINITY };
                    let diag = if r > 0 && c > 0 {
                        cost[idx(r - 1, c - 1, cols)]
                    } else {
                        f32::INFINITY
                    };
                    diag.min(up).min(left)
                };
                if best_prev.is_finite() {
                    cost[idx(r, c, cols)] = dist(&a[r], &b[c]) + best_prev;
                }
            }
        }

        let total = cost[idx(self.rows - 1, self.cols - 1, cols)];
        if total.is_finite() {
            self.trace_back();
        }
        total
    }

    /// The optimal path of the last successful [`compute`](Self::compute),
    /// from `[0, 0]` to the final corner.
    pub fn path(&self) -> Option<&[[usize; 2]]> {
        if self.path.is_empty() {
            None
        } else {
            Some(&self.path)
        }
    }

    fn trace_back(&mut self) {
        let cols = self.cols;
        let cost = &self.cost;
        let (mut r, mut c) = (self.rows - 1, self.cols - 1);
        self.path.push([r, c]);
        while r > 0 || c > 0 {
            if r > 0 && c > 0 {
                let up = cost[idx(r - 1, c, cols)];
                let left = cost[idx(r, c - 1, cols)];
                let diag = cost[idx(r - 1, c - 1, cols)];
                if diag <= up && diag <= left {
                    r -= 1;
                    c -= 1;
                } else if up <= left {
                    r -= 1;
                } else {
                    c -= 1;
                }
            } else if r > 0 {
                r -= 1;
            } else {
                c -= 1;
            }
            self.path.push([r, c]);
        }
        self.path.reverse();
    }
}

/* ───────────────────────────── tests ──────────────────────────────── */
