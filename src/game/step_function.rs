use std::fmt;

use thiserror::Error;

use crate::game::sliding_max::SlidingMaxQueue;

/// Value the function takes outside its domain.
pub const FLOOR_VALUE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StepFunctionError {
    #[error("domain [{lower}, {upper}] must be non-empty")]
    InvalidDomain { lower: f32, upper: f32 },
    #[error("half window size must be positive and finite, got {0}")]
    InvalidWindow(f32),
    #[error("interval [{from}, {to}) must be non-empty and overlap the domain")]
    EmptyInterval { from: f32, to: f32 },
    #[error("point {0} must be finite")]
    NonFinitePoint(f32),
}

/// Piecewise constant integer function over `[lower, upper]`.
///
/// Piece `i` is the open interval `(partition[i], partition[i + 1])` and takes
/// `values[i]`. Breakpoints themselves carry no value, so half-open and open
/// queries agree. Outside the domain the function is `FLOOR_VALUE`.
///
/// The representation is kept minimal: no two adjacent pieces share a value
/// and the partition is strictly increasing.
#[derive(Clone, Debug, PartialEq)]
pub struct StepFunction {
    partition: Vec<f32>,
    values: Vec<i32>,
}

impl StepFunction {
    /// Constant zero over `[lower, upper]`. Either bound may be infinite.
    pub fn new(lower: f32, upper: f32) -> Result<Self, StepFunctionError> {
        if !(lower < upper) {
            return Err(StepFunctionError::InvalidDomain { lower, upper });
        }
        Ok(Self { partition: vec![lower, upper], values: vec![FLOOR_VALUE] })
    }

    /// Constant zero over the whole real line.
    pub fn unbounded() -> Self {
        Self {
            partition: vec![f32::NEG_INFINITY, f32::INFINITY],
            values: vec![FLOOR_VALUE],
        }
    }

    fn from_parts(partition: Vec<f32>, values: Vec<i32>) -> Self {
        let mut f = Self { partition, values };
        f.normalize();
        f
    }

    #[inline(always)]
    pub fn lower(&self) -> f32 {
        self.partition[0]
    }

    #[inline(always)]
    pub fn upper(&self) -> f32 {
        self.partition[self.partition.len() - 1]
    }

    #[inline(always)]
    pub fn domain(&self) -> (f32, f32) {
        (self.lower(), self.upper())
    }

    #[inline(always)]
    pub fn piece_count(&self) -> usize {
        self.values.len()
    }

    /// Pieces as `(lo, hi, value)`, left to right.
    pub fn pieces(&self) -> impl Iterator<Item = (f32, f32, i32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.partition[i], self.partition[i + 1], v))
    }

    /// Value at `x`, or `None` when `x` is an interior breakpoint.
    pub fn value_at(&self, x: f32) -> Option<i32> {
        if x.is_nan() {
            return None;
        }
        if x < self.lower() || x > self.upper() {
            return Some(FLOOR_VALUE);
        }
        let i = self.partition.partition_point(|&p| p <= x);
        if i == 0 || self.partition[i - 1] == x {
            return None;
        }
        self.values.get(i - 1).copied()
    }

    /// Adds `value` on `(from, to)`. Parts of the interval outside the domain
    /// are ignored.
    pub fn add(&mut self, from: f32, to: f32, value: i32) {
        self.update(from, to, |v| v + value);
    }

    /// Makes the function take `value` on `(from, to)`.
    pub fn set(&mut self, from: f32, to: f32, value: i32) {
        self.update(from, to, |_| value);
    }

    fn update(&mut self, from: f32, to: f32, op: impl Fn(i32) -> i32) {
        if from.is_nan() || to.is_nan() {
            return;
        }
        let from = from.max(self.lower());
        let to = to.min(self.upper());
        if !(from < to) {
            return;
        }

        let start = self.split_at(from);
        let end = self.split_at(to);
        for v in &mut self.values[start..end] {
            *v = op(*v);
        }
        self.normalize();
    }

    /// Ensures `x` is a breakpoint and returns its index. `x` must lie in the domain.
    fn split_at(&mut self, x: f32) -> usize {
        let i = self.partition.partition_point(|&p| p < x);
        if self.partition[i] != x {
            let v = self.values[i - 1];
            self.partition.insert(i, x);
            self.values.insert(i, v);
        }
        i
    }

    /// Melds adjacent pieces with equal values and drops empty pieces, in one pass.
    fn normalize(&mut self) {
        let mut kept = 0;
        for read in 0..self.values.len() {
            let v = self.values[read];
            let hi = self.partition[read + 1];
            if hi == self.partition[kept] {
                continue;
            }
            if kept > 0 && self.values[kept - 1] == v {
                self.partition[kept] = hi;
            } else {
                self.values[kept] = v;
                self.partition[kept + 1] = hi;
                kept += 1;
            }
        }
        self.values.truncate(kept);
        self.partition.truncate(kept + 1);
        debug_assert!(self.is_normalized(), "step function not minimal: {self}");
    }

    /// True when the representation is minimal.
    pub fn is_normalized(&self) -> bool {
        !self.values.is_empty()
            && self.partition.len() == self.values.len() + 1
            && self.partition.windows(2).all(|w| w[0] < w[1])
            && self.values.windows(2).all(|w| w[0] != w[1])
    }

    /// Maximum value on `[from, to)` restricted to the domain.
    ///
    /// Returns `FLOOR_VALUE` when the interval is empty or misses the domain.
    pub fn max(&self, from: f32, to: f32) -> i32 {
        if !(from < to) {
            return FLOOR_VALUE;
        }
        self.pieces()
            .filter(|&(lo, hi, _)| lo < to && hi > from)
            .map(|(_, _, v)| v)
            .max()
            .unwrap_or(FLOOR_VALUE)
    }

    /// Distance from `x` to the nearest point where the function is below `value`.
    ///
    /// Everything outside the domain counts as `FLOOR_VALUE`, so the domain
    /// edges are "smaller" points whenever `value > FLOOR_VALUE`. Returns
    /// infinity when no smaller point exists.
    pub fn distance_to_smaller(&self, x: f32, value: i32) -> Result<f32, StepFunctionError> {
        if !x.is_finite() {
            return Err(StepFunctionError::NonFinitePoint(x));
        }

        let mut best = f32::INFINITY;
        if FLOOR_VALUE < value {
            best = best
                .min(gap(x, f32::NEG_INFINITY, self.lower()))
                .min(gap(x, self.upper(), f32::INFINITY));
        }
        for (lo, hi, v) in self.pieces() {
            if v < value {
                best = best.min(gap(x, lo, hi));
                if best == 0.0 {
                    break;
                }
            }
        }
        Ok(best)
    }

    /// A point of `[from, to]` attaining `max(from, to)` that is furthest from
    /// any smaller point, i.e. maximizing `distance_to_smaller`.
    ///
    /// Ties go to the leftmost candidate.
    pub fn optimal_point(&self, from: f32, to: f32) -> Result<f32, StepFunctionError> {
        for p in [from, to] {
            if !p.is_finite() {
                return Err(StepFunctionError::NonFinitePoint(p));
            }
        }
        let query_lo = from.max(self.lower());
        let query_hi = to.min(self.upper());
        if !(from < to) || !(query_lo < query_hi) {
            return Err(StepFunctionError::EmptyInterval { from, to });
        }

        let target = self.max(from, to);
        let edges_smaller = FLOOR_VALUE < target;
        let n = self.values.len();

        let mut best: Option<(f32, f32)> = None;
        let mut run_start = self.lower();
        for i in 0..n {
            if self.values[i] < target {
                run_start = self.partition[i + 1];
                continue;
            }
            if i + 1 < n && self.values[i + 1] >= target {
                continue;
            }

            // Pieces from `run_start` to here all take at least `target`.
            let run_end = self.partition[i + 1];
            if !(run_start < query_hi && run_end > query_lo) {
                continue;
            }
            let anchor_lo = if run_start == self.lower() && !edges_smaller {
                f32::NEG_INFINITY
            } else {
                run_start
            };
            let anchor_hi = if run_end == self.upper() && !edges_smaller {
                f32::INFINITY
            } else {
                run_end
            };

            let lo = query_lo.max(run_start);
            let hi = query_hi.min(run_end);
            let x = most_robust(anchor_lo, anchor_hi, lo, hi);
            let dist = (x - anchor_lo).min(anchor_hi - x);
            if best.is_none_or(|(d, _)| dist > d) {
                best = Some((dist, x));
            }
        }

        debug_assert!(best.is_some(), "no piece of {self} attains {target} on [{from}, {to})");
        best.map(|(_, x)| x)
            .ok_or(StepFunctionError::EmptyInterval { from, to })
    }

    /// Sliding window maximum: `g(x) = max { f(y) : y in domain, |y - x| <= w }`.
    ///
    /// One sweep over the breakpoints. Piece `i` influences `g` on
    /// `(partition[i] - w, partition[i + 1] + w)`; the queue holds live pieces
    /// keyed by that right end.
    pub fn sliding_window_max(&self, half_window: f32) -> Result<Self, StepFunctionError> {
        if !(0.0 < half_window && half_window < f32::INFINITY) {
            return Err(StepFunctionError::InvalidWindow(half_window));
        }

        let n = self.values.len();
        let mut partition = Vec::with_capacity(2 * n + 1);
        let mut values = Vec::with_capacity(2 * n);
        let mut queue = SlidingMaxQueue::with_capacity(n);

        partition.push(self.lower() - half_window);
        for i in 0..=n {
            let start = if i == n {
                f32::INFINITY
            } else {
                self.partition[i] - half_window
            };

            while queue.max().is_some_and(|&(expiry, _)| expiry <= start) {
                if let Ok(&(expiry, v)) = queue.dequeue_max() {
                    values.push(v);
                    partition.push(expiry);
                }
            }
            if i == n {
                break;
            }

            if let Some(&(_, current)) = queue.max()
                && current < self.values[i]
            {
                values.push(current);
                partition.push(start);
            }
            queue.enqueue(self.partition[i + 1] + half_window, self.values[i]);
        }

        Ok(clip_to_domain(&partition, &values, self.lower(), self.upper()))
    }
}

/// Distance from `x` to the closed interval `[lo, hi]`.
#[inline(always)]
fn gap(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo {
        lo - x
    } else if x > hi {
        x - hi
    } else {
        0.0
    }
}

/// Point of `[lo, hi]` maximizing `min(x - anchor_lo, anchor_hi - x)`.
fn most_robust(anchor_lo: f32, anchor_hi: f32, lo: f32, hi: f32) -> f32 {
    match (anchor_lo.is_finite(), anchor_hi.is_finite()) {
        (true, true) => (0.5 * (anchor_lo + anchor_hi)).clamp(lo, hi),
        (true, false) => hi,
        (false, true) => lo,
        (false, false) => 0.5 * (lo + hi),
    }
}

fn clip_to_domain(partition: &[f32], values: &[i32], lower: f32, upper: f32) -> StepFunction {
    let mut out_partition = Vec::with_capacity(partition.len());
    let mut out_values = Vec::with_capacity(values.len());
    out_partition.push(lower);
    for (i, &v) in values.iter().enumerate() {
        let lo = partition[i].max(lower);
        let hi = partition[i + 1].min(upper);
        if lo < hi {
            out_values.push(v);
            out_partition.push(hi);
        }
    }
    StepFunction::from_parts(out_partition, out_values)
}

impl fmt::Display for StepFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.partition[0])?;
        for (i, v) in self.values.iter().enumerate() {
            write!(f, " {v} ({})", self.partition[i + 1])?;
        }
        Ok(())
    }
}
