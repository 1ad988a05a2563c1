//! Injectable source of uniform randomness.
//!
//! Every random choice in the crate (pixel-statistics tie-breaks, synthetic
//! confidences, the static fallback draw) goes through a [`RandomSource`].
//! Production code uses [`ThreadRandom`]; tests pin outcomes with
//! [`SequenceRandom`].

use std::sync::atomic::{AtomicUsize, Ordering};

/// A non-cryptographic uniform random source.
pub trait RandomSource: Send + Sync {
    /// Next value, uniform in `[0, 1)`.
    fn next_f64(&self) -> f64;
}

impl dyn RandomSource + '_ {
    /// Uniform value in `[low, high)`.
    pub fn range(&self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Pick one element uniformly. Panics on an empty slice.
    pub fn pick<'a, T>(&self, items: &'a [T]) -> &'a T {
        let index = (self.next_f64() * items.len() as f64) as usize;
        &items[index.min(items.len() - 1)]
    }

    /// Pick one element according to its weight.
    ///
    /// Weights need not sum to 1. Falls back to the last element when
    /// rounding leaves the draw past the cumulative total.
    pub fn pick_weighted<'a, T>(&self, items: &'a [(T, f64)]) -> &'a T {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut draw = self.next_f64() * total;
        for (item, weight) in items {
            if draw < *weight {
                return item;
            }
            draw -= weight;
        }
        &items[items.len() - 1].0
    }
}

/// Thread-local entropy via the `rand` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Replays a fixed sequence of values, cycling when exhausted.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: AtomicUsize,
}

impl SequenceRandom {
    /// Create a source replaying `values`. An empty sequence always yields 0.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// A source that always yields `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[index].clamp(0.0, 1.0 - f64::EPSILON)
    }
}
