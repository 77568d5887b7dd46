//! Per-example batch mapping with optional Rayon parallelism.
//!
//! Losses split one key per example before mapping, and results are
//! collected in input order, so the sequential and parallel paths produce
//! identical outputs for the same keys.

use crate::error::TrainingResult;

/// Configuration for parallel execution over batch examples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParallelConfig {
    /// Minimum batch size to trigger parallel execution
    pub min_batch_for_parallel: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_batch_for_parallel: 64,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum batch size for parallel execution.
    pub fn with_min_batch(mut self, min_batch: usize) -> Self {
        self.min_batch_for_parallel = min_batch;
        self
    }

    /// Configuration that never parallelizes.
    pub fn sequential() -> Self {
        Self {
            min_batch_for_parallel: usize::MAX,
        }
    }

    /// Check if parallel execution should be used for a given batch size.
    pub fn should_parallelize(&self, batch_size: usize) -> bool {
        cfg!(feature = "parallel") && batch_size >= self.min_batch_for_parallel
    }
}

/// Maps `f(index, item)` over the batch and collects the results in order.
///
/// Stops at the first error on the sequential path; on the parallel path the
/// reported error is one of the failing examples.
pub fn map_examples<I, O, F>(items: Vec<I>, config: &ParallelConfig, f: F) -> TrainingResult<Vec<O>>
where
    I: Send,
    O: Send,
    F: Fn(usize, I) -> TrainingResult<O> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if config.should_parallelize(items.len()) {
            use rayon::prelude::*;
            tracing::trace!(batch_size = items.len(), "mapping examples in parallel");
            return items
                .into_par_iter()
                .enumerate()
                .map(|(index, item)| f(index, item))
                .collect();
        }
    }

    #[cfg(not(feature = "parallel"))]
    let _ = config;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| f(index, item))
        .collect()
}
