//! Training batches.

use crate::{
    error::{TrainingError, TrainingResult},
    manifold::Manifold,
    types::{Point, Scalar},
};

/// A batch of data points on a manifold.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T: Scalar> {
    /// Ordered data points, each in embedding coordinates.
    pub data: Vec<Point<T>>,
}

impl<T: Scalar> Batch<T> {
    /// Creates a batch from data points.
    pub fn new(data: Vec<Point<T>>) -> Self {
        Self { data }
    }

    /// Number of points in the batch.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the batch holds no points.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks that the batch is non-empty and every point has the manifold's
    /// embedding dimension.
    ///
    /// Loss estimators call this before splitting any key.
    pub fn validate<M>(&self, manifold: &M) -> TrainingResult<()>
    where
        M: Manifold<T> + ?Sized,
    {
        if self.data.is_empty() {
            return Err(TrainingError::EmptyBatch);
        }
        let expected = manifold.ambient_dimension();
        if let Some((index, point)) = self
            .data
            .iter()
            .enumerate()
            .find(|(_, point)| point.len() != expected)
        {
            return Err(TrainingError::dimension_mismatch(
                format!("{} coordinates on {}", expected, manifold.name()),
                format!("{} coordinates at batch index {}", point.len(), index),
            ));
        }
        Ok(())
    }
}

impl<T: Scalar> From<Vec<Point<T>>> for Batch<T> {
    fn from(data: Vec<Point<T>>) -> Self {
        Self::new(data)
    }
}
