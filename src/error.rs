use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KDIndexError {
    /// The point set handed to the builder cannot be indexed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A query point does not have the dimensionality of the tree.
    #[error("Dimension mismatch: expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A k-nearest-neighbor search asks for more neighbors than the tree holds.
    #[error("Insufficient points: requested {k} neighbors from a tree of {num_items} items")]
    InsufficientPoints { k: usize, num_items: usize },
}

pub type Result<T> = std::result::Result<T, KDIndexError>;
