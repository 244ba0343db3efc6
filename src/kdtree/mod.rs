//! An implementation of an immutable, balanced K-D Tree over payload-carrying points.

#![warn(missing_docs)]

mod builder;
mod index;
mod traversal;

pub use builder::KDTreeBuilder;
pub use index::KDTree;
pub use traversal::Node;
