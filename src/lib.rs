#![doc = include_str!("../README.md")]

mod error;
pub mod kdtree;
pub mod search;
mod r#type;
mod util;

pub use error::{KDIndexError, Result};
pub use r#type::IndexableNum;

#[cfg(test)]
pub(crate) mod test;
