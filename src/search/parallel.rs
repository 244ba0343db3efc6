//! Batch queries over a shared tree, one cursor per rayon worker.

use rayon::prelude::*;

use crate::error::{KDIndexError, Result};
use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;
use crate::search::{KNearestNeighborSearch, NearestNeighborSearch, RadiusNeighborSearch};

impl<V: Sync> KDTree<V> {
    /// The insertion index of the nearest neighbor of every query, in query order.
    pub fn par_nearest<C, N>(&self, queries: &[C]) -> Result<Vec<usize>>
    where
        C: AsRef<[N]> + Sync,
        N: IndexableNum,
    {
        log::trace!("nearest-neighbor batch of {} queries", queries.len());
        queries
            .par_iter()
            .map_init(
                || NearestNeighborSearch::new(self),
                |search, query| -> Result<usize> {
                    search.search(query.as_ref())?;
                    // A built tree is never empty, so a successful search always holds a result
                    search
                        .result()
                        .map(|sample| sample.index())
                        .ok_or(KDIndexError::InsufficientPoints {
                            k: 1,
                            num_items: self.num_items(),
                        })
                },
            )
            .collect()
    }

    /// The insertion indices of the `k` nearest neighbors of every query, nearest first.
    pub fn par_k_nearest<C, N>(&self, queries: &[C], k: usize) -> Result<Vec<Vec<usize>>>
    where
        C: AsRef<[N]> + Sync,
        N: IndexableNum,
    {
        // Surface an invalid k once rather than from every worker
        let prototype = KNearestNeighborSearch::new(self, k)?;
        log::trace!("{}-nearest-neighbor batch of {} queries", k, queries.len());
        queries
            .par_iter()
            .map_init(
                || prototype.clone(),
                |search, query| -> Result<Vec<usize>> {
                    search.search(query.as_ref())?;
                    Ok(search.results().map(|sample| sample.index()).collect())
                },
            )
            .collect()
    }

    /// The insertion indices of all points within `radius` of every query.
    pub fn par_within_radius<C, N>(
        &self,
        queries: &[C],
        radius: f64,
        sorted: bool,
    ) -> Result<Vec<Vec<usize>>>
    where
        C: AsRef<[N]> + Sync,
        N: IndexableNum,
    {
        log::trace!("radius batch of {} queries", queries.len());
        queries
            .par_iter()
            .map_init(
                || RadiusNeighborSearch::new(self),
                |search, query| -> Result<Vec<usize>> {
                    search.search(query.as_ref(), radius, sorted)?;
                    Ok(search.results().map(|sample| sample.index()).collect())
                },
            )
            .collect()
    }
}
