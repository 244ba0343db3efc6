use geo_traits::CoordTrait;

use crate::error::{KDIndexError, Result};
use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;
use crate::search::{Neighbor, Sample, Traversal, Visitor};
use crate::util::precedes;

/// Finds the `k` closest points to a query, in ascending order of distance.
///
/// ```
/// use kd_index::kdtree::KDTree;
/// use kd_index::search::KNearestNeighborSearch;
///
/// let tree = KDTree::build([[0., 0.], [10., 0.], [0., 10.], [10., 10.]], 0..4).unwrap();
/// let mut search = KNearestNeighborSearch::new(&tree, 3).unwrap();
/// search.search(&[9., 1.]).unwrap();
///
/// let values: Vec<i32> = search.results().map(|sample| *sample.value()).collect();
/// assert_eq!(values, vec![1, 0, 3]);
/// ```
#[derive(Debug)]
pub struct KNearestNeighborSearch<'a, V> {
    tree: &'a KDTree<V>,
    traversal: Traversal,
    best: KBest,
}

impl<V> Clone for KNearestNeighborSearch<'_, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            traversal: self.traversal.clone(),
            best: self.best.clone(),
        }
    }
}

impl<'a, V> KNearestNeighborSearch<'a, V> {
    /// Create a new search for the `k` nearest neighbors over `tree`.
    ///
    /// Fails if `k` is zero or larger than the number of points in the tree, so that every search
    /// yields exactly `k` results.
    pub fn new(tree: &'a KDTree<V>, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(KDIndexError::InvalidInput("k must be at least 1.".to_string()));
        }
        if k > tree.num_items() {
            return Err(KDIndexError::InsufficientPoints {
                k,
                num_items: tree.num_items(),
            });
        }
        log::debug!(
            "k-nearest-neighbor search with k = {} over {} points",
            k,
            tree.num_items()
        );
        Ok(Self {
            tree,
            traversal: Traversal::new(tree.num_dims()),
            best: KBest::new(k),
        })
    }

    /// The tree this search runs on.
    pub fn tree(&self) -> &'a KDTree<V> {
        self.tree
    }

    /// The number of neighbors each search collects.
    pub fn k(&self) -> usize {
        self.best.k
    }

    /// Search the `k` nearest neighbors of `query`, replacing the previous results.
    ///
    /// Fails if `query` does not have [`KDTree::num_dims`] coordinates or contains NaN, in which
    /// case the previous results are kept.
    pub fn search<N: IndexableNum>(&mut self, query: &[N]) -> Result<()> {
        self.traversal.load(self.tree, query)?;
        self.run();
        Ok(())
    }

    /// Search the `k` nearest neighbors of a [`CoordTrait`] query.
    pub fn search_coord<N: IndexableNum>(&mut self, coord: &impl CoordTrait<T = N>) -> Result<()> {
        self.traversal.load_coord(self.tree, coord)?;
        self.run();
        Ok(())
    }

    fn run(&mut self) {
        self.best.clear();
        self.traversal.run(self.tree, &mut self.best);
    }

    /// The number of results held: `k` after a search, zero before the first one.
    pub fn count(&self) -> usize {
        self.best.neighbors.len()
    }

    /// The `i`-th nearest neighbor found by the last search, starting from 0.
    pub fn result(&self, i: usize) -> Option<Sample<'_, V>> {
        self.best
            .neighbors
            .get(i)
            .map(|(neighbor, _)| Sample::new(self.tree, *neighbor))
    }

    /// All results of the last search, nearest first.
    pub fn results(&self) -> impl ExactSizeIterator<Item = Sample<'_, V>> + '_ {
        self.best
            .neighbors
            .iter()
            .map(|(neighbor, _)| Sample::new(self.tree, *neighbor))
    }
}

/// A fixed-capacity buffer of the best `k` candidates, kept sorted by `(distance, id)`.
///
/// `k` is typically small, so shifting entries on insertion beats a heap.
#[derive(Debug, Clone)]
struct KBest {
    k: usize,
    neighbors: Vec<(Neighbor, u32)>,
}

impl KBest {
    fn new(k: usize) -> Self {
        Self {
            k,
            neighbors: Vec::with_capacity(k),
        }
    }

    fn clear(&mut self) {
        self.neighbors.clear();
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.neighbors.len() == self.k
    }

    /// The current k-th best candidate, once there are k of them.
    #[inline]
    fn worst(&self) -> Option<(f64, u32)> {
        if self.is_full() {
            self.neighbors
                .last()
                .map(|(neighbor, id)| (neighbor.square_distance, *id))
        } else {
            None
        }
    }
}

impl Visitor for KBest {
    #[inline]
    fn admits(&self, plane_square_distance: f64) -> bool {
        match self.worst() {
            // Equal distances may still win on insertion index
            Some((worst, _)) => plane_square_distance <= worst,
            None => true,
        }
    }

    #[inline]
    fn visit(&mut self, slot: usize, id: u32, square_distance: f64) {
        if let Some(worst) = self.worst() {
            if !precedes((square_distance, id), worst) {
                return;
            }
        }

        let entry = (
            Neighbor {
                square_distance,
                slot,
            },
            id,
        );
        // Drop the prior worst when full, then shift larger entries up by one
        if self.is_full() {
            self.neighbors.pop();
        }
        self.neighbors.push(entry);
        let mut i = self.neighbors.len() - 1;
        while i > 0 {
            let (prev, prev_id) = self.neighbors[i - 1];
            if !precedes((square_distance, id), (prev.square_distance, prev_id)) {
                break;
            }
            self.neighbors[i] = self.neighbors[i - 1];
            i -= 1;
        }
        self.neighbors[i] = entry;
    }
}

#[cfg(test)]
mod test {
    use crate::error::KDIndexError;
    use crate::kdtree::KDTree;
    use crate::search::KNearestNeighborSearch;
    use crate::test::{
        brute_force_sorted, grid_points, random_points, random_queries, square_tree, NUM_POINTS,
        NUM_QUERIES,
    };

    fn check_against_exhaustive(num_dims: usize, k: usize) {
        let points = random_points(num_dims, NUM_POINTS, 435435435);
        let queries = random_queries(num_dims, NUM_QUERIES, 99);
        let tree = KDTree::build(&points, 0..points.len()).unwrap();
        let mut search = KNearestNeighborSearch::new(&tree, k).unwrap();

        for query in &queries {
            search.search(query).unwrap();
            let expected = brute_force_sorted(&points, query);
            assert_eq!(search.count(), k);
            for (i, sample) in search.results().enumerate() {
                let (index, square_distance) = expected[i];
                assert_eq!(sample.index(), index, "{}-th neighbor of {:?}", i, query);
                assert_eq!(sample.coordinate(), points[index].as_slice());
                assert_eq!(sample.square_distance(), square_distance);
            }
        }
    }

    #[test]
    fn matches_exhaustive_search() {
        check_against_exhaustive(3, 3);
        check_against_exhaustive(2, 1);
        check_against_exhaustive(2, 16);
        check_against_exhaustive(5, 7);
    }

    #[test]
    fn k_equal_to_point_count_returns_everything_sorted() {
        let points = random_points(2, 64, 8);
        let tree = KDTree::build(&points, 0..points.len()).unwrap();
        let mut search = KNearestNeighborSearch::new(&tree, 64).unwrap();
        search.search(&[0.25, 0.75]).unwrap();

        let got: Vec<usize> = search.results().map(|s| s.index()).collect();
        let want: Vec<usize> = brute_force_sorted(&points, &[0.25, 0.75])
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(got, want);
        let distances: Vec<f64> = search.results().map(|s| s.distance()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn identical_points_come_back_in_insertion_order() {
        let points = vec![[1., 1.]; 20];
        let tree = KDTree::build(&points, 100..120).unwrap();
        let mut search = KNearestNeighborSearch::new(&tree, 20).unwrap();
        search.search(&[1., 1.]).unwrap();

        let values: Vec<i32> = search.results().map(|s| *s.value()).collect();
        assert_eq!(values, (100..120).collect::<Vec<_>>());
        assert!(search.results().all(|s| s.distance() == 0.));
    }

    #[test]
    fn grid_ties_follow_insertion_order() {
        let grid = grid_points(10);
        let points: Vec<[f64; 2]> = grid.iter().map(|[x, y]| [*x as f64, *y as f64]).collect();
        let tree = KDTree::build(&grid, 0..grid.len()).unwrap();
        let mut search = KNearestNeighborSearch::new(&tree, 9).unwrap();

        for query in [[4.5, 4.5], [0., 0.], [3., 7.], [9.5, 0.5], [-1., 5.]] {
            search.search(&query).unwrap();
            let got: Vec<usize> = search.results().map(|s| s.index()).collect();
            let want: Vec<usize> = brute_force_sorted(&points, &query)
                .into_iter()
                .take(9)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(got, want, "query {:?}", query);
        }
    }

    #[test]
    fn rejects_invalid_k() {
        let tree = square_tree();
        assert!(matches!(
            KNearestNeighborSearch::new(&tree, 0),
            Err(KDIndexError::InvalidInput(_))
        ));
        assert!(matches!(
            KNearestNeighborSearch::new(&tree, 5),
            Err(KDIndexError::InsufficientPoints {
                k: 5,
                num_items: 4
            })
        ));
        assert!(KNearestNeighborSearch::new(&tree, 4).is_ok());
    }

    #[test]
    fn results_are_replaced_by_the_next_search() {
        let tree = square_tree();
        let mut search = KNearestNeighborSearch::new(&tree, 2).unwrap();
        assert_eq!(search.count(), 0);
        assert!(search.result(0).is_none());

        search.search(&[1., 1.]).unwrap();
        let first: Vec<usize> = search.results().map(|s| s.index()).collect();
        search.search(&[11., 11.]).unwrap();
        let second: Vec<usize> = search.results().map(|s| s.index()).collect();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![3, 1]);
        assert!(search.result(2).is_none());

        // a failed search leaves the results alone
        assert!(search.search(&[1.]).is_err());
        let after: Vec<usize> = search.results().map(|s| s.index()).collect();
        assert_eq!(after, second);
    }
}
