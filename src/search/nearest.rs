use geo_traits::CoordTrait;

use crate::error::Result;
use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;
use crate::search::{Neighbor, Sample, Traversal, Visitor};
use crate::util::precedes;

/// Finds the single closest point to a query.
///
/// ```
/// use kd_index::kdtree::KDTree;
/// use kd_index::search::NearestNeighborSearch;
///
/// let tree = KDTree::build([[0., 0.], [10., 0.], [0., 10.], [10., 10.]], ["a", "b", "c", "d"])
///     .unwrap();
/// let mut search = NearestNeighborSearch::new(&tree);
/// search.search(&[1., 1.]).unwrap();
///
/// let nearest = search.result().unwrap();
/// assert_eq!(*nearest.value(), "a");
/// assert_eq!(nearest.square_distance(), 2.);
/// ```
#[derive(Debug)]
pub struct NearestNeighborSearch<'a, V> {
    tree: &'a KDTree<V>,
    traversal: Traversal,
    best: Best,
}

// Manual impl: cloning a search copies its state, not the tree.
impl<V> Clone for NearestNeighborSearch<'_, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            traversal: self.traversal.clone(),
            best: self.best,
        }
    }
}

impl<'a, V> NearestNeighborSearch<'a, V> {
    /// Create a new search over `tree`.
    pub fn new(tree: &'a KDTree<V>) -> Self {
        Self {
            tree,
            traversal: Traversal::new(tree.num_dims()),
            best: Best::default(),
        }
    }

    /// The tree this search runs on.
    pub fn tree(&self) -> &'a KDTree<V> {
        self.tree
    }

    /// Search the nearest neighbor of `query`, replacing the previous result.
    ///
    /// Fails if `query` does not have [`KDTree::num_dims`] coordinates or contains NaN, in which
    /// case the previous result is kept.
    pub fn search<N: IndexableNum>(&mut self, query: &[N]) -> Result<()> {
        self.traversal.load(self.tree, query)?;
        self.run();
        Ok(())
    }

    /// Search the nearest neighbor of a [`CoordTrait`] query.
    pub fn search_coord<N: IndexableNum>(&mut self, coord: &impl CoordTrait<T = N>) -> Result<()> {
        self.traversal.load_coord(self.tree, coord)?;
        self.run();
        Ok(())
    }

    fn run(&mut self) {
        self.best = Best::default();
        self.traversal.run(self.tree, &mut self.best);
    }

    /// The nearest neighbor found by the last search, or `None` before the first search.
    pub fn result(&self) -> Option<Sample<'_, V>> {
        self.best
            .neighbor
            .map(|neighbor| Sample::new(self.tree, neighbor))
    }
}

/// The best candidate seen so far; `id` breaks distance ties.
#[derive(Debug, Clone, Copy, Default)]
struct Best {
    neighbor: Option<Neighbor>,
    id: u32,
}

impl Visitor for Best {
    #[inline]
    fn admits(&self, plane_square_distance: f64) -> bool {
        match self.neighbor {
            // Equal distances may still win on insertion index
            Some(best) => plane_square_distance <= best.square_distance,
            None => true,
        }
    }

    #[inline]
    fn visit(&mut self, slot: usize, id: u32, square_distance: f64) {
        let better = match self.neighbor {
            Some(best) => precedes((square_distance, id), (best.square_distance, self.id)),
            None => true,
        };
        if better {
            self.neighbor = Some(Neighbor {
                square_distance,
                slot,
            });
            self.id = id;
        }
    }
}
