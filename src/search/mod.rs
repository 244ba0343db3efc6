//! Exact neighbor searches on a [`KDTree`].
//!
//! Every search is a reusable cursor bound to one tree. A cursor owns its result buffer and
//! traversal stack, both allocated when the cursor is created and reset on every `search` call,
//! so searching many points in a loop does not allocate. Results are read through [`Sample`]s
//! borrowed from the cursor and stay valid until the next `search` on that cursor.
//!
//! All three searches share one depth-first branch-and-bound traversal. At each node the node's
//! own point is considered first; then the child on the query's side of the splitting hyperplane
//! (the "near" side, ties going right); then the other child, unless the squared distance from the
//! query to the hyperplane exceeds the current bound.
//!
//! Equal distances are ordered by insertion index. Nearest and k-nearest results, as well as
//! sorted radius results, are therefore exactly what a stable sort of the input points by distance
//! produces.

#![warn(missing_docs)]

mod k_nearest;
mod nearest;
#[cfg(feature = "rayon")]
mod parallel;
mod radius;

pub use k_nearest::KNearestNeighborSearch;
pub use nearest::NearestNeighborSearch;
pub use radius::RadiusNeighborSearch;

use geo_traits::CoordTrait;
use tinyvec::TinyVec;

use crate::error::{KDIndexError, Result};
use crate::kdtree::{KDTree, Node};
use crate::r#type::IndexableNum;
use crate::util::square_distance;

/// A single search result: one indexed point and its distance to the query.
#[derive(Debug)]
pub struct Sample<'a, V> {
    coordinate: &'a [f64],
    value: &'a V,
    index: u32,
    square_distance: f64,
}

impl<V> Clone for Sample<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Sample<'_, V> {}

impl<'a, V> Sample<'a, V> {
    fn new(tree: &'a KDTree<V>, neighbor: Neighbor) -> Self {
        Self {
            coordinate: tree.coordinate_at(neighbor.slot),
            value: tree.value_at(neighbor.slot),
            index: tree.id_at(neighbor.slot),
            square_distance: neighbor.square_distance,
        }
    }

    /// The coordinates of the matched point.
    pub fn coordinate(&self) -> &'a [f64] {
        self.coordinate
    }

    /// The value stored with the matched point.
    pub fn value(&self) -> &'a V {
        self.value
    }

    /// The insertion index of the matched point.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// The Euclidean distance from the query to the matched point.
    pub fn distance(&self) -> f64 {
        self.square_distance.sqrt()
    }

    /// The squared Euclidean distance from the query to the matched point.
    pub fn square_distance(&self) -> f64 {
        self.square_distance
    }
}

/// A candidate in a result buffer: a kd-sorted slot and its squared distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Neighbor {
    pub(crate) square_distance: f64,
    pub(crate) slot: usize,
}

/// Receives the points of one traversal and decides which subtrees remain worth visiting.
pub(crate) trait Visitor {
    /// Whether a subtree whose points are all at least `plane_square_distance` (squared) away from
    /// the query can still contribute a result.
    fn admits(&self, plane_square_distance: f64) -> bool;

    /// Consider the point at `slot`, with insertion index `id`.
    fn visit(&mut self, slot: usize, id: u32, square_distance: f64);
}

/// A pending subtree on the traversal stack.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    left: usize,
    right: usize,
    depth: usize,
    /// Squared distance from the query to the hyperplane separating this subtree from its parent's
    /// near side; zero for near children and the root.
    plane_square_distance: f64,
}

impl Frame {
    fn from_node<V>(node: Node<'_, V>, plane_square_distance: f64) -> Self {
        Self {
            left: node.left,
            right: node.right,
            depth: node.depth,
            plane_square_distance,
        }
    }
}

/// The per-cursor query buffer and depth-first traversal state.
#[derive(Debug, Clone, Default)]
pub(crate) struct Traversal {
    // Use TinyVec to avoid heap allocations for low-dimensional queries and shallow trees
    query: TinyVec<[f64; 4]>,
    stack: TinyVec<[Frame; 32]>,
}

impl Traversal {
    pub(crate) fn new(num_dims: usize) -> Self {
        let mut traversal = Self::default();
        traversal.query.reserve(num_dims);
        traversal
    }

    /// Validate `query` against `tree` and load it as the current query.
    ///
    /// On error nothing observable changes: result buffers are only touched by [`run`].
    ///
    /// [`run`]: Self::run
    pub(crate) fn load<V, N: IndexableNum>(
        &mut self,
        tree: &KDTree<V>,
        query: &[N],
    ) -> Result<()> {
        if query.len() != tree.num_dims() {
            return Err(KDIndexError::DimensionMismatch {
                expected: tree.num_dims(),
                actual: query.len(),
            });
        }
        if let Some(axis) = query.iter().position(|c| c.into_f64().is_nan()) {
            return Err(KDIndexError::InvalidInput(format!(
                "Query coordinate on axis {} is NaN.",
                axis
            )));
        }
        self.query.clear();
        self.query.extend(query.iter().map(|c| c.into_f64()));
        Ok(())
    }

    /// Validate and load a [`CoordTrait`] query.
    pub(crate) fn load_coord<V, N: IndexableNum>(
        &mut self,
        tree: &KDTree<V>,
        coord: &impl CoordTrait<T = N>,
    ) -> Result<()> {
        let size = coord.dim().size();
        if size != tree.num_dims() {
            return Err(KDIndexError::DimensionMismatch {
                expected: tree.num_dims(),
                actual: size,
            });
        }
        let mut buf: TinyVec<[f64; 4]> = TinyVec::new();
        buf.extend((0..size).map(|axis| coord.nth_or_panic(axis).into_f64()));
        self.load(tree, &buf[..])
    }

    /// Walk `tree` depth-first for the loaded query, feeding `visitor`.
    pub(crate) fn run<V>(&mut self, tree: &KDTree<V>, visitor: &mut impl Visitor) {
        self.stack.clear();
        self.stack.push(Frame::from_node(tree.root(), 0.0));

        while let Some(frame) = self.stack.pop() {
            // The bound may have tightened since this frame was pushed
            if !visitor.admits(frame.plane_square_distance) {
                continue;
            }

            let node = Node::new(tree, frame.left, frame.right, frame.depth);
            let coordinate = node.coordinate();
            let slot = node.slot();
            visitor.visit(slot, tree.id_at(slot), square_distance(&self.query, coordinate));

            let axis = node.axis();
            let axis_diff = self.query[axis] - coordinate[axis];
            let (near, far) = if axis_diff < 0.0 {
                (node.left_child(), node.right_child())
            } else {
                (node.right_child(), node.left_child())
            };

            // Note: pushed in backwards order to what gets popped, so the near side goes first
            if let Some(far) = far {
                self.stack.push(Frame::from_node(far, axis_diff * axis_diff));
            }
            if let Some(near) = near {
                self.stack.push(Frame::from_node(near, 0.0));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::kdtree::KDTree;
    use crate::search::{KNearestNeighborSearch, NearestNeighborSearch, RadiusNeighborSearch};
    use crate::test::{
        brute_force_sorted, random_points, random_queries, square_tree, NUM_POINTS, NUM_QUERIES,
    };

    #[test]
    fn separate_cursors_do_not_interfere() {
        let points = random_points(3, NUM_POINTS, 1);
        let queries = random_queries(3, 2, 2);
        let tree = KDTree::build(&points, 0..points.len()).unwrap();

        let mut first = KNearestNeighborSearch::new(&tree, 5).unwrap();
        let mut second = KNearestNeighborSearch::new(&tree, 5).unwrap();
        first.search(&queries[0]).unwrap();
        second.search(&queries[1]).unwrap();

        let expected_first: Vec<usize> = brute_force_sorted(&points, &queries[0])
            .iter()
            .take(5)
            .map(|(i, _)| *i)
            .collect();
        let expected_second: Vec<usize> = brute_force_sorted(&points, &queries[1])
            .iter()
            .take(5)
            .map(|(i, _)| *i)
            .collect();
        assert_ne!(expected_first, expected_second);

        let got_first: Vec<usize> = first.results().map(|s| s.index()).collect();
        let got_second: Vec<usize> = second.results().map(|s| s.index()).collect();
        assert_eq!(got_first, expected_first);
        assert_eq!(got_second, expected_second);
    }

    #[test]
    fn shared_tree_across_threads() {
        let points = random_points(3, NUM_POINTS, 3);
        let queries = random_queries(3, NUM_QUERIES, 4);
        let tree = KDTree::build(&points, 0..points.len()).unwrap();

        std::thread::scope(|scope| {
            for chunk in queries.chunks(NUM_QUERIES / 4) {
                let tree = &tree;
                let points = &points;
                scope.spawn(move || {
                    let mut nearest = NearestNeighborSearch::new(tree);
                    let mut radius = RadiusNeighborSearch::new(tree);
                    for query in chunk {
                        let expected = brute_force_sorted(points, query);

                        nearest.search(query).unwrap();
                        assert_eq!(nearest.result().unwrap().index(), expected[0].0);

                        radius.search(query, 1.0, true).unwrap();
                        let got: Vec<usize> = radius.results().map(|s| *s.value()).collect();
                        let want: Vec<usize> = expected
                            .iter()
                            .take_while(|(_, d)| d.sqrt() <= 1.0)
                            .map(|(i, _)| *i)
                            .collect();
                        assert_eq!(got, want);
                    }
                });
            }
        });
    }

    #[test]
    fn square_reference_scenario() {
        let tree = square_tree();

        let mut nearest = NearestNeighborSearch::new(&tree);
        nearest.search(&[1., 1.]).unwrap();
        let sample = nearest.result().unwrap();
        assert_eq!(sample.coordinate(), &[0., 0.]);
        assert_eq!(*sample.value(), 0);
        approx::assert_relative_eq!(sample.distance(), 2f64.sqrt());

        let mut k_nearest = KNearestNeighborSearch::new(&tree, 2).unwrap();
        k_nearest.search(&[1., 1.]).unwrap();
        let values: Vec<usize> = k_nearest.results().map(|s| *s.value()).collect();
        assert_eq!(values[0], 0);
        // (10, 0) and (0, 10) tie at sqrt(82); the earlier insertion wins
        assert_eq!(values[1], 1);
        approx::assert_relative_eq!(k_nearest.result(1).unwrap().distance(), 82f64.sqrt());

        let mut radius = RadiusNeighborSearch::new(&tree);
        radius.search(&[1., 1.], 2.0, true).unwrap();
        assert_eq!(radius.count(), 1);
        assert_eq!(radius.result(0).unwrap().coordinate(), &[0., 0.]);
    }

    #[test]
    fn coord_trait_queries() {
        let tree = square_tree();

        let mut nearest = NearestNeighborSearch::new(&tree);
        nearest.search_coord(&(9.0f64, 9.5f64)).unwrap();
        assert_eq!(*nearest.result().unwrap().value(), 3);

        let mut radius = RadiusNeighborSearch::new(&tree);
        radius.search_coord(&(5i32, 0i32), 5.0, true).unwrap();
        let values: Vec<usize> = radius.results().map(|s| *s.value()).collect();
        assert_eq!(values, vec![0, 1]);
    }
}
