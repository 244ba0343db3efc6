use geo_traits::CoordTrait;

use crate::error::{KDIndexError, Result};
use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;
use crate::search::{Neighbor, Sample, Traversal, Visitor};

/// Finds all points within a fixed distance of a query.
///
/// ```
/// use kd_index::kdtree::KDTree;
/// use kd_index::search::RadiusNeighborSearch;
///
/// let tree = KDTree::build([[0., 0.], [10., 0.], [0., 10.], [10., 10.]], 0..4).unwrap();
/// let mut search = RadiusNeighborSearch::new(&tree);
/// search.search(&[1., 1.], 10., true).unwrap();
///
/// let values: Vec<i32> = search.results().map(|sample| *sample.value()).collect();
/// assert_eq!(values, vec![0, 1, 2]);
/// ```
#[derive(Debug)]
pub struct RadiusNeighborSearch<'a, V> {
    tree: &'a KDTree<V>,
    traversal: Traversal,
    within: Within,
}

impl<V> Clone for RadiusNeighborSearch<'_, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            traversal: self.traversal.clone(),
            within: self.within.clone(),
        }
    }
}

impl<'a, V> RadiusNeighborSearch<'a, V> {
    /// Create a new radius search over `tree`.
    pub fn new(tree: &'a KDTree<V>) -> Self {
        Self {
            tree,
            traversal: Traversal::new(tree.num_dims()),
            within: Within::default(),
        }
    }

    /// The tree this search runs on.
    pub fn tree(&self) -> &'a KDTree<V> {
        self.tree
    }

    /// The radius of the last search.
    pub fn radius(&self) -> f64 {
        self.within.radius
    }

    /// Search all points with distance `<= radius` from `query`, replacing the previous results.
    ///
    /// With `sorted`, results come nearest first (equal distances in insertion order). Without,
    /// they come in traversal order, which saves the final sort.
    ///
    /// Fails if `query` does not have [`KDTree::num_dims`] coordinates or contains NaN, or if
    /// `radius` is negative or NaN; the previous results are kept.
    pub fn search<N: IndexableNum>(
        &mut self,
        query: &[N],
        radius: f64,
        sorted: bool,
    ) -> Result<()> {
        check_radius(radius)?;
        self.traversal.load(self.tree, query)?;
        self.run(radius, sorted);
        Ok(())
    }

    /// Search all points within `radius` of a [`CoordTrait`] query.
    pub fn search_coord<N: IndexableNum>(
        &mut self,
        coord: &impl CoordTrait<T = N>,
        radius: f64,
        sorted: bool,
    ) -> Result<()> {
        check_radius(radius)?;
        self.traversal.load_coord(self.tree, coord)?;
        self.run(radius, sorted);
        Ok(())
    }

    fn run(&mut self, radius: f64, sorted: bool) {
        self.within.reset(radius);
        self.traversal.run(self.tree, &mut self.within);
        if sorted {
            self.within.sort();
        }
    }

    /// The number of points found by the last search.
    pub fn count(&self) -> usize {
        self.within.neighbors.len()
    }

    /// The `i`-th point found by the last search, starting from 0.
    pub fn result(&self, i: usize) -> Option<Sample<'_, V>> {
        self.within
            .neighbors
            .get(i)
            .map(|(neighbor, _)| Sample::new(self.tree, *neighbor))
    }

    /// All results of the last search.
    pub fn results(&self) -> impl ExactSizeIterator<Item = Sample<'_, V>> + '_ {
        self.within
            .neighbors
            .iter()
            .map(|(neighbor, _)| Sample::new(self.tree, *neighbor))
    }
}

fn check_radius(radius: f64) -> Result<()> {
    if radius >= 0.0 {
        Ok(())
    } else {
        Err(KDIndexError::InvalidInput(format!(
            "Radius must be non-negative, got {}.",
            radius
        )))
    }
}

/// Every candidate within the radius, grown as needed and reused across searches.
///
/// Membership is decided on the distance itself, `sqrt(d²) <= radius`, so that every point whose
/// [`Sample::distance`] equals the radius is found. Comparing `d²` against the rounded `radius²`
/// would drop some of them.
#[derive(Debug, Clone, Default)]
struct Within {
    radius: f64,
    neighbors: Vec<(Neighbor, u32)>,
}

impl Within {
    fn reset(&mut self, radius: f64) {
        self.radius = radius;
        self.neighbors.clear();
    }

    #[inline]
    fn contains(&self, square_distance: f64) -> bool {
        square_distance.sqrt() <= self.radius
    }

    fn sort(&mut self) {
        // ids are unique, so this is a total order and needs no stable sort
        self.neighbors.sort_unstable_by(|(a, a_id), (b, b_id)| {
            a.square_distance
                .total_cmp(&b.square_distance)
                .then(a_id.cmp(b_id))
        });
    }
}

impl Visitor for Within {
    #[inline]
    fn admits(&self, plane_square_distance: f64) -> bool {
        // The plane is never farther than any point beyond it
        self.contains(plane_square_distance)
    }

    #[inline]
    fn visit(&mut self, slot: usize, id: u32, square_distance: f64) {
        if self.contains(square_distance) {
            self.neighbors.push((
                Neighbor {
                    square_distance,
                    slot,
                },
                id,
            ));
        }
    }
}
