use crate::error::{KDIndexError, Result};
use crate::kdtree::traversal::Node;
use crate::kdtree::KDTreeBuilder;
use crate::r#type::IndexableNum;

/// An immutable, balanced k-d tree over a set of points, each carrying a value of type `V`.
///
/// Usually this will be created via [`KDTree::build`] or a [`KDTreeBuilder`].
///
/// Storage is a flat arena in kd-sorted order: every slot holds one point's coordinates, its
/// value and its insertion index. The subtree rooted at slot range `[left, right]` stores its
/// splitting point in the middle slot, with the two halves on either side.
///
/// Points are split on `(coordinate on the node's axis, insertion index)`, not on the coordinate
/// alone. A point whose coordinate equals the split value therefore goes left when it was
/// inserted before the splitting point and right when inserted after it: left `<=` split `<=`
/// right on the raw coordinate. This keeps the tree balanced for duplicate-heavy input.
///
/// Nothing is mutated after construction, so a tree can be shared read-only between any number
/// of searches and threads.
#[derive(Debug, Clone, PartialEq)]
pub struct KDTree<V> {
    pub(crate) coords: Vec<f64>,
    pub(crate) values: Vec<V>,
    pub(crate) ids: Vec<u32>,
    pub(crate) num_dims: usize,
    pub(crate) min: Vec<f64>,
    pub(crate) max: Vec<f64>,
}

impl<V> KDTree<V> {
    /// Build a tree from parallel sequences of coordinates and values.
    ///
    /// The dimensionality is taken from the first coordinate; all others must match it.
    ///
    /// ```
    /// use kd_index::kdtree::KDTree;
    ///
    /// let coords = [[0., 0.], [10., 0.], [0., 10.], [10., 10.]];
    /// let tree = KDTree::build(&coords, 0..4).unwrap();
    /// assert_eq!(tree.num_items(), 4);
    /// assert_eq!(tree.num_dims(), 2);
    /// ```
    pub fn build<C, N>(
        coordinates: impl IntoIterator<Item = C>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self>
    where
        C: AsRef<[N]>,
        N: IndexableNum,
    {
        let coordinates: Vec<C> = coordinates.into_iter().collect();
        let values: Vec<V> = values.into_iter().collect();
        if coordinates.len() != values.len() {
            return Err(KDIndexError::InvalidInput(format!(
                "Got {} coordinates but {} values.",
                coordinates.len(),
                values.len()
            )));
        }
        let Some(first) = coordinates.first() else {
            return Err(KDIndexError::InvalidInput(
                "Cannot build a tree from an empty point set.".to_string(),
            ));
        };

        let mut builder = KDTreeBuilder::with_capacity(first.as_ref().len(), values.len());
        for (coord, value) in coordinates.iter().zip(values) {
            builder.add(coord.as_ref(), value)?;
        }
        builder.finish()
    }

    /// The number of points in this tree.
    pub fn num_items(&self) -> usize {
        self.values.len()
    }

    /// The number of coordinates of every point (and every query) of this tree.
    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    /// The number of levels of this tree; a single point has height 1.
    pub fn height(&self) -> usize {
        (usize::BITS - self.num_items().leading_zeros()) as usize
    }

    /// The per-axis minimum over all points.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// The per-axis maximum over all points.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Access the root node of the KDTree for manual traversal.
    pub fn root(&self) -> Node<'_, V> {
        Node::from_root(self)
    }

    /// Iterate over `(insertion index, coordinate, value)` of all points, in kd-sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f64], &V)> + '_ {
        self.ids
            .iter()
            .zip(self.coords.chunks_exact(self.num_dims))
            .zip(&self.values)
            .map(|((id, coord), value)| (*id as usize, coord, value))
    }

    #[inline]
    pub(crate) fn coordinate_at(&self, slot: usize) -> &[f64] {
        &self.coords[slot * self.num_dims..(slot + 1) * self.num_dims]
    }

    #[inline]
    pub(crate) fn id_at(&self, slot: usize) -> u32 {
        self.ids[slot]
    }

    #[inline]
    pub(crate) fn value_at(&self, slot: usize) -> &V {
        &self.values[slot]
    }
}
