//! Utilities to traverse the KDTree structure.

use crate::kdtree::KDTree;

/// A node in the KDTree.
///
/// Every node owns exactly one point, its splitting point. Its subtree covers the contiguous
/// slot range `[left, right]` of the tree; the splitting point sits in the middle slot.
#[derive(Debug)]
pub struct Node<'a, V> {
    /// The tree that this node is a reference onto
    tree: &'a KDTree<V>,

    pub(crate) left: usize,
    pub(crate) right: usize,
    pub(crate) depth: usize,
}

// Manual impls: a node is a view and is copyable whatever `V` is.
impl<V> Clone for Node<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Node<'_, V> {}

impl<'a, V> Node<'a, V> {
    pub(crate) fn from_root(tree: &'a KDTree<V>) -> Self {
        Self::new(tree, 0, tree.num_items() - 1, 0)
    }

    #[inline]
    pub(crate) fn new(tree: &'a KDTree<V>, left: usize, right: usize, depth: usize) -> Self {
        debug_assert!(left <= right && right < tree.num_items());
        Self {
            tree,
            left,
            right,
            depth,
        }
    }

    /// Note: this is the index into the kd-sorted arrays, not the insertion index.
    #[inline]
    pub(crate) fn slot(&self) -> usize {
        (self.left + self.right) >> 1
    }

    /// The distance of this node from the root; the root has depth 0.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The axis this node splits its children over, cycling with depth.
    #[inline]
    pub fn axis(&self) -> usize {
        self.depth % self.tree.num_dims()
    }

    /// The coordinates of this node's point.
    #[inline]
    pub fn coordinate(&self) -> &'a [f64] {
        self.tree.coordinate_at(self.slot())
    }

    /// The coordinate of this node's point on its splitting axis.
    #[inline]
    pub fn split_value(&self) -> f64 {
        self.coordinate()[self.axis()]
    }

    /// The value associated with this node's point.
    #[inline]
    pub fn value(&self) -> &'a V {
        self.tree.value_at(self.slot())
    }

    /// The insertion index of this node's point.
    #[inline]
    pub fn index(&self) -> usize {
        self.tree.id_at(self.slot()) as usize
    }

    /// The number of points in the subtree rooted at this node, itself included.
    #[inline]
    pub fn num_items(&self) -> usize {
        self.right - self.left + 1
    }

    /// The child holding the points that order before this node on its axis.
    ///
    /// Their coordinates on [`axis`][Self::axis] are less than or equal to the
    /// [`split_value`][Self::split_value]; equal ones were inserted earlier than this node's
    /// point.
    pub fn left_child(&self) -> Option<Node<'a, V>> {
        let m = self.slot();
        (m > self.left).then(|| Node::new(self.tree, self.left, m - 1, self.depth + 1))
    }

    /// The child holding the points that order after this node on its axis.
    ///
    /// Their coordinates on [`axis`][Self::axis] are greater than or equal to the
    /// [`split_value`][Self::split_value]; equal ones were inserted later than this node's point.
    pub fn right_child(&self) -> Option<Node<'a, V>> {
        let m = self.slot();
        (m < self.right).then(|| Node::new(self.tree, m + 1, self.right, self.depth + 1))
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left == self.right
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }
}
