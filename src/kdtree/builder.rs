use std::cmp;

use geo_traits::CoordTrait;

use crate::error::{KDIndexError, Result};
use crate::kdtree::KDTree;
use crate::r#type::IndexableNum;
use crate::util::precedes;

/// A builder to create a [`KDTree`].
///
/// Points are appended one at a time and the tree is laid out by [`finish`][Self::finish].
///
/// ```
/// use kd_index::kdtree::KDTreeBuilder;
///
/// let mut builder = KDTreeBuilder::new(2);
/// builder.add(&[0, 0], "a").unwrap();
/// builder.add(&[10, 0], "b").unwrap();
/// builder.add(&[0, 10], "c").unwrap();
/// let tree = builder.finish().unwrap();
/// assert_eq!(tree.num_items(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct KDTreeBuilder<V> {
    /// Interleaved coordinates, `num_dims` per item, in insertion order.
    coords: Vec<f64>,
    values: Vec<V>,
    num_dims: usize,

    min: Vec<f64>,
    max: Vec<f64>,
}

impl<V> KDTreeBuilder<V> {
    /// Create a new builder for points with `num_dims` coordinates each.
    pub fn new(num_dims: usize) -> Self {
        Self::with_capacity(num_dims, 0)
    }

    /// Create a new builder and reserve space for `num_items` points.
    pub fn with_capacity(num_dims: usize, num_items: usize) -> Self {
        Self {
            coords: Vec::with_capacity(num_items * num_dims),
            values: Vec::with_capacity(num_items),
            num_dims,
            min: vec![f64::INFINITY; num_dims],
            max: vec![f64::NEG_INFINITY; num_dims],
        }
    }

    /// The number of coordinates of every point in this builder.
    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    /// The number of points added so far.
    pub fn num_items(&self) -> usize {
        self.values.len()
    }

    /// Add a point and its associated value to the index.
    ///
    /// This returns the insertion index, which every search reports back through
    /// [`Sample::index`][crate::search::Sample::index].
    ///
    /// A rejected point leaves the builder unchanged.
    pub fn add<N: IndexableNum>(&mut self, coord: &[N], value: V) -> Result<u32> {
        if coord.len() != self.num_dims {
            return Err(KDIndexError::InvalidInput(format!(
                "Point {} has {} coordinates, expected {}.",
                self.values.len(),
                coord.len(),
                self.num_dims
            )));
        }
        let index: u32 = self.values.len().try_into().map_err(|_| {
            KDIndexError::InvalidInput("Cannot index more than u32::MAX points.".to_string())
        })?;
        if index == u32::MAX {
            return Err(KDIndexError::InvalidInput(
                "Cannot index more than u32::MAX points.".to_string(),
            ));
        }
        if let Some(axis) = coord.iter().position(|c| !c.into_f64().is_finite()) {
            return Err(KDIndexError::InvalidInput(format!(
                "Point {} has a non-finite coordinate on axis {}.",
                index, axis
            )));
        }

        for (axis, c) in coord.iter().enumerate() {
            let c = c.into_f64();
            if c < self.min[axis] {
                self.min[axis] = c;
            }
            if c > self.max[axis] {
                self.max[axis] = c;
            }
            self.coords.push(c);
        }
        self.values.push(value);

        Ok(index)
    }

    /// Add a [`CoordTrait`] point and its associated value to the index.
    ///
    /// The dimensionality of the coordinate (`xy`, `xyz`, ...) must match the builder.
    pub fn add_coord<N: IndexableNum>(
        &mut self,
        coord: &impl CoordTrait<T = N>,
        value: V,
    ) -> Result<u32> {
        let mut buf = [0.0; 4];
        let size = coord.dim().size();
        if size > buf.len() {
            return Err(KDIndexError::InvalidInput(format!(
                "Unsupported coordinate dimension {}.",
                size
            )));
        }
        for (axis, slot) in buf.iter_mut().enumerate().take(size) {
            *slot = coord.nth_or_panic(axis).into_f64();
        }
        self.add(&buf[..size], value)
    }

    /// Consume this builder, performing the k-d sort and generating a KDTree ready for queries.
    pub fn finish(self) -> Result<KDTree<V>> {
        if self.num_dims == 0 {
            return Err(KDIndexError::InvalidInput(
                "Points must have at least one dimension.".to_string(),
            ));
        }
        if self.values.is_empty() {
            return Err(KDIndexError::InvalidInput(
                "Cannot build a tree from an empty point set.".to_string(),
            ));
        }

        let Self {
            mut coords,
            mut values,
            num_dims,
            min,
            max,
        } = self;
        let num_items = values.len();
        let mut ids: Vec<u32> = (0..num_items as u32).collect();

        // kd-sort all three arrays for efficient search
        let mut items = Items {
            coords: &mut coords,
            values: &mut values,
            ids: &mut ids,
            num_dims,
        };
        items.sort(0, num_items - 1, 0);

        let tree = KDTree {
            coords,
            values,
            ids,
            num_dims,
            min,
            max,
        };
        log::debug!(
            "built kd-tree over {} points in {} dimensions (height {})",
            tree.num_items(),
            num_dims,
            tree.height()
        );
        Ok(tree)
    }
}

/// Mutable borrow of the parallel arrays being kd-sorted.
struct Items<'a, V> {
    coords: &'a mut [f64],
    values: &'a mut [V],
    ids: &'a mut [u32],
    num_dims: usize,
}

impl<V> Items<'_, V> {
    /// The partition key of item `i` on `axis`.
    #[inline]
    fn key(&self, i: usize, axis: usize) -> (f64, u32) {
        (self.coords[self.num_dims * i + axis], self.ids[i])
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.ids.swap(i, j);
        self.values.swap(i, j);
        for d in 0..self.num_dims {
            self.coords.swap(self.num_dims * i + d, self.num_dims * j + d);
        }
    }

    fn sort(&mut self, left: usize, right: usize, depth: usize) {
        if right <= left {
            return;
        }

        // middle index
        let m = (left + right) >> 1;
        let axis = depth % self.num_dims;

        // place the median at m, smaller keys before it and larger keys after it
        self.select(m, left, right, axis);

        // recursively kd-sort both halves on the next axis
        if m > left {
            self.sort(left, m - 1, depth + 1);
        }
        self.sort(m + 1, right, depth + 1);
    }

    /// Custom Floyd-Rivest selection algorithm: reorder items so that [left..k-1] have keys
    /// smaller than the k-th item and [k+1..right] have larger keys (on the given axis).
    fn select(&mut self, k: usize, mut left: usize, mut right: usize, axis: usize) {
        while right > left {
            if right - left > 600 {
                let n = (right - left + 1) as f64;
                let m = (k - left + 1) as f64;
                let z = f64::ln(n);
                let s = 0.5 * f64::exp((2.0 * z) / 3.0);
                let sd = 0.5
                    * f64::sqrt((z * s * (n - s)) / n)
                    * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
                let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
                let new_right = cmp::min(
                    right,
                    f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
                );
                self.select(k, new_left, new_right, axis);
            }

            let t = self.key(k, axis);
            let mut i = left;
            let mut j = right;

            self.swap(left, k);
            if precedes(t, self.key(right, axis)) {
                self.swap(left, right);
            }

            while i < j {
                self.swap(i, j);
                i += 1;
                j -= 1;
                while precedes(self.key(i, axis), t) {
                    i += 1;
                }
                while precedes(t, self.key(j, axis)) {
                    j -= 1;
                }
            }

            if self.key(left, axis) == t {
                self.swap(left, j);
            } else {
                j += 1;
                self.swap(j, right);
            }

            if j <= k {
                left = j + 1;
            }
            if k <= j {
                if j == 0 {
                    break;
                }
                right = j - 1;
            }
        }
    }
}
