//! Shared fixtures: seeded point clouds and brute-force references to check searches against.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::kdtree::KDTree;
use crate::util::square_distance;

pub(crate) const NUM_POINTS: usize = 1000;
pub(crate) const NUM_QUERIES: usize = 100;

const MIN: f64 = -5.0;
const MAX: f64 = 5.0;

/// Uniform random points in `[MIN, MAX)` on every axis.
pub(crate) fn random_points(num_dims: usize, num_points: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points)
        .map(|_| (0..num_dims).map(|_| rng.gen_range(MIN..MAX)).collect())
        .collect()
}

/// Uniform random queries over twice the extent of the point cloud, so that some fall outside it.
pub(crate) fn random_queries(num_dims: usize, num_queries: usize, seed: u64) -> Vec<Vec<f64>> {
    let size = MAX - MIN;
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_queries)
        .map(|_| {
            (0..num_dims)
                .map(|_| rng.gen_range(MIN - size / 2.0..MAX + size / 2.0))
                .collect()
        })
        .collect()
}

/// Integer grid points `[0, side)^2` in row-major insertion order: many exact distance ties.
pub(crate) fn grid_points(side: i32) -> Vec<[i32; 2]> {
    (0..side)
        .flat_map(|y| (0..side).map(move |x| [x, y]))
        .collect()
}

/// `(insertion index, squared distance)` of every point, stable-sorted by distance.
///
/// This is the reference order for all searches: ties keep insertion order.
pub(crate) fn brute_force_sorted<C: AsRef<[f64]>>(
    points: &[C],
    query: &[f64],
) -> Vec<(usize, f64)> {
    let mut square_distances: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, square_distance(p.as_ref(), query)))
        .collect();
    square_distances.sort_by(|a, b| a.1.total_cmp(&b.1));
    square_distances
}

/// The four corners `(0,0), (10,0), (0,10), (10,10)`, each valued with its insertion index.
pub(crate) fn square_tree() -> KDTree<usize> {
    KDTree::build([[0., 0.], [10., 0.], [0., 10.], [10., 10.]], 0..4).unwrap()
}
