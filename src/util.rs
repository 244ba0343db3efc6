//! Distance and ordering helpers shared by construction and search.

/// Squared Euclidean distance between two coordinates of equal length.
#[inline]
pub(crate) fn square_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b) {
        let d = x - y;
        sum += d * d;
    }
    sum
}

/// The total order used everywhere a tie on a float key has to be broken: first by the key, then
/// by insertion index.
///
/// Keys are never NaN here: coordinates are validated on insertion and queries before a search.
#[inline]
pub(crate) fn precedes(a: (f64, u32), b: (f64, u32)) -> bool {
    a.0 < b.0 || (a.0 == b.0 && a.1 < b.1)
}
