use std::fmt::Debug;

use num_traits::{Num, NumCast, ToPrimitive};

/// A trait for types that can be used as input coordinates.
///
/// Pixel and voxel grids usually hand out integer positions while resampled or sub-pixel data is
/// real-valued, so every primitive numeric type is accepted. Values are widened to `f64` on entry;
/// the tree stores and compares nothing else.
///
/// This trait is sealed and cannot be implemented for external types.
pub trait IndexableNum:
    private::Sealed + Num + NumCast + ToPrimitive + PartialOrd + Copy + Debug + Send + Sync
{
    /// Widen this value to the `f64` representation used inside the tree.
    #[inline]
    fn into_f64(self) -> f64 {
        // Every sealed type converts; NaN surfaces as an invalid coordinate downstream.
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl IndexableNum for i8 {}
impl IndexableNum for u8 {}
impl IndexableNum for i16 {}
impl IndexableNum for u16 {}
impl IndexableNum for i32 {}
impl IndexableNum for u32 {}
impl IndexableNum for f32 {}
impl IndexableNum for f64 {}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for i8 {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
