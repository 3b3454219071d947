use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FromPrimitive};

/// Marker trait for the base floating-point types a tape can carry (`f32`, `f64`).
///
/// Bundles the numeric and utility traits the evaluators rely on. Tapes are
/// shared across threads during Jacobian assembly, hence `Send + Sync`.
pub trait Float:
    NumFloat + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}
