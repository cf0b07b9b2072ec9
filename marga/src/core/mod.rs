//! Fundamental geometric types.
//!
//! Positions are stored as fixed-point integers ([`Int3`]) so that path costs
//! are exact and reproducible across threads. One world unit (meter) is
//! [`PRECISION`] integer units (millimeters).

mod point;

pub use point::{GridCoord, Int3, IntBounds, PRECISION};
