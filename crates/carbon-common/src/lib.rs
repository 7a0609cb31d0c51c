//! Common types and utilities shared across the carbon MRV crates.

pub mod bbox;
pub mod error;
pub mod point;

pub use bbox::BoundingBox;
pub use error::{CarbonError, CarbonResult, EmptyKind};
pub use point::{CarbonPoint, ClassCode, GridPoint};
