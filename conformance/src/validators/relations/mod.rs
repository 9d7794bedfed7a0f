//! Numeric relation validators.

pub mod range;
pub mod symmetry;
