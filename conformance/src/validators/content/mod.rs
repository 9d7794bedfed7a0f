//! Content validators: file links, mechanics/lore pairing and documentation
//! policy.
//!
//! Style and language findings are advisory and always low severity.

pub mod links;
pub mod lore;
pub mod style;
