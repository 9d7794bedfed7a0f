//! Entity integrity validators.
//!
//! ID uniqueness, reference resolution and template hygiene: the checks that
//! decide whether the corpus can be loaded by the game at all.

pub mod references;
pub mod templates;
pub mod uniqueness;
