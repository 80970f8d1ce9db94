//! Jet resolution models.
//!
//! Models are constructed once and passed explicitly to the reconstruction so that
//! worker threads can share them without any global state.

pub mod resolution;

pub use resolution::*;
