//! Event sources and event-level filtering.
//!
//! - synthetic semi-leptonic top-pair events (`sample`)
//! - duplicate / bad-calibration rejection (`filter`)

pub mod filter;
pub mod sample;

pub use filter::*;
pub use sample::*;
