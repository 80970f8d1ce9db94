//! Stransverse-mass discriminants.
//!
//! - `bisect`: generic MT2 with per-side invisible masses
//! - `mt2w`: the semi-leptonic top-pair variant
//! - `engine`: mt2b / mt2bl / mt2w for one jet assignment

pub mod bisect;
pub mod engine;
pub mod mt2w;

pub use bisect::*;
pub use engine::*;
pub use mt2w::*;
