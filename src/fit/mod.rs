//! Hadronic top reconstruction.
//!
//! Responsibilities:
//!
//! - solve the W-mass constrained rescaling per jet pair (`rescale`)
//! - enumerate and score jet-role assignments (`generator`)
//! - locate the truth assignment in simulation (`truth`)
//! - reduce a candidate list to per-event best values (`selection`)

pub mod generator;
pub mod rescale;
pub mod selection;
pub mod truth;

pub use generator::*;
pub use rescale::*;
pub use selection::*;
pub use truth::*;
