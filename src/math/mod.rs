//! Numerical building blocks: four-vectors, planar conics and scalar minimization.

pub mod conic;
pub mod lorentz;
pub mod minimize;

pub use conic::*;
pub use lorentz::*;
pub use minimize::*;
