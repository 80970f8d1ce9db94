//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - physics constants and the sentinel value (`PDG_W_MASS`, `SENTINEL`, ...)
//! - input events (`Event`, `EventId`, `MissingEnergy`) and per-jet inputs (`JetSet`)
//! - reconstruction outputs (`Candidate`, `EventResult`, `EventSummary`)
//! - run settings (`RecoConfig`, `RunConfig`, `SimConfig`)

pub mod types;

pub use types::*;
