//! Input/output helpers.
//!
//! - JSON Lines event ingest + validation (`ingest`)
//! - per-event results CSV (`export`)
//! - candidate dumps and configuration files (`json`)

pub mod export;
pub mod ingest;
pub mod json;

pub use export::*;
pub use ingest::*;
pub use json::*;
