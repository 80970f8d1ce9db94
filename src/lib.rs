//! `top-reco` library crate.
//!
//! Reconstructs a hadronically decaying top quark from the jets of a single-lepton
//! event, ranks the jet-role hypotheses by a constrained chi-square and computes the
//! MT2 family of discriminants (mt2b, mt2bl, mt2w).
//!
//! The binary (`topreco`) is a thin wrapper around this library so that:
//!
//! - the reconstruction core is testable without spawning processes
//! - the per-event core can be driven by other event loops
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod mt2;
pub mod report;
