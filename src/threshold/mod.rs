//! Threshold key layer: Shamir-based dealer DKG for per-file keys, plus an
//! optional Feldman VSS path for verifiable shares.

pub mod feldman;
pub mod shamir;

pub use shamir::{distribute, reconstruct};
