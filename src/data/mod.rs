//! Synthetic input generation.

pub mod toy;

pub use toy::*;
