//! Numerical building blocks: linear least squares and the inverse incomplete beta.

pub mod beta;
pub mod ols;

pub use beta::*;
pub use ols::*;
