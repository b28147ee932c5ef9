//! Efficiency estimation and curve fitting.
//!
//! Responsibilities:
//!
//! - turn numerator/denominator counts into an efficiency curve with asymmetric errors
//! - seed the turn-on parameters from the curve shape
//! - run the weighted Levenberg–Marquardt fit

pub mod efficiency;
pub mod fitter;
pub mod seed;

pub use efficiency::*;
pub use fitter::*;
pub use seed::*;
