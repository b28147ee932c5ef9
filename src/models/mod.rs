//! Turn-on model implementations.
//!
//! Models are implemented as small, pure functions so that fitting and
//! serialization code can stay generic over the family.

pub mod model;

pub use model::*;
