//! Input/output helpers.
//!
//! - histogram bundle JSON read/write (`bundle`)
//! - correction-set JSON read/write (`correction`)
//! - efficiency CSV and fit report JSON exports (`export`)

pub mod bundle;
pub mod correction;
pub mod export;

pub use bundle::*;
pub use correction::*;
pub use export::*;
