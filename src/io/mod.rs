//! Input/output helpers.
//!
//! - payload format resolution (`resolve`)
//! - cleaned CSV export (`export`)

pub mod export;
pub mod resolve;

pub use export::*;
pub use resolve::*;
