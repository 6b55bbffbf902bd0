//! Remote data acquisition.

pub mod explorador;

pub use explorador::*;
