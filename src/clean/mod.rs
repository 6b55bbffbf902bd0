//! Normalization stages that turn a resolved frame into the canonical
//! series: column roles, gap repair, timestamp materialization.

pub mod columns;
pub mod fill;
pub mod timestamp;

pub use columns::identify;
pub use fill::{CleanSummary, clean, cleaned_values};
pub use timestamp::{materialize, window};
