//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the raw fetch artifact (`RawPayload`)
//! - the tabular frame the resolver produces (`TabularFrame`, `Column`)
//! - resolved column roles and the canonical series (`ColumnRoles`, `TimeSeries`)
//! - the per-run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
