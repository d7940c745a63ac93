//! # mdprep Core Library
//!
//! Building blocks for preparing GROMACS molecular-dynamics runs and reading back
//! what the analysis tools write.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers:
//!
//! - **[`core`]: The Foundation.** Plain data models for parameter files
//!   (`ParamFile`) and secondary-structure matrices (`StructureMatrix`), the text
//!   codecs that read and write them, and the stock parameter presets.
//!
//! - **[`analysis`]: Post-processing.** Aggregates parsed matrices into per-time
//!   statistics that can be exported as CSV.
//!
//! - **[`workflows`]: The Public API.** Ties presets and parameter edits together
//!   into a finished run configuration through a validated builder.

pub mod analysis;
pub mod core;
pub mod workflows;
