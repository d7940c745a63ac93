//! Post-processing of parsed analysis output.
//!
//! [`ss_stats`] turns one or more `gmx do_dssp` matrices into per-time-bucket
//! secondary-structure percentages.

pub mod ss_stats;
