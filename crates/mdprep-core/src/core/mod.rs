//! # Core Module
//!
//! Data models, file codecs and presets shared by every other layer.
//!
//! - **Models** ([`models`]) - `.mdp` parameter groups and `.xpm` structure matrices
//! - **File I/O** ([`io`]) - Readers and writers for both formats behind a common trait
//! - **Presets** ([`presets`]) - Ready-made parameter files for minimization and production runs

pub mod io;
pub mod models;
pub mod presets;
