//! # Core Models Module
//!
//! In-memory representations of the files mdprep reads and writes.
//!
//! ## Key Components
//!
//! - [`params`] - Ordered parameter groups of a `.mdp` run input, plus the
//!   coupling and velocity-generation helpers that edit them
//! - [`matrix`] - A residue-by-frame grid of secondary-structure codes with its
//!   axis ticks and color legend
//!
//! ## Usage
//!
//! ```
//! use mdprep::core::models::params::{ParamFile, ParamGroup};
//!
//! let mut mdp = ParamFile::new();
//! mdp.add(ParamGroup::new("RUN CONTROL").with("dt", "0.002"));
//! mdp.set("nsteps", 5000);
//!
//! assert_eq!(mdp.freq(10.0).unwrap(), 5000);
//! ```

pub mod matrix;
pub mod params;
