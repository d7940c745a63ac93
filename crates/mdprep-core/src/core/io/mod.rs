//! Provides input/output functionality for GROMACS text formats.
//!
//! Each format is a zero-sized codec type implementing the traits in [`traits`],
//! so callers can read from any buffered reader or straight from a path.

pub mod mdp;
pub mod traits;
pub mod xpm;
