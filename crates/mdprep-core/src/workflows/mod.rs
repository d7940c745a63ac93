//! # Workflows Module
//!
//! High-level entry points that combine presets and parameter edits into a
//! finished run configuration.
//!
//! - **Recipes** ([`recipe`]) - A validated builder that starts from a [`Preset`]
//!   and layers thermostat coupling, seeds, velocity generation and explicit
//!   overrides on top, in that order.
//!
//! [`Preset`]: crate::core::presets::Preset

pub mod recipe;
