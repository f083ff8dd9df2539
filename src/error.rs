//! Typed errors at the crate's few recoverable boundaries.
//!
//! The DSP path itself never returns `Result`: validation failures there are
//! silently absorbed by [`crate::param_map::ParameterMap`] (spec §7), and
//! programmer errors (inverted ranges, zero step, empty enum lists) panic,
//! matching the original's `Assertion_pre` preconditions. These types exist
//! for the two boundaries that are not on the hot DSP path: looking up an
//! effect by name in the registry, and importing a serialized preset.

use thiserror::Error;

/// Failure to construct an effect by name from [`crate::registry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no effect registered under the name {0:?}")]
    UnknownEffect(String),
}

/// Failure while restoring a preset exported via
/// [`crate::effect::Effect::to_preset`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("preset entry {0:?} refers to a parameter this effect does not have")]
    UnknownParameter(String),
}
