//! The effect lifecycle contract shared by every DSP core in this crate.
//!
//! Grounded in `SoXAudioEffect` (header and body) from the original source
//! and spec §4.5/§6. Each concrete effect embeds an [`EffectBase`] for the
//! bookkeeping common to all effects (sample rate, channel count, transport
//! tracking, the parameter map) and implements the [`Effect`] trait for the
//! behaviour that differs per effect.

use crate::error::PresetError;
use crate::param_map::ParameterMap;

/// Classification of the result of a [`Effect::set_value`] call.
///
/// `GlobalChange` means the parameter set itself may have changed (names or
/// kinds) and the host must re-read the whole [`ParameterMap`]; the other
/// variants are increasingly narrow hints a host can use to avoid a full
/// re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    NoChange,
    ParameterChange,
    PageChange,
    PageCountChange,
    GlobalChange,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::NoChange => "no change",
            ChangeKind::ParameterChange => "parameter change",
            ChangeKind::PageChange => "page change",
            ChangeKind::PageCountChange => "page count change",
            ChangeKind::GlobalChange => "global change",
        };
        f.write_str(s)
    }
}

/// One block of multichannel audio: one `Vec<f64>` per channel, all of
/// equal length. Effects mutate channels in place and must not change
/// their length.
pub type Channels = [Vec<f64>];

/// Common bookkeeping embedded by every concrete effect.
///
/// This is the transformed replacement for the original's opaque
/// `_effectDescriptor` pointer plus base-class fields: rather than an
/// untyped pointer cast at every use site, each effect owns a concrete,
/// named descriptor struct and embeds `EffectBase` alongside it.
#[derive(Debug, Clone)]
pub struct EffectBase {
    pub sample_rate: f64,
    pub channel_count: usize,
    pub current_time_position: f64,
    pub expected_next_time_position: f64,
    pub time_position_has_moved: bool,
    pub parameters_are_valid: bool,
    pub parameter_map: ParameterMap,
}

impl EffectBase {
    /// A fresh base: sample rate is a placeholder (matching the original's
    /// non-zero-but-nonsensical `100.0`, never trusted before `prepare` is
    /// called), transport is considered "just jumped" so the first block
    /// always registers a movement.
    pub fn new() -> Self {
        Self {
            sample_rate: 100.0,
            channel_count: 0,
            current_time_position: f64::INFINITY,
            expected_next_time_position: f64::INFINITY,
            time_position_has_moved: true,
            parameters_are_valid: false,
            parameter_map: ParameterMap::new(),
        }
    }

    /// Invalidates the predicted next time position and records the new
    /// sample rate; unconditional, so the next `process_block` always
    /// treats the transport as having just moved.
    pub fn prepare(&mut self, sample_rate: f64) {
        log::trace!("effect base: prepare(sample_rate = {sample_rate})");
        self.expected_next_time_position = f64::INFINITY;
        self.sample_rate = sample_rate;
    }

    pub fn release(&mut self) {
        self.expected_next_time_position = f64::INFINITY;
    }

    /// Updates transport-tracking state at the start of a block. Returns
    /// whether the playhead is considered to have moved since the last
    /// block (a discontinuity beyond simple block-to-block progression).
    pub fn begin_block(&mut self, time_position: f64, channel_count: usize, sample_count: usize) -> bool {
        self.current_time_position = time_position;
        self.channel_count = channel_count;
        let difference = (time_position - self.expected_next_time_position).abs();
        self.time_position_has_moved = difference > 1e-3;
        if self.time_position_has_moved {
            log::trace!("effect base: playhead jump detected (expected {}, got {time_position})", self.expected_next_time_position);
        }
        self.expected_next_time_position = time_position + (sample_count as f64) / self.sample_rate;
        self.time_position_has_moved
    }
}

impl Default for EffectBase {
    fn default() -> Self {
        Self::new()
    }
}

/// The programmatic surface of every effect (spec §6).
pub trait Effect {
    /// A human-readable effect name (e.g. `"SoX Reverb"`).
    fn name(&self) -> &'static str;

    /// Called once before the first block, and again whenever the sample
    /// rate changes.
    fn prepare(&mut self, sample_rate: f64);

    /// Called when playback stops; releases nothing allocation-wise but
    /// invalidates timing so the next block re-locks.
    fn release(&mut self);

    /// Processes one block of audio in place.
    fn process_block(&mut self, time_position: f64, buffer: &mut Channels);

    /// Validates and applies a parameter change, returning how much of the
    /// parameter map a host needs to re-read as a result.
    fn set_value(&mut self, name: &str, value: &str, force_recalc: bool) -> ChangeKind;

    /// Re-applies this effect's default parameter values.
    fn set_default_values(&mut self);

    /// Whether the effect currently has a complete, valid parameter set
    /// (false only transiently, e.g. mid-`setValue` during a kind change).
    fn has_valid_parameters(&self) -> bool;

    /// Read-only view of the parameter map, for host-side UI construction.
    fn parameter_map(&self) -> &ParameterMap;

    /// The length, in seconds, after input ceases during which the effect
    /// may still produce non-trivial output.
    fn tail_length(&self) -> f64;

    /// The full parameter-map snapshot as (name, value) pairs — the
    /// preset export format named in spec §6 / SPEC_FULL §4.12.
    fn to_preset(&self) -> Vec<(String, String)> {
        self.parameter_map().parameter_name_to_value_map()
    }

    /// Restores a preset by replaying `set_value` for each pair, in order.
    /// Unknown parameter names are silently ignored, consistent with the
    /// "stale preset recall" tolerance spec'd for `set_value` itself.
    fn apply_preset(&mut self, entries: &[(String, String)]) {
        for (name, value) in entries {
            self.set_value(name, value, false);
        }
    }

    /// As [`Self::apply_preset`], but rejects the whole preset at the first
    /// entry naming a parameter this effect doesn't have.
    fn apply_preset_strict(&mut self, entries: &[(String, String)]) -> Result<(), PresetError> {
        for (name, value) in entries {
            if !self.parameter_map().contains(name) {
                return Err(PresetError::UnknownParameter(name.clone()));
            }
            self.set_value(name, value, false);
        }
        Ok(())
    }
}
