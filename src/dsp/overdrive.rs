//! Tanh-like cubic-shaping overdrive distortion with a one-sample
//! allpass-style feedback register.
//!
//! Grounded in `SoXOverdrive_AudioEffect` from the original source and
//! spec §4.9. History is a pair of single-sample queues per channel (the
//! previous shaped input and the previous output), held in a
//! [`MultiRingBuffer`] of length 1.

use crate::effect::{ChangeKind, Channels, Effect, EffectBase};
use crate::param_map::ParameterMap;
use crate::ring_vector::MultiRingBuffer;

const PARAM_GAIN: &str = "Gain [dB]";
const PARAM_COLOUR: &str = "Colour";
const COLOUR_FACTOR: f64 = 0.005;

fn db_to_linear(db_value: f64) -> f64 {
    10f64.powf(db_value / 20.0)
}

/// A cubic-shaping overdrive effect (spec §4.9).
pub struct OverdriveEffect {
    base: EffectBase,
    gain: f64,
    colour: f64,
    queues: MultiRingBuffer,
}

impl OverdriveEffect {
    pub fn new() -> Self {
        let mut effect = Self {
            base: EffectBase::new(),
            gain: db_to_linear(0.0),
            colour: 20.0 * COLOUR_FACTOR,
            queues: MultiRingBuffer::new(0, 2, 1),
        };
        effect.initialize_all_parameters();
        effect.base.parameters_are_valid = true;
        effect
    }

    fn initialize_all_parameters(&mut self) {
        let map = &mut self.base.parameter_map;
        map.clear();
        map.set_kind_and_value_int(PARAM_GAIN, 0, 100, 1, 20);
        map.set_kind_and_value_int(PARAM_COLOUR, 0, 100, 1, 20);
    }
}

impl Default for OverdriveEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for OverdriveEffect {
    fn name(&self) -> &'static str {
        "SoX Overdrive"
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.base.prepare(sample_rate);
    }

    fn release(&mut self) {
        self.base.release();
    }

    fn process_block(&mut self, time_position: f64, buffer: &mut Channels) {
        let channel_count = buffer.len();
        let sample_count = buffer.first().map(|c| c.len()).unwrap_or(0);
        self.base.begin_block(time_position, channel_count, sample_count);

        if self.queues.ring_buffer_count() != channel_count * 2 {
            self.queues = MultiRingBuffer::new(channel_count, 2, 1);
        }

        if !self.base.parameters_are_valid {
            return;
        }

        for channel in 0..channel_count {
            for sample_index in 0..sample_count {
                let input = buffer[channel][sample_index];
                let previous_input = self.queues.at(channel, 0, 0);
                let previous_output = self.queues.at(channel, 1, 0);

                let raw = input * self.gain + self.colour;
                let clamped = raw.clamp(-1.0, 1.0);
                let shaped = clamped - (clamped * clamped * clamped) / 3.0;
                let output_sample = shaped - previous_input + 0.995 * previous_output;
                let result = input / 2.0 + output_sample * 0.75;

                self.queues.ring_buffer_mut(channel, 0).set_at(0, shaped);
                self.queues.ring_buffer_mut(channel, 1).set_at(0, output_sample);
                buffer[channel][sample_index] = result;
            }
        }
    }

    fn set_value(&mut self, name: &str, value: &str, _force_recalc: bool) -> ChangeKind {
        if !self.base.parameter_map.value_is_different(name, value) {
            return ChangeKind::NoChange;
        }
        if !self.base.parameter_map.is_allowed_value(name, value) {
            return ChangeKind::NoChange;
        }
        self.base.parameter_map.set_value(name, value);

        match name {
            n if n == PARAM_GAIN => {
                let db_gain: f64 = value.parse().unwrap_or(0.0);
                self.gain = db_to_linear(db_gain);
            }
            n if n == PARAM_COLOUR => {
                self.colour = value.parse::<f64>().unwrap_or(0.0) * COLOUR_FACTOR;
            }
            _ => return ChangeKind::NoChange,
        }
        ChangeKind::ParameterChange
    }

    fn set_default_values(&mut self) {
        self.base.parameter_map.set_value(PARAM_GAIN, "20");
        self.base.parameter_map.set_value(PARAM_COLOUR, "20");
        self.gain = db_to_linear(20.0);
        self.colour = 20.0 * COLOUR_FACTOR;
    }

    fn has_valid_parameters(&self) -> bool {
        self.base.parameters_are_valid
    }

    fn parameter_map(&self) -> &ParameterMap {
        &self.base.parameter_map
    }

    fn tail_length(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn impulse_response_at_unity_gain_matches_closed_form() {
        let mut effect = OverdriveEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_GAIN, "0", false);
        effect.set_value(PARAM_COLOUR, "0", false);

        let mut buffer = vec![vec![1.0, 0.0, 0.0]];
        effect.process_block(0.0, &mut buffer);

        assert_relative_eq!(buffer[0][0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(buffer[0][1], -0.0025, epsilon = 1e-9);
    }

    #[test]
    fn silence_in_yields_silence_out() {
        let mut effect = OverdriveEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_COLOUR, "0", false);
        let mut buffer = vec![vec![0.0; 16]];
        effect.process_block(0.0, &mut buffer);
        for &y in &buffer[0] {
            assert_relative_eq!(y, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn default_values_restore_twenty_percent_settings() {
        let mut effect = OverdriveEffect::new();
        effect.set_value(PARAM_GAIN, "50", false);
        effect.set_default_values();
        assert_eq!(effect.parameter_map().value(PARAM_GAIN), "20");
        assert_relative_eq!(effect.gain, db_to_linear(20.0), epsilon = 1e-12);
    }
}
