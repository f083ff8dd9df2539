//! Freeverb-style stereo reverb: eight feedback combs summed per channel,
//! cascaded through four Schroeder allpasses, fed by a shared pre-delay.
//!
//! Grounded in `SoXReverb_AudioEffect`/`SoXReverbSupport` from the original
//! source and spec §4.10. All rails share a single summed (mono) input, as
//! canonical Freeverb does, and differ only in their comb/allpass delay
//! lengths: channels beyond the first receive the same stereo-spread offset
//! the original applies to its right rail, so the graph generalises past
//! the canonical two-channel case while still producing genuine stereo
//! crosstalk.

use crate::effect::{ChangeKind, Channels, Effect, EffectBase};
use crate::param_map::ParameterMap;
use crate::ring_buffer::RingBuffer;

const PARAM_WET_ONLY: &str = "Is Wet Only?";
const PARAM_REVERBERANCE: &str = "Reverberance [%]";
const PARAM_HF_DAMPING: &str = "HF Damping [%]";
const PARAM_ROOM_SCALE: &str = "Room Scale [%]";
const PARAM_STEREO_DEPTH: &str = "Stereo Depth [%]";
const PARAM_PREDELAY: &str = "Predelay [ms]";
const PARAM_WET_GAIN: &str = "Wet Gain [dB]";

const COMB_BASE_LENGTHS: [f64; 8] = [1116.0, 1188.0, 1277.0, 1356.0, 1422.0, 1491.0, 1557.0, 1617.0];
const ALLPASS_BASE_LENGTHS: [f64; 4] = [225.0, 556.0, 441.0, 341.0];
const STEREO_SPREAD: f64 = 23.0;
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;
const ALLPASS_GAIN: f64 = 0.5;

fn db_to_linear(db_value: f64) -> f64 {
    10f64.powf(db_value / 20.0)
}

#[derive(Debug, Clone)]
struct Comb {
    delay: RingBuffer,
    filter_store: f64,
}

impl Comb {
    fn new() -> Self {
        Self {
            delay: RingBuffer::new(0),
            filter_store: 0.0,
        }
    }

    fn process(&mut self, input: f64, feedback: f64, damp: f64) -> f64 {
        if self.delay.length() == 0 {
            return input;
        }
        let output = self.delay.at(0);
        self.filter_store = output * (1.0 - damp) + self.filter_store * damp;
        self.delay.shift_left(input + self.filter_store * feedback);
        output
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    delay: RingBuffer,
}

impl Allpass {
    fn new() -> Self {
        Self { delay: RingBuffer::new(0) }
    }

    fn process(&mut self, input: f64) -> f64 {
        if self.delay.length() == 0 {
            return input;
        }
        let buffered = self.delay.at(0);
        let output = -input + buffered;
        self.delay.shift_left(input + buffered * ALLPASS_GAIN);
        output
    }
}

#[derive(Debug, Clone)]
struct Rail {
    combs: [Comb; 8],
    allpasses: [Allpass; 4],
    predelay: RingBuffer,
}

impl Rail {
    fn new() -> Self {
        Self {
            combs: std::array::from_fn(|_| Comb::new()),
            allpasses: std::array::from_fn(|_| Allpass::new()),
            predelay: RingBuffer::new(0),
        }
    }

    fn process(&mut self, input: f64, feedback: f64, damp: f64) -> f64 {
        let delayed_input = if self.predelay.length() == 0 {
            input
        } else {
            let out = self.predelay.at(0);
            self.predelay.shift_left(input);
            out
        };

        let mut sum = 0.0;
        for comb in &mut self.combs {
            sum += comb.process(delayed_input, feedback, damp);
        }
        for allpass in &mut self.allpasses {
            sum = allpass.process(sum);
        }
        sum
    }
}

/// A Freeverb-style reverb effect (spec §4.10).
pub struct ReverbEffect {
    base: EffectBase,
    is_wet_only: bool,
    reverberance: f64,
    hf_damping: f64,
    room_scale: f64,
    stereo_depth: f64,
    predelay_ms: f64,
    wet_db_gain: f64,
    rails: Vec<Rail>,
}

impl ReverbEffect {
    pub fn new() -> Self {
        let mut effect = Self {
            base: EffectBase::new(),
            is_wet_only: false,
            reverberance: 50.0,
            hf_damping: 50.0,
            room_scale: 100.0,
            stereo_depth: 100.0,
            predelay_ms: 0.0,
            wet_db_gain: 0.0,
            rails: Vec::new(),
        };
        effect.initialize_all_parameters();
        effect.update_settings();
        effect.base.parameters_are_valid = true;
        effect
    }

    fn initialize_all_parameters(&mut self) {
        let map = &mut self.base.parameter_map;
        map.clear();
        map.set_kind_and_value_enum(
            PARAM_WET_ONLY,
            &["Yes".to_string(), "No".to_string()],
            if self.is_wet_only { "Yes" } else { "No" },
        );
        map.set_kind_and_value_real(PARAM_REVERBERANCE, 0.0, 100.0, 0.001, self.reverberance);
        map.set_kind_and_value_real(PARAM_HF_DAMPING, 0.0, 100.0, 0.001, self.hf_damping);
        map.set_kind_and_value_real(PARAM_ROOM_SCALE, 0.0, 100.0, 0.001, self.room_scale);
        map.set_kind_and_value_real(PARAM_STEREO_DEPTH, 0.0, 100.0, 0.001, self.stereo_depth);
        map.set_kind_and_value_real(PARAM_PREDELAY, 0.0, 500.0, 0.001, self.predelay_ms);
        map.set_kind_and_value_real(PARAM_WET_GAIN, -100.0, 100.0, 0.001, self.wet_db_gain);
    }

    fn feedback(&self) -> f64 {
        0.28 * self.reverberance / 100.0 + 0.7
    }

    fn damp(&self) -> f64 {
        self.hf_damping / 100.0
    }

    fn room_factor(&self) -> f64 {
        self.room_scale / 100.0 * 0.9 + 0.1
    }

    /// Mirrors `_SoXReverb::resize`/`setParameters`: recomputes every
    /// comb, allpass and pre-delay length from the current field values.
    fn update_settings(&mut self) {
        log::trace!("reverb: updateSettings (room_scale = {}, channel_count = {})", self.room_scale, self.base.channel_count);
        self.base.parameters_are_valid = false;
        let sample_rate = self.base.sample_rate.max(1.0);
        let channel_count = self.base.channel_count;
        let scale = self.room_factor() * (sample_rate / REFERENCE_SAMPLE_RATE);
        let spread_offset = STEREO_SPREAD * self.stereo_depth / 100.0;
        let predelay_length = ((self.predelay_ms / 1000.0) * sample_rate).round().max(0.0) as usize;

        self.rails = (0..channel_count)
            .map(|channel| {
                let mut rail = Rail::new();
                let is_right = channel % 2 == 1;
                let offset = if is_right { spread_offset } else { 0.0 };

                for (comb, &base_length) in rail.combs.iter_mut().zip(COMB_BASE_LENGTHS.iter()) {
                    let length = ((base_length + offset) * scale).round().max(1.0) as usize;
                    comb.delay = RingBuffer::new(length);
                    comb.filter_store = 0.0;
                }
                for (allpass, &base_length) in rail.allpasses.iter_mut().zip(ALLPASS_BASE_LENGTHS.iter()) {
                    let length = ((base_length + offset) * scale).round().max(1.0) as usize;
                    allpass.delay = RingBuffer::new(length);
                }
                rail.predelay = RingBuffer::new(predelay_length);
                rail
            })
            .collect();

        self.base.parameters_are_valid = true;
    }
}

impl Default for ReverbEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ReverbEffect {
    fn name(&self) -> &'static str {
        "SoX Reverb"
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.base.prepare(sample_rate);
        self.update_settings();
    }

    fn release(&mut self) {
        self.base.release();
    }

    fn process_block(&mut self, time_position: f64, buffer: &mut Channels) {
        let channel_count = buffer.len();
        let sample_count = buffer.first().map(|c| c.len()).unwrap_or(0);
        self.base.begin_block(time_position, channel_count, sample_count);

        if channel_count != self.rails.len() {
            self.base.channel_count = channel_count;
            self.update_settings();
        }

        if !self.base.parameters_are_valid {
            return;
        }

        let feedback = self.feedback();
        let damp = self.damp();
        let wet_gain = db_to_linear(self.wet_db_gain);

        for sample_index in 0..sample_count {
            let mono_input: f64 = (0..channel_count).map(|channel| buffer[channel][sample_index]).sum();
            for channel in 0..channel_count {
                let dry = buffer[channel][sample_index];
                let wet = self.rails[channel].process(mono_input, feedback, damp) * wet_gain;
                buffer[channel][sample_index] = if self.is_wet_only { wet } else { dry + wet };
            }
        }
    }

    fn set_value(&mut self, name: &str, value: &str, force_recalc: bool) -> ChangeKind {
        if !self.base.parameter_map.value_is_different(name, value) {
            return ChangeKind::NoChange;
        }
        if !self.base.parameter_map.is_allowed_value(name, value) {
            return ChangeKind::NoChange;
        }
        self.base.parameter_map.set_value(name, value);

        match name {
            n if n == PARAM_WET_ONLY => self.is_wet_only = value == "Yes",
            n if n == PARAM_REVERBERANCE => self.reverberance = value.parse().unwrap_or(self.reverberance),
            n if n == PARAM_HF_DAMPING => self.hf_damping = value.parse().unwrap_or(self.hf_damping),
            n if n == PARAM_ROOM_SCALE => self.room_scale = value.parse().unwrap_or(self.room_scale),
            n if n == PARAM_STEREO_DEPTH => self.stereo_depth = value.parse().unwrap_or(self.stereo_depth),
            n if n == PARAM_PREDELAY => self.predelay_ms = value.parse().unwrap_or(self.predelay_ms),
            n if n == PARAM_WET_GAIN => self.wet_db_gain = value.parse().unwrap_or(self.wet_db_gain),
            _ => return ChangeKind::NoChange,
        }

        if !force_recalc {
            self.update_settings();
        }
        ChangeKind::ParameterChange
    }

    fn set_default_values(&mut self) {
        self.is_wet_only = false;
        self.reverberance = 50.0;
        self.hf_damping = 50.0;
        self.room_scale = 100.0;
        self.stereo_depth = 100.0;
        self.predelay_ms = 0.0;
        self.wet_db_gain = 0.0;
        self.initialize_all_parameters();
        self.update_settings();
    }

    fn has_valid_parameters(&self) -> bool {
        self.base.parameters_are_valid
    }

    fn parameter_map(&self) -> &ParameterMap {
        &self.base.parameter_map
    }

    fn tail_length(&self) -> f64 {
        let sample_rate = self.base.sample_rate.max(1.0);
        let scale = self.room_factor() * (sample_rate / REFERENCE_SAMPLE_RATE);
        let largest_comb_samples = COMB_BASE_LENGTHS.iter().cloned().fold(0.0, f64::max) * scale;
        let room = self.feedback();
        (largest_comb_samples / sample_rate) / (1.0 - room).max(1e-6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_on_one_channel_reaches_the_other_after_comb_delay() {
        let mut effect = ReverbEffect::new();
        effect.prepare(44100.0);
        effect.set_value(PARAM_ROOM_SCALE, "100", false);
        effect.set_value(PARAM_STEREO_DEPTH, "100", false);

        let scale = effect.room_factor() * (44100.0 / 44100.0);
        let right_comb_length = ((1116.0 + 23.0) * scale).round() as usize;
        let mut buffer = vec![vec![0.0; right_comb_length + 10], vec![0.0; right_comb_length + 10]];
        buffer[0][0] = 1.0;
        effect.process_block(0.0, &mut buffer);

        assert!(buffer[1][..right_comb_length].iter().all(|&y| y == 0.0));
        assert!(buffer[1][right_comb_length..].iter().any(|&y| y != 0.0));
    }

    #[test]
    fn wet_only_at_minus_infinity_db_is_silent() {
        let mut effect = ReverbEffect::new();
        effect.prepare(44100.0);
        effect.set_value(PARAM_WET_ONLY, "Yes", false);
        effect.set_value(PARAM_WET_GAIN, "-100", false);

        let mut buffer = vec![vec![1.0, 0.5, -0.5, 0.2]];
        effect.process_block(0.0, &mut buffer);
        for &y in &buffer[0] {
            assert!(y.abs() < 1e-4, "expected near-silence, got {y}");
        }
    }

    #[test]
    fn dry_only_passes_input_through_at_unity_wet_gain_zero_db_plus_wet() {
        let mut effect = ReverbEffect::new();
        effect.prepare(44100.0);
        effect.set_value(PARAM_WET_ONLY, "No", false);
        let mut buffer = vec![vec![0.3, 0.0, 0.0, 0.0]];
        effect.process_block(0.0, &mut buffer);
        assert!(buffer[0][0] >= 0.3 - 1e-6);
    }
}
