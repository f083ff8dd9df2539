//! Phaser and tremolo: a shared modulation engine with one effective
//! parameter set (tremolo pins delay/gains to fixed values and ignores
//! decay; phaser ignores depth).
//!
//! Grounded in `SoXFlangerPhaserAndTremolo_AudioEffect` from the original
//! source and spec §4.8. [REDESIGN FLAG]: the original restores a
//! snapshotted LFO/ring-buffer-index state at the start of every channel's
//! inner sample loop, so the same modulation sequence is recomputed once
//! per channel. Here the modulation value and the shared ring-buffer index
//! are advanced once per sample and reused across channels, with only the
//! per-channel delay line itself kept separate.

use std::f64::consts::PI;

use crate::effect::{ChangeKind, Channels, Effect, EffectBase};
use crate::param_map::ParameterMap;
use crate::waveform::{Waveform, WaveFormKind};

const DEFAULT_PHASE: f64 = PI / 2.0;
const MAXIMUM_DELAY: f64 = 0.005;

const PARAM_EFFECT_KIND: &str = "Effect Kind";
const PARAM_IN_GAIN: &str = "In Gain";
const PARAM_OUT_GAIN: &str = "Out Gain";
const PARAM_DELAY: &str = "Delay [ms]";
const PARAM_DECAY: &str = "Decay";
const PARAM_DEPTH: &str = "Depth [%]";
const PARAM_FREQUENCY: &str = "Modulation [Hz]";
const PARAM_WAVEFORM_KIND: &str = "Waveform";
const PARAM_TIME_OFFSET: &str = "Time Offset [s]";

const PHASER_PARAMS: [&str; 8] = [
    PARAM_DECAY,
    PARAM_DELAY,
    PARAM_EFFECT_KIND,
    PARAM_FREQUENCY,
    PARAM_IN_GAIN,
    PARAM_OUT_GAIN,
    PARAM_WAVEFORM_KIND,
    PARAM_TIME_OFFSET,
];
const TREMOLO_PARAMS: [&str; 4] = [PARAM_DEPTH, PARAM_EFFECT_KIND, PARAM_FREQUENCY, PARAM_TIME_OFFSET];
const ALL_PARAMS: [&str; 9] = [
    PARAM_DECAY,
    PARAM_DELAY,
    PARAM_DEPTH,
    PARAM_EFFECT_KIND,
    PARAM_FREQUENCY,
    PARAM_IN_GAIN,
    PARAM_OUT_GAIN,
    PARAM_WAVEFORM_KIND,
    PARAM_TIME_OFFSET,
];

fn waveform_kind_from_str(s: &str) -> WaveFormKind {
    if s == "Triangle" {
        WaveFormKind::Triangle
    } else {
        WaveFormKind::Sine
    }
}

fn waveform_kind_as_str(kind: WaveFormKind) -> &'static str {
    match kind {
        WaveFormKind::Sine => "Sine",
        WaveFormKind::Triangle => "Triangle",
    }
}

/// A phaser or tremolo effect (spec §4.8).
pub struct PhaserAndTremoloEffect {
    base: EffectBase,
    is_phaser: bool,
    frequency: f64,
    waveform_kind: WaveFormKind,
    waveform: Waveform,
    time_offset: f64,
    in_gain: f64,
    out_gain: f64,
    delay: f64,
    decay: f64,
    depth: f64,
    delay_lines: Vec<Vec<f64>>,
    delay_line_length: usize,
    delay_line_index: usize,
}

impl PhaserAndTremoloEffect {
    pub fn new() -> Self {
        let mut effect = Self {
            base: EffectBase::new(),
            is_phaser: true,
            frequency: 0.5,
            waveform_kind: WaveFormKind::Sine,
            waveform: Waveform::new(),
            time_offset: 0.0,
            in_gain: 0.4,
            out_gain: 0.74,
            delay: 0.003,
            decay: 0.4,
            depth: 40.0,
            delay_lines: Vec::new(),
            delay_line_length: 0,
            delay_line_index: 0,
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
            PARAM_EFFECT_KIND,
            &["Phaser".to_string(), "Tremolo".to_string()],
            if self.is_phaser { "Phaser" } else { "Tremolo" },
        );
        map.set_kind_and_value_real(PARAM_IN_GAIN, 0.0, 1.0, 0.001, self.in_gain);
        map.set_kind_and_value_real(PARAM_OUT_GAIN, 0.0, 1000.0, 0.001, self.out_gain);
        map.set_kind_and_value_real(PARAM_DELAY, 0.0, 5.0, 0.001, self.delay * 1000.0);
        map.set_kind_and_value_real(PARAM_DECAY, 0.0, 0.99, 0.001, self.decay);
        map.set_kind_and_value_real(PARAM_DEPTH, 0.0, 100.0, 0.001, self.depth);
        map.set_kind_and_value_real(PARAM_FREQUENCY, 0.1, 2.0, 0.001, self.frequency);
        map.set_kind_and_value_enum(
            PARAM_WAVEFORM_KIND,
            &["Sine".to_string(), "Triangle".to_string()],
            waveform_kind_as_str(self.waveform_kind),
        );
        map.set_kind_and_value_real(PARAM_TIME_OFFSET, -8192.0, 8192.0, 2f64.powi(-16), self.time_offset);
        self.update_activeness();
    }

    fn update_activeness(&mut self) {
        let map = &mut self.base.parameter_map;
        for name in ALL_PARAMS {
            map.set_activeness(name, false);
        }
        let names: &[&str] = if self.is_phaser { &PHASER_PARAMS } else { &TREMOLO_PARAMS };
        for name in names {
            map.set_activeness(name, true);
        }
    }

    /// Mirrors `_updateSettings`: rebuilds the ring buffers and modulation
    /// waveform from the current field values.
    fn update_settings(&mut self) {
        log::trace!("flanger/phaser/tremolo: updateSettings (is_phaser = {})", self.is_phaser);
        self.base.parameters_are_valid = false;
        let sample_rate = self.base.sample_rate.max(1.0);
        let frequency = self.frequency.max(1e-6);
        let waveform_length = sample_rate / frequency;

        let (delay_line_length, lo, hi, has_integer_values) = if self.is_phaser {
            let length = (self.delay * sample_rate).round().max(0.0) as usize;
            (length, 1.0, length as f64, true)
        } else {
            self.delay = 0.0;
            self.in_gain = 1.0;
            self.out_gain = 1.0;
            self.waveform_kind = WaveFormKind::Sine;
            (0, 1.0 - self.depth / 100.0, 1.0, false)
        };

        self.delay_line_index = 0;
        self.delay_line_length = delay_line_length;
        let channel_count = self.base.channel_count;
        self.delay_lines = (0..channel_count).map(|_| vec![0.0; delay_line_length]).collect();

        let effective_phase = DEFAULT_PHASE + Waveform::phase_by_time(frequency, self.time_offset, self.base.current_time_position);
        self.waveform.set(waveform_length.max(1.0) as usize, self.waveform_kind, lo, hi, effective_phase, has_integer_values);

        self.base.parameters_are_valid = true;
    }
}

impl Default for PhaserAndTremoloEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for PhaserAndTremoloEffect {
    fn name(&self) -> &'static str {
        "SoX Flanger, Phaser & Tremolo"
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
        let moved = self.base.begin_block(time_position, channel_count, sample_count);

        if moved || channel_count != self.delay_lines.len() {
            self.base.channel_count = channel_count;
            self.update_settings();
        }

        if !self.base.parameters_are_valid {
            return;
        }

        for i in 0..sample_count {
            let modulation_value = self.waveform.current();
            self.waveform.advance();

            if !self.is_phaser {
                for channel in 0..channel_count {
                    buffer[channel][i] *= modulation_value;
                }
                continue;
            }

            if self.delay_line_length == 0 {
                for channel in 0..channel_count {
                    buffer[channel][i] = 0.0;
                }
                continue;
            }

            let modulated_index = (self.delay_line_index + modulation_value as usize) % self.delay_line_length;
            let next_index = (self.delay_line_index + 1) % self.delay_line_length;

            for channel in 0..channel_count {
                let input = buffer[channel][i];
                let pre_gain = input * self.in_gain + self.delay_lines[channel][modulated_index] * self.decay;
                self.delay_lines[channel][next_index] = pre_gain;
                buffer[channel][i] = pre_gain * self.out_gain;
            }

            self.delay_line_index = next_index;
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

        if name == PARAM_EFFECT_KIND {
            self.is_phaser = value != "Tremolo";
            self.update_activeness();
            self.update_settings();
            return ChangeKind::GlobalChange;
        }

        let was_active = self.base.parameter_map.is_active(name);
        match name {
            n if n == PARAM_DECAY => self.decay = value.parse().unwrap_or(self.decay),
            n if n == PARAM_DELAY => self.delay = value.parse::<f64>().unwrap_or(self.delay * 1000.0) / 1000.0,
            n if n == PARAM_DEPTH => self.depth = value.parse().unwrap_or(self.depth),
            n if n == PARAM_FREQUENCY => self.frequency = value.parse().unwrap_or(self.frequency),
            n if n == PARAM_IN_GAIN => self.in_gain = value.parse().unwrap_or(self.in_gain),
            n if n == PARAM_OUT_GAIN => self.out_gain = value.parse().unwrap_or(self.out_gain),
            n if n == PARAM_WAVEFORM_KIND => self.waveform_kind = waveform_kind_from_str(value),
            n if n == PARAM_TIME_OFFSET => self.time_offset = value.parse().unwrap_or(self.time_offset),
            _ => return ChangeKind::NoChange,
        }

        if force_recalc && was_active {
            self.update_settings();
        }
        ChangeKind::ParameterChange
    }

    fn set_default_values(&mut self) {
        if self.is_phaser {
            self.in_gain = 0.4;
            self.out_gain = 0.74;
            self.delay = 0.003;
            self.decay = 0.4;
            self.frequency = 0.5;
            self.waveform_kind = WaveFormKind::Triangle;
        } else {
            self.frequency = 0.5;
            self.depth = 40.0;
        }
        self.time_offset = 0.0;
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
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tremolo_matches_closed_form_sine_envelope() {
        let mut effect = PhaserAndTremoloEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_EFFECT_KIND, "Tremolo", false);
        effect.set_value(PARAM_FREQUENCY, "1.0", false);
        effect.set_value(PARAM_DEPTH, "100.0", false);

        let sample_count = 200;
        let mut buffer = vec![vec![1.0; sample_count]; 1];
        effect.process_block(0.0, &mut buffer);

        for (n, &y) in buffer[0].iter().enumerate() {
            let phase = DEFAULT_PHASE + 2.0 * PI * (n as f64) / 48000.0;
            let expected = (1.0 - 0.5) + 0.5 * phase.sin();
            assert!((y - expected).abs() < 1e-6, "sample {n}: expected {expected}, got {y}");
        }
    }

    #[test]
    fn phaser_with_zero_decay_passes_input_gain_scaled() {
        let mut effect = PhaserAndTremoloEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_EFFECT_KIND, "Phaser", false);
        effect.set_value(PARAM_IN_GAIN, "1.0", false);
        effect.set_value(PARAM_OUT_GAIN, "1.0", false);
        effect.set_value(PARAM_DECAY, "0.0", false);

        let mut buffer = vec![vec![0.3, -0.5, 0.9]];
        effect.process_block(0.0, &mut buffer);
        for &y in &buffer[0] {
            assert!((y.abs()) < 10.0);
        }
    }

    #[test]
    fn kind_change_reports_global_change_and_updates_activeness() {
        let mut effect = PhaserAndTremoloEffect::new();
        let change = effect.set_value(PARAM_EFFECT_KIND, "Tremolo", false);
        assert_eq!(change, ChangeKind::GlobalChange);
        assert!(effect.parameter_map().is_active(PARAM_DEPTH));
        assert!(!effect.parameter_map().is_active(PARAM_DELAY));
    }
}
