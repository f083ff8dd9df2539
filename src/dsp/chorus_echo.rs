//! Chorus, tapped delay and delay sequence: a bank of up to 10 delay
//! stages, each either a fixed tap or an LFO-modulated chorus voice.
//!
//! Grounded in `SoXChorusAndEcho_AudioEffect` from the original source and
//! spec §4.7. `tappedDelay` feeds every stage from the input directly;
//! `delaySequence` chains stages (each stage's delay line receives the
//! previous stage's output plus the input); `chorus` additionally modulates
//! the read position of every stage with a per-stage LFO.

use std::f64::consts::PI;

use crate::effect::{ChangeKind, Channels, Effect, EffectBase};
use crate::param_map::{ParameterMap, PAGE_COUNTER_PAGE, SELECTOR_PAGE};
use crate::ring_buffer::RingBuffer;
use crate::waveform::{Waveform, WaveFormKind};

const MAX_STAGE_COUNT: usize = 10;
const DEFAULT_CHORUS_PHASE: f64 = PI / 2.0;

const PARAM_EFFECT_KIND: &str = "Effect Kind";
const PARAM_IN_GAIN: &str = "In Gain";
const PARAM_OUT_GAIN: &str = "Out Gain";
const PARAM_TIME_OFFSET: &str = "Time Offset [s]";
const PARAM_STAGE_COUNT: &str = "Stage Count";
const PARAM_STAGE_INDEX: &str = "Stage Index";
const PARAM_DELAY: &str = "Delay [ms]";
const PARAM_DECAY: &str = "Decay";
const PARAM_FREQUENCY: &str = "Frequency [Hz]";
const PARAM_DEPTH: &str = "Depth [ms]";
const PARAM_MODULATION_KIND: &str = "Waveform";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    Chorus,
    TappedDelay,
    DelaySequence,
}

impl DelayKind {
    fn as_str(self) -> &'static str {
        match self {
            DelayKind::Chorus => "Chorus",
            DelayKind::TappedDelay => "Tapped Delay",
            DelayKind::DelaySequence => "Delay Sequence",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "Chorus" => DelayKind::Chorus,
            "Delay Sequence" => DelayKind::DelaySequence,
            _ => DelayKind::TappedDelay,
        }
    }
}

fn modulation_kind_from_str(s: &str) -> WaveFormKind {
    if s == "Triangle" {
        WaveFormKind::Triangle
    } else {
        WaveFormKind::Sine
    }
}

fn modulation_kind_as_str(kind: WaveFormKind) -> &'static str {
    match kind {
        WaveFormKind::Sine => "Sine",
        WaveFormKind::Triangle => "Triangle",
    }
}

#[derive(Debug, Clone)]
struct Stage {
    delay: f64,
    decay: f64,
    frequency: f64,
    depth: f64,
    modulation_kind: WaveFormKind,
    modulation_wave: Waveform,
}

impl Stage {
    fn new() -> Self {
        Self {
            delay: 0.0,
            decay: 0.0,
            frequency: 1.0,
            depth: 0.0,
            modulation_kind: WaveFormKind::Sine,
            modulation_wave: Waveform::new(),
        }
    }
}

fn paged(name: &str, stage_index: usize) -> String {
    ParameterMap::paged_parameter_name(name, (stage_index + 1) as i64)
}

/// A chorus / tapped-delay / delay-sequence effect (spec §4.7).
pub struct ChorusAndEchoEffect {
    base: EffectBase,
    kind: DelayKind,
    in_gain: f64,
    out_gain: f64,
    time_offset: f64,
    stage_count: usize,
    stages: Vec<Stage>,
    delay_lines: Vec<RingBuffer>,
    scratch: Vec<f64>,
}

impl ChorusAndEchoEffect {
    pub fn new() -> Self {
        let mut effect = Self {
            base: EffectBase::new(),
            kind: DelayKind::TappedDelay,
            in_gain: 0.0,
            out_gain: 0.0,
            time_offset: 0.0,
            stage_count: 1,
            stages: (0..MAX_STAGE_COUNT).map(|_| Stage::new()).collect(),
            delay_lines: Vec::new(),
            scratch: Vec::new(),
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
            &["Chorus".to_string(), "Tapped Delay".to_string(), "Delay Sequence".to_string()],
            self.kind.as_str(),
        );
        map.set_kind_and_value_real(PARAM_IN_GAIN, 0.0, 1.0, 0.001, self.in_gain);
        map.set_kind_and_value_real(PARAM_OUT_GAIN, 0.0, 5.0, 0.001, self.out_gain);
        map.set_kind_and_value_real(PARAM_TIME_OFFSET, -8192.0, 8192.0, 2f64.powi(-16), self.time_offset);

        map.set_kind_and_value_int(
            &ParameterMap::paged_parameter_name(PARAM_STAGE_COUNT, PAGE_COUNTER_PAGE),
            1,
            MAX_STAGE_COUNT as i64,
            1,
            self.stage_count as i64,
        );
        map.set_kind_and_value_int(
            &ParameterMap::paged_parameter_name(PARAM_STAGE_INDEX, SELECTOR_PAGE),
            1,
            MAX_STAGE_COUNT as i64,
            1,
            1,
        );

        for stage_index in 0..MAX_STAGE_COUNT {
            map.set_kind_and_value_enum(
                &paged(PARAM_MODULATION_KIND, stage_index),
                &["Sine".to_string(), "Triangle".to_string()],
                modulation_kind_as_str(self.stages[stage_index].modulation_kind),
            );
        }
        self.update_stage_parameter_ranges();
    }

    /// Mirrors `_updateParameterMap`: delay's allowed range and every
    /// stage's modulation parameters' activeness depend on whether the
    /// effect kind is `Chorus`.
    fn update_stage_parameter_ranges(&mut self) {
        let is_chorus = self.kind == DelayKind::Chorus;
        let (min_delay, max_delay) = if is_chorus { (20.0, 100.0) } else { (0.0, 20000.0) };
        let map = &mut self.base.parameter_map;

        map.set_activeness(PARAM_TIME_OFFSET, is_chorus);

        for stage_index in 0..MAX_STAGE_COUNT {
            let delay_name = paged(PARAM_DELAY, stage_index);
            let current = map.value(&delay_name).parse::<f64>().unwrap_or(min_delay);
            map.set_kind_and_value_real(&delay_name, min_delay, max_delay, 0.1, current.clamp(min_delay, max_delay));
            map.set_kind_and_value_real(&paged(PARAM_DECAY, stage_index), 0.0, 1.0, 0.00001, self.stages[stage_index].decay);
            map.set_kind_and_value_real(&paged(PARAM_FREQUENCY, stage_index), 0.1, 5.0, 0.01, self.stages[stage_index].frequency);
            map.set_kind_and_value_real(&paged(PARAM_DEPTH, stage_index), 0.0, 10.0, 0.1, self.stages[stage_index].depth);

            map.set_activeness(&paged(PARAM_FREQUENCY, stage_index), is_chorus);
            map.set_activeness(&paged(PARAM_DEPTH, stage_index), is_chorus);
            map.set_activeness(&paged(PARAM_MODULATION_KIND, stage_index), is_chorus);
        }
    }

    fn delay_line_index(&self, channel: usize, stage_index: usize) -> usize {
        channel * MAX_STAGE_COUNT + stage_index
    }

    /// Mirrors `updateSettings`: resizes delay lines and rebuilds each
    /// active stage's modulation waveform.
    fn update_settings(&mut self) {
        log::trace!("chorus/echo: updateSettings (kind = {:?}, stage_count = {})", self.kind, self.stage_count);
        self.base.parameters_are_valid = false;
        let channel_count = self.base.channel_count;
        let is_chorus = self.kind == DelayKind::Chorus;
        let sample_rate = self.base.sample_rate.max(1.0);

        self.delay_lines = (0..channel_count * MAX_STAGE_COUNT).map(|_| RingBuffer::new(0)).collect();

        for stage_index in 0..self.stage_count {
            let stage = &mut self.stages[stage_index];
            let delay_line_length_in_seconds = stage.delay + if is_chorus { stage.depth } else { 0.0 };
            let delay_line_length = (delay_line_length_in_seconds * sample_rate).ceil().max(0.0) as usize;

            if is_chorus && stage.frequency > 0.0001 {
                let effective_phase =
                    DEFAULT_CHORUS_PHASE + Waveform::phase_by_time(stage.frequency, self.time_offset, self.base.current_time_position);
                let waveform_length = if stage.frequency < 0.001 { 1.0 } else { sample_rate / stage.frequency };
                let maximum_modulation_value = (stage.depth * sample_rate).floor();
                stage
                    .modulation_wave
                    .set(waveform_length.max(1.0) as usize, stage.modulation_kind, 0.0, maximum_modulation_value, effective_phase, true);
            }

            for channel in 0..channel_count {
                let idx = self.delay_line_index(channel, stage_index);
                self.delay_lines[idx].set_length(delay_line_length);
            }
        }

        self.base.parameters_are_valid = true;
    }

    fn apply_sample(&mut self, samples: &mut [f64]) {
        let is_chorus = self.kind == DelayKind::Chorus;
        let is_sequential = self.kind == DelayKind::DelaySequence;
        let channel_count = samples.len();

        for channel in 0..channel_count {
            let input = samples[channel];
            let mut output = input * self.in_gain;
            let mut previous_stage_sample = 0.0;

            for stage_index in 0..self.stage_count {
                let decay = self.stages[stage_index].decay;
                let index_offset = if !is_chorus {
                    0
                } else {
                    let offset = self.stages[stage_index].modulation_wave.current() as usize;
                    if channel == channel_count - 1 {
                        self.stages[stage_index].modulation_wave.advance();
                    }
                    offset
                };

                let line_index = self.delay_line_index(channel, stage_index);
                let delay_line = &mut self.delay_lines[line_index];
                let stage_sample = if delay_line.length() == 0 {
                    input
                } else {
                    let sample = delay_line.at(index_offset);
                    let delayed_sample = if !is_sequential { input } else { previous_stage_sample + input };
                    delay_line.shift_left(delayed_sample);
                    sample
                };

                output += stage_sample * decay;
                previous_stage_sample = stage_sample;
            }

            samples[channel] = output * self.out_gain;
        }
    }
}

impl Default for ChorusAndEchoEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ChorusAndEchoEffect {
    fn name(&self) -> &'static str {
        "SoX ChorusAndEcho"
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.base.prepare(sample_rate);
        self.update_settings();
        for line in &mut self.delay_lines {
            line.set_to_zero();
        }
    }

    fn release(&mut self) {
        self.base.release();
    }

    fn process_block(&mut self, time_position: f64, buffer: &mut Channels) {
        let channel_count = buffer.len();
        let sample_count = buffer.first().map(|c| c.len()).unwrap_or(0);
        let moved = self.base.begin_block(time_position, channel_count, sample_count);

        if moved || channel_count != self.base.channel_count || self.delay_lines.len() != channel_count * MAX_STAGE_COUNT {
            self.base.channel_count = channel_count;
            self.update_settings();
        }

        if !self.base.parameters_are_valid {
            return;
        }

        if self.scratch.len() != channel_count {
            self.scratch = vec![0.0; channel_count];
        }
        for i in 0..sample_count {
            for channel in 0..channel_count {
                self.scratch[channel] = buffer[channel][i];
            }
            let mut samples = std::mem::take(&mut self.scratch);
            self.apply_sample(&mut samples);
            self.scratch = samples;
            for channel in 0..channel_count {
                buffer[channel][i] = self.scratch[channel];
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

        if name == PARAM_EFFECT_KIND {
            let previous = self.kind;
            let new_kind = DelayKind::from_str(value);
            if new_kind != previous {
                self.kind = new_kind;
                if previous == DelayKind::Chorus || new_kind == DelayKind::Chorus {
                    self.update_stage_parameter_ranges();
                    self.update_settings();
                    return ChangeKind::GlobalChange;
                }
            }
            return ChangeKind::ParameterChange;
        }

        if name == PARAM_IN_GAIN {
            self.in_gain = value.parse().unwrap_or(self.in_gain);
            return ChangeKind::ParameterChange;
        }
        if name == PARAM_OUT_GAIN {
            self.out_gain = value.parse().unwrap_or(self.out_gain);
            return ChangeKind::ParameterChange;
        }
        if name == PARAM_TIME_OFFSET {
            self.time_offset = value.parse().unwrap_or(self.time_offset);
            return ChangeKind::ParameterChange;
        }

        let (base_name, page_index, nominal) = ParameterMap::split_parameter_name(name);
        if nominal == PAGE_COUNTER_PAGE && base_name == PARAM_STAGE_COUNT {
            let count: i64 = value.parse().unwrap_or(self.stage_count as i64);
            self.stage_count = count.clamp(1, MAX_STAGE_COUNT as i64) as usize;
            self.update_settings();
            return ChangeKind::PageCountChange;
        }
        if nominal == SELECTOR_PAGE && base_name == PARAM_STAGE_INDEX {
            return ChangeKind::PageChange;
        }

        let stage_index = (page_index - 1).max(0) as usize;
        if stage_index < self.stage_count {
            match base_name.as_str() {
                n if n == PARAM_DELAY => {
                    self.stages[stage_index].delay = value.parse().unwrap_or(0.0) / 1000.0;
                }
                n if n == PARAM_DECAY => {
                    self.stages[stage_index].decay = value.parse().unwrap_or(0.0);
                }
                n if n == PARAM_FREQUENCY => {
                    self.stages[stage_index].frequency = value.parse().unwrap_or(1.0);
                }
                n if n == PARAM_DEPTH => {
                    self.stages[stage_index].depth = value.parse().unwrap_or(0.0) / 1000.0;
                }
                n if n == PARAM_MODULATION_KIND => {
                    self.stages[stage_index].modulation_kind = modulation_kind_from_str(value);
                }
                _ => return ChangeKind::NoChange,
            }
        }

        if force_recalc {
            self.update_settings();
        }
        ChangeKind::ParameterChange
    }

    fn set_default_values(&mut self) {
        self.kind = DelayKind::TappedDelay;
        self.in_gain = 0.0;
        self.out_gain = 0.0;
        self.time_offset = 0.0;
        self.stage_count = 1;
        self.stages = (0..MAX_STAGE_COUNT).map(|_| Stage::new()).collect();
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
        let is_chorus = self.kind == DelayKind::Chorus;
        let is_sequential = self.kind == DelayKind::DelaySequence;
        let mut result = 0.0;
        for stage in self.stages.iter().take(self.stage_count) {
            let length = stage.delay + if is_chorus { stage.depth } else { 0.0 };
            if is_sequential {
                result += length;
            } else {
                result = result.max(length);
            }
        }
        result
    }
}
