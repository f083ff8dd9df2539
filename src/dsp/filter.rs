//! The parametric/IIR filter bank: allpass, band, bandpass, bandreject,
//! bass, biquad, equalizer, highpass, lowpass, treble.
//!
//! Grounded in `SoXFilter_AudioEffect.cpp` from the original source and
//! spec §4.6. Coefficients follow the RBJ Audio EQ Cookbook formulas the
//! original itself implements; every filter kind shares a single order-3
//! direct-form-I filter (`b2 = a2 = 0` for the single-pole cases), matching
//! the original's descriptor, which always carries six coefficients
//! regardless of kind.

use std::f64::consts::PI;

use crate::effect::{ChangeKind, Channels, Effect, EffectBase};
use crate::iir_filter::IirFilter;
use crate::ring_vector::MultiRingBuffer;

const PARAM_KIND: &str = "Filter Kind";
const PARAM_FREQUENCY: &str = "Frequency [Hz]";
const PARAM_BANDWIDTH: &str = "Bandwidth";
const PARAM_BANDWIDTH_UNIT: &str = "Bandwidth Unit";
const PARAM_GAIN: &str = "Gain [dB]";
const PARAM_EQ_GAIN: &str = "EQ Gain [dB]";
const PARAM_POLE_COUNT: &str = "Pole Count";
const PARAM_UNPITCHED: &str = "Unpitched Audio?";
const PARAM_CONST_SKIRT: &str = "Constant Skirt Gain?";
const PARAM_B: [&str; 3] = ["b0", "b1", "b2"];
const PARAM_A: [&str; 3] = ["a0", "a1", "a2"];

/// The filter topology currently selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Allpass,
    Band,
    BandPass,
    BandReject,
    Bass,
    Biquad,
    Equalizer,
    HighPass,
    LowPass,
    Treble,
}

impl FilterKind {
    fn as_str(self) -> &'static str {
        match self {
            FilterKind::Allpass => "Allpass",
            FilterKind::Band => "Band",
            FilterKind::BandPass => "BandPass",
            FilterKind::BandReject => "BandReject",
            FilterKind::Bass => "Bass",
            FilterKind::Biquad => "Biquad",
            FilterKind::Equalizer => "Equalizer",
            FilterKind::HighPass => "HighPass",
            FilterKind::LowPass => "LowPass",
            FilterKind::Treble => "Treble",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|k| k.as_str() == s)
    }
}

const ALL_KINDS: [FilterKind; 10] = [
    FilterKind::Allpass,
    FilterKind::Band,
    FilterKind::BandPass,
    FilterKind::BandReject,
    FilterKind::Bass,
    FilterKind::Biquad,
    FilterKind::Equalizer,
    FilterKind::HighPass,
    FilterKind::LowPass,
    FilterKind::Treble,
];

/// The unit in which the `Bandwidth` parameter is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthUnit {
    Frequency,
    Octaves,
    Quality,
    Butterworth,
    Slope,
}

impl BandwidthUnit {
    fn as_str(self) -> &'static str {
        match self {
            BandwidthUnit::Frequency => "Frequency",
            BandwidthUnit::Octaves => "Octaves",
            BandwidthUnit::Quality => "Quality",
            BandwidthUnit::Butterworth => "Butterworth",
            BandwidthUnit::Slope => "Slope",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        [
            BandwidthUnit::Frequency,
            BandwidthUnit::Octaves,
            BandwidthUnit::Quality,
            BandwidthUnit::Butterworth,
            BandwidthUnit::Slope,
        ]
        .into_iter()
        .find(|u| u.as_str() == s)
    }
}

/// Computes `alpha` for the RBJ cookbook forms, given the bandwidth unit.
///
/// `Frequency` expresses the bandwidth directly in Hz (`alpha =
/// sin(w0)/(2·f/bandwidth)`, hence the `frequency` parameter); the other
/// four units follow the cookbook's own Q/octaves/butterworth/slope
/// conversions and don't need it.
fn alpha_for_bandwidth(w0: f64, frequency: f64, bandwidth: f64, unit: BandwidthUnit, db_gain: f64) -> f64 {
    let sin_w0 = w0.sin();
    match unit {
        BandwidthUnit::Quality => sin_w0 / (2.0 * bandwidth),
        BandwidthUnit::Octaves => sin_w0 * ((2f64.ln() / 2.0) * bandwidth * w0 / sin_w0).sinh(),
        BandwidthUnit::Butterworth => sin_w0 / (2.0 * 0.5f64.sqrt()),
        BandwidthUnit::Frequency => sin_w0 / (2.0 * (frequency / bandwidth)),
        BandwidthUnit::Slope => {
            let a = 10f64.powf(db_gain / 40.0);
            sin_w0 / 2.0 * (((a + 1.0 / a) * (1.0 / bandwidth - 1.0)) + 2.0).sqrt()
        }
    }
}

/// All mutable DSP state for one filter instance.
#[derive(Debug, Clone)]
struct FilterDescriptor {
    kind: FilterKind,
    frequency: f64,
    bandwidth: f64,
    bandwidth_unit: BandwidthUnit,
    gain_db: f64,
    eq_gain_db: f64,
    pole_count: i64,
    unpitched_audio: bool,
    constant_skirt_gain: bool,
    biquad_b: [f64; 3],
    biquad_a: [f64; 3],
    filter: IirFilter,
    history: MultiRingBuffer,
}

impl FilterDescriptor {
    fn new() -> Self {
        Self {
            kind: FilterKind::Allpass,
            frequency: 1000.0,
            bandwidth: 1.0,
            bandwidth_unit: BandwidthUnit::Quality,
            gain_db: 0.0,
            eq_gain_db: 0.0,
            pole_count: 1,
            unpitched_audio: false,
            constant_skirt_gain: false,
            biquad_b: [0.0, 0.0, 0.0],
            biquad_a: [0.0, 0.0, 0.0],
            filter: IirFilter::new(3),
            history: MultiRingBuffer::new(0, 2, 3),
        }
    }

    /// Recomputes `self.filter`'s coefficients from the other fields,
    /// following the RBJ cookbook forms named per kind in spec §4.6.
    fn update_coefficients(&mut self, sample_rate: f64) {
        log::trace!("filter: recomputing coefficients (kind = {:?})", self.kind);
        if self.kind == FilterKind::Biquad {
            self.filter.set3(
                self.biquad_b[0],
                self.biquad_b[1],
                self.biquad_b[2],
                self.biquad_a[0],
                self.biquad_a[1],
                self.biquad_a[2],
            );
            return;
        }

        let frequency = self.frequency.max(1e-6);
        let sample_rate = sample_rate.max(1.0);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = alpha_for_bandwidth(w0, frequency, self.bandwidth, self.bandwidth_unit, self.gain_db);

        let (b0, b1, b2, a0, a1, a2) = match self.kind {
            FilterKind::Allpass => (
                1.0 - alpha,
                -2.0 * cos_w0,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::Band => {
                let bandwidth_as_frequency = match self.bandwidth_unit {
                    BandwidthUnit::Quality => frequency / self.bandwidth,
                    BandwidthUnit::Octaves => {
                        frequency * 2f64.powf(self.bandwidth - 1.0) * 2f64.powf(-self.bandwidth / 2.0)
                    }
                    _ => self.bandwidth,
                };
                let a2 = (-2.0 * PI * bandwidth_as_frequency / sample_rate).exp();
                let a1 = -4.0 * a2 / (1.0 + a2) * cos_w0;
                let a0 = 1.0;
                let mut b0 = (1.0 - a1 * a1 / (4.0 * a2)).max(0.0).sqrt() * (1.0 - a2);
                if self.unpitched_audio && b0.abs() > 1e-12 {
                    let factor = (((1.0 + a2).powi(2) - a1 * a1) * (1.0 - a2) / (1.0 + a2))
                        .max(0.0)
                        .sqrt()
                        / b0;
                    b0 *= factor;
                }
                (b0, 0.0, 0.0, a0, a1, a2)
            }
            FilterKind::BandReject => (1.0, -2.0 * cos_w0, 1.0, alpha + 1.0, -2.0 * cos_w0, 1.0 - alpha),
            FilterKind::BandPass => {
                let b0 = if self.constant_skirt_gain { w0.sin() / 2.0 } else { alpha };
                (b0, 0.0, -b0, alpha + 1.0, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterKind::Bass | FilterKind::Treble => {
                let sign = if self.kind == FilterKind::Bass { 1.0 } else { -1.0 };
                let a = 10f64.powf(self.gain_db / 40.0);
                let sqrt_alpha_a = 2.0 * a.sqrt() * alpha;
                let b0 = a * ((a + 1.0) - sign * (a - 1.0) * cos_w0 + sqrt_alpha_a);
                let b1 = sign * 2.0 * a * ((a - 1.0) - sign * (a + 1.0) * cos_w0);
                let b2 = a * ((a + 1.0) - sign * (a - 1.0) * cos_w0 - sqrt_alpha_a);
                let a0 = (a + 1.0) + sign * (a - 1.0) * cos_w0 + sqrt_alpha_a;
                let a1 = -sign * 2.0 * ((a - 1.0) + sign * (a + 1.0) * cos_w0);
                let a2 = (a + 1.0) + sign * (a - 1.0) * cos_w0 - sqrt_alpha_a;
                (b0, b1, b2, a0, a1, a2)
            }
            FilterKind::Equalizer => {
                let a = 10f64.powf(self.eq_gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            FilterKind::HighPass | FilterKind::LowPass => {
                let is_high = self.kind == FilterKind::HighPass;
                if self.pole_count <= 1 {
                    let a1 = -(-w0).exp();
                    let (factor_a, factor_b, factor_c) = if is_high {
                        (-1.0, 0.5, -1.0)
                    } else {
                        (1.0, 1.0, 0.0)
                    };
                    let b0 = (1.0 + factor_a * a1) * factor_b;
                    let b1 = factor_c * b0;
                    (b0, b1, 0.0, 1.0, a1, 0.0)
                } else {
                    let (factor_a, factor_b) = if is_high {
                        (1.0 + cos_w0, -1.0)
                    } else {
                        (1.0 - cos_w0, 1.0)
                    };
                    let b0 = factor_a / 2.0;
                    let b1 = factor_b * factor_a;
                    (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
                }
            }
            FilterKind::Biquad => unreachable!("handled above"),
        };

        self.filter.set3(b0, b1, b2, a0, a1, a2);
    }
}

/// An IIR filter effect with a selectable topology (spec §4.6).
pub struct FilterEffect {
    base: EffectBase,
    descriptor: FilterDescriptor,
}

fn enum_values(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl FilterEffect {
    pub fn new() -> Self {
        let mut effect = Self {
            base: EffectBase::new(),
            descriptor: FilterDescriptor::new(),
        };
        effect.initialize_all_parameters();
        effect.descriptor.update_coefficients(effect.base.sample_rate);
        effect.base.parameters_are_valid = true;
        effect
    }

    /// Rebuilds the parameter map from scratch for the current kind,
    /// mirroring the original's `_initializeAllParameters`: `Filter Kind`
    /// plus frequency/bandwidth always present for every bandwidth-based
    /// kind, and only the per-kind widgets are added beyond that — a kind
    /// change clears and re-adds rather than merely toggling an active
    /// flag on a fixed superset, so `to_preset()` after a kind change never
    /// exposes a parameter the original wouldn't have had for that kind.
    fn initialize_all_parameters(&mut self) {
        let map = &mut self.base.parameter_map;
        map.clear();
        let kind_names: Vec<String> = ALL_KINDS.iter().map(|k| k.as_str().to_string()).collect();
        map.set_kind_and_value_enum(PARAM_KIND, &kind_names, self.descriptor.kind.as_str());

        use FilterKind::*;
        if self.descriptor.kind == Biquad {
            for (i, name) in PARAM_B.iter().enumerate() {
                map.set_kind_and_value_real(name, -10.0, 10.0, 1e-6, self.descriptor.biquad_b[i]);
            }
            for (i, name) in PARAM_A.iter().enumerate() {
                map.set_kind_and_value_real(name, -10.0, 10.0, 1e-6, self.descriptor.biquad_a[i]);
            }
            return;
        }

        map.set_kind_and_value_real(PARAM_FREQUENCY, 10.0, 20000.0, 0.01, self.descriptor.frequency);
        map.set_kind_and_value_real(PARAM_BANDWIDTH, 0.001, 20000.0, 0.001, self.descriptor.bandwidth);
        map.set_kind_and_value_enum(
            PARAM_BANDWIDTH_UNIT,
            &enum_values(&["Frequency", "Octaves", "Quality", "Butterworth", "Slope"]),
            self.descriptor.bandwidth_unit.as_str(),
        );

        match self.descriptor.kind {
            Allpass | BandReject => {}
            Band => {
                map.set_kind_and_value_enum(
                    PARAM_UNPITCHED,
                    &enum_values(&["Yes", "No"]),
                    if self.descriptor.unpitched_audio { "Yes" } else { "No" },
                );
            }
            BandPass => {
                map.set_kind_and_value_enum(
                    PARAM_CONST_SKIRT,
                    &enum_values(&["Yes", "No"]),
                    if self.descriptor.constant_skirt_gain { "Yes" } else { "No" },
                );
            }
            Bass | Treble => {
                map.set_kind_and_value_real(PARAM_GAIN, -25.0, 25.0, 0.01, self.descriptor.gain_db);
            }
            Equalizer => {
                map.set_kind_and_value_real(PARAM_EQ_GAIN, -25.0, 25.0, 0.01, self.descriptor.eq_gain_db);
            }
            HighPass | LowPass => {
                map.set_kind_and_value_int(PARAM_POLE_COUNT, 1, 2, 1, self.descriptor.pole_count);
            }
            Biquad => unreachable!("handled above"),
        }
    }
}

impl Default for FilterEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for FilterEffect {
    fn name(&self) -> &'static str {
        "SoX Filter"
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.base.prepare(sample_rate);
        self.descriptor.update_coefficients(sample_rate);
    }

    fn release(&mut self) {
        self.base.release();
    }

    fn process_block(&mut self, time_position: f64, buffer: &mut Channels) {
        let channel_count = buffer.len();
        let sample_count = buffer.first().map(|c| c.len()).unwrap_or(0);
        self.base.begin_block(time_position, channel_count, sample_count);

        if self.descriptor.history.ring_buffer_count() != channel_count * 2 {
            self.descriptor.history = MultiRingBuffer::new(channel_count, 2, 3);
        }

        if !self.base.parameters_are_valid {
            return;
        }

        for channel in 0..channel_count {
            for sample_index in 0..sample_count {
                let input = buffer[channel][sample_index];
                self.descriptor.history.shift_right(channel, 0, input);
                self.descriptor.history.shift_right(channel, 1, 0.0);
                let (input_queue, output_queue) = self.descriptor.history.tap_pair_mut(channel);
                let y = self.descriptor.filter.apply(input_queue, output_queue);
                buffer[channel][sample_index] = y;
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

        if name == PARAM_KIND {
            if let Some(kind) = FilterKind::from_str(value) {
                self.descriptor.kind = kind;
            }
            self.initialize_all_parameters();
            if !force_recalc {
                self.descriptor.update_coefficients(self.base.sample_rate);
            }
            return ChangeKind::GlobalChange;
        }

        match name {
            n if n == PARAM_FREQUENCY => self.descriptor.frequency = value.parse().unwrap_or(self.descriptor.frequency),
            n if n == PARAM_BANDWIDTH => self.descriptor.bandwidth = value.parse().unwrap_or(self.descriptor.bandwidth),
            n if n == PARAM_BANDWIDTH_UNIT => {
                if let Some(unit) = BandwidthUnit::from_str(value) {
                    self.descriptor.bandwidth_unit = unit;
                }
            }
            n if n == PARAM_GAIN => self.descriptor.gain_db = value.parse().unwrap_or(self.descriptor.gain_db),
            n if n == PARAM_EQ_GAIN => self.descriptor.eq_gain_db = value.parse().unwrap_or(self.descriptor.eq_gain_db),
            n if n == PARAM_POLE_COUNT => self.descriptor.pole_count = value.parse().unwrap_or(self.descriptor.pole_count),
            n if n == PARAM_UNPITCHED => self.descriptor.unpitched_audio = value == "Yes",
            n if n == PARAM_CONST_SKIRT => self.descriptor.constant_skirt_gain = value == "Yes",
            n if n == PARAM_B[0] => self.descriptor.biquad_b[0] = value.parse().unwrap_or(self.descriptor.biquad_b[0]),
            n if n == PARAM_B[1] => self.descriptor.biquad_b[1] = value.parse().unwrap_or(self.descriptor.biquad_b[1]),
            n if n == PARAM_B[2] => self.descriptor.biquad_b[2] = value.parse().unwrap_or(self.descriptor.biquad_b[2]),
            n if n == PARAM_A[0] => self.descriptor.biquad_a[0] = value.parse().unwrap_or(self.descriptor.biquad_a[0]),
            n if n == PARAM_A[1] => self.descriptor.biquad_a[1] = value.parse().unwrap_or(self.descriptor.biquad_a[1]),
            n if n == PARAM_A[2] => self.descriptor.biquad_a[2] = value.parse().unwrap_or(self.descriptor.biquad_a[2]),
            _ => return ChangeKind::NoChange,
        }

        if !force_recalc {
            self.descriptor.update_coefficients(self.base.sample_rate);
        }

        ChangeKind::ParameterChange
    }

    fn set_default_values(&mut self) {
        self.descriptor = FilterDescriptor::new();
        self.initialize_all_parameters();
        self.descriptor.update_coefficients(self.base.sample_rate);
    }

    fn has_valid_parameters(&self) -> bool {
        self.base.parameters_are_valid
    }

    fn parameter_map(&self) -> &crate::param_map::ParameterMap {
        &self.base.parameter_map
    }

    fn tail_length(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_state_amplitude(effect: &mut FilterEffect, frequency: f64, sample_rate: f64, sample_count: usize) -> f64 {
        let mut buffer = vec![vec![0.0; sample_count]];
        for i in 0..sample_count {
            buffer[0][i] = (2.0 * PI * frequency * (i as f64) / sample_rate).sin();
        }
        effect.process_block(0.0, &mut buffer);
        let tail = &buffer[0][sample_count - 200..];
        tail.iter().cloned().fold(0.0, f64::max)
    }

    #[test]
    fn lowpass_two_pole_passes_cutoff_at_unity_gain_within_tolerance() {
        let mut effect = FilterEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_KIND, "LowPass", false);
        effect.set_value(PARAM_FREQUENCY, "1000", false);
        effect.set_value(PARAM_BANDWIDTH, "0.707", false);
        effect.set_value(PARAM_BANDWIDTH_UNIT, "Quality", false);
        effect.set_value(PARAM_POLE_COUNT, "2", false);
        let amplitude = steady_state_amplitude(&mut effect, 1000.0, 48000.0, 2000);
        assert!((amplitude - 0.707).abs() < 0.05, "amplitude was {amplitude}");
    }

    #[test]
    fn highpass_two_pole_passes_cutoff_at_unity_gain_within_tolerance() {
        let mut effect = FilterEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_KIND, "HighPass", false);
        effect.set_value(PARAM_FREQUENCY, "1000", false);
        effect.set_value(PARAM_BANDWIDTH, "0.707", false);
        effect.set_value(PARAM_BANDWIDTH_UNIT, "Quality", false);
        effect.set_value(PARAM_POLE_COUNT, "2", false);
        let amplitude = steady_state_amplitude(&mut effect, 1000.0, 48000.0, 2000);
        assert!((amplitude - 0.707).abs() < 0.05, "amplitude was {amplitude}");
    }

    #[test]
    fn biquad_identity_coefficients_pass_signal_unchanged() {
        let mut effect = FilterEffect::new();
        effect.prepare(48000.0);
        effect.set_value(PARAM_KIND, "Biquad", false);
        effect.set_value("b0", "1", false);
        effect.set_value("b1", "0", false);
        effect.set_value("b2", "0", false);
        effect.set_value("a0", "1", false);
        effect.set_value("a1", "0", false);
        effect.set_value("a2", "0", false);
        let mut buffer = vec![vec![0.1, -0.4, 0.9, 0.0, -1.0]];
        let expected = buffer[0].clone();
        effect.process_block(0.0, &mut buffer);
        for (e, a) in expected.iter().zip(buffer[0].iter()) {
            assert!((e - a).abs() < 1e-9);
        }
    }

    #[test]
    fn kind_change_reports_global_change() {
        let mut effect = FilterEffect::new();
        let change = effect.set_value(PARAM_KIND, "Treble", false);
        assert_eq!(change, ChangeKind::GlobalChange);
        assert!(effect.parameter_map().is_active(PARAM_GAIN));
        assert!(!effect.parameter_map().is_active(PARAM_POLE_COUNT));
    }
}
