//! Low-frequency oscillator: a finite precomputed table of real values with
//! a monotonically advancing state, used to modulate chorus/flanger delay
//! taps and tremolo amplitude.
//!
//! Grounded in `SoXWaveForm` from the original source and spec §4.2.

use std::f64::consts::PI;

/// The shape of one period of the oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveFormKind {
    Sine,
    Triangle,
}

/// A phase-locked LFO: a table `T[0..L)` and an advancing index `s`.
#[derive(Debug, Clone)]
pub struct Waveform {
    table: Vec<f64>,
    state: usize,
}

impl Waveform {
    /// Builds an oscillator with an empty (zero-length) table. Callers must
    /// call [`Waveform::set`] before using [`Waveform::current`].
    pub fn new() -> Self {
        Self {
            table: Vec::new(),
            state: 0,
        }
    }

    /// Rebuilds the table for a waveform of `length` samples, shape `kind`,
    /// scaled into `[lo, hi]`, starting at `phase` radians, optionally
    /// quantised to integers. Resets `state` to zero.
    ///
    /// `length` of zero degenerates to a single constant sample at `lo`
    /// (guards the chorus/echo "frequency below threshold" case, where the
    /// caller passes a nominal length of 1).
    pub fn set(&mut self, length: usize, kind: WaveFormKind, lo: f64, hi: f64, phase: f64, integer_values: bool) {
        let length = length.max(1);
        self.table = (0..length)
            .map(|k| {
                let theta = (phase + 2.0 * PI * (k as f64) / (length as f64)).rem_euclid(2.0 * PI);
                let raw = match kind {
                    WaveFormKind::Sine => theta.sin(),
                    WaveFormKind::Triangle => {
                        if theta < PI {
                            -1.0 + 2.0 * (theta / PI)
                        } else {
                            1.0 - 2.0 * ((theta - PI) / PI)
                        }
                    }
                };
                let scaled = lo + (raw + 1.0) / 2.0 * (hi - lo);
                if integer_values {
                    scaled.round()
                } else {
                    scaled
                }
            })
            .collect();
        self.state = 0;
    }

    /// The value at the current state index.
    pub fn current(&self) -> f64 {
        self.table.get(self.state).copied().unwrap_or(0.0)
    }

    /// Advances the state index by one slot, wrapping at the table length.
    pub fn advance(&mut self) {
        if !self.table.is_empty() {
            self.state = (self.state + 1) % self.table.len();
        }
    }

    /// The current state index, for snapshot/restore.
    pub fn state(&self) -> usize {
        self.state
    }

    /// Restores a previously captured state index.
    pub fn set_state(&mut self, state: usize) {
        self.state = if self.table.is_empty() {
            0
        } else {
            state % self.table.len()
        };
    }

    /// `2π · frequency · (current_time − time_offset)`, not reduced modulo
    /// `2π` — the caller adds a default phase and reduces when locking the
    /// waveform to wall-clock time.
    pub fn phase_by_time(frequency: f64, time_offset: f64, current_time: f64) -> f64 {
        2.0 * PI * frequency * (current_time - time_offset)
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sine_table_stays_within_range() {
        let mut wf = Waveform::new();
        wf.set(100, WaveFormKind::Sine, -1.0, 1.0, 0.0, false);
        for k in 0..100 {
            wf.set_state(k);
            let v = wf.current();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn integer_quantised_table_holds_only_integers() {
        let mut wf = Waveform::new();
        wf.set(50, WaveFormKind::Sine, 0.0, 10.0, 0.3, true);
        for k in 0..50 {
            wf.set_state(k);
            let v = wf.current();
            assert_eq!(v, v.round());
        }
    }

    #[test]
    fn triangle_rises_then_falls() {
        let mut wf = Waveform::new();
        wf.set(8, WaveFormKind::Triangle, -1.0, 1.0, 0.0, false);
        wf.set_state(0);
        let first = wf.current();
        wf.set_state(2);
        let quarter = wf.current();
        assert!(quarter > first);
    }

    #[test]
    fn advance_wraps_at_table_length() {
        let mut wf = Waveform::new();
        wf.set(4, WaveFormKind::Sine, -1.0, 1.0, 0.0, false);
        wf.set_state(3);
        wf.advance();
        assert_eq!(wf.state(), 0);
    }

    #[test]
    fn phase_by_time_matches_spec_identities() {
        assert_relative_eq!(Waveform::phase_by_time(5.0, 2.0, 2.0), 0.0, epsilon = 1e-9);
        let freq = 3.0;
        assert_relative_eq!(
            Waveform::phase_by_time(freq, 0.0, 1.0 / freq),
            2.0 * PI,
            epsilon = 1e-9
        );
    }
}
