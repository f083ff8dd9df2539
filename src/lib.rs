//! # sox-dsp-core — a SoX-derived real-time DSP core
//!
//! This crate is the hard engineering behind a suite of block-oriented audio
//! effects lifted from the SoX command-line audio processor and repackaged
//! as a real-time DSP core: a parametric/IIR filter bank, a combined
//! chorus/echo delay engine, a combined flanger/phaser/tremolo modulation
//! engine, an overdrive distortion, and a Freeverb-style reverb.
//!
//! It covers exactly two things:
//!
//!  - the block-processing [`effect`] base with a typed, paged [`param_map`]
//!    acting as the contract between host and DSP;
//!  - the per-effect DSP state machines under [`dsp`]: IIR coefficient
//!    derivation from bandwidth units ([`dsp::filter`]), delay-line
//!    ring-buffer scheduling with phase-locked LFO modulation
//!    ([`dsp::chorus_echo`], [`dsp::flanger_phaser_tremolo`]), the Freeverb
//!    reverb graph ([`dsp::reverb`]), and a cubic-shaping distortion
//!    ([`dsp::overdrive`]).
//!
//! Everything else — the plugin-host wrapper that mounts an effect as a
//! realtime VST3/CLAP/AU plugin, the GUI/editor, and the generic container
//! shims — is a collaborator outside this crate's scope. `host-adapter/` in
//! this workspace is a thin demonstration of the former, not a product.
//!
//! ## Scheduling model
//!
//! Single-threaded and cooperative within one effect instance: a host calls
//! [`effect::Effect::prepare`] once, then [`effect::Effect::set_value`] and
//! [`effect::Effect::process_block`] repeatedly, all from the same thread.
//! `process_block` never allocates; `prepare` and `set_value` may. Multiple
//! effect instances share no mutable state and may run on different host
//! threads concurrently.

pub mod dsp;
pub mod effect;
pub mod error;
pub mod iir_filter;
pub mod param_map;
pub mod registry;
pub mod ring_buffer;
pub mod ring_vector;
pub mod waveform;

pub use effect::{ChangeKind, Effect, EffectBase};
pub use error::{PresetError, RegistryError};
pub use param_map::ParameterMap;
pub use registry::EffectKind;
