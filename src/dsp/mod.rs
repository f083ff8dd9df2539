//! Concrete DSP effects, one module per effect kind named in spec §4.

pub mod chorus_echo;
pub mod filter;
pub mod flanger_phaser_tremolo;
pub mod overdrive;
pub mod reverb;
