//! The concrete numeric scenarios enumerated for this DSP core: exact
//! sample-indexed outputs for a few parameter combinations where the
//! expected value is known in closed form.

use sox_dsp_core::param_map::ParameterMap;
use sox_dsp_core::registry::make_effect;

#[test]
fn tapped_delay_outputs_each_staged_decay_at_its_own_sample_offset() {
    let mut effect = make_effect("chorus_echo").unwrap();
    effect.prepare(48_000.0);
    effect.set_value("Effect Kind", "Tapped Delay", false);
    effect.set_value("In Gain", "1", false);
    effect.set_value("Out Gain", "1", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Stage Count", -2), "2", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Delay [ms]", 1), "100.0", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Decay", 1), "0.5", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Delay [ms]", 2), "200.0", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Decay", 2), "0.25", false);

    let sample_count = 10_000;
    let mut impulse = vec![0.0; sample_count];
    impulse[0] = 1.0;
    let mut buffer = vec![impulse];
    effect.process_block(0.0, &mut buffer);

    assert!((buffer[0][4800] - 0.5).abs() < 1e-9, "sample 4800 was {}", buffer[0][4800]);
    assert!((buffer[0][9600] - 0.25).abs() < 1e-9, "sample 9600 was {}", buffer[0][9600]);
}

#[test]
fn delay_sequence_chains_each_stage_through_the_next() {
    let mut effect = make_effect("chorus_echo").unwrap();
    effect.prepare(48_000.0);
    effect.set_value("Effect Kind", "Delay Sequence", false);
    effect.set_value("In Gain", "1", false);
    effect.set_value("Out Gain", "1", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Stage Count", -2), "2", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Delay [ms]", 1), "100.0", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Decay", 1), "0.5", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Delay [ms]", 2), "200.0", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Decay", 2), "0.25", false);

    let sample_count = 15_000;
    let mut impulse = vec![0.0; sample_count];
    impulse[0] = 1.0;
    let mut buffer = vec![impulse];
    effect.process_block(0.0, &mut buffer);

    assert!((buffer[0][4800] - 0.5).abs() < 1e-9, "sample 4800 was {}", buffer[0][4800]);
    assert!((buffer[0][9600] - 0.25).abs() < 1e-9, "sample 9600 was {}", buffer[0][9600]);
    assert!((buffer[0][14400] - 0.25).abs() < 1e-9, "sample 14400 was {}", buffer[0][14400]);
}

#[test]
fn reverb_impulse_crosses_to_the_other_channel_after_the_shortest_comb_delay() {
    let mut effect = make_effect("reverb").unwrap();
    effect.prepare(44_100.0);
    effect.set_value("Reverberance [%]", "50", false);
    effect.set_value("HF Damping [%]", "50", false);
    effect.set_value("Room Scale [%]", "100", false);
    effect.set_value("Stereo Depth [%]", "100", false);
    effect.set_value("Predelay [ms]", "0", false);
    effect.set_value("Wet Gain [dB]", "0", false);

    // Room factor is 1.0 at 100% scale, 44.1kHz reference; the right rail's
    // shortest comb carries the full stereo-spread offset on top of the
    // base length (see reverb.rs's `update_settings`).
    let right_comb_length = ((1116.0 + 23.0) * 1.0_f64).round() as usize;
    let mut buffer = vec![vec![0.0; right_comb_length + 10], vec![0.0; right_comb_length + 10]];
    buffer[0][0] = 1.0;
    effect.process_block(0.0, &mut buffer);

    for sample in &buffer[1][..right_comb_length] {
        assert_eq!(*sample, 0.0, "right channel should stay silent before its shortest comb delay elapses");
    }
    assert!(buffer[1][right_comb_length..].iter().any(|&y| y != 0.0));
}

#[test]
fn chorus_echo_identity_configuration_passes_signal_through() {
    let mut effect = make_effect("chorus_echo").unwrap();
    effect.prepare(48_000.0);
    effect.set_value("In Gain", "1.0", false);
    effect.set_value("Out Gain", "1.0", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Stage Count", -2), "1", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Delay [ms]", 1), "0.0", false);
    effect.set_value(&ParameterMap::paged_parameter_name("Decay", 1), "0.0", false);

    let inputs = [0.2, -0.3, 0.7, -0.9, 0.0];
    let mut buffer = vec![inputs.to_vec()];
    effect.process_block(0.0, &mut buffer);
    for (x, y) in inputs.iter().zip(buffer[0].iter()) {
        assert!((x - y).abs() < 1e-9);
    }
}

#[test]
fn split_parameter_name_is_the_inverse_of_paged_parameter_name() {
    for k in [-2, -1, 0, 1, 7] {
        let name = ParameterMap::paged_parameter_name("Delay [ms]", k);
        let (base, normalised, nominal) = ParameterMap::split_parameter_name(&name);
        assert_eq!(base, "Delay [ms]");
        assert_eq!(normalised, k.max(0));
        assert_eq!(nominal, k);
    }
}
