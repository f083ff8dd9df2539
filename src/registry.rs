//! Effect kind enumeration and construct-by-name registry.
//!
//! The original source has one C++ class per effect, each independently
//! constructible by the host (`SoXFilter_AudioEffect`, `SoXReverb_AudioEffect`,
//! …) plus a per-plugin `createSoXPlugin` factory wired up by the (out of
//! scope) plugin-host wrapper. This module is the in-scope equivalent of
//! that factory plumbing: a closed [`EffectKind`] enum plus a
//! construct-by-name lookup, so host code can enumerate "what effects
//! exist" without depending on the plugin wrapper (SPEC_FULL §4.11).

use crate::dsp::{chorus_echo::ChorusAndEchoEffect, filter::FilterEffect, flanger_phaser_tremolo::PhaserAndTremoloEffect, overdrive::OverdriveEffect, reverb::ReverbEffect};
use crate::effect::Effect;
use crate::error::RegistryError;

/// The closed set of effect topologies this crate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Filter,
    ChorusAndEcho,
    FlangerPhaserTremolo,
    Overdrive,
    Reverb,
}

/// Every kind, in a stable order — used both for iteration and as the
/// canonical lookup order for [`EffectKind::from_name`].
pub const ALL_EFFECT_KINDS: [EffectKind; 5] = [
    EffectKind::Filter,
    EffectKind::ChorusAndEcho,
    EffectKind::FlangerPhaserTremolo,
    EffectKind::Overdrive,
    EffectKind::Reverb,
];

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl EffectKind {
    /// The registry name for this kind — stable, used for lookup and for
    /// any host-side persisted "which effect is this" tag.
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Filter => "filter",
            EffectKind::ChorusAndEcho => "chorus_echo",
            EffectKind::FlangerPhaserTremolo => "flanger_phaser_tremolo",
            EffectKind::Overdrive => "overdrive",
            EffectKind::Reverb => "reverb",
        }
    }

    /// Looks up a kind by its registry name (see [`Self::name`]).
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_EFFECT_KINDS.into_iter().find(|k| k.name() == name)
    }

    /// Constructs a fresh, default-configured effect instance of this kind.
    pub fn construct(self) -> Box<dyn Effect> {
        match self {
            EffectKind::Filter => Box::new(FilterEffect::new()),
            EffectKind::ChorusAndEcho => Box::new(ChorusAndEchoEffect::new()),
            EffectKind::FlangerPhaserTremolo => Box::new(PhaserAndTremoloEffect::new()),
            EffectKind::Overdrive => Box::new(OverdriveEffect::new()),
            EffectKind::Reverb => Box::new(ReverbEffect::new()),
        }
    }
}

/// Constructs a fresh effect by its registry name, for hosts that only
/// know effect names at runtime (e.g. reloading a saved project).
///
/// # Errors
/// Returns [`RegistryError::UnknownEffect`] if `name` does not match any
/// [`EffectKind`].
pub fn make_effect(name: &str) -> Result<Box<dyn Effect>, RegistryError> {
    match EffectKind::from_name(name) {
        Some(kind) => {
            log::trace!("registry: constructing effect {name:?}");
            Ok(kind.construct())
        }
        None => Err(RegistryError::UnknownEffect(name.to_string())),
    }
}
