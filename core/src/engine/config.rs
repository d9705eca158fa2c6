use crate::{params::ParameterLayout, voice::Interpolator};

/// Options for initializing a new SamplerEngine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SamplerConfig {
    /// Number of voices in the pool. This is the maximum number of notes
    /// that can sound at once; further notes steal a voice.
    ///
    /// Default: `8`
    pub voice_count: usize,

    /// Number of leading output channels that carry input audio. The sampler
    /// mixes on top of these and clears every channel after them before
    /// rendering.
    ///
    /// Default: `0`
    pub input_channels: u16,

    /// Type of interpolator to use when reading samples at fractional
    /// positions. See the `Interpolator` documentation for more information.
    ///
    /// Default: `Linear`
    pub interpolator: Interpolator,

    /// Parameters exposed by the engine's parameter store.
    ///
    /// Default: empty
    pub parameters: ParameterLayout,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            voice_count: 8,
            input_channels: 0,
            interpolator: Default::default(),
            parameters: Default::default(),
        }
    }
}
