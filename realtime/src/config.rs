use polysampler_core::engine::SamplerConfig;

/// Options for initializing a new RealtimeSampler.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RealtimeConfig {
    /// Options of the underlying engine.
    /// See the `SamplerConfig` documentation for more information.
    pub sampler: SamplerConfig,

    /// Largest number of frames rendered in one go. Device buffers longer
    /// than this are rendered in several pieces.
    ///
    /// Default: `512`
    pub max_block_size: usize,

    /// Number of note events that can wait for the audio thread. Events
    /// sent while the queue is full are dropped.
    ///
    /// Default: `1024`
    pub event_queue_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            sampler: Default::default(),
            max_block_size: 512,
            event_queue_size: 1024,
        }
    }
}
