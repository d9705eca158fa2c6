/// Parameters of the output audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AudioStreamParams {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,

    /// Number of interleaved channels in every buffer.
    pub channels: u16,
}

impl AudioStreamParams {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl Default for AudioStreamParams {
    fn default() -> Self {
        Self::new(44100, 2)
    }
}
