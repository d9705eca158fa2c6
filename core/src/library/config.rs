/// Timing options of a single sample. All values are in seconds and get
/// converted to frames once the playback sample rate is known.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SampleOptions {
    /// Time for the envelope to ramp from silence to full level.
    ///
    /// Default: `0.0`
    pub attack: f32,

    /// Time for the envelope to ramp from its current level to silence
    /// after the note is released.
    ///
    /// Default: `0.1`
    pub release: f32,

    /// Maximum playback time of the sample, measured in source audio. Voices
    /// that play past it are released even if their key is still held.
    ///
    /// Default: `10.0`
    pub max_duration: f32,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            attack: 0.0,
            release: 0.1,
            max_duration: 10.0,
        }
    }
}
