use crate::library::{Sample, SampleId};

mod envelopes;
pub use envelopes::*;

mod sampler;
pub use sampler::*;

/// How a voice should be released.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReleaseType {
    /// Standard release. Uses the voice's envelope.
    Standard,

    /// Silences the voice immediately, without a release tail.
    Kill,
}

/// The values a voice is (re)started with.
#[derive(Copy, Clone, Debug)]
pub struct VoiceStart {
    pub sample: SampleId,
    pub key: u8,
    /// Gain from 0 to 1
    pub velocity: f32,
    /// `2^((key - original pitch) / 12)`
    pub pitch_ratio: f64,
    /// Source frames advanced per output frame
    pub speed: f64,
    pub envelope: EnvelopeParameters,
    /// Source frames after which a held voice gets released
    pub max_frames: f64,
    /// Note on counter value, lower is older
    pub sequence: u64,
}

/// A single unit of sample playback.
///
/// Voices are created once and reused. An idle voice holds no sample.
#[derive(Debug, Clone)]
pub struct Voice {
    sample: Option<SampleId>,
    key: u8,
    velocity: f32,
    pitch_ratio: f64,
    speed: f64,
    position: f64,
    max_frames: f64,
    envelope: VoiceEnvelope,
    sequence: u64,
    key_down: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    pub fn new() -> Self {
        Voice {
            sample: None,
            key: 0,
            velocity: 0.0,
            pitch_ratio: 1.0,
            speed: 1.0,
            position: 0.0,
            max_frames: 0.0,
            envelope: VoiceEnvelope::new(),
            sequence: 0,
            key_down: false,
        }
    }

    /// Starts playing a sample from its first frame, replacing whatever the
    /// voice was playing before.
    pub fn start(&mut self, start: VoiceStart) {
        self.sample = Some(start.sample);
        self.key = start.key;
        self.velocity = start.velocity;
        self.pitch_ratio = start.pitch_ratio;
        self.speed = start.speed;
        self.position = 0.0;
        self.max_frames = start.max_frames;
        self.sequence = start.sequence;
        self.key_down = true;
        self.envelope.start(start.envelope);
        if self.envelope.ended() {
            self.sample = None;
        }
    }

    pub fn signal_release(&mut self, rel_type: ReleaseType) {
        match rel_type {
            ReleaseType::Standard => self.envelope.release(),
            ReleaseType::Kill => self.envelope.kill(),
        }
        self.key_down = false;
        self.retire_if_ended();
    }

    fn retire_if_ended(&mut self) {
        if self.envelope.ended() {
            self.sample = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.sample.is_some()
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.stage() == EnvelopeStage::Release
    }

    pub fn sample(&self) -> Option<SampleId> {
        self.sample
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The fractional source frame that will be read next.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    pub fn level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn release_progress(&self) -> f32 {
        self.envelope.release_progress()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// False once the key was lifted, even if the sustain pedal still holds
    /// the voice.
    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    pub fn set_key_up(&mut self) {
        self.key_down = false;
    }

    /// Adds the voice's output to an interleaved buffer of `channels` channels.
    ///
    /// `sample` must be the sample this voice was started with. A mono sample
    /// is written to every channel; a multi channel sample writes each of its
    /// channels to the output channel with the same index, or gets averaged
    /// when the output is mono.
    pub fn render_to(
        &mut self,
        sample: &Sample,
        out: &mut [f32],
        channels: usize,
        interpolator: Interpolator,
    ) {
        if !self.is_active() || channels == 0 {
            return;
        }

        let sample_channels = sample.channel_count();
        let first_channel = SampleReader::new(sample.channel(0));

        for frame in out.chunks_exact_mut(channels) {
            // Sample exhausted, stop without a tail
            if first_channel.is_past_end(self.position) {
                self.envelope.kill();
                break;
            }

            if self.position >= self.max_frames && !self.is_releasing() {
                self.envelope.release();
            }
            if self.envelope.ended() {
                break;
            }

            let gain = self.envelope.next_level() * self.velocity;
            let pos = self.position;

            if sample_channels == 1 {
                let value = SampleReader::new(sample.channel(0)).read(pos, interpolator) * gain;
                for out in frame.iter_mut() {
                    *out += value;
                }
            } else if channels == 1 {
                let mut sum = 0.0;
                for c in 0..sample_channels {
                    sum += SampleReader::new(sample.channel(c)).read(pos, interpolator);
                }
                frame[0] += sum / sample_channels as f32 * gain;
            } else {
                for (c, out) in frame.iter_mut().enumerate().take(sample_channels) {
                    *out += SampleReader::new(sample.channel(c)).read(pos, interpolator) * gain;
                }
            }

            self.position += self.speed;
        }

        self.retire_if_ended();
    }
}
