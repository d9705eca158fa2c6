use crate::helpers::seconds_to_frames;
use crate::library::SampleOptions;

/// The stages of a voice's amplitude envelope
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Sustain,
    Release, // Goes to this stage as soon as the voice is released
}

impl EnvelopeStage {
    pub fn is_active(&self) -> bool {
        *self != EnvelopeStage::Idle
    }
}

/// Envelope timing in seconds, as configured on a sample
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EnvelopeDescriptor {
    pub attack: f32,  // Seconds
    pub release: f32, // Seconds
}

impl EnvelopeDescriptor {
    #[allow(clippy::wrong_self_convention)]
    pub fn to_envelope_params(&self, sample_rate: u32) -> EnvelopeParameters {
        EnvelopeParameters {
            attack: seconds_to_frames(self.attack, sample_rate),
            release: seconds_to_frames(self.release, sample_rate),
        }
    }
}

impl From<&SampleOptions> for EnvelopeDescriptor {
    fn from(options: &SampleOptions) -> Self {
        EnvelopeDescriptor {
            attack: options.attack,
            release: options.release,
        }
    }
}

/// Envelope timing in frames at the playback sample rate.
/// Use EnvelopeDescriptor to generate it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeParameters {
    pub attack: u32,
    pub release: u32,
}

/// A linear attack/sustain/release envelope.
///
/// The attack ramps from 0 to 1 over `attack` frames. The release ramps from
/// whatever level the envelope had when it was released down to 0 over
/// `release` frames, so a released envelope never gets louder.
#[derive(Debug, Clone)]
pub struct VoiceEnvelope {
    params: EnvelopeParameters,
    stage: EnvelopeStage,
    stage_time: u32,
    release_start: f32,
}

impl Default for VoiceEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceEnvelope {
    pub fn new() -> Self {
        VoiceEnvelope {
            params: EnvelopeParameters::default(),
            stage: EnvelopeStage::Idle,
            stage_time: 0,
            release_start: 0.0,
        }
    }

    /// Restarts the envelope from silence.
    pub fn start(&mut self, params: EnvelopeParameters) {
        self.params = params;
        self.stage_time = 0;
        self.release_start = 0.0;
        self.stage = if params.attack == 0 {
            EnvelopeStage::Sustain
        } else {
            EnvelopeStage::Attack
        };
    }

    /// Moves an attacking or sustaining envelope into its release.
    pub fn release(&mut self) {
        match self.stage {
            EnvelopeStage::Attack | EnvelopeStage::Sustain => {
                self.release_start = self.level();
                self.stage_time = 0;
                self.stage = if self.params.release == 0 {
                    EnvelopeStage::Idle
                } else {
                    EnvelopeStage::Release
                };
            }
            EnvelopeStage::Release | EnvelopeStage::Idle => {}
        }
    }

    /// Silences the envelope immediately.
    pub fn kill(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.stage_time = 0;
        self.release_start = 0.0;
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn ended(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    /// The envelope level of the current frame.
    pub fn level(&self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => 0.0,
            EnvelopeStage::Attack => self.stage_time as f32 / self.params.attack as f32,
            EnvelopeStage::Sustain => 1.0,
            EnvelopeStage::Release => {
                let progress = self.stage_time as f32 / self.params.release as f32;
                self.release_start * (1.0 - progress)
            }
        }
    }

    /// How far through the release the envelope is, from 0 to 1.
    /// Envelopes that aren't releasing report 0.
    pub fn release_progress(&self) -> f32 {
        match self.stage {
            EnvelopeStage::Release => self.stage_time as f32 / self.params.release as f32,
            _ => 0.0,
        }
    }

    /// Returns the level of the current frame and advances by one frame.
    #[inline(always)]
    pub fn next_level(&mut self) -> f32 {
        let level = self.level();
        match self.stage {
            EnvelopeStage::Attack => {
                self.stage_time += 1;
                if self.stage_time >= self.params.attack {
                    self.stage = EnvelopeStage::Sustain;
                    self.stage_time = 0;
                }
            }
            EnvelopeStage::Release => {
                self.stage_time += 1;
                if self.stage_time >= self.params.release {
                    self.stage = EnvelopeStage::Idle;
                    self.stage_time = 0;
                }
            }
            EnvelopeStage::Sustain | EnvelopeStage::Idle => {}
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lerp(from: f32, to: f32, fac: f32) -> f32 {
        from + (to - from) * fac
    }

    fn collect(env: &mut VoiceEnvelope, frames: usize) -> Vec<f32> {
        (0..frames).map(|_| env.next_level()).collect()
    }

    #[test]
    fn test_descriptor_to_frames() {
        let descriptor = EnvelopeDescriptor {
            attack: 0.5,
            release: 0.1,
        };
        assert_eq!(
            descriptor.to_envelope_params(44100),
            EnvelopeParameters {
                attack: 22050,
                release: 4410
            }
        );
    }

    #[test]
    fn test_envelope() {
        let mut env = VoiceEnvelope::new();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.next_level(), 0.0);

        env.start(EnvelopeParameters {
            attack: 15,
            release: 16,
        });
        assert_eq!(env.stage(), EnvelopeStage::Attack);

        let mut vec = collect(&mut env, 20);
        env.release();
        assert_eq!(env.stage(), EnvelopeStage::Release);
        vec.extend(collect(&mut env, 20));

        let mut expected_vec = Vec::new();
        for i in 0..15 {
            expected_vec.push(lerp(0.0, 1.0, i as f32 / 15.0));
        }
        for _ in 0..5 {
            expected_vec.push(1.0);
        }
        for i in 0..16 {
            expected_vec.push(lerp(1.0, 0.0, i as f32 / 16.0));
        }
        for _ in 0..4 {
            expected_vec.push(0.0);
        }

        for v in vec.iter_mut().chain(expected_vec.iter_mut()) {
            *v = (*v * 10000.0).round() / 10000.0;
        }

        assert_eq!(vec, expected_vec);
        assert!(env.ended());
    }

    #[test]
    fn test_release_during_attack() {
        let mut env = VoiceEnvelope::new();
        env.start(EnvelopeParameters {
            attack: 10,
            release: 4,
        });
        collect(&mut env, 5);
        assert_eq!(env.level(), 0.5);

        env.release();
        assert_eq!(env.stage(), EnvelopeStage::Release);
        assert_eq!(collect(&mut env, 5), vec![0.5, 0.375, 0.25, 0.125, 0.0]);
        assert!(env.ended());
    }

    #[test]
    fn test_release_is_monotonic() {
        let mut env = VoiceEnvelope::new();
        env.start(EnvelopeParameters {
            attack: 7,
            release: 333,
        });
        collect(&mut env, 3);
        env.release();

        let mut last = env.level();
        while !env.ended() {
            let level = env.next_level();
            assert!(level <= last);
            last = level;
        }
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_zero_length_stages() {
        let mut env = VoiceEnvelope::new();
        env.start(EnvelopeParameters {
            attack: 0,
            release: 0,
        });
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert_eq!(env.next_level(), 1.0);

        env.release();
        assert!(env.ended());
        assert_eq!(env.next_level(), 0.0);
    }

    #[test]
    fn test_release_progress() {
        let mut env = VoiceEnvelope::new();
        env.start(EnvelopeParameters {
            attack: 0,
            release: 10,
        });
        assert_eq!(env.release_progress(), 0.0);
        env.release();
        collect(&mut env, 4);
        assert_eq!(env.release_progress(), 0.4);

        // Releasing twice doesn't restart the release
        env.release();
        assert_eq!(env.release_progress(), 0.4);
    }
}
