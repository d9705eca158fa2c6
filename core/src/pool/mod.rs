use std::sync::Arc;

use crate::{
    library::SampleLibrary,
    voice::{EnvelopeDescriptor, EnvelopeParameters, ReleaseType, Voice, VoiceStart},
};

mod event;
pub use event::*;

mod stats;
pub use stats::*;

/// A fixed set of voices and the rules for handing them out to notes.
///
/// Free voices are taken in pool order. When every voice is busy, the voice
/// furthest through its release is stolen; when no voice is releasing, the
/// voice with the oldest note on is stolen. Stolen voices restart
/// immediately, without a crossfade.
///
/// With the sustain pedal down, note offs only mark the key as lifted. The
/// voices are released once the pedal goes up.
pub struct VoicePool {
    library: Arc<SampleLibrary>,
    voices: Box<[Voice]>,
    envelopes: Vec<EnvelopeParameters>,
    sample_rate: u32,
    sequence: u64,
    sustain_pedal: bool,
}

impl VoicePool {
    pub fn new(library: Arc<SampleLibrary>, voice_count: usize, sample_rate: u32) -> Self {
        let mut pool = VoicePool {
            library,
            voices: vec![Voice::new(); voice_count].into_boxed_slice(),
            envelopes: Vec::new(),
            sample_rate,
            sequence: 0,
            sustain_pedal: false,
        };
        pool.build_envelopes();
        pool
    }

    fn build_envelopes(&mut self) {
        let sample_rate = self.sample_rate;
        self.envelopes = self
            .library
            .iter()
            .map(|(_, sample)| {
                EnvelopeDescriptor::from(sample.options()).to_envelope_params(sample_rate)
            })
            .collect();
    }

    /// Converts the sample timings to the new rate. Changing the rate stops
    /// every voice, since their positions and envelopes no longer apply.
    ///
    /// Allocates, so it must not be called from the render thread.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.kill_all_voices();
        self.build_envelopes();
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn library(&self) -> &Arc<SampleLibrary> {
        &self.library
    }

    /// Total number of voices, active or not.
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    pub fn process_event(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { key, vel } => {
                self.note_on(key, vel);
            }
            NoteEvent::NoteOff { key } => self.note_off(key),
            NoteEvent::AllNotesOff => self.all_notes_off(),
            NoteEvent::AllNotesKilled => self.kill_all_voices(),
            NoteEvent::SustainPedal(down) => self.set_sustain_pedal(down),
        }
    }

    /// Starts a voice for `key`. Returns the index of the voice used, or
    /// `None` when no sample answers to the key.
    pub fn note_on(&mut self, key: u8, vel: f32) -> Option<usize> {
        let id = self.library.find_for_note(key)?;

        // A key that's hit again while still ringing is released first
        for voice in self.voices.iter_mut() {
            if voice.is_active() && voice.key() == key && !voice.is_releasing() {
                voice.signal_release(ReleaseType::Standard);
            }
        }

        let index = self
            .find_free_voice()
            .or_else(|| self.find_voice_to_steal())?;

        let sample = self.library.sample(id);
        let pitch_ratio = sample.pitch_ratio(key);
        let rate_ratio = sample.sample_rate() as f64 / self.sample_rate as f64;
        let velocity = if vel.is_finite() {
            vel.clamp(0.0, 1.0)
        } else {
            0.0
        };

        self.sequence += 1;
        self.voices[index].start(VoiceStart {
            sample: id,
            key,
            velocity,
            pitch_ratio,
            speed: pitch_ratio * rate_ratio,
            envelope: self.envelopes[id.index()],
            max_frames: sample.max_playback_frames(),
            sequence: self.sequence,
        });

        Some(index)
    }

    fn find_free_voice(&self) -> Option<usize> {
        self.voices.iter().position(|voice| !voice.is_active())
    }

    fn find_voice_to_steal(&self) -> Option<usize> {
        let mut most_released: Option<(usize, f32)> = None;
        for (i, voice) in self.voices.iter().enumerate() {
            if !voice.is_releasing() {
                continue;
            }
            match most_released {
                Some((_, progress)) if progress >= voice.release_progress() => {}
                _ => most_released = Some((i, voice.release_progress())),
            }
        }

        if let Some((i, _)) = most_released {
            return Some(i);
        }

        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| voice.sequence())
            .map(|(i, _)| i)
    }

    /// Releases every voice playing `key`.
    pub fn note_off(&mut self, key: u8) {
        let sustain = self.sustain_pedal;
        for voice in self.voices.iter_mut() {
            if !voice.is_active() || voice.key() != key {
                continue;
            }
            if sustain {
                voice.set_key_up();
            } else {
                voice.signal_release(ReleaseType::Standard);
            }
        }
    }

    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.signal_release(ReleaseType::Standard);
        }
    }

    pub fn kill_all_voices(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.signal_release(ReleaseType::Kill);
        }
    }

    pub fn set_sustain_pedal(&mut self, down: bool) {
        self.sustain_pedal = down;
        if down {
            return;
        }
        for voice in self.voices.iter_mut() {
            if voice.is_active() && !voice.is_key_down() {
                voice.signal_release(ReleaseType::Standard);
            }
        }
    }

    pub fn sustain_pedal(&self) -> bool {
        self.sustain_pedal
    }

    /// The voices that are currently producing sound, in pool order.
    pub fn all_active(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().filter(|voice| voice.is_active())
    }

    pub fn all_active_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut().filter(|voice| voice.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.all_active().count()
    }

    pub fn is_note_sounding(&self, key: u8) -> bool {
        self.all_active().any(|voice| voice.key() == key)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{
        library::SampleEntry,
        voice::{EnvelopeStage, Interpolator},
    };

    fn library() -> Arc<SampleLibrary> {
        Arc::new(
            SampleLibrary::build([
                SampleEntry::mono("low", 48, 36..=59, vec![0.5; 44100], 44100),
                SampleEntry::mono("high", 72, 60..=84, vec![0.5; 44100], 44100)
                    .with_release(0.01),
            ])
            .unwrap(),
        )
    }

    fn render(pool: &mut VoicePool, frames: usize) {
        let library = pool.library().clone();
        let mut out = vec![0.0; frames];
        for voice in pool.all_active_mut() {
            let sample = library.sample(voice.sample().unwrap());
            voice.render_to(sample, &mut out, 1, Interpolator::Linear);
        }
    }

    #[test]
    fn test_idle_voices_in_order() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        assert_eq!(pool.note_on(60, 1.0), Some(0));
        assert_eq!(pool.note_on(62, 1.0), Some(1));
        assert_eq!(pool.note_on(40, 1.0), Some(2));
        assert_eq!(pool.active_count(), 3);

        let voice = &pool.voices()[1];
        assert_eq!(voice.key(), 62);
        assert_eq!(voice.stage(), EnvelopeStage::Sustain);
        assert_eq!(voice.position(), 0.0);
        assert_eq!(voice.sample(), pool.library().find_for_note(62));
    }

    #[test]
    fn test_pitch_ratios() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        pool.note_on(72, 1.0);
        pool.note_on(84, 1.0);
        pool.note_on(60, 1.0);
        let ratios: Vec<_> = pool.all_active().map(|v| v.pitch_ratio()).collect();
        assert_eq!(ratios, vec![1.0, 2.0, 0.5]);
        let speeds: Vec<_> = pool.all_active().map(|v| v.speed()).collect();
        assert_eq!(speeds, vec![1.0, 2.0, 0.5]);
    }

    #[test]
    fn test_sample_rate_conversion() {
        let mut pool = VoicePool::new(library(), 2, 88200);
        pool.note_on(72, 1.0);
        let voice = &pool.voices()[0];
        assert_eq!(voice.pitch_ratio(), 1.0);
        assert_eq!(voice.speed(), 0.5);
    }

    #[test]
    fn test_unknown_notes_are_ignored() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        assert_eq!(pool.note_on(20, 1.0), None);
        assert_eq!(pool.note_on(100, 1.0), None);
        assert_eq!(pool.note_on(128, 1.0), None);
        assert_eq!(pool.note_on(255, 1.0), None);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.voices().iter().all(|v| v.sequence() == 0));
    }

    #[test]
    fn test_steals_oldest_voice() {
        let mut pool = VoicePool::new(library(), 3, 44100);
        pool.note_on(60, 1.0);
        pool.note_on(61, 1.0);
        pool.note_on(62, 1.0);
        render(&mut pool, 10);

        assert_eq!(pool.note_on(63, 1.0), Some(0));
        assert_eq!(pool.active_count(), 3);
        assert!(!pool.is_note_sounding(60));
        assert!(pool.is_note_sounding(63));

        assert_eq!(pool.note_on(64, 1.0), Some(1));
        assert!(!pool.is_note_sounding(61));
    }

    #[test]
    fn test_steals_most_released_voice() {
        let mut pool = VoicePool::new(library(), 3, 44100);
        pool.note_on(60, 1.0);
        pool.note_on(61, 1.0);
        pool.note_on(62, 1.0);

        pool.note_off(62);
        render(&mut pool, 100);
        pool.note_off(61);
        render(&mut pool, 10);

        assert!(pool.voices()[1].is_releasing());
        assert!(pool.voices()[2].is_releasing());
        assert!(pool.voices()[2].release_progress() > pool.voices()[1].release_progress());

        assert_eq!(pool.note_on(65, 1.0), Some(2));
        assert_eq!(pool.note_on(66, 1.0), Some(1));
        assert_eq!(pool.voices()[1].stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn test_note_off_releases_without_reset() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        pool.note_on(72, 1.0);
        render(&mut pool, 50);
        pool.note_off(72);

        let voice = &pool.voices()[0];
        assert!(voice.is_active());
        assert!(voice.is_releasing());
        assert_eq!(voice.position(), 50.0);

        // No voice playing it, nothing happens
        pool.note_off(73);
        assert_eq!(pool.active_count(), 1);

        render(&mut pool, 441);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_retrigger_releases_ringing_voice() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        pool.note_on(60, 1.0);
        assert_eq!(pool.note_on(60, 0.5), Some(1));
        assert!(pool.voices()[0].is_releasing());
        assert_eq!(pool.voices()[1].velocity(), 0.5);
        assert_eq!(pool.voices()[1].stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn test_sustain_pedal() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        pool.set_sustain_pedal(true);
        pool.note_on(60, 1.0);
        pool.note_on(62, 1.0);
        pool.note_off(60);

        assert!(!pool.voices()[0].is_releasing());
        assert!(!pool.voices()[0].is_key_down());
        assert!(pool.voices()[1].is_key_down());

        pool.set_sustain_pedal(false);
        assert!(pool.voices()[0].is_releasing());
        assert!(!pool.voices()[1].is_releasing());
    }

    #[test]
    fn test_all_notes_off_and_kill() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        pool.note_on(60, 1.0);
        pool.note_on(40, 1.0);
        pool.process_event(NoteEvent::AllNotesOff);
        assert!(pool.all_active().all(|v| v.is_releasing()));

        pool.process_event(NoteEvent::AllNotesKilled);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_sample_rate_change_stops_voices() {
        let mut pool = VoicePool::new(library(), 4, 44100);
        pool.note_on(60, 1.0);
        pool.set_sample_rate(44100);
        assert_eq!(pool.active_count(), 1);

        pool.set_sample_rate(48000);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.sample_rate(), 48000);
    }

    #[test]
    fn test_random_notes_never_exceed_capacity() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = VoicePool::new(library(), 8, 44100);

        for _ in 0..2000 {
            let key = rng.gen_range(30..90);
            if rng.gen_bool(0.6) {
                pool.note_on(key, rng.gen());
            } else {
                pool.note_off(key);
            }
            if rng.gen_bool(0.3) {
                render(&mut pool, rng.gen_range(1..600));
            }
            assert!(pool.active_count() <= pool.capacity());
        }
    }
}
