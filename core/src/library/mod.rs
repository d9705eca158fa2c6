use std::sync::Arc;

use thiserror::Error;

use crate::helpers::pitch_ratio;

mod config;
pub use config::*;

mod mask;
pub use mask::*;

/// Index of a sample inside its [`SampleLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleId(usize);

impl SampleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidSampleError {
    #[error("Sample \"{0}\" has no audio data")]
    EmptyPcm(String),

    #[error("Sample \"{0}\" does not respond to any note")]
    EmptyNoteSet(String),

    #[error("Sample \"{name}\" has an original pitch of {key}, expected 0-127")]
    OriginalPitchOutOfRange { name: String, key: i32 },

    #[error("Sample \"{name}\" responds to note {note}, expected 0-127")]
    NoteOutOfRange { name: String, note: i32 },

    #[error("Sample \"{0}\" has channels of different lengths")]
    ChannelLengthMismatch(String),

    #[error("Sample \"{0}\" has a sample rate of 0")]
    InvalidSampleRate(String),

    #[error("Sample \"{name}\" has an invalid {field} time of {value} seconds")]
    InvalidTime {
        name: String,
        field: &'static str,
        value: f32,
    },
}

/// Decoded audio plus the metadata needed to register it in a library.
#[derive(Debug, Clone)]
pub struct SampleEntry {
    /// Identifier of the sample, used in error messages.
    pub name: String,

    /// The MIDI key the recording was performed at.
    pub original_pitch: i32,

    /// The MIDI keys this sample answers to.
    pub notes: Vec<i32>,

    /// PCM data, one vec per channel.
    pub channels: Vec<Vec<f32>>,

    /// Sample rate of the PCM data in Hz.
    pub sample_rate: u32,

    /// Envelope and length options.
    pub options: SampleOptions,
}

impl SampleEntry {
    pub fn new(
        name: impl Into<String>,
        original_pitch: i32,
        notes: impl IntoIterator<Item = i32>,
        channels: Vec<Vec<f32>>,
        sample_rate: u32,
    ) -> Self {
        Self {
            name: name.into(),
            original_pitch,
            notes: notes.into_iter().collect(),
            channels,
            sample_rate,
            options: Default::default(),
        }
    }

    /// Creates an entry with a single channel of audio.
    pub fn mono(
        name: impl Into<String>,
        original_pitch: i32,
        notes: impl IntoIterator<Item = i32>,
        pcm: Vec<f32>,
        sample_rate: u32,
    ) -> Self {
        Self::new(name, original_pitch, notes, vec![pcm], sample_rate)
    }

    pub fn with_options(mut self, options: SampleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_attack(mut self, seconds: f32) -> Self {
        self.options.attack = seconds;
        self
    }

    pub fn with_release(mut self, seconds: f32) -> Self {
        self.options.release = seconds;
        self
    }

    pub fn with_max_duration(mut self, seconds: f32) -> Self {
        self.options.max_duration = seconds;
        self
    }
}

/// A validated, immutable sample.
pub struct Sample {
    name: String,
    original_pitch: u8,
    notes: NoteMask,
    channels: Arc<[Arc<[f32]>]>,
    length: usize,
    sample_rate: u32,
    options: SampleOptions,
}

impl Sample {
    fn from_entry(entry: SampleEntry) -> Result<Self, InvalidSampleError> {
        let SampleEntry {
            name,
            original_pitch,
            notes,
            channels,
            sample_rate,
            options,
        } = entry;

        let length = channels.first().map(|c| c.len()).unwrap_or(0);
        if length == 0 {
            return Err(InvalidSampleError::EmptyPcm(name));
        }
        if channels.iter().any(|c| c.len() != length) {
            return Err(InvalidSampleError::ChannelLengthMismatch(name));
        }
        if !(0..128).contains(&original_pitch) {
            return Err(InvalidSampleError::OriginalPitchOutOfRange {
                name,
                key: original_pitch,
            });
        }
        if sample_rate == 0 {
            return Err(InvalidSampleError::InvalidSampleRate(name));
        }

        let mut mask = NoteMask::new();
        for note in notes {
            if !(0..128).contains(&note) {
                return Err(InvalidSampleError::NoteOutOfRange { name, note });
            }
            mask.insert(note as u8);
        }
        if mask.is_empty() {
            return Err(InvalidSampleError::EmptyNoteSet(name));
        }

        let times = [
            ("attack", options.attack, true),
            ("release", options.release, true),
            ("max duration", options.max_duration, false),
        ];
        for (field, value, allow_zero) in times {
            let valid = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
            if !valid {
                return Err(InvalidSampleError::InvalidTime { name, field, value });
            }
        }

        let channels: Vec<Arc<[f32]>> = channels.into_iter().map(Arc::from).collect();

        Ok(Sample {
            name,
            original_pitch: original_pitch as u8,
            notes: mask,
            channels: channels.into(),
            length,
            sample_rate,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_pitch(&self) -> u8 {
        self.original_pitch
    }

    pub fn notes(&self) -> &NoteMask {
        &self.notes
    }

    pub fn responds_to(&self, key: u8) -> bool {
        self.notes.contains(key)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// PCM data of one channel.
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    /// Number of frames in the sample.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn options(&self) -> &SampleOptions {
        &self.options
    }

    /// The playback speed that makes this sample sound at `key`, ignoring
    /// any sample rate conversion.
    pub fn pitch_ratio(&self, key: u8) -> f64 {
        pitch_ratio(key, self.original_pitch)
    }

    /// The number of source frames after which a held voice gets released.
    pub fn max_playback_frames(&self) -> f64 {
        self.options.max_duration as f64 * self.sample_rate as f64
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("name", &self.name)
            .field("original_pitch", &self.original_pitch)
            .field("notes", &self.notes)
            .field("channels", &self.channels.len())
            .field("length", &self.length)
            .field("sample_rate", &self.sample_rate)
            .field("options", &self.options)
            .finish()
    }
}

/// The immutable set of samples a sampler plays from.
///
/// Samples keep their registration order. When more than one sample claims
/// the same note, the one registered first wins.
#[derive(Debug)]
pub struct SampleLibrary {
    samples: Vec<Sample>,
    key_map: [Option<SampleId>; 128],
}

impl SampleLibrary {
    pub fn build(
        entries: impl IntoIterator<Item = SampleEntry>,
    ) -> Result<Self, InvalidSampleError> {
        let mut samples: Vec<Sample> = Vec::new();
        let mut key_map = [None; 128];

        for entry in entries {
            let sample = Sample::from_entry(entry)?;
            let id = SampleId(samples.len());

            for key in sample.notes.iter() {
                match key_map[key as usize] {
                    None => key_map[key as usize] = Some(id),
                    Some(SampleId(first)) => log::debug!(
                        "Note {} of sample \"{}\" is already played by \"{}\"",
                        key,
                        sample.name,
                        samples[first].name
                    ),
                }
            }

            samples.push(sample);
        }

        log::debug!("Built sample library with {} samples", samples.len());

        Ok(SampleLibrary { samples, key_map })
    }

    /// Returns the first registered sample that answers to `key`.
    pub fn find_for_note(&self, key: u8) -> Option<SampleId> {
        self.key_map.get(key as usize).copied().flatten()
    }

    pub fn get_for_note(&self, key: u8) -> Option<&Sample> {
        self.find_for_note(key).map(|id| self.sample(id))
    }

    pub fn sample(&self, id: SampleId) -> &Sample {
        &self.samples[id.0]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SampleId, &Sample)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, sample)| (SampleId(i), sample))
    }
}
