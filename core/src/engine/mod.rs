use std::sync::Arc;

use thiserror::Error;

use crate::{
    helpers::{prepare_cache_vec, sum_simd},
    library::{InvalidSampleError, SampleEntry, SampleLibrary},
    params::{ParameterError, ParameterSnapshot, ParameterStore},
    pool::{NoteEvent, SamplerEvent, SamplerStatsReader, VoicePool, VoicePoolStats},
    AudioPipe, AudioStreamParams,
};

mod config;
pub use config::*;

/// Errors that can be generated when creating a sampler engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("The sample library is empty")]
    EmptyLibrary,

    #[error("The voice count must be at least 1")]
    NoVoices,

    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] InvalidSampleError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
}

/// A polyphonic sampler that renders blocks of interleaved audio from a
/// sample library and a list of timestamped note events.
///
/// `prepare` must be called before rendering, and again whenever the
/// output format changes. Until then, rendered blocks are silent.
///
/// Rendering never allocates, locks or logs, so `render_block` can be
/// called from a realtime audio thread.
pub struct SamplerEngine {
    library: Arc<SampleLibrary>,
    pool: VoicePool,
    config: SamplerConfig,
    stream_params: AudioStreamParams,
    max_block_size: usize,
    prepared: bool,
    scratch: Vec<f32>,
    parameters: ParameterStore,
    stats: VoicePoolStats,
}

impl SamplerEngine {
    /// Creates a new engine playing from the given library.
    /// See the `SamplerConfig` documentation for the available options.
    pub fn new(library: Arc<SampleLibrary>, config: SamplerConfig) -> Result<Self, EngineError> {
        if library.is_empty() {
            return Err(EngineError::EmptyLibrary);
        }
        if config.voice_count == 0 {
            return Err(EngineError::NoVoices);
        }

        let parameters = ParameterStore::new(config.parameters.clone())?;
        let stream_params = AudioStreamParams::default();
        let pool = VoicePool::new(library.clone(), config.voice_count, stream_params.sample_rate);

        log::info!(
            "Created sampler engine with {} samples and {} voices",
            library.len(),
            config.voice_count
        );

        Ok(Self {
            library,
            pool,
            config,
            stream_params,
            max_block_size: 0,
            prepared: false,
            scratch: Vec::new(),
            parameters,
            stats: VoicePoolStats::new(),
        })
    }

    /// Builds the library from sample entries and creates an engine for it.
    pub fn from_entries(
        entries: impl IntoIterator<Item = SampleEntry>,
        config: SamplerConfig,
    ) -> Result<Self, EngineError> {
        let library = SampleLibrary::build(entries)?;
        Self::new(Arc::new(library), config)
    }

    /// Sets up the engine for the given output format and block size.
    ///
    /// Calling it again with the same arguments has no effect. A different
    /// sample rate stops every sounding voice. Allocates, so it must not be
    /// called from the render thread.
    pub fn prepare(&mut self, stream_params: AudioStreamParams, max_block_size: usize) {
        let max_block_size = max_block_size.max(1);
        if self.prepared
            && self.stream_params == stream_params
            && self.max_block_size == max_block_size
        {
            return;
        }

        self.pool.set_sample_rate(stream_params.sample_rate);
        self.stream_params = stream_params;
        self.max_block_size = max_block_size;

        let len = max_block_size * stream_params.channels as usize;
        prepare_cache_vec(&mut self.scratch, len, 0.0);
        self.prepared = true;

        log::info!(
            "Prepared sampler for {} Hz, {} channels, blocks of up to {} frames",
            stream_params.sample_rate,
            stream_params.channels,
            max_block_size
        );
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Renders one block of interleaved audio into `out`.
    ///
    /// Each event is applied at its frame offset within the block. Events are
    /// expected in time order; one whose offset is earlier than the frame
    /// already reached is applied at that frame, and events at or past the
    /// end of the block are applied after it, taking effect from the next
    /// block. Before `prepare`, the buffer is filled with silence and the
    /// events are dropped.
    pub fn render_block(&mut self, events: &[SamplerEvent], out: &mut [f32]) {
        let channels = self.stream_params.channels as usize;
        if !self.prepared || channels == 0 {
            out.fill(0.0);
            return;
        }

        let frames = out.len() / channels;
        let (out, partial) = out.split_at_mut(frames * channels);
        partial.fill(0.0);

        self.clear_unused_channels(out);

        let mut events = events.iter().peekable();
        let mut cursor = 0;
        while cursor < frames {
            while let Some(event) = events.next_if(|e| e.time as usize <= cursor) {
                self.pool.process_event(event.event);
            }

            let next_event = events
                .peek()
                .map(|e| (e.time as usize).min(frames))
                .unwrap_or(frames);
            let end = next_event.min(cursor + self.max_block_size);

            self.render_range(&mut out[cursor * channels..end * channels]);
            cursor = end;
        }

        for event in events {
            self.pool.process_event(event.event);
        }

        self.stats.publish(&self.pool);
    }

    fn render_range(&mut self, out: &mut [f32]) {
        let channels = self.stream_params.channels as usize;
        let interpolator = self.config.interpolator;

        let scratch = &mut self.scratch[..out.len()];
        scratch.fill(0.0);

        for voice in self.pool.all_active_mut() {
            if let Some(id) = voice.sample() {
                voice.render_to(self.library.sample(id), scratch, channels, interpolator);
            }
        }

        sum_simd(scratch, out);
    }

    fn clear_unused_channels(&self, out: &mut [f32]) {
        let channels = self.stream_params.channels as usize;
        let first_unused = (self.config.input_channels as usize).min(channels);
        if first_unused == channels {
            return;
        }
        for frame in out.chunks_exact_mut(channels) {
            frame[first_unused..].fill(0.0);
        }
    }

    /// Applies an event right away, outside of a block.
    pub fn process_event(&mut self, event: NoteEvent) {
        self.pool.process_event(event);
        self.stats.publish(&self.pool);
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn parameter_snapshot(&self) -> ParameterSnapshot {
        self.parameters.snapshot()
    }

    pub fn restore_parameter_snapshot(&self, snapshot: &ParameterSnapshot) {
        log::debug!("Restoring {} parameter values", snapshot.len());
        self.parameters.restore(snapshot);
    }

    /// Returns a reader for the voice statistics published after every
    /// rendered block. The reader can be sent to other threads.
    pub fn get_stats(&self) -> SamplerStatsReader {
        SamplerStatsReader::new(self.stats.clone())
    }

    pub fn voice_pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn library(&self) -> &Arc<SampleLibrary> {
        &self.library
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}

impl AudioPipe for SamplerEngine {
    fn stream_params(&self) -> &'_ AudioStreamParams {
        &self.stream_params
    }

    fn read_samples_unchecked(&mut self, to: &mut [f32]) {
        self.render_block(&[], to);
    }
}
