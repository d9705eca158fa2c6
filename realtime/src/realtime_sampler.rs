use std::sync::Arc;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BuildStreamError, DefaultStreamConfigError, Device, FromSample, PauseStreamError,
    PlayStreamError, SampleFormat, SizedSample, Stream, SupportedStreamConfig,
};
use crossbeam_channel::{bounded, Receiver};
use thiserror::Error;

use polysampler_core::{
    engine::{EngineError, SamplerEngine},
    library::SampleLibrary,
    params::{ParameterSnapshot, ParameterStore},
    pool::{NoteEvent, SamplerEvent, SamplerStatsReader},
    AudioStreamParams,
};

use crate::{RealtimeConfig, RealtimeEventSender};

/// Errors that can be generated when opening or controlling a realtime sampler.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Failed to query the output configuration: {0}")]
    DefaultConfig(#[from] DefaultStreamConfigError),

    #[error("Failed to build the output stream: {0}")]
    Build(#[from] BuildStreamError),

    #[error("Failed to start the output stream: {0}")]
    Play(#[from] PlayStreamError),

    #[error("Failed to pause the output stream: {0}")]
    Pause(#[from] PauseStreamError),

    #[error("Unsupported output sample format {0:?}")]
    UnsupportedSampleFormat(SampleFormat),

    #[error("Failed to create the sampler: {0}")]
    Engine(#[from] EngineError),
}

/// Everything the audio callback owns.
struct CallbackState {
    engine: SamplerEngine,
    receiver: Receiver<NoteEvent>,
    events: Vec<SamplerEvent>,
    buffer: Vec<f32>,
}

impl CallbackState {
    fn fill<T: SizedSample + FromSample<f32>>(&mut self, data: &mut [T]) {
        self.events.clear();
        let capacity = self.events.capacity();
        self.events.extend(
            self.receiver
                .try_iter()
                .take(capacity)
                .map(SamplerEvent::at_start),
        );

        if self.buffer.is_empty() {
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let mut events = &self.events[..];
        for chunk in data.chunks_mut(self.buffer.len()) {
            let buffer = &mut self.buffer[..chunk.len()];
            self.engine.render_block(events, buffer);
            events = &[];

            for (out, sample) in chunk.iter_mut().zip(buffer.iter()) {
                *out = T::from_sample(*sample);
            }
        }
    }
}

/// A sampler playing through an audio output device in real time.
///
/// The engine lives inside the device's audio callback. Note events reach it
/// through a bounded queue and apply at the start of the next device buffer.
pub struct RealtimeSampler {
    stream: Stream,
    event_sender: RealtimeEventSender,
    stats: SamplerStatsReader,
    parameters: ParameterStore,
    library: Arc<SampleLibrary>,
    stream_params: AudioStreamParams,
}

impl RealtimeSampler {
    /// Opens a sampler on the default output device of the default host.
    pub fn open_with_default_output(
        library: Arc<SampleLibrary>,
        config: RealtimeConfig,
    ) -> Result<Self, RealtimeError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(RealtimeError::NoOutputDevice)?;
        log::info!(
            "Output device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_owned())
        );

        let stream_config = device.default_output_config()?;

        RealtimeSampler::open(library, config, &device, stream_config)
    }

    /// Opens a sampler on the given device and starts playing.
    pub fn open(
        library: Arc<SampleLibrary>,
        config: RealtimeConfig,
        device: &Device,
        stream_config: SupportedStreamConfig,
    ) -> Result<Self, RealtimeError> {
        let sample_rate = stream_config.sample_rate().0;
        let audio_channels = stream_config.channels();
        let stream_params = AudioStreamParams::new(sample_rate, audio_channels);
        let max_block_size = config.max_block_size.max(1);

        let mut engine = SamplerEngine::new(library.clone(), config.sampler)?;
        engine.prepare(stream_params, max_block_size);

        let stats = engine.get_stats();
        let parameters = engine.parameters().clone();

        let queue_size = config.event_queue_size.max(1);
        let (sender, receiver) = bounded(queue_size);

        let state = CallbackState {
            engine,
            receiver,
            events: Vec::with_capacity(queue_size),
            buffer: vec![0.0; max_block_size * audio_channels as usize],
        };

        fn build_stream<T: SizedSample + FromSample<f32>>(
            device: &Device,
            stream_config: SupportedStreamConfig,
            mut state: CallbackState,
        ) -> Result<Stream, BuildStreamError> {
            let err_fn = |err| log::error!("An error occurred on the output stream: {}", err);

            device.build_output_stream(
                &stream_config.into(),
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| state.fill(data),
                err_fn,
                None,
            )
        }

        let stream = match stream_config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(device, stream_config, state)?,
            SampleFormat::I16 => build_stream::<i16>(device, stream_config, state)?,
            SampleFormat::U16 => build_stream::<u16>(device, stream_config, state)?,
            format => return Err(RealtimeError::UnsupportedSampleFormat(format)),
        };

        stream.play()?;

        log::info!(
            "Started realtime sampler at {} Hz with {} channels",
            sample_rate,
            audio_channels
        );

        Ok(Self {
            stream,
            event_sender: RealtimeEventSender::new(sender),
            stats,
            parameters,
            library,
            stream_params,
        })
    }

    /// Queues an event for the audio thread. Returns false if it was dropped.
    pub fn send_event(&self, event: NoteEvent) -> bool {
        self.event_sender.send_event(event)
    }

    /// Decodes a raw MIDI message and queues it.
    pub fn send_midi(&self, message: &[u8]) -> bool {
        self.event_sender.send_midi(message)
    }

    pub fn get_sender(&self) -> RealtimeEventSender {
        self.event_sender.clone()
    }

    pub fn get_stats(&self) -> SamplerStatsReader {
        self.stats.clone()
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn parameter_snapshot(&self) -> ParameterSnapshot {
        self.parameters.snapshot()
    }

    pub fn restore_parameter_snapshot(&self, snapshot: &ParameterSnapshot) {
        self.parameters.restore(snapshot);
    }

    pub fn library(&self) -> &Arc<SampleLibrary> {
        &self.library
    }

    pub fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    pub fn pause(&mut self) -> Result<(), RealtimeError> {
        Ok(self.stream.pause()?)
    }

    pub fn resume(&mut self) -> Result<(), RealtimeError> {
        Ok(self.stream.play()?)
    }
}
