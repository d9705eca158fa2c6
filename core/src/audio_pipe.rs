use crate::AudioStreamParams;

/// An object to read audio samples from.
pub trait AudioPipe {
    /// The audio stream parameters of the audio pipe.
    fn stream_params(&self) -> &'_ AudioStreamParams;

    /// Reads interleaved samples from the pipe.
    ///
    /// The amount of samples read determines how far in time the pipe
    /// advances. For example if a note on is sent to a sampler and 44100
    /// frames are read at a 44.1kHz sample rate, the note will have been
    /// audible for 1 second. Sending a note off afterwards releases it from
    /// the next read onwards.
    ///
    /// A pipe without channels fills `to` with silence.
    fn read_samples(&mut self, to: &mut [f32]) {
        let channels = self.stream_params().channels as usize;
        if channels == 0 {
            to.fill(0.0);
            return;
        }
        assert!(to.len() % channels == 0);
        self.read_samples_unchecked(to);
    }

    /// Reads samples from the pipe without checking the channel count of the output.
    fn read_samples_unchecked(&mut self, to: &mut [f32]);
}
