/// Type of the audio sample interpolation algorithm.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Interpolator {
    /// Reads the frame at or before the position, without blending.
    /// A position of 0.9 reads frame 0.
    Nearest,

    /// Linear interpolation
    ///
    /// See more info about this method [here](https://en.wikipedia.org/wiki/Linear_interpolation)
    #[default]
    Linear,
}

/// Grabs sample values at fractional positions from a PCM buffer.
///
/// Positions past the end of the buffer read as silence, so the last frame
/// interpolates toward zero.
pub struct SampleReader<'a> {
    buffer: &'a [f32],
}

impl<'a> SampleReader<'a> {
    pub fn new(buffer: &'a [f32]) -> Self {
        SampleReader { buffer }
    }

    #[inline(always)]
    pub fn get(&self, pos: usize) -> f32 {
        match self.buffer.get(pos) {
            Some(v) => *v,
            None => 0.0,
        }
    }

    #[inline(always)]
    pub fn is_past_end(&self, pos: f64) -> bool {
        pos >= self.buffer.len() as f64
    }

    #[inline(always)]
    pub fn read(&self, pos: f64, interpolator: Interpolator) -> f32 {
        let index = pos as usize;
        match interpolator {
            Interpolator::Nearest => self.get(index),
            Interpolator::Linear => {
                let blend = (pos - index as f64) as f32;
                self.get(index) * (1.0 - blend) + self.get(index + 1) * blend
            }
        }
    }
}
