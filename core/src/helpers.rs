mod frequencies;
pub use frequencies::*;

mod simd;
pub use simd::*;

/// Take any vec, set its length and fill it with the default value.
///
/// Only grows the allocation, so calling it again with the same or a smaller
/// length never allocates.
pub fn prepare_cache_vec<T: Copy>(vec: &mut Vec<T>, len: usize, default: T) {
    vec.resize(len, default);
    vec.fill(default);
}

/// Convert a duration in seconds to a whole number of frames at `sample_rate`.
pub fn seconds_to_frames(seconds: f32, sample_rate: u32) -> u32 {
    (seconds.max(0.0) * sample_rate as f32).round() as u32
}
