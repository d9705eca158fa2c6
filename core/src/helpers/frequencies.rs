use lazy_static::lazy_static;

/// Create an array of speed multipliers for the 12 semitones of one octave
fn build_semitone_ratios() -> [f64; 12] {
    let mut ratios = [1.0f64; 12];
    for (semitone, ratio) in ratios.iter_mut().enumerate() {
        *ratio = 2.0f64.powf(semitone as f64 / 12.0);
    }
    ratios
}

lazy_static! {
    /// Static array of the equal temperament ratios within one octave.
    pub static ref SEMITONE_RATIOS: [f64; 12] = build_semitone_ratios();
}

/// The playback speed multiplier that transposes a recording made at
/// `base_key` so it sounds at `key`, i.e. `2^((key - base_key) / 12)`.
///
/// Whole octaves are applied as exact powers of two, so a key one octave
/// above the base gives exactly 2.0.
pub fn pitch_ratio(key: u8, base_key: u8) -> f64 {
    let semitones = key as i32 - base_key as i32;
    let octaves = semitones.div_euclid(12);
    let remainder = semitones.rem_euclid(12) as usize;
    SEMITONE_RATIOS[remainder] * 2.0f64.powi(octaves)
}
