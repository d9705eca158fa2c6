use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::library::NoteMask;

use super::VoicePool;

/// Voice pool state published by the render thread after every block.
#[derive(Debug, Clone)]
pub struct VoicePoolStats {
    voice_count: Arc<AtomicU64>,
    sounding: Arc<[AtomicU64; 2]>,
}

impl Default for VoicePoolStats {
    fn default() -> Self {
        Self::new()
    }
}

impl VoicePoolStats {
    pub fn new() -> Self {
        Self {
            voice_count: Arc::new(AtomicU64::new(0)),
            sounding: Arc::new([AtomicU64::new(0), AtomicU64::new(0)]),
        }
    }

    pub(crate) fn publish(&self, pool: &VoicePool) {
        let mut mask = NoteMask::new();
        let mut count = 0;
        for voice in pool.all_active() {
            mask.insert(voice.key());
            count += 1;
        }

        let words = mask.words();
        self.sounding[0].store(words[0], Ordering::Relaxed);
        self.sounding[1].store(words[1], Ordering::Relaxed);
        self.voice_count.store(count, Ordering::Relaxed);
    }
}

/// Reads the published voice pool state from any thread.
#[derive(Debug, Clone)]
pub struct SamplerStatsReader {
    stats: VoicePoolStats,
}

impl SamplerStatsReader {
    pub fn new(stats: VoicePoolStats) -> Self {
        Self { stats }
    }

    /// Number of active voices after the last rendered block.
    pub fn voice_count(&self) -> u64 {
        self.stats.voice_count.load(Ordering::Relaxed)
    }

    /// The keys that had at least one active voice after the last rendered block.
    pub fn sounding_notes(&self) -> NoteMask {
        NoteMask::from_words([
            self.stats.sounding[0].load(Ordering::Relaxed),
            self.stats.sounding[1].load(Ordering::Relaxed),
        ])
    }

    pub fn is_note_sounding(&self, key: u8) -> bool {
        self.sounding_notes().contains(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::library::{SampleEntry, SampleLibrary};

    #[test]
    fn test_publish() {
        let library = SampleLibrary::build([SampleEntry::mono(
            "flat",
            60,
            0..=127,
            vec![0.5; 100],
            44100,
        )])
        .unwrap();
        let mut pool = VoicePool::new(Arc::new(library), 4, 44100);
        let stats = VoicePoolStats::new();
        let reader = SamplerStatsReader::new(stats.clone());

        pool.note_on(0, 1.0);
        pool.note_on(64, 1.0);
        pool.note_on(127, 1.0);
        stats.publish(&pool);

        assert_eq!(reader.voice_count(), 3);
        assert_eq!(reader.sounding_notes().iter().collect::<Vec<_>>(), vec![0, 64, 127]);
        assert!(!reader.is_note_sounding(63));

        pool.kill_all_voices();
        stats.publish(&pool);
        assert_eq!(reader.voice_count(), 0);
        assert!(reader.sounding_notes().is_empty());
    }
}
