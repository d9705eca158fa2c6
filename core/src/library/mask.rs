/// A set of MIDI keys (0-127) stored as a 128 bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteMask([u64; 2]);

impl NoteMask {
    pub fn new() -> Self {
        Self([0; 2])
    }

    /// Adds a key to the mask. Keys above 127 are ignored.
    pub fn insert(&mut self, key: u8) {
        if key < 128 {
            self.0[key as usize / 64] |= 1 << (key % 64);
        }
    }

    pub fn contains(&self, key: u8) -> bool {
        key < 128 && self.0[key as usize / 64] & (1 << (key % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; 2]
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// The raw words of the mask, keys 0-63 first.
    pub fn words(&self) -> [u64; 2] {
        self.0
    }

    pub fn from_words(words: [u64; 2]) -> Self {
        Self(words)
    }

    /// Iterates the keys in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..128u8).filter(move |key| self.contains(*key))
    }
}

impl FromIterator<u8> for NoteMask {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut mask = NoteMask::new();
        for key in iter {
            mask.insert(key);
        }
        mask
    }
}
