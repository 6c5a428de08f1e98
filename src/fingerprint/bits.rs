//! The 256-cell fingerprint type.

use super::{FingerprintError, FINGERPRINT_LEN, GRID_SIZE};

const WORDS: usize = FINGERPRINT_LEN / 64;

/// A 16x16 grid of dark/light flags, stored as a 256-bit set.
///
/// Cell `i` is row `i / 16`, column `i % 16`. A set cell means the
/// downsampled pixel was darker than the brightness threshold.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    words: [u64; WORDS],
}

impl Fingerprint {
    /// A fingerprint with every cell set to `dark`.
    pub fn uniform(dark: bool) -> Self {
        let word = if dark { u64::MAX } else { 0 };
        Self {
            words: [word; WORDS],
        }
    }

    /// Builds a fingerprint from exactly 256 flags in row-major order.
    pub fn from_bits(bits: &[bool]) -> Result<Self, FingerprintError> {
        if bits.len() != FINGERPRINT_LEN {
            return Err(FingerprintError::InvalidLength(bits.len()));
        }
        Ok(Self::from_cells(bits.iter().copied()))
    }

    /// Packs row-major cells. Anything past the 256th cell is ignored.
    pub(crate) fn from_cells(cells: impl IntoIterator<Item = bool>) -> Self {
        let mut words = [0u64; WORDS];
        for (i, dark) in cells.into_iter().take(FINGERPRINT_LEN).enumerate() {
            if dark {
                words[i / 64] |= 1 << (i % 64);
            }
        }
        Self { words }
    }

    /// Returns cell `index` in row-major order, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        (index < FINGERPRINT_LEN).then(|| self.words[index / 64] & (1 << (index % 64)) != 0)
    }

    /// Returns the cell at `(row, col)`, or `None` outside the grid.
    #[inline]
    pub fn cell(&self, row: u32, col: u32) -> Option<bool> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return None;
        }
        self.get((row * GRID_SIZE + col) as usize)
    }

    /// Returns a copy with cell `index` inverted.
    pub fn toggled(mut self, index: usize) -> Self {
        if index < FINGERPRINT_LEN {
            self.words[index / 64] ^= 1 << (index % 64);
        }
        self
    }

    /// Always 256.
    #[inline]
    pub fn len(&self) -> usize {
        FINGERPRINT_LEN
    }

    /// Always false; a fingerprint has 256 cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..FINGERPRINT_LEN).map(move |i| self.words[i / 64] & (1 << (i % 64)) != 0)
    }

    /// Cells in row-major order.
    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }

    /// Number of dark cells.
    pub fn dark_cells(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Number of cells that differ from `other`.
    pub fn differing_cells(&self, other: &Fingerprint) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Number of cells equal to `other`.
    pub fn matching_cells(&self, other: &Fingerprint) -> u32 {
        FINGERPRINT_LEN as u32 - self.differing_cells(other)
    }

    /// 64 hex digits, cell 0 in the most significant bit of the first digit.
    pub fn to_hex(&self) -> String {
        self.to_vec()
            .chunks(4)
            .map(|nibble| {
                let v = nibble
                    .iter()
                    .fold(0u32, |acc, &dark| (acc << 1) | dark as u32);
                char::from_digit(v, 16).unwrap_or('0')
            })
            .collect()
    }

    /// Renders the grid as 16 lines, `#` for dark and `.` for light.
    pub fn to_grid_string(&self) -> String {
        let mut out = String::with_capacity(FINGERPRINT_LEN + GRID_SIZE as usize);
        for row in self.to_vec().chunks(GRID_SIZE as usize) {
            out.extend(row.iter().map(|&dark| if dark { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprint")
            .field("dark_cells", &self.dark_cells())
            .field("hex", &self.to_hex())
            .finish()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
