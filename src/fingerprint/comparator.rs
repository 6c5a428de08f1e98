//! Deciding whether two fingerprints show the same scene.

use super::{Fingerprint, FingerprintError, FINGERPRINT_LEN, SAME_IMAGE_MIN_MATCHING};
use crate::capture::DetectorConfig;

/// Outcome of comparing two fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    /// Cells with the same flag in both fingerprints.
    pub matching: u32,
    /// Cells that differ.
    pub differing: u32,
    /// `matching` reached the comparator's threshold.
    pub is_same: bool,
}

/// Compares fingerprints with a noise tolerance.
///
/// Two fingerprints show the same image when at least `min_matching`
/// of their 256 cells agree; the default of 253 tolerates three
/// flipped cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparator {
    min_matching: u32,
}

impl Comparator {
    /// Creates a comparator; thresholds above 256 are clamped to 256.
    pub fn new(min_matching: u32) -> Self {
        Self {
            min_matching: min_matching.min(FINGERPRINT_LEN as u32),
        }
    }

    /// Creates a comparator with the configured matching threshold.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.min_matching_cells)
    }

    /// Minimum number of equal cells for a match.
    pub fn min_matching(&self) -> u32 {
        self.min_matching
    }

    /// Counts matching cells and applies the threshold.
    pub fn compare(&self, a: &Fingerprint, b: &Fingerprint) -> Comparison {
        let matching = a.matching_cells(b);
        Comparison {
            matching,
            differing: FINGERPRINT_LEN as u32 - matching,
            is_same: matching >= self.min_matching,
        }
    }

    /// Whether `a` and `b` show the same image.
    pub fn is_same(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        self.compare(a, b).is_same
    }

    /// Compares two raw flag sequences.
    ///
    /// Both must hold exactly 256 flags. Sequences of different lengths
    /// are rejected rather than compared over the shorter prefix.
    pub fn compare_bits(&self, a: &[bool], b: &[bool]) -> Result<Comparison, FingerprintError> {
        if a.len() != b.len() {
            return Err(FingerprintError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        let a = Fingerprint::from_bits(a)?;
        let b = Fingerprint::from_bits(b)?;
        Ok(self.compare(&a, &b))
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(SAME_IMAGE_MIN_MATCHING)
    }
}

/// [`Comparator::is_same`] with the default threshold.
pub fn is_same(a: &Fingerprint, b: &Fingerprint) -> bool {
    Comparator::default().is_same(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_flipped(base: Fingerprint, count: usize) -> Fingerprint {
        (0..count).fold(base, |fp, i| fp.toggled(i * 7))
    }

    #[test]
    fn test_reflexive() {
        let fp = with_flipped(Fingerprint::uniform(false), 100);
        let cmp = Comparator::default().compare(&fp, &fp);
        assert_eq!(cmp.matching, 256);
        assert!(cmp.is_same);
    }

    #[test]
    fn test_three_differences_are_same() {
        let a = Fingerprint::uniform(true);
        let b = with_flipped(a, 3);
        let cmp = Comparator::default().compare(&a, &b);
        assert_eq!(cmp.matching, 253);
        assert_eq!(cmp.differing, 3);
        assert!(cmp.is_same);
    }

    #[test]
    fn test_four_differences_are_changed() {
        let a = Fingerprint::uniform(true);
        let b = with_flipped(a, 4);
        assert!(!Comparator::default().is_same(&a, &b));
        assert!(!is_same(&b, &a));
    }

    #[test]
    fn test_single_difference_at_origin() {
        let a = Fingerprint::uniform(false);
        let b = a.toggled(0);
        assert_eq!(Comparator::default().compare(&a, &b).matching, 255);
        assert!(is_same(&a, &b));
    }

    #[test]
    fn test_black_versus_white() {
        let cmp = Comparator::default().compare(&Fingerprint::uniform(true), &Fingerprint::uniform(false));
        assert_eq!(cmp.matching, 0);
        assert!(!cmp.is_same);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let result = Comparator::default().compare_bits(&[true; 256], &[true; 255]);
        assert!(matches!(
            result,
            Err(FingerprintError::LengthMismatch { left: 256, right: 255 })
        ));
    }

    #[test]
    fn test_equal_but_wrong_length_is_error() {
        let result = Comparator::default().compare_bits(&[true; 10], &[true; 10]);
        assert!(matches!(result, Err(FingerprintError::InvalidLength(10))));
    }

    #[test]
    fn test_compare_bits() {
        let a = vec![false; 256];
        let mut b = a.clone();
        b[0] = true;
        b[100] = true;
        let cmp = Comparator::default().compare_bits(&a, &b).unwrap();
        assert_eq!(cmp.matching, 254);
        assert!(cmp.is_same);
    }

    #[test]
    fn test_custom_threshold_clamped() {
        assert_eq!(Comparator::new(1000).min_matching(), 256);
        let strict = Comparator::new(256);
        let a = Fingerprint::uniform(false);
        assert!(strict.is_same(&a, &a));
        assert!(!strict.is_same(&a, &a.toggled(5)));
    }
}
