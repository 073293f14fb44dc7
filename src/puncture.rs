//! Puncturing and depuncturing.
//!
//! The convolutional mother code is punctured according to a periodic
//! pattern. The [`Puncturer`] removes the punctured bits at the transmitter,
//! and reinserts fill values (erasures) in their positions at the receiver.

use super::subchannel::EepProfile;
use super::{ConfigError, LengthError};

/// Puncturer.
///
/// The pattern is applied periodically over the codeword. A `true` element
/// of the pattern marks a transmitted bit.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Puncturer {
    pattern: Box<[bool]>,
    num_trues: usize,
}

impl Puncturer {
    /// Creates a new puncturer.
    ///
    /// Returns an error if the pattern is empty or does not transmit any
    /// bit.
    pub fn new(pattern: &[bool]) -> Result<Puncturer, ConfigError> {
        let num_trues = pattern.iter().filter(|&&b| b).count();
        if num_trues == 0 {
            return Err(ConfigError::EmptyPattern);
        }
        Ok(Puncturer {
            pattern: pattern.into(),
            num_trues,
        })
    }

    /// Creates the puncturer of an EEP profile.
    ///
    /// The pattern of this puncturer covers a whole mother codeword, so that
    /// it is applied exactly once per CIF.
    pub fn for_profile(profile: &EepProfile) -> Puncturer {
        let pattern = profile.puncturing_sequence();
        Puncturer {
            num_trues: profile.punctured_codeword_len(),
            pattern: pattern.into(),
        }
    }

    /// Gives the puncturing pattern.
    pub fn pattern(&self) -> &[bool] {
        &self.pattern
    }

    /// Gives the number of transmitted bits in each period of the pattern.
    pub fn num_trues(&self) -> usize {
        self.num_trues
    }

    /// Returns the rate of the puncturer.
    ///
    /// The rate is the length of the pattern divided by the number of
    /// transmitted bits, so it is always greater or equal to one.
    pub fn rate(&self) -> f64 {
        self.pattern.len() as f64 / self.num_trues as f64
    }

    /// Puncture a codeword.
    ///
    /// An error is returned if the length of the codeword is not a multiple
    /// of the pattern length.
    pub fn puncture<T: Copy>(&self, codeword: &[T]) -> Result<Vec<T>, LengthError> {
        if codeword.len() % self.pattern.len() != 0 {
            return Err(LengthError::NotMultiple {
                len: codeword.len(),
                multiple: self.pattern.len(),
            });
        }
        let periods = codeword.len() / self.pattern.len();
        let mut output = Vec::with_capacity(periods * self.num_trues);
        output.extend(
            codeword
                .iter()
                .zip(self.pattern.iter().cycle())
                .filter_map(|(&x, &b)| if b { Some(x) } else { None }),
        );
        Ok(output)
    }

    /// Depuncture soft bits.
    ///
    /// The punctured positions are filled with `fill`. For soft bits, `fill`
    /// should be zero, which marks an erasure. The input length must be a
    /// multiple of the number of `true` elements in the pattern, and the
    /// output contains as many periods of the pattern as the input.
    pub fn depuncture<T: Copy>(&self, input: &[T], fill: T) -> Result<Vec<T>, LengthError> {
        if input.len() % self.num_trues != 0 {
            return Err(LengthError::NotMultiple {
                len: input.len(),
                multiple: self.num_trues,
            });
        }
        let periods = input.len() / self.num_trues;
        let mut output = Vec::with_capacity(periods * self.pattern.len());
        let mut input = input.iter();
        for _ in 0..periods {
            for &b in self.pattern.iter() {
                // the length check above guarantees that input has enough
                // elements
                output.push(if b {
                    input.next().copied().unwrap_or(fill)
                } else {
                    fill
                });
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subchannel::Protection;

    const PATTERN: [bool; 9] = [true, false, false, false, true, false, true, true, true];

    #[test]
    fn depuncture_fill() {
        let puncturer = Puncturer::new(&PATTERN).unwrap();
        let input = (0..10).collect::<Vec<i32>>();
        assert_eq!(
            puncturer.depuncture(&input, 77).unwrap(),
            [0, 77, 77, 77, 1, 77, 2, 3, 4, 5, 77, 77, 77, 6, 77, 7, 8, 9]
        );
        assert_eq!(
            puncturer.depuncture(&input, 0).unwrap(),
            [0, 0, 0, 0, 1, 0, 2, 3, 4, 5, 0, 0, 0, 6, 0, 7, 8, 9]
        );
    }

    #[test]
    fn depuncture_soft_bits() {
        let puncturer = Puncturer::new(&[true, true, false]).unwrap();
        assert_eq!(
            puncturer.depuncture(&[0.5f32, -0.5, 1.0, 0.25], 0.0).unwrap(),
            [0.5, -0.5, 0.0, 1.0, 0.25, 0.0]
        );
        assert_eq!(puncturer.rate(), 1.5);
    }

    #[test]
    fn puncture() {
        let puncturer = Puncturer::new(&PATTERN).unwrap();
        let codeword = (0..18).collect::<Vec<u8>>();
        assert_eq!(
            puncturer.puncture(&codeword).unwrap(),
            [0, 4, 6, 7, 8, 9, 13, 15, 16, 17]
        );
        assert_eq!(
            puncturer.puncture(&codeword[1..]),
            Err(LengthError::NotMultiple {
                len: 17,
                multiple: 9
            })
        );
    }

    #[test]
    fn invalid() {
        assert_eq!(Puncturer::new(&[]), Err(ConfigError::EmptyPattern));
        assert_eq!(
            Puncturer::new(&[false, false]),
            Err(ConfigError::EmptyPattern)
        );
        let puncturer = Puncturer::new(&PATTERN).unwrap();
        assert_eq!(
            puncturer.depuncture(&[0; 7], 0),
            Err(LengthError::NotMultiple {
                len: 7,
                multiple: 5
            })
        );
    }

    #[test]
    fn eep_profile() {
        let profile = EepProfile::new(Protection::from_index(2).unwrap(), 3).unwrap();
        let puncturer = Puncturer::for_profile(&profile);
        assert_eq!(puncturer.pattern().len(), 4 * 576 + 24);
        assert_eq!(puncturer.num_trues(), 18 * 64);
        let soft = vec![1.0f32; 18 * 64];
        let depunctured = puncturer.depuncture(&soft, 0.0).unwrap();
        assert_eq!(depunctured.len(), 4 * 576 + 24);
        assert_eq!(depunctured.iter().filter(|&&x| x == 1.0).count(), 18 * 64);
    }
}
