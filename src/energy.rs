//! Energy dispersal.
//!
//! The information bits of each sub-channel are scrambled with the PRBS
//! generated by the polynomial x^9 + x^5 + 1. The generator is reset to the
//! all-ones state at the start of every CIF, so scrambling and descrambling
//! are the same operation. See Section 10 in EN 300 401.

use super::tables::{PRBS_DEGREE, PRBS_INIT, PRBS_TAP};
use super::LengthError;
use bitvec::prelude::*;

/// Energy dispersal PRBS generator.
///
/// This is an iterator that produces the PRBS bits indefinitely.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Prbs {
    register: u16,
}

impl Prbs {
    /// Creates a PRBS generator in its initial state.
    pub fn new() -> Prbs {
        Prbs {
            register: PRBS_INIT,
        }
    }
}

impl Default for Prbs {
    fn default() -> Prbs {
        Prbs::new()
    }
}

impl Iterator for Prbs {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let mask = (1 << PRBS_DEGREE) - 1;
        let bit = ((self.register >> (PRBS_DEGREE - 1)) ^ (self.register >> (PRBS_TAP - 1))) & 1;
        self.register = ((self.register << 1) | bit) & mask;
        Some(bit == 1)
    }
}

/// Returns the first `len` bits of the PRBS.
pub fn prbs(len: usize) -> Vec<bool> {
    Prbs::new().take(len).collect()
}

/// Energy dispersal scrambler.
///
/// The scrambler holds the PRBS for blocks of a fixed number of bits, both
/// unpacked and packed MSB-first. The same scrambler is used to descramble.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EnergyDispersal {
    sequence: Vec<bool>,
    packed: Vec<u8>,
}

impl EnergyDispersal {
    /// Creates a scrambler for blocks of `len` bits.
    pub fn new(len: usize) -> EnergyDispersal {
        let sequence = prbs(len);
        let packed = sequence.iter().copied().collect::<BitVec<u8, Msb0>>().into_vec();
        EnergyDispersal { sequence, packed }
    }

    /// Gives the block length in bits.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` if the block length is zero.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Gives the PRBS used by the scrambler.
    pub fn sequence(&self) -> &[bool] {
        &self.sequence
    }

    /// Scrambles (or descrambles) a block of bits in place.
    ///
    /// An error is returned if the block length is wrong.
    pub fn scramble(&self, bits: &mut [bool]) -> Result<(), LengthError> {
        if bits.len() != self.sequence.len() {
            return Err(LengthError::Mismatch {
                expected: self.sequence.len(),
                got: bits.len(),
            });
        }
        for (bit, &p) in bits.iter_mut().zip(self.sequence.iter()) {
            *bit ^= p;
        }
        Ok(())
    }

    /// Scrambles (or descrambles) a block of packed bytes in place.
    ///
    /// The bytes must contain exactly the bits of a block, so the block
    /// length must be a multiple of 8.
    pub fn scramble_bytes(&self, bytes: &mut [u8]) -> Result<(), LengthError> {
        if 8 * bytes.len() != self.sequence.len() {
            return Err(LengthError::Mismatch {
                expected: self.sequence.len(),
                got: 8 * bytes.len(),
            });
        }
        for (byte, &p) in bytes.iter_mut().zip(self.packed.iter()) {
            *byte ^= p;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn first_bits() {
        let expected = [
            0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 0,
        ]
        .map(|b| b == 1);
        assert_eq!(prbs(16), expected);
        // the PRBS has period 511
        let long = prbs(511 + 16);
        assert_eq!(&long[511..], &expected[..]);
    }

    #[test]
    fn scramble_bytes() {
        let scrambler = EnergyDispersal::new(24);
        let mut data = [0u8; 3];
        scrambler.scramble_bytes(&mut data).unwrap();
        assert_eq!(&data[..2], &hex!("07 be"));
        scrambler.scramble_bytes(&mut data).unwrap();
        assert_eq!(data, [0; 3]);
        assert_eq!(
            scrambler.scramble_bytes(&mut [0; 2]),
            Err(LengthError::Mismatch {
                expected: 24,
                got: 16
            })
        );
    }

    #[test]
    fn bits_and_bytes_agree() {
        let scrambler = EnergyDispersal::new(576);
        let mut bits = vec![false; 576];
        scrambler.scramble(&mut bits).unwrap();
        let mut bytes = vec![0u8; 72];
        scrambler.scramble_bytes(&mut bytes).unwrap();
        assert_eq!(crate::bits::unpack_bits(&bytes), bits);
        assert_eq!(bits, scrambler.sequence());
    }
}
