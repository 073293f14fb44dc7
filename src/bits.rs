//! Bit-level reshaping.
//!
//! This module removes the convolutional tail from decoded blocks and
//! converts between unpacked bits and MSB-first packed bytes.

use super::tables::TAIL_INPUT_BITS;
use super::{BitSlice, LengthError};
use bitvec::prelude::*;
use bytes::Bytes;

/// Tail pruner.
///
/// Removes the tail bits that terminate the trellis from the end of each
/// decoded block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TailPruner {
    info_bits: usize,
    tail_bits: usize,
}

impl TailPruner {
    /// Creates a pruner for blocks of `info_bits` information bits followed
    /// by the 6 convolutional tail bits.
    pub fn new(info_bits: usize) -> TailPruner {
        TailPruner::with_tail(info_bits, TAIL_INPUT_BITS)
    }

    /// Creates a pruner with a custom number of tail bits.
    pub fn with_tail(info_bits: usize, tail_bits: usize) -> TailPruner {
        TailPruner {
            info_bits,
            tail_bits,
        }
    }

    /// Gives the number of information bits kept.
    pub fn info_bits(&self) -> usize {
        self.info_bits
    }

    /// Gives the number of tail bits removed.
    pub fn tail_bits(&self) -> usize {
        self.tail_bits
    }

    /// Prunes the tail of a decoded block.
    ///
    /// An error is returned if the block does not have exactly
    /// `info_bits + tail_bits` elements.
    pub fn prune<'a, T>(&self, block: &'a [T]) -> Result<&'a [T], LengthError> {
        let expected = self.info_bits + self.tail_bits;
        if block.len() != expected {
            return Err(LengthError::Mismatch {
                expected,
                got: block.len(),
            });
        }
        Ok(&block[..self.info_bits])
    }
}

/// Packs bits into bytes, MSB-first.
///
/// An error is returned if the number of bits is not a multiple of 8.
pub fn pack_bits(bits: &[bool]) -> Result<Bytes, LengthError> {
    if bits.len() % 8 != 0 {
        return Err(LengthError::NotMultiple {
            len: bits.len(),
            multiple: 8,
        });
    }
    let packed: BitVec<u8, Msb0> = bits.iter().copied().collect();
    Ok(Bytes::from(packed.into_vec()))
}

/// Unpacks bytes into bits, MSB-first.
pub fn unpack_bits(bytes: &[u8]) -> Vec<bool> {
    BitSlice::from_slice(bytes).iter().by_vals().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn pack() {
        let bits = [
            false, false, false, false, false, true, false, true, true, false, false, false,
            false, false, false, true,
        ];
        assert_eq!(&pack_bits(&bits).unwrap()[..], &hex!("05 81"));
        assert_eq!(
            pack_bits(&bits[..15]),
            Err(LengthError::NotMultiple {
                len: 15,
                multiple: 8
            })
        );
        assert!(pack_bits(&[]).unwrap().is_empty());
    }

    #[test]
    fn unpack() {
        let bits = unpack_bits(&hex!("a0 01"));
        assert_eq!(bits.len(), 16);
        assert!(bits[0] && !bits[1] && bits[2] && bits[15]);
        assert_eq!(bits.iter().filter(|&&b| b).count(), 3);
    }

    #[test]
    fn prune() {
        let pruner = TailPruner::new(16);
        let block = (0..22).collect::<Vec<u32>>();
        assert_eq!(pruner.prune(&block).unwrap(), &block[..16]);
        assert_eq!(
            pruner.prune(&block[..21]),
            Err(LengthError::Mismatch {
                expected: 22,
                got: 21
            })
        );
        assert_eq!(TailPruner::with_tail(4, 0).prune(&[1, 2, 3, 4]), Ok(&[1, 2, 3, 4][..]));
    }
}
