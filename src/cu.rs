//! Capacity Unit repartitioning and sub-channel selection.
//!
//! The soft bits of the MSC OFDM symbols are regrouped into Common
//! Interleaved Frames, each formed by 864 Capacity Units of 64 bits. Only the
//! CUs of the configured sub-channel are kept. See Section 11 in EN 300 401.

use super::mode::ModeParameters;
use super::subchannel::SubChannel;
use super::LengthError;
use num_complex::Complex32;

/// Splits the differentially demodulated carriers of an OFDM symbol into soft
/// bits.
///
/// The QPSK symbol of carrier `k` carries bit `k` in its real part and bit
/// `K + k` in its imaginary part, where `K` is the number of carriers. The
/// output therefore contains the real parts of all the carriers followed by
/// their imaginary parts.
pub fn qpsk_soft_bits(carriers: &[Complex32]) -> Vec<f32> {
    carriers
        .iter()
        .map(|c| c.re)
        .chain(carriers.iter().map(|c| c.im))
        .collect()
}

/// CIF assembler.
///
/// This receives a stream of soft bits in arbitrary chunks and regroups them
/// into complete CIFs. The first soft bit pushed must be the first bit of a
/// CIF.
#[derive(Debug, Clone)]
pub struct CifAssembler<T> {
    buffer: Box<[T]>,
    occupied: usize,
}

impl<T: Copy + Default> CifAssembler<T> {
    /// Creates a new CIF assembler for CIFs of `cif_bits` soft bits.
    pub fn new(cif_bits: usize) -> CifAssembler<T> {
        CifAssembler {
            buffer: vec![T::default(); cif_bits].into_boxed_slice(),
            occupied: 0,
        }
    }

    /// Gives the number of soft bits of a CIF.
    pub fn cif_bits(&self) -> usize {
        self.buffer.len()
    }

    /// Gives the number of soft bits of the partial CIF held by the assembler.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Pushes soft bits into the assembler.
    ///
    /// The `on_cif` closure is called with every CIF that gets completed.
    /// Leftover soft bits are kept for the next call.
    pub fn push<F>(&mut self, mut bits: &[T], mut on_cif: F)
    where
        F: FnMut(&[T]),
    {
        while !bits.is_empty() {
            let take = (self.buffer.len() - self.occupied).min(bits.len());
            let (head, tail) = bits.split_at(take);
            self.buffer[self.occupied..self.occupied + take].copy_from_slice(head);
            self.occupied += take;
            bits = tail;
            if self.occupied == self.buffer.len() {
                self.occupied = 0;
                on_cif(&self.buffer[..]);
            }
        }
    }

    /// Drops the partial CIF held by the assembler.
    pub fn reset(&mut self) {
        self.occupied = 0;
    }
}

/// Sub-channel selector.
///
/// Extracts the soft bits of the CUs belonging to a sub-channel from a CIF.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CuSelector {
    cif_bits: usize,
    start: usize,
    end: usize,
}

impl CuSelector {
    /// Creates a selector for a sub-channel.
    pub fn new(params: &ModeParameters, subchannel: &SubChannel) -> CuSelector {
        let cus = subchannel.cus();
        CuSelector {
            cif_bits: params.cif_bits(),
            start: cus.start * params.cu_size(),
            end: cus.end * params.cu_size(),
        }
    }

    /// Gives the number of soft bits of the sub-channel in each CIF.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the selector extracts no bits.
    ///
    /// This always returns `false`, since sub-channels have at least one CU.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Selects the sub-channel soft bits of a CIF.
    ///
    /// Returns an error if `cif` does not have the length of a CIF.
    pub fn select<'a, T>(&self, cif: &'a [T]) -> Result<&'a [T], LengthError> {
        if cif.len() != self.cif_bits {
            return Err(LengthError::Mismatch {
                expected: self.cif_bits,
                got: cif.len(),
            });
        }
        Ok(&cif[self.start..self.end])
    }

    /// Writes the sub-channel bits into a CIF.
    ///
    /// This is the inverse of [`CuSelector::select`]. The bits of other
    /// sub-channels in `cif` are left untouched.
    pub fn insert<T: Copy>(&self, cif: &mut [T], subchannel: &[T]) -> Result<(), LengthError> {
        if cif.len() != self.cif_bits {
            return Err(LengthError::Mismatch {
                expected: self.cif_bits,
                got: cif.len(),
            });
        }
        if subchannel.len() != self.len() {
            return Err(LengthError::Mismatch {
                expected: self.len(),
                got: subchannel.len(),
            });
        }
        cif[self.start..self.end].copy_from_slice(subchannel);
        Ok(())
    }
}
