//! Time interleaving.
//!
//! The MSC is time interleaved with a convolutional interleaver of depth 16
//! CIFs. Bit `i` of a sub-channel CIF is delayed by `p(i mod 16)` CIFs at the
//! transmitter, and by `15 - p(i mod 16)` CIFs at the receiver, so that all
//! the bits see the same overall delay of 15 CIFs. See Section 12 in EN 300
//! 401.

use super::tables::{TIME_INTERLEAVING_DELAYS, TIME_INTERLEAVING_DEPTH};
use super::LengthError;

/// Direction of the time interleaver.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Interleaving, as done by the transmitter.
    Interleave,
    /// Deinterleaving, as done by the receiver.
    Deinterleave,
}

/// Time interleaver or deinterleaver.
///
/// The interleaver owns a ring buffer with the last 16 CIFs of the
/// sub-channel. It must be fed every CIF of the sub-channel in order.
#[derive(Debug, Clone)]
pub struct TimeInterleaver<T> {
    direction: Direction,
    len: usize,
    history: Box<[T]>,
    delays: [usize; TIME_INTERLEAVING_DEPTH],
    count: u64,
}

impl<T: Copy + Default> TimeInterleaver<T> {
    /// Creates a time interleaver for sub-channel CIFs of `len` bits.
    pub fn new(direction: Direction, len: usize) -> TimeInterleaver<T> {
        let delays = match direction {
            Direction::Interleave => TIME_INTERLEAVING_DELAYS,
            Direction::Deinterleave => TIME_INTERLEAVING_DELAYS.map(|d| 15 - d),
        };
        TimeInterleaver {
            direction,
            len,
            history: vec![T::default(); TIME_INTERLEAVING_DEPTH * len].into_boxed_slice(),
            delays,
            count: 0,
        }
    }

    /// Creates a time interleaver for the transmitter.
    pub fn interleaver(len: usize) -> TimeInterleaver<T> {
        TimeInterleaver::new(Direction::Interleave, len)
    }

    /// Creates a time deinterleaver for the receiver.
    pub fn deinterleaver(len: usize) -> TimeInterleaver<T> {
        TimeInterleaver::new(Direction::Deinterleave, len)
    }

    /// Gives the direction of the interleaver.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Gives the number of bits of each CIF.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the interleaver works on empty CIFs.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gives the number of CIFs processed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if the next output CIF will be complete.
    ///
    /// The first 15 CIFs produced contain positions that refer to CIFs
    /// preceding the start of the stream. These positions are filled with
    /// the default value of `T`.
    pub fn is_primed(&self) -> bool {
        self.count >= (TIME_INTERLEAVING_DEPTH - 1) as u64
    }

    /// Processes a CIF.
    ///
    /// The output is written to `output`. On success, this returns whether
    /// the output CIF is complete (see [`TimeInterleaver::is_primed`]). An
    /// error is returned if `input` or `output` do not have the CIF length.
    pub fn process_into(&mut self, input: &[T], output: &mut [T]) -> Result<bool, LengthError> {
        for got in [input.len(), output.len()] {
            if got != self.len {
                return Err(LengthError::Mismatch {
                    expected: self.len,
                    got,
                });
            }
        }
        let complete = self.is_primed();
        let slot = (self.count % TIME_INTERLEAVING_DEPTH as u64) as usize;
        self.history[slot * self.len..(slot + 1) * self.len].copy_from_slice(input);
        // ring buffer offset of the CIF read for each delay phase
        let offsets: [usize; TIME_INTERLEAVING_DEPTH] = std::array::from_fn(|j| {
            let delay = self.delays[j];
            (slot + TIME_INTERLEAVING_DEPTH - delay) % TIME_INTERLEAVING_DEPTH * self.len
        });
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.history[offsets[i % TIME_INTERLEAVING_DEPTH] + i];
        }
        self.count += 1;
        Ok(complete)
    }

    /// Processes a CIF, returning the output CIF and whether it is complete.
    pub fn process(&mut self, input: &[T]) -> Result<(Vec<T>, bool), LengthError> {
        let mut output = vec![T::default(); self.len];
        let complete = self.process_into(input, &mut output)?;
        Ok((output, complete))
    }

    /// Clears the history of the interleaver.
    pub fn reset(&mut self) {
        self.history.fill(T::default());
        self.count = 0;
    }
}
