//! Convolutional coding.
//!
//! The MSC uses a rate 1/4 mother code with constraint length 7 and
//! generators 133, 171, 145 and 133 (octal). The trellis has 64 states and
//! it is terminated by 6 zero tail bits. See Section 11.1 in EN 300 401.
//!
//! This module contains the encoder and a soft-decision Viterbi decoder
//! working with Euclidean branch metrics.

use super::tables::{CONSTRAINT_LENGTH, GENERATORS, TAIL_CODED_BITS, TAIL_INPUT_BITS};
use super::{BitSlice, LengthError};
use bitvec::prelude::*;
use bytes::Bytes;

const NUM_OUTPUTS: usize = GENERATORS.len();
const NUM_STATES: usize = 1 << (CONSTRAINT_LENGTH - 1);
const STATE_MASK: u8 = (NUM_STATES - 1) as u8;
const REGISTER_MASK: u8 = (1 << CONSTRAINT_LENGTH) - 1;

lazy_static::lazy_static! {
    // Output symbol for each value of the shift register. The current input
    // is in bit 0 of the register, and the output of the first generator is
    // in bit 3 of the symbol.
    static ref SYMBOLS: [u8; 1 << CONSTRAINT_LENGTH] = {
        let masks = GENERATORS.map(|g| g.reverse_bits() >> (8 - CONSTRAINT_LENGTH));
        core::array::from_fn(|reg| {
            masks
                .iter()
                .fold(0, |sym, &mask| (sym << 1) | ((reg as u8 & mask).count_ones() & 1) as u8)
        })
    };

    // Soft values of each of the 16 possible symbols.
    static ref SOFT_SYMBOLS: [[f32; NUM_OUTPUTS]; 1 << NUM_OUTPUTS] = core::array::from_fn(|sym| {
        core::array::from_fn(|j| {
            let bit = (sym >> (NUM_OUTPUTS - 1 - j)) & 1;
            soft_bit(bit == 1)
        })
    });
}

/// Soft value of a transmitted bit.
///
/// Bit `b` is mapped to `(1 - 2b) / sqrt(2)`.
pub fn soft_bit(bit: bool) -> f32 {
    if bit {
        -std::f32::consts::FRAC_1_SQRT_2
    } else {
        std::f32::consts::FRAC_1_SQRT_2
    }
}

/// Hard decision of a soft value.
///
/// Returns `None` for erasures (a soft value of zero).
pub fn hard_bit(soft: f32) -> Option<bool> {
    if soft == 0.0 {
        None
    } else {
        Some(soft < 0.0)
    }
}

/// Convolutional encoder.
///
/// The encoder can be used in streaming fashion with [`ConvEncoder::encode`]
/// and [`ConvEncoder::terminate`], or to encode a whole block with
/// [`ConvEncoder::encode_block`].
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct ConvEncoder {
    register: u8,
}

impl ConvEncoder {
    /// Creates a new encoder in the all-zeros state.
    pub fn new() -> ConvEncoder {
        ConvEncoder::default()
    }

    /// Shifts a bit into the encoder and returns the 4-bit output symbol.
    ///
    /// The output of the first generator is in the MSB of the symbol.
    pub fn push(&mut self, bit: bool) -> u8 {
        self.register = ((self.register << 1) | u8::from(bit)) & REGISTER_MASK;
        SYMBOLS[usize::from(self.register)]
    }

    /// Encodes bits, without terminating the trellis.
    pub fn encode(&mut self, bits: &[bool]) -> Vec<bool> {
        let mut output = Vec::with_capacity(NUM_OUTPUTS * bits.len());
        for &bit in bits {
            let sym = self.push(bit);
            output.extend((0..NUM_OUTPUTS).rev().map(|j| (sym >> j) & 1 == 1));
        }
        output
    }

    /// Terminates the trellis by encoding the 6 zero tail bits.
    ///
    /// This returns the 24 coded tail bits and leaves the encoder in the
    /// all-zeros state.
    pub fn terminate(&mut self) -> Vec<bool> {
        let tail = self.encode(&[false; TAIL_INPUT_BITS]);
        debug_assert_eq!(self.register & STATE_MASK, 0);
        self.register = 0;
        tail
    }

    /// Encodes a block of bits starting and ending in the all-zeros state.
    ///
    /// The output has `4 * (bits.len() + 6)` bits.
    pub fn encode_block(bits: &[bool]) -> Vec<bool> {
        let mut encoder = ConvEncoder::new();
        let mut output = encoder.encode(bits);
        output.extend(encoder.terminate());
        output
    }

    /// Encodes a packed frame of bytes.
    ///
    /// The bits of `frame` are taken MSB-first and encoded as a terminated
    /// block. The output is packed MSB-first and has `4 * frame.len() + 3`
    /// bytes.
    pub fn encode_bytes(frame: &[u8]) -> Bytes {
        let mut encoder = ConvEncoder::new();
        let mut output: BitVec<u8, Msb0> =
            BitVec::with_capacity(NUM_OUTPUTS * (8 * frame.len() + TAIL_INPUT_BITS));
        let input = BitSlice::from_slice(frame)
            .iter()
            .by_vals()
            .chain(std::iter::repeat(false).take(TAIL_INPUT_BITS));
        for bit in input {
            let sym = encoder.push(bit);
            for j in (0..NUM_OUTPUTS).rev() {
                output.push((sym >> j) & 1 == 1);
            }
        }
        Bytes::from(output.into_vec())
    }
}

/// Convolutional encoder for streams of packed frames.
///
/// The input byte stream is split into frames of a fixed number of bytes,
/// and each frame is encoded as a terminated block with
/// [`ConvEncoder::encode_bytes`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ByteConvEncoder {
    frame_len: usize,
}

impl ByteConvEncoder {
    /// Creates an encoder for frames of `frame_len` bytes.
    pub fn new(frame_len: usize) -> ByteConvEncoder {
        ByteConvEncoder { frame_len }
    }

    /// Gives the frame length in bytes.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Encodes a stream of frames.
    ///
    /// An error is returned if the length of `data` is not a multiple of the
    /// frame length.
    pub fn encode(&self, data: &[u8]) -> Result<Bytes, LengthError> {
        if self.frame_len == 0 || data.len() % self.frame_len != 0 {
            return Err(LengthError::NotMultiple {
                len: data.len(),
                multiple: self.frame_len,
            });
        }
        Ok(data
            .chunks_exact(self.frame_len)
            .flat_map(ConvEncoder::encode_bytes)
            .collect())
    }
}

/// Output of the Viterbi decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Decoded bits, including the tail bits.
    pub bits: Vec<bool>,
    /// Number of non-erased soft values whose hard decision disagrees with
    /// the re-encoded decoded bits.
    pub corrected_errors: usize,
    /// Accumulated Euclidean metric of the survivor path.
    pub path_metric: f32,
}

/// Soft-decision Viterbi decoder.
///
/// The decoder works on terminated blocks of a fixed length. The trellis
/// starts and ends in the all-zeros state.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    info_bits: usize,
    // decisions[t] has bit `s` set if the survivor into state `s` at step
    // `t` comes from the predecessor with the MSB set
    decisions: Vec<u64>,
}

impl ViterbiDecoder {
    /// Creates a decoder for blocks of `info_bits` information bits.
    pub fn new(info_bits: usize) -> ViterbiDecoder {
        ViterbiDecoder {
            info_bits,
            decisions: Vec::with_capacity(info_bits + TAIL_INPUT_BITS),
        }
    }

    /// Gives the number of information bits of each block.
    pub fn info_bits(&self) -> usize {
        self.info_bits
    }

    /// Gives the number of decoded bits (information bits plus tail).
    pub fn output_len(&self) -> usize {
        self.info_bits + TAIL_INPUT_BITS
    }

    /// Gives the number of soft values expected by the decoder.
    pub fn input_len(&self) -> usize {
        NUM_OUTPUTS * self.info_bits + TAIL_CODED_BITS
    }

    /// Decodes a block of soft values.
    ///
    /// The soft values follow the `(1 - 2b) / sqrt(2)` mapping, with zero
    /// marking an erasure. An error is returned if the length of `soft` is
    /// not [`ViterbiDecoder::input_len`].
    pub fn decode(&mut self, soft: &[f32]) -> Result<Decoded, LengthError> {
        if soft.len() != self.input_len() {
            return Err(LengthError::Mismatch {
                expected: self.input_len(),
                got: soft.len(),
            });
        }
        self.decisions.clear();
        let mut metrics = [f32::INFINITY; NUM_STATES];
        metrics[0] = 0.0;
        let mut normalization = 0.0f32;
        for received in soft.chunks_exact(NUM_OUTPUTS) {
            let branch: [f32; 1 << NUM_OUTPUTS] = core::array::from_fn(|sym| {
                received
                    .iter()
                    .zip(SOFT_SYMBOLS[sym].iter())
                    .map(|(r, s)| (r - s) * (r - s))
                    .sum()
            });
            let mut next = [0.0f32; NUM_STATES];
            let mut decisions = 0u64;
            for (ns, metric) in next.iter_mut().enumerate() {
                let pred = ns >> 1;
                let pred_msb = pred | (NUM_STATES >> 1);
                // the shift register holds ns for the transition from pred,
                // and ns with bit 6 set for the transition from pred_msb
                let m0 = metrics[pred] + branch[usize::from(SYMBOLS[ns])];
                let m1 = metrics[pred_msb] + branch[usize::from(SYMBOLS[ns | NUM_STATES])];
                if m1 < m0 {
                    *metric = m1;
                    decisions |= 1 << ns;
                } else {
                    *metric = m0;
                }
            }
            let min = next.iter().copied().fold(f32::INFINITY, f32::min);
            for metric in next.iter_mut() {
                *metric -= min;
            }
            normalization += min;
            metrics = next;
            self.decisions.push(decisions);
        }

        let mut bits = vec![false; self.output_len()];
        let mut state = 0usize;
        for (bit, &decisions) in bits.iter_mut().zip(self.decisions.iter()).rev() {
            *bit = state & 1 == 1;
            let msb = ((decisions >> state) & 1) as usize;
            state = (state >> 1) | (msb * (NUM_STATES >> 1));
        }
        debug_assert_eq!(state, 0);

        let mut encoder = ConvEncoder::new();
        let corrected_errors = bits
            .iter()
            .zip(soft.chunks_exact(NUM_OUTPUTS))
            .map(|(&bit, received)| {
                let sym = encoder.push(bit);
                received
                    .iter()
                    .enumerate()
                    .filter(|&(j, &r)| {
                        let expected = (sym >> (NUM_OUTPUTS - 1 - j)) & 1 == 1;
                        hard_bit(r).is_some_and(|h| h != expected)
                    })
                    .count()
            })
            .sum();
        let path_metric = normalization + metrics[0];
        log::trace!(
            "Viterbi decoded {} bits with {} corrected errors (path metric {})",
            bits.len(),
            corrected_errors,
            path_metric
        );
        Ok(Decoded {
            bits,
            corrected_errors,
            path_metric,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    fn soft(bits: &[bool]) -> Vec<f32> {
        bits.iter().map(|&b| soft_bit(b)).collect()
    }

    #[test]
    fn symbol_table() {
        // a single one at the input produces the impulse responses of the
        // four generators
        let mut encoder = ConvEncoder::new();
        let mut responses = [0u8; NUM_OUTPUTS];
        for (k, bit) in std::iter::once(true)
            .chain(std::iter::repeat(false).take(6))
            .enumerate()
        {
            let sym = encoder.push(bit);
            for (j, response) in responses.iter_mut().enumerate() {
                *response |= ((sym >> (NUM_OUTPUTS - 1 - j)) & 1) << (6 - k);
            }
        }
        assert_eq!(responses, GENERATORS);
    }

    #[test]
    fn encode_bytes() {
        let encoded = ConvEncoder::encode_bytes(&hex!("05 00"));
        assert_eq!(&encoded[..], &hex!("00 00 0f 62 bf 4d 9f 00 00 00 00"));
        let encoder = ByteConvEncoder::new(2);
        assert_eq!(
            &encoder.encode(&hex!("05 00 05 00")).unwrap()[..],
            &hex!("00 00 0f 62 bf 4d 9f 00 00 00 00 00 00 0f 62 bf 4d 9f 00 00 00 00")
        );
        assert_eq!(
            encoder.encode(&hex!("05 00 05")),
            Err(LengthError::NotMultiple {
                len: 3,
                multiple: 2
            })
        );
    }

    #[test]
    fn encode_block_length() {
        let bits = [true, false, true, true, false];
        let encoded = ConvEncoder::encode_block(&bits);
        assert_eq!(encoded.len(), 4 * (5 + 6));
        // the streaming interface gives the same result
        let mut encoder = ConvEncoder::new();
        let mut streamed = encoder.encode(&bits[..2]);
        streamed.extend(encoder.encode(&bits[2..]));
        streamed.extend(encoder.terminate());
        assert_eq!(streamed, encoded);
    }

    #[test]
    fn decode_all_zeros() {
        let bits = vec![false; 192];
        let mut decoder = ViterbiDecoder::new(192);
        let decoded = decoder.decode(&soft(&ConvEncoder::encode_block(&bits))).unwrap();
        assert_eq!(&decoded.bits[..192], &bits[..]);
        assert!(decoded.bits[192..].iter().all(|&b| !b));
        assert_eq!(decoded.corrected_errors, 0);
        assert!(decoded.path_metric.abs() < 1e-3);
    }

    #[test]
    fn decode_alternating() {
        let bits = (0..384).map(|j| j % 2 == 1).collect::<Vec<bool>>();
        let mut decoder = ViterbiDecoder::new(384);
        let decoded = decoder.decode(&soft(&ConvEncoder::encode_block(&bits))).unwrap();
        assert_eq!(&decoded.bits[..384], &bits[..]);
        assert_eq!(decoded.corrected_errors, 0);
    }

    #[test]
    fn decode_with_errors_and_erasures() {
        let bits = (0..192).map(|j| (j * 7 + j / 5) % 3 == 0).collect::<Vec<bool>>();
        let mut received = soft(&ConvEncoder::encode_block(&bits));
        // sparse bit flips
        for j in [10, 150, 400, 700] {
            received[j] = -received[j];
        }
        // erase one in every four values
        for j in (3..received.len()).step_by(4) {
            received[j] = 0.0;
        }
        let mut decoder = ViterbiDecoder::new(192);
        let decoded = decoder.decode(&received).unwrap();
        assert_eq!(&decoded.bits[..192], &bits[..]);
        assert_eq!(decoded.corrected_errors, 4);
        assert!(decoded.path_metric > 0.0);
    }

    #[test]
    fn wrong_length() {
        let mut decoder = ViterbiDecoder::new(192);
        assert_eq!(decoder.input_len(), 792);
        assert_eq!(decoder.output_len(), 198);
        assert_eq!(
            decoder.decode(&[0.0; 791]),
            Err(LengthError::Mismatch {
                expected: 792,
                got: 791
            })
        );
    }

    #[test]
    fn hard_decisions() {
        assert_eq!(hard_bit(soft_bit(false)), Some(false));
        assert_eq!(hard_bit(soft_bit(true)), Some(true));
        assert_eq!(hard_bit(0.0), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encode_decode(bits in proptest::collection::vec(any::<bool>(), 0..=256)) {
            let encoded = ConvEncoder::encode_block(&bits);
            let soft = encoded.iter().map(|&b| soft_bit(b)).collect::<Vec<f32>>();
            let mut decoder = ViterbiDecoder::new(bits.len());
            let decoded = decoder.decode(&soft).unwrap();
            prop_assert_eq!(&decoded.bits[..bits.len()], &bits[..]);
            prop_assert_eq!(decoded.corrected_errors, 0);
        }

        #[test]
        fn garbage_input(soft in proptest::collection::vec(-2.0f32..2.0, 24..=24 + 4 * 64)) {
            let info_bits = (soft.len() - 24) / 4;
            let mut decoder = ViterbiDecoder::new(info_bits);
            let soft = &soft[..decoder.input_len()];
            let decoded = decoder.decode(soft).unwrap();
            prop_assert_eq!(decoded.bits.len(), info_bits + 6);
            prop_assert!(decoded.bits[info_bits..].iter().all(|&b| !b));
        }
    }
}
