//! Standard tables of ETSI EN 300 401.
//!
//! All the bit-exact constants used by the MSC coding chain live here, so
//! that every other module refers to them by name. See
//! [EN 300 401](https://www.etsi.org/deliver/etsi_en/300400_300499/300401/02.01.01_60/en_300401v020101p.pdf),
//! sections 10 (energy dispersal), 11 (convolutional coding) and 12 (time
//! interleaving).

/// Number of bits in a Capacity Unit.
pub const CU_BITS: usize = 64;

/// Number of Capacity Units in a Common Interleaved Frame.
pub const CUS_PER_CIF: usize = 864;

/// Length of a puncturing vector in bits.
pub const PUNCTURING_VECTOR_LEN: usize = 32;

/// Number of puncturing vectors applied in a row to each block of 128
/// mother-code bits.
pub const VECTORS_PER_BLOCK: usize = 4;

/// Number of mother-code bits in a puncturing block.
pub const BLOCK_BITS: usize = PUNCTURING_VECTOR_LEN * VECTORS_PER_BLOCK;

/// Puncturing vectors V_PI of Table 31, for PI = 1, ..., 24.
///
/// Bit 31 of each word is the first bit of the vector. The vector with index
/// `PI` has `8 + PI` ones.
pub const PUNCTURING_VECTORS: [u32; 24] = [
    0b1100_1000_1000_1000_1000_1000_1000_1000,
    0b1100_1000_1000_1000_1100_1000_1000_1000,
    0b1100_1000_1100_1000_1100_1000_1000_1000,
    0b1100_1000_1100_1000_1100_1000_1100_1000,
    0b1100_1100_1100_1000_1100_1000_1100_1000,
    0b1100_1100_1100_1000_1100_1100_1100_1000,
    0b1100_1100_1100_1100_1100_1100_1100_1000,
    0b1100_1100_1100_1100_1100_1100_1100_1100,
    0b1110_1100_1100_1100_1100_1100_1100_1100,
    0b1110_1100_1100_1100_1110_1100_1100_1100,
    0b1110_1100_1110_1100_1110_1100_1100_1100,
    0b1110_1100_1110_1100_1110_1100_1110_1100,
    0b1110_1110_1110_1100_1110_1100_1110_1100,
    0b1110_1110_1110_1100_1110_1110_1110_1100,
    0b1110_1110_1110_1110_1110_1110_1110_1100,
    0b1110_1110_1110_1110_1110_1110_1110_1110,
    0b1111_1110_1110_1110_1110_1110_1110_1110,
    0b1111_1110_1110_1110_1111_1110_1110_1110,
    0b1111_1110_1111_1110_1111_1110_1110_1110,
    0b1111_1110_1111_1110_1111_1110_1111_1110,
    0b1111_1111_1111_1110_1111_1110_1111_1110,
    0b1111_1111_1111_1110_1111_1111_1111_1110,
    0b1111_1111_1111_1111_1111_1111_1111_1110,
    0b1111_1111_1111_1111_1111_1111_1111_1111,
];

/// Puncturing vector V_T applied to the 24 tail bits of the mother code.
pub const PUNCTURING_TAIL_VECTOR: [bool; 24] = [
    true, true, false, false, true, true, false, false, true, true, false, false, true, true,
    false, false, true, true, false, false, true, true, false, false,
];

/// Number of zero bits appended to the encoder input to terminate the trellis.
pub const TAIL_INPUT_BITS: usize = 6;

/// Number of mother-code bits produced by the tail.
pub const TAIL_CODED_BITS: usize = 4 * TAIL_INPUT_BITS;

/// Constraint length of the mother code.
pub const CONSTRAINT_LENGTH: usize = 7;

/// Generator polynomials of the mother code, in octal, with the MSB applied
/// to the current input bit.
pub const GENERATORS: [u8; 4] = [0o133, 0o171, 0o145, 0o133];

/// Time interleaving permutation: bit `i` of a CIF is delayed by
/// `TIME_INTERLEAVING_DELAYS[i % 16]` CIFs at the transmitter.
pub const TIME_INTERLEAVING_DELAYS: [usize; 16] =
    [0, 8, 4, 12, 2, 10, 6, 14, 1, 9, 5, 13, 3, 11, 7, 15];

/// Depth of the time interleaver in CIFs.
pub const TIME_INTERLEAVING_DEPTH: usize = 16;

/// Length of the energy dispersal PRBS shift register.
pub const PRBS_DEGREE: u32 = 9;

/// Tap of the PRBS generator polynomial x^9 + x^5 + 1 besides x^9.
pub const PRBS_TAP: u32 = 5;

/// Initial state of the PRBS shift register (all ones).
pub const PRBS_INIT: u16 = 0x1ff;

/// Returns the puncturing vector V_PI as a bit iterator, or `None` if `pi`
/// is not in `1..=24`.
pub fn puncturing_vector(pi: usize) -> Option<impl Iterator<Item = bool> + Clone> {
    let word = *PUNCTURING_VECTORS.get(pi.checked_sub(1)?)?;
    Some((0..PUNCTURING_VECTOR_LEN).map(move |j| (word >> (31 - j)) & 1 == 1))
}

/// Number of ones in the puncturing vector V_PI.
///
/// # Panics
///
/// Panics if `pi` is not in `1..=24`.
pub fn puncturing_vector_ones(pi: usize) -> usize {
    PUNCTURING_VECTORS[pi - 1].count_ones() as usize
}
