//! DAB MSC sub-channel decoding and encoding.
//!
//! This crate implements the channel coding of the Main Service Channel (MSC)
//! of DAB and DAB+ according to
//! [EN 300 401](https://www.etsi.org/deliver/etsi_en/300400_300499/300401/02.01.01_60/en_300401v020101p.pdf).
//! Given the soft bits of the MSC OFDM symbols, it extracts one sub-channel,
//! undoes the time interleaving, the EEP puncturing and the convolutional
//! code, removes the energy dispersal scrambling and produces the packed
//! bytes of the sub-channel, ready for the outer layers (DAB+ superframes,
//! MP2 audio, packet mode data).
//!
//! The crate also contains the transmitter side of the chain, and it can be
//! used as a CLI application that decodes or encodes files of soft bits.
//! OFDM demodulation, FIC parsing and the outer Reed-Solomon code are out of
//! scope.

#![warn(missing_docs)]

use thiserror::Error;

type BitSlice = bitvec::slice::BitSlice<u8, bitvec::order::Msb0>;

pub mod bits;
pub mod convolutional;
pub mod cu;
pub mod energy;
pub mod interleave;
pub mod mode;
pub mod msc;
pub mod puncture;
pub mod subchannel;
pub mod tables;

#[cfg(feature = "cli")]
pub mod cli;

/// Configuration error.
///
/// These errors are detected when a decoder or encoder is built. They are
/// never produced while processing data.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConfigError {
    /// The transmission mode is not in `1..=4`.
    #[error("invalid transmission mode {0}")]
    InvalidMode(u8),
    /// The sample rate is not finite and positive.
    #[error("invalid sample rate")]
    InvalidSampleRate,
    /// The protection profile is not a supported EEP profile.
    #[error("invalid or unsupported protection profile")]
    InvalidProtection,
    /// The sub-channel has no CUs.
    #[error("the sub-channel is empty")]
    EmptySubChannel,
    /// The sub-channel address is outside the CIF.
    #[error("sub-channel address {0} is outside the CIF")]
    AddressOutOfRange(usize),
    /// The sub-channel extends beyond the end of the CIF.
    #[error("sub-channel (address = {address}, size = {size}) extends beyond the end of the CIF")]
    SubChannelOutOfRange {
        /// Sub-channel address in CUs.
        address: usize,
        /// Sub-channel size in CUs.
        size: usize,
    },
    /// The sub-channel size is not a multiple of the protection profile size
    /// multiple.
    #[error("sub-channel size {size} is not a multiple of {multiple}")]
    SizeNotMultiple {
        /// Sub-channel size in CUs.
        size: usize,
        /// Size multiple of the protection profile in CUs.
        multiple: usize,
    },
    /// The EEP table entry does not cover the mother codeword.
    #[error("EEP profile has {blocks} puncturing blocks instead of {expected}")]
    PuncturingBlocks {
        /// Number of blocks `L1 + L2` of the profile.
        blocks: usize,
        /// Number of 128-bit blocks in the mother codeword.
        expected: usize,
    },
    /// The punctured codeword does not fill the sub-channel.
    #[error("punctured codeword length {punctured} does not match sub-channel capacity {capacity}")]
    CodewordLength {
        /// Length of the punctured codeword in bits.
        punctured: usize,
        /// Sub-channel capacity in bits.
        capacity: usize,
    },
    /// The number of information bits is not a multiple of 8.
    #[error("{0} information bits is not a whole number of bytes")]
    NotByteAligned(usize),
    /// The puncturing pattern does not transmit any bits.
    #[error("the puncturing pattern is empty")]
    EmptyPattern,
}

/// Length error.
///
/// This error is returned when a buffer given to a processing stage does not
/// have the length the stage was built for.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LengthError {
    /// The buffer length does not match the expected length.
    #[error("expected {expected} elements, but got {got}")]
    Mismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// The buffer length is not a multiple of the required block length.
    #[error("length {len} is not a multiple of {multiple}")]
    NotMultiple {
        /// Actual length.
        len: usize,
        /// Block length.
        multiple: usize,
    },
}
