//! DAB transmission modes.
//!
//! The transmission mode determines the OFDM numerology and how the Main
//! Service Channel of a transmission frame is divided into Common
//! Interleaved Frames (CIFs). See Section 14 and Table 38 in EN 300 401. The
//! sizes of a CIF and of a Capacity Unit do not depend on the mode.

use super::subchannel::Protection;
use super::tables;
use super::ConfigError;
use num_enum::TryFromPrimitive;
use std::fmt::{Display, Formatter};

/// Reference sample rate of the DAB elementary period T = 1/2048000 s.
pub const REFERENCE_SAMPLE_RATE: f64 = 2.048e6;

/// DAB transmission mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum TransmissionMode {
    /// Mode I (VHF Band III).
    I = 1,
    /// Mode II.
    II = 2,
    /// Mode III.
    III = 3,
    /// Mode IV.
    IV = 4,
}

impl Display for TransmissionMode {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "mode {}",
            match self {
                TransmissionMode::I => "I",
                TransmissionMode::II => "II",
                TransmissionMode::III => "III",
                TransmissionMode::IV => "IV",
            }
        )
    }
}

/// Parameters of a DAB transmission mode.
///
/// The durations are given in samples at the configured sample rate. All the
/// other fields are independent of the sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeParameters {
    mode: TransmissionMode,
    sample_rate: f64,
    fft_length: usize,
    num_carriers: usize,
    cyclic_prefix_length: usize,
    null_symbol_length: usize,
    symbols_per_frame: usize,
    fic_symbols: usize,
    msc_symbols: usize,
    cifs_per_frame: usize,
}

impl ModeParameters {
    /// Looks up the parameters of a transmission mode.
    ///
    /// The `mode` must be in `1..=4` and `sample_rate` must be finite and
    /// positive. Otherwise an error is returned.
    pub fn new(mode: u8, sample_rate: f64) -> Result<ModeParameters, ConfigError> {
        let mode = TransmissionMode::try_from(mode).map_err(|_| ConfigError::InvalidMode(mode))?;
        ModeParameters::for_mode(mode, sample_rate)
    }

    /// Looks up the parameters of a [`TransmissionMode`].
    pub fn for_mode(
        mode: TransmissionMode,
        sample_rate: f64,
    ) -> Result<ModeParameters, ConfigError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        // (FFT length, carriers, cyclic prefix, null symbol, symbols, FIC
        // symbols, MSC symbols, CIFs), at 2.048 MHz
        let (fft, k, cp, null, l, fic, msc, cifs) = match mode {
            TransmissionMode::I => (2048, 1536, 504, 2656, 76, 3, 72, 4),
            TransmissionMode::II => (512, 384, 126, 664, 76, 3, 72, 1),
            TransmissionMode::III => (256, 192, 63, 345, 153, 8, 144, 1),
            TransmissionMode::IV => (1024, 768, 252, 1328, 76, 3, 72, 2),
        };
        let params = ModeParameters {
            mode,
            sample_rate,
            fft_length: fft,
            num_carriers: k,
            cyclic_prefix_length: cp,
            null_symbol_length: null,
            symbols_per_frame: l,
            fic_symbols: fic,
            msc_symbols: msc,
            cifs_per_frame: cifs,
        };
        debug_assert_eq!(params.symbols_per_frame, 1 + fic + msc);
        debug_assert_eq!(
            params.msc_symbols * params.bits_per_symbol(),
            params.cifs_per_frame * params.cif_bits()
        );
        if sample_rate != REFERENCE_SAMPLE_RATE {
            log::debug!(
                "{} at {} Hz (reference rate is {} Hz)",
                mode,
                sample_rate,
                REFERENCE_SAMPLE_RATE
            );
        }
        Ok(params)
    }

    /// Gives the transmission mode.
    pub fn mode(&self) -> TransmissionMode {
        self.mode
    }

    /// Gives the sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Gives the FFT length at the reference sample rate.
    pub fn fft_length(&self) -> usize {
        self.fft_length
    }

    /// Gives the number of active carriers.
    pub fn num_carriers(&self) -> usize {
        self.num_carriers
    }

    fn scale(&self, reference_samples: usize) -> f64 {
        reference_samples as f64 * self.sample_rate / REFERENCE_SAMPLE_RATE
    }

    /// Gives the duration of the cyclic prefix in samples.
    pub fn cyclic_prefix_samples(&self) -> f64 {
        self.scale(self.cyclic_prefix_length)
    }

    /// Gives the duration of an OFDM symbol (cyclic prefix included) in samples.
    pub fn symbol_samples(&self) -> f64 {
        self.scale(self.fft_length + self.cyclic_prefix_length)
    }

    /// Gives the duration of the null symbol in samples.
    pub fn null_symbol_samples(&self) -> f64 {
        self.scale(self.null_symbol_length)
    }

    /// Gives the duration of a transmission frame in samples.
    pub fn frame_samples(&self) -> f64 {
        self.scale(
            self.null_symbol_length
                + self.symbols_per_frame * (self.fft_length + self.cyclic_prefix_length),
        )
    }

    /// Gives the number of OFDM symbols in a frame, excluding the null symbol.
    pub fn symbols_per_frame(&self) -> usize {
        self.symbols_per_frame
    }

    /// Gives the number of OFDM symbols of the Fast Information Channel.
    pub fn fic_symbols(&self) -> usize {
        self.fic_symbols
    }

    /// Gives the number of OFDM symbols of the Main Service Channel.
    pub fn msc_symbols(&self) -> usize {
        self.msc_symbols
    }

    /// Gives the number of CIFs carried in a transmission frame.
    pub fn cifs_per_frame(&self) -> usize {
        self.cifs_per_frame
    }

    /// Gives the number of soft bits per OFDM symbol (two per carrier).
    pub fn bits_per_symbol(&self) -> usize {
        2 * self.num_carriers
    }

    /// Gives the number of MSC OFDM symbols per CIF.
    pub fn symbols_per_cif(&self) -> usize {
        self.msc_symbols / self.cifs_per_frame
    }

    /// Gives the number of Capacity Units in a CIF.
    pub fn cus_per_cif(&self) -> usize {
        tables::CUS_PER_CIF
    }

    /// Gives the size of a Capacity Unit in bits.
    pub fn cu_size(&self) -> usize {
        tables::CU_BITS
    }

    /// Gives the number of bits in a CIF.
    pub fn cif_bits(&self) -> usize {
        self.cus_per_cif() * self.cu_size()
    }

    /// Gives the sub-channel size multiple (in CUs) of a protection profile.
    pub fn subch_size_multiple(&self, protection: Protection) -> usize {
        protection.size_multiple()
    }

    /// Gives the number of tail bits added to the convolutional encoder input.
    pub fn conv_tail_input_bits(&self) -> usize {
        tables::TAIL_INPUT_BITS
    }

    /// Gives the number of mother-code bits produced by the tail.
    pub fn conv_tail_coded_bits(&self) -> usize {
        tables::TAIL_CODED_BITS
    }
}
