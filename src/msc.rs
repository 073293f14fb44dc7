//! MSC sub-channel decoder and encoder.
//!
//! The [`MscDecoder`] takes the soft bits of the MSC OFDM symbols and
//! produces the packed information bytes of one sub-channel for each CIF. It
//! chains the sub-channel selection, time deinterleaving, depuncturing,
//! Viterbi decoding, tail pruning, energy dispersal descrambling and bit
//! packing.
//!
//! The [`MscEncoder`] performs the same chain in reverse, and can produce
//! full CIFs of soft bits that drive the decoder.

use super::{
    bits::{pack_bits, unpack_bits, TailPruner},
    convolutional::{soft_bit, ConvEncoder, ViterbiDecoder},
    cu::{qpsk_soft_bits, CifAssembler, CuSelector},
    energy::EnergyDispersal,
    interleave::TimeInterleaver,
    mode::ModeParameters,
    puncture::Puncturer,
    subchannel::{EepProfile, Protection, SubChannel},
    ConfigError, LengthError,
};
use bytes::Bytes;
use num_complex::Complex32;

/// MSC sub-channel configuration.
///
/// This holds the construction-time parameters of a decoder or encoder. They
/// are validated when the decoder or encoder is built.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MscConfig {
    /// Transmission mode (1 to 4).
    pub mode: u8,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Address of the first CU of the sub-channel.
    pub address: usize,
    /// Size of the sub-channel in CUs.
    pub size: usize,
    /// Protection profile index.
    ///
    /// Indices 0 to 3 select EEP 1-A to 4-A, and 4 to 7 select EEP 1-B to
    /// 4-B.
    pub protection: u8,
}

impl MscConfig {
    /// Builds a decoder for this configuration.
    pub fn decoder(&self) -> Result<MscDecoder, ConfigError> {
        MscDecoder::new(self)
    }

    /// Builds an encoder for this configuration.
    pub fn encoder(&self) -> Result<MscEncoder, ConfigError> {
        MscEncoder::new(self)
    }

    fn layout(&self) -> Result<Layout, ConfigError> {
        let params = ModeParameters::new(self.mode, self.sample_rate)?;
        let protection = Protection::from_index(self.protection)?;
        let subchannel = SubChannel::new(self.address, self.size, protection)?;
        let profile = subchannel.eep_profile()?;
        let capacity = subchannel.size() * params.cu_size();
        let punctured = profile.punctured_codeword_len();
        if punctured != capacity {
            return Err(ConfigError::CodewordLength {
                punctured,
                capacity,
            });
        }
        if profile.info_bits() % 8 != 0 {
            return Err(ConfigError::NotByteAligned(profile.info_bits()));
        }
        let selector = CuSelector::new(&params, &subchannel);
        log::debug!("{} {}, {}", params.mode(), subchannel, profile);
        Ok(Layout {
            params,
            subchannel,
            profile,
            selector,
        })
    }
}

#[derive(Debug, Clone)]
struct Layout {
    params: ModeParameters,
    subchannel: SubChannel,
    profile: EepProfile,
    selector: CuSelector,
}

/// Decoded CIF.
///
/// Besides the sub-channel bytes, this carries the quality of the Viterbi
/// decoding. A large number of corrected errors is not an error condition.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCif {
    /// Number of CIFs pushed into the decoder, including the one that
    /// produced this output.
    pub cif_count: u64,
    /// Whether all the bits of the CIF went through the full time
    /// interleaving depth.
    pub complete: bool,
    /// Packed information bytes.
    pub data: Bytes,
    /// Number of hard decisions corrected by the Viterbi decoder.
    pub corrected_errors: usize,
    /// Path metric of the Viterbi decoder.
    pub path_metric: f32,
}

/// Intermediate buffers of the last decoded CIF.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugTaps {
    /// Soft bits of the sub-channel CUs.
    pub selected: Vec<f32>,
    /// Time deinterleaver output.
    pub deinterleaved: Vec<f32>,
    /// Depuncturer output.
    pub depunctured: Vec<f32>,
    /// Viterbi decoder output, including the tail.
    pub decoded: Vec<bool>,
    /// Information bits, after removing the tail.
    pub pruned: Vec<bool>,
    /// Information bits after energy dispersal descrambling.
    pub descrambled: Vec<bool>,
    /// Packed information bytes.
    pub packed: Bytes,
}

#[derive(Debug, Clone)]
struct DecoderChain {
    layout: Layout,
    deinterleaver: TimeInterleaver<f32>,
    puncturer: Puncturer,
    viterbi: ViterbiDecoder,
    pruner: TailPruner,
    scrambler: EnergyDispersal,
    cif_count: u64,
    emit_incomplete: bool,
    debug_taps: Option<DebugTaps>,
}

impl DecoderChain {
    fn decode_cif(&mut self, cif: &[f32]) -> Result<Option<DecodedCif>, LengthError> {
        let selected = self.layout.selector.select(cif)?;
        let (deinterleaved, complete) = self.deinterleaver.process(selected)?;
        self.cif_count += 1;
        if !complete {
            if !self.emit_incomplete {
                log::debug!(
                    "discarding CIF {} while the time deinterleaver fills",
                    self.cif_count
                );
                return Ok(None);
            }
            log::warn!("emitting incomplete CIF {}", self.cif_count);
        }
        let depunctured = self.puncturer.depuncture(&deinterleaved, 0.0)?;
        let decoded = self.viterbi.decode(&depunctured)?;
        let mut descrambled = self.pruner.prune(&decoded.bits)?.to_vec();
        let pruned = self.debug_taps.as_ref().map(|_| descrambled.clone());
        self.scrambler.scramble(&mut descrambled)?;
        let data = pack_bits(&descrambled)?;
        log::debug!(
            "decoded CIF {} ({} bytes, {} corrected errors, path metric {})",
            self.cif_count,
            data.len(),
            decoded.corrected_errors,
            decoded.path_metric
        );
        log::trace!("CIF data: {}", faster_hex::hex_string(&data));
        if let Some(taps) = self.debug_taps.as_mut() {
            *taps = DebugTaps {
                selected: selected.to_vec(),
                deinterleaved,
                depunctured,
                decoded: decoded.bits,
                pruned: pruned.unwrap_or_default(),
                descrambled,
                packed: data.clone(),
            };
        }
        Ok(Some(DecodedCif {
            cif_count: self.cif_count,
            complete,
            data,
            corrected_errors: decoded.corrected_errors,
            path_metric: decoded.path_metric,
        }))
    }
}

/// MSC sub-channel decoder.
///
/// The decoder must be fed the MSC soft bits of every CIF in order, starting
/// at a CIF boundary. The first 15 CIFs are discarded while the time
/// deinterleaver fills, unless [`MscDecoder::set_emit_incomplete`] is used.
#[derive(Debug, Clone)]
pub struct MscDecoder {
    assembler: CifAssembler<f32>,
    chain: DecoderChain,
}

impl MscDecoder {
    /// Creates a new decoder.
    ///
    /// The configuration is validated, and an error is returned if it does
    /// not describe a valid EEP sub-channel.
    pub fn new(config: &MscConfig) -> Result<MscDecoder, ConfigError> {
        let layout = config.layout()?;
        let profile = layout.profile;
        Ok(MscDecoder {
            assembler: CifAssembler::new(layout.params.cif_bits()),
            chain: DecoderChain {
                deinterleaver: TimeInterleaver::deinterleaver(layout.selector.len()),
                puncturer: Puncturer::for_profile(&profile),
                viterbi: ViterbiDecoder::new(profile.info_bits()),
                pruner: TailPruner::new(profile.info_bits()),
                scrambler: EnergyDispersal::new(profile.info_bits()),
                cif_count: 0,
                emit_incomplete: false,
                debug_taps: None,
                layout,
            },
        })
    }

    /// Gives the parameters of the transmission mode.
    pub fn mode_parameters(&self) -> &ModeParameters {
        &self.chain.layout.params
    }

    /// Gives the sub-channel descriptor.
    pub fn subchannel(&self) -> &SubChannel {
        &self.chain.layout.subchannel
    }

    /// Gives the EEP profile of the sub-channel.
    pub fn profile(&self) -> &EepProfile {
        &self.chain.layout.profile
    }

    /// Gives the number of bytes produced for each CIF.
    pub fn cif_bytes(&self) -> usize {
        self.chain.layout.profile.info_bits() / 8
    }

    /// Gives the number of CIFs processed so far.
    pub fn cif_count(&self) -> u64 {
        self.chain.cif_count
    }

    /// Enables or disables the output of incomplete CIFs.
    ///
    /// By default, the CIFs produced while the time deinterleaver fills are
    /// discarded.
    pub fn set_emit_incomplete(&mut self, emit_incomplete: bool) {
        self.chain.emit_incomplete = emit_incomplete;
    }

    /// Enables or disables the debug taps.
    ///
    /// When enabled, the decoder keeps a copy of the intermediate buffers of
    /// the last decoded CIF, which can be accessed with
    /// [`MscDecoder::debug_taps`].
    pub fn set_debug_taps(&mut self, enable: bool) {
        self.chain.debug_taps = if enable {
            Some(DebugTaps::default())
        } else {
            None
        };
    }

    /// Gives the intermediate buffers of the last decoded CIF.
    ///
    /// Returns `None` if the debug taps are disabled.
    pub fn debug_taps(&self) -> Option<&DebugTaps> {
        self.chain.debug_taps.as_ref()
    }

    /// Decodes the soft bits of a full CIF.
    ///
    /// Returns `None` if the CIF is discarded while the time deinterleaver
    /// fills. An error is returned if `cif` does not have the length of a
    /// CIF.
    pub fn decode_cif(&mut self, cif: &[f32]) -> Result<Option<DecodedCif>, LengthError> {
        self.chain.decode_cif(cif)
    }

    /// Pushes MSC soft bits in arbitrary chunks.
    ///
    /// The soft bits are regrouped into CIFs, and the decoded CIFs are
    /// returned.
    pub fn push_soft_bits(&mut self, soft: &[f32]) -> Result<Vec<DecodedCif>, LengthError> {
        let chain = &mut self.chain;
        let mut decoded = Vec::new();
        let mut result = Ok(());
        self.assembler.push(soft, |cif| {
            if result.is_ok() {
                match chain.decode_cif(cif) {
                    Ok(Some(d)) => decoded.push(d),
                    Ok(None) => (),
                    Err(err) => result = Err(err),
                }
            }
        });
        result.map(|()| decoded)
    }

    /// Pushes the soft bits of an MSC OFDM symbol.
    ///
    /// An error is returned if the symbol does not have `2K` soft bits.
    pub fn push_symbol(&mut self, symbol: &[f32]) -> Result<Vec<DecodedCif>, LengthError> {
        let expected = self.mode_parameters().bits_per_symbol();
        if symbol.len() != expected {
            return Err(LengthError::Mismatch {
                expected,
                got: symbol.len(),
            });
        }
        self.push_soft_bits(symbol)
    }

    /// Pushes the differentially demodulated carriers of an MSC OFDM symbol.
    ///
    /// The carriers are split into soft bits with [`qpsk_soft_bits`]. An
    /// error is returned if the number of carriers is not `K`.
    pub fn push_carriers(
        &mut self,
        carriers: &[Complex32],
    ) -> Result<Vec<DecodedCif>, LengthError> {
        let expected = self.mode_parameters().num_carriers();
        if carriers.len() != expected {
            return Err(LengthError::Mismatch {
                expected,
                got: carriers.len(),
            });
        }
        self.push_soft_bits(&qpsk_soft_bits(carriers))
    }

    /// Resets the decoder state.
    ///
    /// This drops any partial CIF and clears the time deinterleaver history.
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.chain.deinterleaver.reset();
        self.chain.cif_count = 0;
    }
}

/// MSC sub-channel encoder.
///
/// The encoder takes the information bytes of one sub-channel for each CIF,
/// and produces the bits transmitted in the sub-channel CUs.
#[derive(Debug, Clone)]
pub struct MscEncoder {
    layout: Layout,
    scrambler: EnergyDispersal,
    puncturer: Puncturer,
    interleaver: TimeInterleaver<bool>,
    cif_count: u64,
}

impl MscEncoder {
    /// Creates a new encoder.
    ///
    /// The configuration is validated in the same way as for
    /// [`MscDecoder::new`].
    pub fn new(config: &MscConfig) -> Result<MscEncoder, ConfigError> {
        let layout = config.layout()?;
        let profile = layout.profile;
        Ok(MscEncoder {
            scrambler: EnergyDispersal::new(profile.info_bits()),
            puncturer: Puncturer::for_profile(&profile),
            interleaver: TimeInterleaver::interleaver(layout.selector.len()),
            cif_count: 0,
            layout,
        })
    }

    /// Gives the parameters of the transmission mode.
    pub fn mode_parameters(&self) -> &ModeParameters {
        &self.layout.params
    }

    /// Gives the sub-channel descriptor.
    pub fn subchannel(&self) -> &SubChannel {
        &self.layout.subchannel
    }

    /// Gives the number of information bytes taken for each CIF.
    pub fn cif_bytes(&self) -> usize {
        self.layout.profile.info_bits() / 8
    }

    /// Gives the number of CIFs encoded so far.
    pub fn cif_count(&self) -> u64 {
        self.cif_count
    }

    /// Encodes the information bytes of a CIF.
    ///
    /// Returns the `size * 64` bits of the sub-channel CUs. An error is
    /// returned if `data` does not have [`MscEncoder::cif_bytes`] bytes.
    pub fn encode_cif(&mut self, data: &[u8]) -> Result<Vec<bool>, LengthError> {
        if data.len() != self.cif_bytes() {
            return Err(LengthError::Mismatch {
                expected: self.cif_bytes(),
                got: data.len(),
            });
        }
        let mut bits = unpack_bits(data);
        self.scrambler.scramble(&mut bits)?;
        let codeword = ConvEncoder::encode_block(&bits);
        let punctured = self.puncturer.puncture(&codeword)?;
        let (interleaved, _) = self.interleaver.process(&punctured)?;
        self.cif_count += 1;
        log::trace!(
            "encoded CIF {}: {}",
            self.cif_count,
            faster_hex::hex_string(data)
        );
        Ok(interleaved)
    }

    /// Places the sub-channel bits into a full CIF of soft bits.
    ///
    /// The sub-channel bits are mapped to soft values, and the CUs of other
    /// sub-channels are filled with erasures.
    pub fn place_in_cif(&self, subchannel_bits: &[bool]) -> Result<Vec<f32>, LengthError> {
        let soft = bits_to_soft(subchannel_bits);
        let mut cif = vec![0.0; self.layout.params.cif_bits()];
        self.layout.selector.insert(&mut cif, &soft)?;
        Ok(cif)
    }

    /// Encodes the information bytes of a CIF into a full CIF of soft bits.
    pub fn encode_soft_cif(&mut self, data: &[u8]) -> Result<Vec<f32>, LengthError> {
        let bits = self.encode_cif(data)?;
        self.place_in_cif(&bits)
    }

    /// Resets the encoder state.
    pub fn reset(&mut self) {
        self.interleaver.reset();
        self.cif_count = 0;
    }
}

/// Maps bits to soft values.
///
/// Each bit `b` is mapped to `(1 - 2b) / sqrt(2)`.
pub fn bits_to_soft(bits: &[bool]) -> Vec<f32> {
    bits.iter().map(|&b| soft_bit(b)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mode::REFERENCE_SAMPLE_RATE;

    fn config(mode: u8, address: usize, size: usize, protection: u8) -> MscConfig {
        MscConfig {
            mode,
            sample_rate: REFERENCE_SAMPLE_RATE,
            address,
            size,
            protection,
        }
    }

    fn cif_data(t: usize, len: usize) -> Vec<u8> {
        (0..len).map(|j| (j * 13 + t * 101 + 7) as u8).collect()
    }

    fn round_trip(config: &MscConfig, cifs: usize) {
        let mut encoder = config.encoder().unwrap();
        let mut decoder = config.decoder().unwrap();
        let len = encoder.cif_bytes();
        assert_eq!(len, decoder.cif_bytes());
        let mut outputs = Vec::new();
        for t in 0..cifs {
            let soft = encoder.encode_soft_cif(&cif_data(t, len)).unwrap();
            if let Some(decoded) = decoder.decode_cif(&soft).unwrap() {
                outputs.push(decoded);
            }
        }
        assert_eq!(outputs.len(), cifs - 15);
        for (j, decoded) in outputs.iter().enumerate() {
            assert!(decoded.complete);
            assert_eq!(decoded.cif_count, (j + 16) as u64);
            assert_eq!(&decoded.data[..], &cif_data(j, len)[..], "{:?}", config);
            assert_eq!(decoded.corrected_errors, 0);
        }
    }

    #[test]
    fn round_trip_all_protections() {
        for protection in 0..8 {
            let multiple = Protection::from_index(protection).unwrap().size_multiple();
            round_trip(&config(1, 100, multiple, protection), 17);
        }
    }

    #[test]
    fn round_trip_larger_n() {
        // 3-A, n = 4 (32 kbit/s) and 2-A, n = 2
        round_trip(&config(1, 0, 24, 2), 17);
        round_trip(&config(1, 840, 16, 1), 16);
    }

    #[test]
    fn round_trip_all_modes() {
        for mode in 1..=4 {
            let config = config(mode, 54, 18, 2);
            let mut encoder = config.encoder().unwrap();
            let mut decoder = config.decoder().unwrap();
            let params = decoder.mode_parameters().clone();
            let len = encoder.cif_bytes();
            let mut outputs = Vec::new();
            for t in 0..17 {
                let soft = encoder.encode_soft_cif(&cif_data(t, len)).unwrap();
                for symbol in soft.chunks_exact(params.bits_per_symbol()) {
                    outputs.extend(decoder.push_symbol(symbol).unwrap());
                }
            }
            assert_eq!(outputs.len(), 2, "mode {}", mode);
            assert_eq!(&outputs[0].data[..], &cif_data(0, len)[..]);
            assert_eq!(&outputs[1].data[..], &cif_data(1, len)[..]);
        }
    }

    #[test]
    fn push_carriers() {
        let config = config(2, 0, 12, 0);
        let mut encoder = config.encoder().unwrap();
        let mut decoder = config.decoder().unwrap();
        let k = decoder.mode_parameters().num_carriers();
        let len = encoder.cif_bytes();
        let mut outputs = Vec::new();
        for t in 0..16 {
            let soft = encoder.encode_soft_cif(&cif_data(t, len)).unwrap();
            for symbol in soft.chunks_exact(2 * k) {
                let carriers = (0..k)
                    .map(|j| Complex32::new(symbol[j], symbol[k + j]))
                    .collect::<Vec<Complex32>>();
                outputs.extend(decoder.push_carriers(&carriers).unwrap());
            }
        }
        assert_eq!(outputs.len(), 1);
        assert_eq!(&outputs[0].data[..], &cif_data(0, len)[..]);
        assert_eq!(
            decoder.push_carriers(&[Complex32::new(0.0, 0.0); 3]),
            Err(LengthError::Mismatch {
                expected: 384,
                got: 3
            })
        );
    }

    #[test]
    fn noisy_channel() {
        let config = config(1, 10, 18, 2);
        let mut encoder = config.encoder().unwrap();
        let mut decoder = config.decoder().unwrap();
        let len = encoder.cif_bytes();
        let mut outputs = Vec::new();
        for t in 0..16 {
            let mut soft = encoder.encode_soft_cif(&cif_data(t, len)).unwrap();
            // flip a few sparse soft bits of the sub-channel
            for j in (10 * 64..28 * 64).step_by(97) {
                soft[j] = -soft[j];
            }
            outputs.extend(decoder.decode_cif(&soft).unwrap());
        }
        assert_eq!(outputs.len(), 1);
        assert_eq!(&outputs[0].data[..], &cif_data(0, len)[..]);
        assert!(outputs[0].corrected_errors > 0);
        assert!(outputs[0].path_metric > 0.0);
    }

    #[test]
    fn emit_incomplete_and_taps() {
        let config = config(1, 0, 12, 0);
        let mut decoder = config.decoder().unwrap();
        decoder.set_emit_incomplete(true);
        assert!(decoder.debug_taps().is_none());
        decoder.set_debug_taps(true);
        let cif = vec![0.0; decoder.mode_parameters().cif_bits()];
        let decoded = decoder.decode_cif(&cif).unwrap().unwrap();
        assert!(!decoded.complete);
        assert_eq!(decoded.cif_count, 1);
        assert_eq!(decoded.data.len(), 24);
        let taps = decoder.debug_taps().unwrap();
        assert_eq!(taps.selected.len(), 12 * 64);
        assert_eq!(taps.deinterleaved.len(), 12 * 64);
        assert_eq!(taps.depunctured.len(), 4 * 192 + 24);
        assert_eq!(taps.decoded.len(), 198);
        assert_eq!(taps.pruned.len(), 192);
        assert_eq!(taps.descrambled.len(), 192);
        assert_eq!(taps.packed, decoded.data);
        decoder.set_debug_taps(false);
        assert!(decoder.debug_taps().is_none());
        decoder.reset();
        assert_eq!(decoder.cif_count(), 0);
    }

    #[test]
    fn wrong_lengths() {
        let config = config(1, 0, 12, 0);
        let mut decoder = config.decoder().unwrap();
        assert_eq!(
            decoder.decode_cif(&[0.0; 100]),
            Err(LengthError::Mismatch {
                expected: 55296,
                got: 100
            })
        );
        assert_eq!(
            decoder.push_symbol(&[0.0; 100]),
            Err(LengthError::Mismatch {
                expected: 3072,
                got: 100
            })
        );
        let mut encoder = config.encoder().unwrap();
        assert_eq!(
            encoder.encode_cif(&[0; 23]),
            Err(LengthError::Mismatch {
                expected: 24,
                got: 23
            })
        );
        assert_eq!(encoder.cif_count(), 0);
    }

    #[test]
    fn invalid_configuration() {
        assert_eq!(
            config(5, 0, 12, 0).decoder().unwrap_err(),
            ConfigError::InvalidMode(5)
        );
        assert_eq!(
            config(1, 0, 12, 8).decoder().unwrap_err(),
            ConfigError::InvalidProtection
        );
        assert_eq!(
            config(1, 0, 13, 0).encoder().unwrap_err(),
            ConfigError::SizeNotMultiple {
                size: 13,
                multiple: 12
            }
        );
        assert_eq!(
            config(1, 860, 12, 0).decoder().unwrap_err(),
            ConfigError::SubChannelOutOfRange {
                address: 860,
                size: 12
            }
        );
        let mut negative_rate = config(1, 0, 12, 0);
        negative_rate.sample_rate = -1.0;
        assert_eq!(
            negative_rate.decoder().unwrap_err(),
            ConfigError::InvalidSampleRate
        );
    }
}
