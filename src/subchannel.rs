//! MSC sub-channel descriptor and Equal Error Protection profiles.
//!
//! A sub-channel occupies a contiguous range of Capacity Units in every CIF.
//! Its protection profile determines how the convolutional mother code is
//! punctured. See Section 11.3.2 and Tables 33 and 34 in EN 300 401.

use super::tables::{self, BLOCK_BITS, TAIL_CODED_BITS, TAIL_INPUT_BITS};
use super::ConfigError;
use std::fmt::{Display, Formatter};

/// EEP protection set.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProtectionSet {
    /// Set A: sub-channel bit rates multiple of 8 kbit/s.
    A,
    /// Set B: sub-channel bit rates multiple of 32 kbit/s.
    B,
}

/// Equal Error Protection profile.
///
/// Each profile is a protection set together with a protection level from 1
/// (strongest) to 4 (weakest).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Protection {
    set: ProtectionSet,
    level: u8,
}

impl Protection {
    /// Creates a protection profile.
    ///
    /// Returns an error if `level` is not in `1..=4`.
    pub fn new(set: ProtectionSet, level: u8) -> Result<Protection, ConfigError> {
        if !(1..=4).contains(&level) {
            return Err(ConfigError::InvalidProtection);
        }
        Ok(Protection { set, level })
    }

    /// Creates a protection profile from its integer index.
    ///
    /// Indices 0 to 3 select protection levels 1-A to 4-A. Indices 4 to 7
    /// select protection levels 1-B to 4-B.
    pub fn from_index(index: u8) -> Result<Protection, ConfigError> {
        match index {
            0..=3 => Protection::new(ProtectionSet::A, index + 1),
            4..=7 => Protection::new(ProtectionSet::B, index - 3),
            _ => Err(ConfigError::InvalidProtection),
        }
    }

    /// Gives the integer index of the protection profile.
    ///
    /// This is the inverse of [`Protection::from_index`].
    pub fn index(&self) -> u8 {
        match self.set {
            ProtectionSet::A => self.level - 1,
            ProtectionSet::B => self.level + 3,
        }
    }

    /// Gives the protection set.
    pub fn set(&self) -> ProtectionSet {
        self.set
    }

    /// Gives the protection level (1 to 4).
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Gives the sub-channel size multiple in CUs.
    ///
    /// The size of a sub-channel using this profile is `n` times this
    /// multiple.
    pub fn size_multiple(&self) -> usize {
        let multiples = match self.set {
            ProtectionSet::A => [12, 8, 6, 4],
            ProtectionSet::B => [27, 21, 18, 15],
        };
        multiples[usize::from(self.level - 1)]
    }

    /// Gives the number of information bits per CIF for a given `n`.
    pub fn info_bits(&self, n: usize) -> usize {
        match self.set {
            ProtectionSet::A => 192 * n,
            ProtectionSet::B => 768 * n,
        }
    }
}

impl Display for Protection {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}-{}",
            self.level,
            match self.set {
                ProtectionSet::A => "A",
                ProtectionSet::B => "B",
            }
        )
    }
}

impl std::str::FromStr for Protection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid protection profile {s}");
        let mut chars = s.trim().chars();
        let level = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(invalid)?;
        // accepts both "2-A" and "2A"
        let set = match (chars.next(), chars.next(), chars.next()) {
            (Some('-'), Some(c), None) | (Some(c), None, None) => c,
            _ => return Err(invalid()),
        };
        let set = match set.to_ascii_uppercase() {
            'A' => ProtectionSet::A,
            'B' => ProtectionSet::B,
            _ => return Err(invalid()),
        };
        Protection::new(set, level as u8).map_err(|_| invalid())
    }
}

/// Sub-channel descriptor.
///
/// The descriptor gives the position of the sub-channel within the CIF and
/// its protection profile.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SubChannel {
    address: usize,
    size: usize,
    protection: Protection,
}

impl SubChannel {
    /// Creates a new sub-channel descriptor.
    ///
    /// The `address` is the index of the first CU of the sub-channel within
    /// the CIF, and `size` is the number of CUs of the sub-channel. The
    /// descriptor is validated against the CIF size and the size multiple of
    /// the protection profile.
    pub fn new(
        address: usize,
        size: usize,
        protection: Protection,
    ) -> Result<SubChannel, ConfigError> {
        if address >= tables::CUS_PER_CIF {
            return Err(ConfigError::AddressOutOfRange(address));
        }
        if size == 0 {
            return Err(ConfigError::EmptySubChannel);
        }
        if address + size > tables::CUS_PER_CIF {
            return Err(ConfigError::SubChannelOutOfRange { address, size });
        }
        let multiple = protection.size_multiple();
        if size % multiple != 0 {
            return Err(ConfigError::SizeNotMultiple { size, multiple });
        }
        Ok(SubChannel {
            address,
            size,
            protection,
        })
    }

    /// Gives the address of the first CU of the sub-channel.
    pub fn address(&self) -> usize {
        self.address
    }

    /// Gives the size of the sub-channel in CUs.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gives the protection profile of the sub-channel.
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Gives the factor `n` of the sub-channel.
    ///
    /// This is the sub-channel size divided by the size multiple of the
    /// protection profile.
    pub fn n(&self) -> usize {
        self.size / self.protection.size_multiple()
    }

    /// Gives the bit rate of the sub-channel in kbit/s.
    pub fn bitrate(&self) -> usize {
        self.protection.info_bits(self.n()) / 24
    }

    /// Gives the range of CUs occupied by the sub-channel.
    pub fn cus(&self) -> std::ops::Range<usize> {
        self.address..self.address + self.size
    }

    /// Computes the EEP puncturing profile of the sub-channel.
    pub fn eep_profile(&self) -> Result<EepProfile, ConfigError> {
        EepProfile::new(self.protection, self.n())
    }
}

impl Display for SubChannel {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "sub-channel (address = {} CU, size = {} CU, protection = {}, {} kbit/s)",
            self.address,
            self.size,
            self.protection,
            self.bitrate()
        )
    }
}

/// EEP puncturing profile.
///
/// The mother codeword of a CIF is punctured in blocks of 128 bits. The
/// first `L1` blocks use the puncturing vector `PI1`, the following `L2`
/// blocks use `PI2`, and the 24 tail bits use the tail vector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EepProfile {
    protection: Protection,
    n: usize,
    l1: usize,
    l2: usize,
    pi1: usize,
    pi2: usize,
}

impl EepProfile {
    /// Looks up the profile of Table 33 (set A) or Table 34 (set B).
    ///
    /// Returns an error if `n` is zero or if the table entry does not cover
    /// exactly the mother codeword of the `n * 8` (or `n * 32`) kbit/s
    /// sub-channel.
    pub fn new(protection: Protection, n: usize) -> Result<EepProfile, ConfigError> {
        if n == 0 {
            return Err(ConfigError::EmptySubChannel);
        }
        // (L1, L2, PI1, PI2); the lengths are computed with signed arithmetic
        // since the general formula does not apply to 2-A with n = 1
        let n_ = n as isize;
        let (l1, l2, pi1, pi2) = match (protection.set(), protection.level()) {
            (ProtectionSet::A, 1) => (6 * n_ - 3, 3, 24, 23),
            // exception of Table 33
            (ProtectionSet::A, 2) if n == 1 => (5, 1, 13, 12),
            (ProtectionSet::A, 2) => (2 * n_ - 3, 4 * n_ + 3, 14, 13),
            (ProtectionSet::A, 3) => (6 * n_ - 3, 3, 8, 7),
            (ProtectionSet::A, 4) => (4 * n_ - 3, 2 * n_ + 3, 3, 2),
            (ProtectionSet::B, 1) => (24 * n_ - 3, 3, 10, 9),
            (ProtectionSet::B, 2) => (24 * n_ - 3, 3, 6, 5),
            (ProtectionSet::B, 3) => (24 * n_ - 3, 3, 4, 3),
            (ProtectionSet::B, 4) => (24 * n_ - 3, 3, 2, 1),
            _ => return Err(ConfigError::InvalidProtection),
        };
        if l1 < 0 || l2 < 0 {
            return Err(ConfigError::InvalidProtection);
        }
        let profile = EepProfile {
            protection,
            n,
            l1: l1 as usize,
            l2: l2 as usize,
            pi1,
            pi2,
        };
        // each 128-bit block covers 32 information bits
        let expected = 4 * profile.info_bits() / BLOCK_BITS;
        let blocks = profile.l1 + profile.l2;
        if blocks != expected {
            return Err(ConfigError::PuncturingBlocks { blocks, expected });
        }
        Ok(profile)
    }

    /// Gives the protection profile.
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Gives the factor `n`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Gives the number of blocks punctured with `PI1`.
    pub fn l1(&self) -> usize {
        self.l1
    }

    /// Gives the number of blocks punctured with `PI2`.
    pub fn l2(&self) -> usize {
        self.l2
    }

    /// Gives the puncturing vector index of the first `L1` blocks.
    pub fn pi1(&self) -> usize {
        self.pi1
    }

    /// Gives the puncturing vector index of the following `L2` blocks.
    pub fn pi2(&self) -> usize {
        self.pi2
    }

    /// Gives the number of information bits `I` per CIF.
    pub fn info_bits(&self) -> usize {
        self.protection.info_bits(self.n)
    }

    /// Gives the length of the convolutional decoder output (information
    /// bits plus tail bits).
    pub fn decoded_bits(&self) -> usize {
        self.info_bits() + TAIL_INPUT_BITS
    }

    /// Gives the length of the mother codeword, `4 * I + 24`.
    pub fn conv_codeword_len(&self) -> usize {
        4 * self.info_bits() + TAIL_CODED_BITS
    }

    /// Gives the length of the punctured codeword.
    pub fn punctured_codeword_len(&self) -> usize {
        let per_vector = |pi| tables::VECTORS_PER_BLOCK * tables::puncturing_vector_ones(pi);
        self.l1 * per_vector(self.pi1)
            + self.l2 * per_vector(self.pi2)
            + tables::PUNCTURING_TAIL_VECTOR.iter().filter(|&&b| b).count()
    }

    /// Gives the assembled puncturing sequence.
    ///
    /// The sequence has one element per bit of the mother codeword, and it is
    /// `true` for the bits that are transmitted.
    pub fn puncturing_sequence(&self) -> Vec<bool> {
        let block = |pi| {
            // the tables module guarantees PI in 1..=24 is valid
            tables::puncturing_vector(pi)
                .into_iter()
                .flatten()
                .collect::<Vec<bool>>()
                .repeat(tables::VECTORS_PER_BLOCK)
        };
        let mut sequence = Vec::with_capacity(self.conv_codeword_len());
        sequence.extend(block(self.pi1).repeat(self.l1));
        sequence.extend(block(self.pi2).repeat(self.l2));
        sequence.extend_from_slice(&tables::PUNCTURING_TAIL_VECTOR);
        sequence
    }
}

impl Display for EepProfile {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "EEP {} (n = {}, L1 = {}, L2 = {}, PI1 = {}, PI2 = {}, I = {} bits)",
            self.protection,
            self.n,
            self.l1,
            self.l2,
            self.pi1,
            self.pi2,
            self.info_bits()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn all_protections() -> impl Iterator<Item = Protection> {
        (0..8).map(|j| Protection::from_index(j).unwrap())
    }

    #[test]
    fn protection_index() {
        for (j, p) in all_protections().enumerate() {
            assert_eq!(usize::from(p.index()), j);
        }
        assert_eq!(Protection::from_index(8), Err(ConfigError::InvalidProtection));
        assert_eq!(
            Protection::new(ProtectionSet::A, 0),
            Err(ConfigError::InvalidProtection)
        );
    }

    #[test]
    fn protection_from_str() {
        let p: Protection = "3-A".parse().unwrap();
        assert_eq!(p, Protection::new(ProtectionSet::A, 3).unwrap());
        assert_eq!(format!("{p}"), "3-A");
        let p: Protection = "1b".parse().unwrap();
        assert_eq!(format!("{p}"), "1-B");
        assert!("5-A".parse::<Protection>().is_err());
        assert!("2-C".parse::<Protection>().is_err());
        assert!("".parse::<Protection>().is_err());
    }

    #[test]
    fn table_invariants() {
        for protection in all_protections() {
            for n in 1..=(tables::CUS_PER_CIF / protection.size_multiple()) {
                let profile = EepProfile::new(protection, n).unwrap();
                if protection.set() == ProtectionSet::A {
                    assert_eq!(6 * n, profile.l1() + profile.l2());
                } else {
                    assert_eq!(24 * n, profile.l1() + profile.l2());
                }
                let size = n * protection.size_multiple();
                assert_eq!(
                    profile.punctured_codeword_len(),
                    size * tables::CU_BITS,
                    "{}",
                    profile
                );
                let sequence = profile.puncturing_sequence();
                assert_eq!(sequence.len(), profile.conv_codeword_len());
                assert_eq!(
                    sequence.iter().filter(|&&b| b).count(),
                    profile.punctured_codeword_len()
                );
                assert_eq!(profile.info_bits() % 8, 0);
            }
        }
    }

    #[test]
    fn eep_2a_exception() {
        let protection = Protection::new(ProtectionSet::A, 2).unwrap();
        let profile = EepProfile::new(protection, 1).unwrap();
        assert_eq!(
            (profile.l1(), profile.l2(), profile.pi1(), profile.pi2()),
            (5, 1, 13, 12)
        );
        assert_eq!(profile.punctured_codeword_len(), 5 * 4 * 21 + 4 * 20 + 12);
        let profile = EepProfile::new(protection, 2).unwrap();
        assert_eq!(
            (profile.l1(), profile.l2(), profile.pi1(), profile.pi2()),
            (1, 11, 14, 13)
        );
    }

    #[test]
    fn eep_3a_profile() {
        // 3-A, 18 CUs: n = 3, 24 kbit/s
        let subch = SubChannel::new(0, 18, Protection::from_index(2).unwrap()).unwrap();
        assert_eq!(subch.n(), 3);
        assert_eq!(subch.bitrate(), 24);
        let profile = subch.eep_profile().unwrap();
        assert_eq!(
            format!("{profile}"),
            "EEP 3-A (n = 3, L1 = 15, L2 = 3, PI1 = 8, PI2 = 7, I = 576 bits)"
        );
        assert_eq!(profile.conv_codeword_len(), 4 * 576 + 24);
        assert_eq!(profile.decoded_bits(), 582);
    }

    #[test]
    fn subchannel_validation() {
        let p = Protection::from_index(0).unwrap();
        assert_eq!(
            SubChannel::new(864, 12, p),
            Err(ConfigError::AddressOutOfRange(864))
        );
        assert_eq!(SubChannel::new(0, 0, p), Err(ConfigError::EmptySubChannel));
        assert_eq!(
            SubChannel::new(860, 12, p),
            Err(ConfigError::SubChannelOutOfRange {
                address: 860,
                size: 12
            })
        );
        assert_eq!(
            SubChannel::new(0, 13, p),
            Err(ConfigError::SizeNotMultiple {
                size: 13,
                multiple: 12
            })
        );
        let subch = SubChannel::new(852, 12, p).unwrap();
        assert_eq!(subch.cus(), 852..864);
        assert_eq!(
            format!("{subch}"),
            "sub-channel (address = 852 CU, size = 12 CU, protection = 1-A, 8 kbit/s)"
        );
    }
}
