use std::fmt::{Display, Formatter};

use super::error::{QrError, QrResult};

// Version
//------------------------------------------------------------------------------

/// QR symbol version, 1 through 40. Version `v` has a side length of
/// `4 * v + 17` modules.
#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub struct Version(u8);

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub const fn new(v: u8) -> Self {
        debug_assert!(1 <= v && v <= 40, "Invalid version");
        Self(v)
    }

    pub fn from_side(side: i32) -> QrResult<Self> {
        if !(21..=177).contains(&side) || (side - 17) % 4 != 0 {
            return Err(QrError::NotFound);
        }
        Ok(Self(((side - 17) / 4) as u8))
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    pub const fn side(self) -> i32 {
        self.0 as i32 * 4 + 17
    }

    /// Total modules available for codewords, including the remainder
    /// bits that don't complete a codeword.
    pub const fn raw_data_modules(self) -> usize {
        let v = self.0 as usize;
        let mut n = (16 * v + 128) * v + 64;
        if v >= 2 {
            let align = v / 7 + 2;
            n -= (25 * align - 10) * align - 55;
            if v >= 7 {
                n -= 36;
            }
        }
        n
    }

    pub const fn total_codewords(self) -> usize {
        self.raw_data_modules() / 8
    }

    pub const fn ecc_per_block(self, ecl: ECLevel) -> usize {
        ECC_CODEWORDS_PER_BLOCK[ecl as usize][self.0 as usize] as usize
    }

    pub const fn block_count(self, ecl: ECLevel) -> usize {
        ERROR_CORRECTION_BLOCKS[ecl as usize][self.0 as usize] as usize
    }

    /// Data codeword capacity in bytes.
    pub const fn data_capacity(self, ecl: ECLevel) -> usize {
        self.total_codewords() - self.ecc_per_block(ecl) * self.block_count(ecl)
    }

    pub const fn data_bit_capacity(self, ecl: ECLevel) -> usize {
        self.data_capacity(ecl) * 8
    }

    pub const fn mode_bits(self) -> usize {
        4
    }

    /// Bit width of the character count field for the given mode.
    pub const fn char_count_bits(self, mode: Mode) -> usize {
        let group = match self.0 {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        match mode {
            Mode::Numeric => [10, 12, 14][group],
            Mode::Alphanumeric => [9, 11, 13][group],
            Mode::Byte => [8, 16, 16][group],
        }
    }

    /// Centre coordinates of alignment patterns along one axis. Empty for
    /// version 1. The full set is the cartesian product minus the three
    /// positions overlapping the finder patterns.
    pub fn alignment_positions(self) -> Vec<i32> {
        let v = self.0 as i32;
        if v == 1 {
            return Vec::new();
        }
        let count = v / 7 + 2;
        let step = if v == 32 { 26 } else { (v * 4 + count * 2 + 1) / (count * 2 - 2) * 2 };
        let mut positions = vec![6];
        for i in (0..count - 1).rev() {
            positions.push(self.side() - 7 - i * step);
        }
        positions
    }

    /// The 18-bit BCH-protected version information, present for
    /// versions 7 and above.
    pub const fn info(self) -> u32 {
        VERSION_INFOS[self.0 as usize - 7]
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Error correction level
//------------------------------------------------------------------------------

/// The four redundancy tiers, trading payload capacity for damage
/// tolerance: L ~7%, M ~15%, Q ~25%, H ~30%.
#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub enum ECLevel {
    L = 0,
    M = 1,
    Q = 2,
    H = 3,
}

impl ECLevel {
    pub const ALL: [ECLevel; 4] = [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H];

    /// The 2-bit value carried in the format information.
    pub const fn format_bits(self) -> u32 {
        match self {
            ECLevel::L => 1,
            ECLevel::M => 0,
            ECLevel::Q => 3,
            ECLevel::H => 2,
        }
    }

    pub const fn from_format_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => ECLevel::L,
            0 => ECLevel::M,
            3 => ECLevel::Q,
            _ => ECLevel::H,
        }
    }
}

// Mode
//------------------------------------------------------------------------------

/// Segment encoding modes, in increasing order of bits per character.
#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
}

pub static MODES: [Mode; 3] = [Mode::Numeric, Mode::Alphanumeric, Mode::Byte];

static ALPHANUMERIC_CHARSET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

impl Mode {
    pub const fn indicator(self) -> u16 {
        match self {
            Mode::Numeric => 0b0001,
            Mode::Alphanumeric => 0b0010,
            Mode::Byte => 0b0100,
        }
    }

    pub fn from_indicator(bits: u16) -> QrResult<Self> {
        match bits {
            0b0001 => Ok(Mode::Numeric),
            0b0010 => Ok(Mode::Alphanumeric),
            0b0100 => Ok(Mode::Byte),
            _ => Err(QrError::ChecksumFailure),
        }
    }

    pub fn contains(self, b: u8) -> bool {
        match self {
            Mode::Numeric => b.is_ascii_digit(),
            Mode::Alphanumeric => alphanumeric_index(b).is_some(),
            Mode::Byte => true,
        }
    }

    /// Packs a chunk of 1-3 (numeric) or 1-2 (alphanumeric) characters
    /// into its bit value. Byte chunks are single bytes.
    pub fn encode_chunk(self, chunk: &[u8]) -> u16 {
        match self {
            Mode::Numeric => chunk.iter().fold(0, |acc, b| acc * 10 + u16::from(b - b'0')),
            Mode::Alphanumeric => chunk.iter().fold(0, |acc, b| {
                acc * 45 + alphanumeric_index(*b).expect("Alphanumeric char expected") as u16
            }),
            Mode::Byte => chunk[0] as u16,
        }
    }

    pub fn decode_chunk(self, value: u16, char_count: usize) -> Vec<u8> {
        match self {
            Mode::Numeric => {
                let mut out = vec![0; char_count];
                let mut v = value;
                for b in out.iter_mut().rev() {
                    *b = b'0' + (v % 10) as u8;
                    v /= 10;
                }
                out
            }
            Mode::Alphanumeric => {
                let mut out = vec![0; char_count];
                let mut v = value;
                for b in out.iter_mut().rev() {
                    *b = ALPHANUMERIC_CHARSET[(v % 45) as usize];
                    v /= 45;
                }
                out
            }
            Mode::Byte => vec![value as u8],
        }
    }
}

fn alphanumeric_index(b: u8) -> Option<usize> {
    ALPHANUMERIC_CHARSET.iter().position(|&c| c == b)
}

// Format information
//------------------------------------------------------------------------------

const FORMAT_MASK: u32 = 0x5412;

const fn bch_format(data: u32) -> u32 {
    let mut rem = data;
    let mut i = 0;
    while i < 10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
        i += 1;
    }
    ((data << 10) | rem) ^ FORMAT_MASK
}

const fn build_format_infos() -> [u32; 32] {
    let mut infos = [0u32; 32];
    let mut i = 0;
    while i < 32 {
        infos[i] = bch_format(i as u32);
        i += 1;
    }
    infos
}

/// All 32 valid 15-bit format codes, indexed by `ec_bits << 3 | mask`.
pub static FORMAT_INFOS: [u32; 32] = build_format_infos();

pub const FORMAT_ERROR_CAPACITY: u32 = 3;

pub const fn format_info(ecl: ECLevel, mask: u8) -> u32 {
    FORMAT_INFOS[(ecl.format_bits() << 3) as usize | mask as usize]
}

// Version information
//------------------------------------------------------------------------------

const fn bch_version(v: u32) -> u32 {
    let mut rem = v;
    let mut i = 0;
    while i < 12 {
        rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
        i += 1;
    }
    (v << 12) | rem
}

const fn build_version_infos() -> [u32; 34] {
    let mut infos = [0u32; 34];
    let mut v = 7;
    while v <= 40 {
        infos[v - 7] = bch_version(v as u32);
        v += 1;
    }
    infos
}

/// The 34 valid 18-bit version codes, for versions 7..=40.
pub static VERSION_INFOS: [u32; 34] = build_version_infos();

pub const VERSION_ERROR_CAPACITY: u32 = 3;

// Error correction tables, indexed by [ec level][version]
//------------------------------------------------------------------------------

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // L
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // M
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Q
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // H
];

static ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // L
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // M
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Q
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // H
];

#[cfg(test)]
mod metadata_tests {
    use test_case::test_case;

    use super::{format_info, ECLevel, Mode, Version, FORMAT_INFOS, VERSION_INFOS};

    #[test_case(Version::new(1), 21)]
    #[test_case(Version::new(7), 45)]
    #[test_case(Version::new(40), 177)]
    fn test_side(ver: Version, side: i32) {
        assert_eq!(ver.side(), side);
    }

    #[test_case(21, Some(Version::new(1)))]
    #[test_case(45, Some(Version::new(7)))]
    #[test_case(177, Some(Version::new(40)))]
    #[test_case(20, None)]
    #[test_case(181, None)]
    fn test_from_side(side: i32, exp: Option<Version>) {
        assert_eq!(Version::from_side(side).ok(), exp);
    }

    #[test_case(Version::new(1), 26)]
    #[test_case(Version::new(2), 44)]
    #[test_case(Version::new(10), 346)]
    #[test_case(Version::new(40), 3706)]
    fn test_total_codewords(ver: Version, exp: usize) {
        assert_eq!(ver.total_codewords(), exp);
    }

    #[test_case(Version::new(1), ECLevel::L, 19)]
    #[test_case(Version::new(1), ECLevel::H, 9)]
    #[test_case(Version::new(2), ECLevel::M, 28)]
    #[test_case(Version::new(40), ECLevel::L, 2956)]
    fn test_data_capacity(ver: Version, ecl: ECLevel, exp: usize) {
        assert_eq!(ver.data_capacity(ecl), exp);
    }

    #[test_case(Version::new(1), vec![])]
    #[test_case(Version::new(2), vec![6, 18])]
    #[test_case(Version::new(7), vec![6, 22, 38])]
    #[test_case(Version::new(40), vec![6, 30, 58, 86, 114, 142, 170])]
    fn test_alignment_positions(ver: Version, exp: Vec<i32>) {
        assert_eq!(ver.alignment_positions(), exp);
    }

    #[test]
    fn test_format_info_reference_value() {
        // Worked example from the standard: M level, mask 5
        assert_eq!(format_info(ECLevel::M, 0b101), 0b100000011001110);
    }

    #[test]
    fn test_format_infos_distance() {
        // Any two distinct format codes differ in at least 7 bits
        for (i, a) in FORMAT_INFOS.iter().enumerate() {
            for b in FORMAT_INFOS.iter().skip(i + 1) {
                assert!((a ^ b).count_ones() >= 7);
            }
        }
    }

    #[test]
    fn test_version_info_reference_value() {
        // Worked example from the standard for version 7
        assert_eq!(VERSION_INFOS[0], 0b000111110010010100);
        assert_eq!(Version::new(7).info(), 0b000111110010010100);
    }

    #[test]
    fn test_char_count_bits() {
        assert_eq!(Version::new(1).char_count_bits(Mode::Numeric), 10);
        assert_eq!(Version::new(10).char_count_bits(Mode::Alphanumeric), 11);
        assert_eq!(Version::new(27).char_count_bits(Mode::Byte), 16);
    }

    #[test]
    fn test_mode_contains() {
        assert!(Mode::Numeric.contains(b'7'));
        assert!(!Mode::Numeric.contains(b'A'));
        assert!(Mode::Alphanumeric.contains(b'A'));
        assert!(Mode::Alphanumeric.contains(b' '));
        assert!(!Mode::Alphanumeric.contains(b'a'));
        assert!(Mode::Byte.contains(0xff));
    }

    #[test]
    fn test_chunk_roundtrip() {
        assert_eq!(Mode::Numeric.encode_chunk(b"867"), 867);
        assert_eq!(Mode::Numeric.decode_chunk(867, 3), b"867");
        let v = Mode::Alphanumeric.encode_chunk(b"AC");
        assert_eq!(v, 10 * 45 + 12);
        assert_eq!(Mode::Alphanumeric.decode_chunk(v, 2), b"AC");
    }
}
