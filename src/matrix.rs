use std::fmt::{Display, Formatter};

use crate::common::{
    iter::EncRegionIter,
    mask::MaskPattern,
    metadata::{format_info, ECLevel, Version},
};

// Symbol matrix
//------------------------------------------------------------------------------

/// The module grid of a QR symbol. `true` is a dark module. Row and
/// column indices wrap around once, so -1 addresses the last row or
/// column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatrix {
    version: Version,
    side: i32,
    grid: Vec<bool>,
}

impl SymbolMatrix {
    /// A light grid with the function patterns of `version` drawn in.
    pub(crate) fn new(version: Version) -> Self {
        let side = version.side();
        let grid = vec![false; (side * side) as usize];
        let mut matrix = Self { version, side, grid };
        matrix.draw_function_patterns();
        matrix
    }

    /// Builds a matrix by sampling `f` at every module coordinate.
    pub(crate) fn from_fn(version: Version, mut f: impl FnMut(i32, i32) -> bool) -> Self {
        let side = version.side();
        let mut grid = Vec::with_capacity((side * side) as usize);
        for r in 0..side {
            for c in 0..side {
                grid.push(f(r, c));
            }
        }
        Self { version, side, grid }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn side(&self) -> i32 {
        self.side
    }

    fn coord(&self, r: i32, c: i32) -> usize {
        debug_assert!(
            (-self.side..self.side).contains(&r) && (-self.side..self.side).contains(&c),
            "Out of bound: Row {r}, Column {c}"
        );
        let r = if r < 0 { r + self.side } else { r };
        let c = if c < 0 { c + self.side } else { c };
        (r * self.side + c) as usize
    }

    pub fn get(&self, r: i32, c: i32) -> bool {
        self.grid[self.coord(r, c)]
    }

    pub(crate) fn set(&mut self, r: i32, c: i32, dark: bool) {
        let i = self.coord(r, c);
        self.grid[i] = dark;
    }

    pub fn count_dark(&self) -> usize {
        self.grid.iter().filter(|&&m| m).count()
    }

    // Function patterns
    //--------------------------------------------------------------------------

    /// Whether the module belongs to a function pattern or an info area,
    /// i.e. everything outside the encoding region.
    pub(crate) fn is_functional(&self, r: i32, c: i32) -> bool {
        let w = self.side;
        let r = if r < 0 { r + w } else { r };
        let c = if c < 0 { c + w } else { c };

        // Finder patterns with their separators and format areas
        if (r <= 8 && c <= 8) || (r <= 8 && c >= w - 8) || (r >= w - 8 && c <= 8) {
            return true;
        }
        // Timing patterns
        if r == 6 || c == 6 {
            return true;
        }
        // Version info areas
        if self.version.number() >= 7 && ((r <= 5 && c >= w - 11) || (c <= 5 && r >= w - 11)) {
            return true;
        }
        self.is_alignment(r, c)
    }

    fn is_alignment(&self, r: i32, c: i32) -> bool {
        let w = self.side;
        let positions = self.version.alignment_positions();
        for &ar in &positions {
            for &ac in &positions {
                // The three centres inside finder corners don't exist
                if (ar <= 8 && ac <= 8) || (ar <= 8 && ac >= w - 9) || (ar >= w - 9 && ac <= 8) {
                    continue;
                }
                if (r - ar).abs() <= 2 && (c - ac).abs() <= 2 {
                    return true;
                }
            }
        }
        false
    }

    fn draw_function_patterns(&mut self) {
        self.draw_finder_pattern_at(3, 3);
        self.draw_finder_pattern_at(3, -4);
        self.draw_finder_pattern_at(-4, 3);
        self.draw_timing_patterns();
        self.draw_alignment_patterns();
        // The dark module below the top-right corner of the bottom-left
        // finder pattern
        self.set(-8, 8, true);
    }

    fn draw_finder_pattern_at(&mut self, r: i32, c: i32) {
        let (dr_lo, dr_hi): (i32, i32) = if r > 0 { (-3, 4) } else { (-4, 3) };
        let (dc_lo, dc_hi): (i32, i32) = if c > 0 { (-3, 4) } else { (-4, 3) };
        for i in dr_lo..=dr_hi {
            for j in dc_lo..=dc_hi {
                let d = i32::max(i.abs(), j.abs());
                self.set(r + i, c + j, d == 3 || d <= 1);
            }
        }
    }

    fn draw_timing_patterns(&mut self) {
        for i in 8..self.side - 8 {
            self.set(6, i, i & 1 == 0);
            self.set(i, 6, i & 1 == 0);
        }
    }

    fn draw_alignment_patterns(&mut self) {
        let w = self.side;
        let positions = self.version.alignment_positions();
        for &ar in &positions {
            for &ac in &positions {
                if (ar <= 8 && ac <= 8) || (ar <= 8 && ac >= w - 9) || (ar >= w - 9 && ac <= 8) {
                    continue;
                }
                for i in -2i32..=2 {
                    for j in -2i32..=2 {
                        let d = i32::max(i.abs(), j.abs());
                        self.set(ar + i, ac + j, d != 1);
                    }
                }
            }
        }
    }

    // Info areas
    //--------------------------------------------------------------------------

    fn draw_number(&mut self, number: u32, bit_len: u32, coords: &[(i32, i32)]) {
        debug_assert!(bit_len as usize == coords.len(), "Bit length mismatch");

        let mut mask = 1u32 << (bit_len - 1);
        for &(r, c) in coords {
            self.set(r, c, number & mask != 0);
            mask >>= 1;
        }
    }

    /// Reads the bits at `coords`, most significant first.
    pub(crate) fn read_number(&self, coords: &[(i32, i32)]) -> u32 {
        coords.iter().fold(0, |acc, &(r, c)| acc << 1 | self.get(r, c) as u32)
    }

    /// Marks the format areas before masking so penalty scoring sees
    /// them as occupied. The real info is drawn once a mask is chosen.
    pub(crate) fn reserve_format_area(&mut self) {
        self.draw_number(1 << 14, 15, &FORMAT_INFO_COORDS_MAIN);
        self.draw_number(1 << 14, 15, &FORMAT_INFO_COORDS_SIDE);
    }

    pub(crate) fn draw_format_info(&mut self, ecl: ECLevel, mask: MaskPattern) {
        let info = format_info(ecl, *mask);
        self.draw_number(info, 15, &FORMAT_INFO_COORDS_MAIN);
        self.draw_number(info, 15, &FORMAT_INFO_COORDS_SIDE);
    }

    pub(crate) fn draw_version_info(&mut self) {
        if self.version.number() < 7 {
            return;
        }
        let info = self.version.info();
        self.draw_number(info, 18, &VERSION_INFO_COORDS_BL);
        self.draw_number(info, 18, &VERSION_INFO_COORDS_TR);
    }

    // Encoding region
    //--------------------------------------------------------------------------

    /// Lays the payload codewords into the encoding region in zigzag
    /// placement order. Remainder bits stay light.
    pub(crate) fn place_data(&mut self, payload: &[u8]) {
        let mut bits =
            payload.iter().flat_map(|&b| (0..8).rev().map(move |i| b >> i & 1 == 1));
        for (r, c) in EncRegionIter::new(self.version) {
            if !self.is_functional(r, c) {
                let bit = bits.next().unwrap_or(false);
                self.set(r, c, bit);
            }
        }
    }

    /// Reads the payload codewords back out of the encoding region.
    pub(crate) fn extract_payload(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.version.total_codewords()];
        let cap = out.len() * 8;
        let mut i = 0;
        for (r, c) in EncRegionIter::new(self.version) {
            if self.is_functional(r, c) || i >= cap {
                continue;
            }
            if self.get(r, c) {
                out[i >> 3] |= 0x80 >> (i & 7);
            }
            i += 1;
        }
        out
    }

    /// Flips the encoding region modules selected by the pattern.
    /// Applying the same pattern twice restores the original.
    pub(crate) fn apply_mask(&mut self, pattern: MaskPattern) {
        let f = pattern.mask_function();
        for r in 0..self.side {
            for c in 0..self.side {
                if !self.is_functional(r, c) && f(r, c) {
                    let i = self.coord(r, c);
                    self.grid[i] = !self.grid[i];
                }
            }
        }
    }
}

impl Display for SymbolMatrix {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for r in 0..self.side {
            for c in 0..self.side {
                f.write_str(if self.get(r, c) { "██" } else { "  " })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

// Info area coordinates, most significant bit first
//------------------------------------------------------------------------------

pub(crate) static FORMAT_INFO_COORDS_MAIN: [(i32, i32); 15] = [
    (8, 0),
    (8, 1),
    (8, 2),
    (8, 3),
    (8, 4),
    (8, 5),
    (8, 7),
    (8, 8),
    (7, 8),
    (5, 8),
    (4, 8),
    (3, 8),
    (2, 8),
    (1, 8),
    (0, 8),
];

pub(crate) static FORMAT_INFO_COORDS_SIDE: [(i32, i32); 15] = [
    (-1, 8),
    (-2, 8),
    (-3, 8),
    (-4, 8),
    (-5, 8),
    (-6, 8),
    (-7, 8),
    (8, -8),
    (8, -7),
    (8, -6),
    (8, -5),
    (8, -4),
    (8, -3),
    (8, -2),
    (8, -1),
];

pub(crate) static VERSION_INFO_COORDS_BL: [(i32, i32); 18] = [
    (-9, 5),
    (-10, 5),
    (-11, 5),
    (-9, 4),
    (-10, 4),
    (-11, 4),
    (-9, 3),
    (-10, 3),
    (-11, 3),
    (-9, 2),
    (-10, 2),
    (-11, 2),
    (-9, 1),
    (-10, 1),
    (-11, 1),
    (-9, 0),
    (-10, 0),
    (-11, 0),
];

pub(crate) static VERSION_INFO_COORDS_TR: [(i32, i32); 18] = [
    (5, -9),
    (5, -10),
    (5, -11),
    (4, -9),
    (4, -10),
    (4, -11),
    (3, -9),
    (3, -10),
    (3, -11),
    (2, -9),
    (2, -10),
    (2, -11),
    (1, -9),
    (1, -10),
    (1, -11),
    (0, -9),
    (0, -10),
    (0, -11),
];

#[cfg(test)]
mod matrix_tests {
    use test_case::test_case;

    use super::{
        SymbolMatrix, FORMAT_INFO_COORDS_MAIN, FORMAT_INFO_COORDS_SIDE, VERSION_INFO_COORDS_BL,
        VERSION_INFO_COORDS_TR,
    };
    use crate::common::mask::MaskPattern;
    use crate::common::metadata::{format_info, ECLevel, Version};

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(6)]
    #[test_case(7)]
    #[test_case(14)]
    #[test_case(21)]
    #[test_case(32)]
    #[test_case(40)]
    fn test_encoding_region_size(v: u8) {
        let version = Version::new(v);
        let matrix = SymbolMatrix::new(version);
        let side = version.side();
        let free = (0..side)
            .flat_map(|r| (0..side).map(move |c| (r, c)))
            .filter(|&(r, c)| !matrix.is_functional(r, c))
            .count();
        assert_eq!(free, version.raw_data_modules());
    }

    #[test]
    fn test_finder_patterns() {
        let matrix = SymbolMatrix::new(Version::new(1));
        // Outer ring dark, middle ring light, core dark
        assert!(matrix.get(0, 0));
        assert!(!matrix.get(1, 1));
        assert!(matrix.get(2, 2));
        assert!(matrix.get(3, 3));
        // Separators are light
        assert!(!matrix.get(7, 7));
        assert!(!matrix.get(0, 7));
        assert!(!matrix.get(7, -8));
        assert!(!matrix.get(-8, 7));
        // Corners of the other two finders
        assert!(matrix.get(0, -1));
        assert!(matrix.get(-1, 0));
    }

    #[test]
    fn test_timing_and_dark_module() {
        let matrix = SymbolMatrix::new(Version::new(2));
        assert!(matrix.get(6, 8));
        assert!(!matrix.get(6, 9));
        assert!(matrix.get(8, 6));
        assert!(!matrix.get(9, 6));
        assert!(matrix.get(-8, 8));
    }

    #[test]
    fn test_alignment_pattern() {
        // Version 2 has a single alignment pattern centred at (18, 18)
        let matrix = SymbolMatrix::new(Version::new(2));
        assert!(matrix.get(18, 18));
        assert!(!matrix.get(18, 17));
        assert!(matrix.get(16, 16));
        for (r, c) in [(18, 18), (20, 16), (17, 18)] {
            assert!(matrix.is_functional(r, c));
        }
        assert!(!matrix.is_functional(13, 18));
    }

    #[test]
    fn test_format_info_roundtrip() {
        let mut matrix = SymbolMatrix::new(Version::new(1));
        matrix.draw_format_info(ECLevel::Q, MaskPattern::new(3));
        let exp = format_info(ECLevel::Q, 3);
        assert_eq!(matrix.read_number(&FORMAT_INFO_COORDS_MAIN), exp);
        assert_eq!(matrix.read_number(&FORMAT_INFO_COORDS_SIDE), exp);
    }

    #[test]
    fn test_version_info_roundtrip() {
        let mut matrix = SymbolMatrix::new(Version::new(7));
        matrix.draw_version_info();
        assert_eq!(matrix.read_number(&VERSION_INFO_COORDS_BL), Version::new(7).info());
        assert_eq!(matrix.read_number(&VERSION_INFO_COORDS_TR), Version::new(7).info());
    }

    #[test]
    fn test_payload_roundtrip() {
        let version = Version::new(3);
        let payload: Vec<u8> =
            (0..version.total_codewords()).map(|i| (i * 37 + 11) as u8).collect();
        let mut matrix = SymbolMatrix::new(version);
        matrix.place_data(&payload);
        assert_eq!(matrix.extract_payload(), payload);
    }

    #[test]
    fn test_mask_is_involutive() {
        let version = Version::new(2);
        let payload: Vec<u8> = (0..version.total_codewords()).map(|i| i as u8).collect();
        let mut matrix = SymbolMatrix::new(version);
        matrix.place_data(&payload);
        let original = matrix.clone();
        for m in 0..8 {
            matrix.apply_mask(MaskPattern::new(m));
            assert_ne!(matrix, original);
            matrix.apply_mask(MaskPattern::new(m));
            assert_eq!(matrix, original);
        }
    }
}
