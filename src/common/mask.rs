use std::ops::Deref;

use crate::matrix::SymbolMatrix;

// Mask pattern
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> Self {
        debug_assert!(pattern < 8, "Invalid masking pattern");
        Self(pattern)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

mod mask_functions {
    pub fn checkerboard(r: i32, c: i32) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i32, _: i32) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i32, c: i32) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i32, c: i32) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i32, c: i32) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i32, c: i32) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i32, c: i32) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i32, c: i32) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    /// The predicate deciding which modules the pattern flips.
    pub fn mask_function(self) -> fn(i32, i32) -> bool {
        match self.0 {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            0b111 => mask_functions::meadow,
            _ => unreachable!("Invalid pattern"),
        }
    }
}

// Mask evaluation
//------------------------------------------------------------------------------

/// Tries all eight patterns, keeps the one with the lowest total
/// penalty applied, and returns it.
pub fn apply_best_mask(matrix: &mut SymbolMatrix) -> MaskPattern {
    let best_mask = (0..8)
        .min_by_key(|&m| {
            let mut candidate = matrix.clone();
            candidate.apply_mask(MaskPattern(m));
            compute_total_penalty(&candidate)
        })
        .expect("Should return at least 1 mask");
    let best_mask = MaskPattern(best_mask);
    matrix.apply_mask(best_mask);
    best_mask
}

pub fn compute_total_penalty(matrix: &SymbolMatrix) -> u32 {
    let adj_pen = compute_adjacent_penalty(matrix);
    let blk_pen = compute_block_penalty(matrix);
    let fp_pen_h = compute_finder_pattern_penalty(matrix, true);
    let fp_pen_v = compute_finder_pattern_penalty(matrix, false);
    let bal_pen = compute_balance_penalty(matrix);
    adj_pen + blk_pen + fp_pen_h + fp_pen_v + bal_pen
}

// Runs of 5 or more same-colored modules, along rows and columns
fn compute_adjacent_penalty(matrix: &SymbolMatrix) -> u32 {
    let mut pen = 0;
    let w = matrix.side() as usize;
    let mut cols = vec![(false, 0usize); w];
    for r in 0..w {
        let mut last = false;
        let mut consec_row_len = 0;
        for (c, col) in cols.iter_mut().enumerate() {
            let clr = matrix.get(r as i32, c as i32);
            if last != clr {
                last = clr;
                consec_row_len = 0;
            }
            consec_row_len += 1;
            if consec_row_len == 5 {
                pen += 3;
            } else if consec_row_len > 5 {
                pen += 1;
            }
            if col.0 != clr {
                col.0 = clr;
                col.1 = 0;
            }
            col.1 += 1;
            if col.1 == 5 {
                pen += 3;
            } else if col.1 > 5 {
                pen += 1;
            }
        }
    }
    pen
}

// 2x2 blocks of a single color
fn compute_block_penalty(matrix: &SymbolMatrix) -> u32 {
    let mut pen = 0;
    let w = matrix.side() as i32;
    for r in 0..w - 1 {
        for c in 0..w - 1 {
            let clr = matrix.get(r, c);
            if clr == matrix.get(r + 1, c)
                && clr == matrix.get(r, c + 1)
                && clr == matrix.get(r + 1, c + 1)
            {
                pen += 3;
            }
        }
    }
    pen
}

// 1:1:3:1:1 finder-like sequences with a 4 module light run on a side
fn compute_finder_pattern_penalty(matrix: &SymbolMatrix, is_hor: bool) -> u32 {
    let mut pen = 0;
    let w = matrix.side() as i32;
    static PATTERN: [bool; 7] = [true, false, true, true, true, false, true];
    for i in 0..w {
        for j in 0..w - 6 {
            let get = |x: i32| if is_hor { matrix.get(i, x) } else { matrix.get(x, i) };
            if (j..j + 7).map(get).eq(PATTERN.iter().copied()) {
                // Out of bounds counts as light
                let is_light = |x: i32| x < 0 || x >= w || !get(x);
                if (j - 4..j).all(is_light) || (j + 7..j + 11).all(is_light) {
                    pen += 40;
                }
            }
        }
    }
    pen
}

// Deviation of the dark module ratio from 50%, in steps of 5%
fn compute_balance_penalty(matrix: &SymbolMatrix) -> u32 {
    let dark_cnt = matrix.count_dark();
    let w = matrix.side() as usize;
    let tot = w * w;
    let ratio = dark_cnt * 200 / tot;
    let deviation = if ratio < 100 { 100 - ratio } else { ratio - 100 };
    (deviation as u32 / 10) * 10
}

#[cfg(test)]
mod mask_tests {
    use test_case::test_case;

    use super::{mask_functions, MaskPattern};

    #[test_case(0, &[(0, 0, true), (0, 1, false), (1, 2, false), (2, 2, true)])]
    #[test_case(1, &[(0, 5, true), (1, 5, false), (2, 0, true)])]
    #[test_case(2, &[(5, 0, true), (5, 1, false), (5, 3, true)])]
    #[test_case(7, &[(0, 0, true), (0, 1, false), (2, 1, false)])]
    fn test_mask_functions(pattern: u8, cases: &[(i32, i32, bool)]) {
        let f = MaskPattern::new(pattern).mask_function();
        for &(r, c, exp) in cases {
            assert_eq!(f(r, c), exp, "Pattern {pattern} at ({r}, {c})");
        }
    }

    #[test]
    fn test_mask_coverage_differs() {
        // No two patterns flip the same module set
        for a in 0..8u8 {
            for b in a + 1..8 {
                let fa = MaskPattern::new(a).mask_function();
                let fb = MaskPattern::new(b).mask_function();
                let differs = (0..12).any(|r| (0..12).any(|c| fa(r, c) != fb(r, c)));
                assert!(differs, "Patterns {a} and {b} are identical");
            }
        }
    }

    #[test]
    fn test_checkerboard() {
        assert!(mask_functions::checkerboard(4, 4));
        assert!(!mask_functions::checkerboard(4, 5));
    }
}
