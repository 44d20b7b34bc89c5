use super::metadata::Version;

// Iterator over the encoding region of a symbol
//------------------------------------------------------------------------------

/// Walks the modules of the encoding region in placement order: two
/// module wide columns traversed in a boustrophedon from the bottom
/// right corner, skipping the vertical timing column.
pub struct EncRegionIter {
    r: i32,
    c: i32,
    side: i32,
}

const VERT_TIMING_COL: i32 = 6;

impl EncRegionIter {
    pub fn new(version: Version) -> Self {
        let side = version.side() as i32;
        Self { r: side - 1, c: side - 1, side }
    }
}

impl Iterator for EncRegionIter {
    type Item = (i32, i32);
    fn next(&mut self) -> Option<Self::Item> {
        let adjusted_col = if self.c <= VERT_TIMING_COL { self.c + 1 } else { self.c };
        if self.c < 0 {
            return None;
        }
        let res = (self.r, self.c);
        match (self.side - adjusted_col) % 4 {
            2 if self.r > 0 => {
                self.r -= 1;
                self.c += 1;
            }
            0 if self.r < self.side - 1 => {
                self.r += 1;
                self.c += 1;
            }
            0 | 2 if self.c == VERT_TIMING_COL + 1 => {
                self.c -= 2;
            }
            _ => {
                self.c -= 1;
            }
        }
        Some(res)
    }
}
