use log::debug;

use super::{binarize::BinaryImage, geometry::Point};

// Finder candidate
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct FinderCandidate {
    pub center: Point,
    pub module_size: f64,
    // Number of scanline hits merged into this candidate
    count: u32,
}

// Line scanner to detect finder lines
//------------------------------------------------------------------------------

// **   ******   **  <- Finder line, runs in the 1:1:3:1:1 ratio
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct LineScanner {
    buffer: [u32; 6], // Run length of each transition
    prev: Option<bool>,
    flips: u32,
    pos: u32,
    y: u32,
}

#[derive(Debug, Clone, Copy)]
struct DatumLine {
    // Start of the middle run
    stone: u32,
    y: u32,
}

impl LineScanner {
    fn new() -> Self {
        Self { buffer: [0; 6], prev: None, flips: 0, pos: 0, y: 0 }
    }

    fn reset(&mut self, y: u32) {
        self.buffer[5] = 0;
        self.prev = None;
        self.flips = 0;
        self.pos = 0;
        self.y = y;
    }

    fn advance(&mut self, dark: bool) -> Option<DatumLine> {
        self.pos += 1;

        if self.prev == Some(dark) {
            self.buffer[5] += 1;
            return None;
        }

        self.buffer.rotate_left(1);
        self.buffer[5] = 1;
        self.prev = Some(dark);
        self.flips += 1;

        // A full pattern ends on a dark-to-light transition
        if dark {
            return None;
        }
        if self.is_finder_line() {
            Some(DatumLine { stone: self.pos - 1 - self.buffer[2..5].iter().sum::<u32>(), y: self.y })
        } else {
            None
        }
    }

    // Validates whether the last 5 run lengths are in the 1:1:3:1:1 ratio
    fn is_finder_line(&self) -> bool {
        if self.flips < 5 {
            return false;
        }

        let avg = (self.buffer[..5].iter().sum::<u32>() as f64) / 7.0;
        let tol = avg * 3.0 / 4.0;

        let ratio = [1.0, 1.0, 3.0, 1.0, 1.0];
        for (rl, r) in self.buffer[..5].iter().zip(ratio.iter()) {
            let rl = *rl as f64;
            if rl < r * avg - tol || rl > r * avg + tol {
                return false;
            }
        }
        true
    }
}

// Locate finders
//------------------------------------------------------------------------------

/// Scans every row for 1:1:3:1:1 runs, cross-checks the hits along the
/// other axis and merges duplicates into candidate centres.
pub(crate) fn locate_finders(img: &BinaryImage) -> Vec<FinderCandidate> {
    let mut candidates: Vec<FinderCandidate> = Vec::new();
    let mut scanner = LineScanner::new();

    for y in 0..img.h {
        for x in 0..img.w {
            if let Some(datum) = scanner.advance(img.get(x, y)) {
                verify_candidate(img, &scanner, &datum, &mut candidates);
            }
        }

        // Flush so a symbol flush with the right edge still completes
        if let Some(datum) = scanner.advance(false) {
            verify_candidate(img, &scanner, &datum, &mut candidates);
        }

        scanner.reset(y + 1);
    }

    debug!("Located {} finder candidates", candidates.len());
    candidates
}

fn verify_candidate(
    img: &BinaryImage,
    scn: &LineScanner,
    datum: &DatumLine,
    candidates: &mut Vec<FinderCandidate>,
) {
    let mid_run = scn.buffer[2];
    let cx = datum.stone as f64 + mid_run as f64 / 2.0;
    let cy = datum.y as f64;

    // Cross-check along Y at the horizontal centre
    let Some((cy, vsize)) = cross_check(img, cx, cy, false) else {
        return;
    };
    // Re-check along X at the refined vertical centre
    let Some((cx, hsize)) = cross_check(img, cx, cy, true) else {
        return;
    };

    // Both axes must see a similar module size
    let ratio = vsize / hsize;
    if !(0.5..=2.0).contains(&ratio) {
        return;
    }

    let center = Point::new(cx, cy);
    let module_size = (vsize + hsize) / 2.0;

    // Merge with an existing candidate when close enough
    for c in candidates.iter_mut() {
        if c.center.dist(&center) <= c.module_size * 4.0
            && (0.5..=2.0).contains(&(c.module_size / module_size))
        {
            let n = c.count as f64;
            c.center.x = (c.center.x * n + center.x) / (n + 1.0);
            c.center.y = (c.center.y * n + center.y) / (n + 1.0);
            c.module_size = (c.module_size * n + module_size) / (n + 1.0);
            c.count += 1;
            return;
        }
    }
    candidates.push(FinderCandidate { center, module_size, count: 1 });
}

// Walks outward from a point and validates the five runs of a finder
// pattern along one axis. Returns the refined centre coordinate along
// that axis and the implied module size.
fn cross_check(img: &BinaryImage, cx: f64, cy: f64, horizontal: bool) -> Option<(f64, f64)> {
    let (x, y) = (cx.round() as i64, cy.round() as i64);
    if !img.in_bounds(x, y) || !img.get_checked(x, y) {
        return None;
    }
    let (dx, dy) = if horizontal { (1i64, 0i64) } else { (0, 1) };

    let max_run = (img.w.max(img.h) as i64).max(1);

    // Middle run, extended both ways
    let lo = walk(img, x, y, -dx, -dy, true, max_run);
    let hi = walk(img, x, y, dx, dy, true, max_run);
    let mid = lo + hi + 1;

    // White then dark runs on the low side
    let (lx, ly) = (x - dx * (lo + 1), y - dy * (lo + 1));
    let w_lo = run_from(img, lx, ly, -dx, -dy, false, mid);
    let (lx, ly) = (lx - dx * w_lo, ly - dy * w_lo);
    let d_lo = run_from(img, lx, ly, -dx, -dy, true, mid);

    // White then dark runs on the high side
    let (hx, hy) = (x + dx * (hi + 1), y + dy * (hi + 1));
    let w_hi = run_from(img, hx, hy, dx, dy, false, mid);
    let (hx, hy) = (hx + dx * w_hi, hy + dy * w_hi);
    let d_hi = run_from(img, hx, hy, dx, dy, true, mid);

    if w_lo == 0 || d_lo == 0 || w_hi == 0 || d_hi == 0 {
        return None;
    }

    let runs = [d_lo as f64, w_lo as f64, mid as f64, w_hi as f64, d_hi as f64];
    let total: f64 = runs.iter().sum();
    let avg = total / 7.0;
    let tol = avg * 3.0 / 4.0;
    let ratio = [1.0, 1.0, 3.0, 1.0, 1.0];
    for (rl, r) in runs.iter().zip(ratio.iter()) {
        if *rl < r * avg - tol || *rl > r * avg + tol {
            return None;
        }
    }

    let center = if horizontal {
        (x - lo) as f64 + mid as f64 / 2.0 - 0.5
    } else {
        (y - lo) as f64 + mid as f64 / 2.0 - 0.5
    };
    Some((center, avg))
}

// Steps from (x, y) while the neighbor pixel matches `dark`, up to
// `limit` steps, and returns the count. The start pixel is not counted.
fn walk(img: &BinaryImage, x: i64, y: i64, dx: i64, dy: i64, dark: bool, limit: i64) -> i64 {
    let mut n = 0;
    let (mut px, mut py) = (x + dx, y + dy);
    while n < limit && img.in_bounds(px, py) && img.get_checked(px, py) == dark {
        n += 1;
        px += dx;
        py += dy;
    }
    n
}

// Like `walk` but counts the start pixel too, so a mismatch at the
// start reads as a zero length run.
fn run_from(img: &BinaryImage, x: i64, y: i64, dx: i64, dy: i64, dark: bool, limit: i64) -> i64 {
    if !img.in_bounds(x, y) || img.get_checked(x, y) != dark {
        return 0;
    }
    walk(img, x, y, dx, dy, dark, limit - 1) + 1
}

// Group finders
//------------------------------------------------------------------------------

/// A triple of finder centres in [top-left, top-right, bottom-left]
/// order, with the estimated module size and symbol side.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FinderGroup {
    pub tl: Point,
    pub tr: Point,
    pub bl: Point,
    pub module_size: f64,
    pub side_estimate: f64,
    score: f64,
}

/// Combines candidates into provisional symbols: a right-angled corner
/// at the top-left, matching module sizes and symmetric arms.
pub(crate) fn group_finders(candidates: &[FinderCandidate]) -> Vec<FinderGroup> {
    let mut all_groups: Vec<(FinderGroup, [usize; 3])> = Vec::new();

    let n = candidates.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                if let Some(group) = form_group(candidates, [i, j, k]) {
                    all_groups.push((group, [i, j, k]));
                }
            }
        }
    }

    all_groups
        .sort_unstable_by(|a, b| a.0.score.partial_cmp(&b.0.score).expect("Score is never NaN"));

    // If a finder is in multiple groups, keep only its best scoring one
    let mut res = Vec::new();
    let mut grouped = vec![false; n];
    for (g, idx) in all_groups {
        if idx.iter().all(|&i| !grouped[i]) {
            idx.iter().for_each(|&i| grouped[i] = true);
            res.push(g);
        }
    }

    debug!("Formed {} finder groups", res.len());
    res
}

fn form_group(candidates: &[FinderCandidate], idx: [usize; 3]) -> Option<FinderGroup> {
    let sizes = idx.map(|i| candidates[i].module_size);
    let (mn, mx) = (sizes.iter().cloned().fold(f64::MAX, f64::min), sizes.iter().cloned().fold(0.0, f64::max));
    if mx / mn > 1.6 {
        return None;
    }

    // The top-left corner is the one closest to a right angle with
    // roughly equidistant arms
    let mut best: Option<(usize, f64)> = None;
    for t in 0..3 {
        let corner = candidates[idx[t]].center;
        let a = candidates[idx[(t + 1) % 3]].center;
        let b = candidates[idx[(t + 2) % 3]].center;
        let cos = corner.cos_angle(&a, &b).abs();
        let arm_ratio = (corner.dist(&a) / corner.dist(&b)).max(corner.dist(&b) / corner.dist(&a));
        if cos > 0.3 || arm_ratio > 1.35 {
            continue;
        }
        let score = cos + (arm_ratio - 1.0);
        if best.map_or(true, |(_, s)| score < s) {
            best = Some((t, score));
        }
    }
    let (t, score) = best?;

    let tl = candidates[idx[t]].center;
    let mut tr = candidates[idx[(t + 1) % 3]].center;
    let mut bl = candidates[idx[(t + 2) % 3]].center;

    // With y growing downward, tl -> tr -> bl must turn clockwise
    if tl.cross(&tr, &bl) < 0.0 {
        std::mem::swap(&mut tr, &mut bl);
    }

    let module_size = (sizes[0] + sizes[1] + sizes[2]) / 3.0;
    // Finder centres sit 3.5 modules in from the corners
    let side_estimate = (tl.dist(&tr) + tl.dist(&bl)) / 2.0 / module_size + 7.0;

    Some(FinderGroup { tl, tr, bl, module_size, side_estimate, score })
}
