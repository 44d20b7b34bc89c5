use image::RgbaImage;

// Binarization
// Steps:
// 1. Flattens the alpha channel over white and reduces to luma
// 2. Divides the image into 8x8 pixel blocks and averages each block
// 3. Thresholds each block by the average of the 5x5 blocks around it
// 4. A pixel at or below its block threshold is dark
//------------------------------------------------------------------------------

const BLOCK_SHIFT: u32 = 3;
const BLOCK_SIZE: u32 = 1 << BLOCK_SHIFT;

// Blocks whose luma range stays below this are treated as featureless
const LOW_VARIANCE: u8 = 24;

/// A thresholded view of the input raster. `true` is a dark pixel.
#[derive(Debug)]
pub(crate) struct BinaryImage {
    pub w: u32,
    pub h: u32,
    bits: Vec<bool>,
}

impl BinaryImage {
    pub fn prepare(img: &RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        let luma = flatten_to_luma(img);

        // Too small for block statistics, a global threshold has to do
        let wsteps = w.div_ceil(BLOCK_SIZE);
        let hsteps = h.div_ceil(BLOCK_SIZE);
        if wsteps < 5 || hsteps < 5 {
            return Self::global_threshold(w, h, &luma);
        }

        let avg = block_averages(w, h, &luma);
        let thresh = block_thresholds(wsteps, hsteps, &avg);

        let mut bits = vec![false; (w * h) as usize];
        for y in 0..h {
            let thresh_row = (y >> BLOCK_SHIFT) * wsteps;
            for x in 0..w {
                let p = luma[(y * w + x) as usize];
                let t = thresh[(thresh_row + (x >> BLOCK_SHIFT)) as usize];
                // At the threshold counts as dark, so an all-zero block
                // stays black
                bits[(y * w + x) as usize] = p <= t;
            }
        }
        Self { w, h, bits }
    }

    fn global_threshold(w: u32, h: u32, luma: &[u8]) -> Self {
        let sum: u64 = luma.iter().map(|&p| p as u64).sum();
        let t = (sum / luma.len().max(1) as u64) as u8;
        let bits = luma.iter().map(|&p| p < t.max(1)).collect();
        Self { w, h, bits }
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        (0..self.w as i64).contains(&x) && (0..self.h as i64).contains(&y)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        debug_assert!(x < self.w && y < self.h, "Out of bound: X {x}, Y {y}");
        self.bits[(y * self.w + x) as usize]
    }

    /// Out of bound pixels read as light.
    pub fn get_checked(&self, x: i64, y: i64) -> bool {
        self.in_bounds(x, y) && self.get(x as u32, y as u32)
    }
}

fn flatten_to_luma(img: &RgbaImage) -> Vec<u8> {
    img.pixels()
        .map(|p| {
            let a = p[3] as u32;
            // Composite over a white backdrop
            let r = (p[0] as u32 * a + 255 * (255 - a)) / 255;
            let g = (p[1] as u32 * a + 255 * (255 - a)) / 255;
            let b = (p[2] as u32 * a + 255 * (255 - a)) / 255;
            ((r * 299 + g * 587 + b * 114) / 1000) as u8
        })
        .collect()
}

fn block_averages(w: u32, h: u32, luma: &[u8]) -> Vec<usize> {
    let wsteps = w.div_ceil(BLOCK_SIZE);
    let hsteps = h.div_ceil(BLOCK_SIZE);
    let len = (wsteps * hsteps) as usize;

    let mut sum = vec![0usize; len];
    let mut count = vec![0usize; len];
    let mut min_max = vec![(255u8, 0u8); len];

    for y in 0..h {
        let row_off = (y >> BLOCK_SHIFT) * wsteps;
        for x in 0..w {
            let p = luma[(y * w + x) as usize];
            let idx = (row_off + (x >> BLOCK_SHIFT)) as usize;
            sum[idx] += p as usize;
            count[idx] += 1;
            min_max[idx].0 = min_max[idx].0.min(p);
            min_max[idx].1 = min_max[idx].1.max(p);
        }
    }

    let mut avg = vec![0usize; len];
    let wsteps = wsteps as usize;
    for i in 0..len {
        let (mn, mx) = min_max[i];
        if mx - mn <= LOW_VARIANCE {
            // Featureless block: assume background, unless the top/left
            // neighbors averaged darker
            avg[i] = (mn as usize) / 2;
            if i > wsteps {
                let ng_avg = (2 * avg[i - 1] + avg[i - wsteps] + avg[i - wsteps - 1]) / 4;
                if (mn as usize) < ng_avg {
                    avg[i] = ng_avg;
                }
            }
        } else {
            avg[i] = sum[i] / count[i];
        }
    }
    avg
}

fn block_thresholds(wsteps: u32, hsteps: u32, avg: &[usize]) -> Vec<u8> {
    let (wsteps, hsteps) = (wsteps as usize, hsteps as usize);
    let (maxx, maxy) = (wsteps - 3, hsteps - 3);
    let mut res = vec![0u8; wsteps * hsteps];

    for y in 0..hsteps {
        let row_off = y * wsteps;
        let cy = y.clamp(2, maxy);
        for x in 0..wsteps {
            let cx = x.clamp(2, maxx);
            let mut sum = 0usize;
            for ny in cy - 2..=cy + 2 {
                let ni = ny * wsteps + cx;
                sum += avg[ni - 2..=ni + 2].iter().sum::<usize>();
            }
            res[row_off + x] = (sum / 25) as u8;
        }
    }
    res
}
