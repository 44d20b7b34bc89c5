use super::{
    galois::{eval_poly, Gf},
    Block, MAX_BLOCK_SIZE, MAX_EC_SIZE,
};
use crate::common::error::{QrError, QrResult};

// Rectifier
//------------------------------------------------------------------------------

impl Block {
    /// Corrects in-place up to `ec_len / 2` corrupted codewords and
    /// returns the data codewords. Fails with `ChecksumFailure` when the
    /// block is damaged beyond the error correction budget.
    pub fn rectify(&mut self) -> QrResult<&[u8]> {
        // Compute syndromes
        let synd = match self.syndromes() {
            Ok(()) => return Ok(self.data()),
            Err(s) => s,
        };

        // Error locator polynomial
        let sigma = self.error_locator(&synd);
        let err_loc = self.error_positions(&sigma);

        // Formal derivative of sigma
        let mut dsigma = [Gf(0); MAX_EC_SIZE];
        for i in (1..MAX_EC_SIZE).step_by(2) {
            dsigma[i - 1] = sigma[i];
        }

        // Error evaluator
        let omega = self.error_evaluator(&synd, &sigma);

        // Error magnitudes
        let magnitudes = self.error_magnitudes(&omega, &dsigma, &err_loc);

        // Rectify by adding the magnitude at each error position
        for (i, &g) in magnitudes.iter().enumerate() {
            self.data[i] = (Gf(self.data[i]) + g).into();
        }

        match self.syndromes() {
            Ok(()) => Ok(self.data()),
            Err(_) => Err(QrError::ChecksumFailure),
        }
    }

    fn syndromes(&self) -> Result<(), [Gf; MAX_EC_SIZE]> {
        let ec_len = self.ec_len();
        let mut synd = [Gf(0); MAX_EC_SIZE];

        let mut gdata = [Gf(0); MAX_BLOCK_SIZE];
        for (i, &b) in self.data.iter().take(self.len).enumerate() {
            gdata[i] = Gf(b);
        }
        for (i, s) in synd.iter_mut().take(ec_len).enumerate() {
            *s = eval_poly(gdata.iter().take(self.len).rev(), Gf::gen_pow(i));
        }

        if synd.iter().all(|&s| s.0 == 0) {
            Ok(())
        } else {
            Err(synd)
        }
    }

    // Berlekamp-Massey: smallest sigma consistent with the syndromes
    fn error_locator(&self, synd: &[Gf]) -> [Gf; MAX_EC_SIZE] {
        let mut l = 0usize;
        let mut m = 1usize;
        let mut b = Gf(1);
        let mut cx = [Gf(0); MAX_EC_SIZE];
        let mut bx = [Gf(0); MAX_EC_SIZE];
        let mut tx = [Gf(0); MAX_EC_SIZE];
        cx[0] = Gf(1);
        bx[0] = Gf(1);
        let deg = self.ec_len();

        for n in 0..deg {
            // Discrepancy between predicted and observed syndrome
            let mut d = synd[n];
            for i in 1..=l {
                d += cx[i] * synd[n - i];
            }

            if d.0 != 0 {
                tx.copy_from_slice(&cx);

                let scale = d / b;

                for i in 0..MAX_EC_SIZE - m {
                    cx[i + m] += scale * bx[i];
                }

                if 2 * l <= n {
                    bx.copy_from_slice(&tx);
                    l = n + 1 - l;
                    b = d;
                    m = 1;
                } else {
                    m += 1;
                }
            } else {
                m += 1;
            }
        }
        cx
    }

    // Chien search: positions where sigma evaluates to zero
    fn error_positions(&self, sigma: &[Gf; MAX_EC_SIZE]) -> [bool; MAX_BLOCK_SIZE] {
        let deg = self.ec_len();
        let mut err_loc = [false; MAX_BLOCK_SIZE];
        for (i, e) in err_loc[..self.len].iter_mut().rev().enumerate() {
            *e = eval_poly(sigma.iter().take(deg), Gf::gen_pow(255 - i)).0 == 0;
        }
        err_loc
    }

    fn error_evaluator(
        &self,
        synd: &[Gf; MAX_EC_SIZE],
        sigma: &[Gf; MAX_EC_SIZE],
    ) -> [Gf; MAX_EC_SIZE] {
        let t = self.ec_len() - 1;
        let mut omega = [Gf(0); MAX_EC_SIZE];
        for i in 0..t {
            let sy = synd[i + 1];
            for j in 0..t - i {
                omega[i + j] += sy * sigma[j];
            }
        }
        omega
    }

    // Forney's formula
    fn error_magnitudes(
        &self,
        omega: &[Gf; MAX_EC_SIZE],
        dsigma: &[Gf; MAX_EC_SIZE],
        err_loc: &[bool; MAX_BLOCK_SIZE],
    ) -> [Gf; MAX_BLOCK_SIZE] {
        let mut mag = [Gf(0); MAX_BLOCK_SIZE];
        for (i, &is_err) in err_loc.iter().take(self.len).rev().enumerate() {
            if !is_err {
                continue;
            }
            let xinv = Gf::gen_pow(255 - i);
            let omega_x = eval_poly(omega.iter(), xinv);
            let sigma_x = eval_poly(dsigma.iter(), xinv);
            mag[self.len - 1 - i] = omega_x / sigma_x;
        }
        mag
    }
}

// Rectifier for format and version infos
//------------------------------------------------------------------------------

/// Matches `info` against the closest valid BCH codeword, tolerating up
/// to `err_capacity` bit errors.
pub fn rectify_info(info: u32, valid: &[u32], err_capacity: u32) -> QrResult<u32> {
    let best = *valid
        .iter()
        .min_by_key(|&n| (info ^ n).count_ones())
        .expect("Valid code list is never empty");

    if (info ^ best).count_ones() <= err_capacity {
        Ok(best)
    } else {
        Err(QrError::NotFound)
    }
}
