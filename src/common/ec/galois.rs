use std::ops::{Add, AddAssign, Div, Mul, MulAssign};

// GF(256) arithmetic over the QR primitive polynomial x^8+x^4+x^3+x^2+1
//------------------------------------------------------------------------------

const PRIMITIVE: u16 = 0x11d;

const fn build_exp_table() -> [u8; 256] {
    let mut exp = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 256 {
        exp[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    exp
}

const fn build_log_table(exp: &[u8; 256]) -> [u8; 256] {
    let mut log = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        log[exp[i] as usize] = i as u8;
        i += 1;
    }
    log
}

static EXP: [u8; 256] = build_exp_table();
static LOG: [u8; 256] = build_log_table(&EXP);

/// An element of GF(256). Addition is XOR; multiplication goes through
/// the log/antilog tables.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub(crate) struct Gf(pub u8);

impl Gf {
    /// `α^i`, the i-th power of the generator element.
    pub fn gen_pow(i: usize) -> Self {
        Gf(EXP[i % 255])
    }
}

impl From<Gf> for u8 {
    fn from(g: Gf) -> Self {
        g.0
    }
}

impl Add for Gf {
    type Output = Gf;
    fn add(self, rhs: Gf) -> Gf {
        Gf(self.0 ^ rhs.0)
    }
}

impl AddAssign for Gf {
    fn add_assign(&mut self, rhs: Gf) {
        self.0 ^= rhs.0;
    }
}

impl Mul for Gf {
    type Output = Gf;
    fn mul(self, rhs: Gf) -> Gf {
        if self.0 == 0 || rhs.0 == 0 {
            return Gf(0);
        }
        let l = LOG[self.0 as usize] as usize + LOG[rhs.0 as usize] as usize;
        Gf(EXP[l % 255])
    }
}

impl MulAssign for Gf {
    fn mul_assign(&mut self, rhs: Gf) {
        *self = *self * rhs;
    }
}

impl Div for Gf {
    type Output = Gf;
    fn div(self, rhs: Gf) -> Gf {
        debug_assert!(rhs.0 != 0, "Division by zero in GF(256)");
        if self.0 == 0 {
            return Gf(0);
        }
        let l = LOG[self.0 as usize] as usize + 255 - LOG[rhs.0 as usize] as usize;
        Gf(EXP[l % 255])
    }
}

/// Evaluates a polynomial given lowest-degree-first coefficients at `x`.
pub(crate) fn eval_poly<'a>(poly: impl Iterator<Item = &'a Gf>, x: Gf) -> Gf {
    let mut res = Gf(0);
    let mut xpow = Gf(1);
    for &coeff in poly {
        res += coeff * xpow;
        xpow *= x;
    }
    res
}
