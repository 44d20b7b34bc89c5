use super::{galois::Gf, MAX_BLOCK_SIZE};

// Reed-Solomon block
//------------------------------------------------------------------------------

/// One error correction block: data codewords followed by ecc codewords.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Block {
    pub data: [u8; MAX_BLOCK_SIZE],
    // Block length
    pub len: usize,
    // Data length
    pub dlen: usize,
}

impl Block {
    /// Builds a block from data codewords, appending `len - data.len()`
    /// ecc codewords.
    pub fn new(raw: &[u8], len: usize) -> Self {
        debug_assert!(len <= MAX_BLOCK_SIZE, "Block length exceeds maximum");
        debug_assert!(raw.len() < len, "No room for ecc codewords");

        let dlen = raw.len();
        let mut data = [0u8; MAX_BLOCK_SIZE];
        data[..dlen].copy_from_slice(raw);
        let mut block = Self { data, len, dlen };
        block.compute_ecc();
        block
    }

    /// Wraps an already-encoded block (data + ecc) for rectification.
    pub fn with_encoded(encoded: &[u8], dlen: usize) -> Self {
        let len = encoded.len();
        let mut data = [0u8; MAX_BLOCK_SIZE];
        data[..len].copy_from_slice(encoded);
        Self { data, len, dlen }
    }

    pub fn ec_len(&self) -> usize {
        self.len - self.dlen
    }

    pub fn full(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlen]
    }

    pub fn ecc(&self) -> &[u8] {
        &self.data[self.dlen..self.len]
    }

    // Polynomial division of the data codewords by the generator
    // polynomial; the remainder is the ecc.
    fn compute_ecc(&mut self) {
        let gen = generator_poly(self.ec_len());
        let mut rem = vec![Gf(0); self.ec_len()];

        for i in 0..self.dlen {
            let factor = Gf(self.data[i]) + rem[0];
            rem.rotate_left(1);
            *rem.last_mut().expect("Non-empty remainder") = Gf(0);
            for (r, &g) in rem.iter_mut().zip(gen.iter()) {
                *r += g * factor;
            }
        }

        for (i, r) in rem.iter().enumerate() {
            self.data[self.dlen + i] = r.0;
        }
    }
}

/// Coefficients of `(x - α⁰)(x - α¹)...(x - α^(degree-1))`, highest
/// power first, excluding the implicit leading 1.
fn generator_poly(degree: usize) -> Vec<Gf> {
    debug_assert!(degree >= 1, "Degree must be at least 1");

    let mut coeffs = vec![Gf(0); degree];
    *coeffs.last_mut().expect("Non-empty coefficients") = Gf(1);

    let mut root = Gf(1);
    for _ in 0..degree {
        for i in 0..degree {
            let next = if i + 1 < degree { coeffs[i + 1] } else { Gf(0) };
            coeffs[i] = coeffs[i] * root + next;
        }
        root *= Gf(2);
    }
    coeffs
}
