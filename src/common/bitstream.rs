// Bit stream
//------------------------------------------------------------------------------

/// Append-only MSB-first bit buffer with a fixed bit capacity, used to
/// assemble the encoded data stream before error correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    // Bit length
    len: usize,
    // Max bit capacity
    capacity: usize,
}

impl BitStream {
    pub fn new(capacity: usize) -> Self {
        Self { data: vec![0; (capacity + 7) >> 3], len: 0, capacity }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..(self.len + 7) >> 3]
    }

    /// Appends the low `size` bits of `bits`, most significant first.
    pub fn push_bits(&mut self, bits: u16, size: usize) {
        debug_assert!(size <= 16, "Bit count exceeds 16");
        debug_assert!(
            size == 16 || bits < (1 << size),
            "Bits don't fit in the given size: Bits {bits}, Size {size}"
        );
        debug_assert!(
            self.len + size <= self.capacity,
            "Insufficient capacity: Capacity {}, Size {}",
            self.capacity,
            self.len + size
        );

        for i in (0..size).rev() {
            self.push(bits >> i & 1 == 1);
        }
    }

    pub fn push(&mut self, bit: bool) {
        debug_assert!(self.len < self.capacity, "Insufficient capacity");

        if bit {
            self.data[self.len >> 3] |= 0b1000_0000 >> (self.len & 7);
        }
        self.len += 1;
    }
}

// Bit cursor
//------------------------------------------------------------------------------

/// MSB-first reader over a byte slice, used to parse the rectified data
/// stream back into segments.
#[derive(Debug)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// Reads up to 16 bits; returns None when the stream is exhausted.
    pub fn take_bits(&mut self, size: usize) -> Option<u16> {
        debug_assert!(size <= 16, "Bit count exceeds 16");

        if self.remaining() < size {
            return None;
        }
        let mut out = 0u16;
        for _ in 0..size {
            let bit = self.data[self.pos >> 3] >> (7 - (self.pos & 7)) & 1;
            out = out << 1 | bit as u16;
            self.pos += 1;
        }
        Some(out)
    }
}
