use std::mem::swap;

use crate::common::{
    bitstream::{BitCursor, BitStream},
    error::{QrError, QrResult},
    metadata::{ECLevel, Mode, Version, MODES},
};

// Segment
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Segment<'a> {
    pub mode: Mode,
    pub data: &'a [u8],
}

impl<'a> Segment<'a> {
    pub fn new(mode: Mode, data: &'a [u8]) -> Self {
        Self { mode, data }
    }

    /// Bits this segment occupies in the stream, header included.
    pub fn bit_len(&self, version: Version) -> usize {
        version.mode_bits() + version.char_count_bits(self.mode) + encoded_len(self.mode, self.data.len())
    }
}

fn encoded_len(mode: Mode, char_count: usize) -> usize {
    match mode {
        Mode::Numeric => (char_count / 3) * 10 + [0, 4, 7][char_count % 3],
        Mode::Alphanumeric => (char_count / 2) * 11 + (char_count % 2) * 6,
        Mode::Byte => char_count * 8,
    }
}

// Segmentation
//------------------------------------------------------------------------------

/// Picks the smallest version whose data capacity fits the optimally
/// segmented payload.
pub(crate) fn find_optimal_version_and_segments(
    data: &[u8],
    ecl: ECLevel,
) -> QrResult<(Version, Vec<Segment>)> {
    let mut segs = vec![];
    let mut sz = 0;
    for v in 1..=40 {
        let version = Version::new(v);
        let bcap = version.data_bit_capacity(ecl);
        // Char count widths only change at these versions
        if v == 1 || v == 10 || v == 27 {
            segs = compute_optimal_segments(data, version);
            sz = segs.iter().map(|s| s.bit_len(version)).sum();
        }
        if sz <= bcap {
            return Ok((version, segs));
        }
    }
    Err(QrError::PayloadTooLarge)
}

// Dynamic programming over per-char modes, with costs in sixths of a
// bit so numeric and alphanumeric chars have integral sizes
pub(crate) fn compute_optimal_segments(data: &[u8], version: Version) -> Vec<Segment> {
    debug_assert!(!data.is_empty(), "Empty data");

    let len = data.len();
    let mut prev_cost = [0usize; 3];
    for (i, &m) in MODES.iter().enumerate() {
        prev_cost[i] = (version.mode_bits() + version.char_count_bits(m)) * 6;
    }
    let mut cur_cost = [usize::MAX; 3];
    let mut min_path = vec![[usize::MAX; 3]; len];
    for (i, b) in data.iter().enumerate() {
        for (j, &to_mode) in MODES.iter().enumerate() {
            if !to_mode.contains(*b) {
                continue;
            }
            let encoded_char_size = match to_mode {
                Mode::Numeric => 20,
                Mode::Alphanumeric => 33,
                Mode::Byte => 48,
            };
            for (k, &from_mode) in MODES.iter().enumerate() {
                if prev_cost[k] == usize::MAX {
                    continue;
                }
                let mut cost = 0;
                if to_mode != from_mode {
                    // Close the previous segment at a whole bit and pay
                    // for a fresh header
                    cost += (prev_cost[k] + 5) / 6 * 6;
                    cost += (version.mode_bits() + version.char_count_bits(to_mode)) * 6;
                } else {
                    cost += prev_cost[k];
                }
                cost += encoded_char_size;
                if cost < cur_cost[j] {
                    cur_cost[j] = cost;
                    min_path[i][j] = k;
                }
            }
        }
        swap(&mut prev_cost, &mut cur_cost);
        cur_cost.fill(usize::MAX);
    }

    let char_modes = trace_optimal_modes(min_path, prev_cost);
    build_segments(char_modes, data)
}

// Backtrack min_path to the mode of every char
fn trace_optimal_modes(min_path: Vec<[usize; 3]>, prev_cost: [usize; 3]) -> Vec<Mode> {
    let len = min_path.len();
    let mut mode_index = 0;
    for i in 1..3 {
        if prev_cost[i] < prev_cost[mode_index] {
            mode_index = i;
        }
    }
    (0..len)
        .rev()
        .scan(mode_index, |mi, i| {
            let old_mi = *mi;
            *mi = min_path[i][*mi];
            Some(MODES[old_mi])
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

fn build_segments(char_modes: Vec<Mode>, data: &[u8]) -> Vec<Segment> {
    let len = data.len();
    let mut segs: Vec<Segment> = vec![];
    let mut seg_start = 0;
    let mut seg_mode = char_modes[0];
    for (i, &m) in char_modes.iter().enumerate().skip(1) {
        if seg_mode != m {
            segs.push(Segment::new(seg_mode, &data[seg_start..i]));
            seg_mode = m;
            seg_start = i;
        }
    }
    segs.push(Segment::new(seg_mode, &data[seg_start..len]));
    segs
}

// Writer for encoded data
//------------------------------------------------------------------------------

pub(crate) static PADDING_CODEWORDS: [u8; 2] = [0b1110_1100, 0b0001_0001];

pub(crate) fn push_segment(seg: Segment, version: Version, out: &mut BitStream) {
    push_header(&seg, version, out);
    match seg.mode {
        Mode::Numeric => push_numeric_data(seg.data, out),
        Mode::Alphanumeric => push_alphanumeric_data(seg.data, out),
        Mode::Byte => push_byte_data(seg.data, out),
    }
}

fn push_header(seg: &Segment, version: Version, out: &mut BitStream) {
    out.push_bits(seg.mode.indicator(), version.mode_bits());
    let char_count = seg.data.len();
    let len_bits = version.char_count_bits(seg.mode);
    debug_assert!(
        char_count < (1 << len_bits),
        "Char count exceeds bit length: Char count {char_count}, Char count bits {len_bits}"
    );
    out.push_bits(char_count as u16, len_bits);
}

fn push_numeric_data(data: &[u8], out: &mut BitStream) {
    for chunk in data.chunks(3) {
        let len = (chunk.len() * 10 + 2) / 3;
        out.push_bits(Mode::Numeric.encode_chunk(chunk), len);
    }
}

fn push_alphanumeric_data(data: &[u8], out: &mut BitStream) {
    for chunk in data.chunks(2) {
        let len = (chunk.len() * 11 + 1) / 2;
        out.push_bits(Mode::Alphanumeric.encode_chunk(chunk), len);
    }
}

fn push_byte_data(data: &[u8], out: &mut BitStream) {
    for chunk in data.chunks(1) {
        out.push_bits(Mode::Byte.encode_chunk(chunk), 8);
    }
}

pub(crate) fn push_terminator(out: &mut BitStream) {
    let bit_len = out.len();
    let bit_capacity = out.capacity();
    if bit_len < bit_capacity {
        let term_len = std::cmp::min(4, bit_capacity - bit_len);
        out.push_bits(0, term_len);
    }
}

pub(crate) fn pad_remaining_capacity(out: &mut BitStream) {
    push_padding_bits(out);
    push_padding_codewords(out);
}

fn push_padding_bits(out: &mut BitStream) {
    let offset = out.len() & 7;
    if offset > 0 {
        out.push_bits(0, 8 - offset);
    }
}

fn push_padding_codewords(out: &mut BitStream) {
    debug_assert!(out.len() & 7 == 0, "Bit offset should be zero before padding codewords");

    let remain_byte_capacity = (out.capacity() - out.len()) >> 3;
    PADDING_CODEWORDS.iter().copied().cycle().take(remain_byte_capacity).for_each(|pc| {
        out.push_bits(pc as u16, 8);
    });
}

// Reader for encoded data
//------------------------------------------------------------------------------

/// Parses the rectified data codewords back into the payload string.
pub(crate) fn decode_payload(data: &[u8], version: Version) -> QrResult<String> {
    let mut cursor = BitCursor::new(data);
    let mut bytes = Vec::with_capacity(data.len());
    loop {
        // A missing terminator means the data filled the capacity
        let Some(indicator) = cursor.take_bits(4) else { break };
        if indicator == 0 {
            break;
        }
        let mode = Mode::from_indicator(indicator)?;
        let len_bits = version.char_count_bits(mode);
        let char_count =
            cursor.take_bits(len_bits).ok_or(QrError::ChecksumFailure)? as usize;

        match mode {
            Mode::Numeric => take_numeric(&mut cursor, char_count, &mut bytes)?,
            Mode::Alphanumeric => take_alphanumeric(&mut cursor, char_count, &mut bytes)?,
            Mode::Byte => take_byte(&mut cursor, char_count, &mut bytes)?,
        }

        // Too little room left even for a terminator
        if cursor.remaining() < 4 {
            break;
        }
    }
    String::from_utf8(bytes).map_err(|_| QrError::ChecksumFailure)
}

fn take_numeric(cursor: &mut BitCursor, mut char_count: usize, out: &mut Vec<u8>) -> QrResult<()> {
    while char_count > 0 {
        let count = char_count.min(3);
        let bit_len = [0, 4, 7, 10][count];
        let chunk = cursor.take_bits(bit_len).ok_or(QrError::ChecksumFailure)?;
        if chunk >= 10u16.pow(count as u32) {
            return Err(QrError::ChecksumFailure);
        }
        out.extend(Mode::Numeric.decode_chunk(chunk, count));
        char_count -= count;
    }
    Ok(())
}

fn take_alphanumeric(
    cursor: &mut BitCursor,
    mut char_count: usize,
    out: &mut Vec<u8>,
) -> QrResult<()> {
    while char_count > 0 {
        let count = char_count.min(2);
        let bit_len = [0, 6, 11][count];
        let chunk = cursor.take_bits(bit_len).ok_or(QrError::ChecksumFailure)?;
        if chunk >= 45u16.pow(count as u32) {
            return Err(QrError::ChecksumFailure);
        }
        out.extend(Mode::Alphanumeric.decode_chunk(chunk, count));
        char_count -= count;
    }
    Ok(())
}

fn take_byte(cursor: &mut BitCursor, char_count: usize, out: &mut Vec<u8>) -> QrResult<()> {
    for _ in 0..char_count {
        let chunk = cursor.take_bits(8).ok_or(QrError::ChecksumFailure)?;
        out.push(chunk as u8);
    }
    Ok(())
}

// Assembly
//------------------------------------------------------------------------------

/// Encodes the payload into a padded data codeword stream for the
/// given version.
pub(crate) fn encode_to_stream(
    segs: &[Segment],
    version: Version,
    ecl: ECLevel,
) -> QrResult<BitStream> {
    let bcap = version.data_bit_capacity(ecl);
    let sz: usize = segs.iter().map(|s| s.bit_len(version)).sum();
    if sz > bcap {
        return Err(QrError::PayloadTooLarge);
    }
    let mut bs = BitStream::new(bcap);
    for seg in segs {
        push_segment(*seg, version, &mut bs);
    }
    push_terminator(&mut bs);
    pad_remaining_capacity(&mut bs);
    Ok(bs)
}
