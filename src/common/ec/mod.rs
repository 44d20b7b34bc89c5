mod block;
mod galois;
mod rectify;

pub(crate) use block::Block;
pub(crate) use rectify::rectify_info;

use crate::common::metadata::{ECLevel, Version};

// Largest block size across all versions and levels, padded to a round
// number so blocks can live on the stack.
pub(crate) const MAX_BLOCK_SIZE: usize = 256;

// Largest ecc codeword count per block is 30 (for the high levels)
pub(crate) const MAX_EC_SIZE: usize = 64;

/// Splits the data codewords into error correction blocks per the
/// version and level block structure, computing the ecc for each.
pub(crate) fn blockify(data: &[u8], version: Version, ecl: ECLevel) -> Vec<Block> {
    let total = version.total_codewords();
    let ec_per_block = version.ecc_per_block(ecl);
    let block_count = version.block_count(ecl);

    debug_assert!(!data.is_empty(), "Data is empty");
    debug_assert!(block_count > 0, "Block count is zero");

    // The first `short_count` blocks carry one data codeword fewer
    let short_count = block_count - total % block_count;
    let short_len = total / block_count;

    let mut blocks = Vec::with_capacity(block_count);
    let mut offset = 0;
    for i in 0..block_count {
        let blen = if i < short_count { short_len } else { short_len + 1 };
        let dlen = blen - ec_per_block;
        blocks.push(Block::new(&data[offset..offset + dlen], blen));
        offset += dlen;
    }
    debug_assert_eq!(offset, data.len(), "Data doesn't fill the blocks exactly");
    blocks
}

/// Interleaves block codewords column by column: all first data
/// codewords, all second, ..., then ecc codewords likewise.
pub(crate) fn interleave(blocks: &[Block]) -> Vec<u8> {
    let mut out = Vec::with_capacity(blocks.iter().map(|b| b.full().len()).sum());
    let max_dlen = blocks.iter().map(|b| b.data().len()).max().unwrap_or(0);
    for i in 0..max_dlen {
        for b in blocks {
            if let Some(&cw) = b.data().get(i) {
                out.push(cw);
            }
        }
    }
    let max_eclen = blocks.iter().map(|b| b.ec_len()).max().unwrap_or(0);
    for i in 0..max_eclen {
        for b in blocks {
            if let Some(&cw) = b.ecc().get(i) {
                out.push(cw);
            }
        }
    }
    out
}

/// Undoes `interleave`: reconstructs per-block codeword slices from the
/// interleaved payload read off a symbol.
pub(crate) fn deinterleave(payload: &[u8], version: Version, ecl: ECLevel) -> Vec<Block> {
    let total = version.total_codewords();
    let ec_per_block = version.ecc_per_block(ecl);
    let block_count = version.block_count(ecl);

    let short_count = block_count - total % block_count;
    let short_len = total / block_count;
    let short_dlen = short_len - ec_per_block;

    let block_len =
        |i: usize| if i < short_count { short_len } else { short_len + 1 };
    let data_len = |i: usize| block_len(i) - ec_per_block;

    let mut raw: Vec<Vec<u8>> = (0..block_count).map(|i| vec![0; block_len(i)]).collect();

    let mut pos = 0;
    // Data codewords: long blocks take part in one extra column
    for col in 0..short_dlen + 1 {
        for (i, blk) in raw.iter_mut().enumerate() {
            if col < data_len(i) {
                blk[col] = payload[pos];
                pos += 1;
            }
        }
    }
    // Ecc codewords
    for col in 0..ec_per_block {
        for (i, blk) in raw.iter_mut().enumerate() {
            blk[data_len(i) + col] = payload[pos];
            pos += 1;
        }
    }
    debug_assert_eq!(pos, total, "Payload doesn't fill the blocks exactly");

    raw.iter()
        .enumerate()
        .map(|(i, b)| Block::with_encoded(b, data_len(i)))
        .collect()
}

#[cfg(test)]
mod interleave_tests {
    use super::{blockify, deinterleave, interleave};
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_single_block_roundtrip() {
        let version = Version::new(1);
        let data: Vec<u8> = (0..16).collect();
        let blocks = blockify(&data, version, ECLevel::M);
        assert_eq!(blocks.len(), 1);
        let inter = interleave(&blocks);
        assert_eq!(inter.len(), version.total_codewords());
        assert_eq!(&inter[..16], &data[..]);

        let back = deinterleave(&inter, version, ECLevel::M);
        assert_eq!(back, blocks);
    }

    #[test]
    fn test_uneven_blocks_roundtrip() {
        // Version 5-Q splits into 2 short + 2 long blocks (15/15/16/16)
        let version = Version::new(5);
        let ecl = ECLevel::Q;
        let dcap = version.data_capacity(ecl);
        assert_eq!(dcap, 62);
        let data: Vec<u8> = (0..dcap as u8).collect();

        let blocks = blockify(&data, version, ecl);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].data().len(), 15);
        assert_eq!(blocks[3].data().len(), 16);

        let inter = interleave(&blocks);
        assert_eq!(inter.len(), version.total_codewords());
        // First column is the first codeword of each block
        assert_eq!(&inter[..4], &[data[0], data[15], data[30], data[46]]);

        let back = deinterleave(&inter, version, ecl);
        assert_eq!(back, blocks);
    }

    #[test]
    fn test_rectify_after_deinterleave() {
        let version = Version::new(2);
        let ecl = ECLevel::H;
        let dcap = version.data_capacity(ecl);
        let data: Vec<u8> = (10..10 + dcap as u8).collect();
        let mut inter = interleave(&blockify(&data, version, ecl));

        inter[3] ^= 0x55;
        inter[20] ^= 0xaa;

        let mut blocks = deinterleave(&inter, version, ecl);
        let mut out = Vec::new();
        for b in blocks.iter_mut() {
            out.extend_from_slice(b.rectify().unwrap());
        }
        assert_eq!(out, data);
    }
}
