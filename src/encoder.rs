use log::debug;

use crate::codec::{self, Segment};
use crate::common::{
    ec::{blockify, interleave},
    error::{QrError, QrResult},
    mask::apply_best_mask,
    metadata::{ECLevel, Mode, Version},
};
use crate::matrix::SymbolMatrix;

// Encoder
//------------------------------------------------------------------------------

/// Encodes the payload into the smallest symbol that fits it at the
/// requested error correction level, with optimal mode segmentation.
pub fn encode(payload: &str, ecl: ECLevel) -> QrResult<SymbolMatrix> {
    let data = payload.as_bytes();
    let (version, segs) = if data.is_empty() {
        (Version::MIN, Vec::new())
    } else {
        codec::find_optimal_version_and_segments(data, ecl)?
    };
    debug!("Selected version {version} with {} segments", segs.len());
    build_symbol(&segs, version, ecl)
}

/// Encodes the payload into a symbol of the given version, failing
/// with `PayloadTooLarge` if it doesn't fit.
pub fn encode_with_version(
    payload: &str,
    version: Version,
    ecl: ECLevel,
) -> QrResult<SymbolMatrix> {
    let data = payload.as_bytes();
    let segs =
        if data.is_empty() { Vec::new() } else { codec::compute_optimal_segments(data, version) };
    build_symbol(&segs, version, ecl)
}

/// Encodes the payload as a single segment of the given mode, failing
/// with `UnsupportedCharacter` if the payload has characters outside
/// the mode's charset.
pub fn encode_in_mode(payload: &str, mode: Mode, ecl: ECLevel) -> QrResult<SymbolMatrix> {
    let data = payload.as_bytes();
    if !data.iter().all(|&b| mode.contains(b)) {
        return Err(QrError::UnsupportedCharacter);
    }
    if data.is_empty() {
        return build_symbol(&[], Version::MIN, ecl);
    }

    let seg = Segment::new(mode, data);
    for v in 1..=40 {
        let version = Version::new(v);
        if seg.bit_len(version) <= version.data_bit_capacity(ecl) {
            return build_symbol(&[seg], version, ecl);
        }
    }
    Err(QrError::PayloadTooLarge)
}

fn build_symbol(segs: &[Segment], version: Version, ecl: ECLevel) -> QrResult<SymbolMatrix> {
    let stream = codec::encode_to_stream(segs, version, ecl)?;
    let blocks = blockify(stream.data(), version, ecl);
    let payload = interleave(&blocks);
    debug!(
        "Assembled {} blocks into {} interleaved codewords",
        blocks.len(),
        payload.len()
    );

    let mut matrix = SymbolMatrix::new(version);
    matrix.draw_version_info();
    matrix.reserve_format_area();
    matrix.place_data(&payload);
    let mask = apply_best_mask(&mut matrix);
    matrix.draw_format_info(ecl, mask);
    debug!("Applied mask pattern {}", *mask);
    Ok(matrix)
}

#[cfg(test)]
mod encoder_tests {
    use test_case::test_case;

    use super::{encode, encode_in_mode, encode_with_version};
    use crate::common::error::QrError;
    use crate::common::metadata::{ECLevel, Mode, Version};

    #[test]
    fn test_smallest_version_is_chosen() {
        let matrix = encode("123", ECLevel::M).unwrap();
        assert_eq!(matrix.version(), Version::new(1));
        assert_eq!(matrix.side(), 21);
    }

    #[test_case("", 1)]
    #[test_case("hello world", 1)]
    #[test_case("HELLO WORLD HELLO WORLD HELLO WORLD", 2; "alphanumeric v2")]
    fn test_version_selection(payload: &str, exp_version: u8) {
        let matrix = encode(payload, ECLevel::M).unwrap();
        assert_eq!(matrix.version(), Version::new(exp_version));
    }

    #[test]
    fn test_payload_too_large() {
        let payload = "a".repeat(2954);
        assert_eq!(encode(&payload, ECLevel::L).unwrap_err(), QrError::PayloadTooLarge);

        let payload = "a".repeat(20);
        let res = encode_with_version(&payload, Version::new(1), ECLevel::H);
        assert_eq!(res.unwrap_err(), QrError::PayloadTooLarge);
    }

    #[test]
    fn test_encode_in_mode_charset() {
        assert!(encode_in_mode("1234567890", Mode::Numeric, ECLevel::L).is_ok());
        assert_eq!(
            encode_in_mode("12a", Mode::Numeric, ECLevel::L).unwrap_err(),
            QrError::UnsupportedCharacter
        );
        assert_eq!(
            encode_in_mode("hello", Mode::Alphanumeric, ECLevel::L).unwrap_err(),
            QrError::UnsupportedCharacter
        );
        assert!(encode_in_mode("HELLO WORLD", Mode::Alphanumeric, ECLevel::L).is_ok());
    }

    #[test]
    fn test_dark_module_and_functional_layout() {
        let matrix = encode("hello", ECLevel::Q).unwrap();
        assert!(matrix.get(-8, 8));
        // Finder corners survive data placement and masking
        assert!(matrix.get(0, 0));
        assert!(matrix.get(0, -1));
        assert!(matrix.get(-1, 0));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let a = encode("determinism", ECLevel::M).unwrap();
        let b = encode("determinism", ECLevel::M).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_version_info_drawn_for_v7() {
        let matrix = encode_with_version("x", Version::new(7), ECLevel::L).unwrap();
        let info = Version::new(7).info();
        assert_eq!(matrix.read_number(&crate::matrix::VERSION_INFO_COORDS_BL), info);
        assert_eq!(matrix.read_number(&crate::matrix::VERSION_INFO_COORDS_TR), info);
    }
}
