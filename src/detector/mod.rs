use image::RgbaImage;
use log::debug;

use crate::codec;
use crate::common::{
    ec::{deinterleave, rectify_info},
    error::{QrError, QrResult},
    mask::MaskPattern,
    metadata::{
        ECLevel, Version, FORMAT_ERROR_CAPACITY, FORMAT_INFOS, VERSION_ERROR_CAPACITY,
        VERSION_INFOS,
    },
};
use crate::matrix::{
    SymbolMatrix, FORMAT_INFO_COORDS_MAIN, FORMAT_INFO_COORDS_SIDE, VERSION_INFO_COORDS_BL,
    VERSION_INFO_COORDS_TR,
};

use binarize::BinaryImage;
use finder::{group_finders, locate_finders, FinderGroup};
use geometry::{Homography, Point};

pub(crate) mod binarize;
pub(crate) mod finder;
pub(crate) mod geometry;

// Detector
//------------------------------------------------------------------------------

/// Locates a QR symbol in the raster and decodes its payload.
///
/// Steps:
/// 1. Binarize the raster
/// 2. Locate finder patterns and group them into provisional symbols
/// 3. Per group, compute a perspective transform and sample the grid
/// 4. Recover format info, unmask, deinterleave and rectify the blocks
/// 5. Parse the data segments into the payload
pub fn detect(img: &RgbaImage) -> QrResult<String> {
    let bin = BinaryImage::prepare(img);
    let finders = locate_finders(&bin);
    let groups = group_finders(&finders);

    let mut res = Err(QrError::NotFound);
    for group in &groups {
        match decode_group(&bin, group) {
            Ok(msg) => return Ok(msg),
            Err(e) => {
                debug!("Group at {:?} failed to decode: {e}", group.tl);
                // A symbol was found but its data didn't survive
                if e == QrError::ChecksumFailure {
                    res = Err(e);
                }
            }
        }
    }
    res
}

fn decode_group(bin: &BinaryImage, group: &FinderGroup) -> QrResult<String> {
    let mut version = snap_version(group.side_estimate)?;
    debug!("Sampling group as version {version}");

    let mut matrix = sample_symbol(bin, group, version)?;

    // Versions 7 and up carry their own version info, which overrules
    // the geometric estimate. Resample once if they disagree.
    if version >= Version::new(7) {
        let decoded = read_version_info(&matrix)?;
        if decoded != version {
            debug!("Version info says {decoded}, resampling");
            version = decoded;
            matrix = sample_symbol(bin, group, version)?;
        }
    }

    decode_symbol(matrix, version)
}

// Snaps the estimated module count to the nearest valid symbol side.
fn snap_version(side_estimate: f64) -> QrResult<Version> {
    let v = ((side_estimate - 17.0) / 4.0).round().clamp(1.0, 40.0);
    let side = v as i32 * 4 + 17;
    // Reject wild estimates instead of silently clamping them
    if (side_estimate - side as f64).abs() > 4.0 {
        return Err(QrError::NotFound);
    }
    Version::from_side(side)
}

// Grid sampling
//------------------------------------------------------------------------------

fn sample_symbol(
    bin: &BinaryImage,
    group: &FinderGroup,
    version: Version,
) -> QrResult<SymbolMatrix> {
    let side = version.side() as f64;

    // The fourth correspondence: the bottom right alignment pattern for
    // version 2 and up, else the symbol's bottom right corner
    let parallelogram = Point::new(
        group.tr.x + group.bl.x - group.tl.x,
        group.tr.y + group.bl.y - group.tl.y,
    );
    let (src4, dst4) = if version >= Version::new(2) {
        // Alignment centre sits 6.5 modules in from the corner, the
        // finder centres 3.5
        let shift = 3.0 / (side - 7.0);
        let est = Point::new(
            parallelogram.x - (parallelogram.x - group.tl.x) * shift,
            parallelogram.y - (parallelogram.y - group.tl.y) * shift,
        );
        let refined = refine_alignment(bin, est, group.module_size).unwrap_or(est);
        (Point::new(side - 6.5, side - 6.5), refined)
    } else {
        (Point::new(side - 3.5, side - 3.5), parallelogram)
    };

    let src = [Point::new(3.5, 3.5), Point::new(side - 3.5, 3.5), Point::new(3.5, side - 3.5), src4];
    let dst = [group.tl, group.tr, group.bl, dst4];
    let h = Homography::compute(src, dst)?;

    let mut lost = false;
    let matrix = SymbolMatrix::from_fn(version, |r, c| {
        match h.map(c as f64 + 0.5, r as f64 + 0.5) {
            Ok(p) => bin.get_checked(p.x.round() as i64, p.y.round() as i64),
            Err(_) => {
                lost = true;
                false
            }
        }
    });
    if lost {
        return Err(QrError::NotFound);
    }
    Ok(matrix)
}

// Searches outward from the estimate for the centre module of an
// alignment pattern: a dark run of about one module along both axes.
fn refine_alignment(bin: &BinaryImage, est: Point, module_size: f64) -> Option<Point> {
    let (ex, ey) = (est.x.round() as i64, est.y.round() as i64);
    let radius = (module_size * 2.0).ceil() as i64;
    let max_run = (module_size * 2.0).ceil() as i64;
    let min_run = (module_size * 0.4).floor() as i64;

    for r in 0..=radius {
        for dy in -r..=r {
            for dx in -r..=r {
                // Only the ring at the current radius
                if dx.abs() != r && dy.abs() != r {
                    continue;
                }
                let (x, y) = (ex + dx, ey + dy);
                if !bin.get_checked(x, y) {
                    continue;
                }

                let lo = walk_run(bin, x, y, -1, 0, max_run);
                let hi = walk_run(bin, x, y, 1, 0, max_run);
                let h_run = lo + hi + 1;
                if h_run < min_run || h_run > max_run {
                    continue;
                }
                let cx = x - lo + h_run / 2;

                let up = walk_run(bin, cx, y, 0, -1, max_run);
                let down = walk_run(bin, cx, y, 0, 1, max_run);
                let v_run = up + down + 1;
                if v_run < min_run || v_run > max_run {
                    continue;
                }
                let cy = y - up + v_run / 2;

                return Some(Point::new(cx as f64, cy as f64));
            }
        }
    }
    None
}

fn walk_run(bin: &BinaryImage, x: i64, y: i64, dx: i64, dy: i64, limit: i64) -> i64 {
    let mut n = 0;
    while n < limit && bin.get_checked(x + dx * (n + 1), y + dy * (n + 1)) {
        n += 1;
    }
    n
}

// Symbol decoding
//------------------------------------------------------------------------------

fn read_version_info(matrix: &SymbolMatrix) -> QrResult<Version> {
    let bl = matrix.read_number(&VERSION_INFO_COORDS_BL);
    let info = rectify_info(bl, &VERSION_INFOS, VERSION_ERROR_CAPACITY).or_else(|_| {
        let tr = matrix.read_number(&VERSION_INFO_COORDS_TR);
        rectify_info(tr, &VERSION_INFOS, VERSION_ERROR_CAPACITY)
    })?;
    let idx = VERSION_INFOS.iter().position(|&v| v == info).ok_or(QrError::NotFound)?;
    Ok(Version::new(idx as u8 + 7))
}

fn decode_symbol(mut matrix: SymbolMatrix, version: Version) -> QrResult<String> {
    let main = matrix.read_number(&FORMAT_INFO_COORDS_MAIN);
    let info = rectify_info(main, &FORMAT_INFOS, FORMAT_ERROR_CAPACITY).or_else(|_| {
        let side = matrix.read_number(&FORMAT_INFO_COORDS_SIDE);
        rectify_info(side, &FORMAT_INFOS, FORMAT_ERROR_CAPACITY)
    })?;
    let idx = FORMAT_INFOS.iter().position(|&f| f == info).ok_or(QrError::NotFound)? as u32;
    let ecl = ECLevel::from_format_bits(idx >> 3);
    let mask = MaskPattern::new((idx & 7) as u8);
    debug!("Recovered format info: EC level {ecl:?}, mask {}", *mask);

    matrix.apply_mask(mask);
    let payload = matrix.extract_payload();
    let mut blocks = deinterleave(&payload, version, ecl);

    let mut data = Vec::with_capacity(version.data_capacity(ecl));
    for block in blocks.iter_mut() {
        data.extend_from_slice(block.rectify()?);
    }

    codec::decode_payload(&data, version)
}

#[cfg(test)]
mod detector_tests {
    use image::{Rgba, RgbaImage};
    use test_case::test_case;

    use super::{detect, snap_version};
    use crate::common::error::QrError;
    use crate::common::metadata::{ECLevel, Version};
    use crate::compositor::{composite, StyleSpec};
    use crate::encoder::{encode, encode_with_version};

    #[test_case("hello world", ECLevel::L)]
    #[test_case("hello world", ECLevel::H)]
    #[test_case("0123456789012345678901234567890123456789", ECLevel::M)]
    #[test_case("HTTPS://EXAMPLE.COM/A/B?C=D", ECLevel::Q)]
    fn test_roundtrip(payload: &str, ecl: ECLevel) {
        let matrix = encode(payload, ecl).unwrap();
        let img = composite(&matrix, &StyleSpec::default()).unwrap();
        assert_eq!(detect(&img).unwrap(), payload);
    }

    #[test]
    fn test_roundtrip_with_alignment_pattern() {
        // Long enough to need version 2 and its alignment pattern
        let payload = "a".repeat(40);
        let matrix = encode(&payload, ECLevel::M).unwrap();
        assert!(matrix.version() >= Version::new(2));
        let img = composite(&matrix, &StyleSpec::default()).unwrap();
        assert_eq!(detect(&img).unwrap(), payload);
    }

    #[test]
    fn test_roundtrip_version_7() {
        let payload = "b".repeat(120);
        let matrix = encode_with_version(&payload, Version::new(7), ECLevel::L).unwrap();
        let img = composite(&matrix, &StyleSpec::default()).unwrap();
        assert_eq!(detect(&img).unwrap(), payload);
    }

    #[test]
    fn test_blank_image_not_found() {
        let img = RgbaImage::from_pixel(256, 256, Rgba([255, 255, 255, 255]));
        assert_eq!(detect(&img).unwrap_err(), QrError::NotFound);
        let img = RgbaImage::from_pixel(256, 256, Rgba([0, 0, 0, 255]));
        assert_eq!(detect(&img).unwrap_err(), QrError::NotFound);
    }

    #[test]
    fn test_snap_version() {
        assert_eq!(snap_version(21.3).unwrap(), Version::new(1));
        assert_eq!(snap_version(24.0).unwrap(), Version::new(2));
        assert_eq!(snap_version(177.0).unwrap(), Version::new(40));
        assert!(snap_version(250.0).is_err());
    }

    #[test]
    fn test_roundtrip_small_scale() {
        let matrix = encode("small scale", ECLevel::M).unwrap();
        let style = StyleSpec { scale: 3, ..StyleSpec::default() };
        let img = composite(&matrix, &style).unwrap();
        assert_eq!(detect(&img).unwrap(), "small scale");
    }
}
