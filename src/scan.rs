use image::{imageops, RgbaImage};
use log::debug;

use crate::detector::detect;

// Scan configuration
//------------------------------------------------------------------------------

/// Symbologies a scan session looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Symbology {
    Qr,
}

/// Region of a frame to scan, in pixels. Clamped to the frame bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub symbologies: Vec<Symbology>,
    /// Restricts detection to a sub-region of each frame. Scans the
    /// full frame when unset.
    pub interest_region: Option<Region>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { symbologies: vec![Symbology::Qr], interest_region: None }
    }
}

// Scan session
//------------------------------------------------------------------------------

/// A stateful scanner for a stream of frames. Reports each decoded
/// payload once: consecutive frames with the same symbol stay quiet
/// until the symbol leaves the view.
#[derive(Debug)]
pub struct ScanSession {
    config: ScanConfig,
    last_payload: Option<String>,
}

impl ScanSession {
    pub fn new(config: ScanConfig) -> Self {
        Self { config, last_payload: None }
    }

    pub fn scan_frame(&mut self, frame: &RgbaImage) -> Option<String> {
        if !self.config.symbologies.contains(&Symbology::Qr) {
            return None;
        }

        let res = match self.config.interest_region {
            Some(region) => {
                let (x, y) = (region.x.min(frame.width()), region.y.min(frame.height()));
                let w = region.w.min(frame.width() - x);
                let h = region.h.min(frame.height() - y);
                if w == 0 || h == 0 {
                    return None;
                }
                detect(&imageops::crop_imm(frame, x, y, w, h).to_image())
            }
            None => detect(frame),
        };

        match res {
            Ok(payload) => {
                if self.last_payload.as_deref() == Some(payload.as_str()) {
                    return None;
                }
                debug!("Session decoded new payload ({} bytes)", payload.len());
                self.last_payload = Some(payload.clone());
                Some(payload)
            }
            Err(_) => {
                self.last_payload = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod scan_tests {
    use image::{imageops, Rgba, RgbaImage};

    use super::{Region, ScanConfig, ScanSession};
    use crate::common::metadata::ECLevel;
    use crate::compositor::{composite, StyleSpec};
    use crate::encoder::encode;

    fn frame_with_symbol(payload: &str, x: i64, y: i64) -> RgbaImage {
        let matrix = encode(payload, ECLevel::M).unwrap();
        let symbol = composite(&matrix, &StyleSpec::default()).unwrap();
        let mut frame = RgbaImage::from_pixel(512, 512, Rgba([255, 255, 255, 255]));
        imageops::replace(&mut frame, &symbol, x, y);
        frame
    }

    #[test]
    fn test_scan_frame_decodes() {
        let frame = frame_with_symbol("session test", 60, 60);
        let mut session = ScanSession::new(ScanConfig::default());
        assert_eq!(session.scan_frame(&frame).as_deref(), Some("session test"));
    }

    #[test]
    fn test_repeat_frames_report_once() {
        let frame = frame_with_symbol("once", 60, 60);
        let blank = RgbaImage::from_pixel(512, 512, Rgba([255, 255, 255, 255]));
        let mut session = ScanSession::new(ScanConfig::default());

        assert!(session.scan_frame(&frame).is_some());
        assert!(session.scan_frame(&frame).is_none());
        // The symbol leaves the view, then comes back
        assert!(session.scan_frame(&blank).is_none());
        assert!(session.scan_frame(&frame).is_some());
    }

    #[test]
    fn test_interest_region() {
        let frame = frame_with_symbol("cropped", 200, 200);
        let config = ScanConfig {
            interest_region: Some(Region { x: 180, y: 180, w: 300, h: 300 }),
            ..ScanConfig::default()
        };
        let mut session = ScanSession::new(config);
        assert_eq!(session.scan_frame(&frame).as_deref(), Some("cropped"));

        // A region away from the symbol sees nothing
        let config = ScanConfig {
            interest_region: Some(Region { x: 0, y: 0, w: 150, h: 150 }),
            ..ScanConfig::default()
        };
        let mut session = ScanSession::new(config);
        assert!(session.scan_frame(&frame).is_none());
    }

    #[test]
    fn test_no_symbologies() {
        let frame = frame_with_symbol("ignored", 60, 60);
        let config = ScanConfig { symbologies: Vec::new(), ..ScanConfig::default() };
        let mut session = ScanSession::new(config);
        assert!(session.scan_frame(&frame).is_none());
    }
}
