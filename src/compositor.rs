use image::{imageops, Rgba, RgbaImage};
use log::debug;

use crate::common::error::{QrError, QrResult};
use crate::matrix::SymbolMatrix;

// Style spec
//------------------------------------------------------------------------------

/// An image to draw centered over the symbol, typically a logo. Relies
/// on the symbol's error correction to absorb the covered modules.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub image: RgbaImage,
    /// Target size in pixels; the image is resized to fit. Rendered at
    /// its natural size when unset.
    pub size: Option<(u32, u32)>,
}

/// Rendering parameters for [`composite`].
#[derive(Debug, Clone)]
pub struct StyleSpec {
    pub foreground: Rgba<u8>,
    /// Light module color. Unset renders light modules fully
    /// transparent.
    pub background: Option<Rgba<u8>>,
    /// Pixels per module.
    pub scale: u32,
    pub overlay: Option<Overlay>,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            foreground: Rgba([0, 0, 0, 255]),
            background: Some(Rgba([255, 255, 255, 255])),
            scale: 10,
            overlay: None,
        }
    }
}

// Compositor
//------------------------------------------------------------------------------

/// Rasterizes the symbol into an RGBA image, one `scale` x `scale`
/// square per module, with the overlay alpha blended over the center.
pub fn composite(matrix: &SymbolMatrix, style: &StyleSpec) -> QrResult<RgbaImage> {
    let scale = style.scale.max(1);
    let side = matrix.side() as u32;
    let size = side * scale;
    let bg = style.background.unwrap_or(Rgba([0, 0, 0, 0]));

    let mut img = RgbaImage::from_fn(size, size, |x, y| {
        if matrix.get((y / scale) as i32, (x / scale) as i32) {
            style.foreground
        } else {
            bg
        }
    });

    if let Some(overlay) = &style.overlay {
        blend_overlay(&mut img, overlay)?;
    }

    debug!("Composited version {} symbol into {size}x{size} raster", matrix.version());
    Ok(img)
}

fn blend_overlay(img: &mut RgbaImage, overlay: &Overlay) -> QrResult<()> {
    let resized;
    let src = match overlay.size {
        Some((w, h)) => {
            resized = imageops::resize(&overlay.image, w, h, imageops::FilterType::Lanczos3);
            &resized
        }
        None => &overlay.image,
    };

    let (w, h) = src.dimensions();
    if w > img.width() || h > img.height() {
        return Err(QrError::OverlayOutOfBounds);
    }

    let x = (img.width() - w) / 2;
    let y = (img.height() - h) / 2;
    imageops::overlay(img, src, x as i64, y as i64);
    Ok(())
}
