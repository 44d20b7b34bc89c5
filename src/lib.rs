//! # qrtools
//!
//! A Rust library for generating, styling and reading QR codes with
//! Reed-Solomon error correction. Covers the full pipeline from payload
//! to raster image and back.
//!
//! ## Features
//!
//! - **Encoding**: Payload to symbol matrix, with optimal mode
//!   segmentation, automatic version selection and mask evaluation
//! - **Compositing**: Symbol matrix to RGBA raster with custom colors,
//!   transparent backgrounds and centered logo overlays
//! - **Detection**: Raster back to payload, with adaptive binarization,
//!   perspective correction and Reed-Solomon rectification
//! - **Scan sessions**: Stateful frame-by-frame scanning with interest
//!   regions and duplicate suppression
//!
//! ## Encoding and rendering
//!
//! ```rust
//! use qrtools::{composite, encode, ECLevel, StyleSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let matrix = encode("Hello, World!", ECLevel::M)?;
//! let img = composite(&matrix, &StyleSpec::default())?;
//! img.save("hello.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading
//!
//! ```rust,no_run
//! use qrtools::detect;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("hello.png")?.to_rgba8();
//! let payload = detect(&img)?;
//! println!("Decoded: {payload}");
//! # Ok(())
//! # }
//! ```

mod codec;
mod common;
mod compositor;
mod detector;
mod encoder;
mod matrix;
mod scan;

pub use common::error::{QrError, QrResult};
pub use common::metadata::{ECLevel, Mode, Version};
pub use compositor::{composite, Overlay, StyleSpec};
pub use detector::detect;
pub use encoder::{encode, encode_in_mode, encode_with_version};
pub use matrix::SymbolMatrix;
pub use scan::{Region, ScanConfig, ScanSession, Symbology};
