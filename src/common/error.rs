use thiserror::Error;

// Error
//------------------------------------------------------------------------------

/// Failure modes of the codec. Every operation reports malformed input
/// through these values; nothing on the encode or decode path panics.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum QrError {
    /// Payload exceeds the capacity of the requested (or any) version at
    /// the requested error correction level.
    #[error("payload too large for the requested version and ec level")]
    PayloadTooLarge,

    /// Payload contains a byte outside the declared encoding mode.
    #[error("payload contains a character unsupported by the declared mode")]
    UnsupportedCharacter,

    /// The requested center overlay does not fit within the output canvas.
    #[error("center overlay does not fit within the canvas")]
    OverlayOutOfBounds,

    /// No QR symbol could be located in the image.
    #[error("no QR symbol found")]
    NotFound,

    /// A symbol was located but error correction could not recover a
    /// consistent codeword sequence.
    #[error("error correction could not recover the codewords")]
    ChecksumFailure,
}

pub type QrResult<T> = Result<T, QrError>;
