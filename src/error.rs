use thiserror::Error;

/// Errors fatal to a single conversion call. No partial result is produced.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source image bytes could not be decoded.
    #[error("failed to decode source image: {0}")]
    ImageLoad(#[from] image::ImageError),

    /// The in-memory canvas could not be acquired.
    #[error("rendering surface unavailable for {width}x{height} canvas")]
    RenderingUnavailable { width: u32, height: u32 },

    #[error("canvas dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Crop offsets, crop scale, or text geometry were not finite positive numbers.
    #[error("crop and text geometry must be finite")]
    InvalidGeometry,
}

/// Errors fatal to a guide export. Individual tile failures are logged and
/// skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("tile size and upscale factor must be positive, got {tile_size} and {upscale}")]
    InvalidTiling { tile_size: u32, upscale: u32 },

    #[error("pixel grid does not match its dimensions")]
    MalformedPixelData,

    #[error("failed to write guide archive: {0}")]
    ArchiveWrite(#[from] zip::result::ZipError),

    #[error("failed to write guide archive: {0}")]
    ArchiveIo(#[from] std::io::Error),
}
