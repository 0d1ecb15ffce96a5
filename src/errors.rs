use thiserror::Error;

/// Why an avatar could not be attached.
#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("failed to load avatar: {0:#}")]
    Load(#[source] anyhow::Error),
    #[error("failed to decode avatar image")]
    Decode(#[from] image::ImageError),
    #[error("avatar load timed out after {0} ms")]
    TimedOut(f64),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("failed to encode JPG")]
    JpegEncode,
    #[error("JPG rendering requires an opaque background color")]
    JpegOpaqueBackgroundRequired,
    #[error("malformed data URI: {0}")]
    DataUri(String),
}

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("invalid member JSON")]
    Json(#[from] serde_json::Error),
    #[error("member at index {0} has an empty username")]
    EmptyUsername(usize),
}
