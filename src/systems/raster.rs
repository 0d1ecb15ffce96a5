//! # Raster System
//!
//! Turns SVG documents into encoded images and moves them in and out of
//! `data:` URIs.
//!
//! ## Responsibilities
//! - **Rasterisation**: SVG → usvg tree → tiny-skia pixmap at the export scale.
//! - **Encoding**: PNG via tiny-skia, JPEG via `image` (opaque background
//!   required).
//! - **Data URIs**: encode bytes as a base64 `data:` URL and decode one back
//!   into a `Blob`.

use crate::element::Color;
use crate::errors::ExportError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[default]
    Jpeg,
    Png,
}

impl RasterFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Png => "png",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RasterOptions {
    pub format: RasterFormat,
    /// JPEG quality, 1..=100.
    pub quality: u8,
    pub multiplier: f32,
    /// When set, the device pixel ratio multiplies the output scale.
    pub enable_retina_scaling: bool,
    pub device_pixel_ratio: f32,
    /// Painted under the card. JPEG needs it opaque.
    pub background: Color,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            format: RasterFormat::Jpeg,
            quality: 100,
            multiplier: 2.0,
            enable_retina_scaling: true,
            device_pixel_ratio: 1.0,
            background: Color::WHITE,
        }
    }
}

impl RasterOptions {
    pub fn effective_scale(&self) -> f32 {
        let dpr = if self.enable_retina_scaling {
            self.device_pixel_ratio.max(f32::EPSILON)
        } else {
            1.0
        };
        self.multiplier.max(f32::EPSILON) * dpr
    }
}

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// Shared rasteriser. Holds the font database so it is loaded once.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    /// Rasteriser backed by the system fonts.
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        Self::with_fontdb(Arc::new(fontdb))
    }

    pub fn with_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    /// Renders `svg` at the options' scale and encodes it.
    pub fn render(&self, svg: &str, options: &RasterOptions) -> Result<Vec<u8>, ExportError> {
        if options.format == RasterFormat::Jpeg && !options.background.is_opaque() {
            return Err(ExportError::JpegOpaqueBackgroundRequired);
        }

        let pixmap = self.render_pixmap(svg, options)?;
        match options.format {
            RasterFormat::Png => pixmap.encode_png().map_err(|_| ExportError::PngEncode),
            RasterFormat::Jpeg => encode_jpeg(&pixmap, options.quality),
        }
    }

    fn render_pixmap(
        &self,
        svg: &str,
        options: &RasterOptions,
    ) -> Result<tiny_skia::Pixmap, ExportError> {
        let mut opt = usvg::Options::default();
        opt.fontdb = self.fontdb.clone();
        opt.font_family = "sans-serif".to_string();

        let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| ExportError::SvgParse)?;

        let scale = options.effective_scale();
        let size = tree.size();
        let width_px = (size.width() * scale).ceil().max(1.0) as u32;
        let height_px = (size.height() * scale).ceil().max(1.0) as u32;
        trace!(width_px, height_px, scale, "rasterising");

        let mut pixmap =
            tiny_skia::Pixmap::new(width_px, height_px).ok_or(ExportError::PixmapAlloc)?;
        pixmap.fill(to_skia_color(options.background));

        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }
}

fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: u8) -> Result<Vec<u8>, ExportError> {
    let (w, h) = (pixmap.width(), pixmap.height());

    // Background is opaque, so the premultiplied RGBA is plain RGB plus 255.
    let mut rgb = Vec::with_capacity((w as usize) * (h as usize) * 3);
    for px in pixmap.data().chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }

    let mut out = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|_| ExportError::JpegEncode)?;
    Ok(out)
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Binary payload with its media type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:` URI, base64 or percent-encoded.
pub fn data_uri_to_blob(uri: &str) -> Result<Blob, ExportError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ExportError::DataUri("missing data: scheme".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExportError::DataUri("missing ',' separator".into()))?;

    let mut params = meta.split(';');
    let mime = match params.next() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => "text/plain".to_string(),
    };
    let is_base64 = params.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| ExportError::DataUri(e.to_string()))?
    } else {
        percent_decode_str(payload).collect()
    };
    Ok(Blob { mime, bytes })
}
