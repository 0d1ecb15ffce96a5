use crate::element::{escape_xml, Color, Element};
use crate::errors::AvatarError;
use crate::geometry::Rect;
use crate::node::shape::{ShapeNode, ShapeType};
use crate::systems::raster::to_data_url;
use image::{GenericImageView, ImageFormat};
use std::fmt::Write as _;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

const PLACEHOLDER_FILL: Color = Color::rgb(0x84, 0xa3, 0x8c);

/// A decoded avatar resource. Keeps the original encoded bytes for embedding.
#[derive(Clone, Debug)]
pub struct AvatarImage {
    pub bytes: Arc<Vec<u8>>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl AvatarImage {
    /// Sniffs and fully decodes `bytes` so corrupt images fail here, off the
    /// render path.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, AvatarError> {
        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            format,
            bytes: Arc::new(bytes),
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn to_data_url(&self) -> String {
        to_data_url(self.mime_type(), &self.bytes)
    }
}

#[derive(Clone, Debug)]
pub enum AvatarContent {
    Image(AvatarImage),
    /// Drawn when the avatar failed or timed out: a disc with an initial.
    Placeholder { initial: String },
}

impl AvatarContent {
    /// Placeholder showing the first grapheme of `name`.
    pub fn placeholder_for(name: &str) -> Self {
        let initial = name
            .graphemes(true)
            .next()
            .map(|g| g.to_uppercase())
            .unwrap_or_else(|| "?".to_string());
        AvatarContent::Placeholder { initial }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AvatarContent::Placeholder { .. })
    }
}

/// A square avatar placed inside a card.
#[derive(Clone, Debug)]
pub struct ImageNode {
    pub content: AvatarContent,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl ImageNode {
    pub fn new(content: AvatarContent, x: f32, y: f32, size: f32) -> Self {
        Self { content, x, y, size }
    }
}

impl Element for ImageNode {
    fn local_bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    fn write_svg(&self, out: &mut String) {
        match &self.content {
            AvatarContent::Image(image) => {
                let _ = write!(
                    out,
                    r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid slice" xlink:href="{}"/>"#,
                    self.x,
                    self.y,
                    self.size,
                    self.size,
                    image.to_data_url()
                );
            }
            AvatarContent::Placeholder { initial } => {
                let radius = self.size / 2.0;
                let _ = write!(out, r#"<g transform="translate({} {})">"#, self.x, self.y);
                ShapeNode::new(ShapeType::Circle { radius })
                    .with_fill(PLACEHOLDER_FILL)
                    .write_svg(out);
                let _ = write!(
                    out,
                    r#"<text x="{radius}" y="{radius}" font-size="{radius}" font-family="sans-serif" text-anchor="middle" dominant-baseline="central""#
                );
                Color::WHITE.write_paint("fill", out);
                let _ = write!(out, ">{}</text></g>", escape_xml(initial));
            }
        }
    }
}
