use crate::element::{escape_xml, Color, Element};
use crate::geometry::Rect;
use std::fmt::Write as _;

/// Rough advance width per character, as a fraction of the font size.
/// Only used for bounds; the rasterizer shapes the real glyphs.
const AVERAGE_ADVANCE: f32 = 0.6;

/// A single line of text anchored at its left edge, vertically centred on `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub font_family: String,
    pub color: Color,
}

impl TextNode {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size: 16.0,
            font_family: "sans-serif".to_string(),
            color: Color::BLACK,
        }
    }
}

impl Element for TextNode {
    fn local_bounds(&self) -> Rect {
        let width = self.text.chars().count() as f32 * self.font_size * AVERAGE_ADVANCE;
        Rect::new(
            self.x,
            self.y - self.font_size / 2.0,
            width,
            self.font_size,
        )
    }

    fn write_svg(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"<text x="{}" y="{}" font-size="{}" font-family="{}" dominant-baseline="central""#,
            self.x,
            self.y,
            self.font_size,
            escape_xml(&self.font_family)
        );
        self.color.write_paint("fill", out);
        let _ = write!(out, ">{}</text>", escape_xml(&self.text));
    }
}
