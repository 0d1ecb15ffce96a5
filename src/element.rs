//! # Element Module
//!
//! The renderable capability shared by every visual object in the scene.
//!
//! ## Responsibilities
//! - **Element trait**: local bounds plus SVG serialisation.
//! - **Color**: RGBA colour with hex parsing and SVG paint output.
//!
//! Elements draw in their own local space. The scene graph applies each
//! node's placement (translation and opacity) around the emitted markup.

use crate::geometry::Rect;
use std::fmt;
use std::fmt::Write as _;

/// Anything that can be drawn by a surface.
pub trait Element: fmt::Debug {
    /// Bounds in local coordinates, before placement.
    fn local_bounds(&self) -> Rect;

    /// Appends SVG markup for this element, in local coordinates.
    fn write_svg(&self, out: &mut String);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;

        fn pair(b: &[u8]) -> Option<u8> {
            let hi = (*b.first()? as char).to_digit(16)? as u8;
            let lo = (*b.get(1)? as char).to_digit(16)? as u8;
            Some((hi << 4) | lo)
        }
        fn single(c: u8) -> Option<u8> {
            let v = (c as char).to_digit(16)? as u8;
            Some((v << 4) | v)
        }

        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => Some(Self::rgb(
                single(bytes[0])?,
                single(bytes[1])?,
                single(bytes[2])?,
            )),
            4 => Some(Self::rgba(
                single(bytes[0])?,
                single(bytes[1])?,
                single(bytes[2])?,
                single(bytes[3])?,
            )),
            6 => Some(Self::rgb(
                pair(&bytes[0..2])?,
                pair(&bytes[2..4])?,
                pair(&bytes[4..6])?,
            )),
            8 => Some(Self::rgba(
                pair(&bytes[0..2])?,
                pair(&bytes[2..4])?,
                pair(&bytes[4..6])?,
                pair(&bytes[6..8])?,
            )),
            _ => None,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.a as f32 / 255.0
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Writes ` {attr}="rgb(..)" {attr}-opacity=".."` for an SVG paint attribute.
    pub fn write_paint(&self, attr: &str, out: &mut String) {
        let _ = write!(
            out,
            r#" {attr}="rgb({},{},{})" {attr}-opacity="{:.3}""#,
            self.r,
            self.g,
            self.b,
            self.alpha()
        );
    }
}

/// Escapes text content and attribute values for SVG output.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
