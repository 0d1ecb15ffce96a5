use crate::element::{Color, Element};
use crate::geometry::Rect;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeType {
    Rect {
        width: f32,
        height: f32,
        corner_radius: f32,
    },
    Circle {
        radius: f32,
    },
}

#[derive(Debug, Clone)]
pub struct ShapeNode {
    pub shape_type: ShapeType,
    pub fill_color: Option<Color>,
    pub stroke_color: Option<Color>,
    pub stroke_width: f32,
}

impl ShapeNode {
    pub fn new(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            fill_color: None,
            stroke_color: None,
            stroke_width: 0.0,
        }
    }

    pub fn rect(width: f32, height: f32, corner_radius: f32) -> Self {
        Self::new(ShapeType::Rect {
            width,
            height,
            corner_radius,
        })
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn set_stroke(&mut self, color: Color, width: f32) {
        self.stroke_color = Some(color);
        self.stroke_width = width;
    }

    pub fn clear_stroke(&mut self) {
        self.stroke_color = None;
        self.stroke_width = 0.0;
    }

    pub fn has_stroke(&self) -> bool {
        self.stroke_color.is_some() && self.stroke_width > 0.0
    }

    fn write_paint(&self, out: &mut String) {
        match self.fill_color {
            Some(fill) => fill.write_paint("fill", out),
            None => out.push_str(r#" fill="none""#),
        }
        if let (true, Some(stroke)) = (self.has_stroke(), self.stroke_color) {
            stroke.write_paint("stroke", out);
            let _ = write!(out, r#" stroke-width="{}""#, self.stroke_width);
        }
    }
}

impl Element for ShapeNode {
    fn local_bounds(&self) -> Rect {
        match self.shape_type {
            ShapeType::Rect { width, height, .. } => Rect::from_wh(width, height),
            // Circle centered at (radius, radius) so it fits in [0, 0, 2r, 2r]
            ShapeType::Circle { radius } => Rect::from_wh(radius * 2.0, radius * 2.0),
        }
    }

    fn write_svg(&self, out: &mut String) {
        match self.shape_type {
            ShapeType::Rect {
                width,
                height,
                corner_radius,
            } => {
                let _ = write!(
                    out,
                    r#"<rect x="0" y="0" width="{width}" height="{height}" rx="{corner_radius}" ry="{corner_radius}""#
                );
            }
            ShapeType::Circle { radius } => {
                let _ = write!(out, r#"<circle cx="{radius}" cy="{radius}" r="{radius}""#);
            }
        }
        self.write_paint(out);
        out.push_str("/>");
    }
}
