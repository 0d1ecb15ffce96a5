//! # Viewport
//!
//! Pan/zoom transform between scene coordinates and surface pixels:
//! `screen = scene * zoom + translation`.

use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    /// Surface-pixel offset of the scene origin.
    pub translation: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            translation: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn screen_to_scene(&self, point: Vec2) -> Vec2 {
        (point - self.translation) / self.zoom
    }

    pub fn scene_to_screen(&self, point: Vec2) -> Vec2 {
        point * self.zoom + self.translation
    }

    /// Sets `zoom` while keeping the scene point under `anchor` (surface
    /// pixels) fixed. The caller clamps `zoom`.
    pub fn zoom_to_point(&mut self, anchor: Vec2, zoom: f32) {
        let ratio = zoom / self.zoom;
        self.translation = anchor - (anchor - self.translation) * ratio;
        self.zoom = zoom;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.translation += delta;
    }

    /// SVG `matrix(...)` for the root group.
    pub fn svg_transform(&self) -> String {
        format!(
            "matrix({} 0 0 {} {} {})",
            self.zoom, self.zoom, self.translation.x, self.translation.y
        )
    }
}
