//! # Canvas Configuration
//!
//! Tunables for the viewport, layout and animation timing. Every field has a
//! default, so a partial JSON document deserialises cleanly.

use crate::animation::EasingType;
use crate::types::ModifierKey;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// How avatar loads are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Loads run on the rayon pool; results arrive on a later frame.
    #[default]
    Background,
    /// Loads run on the calling thread at request time. Results are still
    /// attached on the next frame, never during card construction.
    Inline,
}

/// Fixed row layout for the card column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub left: f32,
    pub top: f32,
    pub row_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left: 32.0,
            top: 32.0,
            row_height: 116.0,
        }
    }
}

impl LayoutConfig {
    /// Resting position of the card ranked `index` in the sorted roster.
    pub fn slot(&self, index: usize) -> Vec2 {
        Vec2::new(self.left, index as f32 * self.row_height + self.top)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Added or subtracted by `zoom_in` / `zoom_out`.
    pub zoom_step: f32,
    /// Wheel zoom multiplies by `wheel_zoom_base ^ delta_y`.
    pub wheel_zoom_base: f32,
    pub pan_modifier: ModifierKey,
    /// Height of host chrome subtracted from the window height on resize.
    pub chrome_height: f32,
    pub layout: LayoutConfig,
    /// Duration of the reposition animation for cards that stay.
    pub reposition_ms: f64,
    /// Duration of entry, exit and drag animations.
    pub animation_ms: f64,
    pub easing: EasingType,
    /// Pending avatar loads older than this fall back to a placeholder.
    pub avatar_timeout_ms: Option<f64>,
    pub load_mode: LoadMode,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.25,
            max_zoom: 4.0,
            zoom_step: 0.5,
            wheel_zoom_base: 0.999,
            pan_modifier: ModifierKey::Alt,
            chrome_height: 50.0,
            layout: LayoutConfig::default(),
            reposition_ms: 100.0,
            animation_ms: 500.0,
            easing: EasingType::EaseIn,
            avatar_timeout_ms: Some(10_000.0),
            load_mode: LoadMode::Background,
        }
    }
}

impl CanvasConfig {
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
