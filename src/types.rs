//! # Shared Types
//!
//! Small value types shared by the scene graph, the cards and the canvas.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Index into the scene graph arena.
pub type NodeId = usize;

/// Keyboard modifiers held while a pointer or wheel event was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::default()
        }
    }
}

/// The modifier that turns a pointer-down into a viewport pan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKey {
    #[default]
    Alt,
    Ctrl,
    Shift,
    Meta,
}

impl ModifierKey {
    pub fn is_held(self, modifiers: &Modifiers) -> bool {
        match self {
            ModifierKey::Alt => modifiers.alt,
            ModifierKey::Ctrl => modifiers.ctrl,
            ModifierKey::Shift => modifiers.shift,
            ModifierKey::Meta => modifiers.meta,
        }
    }
}

/// A pointer event in surface (screen) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub position: Vec2,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            modifiers: Modifiers::none(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// A wheel event in surface coordinates. Positive `delta_y` scrolls down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelEvent {
    pub position: Vec2,
    pub delta_y: f32,
    pub modifiers: Modifiers,
}

impl WheelEvent {
    pub fn new(x: f32, y: f32, delta_y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            delta_y,
            modifiers: Modifiers::none(),
        }
    }
}
