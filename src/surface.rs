//! # Surface Module
//!
//! Host seams for drawing and for the window the canvas lives in.
//!
//! ## Key Types
//! - `DrawSurface`: receives full-scene renders and per-card cache refreshes.
//! - `SvgSurface`: headless surface that keeps the last frame as SVG.
//! - `WindowHost`: window size plus resize subscription.
//! - `HeadlessWindow`: in-memory window for tests and the CLI.

use crate::element::Element;
use crate::scene::{SceneGraph, SceneNode};
use crate::types::NodeId;
use crate::viewport::Viewport;
use crossbeam_channel::Sender;
use glam::Vec2;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// The drawable a canvas renders into.
pub trait DrawSurface {
    fn set_dimensions(&mut self, width: f32, height: f32);
    /// Redraws every node through the viewport transform.
    fn render_all(&mut self, scene: &SceneGraph, viewport: &Viewport);
    /// Re-rasterises a single node's cached appearance without a full redraw.
    fn refresh_cache(&mut self, id: NodeId, node: &SceneNode);
    /// Releases the surface. Called once by the canvas.
    fn dispose(&mut self);
}

/// Serialises one node, wrapped in its placement, to SVG.
pub fn write_node_svg(node: &SceneNode, out: &mut String) {
    let placement = node.placement;
    let _ = write!(
        out,
        r#"<g transform="translate({} {})" opacity="{:.3}">"#,
        placement.left, placement.top, placement.opacity
    );
    node.object.as_element().write_svg(out);
    out.push_str("</g>");
}

/// A complete SVG document of the scene as seen through `viewport`.
pub fn render_scene_svg(scene: &SceneGraph, viewport: &Viewport, width: f32, height: f32) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><g transform="{}">"#,
        viewport.svg_transform()
    );
    for id in scene.draw_order() {
        if let Some(node) = scene.get_node(id) {
            write_node_svg(node, &mut out);
        }
    }
    out.push_str("</g></svg>");
    out
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub full_renders: usize,
    pub cache_refreshes: usize,
}

#[derive(Debug, Default)]
pub struct SvgSurface {
    width: f32,
    height: f32,
    last_frame: Option<String>,
    node_cache: HashMap<NodeId, String>,
    stats: RenderStats,
    disposed: bool,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn last_frame(&self) -> Option<&str> {
        self.last_frame.as_deref()
    }

    pub fn cached_node(&self, id: NodeId) -> Option<&str> {
        self.node_cache.get(&id).map(String::as_str)
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl DrawSurface for SvgSurface {
    fn set_dimensions(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    fn render_all(&mut self, scene: &SceneGraph, viewport: &Viewport) {
        if self.disposed {
            return;
        }
        self.stats.full_renders += 1;
        self.node_cache.retain(|&id, _| scene.get_node(id).is_some());
        self.last_frame = Some(render_scene_svg(scene, viewport, self.width, self.height));
    }

    fn refresh_cache(&mut self, id: NodeId, node: &SceneNode) {
        if self.disposed {
            return;
        }
        self.stats.cache_refreshes += 1;
        let mut fragment = String::new();
        write_node_svg(node, &mut fragment);
        self.node_cache.insert(id, fragment);
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.node_cache.clear();
        self.last_frame = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowSignal {
    Resized { width: f32, height: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// The window hosting the canvas.
pub trait WindowHost: Send + Sync {
    fn inner_size(&self) -> Vec2;
    fn subscribe_resize(&self, listener: Sender<WindowSignal>) -> SubscriptionId;
    /// Returns false if `id` was not subscribed.
    fn unsubscribe_resize(&self, id: SubscriptionId) -> bool;
}

#[derive(Debug)]
struct HeadlessState {
    size: Vec2,
    listeners: HashMap<SubscriptionId, Sender<WindowSignal>>,
    next_id: u64,
}

/// In-memory window. `resize_to` plays the role of the OS resize event.
#[derive(Debug)]
pub struct HeadlessWindow {
    state: Mutex<HeadlessState>,
}

impl HeadlessWindow {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                size: Vec2::new(width, height),
                listeners: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    pub fn resize_to(&self, width: f32, height: f32) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.size = Vec2::new(width, height);
        state
            .listeners
            .retain(|_, tx| tx.send(WindowSignal::Resized { width, height }).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

impl WindowHost for HeadlessWindow {
    fn inner_size(&self) -> Vec2 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).size
    }

    fn subscribe_resize(&self, listener: Sender<WindowSignal>) -> SubscriptionId {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.listeners.insert(id, listener);
        id
    }

    fn unsubscribe_resize(&self, id: SubscriptionId) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .remove(&id)
            .is_some()
    }
}
