//! # roster-engine
//!
//! Renders a roster of organization members as draggable, pannable, zoomable
//! cards and keeps them in sync with an incoming member list.
//!
//! ## Layout
//! - `canvas`: `RosterCanvas`, the controller hosts talk to.
//! - `scene`, `node`, `element`: the headless scene graph and its renderables.
//! - `systems`: scheduler, avatar pipeline, collation, reconciler, raster, export.
//! - `surface`: host seams for drawing and the window.

pub mod animation;
pub mod canvas;
pub mod config;
pub mod element;
pub mod errors;
pub mod geometry;
pub mod member;
pub mod node;
pub mod scene;
pub mod surface;
pub mod systems;
pub mod types;
pub mod viewport;

pub use canvas::{BrowsingContext, CanvasAction, RosterCanvas};
pub use config::{CanvasConfig, LayoutConfig, LoadMode};
pub use member::{Member, MemberField, MemberResponse};
pub use systems::export::{ExportedCard, Exporter};
pub use systems::raster::{RasterFormat, RasterOptions, Rasterizer};
pub use systems::reconciler::ReconcilePlan;
pub use types::{Modifiers, ModifierKey, NodeId, PointerEvent, WheelEvent};

use anyhow::Context;

/// Resolves an avatar URL to encoded image bytes.
///
/// Hosts supply their own implementation for network access; the engine only
/// ever calls it off the canvas thread.
pub trait AvatarLoader: Send + Sync {
    fn load_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Loads `data:` URLs, `file://` URLs and plain filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAvatarLoader;

impl AvatarLoader for DefaultAvatarLoader {
    fn load_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if url.is_empty() {
            anyhow::bail!("member has no avatar");
        }
        if url.starts_with("data:") {
            let blob = systems::raster::data_uri_to_blob(url)?;
            return Ok(blob.bytes);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            anyhow::bail!("remote avatars need a network-capable loader: {url}");
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        std::fs::read(path).with_context(|| format!("Failed to read avatar: {path}"))
    }
}
