//! # Export System
//!
//! Snapshot URLs for the cards currently on the scene.
//!
//! ## Responsibilities
//! - **Snapshot**: rasterise a card, round-trip it through a `data:` URL into a
//!   `Blob`, and register the blob under a `blob:` URL.
//! - **Cache**: one URL per username, computed once and never evicted or
//!   refreshed. A card that changed after its first export keeps its first
//!   snapshot.
//!
//! ## Key Types
//! - `Exporter`: owns the cache, the registry and the rasteriser.
//! - `ResourceRegistry`: in-memory stand-in for the host's object-URL table.

use crate::errors::ExportError;
use crate::scene::SceneGraph;
use crate::systems::raster::{data_uri_to_blob, Blob, RasterOptions, Rasterizer};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const BLOB_ORIGIN: &str = "roster-engine";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedCard {
    pub username: String,
    pub url: String,
}

/// Maps `blob:` URLs to registered payloads.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    blobs: HashMap<String, Blob>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, blob: Blob) -> String {
        let url = format!("blob:{BLOB_ORIGIN}/{}", Uuid::new_v4());
        self.blobs.insert(url.clone(), blob);
        url
    }

    pub fn resolve(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// username → snapshot URL. Insert-once.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    urls: HashMap<String, String>,
}

impl SnapshotCache {
    pub fn get(&self, username: &str) -> Option<&str> {
        self.urls.get(username).map(String::as_str)
    }

    /// Keeps the existing entry if there is one and returns the cached URL.
    pub fn insert_if_absent(&mut self, username: &str, url: String) -> &str {
        self.urls.entry(username.to_string()).or_insert(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[derive(Debug)]
pub struct Exporter {
    cache: SnapshotCache,
    registry: ResourceRegistry,
    rasterizer: Rasterizer,
    options: RasterOptions,
}

impl Exporter {
    pub fn new(rasterizer: Rasterizer, options: RasterOptions) -> Self {
        Self {
            cache: SnapshotCache::default(),
            registry: ResourceRegistry::new(),
            rasterizer,
            options,
        }
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn resolve(&self, url: &str) -> Option<&Blob> {
        self.registry.resolve(url)
    }

    /// One entry per card on the scene, in scene order.
    pub fn export_visible(&mut self, scene: &SceneGraph) -> Result<Vec<ExportedCard>, ExportError> {
        let mut exported = Vec::new();
        for (_, node, card) in scene.cards() {
            let username = card.username();
            let url = match self.cache.get(username) {
                Some(url) => url.to_string(),
                None => {
                    let data_url =
                        card.to_data_url(node.placement.opacity, &self.rasterizer, &self.options)?;
                    let blob = data_uri_to_blob(&data_url)?;
                    let url = self.registry.register(blob);
                    debug!(username, %url, "card snapshot registered");
                    self.cache.insert_if_absent(username, url).to_string()
                }
            };
            exported.push(ExportedCard {
                username: username.to_string(),
                url,
            });
        }
        Ok(exported)
    }
}
