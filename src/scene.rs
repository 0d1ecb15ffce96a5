//! # Scene Graph Module
//!
//! Arena-based storage for everything drawn on the canvas.
//!
//! ## Responsibilities
//! - **Node Storage**: `Vec<Option<SceneNode>>` arena with `NodeId` indices and
//!   recycled slots.
//! - **Draw Order**: insertion order, overridden by `z_index`.
//! - **Card Queries**: lookup by username and hit testing.
//!
//! ## Key Types
//! - `SceneGraph`: The arena container.
//! - `SceneNode`: A `SceneObject` plus its placement.
//! - `SceneObject`: Tagged sum of cards and plain decorations.

use crate::element::Element;
use crate::geometry::Rect;
use crate::node::card::MemberCard;
use crate::systems::scheduler::Property;
use crate::types::NodeId;
use glam::Vec2;

/// What a scene node holds. Only `Card` takes part in reconciliation.
#[derive(Debug)]
pub enum SceneObject {
    Card(Box<MemberCard>),
    Decoration(Box<dyn Element>),
}

impl SceneObject {
    pub fn as_card(&self) -> Option<&MemberCard> {
        match self {
            SceneObject::Card(card) => Some(card),
            SceneObject::Decoration(_) => None,
        }
    }

    pub fn as_card_mut(&mut self) -> Option<&mut MemberCard> {
        match self {
            SceneObject::Card(card) => Some(card),
            SceneObject::Decoration(_) => None,
        }
    }

    pub fn as_element(&self) -> &dyn Element {
        match self {
            SceneObject::Card(card) => card.as_ref(),
            SceneObject::Decoration(element) => element.as_ref(),
        }
    }
}

/// Where a node sits in scene coordinates and how opaque it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub left: f32,
    pub top: f32,
    pub opacity: f32,
}

impl Placement {
    pub fn new(left: f32, top: f32, opacity: f32) -> Self {
        Self { left, top, opacity }
    }

    pub fn get(&self, property: Property) -> f32 {
        match property {
            Property::Left => self.left,
            Property::Top => self.top,
            Property::Opacity => self.opacity,
        }
    }

    pub fn set(&mut self, property: Property, value: f32) {
        match property {
            Property::Left => self.left = value,
            Property::Top => self.top = value,
            Property::Opacity => self.opacity = value.clamp(0.0, 1.0),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

#[derive(Debug)]
pub struct SceneNode {
    pub object: SceneObject,
    pub placement: Placement,
    /// Higher values render on top. Ties keep insertion order.
    pub z_index: i32,
}

impl SceneNode {
    pub fn new(object: SceneObject, placement: Placement) -> Self {
        Self {
            object,
            placement,
            z_index: 0,
        }
    }

    /// Bounds in scene coordinates.
    pub fn scene_bounds(&self) -> Rect {
        self.object
            .as_element()
            .local_bounds()
            .translate(self.placement.position())
    }
}

/// The Scene Graph data structure.
#[derive(Debug, Default)]
pub struct SceneGraph {
    /// The arena. `None` marks a freed slot.
    pub nodes: Vec<Option<SceneNode>>,
    /// Indices of nodes that have been removed and can be reused.
    pub free_indices: Vec<usize>,
    /// Live node ids in insertion order.
    order: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the top of the scene and returns its ID.
    pub fn add_node(&mut self, object: SceneObject, placement: Placement) -> NodeId {
        let node = SceneNode::new(object, placement);
        let id = if let Some(id) = self.free_indices.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        };
        self.order.push(id);
        id
    }

    /// Frees a node's slot. Returns the removed node, or `None` if the id was
    /// already free.
    pub fn destroy_node(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.nodes.get_mut(id)?.take()?;
        self.free_indices.push(id);
        self.order.retain(|&other| other != id);
        Some(node)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    pub fn card(&self, id: NodeId) -> Option<&MemberCard> {
        self.get_node(id).and_then(|n| n.object.as_card())
    }

    pub fn card_mut(&mut self, id: NodeId) -> Option<&mut MemberCard> {
        self.get_node_mut(id).and_then(|n| n.object.as_card_mut())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node ids bottom to top.
    pub fn draw_order(&self) -> Vec<NodeId> {
        let mut ids = self.order.clone();
        // stable: equal z keeps insertion order
        ids.sort_by_key(|&id| self.get_node(id).map_or(0, |n| n.z_index));
        ids
    }

    /// Every card on the scene, in draw order.
    pub fn cards(&self) -> impl Iterator<Item = (NodeId, &SceneNode, &MemberCard)> + '_ {
        self.draw_order().into_iter().filter_map(move |id| {
            let node = self.get_node(id)?;
            node.object.as_card().map(|card| (id, node, card))
        })
    }

    pub fn find_card(&self, username: &str) -> Option<NodeId> {
        self.cards()
            .find(|(_, _, card)| card.username() == username)
            .map(|(id, _, _)| id)
    }

    /// The topmost interactive card whose bounds contain `point` (scene
    /// coordinates).
    pub fn hit_test(&self, point: Vec2) -> Option<NodeId> {
        self.draw_order().into_iter().rev().find(|&id| {
            self.get_node(id).is_some_and(|node| {
                node.object.as_card().is_some_and(|card| card.is_interactive())
                    && node.scene_bounds().contains(point)
            })
        })
    }
}
