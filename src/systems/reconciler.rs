//! # Reconciler
//!
//! Keeps the cards on the canvas in sync with a desired member list.
//!
//! ## Responsibilities
//! - **Plan**: pure diff of desired members against shown cards
//!   (`ReconcilePlan::compute`): who is added, who leaves, who stays, and the
//!   final collated order.
//! - **Apply**: reposition staying cards, construct incoming cards at their
//!   slot, and start exit animations for leaving cards.
//!
//! Layout is a function of rank in the collated list only, never of arrival
//! order.

use crate::canvas::RosterCanvas;
use crate::member::Member;
use crate::surface::DrawSurface;
use crate::systems::collation::compare_usernames;
use crate::systems::scheduler::{AnimationSpec, Invalidation, Property, TaskKind};
use crate::types::NodeId;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A card currently on the scene, as the reconciler sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShownCard {
    pub node: NodeId,
    pub username: String,
    /// Already running its exit animation.
    pub exiting: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlanEntry {
    Existing { node: NodeId, username: String },
    Incoming(Member),
}

impl PlanEntry {
    pub fn username(&self) -> &str {
        match self {
            PlanEntry::Existing { username, .. } => username,
            PlanEntry::Incoming(member) => &member.username,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Desired members without a card, in desired order.
    pub to_add: Vec<Member>,
    /// Shown cards no longer desired. Cards already exiting are left alone.
    pub to_remove: Vec<ShownCard>,
    /// Shown cards that remain, in scene order.
    pub to_stay: Vec<ShownCard>,
    /// Subset of `to_stay` whose exit must be undone.
    pub to_revive: Vec<NodeId>,
    /// `to_stay ++ to_add`, stable-sorted by username collation.
    pub final_order: Vec<PlanEntry>,
}

impl ReconcilePlan {
    pub fn compute(desired: &[Member], shown: &[ShownCard]) -> Self {
        // Duplicate usernames collapse: first position, last record.
        let mut wanted: HashMap<&str, &Member> = HashMap::new();
        let mut desired_order: Vec<&str> = Vec::new();
        for member in desired {
            if wanted.insert(member.username.as_str(), member).is_none() {
                desired_order.push(member.username.as_str());
            }
        }

        let mut plan = ReconcilePlan::default();
        let mut shown_names: HashSet<&str> = HashSet::new();
        for card in shown {
            let first = shown_names.insert(card.username.as_str());
            if first && wanted.contains_key(card.username.as_str()) {
                if card.exiting {
                    plan.to_revive.push(card.node);
                }
                plan.to_stay.push(card.clone());
            } else if !card.exiting {
                plan.to_remove.push(card.clone());
            }
        }

        plan.to_add = desired_order
            .into_iter()
            .filter(|name| !shown_names.contains(name))
            .filter_map(|name| wanted.get(name).map(|m| (*m).clone()))
            .collect();

        let mut final_order: Vec<PlanEntry> = plan
            .to_stay
            .iter()
            .map(|card| PlanEntry::Existing {
                node: card.node,
                username: card.username.clone(),
            })
            .chain(plan.to_add.iter().cloned().map(PlanEntry::Incoming))
            .collect();
        final_order.sort_by(|a, b| compare_usernames(a.username(), b.username()));
        plan.final_order = final_order;
        plan
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_revive.is_empty()
    }
}

/// Applies `members` to the canvas and returns the newly constructed cards.
pub fn reconcile<S: DrawSurface>(canvas: &mut RosterCanvas<S>, members: &[Member]) -> Vec<NodeId> {
    let plan = ReconcilePlan::compute(members, &canvas.shown_cards());
    debug!(
        add = plan.to_add.len(),
        remove = plan.to_remove.len(),
        stay = plan.to_stay.len(),
        revive = plan.to_revive.len(),
        "reconcile plan"
    );

    for &node in &plan.to_revive {
        canvas.revive(node);
    }

    let config = canvas.config().clone();
    let mut added = Vec::with_capacity(plan.to_add.len());
    for (rank, entry) in plan.final_order.iter().enumerate() {
        let slot = config.layout.slot(rank);
        match entry {
            PlanEntry::Existing { node, .. } => {
                let spec = AnimationSpec::new(
                    TaskKind::Reposition,
                    config.reposition_ms,
                    config.easing,
                    Invalidation::FullScene,
                )
                .with(Property::Left, slot.x)
                .with(Property::Top, slot.y);
                canvas.animate(*node, spec);
            }
            PlanEntry::Incoming(member) => added.push(canvas.spawn_card(member, slot)),
        }
    }

    for card in &plan.to_remove {
        canvas.remove_with_animation(card.node, None);
    }

    added
}
