//! # Animation Scheduler
//!
//! Drives every running card animation from one clock.
//!
//! ## Responsibilities
//! - **Tasks**: an `AnimationTask` tweens a set of placement properties of one
//!   node and names the render invalidation each frame needs.
//! - **Ownership of properties**: starting a task claims its properties from
//!   older tasks on the same node, so the latest animation wins.
//! - **Completion**: finished tasks are handed back with their hook; the caller
//!   decides what runs before the hook.
//!
//! ## Key Types
//! - `AnimationSpec`: what to animate, for how long, with which easing.
//! - `Scheduler`: the task list plus the scheduler clock (milliseconds).

use crate::animation::{Animated, EasingType};
use crate::scene::SceneGraph;
use crate::types::NodeId;
use std::fmt;
use tracing::trace;

/// An animatable placement property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    Left,
    Top,
    Opacity,
}

/// How much of the surface a frame of an animation invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// Batched re-render of the whole scene.
    FullScene,
    /// Refresh of the animated card's own cache only.
    CardCache,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Entry,
    Exit,
    Reposition,
    Drag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

pub type CompletionHook = Box<dyn FnOnce(NodeId)>;

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSpec {
    pub kind: TaskKind,
    pub targets: Vec<(Property, f32)>,
    /// Milliseconds.
    pub duration: f64,
    pub easing: EasingType,
    pub invalidation: Invalidation,
}

impl AnimationSpec {
    pub fn new(kind: TaskKind, duration: f64, easing: EasingType, invalidation: Invalidation) -> Self {
        Self {
            kind,
            targets: Vec::new(),
            duration,
            easing,
            invalidation,
        }
    }

    pub fn with(mut self, property: Property, target: f32) -> Self {
        self.targets.retain(|(p, _)| *p != property);
        self.targets.push((property, target));
        self
    }
}

pub struct AnimationTask {
    pub id: TaskId,
    pub node: NodeId,
    pub kind: TaskKind,
    pub started_at: f64,
    pub duration: f64,
    pub easing: EasingType,
    pub invalidation: Invalidation,
    tweens: Vec<(Property, Animated<f32>)>,
    on_complete: Option<CompletionHook>,
}

impl AnimationTask {
    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.tweens.iter().map(|(p, _)| *p)
    }
}

impl fmt::Debug for AnimationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationTask")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("kind", &self.kind)
            .field("started_at", &self.started_at)
            .field("duration", &self.duration)
            .field("tweens", &self.tweens)
            .field("has_hook", &self.on_complete.is_some())
            .finish()
    }
}

/// A task that reached its end on this step.
pub struct FinishedTask {
    pub id: TaskId,
    pub node: NodeId,
    pub kind: TaskKind,
    pub on_complete: Option<CompletionHook>,
}

impl fmt::Debug for FinishedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishedTask")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct StepOutcome {
    /// One entry per task that wrote values this step.
    pub invalidations: Vec<(NodeId, Invalidation)>,
    pub finished: Vec<FinishedTask>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: f64,
    next_id: u64,
    tasks: Vec<AnimationTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler clock in milliseconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn tasks(&self) -> &[AnimationTask] {
        &self.tasks
    }

    pub fn has_task(&self, node: NodeId, kind: TaskKind) -> bool {
        self.tasks.iter().any(|t| t.node == node && t.kind == kind)
    }

    /// Starts animating `node` from its current placement toward the
    /// targets. Returns `None` if the node does not exist.
    pub fn start(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        spec: AnimationSpec,
        on_complete: Option<CompletionHook>,
    ) -> Option<TaskId> {
        let placement = scene.get_node(node)?.placement;

        for (property, _) in &spec.targets {
            self.release(node, *property);
        }

        let tweens = spec
            .targets
            .iter()
            .map(|&(property, target)| {
                let tween =
                    Animated::tween(placement.get(property), target, spec.duration, spec.easing);
                (property, tween)
            })
            .collect();

        let id = TaskId(self.next_id);
        self.next_id += 1;
        trace!(?id, node, kind = ?spec.kind, duration = spec.duration, "animation started");

        self.tasks.push(AnimationTask {
            id,
            node,
            kind: spec.kind,
            started_at: self.now,
            duration: spec.duration.max(0.0),
            easing: spec.easing,
            invalidation: spec.invalidation,
            tweens,
            on_complete,
        });
        Some(id)
    }

    /// Removes `property` from every task on `node`. A task left with nothing
    /// to animate is dropped together with its hook.
    fn release(&mut self, node: NodeId, property: Property) {
        for task in self.tasks.iter_mut().filter(|t| t.node == node) {
            task.tweens.retain(|(p, _)| *p != property);
        }
        self.tasks.retain(|task| {
            let keep = task.node != node || !task.tweens.is_empty();
            if !keep {
                trace!(id = ?task.id, node, "animation superseded");
            }
            keep
        });
    }

    /// Drops every task on `node` without running hooks. Returns how many.
    pub fn cancel_node(&mut self, node: NodeId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.node != node);
        before - self.tasks.len()
    }

    /// Drops the tasks of one kind on `node` without running hooks.
    pub fn cancel_kind(&mut self, node: NodeId, kind: TaskKind) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.node != node || t.kind != kind);
        before != self.tasks.len()
    }

    /// Advances the clock by `dt` milliseconds and writes the tweened values
    /// into the scene.
    pub fn step(&mut self, dt: f64, scene: &mut SceneGraph) -> StepOutcome {
        self.now += dt.max(0.0);
        let now = self.now;
        let mut outcome = StepOutcome::default();

        let mut running = Vec::with_capacity(self.tasks.len());
        for mut task in self.tasks.drain(..) {
            let Some(node) = scene.get_node_mut(task.node) else {
                trace!(id = ?task.id, node = task.node, "animation target gone");
                continue;
            };

            let elapsed = now - task.started_at;
            for (property, tween) in &mut task.tweens {
                tween.update(elapsed);
                node.placement.set(*property, tween.current_value);
            }
            outcome.invalidations.push((task.node, task.invalidation));

            if elapsed >= task.duration {
                outcome.finished.push(FinishedTask {
                    id: task.id,
                    node: task.node,
                    kind: task.kind,
                    on_complete: task.on_complete.take(),
                });
            } else {
                running.push(task);
            }
        }
        self.tasks = running;
        outcome
    }
}
