//! # Roster Canvas
//!
//! The viewport controller. Owns the scene, the animation scheduler, the avatar
//! pipeline and the drawable surface, and is the only place scene state is
//! mutated.
//!
//! ## Responsibilities
//! - **Frame loop**: `advance` drains window signals and avatar results, steps
//!   animations, runs exit completions and flushes renders once per frame.
//! - **Render batching**: full-scene requests coalesce into one render per
//!   frame; a full render subsumes pending per-card cache refreshes.
//! - **Viewport**: zoom (clamped, anchored), pan with the pan modifier, resize.
//! - **Input**: dispatches pointer events to cards and returns the actions the
//!   host must carry out (navigation, event suppression).
//! - **Lifecycle**: card spawn, exit, revive; idempotent `dispose`.

use crate::animation::EasingType;
use crate::config::CanvasConfig;
use crate::element::Element;
use crate::member::Member;
use crate::node::card::{CardPhase, CardResponse, MemberCard, ENTRY_OFFSET};
use crate::node::image::AvatarContent;
use crate::scene::{Placement, SceneGraph, SceneObject};
use crate::surface::{DrawSurface, SubscriptionId, WindowHost, WindowSignal};
use crate::systems::avatar::{AvatarCompletion, AvatarPipeline};
use crate::systems::reconciler::{self, ShownCard};
use crate::systems::scheduler::{
    AnimationSpec, CompletionHook, FinishedTask, Invalidation, Property, Scheduler, TaskId,
    TaskKind,
};
use crate::types::{NodeId, PointerEvent, WheelEvent};
use crate::viewport::Viewport;
use crate::AvatarLoader;
use crossbeam_channel::Receiver;
use glam::Vec2;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Where a navigation should open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowsingContext {
    NewTab,
}

/// Side effects the host performs on behalf of the canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanvasAction {
    Navigate { url: String, target: BrowsingContext },
    PreventDefault,
    StopPropagation,
}

#[derive(Debug, Default)]
struct RenderBatch {
    full: bool,
    cards: BTreeSet<NodeId>,
}

impl RenderBatch {
    fn is_empty(&self) -> bool {
        !self.full && self.cards.is_empty()
    }
}

pub struct RosterCanvas<S: DrawSurface> {
    config: CanvasConfig,
    scene: SceneGraph,
    scheduler: Scheduler,
    avatars: AvatarPipeline,
    surface: S,
    window: Arc<dyn WindowHost>,
    resize_rx: Receiver<WindowSignal>,
    subscription: Option<SubscriptionId>,
    viewport: Viewport,
    width: f32,
    height: f32,
    panning: bool,
    last_pointer: Option<Vec2>,
    selection_enabled: bool,
    hovered: Option<NodeId>,
    pressed: Option<NodeId>,
    pending: RenderBatch,
    disposed: bool,
}

impl<S: DrawSurface> std::fmt::Debug for RosterCanvas<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterCanvas")
            .field("nodes", &self.scene.len())
            .field("tasks", &self.scheduler.task_count())
            .field("avatars", &self.avatars)
            .field("viewport", &self.viewport)
            .field("size", &(self.width, self.height))
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<S: DrawSurface> RosterCanvas<S> {
    /// Subscribes to window resizes and sizes the surface to the window.
    pub fn new(
        config: CanvasConfig,
        surface: S,
        window: Arc<dyn WindowHost>,
        loader: Arc<dyn AvatarLoader>,
    ) -> Self {
        let (tx, resize_rx) = crossbeam_channel::unbounded();
        let subscription = window.subscribe_resize(tx);
        let avatars = AvatarPipeline::new(loader, config.load_mode, config.avatar_timeout_ms);

        let mut canvas = Self {
            config,
            scene: SceneGraph::new(),
            scheduler: Scheduler::new(),
            avatars,
            surface,
            window,
            resize_rx,
            subscription: Some(subscription),
            viewport: Viewport::default(),
            width: 0.0,
            height: 0.0,
            panning: false,
            last_pointer: None,
            selection_enabled: true,
            hovered: None,
            pressed: None,
            pending: RenderBatch::default(),
            disposed: false,
        };
        canvas.resize();
        canvas
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom(&self) -> f32 {
        self.viewport.zoom
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn pending_avatars(&self) -> usize {
        self.avatars.pending_count()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// True once no animation, avatar load or render is outstanding.
    pub fn is_settled(&self) -> bool {
        self.scheduler.is_idle() && self.avatars.pending_count() == 0 && self.pending.is_empty()
    }

    // --- Reconciliation ---

    /// Brings the cards in line with `members`; returns the new cards.
    pub fn render_members(&mut self, members: &[Member]) -> Vec<NodeId> {
        reconciler::reconcile(self, members)
    }

    pub fn shown_cards(&self) -> Vec<ShownCard> {
        self.scene
            .cards()
            .map(|(node, _, card)| ShownCard {
                node,
                username: card.username().to_string(),
                exiting: card.phase() == CardPhase::Exiting,
            })
            .collect()
    }

    /// Constructs a card for `member` whose resting position is `slot`. The
    /// card starts invisible and `ENTRY_OFFSET` to the left; its avatar load
    /// starts now and the entry animation runs once it resolves.
    pub fn spawn_card(&mut self, member: &Member, slot: Vec2) -> NodeId {
        let card = MemberCard::new(member);
        let placement = Placement::new(slot.x - ENTRY_OFFSET, slot.y, 0.0);
        let node = self
            .scene
            .add_node(SceneObject::Card(Box::new(card)), placement);

        let ticket = self
            .avatars
            .request(node, &member.avatar, self.scheduler.now());
        if let Some(card) = self.scene.card_mut(node) {
            card.avatar_ticket = Some(ticket);
        }
        trace!(node, username = %member.username, "card spawned");
        self.request_full_render();
        node
    }

    /// Adds a non-card element. Decorations never take part in reconciliation.
    pub fn add_decoration(&mut self, element: Box<dyn Element>, left: f32, top: f32) -> NodeId {
        let node = self
            .scene
            .add_node(SceneObject::Decoration(element), Placement::new(left, top, 1.0));
        self.request_full_render();
        node
    }

    pub fn animate(&mut self, node: NodeId, spec: AnimationSpec) -> Option<TaskId> {
        self.scheduler.start(&self.scene, node, spec, None)
    }

    /// Fades the card out while sliding it left, then detaches it and calls
    /// `on_complete`. Returns false if the card is missing or already exiting.
    pub fn remove_with_animation(&mut self, node: NodeId, on_complete: Option<CompletionHook>) -> bool {
        let Some(card) = self.scene.card_mut(node) else {
            return false;
        };
        if card.phase() == CardPhase::Exiting {
            return false;
        }
        card.begin_exit();

        let spec = AnimationSpec::new(
            TaskKind::Exit,
            self.config.animation_ms,
            self.config.easing,
            Invalidation::FullScene,
        )
        .with(Property::Opacity, 0.0)
        .with(Property::Left, -ENTRY_OFFSET);
        self.scheduler
            .start(&self.scene, node, spec, on_complete)
            .is_some()
    }

    /// Cancels a running exit. The entry animation replays if the avatar is
    /// already attached; otherwise it runs when the avatar arrives.
    pub fn revive(&mut self, node: NodeId) -> bool {
        let Some(card) = self.scene.card_mut(node) else {
            return false;
        };
        if card.phase() != CardPhase::Exiting {
            return false;
        }
        card.revive();
        let has_avatar = card.avatar().is_some();
        self.scheduler.cancel_kind(node, TaskKind::Exit);
        debug!(node, "exiting card revived");
        if has_avatar {
            self.start_entry(node);
        }
        true
    }

    fn start_entry(&mut self, node: NodeId) {
        let spec = AnimationSpec::new(
            TaskKind::Entry,
            self.config.animation_ms,
            self.config.easing,
            Invalidation::FullScene,
        )
        .with(Property::Opacity, 1.0)
        .with(Property::Left, self.config.layout.left);
        self.scheduler.start(&self.scene, node, spec, None);
    }

    // --- Frame loop ---

    /// Advances time by `dt_ms` and flushes at most one render.
    pub fn advance(&mut self, dt_ms: f64) {
        if self.disposed {
            return;
        }

        if self.resize_rx.try_iter().count() > 0 {
            self.resize();
        }

        let completions = self.avatars.poll();
        self.apply_avatars(completions);
        let expired = self.avatars.expire(self.scheduler.now() + dt_ms);
        self.apply_avatars(expired);

        let outcome = self.scheduler.step(dt_ms, &mut self.scene);
        for (node, invalidation) in outcome.invalidations {
            match invalidation {
                Invalidation::FullScene => self.request_full_render(),
                Invalidation::CardCache => self.request_card_refresh(node),
            }
        }
        for finished in outcome.finished {
            self.finish_task(finished);
        }

        self.flush();
    }

    /// Steps frames until nothing is outstanding or `max_frames` ran. Background
    /// avatar loads are awaited for up to one frame each while animations idle.
    /// Returns the number of frames stepped.
    pub fn run_until_idle(&mut self, frame_ms: f64, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && !self.disposed && !self.is_settled() {
            if self.scheduler.is_idle() && self.avatars.pending_count() > 0 {
                let wait = Duration::from_secs_f64(frame_ms.max(1.0) / 1000.0);
                let completions = self.avatars.wait(wait);
                self.apply_avatars(completions);
            }
            self.advance(frame_ms);
            frames += 1;
        }
        frames
    }

    fn apply_avatars(&mut self, completions: Vec<AvatarCompletion>) {
        for completion in completions {
            let Some(card) = self.scene.card_mut(completion.node) else {
                continue;
            };
            if card.avatar_ticket != Some(completion.ticket) {
                continue;
            }
            card.avatar_ticket = None;

            let content = match completion.result {
                Ok(image) => AvatarContent::Image(image),
                Err(err) => {
                    warn!(
                        username = card.username(),
                        url = %completion.url,
                        "avatar unavailable, using placeholder: {err}"
                    );
                    AvatarContent::placeholder_for(card.name())
                }
            };
            card.attach_avatar(content);
            let exiting = card.phase() == CardPhase::Exiting;

            self.request_card_refresh(completion.node);
            if !exiting {
                self.start_entry(completion.node);
            }
        }
    }

    fn finish_task(&mut self, finished: FinishedTask) {
        if finished.kind == TaskKind::Exit {
            self.detach_card(finished.node);
        }
        if let Some(hook) = finished.on_complete {
            hook(finished.node);
        }
    }

    fn detach_card(&mut self, node: NodeId) {
        if let Some(card) = self.scene.card_mut(node) {
            card.detach_listeners();
            if let Some(ticket) = card.avatar_ticket.take() {
                self.avatars.cancel(ticket);
            }
        }
        self.scheduler.cancel_node(node);
        self.scene.destroy_node(node);
        if self.hovered == Some(node) {
            self.hovered = None;
        }
        if self.pressed == Some(node) {
            self.pressed = None;
        }
        trace!(node, "card detached");
        self.request_full_render();
    }

    // --- Rendering ---

    fn request_full_render(&mut self) {
        self.pending.full = true;
    }

    fn request_card_refresh(&mut self, node: NodeId) {
        self.pending.cards.insert(node);
    }

    fn flush(&mut self) {
        if self.disposed {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        if batch.full {
            self.surface.render_all(&self.scene, &self.viewport);
            return;
        }
        for node in batch.cards {
            if let Some(scene_node) = self.scene.get_node(node) {
                self.surface.refresh_cache(node, scene_node);
            }
        }
    }

    fn render_now(&mut self) {
        self.request_full_render();
        self.flush();
    }

    // --- Viewport ---

    /// Sizes the surface to the window minus the host chrome.
    pub fn resize(&mut self) {
        if self.disposed {
            return;
        }
        let size = self.window.inner_size();
        self.width = size.x.max(0.0);
        self.height = (size.y - self.config.chrome_height).max(0.0);
        self.surface.set_dimensions(self.width, self.height);
        debug!(width = self.width, height = self.height, "canvas resized");
        self.render_now();
    }

    /// Zooms about the surface point `(x, y)`, which stays fixed on screen.
    pub fn zoom_to(&mut self, x: f32, y: f32, zoom: f32) {
        let zoom = self.config.clamp_zoom(zoom);
        self.viewport.zoom_to_point(Vec2::new(x, y), zoom);
        debug!(zoom, x, y, "zoom");
        self.render_now();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_to(0.0, 0.0, self.viewport.zoom + self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_to(0.0, 0.0, self.viewport.zoom - self.config.zoom_step);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom_to(0.0, 0.0, 1.0);
    }

    pub fn wheel(&mut self, event: WheelEvent) -> Vec<CanvasAction> {
        let zoom = self.viewport.zoom * self.config.wheel_zoom_base.powf(event.delta_y);
        self.zoom_to(event.position.x, event.position.y, zoom);
        vec![CanvasAction::PreventDefault, CanvasAction::StopPropagation]
    }

    // --- Pointer input ---

    fn pan_held(&self, event: &PointerEvent) -> bool {
        self.config.pan_modifier.is_held(&event.modifiers)
    }

    fn apply_card_response(&mut self, node: NodeId, response: CardResponse, actions: &mut Vec<CanvasAction>) {
        match response {
            CardResponse::Ignored | CardResponse::Released => {}
            CardResponse::Rerender => self.request_full_render(),
            CardResponse::Pressed => self.pressed = Some(node),
            CardResponse::Drag => {
                if let Some(target) = self.last_pointer.map(|p| self.viewport.screen_to_scene(p)) {
                    let spec = AnimationSpec::new(
                        TaskKind::Drag,
                        self.config.animation_ms,
                        EasingType::EaseInOutCubic,
                        Invalidation::CardCache,
                    )
                    .with(Property::Left, target.x)
                    .with(Property::Top, target.y);
                    self.animate(node, spec);
                }
            }
            CardResponse::Navigate(url) => actions.push(CanvasAction::Navigate {
                url,
                target: BrowsingContext::NewTab,
            }),
        }
    }

    pub fn pointer_down(&mut self, event: PointerEvent) -> Vec<CanvasAction> {
        let mut actions = Vec::new();
        if self.disposed {
            return actions;
        }
        let pan_held = self.pan_held(&event);
        self.last_pointer = Some(event.position);

        if pan_held {
            self.panning = true;
            self.selection_enabled = false;
            trace!("pan started");
            return actions;
        }

        let scene_point = self.viewport.screen_to_scene(event.position);
        if let Some(node) = self.scene.hit_test(scene_point) {
            if let Some(card) = self.scene.card_mut(node) {
                let response = card.on_pointer_down(pan_held);
                self.apply_card_response(node, response, &mut actions);
            }
        }
        actions
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> Vec<CanvasAction> {
        let mut actions = Vec::new();
        if self.disposed {
            return actions;
        }
        let previous = self.last_pointer.replace(event.position);

        if self.panning {
            if let Some(previous) = previous {
                self.viewport.pan_by(event.position - previous);
                self.request_full_render();
            }
            return actions;
        }

        let pan_held = self.pan_held(&event);
        let scene_point = self.viewport.screen_to_scene(event.position);
        let target = self.scene.hit_test(scene_point);
        if target != self.hovered {
            if let Some(old) = self.hovered {
                if let Some(card) = self.scene.card_mut(old) {
                    let response = card.on_pointer_out(pan_held);
                    self.apply_card_response(old, response, &mut actions);
                }
            }
            if let Some(new) = target {
                if let Some(card) = self.scene.card_mut(new) {
                    let response = card.on_pointer_over(pan_held);
                    self.apply_card_response(new, response, &mut actions);
                }
            }
            self.hovered = target;
        }

        if let Some(node) = self.pressed {
            let moved = previous.is_some_and(|p| p != event.position);
            if let Some(card) = self.scene.card_mut(node) {
                let response = card.on_pointer_move(moved);
                self.apply_card_response(node, response, &mut actions);
            }
        }
        actions
    }

    /// Ends a pan or a card gesture. With no pressed card the release goes to
    /// the card under the pointer, so a press on empty space released over a
    /// card still navigates.
    pub fn pointer_up(&mut self, event: PointerEvent) -> Vec<CanvasAction> {
        let mut actions = Vec::new();
        if self.disposed {
            return actions;
        }
        self.last_pointer = Some(event.position);

        if self.panning {
            self.panning = false;
            self.selection_enabled = true;
            debug!(translation = ?self.viewport.translation, "pan committed");
            self.render_now();
            return actions;
        }

        let pan_held = self.pan_held(&event);
        let target = self.pressed.take().or_else(|| {
            self.scene
                .hit_test(self.viewport.screen_to_scene(event.position))
        });
        if let Some(node) = target {
            if let Some(card) = self.scene.card_mut(node) {
                let response = card.on_pointer_up(pan_held);
                self.apply_card_response(node, response, &mut actions);
            }
        }
        actions
    }

    // --- Lifecycle ---

    /// Unsubscribes from the window, then disposes the surface and cancels
    /// outstanding avatar loads. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            self.window.unsubscribe_resize(subscription);
        }
        self.surface.dispose();
        self.avatars.cancel_all();
        self.disposed = true;
        debug!("canvas disposed");
    }
}

impl<S: DrawSurface> Drop for RosterCanvas<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadMode;
    use crate::surface::{HeadlessWindow, SvgSurface};
    use crate::types::Modifiers;

    struct NoAvatars;

    impl AvatarLoader for NoAvatars {
        fn load_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("no avatar for {url}")
        }
    }

    fn canvas() -> (RosterCanvas<SvgSurface>, Arc<HeadlessWindow>) {
        let window = Arc::new(HeadlessWindow::new(1280.0, 800.0));
        let config = CanvasConfig {
            load_mode: LoadMode::Inline,
            ..CanvasConfig::default()
        };
        let canvas = RosterCanvas::new(config, SvgSurface::new(), window.clone(), Arc::new(NoAvatars));
        (canvas, window)
    }

    #[test]
    fn new_canvas_sizes_to_window_minus_chrome() {
        let (canvas, window) = canvas();
        assert_eq!(canvas.dimensions(), (1280.0, 750.0));
        assert_eq!(canvas.surface().stats().full_renders, 1);
        assert_eq!(window.listener_count(), 1);
    }

    #[test]
    fn window_resize_is_applied_on_next_frame() {
        let (mut canvas, window) = canvas();
        window.resize_to(640.0, 30.0);
        assert_eq!(canvas.dimensions(), (1280.0, 750.0));
        canvas.advance(16.0);
        assert_eq!(canvas.dimensions(), (640.0, 0.0));
    }

    #[test]
    fn zoom_steps_and_clamps() {
        let (mut canvas, _) = canvas();
        for _ in 0..10 {
            canvas.zoom_in();
        }
        assert_eq!(canvas.zoom(), 4.0);
        for _ in 0..10 {
            canvas.zoom_out();
        }
        assert_eq!(canvas.zoom(), 0.25);
        canvas.reset_zoom();
        assert_eq!(canvas.zoom(), 1.0);
    }

    #[test]
    fn wheel_suppresses_default_and_zooms_at_pointer() {
        let (mut canvas, _) = canvas();
        let actions = canvas.wheel(WheelEvent::new(200.0, 100.0, -500.0));
        assert_eq!(actions, vec![CanvasAction::PreventDefault, CanvasAction::StopPropagation]);
        assert!(canvas.zoom() > 1.0);
        let anchor = canvas.viewport().scene_to_screen(Vec2::new(200.0, 100.0));
        assert!((anchor - Vec2::new(200.0, 100.0)).length() < 1e-3);
    }

    #[test]
    fn pan_moves_translation_and_batches_renders() {
        let (mut canvas, _) = canvas();
        let alt = Modifiers::alt();
        canvas.pointer_down(PointerEvent::new(10.0, 10.0).with_modifiers(alt));
        assert!(canvas.is_panning());
        assert!(!canvas.selection_enabled());

        canvas.pointer_move(PointerEvent::new(20.0, 15.0).with_modifiers(alt));
        canvas.pointer_move(PointerEvent::new(30.0, 25.0).with_modifiers(alt));
        assert_eq!(canvas.viewport().translation, Vec2::new(20.0, 15.0));

        let before = canvas.surface().stats().full_renders;
        canvas.advance(16.0);
        assert_eq!(canvas.surface().stats().full_renders, before + 1);

        canvas.pointer_up(PointerEvent::new(30.0, 25.0));
        assert!(!canvas.is_panning());
        assert!(canvas.selection_enabled());
    }

    #[test]
    fn failed_avatar_still_enters() {
        let (mut canvas, _) = canvas();
        let added = canvas.render_members(&[Member::new("octocat").with_avatar("missing.png")]);
        assert_eq!(added.len(), 1);
        canvas.run_until_idle(16.0, 200);

        let node = canvas.scene().get_node(added[0]).unwrap();
        assert_eq!(node.placement, Placement::new(32.0, 32.0, 1.0));
        let card = canvas.scene().card(added[0]).unwrap();
        assert!(card.avatar().unwrap().content.is_placeholder());
    }

    #[test]
    fn dispose_is_idempotent() {
        let (mut canvas, window) = canvas();
        canvas.dispose();
        canvas.dispose();
        assert!(canvas.surface().is_disposed());
        assert_eq!(window.listener_count(), 0);
        drop(canvas);
        assert_eq!(window.listener_count(), 0);
    }
}
