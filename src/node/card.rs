//! # Member Card
//!
//! The visual and interactive unit representing one member.
//!
//! ## Responsibilities
//! - **Composition**: owns its container, labels and (once loaded) avatar.
//! - **Interaction**: hover/press/drag/click state machine. Handlers return a
//!   `CardResponse` describing what the canvas must do (render, animate,
//!   navigate); the card never touches the scene or scheduler itself.
//! - **Snapshot**: standalone SVG and rasterised data URL of the card.
//!
//! Placement (left, top, opacity) lives on the owning `SceneNode`.

use crate::element::{Color, Element};
use crate::errors::ExportError;
use crate::geometry::Rect;
use crate::member::Member;
use crate::node::image::{AvatarContent, ImageNode};
use crate::node::shape::ShapeNode;
use crate::node::text::TextNode;
use crate::systems::avatar::LoadTicket;
use crate::systems::raster::{to_data_url, RasterOptions, Rasterizer};
use std::fmt::Write as _;

pub const CARD_WIDTH: f32 = 240.0;
pub const CARD_HEIGHT: f32 = 100.0;
pub const CARD_CORNER_RADIUS: f32 = 4.0;
pub const AVATAR_SIZE: f32 = 72.0;
/// Horizontal distance a card travels while entering or leaving.
pub const ENTRY_OFFSET: f32 = 32.0;

const LABEL_LEFT: f32 = 100.0;
const LABEL_SPACING: f32 = 12.0;
const CARD_FILL: Color = Color::rgba(0x84, 0xa3, 0x8c, 0x60);
const HOVER_STROKE: Color = Color::rgb(0x84, 0xa3, 0x8c);
const HOVER_STROKE_WIDTH: f32 = 2.0;

/// Lifecycle of a card on the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardPhase {
    /// Waiting for the avatar; invisible but already hit-testable.
    Loading,
    Live,
    /// Running its exit animation; detached when it completes.
    Exiting,
}

/// What the canvas must do after a card handled an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardResponse {
    Ignored,
    /// The card's appearance changed; re-render the scene.
    Rerender,
    /// The pointer went down on the card.
    Pressed,
    /// The card is being dragged; animate it toward the pointer.
    Drag,
    /// A drag gesture ended.
    Released,
    /// A click completed; open `url` in a new browsing context.
    Navigate(String),
}

#[derive(Debug, Clone)]
pub struct MemberCard {
    username: String,
    name: String,
    url: String,
    container: ShapeNode,
    name_label: TextNode,
    username_label: TextNode,
    avatar: Option<ImageNode>,
    mousedown: bool,
    dragged: bool,
    hovered: bool,
    phase: CardPhase,
    interactive: bool,
    pub(crate) avatar_ticket: Option<LoadTicket>,
}

impl MemberCard {
    /// Builds the container and labels synchronously. The avatar is attached
    /// later via `attach_avatar`.
    pub fn new(member: &Member) -> Self {
        let container = ShapeNode::rect(CARD_WIDTH, CARD_HEIGHT, CARD_CORNER_RADIUS)
            .with_fill(CARD_FILL);
        let middle = CARD_HEIGHT / 2.0;

        Self {
            username: member.username.clone(),
            name: member.name.clone(),
            url: member.url.clone(),
            container,
            name_label: TextNode::new(member.name.clone(), LABEL_LEFT, middle - LABEL_SPACING),
            username_label: TextNode::new(
                format!("@{}", member.username),
                LABEL_LEFT,
                middle + LABEL_SPACING,
            ),
            avatar: None,
            mousedown: false,
            dragged: false,
            hovered: false,
            phase: CardPhase::Loading,
            interactive: true,
            avatar_ticket: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn container(&self) -> &ShapeNode {
        &self.container
    }

    pub fn name_label(&self) -> &TextNode {
        &self.name_label
    }

    pub fn username_label(&self) -> &TextNode {
        &self.username_label
    }

    pub fn avatar(&self) -> Option<&ImageNode> {
        self.avatar.as_ref()
    }

    pub fn phase(&self) -> CardPhase {
        self.phase
    }

    pub fn is_mousedown(&self) -> bool {
        self.mousedown
    }

    pub fn is_dragged(&self) -> bool {
        self.dragged
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Whether the card still has its event listeners attached.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Places the avatar inside the container: square, vertically centred with
    /// the same padding on the left. Replaces any earlier avatar.
    pub fn attach_avatar(&mut self, content: AvatarContent) {
        let padding = (self.container.local_bounds().height() - AVATAR_SIZE) / 2.0;
        self.avatar = Some(ImageNode::new(content, padding, padding, AVATAR_SIZE));
        if self.phase == CardPhase::Loading {
            self.phase = CardPhase::Live;
        }
    }

    pub(crate) fn begin_exit(&mut self) {
        self.phase = CardPhase::Exiting;
    }

    /// Undoes `begin_exit` for a card that is wanted again.
    pub(crate) fn revive(&mut self) {
        self.phase = if self.avatar.is_some() {
            CardPhase::Live
        } else {
            CardPhase::Loading
        };
        self.interactive = true;
    }

    pub(crate) fn detach_listeners(&mut self) {
        self.interactive = false;
        self.mousedown = false;
        self.dragged = false;
        self.hovered = false;
    }

    /// Pointer entered the card.
    pub fn on_pointer_over(&mut self, pan_held: bool) -> CardResponse {
        if pan_held {
            return CardResponse::Ignored;
        }
        self.hovered = true;
        self.container.set_stroke(HOVER_STROKE, HOVER_STROKE_WIDTH);
        CardResponse::Rerender
    }

    /// Pointer left the card.
    pub fn on_pointer_out(&mut self, pan_held: bool) -> CardResponse {
        if pan_held {
            return CardResponse::Ignored;
        }
        self.hovered = false;
        self.container.clear_stroke();
        CardResponse::Rerender
    }

    pub fn on_pointer_down(&mut self, pan_held: bool) -> CardResponse {
        if pan_held {
            return CardResponse::Ignored;
        }
        self.mousedown = true;
        CardResponse::Pressed
    }

    /// `moved` is false for a move event with zero displacement.
    pub fn on_pointer_move(&mut self, moved: bool) -> CardResponse {
        // mousedown is never set while panning, so no modifier check here
        if !self.mousedown || !moved {
            return CardResponse::Ignored;
        }
        self.dragged = true;
        CardResponse::Drag
    }

    pub fn on_pointer_up(&mut self, pan_held: bool) -> CardResponse {
        if self.dragged {
            self.mousedown = false;
            self.dragged = false;
            return CardResponse::Released;
        }

        self.mousedown = false;
        if pan_held {
            return CardResponse::Ignored;
        }
        CardResponse::Navigate(self.url.clone())
    }

    /// Standalone SVG document of the card at the given opacity, including
    /// the hover border when present.
    pub fn to_svg_document(&self, opacity: f32) -> String {
        let bleed = if self.container.has_stroke() {
            self.container.stroke_width / 2.0
        } else {
            0.0
        };
        let bounds = self.local_bounds().outset(bleed);

        let mut out = String::new();
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{}" height="{}" viewBox="{} {} {} {}"><g opacity="{:.3}">"#,
            bounds.width(),
            bounds.height(),
            bounds.left(),
            bounds.top(),
            bounds.width(),
            bounds.height(),
            opacity.clamp(0.0, 1.0)
        );
        self.write_svg(&mut out);
        out.push_str("</g></svg>");
        out
    }

    /// Rasterises the card and returns it as a `data:` URL.
    pub fn to_data_url(
        &self,
        opacity: f32,
        rasterizer: &Rasterizer,
        options: &RasterOptions,
    ) -> Result<String, ExportError> {
        let bytes = rasterizer.render(&self.to_svg_document(opacity), options)?;
        Ok(to_data_url(options.format.mime_type(), &bytes))
    }
}

impl Element for MemberCard {
    fn local_bounds(&self) -> Rect {
        self.container.local_bounds()
    }

    fn write_svg(&self, out: &mut String) {
        self.container.write_svg(out);
        self.name_label.write_svg(out);
        self.username_label.write_svg(out);
        if let Some(avatar) = &self.avatar {
            avatar.write_svg(out);
        }
    }
}
