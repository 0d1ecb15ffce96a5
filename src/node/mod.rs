//! # Nodes
//!
//! Concrete renderables. `MemberCard` composes the others.

pub mod card;
pub mod image;
pub mod shape;
pub mod text;

pub use card::{CardPhase, CardResponse, MemberCard};
pub use image::{AvatarContent, AvatarImage, ImageNode};
pub use shape::{ShapeNode, ShapeType};
pub use text::TextNode;
