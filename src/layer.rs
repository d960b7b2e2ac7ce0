use std::fmt;
use std::sync::Arc;

use egui::{pos2, Color32, Pos2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::MIN_SCALE;
use crate::loader::{ImageResource, ImageSource};

/// A unique identifier for a layer, stable for the layer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant over the layer content variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Base,
    Image,
    Sticker,
    Text,
    Draw,
}

impl LayerKind {
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Base => "base",
            LayerKind::Image => "image",
            LayerKind::Sticker => "sticker",
            LayerKind::Text => "text",
            LayerKind::Draw => "draw",
        }
    }
}

/// Payload for the image-like kinds (base, image, sticker): the declared
/// draw size plus the source reference the decoded resource is acquired
/// from. Width/height stay 0 until the first load reports intrinsic size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub width: f32,
    pub height: f32,
    pub source: ImageSource,
}

impl ImagePayload {
    pub fn pending(source: ImageSource) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub color: Color32,
    pub stroke: Color32,
    pub align: TextAlign,
}

impl Default for TextPayload {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: String::from("Impact"),
            size: 64.0,
            color: Color32::WHITE,
            stroke: Color32::BLACK,
            align: TextAlign::Left,
        }
    }
}

/// A freehand stroke. Points are stored relative to the layer's position,
/// never in absolute canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPayload {
    pub color: Color32,
    pub width: f32,
    pub points: Vec<Pos2>,
}

/// Kind-specific layer content. Dispatch over this is an exhaustive match;
/// there is no trait-object hierarchy behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerContent {
    Base(ImagePayload),
    Image(ImagePayload),
    Sticker(ImagePayload),
    Text(TextPayload),
    Draw(DrawPayload),
}

impl LayerContent {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerContent::Base(_) => LayerKind::Base,
            LayerContent::Image(_) => LayerKind::Image,
            LayerContent::Sticker(_) => LayerKind::Sticker,
            LayerContent::Text(_) => LayerKind::Text,
            LayerContent::Draw(_) => LayerKind::Draw,
        }
    }

    /// The shared view over the three image-like variants.
    pub fn image_payload(&self) -> Option<&ImagePayload> {
        match self {
            LayerContent::Base(p) | LayerContent::Image(p) | LayerContent::Sticker(p) => Some(p),
            _ => None,
        }
    }

    pub fn image_payload_mut(&mut self) -> Option<&mut ImagePayload> {
        match self {
            LayerContent::Base(p) | LayerContent::Image(p) | LayerContent::Sticker(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_image_like(&self) -> bool {
        self.image_payload().is_some()
    }
}

/// One addressable, transformable visual element in the composition.
///
/// The presentation record (position/scale/rotation/opacity) is shared by
/// every kind; `content` carries the kind-specific payload. The decoded
/// `resource` is transient: it is never serialized and never copied into
/// history snapshots, only reacquired from `content`'s source reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub position: Pos2,
    scale: f32,
    pub rotation: f32,
    opacity: f32,
    pub visible: bool,
    pub locked: bool,
    pub content: LayerContent,
    #[serde(skip)]
    pub resource: Option<Arc<ImageResource>>,
}

impl Layer {
    pub fn new(content: LayerContent, position: Pos2) -> Self {
        Self {
            id: LayerId::new(),
            position,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
            locked: false,
            content,
            resource: None,
        }
    }

    /// The base layer sits at the canvas origin and is locked at creation.
    pub fn base(source: ImageSource) -> Self {
        let mut layer = Self::new(LayerContent::Base(ImagePayload::pending(source)), pos2(0.0, 0.0));
        layer.locked = true;
        layer
    }

    pub fn kind(&self) -> LayerKind {
        self.content.kind()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Uniform scale, kept strictly positive.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = if scale.is_finite() { scale.max(MIN_SCALE) } else { 1.0 };
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Opacity, clamped to [0, 1]. Non-finite input resets to fully opaque.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    }

    /// Clone of this layer with the transient resource stripped, for history
    /// snapshots.
    pub fn detached(&self) -> Self {
        let mut copy = self.clone();
        copy.resource = None;
        copy
    }

    /// A duplicate with a fresh id, offset by `offset`, sharing the decoded
    /// resource so no new load is needed. Lock state is not part of the
    /// copied presentation: the duplicate is always unlocked.
    pub fn duplicate(&self, offset: egui::Vec2) -> Self {
        Self {
            id: LayerId::new(),
            position: self.position + offset,
            scale: self.scale,
            rotation: self.rotation,
            opacity: self.opacity,
            visible: true,
            locked: false,
            content: self.content.clone(),
            resource: self.resource.clone(),
        }
    }
}

// Resource handles are transient and excluded from equality, the same way
// they are excluded from snapshots.
impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.position == other.position
            && self.scale == other.scale
            && self.rotation == other.rotation
            && self.opacity == other.opacity
            && self.visible == other.visible
            && self.locked == other.locked
            && self.content == other.content
    }
}
