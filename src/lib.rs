#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod assets;
pub mod canvas;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod history;
pub mod hit_test;
pub mod input;
pub mod interaction;
pub mod layer;
pub mod loader;
pub mod render;
pub mod store;

pub use app::StudioApp;
pub use assets::AssetManifest;
pub use canvas::{AspectRatio, CanvasSize};
pub use editor::EditorContext;
pub use error::{EditorError, LoadError};
pub use history::{History, Snapshot};
pub use hit_test::HitTester;
pub use input::{InputEvent, KeyAction};
pub use interaction::{SessionState, Tool};
pub use layer::{Layer, LayerContent, LayerId, LayerKind};
pub use loader::{DecodingLoader, ImageLoader, ImageResource, ImageSource};
pub use render::text::FontStore;
pub use render::{Compositor, RepaintScheduler};
pub use store::LayerStore;
