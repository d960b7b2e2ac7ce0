use serde::{Deserialize, Serialize};

/// Output pixel dimensions of the composition surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        AspectRatio::default().canvas_size()
    }
}

/// The aspect-ratio presets offered by the composer.
///
/// Selecting a preset resizes the canvas; loading a base image overrides the
/// preset size with the image's intrinsic dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Square,
    Portrait,
    Landscape,
}

impl AspectRatio {
    pub fn canvas_size(&self) -> CanvasSize {
        match self {
            AspectRatio::Square => CanvasSize::new(1080, 1080),
            AspectRatio::Portrait => CanvasSize::new(1080, 1920),
            AspectRatio::Landscape => CanvasSize::new(1920, 1080),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_sizes() {
        assert_eq!(AspectRatio::Square.canvas_size(), CanvasSize::new(1080, 1080));
        assert_eq!(AspectRatio::Portrait.canvas_size(), CanvasSize::new(1080, 1920));
        assert_eq!(AspectRatio::Landscape.canvas_size(), CanvasSize::new(1920, 1080));
    }
}
