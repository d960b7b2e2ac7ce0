//! The deterministic render pipeline.
//!
//! `Compositor::render` paints the visible layers bottom to top into an RGBA
//! surface: each layer is reduced to a local-space sampler, the sampler's
//! bounds are pushed through the layer transform to find the affected canvas
//! pixels, and every pixel center is inverse-mapped back into local space
//! and source-over blended with the layer opacity. Output depends only on
//! the store, the canvas size, and whichever resources have finished
//! loading; pending layers are skipped.

pub mod text;

use egui::{pos2, Pos2};
use image::{Rgba, RgbaImage};

use crate::canvas::CanvasSize;
use crate::geometry::{canvas_to_local, distance_to_segment, local_to_canvas, point_bounds};
use crate::layer::{Layer, LayerContent};
use crate::loader::ImageResource;
use crate::store::LayerStore;
use text::{rasterize, FontStore, TextRaster};

/// Collapses any number of repaint requests between two display ticks into
/// one paint. The shell calls `take` once per frame and paints only when it
/// returns true.
#[derive(Debug, Default)]
pub struct RepaintScheduler {
    dirty: bool,
}

impl RepaintScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True at most once per batch of requests.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// What a layer looks like in its own coordinate space.
enum LocalSource<'a> {
    Image {
        resource: &'a ImageResource,
        width: f32,
        height: f32,
    },
    Text(TextRaster),
    Stroke {
        points: &'a [Pos2],
        color: [u8; 4],
        radius: f32,
    },
}

impl LocalSource<'_> {
    /// Local-space bounds as (min, max).
    fn bounds(&self) -> (Pos2, Pos2) {
        match self {
            LocalSource::Image { width, height, .. } => (pos2(0.0, 0.0), pos2(*width, *height)),
            LocalSource::Text(raster) => (
                pos2(raster.offset_x, raster.offset_y),
                pos2(
                    raster.offset_x + raster.width as f32,
                    raster.offset_y + raster.height as f32,
                ),
            ),
            LocalSource::Stroke { points, radius, .. } => {
                // Callers guarantee at least two points.
                let (min, max) = point_bounds(points).expect("stroke bounds");
                let pad = radius + 1.0;
                (
                    pos2(min.x - pad, min.y - pad),
                    pos2(max.x + pad, max.y + pad),
                )
            }
        }
    }

    /// Straight-alpha RGBA at a local point; `None` where the source has no
    /// ink.
    fn sample(&self, local: Pos2) -> Option<[u8; 4]> {
        match self {
            LocalSource::Image {
                resource,
                width,
                height,
            } => {
                if local.x < 0.0 || local.y < 0.0 || local.x >= *width || local.y >= *height {
                    return None;
                }
                let pixels = resource.pixels();
                let px = (local.x / width * resource.width() as f32)
                    .floor()
                    .clamp(0.0, resource.width() as f32 - 1.0) as u32;
                let py = (local.y / height * resource.height() as f32)
                    .floor()
                    .clamp(0.0, resource.height() as f32 - 1.0) as u32;
                let Rgba(rgba) = *pixels.get_pixel(px, py);
                Some(rgba)
            }
            LocalSource::Text(raster) => raster.sample(local.x, local.y),
            LocalSource::Stroke {
                points,
                color,
                radius,
            } => {
                let mut distance = f32::MAX;
                for pair in points.windows(2) {
                    distance = distance.min(distance_to_segment(local, pair[0], pair[1]));
                }
                // Round caps and joins fall out of the distance metric; a
                // half-pixel ramp softens the edge.
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    return None;
                }
                let mut rgba = *color;
                rgba[3] = (rgba[3] as f32 * coverage).round() as u8;
                Some(rgba)
            }
        }
    }
}

/// Paints the layer stack onto an RGBA surface.
#[derive(Debug, Default)]
pub struct Compositor;

impl Compositor {
    pub fn new() -> Self {
        Self
    }

    /// Compose the full stack. Idempotent: no state survives between calls.
    pub fn render(&mut self, store: &LayerStore, fonts: &FontStore, canvas: CanvasSize) -> RgbaImage {
        let mut surface = RgbaImage::new(canvas.width, canvas.height);
        for layer in store.iter() {
            if !layer.visible {
                continue;
            }
            self.paint_layer(&mut surface, layer, fonts);
        }
        surface
    }

    fn paint_layer(&mut self, surface: &mut RgbaImage, layer: &Layer, fonts: &FontStore) {
        let source = match &layer.content {
            LayerContent::Base(p) | LayerContent::Image(p) | LayerContent::Sticker(p) => {
                // Skipped until the asynchronous load resolves.
                let Some(resource) = layer.resource.as_deref() else {
                    return;
                };
                if p.width <= 0.0 || p.height <= 0.0 {
                    return;
                }
                LocalSource::Image {
                    resource,
                    width: p.width,
                    height: p.height,
                }
            }
            LayerContent::Text(p) => {
                let Some(raster) = rasterize(fonts, p) else {
                    return;
                };
                LocalSource::Text(raster)
            }
            LayerContent::Draw(p) => {
                if p.points.len() < 2 {
                    return;
                }
                LocalSource::Stroke {
                    points: &p.points,
                    color: p.color.to_srgba_unmultiplied(),
                    radius: p.width * 0.5,
                }
            }
        };

        let opacity = layer.opacity();
        if opacity <= 0.0 {
            return;
        }

        // Project the local bounds through the layer transform to find the
        // affected destination pixels.
        let (min, max) = source.bounds();
        let corners = [
            pos2(min.x, min.y),
            pos2(max.x, min.y),
            pos2(min.x, max.y),
            pos2(max.x, max.y),
        ];
        let mut dest_min = pos2(f32::MAX, f32::MAX);
        let mut dest_max = pos2(f32::MIN, f32::MIN);
        for corner in corners {
            let mapped = local_to_canvas(corner, layer.position, layer.rotation, layer.scale());
            dest_min.x = dest_min.x.min(mapped.x);
            dest_min.y = dest_min.y.min(mapped.y);
            dest_max.x = dest_max.x.max(mapped.x);
            dest_max.y = dest_max.y.max(mapped.y);
        }

        let x0 = dest_min.x.floor().max(0.0) as u32;
        let y0 = dest_min.y.floor().max(0.0) as u32;
        let x1 = (dest_max.x.ceil().min(surface.width() as f32)) as u32;
        let y1 = (dest_max.y.ceil().min(surface.height() as f32)) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let center = pos2(x as f32 + 0.5, y as f32 + 0.5);
                let local = canvas_to_local(center, layer.position, layer.rotation, layer.scale());
                if let Some(src) = source.sample(local) {
                    blend_over(surface.get_pixel_mut(x, y), src, opacity);
                }
            }
        }
    }
}

/// Source-over blend of a straight-alpha source pixel, modulated by the
/// layer opacity.
fn blend_over(dst: &mut Rgba<u8>, src: [u8; 4], opacity: f32) {
    let src_a = src[3] as f32 / 255.0 * opacity;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let blended =
            (src[c] as f32 * src_a + dst.0[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst.0[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
