//! Point queries against the layer stack.
//!
//! Scans topmost to bottommost visible layer and returns the first match,
//! which mirrors paint order (painted bottom to top, so the topmost paint
//! wins the tie). Every per-kind test runs in the layer's local space after
//! inverting its translate→rotate→scale composition.

use std::collections::{HashMap, VecDeque};

use egui::Pos2;

use crate::geometry::{canvas_to_local, point_bounds};
use crate::layer::{Layer, LayerContent, LayerId};
use crate::render::text::FontStore;
use crate::store::LayerStore;

/// Bounded size of the text-measurement memo. Hit-testing runs on every
/// pointer move; re-measuring text each time is the expensive part.
pub const MEASURE_CACHE_CAPACITY: usize = 100;

/// Thin strokes get at least this much selectable padding around their
/// bounding box.
const MIN_STROKE_PADDING: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MeasureKey {
    layer: LayerId,
    text: String,
    size_bits: u32,
    font: String,
}

/// Hit-test engine with a bounded, oldest-first-evicted measurement cache.
#[derive(Default)]
pub struct HitTester {
    measurements: HashMap<MeasureKey, (f32, f32)>,
    insertion_order: VecDeque<MeasureKey>,
}

impl HitTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// The topmost visible layer under `point`, if any.
    pub fn hit_test(&mut self, store: &LayerStore, fonts: &FontStore, point: Pos2) -> Option<LayerId> {
        for layer in store.iter().rev() {
            if !layer.visible {
                continue;
            }
            if self.hit_layer(layer, fonts, point) {
                return Some(layer.id);
            }
        }
        None
    }

    fn hit_layer(&mut self, layer: &Layer, fonts: &FontStore, point: Pos2) -> bool {
        let local = canvas_to_local(point, layer.position, layer.rotation, layer.scale());
        match &layer.content {
            LayerContent::Base(p) | LayerContent::Image(p) | LayerContent::Sticker(p) => {
                local.x >= 0.0 && local.x <= p.width && local.y >= 0.0 && local.y <= p.height
            }
            LayerContent::Text(p) => {
                let (width, height) = self.measure(layer.id, &p.text, p.size, &p.font, fonts);
                local.x >= 0.0 && local.x <= width && local.y >= 0.0 && local.y <= height
            }
            LayerContent::Draw(p) => {
                let Some((min, max)) = point_bounds(&p.points) else {
                    return false;
                };
                let padding = p.width.max(MIN_STROKE_PADDING);
                local.x >= min.x - padding
                    && local.x <= max.x + padding
                    && local.y >= min.y - padding
                    && local.y <= max.y + padding
            }
        }
    }

    fn measure(&mut self, layer: LayerId, text: &str, size: f32, font: &str, fonts: &FontStore) -> (f32, f32) {
        let key = MeasureKey {
            layer,
            text: text.to_owned(),
            size_bits: size.to_bits(),
            font: font.to_owned(),
        };
        if let Some(hit) = self.measurements.get(&key) {
            return *hit;
        }

        let measured = fonts.measure_line(text, size, font);
        self.measurements.insert(key.clone(), measured);
        self.insertion_order.push_back(key);
        if self.measurements.len() > MEASURE_CACHE_CAPACITY {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.measurements.remove(&oldest);
            }
        }
        measured
    }

    #[cfg(test)]
    fn cached_measurements(&self) -> usize {
        self.measurements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{DrawPayload, ImagePayload, TextPayload};
    use crate::loader::ImageSource;
    use egui::{pos2, Color32};

    fn sticker_at(x: f32, y: f32, w: f32, h: f32) -> Layer {
        Layer::new(
            LayerContent::Sticker(ImagePayload {
                width: w,
                height: h,
                source: ImageSource::Memory(Vec::new()),
            }),
            pos2(x, y),
        )
    }

    fn text_at(x: f32, y: f32, text: &str) -> Layer {
        Layer::new(
            LayerContent::Text(TextPayload {
                text: text.into(),
                ..TextPayload::default()
            }),
            pos2(x, y),
        )
    }

    #[test]
    fn test_topmost_visible_layer_wins() {
        let mut store = LayerStore::new();
        let below = store.add(sticker_at(0.0, 0.0, 100.0, 100.0)).unwrap();
        let above = store.add(sticker_at(0.0, 0.0, 100.0, 100.0)).unwrap();
        let mut tester = HitTester::new();
        let fonts = FontStore::new();

        assert_eq!(tester.hit_test(&store, &fonts, pos2(50.0, 50.0)), Some(above));

        store.get_mut(above).unwrap().visible = false;
        assert_eq!(tester.hit_test(&store, &fonts, pos2(50.0, 50.0)), Some(below));
    }

    #[test]
    fn test_hidden_layers_never_hit() {
        let mut store = LayerStore::new();
        let id = store.add(sticker_at(0.0, 0.0, 100.0, 100.0)).unwrap();
        store.get_mut(id).unwrap().visible = false;
        let mut tester = HitTester::new();
        assert_eq!(tester.hit_test(&store, &FontStore::new(), pos2(50.0, 50.0)), None);
    }

    #[test]
    fn test_miss_outside_image_bounds() {
        let mut store = LayerStore::new();
        store.add(sticker_at(10.0, 10.0, 20.0, 20.0)).unwrap();
        let mut tester = HitTester::new();
        let fonts = FontStore::new();
        assert_eq!(tester.hit_test(&store, &fonts, pos2(31.0, 11.0)), None);
        assert!(tester.hit_test(&store, &fonts, pos2(29.9, 29.9)).is_some());
    }

    #[test]
    fn test_transform_correct_hit_at_local_origin() {
        // A point just inside a layer's local origin hits under any
        // rotation/scale/translation combination.
        for (rotation, scale) in [(0.0, 1.0), (45.0, 1.0), (90.0, 0.5), (200.0, 3.0)] {
            let mut store = LayerStore::new();
            let id = store.add(sticker_at(300.0, 120.0, 50.0, 50.0)).unwrap();
            {
                let layer = store.get_mut(id).unwrap();
                layer.rotation = rotation;
                layer.set_scale(scale);
            }
            let probe = crate::geometry::local_to_canvas(pos2(1.0, 1.0), pos2(300.0, 120.0), rotation, scale);
            let mut tester = HitTester::new();
            assert_eq!(
                tester.hit_test(&store, &FontStore::new(), probe),
                Some(id),
                "rotation {rotation} scale {scale}"
            );
        }
    }

    #[test]
    fn test_text_hit_box_uses_measured_width() {
        let mut store = LayerStore::new();
        store.add(text_at(0.0, 0.0, "HELLO")).unwrap();
        let mut tester = HitTester::new();
        let fonts = FontStore::new();
        // Fallback metrics: 5 chars * 64 * 0.5 = 160 wide, 64 tall.
        assert!(tester.hit_test(&store, &fonts, pos2(159.0, 32.0)).is_some());
        assert_eq!(tester.hit_test(&store, &fonts, pos2(161.0, 32.0)), None);
        assert_eq!(tester.hit_test(&store, &fonts, pos2(10.0, 65.0)), None);
    }

    #[test]
    fn test_stroke_hit_uses_padded_bounds() {
        let mut store = LayerStore::new();
        store
            .add(Layer::new(
                LayerContent::Draw(DrawPayload {
                    color: Color32::RED,
                    width: 2.0,
                    points: vec![pos2(0.0, 0.0), pos2(40.0, 0.0)],
                }),
                pos2(100.0, 100.0),
            ))
            .unwrap();
        let mut tester = HitTester::new();
        let fonts = FontStore::new();
        // Thin stroke still selectable within the 8-unit minimum padding.
        assert!(tester.hit_test(&store, &fonts, pos2(120.0, 107.0)).is_some());
        assert_eq!(tester.hit_test(&store, &fonts, pos2(120.0, 109.0)), None);
    }

    #[test]
    fn test_empty_stroke_never_hits() {
        let mut store = LayerStore::new();
        store
            .add(Layer::new(
                LayerContent::Draw(DrawPayload {
                    color: Color32::RED,
                    width: 8.0,
                    points: Vec::new(),
                }),
                pos2(0.0, 0.0),
            ))
            .unwrap();
        let mut tester = HitTester::new();
        assert_eq!(tester.hit_test(&store, &FontStore::new(), pos2(0.0, 0.0)), None);
    }

    #[test]
    fn test_measurement_cache_is_bounded() {
        let mut tester = HitTester::new();
        let fonts = FontStore::new();
        let layer = LayerId::new();
        for i in 0..MEASURE_CACHE_CAPACITY + 20 {
            tester.measure(layer, &format!("text {i}"), 64.0, "Impact", &fonts);
        }
        assert_eq!(tester.cached_measurements(), MEASURE_CACHE_CAPACITY);
    }
}
