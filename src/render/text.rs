//! Glyph layout and rasterization for text layers.
//!
//! Faces come from the asset manifest and are looked up by family name. When
//! a face has not been registered (or its file failed to load) measurement
//! falls back to a deterministic per-character advance so hit-testing keeps
//! working; rendering skips the layer the same way an unloaded image is
//! skipped.

use std::collections::HashMap;

use ab_glyph::{point, Font, FontArc, GlyphId, InvalidFont, PxScale, ScaleFont};
use log::warn;

use crate::layer::{TextAlign, TextPayload};

/// Advance per character, as a fraction of the font size, when no face is
/// available to measure with.
const FALLBACK_ADVANCE: f32 = 0.5;

/// Registered typefaces, keyed by family name.
#[derive(Default)]
pub struct FontStore {
    faces: HashMap<String, FontArc>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, family: &str, bytes: Vec<u8>) -> Result<(), InvalidFont> {
        let face = FontArc::try_from_vec(bytes)?;
        self.faces.insert(family.to_owned(), face);
        Ok(())
    }

    pub fn face(&self, family: &str) -> Option<&FontArc> {
        self.faces.get(family)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.faces.keys().map(String::as_str)
    }

    /// Measured (width, height) of one line of text at `size` pixels.
    /// Height is the font size, matching the layer's local hit box.
    pub fn measure_line(&self, text: &str, size: f32, family: &str) -> (f32, f32) {
        let Some(font) = self.faces.get(family) else {
            return (text.chars().count() as f32 * size * FALLBACK_ADVANCE, size);
        };
        let scaled = font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut last: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = last {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            last = Some(id);
        }
        (width, size)
    }
}

/// Text rendered into a local-space RGBA buffer. `offset_*` place the buffer
/// relative to the layer's local origin (glyph overshoot and the outline pad
/// push it negative).
pub struct TextRaster {
    pub width: u32,
    pub height: u32,
    pub offset_x: f32,
    pub offset_y: f32,
    data: Vec<u8>,
}

impl TextRaster {
    /// Nearest-pixel sample at a local-space point, straight (unmultiplied)
    /// RGBA. `None` outside the buffer.
    pub fn sample(&self, x: f32, y: f32) -> Option<[u8; 4]> {
        let px = (x - self.offset_x).floor();
        let py = (y - self.offset_y).floor();
        if px < 0.0 || py < 0.0 || px >= self.width as f32 || py >= self.height as f32 {
            return None;
        }
        let index = (py as usize * self.width as usize + px as usize) * 4;
        self.data.get(index..index + 4).map(|c| [c[0], c[1], c[2], c[3]])
    }
}

/// Rasterize a text payload: an outline pass under a fill pass, like the
/// original canvas `strokeText`/`fillText` pair. Outline width is
/// `max(2, size / 10)`. Returns `None` when the face is missing or nothing
/// has ink.
pub fn rasterize(fonts: &FontStore, payload: &TextPayload) -> Option<TextRaster> {
    let Some(font) = fonts.face(&payload.font) else {
        warn!("font family {:?} not registered; text layer left unpainted", payload.font);
        return None;
    };
    if payload.text.is_empty() {
        return None;
    }

    let size = payload.size;
    let scaled = font.as_scaled(PxScale::from(size));
    let ascent = scaled.ascent();
    let (measured_width, _) = fonts.measure_line(&payload.text, size, &payload.font);
    let align_offset = match payload.align {
        TextAlign::Left => 0.0,
        TextAlign::Center => -measured_width * 0.5,
        TextAlign::Right => -measured_width,
    };

    // Lay the line out with the baseline at `ascent`, so the top of the line
    // sits at the layer's local origin.
    let mut glyphs = Vec::new();
    let mut cursor = align_offset;
    let mut last: Option<GlyphId> = None;
    for ch in payload.text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor += scaled.kern(prev, id);
        }
        glyphs.push(id.with_scale_and_position(PxScale::from(size), point(cursor, ascent)));
        cursor += scaled.h_advance(id);
        last = Some(id);
    }

    // Coverage bounds across all outlined glyphs.
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let outlined: Vec<_> = glyphs
        .into_iter()
        .filter_map(|glyph| font.outline_glyph(glyph))
        .collect();
    for og in &outlined {
        let b = og.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlined.is_empty() || min_x >= max_x || min_y >= max_y {
        return None;
    }

    let line_width = (size / 10.0).max(2.0);
    let radius = line_width * 0.5;
    let pad = radius.ceil() + 1.0;
    min_x -= pad;
    min_y -= pad;
    max_x += pad;
    max_y += pad;

    let width = (max_x - min_x).ceil() as u32;
    let height = (max_y - min_y).ceil() as u32;
    let mut coverage = vec![0.0f32; width as usize * height as usize];

    for og in &outlined {
        let b = og.px_bounds();
        let gx = (b.min.x - min_x) as i32;
        let gy = (b.min.y - min_y) as i32;
        og.draw(|x, y, c| {
            let px = gx + x as i32;
            let py = gy + y as i32;
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                let cell = &mut coverage[py as usize * width as usize + px as usize];
                *cell = cell.max(c);
            }
        });
    }

    // Outline pass: maximum coverage over eight offsets at the stroke
    // radius, drawn under the fill.
    let offsets: [(f32, f32); 8] = [
        (radius, 0.0),
        (-radius, 0.0),
        (0.0, radius),
        (0.0, -radius),
        (radius * 0.7071, radius * 0.7071),
        (radius * 0.7071, -radius * 0.7071),
        (-radius * 0.7071, radius * 0.7071),
        (-radius * 0.7071, -radius * 0.7071),
    ];
    let cov_at = |x: i32, y: i32| -> f32 {
        if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
            0.0
        } else {
            coverage[y as usize * width as usize + x as usize]
        }
    };

    let fill = payload.color;
    let stroke = payload.stroke;
    let mut data = vec![0u8; width as usize * height as usize * 4];
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let fill_cov = cov_at(x, y);
            let mut stroke_cov = 0.0f32;
            for (dx, dy) in offsets {
                stroke_cov =
                    stroke_cov.max(cov_at(x + dx.round() as i32, y + dy.round() as i32));
            }
            let alpha = fill_cov + stroke_cov * (1.0 - fill_cov);
            if alpha <= 0.0 {
                continue;
            }
            let blend = |f: u8, s: u8| -> u8 {
                let v = f as f32 * fill_cov + s as f32 * stroke_cov * (1.0 - fill_cov);
                (v / alpha).round().clamp(0.0, 255.0) as u8
            };
            let index = (y as usize * width as usize + x as usize) * 4;
            data[index] = blend(fill.r(), stroke.r());
            data[index + 1] = blend(fill.g(), stroke.g());
            data[index + 2] = blend(fill.b(), stroke.b());
            data[index + 3] = (alpha * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    Some(TextRaster {
        width,
        height,
        offset_x: min_x,
        offset_y: min_y,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_measurement_is_deterministic() {
        let fonts = FontStore::new();
        let (w, h) = fonts.measure_line("HELLO", 64.0, "Impact");
        assert_eq!(w, 5.0 * 64.0 * FALLBACK_ADVANCE);
        assert_eq!(h, 64.0);
        assert_eq!(fonts.measure_line("HELLO", 64.0, "Impact"), (w, h));
    }

    #[test]
    fn test_fallback_scales_with_size_and_length() {
        let fonts = FontStore::new();
        let (short, _) = fonts.measure_line("ab", 10.0, "missing");
        let (long, _) = fonts.measure_line("abcd", 10.0, "missing");
        assert!(long > short);
        let (big, _) = fonts.measure_line("ab", 20.0, "missing");
        assert_eq!(big, short * 2.0);
    }

    #[test]
    fn test_rasterize_without_face_is_none() {
        let fonts = FontStore::new();
        let payload = TextPayload {
            text: "HELLO".into(),
            ..TextPayload::default()
        };
        assert!(rasterize(&fonts, &payload).is_none());
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut fonts = FontStore::new();
        assert!(fonts.register("Broken", vec![0, 1, 2, 3]).is_err());
        assert!(fonts.face("Broken").is_none());
    }

    #[test]
    fn test_raster_sample_bounds() {
        let raster = TextRaster {
            width: 2,
            height: 2,
            offset_x: -1.0,
            offset_y: 0.0,
            data: vec![255; 16],
        };
        assert!(raster.sample(-1.0, 0.0).is_some());
        assert!(raster.sample(0.9, 1.9).is_some());
        assert!(raster.sample(1.5, 0.0).is_none());
        assert!(raster.sample(-2.0, 0.0).is_none());
    }
}
