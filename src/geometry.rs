//! Mappings between canvas space and a layer's local coordinate space.
//!
//! A layer is presented by composing translate → rotate → scale, so a local
//! point maps to canvas space as `position + R(angle) * (point * scale)`.
//! Hit-testing inverts that composition: subtract the translation, rotate by
//! the negative angle, then divide by the scale.

use egui::{pos2, vec2, Pos2};

/// Scale factors below this are treated as this value; the presentation
/// contract requires a strictly positive uniform scale.
pub const MIN_SCALE: f32 = 0.01;

/// Transform a canvas-space point into a layer's local, untransformed space.
pub fn canvas_to_local(point: Pos2, position: Pos2, rotation_degrees: f32, scale: f32) -> Pos2 {
    let delta = point - position;
    let angle = -rotation_degrees.to_radians();
    let (sin, cos) = angle.sin_cos();
    let scale = scale.max(MIN_SCALE);
    pos2(
        (delta.x * cos - delta.y * sin) / scale,
        (delta.x * sin + delta.y * cos) / scale,
    )
}

/// Transform a local-space point back into canvas space.
pub fn local_to_canvas(point: Pos2, position: Pos2, rotation_degrees: f32, scale: f32) -> Pos2 {
    let angle = rotation_degrees.to_radians();
    let (sin, cos) = angle.sin_cos();
    let scaled = vec2(point.x * scale, point.y * scale);
    position + vec2(scaled.x * cos - scaled.y * sin, scaled.x * sin + scaled.y * cos)
}

/// Distance from a point to a line segment, used for stroke coverage.
pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return (point - a).length();
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).length()
}

/// Axis-aligned bounds of a point set, as (min, max). `None` when empty.
pub fn point_bounds(points: &[Pos2]) -> Option<(Pos2, Pos2)> {
    let first = *points.first()?;
    let mut min = first;
    let mut max = first;
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn test_identity_transform() {
        let p = pos2(12.0, 34.0);
        assert!(close(canvas_to_local(p, pos2(0.0, 0.0), 0.0, 1.0), p));
    }

    #[test]
    fn test_translation_only() {
        let local = canvas_to_local(pos2(110.0, 220.0), pos2(100.0, 200.0), 0.0, 1.0);
        assert!(close(local, pos2(10.0, 20.0)));
    }

    #[test]
    fn test_rotation_90_degrees() {
        // A layer rotated 90° CW maps local +x onto canvas +y.
        let canvas = local_to_canvas(pos2(10.0, 0.0), pos2(0.0, 0.0), 90.0, 1.0);
        assert!(close(canvas, pos2(0.0, 10.0)));
        let local = canvas_to_local(pos2(0.0, 10.0), pos2(0.0, 0.0), 90.0, 1.0);
        assert!(close(local, pos2(10.0, 0.0)));
    }

    #[test]
    fn test_round_trip_under_combined_transform() {
        let position = pos2(300.0, 150.0);
        let local = pos2(25.0, -40.0);
        let canvas = local_to_canvas(local, position, 37.0, 2.5);
        let back = canvas_to_local(canvas, position, 37.0, 2.5);
        assert!(close(back, local));
    }

    #[test]
    fn test_origin_maps_to_position() {
        let position = pos2(77.0, 88.0);
        let canvas = local_to_canvas(pos2(0.0, 0.0), position, 123.0, 0.5);
        assert!(close(canvas, position));
    }

    #[test]
    fn test_distance_to_segment() {
        let a = pos2(0.0, 0.0);
        let b = pos2(10.0, 0.0);
        assert!((distance_to_segment(pos2(5.0, 3.0), a, b) - 3.0).abs() < 1e-4);
        // Beyond the endpoints the distance is to the nearest endpoint.
        assert!((distance_to_segment(pos2(-4.0, 0.0), a, b) - 4.0).abs() < 1e-4);
        // Degenerate segment behaves as a point.
        assert!((distance_to_segment(pos2(3.0, 4.0), a, a) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_point_bounds() {
        let points = [pos2(1.0, 5.0), pos2(-2.0, 3.0), pos2(4.0, -1.0)];
        let (min, max) = point_bounds(&points).unwrap();
        assert_eq!(min, pos2(-2.0, -1.0));
        assert_eq!(max, pos2(4.0, 5.0));
        assert!(point_bounds(&[]).is_none());
    }
}
