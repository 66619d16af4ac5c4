//! Model/view conversion and the pure geometry the canvas hit-tests with.

use eframe::egui;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 8.0;

/// Zoom-only mapping between model units and view pixels. Panning belongs to
/// the host, which offsets view coordinates before handing them in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    zoom: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self { zoom: 1.0 }
    }
}

pub fn clamp_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() || zoom <= 0.0 {
        MIN_ZOOM
    } else {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

impl Transform {
    pub fn new(zoom: f32) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = clamp_zoom(zoom);
    }

    /// `pct` is a percentage, 100 meaning one view pixel per model unit.
    pub fn set_pct_zoom(&mut self, pct: f32) {
        self.set_zoom(pct / 100.0);
    }

    pub fn pct_zoom(&self) -> f32 {
        self.zoom * 100.0
    }

    pub fn v_from_m(&self, m: f32) -> f32 {
        m * self.zoom
    }

    pub fn m_from_v(&self, v: f32) -> f32 {
        v / self.zoom
    }

    pub fn v_pos(&self, m: egui::Pos2) -> egui::Pos2 {
        egui::pos2(self.v_from_m(m.x), self.v_from_m(m.y))
    }

    pub fn m_pos(&self, v: egui::Pos2) -> egui::Pos2 {
        egui::pos2(self.m_from_v(v.x), self.m_from_v(v.y))
    }

    pub fn v_vec(&self, m: egui::Vec2) -> egui::Vec2 {
        m * self.zoom
    }

    pub fn m_vec(&self, v: egui::Vec2) -> egui::Vec2 {
        v / self.zoom
    }

    pub fn v_rect(&self, m: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_max(self.v_pos(m.min), self.v_pos(m.max))
    }
}

pub fn rotate_vec2(v: egui::Vec2, angle: f32) -> egui::Vec2 {
    let sin = angle.sin();
    let cos = angle.cos();
    egui::vec2(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Folds an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let a = angle.rem_euclid(std::f32::consts::TAU);
    if a >= std::f32::consts::TAU { 0.0 } else { a }
}

pub fn snap_angle(angle: f32, step: f32) -> f32 {
    if step <= f32::EPSILON {
        return angle;
    }
    (angle / step).round() * step
}

/// Corners of `rect` rotated about its centre, clockwise from the top left.
pub fn rotated_rect_points(rect: egui::Rect, rotation: f32) -> Vec<egui::Pos2> {
    let center = rect.center();
    [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ]
    .into_iter()
    .map(|p| center + rotate_vec2(p - center, rotation))
    .collect()
}

pub fn rotated_ellipse_points(rect: egui::Rect, rotation: f32) -> Vec<egui::Pos2> {
    let center = rect.center();
    let rx = rect.width() * 0.5;
    let ry = rect.height() * 0.5;
    if rx <= f32::EPSILON || ry <= f32::EPSILON {
        return vec![];
    }
    let steps = 48;
    (0..steps)
        .map(|i| {
            let t = (i as f32) / (steps as f32) * std::f32::consts::TAU;
            center + rotate_vec2(egui::vec2(t.cos() * rx, t.sin() * ry), rotation)
        })
        .collect()
}

/// Outline given as fractions of the half extents, rotated and placed.
pub fn rotated_unit_points(rect: egui::Rect, rotation: f32, unit: &[(f32, f32)]) -> Vec<egui::Pos2> {
    let center = rect.center();
    let half = rect.size() * 0.5;
    unit.iter()
        .map(|&(fx, fy)| center + rotate_vec2(egui::vec2(fx * half.x, fy * half.y), rotation))
        .collect()
}

pub fn contains_rotated_rect(rect: egui::Rect, rotation: f32, p: egui::Pos2, threshold: f32) -> bool {
    let half = rect.size() * 0.5;
    let local = rotate_vec2(p - rect.center(), -rotation);
    local.x.abs() <= half.x + threshold && local.y.abs() <= half.y + threshold
}

pub fn contains_rotated_ellipse(
    rect: egui::Rect,
    rotation: f32,
    p: egui::Pos2,
    threshold: f32,
) -> bool {
    let rx = rect.width() * 0.5 + threshold;
    let ry = rect.height() * 0.5 + threshold;
    if rx <= f32::EPSILON || ry <= f32::EPSILON {
        return false;
    }
    let local = rotate_vec2(p - rect.center(), -rotation);
    let dx = local.x / rx;
    let dy = local.y / ry;
    dx * dx + dy * dy <= 1.0
}

/// True when `p` lies on the outline of a shape drawn with a stroke of
/// `half_width` on either side.
pub fn stroke_band_contains(
    rect: egui::Rect,
    rotation: f32,
    elliptic: bool,
    p: egui::Pos2,
    half_width: f32,
) -> bool {
    let test = |t: f32| {
        if elliptic {
            contains_rotated_ellipse(rect, rotation, p, t)
        } else {
            contains_rotated_rect(rect, rotation, p, t)
        }
    };
    let inner_empty = rect.width() <= 2.0 * half_width || rect.height() <= 2.0 * half_width;
    test(half_width) && (inner_empty || !test(-half_width))
}

pub fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_sq();
    if len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

pub fn fuzz_square(p: egui::Pos2, half: f32) -> egui::Rect {
    egui::Rect::from_center_size(p, egui::Vec2::splat(half * 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zoom_is_clamped() {
        assert_eq!(Transform::new(0.0).zoom(), MIN_ZOOM);
        assert_eq!(Transform::new(-3.0).zoom(), MIN_ZOOM);
        assert_eq!(Transform::new(f32::NAN).zoom(), MIN_ZOOM);
        assert_eq!(Transform::new(100.0).zoom(), MAX_ZOOM);
        let mut t = Transform::default();
        t.set_pct_zoom(150.0);
        assert!((t.zoom() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn rotated_rect_contains_rotated_corner() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 20.0));
        let quarter = std::f32::consts::FRAC_PI_2;
        assert!(contains_rotated_rect(rect, quarter, egui::pos2(50.0, -35.0), 0.5));
        assert!(!contains_rotated_rect(rect, quarter, egui::pos2(95.0, 10.0), 0.5));
    }

    #[test]
    fn stroke_band_excludes_the_interior() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 100.0));
        assert!(stroke_band_contains(rect, 0.0, false, egui::pos2(0.5, 50.0), 2.0));
        assert!(!stroke_band_contains(rect, 0.0, false, egui::pos2(50.0, 50.0), 2.0));
        assert!(!stroke_band_contains(rect, 0.0, true, egui::pos2(50.0, 50.0), 2.0));
    }

    #[test]
    fn angles_fold_into_one_turn() {
        let tau = std::f32::consts::TAU;
        assert!((normalize_angle(-std::f32::consts::FRAC_PI_2) - 3.0 * tau / 4.0).abs() < 1e-5);
        assert!((normalize_angle(tau * 3.0 + 0.5) - 0.5).abs() < 1e-4);
        assert_eq!(normalize_angle(f32::INFINITY), 0.0);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = egui::pos2(0.0, 0.0);
        let b = egui::pos2(10.0, 0.0);
        assert_eq!(distance_to_segment(egui::pos2(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(egui::pos2(13.0, 4.0), a, b), 5.0);
    }

    proptest! {
        #[test]
        fn view_model_round_trip(x in -1.0e6f32..1.0e6, zoom in 0.1f32..8.0) {
            let t = Transform::new(zoom);
            let back = t.v_from_m(t.m_from_v(x));
            prop_assert!((back - x).abs() <= x.abs() * 1e-5 + 1e-4);
        }
    }
}
