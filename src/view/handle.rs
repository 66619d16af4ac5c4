use eframe::egui;

use super::geometry::{normalize_angle, rotate_vec2, snap_angle};
use crate::model::ShapeGeom;

/// Distance of the rotation handle beyond the east edge, in model units.
pub const ROTATION_HANDLE_OFFSET: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Freedom {
    X,
    Y,
    /// Corner moving along the `(w, h)` diagonal.
    Free,
    /// Corner moving along the `(w, -h)` diagonal.
    NegFree,
    Rotation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlePosition {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    Rotate,
    LineStart,
    LineEnd,
}

impl HandlePosition {
    pub const RESIZE: [HandlePosition; 8] = [
        HandlePosition::N,
        HandlePosition::NE,
        HandlePosition::E,
        HandlePosition::SE,
        HandlePosition::S,
        HandlePosition::SW,
        HandlePosition::W,
        HandlePosition::NW,
    ];

    /// Unit direction of a resize handle from the centre, in local axes.
    pub fn sign(self) -> (f32, f32) {
        match self {
            HandlePosition::N => (0.0, -1.0),
            HandlePosition::NE => (1.0, -1.0),
            HandlePosition::E => (1.0, 0.0),
            HandlePosition::SE => (1.0, 1.0),
            HandlePosition::S => (0.0, 1.0),
            HandlePosition::SW => (-1.0, 1.0),
            HandlePosition::W => (-1.0, 0.0),
            HandlePosition::NW => (-1.0, -1.0),
            _ => (0.0, 0.0),
        }
    }

    fn from_sign(sx: f32, sy: f32) -> Option<Self> {
        HandlePosition::RESIZE
            .into_iter()
            .find(|p| p.sign() == (sx, sy))
    }

    pub fn freedom(self) -> Freedom {
        match self {
            HandlePosition::N | HandlePosition::S => Freedom::Y,
            HandlePosition::E | HandlePosition::W => Freedom::X,
            HandlePosition::NW | HandlePosition::SE => Freedom::Free,
            HandlePosition::NE | HandlePosition::SW => Freedom::NegFree,
            HandlePosition::Rotate => Freedom::Rotation,
            HandlePosition::LineStart | HandlePosition::LineEnd => Freedom::Free,
        }
    }

    /// Cursor hint in degrees, clockwise from east.
    pub fn angle(self) -> f32 {
        match self {
            HandlePosition::E => 0.0,
            HandlePosition::SE => 45.0,
            HandlePosition::S => 90.0,
            HandlePosition::SW => 135.0,
            HandlePosition::W => 180.0,
            HandlePosition::NW => 225.0,
            HandlePosition::N => 270.0,
            HandlePosition::NE => 315.0,
            _ => 0.0,
        }
    }

    pub fn is_line_endpoint(self) -> bool {
        matches!(self, HandlePosition::LineStart | HandlePosition::LineEnd)
    }

    pub fn is_corner(self) -> bool {
        matches!(self.freedom(), Freedom::Free | Freedom::NegFree) && !self.is_line_endpoint()
    }

    /// Handle on the other side of the axes that were crossed.
    pub fn mirror(self, flip_x: bool, flip_y: bool) -> Self {
        let (sx, sy) = self.sign();
        let sx = if flip_x { -sx } else { sx };
        let sy = if flip_y { -sy } else { sy };
        HandlePosition::from_sign(sx, sy).unwrap_or(self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdjustOptions {
    /// Corners ignore the aspect ratio.
    pub free_corners: bool,
    /// Rotation snap step in radians.
    pub snap_step: Option<f32>,
}

pub fn handle_location(geom: &ShapeGeom, position: HandlePosition) -> egui::Pos2 {
    match position {
        HandlePosition::Rotate => {
            let local = egui::vec2(geom.width * 0.5 + ROTATION_HANDLE_OFFSET, 0.0);
            geom.center.to_pos2() + rotate_vec2(local, geom.rotation)
        }
        _ => {
            let (sx, sy) = position.sign();
            geom.relative_to_model(sx, sy)
        }
    }
}

/// Moves `position` of `geom` to the model point `target`. Returns the mirror
/// handle when a dimension shrank past zero and flipped.
pub fn adjust_shape(
    geom: &mut ShapeGeom,
    position: HandlePosition,
    target: egui::Pos2,
    opts: AdjustOptions,
) -> Option<HandlePosition> {
    let center = geom.center.to_pos2();
    if position == HandlePosition::Rotate {
        let rel = target - center;
        if rel.length_sq() <= f32::EPSILON {
            return None;
        }
        let mut angle = rel.y.atan2(rel.x);
        if let Some(step) = opts.snap_step {
            angle = snap_angle(angle, step);
        }
        geom.rotation = normalize_angle(angle);
        return None;
    }

    let (sx, sy) = position.sign();
    if sx == 0.0 && sy == 0.0 {
        return None;
    }
    let mut local = rotate_vec2(target - center, -geom.rotation);
    if position.is_corner() && !opts.free_corners {
        let diag = egui::vec2(sx * geom.width, sy * geom.height);
        let len = diag.length();
        if geom.width > f32::EPSILON && geom.height > f32::EPSILON && len > f32::EPSILON {
            let d = diag / len;
            local = d * local.dot(d);
        }
    }

    // Opposite edges stay put; the centre is the midpoint of fixed and moved edge.
    let mut shift = egui::Vec2::ZERO;
    let mut flip_x = false;
    let mut flip_y = false;
    if sx != 0.0 {
        let signed = sx * local.x + geom.width * 0.5;
        shift.x = (local.x - sx * geom.width * 0.5) * 0.5;
        flip_x = signed < 0.0;
        geom.width = signed.abs();
    }
    if sy != 0.0 {
        let signed = sy * local.y + geom.height * 0.5;
        shift.y = (local.y - sy * geom.height * 0.5) * 0.5;
        flip_y = signed < 0.0;
        geom.height = signed.abs();
    }
    let moved = center + rotate_vec2(shift, geom.rotation);
    geom.center.x = moved.x;
    geom.center.y = moved.y;

    (flip_x || flip_y).then(|| position.mirror(flip_x, flip_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> ShapeGeom {
        ShapeGeom::from_left_top(0.0, 0.0, 100.0, 40.0)
    }

    #[test]
    fn east_handle_moves_only_the_east_edge() {
        let mut g = geom();
        let flipped = adjust_shape(&mut g, HandlePosition::E, egui::pos2(150.0, 90.0), AdjustOptions::default());
        assert_eq!(flipped, None);
        assert_eq!(g.left(), 0.0);
        assert_eq!(g.width, 150.0);
        assert_eq!(g.height, 40.0);
        assert_eq!(g.top(), 0.0);
    }

    #[test]
    fn crossing_the_opposite_edge_flips_twice() {
        let mut g = geom();
        let opts = AdjustOptions::default();
        let first = adjust_shape(&mut g, HandlePosition::E, egui::pos2(-50.0, 20.0), opts);
        assert_eq!(first, Some(HandlePosition::W));
        assert_eq!((g.left(), g.width), (-50.0, 50.0));

        let second = adjust_shape(&mut g, HandlePosition::W, egui::pos2(150.0, 20.0), opts);
        assert_eq!(second, Some(HandlePosition::E));
        assert_eq!((g.left(), g.width), (0.0, 150.0));
    }

    #[test]
    fn corner_keeps_aspect_unless_free() {
        let mut g = geom();
        adjust_shape(&mut g, HandlePosition::SE, egui::pos2(200.0, 40.0), AdjustOptions::default());
        assert!((g.width / g.height - 2.5).abs() < 1e-4);
        assert!(g.left().abs() < 1e-3);

        let mut g = geom();
        let opts = AdjustOptions {
            free_corners: true,
            ..AdjustOptions::default()
        };
        adjust_shape(&mut g, HandlePosition::SE, egui::pos2(200.0, 40.0), opts);
        assert_eq!((g.width, g.height), (200.0, 40.0));
    }

    #[test]
    fn corner_crossing_both_axes_mirrors_diagonally() {
        let mut g = geom();
        let opts = AdjustOptions {
            free_corners: true,
            ..AdjustOptions::default()
        };
        let flipped = adjust_shape(&mut g, HandlePosition::SE, egui::pos2(-20.0, -10.0), opts);
        assert_eq!(flipped, Some(HandlePosition::NW));
        assert_eq!((g.width, g.height), (20.0, 10.0));
    }

    #[test]
    fn rotation_follows_the_cursor_and_snaps() {
        let mut g = geom();
        adjust_shape(&mut g, HandlePosition::Rotate, egui::pos2(50.0, 120.0), AdjustOptions::default());
        assert!((g.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-5);

        let opts = AdjustOptions {
            snap_step: Some(15f32.to_radians()),
            ..AdjustOptions::default()
        };
        adjust_shape(&mut g, HandlePosition::Rotate, egui::pos2(150.0, 29.0), opts);
        assert!((g.rotation - 0.0).abs() < 1e-5);
    }

    #[test]
    fn resize_on_a_rotated_shape_uses_local_axes() {
        let mut g = geom();
        g.rotation = std::f32::consts::FRAC_PI_2;
        // East now points down in model space.
        let east = handle_location(&g, HandlePosition::E);
        assert!((east - egui::pos2(50.0, 70.0)).length() < 1e-3);
        adjust_shape(&mut g, HandlePosition::E, egui::pos2(50.0, 90.0), AdjustOptions::default());
        assert!((g.width - 120.0).abs() < 1e-3);
        assert!((g.center.y - 30.0).abs() < 1e-3);
    }

    #[test]
    fn mirror_maps_corners_and_sides() {
        assert_eq!(HandlePosition::NE.mirror(true, false), HandlePosition::NW);
        assert_eq!(HandlePosition::NE.mirror(false, true), HandlePosition::SE);
        assert_eq!(HandlePosition::N.mirror(false, true), HandlePosition::S);
        assert_eq!(HandlePosition::Rotate.mirror(true, true), HandlePosition::Rotate);
    }
}
