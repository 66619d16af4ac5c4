use eframe::egui;
use std::collections::HashMap;

use pathcanvas::model::{LineStyle, LineType, Style};
use pathcanvas::view::{DrawShape, Drawable, Freedom};

/// Paints one drawable; `offset` moves view space onto the screen.
pub type PaintFn = fn(&egui::Painter, &Drawable, egui::Vec2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKey {
    Polygon,
    Polyline,
    Line,
    Bounds,
    Handle,
    Citation,
    SelectionBand,
}

impl ShapeKey {
    pub fn of(shape: &DrawShape) -> Self {
        match shape {
            DrawShape::Polygon(_) => ShapeKey::Polygon,
            DrawShape::Polyline(_) => ShapeKey::Polyline,
            DrawShape::Line { .. } => ShapeKey::Line,
            DrawShape::Bounds(_) => ShapeKey::Bounds,
            DrawShape::Handle { .. } => ShapeKey::Handle,
            DrawShape::Citation { .. } => ShapeKey::Citation,
            DrawShape::SelectionBand(_) => ShapeKey::SelectionBand,
        }
    }
}

/// Painter per kind of draw shape, handed to the host when it is built.
pub struct PainterTable {
    painters: HashMap<ShapeKey, PaintFn>,
}

impl PainterTable {
    pub fn empty() -> Self {
        Self {
            painters: HashMap::new(),
        }
    }

    pub fn with(mut self, key: ShapeKey, paint: PaintFn) -> Self {
        self.painters.insert(key, paint);
        self
    }

    pub fn paint(&self, painter: &egui::Painter, drawable: &Drawable, offset: egui::Vec2) {
        let key = ShapeKey::of(&drawable.shape);
        match self.painters.get(&key) {
            Some(paint) => paint(painter, drawable, offset),
            None => tracing::debug!(?key, "no painter registered"),
        }
    }
}

impl Default for PainterTable {
    fn default() -> Self {
        Self::empty()
            .with(ShapeKey::Polygon, paint_polygon)
            .with(ShapeKey::Polyline, paint_polyline)
            .with(ShapeKey::Line, paint_line)
            .with(ShapeKey::Bounds, paint_bounds)
            .with(ShapeKey::Handle, paint_handle)
            .with(ShapeKey::Citation, paint_citation)
            .with(ShapeKey::SelectionBand, paint_band)
    }
}

fn selection_color() -> egui::Color32 {
    egui::Color32::from_rgb(80, 160, 255)
}

fn stroke_of(style: &Style, selected: bool) -> egui::Stroke {
    let color = if selected {
        selection_color()
    } else {
        style.line_color.to_color32()
    };
    egui::Stroke::new(style.line_thickness.max(1.0), color)
}

fn draw_label(painter: &egui::Painter, d: &Drawable, center: egui::Pos2) {
    let Some(text) = d.label.as_deref().filter(|t| !t.is_empty()) else {
        return;
    };
    painter.text(
        center,
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(d.style.font_size.max(1.0)),
        d.style.line_color.to_color32(),
    );
}

fn paint_polygon(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::Polygon(points) = &d.shape else {
        return;
    };
    if points.len() < 3 {
        return;
    }
    let pts: Vec<egui::Pos2> = points.iter().map(|p| *p + offset).collect();
    let stroke = stroke_of(&d.style, d.selected);
    if d.style.transparent {
        painter.add(egui::Shape::closed_line(pts.clone(), stroke));
    } else {
        painter.add(egui::Shape::convex_polygon(
            pts.clone(),
            d.style.fill_color.to_color32(),
            stroke,
        ));
    }
    let center = egui::Rect::from_points(&pts).center();
    draw_label(painter, d, center);
}

fn paint_polyline(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::Polyline(points) = &d.shape else {
        return;
    };
    let pts: Vec<egui::Pos2> = points.iter().map(|p| *p + offset).collect();
    painter.add(egui::Shape::line(pts, stroke_of(&d.style, d.selected)));
}

fn paint_line(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::Line {
        from,
        to,
        end_type,
        anchors,
    } = &d.shape
    else {
        return;
    };
    let (a, b) = (*from + offset, *to + offset);
    let stroke = stroke_of(&d.style, d.selected);
    match d.style.line_style {
        LineStyle::Solid => {
            painter.line_segment([a, b], stroke);
        }
        LineStyle::Dashed => draw_dashed_line(painter, a, b, stroke, 10.0, 5.0),
        LineStyle::Double => {
            let v = b - a;
            if v.length_sq() > f32::EPSILON {
                let perp = egui::vec2(-v.y, v.x).normalized() * stroke.width.max(1.5);
                painter.line_segment([a + perp, b + perp], stroke);
                painter.line_segment([a - perp, b - perp], stroke);
            }
        }
    }
    match end_type {
        LineType::Line => {}
        LineType::Arrow => draw_arrowhead(painter, a, b, stroke),
        LineType::TBar => draw_tbar(painter, a, b, stroke),
        LineType::Receptor => draw_receptor(painter, a, b, stroke),
    }
    for anchor in anchors {
        let r = egui::Rect::from_center_size(*anchor + offset, egui::Vec2::splat(6.0));
        painter.rect_filled(r, 0.0, stroke.color);
    }
}

fn paint_bounds(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::Bounds(rect) = &d.shape else {
        return;
    };
    if !d.selected {
        return;
    }
    let r = rect.translate(offset);
    let stroke = egui::Stroke::new(1.0, selection_color());
    for side in [
        [r.left_top(), r.right_top()],
        [r.right_top(), r.right_bottom()],
        [r.right_bottom(), r.left_bottom()],
        [r.left_bottom(), r.left_top()],
    ] {
        draw_dashed_line(painter, side[0], side[1], stroke, 4.0, 4.0);
    }
}

fn paint_handle(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::Handle { rect, freedom } = &d.shape else {
        return;
    };
    let r = rect.translate(offset);
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgb(30, 30, 30));
    match freedom {
        Freedom::Rotation => {
            painter.circle(r.center(), r.width() * 0.5, egui::Color32::LIGHT_GREEN, stroke);
        }
        _ => {
            painter.rect_filled(r, 0.0, egui::Color32::from_rgb(255, 220, 80));
            painter.rect_stroke(r, 0.0, stroke, egui::StrokeKind::Middle);
        }
    }
}

fn paint_citation(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::Citation { center, number } = &d.shape else {
        return;
    };
    painter.text(
        *center + offset,
        egui::Align2::CENTER_CENTER,
        number.to_string(),
        egui::FontId::proportional(10.0),
        egui::Color32::from_rgb(120, 60, 180),
    );
}

fn paint_band(painter: &egui::Painter, d: &Drawable, offset: egui::Vec2) {
    let DrawShape::SelectionBand(rect) = &d.shape else {
        return;
    };
    let r = rect.translate(offset);
    painter.rect_filled(r, 0.0, selection_color().gamma_multiply(0.15));
    painter.rect_stroke(
        r,
        0.0,
        egui::Stroke::new(1.0, selection_color()),
        egui::StrokeKind::Middle,
    );
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let v = b - a;
    let len = v.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = v / len;
    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let next = (pos + if drawing { dash_len } else { gap_len }).min(len);
        if drawing {
            painter.line_segment([a + dir * pos, a + dir * next], stroke);
        }
        pos = next;
        drawing = !drawing;
    }
}

fn draw_arrowhead(painter: &egui::Painter, a: egui::Pos2, b: egui::Pos2, stroke: egui::Stroke) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let size = 10.0;
    let perp = egui::vec2(-dir.y, dir.x);
    let base = b - dir * size;
    painter.add(egui::Shape::convex_polygon(
        vec![b, base + perp * (size * 0.6), base - perp * (size * 0.6)],
        stroke.color,
        egui::Stroke::NONE,
    ));
}

fn draw_tbar(painter: &egui::Painter, a: egui::Pos2, b: egui::Pos2, stroke: egui::Stroke) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let perp = egui::vec2(-dir.y, dir.x) * 8.0;
    painter.line_segment([b + perp, b - perp], stroke);
}

fn draw_receptor(painter: &egui::Painter, a: egui::Pos2, b: egui::Pos2, stroke: egui::Stroke) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let perp = egui::vec2(-dir.y, dir.x) * 8.0;
    let back = dir * 6.0;
    painter.add(egui::Shape::line(
        vec![b - back + perp, b + perp, b - perp, b - back - perp],
        stroke,
    ));
}
