//! Backend-neutral draw list.
//!
//! The canvas never paints; [`Canvas::draw_list`] hands the renderer a
//! z-sorted list of [`Drawable`]s in view space and the renderer decides how
//! each [`DrawShape`] looks.

use eframe::egui;

use super::Canvas;
use super::element::{ViewId, ViewKind, ZORDER_SELECTION_BOX};
use super::geometry::{rotated_ellipse_points, rotated_rect_points, rotated_unit_points};
use super::handle::Freedom;
use crate::model::{ElementId, ElementKind, LineType, PathwayElement, ShapeType, Style};

const TRIANGLE: [(f32, f32); 3] = [(-1.0, -1.0), (1.0, 0.0), (-1.0, 1.0)];
const HEXAGON: [(f32, f32); 6] = [
    (-1.0, 0.0),
    (-0.5, -1.0),
    (0.5, -1.0),
    (1.0, 0.0),
    (0.5, 1.0),
    (-0.5, 1.0),
];
const BRACE: [(f32, f32); 7] = [
    (-1.0, 1.0),
    (-0.9, 0.0),
    (-0.1, 0.0),
    (0.0, -1.0),
    (0.1, 0.0),
    (0.9, 0.0),
    (1.0, 1.0),
];

#[derive(Clone, Debug, PartialEq)]
pub enum DrawShape {
    /// Closed outline, filled unless the style is transparent.
    Polygon(Vec<egui::Pos2>),
    Polyline(Vec<egui::Pos2>),
    Line {
        from: egui::Pos2,
        to: egui::Pos2,
        end_type: LineType,
        /// Line anchors other lines can attach to.
        anchors: Vec<egui::Pos2>,
    },
    /// Outline of an element without a shape of its own, such as a group.
    Bounds(egui::Rect),
    Handle {
        rect: egui::Rect,
        freedom: Freedom,
    },
    Citation {
        center: egui::Pos2,
        number: usize,
    },
    SelectionBand(egui::Rect),
}

#[derive(Clone, Debug)]
pub struct Drawable {
    /// Arena id; `None` for the selection overlay.
    pub id: Option<ViewId>,
    pub element: Option<ElementId>,
    pub z: i32,
    pub shape: DrawShape,
    /// Style scaled to view units.
    pub style: Style,
    pub selected: bool,
    pub label: Option<String>,
}

/// Paint order among items sharing a z-order.
fn layer_rank(kind: &ViewKind) -> u8 {
    match kind {
        ViewKind::Graphics(_) => 0,
        ViewKind::Citation(_) => 1,
        ViewKind::Handle(_) => 2,
    }
}

fn outline(shape_type: ShapeType, rect: egui::Rect, rotation: f32) -> DrawShape {
    match shape_type {
        ShapeType::Rectangle | ShapeType::RoundedRectangle => {
            DrawShape::Polygon(rotated_rect_points(rect, rotation))
        }
        ShapeType::Oval => DrawShape::Polygon(rotated_ellipse_points(rect, rotation)),
        ShapeType::Arc => {
            let mut points = rotated_ellipse_points(rect, rotation);
            points.truncate(points.len() / 2 + 1);
            DrawShape::Polyline(points)
        }
        ShapeType::Triangle => DrawShape::Polygon(rotated_unit_points(rect, rotation, &TRIANGLE)),
        ShapeType::Hexagon => DrawShape::Polygon(rotated_unit_points(rect, rotation, &HEXAGON)),
        ShapeType::Brace => DrawShape::Polyline(rotated_unit_points(rect, rotation, &BRACE)),
        ShapeType::None => DrawShape::Bounds(rect),
    }
}

impl Canvas {
    fn scaled_style(&self, style: &Style) -> Style {
        let zoom = self.transform.zoom();
        Style {
            line_thickness: style.line_thickness * zoom,
            font_size: style.font_size * zoom,
            ..*style
        }
    }

    fn graphics_shape(&self, model: &PathwayElement) -> Option<(DrawShape, Option<String>)> {
        let t = &self.transform;
        let drawn = match &model.kind {
            ElementKind::DataNode { geom, label, .. } => (
                DrawShape::Polygon(rotated_rect_points(t.v_rect(geom.rect()), geom.rotation)),
                Some(label.clone()),
            ),
            ElementKind::Label { geom, text, .. } => (
                DrawShape::Polygon(rotated_rect_points(t.v_rect(geom.rect()), geom.rotation)),
                Some(text.clone()),
            ),
            ElementKind::Shape { geom, shape_type } => {
                (outline(*shape_type, t.v_rect(geom.rect()), geom.rotation), None)
            }
            ElementKind::Line {
                start,
                end,
                end_type,
                anchors,
            } => (
                DrawShape::Line {
                    from: t.v_pos(start.pos()),
                    to: t.v_pos(end.pos()),
                    end_type: *end_type,
                    anchors: anchors.iter().map(|a| t.v_pos(a.location(start, end))).collect(),
                },
                None,
            ),
            ElementKind::Group { .. } => {
                let bounds = self.pathway.element_bounds(model.id)?;
                (DrawShape::Bounds(t.v_rect(bounds)), None)
            }
        };
        Some(drawn)
    }

    fn drawable(&self, id: ViewId) -> Option<Drawable> {
        let e = self.arena.get(&id)?;
        let (element, shape, style, label) = match &e.kind {
            ViewKind::Graphics(g) => {
                let model = self.pathway.get(g.element)?;
                let (shape, label) = self.graphics_shape(model)?;
                (Some(g.element), shape, self.scaled_style(&model.style), label)
            }
            ViewKind::Handle(h) => (
                self.element_of(h.owner),
                DrawShape::Handle {
                    rect: self.view_bounds(id)?,
                    freedom: h.freedom,
                },
                Style::default(),
                None,
            ),
            ViewKind::Citation(c) => (
                self.element_of(c.owner),
                DrawShape::Citation {
                    center: self.transform.v_pos(c.location),
                    number: c.number,
                },
                Style::default(),
                Some(c.number.to_string()),
            ),
        };
        Some(Drawable {
            id: Some(id),
            element,
            z: e.z_order,
            shape,
            style,
            selected: e.selected,
            label,
        })
    }

    /// Everything to paint, back to front, in view space.
    pub fn draw_list(&self) -> Vec<Drawable> {
        let mut ids: Vec<ViewId> = self.arena.keys().copied().collect();
        ids.sort_by_key(|id| {
            let e = &self.arena[id];
            (e.z_order, layer_rank(&e.kind), *id)
        });
        let mut out = Vec::with_capacity(ids.len() + 1);
        for id in ids {
            match self.drawable(id) {
                Some(d) => out.push(d),
                None => tracing::debug!(?id, "skipping view element without geometry"),
            }
        }
        if let Some(band) = self.selection.band() {
            out.push(Drawable {
                id: None,
                element: None,
                z: ZORDER_SELECTION_BOX,
                shape: DrawShape::SelectionBand(band),
                style: Style::default(),
                selected: false,
                label: None,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pathway, ShapeGeom};

    #[test]
    fn draw_list_is_back_to_front() {
        let mut pathway = Pathway::new();
        pathway.add(
            PathwayElement::shape(ShapeType::Oval, ShapeGeom::from_left_top(0.0, 0.0, 10.0, 10.0))
                .with_z_order(5),
        );
        pathway.add(
            PathwayElement::shape(
                ShapeType::Rectangle,
                ShapeGeom::from_left_top(0.0, 0.0, 10.0, 10.0),
            )
            .with_z_order(1),
        );
        let canvas = Canvas::new(pathway);
        let list = canvas.draw_list();
        assert_eq!(list.len(), 2);
        assert!(list[0].z <= list[1].z);
        assert!(matches!(&list[0].shape, DrawShape::Polygon(p) if p.len() == 4));
    }

    #[test]
    fn styles_scale_with_zoom() {
        let mut pathway = Pathway::new();
        let id = pathway.add(PathwayElement::shape(
            ShapeType::Rectangle,
            ShapeGeom::from_left_top(0.0, 0.0, 10.0, 10.0),
        ));
        let mut canvas = Canvas::new(pathway);
        canvas.set_zoom(2.0);
        let d = canvas
            .draw_list()
            .into_iter()
            .find(|d| d.element == Some(id))
            .unwrap();
        assert_eq!(d.style.line_thickness, 2.0);
        match d.shape {
            DrawShape::Polygon(points) => {
                assert!((points[2].x - 20.0).abs() < 1e-4);
                assert!((points[2].y - 20.0).abs() < 1e-4);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
