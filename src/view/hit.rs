use eframe::egui;

use super::element::{GraphicsKind, ViewId, ViewKind};
use super::geometry::{
    contains_rotated_ellipse, contains_rotated_rect, distance_to_segment, fuzz_square,
    stroke_band_contains,
};
use super::{CITATION_SIZE, Canvas};
use crate::model::{ElementKind, ShapeType};

/// Lines narrower than this still take exact hits on a pixel either side.
const MIN_LINE_HIT: f32 = 1.0;

impl Canvas {
    pub fn view_bounds(&self, id: ViewId) -> Option<egui::Rect> {
        let e = self.arena.get(&id)?;
        match &e.kind {
            ViewKind::Graphics(g) => self
                .pathway
                .element_bounds(g.element)
                .map(|b| self.transform.v_rect(b)),
            ViewKind::Handle(h) => Some(egui::Rect::from_center_size(
                self.transform.v_pos(h.location),
                egui::Vec2::splat(self.settings.handle_size),
            )),
            ViewKind::Citation(c) => Some(egui::Rect::from_center_size(
                self.transform.v_pos(c.location),
                egui::Vec2::splat(CITATION_SIZE),
            )),
        }
    }

    pub fn v_contains(&self, id: ViewId, p: egui::Pos2) -> bool {
        let Some(e) = self.arena.get(&id) else {
            return false;
        };
        let ViewKind::Graphics(g) = &e.kind else {
            return self.view_bounds(id).is_some_and(|b| b.contains(p));
        };
        let Some(model) = self.pathway.get(g.element) else {
            return false;
        };
        let zoom = self.transform.zoom();
        let half_stroke = (model.style.line_thickness * zoom * 0.5).max(MIN_LINE_HIT);
        match &model.kind {
            ElementKind::Line { start, end, .. } => {
                let a = self.transform.v_pos(start.pos());
                let b = self.transform.v_pos(end.pos());
                distance_to_segment(p, a, b) <= half_stroke
            }
            ElementKind::Group { .. } => {
                self.view_bounds(id).is_some_and(|b| b.contains(p))
                    && !self.graphics_ids().into_iter().any(|other| {
                        other != id
                            && self
                                .arena
                                .get(&other)
                                .and_then(|o| o.as_graphics())
                                .is_some_and(|o| o.kind != GraphicsKind::Group)
                            && self.v_contains(other, p)
                    })
            }
            ElementKind::Shape { geom, shape_type } => {
                let rect = self.transform.v_rect(geom.rect());
                if model.style.transparent || *shape_type == ShapeType::None {
                    stroke_band_contains(rect, geom.rotation, shape_type.is_elliptic(), p, half_stroke)
                } else if shape_type.is_elliptic() {
                    contains_rotated_ellipse(rect, geom.rotation, p, 0.0)
                } else {
                    contains_rotated_rect(rect, geom.rotation, p, 0.0)
                }
            }
            ElementKind::DataNode { geom, .. } | ElementKind::Label { geom, .. } => {
                contains_rotated_rect(self.transform.v_rect(geom.rect()), geom.rotation, p, 0.0)
            }
        }
    }

    /// Loose intersection with a view rectangle, used by the fuzzy pick pass.
    pub fn v_intersects(&self, id: ViewId, r: egui::Rect) -> bool {
        let Some(model) = self.element_of(id).and_then(|e| self.pathway.get(e)) else {
            return self.view_bounds(id).is_some_and(|b| b.intersects(r));
        };
        match model.line_points() {
            Some((start, end)) => {
                let a = self.transform.v_pos(start.pos());
                let b = self.transform.v_pos(end.pos());
                distance_to_segment(r.center(), a, b) <= r.width().max(r.height()) * 0.5
            }
            None => self.view_bounds(id).is_some_and(|b| b.intersects(r)),
        }
    }

    fn topmost(&self, ids: impl Iterator<Item = ViewId>) -> Option<ViewId> {
        ids.filter_map(|id| self.arena.get(&id).map(|e| (e.z_order, id)))
            .max()
            .map(|(_, id)| id)
    }

    /// Highest z-order element under `p`: exact shapes first, then anything
    /// touching a `fuzzy_size` square around the point.
    pub fn pick_top_at(&self, p: egui::Pos2) -> Option<ViewId> {
        let ids: Vec<ViewId> = self.arena.keys().copied().collect();
        if let Some(hit) = self.topmost(ids.iter().copied().filter(|id| self.v_contains(*id, p))) {
            tracing::trace!(?hit, "exact pick");
            return Some(hit);
        }
        let fuzz = fuzz_square(p, self.settings.fuzzy_size);
        let hit = self.topmost(ids.into_iter().filter(|id| self.v_intersects(*id, fuzz)));
        tracing::trace!(?hit, "fuzzy pick");
        hit
    }

    /// Every element whose exact shape contains `p`, in arena order.
    pub fn pick_all_at(&self, p: egui::Pos2) -> Vec<ViewId> {
        let ids: Vec<ViewId> = self.arena.keys().copied().collect();
        ids.into_iter()
            .filter(|id| {
                if !self.arena.contains_key(id) {
                    tracing::debug!(?id, "element vanished during pick");
                    return false;
                }
                self.v_contains(*id, p)
            })
            .collect()
    }

    /// Graphics offering link anchors near `p`, highest z-order first.
    pub fn link_providers_at(&self, p: egui::Pos2) -> Vec<ViewId> {
        let radius = self.settings.anchor_hit_radius;
        let mut out: Vec<(i32, ViewId)> = self
            .graphics_ids()
            .into_iter()
            .filter_map(|id| {
                let e = self.arena.get(&id)?;
                let g = e.as_graphics()?;
                if !g.kind.capabilities().link_provider() {
                    return None;
                }
                let bounds = self.view_bounds(id)?;
                bounds.expand(radius).contains(p).then_some((e.z_order, id))
            })
            .collect();
        out.sort_by(|a, b| b.cmp(a));
        out.into_iter().map(|(_, id)| id).collect()
    }
}
