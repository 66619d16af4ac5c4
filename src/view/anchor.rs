use eframe::egui;
use std::collections::HashSet;

use super::Canvas;
use super::element::{AnchorDensity, ViewId};
use crate::model::{ElementId, ElementKind, GraphRef, MIN_SIZE_LA, Pathway, ShapeGeom};

/// Attachment point on a link provider, derived from its current geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkAnchor {
    pub owner: ViewId,
    pub element: ElementId,
    pub rel_x: f32,
    pub rel_y: f32,
    /// Index into the owner's line anchors when the owner is a line.
    pub line_anchor: Option<usize>,
    pub position: egui::Pos2,
}

/// Fractional positions along one side: a single midpoint on short sides,
/// otherwise `n` evenly spaced points.
pub fn anchor_offsets(side_length: f32, n: usize) -> Vec<f32> {
    if side_length < MIN_SIZE_LA || n <= 1 {
        return vec![0.0];
    }
    (0..n)
        .map(|i| -1.0 + 2.0 * (i as f32 + 1.0) / (n as f32 + 1.0))
        .collect()
}

/// `(rel_x, rel_y)` of every anchor on a shape, side by side.
pub fn anchor_fractions(width: f32, height: f32, n: usize) -> Vec<(f32, f32)> {
    let xs = anchor_offsets(width, n);
    let ys = anchor_offsets(height, n);
    let mut out = Vec::with_capacity(2 * (xs.len() + ys.len()));
    out.extend(xs.iter().map(|&fx| (fx, -1.0)));
    out.extend(ys.iter().map(|&fy| (1.0, fy)));
    out.extend(xs.iter().map(|&fx| (fx, 1.0)));
    out.extend(ys.iter().map(|&fy| (-1.0, fy)));
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineEnd {
    Start,
    End,
}

impl LineEnd {
    pub fn is_start(self) -> bool {
        self == LineEnd::Start
    }
}

impl Canvas {
    /// Anchors of a provider, recomputed from the model on every call.
    pub fn anchors_of(&self, provider: ViewId) -> Vec<LinkAnchor> {
        let Some(g) = self.arena.get(&provider).and_then(|e| e.as_graphics()) else {
            return Vec::new();
        };
        let Some(model) = self.pathway.get(g.element) else {
            return Vec::new();
        };
        match g.kind.capabilities().anchor_density {
            AnchorDensity::None => return Vec::new(),
            AnchorDensity::OnLine => {
                let Some((start, end)) = model.line_points() else {
                    return Vec::new();
                };
                return model
                    .line_anchors()
                    .iter()
                    .enumerate()
                    .map(|(i, a)| LinkAnchor {
                        owner: provider,
                        element: g.element,
                        rel_x: 0.0,
                        rel_y: 0.0,
                        line_anchor: Some(i),
                        position: a.location(start, end),
                    })
                    .collect();
            }
            AnchorDensity::PerSide => {}
        }
        let geom = match model.geom() {
            Some(geom) => *geom,
            None => {
                let Some(b) = self.pathway.element_bounds(g.element) else {
                    return Vec::new();
                };
                ShapeGeom::from_left_top(b.min.x, b.min.y, b.width(), b.height())
            }
        };
        anchor_fractions(geom.width, geom.height, self.settings.anchors_per_side())
            .into_iter()
            .map(|(rel_x, rel_y)| LinkAnchor {
                owner: provider,
                element: g.element,
                rel_x,
                rel_y,
                line_anchor: None,
                position: geom.relative_to_model(rel_x, rel_y),
            })
            .collect()
    }

    /// Nearest anchor of `provider` within the hit radius of the view point.
    pub fn anchor_near(&self, provider: ViewId, p: egui::Pos2) -> Option<LinkAnchor> {
        let radius = self.settings.anchor_hit_radius;
        self.anchors_of(provider)
            .into_iter()
            .map(|a| {
                let d = (self.transform.v_pos(a.position) - p).length();
                (d, a)
            })
            .filter(|(d, _)| *d <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, a)| a)
    }

    /// The line itself plus every group enclosing it; these never serve as
    /// link targets for its endpoints.
    fn link_exclusions(&self, line: ElementId) -> HashSet<ElementId> {
        let mut out = HashSet::from([line]);
        let mut current = line;
        for _ in 0..256 {
            match self.pathway.parent_group(current) {
                Some(g) => {
                    out.insert(g);
                    current = g;
                }
                None => break,
            }
        }
        out
    }

    /// Links one end of `line` to the first anchor under the view point `p`.
    /// Without a candidate an existing link survives unless `release` is set,
    /// which is the case when the drag ends.
    pub(super) fn link_line_end(&mut self, line: ElementId, end: LineEnd, p: egui::Pos2, release: bool) {
        let excluded = self.link_exclusions(line);
        let candidate = self
            .link_providers_at(p)
            .into_iter()
            .filter(|v| self.element_of(*v).is_some_and(|e| !excluded.contains(&e)))
            .find_map(|v| self.anchor_near(v, p));

        match candidate {
            Some(anchor) => {
                let Some(graph_id) = self.ensure_graph_id(&anchor) else {
                    return;
                };
                let new_ref = GraphRef {
                    graph_id: graph_id.clone(),
                    rel_x: anchor.rel_x,
                    rel_y: anchor.rel_y,
                };
                let previous = self.set_line_end(line, end, Some(anchor.position), Some(new_ref));
                tracing::debug!(%line, ?end, %graph_id, "line end linked");
                if let Some(old) = previous.filter(|old| old.graph_id != graph_id) {
                    self.release_graph_id(&old.graph_id);
                }
            }
            None if release => {
                let previous = self.set_line_end(line, end, None, None);
                if let Some(old) = previous {
                    tracing::debug!(%line, ?end, graph_id = %old.graph_id, "line end unlinked");
                    self.release_graph_id(&old.graph_id);
                }
            }
            None => {}
        }
    }

    /// Puts a line end back to where it was in `before`, link included.
    pub(super) fn restore_line_end(&mut self, line: ElementId, end: LineEnd, before: &Pathway) {
        let Some(old) = before.get(line).and_then(|e| e.line_points()).map(|(s, e)| {
            if end.is_start() { s.clone() } else { e.clone() }
        }) else {
            return;
        };
        self.set_line_end(line, end, Some(old.pos()), old.graph_ref);
    }

    /// Writes a line end, returning its previous reference.
    fn set_line_end(
        &mut self,
        line: ElementId,
        end: LineEnd,
        position: Option<egui::Pos2>,
        graph_ref: Option<GraphRef>,
    ) -> Option<GraphRef> {
        let current = self.pathway.get(line)?.line_points().map(|(s, e)| {
            if end.is_start() { s.clone() } else { e.clone() }
        })?;
        let unchanged = current.graph_ref == graph_ref
            && position.is_none_or(|p| p == current.pos());
        if unchanged {
            return current.graph_ref;
        }
        self.pathway
            .modify(line, |e| {
                let ElementKind::Line { start, end: stop, .. } = &mut e.kind else {
                    return None;
                };
                let point = if end.is_start() { start } else { stop };
                if let Some(p) = position {
                    point.x = p.x;
                    point.y = p.y;
                }
                std::mem::replace(&mut point.graph_ref, graph_ref)
            })
            .flatten()
    }

    /// Graph id of a link target, minting one when it has none.
    fn ensure_graph_id(&mut self, anchor: &LinkAnchor) -> Option<String> {
        let model = self.pathway.get(anchor.element)?;
        let existing = match anchor.line_anchor {
            Some(i) => model.line_anchors().get(i)?.graph_id.clone(),
            None => model.graph_id.clone(),
        };
        if existing.is_some() {
            return existing;
        }
        let id = self.pathway.unique_graph_id();
        self.pathway.modify(anchor.element, |e| match (anchor.line_anchor, &mut e.kind) {
            (Some(i), ElementKind::Line { anchors, .. }) => {
                if let Some(a) = anchors.get_mut(i) {
                    a.graph_id = Some(id.clone());
                }
            }
            _ => e.graph_id = Some(id.clone()),
        });
        self.minted_graph_ids.insert(id.clone());
        Some(id)
    }

    /// Drops a graph id this canvas minted once nothing refers to it anymore.
    fn release_graph_id(&mut self, graph_id: &str) {
        if !self.minted_graph_ids.contains(graph_id) || self.pathway.is_referenced(graph_id, None) {
            return;
        }
        if let Some(target) = self.pathway.find_by_graph_id(graph_id).map(|e| e.id) {
            self.pathway.modify(target, |e| e.graph_id = None);
        } else if let Some((line, index)) = self.pathway.find_line_anchor(graph_id) {
            self.pathway.modify(line, |e| {
                if let ElementKind::Line { anchors, .. } = &mut e.kind {
                    if let Some(a) = anchors.get_mut(index) {
                        a.graph_id = None;
                    }
                }
            });
        } else {
            return;
        }
        self.minted_graph_ids.remove(graph_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sides_get_one_anchor() {
        assert_eq!(anchor_offsets(10.0, 3), vec![0.0]);
        assert_eq!(anchor_offsets(40.0, 3), vec![-0.5, 0.0, 0.5]);
    }

    #[test]
    fn fractions_cover_all_four_sides() {
        let f = anchor_fractions(100.0, 20.0, 3);
        assert_eq!(f.len(), 3 + 1 + 3 + 1);
        assert!(f.contains(&(1.0, 0.0)));
        assert!(f.contains(&(-0.5, -1.0)));
        assert!(f.iter().all(|(x, y)| x.abs() <= 1.0 && y.abs() <= 1.0));
    }
}
