use eframe::egui;

use super::Canvas;
use super::undo::UndoKind;
use crate::model::{ElementId, Pathway};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    CenterX,
    Right,
    Top,
    CenterY,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeMode {
    Width,
    Height,
    Both,
}

/// Direction in which `stack_selected` lines units up edge to edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackMode {
    /// Left to right, centred on the first unit's horizontal axis.
    Horizontal,
    /// Top to bottom, centred on the first unit's vertical axis.
    Vertical,
}

impl Canvas {
    /// Selected units with their model bounds. A selected group counts once.
    fn layout_units(&self) -> Vec<(ElementId, egui::Rect)> {
        self.selected_elements()
            .into_iter()
            .filter_map(|id| self.pathway.element_bounds(id).map(|b| (id, b)))
            .collect()
    }

    /// Moves a unit; a group moves all of its leaves.
    fn translate_unit(&mut self, unit: ElementId, delta: egui::Vec2) {
        if delta == egui::Vec2::ZERO {
            return;
        }
        let targets = match self.pathway.get(unit) {
            Some(e) if e.is_group() => self.leaf_members(unit),
            Some(_) => vec![unit],
            None => return,
        };
        for id in targets {
            self.pathway.modify(id, |e| e.translate(delta));
        }
    }

    fn finish_layout(&mut self, before: Pathway) {
        self.process_model_events();
        self.commit_change(UndoKind::Layout, before);
    }

    /// Lines the selected units up against the union of their bounds.
    pub fn align_selected(&mut self, mode: Alignment) {
        let items = self.layout_units();
        if items.len() < 2 {
            return;
        }
        let overall = items
            .iter()
            .map(|(_, r)| *r)
            .reduce(|a, b| a.union(b))
            .unwrap_or(egui::Rect::NOTHING);

        let before = self.change_start();
        for (id, b) in items {
            let delta = match mode {
                Alignment::Left => egui::vec2(overall.min.x - b.min.x, 0.0),
                Alignment::CenterX => egui::vec2(overall.center().x - b.center().x, 0.0),
                Alignment::Right => egui::vec2(overall.max.x - b.max.x, 0.0),
                Alignment::Top => egui::vec2(0.0, overall.min.y - b.min.y),
                Alignment::CenterY => egui::vec2(0.0, overall.center().y - b.center().y),
                Alignment::Bottom => egui::vec2(0.0, overall.max.y - b.max.y),
            };
            self.translate_unit(id, delta);
        }
        tracing::debug!(?mode, "aligned selection");
        self.finish_layout(before);
    }

    /// Gives every sizable selected element the largest width and/or height
    /// among them. Centres stay put.
    pub fn set_common_size(&mut self, mode: SizeMode) {
        let sizable: Vec<(ElementId, egui::Vec2)> = self
            .moving_elements()
            .into_iter()
            .filter_map(|id| {
                let g = self.pathway.get(id)?.geom()?;
                Some((id, egui::vec2(g.width.abs(), g.height.abs())))
            })
            .collect();
        if sizable.len() < 2 {
            return;
        }
        let max_w = sizable.iter().map(|(_, s)| s.x).fold(0.0, f32::max);
        let max_h = sizable.iter().map(|(_, s)| s.y).fold(0.0, f32::max);
        let (set_w, set_h) = match mode {
            SizeMode::Width => (true, false),
            SizeMode::Height => (false, true),
            SizeMode::Both => (true, true),
        };

        let before = self.change_start();
        for (id, size) in sizable {
            if (!set_w || size.x == max_w) && (!set_h || size.y == max_h) {
                continue;
            }
            self.pathway.modify(id, |e| {
                if let Some(g) = e.geom_mut() {
                    if set_w {
                        g.width = max_w;
                    }
                    if set_h {
                        g.height = max_h;
                    }
                }
            });
        }
        tracing::debug!(?mode, "common size applied");
        self.finish_layout(before);
    }

    /// Sorts the selected units along the stacking axis and abuts each one
    /// to its predecessor, centred on it across the axis.
    pub fn stack_selected(&mut self, mode: StackMode) {
        let mut items = self.layout_units();
        if items.len() < 2 {
            return;
        }
        match mode {
            StackMode::Horizontal => items.sort_by(|a, b| a.1.min.x.total_cmp(&b.1.min.x)),
            StackMode::Vertical => items.sort_by(|a, b| a.1.min.y.total_cmp(&b.1.min.y)),
        }

        let before = self.change_start();
        for pair in items.windows(2) {
            let (prev_id, cur_id) = (pair[0].0, pair[1].0);
            let (Some(prev), Some(cur)) = (
                self.pathway.element_bounds(prev_id),
                self.pathway.element_bounds(cur_id),
            ) else {
                continue;
            };
            let delta = match mode {
                StackMode::Horizontal => egui::vec2(
                    prev.max.x - cur.min.x,
                    prev.center().y - cur.center().y,
                ),
                StackMode::Vertical => egui::vec2(
                    prev.center().x - cur.center().x,
                    prev.max.y - cur.min.y,
                ),
            };
            self.translate_unit(cur_id, delta);
        }
        tracing::debug!(?mode, count = items.len(), "stacked selection");
        self.finish_layout(before);
    }
}
