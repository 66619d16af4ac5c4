use eframe::egui;
use std::collections::{HashMap, HashSet};

use super::Canvas;
use super::undo::UndoKind;
use crate::model::{ElementId, ElementKind, LineAnchor, PathwayElement};

const NEW_LINE_ANCHOR: f32 = 0.4;

#[derive(Clone, Debug, Default)]
pub(crate) struct Clipboard {
    elements: Vec<PathwayElement>,
    /// Pastes since the last copy; each one lands a little further off.
    pastes: u32,
}

impl Clipboard {
    fn bounds(&self) -> Option<egui::Rect> {
        self.elements
            .iter()
            .filter_map(|e| e.own_bounds())
            .reduce(|a, b| a.union(b))
    }
}

/// Moves every point of an element, linked or not.
fn shift_element(e: &mut PathwayElement, delta: egui::Vec2) {
    if let ElementKind::Line { start, end, .. } = &mut e.kind {
        for p in [start, end] {
            p.x += delta.x;
            p.y += delta.y;
        }
    } else {
        e.translate(delta);
    }
}

impl Canvas {
    /// Translates the selection by a model-space delta. Members of selected
    /// groups move once; line points stay on targets that do not move.
    pub(super) fn move_selection(&mut self, delta: egui::Vec2) {
        if delta == egui::Vec2::ZERO {
            return;
        }
        for id in self.moving_elements() {
            self.pathway.modify(id, |e| e.translate(delta));
        }
    }

    pub fn move_by_key(&mut self, delta: egui::Vec2) {
        if self.selection.is_empty() {
            return;
        }
        let before = self.change_start();
        self.move_selection(delta);
        self.process_model_events();
        self.commit_change(UndoKind::Move, before);
    }

    /// Removes the selection. Lines attached to removed elements keep their
    /// coordinates and lose the reference; groups left empty go too.
    pub fn delete_selected(&mut self) {
        let doomed = self.selection_closure();
        if doomed.is_empty() {
            return;
        }
        let before = self.change_start();
        let graph_ids: Vec<String> = doomed
            .iter()
            .filter_map(|e| self.pathway.get(*e))
            .flat_map(|e| e.link_target_ids())
            .collect();
        for gid in &graph_ids {
            self.pathway.unlink_all(gid);
            self.minted_graph_ids.remove(gid);
        }
        for id in &doomed {
            self.pathway.remove(*id);
        }
        self.remove_empty_groups();
        tracing::debug!(count = doomed.len(), "deleted selection");
        self.process_model_events();
        self.clear_selection();
        self.commit_change(UndoKind::Delete, before);
    }

    fn remove_empty_groups(&mut self) {
        loop {
            let empty: Vec<ElementId> = self
                .pathway
                .elements()
                .iter()
                .filter(|e| {
                    e.is_group()
                        && e.group_id
                            .as_deref()
                            .is_none_or(|gid| self.pathway.group_members(gid).is_empty())
                })
                .map(|e| e.id)
                .collect();
            if empty.is_empty() {
                return;
            }
            for id in empty {
                self.pathway.remove(id);
            }
        }
    }

    /// Gives every selected line a new line anchor 40% of the way along.
    pub fn add_line_anchor(&mut self) {
        let lines: Vec<ElementId> = self
            .selected_elements()
            .into_iter()
            .filter(|e| self.pathway.get(*e).is_some_and(|e| e.is_line()))
            .collect();
        if lines.is_empty() {
            return;
        }
        let before = self.change_start();
        for line in lines {
            self.pathway.modify(line, |e| {
                if let ElementKind::Line { anchors, .. } = &mut e.kind {
                    anchors.push(LineAnchor::at(NEW_LINE_ANCHOR));
                }
            });
        }
        self.process_model_events();
        self.commit_change(UndoKind::AddAnchor, before);
    }

    pub fn copy(&mut self) {
        let ids = self.selection_closure();
        if ids.is_empty() {
            return;
        }
        let elements = ids
            .iter()
            .filter_map(|id| self.pathway.get(*id).cloned())
            .collect();
        self.clipboard = Clipboard {
            elements,
            pastes: 0,
        };
    }

    pub fn has_clipboard(&self) -> bool {
        !self.clipboard.elements.is_empty()
    }

    /// Pastes next to the copied elements.
    pub fn paste(&mut self) {
        self.clipboard.pastes += 1;
        let offset = self.settings.paste_offset * self.clipboard.pastes as f32;
        self.paste_with_offset(egui::vec2(offset, offset));
    }

    /// Pastes with the copied elements' top left corner at the view point `p`.
    pub fn paste_at(&mut self, p: egui::Pos2) {
        let Some(bounds) = self.clipboard.bounds() else {
            return;
        };
        let delta = self.transform.m_pos(p) - bounds.min;
        self.paste_with_offset(delta);
    }

    fn paste_with_offset(&mut self, delta: egui::Vec2) {
        if self.clipboard.elements.is_empty() {
            return;
        }
        let before = self.change_start();
        let mut copies = self.clipboard.elements.clone();
        copies.sort_by_key(|e| (e.z_order, e.id));

        let mut graph_ids: HashMap<String, String> = HashMap::new();
        let mut group_ids: HashMap<String, String> = HashMap::new();
        for e in &copies {
            for old in e.link_target_ids() {
                let fresh = self.pathway.unique_graph_id();
                graph_ids.insert(old, fresh);
            }
            if let Some(old) = &e.group_id {
                let fresh = self.pathway.unique_group_id();
                group_ids.insert(old.clone(), fresh);
            }
        }

        let mut z = self.pathway.max_z_order();
        let mut pasted = Vec::new();
        for mut e in copies {
            e.id = ElementId::default();
            e.graph_id = e.graph_id.as_ref().and_then(|g| graph_ids.get(g).cloned());
            e.group_id = e.group_id.as_ref().and_then(|g| group_ids.get(g).cloned());
            e.group_ref = e.group_ref.as_ref().and_then(|g| group_ids.get(g).cloned());
            if let ElementKind::Line {
                start,
                end,
                anchors,
                ..
            } = &mut e.kind
            {
                for p in [start, end] {
                    p.graph_ref = p.graph_ref.take().and_then(|mut r| {
                        r.graph_id = graph_ids.get(&r.graph_id)?.clone();
                        Some(r)
                    });
                }
                for a in anchors {
                    a.graph_id = a.graph_id.as_ref().and_then(|g| graph_ids.get(g).cloned());
                }
            }
            shift_element(&mut e, delta);
            z = z.saturating_add(1);
            e.z_order = z;
            pasted.push(self.pathway.add(e));
        }
        self.process_model_events();

        let pasted_set: HashSet<ElementId> = pasted.iter().copied().collect();
        let graphics = self.top_level_graphics(|v| {
            self.element_of(v).is_some_and(|e| pasted_set.contains(&e))
        });
        self.set_selection(graphics);
        tracing::debug!(count = pasted.len(), "pasted");
        self.commit_change(UndoKind::Paste, before);
    }
}
