use eframe::egui;
use std::collections::HashSet;

use super::element::ViewId;
use super::Canvas;
use super::events::ViewEvent;
use crate::model::{ElementId, ElementKind};

/// Ordered, non-owning set of selected Graphics plus their cached view bounds.
#[derive(Clone, Debug, Default)]
pub struct SelectionBox {
    members: Vec<ViewId>,
    bounds: Option<egui::Rect>,
    /// Rubber band in view space while a drag on empty canvas is active.
    band: Option<egui::Rect>,
}

impl SelectionBox {
    pub fn members(&self) -> &[ViewId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.members.contains(&id)
    }

    pub fn bounds(&self) -> Option<egui::Rect> {
        self.bounds
    }

    pub fn band(&self) -> Option<egui::Rect> {
        self.band
    }

    pub(super) fn set_band(&mut self, band: Option<egui::Rect>) {
        self.band = band;
    }

    pub(super) fn set_bounds(&mut self, bounds: Option<egui::Rect>) {
        self.bounds = bounds;
    }

    pub(super) fn replace(&mut self, members: Vec<ViewId>) -> bool {
        if members == self.members {
            return false;
        }
        self.members = members;
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionFilter {
    DataNodes,
    Interactions,
}

impl Canvas {
    pub fn selection(&self) -> &SelectionBox {
        &self.selection
    }

    /// Model elements of the selected Graphics, in selection order.
    pub fn selected_elements(&self) -> Vec<ElementId> {
        self.selection
            .members()
            .iter()
            .filter_map(|v| self.element_of(*v))
            .collect()
    }

    pub fn is_element_selected(&self, element: ElementId) -> bool {
        self.graphics_of(element)
            .and_then(|v| self.arena.get(&v))
            .is_some_and(|e| e.selected)
    }

    /// Graphics a plain click on `hit` selects: handles and citations give
    /// their owner, grouped elements their outermost group.
    pub(super) fn selectable_for(&self, hit: ViewId) -> Option<ViewId> {
        let owner = self.owner_graphics(hit)?;
        let element = self.element_of(owner)?;
        match self.pathway.root_group(element) {
            Some(root) => self.graphics_of(root).or(Some(owner)),
            None => Some(owner),
        }
    }

    /// Graphics directly under `hit`, without resolving groups.
    pub(super) fn owner_graphics(&self, hit: ViewId) -> Option<ViewId> {
        let element = self.arena.get(&hit)?;
        match element.owner() {
            Some(owner) => Some(owner),
            None => Some(hit),
        }
    }

    pub fn select_element(&mut self, element: ElementId) {
        if let Some(v) = self.graphics_of(element) {
            self.set_selection(vec![v]);
        }
    }

    pub fn select_elements(&mut self, elements: &[ElementId]) {
        let ids = elements.iter().filter_map(|e| self.graphics_of(*e)).collect();
        self.set_selection(ids);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Vec::new());
    }

    /// Selects every top-level Graphics; grouped elements come in through
    /// their outermost group.
    pub fn select_all(&mut self) {
        let ids = self.top_level_graphics(|_| true);
        self.set_selection(ids);
    }

    pub fn select_kind(&mut self, filter: SelectionFilter) {
        let ids = self
            .arena
            .values()
            .filter_map(|v| {
                let element = self.pathway.get(v.element()?)?;
                let keep = match (filter, &element.kind) {
                    (SelectionFilter::DataNodes, ElementKind::DataNode { .. }) => true,
                    (SelectionFilter::Interactions, ElementKind::Line { .. }) => true,
                    _ => false,
                };
                keep.then_some(v.id())
            })
            .collect();
        self.set_selection(ids);
    }

    pub(super) fn toggle_selected(&mut self, id: ViewId) {
        let mut members = self.selection.members().to_vec();
        if let Some(pos) = members.iter().position(|m| *m == id) {
            members.remove(pos);
        } else {
            members.push(id);
        }
        self.set_selection(members);
    }

    /// Graphics not reachable through a group, after mapping grouped ones to
    /// their outermost group, filtered by `keep`.
    pub(super) fn top_level_graphics(&self, keep: impl Fn(ViewId) -> bool) -> Vec<ViewId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.graphics_ids() {
            if !keep(id) {
                continue;
            }
            if let Some(sel) = self.selectable_for(id) {
                if seen.insert(sel) {
                    out.push(sel);
                }
            }
        }
        out
    }

    /// Replaces the selection, keeping handles of members that stay selected.
    pub(super) fn set_selection(&mut self, members: Vec<ViewId>) {
        let mut seen = HashSet::new();
        let members: Vec<ViewId> = members
            .into_iter()
            .filter(|m| self.arena.get(m).and_then(|e| e.as_graphics()).is_some() && seen.insert(*m))
            .collect();
        let changed = self.selection.replace(members);
        self.sync_selection_flags();
        if changed {
            let selected = self.selected_elements();
            tracing::debug!(count = selected.len(), "selection changed");
            self.emit(ViewEvent::SelectionChanged(selected));
        }
    }

    /// Brings selected flags and handles in line with the selection box.
    pub(super) fn sync_selection_flags(&mut self) {
        let mut flagged: HashSet<ViewId> = HashSet::new();
        for m in self.selection.members().to_vec() {
            flagged.insert(m);
            let Some(element) = self.element_of(m) else {
                continue;
            };
            let Some(group_id) = self.pathway.get(element).and_then(|e| e.group_id.clone()) else {
                continue;
            };
            for member in self.group_closure(&group_id) {
                if let Some(v) = self.graphics_of(member) {
                    flagged.insert(v);
                }
            }
        }
        let with_handles = match self.selection.members() {
            [single] => Some(*single),
            _ => None,
        };
        for id in self.graphics_ids() {
            let selected = flagged.contains(&id);
            let mut changed = false;
            if let Some(e) = self.arena.get_mut(&id) {
                changed = e.selected != selected;
                e.selected = selected;
            }
            if changed {
                self.mark_dirty(id);
            }
            let has_handles = self
                .arena
                .get(&id)
                .and_then(|e| e.as_graphics())
                .is_some_and(|g| !g.handles.is_empty());
            let wants_handles = with_handles == Some(id);
            if wants_handles && !has_handles {
                self.create_handles(id);
            } else if !wants_handles && has_handles {
                self.destroy_handles(id);
            }
        }
        self.refresh_selection_bounds();
    }

    pub(super) fn refresh_selection_bounds(&mut self) {
        let bounds = self
            .selection
            .members()
            .iter()
            .filter_map(|m| self.view_bounds(*m))
            .reduce(|a, b| a.union(b));
        self.selection.set_bounds(bounds);
    }

    pub(super) fn select_in_band(&mut self, band: egui::Rect, base: Vec<ViewId>) {
        let hits = self.top_level_graphics(|id| {
            self.view_bounds(id).is_some_and(|b| b.intersects(band))
        });
        let mut members = base;
        members.extend(hits);
        self.set_selection(members);
    }
}
