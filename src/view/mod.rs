//! The interactive view over a [`Pathway`].
//!
//! [`Canvas`] keeps one Graphics per model element in an arena keyed by
//! [`ViewId`], plus the handles of the selected element and citation
//! markers. Model edits queue [`ModelEvent`]s which `process_model_events`
//! folds back into the arena; input goes through the mouse and keyboard
//! entry points in `interaction.rs`.

use eframe::egui;
use std::collections::{BTreeMap, HashMap, HashSet};

pub mod anchor;
mod actions;
mod doc_ops;
pub mod element;
pub mod events;
pub mod geometry;
mod group;
pub mod handle;
mod hit;
pub mod interaction;
pub mod render;
pub mod selection;
pub mod settings;
pub mod template;
pub mod undo;
mod zorder;

pub use anchor::LinkAnchor;
pub use doc_ops::{Alignment, SizeMode, StackMode};
pub use element::{Capabilities, GraphicsKind, ViewElement, ViewId, ViewKind};
pub use events::{ListenerId, ViewEvent};
pub use geometry::Transform;
pub use handle::{Freedom, HandlePosition};
pub use interaction::{InteractionState, Key, Modifiers, MouseButton, MouseEvent};
pub use render::{DrawShape, Drawable};
pub use selection::{SelectionBox, SelectionFilter};
pub use settings::EngineSettings;
pub use template::Template;
pub use undo::{History, UndoAction, UndoKind, UndoManager};

use crate::model::{ElementId, ModelEvent, Pathway};
use actions::Clipboard;
use element::{Citation, Graphics, Handle};
use events::Listeners;
use interaction::Hover;

/// Rounds of link syncing one call to `process_model_events` may trigger.
const MAX_EVENT_ROUNDS: usize = 16;

const CITATION_SIZE: f32 = 12.0;

pub struct Canvas {
    pathway: Pathway,
    transform: Transform,
    settings: EngineSettings,
    arena: BTreeMap<ViewId, ViewElement>,
    by_element: HashMap<ElementId, ViewId>,
    next_view_id: u64,
    selection: SelectionBox,
    state: InteractionState,
    undo: Box<dyn UndoManager>,
    listeners: Listeners,
    redraw: Option<Box<dyn FnMut(egui::Rect)>>,
    dirty_rect: Option<egui::Rect>,
    template: Option<Template>,
    edit_mode: bool,
    hover: Hover,
    /// Graph ids this canvas assigned to link targets; only these are
    /// cleared again when the last reference goes away.
    minted_graph_ids: HashSet<String>,
    clipboard: Clipboard,
}

impl Canvas {
    pub fn new(pathway: Pathway) -> Self {
        Self::with_undo_manager(pathway, Box::new(History::new()))
    }

    pub fn with_undo_manager(pathway: Pathway, undo: Box<dyn UndoManager>) -> Self {
        let mut canvas = Self {
            pathway,
            transform: Transform::default(),
            settings: EngineSettings::default(),
            arena: BTreeMap::new(),
            by_element: HashMap::new(),
            next_view_id: 0,
            selection: SelectionBox::default(),
            state: InteractionState::Idle,
            undo,
            listeners: Listeners::default(),
            redraw: None,
            dirty_rect: None,
            template: None,
            edit_mode: true,
            hover: Hover::default(),
            minted_graph_ids: HashSet::new(),
            clipboard: Clipboard::default(),
        };
        canvas.sync_all();
        canvas
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn pathway(&self) -> &Pathway {
        &self.pathway
    }

    /// Direct model access for the host. Call `process_model_events` after
    /// editing so the view catches up.
    pub fn pathway_mut(&mut self) -> &mut Pathway {
        &mut self.pathway
    }

    /// Swaps in a whole new model, e.g. after loading or undo.
    pub fn replace_pathway(&mut self, pathway: Pathway) {
        self.pathway = pathway;
        self.sync_all();
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
        self.mark_all_dirty();
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.transform.set_zoom(zoom);
        self.mark_all_dirty();
    }

    pub fn set_pct_zoom(&mut self, pct: f32) {
        self.transform.set_pct_zoom(pct);
        self.mark_all_dirty();
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit: bool) {
        if !edit {
            self.cancel_gesture();
            self.template = None;
        }
        self.edit_mode = edit;
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&ViewEvent) + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub(super) fn emit(&mut self, event: ViewEvent) {
        self.listeners.emit(&event);
    }

    pub fn set_redraw_callback(&mut self, callback: impl FnMut(egui::Rect) + 'static) {
        self.redraw = Some(Box::new(callback));
    }

    /// Hands the area changed since the last call to the redraw callback.
    pub fn redraw_dirty_rect(&mut self) -> Option<egui::Rect> {
        let rect = self.dirty_rect.take()?;
        for e in self.arena.values_mut() {
            e.dirty = false;
        }
        if let Some(cb) = self.redraw.as_mut() {
            cb(rect);
        }
        Some(rect)
    }

    pub fn view_element(&self, id: ViewId) -> Option<&ViewElement> {
        self.arena.get(&id)
    }

    pub fn graphics_of(&self, element: ElementId) -> Option<ViewId> {
        self.by_element.get(&element).copied()
    }

    pub fn element_of(&self, view: ViewId) -> Option<ElementId> {
        self.arena.get(&view).and_then(|e| e.element())
    }

    pub fn handles_of(&self, element: ElementId) -> Vec<ViewId> {
        self.graphics_of(element)
            .and_then(|v| self.arena.get(&v))
            .and_then(|e| e.as_graphics())
            .map(|g| g.handles.clone())
            .unwrap_or_default()
    }

    pub fn handle_at_position(&self, element: ElementId, position: HandlePosition) -> Option<ViewId> {
        self.handles_of(element).into_iter().find(|h| {
            self.arena
                .get(h)
                .and_then(|e| e.as_handle())
                .is_some_and(|h| h.position == position)
        })
    }

    /// Snapshot of the Graphics ids, safe to iterate while the arena changes.
    pub(super) fn graphics_ids(&self) -> Vec<ViewId> {
        self.arena
            .values()
            .filter(|e| e.as_graphics().is_some())
            .map(|e| e.id())
            .collect()
    }

    fn alloc_view_id(&mut self) -> ViewId {
        self.next_view_id += 1;
        ViewId(self.next_view_id)
    }

    pub(super) fn mark_dirty(&mut self, id: ViewId) {
        let grow = self.settings.handle_size;
        let bounds = self.view_bounds(id).map(|b| b.expand(grow));
        let Some(e) = self.arena.get_mut(&id) else {
            return;
        };
        e.dirty = true;
        let area = match (e.last_bounds, bounds) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        e.last_bounds = bounds;
        if let Some(area) = area {
            self.add_dirty_rect(area);
        }
    }

    pub(super) fn add_dirty_rect(&mut self, rect: egui::Rect) {
        self.dirty_rect = Some(match self.dirty_rect {
            Some(d) => d.union(rect),
            None => rect,
        });
    }

    fn mark_all_dirty(&mut self) {
        for id in self.arena.keys().copied().collect::<Vec<_>>() {
            self.mark_dirty(id);
        }
    }

    fn add_graphics(&mut self, element: ElementId) -> Option<ViewId> {
        if let Some(existing) = self.graphics_of(element) {
            return Some(existing);
        }
        let model = self.pathway.get(element)?;
        let kind = GraphicsKind::of(&model.kind);
        let z = model.z_order;
        let id = self.alloc_view_id();
        let graphics = Graphics {
            element,
            kind,
            handles: Vec::new(),
            children: Vec::new(),
        };
        self.arena
            .insert(id, ViewElement::new(id, z, ViewKind::Graphics(graphics)));
        self.by_element.insert(element, id);
        self.sync_citation(id);
        self.mark_dirty(id);
        Some(id)
    }

    fn remove_graphics(&mut self, id: ViewId) {
        self.mark_dirty(id);
        let Some(e) = self.arena.remove(&id) else {
            return;
        };
        if let ViewKind::Graphics(g) = e.kind {
            self.by_element.remove(&g.element);
            for child in g.handles.iter().chain(g.children.iter()) {
                self.arena.remove(child);
            }
            self.hover.forget(g.element);
        }
        if self.selection.contains(id) {
            let members = self
                .selection
                .members()
                .iter()
                .copied()
                .filter(|m| *m != id)
                .collect();
            self.set_selection(members);
        }
    }

    pub(super) fn create_handles(&mut self, owner: ViewId) {
        let Some(kind) = self.arena.get(&owner).and_then(|e| e.as_graphics()).map(|g| g.kind) else {
            return;
        };
        let mut ids = Vec::new();
        for position in kind.handle_positions() {
            let id = self.alloc_view_id();
            let handle = Handle {
                owner,
                position,
                freedom: position.freedom(),
                angle: position.angle(),
                location: egui::Pos2::ZERO,
            };
            self.arena.insert(
                id,
                ViewElement::new(id, element::ZORDER_HANDLE, ViewKind::Handle(handle)),
            );
            ids.push(id);
        }
        if let Some(ViewKind::Graphics(g)) = self.arena.get_mut(&owner).map(|e| &mut e.kind) {
            g.handles = ids;
        }
        self.refresh_handles(owner);
    }

    pub(super) fn destroy_handles(&mut self, owner: ViewId) {
        let handles = match self.arena.get_mut(&owner).map(|e| &mut e.kind) {
            Some(ViewKind::Graphics(g)) => std::mem::take(&mut g.handles),
            _ => return,
        };
        for h in handles {
            self.mark_dirty(h);
            self.arena.remove(&h);
        }
    }

    /// Recomputes handle locations from the owner's model geometry.
    pub(super) fn refresh_handles(&mut self, owner: ViewId) {
        let Some(element) = self.element_of(owner) else {
            return;
        };
        let handles = self.handles_of(element);
        for h in handles {
            let Some(position) = self.arena.get(&h).and_then(|e| e.as_handle()).map(|h| h.position) else {
                continue;
            };
            let Some(location) = self.model_handle_location(element, position) else {
                continue;
            };
            if let Some(ViewKind::Handle(handle)) = self.arena.get_mut(&h).map(|e| &mut e.kind) {
                handle.location = location;
            }
            self.mark_dirty(h);
        }
    }

    fn model_handle_location(&self, element: ElementId, position: HandlePosition) -> Option<egui::Pos2> {
        let model = self.pathway.get(element)?;
        match position {
            HandlePosition::LineStart => model.line_points().map(|(s, _)| s.pos()),
            HandlePosition::LineEnd => model.line_points().map(|(_, e)| e.pos()),
            _ => model.geom().map(|g| handle::handle_location(g, position)),
        }
    }

    /// Keeps one citation marker on elements that carry citations.
    fn sync_citation(&mut self, owner: ViewId) {
        let Some(element) = self.element_of(owner) else {
            return;
        };
        let count = self.pathway.get(element).map(|e| e.citations.len()).unwrap_or(0);
        let location = self
            .pathway
            .element_bounds(element)
            .map(|b| b.right_top())
            .unwrap_or(egui::Pos2::ZERO);
        let z = self.arena.get(&owner).map(|e| e.z_order).unwrap_or(0);
        let existing = self
            .arena
            .get(&owner)
            .and_then(|e| e.as_graphics())
            .and_then(|g| g.children.first().copied());
        match (existing, count) {
            (Some(child), 0) => {
                self.mark_dirty(child);
                self.arena.remove(&child);
                if let Some(ViewKind::Graphics(g)) = self.arena.get_mut(&owner).map(|e| &mut e.kind) {
                    g.children.clear();
                }
            }
            (Some(child), n) => {
                if let Some(e) = self.arena.get_mut(&child) {
                    e.z_order = z;
                    if let ViewKind::Citation(c) = &mut e.kind {
                        c.number = n;
                        c.location = location;
                    }
                }
                self.mark_dirty(child);
            }
            (None, 0) => {}
            (None, n) => {
                let id = self.alloc_view_id();
                let citation = Citation {
                    owner,
                    number: n,
                    location,
                };
                self.arena
                    .insert(id, ViewElement::new(id, z, ViewKind::Citation(citation)));
                if let Some(ViewKind::Graphics(g)) = self.arena.get_mut(&owner).map(|e| &mut e.kind) {
                    g.children.push(id);
                }
                self.mark_dirty(id);
            }
        }
    }

    fn refresh_graphics(&mut self, id: ViewId) {
        let Some(element) = self.element_of(id) else {
            return;
        };
        let Some((z, kind)) = self
            .pathway
            .get(element)
            .map(|e| (e.z_order, GraphicsKind::of(&e.kind)))
        else {
            return;
        };
        let mut kind_changed = false;
        if let Some(e) = self.arena.get_mut(&id) {
            e.z_order = z;
            if let ViewKind::Graphics(g) = &mut e.kind {
                kind_changed = g.kind != kind;
                g.kind = kind;
            }
        }
        if kind_changed && !self.handles_of(element).is_empty() {
            self.destroy_handles(id);
            self.create_handles(id);
        }
        self.refresh_handles(id);
        self.sync_citation(id);
        self.mark_dirty(id);
    }

    /// Folds queued model changes into the arena. Geometry changes of link
    /// targets move the linked line points, which queues further changes, so
    /// this runs until the queue is empty.
    pub fn process_model_events(&mut self) {
        for round in 0..MAX_EVENT_ROUNDS {
            let events = self.pathway.take_events();
            if events.is_empty() {
                break;
            }
            if round + 1 == MAX_EVENT_ROUNDS {
                tracing::debug!(pending = events.len(), "model event rounds exhausted");
            }
            let mut touched: Vec<ElementId> = Vec::new();
            for event in events {
                match event {
                    ModelEvent::Added(element) => {
                        if self.pathway.contains(element) {
                            self.add_graphics(element);
                            self.emit(ViewEvent::ElementAdded(element));
                            touched.push(element);
                        }
                    }
                    ModelEvent::Removed(element) => {
                        if let Some(v) = self.graphics_of(element) {
                            self.remove_graphics(v);
                        }
                    }
                    ModelEvent::Modified(element) => match self.graphics_of(element) {
                        Some(v) if self.pathway.contains(element) => {
                            self.refresh_graphics(v);
                            touched.push(element);
                        }
                        _ => tracing::debug!(%element, "change for element without graphics"),
                    },
                }
            }
            self.sync_links_of(&touched);
        }
        self.refresh_selection_bounds();
    }

    /// Moves line points attached to the touched elements, their line
    /// anchors, or any group enclosing them.
    fn sync_links_of(&mut self, touched: &[ElementId]) {
        let mut graph_ids: Vec<String> = Vec::new();
        let mut groups: HashSet<ElementId> = HashSet::new();
        for element in touched {
            let mut current = Some(*element);
            let mut depth = 0;
            while let (Some(id), true) = (current, depth < 256) {
                let ids = self.pathway.get(id).map(|e| e.link_target_ids()).unwrap_or_default();
                for gid in ids {
                    if !graph_ids.contains(&gid) {
                        graph_ids.push(gid);
                    }
                }
                current = self.pathway.parent_group(id);
                if let Some(g) = current {
                    groups.insert(g);
                }
                depth += 1;
            }
        }
        for gid in graph_ids {
            self.pathway.sync_links_to(&gid);
        }
        for g in groups {
            if let Some(v) = self.graphics_of(g) {
                self.mark_dirty(v);
            }
        }
    }

    fn sync_all(&mut self) {
        self.pathway.take_events();
        let live: HashSet<ElementId> = self.pathway.elements().iter().map(|e| e.id).collect();
        let stale: Vec<ViewId> = self
            .by_element
            .iter()
            .filter(|(e, _)| !live.contains(e))
            .map(|(_, v)| *v)
            .collect();
        for v in stale {
            self.remove_graphics(v);
        }
        let ids: Vec<ElementId> = self.pathway.elements().iter().map(|e| e.id).collect();
        for element in ids {
            match self.graphics_of(element) {
                Some(v) => self.refresh_graphics(v),
                None => {
                    self.add_graphics(element);
                }
            }
        }
        self.sync_selection_flags();
    }
}
