use eframe::egui;
use std::time::{Duration, Instant};

use super::Canvas;
use super::anchor::LineEnd;
use super::element::ViewId;
use super::events::ViewEvent;
use super::handle::{AdjustOptions, Freedom, HandlePosition, adjust_shape};
use super::template::Template;
use super::undo::UndoKind;
use crate::model::{ElementId, ElementKind, Pathway};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    /// Shift, ctrl or meta: click toggles instead of replacing the selection.
    pub fn multi_select(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn from_egui(m: egui::Modifiers) -> Self {
        Self {
            shift: m.shift,
            ctrl: m.ctrl,
            alt: m.alt,
            meta: m.mac_cmd,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Mouse input in view coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    pub pos: egui::Pos2,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub click_count: u32,
    pub time: Instant,
}

impl MouseEvent {
    pub fn new(pos: egui::Pos2) -> Self {
        Self {
            pos,
            button: MouseButton::Primary,
            modifiers: Modifiers::NONE,
            click_count: 1,
            time: Instant::now(),
        }
    }

    pub fn at(x: f32, y: f32) -> Self {
        Self::new(egui::pos2(x, y))
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_click_count(mut self, count: u32) -> Self {
        self.click_count = count;
        self
    }

    pub fn with_time(mut self, time: Instant) -> Self {
        self.time = time;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Delete,
    Backspace,
    Escape,
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragTarget {
    Handle(ViewId),
    Selection,
}

#[derive(Clone, Debug)]
pub struct Gesture {
    pub target: DragTarget,
    pub press: egui::Pos2,
    last: egui::Pos2,
    max_distance: f32,
    before: Pathway,
    kind: UndoKind,
    pressed_element: Option<ElementId>,
    /// Element a multi-selection collapses to when the press ends without a drag.
    collapse_to: Option<ViewId>,
    placed: Vec<ElementId>,
    default_size: bool,
}

impl Gesture {
    pub fn kind(&self) -> UndoKind {
        self.kind
    }
}

#[derive(Clone, Debug, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Selecting {
        origin: egui::Pos2,
        current: egui::Pos2,
        base: Vec<ViewId>,
    },
    Dragging(Gesture),
    PlacingNew(Gesture),
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Selecting { .. } => "selecting",
            InteractionState::Dragging(_) => "dragging",
            InteractionState::PlacingNew(_) => "placing",
        }
    }
}

#[derive(Clone, Debug)]
struct HoverTimer {
    element: ElementId,
    since: Instant,
    fired: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Hover {
    inside: Vec<ElementId>,
    top: Option<HoverTimer>,
}

impl Hover {
    pub fn forget(&mut self, element: ElementId) {
        self.inside.retain(|e| *e != element);
        if self.top.as_ref().is_some_and(|t| t.element == element) {
            self.top = None;
        }
    }
}

impl Canvas {
    pub fn mouse_down(&mut self, ev: MouseEvent) {
        if !self.state.is_idle() {
            tracing::debug!(state = self.state.name(), "mouse down ignored");
            return;
        }
        if ev.button != MouseButton::Primary {
            return;
        }
        if !self.edit_mode {
            self.view_mode_press(&ev);
            return;
        }
        if let Some(template) = self.template.take() {
            self.start_placement(template, &ev);
            return;
        }

        let multi = ev.modifiers.multi_select();
        let Some(hit) = self.pick_top_at(ev.pos) else {
            let base = if multi {
                self.selection.members().to_vec()
            } else {
                self.clear_selection();
                Vec::new()
            };
            self.state = InteractionState::Selecting {
                origin: ev.pos,
                current: ev.pos,
                base,
            };
            tracing::debug!("rubber band started");
            return;
        };

        let mut collapse_to = None;
        let target = if self.arena.get(&hit).and_then(|e| e.as_handle()).is_some() {
            DragTarget::Handle(hit)
        } else {
            if multi {
                if let Some(actual) = self.owner_graphics(hit) {
                    self.toggle_selected(actual);
                }
            } else if let Some(unit) = self.selectable_for(hit) {
                if !self.selection.contains(unit) {
                    self.set_selection(vec![unit]);
                } else if self.selection.len() > 1 {
                    collapse_to = Some(unit);
                }
            }
            DragTarget::Selection
        };

        let pressed_element = self.owner_graphics(hit).and_then(|v| self.element_of(v));
        if let Some(element) = pressed_element {
            self.emit(ViewEvent::ElementClickedDown {
                element,
                pos: ev.pos,
            });
            if ev.click_count >= 2 {
                self.emit(ViewEvent::ElementDoubleClicked(element));
            }
        }
        if target == DragTarget::Selection && self.selection.is_empty() {
            return;
        }

        let kind = match target {
            DragTarget::Selection => UndoKind::Move,
            DragTarget::Handle(h) => match self.arena.get(&h).and_then(|e| e.as_handle()) {
                Some(handle) if handle.freedom == Freedom::Rotation => UndoKind::Rotate,
                _ => UndoKind::Resize,
            },
        };
        let before = self.change_start();
        tracing::debug!(?target, ?kind, "drag started");
        self.state = InteractionState::Dragging(Gesture {
            target,
            press: ev.pos,
            last: ev.pos,
            max_distance: 0.0,
            before,
            kind,
            pressed_element,
            collapse_to,
            placed: Vec::new(),
            default_size: false,
        });
    }

    fn view_mode_press(&mut self, ev: &MouseEvent) {
        let Some(hit) = self.pick_top_at(ev.pos) else {
            if !ev.modifiers.multi_select() {
                self.clear_selection();
            }
            return;
        };
        let Some(owner) = self.owner_graphics(hit) else {
            return;
        };
        if ev.modifiers.multi_select() {
            self.toggle_selected(owner);
        } else if let Some(unit) = self.selectable_for(hit) {
            self.set_selection(vec![unit]);
        }
        let Some(element) = self.element_of(owner) else {
            return;
        };
        self.emit(ViewEvent::ElementClickedDown {
            element,
            pos: ev.pos,
        });
        if ev.click_count >= 2 {
            self.emit(ViewEvent::ElementDoubleClicked(element));
        }
        let href = match self.pathway.get(element).map(|e| &e.kind) {
            Some(ElementKind::Label { href, .. }) if !href.is_empty() => Some(href.clone()),
            _ => None,
        };
        if let Some(href) = href {
            self.emit(ViewEvent::HrefActivated(href));
        }
    }

    fn start_placement(&mut self, template: Template, ev: &MouseEvent) {
        let before = self.change_start();
        let placement = self.place_template(&template, ev.pos);
        let target = match placement.drag_handle {
            Some(h) => DragTarget::Handle(h),
            None => DragTarget::Selection,
        };
        tracing::debug!(template = template.name(), "placing new element");
        self.state = InteractionState::PlacingNew(Gesture {
            target,
            press: ev.pos,
            last: ev.pos,
            max_distance: 0.0,
            before,
            kind: UndoKind::NewObject,
            pressed_element: None,
            collapse_to: None,
            placed: placement.elements,
            default_size: placement.default_size,
        });
    }

    pub fn mouse_move(&mut self, ev: MouseEvent) {
        let mut state = std::mem::take(&mut self.state);
        match &mut state {
            InteractionState::Idle => self.update_hover(&ev),
            InteractionState::Selecting { origin, current, .. } => {
                *current = ev.pos;
                if let Some(old) = self.selection.band() {
                    self.add_dirty_rect(old);
                }
                let band = egui::Rect::from_two_pos(*origin, ev.pos);
                self.selection.set_band(Some(band));
                self.add_dirty_rect(band);
            }
            InteractionState::Dragging(g) => self.drag_to(g, &ev, false),
            InteractionState::PlacingNew(g) => self.drag_to(g, &ev, true),
        }
        self.state = state;
    }

    fn drag_to(&mut self, g: &mut Gesture, ev: &MouseEvent, placing: bool) {
        g.max_distance = g.max_distance.max((ev.pos - g.press).length());
        match g.target {
            DragTarget::Handle(h) => {
                let Some(flipped) = self.adjust_handle(h, ev.pos, ev.modifiers, placing) else {
                    return;
                };
                let owner = self.arena.get(&h).and_then(|e| e.owner());
                let mirror = owner
                    .and_then(|o| self.element_of(o))
                    .and_then(|element| self.handle_at_position(element, flipped));
                if let Some(mirror) = mirror {
                    tracing::debug!(?flipped, "handle flipped");
                    g.target = DragTarget::Handle(mirror);
                }
            }
            DragTarget::Selection => {
                let delta = self.transform.m_vec(ev.pos - g.last);
                self.move_selection(delta);
                self.process_model_events();
            }
        }
        g.last = ev.pos;
    }

    /// Moves a handle to the view point `(vx, vy)`. Returns the mirror
    /// position when the owner flipped and control passes to that handle.
    pub fn adjust_to_handle(
        &mut self,
        handle: ViewId,
        vx: f32,
        vy: f32,
        modifiers: Modifiers,
    ) -> Option<HandlePosition> {
        let placing = matches!(self.state, InteractionState::PlacingNew(_));
        self.adjust_handle(handle, egui::pos2(vx, vy), modifiers, placing)
    }

    fn adjust_handle(
        &mut self,
        handle: ViewId,
        p: egui::Pos2,
        modifiers: Modifiers,
        placing: bool,
    ) -> Option<HandlePosition> {
        let handle = self.arena.get(&handle).and_then(|e| e.as_handle()).cloned()?;
        let element = self.element_of(handle.owner)?;
        let target = self.transform.m_pos(p);

        if handle.position.is_line_endpoint() {
            let end = if handle.position == HandlePosition::LineStart {
                LineEnd::Start
            } else {
                LineEnd::End
            };
            self.pathway.modify(element, |e| {
                if let ElementKind::Line { start, end: stop, .. } = &mut e.kind {
                    let point = if end.is_start() { start } else { stop };
                    point.x = target.x;
                    point.y = target.y;
                }
            });
            self.link_line_end(element, end, p, false);
            self.process_model_events();
            return None;
        }

        let snap = self.settings.snap_to_angle || modifiers.shift;
        let opts = AdjustOptions {
            free_corners: modifiers.shift || placing,
            snap_step: snap.then(|| self.settings.snap_step_radians()),
        };
        let flipped = self
            .pathway
            .modify(element, |e| {
                e.geom_mut()
                    .and_then(|geom| adjust_shape(geom, handle.position, target, opts))
            })
            .flatten();
        self.process_model_events();
        flipped
    }

    pub fn mouse_up(&mut self, ev: MouseEvent) {
        if ev.button != MouseButton::Primary {
            return;
        }
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => tracing::debug!("mouse up without press"),
            InteractionState::Selecting { origin, base, .. } => {
                if let Some(old) = self.selection.band() {
                    self.add_dirty_rect(old);
                }
                self.selection.set_band(None);
                let band = egui::Rect::from_two_pos(origin, ev.pos);
                if band.width().max(band.height()) < self.settings.min_drag_length {
                    self.set_selection(base);
                } else {
                    self.select_in_band(band, base);
                }
            }
            InteractionState::Dragging(g) => self.finish_gesture(g, &ev, false),
            InteractionState::PlacingNew(g) => self.finish_gesture(g, &ev, true),
        }
    }

    fn finish_gesture(&mut self, g: Gesture, ev: &MouseEvent, placing: bool) {
        let dragged = g.max_distance >= self.settings.min_drag_length;
        let line_end = match g.target {
            DragTarget::Handle(h) => self.arena.get(&h).and_then(|e| e.as_handle()).and_then(|h| {
                let element = self.element_of(h.owner)?;
                match h.position {
                    HandlePosition::LineStart => Some((element, LineEnd::Start)),
                    HandlePosition::LineEnd => Some((element, LineEnd::End)),
                    _ => None,
                }
            }),
            DragTarget::Selection => None,
        };

        if placing && g.default_size && !dragged {
            for element in &g.placed {
                self.pathway.modify(*element, |e| e.set_initial_size());
            }
            if let Some((line, end)) = line_end {
                let at = self
                    .pathway
                    .get(line)
                    .and_then(|e| e.line_points())
                    .map(|(s, t)| if end.is_start() { s.pos() } else { t.pos() });
                if let Some(at) = at {
                    let at = self.transform.v_pos(at);
                    self.link_line_end(line, end, at, true);
                }
            }
        } else if let Some((line, end)) = line_end {
            if dragged {
                self.link_line_end(line, end, ev.pos, true);
            } else {
                self.restore_line_end(line, end, &g.before);
            }
        }
        self.process_model_events();

        if let (Some(unit), false) = (g.collapse_to, dragged) {
            self.set_selection(vec![unit]);
        }
        if let Some(element) = g.pressed_element {
            self.emit(ViewEvent::ElementClickedUp {
                element,
                pos: ev.pos,
            });
        }
        tracing::debug!(kind = g.kind.label(), dragged, "gesture finished");
        self.commit_change(g.kind, g.before);
    }

    /// Abandons the running gesture and puts the model back as it was when
    /// the gesture started.
    pub fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.state) {
            InteractionState::Dragging(g) | InteractionState::PlacingNew(g) => {
                tracing::debug!(kind = g.kind.label(), "gesture cancelled");
                self.replace_pathway(g.before);
            }
            InteractionState::Selecting { .. } => {
                if let Some(old) = self.selection.band() {
                    self.add_dirty_rect(old);
                }
                self.selection.set_band(None);
            }
            InteractionState::Idle => {}
        }
    }

    fn update_hover(&mut self, ev: &MouseEvent) {
        let inside: Vec<ElementId> = self
            .pick_all_at(ev.pos)
            .into_iter()
            .filter_map(|v| self.element_of(v))
            .collect();
        let previous = std::mem::take(&mut self.hover.inside);
        for gone in previous.iter().filter(|e| !inside.contains(e)) {
            self.emit(ViewEvent::MouseExit(*gone));
        }
        for entered in inside.iter().filter(|e| !previous.contains(e)) {
            self.emit(ViewEvent::MouseEnter(*entered));
        }
        self.hover.inside = inside;

        let top = self
            .pick_top_at(ev.pos)
            .and_then(|v| self.owner_graphics(v))
            .and_then(|v| self.element_of(v));
        let current = self.hover.top.as_ref().map(|t| t.element);
        if top != current {
            self.hover.top = top.map(|element| HoverTimer {
                element,
                since: ev.time,
                fired: false,
            });
        }
    }

    /// Fires `ElementHover` once the cursor has rested on an element for the
    /// hover delay. Hosts call this from their frame loop.
    pub fn poll_hover(&mut self, now: Instant) -> Option<ElementId> {
        let delay = Duration::from_millis(self.settings.hover_delay_ms);
        let timer = self.hover.top.as_mut()?;
        if timer.fired || now.saturating_duration_since(timer.since) < delay {
            return None;
        }
        timer.fired = true;
        let element = timer.element;
        self.emit(ViewEvent::ElementHover(element));
        Some(element)
    }

    pub fn key_pressed(&mut self, key: Key, modifiers: Modifiers) {
        if key == Key::Escape {
            if !self.state.is_idle() {
                self.cancel_gesture();
            } else if self.template.take().is_none() {
                self.clear_selection();
            }
            return;
        }
        if !self.state.is_idle() {
            return;
        }
        if !self.edit_mode {
            if key == Key::Char('a') && modifiers.command() {
                self.select_all();
            }
            return;
        }
        let step = if modifiers.shift {
            self.settings.move_step_fast
        } else {
            self.settings.move_step
        };
        match key {
            Key::ArrowLeft => self.move_by_key(egui::vec2(-step, 0.0)),
            Key::ArrowRight => self.move_by_key(egui::vec2(step, 0.0)),
            Key::ArrowUp => self.move_by_key(egui::vec2(0.0, -step)),
            Key::ArrowDown => self.move_by_key(egui::vec2(0.0, step)),
            Key::Delete | Key::Backspace => self.delete_selected(),
            Key::Char(c) if modifiers.command() => match c.to_ascii_lowercase() {
                'a' => self.select_all(),
                'c' => self.copy(),
                'x' => {
                    self.copy();
                    self.delete_selected();
                }
                'v' => self.paste(),
                'g' if modifiers.shift => self.ungroup(),
                'g' => self.toggle_group(),
                'p' => self.toggle_complex(),
                'r' => self.add_line_anchor(),
                'z' if modifiers.shift => self.redo(),
                'z' => self.undo(),
                'y' => self.redo(),
                ']' => self.raise(),
                '[' => self.lower(),
                '}' => self.bring_to_front(),
                '{' => self.send_to_back(),
                _ => {}
            },
            _ => {}
        }
    }
}
