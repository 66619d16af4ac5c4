//! Demo host: owns panning, feeds egui input to the canvas and paints its
//! draw list.

use eframe::egui;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use pathcanvas::model::{DataNodeType, LineType, Pathway, ShapeType};
use pathcanvas::view::{
    Alignment, Canvas, Key, Modifiers, MouseButton, MouseEvent, SelectionFilter, SizeMode,
    StackMode, Template, ViewEvent,
};

pub mod render;

use render::PainterTable;

/// Presses closer than this in time and space count as one multi-click.
const MULTI_CLICK_TIME: Duration = Duration::from_millis(400);
const MULTI_CLICK_DISTANCE: f32 = 4.0;

pub struct HostApp {
    canvas: Canvas,
    painters: PainterTable,
    path: Option<PathBuf>,
    pan: egui::Vec2,
    panning: bool,
    last_press: Option<(Instant, egui::Pos2, u32)>,
    events: Rc<RefCell<Vec<ViewEvent>>>,
    status: String,
}

impl HostApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        mut canvas: Canvas,
        painters: PainterTable,
        path: Option<PathBuf>,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        canvas.set_redraw_callback(move |_| ctx.request_repaint());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        canvas.add_listener(move |ev| sink.borrow_mut().push(ev.clone()));
        Self {
            canvas,
            painters,
            path,
            pan: egui::vec2(40.0, 40.0),
            panning: false,
            last_press: None,
            events,
            status: "Ready".to_string(),
        }
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        if let Some(status) = status {
            self.status = status;
        }
        self
    }

    fn save(&mut self) {
        let Some(path) = self.path.clone() else {
            self.status = "No file to save to".to_string();
            return;
        };
        let written = self
            .canvas
            .pathway()
            .to_json()
            .and_then(|json| std::fs::write(&path, json).map_err(Into::into));
        self.status = match written {
            Ok(()) => format!("Saved {}", path.display()),
            Err(err) => {
                tracing::warn!(%err, "saving pathway failed");
                format!("Save failed: {err}")
            }
        };
    }

    fn drain_events(&mut self) {
        for ev in self.events.borrow_mut().drain(..) {
            match ev {
                ViewEvent::SelectionChanged(ids) => {
                    self.status = format!("Selected: {}", ids.len());
                }
                ViewEvent::ElementHover(id) => self.status = format!("Hovering {id}"),
                ViewEvent::HrefActivated(href) => self.status = format!("Link: {href}"),
                ViewEvent::UndoFailed(msg) => self.status = format!("Undo unavailable: {msg}"),
                _ => {}
            }
        }
    }

    fn click_count(&mut self, now: Instant, pos: egui::Pos2) -> u32 {
        let count = match self.last_press {
            Some((t, p, n))
                if now.duration_since(t) <= MULTI_CLICK_TIME
                    && (pos - p).length() <= MULTI_CLICK_DISTANCE =>
            {
                n + 1
            }
            _ => 1,
        };
        self.last_press = Some((now, pos, count));
        count
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        let mut edit = self.canvas.edit_mode();
        if ui.checkbox(&mut edit, "Edit mode").changed() {
            self.canvas.set_edit_mode(edit);
        }
        ui.separator();
        ui.label("New");
        let templates = [
            Template::DataNode(DataNodeType::GeneProduct),
            Template::DataNode(DataNodeType::Metabolite),
            Template::Label,
            Template::Shape(ShapeType::Rectangle),
            Template::Shape(ShapeType::Oval),
            Template::Line(LineType::Line),
            Template::Line(LineType::Arrow),
            Template::Interaction,
        ];
        for t in templates {
            let active = self.canvas.template() == Some(&t);
            if ui.selectable_label(active, t.name()).clicked() {
                self.canvas.set_new_template(Some(t));
            }
        }
        ui.separator();
        ui.label("Select");
        ui.horizontal(|ui| {
            if ui.button("All").clicked() {
                self.canvas.select_all();
            }
            if ui.button("Nodes").clicked() {
                self.canvas.select_kind(SelectionFilter::DataNodes);
            }
            if ui.button("Interactions").clicked() {
                self.canvas.select_kind(SelectionFilter::Interactions);
            }
        });
        ui.separator();
        ui.label("Layout");
        ui.horizontal_wrapped(|ui| {
            for (label, mode) in [
                ("Left", Alignment::Left),
                ("Center X", Alignment::CenterX),
                ("Right", Alignment::Right),
                ("Top", Alignment::Top),
                ("Center Y", Alignment::CenterY),
                ("Bottom", Alignment::Bottom),
            ] {
                if ui.button(label).clicked() {
                    self.canvas.align_selected(mode);
                }
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Same width").clicked() {
                self.canvas.set_common_size(SizeMode::Width);
            }
            if ui.button("Same height").clicked() {
                self.canvas.set_common_size(SizeMode::Height);
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Stack →").clicked() {
                self.canvas.stack_selected(StackMode::Horizontal);
            }
            if ui.button("Stack ↓").clicked() {
                self.canvas.stack_selected(StackMode::Vertical);
            }
        });
        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Group").clicked() {
                self.canvas.toggle_group();
            }
            if ui.button("Complex").clicked() {
                self.canvas.toggle_complex();
            }
            if ui.button("Ungroup").clicked() {
                self.canvas.ungroup();
            }
        });
        if ui.button("Add line anchor").clicked() {
            self.canvas.add_line_anchor();
        }
        ui.horizontal(|ui| {
            if ui.button("Front").clicked() {
                self.canvas.bring_to_front();
            }
            if ui.button("Raise").clicked() {
                self.canvas.raise();
            }
            if ui.button("Lower").clicked() {
                self.canvas.lower();
            }
            if ui.button("Back").clicked() {
                self.canvas.send_to_back();
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Undo").clicked() {
                self.canvas.undo();
            }
            if ui.button("Redo").clicked() {
                self.canvas.redo();
            }
            if ui.button("Save").clicked() {
                self.save();
            }
        });
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::Copy => self.canvas.copy(),
                egui::Event::Cut => {
                    self.canvas.copy();
                    self.canvas.delete_selected();
                }
                egui::Event::Paste(_) => self.canvas.paste(),
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => {
                    if modifiers.command && key == egui::Key::S {
                        self.save();
                        continue;
                    }
                    if let Some(key) = map_key(key, modifiers.shift) {
                        self.canvas.key_pressed(key, Modifiers::from_egui(modifiers));
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, rect: egui::Rect) {
        let origin = rect.min.to_vec2() + self.pan;
        let (events, modifiers) = ctx.input(|i| (i.events.clone(), i.modifiers));
        let mods = Modifiers::from_egui(modifiers);
        for event in events {
            match event {
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    ..
                } => {
                    if button == egui::PointerButton::Middle {
                        self.panning = pressed;
                        continue;
                    }
                    if pressed && !rect.contains(pos) {
                        continue;
                    }
                    let button = match button {
                        egui::PointerButton::Primary => MouseButton::Primary,
                        egui::PointerButton::Secondary => MouseButton::Secondary,
                        _ => continue,
                    };
                    let now = Instant::now();
                    let mut ev = MouseEvent::new(pos - origin)
                        .with_button(button)
                        .with_modifiers(mods)
                        .with_time(now);
                    if pressed {
                        let count = self.click_count(now, pos);
                        ev = ev.with_click_count(count);
                        self.canvas.mouse_down(ev);
                    } else {
                        self.canvas.mouse_up(ev);
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    let ev = MouseEvent::new(pos - origin).with_modifiers(mods);
                    self.canvas.mouse_move(ev);
                }
                egui::Event::MouseWheel { delta, .. } => {
                    let Some(hover) = ctx.input(|i| i.pointer.hover_pos()) else {
                        continue;
                    };
                    if !rect.contains(hover) {
                        continue;
                    }
                    let old = self.canvas.transform().zoom();
                    let factor = (1.0 + delta.y * 0.1).clamp(0.8, 1.25);
                    self.canvas.set_zoom(old * factor);
                    let new = self.canvas.transform().zoom();
                    // keep the point under the cursor fixed
                    let local = hover - rect.min;
                    self.pan = local - (local - self.pan) * (new / old);
                }
                _ => {}
            }
        }
        if self.panning {
            self.pan += ctx.input(|i| i.pointer.delta());
        }
    }
}

fn map_key(key: egui::Key, shift: bool) -> Option<Key> {
    let key = match key {
        egui::Key::ArrowLeft => Key::ArrowLeft,
        egui::Key::ArrowRight => Key::ArrowRight,
        egui::Key::ArrowUp => Key::ArrowUp,
        egui::Key::ArrowDown => Key::ArrowDown,
        egui::Key::Delete => Key::Delete,
        egui::Key::Backspace => Key::Backspace,
        egui::Key::Escape => Key::Escape,
        egui::Key::A => Key::Char('a'),
        egui::Key::G => Key::Char('g'),
        egui::Key::P => Key::Char('p'),
        egui::Key::R => Key::Char('r'),
        egui::Key::Z => Key::Char('z'),
        egui::Key::Y => Key::Char('y'),
        egui::Key::OpenBracket => Key::Char(if shift { '{' } else { '[' }),
        egui::Key::CloseBracket => Key::Char(if shift { '}' } else { ']' }),
        _ => return None,
    };
    Some(key)
}

impl eframe::App for HostApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        egui::SidePanel::left("tools").show(ctx, |ui| self.side_panel(ui));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.canvas.transform().pct_zoom()));
                    ui.separator();
                    ui.label(format!("Objects: {}", self.canvas.pathway().len()));
                    ui.separator();
                    ui.label(self.canvas.state().name());
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (rect, _response) =
                ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
            self.handle_pointer(ctx, rect);
            self.canvas.poll_hover(Instant::now());

            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
            let offset = rect.min.to_vec2() + self.pan;
            for drawable in self.canvas.draw_list() {
                self.painters.paint(&painter, &drawable, offset);
            }
        });

        self.canvas.redraw_dirty_rect();
        self.drain_events();
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Reads the pathway named on the command line; a missing or broken file
/// gives an empty pathway and a message.
pub fn load_pathway(path: Option<&PathBuf>) -> (Pathway, Option<String>) {
    let Some(path) = path else {
        return (Pathway::new(), None);
    };
    let loaded = std::fs::read_to_string(path)
        .map_err(pathcanvas::Error::from)
        .and_then(|json| Pathway::from_json(&json));
    match loaded {
        Ok(pathway) => (pathway, None),
        Err(err) => {
            tracing::warn!(%err, path = %path.display(), "could not load pathway");
            (Pathway::new(), Some(format!("Could not load {}: {err}", path.display())))
        }
    }
}
