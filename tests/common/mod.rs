#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use pathcanvas::model::{
    DataNodeType, ElementId, LinePoint, Pathway, PathwayElement, Point, ShapeGeom, ShapeType,
};
use pathcanvas::view::{Canvas, MouseEvent, UndoAction, UndoKind, UndoManager, ViewEvent};

/// Undo manager that only remembers which kinds were committed.
#[derive(Clone, Default)]
pub struct Recorder {
    pub kinds: Rc<RefCell<Vec<UndoKind>>>,
}

impl Recorder {
    pub fn kinds(&self) -> Vec<UndoKind> {
        self.kinds.borrow().clone()
    }
}

impl UndoManager for Recorder {
    fn change_start(&mut self, pathway: &Pathway) -> pathcanvas::Result<Pathway> {
        Ok(pathway.clone())
    }

    fn commit(&mut self, action: UndoAction) -> pathcanvas::Result<()> {
        self.kinds.borrow_mut().push(action.kind);
        Ok(())
    }
}

pub fn recorded_canvas(pathway: Pathway) -> (Canvas, Recorder) {
    let recorder = Recorder::default();
    let canvas = Canvas::with_undo_manager(pathway, Box::new(recorder.clone()));
    (canvas, recorder)
}

pub fn listen(canvas: &mut Canvas) -> Rc<RefCell<Vec<ViewEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    canvas.add_listener(move |ev| sink.borrow_mut().push(ev.clone()));
    events
}

pub fn rect_node(left: f32, top: f32, width: f32, height: f32) -> PathwayElement {
    PathwayElement::data_node(
        DataNodeType::GeneProduct,
        ShapeGeom::from_left_top(left, top, width, height),
    )
}

pub fn rect_shape(left: f32, top: f32, width: f32, height: f32) -> PathwayElement {
    PathwayElement::shape(
        ShapeType::Rectangle,
        ShapeGeom::from_left_top(left, top, width, height),
    )
}

pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> PathwayElement {
    PathwayElement::line(Point::new(x1, y1), Point::new(x2, y2))
}

pub fn click(canvas: &mut Canvas, x: f32, y: f32) {
    canvas.mouse_down(MouseEvent::at(x, y));
    canvas.mouse_up(MouseEvent::at(x, y));
}

/// Press at the first point, move through the rest, release at the last.
pub fn drag(canvas: &mut Canvas, path: &[(f32, f32)]) {
    let Some((&(x0, y0), rest)) = path.split_first() else {
        return;
    };
    canvas.mouse_down(MouseEvent::at(x0, y0));
    for &(x, y) in rest {
        canvas.mouse_move(MouseEvent::at(x, y));
    }
    let &(xn, yn) = path.last().unwrap();
    canvas.mouse_up(MouseEvent::at(xn, yn));
}

pub fn line_end(canvas: &Canvas, line: ElementId) -> LinePoint {
    canvas
        .pathway()
        .get(line)
        .and_then(|e| e.line_points())
        .map(|(_, end)| end.clone())
        .unwrap()
}

pub fn geom(canvas: &Canvas, id: ElementId) -> ShapeGeom {
    *canvas.pathway().get(id).and_then(|e| e.geom()).unwrap()
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}
