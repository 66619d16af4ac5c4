mod common;

use std::time::{Duration, Instant};

use common::*;
use eframe::egui;
use pathcanvas::model::{DataNodeType, ElementKind, LineType, Pathway, PathwayElement, ShapeGeom};
use pathcanvas::view::{
    HandlePosition, InteractionState, Key, Modifiers, MouseButton, MouseEvent, Template, UndoKind,
    ViewEvent,
};

fn single_node() -> (Pathway, pathcanvas::model::ElementId) {
    let mut pathway = Pathway::new();
    let a = pathway.add(rect_shape(0.0, 0.0, 100.0, 40.0));
    (pathway, a)
}

#[test]
fn gestures_that_miss_everything_select_nothing_and_record_nothing() {
    let (pathway, _) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);

    click(&mut canvas, 300.0, 300.0);
    drag(&mut canvas, &[(300.0, 300.0), (320.0, 310.0), (400.0, 380.0)]);
    drag(&mut canvas, &[(500.0, 10.0), (501.0, 11.0)]);
    canvas.key_pressed(Key::ArrowLeft, Modifiers::NONE);
    canvas.key_pressed(Key::Delete, Modifiers::NONE);

    assert!(canvas.selection().is_empty());
    assert!(canvas.selection().band().is_none());
    assert!(recorder.kinds().is_empty());
    assert!(canvas.state().is_idle());
}

#[test]
fn clicking_a_selected_element_again_changes_nothing() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);

    click(&mut canvas, 50.0, 20.0);
    let first = canvas.selection().members().to_vec();
    let geom_before = geom(&canvas, a);
    click(&mut canvas, 50.0, 20.0);

    assert_eq!(canvas.selection().members(), first.as_slice());
    assert_eq!(canvas.selected_elements(), vec![a]);
    assert_eq!(geom(&canvas, a), geom_before);
    assert!(recorder.kinds().is_empty());
}

#[test]
fn a_plain_click_on_a_multi_selection_member_collapses_to_it() {
    let mut pathway = Pathway::new();
    let a = pathway.add(rect_shape(0.0, 0.0, 40.0, 40.0));
    let b = pathway.add(rect_shape(100.0, 0.0, 40.0, 40.0));
    let (mut canvas, recorder) = recorded_canvas(pathway);

    canvas.select_elements(&[a, b]);
    drag(&mut canvas, &[(20.0, 20.0), (30.0, 20.0)]);
    assert_eq!(canvas.selection().len(), 2);
    assert!(approx(geom(&canvas, b).left(), 110.0));

    click(&mut canvas, 30.0, 20.0);
    assert_eq!(canvas.selected_elements(), vec![a]);
    assert_eq!(recorder.kinds(), vec![UndoKind::Move]);
}

#[test]
fn modifier_clicks_reach_into_groups() {
    let mut pathway = Pathway::new();
    let a = pathway.add(rect_node(0.0, 0.0, 50.0, 20.0));
    let b = pathway.add(rect_node(100.0, 0.0, 50.0, 20.0));
    let (mut canvas, recorder) = recorded_canvas(pathway);
    canvas.select_elements(&[a, b]);
    canvas.toggle_group();
    let group = canvas.selected_elements()[0];
    canvas.clear_selection();

    canvas.mouse_down(MouseEvent::at(25.0, 10.0).with_modifiers(Modifiers::SHIFT));
    canvas.mouse_up(MouseEvent::at(25.0, 10.0).with_modifiers(Modifiers::SHIFT));
    assert_eq!(canvas.selected_elements(), vec![a]);

    canvas.mouse_down(MouseEvent::at(125.0, 10.0).with_modifiers(Modifiers::CTRL));
    canvas.mouse_up(MouseEvent::at(125.0, 10.0).with_modifiers(Modifiers::CTRL));
    assert_eq!(canvas.selected_elements(), vec![a, b]);

    canvas.mouse_down(MouseEvent::at(25.0, 10.0).with_modifiers(Modifiers::SHIFT));
    canvas.mouse_up(MouseEvent::at(25.0, 10.0).with_modifiers(Modifiers::SHIFT));
    assert_eq!(canvas.selected_elements(), vec![b]);

    click(&mut canvas, 25.0, 10.0);
    assert_eq!(canvas.selected_elements(), vec![group]);
    assert_eq!(recorder.kinds(), vec![UndoKind::Group]);
}

#[test]
fn near_misses_on_thin_outlines_still_pick() {
    let mut pathway = Pathway::new();
    let l = pathway.add(line(0.0, 50.0, 200.0, 50.0));
    let mut frame = rect_shape(300.0, 0.0, 100.0, 100.0);
    frame.style.transparent = true;
    let frame = pathway.add(frame);
    let (mut canvas, _) = recorded_canvas(pathway);

    click(&mut canvas, 100.0, 54.0);
    assert_eq!(canvas.selected_elements(), vec![l]);

    click(&mut canvas, 304.0, 50.0);
    assert_eq!(canvas.selected_elements(), vec![frame]);

    click(&mut canvas, 100.0, 75.0);
    assert!(canvas.selection().is_empty());
}

#[test]
fn band_selection_picks_enclosed_elements() {
    let mut pathway = Pathway::new();
    let a = pathway.add(rect_shape(0.0, 0.0, 40.0, 40.0));
    let b = pathway.add(rect_shape(100.0, 0.0, 40.0, 40.0));
    let c = pathway.add(rect_shape(300.0, 300.0, 40.0, 40.0));
    let (mut canvas, _) = recorded_canvas(pathway);

    drag(&mut canvas, &[(-10.0, -10.0), (100.0, 100.0), (160.0, 60.0)]);
    let mut selected = canvas.selected_elements();
    selected.sort();
    assert_eq!(selected, vec![a, b]);
    assert!(!canvas.is_element_selected(c));
}

#[test]
fn dragging_the_east_handle_across_the_west_edge_flips_twice() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);
    click(&mut canvas, 50.0, 20.0);
    assert!(canvas.handle_at_position(a, HandlePosition::E).is_some());

    canvas.mouse_down(MouseEvent::at(100.0, 20.0));
    canvas.mouse_move(MouseEvent::at(-20.0, 20.0));
    let g = geom(&canvas, a);
    assert!(approx(g.left(), -20.0) && approx(g.width, 20.0));

    canvas.mouse_move(MouseEvent::at(-40.0, 20.0));
    let g = geom(&canvas, a);
    assert!(approx(g.left(), -40.0) && approx(g.width, 40.0));

    canvas.mouse_move(MouseEvent::at(150.0, 20.0));
    canvas.mouse_up(MouseEvent::at(150.0, 20.0));
    let g = geom(&canvas, a);
    assert!(approx(g.left(), 0.0) && approx(g.width, 150.0));
    assert!(approx(g.height, 40.0));
    assert_eq!(recorder.kinds(), vec![UndoKind::Resize]);
}

#[test]
fn dragging_moves_the_selection_as_one_undo_step() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);

    drag(&mut canvas, &[(50.0, 20.0), (60.0, 25.0), (80.0, 30.0)]);
    let g = geom(&canvas, a);
    assert!(approx(g.left(), 30.0) && approx(g.top(), 10.0));
    assert_eq!(recorder.kinds(), vec![UndoKind::Move]);
}

#[test]
fn dragging_the_rotation_handle_rotates_as_one_undo_step() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);
    click(&mut canvas, 50.0, 20.0);
    assert!(canvas.handle_at_position(a, HandlePosition::Rotate).is_some());

    // The handle sits 20 units beyond the east edge.
    drag(&mut canvas, &[(120.0, 20.0), (90.0, 80.0), (50.0, 120.0)]);

    let g = geom(&canvas, a);
    assert!(approx(g.rotation, std::f32::consts::FRAC_PI_2));
    assert!(approx(g.width, 100.0) && approx(g.height, 40.0));
    assert_eq!(recorder.kinds(), vec![UndoKind::Rotate]);
}

#[test]
fn only_the_primary_button_ends_a_drag() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);

    canvas.mouse_down(MouseEvent::at(50.0, 20.0));
    canvas.mouse_move(MouseEvent::at(80.0, 20.0));
    canvas.mouse_up(MouseEvent::at(80.0, 20.0).with_button(MouseButton::Secondary));
    assert!(matches!(canvas.state(), InteractionState::Dragging(_)));
    assert!(recorder.kinds().is_empty());

    canvas.mouse_move(MouseEvent::at(90.0, 20.0));
    canvas.mouse_up(MouseEvent::at(90.0, 20.0));
    assert!(canvas.state().is_idle());
    assert!(approx(geom(&canvas, a).left(), 40.0));
    assert_eq!(recorder.kinds(), vec![UndoKind::Move]);
}

#[test]
fn escape_puts_the_dragged_element_back() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);
    let start = geom(&canvas, a);

    canvas.mouse_down(MouseEvent::at(50.0, 20.0));
    canvas.mouse_move(MouseEvent::at(90.0, 70.0));
    assert!(matches!(canvas.state(), InteractionState::Dragging(_)));
    canvas.key_pressed(Key::Escape, Modifiers::NONE);
    canvas.mouse_up(MouseEvent::at(90.0, 70.0));

    assert_eq!(geom(&canvas, a), start);
    assert!(canvas.state().is_idle());
    assert!(recorder.kinds().is_empty());
}

#[test]
fn arrow_keys_nudge_the_selection() {
    let (pathway, a) = single_node();
    let (mut canvas, recorder) = recorded_canvas(pathway);
    canvas.select_element(a);

    canvas.key_pressed(Key::ArrowRight, Modifiers::SHIFT);
    canvas.key_pressed(Key::ArrowDown, Modifiers::NONE);

    let g = geom(&canvas, a);
    assert!(approx(g.left(), 10.0) && approx(g.top(), 1.0));
    assert_eq!(recorder.kinds(), vec![UndoKind::Move, UndoKind::Move]);
}

#[test]
fn undo_and_redo_restore_snapshots() {
    let (pathway, a) = single_node();
    let mut canvas = pathcanvas::view::Canvas::new(pathway);
    canvas.select_element(a);
    canvas.key_pressed(Key::ArrowRight, Modifiers::SHIFT);
    assert!(approx(geom(&canvas, a).left(), 10.0));

    canvas.key_pressed(Key::Char('z'), Modifiers::CTRL);
    assert!(approx(geom(&canvas, a).left(), 0.0));
    canvas.key_pressed(Key::Char('y'), Modifiers::CTRL);
    assert!(approx(geom(&canvas, a).left(), 10.0));
}

#[test]
fn hover_fires_after_the_delay_once() {
    let (pathway, a) = single_node();
    let (mut canvas, _) = recorded_canvas(pathway);
    let events = listen(&mut canvas);
    let t0 = Instant::now();

    canvas.mouse_move(MouseEvent::at(50.0, 20.0).with_time(t0));
    assert!(events.borrow().contains(&ViewEvent::MouseEnter(a)));
    assert_eq!(canvas.poll_hover(t0 + Duration::from_millis(500)), None);
    assert_eq!(canvas.poll_hover(t0 + Duration::from_millis(1500)), Some(a));
    assert_eq!(canvas.poll_hover(t0 + Duration::from_millis(3000)), None);

    canvas.mouse_move(MouseEvent::at(500.0, 500.0).with_time(t0));
    assert!(events.borrow().contains(&ViewEvent::MouseExit(a)));
}

#[test]
fn double_click_is_reported() {
    let (pathway, a) = single_node();
    let (mut canvas, _) = recorded_canvas(pathway);
    let events = listen(&mut canvas);

    canvas.mouse_down(MouseEvent::at(50.0, 20.0).with_click_count(2));
    canvas.mouse_up(MouseEvent::at(50.0, 20.0));

    let events = events.borrow();
    assert!(events.contains(&ViewEvent::ElementDoubleClicked(a)));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ViewEvent::ElementClickedUp { element, .. } if *element == a))
    );
}

#[test]
fn view_mode_follows_label_links_without_editing() {
    let mut pathway = Pathway::new();
    let mut label = PathwayElement::label("KEGG", ShapeGeom::from_left_top(0.0, 0.0, 90.0, 25.0));
    if let ElementKind::Label { href, .. } = &mut label.kind {
        *href = "https://www.kegg.jp".to_string();
    }
    let id = pathway.add(label);
    let (mut canvas, recorder) = recorded_canvas(pathway);
    let events = listen(&mut canvas);
    canvas.set_edit_mode(false);

    drag(&mut canvas, &[(40.0, 10.0), (90.0, 60.0)]);

    assert!(
        events
            .borrow()
            .contains(&ViewEvent::HrefActivated("https://www.kegg.jp".to_string()))
    );
    assert!(approx(geom(&canvas, id).left(), 0.0));
    assert!(recorder.kinds().is_empty());
}

#[test]
fn clicking_with_a_template_places_a_default_sized_node() {
    let (mut canvas, recorder) = recorded_canvas(Pathway::new());
    canvas.set_new_template(Some(Template::DataNode(DataNodeType::Protein)));

    click(&mut canvas, 10.0, 10.0);

    assert_eq!(canvas.pathway().len(), 1);
    let node = &canvas.pathway().elements()[0];
    let g = node.geom().unwrap();
    assert!(approx(g.width, 80.0) && approx(g.height, 20.0));
    assert!(canvas.template().is_none());
    assert_eq!(canvas.selected_elements(), vec![node.id]);
    assert_eq!(recorder.kinds(), vec![UndoKind::NewObject]);
}

#[test]
fn dragging_with_a_template_sizes_by_the_corner() {
    let (mut canvas, recorder) = recorded_canvas(Pathway::new());
    canvas.set_new_template(Some(Template::Shape(pathcanvas::model::ShapeType::Oval)));

    drag(&mut canvas, &[(10.0, 10.0), (60.0, 20.0), (110.0, 60.0)]);

    let g = *canvas.pathway().elements()[0].geom().unwrap();
    assert!(approx(g.left(), 10.0) && approx(g.top(), 10.0));
    assert!(approx(g.width, 100.0) && approx(g.height, 50.0));
    assert_eq!(recorder.kinds(), vec![UndoKind::NewObject]);
}

#[test]
fn line_template_links_both_ends() {
    let mut pathway = Pathway::new();
    let a = pathway.add(rect_node(0.0, 0.0, 100.0, 40.0).with_graph_id("a"));
    let b = pathway.add(rect_node(200.0, 0.0, 100.0, 40.0));
    let (mut canvas, _) = recorded_canvas(pathway);
    canvas.set_new_template(Some(Template::Line(LineType::Arrow)));

    drag(&mut canvas, &[(100.0, 20.0), (150.0, 20.0), (200.0, 20.0)]);

    let line = canvas
        .pathway()
        .elements()
        .iter()
        .find(|e| e.is_line())
        .unwrap();
    let (start, end) = line.line_points().unwrap();
    assert_eq!(start.graph_ref.as_ref().map(|r| r.graph_id.as_str()), Some("a"));
    let b_graph_id = canvas.pathway().get(b).and_then(|e| e.graph_id.clone());
    assert!(b_graph_id.is_some());
    assert_eq!(end.graph_ref.as_ref().map(|r| r.graph_id.clone()), b_graph_id);
    assert!(matches!(
        line.kind,
        ElementKind::Line {
            end_type: LineType::Arrow,
            ..
        }
    ));
    assert!(canvas.pathway().get(a).is_some());
}

#[test]
fn interaction_template_adds_two_linked_nodes() {
    let (mut canvas, recorder) = recorded_canvas(Pathway::new());
    let placement = canvas.insert_template_at(&Template::Interaction, egui::pos2(0.0, 0.0));

    assert_eq!(placement.elements.len(), 3);
    assert!(placement.drag_handle.is_none());
    let line = canvas.pathway().get(placement.elements[2]).unwrap();
    let (start, end) = line.line_points().unwrap();
    assert!(approx(start.x, 80.0) && approx(start.y, 10.0));
    assert!(approx(end.x, 160.0) && approx(end.y, 10.0));
    assert!(start.is_linked() && end.is_linked());
    assert_eq!(canvas.selection().len(), 3);
    assert_eq!(recorder.kinds(), vec![UndoKind::NewObject]);
}

struct Broken;

impl pathcanvas::view::UndoManager for Broken {
    fn change_start(&mut self, _: &Pathway) -> pathcanvas::Result<Pathway> {
        Err(pathcanvas::Error::Undo {
            message: "journal full".to_string(),
        })
    }

    fn commit(&mut self, _: pathcanvas::view::UndoAction) -> pathcanvas::Result<()> {
        Err(pathcanvas::Error::Undo {
            message: "journal full".to_string(),
        })
    }
}

#[test]
fn undo_failures_are_reported_but_the_edit_stands() {
    let (pathway, a) = single_node();
    let mut canvas = pathcanvas::view::Canvas::with_undo_manager(pathway, Box::new(Broken));
    let events = listen(&mut canvas);

    drag(&mut canvas, &[(50.0, 20.0), (70.0, 20.0)]);

    assert!(approx(geom(&canvas, a).left(), 20.0));
    let failures = events
        .borrow()
        .iter()
        .filter(|e| matches!(e, ViewEvent::UndoFailed(_)))
        .count();
    assert_eq!(failures, 2);
}
