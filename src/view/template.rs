use eframe::egui;

use super::Canvas;
use super::anchor::LineEnd;
use super::element::ViewId;
use super::handle::HandlePosition;
use super::undo::UndoKind;
use crate::model::{
    DataNodeType, ElementId, ElementKind, GraphRef, LineType, M_INITIAL_DATANODE_HEIGHT,
    M_INITIAL_DATANODE_WIDTH, PathwayElement, Point, ShapeGeom, ShapeType,
};

/// Gap between the two nodes of an interaction template, in model units.
const INTERACTION_GAP: f32 = 80.0;

/// Blueprint for elements placed with the mouse.
#[derive(Clone, Debug, PartialEq)]
pub enum Template {
    DataNode(DataNodeType),
    Label,
    Shape(ShapeType),
    Line(LineType),
    /// Two data nodes joined by a linked line.
    Interaction,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::DataNode(t) => t.name(),
            Template::Label => "Label",
            Template::Shape(_) => "Shape",
            Template::Line(_) => "Line",
            Template::Interaction => "Interaction",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Placement {
    pub elements: Vec<ElementId>,
    pub graphics: Vec<ViewId>,
    /// Handle the placement drag resizes; none means the selection moves.
    pub drag_handle: Option<ViewId>,
    /// Whether a click without drag gives the elements their default size.
    pub default_size: bool,
}

impl Canvas {
    /// Arms a template; the next press in edit mode places it.
    pub fn set_new_template(&mut self, template: Option<Template>) {
        self.template = template;
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Places a template at the view point `p` as one undoable step and
    /// selects the result.
    pub fn insert_template_at(&mut self, template: &Template, p: egui::Pos2) -> Placement {
        let before = self.change_start();
        let placement = self.place_template(template, p);
        self.commit_change(UndoKind::NewObject, before);
        placement
    }

    pub(super) fn place_template(&mut self, template: &Template, p: egui::Pos2) -> Placement {
        let at = self.transform.m_pos(p);
        let mut z = self.pathway.max_z_order() + 1;
        let mut next_z = || {
            z += 1;
            z - 1
        };
        let (elements, drag, default_size) = match template {
            Template::DataNode(node_type) => {
                let geom = ShapeGeom::from_left_top(at.x, at.y, 1.0, 1.0);
                let e = PathwayElement::data_node(*node_type, geom).with_z_order(next_z());
                let id = self.pathway.add(e);
                (vec![id], Some((id, HandlePosition::SE)), true)
            }
            Template::Shape(shape_type) => {
                let geom = ShapeGeom::from_left_top(at.x, at.y, 1.0, 1.0);
                let e = PathwayElement::shape(*shape_type, geom).with_z_order(next_z());
                let id = self.pathway.add(e);
                (vec![id], Some((id, HandlePosition::SE)), true)
            }
            Template::Label => {
                let mut e = PathwayElement::label("Label", ShapeGeom::from_left_top(at.x, at.y, 0.0, 0.0))
                    .with_z_order(next_z());
                e.set_initial_size();
                if let Some(geom) = e.geom_mut() {
                    *geom = ShapeGeom::from_left_top(at.x, at.y, geom.width, geom.height);
                }
                let id = self.pathway.add(e);
                (vec![id], None, false)
            }
            Template::Line(line_type) => {
                let mut e = PathwayElement::line(Point::from_pos2(at), Point::from_pos2(at))
                    .with_z_order(next_z());
                if let ElementKind::Line { end_type, .. } = &mut e.kind {
                    *end_type = *line_type;
                }
                let id = self.pathway.add(e);
                (vec![id], Some((id, HandlePosition::LineEnd)), true)
            }
            Template::Interaction => {
                let left = ShapeGeom::from_left_top(
                    at.x,
                    at.y,
                    M_INITIAL_DATANODE_WIDTH,
                    M_INITIAL_DATANODE_HEIGHT,
                );
                let right = ShapeGeom::from_left_top(
                    at.x + M_INITIAL_DATANODE_WIDTH + INTERACTION_GAP,
                    at.y,
                    M_INITIAL_DATANODE_WIDTH,
                    M_INITIAL_DATANODE_HEIGHT,
                );
                let left_id = self.pathway.unique_graph_id();
                let right_id = self.pathway.unique_graph_id();
                let a = PathwayElement::data_node(DataNodeType::GeneProduct, left)
                    .with_graph_id(&left_id)
                    .with_z_order(next_z());
                let b = PathwayElement::data_node(DataNodeType::GeneProduct, right)
                    .with_graph_id(&right_id)
                    .with_z_order(next_z());
                let start = left.relative_to_model(1.0, 0.0);
                let end = right.relative_to_model(-1.0, 0.0);
                let mut line = PathwayElement::line(Point::from_pos2(start), Point::from_pos2(end))
                    .with_z_order(next_z());
                if let ElementKind::Line {
                    start,
                    end,
                    end_type,
                    ..
                } = &mut line.kind
                {
                    start.graph_ref = Some(GraphRef {
                        graph_id: left_id,
                        rel_x: 1.0,
                        rel_y: 0.0,
                    });
                    end.graph_ref = Some(GraphRef {
                        graph_id: right_id,
                        rel_x: -1.0,
                        rel_y: 0.0,
                    });
                    *end_type = LineType::Arrow;
                }
                let a = self.pathway.add(a);
                let b = self.pathway.add(b);
                let l = self.pathway.add(line);
                (vec![a, b, l], None, false)
            }
        };
        self.process_model_events();

        if let Template::Line(_) = template {
            if let Some(line) = elements.first() {
                self.link_line_end(*line, LineEnd::Start, p, false);
                self.process_model_events();
            }
        }

        let graphics: Vec<ViewId> = elements.iter().filter_map(|e| self.graphics_of(*e)).collect();
        self.set_selection(graphics.clone());
        let drag_handle = drag.and_then(|(element, position)| self.handle_at_position(element, position));
        Placement {
            elements,
            graphics,
            drag_handle,
            default_size,
        }
    }
}
