use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::view::geometry::rotate_vec2;

/// Smallest linkable size along one axis; below it a side carries one anchor.
pub const MIN_SIZE_LA: f32 = 25.0;

pub const M_INITIAL_SHAPE_SIZE: f32 = 30.0;
pub const M_INITIAL_BRACE_WIDTH: f32 = 60.0;
pub const M_INITIAL_BRACE_HEIGHT: f32 = 15.0;
pub const M_INITIAL_DATANODE_WIDTH: f32 = 80.0;
pub const M_INITIAL_DATANODE_HEIGHT: f32 = 20.0;
pub const M_INITIAL_LABEL_WIDTH: f32 = 90.0;
pub const M_INITIAL_LABEL_HEIGHT: f32 = 25.0;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Double,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum LineType {
    #[default]
    Line,
    Arrow,
    TBar,
    Receptor,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DataNodeType {
    #[default]
    GeneProduct,
    Protein,
    Rna,
    Metabolite,
    Pathway,
    Complex,
    Unknown,
}

impl DataNodeType {
    pub fn name(self) -> &'static str {
        match self {
            DataNodeType::GeneProduct => "GeneProduct",
            DataNodeType::Protein => "Protein",
            DataNodeType::Rna => "Rna",
            DataNodeType::Metabolite => "Metabolite",
            DataNodeType::Pathway => "Pathway",
            DataNodeType::Complex => "Complex",
            DataNodeType::Unknown => "Unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ShapeType {
    #[default]
    Rectangle,
    RoundedRectangle,
    Oval,
    Triangle,
    Hexagon,
    Brace,
    Arc,
    None,
}

impl ShapeType {
    pub fn is_elliptic(self) -> bool {
        matches!(self, ShapeType::Oval | ShapeType::Arc)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum GroupStyle {
    #[default]
    None,
    Group,
    Complex,
    Pathway,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Style {
    pub line_color: Rgba,
    pub fill_color: Rgba,
    pub line_thickness: f32,
    pub line_style: LineStyle,
    pub transparent: bool,
    pub font_size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            line_color: Rgba::BLACK,
            fill_color: Rgba::WHITE,
            line_thickness: 1.0,
            line_style: LineStyle::Solid,
            transparent: false,
            font_size: 12.0,
        }
    }
}

/// Centre-based geometry of a rectangular element; rotation in radians.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ShapeGeom {
    pub center: Point,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation: f32,
}

impl ShapeGeom {
    pub fn from_left_top(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            center: Point::new(left + width * 0.5, top + height * 0.5),
            width,
            height,
            rotation: 0.0,
        }
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.width * 0.5
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.height * 0.5
    }

    /// Unrotated model rectangle.
    pub fn rect(&self) -> egui::Rect {
        egui::Rect::from_center_size(self.center.to_pos2(), egui::vec2(self.width, self.height))
    }

    /// Model position of the fractional offset `(fx, fy)`, both in `[-1, 1]`,
    /// in the rotated frame of this shape.
    pub fn relative_to_model(&self, fx: f32, fy: f32) -> egui::Pos2 {
        let local = egui::vec2(fx * self.width * 0.5, fy * self.height * 0.5);
        self.center.to_pos2() + rotate_vec2(local, self.rotation)
    }

    /// Axis aligned bounds of the rotated rectangle.
    pub fn rotated_bounds(&self) -> egui::Rect {
        let mut out = egui::Rect::NOTHING;
        for (fx, fy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            out.extend_with(self.relative_to_model(fx, fy));
        }
        out
    }
}

/// Persisted reference from a line point to an anchor on another element.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphRef {
    pub graph_id: String,
    pub rel_x: f32,
    pub rel_y: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LinePoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub graph_ref: Option<GraphRef>,
}

impl LinePoint {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            graph_ref: None,
        }
    }

    pub fn pos(&self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }

    pub fn is_linked(&self) -> bool {
        self.graph_ref.is_some()
    }
}

/// Point on a line that other line ends can link to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineAnchor {
    /// Fraction of the way from the start to the end.
    pub position: f32,
    #[serde(default)]
    pub graph_id: Option<String>,
}

impl LineAnchor {
    pub fn at(position: f32) -> Self {
        Self {
            position: position.clamp(0.0, 1.0),
            graph_id: None,
        }
    }

    pub fn location(&self, start: &LinePoint, end: &LinePoint) -> egui::Pos2 {
        start.pos().lerp(end.pos(), self.position)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ElementKind {
    DataNode {
        geom: ShapeGeom,
        #[serde(default)]
        label: String,
        #[serde(default)]
        node_type: DataNodeType,
    },
    Label {
        geom: ShapeGeom,
        #[serde(default)]
        text: String,
        #[serde(default)]
        href: String,
    },
    Shape {
        geom: ShapeGeom,
        #[serde(default)]
        shape_type: ShapeType,
    },
    Line {
        start: LinePoint,
        end: LinePoint,
        #[serde(default)]
        end_type: LineType,
        #[serde(default)]
        anchors: Vec<LineAnchor>,
    },
    Group {
        #[serde(default)]
        style: GroupStyle,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PathwayElement {
    #[serde(default)]
    pub id: ElementId,
    #[serde(default)]
    pub graph_id: Option<String>,
    /// Only set on group elements; members point at it through `group_ref`.
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_ref: Option<String>,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub citations: Vec<String>,
    pub kind: ElementKind,
    #[serde(default)]
    pub style: Style,
}

impl PathwayElement {
    pub fn new(kind: ElementKind) -> Self {
        let mut style = Style::default();
        if let ElementKind::Label { .. } | ElementKind::Group { .. } = kind {
            style.transparent = true;
        }
        Self {
            id: ElementId::default(),
            graph_id: None,
            group_id: None,
            group_ref: None,
            z_order: 0,
            citations: Vec::new(),
            kind,
            style,
        }
    }

    pub fn data_node(node_type: DataNodeType, geom: ShapeGeom) -> Self {
        Self::new(ElementKind::DataNode {
            geom,
            label: node_type.name().to_string(),
            node_type,
        })
    }

    pub fn label(text: &str, geom: ShapeGeom) -> Self {
        Self::new(ElementKind::Label {
            geom,
            text: text.to_string(),
            href: String::new(),
        })
    }

    pub fn shape(shape_type: ShapeType, geom: ShapeGeom) -> Self {
        Self::new(ElementKind::Shape { geom, shape_type })
    }

    pub fn line(start: Point, end: Point) -> Self {
        Self::new(ElementKind::Line {
            start: LinePoint::at(start.x, start.y),
            end: LinePoint::at(end.x, end.y),
            end_type: LineType::Line,
            anchors: Vec::new(),
        })
    }

    pub fn group(style: GroupStyle) -> Self {
        Self::new(ElementKind::Group { style })
    }

    pub fn with_graph_id(mut self, graph_id: &str) -> Self {
        self.graph_id = Some(graph_id.to_string());
        self
    }

    pub fn with_z_order(mut self, z: i32) -> Self {
        self.z_order = z;
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ElementKind::Group { .. })
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, ElementKind::Line { .. })
    }

    pub fn geom(&self) -> Option<&ShapeGeom> {
        match &self.kind {
            ElementKind::DataNode { geom, .. }
            | ElementKind::Label { geom, .. }
            | ElementKind::Shape { geom, .. } => Some(geom),
            _ => None,
        }
    }

    pub fn geom_mut(&mut self) -> Option<&mut ShapeGeom> {
        match &mut self.kind {
            ElementKind::DataNode { geom, .. }
            | ElementKind::Label { geom, .. }
            | ElementKind::Shape { geom, .. } => Some(geom),
            _ => None,
        }
    }

    pub fn line_points(&self) -> Option<(&LinePoint, &LinePoint)> {
        match &self.kind {
            ElementKind::Line { start, end, .. } => Some((start, end)),
            _ => None,
        }
    }

    pub fn line_anchors(&self) -> &[LineAnchor] {
        match &self.kind {
            ElementKind::Line { anchors, .. } => anchors,
            _ => &[],
        }
    }

    /// Graph ids of the element and of its line anchors.
    pub fn link_target_ids(&self) -> Vec<String> {
        self.graph_id
            .iter()
            .chain(self.line_anchors().iter().filter_map(|a| a.graph_id.as_ref()))
            .cloned()
            .collect()
    }

    /// Model-space bounds; groups have none of their own.
    pub fn own_bounds(&self) -> Option<egui::Rect> {
        match &self.kind {
            ElementKind::Line { start, end, .. } => {
                Some(egui::Rect::from_two_pos(start.pos(), end.pos()))
            }
            ElementKind::Group { .. } => None,
            _ => self.geom().map(|g| g.rotated_bounds()),
        }
    }

    pub fn translate(&mut self, delta: egui::Vec2) {
        match &mut self.kind {
            ElementKind::DataNode { geom, .. }
            | ElementKind::Label { geom, .. }
            | ElementKind::Shape { geom, .. } => {
                geom.center.x += delta.x;
                geom.center.y += delta.y;
            }
            ElementKind::Line { start, end, .. } => {
                for p in [start, end] {
                    if p.graph_ref.is_none() {
                        p.x += delta.x;
                        p.y += delta.y;
                    }
                }
            }
            ElementKind::Group { .. } => {}
        }
    }

    /// Default size used when an element is placed with a click instead of a drag.
    pub fn set_initial_size(&mut self) {
        match &mut self.kind {
            ElementKind::DataNode { geom, .. } => {
                geom.width = M_INITIAL_DATANODE_WIDTH;
                geom.height = M_INITIAL_DATANODE_HEIGHT;
            }
            ElementKind::Label { geom, .. } => {
                geom.width = M_INITIAL_LABEL_WIDTH;
                geom.height = M_INITIAL_LABEL_HEIGHT;
            }
            ElementKind::Shape { geom, shape_type } => {
                if *shape_type == ShapeType::Brace {
                    geom.width = M_INITIAL_BRACE_WIDTH;
                    geom.height = M_INITIAL_BRACE_HEIGHT;
                } else {
                    geom.width = M_INITIAL_SHAPE_SIZE;
                    geom.height = M_INITIAL_SHAPE_SIZE;
                }
            }
            ElementKind::Line { start, end, .. } => {
                end.x = start.x + M_INITIAL_SHAPE_SIZE;
                end.y = start.y + M_INITIAL_SHAPE_SIZE;
            }
            ElementKind::Group { .. } => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelEvent {
    Added(ElementId),
    Removed(ElementId),
    Modified(ElementId),
}

/// The pathway model the canvas observes. Every mutation goes through
/// `add`, `remove` or `modify` so that a change event is queued.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Pathway {
    #[serde(default)]
    elements: Vec<PathwayElement>,
    #[serde(skip)]
    events: Vec<ModelEvent>,
    #[serde(skip)]
    id_counter: u64,
}

impl PartialEq for Pathway {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl Pathway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let mut pathway: Pathway = serde_json::from_str(json)?;
        pathway.normalize_ids();
        Ok(pathway)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // Loaded documents may omit or repeat element ids.
    fn normalize_ids(&mut self) {
        let mut seen = HashSet::new();
        let mut next = self.elements.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        for e in &mut self.elements {
            if e.id.0 == 0 || !seen.insert(e.id) {
                e.id = ElementId(next);
                seen.insert(e.id);
                next += 1;
            }
        }
    }

    pub fn elements(&self) -> &[PathwayElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&PathwayElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element(&self, id: ElementId) -> crate::Result<&PathwayElement> {
        self.get(id).ok_or(crate::Error::UnknownElement { id })
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    fn next_element_id(&self) -> ElementId {
        ElementId(self.elements.iter().map(|e| e.id.0).max().unwrap_or(0) + 1)
    }

    pub fn add(&mut self, mut element: PathwayElement) -> ElementId {
        if element.id.0 == 0 || self.contains(element.id) {
            element.id = self.next_element_id();
        }
        let id = element.id;
        self.elements.push(element);
        self.events.push(ModelEvent::Added(id));
        id
    }

    /// Removes an element. Removing a group hands its members to the
    /// enclosing group, if any.
    pub fn remove(&mut self, id: ElementId) -> Option<PathwayElement> {
        let idx = self.elements.iter().position(|e| e.id == id)?;
        let removed = self.elements.remove(idx);
        self.events.push(ModelEvent::Removed(id));
        if let (true, Some(group_id)) = (removed.is_group(), removed.group_id.as_deref()) {
            let parent = removed.group_ref.clone();
            for e in &mut self.elements {
                if e.group_ref.as_deref() == Some(group_id) {
                    e.group_ref = parent.clone();
                    self.events.push(ModelEvent::Modified(e.id));
                }
            }
        }
        Some(removed)
    }

    pub fn modify<R>(&mut self, id: ElementId, f: impl FnOnce(&mut PathwayElement) -> R) -> Option<R> {
        let element = self.elements.iter_mut().find(|e| e.id == id)?;
        let out = f(element);
        self.events.push(ModelEvent::Modified(id));
        Some(out)
    }

    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn id_in_use(&self, candidate: &str) -> bool {
        self.elements.iter().any(|e| {
            e.graph_id.as_deref() == Some(candidate)
                || e.group_id.as_deref() == Some(candidate)
                || e.line_anchors()
                    .iter()
                    .any(|a| a.graph_id.as_deref() == Some(candidate))
        })
    }

    /// Generates an id not used as a graph id or group id in this pathway.
    pub fn unique_graph_id(&mut self) -> String {
        loop {
            self.id_counter += 1;
            let candidate = format!("id{:05x}", self.id_counter);
            if !self.id_in_use(&candidate) {
                return candidate;
            }
        }
    }

    pub fn unique_group_id(&mut self) -> String {
        self.unique_graph_id()
    }

    pub fn find_by_graph_id(&self, graph_id: &str) -> Option<&PathwayElement> {
        self.elements
            .iter()
            .find(|e| e.graph_id.as_deref() == Some(graph_id))
    }

    /// Line and index of the line anchor carrying `graph_id`.
    pub fn find_line_anchor(&self, graph_id: &str) -> Option<(ElementId, usize)> {
        self.elements.iter().find_map(|e| {
            e.line_anchors()
                .iter()
                .position(|a| a.graph_id.as_deref() == Some(graph_id))
                .map(|i| (e.id, i))
        })
    }

    pub fn find_group(&self, group_id: &str) -> Option<&PathwayElement> {
        self.elements
            .iter()
            .find(|e| e.is_group() && e.group_id.as_deref() == Some(group_id))
    }

    /// Direct members of a group.
    pub fn group_members(&self, group_id: &str) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| e.group_ref.as_deref() == Some(group_id))
            .map(|e| e.id)
            .collect()
    }

    /// Leaf members of a group, descending into nested groups.
    pub fn group_members_recursive(&self, group_id: &str) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![group_id.to_string()];
        let mut visited = HashSet::new();
        while let Some(g) = stack.pop() {
            if !visited.insert(g.clone()) {
                continue;
            }
            for e in &self.elements {
                if e.group_ref.as_deref() != Some(g.as_str()) {
                    continue;
                }
                match (e.is_group(), e.group_id.as_ref()) {
                    (true, Some(child)) => stack.push(child.clone()),
                    _ => out.push(e.id),
                }
            }
        }
        out
    }

    /// Group element an element belongs to directly.
    pub fn parent_group(&self, id: ElementId) -> Option<ElementId> {
        let group_ref = self.get(id)?.group_ref.as_deref()?;
        self.find_group(group_ref).map(|g| g.id)
    }

    /// Outermost enclosing group, following `group_ref` chains.
    pub fn root_group(&self, id: ElementId) -> Option<ElementId> {
        let mut current = self.parent_group(id)?;
        for _ in 0..256 {
            match self.parent_group(current) {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
        Some(current)
    }

    /// Model bounds, including the union of members for groups.
    pub fn element_bounds(&self, id: ElementId) -> Option<egui::Rect> {
        let element = self.get(id)?;
        if let Some(b) = element.own_bounds() {
            return Some(b);
        }
        let group_id = element.group_id.as_deref()?;
        let bounds = self
            .group_members_recursive(group_id)
            .into_iter()
            .filter_map(|m| self.get(m).and_then(|e| e.own_bounds()))
            .reduce(|a, b| a.union(b))?;
        Some(bounds)
    }

    pub fn max_z_order(&self) -> i32 {
        self.elements.iter().map(|e| e.z_order).max().unwrap_or(0)
    }

    pub fn min_z_order(&self) -> i32 {
        self.elements.iter().map(|e| e.z_order).min().unwrap_or(0)
    }

    /// Model position of an anchor on the element carrying `graph_id`.
    /// Line anchors ignore the relative coordinates.
    pub fn anchor_position(&self, graph_id: &str, rel_x: f32, rel_y: f32) -> Option<egui::Pos2> {
        let Some(target) = self.find_by_graph_id(graph_id) else {
            let (line, index) = self.find_line_anchor(graph_id)?;
            let line = self.get(line)?;
            let (start, end) = line.line_points()?;
            return Some(line.line_anchors().get(index)?.location(start, end));
        };
        if let Some(geom) = target.geom() {
            return Some(geom.relative_to_model(rel_x, rel_y));
        }
        let bounds = self.element_bounds(target.id)?;
        let geom = ShapeGeom {
            center: Point::from_pos2(bounds.center()),
            width: bounds.width(),
            height: bounds.height(),
            rotation: 0.0,
        };
        Some(geom.relative_to_model(rel_x, rel_y))
    }

    /// True when any line point other than `except` references `graph_id`.
    pub fn is_referenced(&self, graph_id: &str, except: Option<(ElementId, bool)>) -> bool {
        self.elements.iter().any(|e| {
            let Some((start, end)) = e.line_points() else {
                return false;
            };
            [(start, true), (end, false)].into_iter().any(|(p, is_start)| {
                except != Some((e.id, is_start))
                    && p.graph_ref.as_ref().is_some_and(|r| r.graph_id == graph_id)
            })
        })
    }

    /// Moves every line point linked to `graph_id` onto its anchor.
    pub fn sync_links_to(&mut self, graph_id: &str) {
        let mut updates = Vec::new();
        for e in &self.elements {
            let Some((start, end)) = e.line_points() else {
                continue;
            };
            for (p, is_start) in [(start, true), (end, false)] {
                let Some(r) = p.graph_ref.as_ref().filter(|r| r.graph_id == graph_id) else {
                    continue;
                };
                if let Some(pos) = self.anchor_position(&r.graph_id, r.rel_x, r.rel_y) {
                    if pos != p.pos() {
                        updates.push((e.id, is_start, pos));
                    }
                }
            }
        }
        for (id, is_start, pos) in updates {
            self.modify(id, |e| {
                if let ElementKind::Line { start, end, .. } = &mut e.kind {
                    let p = if is_start { start } else { end };
                    p.x = pos.x;
                    p.y = pos.y;
                }
            });
        }
    }

    /// Clears every reference to `graph_id`, leaving points where they are.
    pub fn unlink_all(&mut self, graph_id: &str) {
        let ids: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|e| {
                e.line_points().is_some_and(|(s, t)| {
                    [s, t]
                        .iter()
                        .any(|p| p.graph_ref.as_ref().is_some_and(|r| r.graph_id == graph_id))
                })
            })
            .map(|e| e.id)
            .collect();
        for id in ids {
            self.modify(id, |e| {
                if let ElementKind::Line { start, end, .. } = &mut e.kind {
                    for p in [start, end] {
                        if p.graph_ref.as_ref().is_some_and(|r| r.graph_id == graph_id) {
                            p.graph_ref = None;
                        }
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(left: f32, top: f32, w: f32, h: f32) -> PathwayElement {
        PathwayElement::shape(ShapeType::Rectangle, ShapeGeom::from_left_top(left, top, w, h))
    }

    #[test]
    fn add_assigns_fresh_ids_and_queues_events() {
        let mut p = Pathway::new();
        let a = p.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = p.add(rect(0.0, 0.0, 10.0, 10.0));
        assert_ne!(a, b);
        assert_eq!(
            p.take_events(),
            vec![ModelEvent::Added(a), ModelEvent::Added(b)]
        );
        assert!(!p.has_pending_events());
    }

    #[test]
    fn looking_up_a_missing_element_is_an_error() {
        let mut p = Pathway::new();
        let a = p.add(rect(0.0, 0.0, 10.0, 10.0));
        assert!(p.element(a).is_ok());
        assert!(matches!(
            p.element(ElementId(99)),
            Err(crate::Error::UnknownElement { id: ElementId(99) })
        ));
    }

    #[test]
    fn line_anchors_resolve_along_their_line() {
        let mut p = Pathway::new();
        let mut line = PathwayElement::line(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        if let ElementKind::Line { anchors, .. } = &mut line.kind {
            anchors.push(LineAnchor::at(0.5));
            anchors.push(LineAnchor {
                graph_id: Some("m1".to_string()),
                ..LineAnchor::at(1.5)
            });
        }
        let l = p.add(line);

        assert_eq!(p.find_line_anchor("m1"), Some((l, 1)));
        assert_eq!(p.find_line_anchor("m2"), None);
        assert!(p.id_in_use("m1"));
        assert_eq!(p.anchor_position("m1", 0.3, -1.0), Some(egui::pos2(200.0, 100.0)));
        assert_eq!(p.get(l).unwrap().link_target_ids(), vec!["m1".to_string()]);
    }

    #[test]
    fn unique_graph_ids_skip_ids_in_use() {
        let mut p = Pathway::new();
        p.add(rect(0.0, 0.0, 1.0, 1.0).with_graph_id("id00001"));
        let id = p.unique_graph_id();
        assert_ne!(id, "id00001");
        assert!(p.find_by_graph_id(&id).is_none());
    }

    #[test]
    fn removing_a_nested_group_hands_members_to_parent() {
        let mut p = Pathway::new();
        let mut outer = PathwayElement::group(GroupStyle::None);
        outer.group_id = Some("outer".into());
        let mut inner = PathwayElement::group(GroupStyle::None);
        inner.group_id = Some("inner".into());
        inner.group_ref = Some("outer".into());
        let mut a = rect(0.0, 0.0, 10.0, 10.0);
        a.group_ref = Some("inner".into());
        p.add(outer);
        let inner = p.add(inner);
        let a = p.add(a);
        assert_eq!(p.group_members_recursive("outer"), vec![a]);

        p.remove(inner);
        assert_eq!(p.get(a).unwrap().group_ref.as_deref(), Some("outer"));
    }

    #[test]
    fn group_bounds_are_the_union_of_members() {
        let mut p = Pathway::new();
        let mut g = PathwayElement::group(GroupStyle::Group);
        g.group_id = Some("g".into());
        let g = p.add(g);
        let mut a = rect(0.0, 0.0, 10.0, 10.0);
        a.group_ref = Some("g".into());
        let mut b = rect(50.0, 20.0, 10.0, 10.0);
        b.group_ref = Some("g".into());
        p.add(a);
        p.add(b);
        let bounds = p.element_bounds(g).unwrap();
        assert_eq!(bounds, egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(60.0, 30.0)));
    }

    #[test]
    fn linked_points_follow_their_target() {
        let mut p = Pathway::new();
        let a = p.add(rect(0.0, 0.0, 100.0, 40.0).with_graph_id("A"));
        let mut line = PathwayElement::line(Point::new(200.0, 20.0), Point::new(100.0, 20.0));
        if let ElementKind::Line { end, .. } = &mut line.kind {
            end.graph_ref = Some(GraphRef {
                graph_id: "A".into(),
                rel_x: 1.0,
                rel_y: 0.0,
            });
        }
        let l = p.add(line);
        p.modify(a, |e| e.translate(egui::vec2(10.0, 5.0)));
        p.sync_links_to("A");
        let (_, end) = p.get(l).unwrap().line_points().unwrap();
        assert_eq!(end.pos(), egui::pos2(110.0, 25.0));
        assert!(end.is_linked());
    }

    #[test]
    fn json_round_trip_normalizes_missing_ids() {
        let json = r#"{"elements":[
            {"kind":{"Shape":{"geom":{"center":{"x":5,"y":5},"width":10,"height":10}}}},
            {"kind":{"Shape":{"geom":{"center":{"x":5,"y":5},"width":10,"height":10}}}}
        ]}"#;
        let p = Pathway::from_json(json).unwrap();
        assert_eq!(p.len(), 2);
        assert_ne!(p.elements()[0].id, p.elements()[1].id);
    }
}
