use eframe::egui;

use super::handle::{Freedom, HandlePosition};
use crate::model::{ElementId, ElementKind};

pub const ZORDER_SELECTION_BOX: i32 = i32::MAX;
pub const ZORDER_HANDLE: i32 = i32::MAX - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphicsKind {
    DataNode,
    Label,
    Shape,
    Line,
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorDensity {
    None,
    PerSide,
    /// Only the line anchors the line carries.
    OnLine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub resizable: bool,
    pub rotatable: bool,
    pub anchor_density: AnchorDensity,
}

impl Capabilities {
    pub fn link_provider(&self) -> bool {
        self.anchor_density != AnchorDensity::None
    }
}

impl GraphicsKind {
    pub fn of(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::DataNode { .. } => GraphicsKind::DataNode,
            ElementKind::Label { .. } => GraphicsKind::Label,
            ElementKind::Shape { .. } => GraphicsKind::Shape,
            ElementKind::Line { .. } => GraphicsKind::Line,
            ElementKind::Group { .. } => GraphicsKind::Group,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            GraphicsKind::DataNode | GraphicsKind::Label => Capabilities {
                resizable: true,
                rotatable: false,
                anchor_density: AnchorDensity::PerSide,
            },
            GraphicsKind::Shape => Capabilities {
                resizable: true,
                rotatable: true,
                anchor_density: AnchorDensity::PerSide,
            },
            GraphicsKind::Line => Capabilities {
                resizable: false,
                rotatable: false,
                anchor_density: AnchorDensity::OnLine,
            },
            GraphicsKind::Group => Capabilities {
                resizable: false,
                rotatable: false,
                anchor_density: AnchorDensity::PerSide,
            },
        }
    }

    /// Handles shown while an element of this kind is selected.
    pub fn handle_positions(self) -> Vec<HandlePosition> {
        let caps = self.capabilities();
        let mut out = Vec::new();
        if self == GraphicsKind::Line {
            out.push(HandlePosition::LineStart);
            out.push(HandlePosition::LineEnd);
        }
        if caps.resizable {
            out.extend(HandlePosition::RESIZE);
        }
        if caps.rotatable {
            out.push(HandlePosition::Rotate);
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct Graphics {
    pub element: ElementId,
    pub kind: GraphicsKind,
    pub(crate) handles: Vec<ViewId>,
    pub(crate) children: Vec<ViewId>,
}

impl Graphics {
    pub fn handles(&self) -> &[ViewId] {
        &self.handles
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }
}

#[derive(Clone, Debug)]
pub struct Handle {
    pub owner: ViewId,
    pub position: HandlePosition,
    pub freedom: Freedom,
    pub angle: f32,
    /// Model location, refreshed whenever the owner changes.
    pub location: egui::Pos2,
}

/// Numbered marker drawn at the top right corner of an element with citations.
#[derive(Clone, Debug)]
pub struct Citation {
    pub owner: ViewId,
    pub number: usize,
    pub location: egui::Pos2,
}

#[derive(Clone, Debug)]
pub enum ViewKind {
    Graphics(Graphics),
    Handle(Handle),
    Citation(Citation),
}

#[derive(Clone, Debug)]
pub struct ViewElement {
    pub(crate) id: ViewId,
    pub z_order: i32,
    pub selected: bool,
    pub dirty: bool,
    pub kind: ViewKind,
    /// View bounds at the last redraw request, so moves repaint the old area.
    pub(crate) last_bounds: Option<egui::Rect>,
}

impl ViewElement {
    pub(crate) fn new(id: ViewId, z_order: i32, kind: ViewKind) -> Self {
        Self {
            id,
            z_order,
            selected: false,
            dirty: true,
            kind,
            last_bounds: None,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn as_graphics(&self) -> Option<&Graphics> {
        match &self.kind {
            ViewKind::Graphics(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match &self.kind {
            ViewKind::Handle(h) => Some(h),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<ElementId> {
        self.as_graphics().map(|g| g.element)
    }

    pub fn owner(&self) -> Option<ViewId> {
        match &self.kind {
            ViewKind::Graphics(_) => None,
            ViewKind::Handle(h) => Some(h.owner),
            ViewKind::Citation(c) => Some(c.owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        assert!(GraphicsKind::Shape.capabilities().rotatable);
        assert!(!GraphicsKind::DataNode.capabilities().rotatable);
        assert!(!GraphicsKind::Line.capabilities().link_provider());
        assert!(GraphicsKind::Group.capabilities().link_provider());
        assert_eq!(GraphicsKind::Shape.handle_positions().len(), 9);
        assert_eq!(
            GraphicsKind::Line.handle_positions(),
            vec![HandlePosition::LineStart, HandlePosition::LineEnd]
        );
        assert!(GraphicsKind::Group.handle_positions().is_empty());
    }
}
