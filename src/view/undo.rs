use super::Canvas;
use super::events::ViewEvent;
use crate::model::Pathway;

const LIMIT: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UndoKind {
    Move,
    Resize,
    Rotate,
    NewObject,
    Delete,
    Paste,
    Group,
    ZOrder,
    Layout,
    AddAnchor,
}

impl UndoKind {
    pub fn label(self) -> &'static str {
        match self {
            UndoKind::Move => "Move object",
            UndoKind::Resize => "Resize object",
            UndoKind::Rotate => "Rotate object",
            UndoKind::NewObject => "New object",
            UndoKind::Delete => "Delete",
            UndoKind::Paste => "Paste",
            UndoKind::Group => "Group",
            UndoKind::ZOrder => "Change z-order",
            UndoKind::Layout => "Layout",
            UndoKind::AddAnchor => "Add anchor",
        }
    }
}

#[derive(Clone, Debug)]
pub struct UndoAction {
    pub kind: UndoKind,
    pub before: Pathway,
    pub after: Pathway,
}

/// What the canvas needs from an undo stack: a snapshot when a change starts
/// and one commit per finished change.
pub trait UndoManager {
    fn change_start(&mut self, pathway: &Pathway) -> crate::Result<Pathway>;

    fn commit(&mut self, action: UndoAction) -> crate::Result<()>;

    /// State to restore for an undo, if the manager keeps one.
    fn undo(&mut self) -> Option<Pathway> {
        None
    }

    fn redo(&mut self) -> Option<Pathway> {
        None
    }
}

/// Bounded in-memory stack of undo actions.
#[derive(Default)]
pub struct History {
    past: Vec<UndoAction>,
    future: Vec<UndoAction>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.past.is_empty()
    }

    pub fn last(&self) -> Option<&UndoAction> {
        self.past.last()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}

impl UndoManager for History {
    fn change_start(&mut self, pathway: &Pathway) -> crate::Result<Pathway> {
        Ok(pathway.clone())
    }

    fn commit(&mut self, action: UndoAction) -> crate::Result<()> {
        tracing::debug!(kind = action.kind.label(), "undo action recorded");
        self.past.push(action);
        if self.past.len() > LIMIT {
            let overflow = self.past.len() - LIMIT;
            self.past.drain(0..overflow);
        }
        self.future.clear();
        Ok(())
    }

    fn undo(&mut self) -> Option<Pathway> {
        let action = self.past.pop()?;
        let state = action.before.clone();
        self.future.push(action);
        Some(state)
    }

    fn redo(&mut self) -> Option<Pathway> {
        let action = self.future.pop()?;
        let state = action.after.clone();
        self.past.push(action);
        Some(state)
    }
}

impl Canvas {
    /// Arms the undo manager for a change. When it fails the failure is
    /// reported and a local snapshot stands in, so the edit still goes ahead.
    pub(super) fn change_start(&mut self) -> Pathway {
        match self.undo.change_start(&self.pathway) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "undo change start failed");
                self.emit(ViewEvent::UndoFailed(e.to_string()));
                self.pathway.clone()
            }
        }
    }

    /// Records one action when the model differs from `before`.
    pub(super) fn commit_change(&mut self, kind: UndoKind, before: Pathway) {
        if before == self.pathway {
            tracing::debug!(kind = kind.label(), "no net change, nothing to commit");
            return;
        }
        let action = UndoAction {
            kind,
            before,
            after: self.pathway.clone(),
        };
        if let Err(e) = self.undo.commit(action) {
            tracing::warn!(error = %e, kind = kind.label(), "undo commit failed");
            self.emit(ViewEvent::UndoFailed(e.to_string()));
        }
    }

    pub fn undo(&mut self) {
        if !self.state.is_idle() {
            return;
        }
        if let Some(state) = self.undo.undo() {
            self.replace_pathway(state);
        }
    }

    pub fn redo(&mut self) {
        if !self.state.is_idle() {
            return;
        }
        if let Some(state) = self.undo.redo() {
            self.replace_pathway(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathwayElement, ShapeGeom, ShapeType};

    fn action(n: usize) -> UndoAction {
        let mut after = Pathway::new();
        for _ in 0..n {
            after.add(PathwayElement::shape(
                ShapeType::Rectangle,
                ShapeGeom::from_left_top(0.0, 0.0, 1.0, 1.0),
            ));
        }
        UndoAction {
            kind: UndoKind::NewObject,
            before: Pathway::new(),
            after,
        }
    }

    #[test]
    fn history_is_bounded() {
        let mut h = History::new();
        for _ in 0..(LIMIT + 5) {
            h.commit(action(0)).unwrap();
        }
        assert_eq!(h.len(), LIMIT);
    }

    #[test]
    fn undo_then_redo_walks_the_stack() {
        let mut h = History::new();
        h.commit(action(2)).unwrap();
        assert_eq!(h.undo().map(|p| p.len()), Some(0));
        assert!(h.can_redo());
        assert_eq!(h.redo().map(|p| p.len()), Some(2));
        assert!(h.undo().is_some());
        h.commit(action(1)).unwrap();
        assert!(!h.can_redo());
    }
}
