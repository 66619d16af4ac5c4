use eframe::egui;

use crate::model::ElementId;

#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    SelectionChanged(Vec<ElementId>),
    ElementClickedDown { element: ElementId, pos: egui::Pos2 },
    ElementClickedUp { element: ElementId, pos: egui::Pos2 },
    ElementDoubleClicked(ElementId),
    ElementAdded(ElementId),
    MouseEnter(ElementId),
    MouseExit(ElementId),
    /// The cursor rested on an element for the hover delay.
    ElementHover(ElementId),
    HrefActivated(String),
    UndoFailed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ViewEvent)>;

#[derive(Default)]
pub(crate) struct Listeners {
    next: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub fn add(&mut self, listener: Listener) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(l, _)| *l != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &ViewEvent) {
        tracing::trace!(?event, "view event");
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn removed_listeners_stop_receiving() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let sink = seen.clone();
        let id = listeners.add(Box::new(move |e| sink.borrow_mut().push(e.clone())));
        listeners.emit(&ViewEvent::ElementAdded(ElementId(1)));
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit(&ViewEvent::ElementAdded(ElementId(2)));
        assert_eq!(*seen.borrow(), vec![ViewEvent::ElementAdded(ElementId(1))]);
    }
}
