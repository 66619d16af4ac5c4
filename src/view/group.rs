use std::collections::HashSet;

use super::Canvas;
use super::undo::UndoKind;
use crate::model::{ElementId, GroupStyle, PathwayElement};

/// How a selected element relates to existing groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Membership {
    /// The element is itself a group.
    Unit(ElementId),
    /// The element belongs to this outermost group.
    Member(ElementId),
    Loose,
}

impl Canvas {
    fn membership(&self, element: ElementId) -> Membership {
        if self.pathway.get(element).is_some_and(|e| e.is_group()) {
            return Membership::Unit(element);
        }
        match self.pathway.root_group(element) {
            Some(root) => Membership::Member(root),
            None => Membership::Loose,
        }
    }

    /// Every element under a group, nested groups included.
    pub(super) fn group_closure(&self, group_id: &str) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![group_id.to_string()];
        let mut seen = HashSet::new();
        while let Some(g) = stack.pop() {
            if !seen.insert(g.clone()) {
                continue;
            }
            for id in self.pathway.group_members(&g) {
                out.push(id);
                if let Some(child) = self.pathway.get(id).and_then(|e| e.group_id.clone()) {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Selected elements plus everything inside selected groups, each once.
    pub(super) fn selection_closure(&self) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for element in self.selected_elements() {
            if seen.insert(element) {
                out.push(element);
            }
            let Some(group_id) = self.pathway.get(element).and_then(|e| e.group_id.clone()) else {
                continue;
            };
            for member in self.group_closure(&group_id) {
                if seen.insert(member) {
                    out.push(member);
                }
            }
        }
        out
    }

    /// Non-group elements a move of the selection has to translate.
    pub(super) fn moving_elements(&self) -> Vec<ElementId> {
        self.selection_closure()
            .into_iter()
            .filter(|e| self.pathway.get(*e).is_some_and(|e| !e.is_group()))
            .collect()
    }

    fn enclosing_groups(&self, element: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut current = element;
        for _ in 0..256 {
            match self.pathway.parent_group(current) {
                Some(g) => {
                    out.push(g);
                    current = g;
                }
                None => break,
            }
        }
        out
    }

    pub(super) fn leaf_members(&self, group: ElementId) -> Vec<ElementId> {
        self.pathway
            .get(group)
            .and_then(|e| e.group_id.clone())
            .map(|gid| self.pathway.group_members_recursive(&gid))
            .unwrap_or_default()
    }

    /// Groups the selection, or dissolves it when it already is exactly one
    /// group. A mixed selection dissolves every group it touches and forms a
    /// single new group over the resolved members.
    pub fn toggle_group(&mut self) {
        self.toggle_group_as(GroupStyle::Group);
    }

    /// Same as `toggle_group`, but a new group is a complex.
    pub fn toggle_complex(&mut self) {
        self.toggle_group_as(GroupStyle::Complex);
    }

    fn toggle_group_as(&mut self, style: GroupStyle) {
        let selected = self.selected_elements();
        if selected.is_empty() {
            return;
        }
        let before = self.change_start();
        let classes: Vec<Membership> = selected.iter().map(|e| self.membership(*e)).collect();

        let first = classes[0];
        let uniform = match first {
            Membership::Unit(g) | Membership::Member(g) => {
                classes.iter().all(|c| *c == first).then_some(g)
            }
            Membership::Loose => None,
        };
        if let Some(group) = uniform {
            tracing::debug!(%group, "dissolving group");
            self.pathway.remove(group);
            self.process_model_events();
            self.clear_selection();
            self.commit_change(UndoKind::Group, before);
            return;
        }

        let mut leaves: Vec<ElementId> = Vec::new();
        let mut dissolve: HashSet<ElementId> = HashSet::new();
        for (element, class) in selected.iter().zip(&classes) {
            dissolve.extend(self.enclosing_groups(*element));
            match class {
                Membership::Unit(g) => {
                    dissolve.insert(*g);
                    if let Some(gid) = self.pathway.get(*g).and_then(|e| e.group_id.clone()) {
                        dissolve.extend(
                            self.group_closure(&gid)
                                .into_iter()
                                .filter(|m| self.pathway.get(*m).is_some_and(|e| e.is_group())),
                        );
                    }
                    leaves.extend(self.leaf_members(*g));
                }
                Membership::Member(_) | Membership::Loose => leaves.push(*element),
            }
        }
        let mut seen = HashSet::new();
        leaves.retain(|e| seen.insert(*e));
        if leaves.is_empty() {
            return;
        }

        for g in &dissolve {
            self.pathway.remove(*g);
        }
        let group_id = self.pathway.unique_group_id();
        let z = leaves
            .iter()
            .filter_map(|e| self.pathway.get(*e).map(|e| e.z_order))
            .min()
            .unwrap_or(0)
            .saturating_sub(1);
        let mut group = PathwayElement::group(style).with_z_order(z);
        group.group_id = Some(group_id.clone());
        let group = self.pathway.add(group);
        for leaf in &leaves {
            self.pathway
                .modify(*leaf, |e| e.group_ref = Some(group_id.clone()));
        }
        tracing::debug!(
            %group,
            ?style,
            members = leaves.len(),
            dissolved = dissolve.len(),
            "group created"
        );
        self.process_model_events();
        self.select_element(group);
        self.commit_change(UndoKind::Group, before);
    }

    /// Dissolves the groups of the selection and selects what they held.
    pub fn ungroup(&mut self) {
        let mut targets = Vec::new();
        for element in self.selected_elements() {
            let group = match self.membership(element) {
                Membership::Unit(g) | Membership::Member(g) => g,
                Membership::Loose => continue,
            };
            if !targets.contains(&group) {
                targets.push(group);
            }
        }
        if targets.is_empty() {
            return;
        }
        let before = self.change_start();
        let mut freed = Vec::new();
        for g in &targets {
            if let Some(gid) = self.pathway.get(*g).and_then(|e| e.group_id.clone()) {
                freed.extend(self.pathway.group_members(&gid));
            }
        }
        for g in targets {
            self.pathway.remove(g);
        }
        self.process_model_events();
        self.select_elements(&freed);
        self.commit_change(UndoKind::Group, before);
    }
}
