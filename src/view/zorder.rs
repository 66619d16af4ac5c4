use super::Canvas;
use super::undo::UndoKind;
use crate::model::ElementId;

const Z_SPACING: i32 = 2;

/// Spreads z-orders so neighbours differ by at least `Z_SPACING`, keeping
/// the order. Returns the entries whose value changed.
pub(crate) fn spread_z_orders(items: &[(ElementId, i32)]) -> Vec<(ElementId, i32)> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|(id, z)| (*z, *id));
    let mut changes = Vec::new();
    let Some(&(_, first)) = sorted.first() else {
        return changes;
    };
    let mut water = first;
    for &(id, z) in &sorted[1..] {
        let mut z = z;
        if z.saturating_sub(water) < Z_SPACING {
            z = water.saturating_add(Z_SPACING);
            changes.push((id, z));
        }
        water = z;
    }
    changes
}

impl Canvas {
    fn z_of(&self, element: ElementId) -> i32 {
        self.pathway.get(element).map(|e| e.z_order).unwrap_or(0)
    }

    fn set_z(&mut self, element: ElementId, z: i32) {
        if self.z_of(element) != z {
            self.pathway.modify(element, |e| e.z_order = z);
        }
    }

    fn selection_by_z(&self) -> Vec<ElementId> {
        let mut ids = self.selection_closure();
        ids.sort_by_key(|e| (self.z_of(*e), *e));
        ids
    }

    pub fn bring_to_front(&mut self) {
        let ids = self.selection_by_z();
        if ids.is_empty() {
            return;
        }
        let before = self.change_start();
        let base = self.pathway.max_z_order().saturating_add(1);
        for (i, id) in ids.into_iter().enumerate() {
            self.set_z(id, base.saturating_add(i as i32));
        }
        self.process_model_events();
        self.commit_change(UndoKind::ZOrder, before);
    }

    pub fn send_to_back(&mut self) {
        let ids = self.selection_by_z();
        if ids.is_empty() {
            return;
        }
        let before = self.change_start();
        let n = ids.len() as i32;
        let base = self.pathway.min_z_order().saturating_sub(n + 1);
        for (i, id) in ids.into_iter().enumerate() {
            self.set_z(id, base.saturating_add(i as i32));
        }
        self.process_model_events();
        self.commit_change(UndoKind::ZOrder, before);
    }

    /// Renumbers the whole pathway so a value fits between any two neighbours.
    fn auto_renumber_z_order(&mut self) {
        let items: Vec<(ElementId, i32)> = self
            .pathway
            .elements()
            .iter()
            .map(|e| (e.id, e.z_order))
            .collect();
        for (id, z) in spread_z_orders(&items) {
            self.set_z(id, z);
        }
    }

    /// Nearest z-order among elements whose bounds overlap `element`,
    /// strictly above (`up`) or below it.
    fn nearest_overlapping_z(&self, element: ElementId, up: bool) -> Option<i32> {
        let bounds = self.pathway.element_bounds(element)?;
        let z = self.z_of(element);
        let candidates = self.pathway.elements().iter().filter(|other| {
            other.id != element
                && self
                    .pathway
                    .element_bounds(other.id)
                    .is_some_and(|b| b.intersects(bounds))
        });
        if up {
            candidates.map(|o| o.z_order).filter(|oz| *oz > z).min()
        } else {
            candidates.map(|o| o.z_order).filter(|oz| *oz < z).max()
        }
    }

    /// Whether any overlapping element draws above (`up`) or below `element`.
    /// Ties in z-order are broken by id, the same as drawing order.
    fn has_overlapping_neighbour(&self, element: ElementId, up: bool) -> bool {
        let Some(bounds) = self.pathway.element_bounds(element) else {
            return false;
        };
        let key = (self.z_of(element), element);
        self.pathway.elements().iter().any(|other| {
            let other_key = (other.z_order, other.id);
            other.id != element
                && (if up { other_key > key } else { other_key < key })
                && self
                    .pathway
                    .element_bounds(other.id)
                    .is_some_and(|b| b.intersects(bounds))
        })
    }

    /// Moves each selected element just above the nearest overlapping
    /// element above it.
    pub fn raise(&mut self) {
        self.shift_one_level(true);
    }

    pub fn lower(&mut self) {
        self.shift_one_level(false);
    }

    fn shift_one_level(&mut self, up: bool) {
        let mut ids: Vec<ElementId> = self
            .selection_by_z()
            .into_iter()
            .filter(|id| self.has_overlapping_neighbour(*id, up))
            .collect();
        if ids.is_empty() {
            tracing::debug!(up, "no overlapping element to pass");
            return;
        }
        if up {
            ids.reverse();
        }
        let before = self.change_start();
        for id in ids {
            self.auto_renumber_z_order();
            let Some(next) = self.nearest_overlapping_z(id, up) else {
                continue;
            };
            let target = if up {
                next.saturating_add(1)
            } else {
                next.saturating_sub(1)
            };
            self.set_z(id, target);
        }
        self.process_model_events();
        self.commit_change(UndoKind::ZOrder, before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn spreading_keeps_order_and_spacing() {
        let items = vec![
            (ElementId(1), 0),
            (ElementId(2), 0),
            (ElementId(3), 1),
            (ElementId(4), 10),
        ];
        let changes = spread_z_orders(&items);
        assert_eq!(
            changes,
            vec![(ElementId(2), 2), (ElementId(3), 4)]
        );
    }

    #[test]
    fn spreading_an_empty_set_is_a_no_op() {
        assert!(spread_z_orders(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn spreading_keeps_order_with_room_between(zs in prop::collection::vec(-1000i32..1000, 0..40)) {
            let items: Vec<(ElementId, i32)> = zs
                .iter()
                .enumerate()
                .map(|(i, z)| (ElementId(i as u64 + 1), *z))
                .collect();
            let mut order = items.clone();
            order.sort_by_key(|(id, z)| (*z, *id));

            let mut spread: HashMap<ElementId, i32> = items.iter().copied().collect();
            spread.extend(spread_z_orders(&items));
            for pair in order.windows(2) {
                let (lo, hi) = (spread[&pair[0].0], spread[&pair[1].0]);
                prop_assert!(hi - lo >= Z_SPACING);
            }
        }
    }
}
