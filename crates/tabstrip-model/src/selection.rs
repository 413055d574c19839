//! Selection model
//!
//! A plain value: the active index, the selected set and the anchor used
//! for range selection. Every operation consumes the model and returns the
//! updated one, so the strip can build a candidate, validate it against the
//! current tab count and only then commit it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionModel {
    active: Option<usize>,
    anchor: Option<usize>,
    selected: BTreeSet<usize>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Selected indices in ascending order
    pub fn selected_indices(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    pub fn first_selected(&self) -> Option<usize> {
        self.selected.first().copied()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Select exactly `index`, making it both active and the anchor
    #[must_use]
    pub fn set_selected_index(mut self, index: usize) -> Self {
        self.selected.clear();
        self.selected.insert(index);
        self.active = Some(index);
        self.anchor = Some(index);
        self
    }

    #[must_use]
    pub fn add_index_to_selection(mut self, index: usize) -> Self {
        self.selected.insert(index);
        self
    }

    #[must_use]
    pub fn remove_index_from_selection(mut self, index: usize) -> Self {
        self.selected.remove(&index);
        self
    }

    /// Replace the selection with the range between the anchor and `index`
    #[must_use]
    pub fn set_selection_from_anchor_to(self, index: usize) -> Self {
        let Some(anchor) = self.anchor else {
            return self.set_selected_index(index);
        };
        let mut model = self;
        model.selected = (anchor.min(index)..=anchor.max(index)).collect();
        model.active = Some(index);
        model
    }

    /// Add the range between the anchor and `index` to the selection
    #[must_use]
    pub fn add_selection_from_anchor_to(self, index: usize) -> Self {
        let Some(anchor) = self.anchor else {
            return self.set_selected_index(index);
        };
        let mut model = self;
        model.selected.extend(anchor.min(index)..=anchor.max(index));
        model.active = Some(index);
        model
    }

    #[must_use]
    pub fn set_active(mut self, active: Option<usize>) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn set_anchor(mut self, anchor: Option<usize>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Shift every index `>= index` up by one (a slot was inserted)
    #[must_use]
    pub fn increment_from(mut self, index: usize) -> Self {
        let shift = |i: usize| if i >= index { i + 1 } else { i };
        self.selected = self.selected.into_iter().map(shift).collect();
        self.active = self.active.map(shift);
        self.anchor = self.anchor.map(shift);
        self
    }

    /// Drop `index` and shift every index above it down by one (a slot was
    /// removed). An active or anchor equal to `index` is cleared.
    #[must_use]
    pub fn decrement_from(mut self, index: usize) -> Self {
        let shift = |i: usize| match i.cmp(&index) {
            std::cmp::Ordering::Less => Some(i),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(i - 1),
        };
        self.selected = self.selected.into_iter().filter_map(shift).collect();
        self.active = self.active.and_then(shift);
        self.anchor = self.anchor.and_then(shift);
        self
    }

    /// Move the block `[from, from + count)` so that it starts at `to`,
    /// shifting the indices it jumps over.
    #[must_use]
    pub fn move_range(mut self, from: usize, to: usize, count: usize) -> Self {
        if from == to || count == 0 {
            return self;
        }
        let map = |i: usize| {
            if (from..from + count).contains(&i) {
                i - from + to
            } else if to > from && (from + count..to + count).contains(&i) {
                i - count
            } else if to < from && (to..from).contains(&i) {
                i + count
            } else {
                i
            }
        };
        self.selected = self.selected.into_iter().map(map).collect();
        self.active = self.active.map(map);
        self.anchor = self.anchor.map(map);
        self
    }

    #[must_use]
    pub fn clear(self) -> Self {
        Self::default()
    }

    /// Whether the model may be committed to a strip holding `count` tabs
    pub fn is_valid_for(&self, count: usize) -> bool {
        if count == 0 {
            return self.active.is_none() && self.selected.is_empty();
        }
        let Some(active) = self.active else {
            return false;
        };
        active < count
            && self.selected.contains(&active)
            && self.selected.iter().all(|&i| i < count)
            && self.anchor.map_or(true, |a| a < count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(model: &SelectionModel) -> Vec<usize> {
        model.selected_indices().collect()
    }

    #[test]
    fn test_set_selected_index() {
        let model = SelectionModel::new()
            .add_index_to_selection(4)
            .set_selected_index(2);
        assert_eq!(model.active(), Some(2));
        assert_eq!(model.anchor(), Some(2));
        assert_eq!(selected(&model), vec![2]);
    }

    #[test]
    fn test_anchor_ranges() {
        let model = SelectionModel::new()
            .set_selected_index(3)
            .set_selection_from_anchor_to(1);
        assert_eq!(selected(&model), vec![1, 2, 3]);
        assert_eq!(model.active(), Some(1));
        assert_eq!(model.anchor(), Some(3));

        let model = model.set_selection_from_anchor_to(4);
        assert_eq!(selected(&model), vec![3, 4]);

        let model = model.set_anchor(Some(0)).add_selection_from_anchor_to(1);
        assert_eq!(selected(&model), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_anchor_range_without_anchor_selects_single() {
        let model = SelectionModel::new().add_selection_from_anchor_to(2);
        assert_eq!(selected(&model), vec![2]);
        assert_eq!(model.active(), Some(2));
    }

    #[test]
    fn test_increment_from() {
        let model = SelectionModel::new()
            .set_selected_index(1)
            .add_index_to_selection(3)
            .increment_from(2);
        assert_eq!(selected(&model), vec![1, 4]);
        assert_eq!(model.active(), Some(1));
    }

    #[test]
    fn test_decrement_from_clears_removed_active() {
        let model = SelectionModel::new()
            .set_selected_index(1)
            .add_index_to_selection(2)
            .decrement_from(1);
        assert_eq!(selected(&model), vec![1]);
        assert_eq!(model.active(), None);
        assert_eq!(model.anchor(), None);
    }

    #[test]
    fn test_move_right_and_left() {
        // [0 1 2 3 4], move 1 -> 3 gives [0 2 3 1 4]
        let model = SelectionModel::new()
            .set_selected_index(1)
            .add_index_to_selection(3)
            .move_range(1, 3, 1);
        assert_eq!(model.active(), Some(3));
        assert_eq!(selected(&model), vec![2, 3]);

        // and back again
        let model = model.move_range(3, 1, 1);
        assert_eq!(model.active(), Some(1));
        assert_eq!(selected(&model), vec![1, 3]);
    }

    #[test]
    fn test_move_block() {
        // [0 1 2 3 4 5], move [0,2) to 3 gives [2 3 4 0 1 5]
        let model = SelectionModel::new()
            .set_selected_index(0)
            .add_index_to_selection(4)
            .move_range(0, 3, 2);
        assert_eq!(model.active(), Some(3));
        assert_eq!(selected(&model), vec![2, 3]);
    }

    #[test]
    fn test_validity() {
        assert!(SelectionModel::new().is_valid_for(0));
        assert!(!SelectionModel::new().is_valid_for(2));
        assert!(SelectionModel::new().set_selected_index(1).is_valid_for(2));
        assert!(!SelectionModel::new().set_selected_index(2).is_valid_for(2));

        let active_not_selected = SelectionModel::new()
            .set_selected_index(0)
            .remove_index_from_selection(0)
            .add_index_to_selection(1);
        assert!(!active_not_selected.is_valid_for(3));
    }
}
