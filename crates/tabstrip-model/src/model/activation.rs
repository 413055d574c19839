//! Activation and multi-selection

use crate::error::TabStripError;
use crate::observer::ChangeReason;
use crate::selection::SelectionModel;
use crate::Result;

use super::TabStripModel;

impl TabStripModel {
    pub fn activate_tab_at(&mut self, index: usize, user_gesture: bool) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        self.activate_tab_at_impl(index, user_gesture);
        self.validate();
        Ok(())
    }

    pub fn select_next_tab(&mut self, user_gesture: bool) -> Result<()> {
        self.select_relative_tab(true, user_gesture)
    }

    pub fn select_previous_tab(&mut self, user_gesture: bool) -> Result<()> {
        self.select_relative_tab(false, user_gesture)
    }

    pub fn select_last_tab(&mut self, user_gesture: bool) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        if let Some(last) = self.tabs.len().checked_sub(1) {
            self.activate_tab_at_impl(last, user_gesture);
            self.validate();
        }
        Ok(())
    }

    /// Select the range between the anchor and `index`, making `index` active
    pub fn extend_selection_to(&mut self, index: usize) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        let model = self.selection.clone().set_selection_from_anchor_to(index);
        self.set_selection(model, ChangeReason::None, false);
        self.validate();
        Ok(())
    }

    /// Add or remove `index` from the selection. The last selected tab
    /// cannot be deselected, and nothing changes while the strip is not
    /// editable.
    pub fn toggle_selection_at(&mut self, index: usize) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        if !self.delegate.is_tab_strip_editable() {
            return Ok(());
        }

        let model = if self.selection.is_selected(index) {
            if self.selection.len() == 1 {
                return Ok(());
            }
            let model = self
                .selection
                .clone()
                .remove_index_from_selection(index)
                .set_anchor(Some(index));
            match model.active() {
                Some(active) if active != index => model,
                _ => {
                    let first = model.first_selected();
                    model.set_active(first)
                }
            }
        } else {
            self.selection
                .clone()
                .add_index_to_selection(index)
                .set_anchor(Some(index))
                .set_active(Some(index))
        };

        self.set_selection(model, ChangeReason::None, false);
        self.validate();
        Ok(())
    }

    pub fn add_selection_from_anchor_to(&mut self, index: usize) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        let model = self.selection.clone().add_selection_from_anchor_to(index);
        self.set_selection(model, ChangeReason::None, false);
        self.validate();
        Ok(())
    }

    /// Replace the whole selection with a caller-built model
    pub fn set_selection_from_model(&mut self, model: SelectionModel) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        if !model.is_valid_for(self.tabs.len()) {
            return Err(TabStripError::InvalidSelection {
                count: self.tabs.len(),
            });
        }
        self.set_selection(model, ChangeReason::None, false);
        self.validate();
        Ok(())
    }

    pub(super) fn activate_tab_at_impl(&mut self, index: usize, user_gesture: bool) {
        let reason = if user_gesture {
            ChangeReason::UserGesture
        } else {
            ChangeReason::None
        };
        let model = self.selection.clone().set_selected_index(index);
        self.set_selection(model, reason, false);
    }

    fn select_relative_tab(&mut self, forward: bool, user_gesture: bool) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        let count = self.tabs.len();
        let Some(start) = self.selection.active() else {
            return Ok(());
        };

        let step = |index: usize| {
            if forward {
                (index + 1) % count
            } else {
                (index + count - 1) % count
            }
        };

        // collapsed groups are skipped; wrapping back to the start ends the
        // search
        let mut index = step(start);
        while index != start && self.in_collapsed_group(index) {
            index = step(index);
        }

        self.activate_tab_at_impl(index, user_gesture);
        self.validate();
        Ok(())
    }

    pub(super) fn in_collapsed_group(&self, index: usize) -> bool {
        self.tabs
            .group_at(index)
            .is_some_and(|group| self.groups.is_collapsed(group))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::config::TabStripConfig;
    use crate::delegate::{DefaultDelegate, PageSession};
    use crate::flags::AddTabFlags;
    use crate::tab::Tab;

    use super::*;

    struct Blank;
    impl PageSession for Blank {}

    fn model_with(n: usize) -> TabStripModel {
        let mut model = TabStripModel::new(Rc::new(DefaultDelegate), &TabStripConfig::default());
        for _ in 0..n {
            model
                .insert_tab_at(model.count(), Tab::new(Box::new(Blank)), AddTabFlags::NONE, None)
                .unwrap();
        }
        model
    }

    fn selected(model: &TabStripModel) -> Vec<usize> {
        model.selection().selected_indices().collect()
    }

    #[test]
    fn test_select_next_wraps() {
        let mut model = model_with(3);
        model.activate_tab_at(2, true).unwrap();
        model.select_next_tab(true).unwrap();
        assert_eq!(model.active_index(), Some(0));
        model.select_previous_tab(true).unwrap();
        assert_eq!(model.active_index(), Some(2));
    }

    #[test]
    fn test_select_next_skips_collapsed_group() {
        let mut model = model_with(4);
        let group = model.add_to_new_group(&[1, 2]).unwrap();
        let mut visuals = model.groups().visual_data(group).cloned().unwrap_or_default();
        visuals.is_collapsed = true;
        model.change_tab_group_visuals(group, visuals).unwrap();

        model.activate_tab_at(0, true).unwrap();
        model.select_next_tab(true).unwrap();
        assert_eq!(model.active_index(), Some(3));
    }

    #[test]
    fn test_toggle_selection() {
        let mut model = model_with(3);
        model.toggle_selection_at(2).unwrap();
        assert_eq!(selected(&model), vec![0, 2]);
        assert_eq!(model.active_index(), Some(2));

        model.toggle_selection_at(2).unwrap();
        assert_eq!(selected(&model), vec![0]);
        assert_eq!(model.active_index(), Some(0));

        // the sole selection stays
        model.toggle_selection_at(0).unwrap();
        assert_eq!(selected(&model), vec![0]);
    }

    #[test]
    fn test_extend_selection_uses_anchor() {
        let mut model = model_with(5);
        model.activate_tab_at(1, true).unwrap();
        model.extend_selection_to(3).unwrap();
        assert_eq!(selected(&model), vec![1, 2, 3]);
        assert_eq!(model.active_index(), Some(3));
        assert_eq!(model.selection().anchor(), Some(1));
    }

    #[test]
    fn test_invalid_model_rejected() {
        let mut model = model_with(2);
        let bad = SelectionModel::new().set_selected_index(4);
        assert!(matches!(
            model.set_selection_from_model(bad),
            Err(TabStripError::InvalidSelection { count: 2 })
        ));
        assert_eq!(model.active_index(), Some(0));
    }

    #[test]
    fn test_empty_strip_selection_ops_are_noops() {
        let mut model = model_with(0);
        model.select_next_tab(true).unwrap();
        model.select_last_tab(true).unwrap();
        assert_eq!(model.active_index(), None);
    }
}
