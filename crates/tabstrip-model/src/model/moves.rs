//! Moves, pinning and blocking
//!
//! Every reordering bottoms out in [`TabStripModel::move_tab_to_index_impl`],
//! a single-tab move that also sets the tab's pinned state and group.

use crate::group::TabGroupId;
use crate::observer::{SelectionChange, TabGroupChangeKind, TabStripChange};
use crate::tab::TabHandle;
use crate::Result;

use super::TabStripModel;

/// Single-tab moves that place the tabs at `indices` (ascending) into the
/// block starting at `destination`. Tabs moving right go first, rightmost
/// first, then tabs moving left, leftmost first, so no move disturbs a
/// source index still to be processed.
fn incremental_moves(indices: &[usize], destination: usize) -> Vec<(usize, usize)> {
    let mut right = Vec::new();
    let mut left = Vec::new();
    for (offset, &from) in indices.iter().enumerate() {
        let to = destination + offset;
        if from < to {
            right.push((from, to));
        } else {
            left.push((from, to));
        }
    }
    right.reverse();
    right.extend(left);
    right
}

impl TabStripModel {
    /// Move a tab, clamping the destination to its pinned region. Landing
    /// inside a group joins it; leaving a group's run evicts the tab.
    pub fn move_tab_at(
        &mut self,
        index: usize,
        to: usize,
        select_after_move: bool,
    ) -> Result<usize> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;

        let pinned = self.tabs[index].is_pinned();
        let to = self.tabs.constrain_move_index(to, pinned);
        if index == to {
            return Ok(to);
        }

        let group = self.group_to_assign(index, to);
        self.move_tab_to_index_impl(index, to, group, pinned, select_after_move);

        self.validate();
        Ok(to)
    }

    /// Move the selection so it starts at `index`. Pinned and unpinned
    /// selected tabs each stay inside their own region.
    pub fn move_selected_tabs_to(&mut self, index: usize) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        let count = self.tabs.len();
        if count == 0 {
            return Ok(());
        }

        let total_pinned = self.tabs.index_of_first_non_pinned();
        let (pinned, unpinned): (Vec<usize>, Vec<usize>) = self
            .selection
            .selected_indices()
            .partition(|&i| i < total_pinned);

        let mut index = index;
        if !pinned.is_empty() {
            let destination = index.min(total_pinned - pinned.len());
            self.move_tabs_to_index_impl(&pinned, destination);
            // pinned tabs asked to go past the pinned region push the
            // unpinned ones along
            if index > total_pinned - pinned.len() {
                index += pinned.len();
            }
        }
        if !unpinned.is_empty() {
            let destination = index.max(total_pinned).min(count - unpinned.len());
            self.move_tabs_to_index_impl(&unpinned, destination);
        }

        self.validate();
        Ok(())
    }

    /// Move a whole group so its first tab lands at `to`. The group never
    /// lands inside another group's run.
    pub fn move_group_to(&mut self, group: TabGroupId, to: usize) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_groups_supported()?;
        let Some(range) = self.tabs.group_range(group) else {
            tracing::warn!(group = %group, "Ignoring move of stale tab group");
            return Ok(());
        };

        let len = range.len();
        let remaining = self.tabs.len() - len;
        let original = |position: usize| {
            if position < range.start {
                position
            } else {
                position + len
            }
        };

        let mut to = to.clamp(self.tabs.index_of_first_non_pinned(), remaining);
        if to > 0 {
            if let Some(left) = self.tabs.group_at(original(to - 1)) {
                while to < remaining && self.tabs.group_at(original(to)) == Some(left) {
                    to += 1;
                }
            }
        }
        if to == range.start {
            return Ok(());
        }

        let members: Vec<TabHandle> = range.clone().map(|i| self.tabs[i].handle()).collect();
        let mut selection = SelectionChange::starting_from(self.active_handle(), &self.selection);

        self.tabs.move_block(range.start, len, to);
        self.selection = std::mem::take(&mut self.selection).move_range(range.start, to, len);
        selection.new_model = self.selection.clone();
        selection.new_tab = self.active_handle();

        tracing::debug!(group = %group, from = range.start, to, "Moved tab group");
        for (offset, handle) in members.into_iter().enumerate() {
            self.notify(
                TabStripChange::Moved {
                    handle,
                    from: range.start + offset,
                    to: to + offset,
                },
                selection.clone(),
            );
        }
        self.notify_group_changed(group, TabGroupChangeKind::Moved);

        self.validate();
        Ok(())
    }

    pub fn move_tab_next(&mut self) -> Result<()> {
        self.move_tab_relative(true)
    }

    pub fn move_tab_previous(&mut self) -> Result<()> {
        self.move_tab_relative(false)
    }

    /// Move the active tab one step. At a group boundary the tab first
    /// leaves or joins the group in place; a collapsed group is hopped over
    /// as a unit.
    fn move_tab_relative(&mut self, forward: bool) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        let Some(current) = self.selection.active() else {
            return Ok(());
        };

        let pinned = self.tabs[current].is_pinned();
        let first_unpinned = self.tabs.index_of_first_non_pinned();
        let (first_valid, last_valid) = if pinned {
            (0, first_unpinned.saturating_sub(1))
        } else {
            (first_unpinned, self.tabs.len() - 1)
        };
        let step = if forward {
            current + 1
        } else {
            current.saturating_sub(1)
        };
        let mut target = step.clamp(first_valid, last_valid);

        let current_group = self.tabs.group_at(current);
        let mut target_group = self.tabs.group_at(target);
        if current_group != target_group {
            if current_group.is_some() {
                target = current;
                target_group = None;
            } else if let Some(group) = target_group {
                if self.groups.is_collapsed(group) {
                    if let Some(range) = self.tabs.group_range(group) {
                        target = if forward { range.end - 1 } else { range.start };
                    }
                    target_group = None;
                } else {
                    target = current;
                }
            }
        }

        self.move_tab_to_index_impl(current, target, target_group, pinned, true);
        self.validate();
        Ok(())
    }

    /// Pin or unpin a tab, moving it to the pinned boundary. Pinning
    /// ungroups. Returns the tab's new index.
    pub fn set_tab_pinned(&mut self, index: usize, pinned: bool) -> Result<usize> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        let index = self.set_tab_pinned_impl(index, pinned);
        self.validate();
        Ok(index)
    }

    /// Pin or unpin several tabs given in ascending order
    pub fn set_tabs_pinned(&mut self, indices: &[usize], pinned: bool) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_indices(indices)?;

        // pinning moves tabs left, unpinning right; either way the order
        // chosen leaves unprocessed indices where they were
        if pinned {
            for &index in indices {
                self.set_tab_pinned_impl(index, true);
            }
        } else {
            for &index in indices.iter().rev() {
                self.set_tab_pinned_impl(index, false);
            }
        }

        self.validate();
        Ok(())
    }

    pub fn set_tab_blocked(&mut self, index: usize, blocked: bool) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;

        let Some(tab) = self.tabs.get_mut(index) else {
            return Ok(());
        };
        if tab.is_blocked() == blocked {
            return Ok(());
        }
        tab.set_blocked(blocked);
        let handle = tab.handle();

        tracing::debug!(tab = %handle, index, blocked, "Tab blocked state changed");
        self.notify_observers(|observer| observer.tab_blocked_state_changed(handle, index));
        Ok(())
    }

    fn set_tab_pinned_impl(&mut self, index: usize, pinned: bool) -> usize {
        if self.tabs[index].is_pinned() == pinned {
            return index;
        }

        let first_unpinned = self.tabs.index_of_first_non_pinned();
        let final_index = if pinned {
            first_unpinned
        } else {
            first_unpinned - 1
        };
        self.move_tab_to_index_impl(index, final_index, None, pinned, false);
        final_index
    }

    pub(super) fn group_to_assign(&self, from: usize, to: usize) -> Option<TabGroupId> {
        if self.supports_tab_groups {
            self.tabs.group_to_assign(from, to, &self.groups)
        } else {
            None
        }
    }

    /// Move each tab at `indices` into the block starting at `destination`,
    /// keeping every group contiguous after each step
    fn move_tabs_to_index_impl(&mut self, indices: &[usize], destination: usize) {
        for (from, to) in incremental_moves(indices, destination) {
            if from == to {
                continue;
            }
            let pinned = self.tabs[from].is_pinned();
            let group = self.group_to_assign(from, to);
            self.move_tab_to_index_impl(from, to, group, pinned, false);
        }
    }

    /// Move the tabs at `indices` (ascending) next to the slot
    /// `destination`, unpinning them and setting their group. Tabs left of
    /// the slot end up just before it, the rest just after.
    pub(super) fn move_tabs_and_set_group_impl(
        &mut self,
        indices: &[usize],
        destination: usize,
        group: Option<TabGroupId>,
    ) {
        let moving_right = indices.iter().take_while(|&&i| i < destination).count();
        for (offset, &from) in indices[..moving_right].iter().enumerate().rev() {
            self.move_tab_to_index_impl(from, destination - moving_right + offset, group, false, false);
        }
        for (offset, &from) in indices[moving_right..].iter().enumerate() {
            self.move_tab_to_index_impl(from, destination + offset, group, false, false);
        }
    }

    /// The single-tab move primitive. The tab's pinned flag and group are
    /// written together with the move; the group transition is committed
    /// after the move is reported.
    pub(super) fn move_tab_to_index_impl(
        &mut self,
        initial: usize,
        final_index: usize,
        group: Option<TabGroupId>,
        pin: bool,
        select_after_move: bool,
    ) {
        let handle = self.tabs[initial].handle();
        let initial_pinned = self.tabs[initial].is_pinned();
        let initial_group = self.tabs[initial].group();
        let group = if pin { None } else { group };

        let mut selection = SelectionChange::starting_from(self.active_handle(), &self.selection);
        let moved = initial != final_index;

        if moved {
            self.openers.repoint_children_of(handle);
            self.tabs.move_tab(initial, final_index);
        }
        if let Some(tab) = self.tabs.get_mut(final_index) {
            tab.set_pinned(pin);
            tab.set_group(group);
        }

        if moved {
            let mut model = std::mem::take(&mut self.selection).move_range(initial, final_index, 1);
            if select_after_move && !model.is_selected(final_index) {
                if !self.closing_all {
                    if let Some(outgoing) = model.active().and_then(|i| self.tabs.get(i)) {
                        outgoing.session().will_enter_background();
                    }
                }
                model = model.set_selected_index(final_index);
            }
            self.selection = model;
            selection.new_model = self.selection.clone();
            selection.new_tab = self.active_handle();

            tracing::debug!(tab = %handle, from = initial, to = final_index, "Moved tab");
            self.notify(
                TabStripChange::Moved {
                    handle,
                    from: initial,
                    to: final_index,
                },
                selection,
            );
        }

        if initial_pinned != pin {
            tracing::debug!(tab = %handle, index = final_index, pinned = pin, "Tab pinned state changed");
            self.notify_observers(|observer| observer.tab_pinned_state_changed(self, handle, final_index));
        }

        self.commit_group(final_index, initial_group, group);
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

    #[test]
    fn test_incremental_moves_order() {
        assert_eq!(incremental_moves(&[0, 1], 3), vec![(1, 4), (0, 3)]);
        assert_eq!(incremental_moves(&[3, 4], 0), vec![(3, 0), (4, 1)]);
        assert_eq!(incremental_moves(&[1, 4], 2), vec![(1, 2), (4, 3)]);
    }

    #[test]
    fn test_move_tab_keeps_active_handle() {
        let mut model = model_with(4);
        let active = model.active_handle();
        let to = model.move_tab_at(0, 3, false).unwrap();
        assert_eq!(to, 3);
        assert_eq!(model.active_index(), Some(3));
        assert_eq!(model.active_handle(), active);
    }

    #[test]
    fn test_move_clamped_to_pinned_region() {
        let mut model = model_with(4);
        model.set_tab_pinned(1, true).unwrap();
        assert_eq!(model.move_tab_at(3, 0, false).unwrap(), 1);
        assert_eq!(model.move_tab_at(0, 3, false).unwrap(), 0);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_unpin_moves_to_boundary() {
        let mut model = model_with(4);
        model.set_tabs_pinned(&[1, 2], true).unwrap();
        assert_eq!(model.index_of_first_non_pinned(), 2);

        let handle = model.tab_at(0).unwrap().handle();
        assert_eq!(model.set_tab_pinned(0, false).unwrap(), 1);
        assert_eq!(model.index_of(handle), Some(1));
        assert_eq!(model.index_of_first_non_pinned(), 1);
    }

    #[test]
    fn test_move_selected_tabs() {
        let mut model = model_with(6);
        let handles = model.handles();
        model.activate_tab_at(0, false).unwrap();
        model.toggle_selection_at(1).unwrap();

        model.move_selected_tabs_to(3).unwrap();
        assert_eq!(model.index_of(handles[0]), Some(3));
        assert_eq!(model.index_of(handles[1]), Some(4));
        assert!(model.is_tab_selected(3) && model.is_tab_selected(4));
    }

    #[test]
    fn test_move_group_to_end() {
        let mut model = model_with(5);
        let group = model.add_to_new_group(&[0, 1]).unwrap();
        model.move_group_to(group, 3).unwrap();
        assert_eq!(model.tabs().group_range(group), Some(3..5));
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_move_group_never_splits_another() {
        let mut model = model_with(5);
        let first = model.add_to_new_group(&[0]).unwrap();
        let second = model.add_to_new_group(&[2, 3]).unwrap();
        // position 2 in the remaining strip is inside `second`
        model.move_group_to(first, 2).unwrap();
        assert_eq!(model.tabs().group_range(second), Some(1..3));
        assert_eq!(model.tabs().group_range(first), Some(3..4));
    }

    #[test]
    fn test_move_next_joins_and_leaves_group() {
        let mut model = model_with(4);
        let group = model.add_to_new_group(&[2, 3]).unwrap();
        model.activate_tab_at(1, false).unwrap();

        // at the boundary the tab joins in place
        model.move_tab_next().unwrap();
        assert_eq!(model.group_of(1), Some(group));
        assert_eq!(model.active_index(), Some(1));

        // and leaves in place going back
        model.move_tab_previous().unwrap();
        assert_eq!(model.group_of(1), None);
        assert_eq!(model.active_index(), Some(1));

        model.move_tab_previous().unwrap();
        assert_eq!(model.active_index(), Some(0));
    }

    #[test]
    fn test_move_next_hops_collapsed_group() {
        let mut model = model_with(4);
        let group = model.add_to_new_group(&[1, 2]).unwrap();
        let mut visuals = model.groups().visual_data(group).cloned().unwrap_or_default();
        visuals.is_collapsed = true;
        model.change_tab_group_visuals(group, visuals).unwrap();
        model.activate_tab_at(0, false).unwrap();
        let handle = model.active_handle();

        model.move_tab_next().unwrap();
        assert_eq!(model.active_index(), Some(2));
        assert_eq!(model.active_handle(), handle);
        assert_eq!(model.group_of(2), None);
        assert_eq!(model.tabs().group_range(group), Some(0..2));
    }

    #[test]
    fn test_blocked_state() {
        let mut model = model_with(1);
        model.set_tab_blocked(0, true).unwrap();
        assert!(model.tab_at(0).unwrap().is_blocked());
        assert!(model.set_tab_blocked(3, true).is_err());
    }
}
