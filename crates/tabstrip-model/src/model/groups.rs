//! Group operations
//!
//! Tabs are moved next to their new group and assigned to it one at a time,
//! so each group stays contiguous between every pair of moves.

use std::collections::BTreeMap;

use crate::error::TabStripError;
use crate::group::{TabGroupId, TabGroupVisualData};
use crate::observer::{ChangeReason, TabGroupChangeKind};
use crate::Result;

use super::TabStripModel;

impl TabStripModel {
    /// Put the tabs at `indices` (ascending) in a new group with default
    /// visuals, returning its id
    pub fn add_to_new_group(&mut self, indices: &[usize]) -> Result<TabGroupId> {
        let group = TabGroupId::generate_new();
        self.add_to_new_group_with(indices, group, TabGroupVisualData::default())?;
        Ok(group)
    }

    pub fn add_to_new_group_with(
        &mut self,
        indices: &[usize],
        group: TabGroupId,
        visual_data: TabGroupVisualData,
    ) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_groups_supported()?;
        self.ensure_indices(indices)?;
        if self.groups.contains(group) {
            return Err(TabStripError::GroupAlreadyExists(group));
        }

        self.groups.add_tab_group(group, visual_data)?;
        tracing::info!(group = %group, tabs = indices.len(), "Tab group created");
        self.notify_group_changed(group, TabGroupChangeKind::Created);

        // the first slot right of indices[0] that is neither pinned nor
        // inside the group indices[0] already belongs to
        let first_group = self.tabs.group_at(indices[0]);
        let count = self.tabs.len();
        let destination = (indices[0] + 1..=count)
            .find(|&candidate| {
                candidate == count
                    || (!self.tabs[candidate].is_pinned()
                        && self
                            .tabs
                            .group_at(candidate)
                            .map_or(true, |other| Some(other) != first_group))
            })
            .unwrap_or(count);

        self.move_tabs_and_set_group_impl(indices, destination, Some(group));
        self.deselect_inactive_members(group);
        self.delegate.group_added(group);

        self.validate();
        Ok(())
    }

    /// Add the tabs at `indices` (ascending) to an existing group. Tabs
    /// left of the group join at its start, the rest at its end, unless
    /// `add_to_end` sends all of them to the end. A stale id is a no-op.
    pub fn add_to_existing_group(
        &mut self,
        indices: &[usize],
        group: TabGroupId,
        add_to_end: bool,
    ) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_groups_supported()?;
        self.ensure_indices(indices)?;
        let Some(range) = self.tabs.group_range(group) else {
            tracing::warn!(group = %group, "Ignoring add to stale tab group");
            return Ok(());
        };

        let first = range.start;
        let last = range.end - 1;
        let left: Vec<usize> = indices.iter().copied().filter(|&i| i < first).collect();
        let right: Vec<usize> = indices.iter().copied().filter(|&i| i > last).collect();

        if add_to_end {
            let all: Vec<usize> = left.into_iter().chain(right).collect();
            self.move_tabs_and_set_group_impl(&all, last + 1, Some(group));
        } else {
            self.move_tabs_and_set_group_impl(&left, first, Some(group));
            self.move_tabs_and_set_group_impl(&right, last + 1, Some(group));
        }

        self.validate();
        Ok(())
    }

    /// Take the tabs at `indices` (ascending) out of their groups. Each tab
    /// leaves toward the nearer end of its group's run.
    pub fn remove_from_group(&mut self, indices: &[usize]) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_groups_supported()?;
        self.ensure_indices(indices)?;

        let mut by_group: BTreeMap<TabGroupId, Vec<usize>> = BTreeMap::new();
        for &index in indices {
            if let Some(group) = self.tabs.group_at(index) {
                by_group.entry(group).or_default().push(index);
            }
        }

        // each group's moves stay inside its own run
        for (group, members) in by_group {
            let Some(range) = self.tabs.group_range(group) else {
                continue;
            };
            let midpoint = range.start + range.len() / 2;
            let (left, right): (Vec<usize>, Vec<usize>) =
                members.into_iter().partition(|&i| i < midpoint);

            self.move_tabs_and_set_group_impl(&left, range.start, None);
            self.move_tabs_and_set_group_impl(&right, range.end, None);
        }

        self.validate();
        Ok(())
    }

    /// Update a group's title, color or collapsed state. Collapsing the
    /// group holding the active tab activates the nearest tab outside any
    /// collapsed group, if there is one.
    pub fn change_tab_group_visuals(
        &mut self,
        group: TabGroupId,
        visual_data: TabGroupVisualData,
    ) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_groups_supported()?;
        if !self.groups.contains(group) {
            tracing::warn!(group = %group, "Ignoring visual change for stale tab group");
            return Ok(());
        }

        let collapsing = visual_data.is_collapsed;
        let old = self.groups.set_visual_data(group, visual_data.clone())?;
        if old == visual_data {
            return Ok(());
        }

        tracing::debug!(group = %group, collapsed = collapsing, "Tab group visuals changed");
        self.notify_group_changed(
            group,
            TabGroupChangeKind::VisualsChanged {
                old: old.clone(),
                new: visual_data,
            },
        );

        if collapsing && !old.is_collapsed {
            let active = self
                .selection
                .active()
                .filter(|&active| self.tabs.group_at(active) == Some(group));
            let next = active.and_then(|active| self.next_expanded_tab(active, Some(group)));
            if let Some(next) = next {
                self.activate_tab_at_impl(next, false);
            }
        }

        self.validate();
        Ok(())
    }

    /// Nearest tab after `start`, then before it, that is outside every
    /// collapsed group and outside `collapsing`
    pub fn next_expanded_tab(&self, start: usize, collapsing: Option<TabGroupId>) -> Option<usize> {
        let expanded = |index: &usize| match self.tabs.group_at(*index) {
            None => true,
            Some(group) => !self.groups.is_collapsed(group) && Some(group) != collapsing,
        };

        (start + 1..self.tabs.len())
            .find(expanded)
            .or_else(|| (0..start.min(self.tabs.len())).rev().find(expanded))
    }

    /// Grouped tabs should not stay part of a multi-selection, except the
    /// active one
    fn deselect_inactive_members(&mut self, group: TabGroupId) {
        let Some(range) = self.tabs.group_range(group) else {
            return;
        };
        let active = self.selection.active();
        let stale: Vec<usize> = range
            .filter(|&i| Some(i) != active && self.selection.is_selected(i))
            .collect();
        if stale.is_empty() {
            return;
        }

        let model = stale
            .into_iter()
            .fold(self.selection.clone(), |model, index| {
                model.remove_index_from_selection(index)
            });
        self.set_selection(model, ChangeReason::None, false);
    }
}
