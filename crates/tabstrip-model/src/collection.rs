//! Tab collection
//!
//! The ordered sequence of tabs. Pinned tabs form a prefix; the unpinned
//! suffix is partitioned into contiguous group runs and ungrouped tabs.
//! This type only knows positions. Notifications, selection and openers are
//! the model's business.

use std::collections::{HashMap, HashSet};
use std::ops::{Index, Range};

use crate::group::{GroupRegistry, TabGroupId};
use crate::tab::{Tab, TabHandle};

#[derive(Debug, Default)]
pub struct TabCollection {
    tabs: Vec<Tab>,
}

impl TabCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.tabs.len()
    }

    pub fn get(&self, index: usize) -> Option<&Tab> {
        self.tabs.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Tab> {
        self.tabs.get_mut(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Tab> + ExactSizeIterator {
        self.tabs.iter()
    }

    /// Handles in strip order
    pub fn handles(&self) -> Vec<TabHandle> {
        self.tabs.iter().map(Tab::handle).collect()
    }

    pub fn index_of(&self, handle: TabHandle) -> Option<usize> {
        self.tabs.iter().position(|t| t.handle() == handle)
    }

    pub fn index_of_first_non_pinned(&self) -> usize {
        self.tabs
            .iter()
            .position(|t| !t.is_pinned())
            .unwrap_or(self.tabs.len())
    }

    /// Clamp an insertion slot into the pinned prefix `[0, first_unpinned]`
    /// or the unpinned suffix `[first_unpinned, len]`.
    pub fn constrain_insertion_index(&self, index: usize, pinned: bool) -> usize {
        let first_unpinned = self.index_of_first_non_pinned();
        if pinned {
            index.min(first_unpinned)
        } else {
            index.clamp(first_unpinned, self.tabs.len())
        }
    }

    /// Clamp a move destination for a tab already in the strip; the tab's
    /// own slot is excluded from the range it can land in.
    pub fn constrain_move_index(&self, index: usize, pinned: bool) -> usize {
        let first_unpinned = self.index_of_first_non_pinned();
        if pinned {
            index.min(first_unpinned.saturating_sub(1))
        } else {
            index.clamp(first_unpinned, self.tabs.len().saturating_sub(1).max(first_unpinned))
        }
    }

    pub fn group_at(&self, index: usize) -> Option<TabGroupId> {
        self.tabs.get(index).and_then(Tab::group)
    }

    /// Index span occupied by `group`, if it has members
    pub fn group_range(&self, group: TabGroupId) -> Option<Range<usize>> {
        let start = self.tabs.iter().position(|t| t.group() == Some(group))?;
        let end = self.tabs.iter().rposition(|t| t.group() == Some(group))? + 1;
        Some(start..end)
    }

    /// Group a tab inserted at `index` would be surrounded by
    pub fn surrounding_group(&self, index: usize) -> Option<TabGroupId> {
        if index == 0 || !self.contains_index(index) {
            return None;
        }
        let group = self.group_at(index - 1)?;
        (self.group_at(index) == Some(group)).then_some(group)
    }

    /// Group membership a tab should have after moving from `from` to `to`
    /// so every group stays contiguous. A tab landing between two members of
    /// the same group joins it; a tab leaving a group that still has other
    /// members is evicted from it.
    pub fn group_to_assign(
        &self,
        from: usize,
        to: usize,
        registry: &GroupRegistry,
    ) -> Option<TabGroupId> {
        let current = self.group_at(from);

        let (left, right) = match to.cmp(&from) {
            std::cmp::Ordering::Greater => (self.group_at(to), self.group_at(to + 1)),
            std::cmp::Ordering::Less => (
                to.checked_sub(1).and_then(|i| self.group_at(i)),
                self.group_at(to),
            ),
            std::cmp::Ordering::Equal => (None, None),
        };

        if current != left && current != right {
            if left.is_some() && left == right {
                return left;
            }
            if let Some(group) = current {
                if registry.tab_count(group) > 1 {
                    return None;
                }
            }
        }

        current
    }

    pub(crate) fn insert(&mut self, index: usize, tab: Tab) {
        debug_assert!(index <= self.tabs.len());
        self.tabs.insert(index, tab);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Tab {
        self.tabs.remove(index)
    }

    pub(crate) fn move_tab(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
    }

    /// Move the block `[from, from + count)` so that it starts at `to`
    pub(crate) fn move_block(&mut self, from: usize, count: usize, to: usize) {
        if from == to || count == 0 {
            return;
        }
        let block: Vec<Tab> = self.tabs.drain(from..from + count).collect();
        self.tabs.splice(to..to, block);
    }

    /// Check the structural invariants against the group registry
    pub fn check_invariants(&self, registry: &GroupRegistry) -> Result<(), String> {
        let first_unpinned = self.index_of_first_non_pinned();
        if let Some(i) = self.tabs[first_unpinned..].iter().position(Tab::is_pinned) {
            return Err(format!(
                "pinned tab at {} follows unpinned tab at {}",
                first_unpinned + i,
                first_unpinned
            ));
        }

        let mut counts: HashMap<TabGroupId, usize> = HashMap::new();
        let mut closed: HashSet<TabGroupId> = HashSet::new();
        let mut previous: Option<TabGroupId> = None;

        for (index, tab) in self.tabs.iter().enumerate() {
            let group = tab.group();
            if group != previous {
                if let Some(prev) = previous {
                    closed.insert(prev);
                }
            }
            if let Some(group) = group {
                if tab.is_pinned() {
                    return Err(format!("pinned tab at {} is grouped", index));
                }
                if closed.contains(&group) {
                    return Err(format!("group {} is not contiguous at {}", group, index));
                }
                *counts.entry(group).or_default() += 1;
            }
            previous = group;
        }

        for (group, count) in &counts {
            let registered = registry.get(*group).map(|g| g.tab_count());
            if registered != Some(*count) {
                return Err(format!(
                    "group {} has {} members but the registry records {:?}",
                    group, count, registered
                ));
            }
        }

        Ok(())
    }
}

impl Index<usize> for TabCollection {
    type Output = Tab;

    fn index(&self, index: usize) -> &Tab {
        &self.tabs[index]
    }
}
