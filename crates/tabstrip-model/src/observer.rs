//! Observer contract and notification records
//!
//! Each externally invoked mutation produces exactly one
//! [`TabStripChange`] plus the [`SelectionChange`] it caused, delivered
//! through [`TabStripObserver::on_tab_strip_model_changed`]. The remaining
//! methods are per-tab or per-group side channels. Dispatch is synchronous,
//! in registration order, and observers only get shared access to the model.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::delegate::{HistoricalEntryId, RemoveReason};
use crate::group::{TabGroupId, TabGroupVisualData};
use crate::model::TabStripModel;
use crate::selection::SelectionModel;
use crate::tab::TabHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedTab {
    pub handle: TabHandle,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedTab {
    pub handle: TabHandle,
    /// Index before any removal in the same batch
    pub index: usize,
    pub reason: RemoveReason,
    pub historical_id: Option<HistoricalEntryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TabStripChange {
    Inserted { tabs: Vec<InsertedTab> },
    /// Sorted by original index, descending
    Removed { tabs: Vec<RemovedTab> },
    Moved { handle: TabHandle, from: usize, to: usize },
    Replaced { handle: TabHandle, index: usize },
    SelectionOnly,
}

impl TabStripChange {
    pub fn kind(&self) -> &'static str {
        match self {
            TabStripChange::Inserted { .. } => "inserted",
            TabStripChange::Removed { .. } => "removed",
            TabStripChange::Moved { .. } => "moved",
            TabStripChange::Replaced { .. } => "replaced",
            TabStripChange::SelectionOnly => "selection_only",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    #[default]
    None,
    /// The active page session was replaced
    Replaced,
    UserGesture,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChange {
    pub old_tab: Option<TabHandle>,
    pub new_tab: Option<TabHandle>,
    pub old_model: SelectionModel,
    pub new_model: SelectionModel,
    pub reason: ChangeReason,
    pub selected_tabs_were_removed: bool,
}

impl SelectionChange {
    /// Snapshot taken before a mutation; `new_*` start equal to `old_*`
    pub fn starting_from(active: Option<TabHandle>, model: &SelectionModel) -> Self {
        Self {
            old_tab: active,
            new_tab: active,
            old_model: model.clone(),
            new_model: model.clone(),
            reason: ChangeReason::None,
            selected_tabs_were_removed: false,
        }
    }

    pub fn active_tab_changed(&self) -> bool {
        self.old_tab != self.new_tab || self.reason == ChangeReason::Replaced
    }

    pub fn selection_changed(&self) -> bool {
        self.old_model != self.new_model || self.selected_tabs_were_removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabGroupChangeKind {
    Created,
    ContentsChanged,
    VisualsChanged {
        old: TabGroupVisualData,
        new: TabGroupVisualData,
    },
    Moved,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabGroupChange {
    pub group: TabGroupId,
    pub kind: TabGroupChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseAllStoppedReason {
    Completed,
    Canceled,
}

pub trait TabStripObserver {
    fn on_tab_strip_model_changed(
        &self,
        _model: &TabStripModel,
        _change: &TabStripChange,
        _selection: &SelectionChange,
    ) {
    }

    fn on_tab_will_be_removed(&self, _handle: TabHandle, _index: usize) {}

    fn tab_pinned_state_changed(&self, _model: &TabStripModel, _handle: TabHandle, _index: usize) {}

    fn tab_blocked_state_changed(&self, _handle: TabHandle, _index: usize) {}

    /// `group` is the tab's new group, `None` when it left one
    fn tab_grouped_state_changed(&self, _group: Option<TabGroupId>, _handle: TabHandle, _index: usize) {}

    fn on_tab_group_changed(&self, _change: &TabGroupChange) {}

    fn tab_close_cancelled(&self, _handle: TabHandle) {}

    fn will_close_all_tabs(&self, _model: &TabStripModel) {}

    fn close_all_tabs_stopped(&self, _model: &TabStripModel, _reason: CloseAllStoppedReason) {}

    fn tab_strip_empty(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub(crate) struct ObserverList {
    observers: Vec<(ObserverId, Rc<dyn TabStripObserver>)>,
    next_id: u64,
}

impl ObserverList {
    pub(crate) fn add(&mut self, observer: Rc<dyn TabStripObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Rc<dyn TabStripObserver>> {
        self.observers.iter().map(|(_, observer)| observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;
    impl TabStripObserver for Quiet {}

    #[test]
    fn test_observer_registration_order() {
        let mut list = ObserverList::default();
        let first = list.add(Rc::new(Quiet));
        let second = list.add(Rc::new(Quiet));
        assert_ne!(first, second);
        assert_eq!(list.len(), 2);

        assert!(list.remove(first));
        assert!(!list.remove(first));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_selection_change_flags() {
        let handle = TabHandle::new();
        let model = SelectionModel::new().set_selected_index(0);
        let mut change = SelectionChange::starting_from(Some(handle), &model);
        assert!(!change.active_tab_changed());
        assert!(!change.selection_changed());

        change.new_model = model.clone().add_index_to_selection(1);
        assert!(change.selection_changed());
        assert!(!change.active_tab_changed());

        change.new_tab = Some(TabHandle::new());
        assert!(change.active_tab_changed());
    }

    #[test]
    fn test_change_serializes_with_kind_tag() {
        let change = TabStripChange::Moved {
            handle: TabHandle::new(),
            from: 0,
            to: 2,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], "moved");
        assert_eq!(change.kind(), "moved");
    }
}
