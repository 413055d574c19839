//! Detach and close
//!
//! Every removal goes through [`TabStripModel::detach_tab_impl`]. Batches
//! collect the detached records and report them in one `Removed` change,
//! sorted by original index descending, before handing the tabs to the
//! delegate.

use std::collections::BTreeMap;

use crate::delegate::{DetachedTab, PageSession, RemoveReason, ResourceKey};
use crate::error::TabStripError;
use crate::flags::{CloseCommand, CloseOutcome, CloseTabFlags};
use crate::group::TabGroupId;
use crate::observer::{
    ChangeReason, CloseAllStoppedReason, RemovedTab, SelectionChange, TabStripChange,
};
use crate::selection::SelectionModel;
use crate::tab::{Tab, TabHandle};
use crate::Result;

use super::TabStripModel;

/// Removal bookkeeping shared by every tab detached in one operation
struct DetachBatch {
    initially_active: Option<TabHandle>,
    initial_model: SelectionModel,
    initial_order: Vec<TabHandle>,
    detached: Vec<DetachedTab>,
}

impl DetachBatch {
    fn new(model: &TabStripModel) -> Self {
        Self {
            initially_active: model.active_handle(),
            initial_model: model.selection.clone(),
            initial_order: model.tabs.handles(),
            detached: Vec::new(),
        }
    }

    fn original_index(&self, handle: TabHandle) -> Option<usize> {
        self.initial_order.iter().position(|h| *h == handle)
    }
}

impl TabStripModel {
    /// Close the given tabs. Tabs whose unload listeners must run first stay
    /// in the strip until [`Self::unload_listener_finished`] is called.
    pub fn close_tabs(
        &mut self,
        handles: &[TabHandle],
        flags: CloseTabFlags,
    ) -> Result<CloseOutcome> {
        let _guard = self.reentrancy.acquire()?;
        let outcome = self.close_tabs_impl(handles, flags);
        self.validate();
        Ok(outcome)
    }

    pub fn close_tab_at(&mut self, index: usize, flags: CloseTabFlags) -> Result<CloseOutcome> {
        self.ensure_index(index)?;
        let handle = self.tabs[index].handle();
        self.close_tabs(&[handle], flags)
    }

    pub fn close_selected_tabs(&mut self) -> Result<CloseOutcome> {
        let handles: Vec<TabHandle> = self
            .selection
            .selected_indices()
            .filter_map(|index| self.tabs.get(index).map(Tab::handle))
            .collect();
        self.close_tabs(
            &handles,
            CloseTabFlags::CREATE_HISTORICAL_TAB | CloseTabFlags::USER_GESTURE,
        )
    }

    pub fn close_all_tabs(&mut self, flags: CloseTabFlags) -> Result<CloseOutcome> {
        let handles: Vec<TabHandle> = self.tabs.iter().rev().map(Tab::handle).collect();
        self.close_tabs(&handles, flags)
    }

    /// Close every member of `group`. A stale id closes nothing.
    pub fn close_all_tabs_in_group(&mut self, group: TabGroupId) -> Result<CloseOutcome> {
        let _guard = self.reentrancy.acquire()?;
        let Some(range) = self.tabs.group_range(group) else {
            tracing::warn!(group = %group, "Ignoring close request for stale tab group");
            return Ok(CloseOutcome {
                closed_all: true,
                closed: Vec::new(),
            });
        };

        self.delegate.will_close_group(group);
        let handles: Vec<TabHandle> = range.rev().map(|index| self.tabs[index].handle()).collect();
        let outcome = self.close_tabs_impl(&handles, CloseTabFlags::CREATE_HISTORICAL_TAB);
        self.validate();
        Ok(outcome)
    }

    /// Indices a command issued on `index` would close, descending
    pub fn indices_closed_by_command(
        &self,
        index: usize,
        command: CloseCommand,
    ) -> Result<Vec<usize>> {
        self.ensure_index(index)?;
        let targets = self.indices_for_command(index);
        let is_selected = self.selection.is_selected(index);
        let start = match command {
            CloseCommand::OtherTabs => 0,
            CloseCommand::TabsToRight => targets.last().map_or(index, |last| last + 1),
        };

        Ok((start..self.tabs.len())
            .rev()
            .filter(|&i| i != index && !self.is_tab_pinned(i))
            .filter(|&i| !is_selected || !self.selection.is_selected(i))
            .collect())
    }

    pub fn close_tabs_by_command(
        &mut self,
        index: usize,
        command: CloseCommand,
    ) -> Result<CloseOutcome> {
        let handles: Vec<TabHandle> = self
            .indices_closed_by_command(index, command)?
            .into_iter()
            .map(|i| self.tabs[i].handle())
            .collect();
        self.close_tabs(
            &handles,
            CloseTabFlags::CREATE_HISTORICAL_TAB | CloseTabFlags::USER_GESTURE,
        )
    }

    /// The selection when `index` is part of it, otherwise `index` alone
    pub fn indices_for_command(&self, index: usize) -> Vec<usize> {
        if self.selection.is_selected(index) {
            self.selection.selected_indices().collect()
        } else {
            vec![index]
        }
    }

    /// Completion of a deferred close. With `proceed` the tab is detached
    /// exactly as the original close would have; otherwise it stays and
    /// observers hear `tab_close_cancelled`. Returns whether it was closed.
    pub fn unload_listener_finished(&mut self, handle: TabHandle, proceed: bool) -> Result<bool> {
        let _guard = self.reentrancy.acquire()?;
        let index = self
            .tabs
            .index_of(handle)
            .ok_or(TabStripError::UnknownTab(handle))?;
        let Some(flags) = self.tabs[index].pending_close() else {
            return Ok(false);
        };

        if !proceed {
            if let Some(tab) = self.tabs.get_mut(index) {
                tab.set_pending_close(None);
                tab.set_closed_by_user_gesture(false);
            }
            tracing::debug!(tab = %handle, "Deferred close cancelled");
            self.notify_observers(|observer| observer.tab_close_cancelled(handle));
            return Ok(false);
        }

        let mut batch = DetachBatch::new(self);
        let reason = self.close_reason(self.tabs[index].session());
        self.background_if_active(index);
        let detached = self.detach_tab_impl(index, index, flags.create_historical_tab, reason);
        batch.detached.push(detached);
        self.send_detach_notifications(batch);

        self.validate();
        Ok(true)
    }

    /// Detach a tab that is moving to another strip, returning it intact
    pub fn detach_tab_at_for_insertion(&mut self, index: usize) -> Result<Tab> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        let handle = self.tabs[index].handle();

        let mut batch = DetachBatch::new(self);
        self.background_if_active(index);
        let detached =
            self.detach_tab_impl(index, index, false, RemoveReason::InsertedIntoOtherTabStrip);
        batch.detached.push(detached);
        let tab = self
            .send_detach_notifications(batch)
            .pop()
            .map(|detached| detached.tab)
            .ok_or(TabStripError::UnknownTab(handle))?;

        self.validate();
        Ok(tab)
    }

    /// Detach a tab and hand it to the delegate for destruction, skipping
    /// unload listeners and history
    pub fn detach_and_delete_tab_at(&mut self, index: usize) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;

        let mut batch = DetachBatch::new(self);
        self.background_if_active(index);
        let detached = self.detach_tab_impl(index, index, false, RemoveReason::Deleted);
        batch.detached.push(detached);
        self.send_detach_notifications(batch);

        self.validate();
        Ok(())
    }

    /// Swap the page session behind a tab, keeping its handle and position.
    /// Tabs it opened no longer count as its children.
    pub fn replace_page_session_at(
        &mut self,
        index: usize,
        session: Box<dyn PageSession>,
    ) -> Result<Box<dyn PageSession>> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        self.delegate.will_add_page_session(session.as_ref());

        let handle = self.tabs[index].handle();
        self.openers.repoint_children_of(handle);

        let mut selection = SelectionChange::starting_from(self.active_handle(), &self.selection);
        if self.selection.active() == Some(index) {
            selection.reason = ChangeReason::Replaced;
        }

        let old = match self.tabs.get_mut(index) {
            Some(tab) => tab.replace_session(session),
            None => return Err(TabStripError::UnknownTab(handle)),
        };

        tracing::debug!(tab = %handle, index, "Replaced page session");
        self.notify(TabStripChange::Replaced { handle, index }, selection);

        self.validate();
        Ok(old)
    }

    fn close_tabs_impl(&mut self, handles: &[TabHandle], flags: CloseTabFlags) -> CloseOutcome {
        let mut closable: Vec<TabHandle> = Vec::with_capacity(handles.len());
        for &handle in handles {
            let Some(index) = self.tabs.index_of(handle) else {
                tracing::warn!(tab = %handle, "Ignoring close request for unknown tab");
                continue;
            };
            if closable.contains(&handle) {
                continue;
            }
            if self.delegate.is_closable(self.tabs[index].session()) {
                closable.push(handle);
            } else {
                self.notify_observers(|observer| observer.tab_close_cancelled(handle));
            }
        }

        if closable.is_empty() {
            return CloseOutcome {
                closed_all: true,
                closed: Vec::new(),
            };
        }

        let closing_all = closable.len() == self.tabs.len();
        let was_closing_all = self.closing_all;
        if closing_all {
            self.closing_all = true;
            self.notify_observers(|observer| observer.will_close_all_tabs(self));
        }

        tracing::info!(count = closable.len(), closing_all, "Closing tabs");

        let mut batch = DetachBatch::new(self);
        let closed_all = self.close_page_sessions(&closable, flags, &mut batch);
        let closed: Vec<TabHandle> = batch.detached.iter().map(DetachedTab::handle).collect();
        if !batch.detached.is_empty() {
            self.send_detach_notifications(batch);
        }

        if closing_all {
            let reason = if closed_all {
                CloseAllStoppedReason::Completed
            } else {
                CloseAllStoppedReason::Canceled
            };
            self.notify_observers(|observer| observer.close_all_tabs_stopped(self, reason));
        }
        self.closing_all = was_closing_all;

        CloseOutcome { closed_all, closed }
    }

    /// Returns false if any tab deferred its close
    fn close_page_sessions(
        &mut self,
        handles: &[TabHandle],
        flags: CloseTabFlags,
        batch: &mut DetachBatch,
    ) -> bool {
        self.request_expedited_teardown(handles);

        let mut closed_all = true;
        for &handle in handles {
            let Some(index) = self.tabs.index_of(handle) else {
                continue;
            };
            let original_index = batch.original_index(handle).unwrap_or(index);

            let Some(tab) = self.tabs.get_mut(index) else {
                continue;
            };
            if flags.user_gesture {
                tab.set_closed_by_user_gesture(true);
            }
            if tab.is_unload_pending() {
                closed_all = false;
                continue;
            }
            if self.delegate.run_unload_listener_before_closing(tab.session()) {
                tab.set_pending_close(Some(flags));
                tracing::debug!(tab = %handle, "Close deferred until unload listeners finish");
                closed_all = false;
                continue;
            }

            let reason = self.close_reason(self.tabs[index].session());
            self.background_if_active(index);
            let detached =
                self.detach_tab_impl(original_index, index, flags.create_historical_tab, reason);
            batch.detached.push(detached);
        }

        closed_all
    }

    /// Let each backing resource whose tabs are all closing without unload
    /// listeners be torn down early
    fn request_expedited_teardown(&self, handles: &[TabHandle]) {
        let mut resources: BTreeMap<ResourceKey, usize> = BTreeMap::new();
        let tabs = handles
            .iter()
            .filter_map(|handle| self.tabs.index_of(*handle))
            .map(|index| &self.tabs[index]);
        for tab in tabs {
            if self
                .delegate
                .should_run_unload_listener_before_closing(tab.session())
            {
                continue;
            }
            if let Some(resource) = tab.session().resource_key() {
                *resources.entry(resource).or_default() += 1;
            }
        }

        for (resource, closing) in resources {
            self.delegate.request_expedited_teardown(resource, closing);
        }
    }

    fn close_reason(&self, session: &dyn PageSession) -> RemoveReason {
        if self.delegate.should_cache_on_close(session) {
            RemoveReason::Cached
        } else {
            RemoveReason::Deleted
        }
    }

    fn background_if_active(&self, index: usize) {
        if !self.closing_all && self.selection.active() == Some(index) {
            self.tabs[index].session().will_enter_background();
        }
    }

    /// Take the tab at `index` out of the strip. The replacement active tab
    /// is chosen against the strip and opener graph as they were before the
    /// removal.
    pub(super) fn detach_tab_impl(
        &mut self,
        index_before_any_removals: usize,
        index: usize,
        create_historical_entry: bool,
        reason: RemoveReason,
    ) -> DetachedTab {
        let handle = self.tabs[index].handle();
        self.notify_observers(|observer| observer.on_tab_will_be_removed(handle, index));
        self.tabs[index].session().will_detach(reason);

        let next_selected = self.policy.determine(
            &self.tabs,
            &self.groups,
            &self.openers,
            &self.selection,
            index,
        );
        self.openers.repoint_children_of(handle);

        let historical_id = if create_historical_entry {
            self.delegate
                .create_historical_entry(handle, index, self.tabs[index].session())
        } else {
            None
        };

        self.group_tab(index, None);

        let mut tab = self.tabs.remove(index);
        tab.set_pending_close(None);
        self.openers.remove(handle);

        self.selection = if self.tabs.is_empty() {
            SelectionModel::new()
        } else {
            let was_active = self.selection.active() == Some(index);
            let model = std::mem::take(&mut self.selection).decrement_from(index);
            match model.first_selected() {
                Some(first) if was_active => model.set_active(Some(first)),
                None => {
                    let fallback = next_selected.unwrap_or(index.min(self.tabs.len() - 1));
                    model.set_selected_index(fallback)
                }
                Some(_) => model,
            }
        };

        tracing::debug!(tab = %handle, index, ?reason, "Detached tab");

        DetachedTab {
            tab,
            index_before_any_removals,
            index_at_time_of_removal: index,
            reason,
            historical_id,
        }
    }

    /// Report a finished batch, then release the tabs. Records for tabs
    /// moving to another strip are returned to the caller.
    fn send_detach_notifications(&mut self, batch: DetachBatch) -> Vec<DetachedTab> {
        let DetachBatch {
            initially_active,
            initial_model,
            mut detached,
            ..
        } = batch;
        detached.sort_by(|a, b| b.index_before_any_removals.cmp(&a.index_before_any_removals));

        let removed: Vec<RemovedTab> = detached
            .iter()
            .map(|record| RemovedTab {
                handle: record.handle(),
                index: record.index_before_any_removals,
                reason: record.reason,
                historical_id: record.historical_id,
            })
            .collect();
        let selected_tabs_were_removed = detached
            .iter()
            .any(|record| initial_model.is_selected(record.index_before_any_removals));

        let selection = SelectionChange {
            old_tab: initially_active,
            new_tab: self.active_handle(),
            old_model: initial_model,
            new_model: self.selection.clone(),
            reason: ChangeReason::None,
            selected_tabs_were_removed,
        };
        self.notify(TabStripChange::Removed { tabs: removed }, selection);

        let mut cached = Vec::new();
        let mut moved = Vec::new();
        for record in detached {
            match record.reason {
                RemoveReason::Deleted => self.delegate.tab_destroyed(record.tab),
                RemoveReason::Cached => cached.push(record),
                RemoveReason::InsertedIntoOtherTabStrip => moved.push(record),
            }
        }
        if !cached.is_empty() {
            self.delegate.cache_detached(cached);
        }

        if self.tabs.is_empty() {
            self.notify_observers(|observer| observer.tab_strip_empty());
        }

        moved
    }
}
