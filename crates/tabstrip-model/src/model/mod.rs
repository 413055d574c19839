//! Tab strip model
//!
//! [`TabStripModel`] owns the tab collection, the group registry, the
//! opener graph and the selection, and is the only way to mutate them.
//! Every public mutation holds the reentrancy guard for its whole duration,
//! rejects bad input before touching any state, and reports what it did
//! through a single [`TabStripChange`] (bulk moves report one `Moved` per
//! tab). Per-tab and per-group side channels accompany it.

mod activation;
mod close;
mod groups;
mod moves;

use std::rc::Rc;

use chrono::Utc;

use crate::collection::TabCollection;
use crate::config::TabStripConfig;
use crate::delegate::TabStripDelegate;
use crate::error::TabStripError;
use crate::flags::{AddTabFlags, PageTransition};
use crate::group::{GroupRegistry, TabGroupId};
use crate::guard::ReentrancyFlag;
use crate::observer::{
    ChangeReason, InsertedTab, ObserverId, ObserverList, SelectionChange, TabGroupChange,
    TabGroupChangeKind, TabStripChange, TabStripObserver,
};
use crate::opener::OpenerGraph;
use crate::policy::NextActivePolicy;
use crate::selection::SelectionModel;
use crate::tab::{Tab, TabHandle};
use crate::Result;

pub struct TabStripModel {
    tabs: TabCollection,
    groups: GroupRegistry,
    openers: OpenerGraph,
    selection: SelectionModel,
    observers: ObserverList,
    delegate: Rc<dyn TabStripDelegate>,
    policy: NextActivePolicy,
    supports_tab_groups: bool,
    reentrancy: ReentrancyFlag,
    /// Set while a batch that closes every tab is running
    closing_all: bool,
}

impl TabStripModel {
    pub fn new(delegate: Rc<dyn TabStripDelegate>, config: &TabStripConfig) -> Self {
        Self {
            tabs: TabCollection::new(),
            groups: GroupRegistry::new(),
            openers: OpenerGraph::new(),
            selection: SelectionModel::new(),
            observers: ObserverList::default(),
            delegate,
            policy: config.next_active_policy(),
            supports_tab_groups: config.supports_tab_groups,
            reentrancy: ReentrancyFlag::default(),
            closing_all: false,
        }
    }

    pub fn add_observer(&mut self, observer: Rc<dyn TabStripObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn count(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> &TabCollection {
        &self.tabs
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn tab_at(&self, index: usize) -> Option<&Tab> {
        self.tabs.get(index)
    }

    pub fn index_of(&self, handle: TabHandle) -> Option<usize> {
        self.tabs.index_of(handle)
    }

    /// Handles in strip order
    pub fn handles(&self) -> Vec<TabHandle> {
        self.tabs.handles()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.selection.active()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.selection.active().and_then(|index| self.tabs.get(index))
    }

    pub fn active_handle(&self) -> Option<TabHandle> {
        self.active_tab().map(Tab::handle)
    }

    pub fn index_of_first_non_pinned(&self) -> usize {
        self.tabs.index_of_first_non_pinned()
    }

    pub fn is_tab_pinned(&self, index: usize) -> bool {
        self.tabs.get(index).is_some_and(Tab::is_pinned)
    }

    pub fn is_tab_selected(&self, index: usize) -> bool {
        self.selection.is_selected(index)
    }

    pub fn group_of(&self, index: usize) -> Option<TabGroupId> {
        self.tabs.group_at(index)
    }

    pub fn supports_tab_groups(&self) -> bool {
        self.supports_tab_groups
    }

    pub fn is_closing_all(&self) -> bool {
        self.closing_all
    }

    pub fn tabs_are_loading(&self) -> bool {
        self.tabs.iter().any(|tab| tab.session().is_loading())
    }

    pub fn is_tab_closable(&self, index: usize) -> bool {
        self.tabs
            .get(index)
            .is_some_and(|tab| self.delegate.is_closable(tab.session()))
    }

    pub fn is_tab_reloadable(&self, index: usize) -> bool {
        self.tabs
            .get(index)
            .is_some_and(|tab| self.delegate.can_reload(tab.session()))
    }

    /// Structural and selection invariants, for tests and diagnostics
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if !self.selection.is_valid_for(self.tabs.len()) {
            return Err(format!(
                "selection {:?} is invalid for {} tabs",
                self.selection,
                self.tabs.len()
            ));
        }
        self.tabs.check_invariants(&self.groups)
    }

    // -- openers ----------------------------------------------------------

    pub fn opener_of(&self, index: usize) -> Option<TabHandle> {
        self.tabs
            .get(index)
            .and_then(|tab| self.openers.opener_of(tab.handle()))
    }

    pub fn set_opener_of(&mut self, index: usize, opener: Option<usize>) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.ensure_index(index)?;
        if let Some(opener) = opener {
            self.ensure_index(opener)?;
        }

        let child = self.tabs[index].handle();
        let opener = opener.map(|i| self.tabs[i].handle());
        self.openers.set_opener(child, opener);

        Ok(())
    }

    pub fn forget_all_openers(&mut self) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        self.openers.forget_all();
        Ok(())
    }

    /// Nearest tab opened by `opener`, scanning right of `start` first
    pub fn index_of_next_tab_opened_by(&self, opener: TabHandle, start: usize) -> Option<usize> {
        self.openers
            .index_of_next_opened_by(&self.tabs.handles(), opener, start)
    }

    /// Last tab in the run of descendants of `opener` right of `start`
    pub fn index_of_last_tab_opened_by(&self, opener: TabHandle, start: usize) -> Option<usize> {
        self.openers.index_of_last_opened_by(
            &self.tabs.handles(),
            self.tabs.index_of_first_non_pinned(),
            opener,
            start,
        )
    }

    /// The tab started a navigation. Transitions that begin a new task drop
    /// every opener relation, unless this is the new tab just opened at the
    /// end of the strip.
    pub fn tab_navigating(&mut self, handle: TabHandle, transition: PageTransition) -> Result<()> {
        let _guard = self.reentrancy.acquire()?;
        let index = self
            .tabs
            .index_of(handle)
            .ok_or(TabStripError::UnknownTab(handle))?;

        if transition.forgets_openers() && !self.is_new_tab_at_end(index) {
            self.openers.forget_all();
        }

        Ok(())
    }

    fn is_new_tab_at_end(&self, index: usize) -> bool {
        index + 1 == self.tabs.len() && self.tabs[index].reset_opener_on_active_tab_change()
    }

    // -- insertion --------------------------------------------------------

    /// Insert `tab` at `index` (clamped to the legal range for its pinned
    /// state) and return where it landed.
    pub fn insert_tab_at(
        &mut self,
        index: usize,
        tab: Tab,
        flags: AddTabFlags,
        group: Option<TabGroupId>,
    ) -> Result<usize> {
        let _guard = self.reentrancy.acquire()?;
        let index = self.insert_tab_at_impl(index, tab, flags, group);
        self.validate();
        Ok(index)
    }

    pub fn append_tab(&mut self, tab: Tab, foreground: bool) -> Result<usize> {
        let flags = if foreground {
            AddTabFlags::ACTIVE | AddTabFlags::INHERIT_OPENER
        } else {
            AddTabFlags::NONE
        };
        self.insert_tab_at(self.tabs.len(), tab, flags, None)
    }

    /// Add a tab opened by a navigation. Links open next to the active tab
    /// (after its earlier children when in the background) and inherit its
    /// opener and group; typed navigations appended at the end remember the
    /// active tab as opener only until the user switches away.
    pub fn add_tab(
        &mut self,
        tab: Tab,
        index: Option<usize>,
        transition: PageTransition,
        flags: AddTabFlags,
        group: Option<TabGroupId>,
    ) -> Result<usize> {
        let _guard = self.reentrancy.acquire()?;

        let count = self.tabs.len();
        let mut flags = flags;
        let mut group = group;
        let mut index = index.filter(|i| *i <= count).unwrap_or(count);

        if transition == PageTransition::Link && !flags.force_index {
            index = self.determine_insertion_index(transition, flags.active);
            flags.inherit_opener = true;
            if !flags.pinned && group.is_none() {
                group = self.active_tab().and_then(Tab::group);
            }
        } else if transition == PageTransition::Typed && index == count {
            flags.inherit_opener = true;
        }

        let handle = tab.handle();
        let mut index = self.insert_tab_at_impl(index, tab, flags, group);

        if flags.inherit_opener && transition == PageTransition::Typed {
            index = self.tabs.index_of(handle).unwrap_or(index);
            if let Some(tab) = self.tabs.get_mut(index) {
                tab.set_reset_opener_on_active_tab_change(true);
            }
        }

        self.validate();
        Ok(index)
    }

    fn determine_insertion_index(&self, transition: PageTransition, foreground: bool) -> usize {
        let count = self.tabs.len();
        let Some(active) = self.selection.active() else {
            return count;
        };
        if transition != PageTransition::Link {
            return count;
        }
        if foreground {
            return active + 1;
        }

        let opener = self.tabs[active].handle();
        match self.index_of_last_tab_opened_by(opener, active) {
            // stay inside the opener's group run
            Some(last) => {
                let group = self.tabs.group_at(active);
                (active + 1..=last)
                    .find(|&i| self.tabs.group_at(i) != group)
                    .unwrap_or(last + 1)
            }
            None => active + 1,
        }
    }

    fn insert_tab_at_impl(
        &mut self,
        index: usize,
        mut tab: Tab,
        flags: AddTabFlags,
        group: Option<TabGroupId>,
    ) -> usize {
        self.delegate.will_add_page_session(tab.session());

        let active = flags.active || self.tabs.is_empty();
        let pinned = flags.pinned;
        let index = self
            .tabs
            .constrain_insertion_index(index.min(self.tabs.len()), pinned);
        let (index, group) = if pinned || !self.supports_tab_groups {
            (index, None)
        } else {
            self.resolve_insertion_group(index, group)
        };

        if active && !self.closing_all {
            if let Some(current) = self.active_tab() {
                current.session().will_enter_background();
            }
        }

        let handle = tab.handle();
        tab.set_pinned(pinned);
        tab.set_group(group);
        tab.set_blocked(tab.session().has_blocking_dialog());

        if flags.inherit_opener {
            if let Some(opener) = self.active_handle() {
                if active {
                    self.openers.forget_all();
                }
                self.openers.set_opener(handle, Some(opener));
            }
        }

        let mut selection = SelectionChange::starting_from(self.active_handle(), &self.selection);

        self.tabs.insert(index, tab);
        self.selection = std::mem::take(&mut self.selection).increment_from(index);
        if active {
            let model = self.selection.clone().set_selected_index(index);
            self.set_selection(model, ChangeReason::None, true);
        }
        selection.new_model = self.selection.clone();
        selection.new_tab = self.active_handle();

        tracing::debug!(tab = %handle, index, pinned, active, "Inserted tab");

        self.notify(
            TabStripChange::Inserted {
                tabs: vec![InsertedTab { handle, index }],
            },
            selection,
        );

        if group.is_some() {
            self.commit_group(index, None, group);
        }

        index
    }

    /// Final slot and group for an insertion at the already-constrained
    /// `index`. A live requested group pulls the slot into its span; any
    /// other insertion joins the group it lands inside.
    fn resolve_insertion_group(
        &self,
        index: usize,
        requested: Option<TabGroupId>,
    ) -> (usize, Option<TabGroupId>) {
        match requested {
            Some(group) if self.groups.contains(group) => match self.tabs.group_range(group) {
                Some(range) => (index.clamp(range.start, range.end), Some(group)),
                // a fresh group must not split a neighbouring one
                None => {
                    let index = self
                        .tabs
                        .surrounding_group(index)
                        .and_then(|other| self.tabs.group_range(other))
                        .map_or(index, |range| range.end);
                    (index, Some(group))
                }
            },
            Some(group) => {
                tracing::warn!(group = %group, "Ignoring stale tab group on insert");
                (index, self.tabs.surrounding_group(index))
            }
            None => (index, self.tabs.surrounding_group(index)),
        }
    }

    // -- protocol internals -----------------------------------------------

    fn ensure_index(&self, index: usize) -> Result<()> {
        if self.tabs.contains_index(index) {
            Ok(())
        } else {
            Err(TabStripError::InvalidIndex {
                index,
                count: self.tabs.len(),
            })
        }
    }

    /// Non-empty, strictly ascending and in range
    fn ensure_indices(&self, indices: &[usize]) -> Result<()> {
        let Some(&last) = indices.last() else {
            return Err(TabStripError::EmptyIndices);
        };
        if indices.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TabStripError::UnsortedIndices);
        }
        self.ensure_index(last)
    }

    fn ensure_groups_supported(&self) -> Result<()> {
        if self.supports_tab_groups {
            Ok(())
        } else {
            Err(TabStripError::GroupsUnsupported)
        }
    }

    /// Commit-time checks. A failure here is a bug in the protocol, never
    /// in caller input.
    fn validate(&self) {
        assert!(
            self.selection.is_valid_for(self.tabs.len()),
            "selection {:?} is invalid for {} tabs",
            self.selection,
            self.tabs.len()
        );
        #[cfg(debug_assertions)]
        if let Err(violation) = self.tabs.check_invariants(&self.groups) {
            panic!("tab strip invariant violated: {violation}");
        }
    }

    fn notify_observers(&self, notify: impl Fn(&dyn TabStripObserver)) {
        for observer in self.observers.iter() {
            notify(observer.as_ref());
        }
    }

    fn notify_group_changed(&self, group: TabGroupId, kind: TabGroupChangeKind) {
        let change = TabGroupChange { group, kind };
        self.notify_observers(|observer| observer.on_tab_group_changed(&change));
    }

    /// Deliver the operation's change record
    fn notify(&mut self, change: TabStripChange, selection: SelectionChange) {
        self.on_active_tab_changed(&selection);

        tracing::trace!(kind = change.kind(), observers = self.observers.len(), "Tab strip changed");
        self.notify_observers(|observer| {
            observer.on_tab_strip_model_changed(self, &change, &selection)
        });
    }

    /// Commit `model` as the selection. Unless `triggered_by_other`, a real
    /// change runs the foreground hooks and is reported as `SelectionOnly`;
    /// otherwise the caller folds it into its own notification.
    fn set_selection(
        &mut self,
        model: SelectionModel,
        reason: ChangeReason,
        triggered_by_other: bool,
    ) -> SelectionChange {
        let mut selection = SelectionChange::starting_from(self.active_handle(), &self.selection);
        selection.reason = reason;

        let old_active = self.selection.active();
        if !triggered_by_other && !self.closing_all && old_active != model.active() {
            if let Some(outgoing) = self.active_tab() {
                outgoing.session().will_enter_background();
            }
        }

        assert!(
            model.is_valid_for(self.tabs.len()),
            "selection {:?} is invalid for {} tabs",
            model,
            self.tabs.len()
        );
        self.selection = model;
        selection.new_model = self.selection.clone();
        selection.new_tab = self.active_handle();

        if selection.active_tab_changed() {
            if let Some(tab) = self.selection.active().and_then(|i| self.tabs.get_mut(i)) {
                tab.mark_active();
            }
        }

        if !triggered_by_other && (selection.active_tab_changed() || selection.selection_changed()) {
            if selection.active_tab_changed() {
                self.run_foreground_hooks(&selection);
            }
            self.notify(TabStripChange::SelectionOnly, selection.clone());
        }

        selection
    }

    fn run_foreground_hooks(&self, selection: &SelectionChange) {
        if let Some(tab) = self.active_tab() {
            tab.session().did_become_active(Utc::now());
        }

        let outgoing = selection
            .old_tab
            .and_then(|handle| self.tabs.index_of(handle))
            .map(|index| &self.tabs[index]);
        if let Some(tab) = outgoing.filter(|tab| tab.session().is_audible()) {
            self.delegate.audible_tab_backgrounded(tab.handle());
        }
    }

    /// Opener bookkeeping that runs before any change is dispatched
    fn on_active_tab_changed(&mut self, selection: &SelectionChange) {
        if !selection.active_tab_changed() || self.tabs.is_empty() {
            return;
        }

        let mut old_opener = None;
        if let Some(old) = selection.old_tab {
            if let Some(index) = self.tabs.index_of(old) {
                old_opener = self.openers.opener_of(old);
                if self.tabs[index].reset_opener_on_active_tab_change() {
                    self.openers.forget(old);
                }
            }
        }

        let new_opener = selection.new_tab.and_then(|new| self.openers.opener_of(new));

        // a user switching tabs, other than hopping between a tab and its
        // opener, ends the current opener lineage
        if selection.reason == ChangeReason::UserGesture
            && new_opener != old_opener
            && ((selection.old_tab.is_none() && new_opener.is_none())
                || new_opener != selection.old_tab)
            && ((selection.new_tab.is_none() && old_opener.is_none())
                || old_opener != selection.new_tab)
        {
            self.openers.forget_all();
        }
    }

    /// Move the tab at `index` into `group` (or out of any group), keeping
    /// the registry count in step. Fires one per-tab notification, then the
    /// group-level ones.
    fn group_tab(&mut self, index: usize, group: Option<TabGroupId>) {
        let Some(tab) = self.tabs.get(index) else {
            return;
        };
        let handle = tab.handle();
        let old = tab.group();

        let group = group.filter(|group| {
            let known = self.groups.contains(*group);
            if !known {
                tracing::warn!(group = %group, "Ignoring stale tab group");
            }
            known
        });
        if old == group {
            return;
        }

        let mut closed = None;
        if let Some(old) = old {
            match self.groups.remove_tab(old) {
                Ok(Some(_)) => closed = Some(old),
                Ok(None) => {}
                Err(err) => tracing::warn!(group = %old, error = %err, "Tab left an unregistered group"),
            }
        }
        if let Some(new) = group {
            if let Err(err) = self.groups.add_tab(new) {
                tracing::warn!(group = %new, error = %err, "Failed to count tab into group");
            }
        }
        if let Some(tab) = self.tabs.get_mut(index) {
            tab.set_group(group);
        }

        tracing::debug!(tab = %handle, index, group = ?group, "Tab group membership changed");
        self.notify_observers(|observer| observer.tab_grouped_state_changed(group, handle, index));

        if let Some(old) = old.filter(|old| closed != Some(*old)) {
            self.notify_group_changed(old, TabGroupChangeKind::ContentsChanged);
        }
        if let Some(new) = group {
            self.notify_group_changed(new, TabGroupChangeKind::ContentsChanged);
        }
        if let Some(closed) = closed {
            tracing::info!(group = %closed, "Tab group closed");
            self.notify_group_changed(closed, TabGroupChangeKind::Closed);
        }
    }

    /// Settle a group field written provisionally during a structural
    /// change: restore `previous`, then run the full membership transition.
    fn commit_group(
        &mut self,
        index: usize,
        previous: Option<TabGroupId>,
        group: Option<TabGroupId>,
    ) {
        if previous == group {
            return;
        }
        if let Some(tab) = self.tabs.get_mut(index) {
            tab.set_group(previous);
        }
        self.group_tab(index, group);
    }
}
