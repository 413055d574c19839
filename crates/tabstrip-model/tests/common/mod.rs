//! Shared fixtures for the tab strip integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tabstrip_model::{
    AddTabFlags, CloseAllStoppedReason, DetachedTab, HistoricalEntryId, PageSession,
    ResourceKey, SelectionChange, Tab, TabGroupChange, TabGroupId, TabHandle, TabStripChange,
    TabStripConfig, TabStripDelegate, TabStripModel, TabStripObserver,
};

/// Everything an observer can hear, flattened for assertions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Changed(TabStripChange, SelectionChange),
    WillBeRemoved(TabHandle, usize),
    Pinned(TabHandle, usize),
    Blocked(TabHandle, usize),
    Grouped(Option<TabGroupId>, TabHandle, usize),
    Group(TabGroupChange),
    CloseCancelled(TabHandle),
    WillCloseAll,
    CloseAllStopped(CloseAllStoppedReason),
    Empty,
}

#[derive(Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<Event> {
        self.events.take()
    }

    pub fn changes(&self) -> Vec<TabStripChange> {
        self.take()
            .into_iter()
            .filter_map(|event| match event {
                Event::Changed(change, _) => Some(change),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl TabStripObserver for Recorder {
    fn on_tab_strip_model_changed(
        &self,
        model: &TabStripModel,
        change: &TabStripChange,
        selection: &SelectionChange,
    ) {
        if let Err(violation) = structurally_sound(model) {
            panic!("observer saw a broken strip: {violation}");
        }
        self.push(Event::Changed(change.clone(), selection.clone()));
    }

    fn on_tab_will_be_removed(&self, handle: TabHandle, index: usize) {
        self.push(Event::WillBeRemoved(handle, index));
    }

    fn tab_pinned_state_changed(&self, _model: &TabStripModel, handle: TabHandle, index: usize) {
        self.push(Event::Pinned(handle, index));
    }

    fn tab_blocked_state_changed(&self, handle: TabHandle, index: usize) {
        self.push(Event::Blocked(handle, index));
    }

    fn tab_grouped_state_changed(&self, group: Option<TabGroupId>, handle: TabHandle, index: usize) {
        self.push(Event::Grouped(group, handle, index));
    }

    fn on_tab_group_changed(&self, change: &TabGroupChange) {
        self.push(Event::Group(change.clone()));
    }

    fn tab_close_cancelled(&self, handle: TabHandle) {
        self.push(Event::CloseCancelled(handle));
    }

    fn will_close_all_tabs(&self, _model: &TabStripModel) {
        self.push(Event::WillCloseAll);
    }

    fn close_all_tabs_stopped(&self, _model: &TabStripModel, reason: CloseAllStoppedReason) {
        self.push(Event::CloseAllStopped(reason));
    }

    fn tab_strip_empty(&self) {
        self.push(Event::Empty);
    }
}

/// What must hold whenever an observer looks: a pinned prefix, contiguous
/// groups and a valid selection. Registry counts may still be settling.
pub fn structurally_sound(model: &TabStripModel) -> Result<(), String> {
    let first_unpinned = model.index_of_first_non_pinned();
    let mut seen: Vec<TabGroupId> = Vec::new();
    for (index, tab) in model.tabs().iter().enumerate() {
        if tab.is_pinned() != (index < first_unpinned) {
            return Err(format!("pinned flag out of order at {index}"));
        }
        if let Some(group) = tab.group() {
            if tab.is_pinned() {
                return Err(format!("pinned tab at {index} is grouped"));
            }
            if seen.last() != Some(&group) {
                if seen.contains(&group) {
                    return Err(format!("group {group} split at {index}"));
                }
                seen.push(group);
            }
        }
    }
    if !model.selection().is_valid_for(model.count()) {
        return Err(format!("selection invalid for {} tabs", model.count()));
    }
    Ok(())
}

/// Fake page session. The url doubles as a name the delegate can key on.
pub struct Page {
    pub url: String,
    pub resource: Option<ResourceKey>,
    pub log: Rc<RefCell<Vec<String>>>,
}

impl Page {
    pub fn named(url: &str) -> Self {
        Self {
            url: url.to_string(),
            resource: None,
            log: Rc::default(),
        }
    }

    pub fn logged(url: &str, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            url: url.to_string(),
            resource: None,
            log: Rc::clone(log),
        }
    }

    fn record(&self, what: &str) {
        self.log.borrow_mut().push(format!("{what}:{}", self.url));
    }
}

impl PageSession for Page {
    fn will_enter_background(&self) {
        self.record("background");
    }

    fn did_become_active(&self, _switch_started_at: chrono::DateTime<chrono::Utc>) {
        self.record("active");
    }

    fn will_detach(&self, _reason: tabstrip_model::RemoveReason) {
        self.record("detach");
    }

    fn resource_key(&self) -> Option<ResourceKey> {
        self.resource
    }

    fn url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

/// Delegate whose answers are keyed on page urls
#[derive(Default)]
pub struct ScriptedDelegate {
    pub defer_unload: RefCell<HashSet<String>>,
    pub cache: RefCell<HashSet<String>>,
    pub unclosable: RefCell<HashSet<String>>,
    pub destroyed: RefCell<Vec<TabHandle>>,
    pub cached: RefCell<Vec<TabHandle>>,
    pub history: RefCell<Vec<(TabHandle, usize)>>,
    pub teardown: RefCell<Vec<(ResourceKey, usize)>>,
    pub editable: Cell<bool>,
}

impl ScriptedDelegate {
    pub fn new() -> Self {
        Self {
            editable: Cell::new(true),
            ..Self::default()
        }
    }

    fn listed(set: &RefCell<HashSet<String>>, session: &dyn PageSession) -> bool {
        session
            .url()
            .is_some_and(|url| set.borrow().contains(&url))
    }
}

impl TabStripDelegate for ScriptedDelegate {
    fn create_historical_entry(
        &self,
        handle: TabHandle,
        index: usize,
        _session: &dyn PageSession,
    ) -> Option<HistoricalEntryId> {
        let mut history = self.history.borrow_mut();
        history.push((handle, index));
        Some(HistoricalEntryId(history.len() as u64))
    }

    fn should_run_unload_listener_before_closing(&self, session: &dyn PageSession) -> bool {
        Self::listed(&self.defer_unload, session)
    }

    fn run_unload_listener_before_closing(&self, session: &dyn PageSession) -> bool {
        Self::listed(&self.defer_unload, session)
    }

    fn should_cache_on_close(&self, session: &dyn PageSession) -> bool {
        Self::listed(&self.cache, session)
    }

    fn cache_detached(&self, tabs: Vec<DetachedTab>) {
        self.cached
            .borrow_mut()
            .extend(tabs.iter().map(DetachedTab::handle));
    }

    fn tab_destroyed(&self, tab: Tab) {
        self.destroyed.borrow_mut().push(tab.handle());
    }

    fn is_closable(&self, session: &dyn PageSession) -> bool {
        !Self::listed(&self.unclosable, session)
    }

    fn is_tab_strip_editable(&self) -> bool {
        self.editable.get()
    }

    fn request_expedited_teardown(&self, resource: ResourceKey, closing_tabs: usize) {
        self.teardown.borrow_mut().push((resource, closing_tabs));
    }
}

/// A strip holding one page per name, first page active
pub fn strip(delegate: Rc<dyn TabStripDelegate>, names: &[&str]) -> TabStripModel {
    let mut model = TabStripModel::new(delegate, &TabStripConfig::default());
    for name in names {
        model
            .insert_tab_at(
                model.count(),
                Tab::new(Box::new(Page::named(name))),
                AddTabFlags::NONE,
                None,
            )
            .expect("insert");
    }
    model
}

pub fn observe(model: &mut TabStripModel) -> Rc<Recorder> {
    let recorder = Rc::new(Recorder::default());
    model.add_observer(recorder.clone());
    recorder
}

/// Page urls in strip order
pub fn urls(model: &TabStripModel) -> Vec<String> {
    model
        .tabs()
        .iter()
        .map(|tab| tab.session().url().unwrap_or_default())
        .collect()
}
