//! Collaborator contracts
//!
//! The strip never looks inside a page session or persists anything itself.
//! It calls out through [`PageSession`] for per-tab side effects and through
//! [`TabStripDelegate`] for policy and lifecycle decisions. Every method has
//! a default, and a `false`/`None` answer means "carry on with the default
//! behaviour".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::group::TabGroupId;
use crate::tab::{Tab, TabHandle};

/// Identifier of a record created by [`TabStripDelegate::create_historical_entry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalEntryId(pub u64);

/// Identifies the resource (e.g. renderer process) backing a page session,
/// used to batch expedited teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveReason {
    /// The tab is being destroyed
    Deleted,
    /// The tab is handed to the delegate's cache instead of being destroyed
    Cached,
    /// The tab is moving to another strip
    InsertedIntoOtherTabStrip,
}

/// An opaque page/document. All hooks are synchronous and may not mutate
/// the strip.
pub trait PageSession {
    /// Called before the tab stops being the active tab
    fn will_enter_background(&self) {}

    /// Called once the tab has become active through a selection change;
    /// `switch_started_at` starts the tab-switch latency measurement.
    fn did_become_active(&self, _switch_started_at: DateTime<Utc>) {}

    /// Pre-removal hook (preview capture and the like)
    fn will_detach(&self, _reason: RemoveReason) {}

    fn is_audible(&self) -> bool {
        false
    }

    fn is_loading(&self) -> bool {
        false
    }

    /// A modal dialog is showing; the tab is inserted in the blocked state
    fn has_blocking_dialog(&self) -> bool {
        false
    }

    fn resource_key(&self) -> Option<ResourceKey> {
        None
    }

    fn url(&self) -> Option<String> {
        None
    }

    fn title(&self) -> Option<String> {
        None
    }
}

pub trait TabStripDelegate {
    fn will_add_page_session(&self, _session: &dyn PageSession) {}

    /// Record the tab in closed-tab history
    fn create_historical_entry(
        &self,
        _handle: TabHandle,
        _index: usize,
        _session: &dyn PageSession,
    ) -> Option<HistoricalEntryId> {
        None
    }

    /// Whether closing this session has to wait for unload listeners.
    /// Sessions that do are left out of expedited teardown.
    fn should_run_unload_listener_before_closing(&self, _session: &dyn PageSession) -> bool {
        false
    }

    /// Give the session a chance to run unload listeners. Returning `true`
    /// defers the close: the tab stays in the strip until
    /// `TabStripModel::unload_listener_finished` is called for it.
    fn run_unload_listener_before_closing(&self, _session: &dyn PageSession) -> bool {
        false
    }

    /// Closed tabs for which this returns `true` are detached with
    /// [`RemoveReason::Cached`] and passed to [`Self::cache_detached`].
    fn should_cache_on_close(&self, _session: &dyn PageSession) -> bool {
        false
    }

    fn cache_detached(&self, _tabs: Vec<DetachedTab>) {}

    /// The tab has left the strip for good. Dropping it destroys the session.
    fn tab_destroyed(&self, _tab: Tab) {}

    fn can_reload(&self, _session: &dyn PageSession) -> bool {
        true
    }

    fn is_closable(&self, _session: &dyn PageSession) -> bool {
        true
    }

    fn is_tab_strip_editable(&self) -> bool {
        true
    }

    fn group_added(&self, _group: TabGroupId) {}

    fn will_close_group(&self, _group: TabGroupId) {}

    /// `closing_tabs` tabs backed by `resource` are closing without unload
    /// listeners; the resource may be torn down early.
    fn request_expedited_teardown(&self, _resource: ResourceKey, _closing_tabs: usize) {}

    /// An audible tab was sent to the background by a tab switch
    fn audible_tab_backgrounded(&self, _handle: TabHandle) {}
}

/// Delegate that accepts every default
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDelegate;

impl TabStripDelegate for DefaultDelegate {}

/// A tab that has left the strip, with the bookkeeping observers need.
#[derive(Debug)]
pub struct DetachedTab {
    pub tab: Tab,
    /// Index before any removal in the same batch
    pub index_before_any_removals: usize,
    /// Index at the moment this tab was removed
    pub index_at_time_of_removal: usize,
    pub reason: RemoveReason,
    pub historical_id: Option<HistoricalEntryId>,
}

impl DetachedTab {
    pub fn handle(&self) -> TabHandle {
        self.tab.handle()
    }
}
