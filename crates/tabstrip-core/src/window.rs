//! Browser window
//!
//! A window owns one tab strip and remembers the tabs closed in it so they
//! can be reopened where they were.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabstrip_model::{
    AddTabFlags, CloseOutcome, CloseTabFlags, HistoricalEntryId, PageSession, PageTransition,
    Tab, TabHandle, TabStripDelegate, TabStripModel,
};

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTab {
    pub entry_id: HistoricalEntryId,
    pub handle: TabHandle,
    pub url: Option<String>,
    pub title: Option<String>,
    /// Position in the strip when the tab was closed
    pub index: usize,
    pub closed_at: DateTime<Utc>,
}

/// Bounded closed-tab history, fed by the strip's historical-entry hook
#[derive(Debug)]
pub struct RecentlyClosed {
    entries: RefCell<VecDeque<ClosedTab>>,
    capacity: usize,
    next_id: Cell<u64>,
}

impl RecentlyClosed {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RefCell::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_id: Cell::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Most recently closed last
    pub fn entries(&self) -> Vec<ClosedTab> {
        self.entries.borrow().iter().cloned().collect()
    }

    fn pop(&self) -> Option<ClosedTab> {
        self.entries.borrow_mut().pop_back()
    }
}

impl TabStripDelegate for RecentlyClosed {
    fn create_historical_entry(
        &self,
        handle: TabHandle,
        index: usize,
        session: &dyn PageSession,
    ) -> Option<HistoricalEntryId> {
        if self.capacity == 0 {
            return None;
        }

        let entry_id = HistoricalEntryId(self.next_id.get());
        self.next_id.set(entry_id.0 + 1);

        let mut entries = self.entries.borrow_mut();
        entries.push_back(ClosedTab {
            entry_id,
            handle,
            url: session.url(),
            title: session.title(),
            index,
            closed_at: Utc::now(),
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        Some(entry_id)
    }
}

pub struct Window {
    model: TabStripModel,
    recently_closed: Rc<RecentlyClosed>,
}

impl Window {
    pub fn new(config: &Config) -> Self {
        let recently_closed = Rc::new(RecentlyClosed::new(config.max_recently_closed));
        let model = TabStripModel::new(recently_closed.clone(), &config.tab_strip);

        Self {
            model,
            recently_closed,
        }
    }

    pub fn model(&self) -> &TabStripModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TabStripModel {
        &mut self.model
    }

    pub fn recently_closed(&self) -> Vec<ClosedTab> {
        self.recently_closed.entries()
    }

    /// Append a tab to the end of the strip
    pub fn open_tab(
        &mut self,
        session: Box<dyn PageSession>,
        foreground: bool,
    ) -> Result<TabHandle> {
        let tab = Tab::new(session);
        let handle = tab.handle();
        self.model.append_tab(tab, foreground)?;

        tracing::debug!(tab = %handle, foreground, "Opened tab");
        Ok(handle)
    }

    /// Open a tab from a link in the active tab, next to it
    pub fn open_link(
        &mut self,
        session: Box<dyn PageSession>,
        foreground: bool,
    ) -> Result<TabHandle> {
        let tab = Tab::new(session);
        let handle = tab.handle();
        let flags = if foreground {
            AddTabFlags::ACTIVE
        } else {
            AddTabFlags::NONE
        };
        self.model.add_tab(tab, None, PageTransition::Link, flags, None)?;

        tracing::debug!(tab = %handle, foreground, "Opened link");
        Ok(handle)
    }

    /// Close a tab as the user would, recording it for reopening
    pub fn close_tab(&mut self, handle: TabHandle) -> Result<CloseOutcome> {
        if self.model.index_of(handle).is_none() {
            return Err(CoreError::TabStrip(
                tabstrip_model::TabStripError::UnknownTab(handle),
            ));
        }
        let outcome = self.model.close_tabs(
            &[handle],
            CloseTabFlags::CREATE_HISTORICAL_TAB | CloseTabFlags::USER_GESTURE,
        )?;
        Ok(outcome)
    }

    /// Reopen the most recently closed tab at its old position, making it
    /// active. `restore` builds the page session for the entry. Returns
    /// `None` when nothing is left to reopen.
    pub fn reopen_last_closed<F>(&mut self, restore: F) -> Result<Option<TabHandle>>
    where
        F: FnOnce(&ClosedTab) -> Box<dyn PageSession>,
    {
        let Some(entry) = self.recently_closed.pop() else {
            return Ok(None);
        };

        let tab = Tab::new(restore(&entry));
        let handle = tab.handle();
        let index = self
            .model
            .insert_tab_at(entry.index, tab, AddTabFlags::ACTIVE, None)?;

        tracing::info!(
            tab = %handle,
            entry = entry.entry_id.0,
            index,
            url = entry.url.as_deref().unwrap_or(""),
            "Reopened closed tab"
        );
        Ok(Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Page {
        url: String,
    }

    impl PageSession for Page {
        fn url(&self) -> Option<String> {
            Some(self.url.clone())
        }

        fn title(&self) -> Option<String> {
            Some(format!("Title of {}", self.url))
        }
    }

    fn page(url: &str) -> Box<dyn PageSession> {
        Box::new(Page {
            url: url.to_string(),
        })
    }

    fn window_with(urls: &[&str], max_recently_closed: usize) -> Window {
        let config = Config {
            max_recently_closed,
            ..Config::new(std::path::PathBuf::from("/tmp/tabstrip-test"))
        };
        let mut window = Window::new(&config);
        for url in urls {
            window.open_tab(page(url), false).unwrap();
        }
        window
    }

    fn urls(window: &Window) -> Vec<String> {
        window
            .model()
            .tabs()
            .iter()
            .filter_map(|tab| tab.session().url())
            .collect()
    }

    #[test]
    fn test_closed_tab_is_recorded() {
        let mut window = window_with(&["a", "b", "c"], 20);
        let b = window.model().handles()[1];

        let outcome = window.close_tab(b).unwrap();
        assert!(outcome.closed_all);

        let closed = window.recently_closed();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].handle, b);
        assert_eq!(closed[0].url.as_deref(), Some("b"));
        assert_eq!(closed[0].title.as_deref(), Some("Title of b"));
        assert_eq!(closed[0].index, 1);
    }

    #[test]
    fn test_reopen_restores_position() {
        let mut window = window_with(&["a", "b", "c"], 20);
        let b = window.model().handles()[1];
        window.close_tab(b).unwrap();
        assert_eq!(urls(&window), ["a", "c"]);

        let reopened = window
            .reopen_last_closed(|entry| page(entry.url.as_deref().unwrap_or_default()))
            .unwrap()
            .unwrap();

        assert_eq!(urls(&window), ["a", "b", "c"]);
        assert_eq!(window.model().active_handle(), Some(reopened));
        assert!(window.recently_closed().is_empty());
    }

    #[test]
    fn test_reopen_with_empty_history() {
        let mut window = window_with(&["a"], 20);
        let reopened = window.reopen_last_closed(|_| page("never")).unwrap();
        assert!(reopened.is_none());
        assert_eq!(window.model().count(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut window = window_with(&["a", "b", "c", "d"], 2);
        for _ in 0..3 {
            let last = *window.model().handles().last().unwrap();
            window.close_tab(last).unwrap();
        }

        let closed: Vec<String> = window
            .recently_closed()
            .into_iter()
            .filter_map(|entry| entry.url)
            .collect();
        assert_eq!(closed, ["c", "b"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut window = window_with(&["a", "b"], 0);
        let a = window.model().handles()[0];
        window.close_tab(a).unwrap();
        assert!(window.recently_closed().is_empty());
    }

    #[test]
    fn test_open_link_lands_next_to_opener() {
        let mut window = window_with(&["a", "b"], 20);
        let a = window.model().handles()[0];

        let child = window.open_link(page("a-child"), false).unwrap();
        assert_eq!(window.model().index_of(child), Some(1));
        assert_eq!(window.model().opener_of(1), Some(a));
    }

    #[test]
    fn test_close_unknown_tab() {
        let mut window = window_with(&["a"], 20);
        let stray = Tab::new(page("stray")).handle();
        assert!(matches!(window.close_tab(stray), Err(CoreError::TabStrip(_))));
    }
}
