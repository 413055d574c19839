//! Tab record
//!
//! A tab pairs a stable [`TabHandle`] with the page session it owns and the
//! per-tab flags the strip maintains (pinned, blocked, group membership).
//! Positions are transient; the handle is the only identity callers should
//! hold across a mutating call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delegate::PageSession;
use crate::flags::CloseTabFlags;
use crate::group::TabGroupId;

/// Opaque, stable identity of a tab. Survives moves and detach/reattach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabHandle(Uuid);

impl TabHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TabHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Tab {
    handle: TabHandle,
    session: Box<dyn PageSession>,
    pinned: bool,
    blocked: bool,
    group: Option<TabGroupId>,
    /// Forget this tab's opener the next time it stops being active
    reset_opener_on_active_tab_change: bool,
    closed_by_user_gesture: bool,
    /// Set while the delegate runs unload listeners; holds the flags the
    /// close was requested with
    pending_close: Option<CloseTabFlags>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl Tab {
    pub fn new(session: Box<dyn PageSession>) -> Self {
        let now = Utc::now();

        Self {
            handle: TabHandle::new(),
            session,
            pinned: false,
            blocked: false,
            group: None,
            reset_opener_on_active_tab_change: false,
            closed_by_user_gesture: false,
            pending_close: None,
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn handle(&self) -> TabHandle {
        self.handle
    }

    pub fn session(&self) -> &dyn PageSession {
        self.session.as_ref()
    }

    pub fn into_session(self) -> Box<dyn PageSession> {
        self.session
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn group(&self) -> Option<TabGroupId> {
        self.group
    }

    pub fn reset_opener_on_active_tab_change(&self) -> bool {
        self.reset_opener_on_active_tab_change
    }

    pub fn closed_by_user_gesture(&self) -> bool {
        self.closed_by_user_gesture
    }

    pub fn is_unload_pending(&self) -> bool {
        self.pending_close.is_some()
    }

    pub(crate) fn pending_close(&self) -> Option<CloseTabFlags> {
        self.pending_close
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub(crate) fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    pub(crate) fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    pub(crate) fn set_group(&mut self, group: Option<TabGroupId>) {
        self.group = group;
    }

    pub(crate) fn set_reset_opener_on_active_tab_change(&mut self, reset: bool) {
        self.reset_opener_on_active_tab_change = reset;
    }

    pub(crate) fn set_closed_by_user_gesture(&mut self, closed: bool) {
        self.closed_by_user_gesture = closed;
    }

    pub(crate) fn set_pending_close(&mut self, flags: Option<CloseTabFlags>) {
        self.pending_close = flags;
    }

    pub(crate) fn mark_active(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Swap the page session, returning the previous one
    pub(crate) fn replace_session(
        &mut self,
        session: Box<dyn PageSession>,
    ) -> Box<dyn PageSession> {
        std::mem::replace(&mut self.session, session)
    }
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("handle", &self.handle)
            .field("pinned", &self.pinned)
            .field("blocked", &self.blocked)
            .field("group", &self.group)
            .field("pending_close", &self.pending_close)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;
    impl PageSession for Blank {}

    #[test]
    fn test_new_tab() {
        let tab = Tab::new(Box::new(Blank));
        assert!(!tab.is_pinned());
        assert!(!tab.is_blocked());
        assert!(tab.group().is_none());
        assert!(!tab.is_unload_pending());
        assert_eq!(tab.created_at(), tab.last_active_at());
    }

    #[test]
    fn test_handles_are_unique() {
        let a = Tab::new(Box::new(Blank));
        let b = Tab::new(Box::new(Blank));
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn test_handle_serializes_as_uuid() {
        let handle = TabHandle::new();
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", handle));
        let back: TabHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }
}
