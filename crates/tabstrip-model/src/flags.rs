//! Operation flags and small value types shared by the mutation entry points

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::tab::TabHandle;

/// How a tab is added. Combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTabFlags {
    /// Make the new tab the active tab
    pub active: bool,
    pub pinned: bool,
    /// Record the currently active tab as the new tab's opener
    pub inherit_opener: bool,
    /// Honour the requested index even for link transitions
    pub force_index: bool,
}

impl AddTabFlags {
    pub const NONE: Self = Self {
        active: false,
        pinned: false,
        inherit_opener: false,
        force_index: false,
    };
    pub const ACTIVE: Self = Self {
        active: true,
        ..Self::NONE
    };
    pub const PINNED: Self = Self {
        pinned: true,
        ..Self::NONE
    };
    pub const INHERIT_OPENER: Self = Self {
        inherit_opener: true,
        ..Self::NONE
    };
    pub const FORCE_INDEX: Self = Self {
        force_index: true,
        ..Self::NONE
    };
}

impl BitOr for AddTabFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            active: self.active || rhs.active,
            pinned: self.pinned || rhs.pinned,
            inherit_opener: self.inherit_opener || rhs.inherit_opener,
            force_index: self.force_index || rhs.force_index,
        }
    }
}

/// How tabs are closed. Combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTabFlags {
    /// Ask the delegate for a closed-tab history entry
    pub create_historical_tab: bool,
    pub user_gesture: bool,
}

impl CloseTabFlags {
    pub const NONE: Self = Self {
        create_historical_tab: false,
        user_gesture: false,
    };
    pub const CREATE_HISTORICAL_TAB: Self = Self {
        create_historical_tab: true,
        user_gesture: false,
    };
    pub const USER_GESTURE: Self = Self {
        create_historical_tab: false,
        user_gesture: true,
    };
}

impl BitOr for CloseTabFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            create_historical_tab: self.create_historical_tab || rhs.create_historical_tab,
            user_gesture: self.user_gesture || rhs.user_gesture,
        }
    }
}

/// The kind of navigation that opened or is driving a tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageTransition {
    /// Followed a link in another tab
    Link,
    /// Typed into the address bar, or a new-tab command
    Typed,
    AutoBookmark,
    Generated,
    Keyword,
    AutoToplevel,
    Reload,
    #[default]
    Other,
}

impl PageTransition {
    /// Navigations that start a new task in the tab, so opener relations
    /// no longer describe what the user is doing
    pub fn forgets_openers(&self) -> bool {
        matches!(
            self,
            PageTransition::Typed
                | PageTransition::AutoBookmark
                | PageTransition::Generated
                | PageTransition::Keyword
                | PageTransition::AutoToplevel
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseCommand {
    /// Everything except the target (or the selection containing it)
    OtherTabs,
    /// Everything to the right of the target (or of the selection)
    TabsToRight,
}

/// Result of a close batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseOutcome {
    /// False when some tabs deferred their close pending unload confirmation
    pub closed_all: bool,
    /// Tabs detached synchronously, in the order they were processed
    pub closed: Vec<TabHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_union() {
        let flags = AddTabFlags::ACTIVE | AddTabFlags::INHERIT_OPENER;
        assert!(flags.active);
        assert!(flags.inherit_opener);
        assert!(!flags.pinned);

        let close = CloseTabFlags::CREATE_HISTORICAL_TAB | CloseTabFlags::USER_GESTURE;
        assert!(close.create_historical_tab && close.user_gesture);
    }

    #[test]
    fn test_transitions_that_forget_openers() {
        assert!(PageTransition::Typed.forgets_openers());
        assert!(PageTransition::Keyword.forgets_openers());
        assert!(!PageTransition::Link.forgets_openers());
        assert!(!PageTransition::Reload.forgets_openers());
    }
}
