//! Tab strip error types

use thiserror::Error;

use crate::group::TabGroupId;
use crate::tab::TabHandle;

#[derive(Error, Debug)]
pub enum TabStripError {
    #[error("Index {index} out of range for {count} tabs")]
    InvalidIndex { index: usize, count: usize },

    #[error("Tab not found: {0}")]
    UnknownTab(TabHandle),

    #[error("Tab group not found: {0}")]
    GroupNotFound(TabGroupId),

    #[error("Tab group already exists: {0}")]
    GroupAlreadyExists(TabGroupId),

    #[error("Tab group {id} still has {count} tabs")]
    GroupNotEmpty { id: TabGroupId, count: usize },

    #[error("Tab groups are not supported by this tab strip")]
    GroupsUnsupported,

    #[error("Index list must not be empty")]
    EmptyIndices,

    #[error("Index list must be sorted and unique")]
    UnsortedIndices,

    #[error("Selection is not valid for {count} tabs")]
    InvalidSelection { count: usize },

    #[error("Cannot move pinned and unpinned tabs together")]
    MixedPinnedState,

    #[error("Tab strip mutated from inside another mutation")]
    ReentrantMutation,

    #[error("Invalid tab strip configuration: {0}")]
    Config(#[from] serde_json::Error),
}
