//! Tab group registry
//!
//! A group is a named, collapsible, contiguous run of unpinned tabs. The
//! registry only holds metadata and a live member count; which tabs belong
//! to a group is recorded on the tabs themselves. A group exists exactly as
//! long as it has members (or has just been created for an imminent
//! assignment).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TabStripError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabGroupId(Uuid);

impl TabGroupId {
    pub fn generate_new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TabGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabGroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

/// Visual metadata. Opaque to the strip except for `is_collapsed`, which
/// drives activation and navigation skips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabGroupVisualData {
    pub title: String,
    pub color: TabGroupColor,
    pub is_collapsed: bool,
}

impl TabGroupVisualData {
    pub fn new(title: impl Into<String>, color: TabGroupColor) -> Self {
        Self {
            title: title.into(),
            color,
            is_collapsed: false,
        }
    }

    pub fn collapsed(mut self, is_collapsed: bool) -> Self {
        self.is_collapsed = is_collapsed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabGroup {
    id: TabGroupId,
    visual_data: TabGroupVisualData,
    tab_count: usize,
}

impl TabGroup {
    pub fn id(&self) -> TabGroupId {
        self.id
    }

    pub fn visual_data(&self) -> &TabGroupVisualData {
        &self.visual_data
    }

    pub fn tab_count(&self) -> usize {
        self.tab_count
    }

    pub fn is_empty(&self) -> bool {
        self.tab_count == 0
    }
}

#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<TabGroupId, TabGroup>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tab_group(&mut self, id: TabGroupId, visual_data: TabGroupVisualData) -> Result<()> {
        if self.groups.contains_key(&id) {
            return Err(TabStripError::GroupAlreadyExists(id));
        }

        self.groups.insert(
            id,
            TabGroup {
                id,
                visual_data,
                tab_count: 0,
            },
        );

        tracing::debug!(group = %id, "Registered tab group");

        Ok(())
    }

    pub fn remove_tab_group(&mut self, id: TabGroupId) -> Result<TabGroup> {
        let count = self.tab_count(id);
        if count > 0 {
            return Err(TabStripError::GroupNotEmpty { id, count });
        }

        let group = self
            .groups
            .remove(&id)
            .ok_or(TabStripError::GroupNotFound(id))?;

        tracing::debug!(group = %id, "Removed tab group");

        Ok(group)
    }

    pub fn contains(&self, id: TabGroupId) -> bool {
        self.groups.contains_key(&id)
    }

    pub fn get(&self, id: TabGroupId) -> Option<&TabGroup> {
        self.groups.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TabGroupId> + '_ {
        self.groups.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn tab_count(&self, id: TabGroupId) -> usize {
        self.groups.get(&id).map_or(0, |g| g.tab_count)
    }

    pub fn visual_data(&self, id: TabGroupId) -> Option<&TabGroupVisualData> {
        self.groups.get(&id).map(|g| &g.visual_data)
    }

    /// Replace the visual data, returning the previous value
    pub fn set_visual_data(
        &mut self,
        id: TabGroupId,
        visual_data: TabGroupVisualData,
    ) -> Result<TabGroupVisualData> {
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(TabStripError::GroupNotFound(id))?;
        Ok(std::mem::replace(&mut group.visual_data, visual_data))
    }

    /// Unknown groups are never collapsed
    pub fn is_collapsed(&self, id: TabGroupId) -> bool {
        self.groups
            .get(&id)
            .is_some_and(|g| g.visual_data.is_collapsed)
    }

    pub(crate) fn add_tab(&mut self, id: TabGroupId) -> Result<()> {
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(TabStripError::GroupNotFound(id))?;
        group.tab_count += 1;
        Ok(())
    }

    /// Decrement the member count. Returns the group's record if this was
    /// its last member and it has been destroyed.
    pub(crate) fn remove_tab(&mut self, id: TabGroupId) -> Result<Option<TabGroup>> {
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(TabStripError::GroupNotFound(id))?;
        group.tab_count = group.tab_count.saturating_sub(1);

        if group.tab_count == 0 {
            return self.remove_tab_group(id).map(Some);
        }
        Ok(None)
    }
}
