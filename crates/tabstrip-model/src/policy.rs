//! Next-active-tab policy
//!
//! Chooses which tab becomes active when the active tab is removed. The
//! candidates are tried in ladder order against the strip as it looked
//! before the removal; the chosen index is then translated to its position
//! after the removal. Tabs inside collapsed groups are never chosen by a
//! rung, only by the final fallback.

use serde::{Deserialize, Serialize};

use crate::collection::TabCollection;
use crate::group::GroupRegistry;
use crate::opener::OpenerGraph;
use crate::selection::SelectionModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationRule {
    /// Nearest tab opened by the removed tab
    ChildOfRemoved,
    /// Nearest tab opened by the removed tab's opener
    SiblingBySharedOpener,
    /// The removed tab's opener
    Opener,
    /// Right, then left neighbour still in the removed tab's group
    GroupNeighbor,
    /// Nearest tab, forward then backward, outside collapsed groups
    NearestExpanded,
}

impl ActivationRule {
    pub const DEFAULT_LADDER: [ActivationRule; 5] = [
        ActivationRule::ChildOfRemoved,
        ActivationRule::SiblingBySharedOpener,
        ActivationRule::Opener,
        ActivationRule::GroupNeighbor,
        ActivationRule::NearestExpanded,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextActivePolicy {
    ladder: Vec<ActivationRule>,
}

impl Default for NextActivePolicy {
    fn default() -> Self {
        Self::new(ActivationRule::DEFAULT_LADDER.to_vec())
    }
}

impl NextActivePolicy {
    pub fn new(ladder: Vec<ActivationRule>) -> Self {
        Self { ladder }
    }

    pub fn ladder(&self) -> &[ActivationRule] {
        &self.ladder
    }

    /// Post-removal index of the tab to activate when `removing` goes away.
    /// `None` when the removal does not need a replacement: the tab is not
    /// active, other tabs remain selected, or it is the last tab.
    pub fn determine(
        &self,
        tabs: &TabCollection,
        groups: &GroupRegistry,
        openers: &OpenerGraph,
        selection: &SelectionModel,
        removing: usize,
    ) -> Option<usize> {
        if selection.active() != Some(removing) || selection.len() > 1 {
            return None;
        }
        let count = tabs.len();
        if count <= 1 || removing >= count {
            return None;
        }

        let order = tabs.handles();
        let removed = order[removing];
        let opener = openers.opener_of(removed);
        let removed_group = tabs.group_at(removing);

        let expanded = |index: &usize| {
            tabs.group_at(*index)
                .map_or(true, |group| !groups.is_collapsed(group))
        };
        let after_closing = |index: usize| if index > removing { index - 1 } else { index };

        for rule in &self.ladder {
            let candidate = match rule {
                ActivationRule::ChildOfRemoved => {
                    openers.index_of_next_opened_by(&order, removed, removing)
                }
                ActivationRule::SiblingBySharedOpener => opener
                    .and_then(|opener| openers.index_of_next_opened_by(&order, opener, removing)),
                ActivationRule::Opener => opener.and_then(|opener| tabs.index_of(opener)),
                ActivationRule::GroupNeighbor => removed_group.and_then(|group| {
                    if tabs.group_at(removing + 1) == Some(group) {
                        Some(removing + 1)
                    } else if removing > 0 && tabs.group_at(removing - 1) == Some(group) {
                        Some(removing - 1)
                    } else {
                        None
                    }
                }),
                ActivationRule::NearestExpanded => (removing + 1..count)
                    .find(expanded)
                    .or_else(|| (0..removing).rev().find(expanded)),
            };

            if let Some(index) = candidate.filter(expanded) {
                tracing::trace!(?rule, index, removing, "Next active tab chosen");
                return Some(after_closing(index));
            }
        }

        Some(if removing == count - 1 { removing - 1 } else { removing })
    }
}
