//! Opener graph
//!
//! Maps a tab to the tab whose action opened it. The relation is weak: it
//! names another tab by handle and owns nothing. Descendant queries take the
//! current strip order and scan outward from a start index, since new tabs
//! are placed next to their opener.

use std::collections::{HashMap, HashSet};

use crate::tab::TabHandle;

#[derive(Debug, Default, Clone)]
pub struct OpenerGraph {
    openers: HashMap<TabHandle, TabHandle>,
}

impl OpenerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tab is never its own opener; such requests clear the relation.
    pub fn set_opener(&mut self, child: TabHandle, opener: Option<TabHandle>) {
        match opener {
            Some(opener) if opener != child => {
                self.openers.insert(child, opener);
            }
            _ => {
                self.openers.remove(&child);
            }
        }
    }

    pub fn opener_of(&self, child: TabHandle) -> Option<TabHandle> {
        self.openers.get(&child).copied()
    }

    pub fn forget(&mut self, child: TabHandle) {
        self.openers.remove(&child);
    }

    pub fn forget_all(&mut self) {
        if !self.openers.is_empty() {
            tracing::debug!(count = self.openers.len(), "Forgetting all openers");
        }
        self.openers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.openers.is_empty()
    }

    /// Every tab opened by `removed` inherits `removed`'s own opener.
    pub fn repoint_children_of(&mut self, removed: TabHandle) {
        let grandparent = self.opener_of(removed);
        let children: Vec<TabHandle> = self
            .openers
            .iter()
            .filter(|(_, &opener)| opener == removed)
            .map(|(&child, _)| child)
            .collect();

        for child in children {
            self.set_opener(child, grandparent);
        }

        debug_assert!(
            self.openers
                .iter()
                .all(|(child, opener)| *opener != removed && child != opener),
            "opener graph still references a removed tab or a self-opener"
        );
    }

    /// Drop the tab's own entry, typically on detach.
    pub fn remove(&mut self, handle: TabHandle) {
        self.openers.remove(&handle);
    }

    /// Nearest tab opened by `opener`: first scanning right of `start`, then
    /// left of it.
    pub fn index_of_next_opened_by(
        &self,
        order: &[TabHandle],
        opener: TabHandle,
        start: usize,
    ) -> Option<usize> {
        let opened_by = |i: &usize| self.opener_of(order[*i]) == Some(opener);

        (start + 1..order.len())
            .find(opened_by)
            .or_else(|| (0..start.min(order.len())).rev().find(opened_by))
    }

    /// Index of the last tab in the run of transitive descendants of
    /// `opener` that starts right after `start`. Pinned tabs (indices below
    /// `first_unpinned`) are skipped; the scan stops at the first unpinned
    /// non-descendant.
    pub fn index_of_last_opened_by(
        &self,
        order: &[TabHandle],
        first_unpinned: usize,
        opener: TabHandle,
        start: usize,
    ) -> Option<usize> {
        let mut lineage: HashSet<TabHandle> = HashSet::from([opener]);
        let mut last = None;

        for (i, &handle) in order.iter().enumerate().skip(start + 1) {
            let descends = self
                .opener_of(handle)
                .is_some_and(|parent| lineage.contains(&parent));
            if !descends {
                if i < first_unpinned {
                    continue;
                }
                break;
            }
            lineage.insert(handle);
            last = Some(i);
        }

        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(n: usize) -> Vec<TabHandle> {
        (0..n).map(|_| TabHandle::new()).collect()
    }

    #[test]
    fn test_self_opener_is_rejected() {
        let mut graph = OpenerGraph::new();
        let tab = TabHandle::new();
        graph.set_opener(tab, Some(tab));
        assert_eq!(graph.opener_of(tab), None);
    }

    #[test]
    fn test_repoint_children_to_grandparent() {
        let mut graph = OpenerGraph::new();
        let [root, mid, leaf_a, leaf_b]: [TabHandle; 4] = handles(4).try_into().unwrap();
        graph.set_opener(mid, Some(root));
        graph.set_opener(leaf_a, Some(mid));
        graph.set_opener(leaf_b, Some(mid));

        graph.repoint_children_of(mid);
        graph.remove(mid);

        assert_eq!(graph.opener_of(leaf_a), Some(root));
        assert_eq!(graph.opener_of(leaf_b), Some(root));
        assert_eq!(graph.opener_of(mid), None);
    }

    #[test]
    fn test_repoint_never_creates_self_reference() {
        let mut graph = OpenerGraph::new();
        let [a, b]: [TabHandle; 2] = handles(2).try_into().unwrap();
        // a opened b, b opened a: removing b must not make a its own opener
        graph.set_opener(b, Some(a));
        graph.set_opener(a, Some(b));

        graph.repoint_children_of(b);
        assert_eq!(graph.opener_of(a), None);
    }

    #[test]
    fn test_next_opened_by_prefers_forward() {
        let mut graph = OpenerGraph::new();
        let order = handles(5);
        let opener = order[2];
        graph.set_opener(order[0], Some(opener));
        graph.set_opener(order[4], Some(opener));

        assert_eq!(graph.index_of_next_opened_by(&order, opener, 2), Some(4));

        graph.forget(order[4]);
        assert_eq!(graph.index_of_next_opened_by(&order, opener, 2), Some(0));

        graph.forget_all();
        assert_eq!(graph.index_of_next_opened_by(&order, opener, 2), None);
    }

    #[test]
    fn test_last_opened_by_follows_descendants() {
        let mut graph = OpenerGraph::new();
        let order = handles(6);
        // 0 opened 1, 1 opened 2, 0 opened 3; 4 is unrelated
        graph.set_opener(order[1], Some(order[0]));
        graph.set_opener(order[2], Some(order[1]));
        graph.set_opener(order[3], Some(order[0]));
        graph.set_opener(order[5], Some(order[0]));

        assert_eq!(graph.index_of_last_opened_by(&order, 0, order[0], 0), Some(3));
        assert_eq!(graph.index_of_last_opened_by(&order, 0, order[4], 4), None);
    }

    #[test]
    fn test_last_opened_by_skips_pinned() {
        let mut graph = OpenerGraph::new();
        let order = handles(4);
        // indices 0 and 1 pinned; tab 0 opened tab 2
        graph.set_opener(order[2], Some(order[0]));

        assert_eq!(graph.index_of_last_opened_by(&order, 2, order[0], 0), Some(2));
    }
}
