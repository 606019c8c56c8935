//! Linear undo/redo over full-state snapshots.

use crate::model::{Connection, Node};
use crate::viewport::Viewport;
use std::collections::VecDeque;

/// Default number of snapshots kept.
pub const MAX_HISTORY: usize = 50;

/// Deep copy of the undoable diagram state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub viewport: Viewport,
}

/// Undo/redo stack.
///
/// `cursor` points to the snapshot matching the live state. Entries after
/// the cursor form the redo branch and are discarded on the next commit.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: usize,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Push a snapshot, dropping the redo branch and evicting the oldest
    /// entry once the cap is reached.
    pub fn commit(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        log::debug!("History commit: {} entries", self.entries.len());
    }

    /// Step back; `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward; `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of undo steps available from the current point.
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    pub fn redo_depth(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor + 1)
    }

    /// The snapshot matching the live state.
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, NodeKind};
    use kurbo::Point;

    fn snapshot(count: usize) -> Snapshot {
        let nodes = (0..count)
            .map(|i| Node::new(NodeId::new(format!("n-{i}")), NodeKind::Start, Point::new(i as f64, 0.0)))
            .collect();
        Snapshot {
            nodes,
            connections: Vec::new(),
            viewport: Viewport::default(),
        }
    }

    #[test]
    fn test_undo_redo_at_ends() {
        let mut history = History::default();
        assert!(history.undo().is_none());
        history.commit(snapshot(0));
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());

        history.commit(snapshot(1));
        assert_eq!(history.undo().map(|s| s.nodes.len()), Some(0));
        assert_eq!(history.redo().map(|s| s.nodes.len()), Some(1));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_commit_discards_redo_branch() {
        let mut history = History::default();
        history.commit(snapshot(0));
        history.commit(snapshot(1));
        history.commit(snapshot(2));
        history.undo();
        history.undo();
        assert_eq!(history.redo_depth(), 2);

        history.commit(snapshot(5));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.current().map(|s| s.nodes.len()), Some(5));
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut history = History::new(MAX_HISTORY);
        for i in 0..(MAX_HISTORY + 10) {
            history.commit(snapshot(i % 3));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.undo_depth(), MAX_HISTORY - 1);

        let mut undos = 0;
        while history.undo().is_some() {
            undos += 1;
        }
        assert_eq!(undos, MAX_HISTORY - 1);
    }

    #[test]
    fn test_clear() {
        let mut history = History::new(3);
        history.commit(snapshot(0));
        history.commit(snapshot(1));
        history.clear();
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(history.current().is_none());
    }
}
