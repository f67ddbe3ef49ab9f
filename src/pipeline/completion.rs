//! Completion tracking: per-node outstanding-children counts that cascade toward the root.
//!
//! Each node moves `Pending -> InFlight -> Done`. A node may only finish once its outstanding
//! count is zero; finishing decrements the parent, and a parent that reaches zero becomes
//! ready. Consumers decide what "ready" means (delete it next, or just finish it too).

use crate::Entry;
use crate::error::FsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    InFlight,
    Done,
}

#[derive(Clone, Debug)]
struct Slot {
    parent: Option<usize>,
    remaining: usize,
    state: NodeState,
}

/// Outcome of finishing a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The root finished; the whole operation is complete.
    Root,
    /// The parent's last outstanding child finished; the parent may finish now.
    ParentReady(usize),
    /// The parent still has outstanding children.
    Pending,
}

#[derive(Debug, Default)]
pub struct CompletionTracker {
    slots: Vec<Slot>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one slot per entry. Entry 0 is the root; every other entry's parent is `parent_index`.
    pub fn from_entries(entries: &[Entry]) -> Self {
        let slots = entries
            .iter()
            .enumerate()
            .map(|(i, e)| Slot {
                parent: (i != 0).then_some(e.parent_index),
                remaining: if e.kind.is_dir() { e.pending_children } else { 0 },
                state: NodeState::Pending,
            })
            .collect();
        Self { slots }
    }

    /// Add a node whose parent (if any) is already registered. Returns its index.
    pub fn register(&mut self, parent: Option<usize>, children: usize) -> usize {
        self.slots.push(Slot {
            parent,
            remaining: children,
            state: NodeState::Pending,
        });
        self.slots.len() - 1
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, idx: usize) -> Option<NodeState> {
        self.slots.get(idx).map(|s| s.state)
    }

    pub fn remaining(&self, idx: usize) -> Option<usize> {
        self.slots.get(idx).map(|s| s.remaining)
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.slots.get(idx).and_then(|s| s.parent)
    }

    /// True once the root (slot 0) is done.
    pub fn root_done(&self) -> bool {
        self.state(0) == Some(NodeState::Done)
    }

    fn slot_mut(&mut self, idx: usize) -> Result<&mut Slot, FsError> {
        self.slots
            .get_mut(idx)
            .ok_or_else(|| FsError::Tracker(format!("no node {idx}")))
    }

    /// Mark a node as having its operation issued.
    pub fn start(&mut self, idx: usize) -> Result<(), FsError> {
        let slot = self.slot_mut(idx)?;
        if slot.state != NodeState::Pending {
            return Err(FsError::Tracker(format!(
                "node {idx} started twice ({:?})",
                slot.state
            )));
        }
        slot.state = NodeState::InFlight;
        Ok(())
    }

    /// Decrement `idx`'s outstanding count. Returns true when it reaches zero.
    fn decrement(&mut self, idx: usize) -> Result<bool, FsError> {
        let slot = self.slot_mut(idx)?;
        if slot.remaining == 0 || slot.state == NodeState::Done {
            return Err(FsError::Tracker(format!(
                "node {idx} decremented below zero"
            )));
        }
        slot.remaining -= 1;
        Ok(slot.remaining == 0)
    }

    /// Finish a node whose children are all done, and decrement its parent.
    pub fn finish(&mut self, idx: usize) -> Result<Completion, FsError> {
        let slot = self.slot_mut(idx)?;
        if slot.state == NodeState::Done {
            return Err(FsError::Tracker(format!("node {idx} finished twice")));
        }
        if slot.remaining != 0 {
            return Err(FsError::Tracker(format!(
                "node {idx} finished with {} children outstanding",
                slot.remaining
            )));
        }
        slot.state = NodeState::Done;
        let Some(parent) = slot.parent else {
            return Ok(Completion::Root);
        };
        if self.decrement(parent)? {
            Ok(Completion::ParentReady(parent))
        } else {
            Ok(Completion::Pending)
        }
    }

    /// Decrement `parent` for a child that never got a slot (excluded or unsupported kind).
    /// Returns true when the parent became ready.
    pub fn release(&mut self, parent: usize) -> Result<bool, FsError> {
        self.decrement(parent)
    }

    /// Finish `idx` and every ancestor that becomes ready as a result.
    /// Returns true when the root finished.
    pub fn finish_cascade(&mut self, mut idx: usize) -> Result<bool, FsError> {
        loop {
            match self.finish(idx)? {
                Completion::Root => return Ok(true),
                Completion::ParentReady(parent) => idx = parent,
                Completion::Pending => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntryKind, EntryMeta};
    use std::path::PathBuf;

    fn entry(kind: EntryKind, parent_index: usize, pending_children: usize) -> Entry {
        Entry {
            path: PathBuf::new(),
            kind,
            parent_index,
            pending_children,
            meta: EntryMeta::default(),
        }
    }

    /// root(0) -> [a(1) dir -> [x(3)], b(2) file]
    fn small_tree() -> CompletionTracker {
        CompletionTracker::from_entries(&[
            entry(EntryKind::Directory, 0, 2),
            entry(EntryKind::Directory, 0, 1),
            entry(EntryKind::File, 0, 0),
            entry(EntryKind::File, 1, 0),
        ])
    }

    #[test]
    fn test_cascade_reaches_root_once() {
        let mut t = small_tree();
        assert!(!t.finish_cascade(2).unwrap());
        assert!(t.finish_cascade(3).unwrap());
        assert!(t.root_done());
        assert!(t.finish_cascade(0).is_err());
    }

    #[test]
    fn test_finish_reports_ready_parent() {
        let mut t = small_tree();
        assert_eq!(t.finish(3).unwrap(), Completion::ParentReady(1));
        assert_eq!(t.finish(1).unwrap(), Completion::Pending);
        assert_eq!(t.finish(2).unwrap(), Completion::ParentReady(0));
        assert_eq!(t.finish(0).unwrap(), Completion::Root);
    }

    #[test]
    fn test_parent_cannot_finish_before_children() {
        let mut t = small_tree();
        assert!(matches!(t.finish(1), Err(FsError::Tracker(_))));
        assert!(matches!(t.finish(0), Err(FsError::Tracker(_))));
    }

    #[test]
    fn test_double_finish_is_rejected() {
        let mut t = small_tree();
        t.finish(2).unwrap();
        assert!(t.finish(2).is_err());
        assert_eq!(t.remaining(0), Some(1));
    }

    #[test]
    fn test_release_and_register() {
        let mut t = CompletionTracker::new();
        let root = t.register(None, 2);
        let dir = t.register(Some(root), 0);
        assert!(!t.release(root).unwrap());
        assert!(t.finish_cascade(dir).unwrap());
        assert!(t.release(root).is_err());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut t = small_tree();
        t.start(2).unwrap();
        assert_eq!(t.state(2), Some(NodeState::InFlight));
        assert!(t.start(2).is_err());
    }

    #[test]
    fn test_single_leaf_root() {
        let mut t = CompletionTracker::from_entries(&[entry(EntryKind::File, 0, 0)]);
        assert_eq!(t.finish(0).unwrap(), Completion::Root);
    }
}
