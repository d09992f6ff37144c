//! Task id interning.
//!
//! Every task id, real or placeholder, gets a dense index so the analysis
//! state can live in plain vectors instead of string-keyed maps.

use rustc_hash::FxHashMap;

/// Dense task index (u32 for compact adjacency lists).
pub type TaskIdx = u32;

/// Bidirectional map between task id strings and dense indices.
///
/// Indices are handed out in first-seen order, so the order of the input
/// records is preserved.
#[derive(Debug, Clone, Default)]
pub struct TaskIdInterner {
    to_idx: FxHashMap<String, TaskIdx>,
    ids: Vec<String>,
}

impl TaskIdInterner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Intern `id`, returning its index and whether it was newly added.
    pub fn intern(&mut self, id: &str) -> (TaskIdx, bool) {
        if let Some(&idx) = self.to_idx.get(id) {
            return (idx, false);
        }
        let idx = self.ids.len() as TaskIdx;
        self.ids.push(id.to_string());
        self.to_idx.insert(id.to_string(), idx);
        (idx, true)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<TaskIdx> {
        self.to_idx.get(id).copied()
    }

    /// Id string for an index; panics on an index this interner never issued.
    #[inline]
    pub fn id(&self, idx: TaskIdx) -> &str {
        &self.ids[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
