//! Task graph with derived adjacency indices.

use chrono::NaiveDate;
use tracing::warn;

use crate::interner::{TaskIdInterner, TaskIdx};
use crate::models::{Relationship, RelationshipType, Task};

/// Relationship index: position in the input relationship slice.
pub type RelIdx = u32;

/// Input fields of a task as the analysis sees them.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskNode {
    pub duration_days: f64,
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub total_float: Option<f64>,
    pub free_float: Option<f64>,
    /// Synthesized for an id that no task record carries.
    pub is_placeholder: bool,
}

impl TaskNode {
    fn from_task(task: &Task) -> Self {
        Self {
            duration_days: task.duration_days.max(0.0),
            start: task.start,
            finish: task.finish,
            total_float: task.supplied_total_float,
            free_float: task.supplied_free_float,
            is_placeholder: false,
        }
    }

    fn placeholder() -> Self {
        Self {
            duration_days: 0.0,
            start: None,
            finish: None,
            total_float: None,
            free_float: None,
            is_placeholder: true,
        }
    }
}

/// A relationship with both endpoints resolved to task indices.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipEdge {
    pub predecessor: TaskIdx,
    pub successor: TaskIdx,
    pub kind: RelationshipType,
    pub lag_days: f64,
    pub free_float: Option<f64>,
}

/// Tasks and relationships plus the indices every traversal walks.
///
/// Built once per data refresh. Tasks reference each other only through
/// indices; the adjacency lists are a cache derived from the relationship
/// list and are rebuilt with the graph.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    interner: TaskIdInterner,
    nodes: Vec<TaskNode>,
    /// Same order as the input relationship slice.
    edges: Vec<RelationshipEdge>,
    /// Predecessor -> distinct successors.
    successors: Vec<Vec<TaskIdx>>,
    /// Successor -> incoming relationships.
    incoming: Vec<Vec<RelIdx>>,
    /// Predecessor -> outgoing relationships.
    outgoing: Vec<Vec<RelIdx>>,
    placeholder_count: usize,
}

impl TaskGraph {
    /// Build the graph and its indices.
    ///
    /// Ids referenced by a relationship or a predecessor list but carried by
    /// no task become zero-duration placeholders. A repeated task id keeps
    /// the first record.
    pub fn build(tasks: &[Task], relationships: &[Relationship]) -> Self {
        let mut graph = Self {
            interner: TaskIdInterner::with_capacity(tasks.len()),
            nodes: Vec::with_capacity(tasks.len()),
            edges: Vec::with_capacity(relationships.len()),
            ..Self::default()
        };

        for task in tasks {
            let (_, is_new) = graph.interner.intern(&task.id);
            if is_new {
                graph.nodes.push(TaskNode::from_task(task));
            } else {
                warn!(task_id = %task.id, "duplicate task id, keeping the first record");
            }
        }

        for task in tasks {
            for pred_id in &task.predecessor_ids {
                graph.resolve(pred_id);
            }
        }

        for rel in relationships {
            let predecessor = graph.resolve(&rel.predecessor_id);
            let successor = graph.resolve(&rel.successor_id);
            graph.edges.push(RelationshipEdge {
                predecessor,
                successor,
                kind: rel.kind,
                lag_days: rel.lag(),
                free_float: rel.supplied_free_float,
            });
        }

        graph.build_indices();
        graph
    }

    /// Index for `id`, synthesizing a placeholder when it is unknown.
    fn resolve(&mut self, id: &str) -> TaskIdx {
        let (idx, is_new) = self.interner.intern(id);
        if is_new {
            self.nodes.push(TaskNode::placeholder());
            self.placeholder_count += 1;
        }
        idx
    }

    fn build_indices(&mut self) {
        let n = self.nodes.len();
        self.successors = vec![Vec::new(); n];
        self.incoming = vec![Vec::new(); n];
        self.outgoing = vec![Vec::new(); n];

        for (rel, edge) in self.edges.iter().enumerate() {
            let rel = rel as RelIdx;
            let (pred, succ) = (edge.predecessor as usize, edge.successor as usize);
            self.incoming[succ].push(rel);
            self.outgoing[pred].push(rel);
            if !self.successors[pred].contains(&edge.successor) {
                self.successors[pred].push(edge.successor);
            }
        }
    }

    /// Number of tasks, placeholders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn relationship_count(&self) -> usize {
        self.edges.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }

    pub fn index_of(&self, id: &str) -> Option<TaskIdx> {
        self.interner.get(id)
    }

    pub fn id_of(&self, idx: TaskIdx) -> &str {
        self.interner.id(idx)
    }

    pub fn node(&self, idx: TaskIdx) -> &TaskNode {
        &self.nodes[idx as usize]
    }

    pub fn edge(&self, rel: RelIdx) -> &RelationshipEdge {
        &self.edges[rel as usize]
    }

    /// All task indices in input order, placeholders last.
    pub fn task_indices(&self) -> impl Iterator<Item = TaskIdx> {
        0..self.nodes.len() as TaskIdx
    }

    /// Task indices of records the caller supplied (no placeholders).
    pub fn real_task_indices(&self) -> impl Iterator<Item = TaskIdx> + '_ {
        self.task_indices()
            .filter(move |&idx| !self.nodes[idx as usize].is_placeholder)
    }

    pub fn relationship_indices(&self) -> impl Iterator<Item = RelIdx> {
        0..self.edges.len() as RelIdx
    }

    pub fn successors(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.successors[idx as usize]
    }

    pub fn incoming(&self, idx: TaskIdx) -> &[RelIdx] {
        &self.incoming[idx as usize]
    }

    pub fn outgoing(&self, idx: TaskIdx) -> &[RelIdx] {
        &self.outgoing[idx as usize]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Days, NaiveDate};

    use crate::models::{Relationship, Task};

    pub fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.checked_add_days(Days::new(offset)))
            .expect("valid test date")
    }

    /// Task starting at day `start` and finishing `duration` days later.
    pub fn make_task(id: &str, start: u64, duration: u64) -> Task {
        Task::new(id, duration as f64).with_dates(day(start), day(start + duration))
    }

    pub fn fs(pred: &str, succ: &str) -> Relationship {
        Relationship::finish_start(pred, succ)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{fs, make_task};
    use super::*;

    #[test]
    fn test_indices() {
        let tasks = vec![
            make_task("a", 0, 2),
            make_task("b", 2, 3),
            make_task("c", 2, 1),
            make_task("d", 5, 1),
        ];
        let rels = vec![fs("a", "b"), fs("a", "c"), fs("b", "d"), fs("c", "d")];
        let graph = TaskGraph::build(&tasks, &rels);

        let a = graph.index_of("a").unwrap();
        let d = graph.index_of("d").unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.relationship_count(), 4);
        assert_eq!(graph.successors(a).len(), 2);
        assert_eq!(graph.incoming(d), &[2, 3]);
        assert_eq!(graph.outgoing(a), &[0, 1]);
        assert_eq!(graph.placeholder_count(), 0);
    }

    #[test]
    fn test_missing_predecessor_becomes_placeholder() {
        let tasks = vec![make_task("b", 2, 3).with_predecessors(["ghost_pred"])];
        let rels = vec![fs("ghost", "b")];
        let graph = TaskGraph::build(&tasks, &rels);

        assert_eq!(graph.placeholder_count(), 2);
        let ghost = graph.index_of("ghost").unwrap();
        let node = graph.node(ghost);
        assert!(node.is_placeholder);
        assert_eq!(node.duration_days, 0.0);
        assert_eq!(graph.id_of(ghost), "ghost");
        assert_eq!(graph.edge(0).predecessor, ghost);
    }

    #[test]
    fn test_duplicate_task_keeps_first() {
        let tasks = vec![make_task("a", 0, 2), make_task("a", 10, 7)];
        let graph = TaskGraph::build(&tasks, &[]);

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(0).duration_days, 2.0);
    }

    #[test]
    fn test_parallel_relationships_share_successor_entry() {
        let tasks = vec![make_task("a", 0, 2), make_task("b", 0, 2)];
        let rels = vec![
            fs("a", "b"),
            Relationship::new("a", "b", RelationshipType::StartStart),
        ];
        let graph = TaskGraph::build(&tasks, &rels);

        assert_eq!(graph.successors(0), &[1]);
        assert_eq!(graph.incoming(1).len(), 2);
    }

    #[test]
    fn test_empty_graph() {
        let graph = TaskGraph::build(&[], &[]);
        assert!(graph.is_empty());
        assert_eq!(graph.task_indices().count(), 0);
    }
}
