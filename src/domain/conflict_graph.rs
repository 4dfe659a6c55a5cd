//! Conflict graph over tasks.
//!
//! Vertices are tasks, indexed by position in the input slice. Two tasks
//! conflict when they share a required resource or when their feasible
//! windows overlap. The graph is undirected, may contain cycles, and is
//! stored as flat adjacency lists — no traversal here assumes acyclicity.
//!
//! The backtracking solver uses degrees for variable-ordering tie-breaks
//! and the resource-sharing sublists for forward checking.

use crate::models::Task;

/// Flat adjacency structure over task indices.
#[derive(Debug, Clone)]
pub struct ConflictGraph {
    /// Full conflict edges: shared resource OR overlapping feasible window.
    neighbors: Vec<Vec<usize>>,
    /// Edges restricted to resource sharing (the only ones that can prune).
    resource_neighbors: Vec<Vec<usize>>,
}

impl ConflictGraph {
    /// Builds the graph from the task list.
    pub fn build(tasks: &[Task]) -> Self {
        let n = tasks.len();
        let mut neighbors = vec![Vec::new(); n];
        let mut resource_neighbors = vec![Vec::new(); n];

        for i in 0..n {
            for j in (i + 1)..n {
                let shares = tasks[i].shares_resource_with(&tasks[j]);
                let windows_overlap = tasks[i]
                    .feasible_window()
                    .overlaps(&tasks[j].feasible_window());
                if shares || windows_overlap {
                    neighbors[i].push(j);
                    neighbors[j].push(i);
                }
                if shares {
                    resource_neighbors[i].push(j);
                    resource_neighbors[j].push(i);
                }
            }
        }

        Self {
            neighbors,
            resource_neighbors,
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Degree of a task in the full conflict graph.
    #[inline]
    pub fn degree(&self, task_idx: usize) -> usize {
        self.neighbors[task_idx].len()
    }

    /// All conflict neighbors of a task.
    #[inline]
    pub fn neighbors(&self, task_idx: usize) -> &[usize] {
        &self.neighbors[task_idx]
    }

    /// Neighbors that share at least one required resource.
    #[inline]
    pub fn resource_neighbors(&self, task_idx: usize) -> &[usize] {
        &self.resource_neighbors[task_idx]
    }
}
