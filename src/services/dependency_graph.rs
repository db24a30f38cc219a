//! Dependency and progress engine.
//!
//! Maintains the per-user dependency DAG, rejects cycle-introducing edges,
//! and annotates tasks with blocking state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::{DependencyEdge, DependencyRepository, TaskRepository};

/// Blocking-state annotations attached to task DTOs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskAnnotations {
    /// Every predecessor is done or cancelled.
    pub can_start: bool,
    pub is_blocked: bool,
    /// Transitive incomplete predecessors.
    pub blocking_task_ids: Vec<Uuid>,
}

/// Direct dependency listing plus a summary of the transitive chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReport {
    pub task_id: Uuid,
    pub dependencies: Vec<DependencyInfo>,
    pub dependents: Vec<Uuid>,
    pub annotations: TaskAnnotations,
    pub chain_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub task_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub satisfied: bool,
}

/// Build an adjacency map from edge rows.
fn adjacency(edges: &[DependencyEdge]) -> HashMap<Uuid, Vec<Uuid>> {
    let mut graph: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in edges {
        graph.entry(edge.task_id).or_default().push(edge.depends_on_id);
    }
    graph
}

/// Whether `target` is reachable from `start` following dependency edges.
pub fn reaches(graph: &HashMap<Uuid, Vec<Uuid>>, start: Uuid, target: Uuid) -> bool {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        if node == target {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(next) = graph.get(&node) {
            queue.extend(next.iter().copied());
        }
    }
    false
}

/// DFS cycle detection over the whole graph; returns one cycle path if any.
pub fn detect_cycle(edges: &[DependencyEdge]) -> Option<Vec<Uuid>> {
    let graph = adjacency(edges);
    let mut visited = HashSet::new();
    let mut stack = HashSet::new();
    let mut path = Vec::new();

    fn visit(
        node: Uuid,
        graph: &HashMap<Uuid, Vec<Uuid>>,
        visited: &mut HashSet<Uuid>,
        stack: &mut HashSet<Uuid>,
        path: &mut Vec<Uuid>,
    ) -> bool {
        visited.insert(node);
        stack.insert(node);
        path.push(node);

        if let Some(neighbors) = graph.get(&node) {
            for &next in neighbors {
                if !visited.contains(&next) {
                    if visit(next, graph, visited, stack, path) {
                        return true;
                    }
                } else if stack.contains(&next) {
                    if let Some(start) = path.iter().position(|&id| id == next) {
                        path.drain(0..start);
                    }
                    return true;
                }
            }
        }

        stack.remove(&node);
        path.pop();
        false
    }

    for &node in graph.keys() {
        if !visited.contains(&node) && visit(node, &graph, &mut visited, &mut stack, &mut path) {
            return Some(path);
        }
    }
    None
}

#[derive(Clone)]
pub struct DependencyGraphService {
    tasks: Arc<dyn TaskRepository>,
    edges: Arc<dyn DependencyRepository>,
    max_edges: usize,
}

impl DependencyGraphService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        edges: Arc<dyn DependencyRepository>,
        max_edges: usize,
    ) -> Self {
        Self { tasks, edges, max_edges }
    }

    /// Add `task -> depends_on`, keeping the graph acyclic.
    pub async fn add_dependency(&self, task_id: Uuid, depends_on: Uuid) -> DomainResult<()> {
        if task_id == depends_on {
            return Err(DomainError::Conflict("task cannot depend on itself".to_string()));
        }

        let found = self.tasks.existing_ids(&[task_id, depends_on]).await?;
        if !found.contains(&task_id) {
            return Err(DomainError::not_found("Task", task_id));
        }
        if !found.contains(&depends_on) {
            return Err(DomainError::not_found("Task", depends_on));
        }

        if self.edges.count().await? >= self.max_edges {
            return Err(DomainError::PreconditionFailed(
                "dependency graph size limit reached".to_string(),
            ));
        }

        // The new edge closes a cycle iff task_id is already reachable from
        // depends_on.
        let graph = adjacency(&self.edges.all_edges().await?);
        if reaches(&graph, depends_on, task_id) {
            return Err(DomainError::Conflict(format!(
                "dependency {task_id} -> {depends_on} would create a cycle"
            )));
        }

        self.edges.add(task_id, depends_on).await
    }

    pub async fn remove_dependency(&self, task_id: Uuid, depends_on: Uuid) -> DomainResult<()> {
        self.edges.remove(task_id, depends_on).await
    }

    pub async fn clear_dependencies(&self, task_id: Uuid) -> DomainResult<usize> {
        if self.tasks.get(task_id).await?.is_none() {
            return Err(DomainError::not_found("Task", task_id));
        }
        self.edges.clear_for_task(task_id).await
    }

    /// Transitive closure of incomplete predecessors.
    pub async fn blocking_tasks(&self, task_id: Uuid) -> DomainResult<Vec<Task>> {
        if self.tasks.get(task_id).await?.is_none() {
            return Err(DomainError::not_found("Task", task_id));
        }

        let graph = adjacency(&self.edges.all_edges().await?);
        let mut blocking = Vec::new();
        let mut seen = HashSet::from([task_id]);
        let mut queue: VecDeque<Uuid> =
            graph.get(&task_id).map(|v| v.iter().copied().collect()).unwrap_or_default();

        while let Some(dep_id) = queue.pop_front() {
            if !seen.insert(dep_id) {
                continue;
            }
            if let Some(dep) = self.tasks.get(dep_id).await? {
                if !dep.status.is_terminal() {
                    blocking.push(dep);
                }
            }
            if let Some(next) = graph.get(&dep_id) {
                queue.extend(next.iter().copied());
            }
        }

        Ok(blocking)
    }

    /// Annotations for one task: startability and the blocking set.
    pub async fn annotate(&self, task: &Task) -> DomainResult<TaskAnnotations> {
        let blocking = self.blocking_tasks(task.id).await?;
        let blocking_task_ids: Vec<Uuid> = blocking.iter().map(|t| t.id).collect();
        Ok(TaskAnnotations {
            can_start: blocking_task_ids.is_empty(),
            is_blocked: !blocking_task_ids.is_empty(),
            blocking_task_ids,
        })
    }

    /// Direct dependencies plus chain summary for one task.
    pub async fn report(&self, task_id: Uuid) -> DomainResult<DependencyReport> {
        let task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", task_id))?;

        let direct = self.edges.dependencies_of(task_id).await?;
        let mut dependencies = Vec::with_capacity(direct.len());
        for dep_id in direct {
            if let Some(dep) = self.tasks.get(dep_id).await? {
                dependencies.push(DependencyInfo {
                    task_id: dep.id,
                    title: dep.title.clone(),
                    satisfied: dep.status.is_terminal(),
                    status: dep.status,
                });
            }
        }

        let annotations = self.annotate(&task).await?;
        let dependents = self.edges.dependents_of(task_id).await?;
        let chain_size = annotations.blocking_task_ids.len();

        Ok(DependencyReport { task_id, dependencies, dependents, annotations, chain_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: Uuid, b: Uuid) -> DependencyEdge {
        DependencyEdge { task_id: a, depends_on_id: b }
    }

    #[test]
    fn empty_graph_has_no_cycle() {
        assert!(detect_cycle(&[]).is_none());
    }

    #[test]
    fn chain_is_acyclic() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(detect_cycle(&[edge(a, b), edge(b, c)]).is_none());
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let cycle = detect_cycle(&[edge(a, b), edge(b, a)]).expect("cycle expected");
        assert!(cycle.contains(&a) && cycle.contains(&b));
    }

    #[test]
    fn diamond_is_acyclic() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let edges = [edge(a, b), edge(a, c), edge(b, d), edge(c, d)];
        assert!(detect_cycle(&edges).is_none());
    }

    #[test]
    fn reachability_follows_edges() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let graph = adjacency(&[edge(a, b), edge(b, c)]);
        assert!(reaches(&graph, a, c));
        assert!(!reaches(&graph, c, a));
    }
}
