//! Property tests for the dependency graph primitives.

use proptest::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use taskhub::domain::ports::dependency_repository::DependencyEdge;
use taskhub::services::dependency_graph::{detect_cycle, reaches};

fn edge(a: Uuid, b: Uuid) -> DependencyEdge {
    DependencyEdge { task_id: a, depends_on_id: b }
}

/// Build a random forward-only edge set over `size` nodes: every edge goes
/// from a higher index to a lower index, so the graph is acyclic by
/// construction.
fn acyclic_edges(ids: &[Uuid], picks: &[(usize, usize)]) -> Vec<DependencyEdge> {
    picks
        .iter()
        .filter_map(|&(from, to)| {
            let from = from % ids.len();
            let to = to % ids.len();
            (from > to).then(|| edge(ids[from], ids[to]))
        })
        .collect()
}

proptest! {
    /// Forward-only graphs never report a cycle.
    #[test]
    fn acyclic_graphs_are_accepted(
        size in 2usize..24,
        picks in prop::collection::vec((0usize..24, 0usize..24), 0..48),
    ) {
        let ids: Vec<Uuid> = (0..size).map(|_| Uuid::new_v4()).collect();
        let edges = acyclic_edges(&ids, &picks);
        prop_assert!(detect_cycle(&edges).is_none());
    }

    /// Closing any reachable path back on itself is always detected.
    #[test]
    fn back_edges_create_detectable_cycles(
        size in 2usize..24,
        picks in prop::collection::vec((0usize..24, 0usize..24), 1..48),
    ) {
        let ids: Vec<Uuid> = (0..size).map(|_| Uuid::new_v4()).collect();
        let mut edges = acyclic_edges(&ids, &picks);
        prop_assume!(!edges.is_empty());

        // Pick an existing edge a -> b and close the loop with b -> a.
        let existing = edges[picks[0].0 % edges.len()];
        edges.push(edge(existing.depends_on_id, existing.task_id));
        prop_assert!(detect_cycle(&edges).is_some());
    }

    /// `reaches` agrees with cycle detection: adding edge (t, d) creates a
    /// cycle iff t was already reachable from d.
    #[test]
    fn reachability_predicts_cycle_introduction(
        size in 2usize..16,
        picks in prop::collection::vec((0usize..16, 0usize..16), 1..32),
        candidate in (0usize..16, 0usize..16),
    ) {
        let ids: Vec<Uuid> = (0..size).map(|_| Uuid::new_v4()).collect();
        let edges = acyclic_edges(&ids, &picks);

        let t = ids[candidate.0 % ids.len()];
        let d = ids[candidate.1 % ids.len()];
        prop_assume!(t != d);

        let mut graph: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for e in &edges {
            graph.entry(e.task_id).or_default().push(e.depends_on_id);
        }
        let would_cycle = reaches(&graph, d, t);

        let mut with_candidate = edges.clone();
        with_candidate.push(edge(t, d));
        prop_assert_eq!(detect_cycle(&with_candidate).is_some(), would_cycle);
    }
}
