#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

/// Tie-break key for topological ordering. Ready nodes are emitted in
/// ascending key order, so callers encode "first" as the smallest tuple
/// (e.g. priority-descending becomes a negated rank). Insertion order is
/// always the final tie-break.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey(pub Vec<i64>);

/// Directed dependency graph over task ids. Edges point from a task to
/// the tasks it depends on. Built fresh per validation or ordering call;
/// edges to ids that were never added are ignored (dangling references
/// are reported by validation, not here).
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: BTreeMap<String, usize>,
    deps: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<String>, depends_on: &[String]) {
        let id = id.into();
        if let Some(&existing) = self.index.get(&id) {
            self.deps[existing] = depends_on.to_vec();
            return;
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(id);
        self.deps.push(depends_on.to_vec());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the first dependency cycle found, as the ordered list of
    /// ids forming the loop (without repeating the first id), or `None`
    /// when the graph is a DAG. Nodes are visited in insertion order so
    /// the result is deterministic.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        // 0 = unvisited, 1 = on the current DFS path, 2 = done.
        let mut state = vec![0u8; self.nodes.len()];
        let mut path: Vec<usize> = Vec::new();

        for start in 0..self.nodes.len() {
            if state[start] != 0 {
                continue;
            }
            if let Some(cycle) = self.visit(start, &mut state, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit(&self, node: usize, state: &mut [u8], path: &mut Vec<usize>) -> Option<Vec<String>> {
        state[node] = 1;
        path.push(node);

        for dep in &self.deps[node] {
            let Some(&target) = self.index.get(dep.as_str()) else {
                continue;
            };
            match state[target] {
                0 => {
                    if let Some(cycle) = self.visit(target, state, path) {
                        return Some(cycle);
                    }
                }
                1 => {
                    let from = path
                        .iter()
                        .position(|&idx| idx == target)
                        .unwrap_or(path.len() - 1);
                    return Some(
                        path[from..]
                            .iter()
                            .map(|&idx| self.nodes[idx].clone())
                            .collect(),
                    );
                }
                _ => {}
            }
        }

        path.pop();
        state[node] = 2;
        None
    }

    /// Orders `subset` so every id appears after all ids it depends on
    /// that are also in the subset. Among ids with no remaining
    /// constraints the smallest `OrderKey` wins, then insertion order.
    /// Ids that form a cycle (callers validate first) are appended in
    /// key order so the result stays total.
    pub fn topological_order(
        &self,
        subset: &[String],
        keys: &BTreeMap<String, OrderKey>,
    ) -> Vec<String> {
        let members: BTreeSet<&str> = subset.iter().map(String::as_str).collect();
        let rank = |id: &str| -> (OrderKey, usize) {
            (
                keys.get(id).cloned().unwrap_or_default(),
                self.index.get(id).copied().unwrap_or(usize::MAX),
            )
        };

        let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for id in subset {
            let mut in_subset = 0usize;
            if let Some(&idx) = self.index.get(id.as_str()) {
                let mut seen = BTreeSet::new();
                for dep in &self.deps[idx] {
                    if dep.as_str() != id.as_str()
                        && members.contains(dep.as_str())
                        && seen.insert(dep.as_str())
                    {
                        in_subset += 1;
                        dependents.entry(dep.as_str()).or_default().push(id.as_str());
                    }
                }
            }
            remaining.insert(id.as_str(), in_subset);
        }

        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut out: Vec<String> = Vec::with_capacity(subset.len());

        while !ready.is_empty() {
            let next_pos = ready
                .iter()
                .enumerate()
                .min_by_key(|(_, id)| rank(id))
                .map(|(pos, _)| pos)
                .unwrap_or(0);
            let id = ready.swap_remove(next_pos);
            remaining.remove(id);
            out.push(id.to_string());

            if let Some(waiting) = dependents.get(id) {
                for &dependent in waiting {
                    if let Some(count) = remaining.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push(dependent);
                        }
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let mut leftover: Vec<&str> = remaining.keys().copied().collect();
            leftover.sort_by_key(|id| rank(id));
            out.extend(leftover.into_iter().map(String::from));
        }

        out
    }
}

/// Renders a cycle as `A -> B -> A` for error messages.
pub fn format_cycle(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (id, deps) in edges {
            let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
            graph.add_node(*id, &deps);
        }
        graph
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let graph = graph(&[("A", &[]), ("B", &["A"]), ("C", &["A", "B"])]);
        assert_eq!(graph.detect_cycle(), None);
    }

    #[test]
    fn two_node_cycle_is_reported_with_both_ids() {
        let graph = graph(&[("A", &["B"]), ("B", &["A"])]);
        let cycle = graph.detect_cycle().expect("cycle");
        assert_eq!(cycle, ids(&["A", "B"]));
        assert_eq!(format_cycle(&cycle), "A -> B -> A");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = graph(&[("A", &["A"])]);
        assert_eq!(graph.detect_cycle(), Some(ids(&["A"])));
    }

    #[test]
    fn dangling_dependencies_are_ignored_by_cycle_detection() {
        let graph = graph(&[("A", &["MISSING"]), ("B", &["A"])]);
        assert_eq!(graph.detect_cycle(), None);
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let graph = graph(&[("C", &["A", "B"]), ("B", &["A"]), ("A", &[])]);
        let order = graph.topological_order(&ids(&["A", "B", "C"]), &BTreeMap::new());
        assert_eq!(order, ids(&["A", "B", "C"]));
    }

    #[test]
    fn topological_order_breaks_ties_by_key_then_insertion() {
        let graph = graph(&[("A", &[]), ("B", &[]), ("C", &[])]);
        let mut keys = BTreeMap::new();
        keys.insert("A".to_string(), OrderKey(vec![0]));
        keys.insert("B".to_string(), OrderKey(vec![-1]));
        keys.insert("C".to_string(), OrderKey(vec![0]));
        let order = graph.topological_order(&ids(&["A", "B", "C"]), &keys);
        // B has the smallest key; A precedes C by insertion order.
        assert_eq!(order, ids(&["B", "A", "C"]));
    }

    #[test]
    fn topological_order_only_constrains_within_subset() {
        let graph = graph(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
        let order = graph.topological_order(&ids(&["C", "A"]), &BTreeMap::new());
        // B is outside the subset, so C is unconstrained relative to A;
        // insertion order of the graph decides.
        assert_eq!(order, ids(&["A", "C"]));
    }

    #[test]
    fn cyclic_subset_still_returns_every_id() {
        let graph = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        let order = graph.topological_order(&ids(&["A", "B", "C"]), &BTreeMap::new());
        assert_eq!(order.len(), 3);
        assert!(order.contains(&"A".to_string()));
        assert!(order.contains(&"B".to_string()));
    }
}
