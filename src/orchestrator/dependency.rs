//! Dependency DAG construction and cycle detection (spec §4.6.4, invariant
//! I3 "`depends_on` forms a DAG; cycles are rejected"). Built fresh per
//! scheduling pass from the current index — no long-lived graph object, no
//! stale pointers after repairs (SPEC_FULL §11).

use std::collections::{HashMap, HashSet};

use crate::artifact::index::IndexItem;
use crate::error::WreckitError;

/// In-memory adjacency map keyed by item id, rebuilt fresh every pass.
pub struct DependencyGraph {
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn build(items: &[IndexItem]) -> Self {
        let edges = items
            .iter()
            .map(|i| (i.id.clone(), i.depends_on.clone()))
            .collect();
        Self { edges }
    }

    pub fn depends_on(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Detect a cycle via DFS with a recursion-stack set; returns the ids
    /// involved in the first cycle found, in visit order.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        let mut on_stack: HashSet<&str> = HashSet::new();

        let mut ids: Vec<&str> = self.edges.keys().map(String::as_str).collect();
        ids.sort();

        for start in ids {
            if visited.contains(start) {
                continue;
            }
            if let Some(cycle) = self.dfs(start, &mut visited, &mut stack, &mut on_stack) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        stack.push(node);
        on_stack.insert(node);

        for dep in self.depends_on(node) {
            let dep = dep.as_str();
            if !self.edges.contains_key(dep) {
                // Dangling reference; not this module's concern (Doctor's).
                continue;
            }
            if on_stack.contains(dep) {
                let cycle_start = stack.iter().position(|&n| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = stack[cycle_start..].iter().map(|s| s.to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
            if !visited.contains(dep) {
                if let Some(cycle) = self.dfs(dep, visited, stack, on_stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        on_stack.remove(node);
        None
    }

    /// Reject a cyclic set outright (spec I3 "the Orchestrator will refuse
    /// to run a cyclic set").
    pub fn check_acyclic(&self) -> Result<(), WreckitError> {
        match self.find_cycle() {
            Some(items) => Err(WreckitError::CyclicDependency { items }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::ItemState;

    fn item(id: &str, depends_on: &[&str]) -> IndexItem {
        IndexItem {
            id: id.to_string(),
            state: ItemState::Raw,
            title: id.to_string(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn acyclic_chain_passes() {
        let items = vec![item("001-a", &[]), item("002-b", &["001-a"]), item("003-c", &["002-b"])];
        let graph = DependencyGraph::build(&items);
        assert!(graph.check_acyclic().is_ok());
    }

    #[test]
    fn direct_cycle_detected() {
        let items = vec![item("001-a", &["002-b"]), item("002-b", &["001-a"])];
        let graph = DependencyGraph::build(&items);
        let err = graph.check_acyclic().unwrap_err();
        assert!(matches!(err, WreckitError::CyclicDependency { .. }));
    }

    #[test]
    fn dangling_reference_is_not_a_cycle() {
        let items = vec![item("001-a", &["999-missing"])];
        let graph = DependencyGraph::build(&items);
        assert!(graph.check_acyclic().is_ok());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let items = vec![item("001-a", &["001-a"])];
        let graph = DependencyGraph::build(&items);
        assert!(graph.check_acyclic().is_err());
    }
}
