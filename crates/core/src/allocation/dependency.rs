//! Rule dependency graph with a bounded closure walk.

use std::collections::{HashMap, HashSet};

use stratum_shared::types::AllocationRuleId;
use tracing::debug;

/// Default bound on the dependency walk.
pub const DEFAULT_CYCLE_GUARD_DEPTH: u32 = 10;

/// Dependencies between rules, with cycles identified.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: HashMap<AllocationRuleId, AllocationRuleId>,
    ancestors: HashMap<AllocationRuleId, Vec<AllocationRuleId>>,
    cyclic: HashSet<AllocationRuleId>,
    cycles: Vec<Vec<AllocationRuleId>>,
}

impl DependencyGraph {
    /// Builds the graph from `(rule, depends_on)` pairs.
    ///
    /// Each rule's chain is walked at most `max_depth` steps. A walk stops on
    /// the first rule already on its path; if that rule is the start, the start
    /// lies on a cycle.
    #[must_use]
    pub fn build(
        rules: impl IntoIterator<Item = (AllocationRuleId, Option<AllocationRuleId>)>,
        max_depth: u32,
    ) -> Self {
        let mut ids = Vec::new();
        let mut edges = HashMap::new();
        for (rule, depends_on) in rules {
            ids.push(rule);
            if let Some(dep) = depends_on {
                edges.insert(rule, dep);
            }
        }
        ids.sort();

        let mut ancestors = HashMap::with_capacity(ids.len());
        let mut cyclic = HashSet::new();
        let mut seen_cycles = HashSet::new();
        let mut cycles = Vec::new();

        for &rule in &ids {
            let mut path = vec![rule];
            let mut current = rule;
            let mut depth = 0;
            while depth < max_depth {
                let Some(&next) = edges.get(&current) else {
                    break;
                };
                if let Some(pos) = path.iter().position(|r| *r == next) {
                    if pos == 0 {
                        cyclic.insert(rule);
                        let cycle = canonical_cycle(&path);
                        if seen_cycles.insert(cycle.clone()) {
                            debug!(rule = %rule, len = cycle.len(), "dependency cycle found");
                            cycles.push(cycle);
                        }
                    }
                    break;
                }
                path.push(next);
                current = next;
                depth += 1;
            }
            path.remove(0);
            ancestors.insert(rule, path);
        }

        Self {
            edges,
            ancestors,
            cyclic,
            cycles,
        }
    }

    /// Returns the dependency a rule must wait on, if any. Rules on a cycle
    /// wait on nothing.
    #[must_use]
    pub fn effective_dependency(&self, rule: AllocationRuleId) -> Option<AllocationRuleId> {
        if self.cyclic.contains(&rule) {
            return None;
        }
        self.edges.get(&rule).copied()
    }

    /// Returns true if the rule lies on a dependency cycle.
    #[must_use]
    pub fn is_cyclic(&self, rule: AllocationRuleId) -> bool {
        self.cyclic.contains(&rule)
    }

    /// Returns the rule's transitive dependencies in walk order.
    #[must_use]
    pub fn ancestors(&self, rule: AllocationRuleId) -> &[AllocationRuleId] {
        self.ancestors.get(&rule).map_or(&[], Vec::as_slice)
    }

    /// Returns the distinct cycles found.
    #[must_use]
    pub fn cycles(&self) -> &[Vec<AllocationRuleId>] {
        &self.cycles
    }
}

/// Rotates a cycle so it starts at its smallest ID.
fn canonical_cycle(path: &[AllocationRuleId]) -> Vec<AllocationRuleId> {
    let start = path
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map_or(0, |(i, _)| i);
    path[start..].iter().chain(&path[..start]).copied().collect()
}
