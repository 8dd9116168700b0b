//! Breadth-first cost-center hierarchy resolution.

use std::collections::HashMap;

use stratum_shared::types::CostCenterId;
use tracing::{debug, info};

use super::error::HierarchyError;
use super::types::{CostCenter, CostCenterDirectory, HierarchyNode, ResolveOptions};

/// Separator between codes in a node's sort key.
const SORT_KEY_SEPARATOR: char = '/';

/// Expands cost-center rows into leveled, weighted hierarchy nodes.
pub struct HierarchyResolver;

impl HierarchyResolver {
    /// Resolve the hierarchy described by `options`.
    ///
    /// Root candidates (the named root, or every parentless row) pass through the
    /// same activity and effective-date filter as every other row. Expansion stops
    /// at `options.max_depth`, so cyclic parent pointers terminate.
    ///
    /// Nodes are returned level by level, siblings ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyError::RootNotFound` if `options.root` names no row.
    pub fn resolve(
        directory: &CostCenterDirectory,
        options: &ResolveOptions,
    ) -> Result<Vec<HierarchyNode>, HierarchyError> {
        let candidates: Vec<&CostCenter> = match options.root {
            Some(root_id) => vec![
                directory
                    .get(root_id)
                    .ok_or(HierarchyError::RootNotFound(root_id))?,
            ],
            None => {
                let mut roots: Vec<&CostCenter> =
                    directory.iter().filter(|c| c.parent_id.is_none()).collect();
                roots.sort_by(|a, b| a.code.cmp(&b.code));
                roots
            }
        };

        let mut nodes: Vec<HierarchyNode> = Vec::new();
        let mut index: HashMap<CostCenterId, usize> = HashMap::new();

        for center in candidates {
            if !center.is_eligible(options.as_of, options.include_inactive)
                || index.contains_key(&center.id)
            {
                continue;
            }
            index.insert(center.id, nodes.len());
            nodes.push(HierarchyNode {
                cost_center_id: center.id,
                code: center.code.clone(),
                parent_id: None,
                level: 0,
                path: vec![center.id],
                sort_key: center.code.clone(),
                is_leaf: true,
                child_count: 0,
                allocation_weight: center.allocation_weight,
                cumulative_weight: center.allocation_weight,
            });
        }

        let mut frontier: Vec<usize> = (0..nodes.len()).collect();
        let mut level = 0;

        while level < options.max_depth && !frontier.is_empty() {
            let mut next = Vec::new();

            for parent_idx in frontier {
                let parent_id = nodes[parent_idx].cost_center_id;

                for child in directory.children(parent_id) {
                    if !child.is_eligible(options.as_of, options.include_inactive)
                        || index.contains_key(&child.id)
                    {
                        continue;
                    }

                    let parent = &nodes[parent_idx];
                    let mut path = parent.path.clone();
                    path.push(child.id);
                    let node = HierarchyNode {
                        cost_center_id: child.id,
                        code: child.code.clone(),
                        parent_id: Some(parent_id),
                        level: level + 1,
                        path,
                        sort_key: format!("{}{SORT_KEY_SEPARATOR}{}", parent.sort_key, child.code),
                        is_leaf: true,
                        child_count: 0,
                        allocation_weight: child.allocation_weight,
                        cumulative_weight: parent.cumulative_weight * child.allocation_weight,
                    };

                    index.insert(child.id, nodes.len());
                    next.push(nodes.len());
                    nodes.push(node);
                }
            }

            debug!(level = level + 1, discovered = next.len(), "expanded hierarchy level");
            frontier = next;
            level += 1;
        }

        Self::finalize(&mut nodes, &index);

        info!(
            nodes = nodes.len(),
            depth = level,
            root = ?options.root,
            "resolved cost center hierarchy"
        );

        Ok(nodes)
    }

    /// Computes `child_count` and `is_leaf` from the resolved edges.
    fn finalize(nodes: &mut [HierarchyNode], index: &HashMap<CostCenterId, usize>) {
        let mut counts: HashMap<CostCenterId, u32> = HashMap::new();
        for node in nodes.iter() {
            if let Some(parent) = node.parent_id {
                *counts.entry(parent).or_insert(0) += 1;
            }
        }

        for (id, count) in counts {
            if let Some(&idx) = index.get(&id) {
                nodes[idx].child_count = count;
                nodes[idx].is_leaf = count == 0;
            }
        }
    }
}
