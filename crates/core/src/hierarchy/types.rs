//! Hierarchy data types.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratum_shared::types::CostCenterId;

/// Default maximum depth expanded by the resolver.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// An organizational unit that incurs or receives budgeted amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCenter {
    /// Cost center ID.
    pub id: CostCenterId,
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent cost center (None for a root).
    #[serde(default)]
    pub parent_id: Option<CostCenterId>,
    /// Whether the cost center is active.
    pub is_active: bool,
    /// First day the cost center is effective.
    pub effective_from: NaiveDate,
    /// First day the cost center is no longer effective (None = open-ended).
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Allocation weight in [0, 1].
    pub allocation_weight: Decimal,
}

impl CostCenter {
    /// Returns true if the cost center is effective on `as_of`.
    ///
    /// The effective range is half-open: `[effective_from, effective_to)`.
    #[must_use]
    pub fn is_effective(&self, as_of: NaiveDate) -> bool {
        self.effective_from <= as_of && self.effective_to.is_none_or(|to| as_of < to)
    }

    /// Returns true if the cost center passes the activity and date filter.
    #[must_use]
    pub fn is_eligible(&self, as_of: NaiveDate, include_inactive: bool) -> bool {
        (include_inactive || self.is_active) && self.is_effective(as_of)
    }
}

/// Arena over cost-center rows, addressed by ID or code.
#[derive(Debug, Clone, Default)]
pub struct CostCenterDirectory {
    centers: Vec<CostCenter>,
    by_id: HashMap<CostCenterId, usize>,
    by_code: HashMap<String, usize>,
    children: HashMap<CostCenterId, Vec<usize>>,
}

impl CostCenterDirectory {
    /// Builds a directory from cost-center rows.
    ///
    /// Children are kept ordered by code so expansion is deterministic.
    #[must_use]
    pub fn new(cost_centers: impl IntoIterator<Item = CostCenter>) -> Self {
        let mut dir = Self::default();
        for center in cost_centers {
            if dir.by_id.contains_key(&center.id) {
                continue;
            }
            let idx = dir.centers.len();
            dir.by_id.insert(center.id, idx);
            dir.by_code.insert(center.code.clone(), idx);
            if let Some(parent) = center.parent_id {
                dir.children.entry(parent).or_default().push(idx);
            }
            dir.centers.push(center);
        }
        for indices in dir.children.values_mut() {
            indices.sort_by(|a, b| dir.centers[*a].code.cmp(&dir.centers[*b].code));
        }
        dir
    }

    /// Returns the cost center with the given ID.
    #[must_use]
    pub fn get(&self, id: CostCenterId) -> Option<&CostCenter> {
        self.by_id.get(&id).map(|&idx| &self.centers[idx])
    }

    /// Returns the cost center with the given code.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&CostCenter> {
        self.by_code.get(code).map(|&idx| &self.centers[idx])
    }

    /// Iterates over direct children of `id`, ordered by code.
    pub fn children(&self, id: CostCenterId) -> impl Iterator<Item = &CostCenter> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.centers[idx])
    }

    /// Returns the active, effective direct children of `id`.
    #[must_use]
    pub fn active_children(&self, id: CostCenterId, as_of: NaiveDate) -> Vec<&CostCenter> {
        self.children(id)
            .filter(|c| c.is_eligible(as_of, false))
            .collect()
    }

    /// Iterates over all cost centers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CostCenter> {
        self.centers.iter()
    }

    /// Returns the number of cost centers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Returns true if the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Options for a single resolution call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Single root to expand from; None selects every parentless cost center.
    pub root: Option<CostCenterId>,
    /// Deepest level expanded (roots are level 0).
    pub max_depth: u32,
    /// Include inactive cost centers.
    pub include_inactive: bool,
    /// Date the effective-range filter is evaluated at.
    pub as_of: NaiveDate,
}

impl ResolveOptions {
    /// Creates options that resolve every root as of the given date.
    #[must_use]
    pub const fn new(as_of: NaiveDate) -> Self {
        Self {
            root: None,
            max_depth: DEFAULT_MAX_DEPTH,
            include_inactive: false,
            as_of,
        }
    }

    /// Restricts resolution to a single root.
    #[must_use]
    pub const fn with_root(mut self, root: CostCenterId) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the maximum depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets whether inactive cost centers are included.
    #[must_use]
    pub const fn include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }
}

/// A resolved position in the cost-center tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Cost center ID.
    pub cost_center_id: CostCenterId,
    /// Cost center code.
    pub code: String,
    /// Parent node this one was reached from (None for roots).
    pub parent_id: Option<CostCenterId>,
    /// Depth below the root (root = 0).
    pub level: u32,
    /// Ancestor IDs from root to self.
    pub path: Vec<CostCenterId>,
    /// Stable ordering key built from the code path.
    pub sort_key: String,
    /// True if no resolved node has this one as parent.
    pub is_leaf: bool,
    /// Number of resolved direct children.
    pub child_count: u32,
    /// The cost center's own allocation weight.
    pub allocation_weight: Decimal,
    /// Product of own weight and every ancestor's weight.
    pub cumulative_weight: Decimal,
}
