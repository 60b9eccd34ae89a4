//! Instance size classes and their illustrative monthly costs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly cost assumed for instance types missing from the catalog
pub const DEFAULT_INSTANCE_COST: f64 = 50.0;

const DEFAULT_COSTS: &[(&str, f64)] = &[
    ("t3.small", 10.0),
    ("t3.medium", 20.0),
    ("t3.large", 40.0),
    ("m5.medium", 30.0),
    ("m5.large", 60.0),
    ("m5.xlarge", 120.0),
    ("c5.medium", 40.0),
    ("c5.large", 80.0),
    ("r5.medium", 50.0),
    ("r5.large", 100.0),
];

/// Each entry maps an instance type to the next size down
const DEFAULT_DOWNSIZE: &[(&str, &str)] = &[
    ("t3.medium", "t3.small"),
    ("t3.large", "t3.medium"),
    ("m5.large", "m5.medium"),
    ("m5.xlarge", "m5.large"),
    ("c5.large", "c5.medium"),
    ("r5.large", "r5.medium"),
];

/// Size-class table used by the rightsizing heuristic.
///
/// These are placeholders rather than provider pricing, so the whole table
/// is configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeCatalog {
    pub monthly_costs: BTreeMap<String, f64>,
    pub downsize: BTreeMap<String, String>,
    pub default_cost: f64,
}

impl Default for SizeCatalog {
    fn default() -> Self {
        Self {
            monthly_costs: DEFAULT_COSTS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            downsize: DEFAULT_DOWNSIZE
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_cost: DEFAULT_INSTANCE_COST,
        }
    }
}

impl SizeCatalog {
    pub fn monthly_cost(&self, instance_type: &str) -> f64 {
        self.monthly_costs
            .get(instance_type)
            .copied()
            .unwrap_or(self.default_cost)
    }

    pub fn smaller(&self, instance_type: &str) -> Option<&str> {
        self.downsize.get(instance_type).map(String::as_str)
    }

    /// Reverse lookup of the downsize map
    pub fn larger(&self, instance_type: &str) -> Option<&str> {
        self.downsize
            .iter()
            .find(|(_, smaller)| smaller.as_str() == instance_type)
            .map(|(larger, _)| larger.as_str())
    }

    /// Monthly saving of moving between two sizes, never negative
    pub fn savings(&self, current: &str, recommended: &str) -> f64 {
        (self.monthly_cost(current) - self.monthly_cost(recommended)).max(0.0)
    }
}
