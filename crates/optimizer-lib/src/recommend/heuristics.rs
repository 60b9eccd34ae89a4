//! Per-resource optimization heuristics
//!
//! Every heuristic reads the same input and independently yields at most one
//! candidate. The fixed metadata attached to each kind of recommendation lives
//! in [`RULE_PROFILES`] so the mapping can be audited in one place.

use super::sizing::SizeCatalog;
use crate::models::{
    Complexity, FeatureVector, PriorityLevel, ProposedAction, RecommendationKind, Resource,
    SizeDirection, UsageSignals,
};
use serde::{Deserialize, Serialize};

/// Tunable constants consumed by the heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Fraction of monthly cost saved by a reserved-capacity commitment
    pub reserved_discount: f64,
    /// Fraction of monthly cost saved by spot or preemptible capacity
    pub spot_discount: f64,
    /// Storage cost per GB-month when the resource does not state one
    pub default_storage_cost_per_gb: f64,
    /// Cost records required before reserved capacity is considered
    pub min_reserved_records: usize,
    pub sizes: SizeCatalog,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            reserved_discount: 0.4,
            spot_discount: 0.7,
            default_storage_cost_per_gb: 0.1,
            min_reserved_records: 30,
            sizes: SizeCatalog::default(),
        }
    }
}

/// Fixed metadata for one kind of recommendation
#[derive(Debug)]
pub struct RuleProfile {
    pub kind: RecommendationKind,
    pub title: &'static str,
    pub confidence: f64,
    pub complexity: Complexity,
    pub requires_downtime: bool,
    pub requires_data_migration: bool,
    pub rollback: Complexity,
    pub risk_factors: &'static [&'static str],
    /// Candidates must save strictly more than this, when set
    pub min_savings: Option<f64>,
}

pub const RULE_PROFILES: [RuleProfile; 5] = [
    RuleProfile {
        kind: RecommendationKind::Rightsizing,
        title: "Rightsize Instance",
        confidence: 0.8,
        complexity: Complexity::Medium,
        requires_downtime: true,
        requires_data_migration: false,
        rollback: Complexity::Low,
        risk_factors: &[],
        min_savings: Some(10.0),
    },
    RuleProfile {
        kind: RecommendationKind::ReservedCapacity,
        title: "Purchase Reserved Instance",
        confidence: 0.9,
        complexity: Complexity::Low,
        requires_downtime: false,
        requires_data_migration: false,
        rollback: Complexity::High,
        risk_factors: &[],
        min_savings: Some(50.0),
    },
    RuleProfile {
        kind: RecommendationKind::SpotInstance,
        title: "Use Spot Instances",
        confidence: 0.6,
        complexity: Complexity::Medium,
        requires_downtime: true,
        requires_data_migration: false,
        rollback: Complexity::Medium,
        risk_factors: &[
            "Spot instance interruptions",
            "Need fault-tolerant architecture",
        ],
        min_savings: Some(20.0),
    },
    RuleProfile {
        kind: RecommendationKind::StorageOptimization,
        title: "Optimize Storage Allocation",
        confidence: 0.85,
        complexity: Complexity::Low,
        requires_downtime: false,
        requires_data_migration: false,
        rollback: Complexity::Low,
        risk_factors: &[],
        min_savings: Some(10.0),
    },
    RuleProfile {
        kind: RecommendationKind::UnusedResource,
        title: "Terminate Unused Resource",
        confidence: 0.7,
        complexity: Complexity::Low,
        requires_downtime: true,
        requires_data_migration: false,
        rollback: Complexity::Medium,
        risk_factors: &["Data loss if resource contains important data"],
        min_savings: None,
    },
];

pub fn profile(kind: RecommendationKind) -> &'static RuleProfile {
    match kind {
        RecommendationKind::Rightsizing => &RULE_PROFILES[0],
        RecommendationKind::ReservedCapacity => &RULE_PROFILES[1],
        RecommendationKind::SpotInstance => &RULE_PROFILES[2],
        RecommendationKind::StorageOptimization => &RULE_PROFILES[3],
        RecommendationKind::UnusedResource => &RULE_PROFILES[4],
    }
}

const DOWNSIZE_MAX_AVG: f64 = 20.0;
const DOWNSIZE_MAX_PEAK: f64 = 40.0;
const UPSIZE_MIN_AVG: f64 = 80.0;
const UPSIZE_MIN_PEAK: f64 = 90.0;
const SPOT_MAX_UTILIZATION: f64 = 70.0;
const STORAGE_MAX_UTILIZATION: f64 = 0.3;
const STORAGE_HEADROOM: f64 = 1.2;
const UNUSED_MAX_CPU: f64 = 5.0;
const UNUSED_MAX_NETWORK: f64 = 10.0;
const UNUSED_MIN_IDLE_DAYS: f64 = 7.0;

/// Everything a heuristic may look at for one resource
#[derive(Debug, Clone, Copy)]
pub struct HeuristicInput<'a> {
    pub resource: &'a Resource,
    pub signals: &'a UsageSignals,
    pub features: &'a FeatureVector,
}

/// A heuristic's proposal before it becomes a ranked recommendation
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub action: ProposedAction,
    pub description: String,
    pub potential_savings: f64,
    pub priority_override: Option<PriorityLevel>,
}

impl Candidate {
    fn new(action: ProposedAction, description: String, potential_savings: f64) -> Self {
        Self {
            action,
            description,
            potential_savings,
            priority_override: None,
        }
    }
}

/// Run the heuristic for `kind`, applying its savings floor
pub fn evaluate(
    kind: RecommendationKind,
    input: &HeuristicInput<'_>,
    config: &HeuristicConfig,
) -> Option<Candidate> {
    let candidate = match kind {
        RecommendationKind::Rightsizing => rightsizing(input, &config.sizes),
        RecommendationKind::ReservedCapacity => reserved_capacity(input, config),
        RecommendationKind::SpotInstance => spot_instance(input, config),
        RecommendationKind::StorageOptimization => storage_optimization(input, config),
        RecommendationKind::UnusedResource => unused_resource(input),
    }?;

    // Upsizing is a performance action and carries no savings
    let is_upsize = matches!(
        candidate.action,
        ProposedAction::Rightsizing {
            direction: SizeDirection::Up,
            ..
        }
    );
    match profile(kind).min_savings {
        Some(floor) if !is_upsize && candidate.potential_savings <= floor => None,
        _ => Some(candidate),
    }
}

fn rightsizing(input: &HeuristicInput<'_>, sizes: &SizeCatalog) -> Option<Candidate> {
    let current = input.signals.instance_type.as_deref()?;
    let avg = input.signals.avg_cpu_utilization?;
    let peak = input.signals.peak_cpu_utilization?;

    if avg < DOWNSIZE_MAX_AVG && peak < DOWNSIZE_MAX_PEAK {
        let smaller = sizes.smaller(current)?;
        let savings = sizes.savings(current, smaller);
        return Some(Candidate::new(
            ProposedAction::Rightsizing {
                direction: SizeDirection::Down,
                current_instance: current.to_string(),
                recommended_instance: smaller.to_string(),
            },
            format!(
                "Instance is underutilized (avg CPU {:.1}%, peak {:.1}%). Downsizing from {} to {} saves ${:.2} monthly.",
                avg, peak, current, smaller, savings
            ),
            savings,
        ));
    }

    if avg > UPSIZE_MIN_AVG && peak > UPSIZE_MIN_PEAK {
        let larger = sizes.larger(current)?;
        let mut candidate = Candidate::new(
            ProposedAction::Rightsizing {
                direction: SizeDirection::Up,
                current_instance: current.to_string(),
                recommended_instance: larger.to_string(),
            },
            format!(
                "Instance is saturated (avg CPU {:.1}%, peak {:.1}%). Upsizing from {} to {} protects performance.",
                avg, peak, current, larger
            ),
            0.0,
        );
        candidate.priority_override = Some(PriorityLevel::Medium);
        return Some(candidate);
    }

    None
}

fn reserved_capacity(input: &HeuristicInput<'_>, config: &HeuristicConfig) -> Option<Candidate> {
    if input.features.data_points < config.min_reserved_records {
        return None;
    }
    let monthly = input.features.monthly_cost();
    let savings = monthly * config.reserved_discount;
    Some(Candidate::new(
        ProposedAction::ReservedCapacity {
            current_monthly_cost: monthly,
            reserved_monthly_cost: monthly - savings,
        },
        format!(
            "This {} shows consistent usage patterns. Purchasing reserved capacity would save ${:.2} monthly.",
            input.resource.resource_type, savings
        ),
        savings,
    ))
}

fn spot_instance(input: &HeuristicInput<'_>, config: &HeuristicConfig) -> Option<Candidate> {
    let avg = input.signals.avg_cpu_utilization?;
    if avg > SPOT_MAX_UTILIZATION {
        return None;
    }
    let monthly = input.features.monthly_cost();
    let savings = monthly * config.spot_discount;
    Some(Candidate::new(
        ProposedAction::SpotInstance {
            current_monthly_cost: monthly,
            spot_monthly_cost: monthly - savings,
        },
        format!(
            "This {} can run on spot capacity, saving ${:.2} monthly.",
            input.resource.resource_type, savings
        ),
        savings,
    ))
}

fn storage_optimization(input: &HeuristicInput<'_>, config: &HeuristicConfig) -> Option<Candidate> {
    if !input.resource.type_lower().contains("storage") {
        return None;
    }
    let allocated = input.signals.storage_allocated_gb.filter(|gb| *gb > 0.0)?;
    let used = input.signals.storage_used_gb?.max(0.0);
    let utilization = used / allocated;
    if utilization >= STORAGE_MAX_UTILIZATION {
        return None;
    }

    let cost_per_gb = input
        .signals
        .cost_per_gb
        .unwrap_or(config.default_storage_cost_per_gb);
    let savings = (allocated - used) * cost_per_gb;
    Some(Candidate::new(
        ProposedAction::StorageOptimization {
            allocated_gb: allocated,
            used_gb: used,
            recommended_gb: used * STORAGE_HEADROOM,
        },
        format!(
            "This storage resource is only {:.1}% utilized. Reducing allocation could save ${:.2} monthly.",
            utilization * 100.0,
            savings
        ),
        savings,
    ))
}

fn unused_resource(input: &HeuristicInput<'_>) -> Option<Candidate> {
    let cpu = input.signals.avg_cpu_utilization?;
    let network = input.signals.avg_network_utilization?;
    let idle_days = input.signals.last_activity_days?;
    if cpu >= UNUSED_MAX_CPU || network >= UNUSED_MAX_NETWORK || idle_days <= UNUSED_MIN_IDLE_DAYS
    {
        return None;
    }

    let monthly = input.features.monthly_cost();
    Some(Candidate::new(
        ProposedAction::UnusedResource { idle_days },
        format!(
            "This resource shows very low activity (CPU {:.1}%, network {:.1}, idle {} days). Terminating it could save ${:.2} monthly.",
            cpu, network, idle_days, monthly
        ),
        monthly,
    ))
}
