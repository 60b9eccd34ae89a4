//! Core data models for the cost optimizer

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days in a billing month for monthly cost projections
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Specification keys carrying usage signals
pub mod spec_keys {
    pub const INSTANCE_TYPE: &str = "instance_type";
    pub const AVG_CPU_UTILIZATION: &str = "avg_cpu_utilization";
    pub const PEAK_CPU_UTILIZATION: &str = "peak_cpu_utilization";
    pub const AVG_NETWORK_UTILIZATION: &str = "avg_network_utilization";
    pub const LAST_ACTIVITY_DAYS: &str = "last_activity_days";
    pub const CPU_VARIANCE: &str = "cpu_variance";
    pub const STORAGE_ALLOCATED_GB: &str = "storage_allocated_gb";
    pub const STORAGE_USED_GB: &str = "storage_used_gb";
    pub const COST_PER_GB: &str = "cost_per_gb";
}

/// Cloud resource as reported by the inventory source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub provider: String,
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource {
    /// Numeric specification value, accepting numbers and numeric strings
    pub fn spec_f64(&self, key: &str) -> Option<f64> {
        let value = match self.specifications.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn spec_str(&self, key: &str) -> Option<&str> {
        self.specifications.get(key).and_then(|v| v.as_str())
    }

    pub fn type_lower(&self) -> String {
        self.resource_type.to_lowercase()
    }

    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }

    /// Tags as lower-cased (key, value) pairs in key order
    pub fn tags_lower(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.tags
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
    }
}

/// A single day of billed cost for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub resource_id: String,
    pub date: NaiveDate,
    pub cost: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub usage_quantity: Option<f64>,
    #[serde(default)]
    pub usage_unit: Option<String>,
    #[serde(default)]
    pub service_name: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Usage signals read from resource specifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSignals {
    pub instance_type: Option<String>,
    pub avg_cpu_utilization: Option<f64>,
    pub peak_cpu_utilization: Option<f64>,
    pub avg_network_utilization: Option<f64>,
    pub last_activity_days: Option<f64>,
    pub cpu_variance: Option<f64>,
    pub storage_allocated_gb: Option<f64>,
    pub storage_used_gb: Option<f64>,
    pub cost_per_gb: Option<f64>,
}

impl UsageSignals {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            instance_type: resource
                .spec_str(spec_keys::INSTANCE_TYPE)
                .map(str::to_string),
            avg_cpu_utilization: resource.spec_f64(spec_keys::AVG_CPU_UTILIZATION),
            peak_cpu_utilization: resource.spec_f64(spec_keys::PEAK_CPU_UTILIZATION),
            avg_network_utilization: resource.spec_f64(spec_keys::AVG_NETWORK_UTILIZATION),
            last_activity_days: resource.spec_f64(spec_keys::LAST_ACTIVITY_DAYS),
            cpu_variance: resource.spec_f64(spec_keys::CPU_VARIANCE),
            storage_allocated_gb: resource.spec_f64(spec_keys::STORAGE_ALLOCATED_GB),
            storage_used_gb: resource.spec_f64(spec_keys::STORAGE_USED_GB),
            cost_per_gb: resource.spec_f64(spec_keys::COST_PER_GB),
        }
    }
}

/// Numeric features derived from a resource's cost series and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub resource_id: String,
    pub avg_daily_cost: f64,
    pub total_cost: f64,
    pub cost_std: f64,
    pub cost_min: f64,
    pub cost_max: f64,
    pub cost_trend: f64,
    pub cost_volatility: f64,
    pub data_points: usize,
    pub usage_consistency: f64,
    pub peak_cost_ratio: f64,
    pub cost_range_ratio: f64,
    pub has_tags: bool,
    pub tag_count: usize,
    pub is_production: bool,
    pub resource_type_encoded: u32,
    pub provider_encoded: u32,
    pub age_days: i64,
    pub analysis_window_days: u32,
}

impl FeatureVector {
    /// Projected monthly cost from the average daily cost
    pub fn monthly_cost(&self) -> f64 {
        self.avg_daily_cost * DAYS_PER_MONTH
    }

    /// Flat name → value view of every feature
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        BTreeMap::from([
            ("avg_daily_cost", self.avg_daily_cost),
            ("total_cost", self.total_cost),
            ("cost_std", self.cost_std),
            ("cost_min", self.cost_min),
            ("cost_max", self.cost_max),
            ("cost_trend", self.cost_trend),
            ("cost_volatility", self.cost_volatility),
            ("data_points", self.data_points as f64),
            ("usage_consistency", self.usage_consistency),
            ("peak_cost_ratio", self.peak_cost_ratio),
            ("cost_range_ratio", self.cost_range_ratio),
            ("has_tags", flag(self.has_tags)),
            ("tag_count", self.tag_count as f64),
            ("is_production", flag(self.is_production)),
            ("resource_type_encoded", self.resource_type_encoded as f64),
            ("provider_encoded", self.provider_encoded as f64),
            ("age_days", self.age_days as f64),
            ("analysis_window_days", self.analysis_window_days as f64),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityClass {
    High,
    Low,
}

/// Qualitative usage pattern derived from a feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePattern {
    pub cost_stability: f64,
    pub usage_consistency: f64,
    pub peak_usage_ratio: f64,
    pub trend_direction: TrendDirection,
    pub trend_magnitude: f64,
    pub is_over_provisioned: bool,
    pub is_under_utilized: bool,
    pub volatility_class: VolatilityClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InefficiencyKind {
    OverProvisioning,
    UnderUtilization,
    UsageVolatility,
    ProductionInefficiency,
}

impl InefficiencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InefficiencyKind::OverProvisioning => "over_provisioning",
            InefficiencyKind::UnderUtilization => "under_utilization",
            InefficiencyKind::UsageVolatility => "usage_volatility",
            InefficiencyKind::ProductionInefficiency => "production_inefficiency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A flagged usage pattern suggesting an optimization opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inefficiency {
    pub kind: InefficiencyKind,
    pub severity: Severity,
    pub description: String,
    pub potential_savings_pct: f64,
    pub confidence: f64,
}

/// Pattern analysis output for one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAnalysis {
    pub resource_id: String,
    pub pattern: UsagePattern,
    pub inefficiencies: Vec<Inefficiency>,
    pub analysis_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Priority levels share the risk scale
pub type PriorityLevel = RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    ResourceCriticality,
    BusinessImpact,
    RollbackComplexity,
    DataSensitivity,
    UptimeRequirements,
}

impl RiskFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::ResourceCriticality => "resource_criticality",
            RiskFactor::BusinessImpact => "business_impact",
            RiskFactor::RollbackComplexity => "rollback_complexity",
            RiskFactor::DataSensitivity => "data_sensitivity",
            RiskFactor::UptimeRequirements => "uptime_requirements",
        }
    }
}

/// One scored risk factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskComponent {
    pub factor: RiskFactor,
    pub score: f64,
    pub weight: f64,
    pub factors: Vec<String>,
}

/// Risk of acting on a candidate action for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub components: Vec<RiskComponent>,
    pub mitigations: Vec<String>,
    pub requires_approval: bool,
    pub auto_approval_eligible: bool,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn component(&self, factor: RiskFactor) -> Option<&RiskComponent> {
        self.components.iter().find(|c| c.factor == factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Rightsizing,
    ReservedCapacity,
    SpotInstance,
    StorageOptimization,
    UnusedResource,
}

impl RecommendationKind {
    pub const ALL: [RecommendationKind; 5] = [
        RecommendationKind::Rightsizing,
        RecommendationKind::ReservedCapacity,
        RecommendationKind::SpotInstance,
        RecommendationKind::StorageOptimization,
        RecommendationKind::UnusedResource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Rightsizing => "rightsizing",
            RecommendationKind::ReservedCapacity => "reserved_capacity",
            RecommendationKind::SpotInstance => "spot_instance",
            RecommendationKind::StorageOptimization => "storage_optimization",
            RecommendationKind::UnusedResource => "unused_resource",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeDirection {
    Down,
    Up,
}

/// The concrete change a recommendation proposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposedAction {
    Rightsizing {
        direction: SizeDirection,
        current_instance: String,
        recommended_instance: String,
    },
    ReservedCapacity {
        current_monthly_cost: f64,
        reserved_monthly_cost: f64,
    },
    SpotInstance {
        current_monthly_cost: f64,
        spot_monthly_cost: f64,
    },
    StorageOptimization {
        allocated_gb: f64,
        used_gb: f64,
        recommended_gb: f64,
    },
    UnusedResource {
        idle_days: f64,
    },
}

impl ProposedAction {
    pub fn kind(&self) -> RecommendationKind {
        match self {
            ProposedAction::Rightsizing { .. } => RecommendationKind::Rightsizing,
            ProposedAction::ReservedCapacity { .. } => RecommendationKind::ReservedCapacity,
            ProposedAction::SpotInstance { .. } => RecommendationKind::SpotInstance,
            ProposedAction::StorageOptimization { .. } => RecommendationKind::StorageOptimization,
            ProposedAction::UnusedResource { .. } => RecommendationKind::UnusedResource,
        }
    }
}

/// A typed proposal to change a resource's configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,
    pub provider: String,
    pub action: ProposedAction,
    pub title: String,
    pub description: String,
    pub potential_savings: f64,
    pub confidence_score: f64,
    pub implementation_complexity: Complexity,
    pub requires_downtime: bool,
    pub requires_data_migration: bool,
    pub rollback_complexity: Complexity,
    pub risk_factors: Vec<String>,
    pub detected_inefficiencies: Vec<InefficiencyKind>,
    pub priority_rank: usize,
    pub priority_level: PriorityLevel,
    pub final_rank: Option<usize>,
    pub risk: Option<RiskAssessment>,
    pub performance: Option<PerformancePrediction>,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn kind(&self) -> RecommendationKind {
        self.action.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn score(&self) -> f64 {
        match self {
            ConfidenceLevel::Low => 0.4,
            ConfidenceLevel::Medium => 0.7,
            ConfidenceLevel::High => 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadType {
    Production,
    Development,
    Testing,
    BatchProcessing,
    RealTime,
    UserFacing,
    ComputeIntensive,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactDirection {
    Positive,
    Negative,
    Neutral,
}

/// How the predicted impact was assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactBreakdown {
    pub base_impact: f64,
    pub risk_adjustments: f64,
    pub final_impact: f64,
    pub impact_percentage: f64,
    pub impact_direction: ImpactDirection,
}

/// Estimated performance effect of applying a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePrediction {
    pub recommendation_id: String,
    pub predicted_performance_impact: f64,
    pub confidence_level: ConfidenceLevel,
    pub confidence_score: f64,
    pub workload_type: WorkloadType,
    pub impact_breakdown: ImpactBreakdown,
    pub recommendations: Vec<String>,
    pub monitoring_suggestions: Vec<String>,
    pub rollback_triggers: Vec<String>,
    pub predicted_at: DateTime<Utc>,
}

/// Unusual cost behaviour of one resource relative to the rest of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAnomaly {
    pub resource_id: String,
    pub anomaly_type: String,
    pub severity: Severity,
    pub z_score: f64,
    pub description: String,
}
