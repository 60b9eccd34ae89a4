//! Risk scoring for candidate optimization actions
//!
//! Five independent factors are scored in [0, 1] from resource metadata and
//! the action descriptor, then combined with fixed weights. The aggregate
//! maps onto a discrete risk level that drives approval requirements and
//! mitigation advice.

use crate::models::{
    Complexity, Recommendation, RecommendationKind, Resource, RiskAssessment, RiskComponent,
    RiskFactor, RiskLevel,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Factor weights; they sum to 1 so the aggregate stays in [0, 1]
pub const RISK_WEIGHTS: [(RiskFactor, f64); 5] = [
    (RiskFactor::ResourceCriticality, 0.30),
    (RiskFactor::BusinessImpact, 0.30),
    (RiskFactor::RollbackComplexity, 0.20),
    (RiskFactor::DataSensitivity, 0.10),
    (RiskFactor::UptimeRequirements, 0.10),
];

const CRITICAL_RESOURCE_TYPES: &[&str] = &[
    "database",
    "load_balancer",
    "loadbalancer",
    "gateway",
    "cache",
    "queue",
];
const CRITICAL_NAME_INDICATORS: &[&str] = &["prod", "production", "critical", "main", "primary"];
const CRITICALITY_TAG_KEYS: &[&str] = &["environment", "tier", "importance"];
const CRITICALITY_TAG_VALUES: &[&str] = &["production", "prod", "critical", "high"];

const BUSINESS_UNIT_TAG_KEYS: &[&str] = &["business-unit", "department", "owner"];
const BUSINESS_UNIT_TAG_VALUES: &[&str] = &["finance", "sales", "customer-service", "operations"];
const HIGH_IMPACT_TAG_VALUES: &[&str] = &[
    "production",
    "critical",
    "revenue-generating",
    "customer-facing",
    "compliance-required",
];
const CUSTOMER_FACING_NAMES: &[&str] = &["web", "api", "app", "service", "customer"];
const COMPLIANCE_MARKERS: &[&str] = &["pci", "hipaa", "gdpr", "sox", "compliance"];

const SENSITIVE_DATA_MARKERS: &[&str] = &["pii", "phi", "sensitive", "confidential", "encrypted"];

/// Kind of change being assessed, keyed for rollback complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Rightsizing,
    InstanceTypeChange,
    ReservedCapacity,
    SpotConversion,
    StorageChange,
    Other,
}

impl ActionKind {
    /// Base rollback complexity and its explanation
    fn rollback_base(&self) -> (f64, &'static str) {
        match self {
            ActionKind::Rightsizing => (0.2, "Rightsizing - relatively simple rollback"),
            ActionKind::InstanceTypeChange => {
                (0.4, "Instance type change - may require migration")
            }
            ActionKind::ReservedCapacity => {
                (0.7, "Reserved capacity purchase - complex rollback")
            }
            ActionKind::SpotConversion => (0.6, "Spot conversion - potential service interruption"),
            ActionKind::StorageChange => (0.5, "Storage change - data migration complexity"),
            ActionKind::Other => (0.4, "Standard optimization complexity"),
        }
    }
}

impl From<RecommendationKind> for ActionKind {
    fn from(kind: RecommendationKind) -> Self {
        match kind {
            RecommendationKind::Rightsizing => ActionKind::Rightsizing,
            RecommendationKind::ReservedCapacity => ActionKind::ReservedCapacity,
            RecommendationKind::SpotInstance => ActionKind::SpotConversion,
            RecommendationKind::StorageOptimization => ActionKind::StorageChange,
            RecommendationKind::UnusedResource => ActionKind::Other,
        }
    }
}

/// The candidate action whose risk is assessed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub implementation_complexity: Complexity,
    pub requires_downtime: bool,
    pub requires_data_migration: bool,
}

impl ActionDescriptor {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            implementation_complexity: Complexity::Medium,
            requires_downtime: false,
            requires_data_migration: false,
        }
    }
}

impl From<&Recommendation> for ActionDescriptor {
    fn from(rec: &Recommendation) -> Self {
        Self {
            kind: rec.kind().into(),
            implementation_complexity: rec.implementation_complexity,
            requires_downtime: rec.requires_downtime,
            requires_data_migration: rec.requires_data_migration,
        }
    }
}

/// Scores business and technical risk of acting on a resource
#[derive(Debug, Clone, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, resource: &Resource, action: &ActionDescriptor) -> RiskAssessment {
        self.assess_at(resource, action, Utc::now())
    }

    pub fn assess_at(
        &self,
        resource: &Resource,
        action: &ActionDescriptor,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let components: Vec<RiskComponent> = RISK_WEIGHTS
            .iter()
            .map(|&(factor, weight)| {
                let (score, factors) = match factor {
                    RiskFactor::ResourceCriticality => resource_criticality(resource),
                    RiskFactor::BusinessImpact => business_impact(resource),
                    RiskFactor::RollbackComplexity => rollback_complexity(action),
                    RiskFactor::DataSensitivity => data_sensitivity(resource),
                    RiskFactor::UptimeRequirements => uptime_requirements(resource),
                };
                RiskComponent {
                    factor,
                    score: score.min(1.0),
                    weight,
                    factors,
                }
            })
            .collect();

        let overall_risk_score = aggregate(&components);
        let risk_level = RiskLevel::from_score(overall_risk_score);

        RiskAssessment {
            overall_risk_score,
            risk_level,
            mitigations: mitigations(risk_level, &components),
            requires_approval: matches!(risk_level, RiskLevel::High | RiskLevel::Critical),
            auto_approval_eligible: risk_level == RiskLevel::Low,
            components,
            assessed_at: now,
        }
    }
}

/// Weighted sum of component scores, clamped to [0, 1]
pub fn aggregate(components: &[RiskComponent]) -> f64 {
    components
        .iter()
        .map(|c| c.score.clamp(0.0, 1.0) * c.weight)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn resource_criticality(resource: &Resource) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut factors = Vec::new();

    if contains_any(&resource.type_lower(), CRITICAL_RESOURCE_TYPES) {
        score += 0.4;
        factors.push("Critical resource type".to_string());
    }

    if contains_any(&resource.name_lower(), CRITICAL_NAME_INDICATORS) {
        score += 0.3;
        factors.push("Critical naming pattern".to_string());
    }

    // First matching tag wins
    if let Some((key, value)) = resource.tags_lower().find(|(k, v)| {
        CRITICALITY_TAG_KEYS.contains(&k.as_str()) && CRITICALITY_TAG_VALUES.contains(&v.as_str())
    }) {
        score += 0.3;
        factors.push(format!("Critical tag: {}={}", key, value));
    }

    (score, factors)
}

fn business_impact(resource: &Resource) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut factors = Vec::new();

    for (key, value) in resource.tags_lower() {
        if BUSINESS_UNIT_TAG_KEYS.contains(&key.as_str())
            && BUSINESS_UNIT_TAG_VALUES.contains(&value.as_str())
        {
            score += 0.3;
            factors.push(format!("Business-critical tag: {}={}", key, value));
        }
        if HIGH_IMPACT_TAG_VALUES.contains(&value.as_str()) {
            score += 0.4;
            factors.push(format!("High impact tag: {}", value));
        }
    }

    if contains_any(&resource.name_lower(), CUSTOMER_FACING_NAMES) {
        score += 0.2;
        factors.push("Customer-facing resource".to_string());
    }

    for (_, value) in resource.tags_lower() {
        if contains_any(&value, COMPLIANCE_MARKERS) {
            score += 0.3;
            factors.push(format!("Compliance requirement: {}", value));
        }
    }

    (score, factors)
}

fn rollback_complexity(action: &ActionDescriptor) -> (f64, Vec<String>) {
    let (mut score, reason) = action.kind.rollback_base();
    let mut factors = vec![reason.to_string()];

    if action.requires_data_migration {
        score += 0.3;
        factors.push("Requires data migration".to_string());
    }

    (score, factors)
}

fn data_sensitivity(resource: &Resource) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut factors = Vec::new();

    if let Some((_, value)) = resource
        .tags_lower()
        .find(|(_, v)| contains_any(v, SENSITIVE_DATA_MARKERS))
    {
        score += 0.6;
        factors.push(format!("Sensitive data: {}", value));
    }

    let resource_type = resource.type_lower();
    if resource_type.contains("database") || resource_type.contains("db") {
        score += 0.4;
        factors.push("Database resource - potential sensitive data".to_string());
    }
    if resource_type.contains("storage") || resource_type.contains("backup") {
        score += 0.3;
        factors.push("Storage resource - potential sensitive data".to_string());
    }

    (score, factors)
}

fn uptime_requirements(resource: &Resource) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut factors = Vec::new();

    for (key, value) in resource.tags_lower() {
        if !key.contains("sla") {
            continue;
        }
        if value.contains("99.9") || value.contains("high") {
            score += 0.5;
            factors.push(format!("High SLA requirement: {}", value));
        } else if value.contains("99") {
            score += 0.3;
            factors.push(format!("Standard SLA requirement: {}", value));
        }
    }

    let name = resource.name_lower();
    let ha_token = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == "ha");
    if ha_token || name.contains("multi-az") || name.contains("high-availability") {
        score += 0.4;
        factors.push("High availability requirement indicated".to_string());
    }

    if name.contains("prod") {
        score += 0.3;
        factors.push("Production environment - high uptime expected".to_string());
    }

    (score, factors)
}

fn mitigations(level: RiskLevel, components: &[RiskComponent]) -> Vec<String> {
    let tier: &[&str] = match level {
        RiskLevel::Critical => &[
            "Requires senior management approval",
            "Schedule during low-traffic maintenance window",
            "Prepare detailed rollback plan with testing",
            "Monitor closely for 72 hours post-optimization",
            "Have on-call team ready for immediate rollback",
        ],
        RiskLevel::High => &[
            "Requires technical lead approval",
            "Schedule during business hours for monitoring",
            "Test rollback procedure before execution",
            "Monitor for 24 hours post-optimization",
            "Document all changes and monitoring results",
        ],
        RiskLevel::Medium => &[
            "Requires peer review and approval",
            "Monitor for 12 hours post-optimization",
            "Document changes and results",
            "Consider gradual rollout if possible",
        ],
        RiskLevel::Low => &[
            "Can be auto-approved",
            "Monitor for 4 hours post-optimization",
            "Log changes for audit trail",
        ],
    };

    let mut out: Vec<String> = tier.iter().map(|s| s.to_string()).collect();
    for component in components.iter().filter(|c| c.score > 0.5) {
        let advisory = match component.factor {
            RiskFactor::ResourceCriticality => {
                "Consider alternative optimization strategies for critical resources"
            }
            RiskFactor::BusinessImpact => "Engage business stakeholders for impact assessment",
            RiskFactor::RollbackComplexity => "Ensure backup and restore procedures are tested",
            RiskFactor::DataSensitivity => "Verify encryption and data handling before the change",
            RiskFactor::UptimeRequirements => {
                "Coordinate the change with the on-call rotation to protect availability"
            }
        };
        out.push(advisory.to_string());
    }
    out
}
