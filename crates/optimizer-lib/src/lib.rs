//! Cost optimization library for cloud resources
//!
//! This crate provides the core functionality for:
//! - Feature extraction from daily cost records
//! - Usage pattern analysis and cost anomaly detection
//! - Risk scoring of candidate optimization actions
//! - Heuristic recommendation generation and ranking
//! - Performance impact prediction
//! - Pipeline orchestration, validation and scheduling
//! - Health checks and observability

pub mod analysis;
pub mod error;
pub mod features;
pub mod health;
pub mod models;
pub mod observability;
pub mod performance;
pub mod pipeline;
pub mod recommend;
pub mod risk;
pub mod source;

pub use error::{PipelineError, PipelineResult, SourceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineConfig, PipelineReport, PipelineScheduler, RunStatus,
};
pub use source::{
    DataSource, DateRange, InMemorySource, Inventory, JsonFileSink, JsonFileSource, MemorySink,
    RecommendationSink,
};
