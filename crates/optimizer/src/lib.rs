//! Cost optimizer service
//!
//! Runs the optimization pipeline on a schedule against a JSON inventory and
//! serves health and metrics endpoints.

pub mod api;
pub mod config;
