//! Eligibility classification and workflow routing for rental prequalification.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
