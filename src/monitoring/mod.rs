//! Monitoring module for sqltune
//!
//! Provides:
//! - Structured logging with tracing
//! - Prometheus metrics collection
//! - The /monitoring/metrics endpoint

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod tracing_config;

pub use config::{LogFormat, MonitoringConfig};
pub use metrics::export_prometheus;
pub use tracing_config::init_tracing;
