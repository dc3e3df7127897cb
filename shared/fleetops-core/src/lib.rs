//! FleetOps Core - Shared service infrastructure
//!
//! This crate provides:
//! - Standard service trait all FleetOps services implement
//! - Error taxonomy with HTTP status mappings
//! - Configuration management

pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::{FleetopsError, Result};
pub use service::{DependencyStatus, FleetopsService, HealthStatus, ReadinessStatus, ServiceRuntime};
