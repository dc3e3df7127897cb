//! Fleet API Service
//!
//! Fleet management backend:
//! - Vehicle, driver, and inspection CRUD
//! - Role-based JWT authentication
//! - Per-caller token-bucket rate limiting

#![allow(dead_code)]

use fleetops_core::{
    FleetopsError, FleetopsService, HealthStatus, ReadinessStatus, Result, ServiceRuntime,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod drivers;
mod error;
mod inspections;
mod middleware;
mod security;
mod types;
mod vehicles;

#[cfg(test)]
mod tests;

pub use drivers::DriverService;
pub use inspections::InspectionService;
pub use vehicles::VehicleService;

use middleware::AuthMiddleware;
use security::{RateLimitService, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    info!("Starting Fleet API");

    let service = Arc::new(FleetApiService::new()?);
    ServiceRuntime::run(service).await
}

#[derive(Debug, Clone)]
pub struct FleetApiConfig {
    pub http_bind: String,
    pub jwt_secret: String,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_secs: u64,
}

impl FleetApiConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            rate_limit_capacity: std::env::var("RATE_LIMIT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            rate_limit_refill_secs: std::env::var("RATE_LIMIT_REFILL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        })
    }
}

pub struct FleetApiService {
    config: FleetApiConfig,
    vehicles: VehicleService,
    drivers: DriverService,
    inspections: InspectionService,
    auth: Arc<AuthMiddleware>,
    limiter: Arc<RateLimitService>,
    start_time: std::time::Instant,
}

impl FleetApiService {
    pub fn new() -> Result<Self> {
        let config = FleetApiConfig::from_env()?;

        let vehicles = VehicleService::new();
        let drivers = DriverService::new();
        let inspections = InspectionService::new(vehicles.clone());
        let auth = Arc::new(AuthMiddleware::new(&config.jwt_secret));

        // An invalid limiter configuration must keep the service from
        // starting at all.
        let limiter = RateLimitService::new(
            Arc::new(SystemClock),
            config.rate_limit_capacity,
            Duration::from_secs(config.rate_limit_refill_secs),
        )
        .map_err(|e| FleetopsError::Config(e.to_string()))?;

        Ok(Self {
            config,
            vehicles,
            drivers,
            inspections,
            auth,
            limiter: Arc::new(limiter),
            start_time: std::time::Instant::now(),
        })
    }
}

#[async_trait::async_trait]
impl FleetopsService for FleetApiService {
    fn service_id(&self) -> &'static str {
        "fleet-api"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        ReadinessStatus {
            ready: true,
            dependencies: vec![],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Fleet API");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(bind = %self.config.http_bind, "Starting Fleet API server");

        let state = api::rest::AppState {
            vehicles: self.vehicles.clone(),
            drivers: self.drivers.clone(),
            inspections: self.inspections.clone(),
        };
        let app = api::rest::create_router(state, self.auth.clone(), self.limiter.clone());

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
