//! Fleet API REST surface

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::middleware::{authenticate, AuthMiddleware};
use crate::security::{rate_limit, RateLimitService};
use crate::types::{
    CreateDriverRequest, CreateInspectionRequest, CreateVehicleRequest, Driver, Inspection,
    UpdateDriverRequest, UpdateInspectionRequest, UpdateVehicleRequest, Vehicle,
};
use crate::{DriverService, InspectionService, VehicleService};

#[derive(Clone)]
pub struct AppState {
    pub vehicles: VehicleService,
    pub drivers: DriverService,
    pub inspections: InspectionService,
}

pub fn create_router(
    state: AppState,
    auth: Arc<AuthMiddleware>,
    limiter: Arc<RateLimitService>,
) -> Router {
    Router::new()
        // Health
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Public
        .route("/api/public/status", get(public_status))
        // Vehicles
        .route("/api/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/api/vehicles/{id}",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
        .route("/api/vehicles/{id}/inspections", get(list_vehicle_inspections))
        // Drivers
        .route("/api/drivers", get(list_drivers).post(create_driver))
        .route(
            "/api/drivers/{id}",
            get(get_driver).patch(update_driver).delete(delete_driver),
        )
        // Inspections
        .route("/api/inspections", get(list_inspections).post(create_inspection))
        .route(
            "/api/inspections/{id}",
            get(get_inspection)
                .patch(update_inspection)
                .delete(delete_inspection),
        )
        // Request pipeline: authentication resolves the caller first, the
        // rate limit filter keys on it second.
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(middleware::from_fn_with_state(auth, authenticate))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

async fn public_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "up" }))
}

// Vehicle endpoints

async fn list_vehicles(State(state): State<AppState>) -> Json<Vec<Vehicle>> {
    Json(state.vehicles.list().await)
}

async fn create_vehicle(
    State(state): State<AppState>,
    Json(req): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>)> {
    req.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;
    let vehicle = state.vehicles.create(req).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>> {
    Ok(Json(state.vehicles.get(id).await?))
}

async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>> {
    Ok(Json(state.vehicles.update(id, req).await?))
}

async fn delete_vehicle(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.vehicles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_vehicle_inspections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Inspection>>> {
    Ok(Json(state.inspections.list_for_vehicle(id).await?))
}

// Driver endpoints

async fn list_drivers(State(state): State<AppState>) -> Json<Vec<Driver>> {
    Json(state.drivers.list().await)
}

async fn create_driver(
    State(state): State<AppState>,
    Json(req): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<Driver>)> {
    req.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;
    let driver = state.drivers.create(req).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

async fn get_driver(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Driver>> {
    Ok(Json(state.drivers.get(id).await?))
}

async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDriverRequest>,
) -> Result<Json<Driver>> {
    Ok(Json(state.drivers.update(id, req).await?))
}

async fn delete_driver(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.drivers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Inspection endpoints

async fn list_inspections(State(state): State<AppState>) -> Json<Vec<Inspection>> {
    Json(state.inspections.list().await)
}

async fn create_inspection(
    State(state): State<AppState>,
    Json(req): Json<CreateInspectionRequest>,
) -> Result<(StatusCode, Json<Inspection>)> {
    let inspection = state.inspections.create(req).await?;
    Ok((StatusCode::CREATED, Json(inspection)))
}

async fn get_inspection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Inspection>> {
    Ok(Json(state.inspections.get(id).await?))
}

async fn update_inspection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInspectionRequest>,
) -> Result<Json<Inspection>> {
    Ok(Json(state.inspections.update(id, req).await?))
}

async fn delete_inspection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.inspections.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
