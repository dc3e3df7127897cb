//! Vehicle Service
//!
//! Vehicle CRUD with license plate normalization and conflict detection.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{CreateVehicleRequest, UpdateVehicleRequest, Vehicle};

#[derive(Clone)]
pub struct VehicleService {
    vehicles: Arc<DashMap<Uuid, Vehicle>>,
    // License plate uniqueness index, normalized plate -> vehicle id.
    plates: Arc<DashMap<String, Uuid>>,
}

impl VehicleService {
    pub fn new() -> Self {
        Self {
            vehicles: Arc::new(DashMap::new()),
            plates: Arc::new(DashMap::new()),
        }
    }

    /// Create a new vehicle
    pub async fn create(&self, req: CreateVehicleRequest) -> Result<Vehicle> {
        let plate = normalize_plate(&req.license_plate);
        if plate.is_empty() {
            return Err(Error::Validation(
                "License plate must not be empty".to_string(),
            ));
        }
        if self.plates.contains_key(&plate) {
            return Err(Error::DuplicateLicensePlate(plate));
        }

        let now = Utc::now();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            license_plate: plate.clone(),
            make: req.make.trim().to_string(),
            model: req.model.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        self.vehicles.insert(vehicle.id, vehicle.clone());
        self.plates.insert(plate, vehicle.id);

        Ok(vehicle)
    }

    /// Get vehicle by ID
    pub async fn get(&self, id: Uuid) -> Result<Vehicle> {
        self.vehicles
            .get(&id)
            .map(|v| v.clone())
            .ok_or(Error::VehicleNotFound(id))
    }

    /// Whether a vehicle exists
    pub async fn exists(&self, id: Uuid) -> bool {
        self.vehicles.contains_key(&id)
    }

    /// List all vehicles
    pub async fn list(&self) -> Vec<Vehicle> {
        self.vehicles.iter().map(|v| v.value().clone()).collect()
    }

    /// Apply a partial update. Only provided fields are changed.
    pub async fn update(&self, id: Uuid, patch: UpdateVehicleRequest) -> Result<Vehicle> {
        if !patch.has_updates() {
            return Err(Error::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or(Error::VehicleNotFound(id))?;

        if let Some(plate) = patch.license_plate {
            let plate = normalize_plate(&plate);
            if plate.is_empty() {
                return Err(Error::Validation(
                    "License plate must not be empty".to_string(),
                ));
            }
            if let Some(owner) = self.plates.get(&plate) {
                if *owner != id {
                    return Err(Error::DuplicateLicensePlate(plate));
                }
            }
            self.plates.remove(&vehicle.license_plate);
            self.plates.insert(plate.clone(), id);
            vehicle.license_plate = plate;
        }
        if let Some(make) = patch.make {
            vehicle.make = make.trim().to_string();
        }
        if let Some(model) = patch.model {
            vehicle.model = model.trim().to_string();
        }
        vehicle.updated_at = Utc::now();

        Ok(vehicle.clone())
    }

    /// Delete a vehicle by ID
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let (_, vehicle) = self
            .vehicles
            .remove(&id)
            .ok_or(Error::VehicleNotFound(id))?;
        self.plates.remove(&vehicle.license_plate);
        Ok(())
    }
}

impl Default for VehicleService {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize license plate by trimming and uppercasing.
fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}
