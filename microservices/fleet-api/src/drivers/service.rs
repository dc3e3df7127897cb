//! Driver Service
//!
//! Driver CRUD operations.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{CreateDriverRequest, Driver, UpdateDriverRequest};

#[derive(Clone)]
pub struct DriverService {
    drivers: Arc<DashMap<Uuid, Driver>>,
}

impl DriverService {
    pub fn new() -> Self {
        Self {
            drivers: Arc::new(DashMap::new()),
        }
    }

    /// Create a new driver
    pub async fn create(&self, req: CreateDriverRequest) -> Result<Driver> {
        let now = Utc::now();
        let driver = Driver {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            license_number: req.license_number.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        self.drivers.insert(driver.id, driver.clone());

        Ok(driver)
    }

    /// Get driver by ID
    pub async fn get(&self, id: Uuid) -> Result<Driver> {
        self.drivers
            .get(&id)
            .map(|d| d.clone())
            .ok_or(Error::DriverNotFound(id))
    }

    /// List all drivers
    pub async fn list(&self) -> Vec<Driver> {
        self.drivers.iter().map(|d| d.value().clone()).collect()
    }

    /// Apply a partial update. Only provided fields are changed.
    pub async fn update(&self, id: Uuid, patch: UpdateDriverRequest) -> Result<Driver> {
        if !patch.has_updates() {
            return Err(Error::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut driver = self.drivers.get_mut(&id).ok_or(Error::DriverNotFound(id))?;

        if let Some(name) = patch.name {
            driver.name = name.trim().to_string();
        }
        if let Some(license_number) = patch.license_number {
            driver.license_number = license_number.trim().to_string();
        }
        driver.updated_at = Utc::now();

        Ok(driver.clone())
    }

    /// Delete a driver by ID
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.drivers
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::DriverNotFound(id))
    }
}

impl Default for DriverService {
    fn default() -> Self {
        Self::new()
    }
}
