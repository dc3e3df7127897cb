//! Domain types and request payloads for the Fleet API

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};

/// A vehicle in the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A driver in the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub license_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An inspection performed on a vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub inspection_date: NaiveDate,
    pub status: InspectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inspection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InspectionStatus {
    Passed,
    Failed,
    Pending,
}

impl InspectionStatus {
    /// Parse a client-supplied status string, case- and whitespace-insensitive.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "PASSED" => Ok(Self::Passed),
            "FAILED" => Ok(Self::Failed),
            "PENDING" => Ok(Self::Pending),
            other => Err(Error::Validation(format!(
                "Unknown inspection status: {}",
                other
            ))),
        }
    }
}

// Request payloads

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, message = "License plate must not be empty"))]
    pub license_plate: String,
    #[validate(length(min = 1, message = "Make must not be empty"))]
    pub make: String,
    #[validate(length(min = 1, message = "Model must not be empty"))]
    pub model: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateVehicleRequest {
    pub license_plate: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl UpdateVehicleRequest {
    /// At least one field must be present for a patch to be meaningful.
    pub fn has_updates(&self) -> bool {
        self.license_plate.is_some() || self.make.is_some() || self.model.is_some()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "License number must not be empty"))]
    pub license_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDriverRequest {
    pub name: Option<String>,
    pub license_number: Option<String>,
}

impl UpdateDriverRequest {
    pub fn has_updates(&self) -> bool {
        self.name.is_some() || self.license_number.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInspectionRequest {
    pub vehicle_id: Uuid,
    pub inspection_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInspectionRequest {
    pub inspection_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl UpdateInspectionRequest {
    pub fn has_updates(&self) -> bool {
        self.inspection_date.is_some() || self.status.is_some()
    }
}
