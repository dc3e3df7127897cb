//! Inspection Service
//!
//! Inspection CRUD operations. Every inspection belongs to an existing
//! vehicle; status values are normalized on the way in.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{
    CreateInspectionRequest, Inspection, InspectionStatus, UpdateInspectionRequest,
};
use crate::vehicles::VehicleService;

#[derive(Clone)]
pub struct InspectionService {
    inspections: Arc<DashMap<Uuid, Inspection>>,
    vehicles: VehicleService,
}

impl InspectionService {
    pub fn new(vehicles: VehicleService) -> Self {
        Self {
            inspections: Arc::new(DashMap::new()),
            vehicles,
        }
    }

    /// Create a new inspection for an existing vehicle
    pub async fn create(&self, req: CreateInspectionRequest) -> Result<Inspection> {
        if !self.vehicles.exists(req.vehicle_id).await {
            return Err(Error::VehicleNotFound(req.vehicle_id));
        }
        let status = InspectionStatus::parse(&req.status)?;

        let now = Utc::now();
        let inspection = Inspection {
            id: Uuid::new_v4(),
            vehicle_id: req.vehicle_id,
            inspection_date: req.inspection_date,
            status,
            created_at: now,
            updated_at: now,
        };

        self.inspections.insert(inspection.id, inspection.clone());

        Ok(inspection)
    }

    /// Get inspection by ID
    pub async fn get(&self, id: Uuid) -> Result<Inspection> {
        self.inspections
            .get(&id)
            .map(|i| i.clone())
            .ok_or(Error::InspectionNotFound(id))
    }

    /// List all inspections
    pub async fn list(&self) -> Vec<Inspection> {
        self.inspections.iter().map(|i| i.value().clone()).collect()
    }

    /// List inspections for one vehicle
    pub async fn list_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<Inspection>> {
        if !self.vehicles.exists(vehicle_id).await {
            return Err(Error::VehicleNotFound(vehicle_id));
        }
        Ok(self
            .inspections
            .iter()
            .filter(|i| i.value().vehicle_id == vehicle_id)
            .map(|i| i.value().clone())
            .collect())
    }

    /// Apply a partial update. Only provided fields are changed.
    pub async fn update(&self, id: Uuid, patch: UpdateInspectionRequest) -> Result<Inspection> {
        if !patch.has_updates() {
            return Err(Error::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let status = match &patch.status {
            Some(value) => Some(InspectionStatus::parse(value)?),
            None => None,
        };

        let mut inspection = self
            .inspections
            .get_mut(&id)
            .ok_or(Error::InspectionNotFound(id))?;

        if let Some(date) = patch.inspection_date {
            inspection.inspection_date = date;
        }
        if let Some(status) = status {
            inspection.status = status;
        }
        inspection.updated_at = Utc::now();

        Ok(inspection.clone())
    }

    /// Delete an inspection by ID
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.inspections
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::InspectionNotFound(id))
    }
}
