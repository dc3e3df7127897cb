//! Unit and end-to-end tests for the Fleet API

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Error;
use crate::types::*;
use crate::{DriverService, InspectionService, VehicleService};

fn vehicle_request(plate: &str) -> CreateVehicleRequest {
    CreateVehicleRequest {
        license_plate: plate.to_string(),
        make: "Toyota".to_string(),
        model: "Hilux".to_string(),
    }
}

fn inspection_request(vehicle_id: Uuid, status: &str) -> CreateInspectionRequest {
    CreateInspectionRequest {
        vehicle_id,
        inspection_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        status: status.to_string(),
    }
}

mod vehicles {
    use super::*;

    #[tokio::test]
    async fn create_normalizes_license_plate() {
        let service = VehicleService::new();

        let vehicle = service.create(vehicle_request("  abc-123 ")).await.unwrap();

        assert_eq!(vehicle.license_plate, "ABC-123");
    }

    #[tokio::test]
    async fn create_rejects_blank_license_plate() {
        let service = VehicleService::new();

        let result = service.create(vehicle_request("   ")).await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_license_plate() {
        let service = VehicleService::new();
        service.create(vehicle_request("ABC-123")).await.unwrap();

        let result = service.create(vehicle_request("abc-123")).await;

        assert!(matches!(result, Err(Error::DuplicateLicensePlate(_))));
    }

    #[tokio::test]
    async fn update_applies_only_provided_fields() {
        let service = VehicleService::new();
        let vehicle = service.create(vehicle_request("ABC-123")).await.unwrap();

        let updated = service
            .update(
                vehicle.id,
                UpdateVehicleRequest {
                    model: Some("Land Cruiser".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.model, "Land Cruiser");
        assert_eq!(updated.make, "Toyota");
        assert_eq!(updated.license_plate, "ABC-123");
    }

    #[tokio::test]
    async fn update_rejects_plate_taken_by_another_vehicle() {
        let service = VehicleService::new();
        service.create(vehicle_request("AAA-111")).await.unwrap();
        let second = service.create(vehicle_request("BBB-222")).await.unwrap();

        let result = service
            .update(
                second.id,
                UpdateVehicleRequest {
                    license_plate: Some("aaa-111".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(Error::DuplicateLicensePlate(_))));
    }

    #[tokio::test]
    async fn update_allows_reasserting_own_plate() {
        let service = VehicleService::new();
        let vehicle = service.create(vehicle_request("AAA-111")).await.unwrap();

        let updated = service
            .update(
                vehicle.id,
                UpdateVehicleRequest {
                    license_plate: Some("aaa-111".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.license_plate, "AAA-111");
    }

    #[tokio::test]
    async fn update_rejects_empty_patch() {
        let service = VehicleService::new();
        let vehicle = service.create(vehicle_request("ABC-123")).await.unwrap();

        let result = service
            .update(vehicle.id, UpdateVehicleRequest::default())
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn delete_frees_the_license_plate() {
        let service = VehicleService::new();
        let vehicle = service.create(vehicle_request("ABC-123")).await.unwrap();

        service.delete(vehicle.id).await.unwrap();

        assert!(service.create(vehicle_request("ABC-123")).await.is_ok());
    }

    #[tokio::test]
    async fn missing_vehicle_maps_to_not_found() {
        let service = VehicleService::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            service.get(id).await,
            Err(Error::VehicleNotFound(_))
        ));
        assert!(matches!(
            service.delete(id).await,
            Err(Error::VehicleNotFound(_))
        ));
    }
}

mod drivers {
    use super::*;

    #[tokio::test]
    async fn create_and_update_driver() {
        let service = DriverService::new();

        let driver = service
            .create(CreateDriverRequest {
                name: " Ada Obi ".to_string(),
                license_number: "DL-9988".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(driver.name, "Ada Obi");

        let updated = service
            .update(
                driver.id,
                UpdateDriverRequest {
                    license_number: Some("DL-0001".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.license_number, "DL-0001");
        assert_eq!(updated.name, "Ada Obi");
    }

    #[tokio::test]
    async fn missing_driver_maps_to_not_found() {
        let service = DriverService::new();

        assert!(matches!(
            service.get(Uuid::new_v4()).await,
            Err(Error::DriverNotFound(_))
        ));
    }
}

mod inspections {
    use super::*;

    #[tokio::test]
    async fn create_normalizes_status() {
        let vehicles = VehicleService::new();
        let service = InspectionService::new(vehicles.clone());
        let vehicle = vehicles.create(vehicle_request("ABC-123")).await.unwrap();

        let inspection = service
            .create(inspection_request(vehicle.id, " passed "))
            .await
            .unwrap();

        assert_eq!(inspection.status, InspectionStatus::Passed);
    }

    #[tokio::test]
    async fn create_rejects_unknown_status() {
        let vehicles = VehicleService::new();
        let service = InspectionService::new(vehicles.clone());
        let vehicle = vehicles.create(vehicle_request("ABC-123")).await.unwrap();

        let result = service.create(inspection_request(vehicle.id, "GREAT")).await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn create_requires_existing_vehicle() {
        let service = InspectionService::new(VehicleService::new());

        let result = service
            .create(inspection_request(Uuid::new_v4(), "PASSED"))
            .await;

        assert!(matches!(result, Err(Error::VehicleNotFound(_))));
    }

    #[tokio::test]
    async fn lists_inspections_per_vehicle() {
        let vehicles = VehicleService::new();
        let service = InspectionService::new(vehicles.clone());
        let first = vehicles.create(vehicle_request("AAA-111")).await.unwrap();
        let second = vehicles.create(vehicle_request("BBB-222")).await.unwrap();

        service
            .create(inspection_request(first.id, "PASSED"))
            .await
            .unwrap();
        service
            .create(inspection_request(first.id, "FAILED"))
            .await
            .unwrap();
        service
            .create(inspection_request(second.id, "PENDING"))
            .await
            .unwrap();

        assert_eq!(service.list_for_vehicle(first.id).await.unwrap().len(), 2);
        assert_eq!(service.list_for_vehicle(second.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_changes_status() {
        let vehicles = VehicleService::new();
        let service = InspectionService::new(vehicles.clone());
        let vehicle = vehicles.create(vehicle_request("ABC-123")).await.unwrap();
        let inspection = service
            .create(inspection_request(vehicle.id, "PENDING"))
            .await
            .unwrap();

        let updated = service
            .update(
                inspection.id,
                UpdateInspectionRequest {
                    status: Some("failed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, InspectionStatus::Failed);
    }
}

mod http {
    use super::*;
    use crate::api::rest::{create_router, AppState};
    use crate::middleware::{AuthMiddleware, Claims};
    use crate::security::{RateLimitService, SystemClock};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    const SECRET: &str = "test-secret";

    async fn spawn_app(capacity: u32) -> SocketAddr {
        let vehicles = VehicleService::new();
        let state = AppState {
            vehicles: vehicles.clone(),
            drivers: DriverService::new(),
            inspections: InspectionService::new(vehicles),
        };
        let auth = Arc::new(AuthMiddleware::new(SECRET));
        let limiter = Arc::new(
            RateLimitService::new(Arc::new(SystemClock), capacity, Duration::from_secs(60))
                .unwrap(),
        );
        let app = create_router(state, auth, limiter);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        addr
    }

    fn token(sub: &str, roles: &[&str]) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn attaches_headers_and_rejects_past_capacity() {
        let addr = spawn_app(3).await;
        let client = reqwest::Client::new();
        let url = format!("http://{}/api/vehicles", addr);
        let bearer = token("alice", &["USER"]);

        for remaining in ["2", "1", "0"] {
            let res = client
                .get(&url)
                .bearer_auth(&bearer)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200);
            assert_eq!(
                res.headers()
                    .get("X-RateLimit-Limit")
                    .unwrap()
                    .to_str()
                    .unwrap(),
                "3"
            );
            assert_eq!(
                res.headers()
                    .get("X-RateLimit-Remaining")
                    .unwrap()
                    .to_str()
                    .unwrap(),
                remaining
            );
            assert!(res.headers().contains_key("X-RateLimit-Reset"));
        }

        let res = client
            .get(&url)
            .bearer_auth(&bearer)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 429);
        assert_eq!(
            res.headers()
                .get("X-RateLimit-Remaining")
                .unwrap()
                .to_str()
                .unwrap(),
            "0"
        );
        assert!(res.headers().contains_key("Retry-After"));

        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["status"], 429);
        assert_eq!(body["error"], "Too Many Requests");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("Rate limit exceeded"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn health_bypasses_rate_limiting() {
        let addr = spawn_app(1).await;
        let client = reqwest::Client::new();
        let bearer = token("alice", &["USER"]);

        // Exhaust alice's bucket.
        let url = format!("http://{}/api/vehicles", addr);
        client.get(&url).bearer_auth(&bearer).send().await.unwrap();
        let res = client.get(&url).bearer_auth(&bearer).send().await.unwrap();
        assert_eq!(res.status(), 429);

        // Health stays reachable and header-free however often it is hit.
        for _ in 0..5 {
            let res = client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200);
            assert!(!res.headers().contains_key("X-RateLimit-Limit"));
        }
    }

    #[tokio::test]
    async fn isolates_buckets_per_caller() {
        let addr = spawn_app(2).await;
        let client = reqwest::Client::new();
        let url = format!("http://{}/api/vehicles", addr);
        let alice = token("alice", &["USER"]);
        let bob = token("bob", &["USER"]);

        client.get(&url).bearer_auth(&alice).send().await.unwrap();
        client.get(&url).bearer_auth(&alice).send().await.unwrap();
        let res = client.get(&url).bearer_auth(&alice).send().await.unwrap();
        assert_eq!(res.status(), 429);

        let res = client.get(&url).bearer_auth(&bob).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers()
                .get("X-RateLimit-Remaining")
                .unwrap()
                .to_str()
                .unwrap(),
            "1"
        );
    }

    #[tokio::test]
    async fn keys_authenticated_caller_by_principal_not_forwarded_ip() {
        let addr = spawn_app(1).await;
        let client = reqwest::Client::new();
        let url = format!("http://{}/api/public/status", addr);
        let bearer = token("bob", &["USER"]);

        // Exhaust bob's bucket while a forwarded IP is also present.
        let res = client
            .get(&url)
            .bearer_auth(&bearer)
            .header("X-Forwarded-For", "9.9.9.9")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let res = client
            .get(&url)
            .bearer_auth(&bearer)
            .header("X-Forwarded-For", "9.9.9.9")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 429);

        // The forwarded IP's own bucket is untouched.
        let res = client
            .get(&url)
            .header("X-Forwarded-For", "9.9.9.9")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    #[tokio::test]
    async fn keys_unauthenticated_callers_by_forwarded_ip() {
        let addr = spawn_app(1).await;
        let client = reqwest::Client::new();
        let url = format!("http://{}/api/public/status", addr);

        let res = client
            .get(&url)
            .header("X-Forwarded-For", "203.0.113.1, 198.51.100.1")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        // Same client IP, different proxy chain tail: same bucket.
        let res = client
            .get(&url)
            .header("X-Forwarded-For", "203.0.113.1, 192.0.2.9")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 429);

        // A different client IP gets its own bucket.
        let res = client
            .get(&url)
            .header("X-Forwarded-For", "203.0.113.2")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    #[tokio::test]
    async fn enforces_authentication_and_roles() {
        let addr = spawn_app(10).await;
        let client = reqwest::Client::new();
        let url = format!("http://{}/api/vehicles", addr);

        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 401);

        let res = client
            .get(&url)
            .bearer_auth(token("carol", &["AUDITOR"]))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 403);

        let res = client
            .get(&url)
            .bearer_auth(token("carol", &["ADMIN"]))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    #[tokio::test]
    async fn crud_round_trip_over_http() {
        let addr = spawn_app(50).await;
        let client = reqwest::Client::new();
        let bearer = token("admin", &["ADMIN"]);

        let vehicle: serde_json::Value = client
            .post(format!("http://{}/api/vehicles", addr))
            .bearer_auth(&bearer)
            .json(&serde_json::json!({
                "license_plate": "xyz-789",
                "make": "Ford",
                "model": "Ranger"
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(vehicle["license_plate"], "XYZ-789");

        let vehicle_id = vehicle["id"].as_str().unwrap().to_string();

        let res = client
            .post(format!("http://{}/api/inspections", addr))
            .bearer_auth(&bearer)
            .json(&serde_json::json!({
                "vehicle_id": vehicle_id,
                "inspection_date": "2025-06-01",
                "status": "passed"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 201);
        let inspection: serde_json::Value = res.json().await.unwrap();
        assert_eq!(inspection["status"], "PASSED");

        let listed: serde_json::Value = client
            .get(format!(
                "http://{}/api/vehicles/{}/inspections",
                addr, vehicle_id
            ))
            .bearer_auth(&bearer)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let res = client
            .delete(format!("http://{}/api/vehicles/{}", addr, vehicle_id))
            .bearer_auth(&bearer)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 204);

        let res = client
            .get(format!("http://{}/api/vehicles/{}", addr, vehicle_id))
            .bearer_auth(&bearer)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 404);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Not Found");
    }
}
