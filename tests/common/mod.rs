#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use pulse::domain::device::DeviceRegistration;
use pulse::infra::push::{PushError, PushGateway};
use pulse::infra::registry::{DeviceStore, RegistryError};
use pulse::AppState;

// ---------------------------------------------------------------------------
// TestApp — router wired to in-memory provider/registry doubles
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub push: Arc<FakePush>,
    pub registry: Arc<FakeRegistry>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

impl TestApp {
    /// App with a configured platform application.
    pub fn new() -> Self {
        Self::with_push(FakePush::configured())
    }

    /// App with no platform application (placeholder-endpoint mode).
    pub fn unconfigured() -> Self {
        Self::with_push(FakePush::unconfigured())
    }

    fn with_push(push: FakePush) -> Self {
        let push = Arc::new(push);
        let registry = Arc::new(FakeRegistry::default());
        let state = AppState {
            push: push.clone(),
            registry: registry.clone(),
        };
        let router = pulse::http::router(state);
        TestApp {
            router,
            push,
            registry,
        }
    }

    pub async fn post_json(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, serde_json::to_string(&body).unwrap())
            .await
    }

    pub async fn post_raw(&self, path: &str, body: String) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("host", "localhost")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header("host", "localhost")
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    /// Insert a registration directly, bypassing the register endpoint.
    pub fn seed_device(&self, device_id: &str, user_id: &str, endpoint_arn: &str) -> DeviceRegistration {
        let device = DeviceRegistration {
            device_id: device_id.to_string(),
            user_id: user_id.to_string(),
            device_token: format!("token-{}", device_id),
            endpoint_arn: endpoint_arn.to_string(),
            bundle_id: "com.pulse.app".to_string(),
            platform: "ios".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            last_updated: "2026-01-01T00:00:00Z".to_string(),
            active: true,
        };
        self.registry
            .devices
            .lock()
            .unwrap()
            .insert(device_id.to_string(), device.clone());
        device
    }
}

// ---------------------------------------------------------------------------
// FakePush — PushGateway double
// ---------------------------------------------------------------------------
//
// Publishing to an ARN containing "dummy-endpoint" fails with
// InvalidParameter (a placeholder ARN is not a real endpoint) and to one
// containing "disabled" with EndpointDisabled, so tests can stage
// per-target failures through realistic ARNs. Creating an endpoint for a
// token containing "duplicate" fails the way SNS rejects a token already
// bound to another endpoint.

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub endpoint_arn: String,
    pub payload: String,
}

pub struct FakePush {
    configured: bool,
    fail_deletes: AtomicBool,
    pub created: Mutex<Vec<String>>,
    pub published: Mutex<Vec<PublishedMessage>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakePush {
    pub fn configured() -> Self {
        Self::build(true)
    }

    pub fn unconfigured() -> Self {
        Self::build(false)
    }

    fn build(configured: bool) -> Self {
        Self {
            configured,
            fail_deletes: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn created_tokens(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn deleted_endpoints(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for FakePush {
    async fn create_endpoint(
        &self,
        device_token: &str,
        _custom_user_data: &str,
    ) -> Result<String, PushError> {
        if !self.configured {
            return Err(PushError::NotConfigured);
        }
        if device_token.contains("duplicate") {
            return Err(PushError::InvalidParameter(
                "Invalid parameter: Token Reason: Endpoint already exists with the same Token"
                    .to_string(),
            ));
        }
        self.created.lock().unwrap().push(device_token.to_string());
        Ok(format!(
            "arn:aws:sns:us-east-1:000000000000:endpoint/APNS/pulse/{}",
            Uuid::new_v4()
        ))
    }

    async fn publish(&self, endpoint_arn: &str, payload: &str) -> Result<String, PushError> {
        if endpoint_arn.contains("dummy-endpoint") {
            return Err(PushError::InvalidParameter(
                "No endpoint found for the target arn specified".to_string(),
            ));
        }
        if endpoint_arn.contains("disabled") {
            return Err(PushError::EndpointDisabled(
                "Endpoint is disabled".to_string(),
            ));
        }
        self.published.lock().unwrap().push(PublishedMessage {
            endpoint_arn: endpoint_arn.to_string(),
            payload: payload.to_string(),
        });
        Ok(Uuid::new_v4().to_string())
    }

    async fn delete_endpoint(&self, endpoint_arn: &str) -> Result<(), PushError> {
        self.deleted.lock().unwrap().push(endpoint_arn.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PushError::Service(
                "InternalError: delete failed".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeRegistry — DeviceStore double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRegistry {
    pub devices: Mutex<HashMap<String, DeviceRegistration>>,
    pub reads: AtomicUsize,
    fail: AtomicBool,
}

impl FakeRegistry {
    /// Make every subsequent operation fail, as an unreachable registry
    /// would.
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn device(&self, device_id: &str) -> Option<DeviceRegistration> {
        self.devices.lock().unwrap().get(device_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.lock().unwrap().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RegistryError::Service(
                "InternalServerError: registry unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for FakeRegistry {
    async fn get_device(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceRegistration>, RegistryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.devices.lock().unwrap().get(device_id).cloned())
    }

    async fn devices_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<DeviceRegistration>, RegistryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let devices = self.devices.lock().unwrap();
        let mut matched: Vec<DeviceRegistration> = devices
            .values()
            .filter(|device| device.user_id == user_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(matched)
    }

    async fn all_devices(&self) -> Result<Vec<DeviceRegistration>, RegistryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let devices = self.devices.lock().unwrap();
        let mut all: Vec<DeviceRegistration> = devices.values().cloned().collect();
        all.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(all)
    }

    async fn put_device(&self, device: &DeviceRegistration) -> Result<(), RegistryError> {
        self.check()?;
        self.devices
            .lock()
            .unwrap()
            .insert(device.device_id.clone(), device.clone());
        Ok(())
    }
}
