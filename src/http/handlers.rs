use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::app::notifications::NotificationService;
use crate::app::registrations::{NewRegistration, RegistrationError, RegistrationService};
use crate::domain::device::{NotificationResult, ANONYMOUS_USER, DEFAULT_PLATFORM};
use crate::http::AppError;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// First non-empty string among the aliases, in order. Lets clients send
/// either snake_case or camelCase field names.
fn aliased_string(body: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|name| {
        body.get(*name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

fn string_or(body: &Value, name: &str, default: &str) -> String {
    body.get(name)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub device_id: String,
    pub endpoint_arn: String,
}

pub async fn register_device(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AppError> {
    let Json(body) = body.map_err(|_| AppError::bad_request("invalid JSON payload"))?;

    let Some(device_token) = aliased_string(&body, &["device_token", "deviceToken"]) else {
        return Err(AppError::bad_request("device_token is required"));
    };
    let user_id = aliased_string(&body, &["user_id", "userId"])
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let device_id = aliased_string(&body, &["device_id", "deviceId"])
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let bundle_id = aliased_string(&body, &["bundle_id", "bundleId"]);
    let platform = string_or(&body, "platform", DEFAULT_PLATFORM);
    let timestamp = body
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string);

    tracing::info!(%device_id, %user_id, "registering device");

    let service = RegistrationService::new(state.push.clone(), state.registry.clone());
    let record = service
        .register(NewRegistration {
            device_token,
            user_id,
            device_id,
            bundle_id,
            platform,
            timestamp,
        })
        .await
        .map_err(|err| match err {
            RegistrationError::Endpoint(source) => {
                tracing::error!(error = %source, "failed to create platform endpoint");
                AppError::internal("could not register device with the push provider")
            }
            RegistrationError::Store(source) => {
                tracing::error!(error = %source, "failed to store device registration");
                AppError::internal("could not save device registration")
            }
        })?;

    Ok(Json(RegisterResponse {
        message: "Device registered successfully",
        device_id: record.device_id,
        endpoint_arn: record.endpoint_arn,
    }))
}

#[derive(Serialize)]
pub struct NotifyResponse {
    pub message: &'static str,
    pub total_devices: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<NotificationResult>,
}

pub async fn send_notification(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<NotifyResponse>, AppError> {
    let Json(body) = body.map_err(|_| AppError::bad_request("invalid JSON payload"))?;

    let message = string_or(&body, "message", "Hello from Pulse!");
    let title = string_or(&body, "title", "Pulse Notification");
    let device_token = aliased_string(&body, &["device_token", "deviceToken"]);
    let device_id = aliased_string(&body, &["device_id", "deviceId"]);
    let user_id = aliased_string(&body, &["user_id", "userId"]);

    tracing::info!(%title, "sending notification");

    let service = NotificationService::new(state.push.clone(), state.registry.clone());
    let targets = service
        .resolve_targets(device_token, device_id.as_deref(), user_id.as_deref())
        .await;

    if targets.is_empty() {
        return Err(AppError::not_found(
            "no registered devices found for the specified criteria",
        ));
    }

    let results = service.send(&targets, &title, &message).await;
    let successful = results.iter().filter(|result| result.success).count();
    let failed = results.len() - successful;

    Ok(Json(NotifyResponse {
        message: "Notifications sent",
        total_devices: targets.len(),
        successful,
        failed,
        results,
    }))
}
