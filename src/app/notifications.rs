use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::app::utc_now_rfc3339;
use crate::domain::device::{NotificationResult, NotificationTarget};
use crate::infra::push::PushGateway;
use crate::infra::registry::DeviceStore;

pub struct NotificationService {
    push: Arc<dyn PushGateway>,
    registry: Arc<dyn DeviceStore>,
}

impl NotificationService {
    pub fn new(push: Arc<dyn PushGateway>, registry: Arc<dyn DeviceStore>) -> Self {
        Self { push, registry }
    }

    /// Resolution precedence: direct token, then device id, then user id,
    /// then every registered device. A registry failure resolves to an
    /// empty set; the caller reports "no targets" either way.
    pub async fn resolve_targets(
        &self,
        device_token: Option<String>,
        device_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Vec<NotificationTarget> {
        if let Some(device_token) = device_token {
            return vec![NotificationTarget::direct(device_token)];
        }

        if let Some(device_id) = device_id {
            return match self.registry.get_device(device_id).await {
                Ok(Some(device)) => vec![NotificationTarget::Registered(device)],
                Ok(None) => Vec::new(),
                Err(err) => {
                    warn!(%device_id, error = %err, "device lookup failed");
                    Vec::new()
                }
            };
        }

        if let Some(user_id) = user_id {
            return match self.registry.devices_for_user(user_id).await {
                Ok(devices) => devices
                    .into_iter()
                    .map(NotificationTarget::Registered)
                    .collect(),
                Err(err) => {
                    warn!(%user_id, error = %err, "user device query failed");
                    Vec::new()
                }
            };
        }

        // No criterion at all: every registered device. Test/debug use.
        match self.registry.all_devices().await {
            Ok(devices) => devices
                .into_iter()
                .map(NotificationTarget::Registered)
                .collect(),
            Err(err) => {
                warn!(error = %err, "device scan failed");
                Vec::new()
            }
        }
    }

    /// Publish to each target in turn; one failure never aborts the rest.
    pub async fn send(
        &self,
        targets: &[NotificationTarget],
        title: &str,
        message: &str,
    ) -> Vec<NotificationResult> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let result = match target {
                NotificationTarget::Registered(device) => {
                    self.publish_to_endpoint(
                        &device.endpoint_arn,
                        title,
                        message,
                        Some(&device.device_id),
                    )
                    .await
                }
                NotificationTarget::Direct {
                    device_token,
                    device_id,
                } => {
                    self.publish_to_token(device_token, device_id, title, message)
                        .await
                }
            };
            results.push(result);
        }
        results
    }

    async fn publish_to_endpoint(
        &self,
        endpoint_arn: &str,
        title: &str,
        message: &str,
        device_id: Option<&str>,
    ) -> NotificationResult {
        let payload = apns_payload(title, message);
        match self.push.publish(endpoint_arn, &payload).await {
            Ok(message_id) => {
                info!(
                    target = device_id.unwrap_or(endpoint_arn),
                    %message_id,
                    "notification published"
                );
                NotificationResult::delivered(
                    device_id.map(str::to_string),
                    endpoint_arn.to_string(),
                    message_id,
                )
            }
            Err(err) => {
                // Disabled or stale endpoints are reported per target but
                // never deactivated in the registry.
                warn!(
                    target = device_id.unwrap_or(endpoint_arn),
                    error = %err,
                    "publish failed"
                );
                NotificationResult::failed(
                    device_id.map(str::to_string),
                    Some(endpoint_arn.to_string()),
                    err.to_string(),
                )
            }
        }
    }

    /// Direct-token path: create a temporary endpoint, publish through
    /// it, then delete it. Cleanup failures are logged and swallowed.
    async fn publish_to_token(
        &self,
        device_token: &str,
        device_id: &str,
        title: &str,
        message: &str,
    ) -> NotificationResult {
        let endpoint_arn = match self.push.create_endpoint(device_token, device_id).await {
            Ok(endpoint_arn) => endpoint_arn,
            Err(err) => {
                warn!(%device_id, error = %err, "temporary endpoint creation failed");
                let mut result = NotificationResult::failed(
                    Some(device_id.to_string()),
                    None,
                    err.to_string(),
                );
                result.device_token = Some(device_token.to_string());
                return result;
            }
        };

        let result = self
            .publish_to_endpoint(&endpoint_arn, title, message, Some(device_id))
            .await;

        if let Err(err) = self.push.delete_endpoint(&endpoint_arn).await {
            debug!(%endpoint_arn, error = %err, "temporary endpoint cleanup failed");
        }

        result
    }
}

/// APNS payload wrapped in the per-platform envelope; published with the
/// "json" message structure so the provider routes format by platform.
fn apns_payload(title: &str, message: &str) -> String {
    let apns = json!({
        "aps": {
            "alert": {
                "title": title,
                "body": message,
            },
            "sound": "default",
            "badge": 1,
        },
        "custom_data": {
            "timestamp": utc_now_rfc3339(),
        },
    });

    json!({ "APNS": apns.to_string() }).to_string()
}
