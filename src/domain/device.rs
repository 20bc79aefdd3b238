use serde::{Deserialize, Serialize};

pub const ANONYMOUS_USER: &str = "anonymous";
pub const UNKNOWN_BUNDLE: &str = "unknown";
pub const DEFAULT_PLATFORM: &str = "ios";

/// Identifier recorded for targets built straight from a caller-supplied
/// token, with no registry record behind them.
pub const DIRECT_TOKEN_DEVICE_ID: &str = "direct-token";

/// A registered device. One record per `device_id`; re-registration
/// replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub device_id: String,
    pub user_id: String,
    pub device_token: String,
    pub endpoint_arn: String,
    pub bundle_id: String,
    pub platform: String,
    pub created_at: String,
    pub last_updated: String,
    pub active: bool,
}

/// A resolved publish target. Never persisted.
#[derive(Debug, Clone)]
pub enum NotificationTarget {
    /// A registry record carrying a provider endpoint.
    Registered(DeviceRegistration),
    /// A raw token supplied directly by the caller; published through a
    /// temporary endpoint.
    Direct { device_token: String, device_id: String },
}

impl NotificationTarget {
    pub fn direct(device_token: String) -> Self {
        Self::Direct {
            device_token,
            device_id: DIRECT_TOKEN_DEVICE_ID.to_string(),
        }
    }
}

/// Per-target publish outcome, aggregated into the handler response.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(device_id: Option<String>, endpoint_arn: String, message_id: String) -> Self {
        Self {
            success: true,
            device_id,
            endpoint_arn: Some(endpoint_arn),
            device_token: None,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(
        device_id: Option<String>,
        endpoint_arn: Option<String>,
        error: String,
    ) -> Self {
        Self {
            success: false,
            device_id,
            endpoint_arn,
            device_token: None,
            message_id: None,
            error: Some(error),
        }
    }
}
