use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::app::utc_now_rfc3339;
use crate::domain::device::{DeviceRegistration, UNKNOWN_BUNDLE};
use crate::infra::push::{PushError, PushGateway};
use crate::infra::registry::{DeviceStore, RegistryError};

/// Registration input assembled by the HTTP layer. Identifier defaults
/// are already applied; `device_id` is generated when the caller omits it.
#[derive(Debug)]
pub struct NewRegistration {
    pub device_token: String,
    pub user_id: String,
    pub device_id: String,
    pub bundle_id: Option<String>,
    pub platform: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{0}")]
    Endpoint(PushError),
    #[error("{0}")]
    Store(RegistryError),
}

pub struct RegistrationService {
    push: Arc<dyn PushGateway>,
    registry: Arc<dyn DeviceStore>,
}

impl RegistrationService {
    pub fn new(push: Arc<dyn PushGateway>, registry: Arc<dyn DeviceStore>) -> Self {
        Self { push, registry }
    }

    /// Resolve a platform endpoint for the token, then overwrite the
    /// registration record. The endpoint may outlive a failed store
    /// write; there is no rollback across the two calls.
    pub async fn register(
        &self,
        new: NewRegistration,
    ) -> Result<DeviceRegistration, RegistrationError> {
        let endpoint_arn = self
            .resolve_endpoint(&new.device_token, &new.device_id)
            .await?;

        let now = utc_now_rfc3339();
        let record = DeviceRegistration {
            device_id: new.device_id,
            user_id: new.user_id,
            device_token: new.device_token,
            endpoint_arn,
            bundle_id: new
                .bundle_id
                .unwrap_or_else(|| UNKNOWN_BUNDLE.to_string()),
            platform: new.platform,
            created_at: new.timestamp.unwrap_or_else(|| now.clone()),
            last_updated: now,
            active: true,
        };

        self.registry
            .put_device(&record)
            .await
            .map_err(RegistrationError::Store)?;

        info!(device_id = %record.device_id, user_id = %record.user_id, "stored device registration");
        Ok(record)
    }

    async fn resolve_endpoint(
        &self,
        device_token: &str,
        device_id: &str,
    ) -> Result<String, RegistrationError> {
        match self.push.create_endpoint(device_token, device_id).await {
            Ok(endpoint_arn) => Ok(endpoint_arn),
            Err(PushError::NotConfigured) => {
                warn!(
                    %device_id,
                    "no platform application configured, recording placeholder endpoint"
                );
                Ok(placeholder_endpoint_arn(device_id))
            }
            Err(PushError::InvalidParameter(message)) => {
                // The token may already be bound to an existing endpoint;
                // no reuse lookup is attempted.
                warn!(%device_id, %message, "endpoint creation rejected");
                Err(RegistrationError::Endpoint(PushError::InvalidParameter(
                    message,
                )))
            }
            Err(err) => Err(RegistrationError::Endpoint(err)),
        }
    }
}

/// Stands in for a real endpoint until push credentials are provisioned.
/// Publishing to it fails at send time.
pub fn placeholder_endpoint_arn(device_id: &str) -> String {
    format!(
        "arn:aws:sns:us-east-1:123456789012:app/APNS/dummy-endpoint-{}",
        device_id
    )
}
