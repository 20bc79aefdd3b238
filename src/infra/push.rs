use anyhow::Result;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_sns::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_sns::operation::create_platform_endpoint::CreatePlatformEndpointError;
use aws_sdk_sns::operation::publish::PublishError;
use aws_sdk_sns::Client;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("SNS platform application not configured - APNS certificate required")]
    NotConfigured,
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),
    #[error("EndpointDisabled: {0}")]
    EndpointDisabled(String),
    #[error("{0}")]
    Service(String),
}

/// Push-provider seam. Implemented by [`SnsPush`] in production and by an
/// in-memory double in the integration tests.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Create (or look up) a platform endpoint for a device token.
    /// Returns the endpoint ARN.
    async fn create_endpoint(
        &self,
        device_token: &str,
        custom_user_data: &str,
    ) -> Result<String, PushError>;

    /// Publish a structured payload to an endpoint. Returns the provider
    /// message id.
    async fn publish(&self, endpoint_arn: &str, payload: &str) -> Result<String, PushError>;

    async fn delete_endpoint(&self, endpoint_arn: &str) -> Result<(), PushError>;
}

#[derive(Clone)]
pub struct SnsPush {
    client: Client,
    platform_application_arn: Option<String>,
}

impl SnsPush {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.aws_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut sns_builder = aws_sdk_sns::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned());
        if let Some(endpoint) = &config.sns_endpoint {
            sns_builder = sns_builder.endpoint_url(endpoint.clone());
        }
        if let Some(provider) = shared_config.credentials_provider() {
            sns_builder = sns_builder.credentials_provider(provider);
        }
        let sns_config = sns_builder.build();

        Ok(Self {
            client: Client::from_conf(sns_config),
            platform_application_arn: config.platform_application_arn.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for SnsPush {
    async fn create_endpoint(
        &self,
        device_token: &str,
        custom_user_data: &str,
    ) -> Result<String, PushError> {
        let platform_application_arn = self
            .platform_application_arn
            .as_deref()
            .ok_or(PushError::NotConfigured)?;

        let response = self
            .client
            .create_platform_endpoint()
            .platform_application_arn(platform_application_arn)
            .token(device_token)
            .custom_user_data(custom_user_data)
            .send()
            .await
            .map_err(classify_create_error)?;

        let endpoint_arn = response
            .endpoint_arn()
            .ok_or_else(|| PushError::Service("endpoint arn missing from response".to_string()))?
            .to_string();

        info!(endpoint_arn = %endpoint_arn, "created platform endpoint");
        Ok(endpoint_arn)
    }

    async fn publish(&self, endpoint_arn: &str, payload: &str) -> Result<String, PushError> {
        let response = self
            .client
            .publish()
            .target_arn(endpoint_arn)
            .message(payload)
            .message_structure("json")
            .send()
            .await
            .map_err(classify_publish_error)?;

        let message_id = response
            .message_id()
            .ok_or_else(|| PushError::Service("message id missing from response".to_string()))?
            .to_string();

        Ok(message_id)
    }

    async fn delete_endpoint(&self, endpoint_arn: &str) -> Result<(), PushError> {
        self.client
            .delete_endpoint()
            .endpoint_arn(endpoint_arn)
            .send()
            .await
            .map_err(|err| PushError::Service(err.to_string()))?;

        Ok(())
    }
}

fn classify_create_error(err: SdkError<CreatePlatformEndpointError>) -> PushError {
    match &err {
        SdkError::ServiceError(service_err) if service_err.err().is_invalid_parameter_exception() => {
            PushError::InvalidParameter(error_message(service_err.err()))
        }
        SdkError::ServiceError(service_err) => PushError::Service(error_summary(service_err.err())),
        other => PushError::Service(other.to_string()),
    }
}

fn classify_publish_error(err: SdkError<PublishError>) -> PushError {
    match &err {
        SdkError::ServiceError(service_err) if service_err.err().is_endpoint_disabled_exception() => {
            PushError::EndpointDisabled(error_message(service_err.err()))
        }
        SdkError::ServiceError(service_err) if service_err.err().is_invalid_parameter_exception() => {
            PushError::InvalidParameter(error_message(service_err.err()))
        }
        SdkError::ServiceError(service_err) => PushError::Service(error_summary(service_err.err())),
        other => PushError::Service(other.to_string()),
    }
}

fn error_message<E: ProvideErrorMetadata>(err: &E) -> String {
    err.message().unwrap_or_default().to_string()
}

fn error_summary<E: ProvideErrorMetadata>(err: &E) -> String {
    format!(
        "{}: {}",
        err.code().unwrap_or("Unknown"),
        err.message().unwrap_or_default()
    )
}
