use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use thiserror::Error;

use crate::config::AppConfig;
use crate::domain::device::{
    DeviceRegistration, ANONYMOUS_USER, DEFAULT_PLATFORM, UNKNOWN_BUNDLE,
};

/// Secondary index keyed on `user_id`.
pub const USER_ID_INDEX: &str = "user-id-index";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("device registry table not configured")]
    NotConfigured,
    #[error("malformed registry item: {0}")]
    Malformed(String),
    #[error("{0}")]
    Service(String),
}

/// Device-registry seam. Implemented by [`DynamoRegistry`] in production
/// and by an in-memory double in the integration tests.
///
/// Failures are distinguishable from empty results here; callers decide
/// whether to surface or degrade them.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get_device(&self, device_id: &str)
        -> Result<Option<DeviceRegistration>, RegistryError>;

    async fn devices_for_user(&self, user_id: &str)
        -> Result<Vec<DeviceRegistration>, RegistryError>;

    async fn all_devices(&self) -> Result<Vec<DeviceRegistration>, RegistryError>;

    /// Full-record overwrite; no merge semantics.
    async fn put_device(&self, device: &DeviceRegistration) -> Result<(), RegistryError>;
}

#[derive(Clone)]
pub struct DynamoRegistry {
    client: Client,
    table_name: Option<String>,
}

impl DynamoRegistry {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.aws_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut dynamodb_builder = aws_sdk_dynamodb::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned());
        if let Some(endpoint) = &config.dynamodb_endpoint {
            dynamodb_builder = dynamodb_builder.endpoint_url(endpoint.clone());
        }
        if let Some(provider) = shared_config.credentials_provider() {
            dynamodb_builder = dynamodb_builder.credentials_provider(provider);
        }
        let dynamodb_config = dynamodb_builder.build();

        Ok(Self {
            client: Client::from_conf(dynamodb_config),
            table_name: config.table_name.clone(),
        })
    }

    fn table(&self) -> Result<&str, RegistryError> {
        self.table_name.as_deref().ok_or(RegistryError::NotConfigured)
    }
}

#[async_trait]
impl DeviceStore for DynamoRegistry {
    async fn get_device(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceRegistration>, RegistryError> {
        let response = self
            .client
            .get_item()
            .table_name(self.table()?)
            .key("device_id", AttributeValue::S(device_id.to_string()))
            .send()
            .await
            .map_err(service_error)?;

        response.item().map(parse_device).transpose()
    }

    async fn devices_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<DeviceRegistration>, RegistryError> {
        let response = self
            .client
            .query()
            .table_name(self.table()?)
            .index_name(USER_ID_INDEX)
            .key_condition_expression("user_id = :user_id")
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(service_error)?;

        response.items().iter().map(parse_device).collect()
    }

    async fn all_devices(&self) -> Result<Vec<DeviceRegistration>, RegistryError> {
        let response = self
            .client
            .scan()
            .table_name(self.table()?)
            .send()
            .await
            .map_err(service_error)?;

        response.items().iter().map(parse_device).collect()
    }

    async fn put_device(&self, device: &DeviceRegistration) -> Result<(), RegistryError> {
        let item = HashMap::from([
            (
                "device_id".to_string(),
                AttributeValue::S(device.device_id.clone()),
            ),
            (
                "user_id".to_string(),
                AttributeValue::S(device.user_id.clone()),
            ),
            (
                "device_token".to_string(),
                AttributeValue::S(device.device_token.clone()),
            ),
            (
                "endpoint_arn".to_string(),
                AttributeValue::S(device.endpoint_arn.clone()),
            ),
            (
                "bundle_id".to_string(),
                AttributeValue::S(device.bundle_id.clone()),
            ),
            (
                "platform".to_string(),
                AttributeValue::S(device.platform.clone()),
            ),
            (
                "created_at".to_string(),
                AttributeValue::S(device.created_at.clone()),
            ),
            (
                "last_updated".to_string(),
                AttributeValue::S(device.last_updated.clone()),
            ),
            ("active".to_string(), AttributeValue::Bool(device.active)),
        ]);

        self.client
            .put_item()
            .table_name(self.table()?)
            .set_item(Some(item))
            .send()
            .await
            .map_err(service_error)?;

        Ok(())
    }
}

fn parse_device(item: &HashMap<String, AttributeValue>) -> Result<DeviceRegistration, RegistryError> {
    Ok(DeviceRegistration {
        device_id: required_attr(item, "device_id")?,
        user_id: string_attr(item, "user_id").unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        device_token: required_attr(item, "device_token")?,
        endpoint_arn: required_attr(item, "endpoint_arn")?,
        bundle_id: string_attr(item, "bundle_id").unwrap_or_else(|| UNKNOWN_BUNDLE.to_string()),
        platform: string_attr(item, "platform").unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
        created_at: string_attr(item, "created_at").unwrap_or_default(),
        last_updated: string_attr(item, "last_updated").unwrap_or_default(),
        active: item
            .get("active")
            .and_then(|value| value.as_bool().ok())
            .copied()
            .unwrap_or(true),
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(|value| value.to_string())
}

fn required_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, RegistryError> {
    string_attr(item, name)
        .ok_or_else(|| RegistryError::Malformed(format!("missing attribute {}", name)))
}

fn service_error<E>(err: SdkError<E>) -> RegistryError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(service_err) => RegistryError::Service(format!(
            "{}: {}",
            service_err.err().code().unwrap_or("Unknown"),
            service_err.err().message().unwrap_or_default()
        )),
        other => RegistryError::Service(other.to_string()),
    }
}
