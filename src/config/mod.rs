use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub aws_region: String,
    /// SNS platform application identity. Unset means endpoint creation
    /// is not possible yet; registrations record a placeholder ARN.
    pub platform_application_arn: Option<String>,
    /// DynamoDB table holding device registrations. Unset means every
    /// registry operation fails with a configuration error.
    pub table_name: Option<String>,
    pub sns_endpoint: Option<String>,
    pub dynamodb_endpoint: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        Ok(Self {
            http_addr,
            aws_region: env_or("AWS_REGION", "us-east-1"),
            platform_application_arn: env_opt("SNS_PLATFORM_APPLICATION_ARN"),
            table_name: env_opt("DYNAMODB_TABLE_NAME"),
            sns_endpoint: env_opt("SNS_ENDPOINT"),
            dynamodb_endpoint: env_opt("DYNAMODB_ENDPOINT"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
