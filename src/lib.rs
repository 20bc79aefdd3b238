pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::infra::push::PushGateway;
use crate::infra::registry::DeviceStore;

#[derive(Clone)]
pub struct AppState {
    pub push: Arc<dyn PushGateway>,
    pub registry: Arc<dyn DeviceStore>,
}
