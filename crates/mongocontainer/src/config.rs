//! Driver configuration applied while setting up a handle

use mongocontainer_common::Result;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client and pool configuration for [`crate::MongoHandle`]
///
/// Options left as `None` fall back to whatever the connection string or the
/// driver defaults specify. Durations are in milliseconds so the struct can be
/// loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Minimum number of pooled connections (default: driver default)
    pub min_pool_size: Option<u32>,
    /// Maximum number of pooled connections (default: driver default, 10)
    pub max_pool_size: Option<u32>,
    /// Maximum time a pooled connection may stay idle (default: none)
    pub max_idle_time_ms: Option<u64>,
    /// Connection timeout (default: driver default, 10s)
    pub connect_timeout_ms: Option<u64>,
    /// Server selection timeout (default: driver default, 30s)
    pub server_selection_timeout_ms: Option<u64>,
    /// Application name reported in server logs
    pub app_name: Option<String>,
    /// Pin the server to Stable API v1. Requires MongoDB 5.0 or newer.
    pub stable_api: bool,
    /// Issue a `ping` during setup so unreachable servers fail immediately
    pub verify_on_setup: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            min_pool_size: None,
            max_pool_size: None,
            max_idle_time_ms: None,
            connect_timeout_ms: None,
            server_selection_timeout_ms: None,
            app_name: None,
            stable_api: false,
            verify_on_setup: true,
        }
    }
}

impl ContainerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Overlay this configuration onto parsed client options
    pub fn apply(&self, client_options: &mut ClientOptions) {
        if let Some(min) = self.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = self.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(idle) = self.max_idle_time_ms {
            client_options.max_idle_time = Some(Duration::from_millis(idle));
        }
        if let Some(connect) = self.connect_timeout_ms {
            client_options.connect_timeout = Some(Duration::from_millis(connect));
        }
        if let Some(server_sel) = self.server_selection_timeout_ms {
            client_options.server_selection_timeout = Some(Duration::from_millis(server_sel));
        }
        if let Some(app) = &self.app_name {
            client_options.app_name = Some(app.clone());
        }
        if self.stable_api {
            let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
            client_options.server_api = Some(server_api);
        }
    }
}
