use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fleetcore_tracking::{ExternalProvider, ReqwestClient, RoutingProvider, TrackingContext};
use tracing::info;

use crate::config::Config;

pub struct AppState {
    pub ctx: Arc<TrackingContext>,
}

impl AppState {
    /// Load configuration documents and build the tracking context.
    ///
    /// Must run outside the async runtime: the blocking HTTP client of the
    /// external routing provider owns a runtime of its own.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let tracking = config.load_tracking_config()?;
        let manifest = config.load_manifest()?;

        let external: Option<Arc<dyn RoutingProvider>> = match &config.routing_url {
            Some(url) => {
                let client = ReqwestClient::with_timeout(Duration::from_millis(
                    tracking.external_eta_timeout_ms,
                ))
                .context("building routing HTTP client")?;
                info!(url = %url, "external ETA provider enabled");
                Some(Arc::new(ExternalProvider::new(
                    client,
                    url.clone(),
                    config.routing_api_key.clone(),
                )))
            }
            None => None,
        };

        let ctx = TrackingContext::new(tracking, &manifest, external)
            .context("building tracking context")?;
        Ok(Self::from_context(ctx))
    }

    pub fn from_context(ctx: TrackingContext) -> Self {
        AppState { ctx: Arc::new(ctx) }
    }
}
