use std::sync::Arc;

use chrono::Utc;
use poem_openapi::{Object, OpenApi, payload::Json};
use serde::{Deserialize, Serialize};

use business::application::product::synchronizer::{ProductSynchronizer, SyncPhase};

use crate::api::tags::ApiTags;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct HealthCheckResponse {
    /// "healthy" while the catalog feed is live, "degraded" otherwise
    pub status: String,
    /// Catalog synchronizer phase
    pub catalog_phase: String,
    /// Number of products in the synchronized catalog
    pub product_count: u64,
    /// Current server timestamp
    pub timestamp: String,
    /// Service version
    pub version: String,
}

/// Health API for monitoring and infrastructure checks
pub struct Api {
    catalog: Arc<ProductSynchronizer>,
}

impl Api {
    pub fn new(catalog: Arc<ProductSynchronizer>) -> Self {
        Self { catalog }
    }
}

fn phase_name(phase: SyncPhase) -> &'static str {
    match phase {
        SyncPhase::Uninitialized => "uninitialized",
        SyncPhase::Subscribed => "subscribed",
        SyncPhase::Updated => "updated",
        SyncPhase::Unsubscribed => "unsubscribed",
    }
}

#[OpenApi]
impl Api {
    /// Health check endpoint
    ///
    /// Public. Reports whether the catalog feed is subscribed and how many
    /// products it currently holds.
    #[oai(path = "/health", method = "get", tag = "ApiTags::Health")]
    async fn health_check(&self) -> Json<HealthCheckResponse> {
        let phase = self.catalog.phase();
        let status = match phase {
            SyncPhase::Subscribed | SyncPhase::Updated => "healthy",
            SyncPhase::Uninitialized | SyncPhase::Unsubscribed => "degraded",
        };

        Json(HealthCheckResponse {
            status: status.to_string(),
            catalog_phase: phase_name(phase).to_string(),
            product_count: self.catalog.products().len() as u64,
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
