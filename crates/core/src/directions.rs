use crate::geo::LatLng;
use anyhow::Result;
use async_trait::async_trait;
use guidedog_types::DirectionsResponse;
#[cfg(test)]
use mockall::automock;

/// Walking-route lookup.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn directions(&self, origin: LatLng, destination: String) -> Result<DirectionsResponse>;
}
