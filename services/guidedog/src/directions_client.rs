use anyhow::{Context, Result};
use async_trait::async_trait;
use guidedog_core::directions::DirectionsProvider;
use guidedog_core::geo::LatLng;
use guidedog_types::{DirectionsRequest, DirectionsResponse, DirectionsStatus};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

pub const GOOGLE_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Google Directions API, walking mode.
pub struct GoogleDirectionsClient {
    client: Client,
    api_key: SecretString,
    endpoint: String,
}

impl GoogleDirectionsClient {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_endpoint(api_key, GOOGLE_DIRECTIONS_URL)
    }

    pub fn with_endpoint(api_key: SecretString, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: endpoint.to_string(),
        }
    }

    fn build(&self, request: &DirectionsRequest) -> Result<reqwest::Request> {
        self.client
            .get(&self.endpoint)
            .query(&[
                ("origin", request.origin()),
                ("destination", request.destination()),
                ("mode", request.mode()),
                ("key", self.api_key.expose_secret()),
            ])
            .build()
            .context("Failed to build directions request")
    }
}

#[async_trait]
impl DirectionsProvider for GoogleDirectionsClient {
    async fn directions(&self, origin: LatLng, destination: String) -> Result<DirectionsResponse> {
        let request = DirectionsRequest::walking(&origin.to_string(), &destination);
        tracing::info!("Fetching walking directions from {} to {}", origin, destination);

        let response = self
            .client
            .execute(self.build(&request)?)
            .await
            .context("Directions request failed")?
            .error_for_status()
            .context("Directions service returned an error")?
            .json::<DirectionsResponse>()
            .await
            .context("Unexpected directions body")?;

        if response.status != DirectionsStatus::Ok {
            tracing::warn!(
                "Directions status {:?}: {}",
                response.status,
                response.error_message.as_deref().unwrap_or("no details")
            );
        }
        Ok(response)
    }
}
