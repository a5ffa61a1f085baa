//! Walking-directions request and the route structure returned for it.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DirectionsRequest {
    /// "lat,lng"
    origin: String,
    destination: String,
    mode: String,
}

impl DirectionsRequest {
    pub fn walking(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            mode: "walking".to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionsStatus {
    Ok,
    NotFound,
    ZeroResults,
    MaxWaypointsExceeded,
    InvalidRequest,
    OverQueryLimit,
    RequestDenied,
    UnknownError,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DirectionsResponse {
    pub status: DirectionsStatus,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DirectionsResponse {
    /// Steps of the first leg of the first route, in walking order.
    pub fn primary_steps(&self) -> &[Step] {
        self.routes
            .first()
            .and_then(|route| route.legs.first())
            .map(|leg| leg.steps.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Route {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub steps: Vec<Step>,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
    #[serde(default)]
    pub end_address: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Step {
    /// May contain HTML markup.
    pub html_instructions: String,
    pub distance: TextValue,
    pub duration: TextValue,
    pub start_location: LatLngLiteral,
    pub end_location: LatLngLiteral,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextValue {
    pub text: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatLngLiteral {
    pub lat: f64,
    pub lng: f64,
}
