use std::fmt;

/// Coarse severity of a detected path hazard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    High,
}

impl ThreatLevel {
    /// Maps the model's free-form tag onto a level. Unknown tags count as `Low`
    /// so a reported hazard is never silently dropped.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "none" => ThreatLevel::None,
            "high" => ThreatLevel::High,
            _ => ThreatLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "none",
            ThreatLevel::Low => "low",
            ThreatLevel::High => "high",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hazard-mode analysis request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardAnalysisRequest {
    /// base64 JPEG data URL
    image_data: String,

    /// Present only while a search target is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    search_target: Option<String>,
}

impl HazardAnalysisRequest {
    pub fn new(image_data: &str) -> Self {
        Self {
            image_data: image_data.to_string(),
            search_target: None,
        }
    }

    pub fn with_search_target(mut self, target: &str) -> Self {
        self.search_target = Some(target.to_string());
        self
    }

    pub fn image_data(&self) -> &str {
        &self.image_data
    }

    pub fn search_target(&self) -> Option<&str> {
        self.search_target.as_deref()
    }
}

/// Structured hazard-analysis output. Every field is optional on the wire;
/// models frequently omit the ones they consider irrelevant.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HazardAnalysisResponse {
    pub warning: Option<String>,
    pub threat_level: Option<String>,
    pub avoidance: Option<String>,
    pub guidance: Option<String>,
    pub target_reached: Option<bool>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescriptionRequest {
    image_data: String,
}

impl SceneDescriptionRequest {
    pub fn new(image_data: &str) -> Self {
        Self {
            image_data: image_data.to_string(),
        }
    }

    pub fn image_data(&self) -> &str {
        &self.image_data
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SceneDescriptionResponse {
    pub description: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindObjectRequest {
    image_data: String,
    search_query: String,
}

impl FindObjectRequest {
    pub fn new(image_data: &str, search_query: &str) -> Self {
        Self {
            image_data: image_data.to_string(),
            search_query: search_query.to_string(),
        }
    }

    pub fn image_data(&self) -> &str {
        &self.image_data
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }
}

/// Free-text clock-position and distance description.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FindObjectResponse {
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_tags_are_lenient() {
        assert_eq!(ThreatLevel::from_tag("HIGH"), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_tag(" none "), ThreatLevel::None);
        assert_eq!(ThreatLevel::from_tag("medium"), ThreatLevel::Low);
    }

    #[test]
    fn hazard_response_tolerates_missing_fields() {
        let parsed: HazardAnalysisResponse =
            serde_json::from_str(r#"{"warning": "Curb ahead"}"#).unwrap();
        assert_eq!(parsed.warning.as_deref(), Some("Curb ahead"));
        assert!(parsed.threat_level.is_none());
        assert!(parsed.target_reached.is_none());

        let parsed: HazardAnalysisResponse = serde_json::from_str(
            r#"{"warning": "", "threatLevel": "none", "guidance": "Door at 2 o'clock", "targetReached": true}"#,
        )
        .unwrap();
        assert_eq!(parsed.threat_level.as_deref(), Some("none"));
        assert_eq!(parsed.guidance.as_deref(), Some("Door at 2 o'clock"));
        assert_eq!(parsed.target_reached, Some(true));

        let parsed: HazardAnalysisResponse =
            serde_json::from_str(r#"{"warning": null, "threatLevel": "none"}"#).unwrap();
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn search_target_is_omitted_when_absent() {
        let json = serde_json::to_value(HazardAnalysisRequest::new("data:image/jpeg;base64,AA")).unwrap();
        assert_eq!(json["imageData"], "data:image/jpeg;base64,AA");
        assert!(json.get("searchTarget").is_none());

        let json = serde_json::to_value(
            HazardAnalysisRequest::new("data:image/jpeg;base64,AA").with_search_target("door"),
        )
        .unwrap();
        assert_eq!(json["searchTarget"], "door");
    }
}
