//! Turns a hazard-analysis payload into a [`HazardReport`].

use guidedog_types::{HazardAnalysisResponse, ThreatLevel};
use regex::Regex;
use std::sync::LazyLock;

/// "<n> steps" / "<n> feet", case-insensitive. First match wins.
static DISTANCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(step|feet)").expect("valid distance pattern"));

/// Leading alphabetic phrase directly followed by the first number.
static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z\s]+?)\s*\d").expect("valid object pattern"));

/// Longest raw-text warning kept by the fallback heuristic.
const FALLBACK_WARNING_CHARS: usize = 100;

/// One analysis cycle's findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardReport {
    pub warning_text: String,
    pub threat_level: ThreatLevel,
    pub avoidance: Option<String>,
    pub guidance: Option<String>,
    pub target_reached: bool,
}

impl HazardReport {
    /// Parses the raw analysis output. Anything that isn't the expected JSON
    /// goes through [`HazardReport::from_raw_text`] instead of failing, so a
    /// sloppy model response during a real hazard still produces a warning.
    pub fn parse(raw: &str) -> Self {
        let body = strip_code_fence(raw);
        match serde_json::from_str::<HazardAnalysisResponse>(body) {
            Ok(response) => Self::from_response(response),
            Err(e) => {
                tracing::warn!("Hazard payload is not valid JSON ({}), using text heuristic", e);
                Self::from_raw_text(body)
            }
        }
    }

    pub fn from_response(response: HazardAnalysisResponse) -> Self {
        let warning_text = response.warning.as_deref().unwrap_or_default().trim().to_string();
        let threat_level = if warning_text.is_empty() {
            ThreatLevel::None
        } else {
            response
                .threat_level
                .as_deref()
                .map(ThreatLevel::from_tag)
                .unwrap_or(ThreatLevel::Low)
        };
        Self {
            warning_text,
            threat_level,
            avoidance: non_empty(response.avoidance),
            guidance: non_empty(response.guidance),
            target_reached: response.target_reached.unwrap_or(false),
        }
    }

    /// Heuristic for free text: vehicles are high threat, anything else low,
    /// and an empty or all-clear message is no threat at all.
    pub fn from_raw_text(text: &str) -> Self {
        let text = text.trim();
        let lower = text.to_lowercase();
        if text.is_empty() || lower.contains("clear") || lower.contains("no hazard") {
            return Self::default();
        }
        let threat_level = if lower.contains("vehicle") || lower.contains("car") {
            ThreatLevel::High
        } else {
            ThreatLevel::Low
        };
        Self {
            warning_text: text.chars().take(FALLBACK_WARNING_CHARS).collect(),
            threat_level,
            ..Self::default()
        }
    }

    pub fn has_warning(&self) -> bool {
        !self.warning_text.is_empty()
    }

    /// Approximate distance in steps/feet mentioned in the warning, 0 if none.
    pub fn distance(&self) -> u32 {
        extract_distance(&self.warning_text)
    }

    /// Obstacle class named by the warning.
    pub fn object(&self) -> String {
        extract_object(&self.warning_text)
    }

    /// Warning followed by the avoidance hint, if any.
    pub fn spoken_message(&self) -> String {
        match self.avoidance.as_deref() {
            Some(avoidance) => format!("{}. {}", self.warning_text, avoidance),
            None => self.warning_text.clone(),
        }
    }
}

pub fn extract_distance(warning: &str) -> u32 {
    DISTANCE_RE
        .captures(warning)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

pub fn extract_object(warning: &str) -> String {
    OBJECT_RE
        .captures(warning)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| warning.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening fence line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_payload() {
        let report = HazardReport::parse(
            r#"{"warning": "Stairs 5 steps ahead", "threatLevel": "low", "avoidance": "Hold the railing"}"#,
        );
        assert_eq!(report.warning_text, "Stairs 5 steps ahead");
        assert_eq!(report.threat_level, ThreatLevel::Low);
        assert_eq!(report.avoidance.as_deref(), Some("Hold the railing"));
        assert_eq!(report.distance(), 5);
        assert_eq!(report.object(), "Stairs");
        assert_eq!(report.spoken_message(), "Stairs 5 steps ahead. Hold the railing");
    }

    #[test]
    fn clear_path_is_no_threat() {
        let report = HazardReport::parse(r#"{"warning": "", "threatLevel": "none"}"#);
        assert_eq!(report.threat_level, ThreatLevel::None);
        assert!(!report.has_warning());

        // a model that tags an empty warning as high is still reporting nothing
        let report = HazardReport::parse(r#"{"warning": "  ", "threatLevel": "high"}"#);
        assert_eq!(report.threat_level, ThreatLevel::None);
    }

    #[test]
    fn null_or_missing_warning_is_clear() {
        for raw in [
            r#"{"warning": null, "threatLevel": "none"}"#,
            r#"{"threatLevel": "none"}"#,
            r#"{"warning": null, "threatLevel": "low", "guidance": null}"#,
        ] {
            let report = HazardReport::parse(raw);
            assert_eq!(report, HazardReport::default(), "{raw}");
        }
    }

    #[test]
    fn missing_or_unknown_level_defaults_to_low() {
        assert_eq!(
            HazardReport::parse(r#"{"warning": "Curb ahead"}"#).threat_level,
            ThreatLevel::Low
        );
        assert_eq!(
            HazardReport::parse(r#"{"warning": "Curb ahead", "threatLevel": "medium"}"#).threat_level,
            ThreatLevel::Low
        );
    }

    #[test]
    fn search_fields() {
        let report = HazardReport::parse(
            r#"{"warning": "", "threatLevel": "none", "guidance": "Door at 2 o'clock, 10 feet", "targetReached": false}"#,
        );
        assert_eq!(report.guidance.as_deref(), Some("Door at 2 o'clock, 10 feet"));
        assert!(!report.target_reached);

        let report = HazardReport::parse(r#"{"warning": "", "guidance": " ", "targetReached": true}"#);
        assert!(report.guidance.is_none());
        assert!(report.target_reached);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let report =
            HazardReport::parse("```json\n{\"warning\": \"Car crossing path\", \"threatLevel\": \"high\"}\n```");
        assert_eq!(report.warning_text, "Car crossing path");
        assert_eq!(report.threat_level, ThreatLevel::High);
    }

    #[test]
    fn free_text_fallback() {
        let report = HazardReport::parse("A delivery vehicle is backing up toward you");
        assert_eq!(report.threat_level, ThreatLevel::High);
        assert_eq!(report.warning_text, "A delivery vehicle is backing up toward you");

        let report = HazardReport::parse("Low branch at head height");
        assert_eq!(report.threat_level, ThreatLevel::Low);

        let report = HazardReport::parse("The path looks Clear.");
        assert_eq!(report, HazardReport::default());

        let report = HazardReport::parse("No hazards detected");
        assert_eq!(report.threat_level, ThreatLevel::None);
        assert_eq!(report.warning_text, "");

        assert_eq!(HazardReport::parse("   "), HazardReport::default());
    }

    #[test]
    fn fallback_warning_is_truncated() {
        let long = "pothole ".repeat(40);
        let report = HazardReport::parse(&long);
        assert_eq!(report.warning_text.chars().count(), 100);
    }

    #[test]
    fn distance_extraction() {
        assert_eq!(extract_distance("Stairs 5 steps ahead"), 5);
        assert_eq!(extract_distance("Pole 12 FEET ahead"), 12);
        assert_eq!(extract_distance("Curb 3feet, then 9 steps"), 3);
        assert_eq!(extract_distance("Curb ahead"), 0);
        assert_eq!(extract_distance("Sign 4 meters ahead"), 0);
    }

    #[test]
    fn object_extraction() {
        assert_eq!(extract_object("Stairs 5 steps ahead"), "Stairs");
        assert_eq!(extract_object("Parked bike 3 feet ahead"), "Parked bike");
        assert_eq!(extract_object("Curb ahead"), "Curb ahead");
        assert_eq!(extract_object("5 steps ahead"), "5 steps ahead");
        assert_eq!(extract_object(""), "");
    }
}
