//! Transcribed speech and the line-oriented input feed, turned into typed
//! commands.

use guidedog_core::waypoint::PositionFix;

/// What the user asked for. Matching is by lower-cased substring, first
/// match wins, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceCommand {
    DescribeScene,
    /// Empty when the user said "find me" with nothing after it.
    FindObject(String),
    CancelSearch,
    Navigate(String),
    StopNavigation,
    NextStep,
    RepeatStep,
    StartMonitoring,
    StopMonitoring,
    Help,
    Unrecognized(String),
}

const SCENE_PHRASES: [&str; 5] = [
    "describe",
    "what's in front",
    "what is in front",
    "whats in front",
    "what do you see",
];
const CANCEL_SEARCH_PHRASES: [&str; 2] = ["stop looking", "cancel search"];
const NAVIGATE_PHRASES: [&str; 2] = ["navigate to", "take me to"];

pub const HELP_TEXT: &str = "Say 'describe what's in front of me' for scene analysis, \
'find me' followed by what you're looking for, or 'navigate to' followed by a place. \
During navigation say 'next step', 'repeat' or 'stop navigation'. \
Say 'start monitoring' or 'stop monitoring' for hazard alerts.";

impl VoiceCommand {
    pub fn parse(transcript: &str) -> Self {
        let lower = transcript.trim().to_lowercase();

        if SCENE_PHRASES.iter().any(|p| lower.contains(p)) {
            return VoiceCommand::DescribeScene;
        }
        if let Some(query) = text_after(&lower, "find me") {
            return VoiceCommand::FindObject(query);
        }
        if CANCEL_SEARCH_PHRASES.iter().any(|p| lower.contains(p)) {
            return VoiceCommand::CancelSearch;
        }
        if let Some(destination) = NAVIGATE_PHRASES
            .iter()
            .find_map(|phrase| text_after(&lower, phrase))
        {
            return VoiceCommand::Navigate(destination);
        }
        if lower.contains("stop navigation") {
            return VoiceCommand::StopNavigation;
        }
        if lower.contains("next step") {
            return VoiceCommand::NextStep;
        }
        if lower.contains("repeat") {
            return VoiceCommand::RepeatStep;
        }
        if lower.contains("start monitoring") {
            return VoiceCommand::StartMonitoring;
        }
        if lower.contains("stop monitoring") {
            return VoiceCommand::StopMonitoring;
        }
        if lower.contains("help") {
            return VoiceCommand::Help;
        }
        VoiceCommand::Unrecognized(transcript.trim().to_string())
    }
}

/// Whatever follows `phrase`, trimmed of whitespace and trailing punctuation.
fn text_after(lower: &str, phrase: &str) -> Option<String> {
    let (_, rest) = lower.split_once(phrase)?;
    Some(
        rest.trim()
            .trim_end_matches(['.', '?', '!'])
            .trim()
            .to_string(),
    )
}

/// One line of the runtime's input feed.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    /// `fix <lat> <lng> [heading]`
    Fix(PositionFix),
    /// `heading <degrees>`
    Heading(f64),
    Voice(String),
    Empty,
}

impl InputLine {
    pub fn parse(line: &str, now_ms: u64) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return InputLine::Empty;
        }
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_lowercase();
        let numbers: Option<Vec<f64>> = words.map(|w| w.parse::<f64>().ok()).collect();

        match (keyword.as_str(), numbers.as_deref()) {
            ("fix", Some([lat, lng])) => InputLine::Fix(PositionFix {
                lat: *lat,
                lng: *lng,
                heading_degrees: None,
                timestamp_ms: now_ms,
            }),
            ("fix", Some([lat, lng, heading])) => InputLine::Fix(PositionFix {
                lat: *lat,
                lng: *lng,
                heading_degrees: Some(*heading),
                timestamp_ms: now_ms,
            }),
            ("heading", Some([degrees])) => InputLine::Heading(*degrees),
            _ => InputLine::Voice(line.to_string()),
        }
    }
}
