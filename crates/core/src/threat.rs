use crate::hazard::HazardReport;
use guidedog_types::ThreatLevel;

/// What the presentation layer shows: current level plus the text behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreatState {
    pub level: ThreatLevel,
    pub warning_text: String,
    pub avoidance_text: String,
}

/// Holds the threat level from the most recent cycle.
///
/// Every report replaces the state wholesale; nothing carries over between
/// cycles and nothing decays on a timer. Only `reset` (monitoring stopped)
/// returns it to `None` outside of a report.
#[derive(Debug, Default)]
pub struct ThreatStateMachine {
    state: ThreatState,
}

impl ThreatStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a report; returns true when the visible state changed.
    pub fn apply(&mut self, report: &HazardReport) -> bool {
        let next = ThreatState {
            level: report.threat_level,
            warning_text: report.warning_text.clone(),
            avoidance_text: report.avoidance.clone().unwrap_or_default(),
        };
        if next == self.state {
            return false;
        }
        tracing::debug!("Threat state {} -> {}", self.state.level, next.level);
        self.state = next;
        true
    }

    pub fn reset(&mut self) {
        self.state = ThreatState::default();
    }

    pub fn level(&self) -> ThreatLevel {
        self.state.level
    }

    pub fn state(&self) -> &ThreatState {
        &self.state
    }
}
