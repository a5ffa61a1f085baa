use crate::hazard::{HazardReport, extract_object};
use crate::search::SearchTargetTracker;
use crate::{Alert, HapticPattern};
use guidedog_types::ThreatLevel;

/// Minimum gap before the same obstacle is re-announced for a distance change.
pub const COOLDOWN_MS: u64 = 5_000;
/// Steps/feet the distance must move by to be worth repeating.
pub const MIN_DISTANCE_DELTA: u32 = 2;
pub const ALERT_RATE: f32 = 1.0;

/// Bookkeeping for the last hazard utterance. `timestamp_ms == 0` means
/// nothing has been said yet this session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastSpokenState {
    pub spoken_text: String,
    pub extracted_object: String,
    pub extracted_distance: u32,
    pub threat_level: ThreatLevel,
    pub timestamp_ms: u64,
}

/// Why an utterance was approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakReason {
    TargetReached,
    SearchGuidance,
    FirstWarning,
    NewObject,
    Escalation,
    DistanceChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Speak { reason: SpeakReason, alert: Alert },
    Suppress,
}

impl Verdict {
    pub fn should_speak(&self) -> bool {
        matches!(self, Verdict::Speak { .. })
    }
}

/// Decides whether a report is worth interrupting the user for.
///
/// Object changes and escalations bypass the cooldown; a static obstacle is
/// only repeated once the cooldown has passed *and* the distance to it has
/// moved meaningfully.
#[derive(Debug, Default)]
pub struct SpeechArbiter {
    last: LastSpokenState,
}

impl SpeechArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_spoken(&self) -> &LastSpokenState {
        &self.last
    }

    pub fn reset(&mut self) {
        self.last = LastSpokenState::default();
    }

    pub fn evaluate(
        &mut self,
        report: &HazardReport,
        search: &mut SearchTargetTracker,
        now_ms: u64,
    ) -> Verdict {
        if report.target_reached && search.is_active() {
            let target = search.clear().unwrap_or_default();
            let alert = Alert::new(format!("You have reached the {target}"), ALERT_RATE)
                .with_haptic(HapticPattern::Arrival);
            return Verdict::Speak {
                reason: SpeakReason::TargetReached,
                alert,
            };
        }

        if search.is_active() {
            if let Some(guidance) = report.guidance.as_deref() {
                return Verdict::Speak {
                    reason: SpeakReason::SearchGuidance,
                    alert: Alert::new(guidance, ALERT_RATE),
                };
            }
        }

        if !report.has_warning() {
            return Verdict::Suppress;
        }

        let object = report.object();
        let distance = report.distance();
        let Some(reason) = self.hazard_reason(report, &object, distance, now_ms) else {
            tracing::debug!("Suppressed repeat warning: {}", report.warning_text);
            return Verdict::Suppress;
        };

        self.last = LastSpokenState {
            spoken_text: report.warning_text.clone(),
            extracted_object: object,
            extracted_distance: distance,
            threat_level: report.threat_level,
            timestamp_ms: now_ms,
        };

        let haptic = match report.threat_level {
            ThreatLevel::High => HapticPattern::Escalating,
            _ => HapticPattern::Pulse,
        };
        Verdict::Speak {
            reason,
            alert: Alert::new(report.spoken_message(), ALERT_RATE).with_haptic(haptic),
        }
    }

    fn hazard_reason(
        &self,
        report: &HazardReport,
        object: &str,
        distance: u32,
        now_ms: u64,
    ) -> Option<SpeakReason> {
        if self.last.timestamp_ms == 0 {
            return Some(SpeakReason::FirstWarning);
        }
        if object != extract_object(&self.last.spoken_text) {
            return Some(SpeakReason::NewObject);
        }
        if report.threat_level == ThreatLevel::High && self.last.threat_level != ThreatLevel::High {
            return Some(SpeakReason::Escalation);
        }
        let elapsed = now_ms.saturating_sub(self.last.timestamp_ms);
        if elapsed >= COOLDOWN_MS && distance.abs_diff(self.last.extracted_distance) >= MIN_DISTANCE_DELTA {
            return Some(SpeakReason::DistanceChanged);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn warning(text: &str, level: ThreatLevel) -> HazardReport {
        HazardReport {
            warning_text: text.to_string(),
            threat_level: level,
            ..HazardReport::default()
        }
    }

    fn spoken_text(verdict: &Verdict) -> &str {
        match verdict {
            Verdict::Speak { alert, .. } => &alert.text,
            Verdict::Suppress => panic!("expected speech"),
        }
    }

    #[test]
    fn first_warning_always_speaks() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();

        let verdict = arbiter.evaluate(&warning("Stairs 5 steps ahead", ThreatLevel::Low), &mut search, T0);

        assert!(matches!(
            verdict,
            Verdict::Speak { reason: SpeakReason::FirstWarning, ref alert }
                if alert.haptic == Some(HapticPattern::Pulse)
        ));
        let last = arbiter.last_spoken();
        assert_eq!(last.extracted_object, "Stairs");
        assert_eq!(last.extracted_distance, 5);
        assert_eq!(last.threat_level, ThreatLevel::Low);
        assert_eq!(last.timestamp_ms, T0);
    }

    #[test]
    fn identical_warning_within_cooldown_is_suppressed() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        let report = warning("Stairs 5 steps ahead", ThreatLevel::Low);

        assert!(arbiter.evaluate(&report, &mut search, T0).should_speak());
        assert_eq!(arbiter.evaluate(&report, &mut search, T0 + 3_000), Verdict::Suppress);
        // cooldown alone isn't enough: distance hasn't changed
        assert_eq!(arbiter.evaluate(&report, &mut search, T0 + 9_000), Verdict::Suppress);
        assert_eq!(arbiter.last_spoken().timestamp_ms, T0);
    }

    #[test]
    fn small_distance_change_after_cooldown_is_suppressed() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        arbiter.evaluate(&warning("Stairs 5 steps ahead", ThreatLevel::Low), &mut search, T0);
        let verdict = arbiter.evaluate(&warning("Stairs 4 steps ahead", ThreatLevel::Low), &mut search, T0 + 6_000);
        assert_eq!(verdict, Verdict::Suppress);
    }

    #[test]
    fn distance_change_needs_cooldown() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        arbiter.evaluate(&warning("Stairs 8 steps ahead", ThreatLevel::Low), &mut search, T0);

        let closer = warning("Stairs 3 steps ahead", ThreatLevel::Low);
        assert_eq!(arbiter.evaluate(&closer, &mut search, T0 + 4_999), Verdict::Suppress);
        let verdict = arbiter.evaluate(&closer, &mut search, T0 + 5_000);
        assert!(matches!(verdict, Verdict::Speak { reason: SpeakReason::DistanceChanged, .. }));
        assert_eq!(arbiter.last_spoken().extracted_distance, 3);
    }

    #[test]
    fn escalation_bypasses_cooldown() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        arbiter.evaluate(&warning("Bike 6 feet ahead", ThreatLevel::Low), &mut search, T0);

        let verdict = arbiter.evaluate(&warning("Bike 6 feet ahead", ThreatLevel::High), &mut search, T0 + 100);
        assert!(matches!(
            verdict,
            Verdict::Speak { reason: SpeakReason::Escalation, ref alert }
                if alert.haptic == Some(HapticPattern::Escalating)
        ));

        // already high: repeating high is not another escalation
        let verdict = arbiter.evaluate(&warning("Bike 6 feet ahead", ThreatLevel::High), &mut search, T0 + 200);
        assert_eq!(verdict, Verdict::Suppress);
    }

    #[test]
    fn new_object_bypasses_cooldown() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        arbiter.evaluate(&warning("Stairs 5 steps ahead", ThreatLevel::Low), &mut search, T0);
        let verdict = arbiter.evaluate(&warning("Curb 5 steps ahead", ThreatLevel::Low), &mut search, T0 + 10);
        assert!(matches!(verdict, Verdict::Speak { reason: SpeakReason::NewObject, .. }));
    }

    #[test]
    fn avoidance_is_appended() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        let report = HazardReport {
            avoidance: Some("Step left".to_string()),
            ..warning("Pole 3 feet ahead", ThreatLevel::High)
        };
        let verdict = arbiter.evaluate(&report, &mut search, T0);
        assert_eq!(spoken_text(&verdict), "Pole 3 feet ahead. Step left");
        // only the warning is remembered
        assert_eq!(arbiter.last_spoken().spoken_text, "Pole 3 feet ahead");
    }

    #[test]
    fn empty_warning_says_nothing() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        assert_eq!(
            arbiter.evaluate(&HazardReport::default(), &mut search, T0),
            Verdict::Suppress
        );
        assert_eq!(arbiter.last_spoken(), &LastSpokenState::default());
    }

    #[test]
    fn target_reached_wins_and_clears_search() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        search.set("front door");
        let report = HazardReport {
            target_reached: true,
            guidance: Some("Door straight ahead".to_string()),
            ..warning("Car crossing path", ThreatLevel::High)
        };

        let verdict = arbiter.evaluate(&report, &mut search, T0);
        assert!(matches!(
            verdict,
            Verdict::Speak { reason: SpeakReason::TargetReached, ref alert }
                if alert.text == "You have reached the front door"
                    && alert.haptic == Some(HapticPattern::Arrival)
        ));
        assert!(!search.is_active());
        assert_eq!(arbiter.last_spoken(), &LastSpokenState::default());
    }

    #[test]
    fn target_reached_without_search_is_ignored() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        let report = HazardReport {
            target_reached: true,
            ..HazardReport::default()
        };
        assert_eq!(arbiter.evaluate(&report, &mut search, T0), Verdict::Suppress);
    }

    #[test]
    fn guidance_always_speaks_without_touching_hazard_state() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        arbiter.evaluate(&warning("Stairs 5 steps ahead", ThreatLevel::Low), &mut search, T0);
        let before = arbiter.last_spoken().clone();

        search.set("bench");
        let report = HazardReport {
            guidance: Some("Bench at 10 o'clock, 4 steps".to_string()),
            ..HazardReport::default()
        };
        for offset in [1, 2, 3] {
            let verdict = arbiter.evaluate(&report, &mut search, T0 + offset);
            assert!(matches!(verdict, Verdict::Speak { reason: SpeakReason::SearchGuidance, .. }));
        }
        assert_eq!(arbiter.last_spoken(), &before);
        assert!(search.is_active());
    }

    #[test]
    fn guidance_outside_search_falls_through_to_hazards() {
        let mut arbiter = SpeechArbiter::new();
        let mut search = SearchTargetTracker::new();
        let report = HazardReport {
            guidance: Some("ignored".to_string()),
            ..warning("Curb ahead", ThreatLevel::Low)
        };
        let verdict = arbiter.evaluate(&report, &mut search, T0);
        assert_eq!(spoken_text(&verdict), "Curb ahead");
    }
}
