pub mod analyzer;
pub mod arbiter;
pub mod directions;
pub mod geo;
pub mod hazard;
pub mod monitor;
pub mod navigator;
pub mod search;
pub mod threat;
pub mod waypoint;

pub use guidedog_native_utils::ImageQuality;
pub use guidedog_types::ThreatLevel;

use threat::ThreatState;

/// Commands the engine issues to the runtime.
///
/// The engine decides *what* to say or play; the runtime owns the speech and
/// vibration devices and executes these. Speech is last-message-wins: a new
/// `Speak` cancels whatever utterance is still playing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Cancel any in-progress utterance, then speak `text`.
    Speak { text: String, rate: f32 },
    /// Cancel the current utterance immediately.
    StopSpeaking,
    /// Fire-and-forget vibration.
    Vibrate(HapticPattern),
    /// A user-visible notice (permission denial, failed request).
    Notify(String),
    /// The visible threat state changed.
    ThreatChanged(ThreatState),
}

impl Command {
    pub fn speak(text: impl Into<String>, rate: f32) -> Self {
        Command::Speak {
            text: text.into(),
            rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPattern {
    /// Single short pulse.
    Pulse,
    /// Three escalating pulses for high threats.
    Escalating,
    /// Three long pulses on arrival.
    Arrival,
    /// Quick triple tap confirming an action.
    Acknowledge,
}

impl HapticPattern {
    /// Alternating vibrate/pause durations in milliseconds.
    pub fn as_millis(&self) -> &'static [u64] {
        match self {
            HapticPattern::Pulse => &[100],
            HapticPattern::Escalating => &[100, 50, 100, 50, 100],
            HapticPattern::Arrival => &[200, 100, 200, 100, 200],
            HapticPattern::Acknowledge => &[50, 50, 50],
        }
    }
}

/// Something to say, optionally with a vibration.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub text: String,
    pub rate: f32,
    pub haptic: Option<HapticPattern>,
}

impl Alert {
    pub fn new(text: impl Into<String>, rate: f32) -> Self {
        Self {
            text: text.into(),
            rate,
            haptic: None,
        }
    }

    pub fn with_haptic(mut self, haptic: HapticPattern) -> Self {
        self.haptic = Some(haptic);
        self
    }

    pub fn into_commands(self) -> Vec<Command> {
        let mut commands = vec![Command::Speak {
            text: self.text,
            rate: self.rate,
        }];
        if let Some(haptic) = self.haptic {
            commands.push(Command::Vibrate(haptic));
        }
        commands
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
