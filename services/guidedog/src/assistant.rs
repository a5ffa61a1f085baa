//! Routes voice commands and position input to the monitor and navigator.

use crate::voice::{HELP_TEXT, InputLine, VoiceCommand};
use guidedog_core::Command;
use guidedog_core::monitor::HazardMonitor;
use guidedog_core::navigator::Navigator;
use guidedog_core::waypoint::PositionFix;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc::{self, Sender};

const REPLY_RATE: f32 = 1.0;
const FIX_QUEUE: usize = 32;

pub const NAVIGATION_UNAVAILABLE: &str =
    "Navigation is unavailable: GOOGLE_MAPS_API_KEY is not set";
pub const NO_LOCATION: &str = "Waiting for a location fix before starting navigation";

pub struct Assistant {
    monitor: HazardMonitor,
    navigator: Option<Navigator>,
    commands: Sender<Command>,
    last_fix: Mutex<Option<PositionFix>>,
    /// Feed for the active navigation session's fix subscription.
    fix_feed: Mutex<Option<mpsc::Sender<PositionFix>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Assistant {
    pub fn new(
        monitor: HazardMonitor,
        navigator: Option<Navigator>,
        commands: Sender<Command>,
    ) -> Self {
        Self {
            monitor,
            navigator,
            commands,
            last_fix: Mutex::new(None),
            fix_feed: Mutex::new(None),
        }
    }

    pub async fn handle_line(&self, line: InputLine) {
        match line {
            InputLine::Fix(fix) => self.on_fix(fix),
            InputLine::Heading(degrees) => {
                if let Some(navigator) = &self.navigator {
                    navigator.set_compass_heading(Some(degrees));
                }
            }
            InputLine::Voice(text) => self.handle_voice(&text).await,
            InputLine::Empty => {}
        }
    }

    /// Records the fix and forwards it to the navigation session, if any.
    pub fn on_fix(&self, fix: PositionFix) {
        *lock(&self.last_fix) = Some(fix);
        let mut feed = lock(&self.fix_feed);
        let Some(sender) = feed.as_ref() else {
            return;
        };
        match sender.try_send(fix) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Navigation is behind, dropping fix");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // session ended on arrival
                *feed = None;
            }
        }
    }

    pub async fn handle_voice(&self, transcript: &str) {
        let command = VoiceCommand::parse(transcript);
        tracing::info!("Heard {:?} -> {:?}", transcript, command);

        match command {
            VoiceCommand::DescribeScene => {
                self.say("Analyzing scene now").await;
                if let Err(e) = self.monitor.describe_scene().await {
                    tracing::warn!("{}", e);
                }
            }
            VoiceCommand::FindObject(query) if query.is_empty() => {
                self.say("What would you like me to find?").await;
            }
            VoiceCommand::FindObject(query) => {
                self.say(&format!("Looking for {query}")).await;
                if let Err(e) = self.monitor.find_object(&query).await {
                    tracing::warn!("{}", e);
                }
            }
            VoiceCommand::CancelSearch => match self.monitor.cancel_search() {
                Some(query) => self.say(&format!("Stopped looking for {query}")).await,
                None => self.say("No search in progress").await,
            },
            VoiceCommand::Navigate(destination) => self.navigate(&destination).await,
            VoiceCommand::StopNavigation => {
                if let Some(navigator) = &self.navigator {
                    navigator.stop();
                }
                *lock(&self.fix_feed) = None;
                self.say("Navigation stopped").await;
            }
            VoiceCommand::NextStep => {
                let advanced = match &self.navigator {
                    Some(navigator) => navigator.next().await,
                    None => false,
                };
                if !advanced {
                    self.say("No active navigation").await;
                }
            }
            VoiceCommand::RepeatStep => {
                let repeated = match &self.navigator {
                    Some(navigator) => navigator.repeat().await,
                    None => false,
                };
                if !repeated {
                    self.say("No active navigation").await;
                }
            }
            VoiceCommand::StartMonitoring => {
                if let Err(e) = self.monitor.start().await {
                    tracing::warn!("{}", e);
                }
            }
            VoiceCommand::StopMonitoring => {
                self.monitor.stop();
                self.say("Monitoring stopped").await;
            }
            VoiceCommand::Help => self.say(HELP_TEXT).await,
            VoiceCommand::Unrecognized(text) => {
                self.say(&format!(
                    "I heard: {text}. Say 'help' for available commands."
                ))
                .await;
            }
        }
    }

    async fn navigate(&self, destination: &str) {
        let Some(navigator) = &self.navigator else {
            self.notify(NAVIGATION_UNAVAILABLE).await;
            return;
        };
        let last_fix = *lock(&self.last_fix);
        let Some(origin) = last_fix else {
            self.notify(NO_LOCATION).await;
            return;
        };

        let (sender, fixes) = mpsc::channel(FIX_QUEUE);
        match navigator.start(destination, origin.location(), fixes).await {
            Ok(()) => *lock(&self.fix_feed) = Some(sender),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    async fn say(&self, text: &str) {
        self.send(Command::speak(text, REPLY_RATE)).await;
    }

    async fn notify(&self, text: &str) {
        self.send(Command::Notify(text.to_string())).await;
    }

    async fn send(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            tracing::warn!("Command receiver dropped");
        }
    }

    /// Stops monitoring and navigation together.
    pub fn shutdown(&self) {
        self.monitor.stop();
        if let Some(navigator) = &self.navigator {
            navigator.stop();
        }
        *lock(&self.fix_feed) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use guidedog_core::ImageQuality;
    use guidedog_core::analyzer::{Camera, VisionAnalyzer};
    use guidedog_core::directions::DirectionsProvider;
    use guidedog_core::geo::LatLng;
    use guidedog_types::DirectionsResponse;
    use std::sync::Arc;

    struct StillCamera;

    #[async_trait]
    impl Camera for StillCamera {
        async fn open(&self) -> Result<()> {
            Ok(())
        }
        async fn grab_frame(&self, _: ImageQuality) -> Result<String> {
            Ok("data:image/jpeg;base64,AAAA".to_string())
        }
        fn release(&self) {}
        fn is_open(&self) -> bool {
            true
        }
    }

    struct CannedAnalyzer;

    #[async_trait]
    impl VisionAnalyzer for CannedAnalyzer {
        async fn analyze_hazards(&self, _: String, _: Option<String>) -> Result<String> {
            Ok(r#"{"warning": "", "threatLevel": "none"}"#.to_string())
        }
        async fn describe_scene(&self, _: String) -> Result<String> {
            Ok("An empty hallway".to_string())
        }
        async fn find_object(&self, _: String, query: String) -> Result<String> {
            Ok(format!("The {query} is at 12 o'clock, 5 steps away"))
        }
    }

    struct OneStepRoute;

    #[async_trait]
    impl DirectionsProvider for OneStepRoute {
        async fn directions(&self, origin: LatLng, destination: String) -> Result<DirectionsResponse> {
            if destination == "nowhere" {
                return Err(anyhow!("no route"));
            }
            let body = format!(
                r#"{{"status": "OK", "routes": [{{"legs": [{{"steps": [{{
                    "html_instructions": "Walk to <b>{destination}</b>",
                    "distance": {{"text": "50 m", "value": 50}},
                    "duration": {{"text": "1 min", "value": 40}},
                    "start_location": {{"lat": {lat}, "lng": {lng}}},
                    "end_location": {{"lat": {end}, "lng": {lng}}}
                }}]}}]}}]}}"#,
                lat = origin.lat,
                lng = origin.lng,
                end = origin.lat + 0.00045,
            );
            Ok(serde_json::from_str(&body)?)
        }
    }

    fn assistant(with_navigation: bool) -> (Assistant, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(64);
        let monitor = HazardMonitor::new(Arc::new(StillCamera), Arc::new(CannedAnalyzer), tx.clone());
        let navigator =
            with_navigation.then(|| Navigator::new(Arc::new(OneStepRoute), tx.clone()));
        (Assistant::new(monitor, navigator, tx), rx)
    }

    fn spoken(rx: &mut mpsc::Receiver<Command>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            match command {
                Command::Speak { text, .. } => out.push(text),
                Command::Notify(text) => out.push(format!("notice: {text}")),
                _ => {}
            }
        }
        out
    }

    fn fix(lat: f64, lng: f64) -> PositionFix {
        PositionFix {
            lat,
            lng,
            heading_degrees: None,
            timestamp_ms: 0,
        }
    }

    fn assert_send<T: Send>(_: T) {}

    #[tokio::test]
    async fn voice_handling_can_be_spawned() {
        let (assistant, _rx) = assistant(true);
        assert_send(assistant.handle_voice("start monitoring"));
        assert_send(assistant.handle_line(InputLine::Voice("navigate to the park".to_string())));
    }

    #[tokio::test]
    async fn help_and_unrecognized() {
        let (assistant, mut rx) = assistant(false);
        assistant.handle_voice("help").await;
        assistant.handle_voice("sing a song").await;
        assert_eq!(
            spoken(&mut rx),
            vec![
                HELP_TEXT.to_string(),
                "I heard: sing a song. Say 'help' for available commands.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn scene_and_search() {
        let (assistant, mut rx) = assistant(false);
        assistant.handle_voice("What do you see?").await;
        assistant.handle_voice("find me").await;
        assistant.handle_voice("find me the exit").await;
        assistant.handle_voice("stop looking").await;
        assistant.handle_voice("cancel search").await;
        assert_eq!(
            spoken(&mut rx),
            vec![
                "Analyzing scene now",
                "An empty hallway",
                "What would you like me to find?",
                "Looking for the exit",
                "The the exit is at 12 o'clock, 5 steps away",
                "Stopped looking for the exit",
                "No search in progress",
            ]
        );
    }

    #[tokio::test]
    async fn navigation_needs_key_and_location() {
        let (without, mut rx) = assistant(false);
        without.handle_voice("navigate to the park").await;
        assert_eq!(spoken(&mut rx), vec![format!("notice: {NAVIGATION_UNAVAILABLE}")]);

        let (with, mut rx) = assistant(true);
        with.handle_voice("navigate to the park").await;
        assert_eq!(spoken(&mut rx), vec![format!("notice: {NO_LOCATION}")]);
    }

    #[tokio::test]
    async fn fixes_reach_the_session() {
        let (assistant, mut rx) = assistant(true);
        assistant.handle_line(InputLine::Fix(fix(40.0, -73.0))).await;
        assistant.handle_voice("take me to the park").await;
        assert_eq!(
            spoken(&mut rx),
            vec!["Starting navigation to the park. Walk to the park, 50 m"]
        );

        // about 50 m away, then within arrival range
        assistant.on_fix(fix(40.0, -73.0));
        assistant.on_fix(fix(40.0004, -73.0));
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(spoken(&mut rx), vec!["You have arrived at the park"]);

        assistant.handle_voice("next step").await;
        assert_eq!(spoken(&mut rx), vec!["No active navigation"]);
    }

    #[tokio::test]
    async fn failed_lookup_keeps_no_feed() {
        let (assistant, mut rx) = assistant(true);
        assistant.on_fix(fix(40.0, -73.0));
        assistant.handle_voice("navigate to nowhere").await;
        assert!(lock(&assistant.fix_feed).is_none());
        assert_eq!(
            spoken(&mut rx),
            vec!["notice: Could not find directions to nowhere"]
        );
    }
}
