use crate::directions::DirectionsProvider;
use crate::geo::LatLng;
use crate::waypoint::{NavigationSession, PositionFix, WaypointTracker};
use crate::{Alert, Command};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("No walking route to {0}")]
    DirectionsNotFound(String),
    #[error("Directions request failed: {0:#}")]
    Service(anyhow::Error),
}

/// Async driver around [`WaypointTracker`]: looks up the route, then follows
/// one position-fix subscription per session.
pub struct Navigator {
    provider: Arc<dyn DirectionsProvider>,
    commands: Sender<Command>,
    tracker: Arc<Mutex<WaypointTracker>>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Navigator {
    pub fn new(provider: Arc<dyn DirectionsProvider>, commands: Sender<Command>) -> Self {
        Self {
            provider,
            commands,
            tracker: Arc::new(Mutex::new(WaypointTracker::new())),
            subscription: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.tracker).is_active()
    }

    pub fn current_step_index(&self) -> Option<usize> {
        lock(&self.tracker).session().map(|s| s.current_index())
    }

    /// Fetches walking directions from `origin` and starts following `fixes`.
    /// Any previous session and subscription are replaced. On failure the
    /// user is notified and nothing is started.
    pub async fn start(
        &self,
        destination: &str,
        origin: LatLng,
        fixes: Receiver<PositionFix>,
    ) -> Result<(), NavigationError> {
        let response = match self
            .provider
            .directions(origin, destination.to_string())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Directions lookup for '{}' failed: {:#}", destination, e);
                self.emit(Command::Notify(format!(
                    "Could not find directions to {destination}"
                )))
                .await;
                return Err(NavigationError::Service(e));
            }
        };

        let Some(session) = NavigationSession::from_directions(&response, destination) else {
            tracing::warn!(
                "No route to '{}': {:?} {}",
                destination,
                response.status,
                response.error_message.as_deref().unwrap_or_default()
            );
            self.emit(Command::Notify(format!(
                "Could not find directions to {destination}"
            )))
            .await;
            return Err(NavigationError::DirectionsNotFound(destination.to_string()));
        };
        tracing::info!("Route to '{}' has {} steps", destination, session.steps().len());

        self.cancel_subscription();
        let opening = lock(&self.tracker).start(session, Some(origin));
        self.announce(opening).await;
        self.subscribe(fixes);
        Ok(())
    }

    /// Drops the session and its fix subscription, and silences speech.
    /// Safe to call repeatedly.
    pub fn stop(&self) {
        self.cancel_subscription();
        if lock(&self.tracker).stop() {
            tracing::info!("Navigation stopped");
        }
        if let Err(e) = self.commands.try_send(Command::StopSpeaking) {
            tracing::warn!("Could not queue command: {}", e);
        }
    }

    pub fn set_compass_heading(&self, heading: Option<f64>) {
        lock(&self.tracker).set_compass_heading(heading);
    }

    /// Re-speaks the current step. Returns false without a session.
    pub async fn repeat(&self) -> bool {
        let alert = lock(&self.tracker).repeat_current_step();
        match alert {
            Some(alert) => {
                self.announce(alert).await;
                true
            }
            None => false,
        }
    }

    /// Skips to the next step, or arrives if on the last one.
    pub async fn next(&self) -> bool {
        let alert = lock(&self.tracker).next_step();
        let Some(alert) = alert else {
            return false;
        };
        self.announce(alert).await;
        if !self.is_active() {
            self.cancel_subscription();
        }
        true
    }

    fn subscribe(&self, mut fixes: Receiver<PositionFix>) {
        let tracker = Arc::clone(&self.tracker);
        let commands = self.commands.clone();
        let handle = tokio::spawn(async move {
            while let Some(fix) = fixes.recv().await {
                let (alert, active) = {
                    let mut tracker = lock(&tracker);
                    let alert = tracker.on_fix(&fix);
                    (alert, tracker.is_active())
                };
                if let Some(alert) = alert {
                    tracing::info!("Navigation: {}", alert.text);
                    for command in alert.into_commands() {
                        if commands.send(command).await.is_err() {
                            return;
                        }
                    }
                }
                if !active {
                    tracing::debug!("Session ended, dropping fix subscription");
                    break;
                }
            }
        });
        *lock(&self.subscription) = Some(handle);
    }

    fn cancel_subscription(&self) {
        if let Some(handle) = lock(&self.subscription).take() {
            handle.abort();
        }
    }

    async fn announce(&self, alert: Alert) {
        tracing::info!("Navigation: {}", alert.text);
        for command in alert.into_commands() {
            self.emit(command).await;
        }
    }

    async fn emit(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            tracing::warn!("Command receiver dropped");
        }
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        self.cancel_subscription();
    }
}
