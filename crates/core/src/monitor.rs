//! The recurring hazard-analysis loop plus the one-shot scene and
//! find-object requests that share its camera.

use crate::analyzer::{Camera, VisionAnalyzer};
use crate::arbiter::{SpeechArbiter, Verdict};
use crate::hazard::HazardReport;
use crate::search::SearchTargetTracker;
use crate::threat::{ThreatState, ThreatStateMachine};
use crate::{Command, HapticPattern, ImageQuality, now_ms};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3_000);
/// Activation notices and one-shot results are read a little slower.
pub const NOTICE_RATE: f32 = 0.9;

pub const MONITORING_ACTIVE: &str = "Continuous safety monitoring active";
pub const CAMERA_DENIED: &str =
    "Camera access denied: continuous monitoring requires camera access";
pub const SCENE_FAILED: &str = "Could not analyze the scene. Please try again.";

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Camera unavailable: {0:#}")]
    CameraUnavailable(anyhow::Error),
    #[error("Frame capture failed: {0:#}")]
    Capture(anyhow::Error),
    #[error("Vision analysis failed: {0:#}")]
    Analysis(anyhow::Error),
    #[error("Search query is empty")]
    EmptyQuery,
}

/// Per-session alert state. Hazard cycles and voice commands both touch it,
/// always under the one lock, so updates are last-write-wins.
#[derive(Debug, Default)]
struct AlertEngine {
    threat: ThreatStateMachine,
    arbiter: SpeechArbiter,
    search: SearchTargetTracker,
}

struct Shared {
    camera: Arc<dyn Camera>,
    analyzer: Arc<dyn VisionAnalyzer>,
    commands: Sender<Command>,
    engine: Mutex<AlertEngine>,
    in_flight: AtomicBool,
    /// Cleared by `stop` so a ticker caught mid-tick cannot spawn a cycle.
    running: AtomicBool,
    cycle: Mutex<Option<AbortHandle>>,
}

/// Clears the in-flight flag when the cycle ends, including when its task is
/// aborted.
struct CycleGuard(Arc<Shared>);

impl CycleGuard {
    fn try_acquire(shared: &Arc<Shared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(Arc::clone(shared)))
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Drives hazard analysis on a fixed cadence.
///
/// At most one cycle is in flight: a tick that finds the previous cycle still
/// running is dropped, not queued. All results go out as [`Command`]s.
pub struct HazardMonitor {
    shared: Arc<Shared>,
    interval: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicked cycle must not wedge monitoring
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl HazardMonitor {
    pub fn new(
        camera: Arc<dyn Camera>,
        analyzer: Arc<dyn VisionAnalyzer>,
        commands: Sender<Command>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                camera,
                analyzer,
                commands,
                engine: Mutex::new(AlertEngine::default()),
                in_flight: AtomicBool::new(false),
                running: AtomicBool::new(false),
                cycle: Mutex::new(None),
            }),
            interval: DEFAULT_INTERVAL,
            ticker: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        lock(&self.ticker).is_some()
    }

    pub fn is_cycle_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn threat_state(&self) -> ThreatState {
        lock(&self.shared.engine).threat.state().clone()
    }

    pub fn active_search(&self) -> Option<String> {
        lock(&self.shared.engine)
            .search
            .active_query()
            .map(str::to_string)
    }

    /// Acquires the camera and starts the recurring cycle. The first tick
    /// fires one full interval from now. No-op while already running.
    pub async fn start(&self) -> Result<(), MonitorError> {
        if self.is_running() {
            tracing::debug!("Hazard monitoring already running");
            return Ok(());
        }
        self.shared.open_camera().await?;

        let period = self.interval;
        {
            let mut ticker_slot = lock(&self.ticker);
            if ticker_slot.is_some() {
                return Ok(());
            }
            self.shared.running.store(true, Ordering::Release);
            let shared = Arc::clone(&self.shared);
            let first_tick = Instant::now() + period;
            *ticker_slot = Some(tokio::spawn(async move {
                let mut ticker = time::interval_at(first_tick, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    Shared::tick(&shared, true);
                }
            }));
        }

        tracing::info!("Hazard monitoring started, every {:?}", period);
        self.shared.emit(Command::Vibrate(HapticPattern::Acknowledge)).await;
        self.shared
            .emit(Command::speak(MONITORING_ACTIVE, NOTICE_RATE))
            .await;
        Ok(())
    }

    /// Runs one cycle now unless one is already in flight. Returns whether a
    /// cycle was started.
    pub fn tick(&self) -> bool {
        Shared::tick(&self.shared, false)
    }

    /// Cancels the timer and any in-flight cycle, releases the camera, resets
    /// the threat state and silences speech. Safe to call repeatedly.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.abort();
            tracing::info!("Hazard monitoring stopped");
        }
        if let Some(cycle) = lock(&self.shared.cycle).take() {
            cycle.abort();
        }
        self.shared.camera.release();

        let was_alerting = {
            let mut engine = lock(&self.shared.engine);
            let was_alerting = engine.threat.state() != &ThreatState::default();
            engine.threat.reset();
            engine.arbiter.reset();
            was_alerting
        };
        if was_alerting {
            self.shared
                .try_emit(Command::ThreatChanged(ThreatState::default()));
        }
        self.shared.try_emit(Command::StopSpeaking);
    }

    /// One-shot description of what the camera sees, spoken when ready.
    pub async fn describe_scene(&self) -> Result<String, MonitorError> {
        let shared = &self.shared;
        if !shared.camera.is_open() {
            shared.open_camera().await?;
        }
        let result = async {
            let frame = shared
                .camera
                .grab_frame(ImageQuality::DETAIL)
                .await
                .map_err(MonitorError::Capture)?;
            shared
                .analyzer
                .describe_scene(frame)
                .await
                .map_err(MonitorError::Analysis)
        }
        .await;

        match result {
            Ok(description) => {
                shared
                    .emit(Command::speak(description.clone(), NOTICE_RATE))
                    .await;
                Ok(description)
            }
            Err(e) => {
                tracing::error!("Scene description failed: {}", e);
                shared.emit(Command::Notify(SCENE_FAILED.to_string())).await;
                Err(e)
            }
        }
    }

    /// Starts searching for `query`: speaks where it is now, and keeps hazard
    /// cycles in search mode until it is reached or the search is cancelled.
    pub async fn find_object(&self, query: &str) -> Result<String, MonitorError> {
        let shared = &self.shared;
        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(MonitorError::EmptyQuery);
        }
        // no search mode without a camera to search with
        if !shared.camera.is_open() {
            shared.open_camera().await?;
        }
        lock(&shared.engine).search.set(&query);
        let result = async {
            let frame = shared
                .camera
                .grab_frame(ImageQuality::DETAIL)
                .await
                .map_err(MonitorError::Capture)?;
            shared
                .analyzer
                .find_object(frame, query.clone())
                .await
                .map_err(MonitorError::Analysis)
        }
        .await;

        match result {
            Ok(found) => {
                shared.emit(Command::speak(found.clone(), NOTICE_RATE)).await;
                Ok(found)
            }
            Err(e) => {
                tracing::error!("Find object '{}' failed: {}", query, e);
                shared
                    .emit(Command::Notify(format!(
                        "Could not search for {query}. Please try again."
                    )))
                    .await;
                Err(e)
            }
        }
    }

    /// Drops the search target, returning it if one was active.
    pub fn cancel_search(&self) -> Option<String> {
        let cleared = lock(&self.shared.engine).search.clear();
        if let Some(query) = &cleared {
            tracing::info!("Search for '{}' cancelled", query);
        }
        cleared
    }
}

impl Drop for HazardMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    /// Scheduled ticks only run while monitoring; manual ones always may.
    fn tick(self: &Arc<Self>, scheduled: bool) -> bool {
        // held across the spawn so `stop` either sees the new handle or
        // has already cleared `running`
        let mut cycle = lock(&self.cycle);
        if scheduled && !self.running.load(Ordering::Acquire) {
            tracing::debug!("Monitoring stopped, ignoring tick");
            return false;
        }
        let Some(guard) = CycleGuard::try_acquire(self) else {
            tracing::debug!("Hazard cycle still in flight, skipping tick");
            return false;
        };
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = shared.run_cycle().await {
                tracing::error!("Hazard cycle failed: {}", e);
            }
        });
        *cycle = Some(handle.abort_handle());
        true
    }

    async fn run_cycle(&self) -> Result<(), MonitorError> {
        let frame = self
            .camera
            .grab_frame(ImageQuality::HAZARD)
            .await
            .map_err(MonitorError::Capture)?;
        let search_target = lock(&self.engine)
            .search
            .active_query()
            .map(str::to_string);
        let raw = self
            .analyzer
            .analyze_hazards(frame, search_target)
            .await
            .map_err(MonitorError::Analysis)?;
        let report = HazardReport::parse(&raw);

        let (changed, verdict) = {
            let mut engine = lock(&self.engine);
            let AlertEngine {
                threat,
                arbiter,
                search,
            } = &mut *engine;
            let changed = threat.apply(&report).then(|| threat.state().clone());
            let verdict = arbiter.evaluate(&report, search, now_ms());
            (changed, verdict)
        };

        if let Some(state) = changed {
            self.emit(Command::ThreatChanged(state)).await;
        }
        if let Verdict::Speak { reason, alert } = verdict {
            tracing::info!("Alert ({:?}): {}", reason, alert.text);
            for command in alert.into_commands() {
                self.emit(command).await;
            }
        }
        Ok(())
    }

    async fn open_camera(&self) -> Result<(), MonitorError> {
        if let Err(e) = self.camera.open().await {
            tracing::error!("Camera unavailable: {:#}", e);
            self.emit(Command::Notify(CAMERA_DENIED.to_string())).await;
            return Err(MonitorError::CameraUnavailable(e));
        }
        Ok(())
    }

    async fn emit(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            tracing::warn!("Command receiver dropped");
        }
    }

    fn try_emit(&self, command: Command) {
        if let Err(e) = self.commands.try_send(command) {
            tracing::warn!("Could not queue command: {}", e);
        }
    }
}
