//! Turn-by-turn progress along a walking route: staged announcements as a
//! waypoint approaches, auto-advance, and heading-relative instructions.

use crate::geo::{LatLng, bearing_degrees, distance_meters, relative_direction};
use crate::{Alert, HapticPattern};
use guidedog_types::{DirectionsResponse, DirectionsStatus, Step};
use regex::Regex;
use std::sync::LazyLock;

pub const NAV_RATE: f32 = 0.9;
/// Closer than this to a waypoint counts as reaching it.
pub const ADVANCE_RADIUS_M: f64 = 15.0;
/// Minimum movement between fixes before a GPS course is trusted.
pub const MIN_COURSE_DISTANCE_M: f64 = 3.0;

static COMPASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(northeast|northwest|southeast|southwest|north|south|east|west)\b")
        .expect("valid compass pattern")
});
static CONTINUE_ONTO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcontinue onto\b").expect("valid continue pattern"));
static DIV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<div[^>]*>").expect("valid div pattern"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub instruction_text: String,
    pub distance_text: String,
    pub duration_text: String,
    pub end_location: LatLng,
}

impl From<&Step> for RouteStep {
    fn from(step: &Step) -> Self {
        Self {
            instruction_text: strip_html(&step.html_instructions),
            distance_text: step.distance.text.clone(),
            duration_text: step.duration.text.clone(),
            end_location: step.end_location.into(),
        }
    }
}

/// A position sample from the location stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub lat: f64,
    pub lng: f64,
    pub heading_degrees: Option<f64>,
    pub timestamp_ms: u64,
}

impl PositionFix {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Staged pre-turn announcements, each spoken at most once per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Fifty,
    Twenty,
}

impl Band {
    const ALL: [Band; 2] = [Band::Fifty, Band::Twenty];

    fn meters(self) -> u32 {
        match self {
            Band::Fifty => 50,
            Band::Twenty => 20,
        }
    }

    /// (meters - 5, meters]
    fn contains(self, distance: f64) -> bool {
        let outer = f64::from(self.meters());
        distance > outer - 5.0 && distance <= outer
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSession {
    steps: Vec<RouteStep>,
    current_index: usize,
    destination_label: String,
    announced: [bool; 2],
}

impl NavigationSession {
    /// `None` for an empty route.
    pub fn new(steps: Vec<RouteStep>, destination_label: impl Into<String>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            steps,
            current_index: 0,
            destination_label: destination_label.into(),
            announced: [false; 2],
        })
    }

    /// Steps of the first leg of the first route. `None` unless the lookup
    /// succeeded with at least one step.
    pub fn from_directions(
        response: &DirectionsResponse,
        destination_label: impl Into<String>,
    ) -> Option<Self> {
        if response.status != DirectionsStatus::Ok {
            return None;
        }
        let steps = response.primary_steps().iter().map(RouteStep::from).collect();
        Self::new(steps, destination_label)
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_step(&self) -> Option<&RouteStep> {
        self.steps.get(self.current_index)
    }

    pub fn destination_label(&self) -> &str {
        &self.destination_label
    }

    /// Moves to the next step. Returns false once past the last one.
    fn advance(&mut self) -> bool {
        self.current_index += 1;
        self.announced = [false; 2];
        self.current_index < self.steps.len()
    }
}

/// Follows position fixes against the active [`NavigationSession`].
///
/// Heading comes from, in order: the device compass, the fix itself, or the
/// course between the last two fixes that were at least
/// [`MIN_COURSE_DISTANCE_M`] apart. Without any heading instructions are
/// spoken as the directions service wrote them.
#[derive(Debug, Default)]
pub struct WaypointTracker {
    session: Option<NavigationSession>,
    compass_heading: Option<f64>,
    fix_heading: Option<f64>,
    course: Option<f64>,
    course_anchor: Option<LatLng>,
    last_position: Option<LatLng>,
}

impl WaypointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any active session and returns the opening announcement.
    pub fn start(&mut self, session: NavigationSession, origin: Option<LatLng>) -> Alert {
        if origin.is_some() {
            self.last_position = origin;
        }
        let destination = session.destination_label.clone();
        self.session = Some(session);
        let opening = self.current_instruction().unwrap_or_default();
        tracing::info!("Navigation to {} started", destination);
        Alert::new(
            format!("Starting navigation to {destination}. {opening}"),
            NAV_RATE,
        )
    }

    /// Drops the session. Returns whether one was active.
    pub fn stop(&mut self) -> bool {
        self.session.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    pub fn set_compass_heading(&mut self, heading: Option<f64>) {
        self.compass_heading = heading.filter(|h| h.is_finite());
    }

    pub fn heading(&self) -> Option<f64> {
        self.compass_heading.or(self.fix_heading).or(self.course)
    }

    pub fn on_fix(&mut self, fix: &PositionFix) -> Option<Alert> {
        let position = fix.location();
        self.track_heading(fix);
        self.last_position = Some(position);

        let session = self.session.as_mut()?;
        let waypoint = session.current_step()?.end_location;
        let distance = distance_meters(position, waypoint);

        if distance < ADVANCE_RADIUS_M {
            tracing::debug!("Reached waypoint {} ({:.1} m)", session.current_index, distance);
            return self.advance();
        }

        let band = Band::ALL
            .into_iter()
            .find(|band| band.contains(distance) && !session.announced[band.index()])?;
        session.announced[band.index()] = true;
        let step = session.current_step()?.clone();
        let instruction = self.spoken_instruction(&step);
        Some(Alert::new(
            format!("In {} meters, {}", band.meters(), instruction),
            NAV_RATE,
        ))
    }

    /// The current step again, without changing progress.
    pub fn repeat_current_step(&self) -> Option<Alert> {
        self.current_instruction()
            .map(|text| Alert::new(text, NAV_RATE))
    }

    /// Manual advance, same as reaching the waypoint.
    pub fn next_step(&mut self) -> Option<Alert> {
        self.advance()
    }

    fn advance(&mut self) -> Option<Alert> {
        let session = self.session.as_mut()?;
        if !session.advance() {
            let destination = session.destination_label.clone();
            self.session = None;
            tracing::info!("Arrived at {}", destination);
            return Some(
                Alert::new(format!("You have arrived at {destination}"), NAV_RATE)
                    .with_haptic(HapticPattern::Arrival),
            );
        }
        self.current_instruction()
            .map(|text| Alert::new(text, NAV_RATE).with_haptic(HapticPattern::Pulse))
    }

    /// "<instruction>, <distance>" for the current step.
    fn current_instruction(&self) -> Option<String> {
        let step = self.session.as_ref()?.current_step()?;
        Some(format!(
            "{}, {}",
            self.spoken_instruction(step),
            step.distance_text
        ))
    }

    fn spoken_instruction(&self, step: &RouteStep) -> String {
        let text = CONTINUE_ONTO_RE.replace_all(&step.instruction_text, "Continue on");
        let direction = self.last_position.and_then(|position| {
            relative_direction(bearing_degrees(position, step.end_location), self.heading())
        });
        match direction {
            Some(direction) => COMPASS_RE
                .replace_all(&text, direction.phrase())
                .into_owned(),
            None => text.into_owned(),
        }
    }

    fn track_heading(&mut self, fix: &PositionFix) {
        self.fix_heading = fix.heading_degrees.filter(|h| h.is_finite());
        let position = fix.location();
        match self.course_anchor {
            Some(anchor) if distance_meters(anchor, position) >= MIN_COURSE_DISTANCE_M => {
                self.course = Some(bearing_degrees(anchor, position));
                self.course_anchor = Some(position);
            }
            Some(_) => {}
            None => self.course_anchor = Some(position),
        }
    }
}

/// Plain text from a directions instruction: `<div>` blocks become separate
/// sentences, other markup is dropped.
pub fn strip_html(html: &str) -> String {
    DIV_RE
        .split(html)
        .map(|segment| {
            let text = TAG_RE.replace_all(segment, "");
            let text = decode_entities(&text);
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            text.trim_end_matches('.').to_string()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
