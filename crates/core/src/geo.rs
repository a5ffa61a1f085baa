//! Great-circle distance, initial bearing, and heading-relative direction
//! buckets.

use guidedog_types::LatLngLiteral;
use std::fmt;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLngLiteral> for LatLng {
    fn from(value: LatLngLiteral) -> Self {
        Self::new(value.lat, value.lng)
    }
}

impl fmt::Display for LatLng {
    // "lat,lng", the origin format the directions service expects
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Haversine distance in meters.
pub fn distance_meters(a: LatLng, b: LatLng) -> f64 {
    if a == b {
        return 0.0;
    }
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `from` to `to`, in [0, 360).
pub fn bearing_degrees(from: LatLng, to: LatLng) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlng = (to.lng - from.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Wraps any angle into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Wraps any angle into (-180, 180].
pub fn signed_delta(degrees: f64) -> f64 {
    let wrapped = normalize_degrees(degrees);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Heading-relative direction, in 45° sectors centered on straight ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeDirection {
    StraightAhead,
    SlightlyRight,
    Right,
    SharpRight,
    Behind,
    SharpLeft,
    Left,
    SlightlyLeft,
}

impl RelativeDirection {
    pub const ALL: [RelativeDirection; 8] = [
        RelativeDirection::StraightAhead,
        RelativeDirection::SlightlyRight,
        RelativeDirection::Right,
        RelativeDirection::SharpRight,
        RelativeDirection::Behind,
        RelativeDirection::SharpLeft,
        RelativeDirection::Left,
        RelativeDirection::SlightlyLeft,
    ];

    /// Buckets a signed delta in (-180, 180]. Boundaries belong to the sector
    /// nearer straight ahead.
    pub fn from_delta(delta: f64) -> Self {
        let magnitude = delta.abs();
        let right = delta >= 0.0;
        match magnitude {
            m if m <= 22.5 => RelativeDirection::StraightAhead,
            m if m <= 67.5 => pick(right, Self::SlightlyRight, Self::SlightlyLeft),
            m if m <= 112.5 => pick(right, Self::Right, Self::Left),
            m if m <= 157.5 => pick(right, Self::SharpRight, Self::SharpLeft),
            _ => RelativeDirection::Behind,
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            RelativeDirection::StraightAhead => "straight ahead",
            RelativeDirection::SlightlyRight => "slightly right",
            RelativeDirection::Right => "right",
            RelativeDirection::SharpRight => "sharp right",
            RelativeDirection::Behind => "behind you",
            RelativeDirection::SharpLeft => "sharp left",
            RelativeDirection::Left => "left",
            RelativeDirection::SlightlyLeft => "slightly left",
        }
    }
}

fn pick(right: bool, r: RelativeDirection, l: RelativeDirection) -> RelativeDirection {
    if right { r } else { l }
}

impl fmt::Display for RelativeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Direction of `bearing` as seen by someone facing `heading`. `None` when
/// no heading is available.
pub fn relative_direction(bearing: f64, heading: Option<f64>) -> Option<RelativeDirection> {
    let heading = heading.filter(|h| h.is_finite())?;
    Some(RelativeDirection::from_delta(signed_delta(bearing - heading)))
}
