use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Latitude/longitude pair. Stored as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkoutId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ActivityKind {
    Running,
    Cycling,
}

impl ActivityKind {
    /// Storage tag, also used for the popup class name.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Running => "🏃",
            Self::Cycling => "🚴",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "running" => Some(Self::Running),
            "cycling" => Some(Self::Cycling),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Subtype-specific fields. The derived metric is computed from the shared
/// distance/duration and never set directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity {
    /// `pace` in min/km.
    Running { cadence: f64, pace: f64 },
    /// `speed` as `distance / duration / 60`.
    Cycling { elevation: f64, speed: f64 },
}

impl Activity {
    pub const fn kind(&self) -> ActivityKind {
        match self {
            Self::Running { .. } => ActivityKind::Running,
            Self::Cycling { .. } => ActivityKind::Cycling,
        }
    }

    /// Cadence for runs, elevation gain for rides.
    pub const fn parameter(&self) -> f64 {
        match *self {
            Self::Running { cadence, .. } => cadence,
            Self::Cycling { elevation, .. } => elevation,
        }
    }

    /// Pace for runs, speed for rides.
    pub const fn metric(&self) -> f64 {
        match *self {
            Self::Running { pace, .. } => pace,
            Self::Cycling { speed, .. } => speed,
        }
    }

    fn derive(kind: ActivityKind, distance: f64, duration: f64, parameter: f64) -> Self {
        match kind {
            ActivityKind::Running => Self::Running {
                cadence: parameter,
                pace: calc_pace(distance, duration),
            },
            ActivityKind::Cycling => Self::Cycling {
                elevation: parameter,
                speed: calc_speed(distance, duration),
            },
        }
    }
}

pub fn calc_pace(distance: f64, duration: f64) -> f64 {
    duration / distance
}

pub fn calc_speed(distance: f64, duration: f64) -> f64 {
    distance / duration / 60.0
}

/// One logged run or ride.
///
/// `distance > 0` and `duration > 0` are checked by the form layer before a
/// workout is built; the constructors trust their inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: WorkoutId,
    pub date: DateTime<Utc>,
    pub coords: Coords,
    /// km
    pub distance: f64,
    /// min
    pub duration: f64,
    pub activity: Activity,
    pub description: String,
    pub clicks: u32,
}

impl Workout {
    pub fn running(coords: Coords, distance: f64, duration: f64, cadence: f64) -> Self {
        Self::new(ActivityKind::Running, coords, distance, duration, cadence)
    }

    pub fn cycling(coords: Coords, distance: f64, duration: f64, elevation: f64) -> Self {
        Self::new(ActivityKind::Cycling, coords, distance, duration, elevation)
    }

    pub fn new(
        kind: ActivityKind,
        coords: Coords,
        distance: f64,
        duration: f64,
        parameter: f64,
    ) -> Self {
        Self::with_identity(
            kind,
            coords,
            distance,
            duration,
            parameter,
            Utc::now(),
            WorkoutId::generate(),
        )
    }

    /// Build a workout with a known date and id, e.g. when rehydrating from storage.
    pub fn with_identity(
        kind: ActivityKind,
        coords: Coords,
        distance: f64,
        duration: f64,
        parameter: f64,
        date: DateTime<Utc>,
        id: WorkoutId,
    ) -> Self {
        Self {
            id,
            date,
            coords,
            distance,
            duration,
            activity: Activity::derive(kind, distance, duration, parameter),
            description: describe(kind, date),
            clicks: 0,
        }
    }

    pub const fn kind(&self) -> ActivityKind {
        self.activity.kind()
    }

    /// Replace the measured values and recompute pace/speed. The kind, date,
    /// id and description stay as they were.
    pub fn update(&mut self, distance: f64, duration: f64, parameter: f64) {
        self.distance = distance;
        self.duration = duration;
        self.activity = Activity::derive(self.kind(), distance, duration, parameter);
    }

    pub fn click(&mut self) {
        self.clicks = self.clicks.saturating_add(1);
    }
}

/// "Running on April 14"
pub fn describe(kind: ActivityKind, date: DateTime<Utc>) -> String {
    format!("{} on {}", kind.label(), date.format("%B %-d"))
}
