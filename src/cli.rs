use crate::list::SortKey;
use crate::types::{ActivityKind, Coords};
use clap::{ArgAction, Parser, Subcommand};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const DEFAULT_DB: &str = "mapty.sqlite3";

static COORDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*[,;\s]\s*(-?\d+(?:\.\d+)?)\s*$")
        .unwrap_or_else(|e| panic!("coords regex: {e}"))
});

/// Parse `LAT,LNG` (comma, semicolon or space separated).
pub fn parse_coords(s: &str) -> Result<Coords, String> {
    let caps = COORDS_RE
        .captures(s)
        .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
    let lat: f64 = caps[1].parse().map_err(|e| format!("latitude: {e}"))?;
    let lng: f64 = caps[2].parse().map_err(|e| format!("longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude out of range: {lat}"));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(format!("longitude out of range: {lng}"));
    }
    Ok(Coords::new(lat, lng))
}

#[derive(Parser, Debug)]
#[command(
    name = "mapty",
    about = "Log running and cycling workouts on a map and keep them in a local store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,

    /// SQLite file holding the workout store.
    #[arg(long, env = "MAPTY_DB", default_value = DEFAULT_DB, global = true)]
    pub db: PathBuf,

    /// Current position as LAT,LNG. Without it the map is not loaded.
    #[arg(long, env = "MAPTY_LOCATION", value_parser = parse_coords, global = true)]
    pub location: Option<Coords>,

    /// Map zoom level.
    #[arg(long, default_value_t = crate::config::DEFAULT_ZOOM, global = true)]
    pub zoom: u8,

    /// Accept zero or negative elevation for rides.
    #[arg(long, global = true)]
    pub allow_descent: bool,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Add a workout at a point on the map.
    Add {
        /// Where the workout happened, as LAT,LNG.
        #[arg(long, value_parser = parse_coords)]
        at: Coords,

        #[arg(long, value_enum, default_value_t = ActivityKind::Running)]
        kind: ActivityKind,

        /// Distance in km.
        #[arg(long, allow_hyphen_values = true)]
        distance: String,

        /// Duration in minutes.
        #[arg(long, allow_hyphen_values = true)]
        duration: String,

        /// Steps per minute (running).
        #[arg(long, allow_hyphen_values = true)]
        cadence: Option<String>,

        /// Elevation gain in meters (cycling).
        #[arg(long, allow_hyphen_values = true)]
        elevation: Option<String>,
    },

    /// Print the workout list.
    List {
        #[arg(long, value_enum)]
        sort: Option<SortKey>,

        /// Largest (or newest) first.
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Change distance, duration, cadence or elevation of a workout.
    Edit {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        distance: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        duration: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        cadence: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        elevation: Option<String>,
    },

    /// Delete one workout.
    Delete { id: String },

    /// Center the map on a workout.
    Center { id: String },

    /// Remove every workout.
    Reset {
        /// Do not ask for confirmation.
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
