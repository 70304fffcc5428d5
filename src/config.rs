/// OpenStreetMap France "hot" style tiles.
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
pub const DEFAULT_ZOOM: u8 = 13;

/// Key the workout sequence is stored under.
pub const STORAGE_KEY: &str = "workouts";

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    /// Seconds spent panning when centering on a workout.
    pub pan_duration: f64,
    pub popup_max_width: u32,
    pub popup_min_width: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tile_url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            pan_duration: 1.0,
            popup_max_width: 250,
            popup_min_width: 100,
        }
    }
}

impl MapConfig {
    pub fn with_zoom(zoom: u8) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }
}
