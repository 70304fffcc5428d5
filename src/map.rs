use crate::config::MapConfig;
use crate::dlog;
use crate::types::{Coords, Workout, WorkoutId};
use anyhow::Result;
use std::collections::HashMap;

/// Opaque handle to a marker owned by the map widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub content: String,
    pub class_name: String,
    pub max_width: u32,
    pub min_width: u32,
    pub auto_close: bool,
    pub close_on_click: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOptions {
    pub animate: bool,
    /// Pan duration in seconds.
    pub pan_duration: f64,
}

/// The interactive map we draw on.
pub trait MapWidget {
    fn set_view(&mut self, center: Coords, zoom: u8, opts: ViewOptions);
    fn add_tile_layer(&mut self, url: &str, attribution: &str);
    /// Place a marker with an open popup.
    fn add_marker(&mut self, coords: Coords, popup: &Popup) -> MarkerHandle;
    fn remove_marker(&mut self, handle: MarkerHandle);
}

/// One-shot source of the user's current position.
pub trait Geolocator {
    fn current_position(&mut self) -> Result<Coords>;
}

/// Wraps a [`MapWidget`] and remembers which marker belongs to which workout.
pub struct MapAdapter<W: MapWidget> {
    widget: W,
    config: MapConfig,
    markers: HashMap<WorkoutId, MarkerHandle>,
}

impl<W: MapWidget> MapAdapter<W> {
    pub fn init(mut widget: W, center: Coords, config: MapConfig) -> Self {
        tracing::info!(
            lat = center.lat,
            lng = center.lng,
            "https://www.google.com/maps/@{},{}",
            center.lat,
            center.lng
        );
        widget.set_view(
            center,
            config.zoom,
            ViewOptions {
                animate: false,
                pan_duration: 0.0,
            },
        );
        widget.add_tile_layer(&config.tile_url, &config.attribution);
        Self {
            widget,
            config,
            markers: HashMap::new(),
        }
    }

    pub fn popup_for(&self, workout: &Workout) -> Popup {
        let kind = workout.kind();
        Popup {
            content: format!("{} {}", kind.emoji(), workout.description),
            class_name: format!("{}-popup", kind.tag()),
            max_width: self.config.popup_max_width,
            min_width: self.config.popup_min_width,
            auto_close: false,
            close_on_click: false,
        }
    }

    pub fn add_marker(&mut self, workout: &Workout) {
        let popup = self.popup_for(workout);
        let handle = self.widget.add_marker(workout.coords, &popup);
        if let Some(old) = self.markers.insert(workout.id.clone(), handle) {
            self.widget.remove_marker(old);
        }
    }

    pub fn remove_marker(&mut self, id: &WorkoutId) {
        match self.markers.remove(id) {
            Some(handle) => self.widget.remove_marker(handle),
            None => {
                dlog!("no marker for workout id={id}");
            }
        }
    }

    pub fn clear_markers(&mut self) {
        for (_, handle) in self.markers.drain() {
            self.widget.remove_marker(handle);
        }
    }

    /// Drop every marker and place one per workout.
    pub fn sync(&mut self, workouts: &[Workout]) {
        self.clear_markers();
        for w in workouts {
            self.add_marker(w);
        }
    }

    pub fn center_on(&mut self, coords: Coords) {
        self.widget.set_view(
            coords,
            self.config.zoom,
            ViewOptions {
                animate: true,
                pan_duration: self.config.pan_duration,
            },
        );
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn has_marker(&self, id: &WorkoutId) -> bool {
        self.markers.contains_key(id)
    }

    pub const fn widget(&self) -> &W {
        &self.widget
    }
}
