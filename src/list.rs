use crate::types::{Activity, Workout, WorkoutId};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Distance,
    Duration,
    Date,
}

/// `Ascending` puts the smallest value (or the oldest date) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

fn compare(a: &Workout, b: &Workout, key: SortKey) -> Ordering {
    match key {
        SortKey::Distance => a.distance.total_cmp(&b.distance),
        SortKey::Duration => a.duration.total_cmp(&b.duration),
        SortKey::Date => a.date.cmp(&b.date),
    }
}

/// Stable in-place sort; ties keep their current relative order in both directions.
pub fn sort_workouts(workouts: &mut [Workout], key: SortKey, direction: SortDirection) {
    match direction {
        SortDirection::Ascending => workouts.sort_by(|a, b| compare(a, b, key)),
        SortDirection::Descending => workouts.sort_by(|a, b| compare(b, a, key)),
    }
}

/// A click inside the workout list, scoped to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Center(WorkoutId),
    Delete(WorkoutId),
    Edit(WorkoutId),
}

impl RowAction {
    pub const fn id(&self) -> &WorkoutId {
        match self {
            Self::Center(id) | Self::Delete(id) | Self::Edit(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.icon, self.value, self.unit)
    }
}

/// What one list entry shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub id: WorkoutId,
    pub title: String,
    pub details: [Detail; 4],
}

impl SummaryRow {
    pub fn from_workout(w: &Workout) -> Self {
        let kind = w.kind();
        let (metric, secondary) = match w.activity {
            Activity::Running { cadence, pace } => (
                Detail {
                    icon: "⚡️",
                    value: format!("{pace:.1}"),
                    unit: "min/km",
                },
                Detail {
                    icon: "🦶🏼",
                    value: cadence.to_string(),
                    unit: "spm",
                },
            ),
            Activity::Cycling { elevation, speed } => (
                Detail {
                    icon: "⚡️",
                    value: format!("{speed:.1}"),
                    unit: "km/h",
                },
                Detail {
                    icon: "⛰",
                    value: elevation.to_string(),
                    unit: "m",
                },
            ),
        };

        Self {
            id: w.id.clone(),
            title: w.description.clone(),
            details: [
                Detail {
                    icon: kind.emoji(),
                    value: w.distance.to_string(),
                    unit: "km",
                },
                Detail {
                    icon: "⏱",
                    value: w.duration.to_string(),
                    unit: "min",
                },
                metric,
                secondary,
            ],
        }
    }
}

impl fmt::Display for SummaryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.id, self.title)?;
        for d in &self.details {
            write!(f, "\t{d}")?;
        }
        Ok(())
    }
}

/// Current sort key and direction of the workout list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListController {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl ListController {
    pub fn set_key(&mut self, key: SortKey) {
        self.key = key;
    }

    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggled();
    }

    pub fn sort(&self, workouts: &mut [Workout]) {
        sort_workouts(workouts, self.key, self.direction);
    }

    pub fn render(workouts: &[Workout]) -> Vec<SummaryRow> {
        workouts.iter().map(SummaryRow::from_workout).collect()
    }
}
