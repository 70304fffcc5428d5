use crate::dlog;
use crate::types::{ActivityKind, Workout};
use thiserror::Error;

/// Message shown for any rejected form input.
pub const INVALID_INPUT_MSG: &str = "Inputs have to be positive numbers!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Distance,
    Duration,
    Cadence,
    Elevation,
}

impl Field {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Duration => "duration",
            Self::Cadence => "cadence",
            Self::Elevation => "elevation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Inputs have to be positive numbers! ({} is not a number: {value:?})", .field.name())]
    NotANumber { field: Field, value: String },
    #[error("Inputs have to be positive numbers! ({} must be greater than zero)", .field.name())]
    NotPositive { field: Field },
}

/// Which checks a submission has to pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Accept zero or negative elevation (downhill rides). Off by default, so
    /// elevation is held to the same positivity rule as every other field.
    pub allow_non_positive_elevation: bool,
}

/// Coerce a raw form value to a finite number.
pub fn parse_number(field: Field, raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field,
            value: trimmed.to_string(),
        })
}

pub fn parse_positive(field: Field, raw: &str) -> Result<f64, ValidationError> {
    let v = parse_number(field, raw)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Hidden,
    Create,
    /// Editing an existing workout; the type field is locked.
    Edit,
}

/// Raw values as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub distance: String,
    pub duration: String,
    pub cadence: String,
    pub elevation: String,
}

/// A validated form, ready to become a new workout or an edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormSubmission {
    pub kind: ActivityKind,
    pub distance: f64,
    pub duration: f64,
    /// Cadence or elevation, depending on `kind`.
    pub parameter: f64,
}

#[derive(Debug, Clone)]
pub struct FormController {
    state: FormState,
    kind: ActivityKind,
    pub fields: FormFields,
}

impl Default for FormController {
    fn default() -> Self {
        Self::new()
    }
}

impl FormController {
    pub fn new() -> Self {
        Self {
            state: FormState::Hidden,
            kind: ActivityKind::Running,
            fields: FormFields::default(),
        }
    }

    pub const fn state(&self) -> FormState {
        self.state
    }

    pub const fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn type_locked(&self) -> bool {
        self.state == FormState::Edit
    }

    /// The secondary field currently on screen.
    pub const fn secondary_field(&self) -> Field {
        match self.kind {
            ActivityKind::Running => Field::Cadence,
            ActivityKind::Cycling => Field::Elevation,
        }
    }

    pub fn show_for_create(&mut self) {
        self.state = FormState::Create;
    }

    /// Prefill from an existing workout and lock its type.
    pub fn show_for_edit(&mut self, workout: &Workout) {
        self.kind = workout.kind();
        self.fields = FormFields {
            distance: workout.distance.to_string(),
            duration: workout.duration.to_string(),
            ..FormFields::default()
        };
        let param = workout.activity.parameter().to_string();
        match workout.kind() {
            ActivityKind::Running => self.fields.cadence = param,
            ActivityKind::Cycling => self.fields.elevation = param,
        }
        self.state = FormState::Edit;
    }

    /// Switch between the cadence and elevation rows. Ignored while editing.
    pub fn set_kind(&mut self, kind: ActivityKind) {
        if self.type_locked() {
            dlog!("form type locked, ignoring switch to {kind}");
            return;
        }
        self.kind = kind;
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Distance => &mut self.fields.distance,
            Field::Duration => &mut self.fields.duration,
            Field::Cadence => &mut self.fields.cadence,
            Field::Elevation => &mut self.fields.elevation,
        };
        *slot = value.into();
    }

    /// Validate the current values. On error the form keeps its contents.
    pub fn submit(&self, policy: ValidationPolicy) -> Result<FormSubmission, ValidationError> {
        let distance = parse_positive(Field::Distance, &self.fields.distance)?;
        let duration = parse_positive(Field::Duration, &self.fields.duration)?;
        let parameter = match self.kind {
            ActivityKind::Running => parse_positive(Field::Cadence, &self.fields.cadence)?,
            ActivityKind::Cycling if policy.allow_non_positive_elevation => {
                parse_number(Field::Elevation, &self.fields.elevation)?
            }
            ActivityKind::Cycling => parse_positive(Field::Elevation, &self.fields.elevation)?,
        };

        Ok(FormSubmission {
            kind: self.kind,
            distance,
            duration,
            parameter,
        })
    }

    /// Clear every field and hide the form.
    pub fn hide(&mut self) {
        self.fields = FormFields::default();
        self.state = FormState::Hidden;
    }
}
