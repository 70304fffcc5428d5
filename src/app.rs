use crate::config::MapConfig;
use crate::dlog;
use crate::form::{FormController, FormSubmission, ValidationError, ValidationPolicy};
use crate::list::{ListController, RowAction, SortKey, SummaryRow};
use crate::map::{Geolocator, MapAdapter, MapWidget};
use crate::storage::{KeyValueStore, WorkoutRepository};
use crate::types::{Coords, Workout, WorkoutId};
use thiserror::Error;

pub const LOCATION_FAILED_MSG: &str = "could not get your location";
pub const RESET_CONFIRM_MSG: &str = "Do you really want to remove all Workouts!";

/// Blocking dialogs.
pub trait Prompt {
    fn confirm(&mut self, message: &str) -> bool;
    fn alert(&mut self, message: &str);
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("another action is in progress ({0:?}); submit or cancel it first")]
    Busy(AppState),
    #[error("the map is not loaded yet")]
    MapUnavailable,
    #[error("nothing to submit")]
    NothingToSubmit,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AppState {
    #[default]
    Idle,
    AwaitingCreate { coords: Coords },
    AwaitingEdit { id: WorkoutId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(WorkoutId),
    Updated(WorkoutId),
    /// Input failed validation; the form is still open with its values.
    Rejected(ValidationError),
    /// The workout being edited no longer exists.
    Missing,
}

/// Owns the workout sequence and reacts to user events.
pub struct App<S: KeyValueStore, W: MapWidget, P: Prompt> {
    workouts: Vec<Workout>,
    repo: WorkoutRepository<S>,
    map: Option<MapAdapter<W>>,
    map_config: MapConfig,
    form: FormController,
    list: ListController,
    rows: Vec<SummaryRow>,
    prompt: P,
    policy: ValidationPolicy,
    state: AppState,
}

impl<S: KeyValueStore, W: MapWidget, P: Prompt> App<S, W, P> {
    /// Load stored workouts and render the list. The map comes later, once
    /// the position is known (see [`App::locate`]).
    pub fn new(repo: WorkoutRepository<S>, prompt: P, map_config: MapConfig) -> Self {
        let workouts = repo.load();
        tracing::info!(count = workouts.len(), "workouts restored");
        let rows = ListController::render(&workouts);
        Self {
            workouts,
            repo,
            map: None,
            map_config,
            form: FormController::new(),
            list: ListController::default(),
            rows,
            prompt,
            policy: ValidationPolicy::default(),
            state: AppState::Idle,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ask for the current position once and build the map around it. On
    /// failure the user is told and the app carries on without a map.
    pub fn locate(&mut self, geo: &mut impl Geolocator, widget: W) -> bool {
        match geo.current_position() {
            Ok(center) => {
                let mut map = MapAdapter::init(widget, center, self.map_config.clone());
                map.sync(&self.workouts);
                self.map = Some(map);
                true
            }
            Err(e) => {
                tracing::warn!(err = %e, "geolocation failed");
                self.prompt.alert(LOCATION_FAILED_MSG);
                false
            }
        }
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub const fn state(&self) -> &AppState {
        &self.state
    }

    pub const fn form(&self) -> &FormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController {
        &mut self.form
    }

    pub const fn list(&self) -> &ListController {
        &self.list
    }

    pub const fn map(&self) -> Option<&MapAdapter<W>> {
        self.map.as_ref()
    }

    pub const fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn find(&self, id: &WorkoutId) -> Option<&Workout> {
        self.workouts.iter().find(|w| &w.id == id)
    }

    fn ensure_idle(&self) -> Result<(), AppError> {
        match self.state {
            AppState::Idle => Ok(()),
            ref other => Err(AppError::Busy(other.clone())),
        }
    }

    /// A click on the map opens the form for a new workout at that spot.
    pub fn map_click(&mut self, coords: Coords) -> Result<(), AppError> {
        self.ensure_idle()?;
        if self.map.is_none() {
            return Err(AppError::MapUnavailable);
        }
        self.state = AppState::AwaitingCreate { coords };
        self.form.show_for_create();
        Ok(())
    }

    /// Open the form prefilled with an existing workout.
    pub fn edit_click(&mut self, id: &WorkoutId) -> Result<(), AppError> {
        self.ensure_idle()?;
        let Some(workout) = self.workouts.iter().find(|w| &w.id == id) else {
            dlog!("edit: no workout id={id}");
            return Ok(());
        };
        self.form.show_for_edit(workout);
        self.state = AppState::AwaitingEdit { id: id.clone() };
        Ok(())
    }

    pub fn submit(&mut self) -> Result<SubmitOutcome, AppError> {
        let sub = match self.form.submit(self.policy) {
            Ok(sub) => sub,
            Err(e) => {
                if self.state == AppState::Idle {
                    return Err(AppError::NothingToSubmit);
                }
                tracing::warn!(err = %e, "form rejected");
                self.prompt.alert(&e.to_string());
                return Ok(SubmitOutcome::Rejected(e));
            }
        };

        // A failed save leaves the state and the filled form in place.
        let outcome = match self.state.clone() {
            AppState::Idle => return Err(AppError::NothingToSubmit),
            AppState::AwaitingCreate { coords } => self.create(coords, sub)?,
            AppState::AwaitingEdit { id } => self.update(&id, sub)?,
        };
        self.state = AppState::Idle;
        self.form.hide();
        Ok(outcome)
    }

    fn create(&mut self, coords: Coords, sub: FormSubmission) -> anyhow::Result<SubmitOutcome> {
        let workout = Workout::new(sub.kind, coords, sub.distance, sub.duration, sub.parameter);
        let id = workout.id.clone();
        let mut next = self.workouts.clone();
        next.push(workout);
        self.repo.save(&next)?;
        tracing::info!(id = %id, kind = %sub.kind, "workout created");

        if let (Some(map), Some(workout)) = (self.map.as_mut(), next.last()) {
            map.add_marker(workout);
        }
        self.workouts = next;
        self.render();
        Ok(SubmitOutcome::Created(id))
    }

    fn update(&mut self, id: &WorkoutId, sub: FormSubmission) -> anyhow::Result<SubmitOutcome> {
        let mut next = self.workouts.clone();
        let Some(workout) = next.iter_mut().find(|w| &w.id == id) else {
            dlog!("edit submit: workout id={id} vanished");
            return Ok(SubmitOutcome::Missing);
        };
        workout.update(sub.distance, sub.duration, sub.parameter);
        self.repo.save(&next)?;
        tracing::info!(id = %id, "workout updated");

        self.workouts = next;
        self.render();
        self.sync_markers();
        Ok(SubmitOutcome::Updated(id.clone()))
    }

    /// Close the form without saving.
    pub fn cancel(&mut self) {
        self.form.hide();
        self.state = AppState::Idle;
    }

    /// Remove the first workout with this id. Returns whether one was removed.
    pub fn delete_click(&mut self, id: &WorkoutId) -> Result<bool, AppError> {
        self.ensure_idle()?;
        let Some(pos) = self.workouts.iter().position(|w| &w.id == id) else {
            dlog!("delete: no workout id={id}");
            return Ok(false);
        };
        let mut next = self.workouts.clone();
        next.remove(pos);
        self.repo.save(&next)?;
        self.workouts = next;
        if let Some(map) = self.map.as_mut() {
            map.remove_marker(id);
        }
        self.render();
        tracing::info!(id = %id, "workout deleted");
        Ok(true)
    }

    /// Pan the map to a workout. Returns whether the map moved.
    pub fn center_click(&mut self, id: &WorkoutId) -> Result<bool, AppError> {
        self.ensure_idle()?;
        let Some(map) = self.map.as_mut() else {
            dlog!("center: map not loaded");
            return Ok(false);
        };
        let Some(workout) = self.workouts.iter_mut().find(|w| &w.id == id) else {
            dlog!("center: no workout id={id}");
            return Ok(false);
        };
        workout.click();
        map.center_on(workout.coords);
        Ok(true)
    }

    pub fn row_action(&mut self, action: &RowAction) -> Result<(), AppError> {
        match action {
            RowAction::Center(id) => self.center_click(id).map(drop),
            RowAction::Delete(id) => self.delete_click(id).map(drop),
            RowAction::Edit(id) => self.edit_click(id),
        }
    }

    /// Reorder by a new key. Nothing is saved here; the next create, edit or
    /// delete stores the sequence in whatever order it is in by then.
    pub fn change_sort(&mut self, key: SortKey) -> Result<(), AppError> {
        self.ensure_idle()?;
        self.list.set_key(key);
        self.resort();
        Ok(())
    }

    pub fn toggle_sort_direction(&mut self) -> Result<(), AppError> {
        self.ensure_idle()?;
        self.list.toggle_direction();
        self.resort();
        Ok(())
    }

    fn resort(&mut self) {
        self.list.sort(&mut self.workouts);
        dlog!("sorted key={:?} direction={:?}", self.list.key, self.list.direction);
        self.render();
        self.sync_markers();
    }

    /// Drop every workout after the user confirms. Returns whether anything
    /// was cleared.
    pub fn reset_all(&mut self) -> Result<bool, AppError> {
        self.ensure_idle()?;
        if !self.prompt.confirm(RESET_CONFIRM_MSG) {
            dlog!("reset declined");
            return Ok(false);
        }
        self.repo.clear()?;
        self.workouts.clear();
        if let Some(map) = self.map.as_mut() {
            map.clear_markers();
        }
        self.render();
        tracing::info!("all workouts removed");
        Ok(true)
    }

    fn render(&mut self) {
        self.rows = ListController::render(&self.workouts);
    }

    fn sync_markers(&mut self) {
        if let Some(map) = self.map.as_mut() {
            map.sync(&self.workouts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Field;
    use crate::map::tests::RecordingMap;
    use crate::storage::MemoryStore;
    use crate::types::{Activity, ActivityKind};
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct ScriptedPrompt {
        answer: bool,
        alerts: Vec<String>,
        asked: usize,
    }

    impl Prompt for ScriptedPrompt {
        fn confirm(&mut self, _message: &str) -> bool {
            self.asked += 1;
            self.answer
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
    }

    struct At(Option<Coords>);

    impl Geolocator for At {
        fn current_position(&mut self) -> anyhow::Result<Coords> {
            self.0.ok_or_else(|| anyhow!("permission denied"))
        }
    }

    type TestApp = App<MemoryStore, RecordingMap, ScriptedPrompt>;

    fn app_with(prompt: ScriptedPrompt) -> TestApp {
        let mut app = App::new(
            WorkoutRepository::new(MemoryStore::new()),
            prompt,
            MapConfig::default(),
        );
        assert!(app.locate(&mut At(Some(Coords::new(48.0, 2.0))), RecordingMap::default()));
        app
    }

    fn app() -> TestApp {
        app_with(ScriptedPrompt::default())
    }

    /// Store whose writes fail while the shared flag is set.
    struct FlakyStore {
        inner: MemoryStore,
        failing: Rc<Cell<bool>>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.failing.get() {
                anyhow::bail!("disk full");
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key)
        }
    }

    type FlakyApp = App<FlakyStore, RecordingMap, ScriptedPrompt>;

    fn flaky_app() -> (FlakyApp, Rc<Cell<bool>>) {
        let failing = Rc::new(Cell::new(false));
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failing: Rc::clone(&failing),
        };
        let mut app = App::new(
            WorkoutRepository::new(store),
            ScriptedPrompt::default(),
            MapConfig::default(),
        );
        assert!(app.locate(&mut At(Some(Coords::new(48.0, 2.0))), RecordingMap::default()));
        (app, failing)
    }

    fn fill<S: KeyValueStore>(
        app: &mut App<S, RecordingMap, ScriptedPrompt>,
        kind: ActivityKind,
        d: &str,
        t: &str,
        p: &str,
    ) {
        app.map_click(Coords::new(48.1, 2.1)).unwrap();
        let form = app.form_mut();
        form.set_kind(kind);
        form.set_field(Field::Distance, d);
        form.set_field(Field::Duration, t);
        let secondary = form.secondary_field();
        form.set_field(secondary, p);
    }

    fn add<S: KeyValueStore>(
        app: &mut App<S, RecordingMap, ScriptedPrompt>,
        kind: ActivityKind,
        d: &str,
        t: &str,
        p: &str,
    ) -> SubmitOutcome {
        fill(app, kind, d, t, p);
        app.submit().unwrap()
    }

    fn stored_len<S: KeyValueStore>(app: &App<S, RecordingMap, ScriptedPrompt>) -> usize {
        app.repo.load().len()
    }

    #[test]
    fn create_flow_persists_renders_and_marks() {
        let mut app = app();
        let outcome = add(&mut app, ActivityKind::Running, "5", "30", "150");

        let id = match outcome {
            SubmitOutcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        };
        assert_eq!(app.state(), &AppState::Idle);
        assert_eq!(app.workouts().len(), 1);
        assert_eq!(app.workouts()[0].activity, Activity::Running { cadence: 150.0, pace: 6.0 });
        assert_eq!(app.rows().len(), 1);
        assert_eq!(stored_len(&app), 1);
        assert!(app.map().unwrap().has_marker(&id));
        assert_eq!(app.form().fields.distance, "");
    }

    #[test]
    fn invalid_input_alerts_and_keeps_form() {
        let mut app = app();
        let outcome = add(&mut app, ActivityKind::Running, "abc", "30", "150");

        assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
        assert!(matches!(app.state(), AppState::AwaitingCreate { .. }));
        assert_eq!(app.form().fields.distance, "abc");
        assert!(app.workouts().is_empty());
        assert_eq!(app.prompt().alerts.len(), 1);
        assert!(app.prompt().alerts[0].starts_with("Inputs have to be positive numbers!"));

        app.form_mut().set_field(Field::Distance, "5");
        assert!(matches!(app.submit().unwrap(), SubmitOutcome::Created(_)));
    }

    #[test]
    fn edit_updates_in_place_and_persists() {
        let mut app = app();
        add(&mut app, ActivityKind::Cycling, "20", "60", "300");
        let id = app.workouts()[0].id.clone();
        let description = app.workouts()[0].description.clone();

        app.edit_click(&id).unwrap();
        assert_eq!(app.state(), &AppState::AwaitingEdit { id: id.clone() });
        assert!(app.form().type_locked());
        assert_eq!(app.form().fields.elevation, "300");

        app.form_mut().set_field(Field::Distance, "30");
        assert_eq!(app.submit().unwrap(), SubmitOutcome::Updated(id.clone()));

        let w = &app.workouts()[0];
        assert_eq!(w.id, id);
        assert_eq!(w.description, description);
        assert_eq!(w.activity, Activity::Cycling { elevation: 300.0, speed: 30.0 / 60.0 / 60.0 });
        assert_eq!(app.repo.load()[0].distance, 30.0);
        assert_eq!(app.map().unwrap().marker_count(), 1);
    }

    #[test]
    fn edit_rejects_non_positive_elevation_by_default() {
        let mut app = app();
        add(&mut app, ActivityKind::Cycling, "20", "60", "300");
        let id = app.workouts()[0].id.clone();

        app.edit_click(&id).unwrap();
        app.form_mut().set_field(Field::Elevation, "-10");
        assert!(matches!(app.submit().unwrap(), SubmitOutcome::Rejected(_)));
        app.cancel();
        assert_eq!(app.workouts()[0].activity.parameter(), 300.0);
    }

    #[test]
    fn delete_removes_exactly_one_and_keeps_order() {
        let mut app = app();
        for d in ["1", "2", "3", "4"] {
            add(&mut app, ActivityKind::Running, d, "10", "160");
        }
        let before: Vec<_> = app.workouts().iter().map(|w| w.id.clone()).collect();

        assert!(app.delete_click(&before[1]).unwrap());

        let after: Vec<_> = app.workouts().iter().map(|w| w.id.clone()).collect();
        assert_eq!(after, vec![before[0].clone(), before[2].clone(), before[3].clone()]);
        assert_eq!(stored_len(&app), 3);
        assert!(!app.map().unwrap().has_marker(&before[1]));
        assert_eq!(app.rows().len(), 3);
    }

    #[test]
    fn lookup_misses_are_no_ops() {
        let mut app = app();
        add(&mut app, ActivityKind::Running, "5", "30", "150");
        let ghost = WorkoutId::from("ghost");

        assert!(!app.delete_click(&ghost).unwrap());
        assert!(!app.center_click(&ghost).unwrap());
        app.edit_click(&ghost).unwrap();
        assert_eq!(app.state(), &AppState::Idle);
        assert_eq!(app.workouts().len(), 1);
    }

    #[test]
    fn center_pans_and_counts_click() {
        let mut app = app();
        add(&mut app, ActivityKind::Running, "5", "30", "150");
        let id = app.workouts()[0].id.clone();

        app.row_action(&RowAction::Center(id.clone())).unwrap();
        assert_eq!(app.workouts()[0].clicks, 1);
        let (coords, _, opts) = *app.map().unwrap().widget().views.last().unwrap();
        assert_eq!(coords, Coords::new(48.1, 2.1));
        assert!(opts.animate);
    }

    #[test]
    fn sort_is_saved_by_the_next_mutation() {
        let mut app = app();
        for d in ["7", "2", "5"] {
            add(&mut app, ActivityKind::Running, d, "10", "160");
        }
        app.change_sort(SortKey::Distance).unwrap();
        let distances: Vec<f64> = app.workouts().iter().map(|w| w.distance).collect();
        assert_eq!(distances, [2.0, 5.0, 7.0]);
        assert_eq!(app.rows()[0].details[0].value, "2");

        app.toggle_sort_direction().unwrap();
        let distances: Vec<f64> = app.workouts().iter().map(|w| w.distance).collect();
        assert_eq!(distances, [7.0, 5.0, 2.0]);

        let stored: Vec<f64> = app.repo.load().iter().map(|w| w.distance).collect();
        assert_eq!(stored, [7.0, 2.0, 5.0]);

        // The next mutation stores the sorted order.
        let middle = app.workouts()[1].id.clone();
        assert!(app.delete_click(&middle).unwrap());
        let stored: Vec<f64> = app.repo.load().iter().map(|w| w.distance).collect();
        assert_eq!(stored, [7.0, 2.0]);
    }

    #[test]
    fn failed_save_on_create_keeps_form_and_state() {
        let (mut app, failing) = flaky_app();
        failing.set(true);
        fill(&mut app, ActivityKind::Running, "5", "30", "150");

        assert!(matches!(app.submit(), Err(AppError::Storage(_))));
        assert!(matches!(app.state(), AppState::AwaitingCreate { .. }));
        assert_eq!(app.form().state(), crate::form::FormState::Create);
        assert_eq!(app.form().fields.distance, "5");
        assert!(app.workouts().is_empty());
        assert!(app.rows().is_empty());
        assert_eq!(app.map().unwrap().marker_count(), 0);
        assert_eq!(stored_len(&app), 0);

        failing.set(false);
        assert!(matches!(app.submit().unwrap(), SubmitOutcome::Created(_)));
        assert_eq!(app.state(), &AppState::Idle);
        assert_eq!(app.workouts().len(), 1);
        assert_eq!(stored_len(&app), 1);
        assert_eq!(app.map().unwrap().marker_count(), 1);
    }

    #[test]
    fn failed_save_on_edit_leaves_workout_untouched() {
        let (mut app, failing) = flaky_app();
        add(&mut app, ActivityKind::Running, "5", "30", "150");
        let id = app.workouts()[0].id.clone();

        app.edit_click(&id).unwrap();
        app.form_mut().set_field(Field::Distance, "10");
        failing.set(true);
        assert!(matches!(app.submit(), Err(AppError::Storage(_))));

        assert_eq!(app.state(), &AppState::AwaitingEdit { id: id.clone() });
        assert_eq!(app.form().fields.distance, "10");
        assert_eq!(app.workouts()[0].distance, 5.0);
        assert_eq!(app.rows()[0].details[0].value, "5");
        assert_eq!(app.repo.load()[0].distance, 5.0);
    }

    #[test]
    fn failed_save_on_delete_keeps_everything() {
        let (mut app, failing) = flaky_app();
        add(&mut app, ActivityKind::Running, "5", "30", "150");
        add(&mut app, ActivityKind::Cycling, "20", "60", "300");
        let id = app.workouts()[0].id.clone();

        failing.set(true);
        assert!(matches!(app.delete_click(&id), Err(AppError::Storage(_))));

        assert_eq!(app.workouts().len(), 2);
        assert_eq!(app.rows().len(), 2);
        assert!(app.map().unwrap().has_marker(&id));
        assert_eq!(stored_len(&app), 2);
    }

    #[test]
    fn idle_only_events_are_refused_mid_form() {
        let mut app = app();
        app.map_click(Coords::new(1.0, 1.0)).unwrap();

        assert!(matches!(app.change_sort(SortKey::Date), Err(AppError::Busy(_))));
        assert!(matches!(app.reset_all(), Err(AppError::Busy(_))));
        assert!(matches!(app.delete_click(&WorkoutId::from("x")), Err(AppError::Busy(_))));
        assert!(matches!(app.map_click(Coords::new(2.0, 2.0)), Err(AppError::Busy(_))));

        app.cancel();
        assert_eq!(app.state(), &AppState::Idle);
        assert!(matches!(app.submit(), Err(AppError::NothingToSubmit)));
    }

    #[test]
    fn reset_requires_confirmation() {
        let mut app = app();
        add(&mut app, ActivityKind::Running, "5", "30", "150");

        assert!(!app.reset_all().unwrap());
        assert_eq!(app.workouts().len(), 1);
        assert_eq!(stored_len(&app), 1);

        app.prompt.answer = true;
        assert!(app.reset_all().unwrap());
        assert!(app.workouts().is_empty());
        assert!(app.rows().is_empty());
        assert!(app.repo.store().get(crate::config::STORAGE_KEY).unwrap().is_none());
        assert_eq!(app.map().unwrap().marker_count(), 0);
        assert_eq!(app.prompt().asked, 2);
    }

    #[test]
    fn failed_geolocation_alerts_and_disables_map_clicks() {
        let mut app: TestApp = App::new(
            WorkoutRepository::new(MemoryStore::new()),
            ScriptedPrompt::default(),
            MapConfig::default(),
        );
        assert!(!app.locate(&mut At(None), RecordingMap::default()));
        assert_eq!(app.prompt().alerts, vec![LOCATION_FAILED_MSG.to_string()]);
        assert!(matches!(app.map_click(Coords::new(1.0, 1.0)), Err(AppError::MapUnavailable)));
    }

    #[test]
    fn startup_restores_and_marks_stored_workouts() {
        let mut repo = WorkoutRepository::new(MemoryStore::new());
        repo.save(&[
            Workout::running(Coords::new(1.0, 1.0), 5.0, 30.0, 150.0),
            Workout::cycling(Coords::new(2.0, 2.0), 20.0, 60.0, 100.0),
        ])
        .unwrap();

        let mut app = App::new(repo, ScriptedPrompt::default(), MapConfig::default());
        assert_eq!(app.rows().len(), 2);
        app.locate(&mut At(Some(Coords::new(0.0, 0.0))), RecordingMap::default());
        assert_eq!(app.map().unwrap().marker_count(), 2);
    }
}
