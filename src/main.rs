#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

use anyhow::{Result, bail};
use clap::Parser;
use mapty::app::{App, SubmitOutcome};
use mapty::cli::{self, Cmd};
use mapty::config::MapConfig;
use mapty::form::{Field, FormState, ValidationPolicy};
use mapty::list::SortKey;
use mapty::storage::{SqliteStore, WorkoutRepository};
use mapty::terminal::{FixedLocation, LogMap, TerminalPrompt};
use mapty::types::WorkoutId;
use mapty::{dlog, utils};

type CliApp = App<SqliteStore, LogMap, TerminalPrompt>;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let store = SqliteStore::open(&cli.db)?;
    let assume_yes = matches!(cli.cmd, Cmd::Reset { yes: true });
    let policy = ValidationPolicy {
        allow_non_positive_elevation: cli.allow_descent,
    };
    let mut app: CliApp = App::new(
        WorkoutRepository::new(store),
        TerminalPrompt::new(assume_yes),
        MapConfig::with_zoom(cli.zoom),
    )
    .with_policy(policy);

    // Adding needs the map; fall back to the workout's own spot as "here".
    let here = match &cli.cmd {
        Cmd::Add { at, .. } => cli.location.or(Some(*at)),
        _ => cli.location,
    };
    dlog!("mode={:?} db={} location={here:?}", cli.cmd, cli.db.display());
    if here.is_some() || matches!(cli.cmd, Cmd::Center { .. }) {
        app.locate(&mut FixedLocation(here), LogMap::default());
    }

    match cli.cmd {
        Cmd::Add {
            at,
            kind,
            distance,
            duration,
            cadence,
            elevation,
        } => {
            app.map_click(at)?;
            let form = app.form_mut();
            form.set_kind(kind);
            form.set_field(Field::Distance, distance);
            form.set_field(Field::Duration, duration);
            form.set_field(Field::Cadence, cadence.unwrap_or_default());
            form.set_field(Field::Elevation, elevation.unwrap_or_default());
            submit(&mut app)?;
        }
        Cmd::List { sort, desc } => {
            if let Some(key) = sort {
                sort_list(&mut app, key, desc)?;
            }
        }
        Cmd::Edit {
            id,
            distance,
            duration,
            cadence,
            elevation,
        } => {
            let id = WorkoutId::from(id);
            app.edit_click(&id)?;
            if app.form().state() != FormState::Edit {
                bail!("No workout with id {id}");
            }
            let form = app.form_mut();
            let updates = [
                (Field::Distance, distance),
                (Field::Duration, duration),
                (Field::Cadence, cadence),
                (Field::Elevation, elevation),
            ];
            for (field, value) in updates {
                if let Some(v) = value {
                    form.set_field(field, v);
                }
            }
            submit(&mut app)?;
        }
        Cmd::Delete { id } => {
            let id = WorkoutId::from(id);
            if !app.delete_click(&id)? {
                tracing::warn!(id = %id, "no such workout");
            }
        }
        Cmd::Center { id } => {
            let id = WorkoutId::from(id);
            if app.center_click(&id)? {
                if let Some(w) = app.find(&id) {
                    println!("{}\t{}", w.coords, w.description);
                }
            } else {
                tracing::warn!(id = %id, "could not center on workout");
            }
        }
        Cmd::Reset { .. } => {
            if !app.reset_all()? {
                println!("Nothing removed.");
            }
        }
    }

    for row in app.rows() {
        println!("{row}");
    }
    Ok(())
}

fn submit(app: &mut CliApp) -> Result<()> {
    match app.submit()? {
        SubmitOutcome::Created(id) => println!("Added {id}"),
        SubmitOutcome::Updated(id) => println!("Updated {id}"),
        SubmitOutcome::Rejected(_) => bail!("Workout not saved."),
        SubmitOutcome::Missing => bail!("Workout disappeared before the edit was saved."),
    }
    Ok(())
}

fn sort_list(app: &mut CliApp, key: SortKey, desc: bool) -> Result<()> {
    app.change_sort(key)?;
    if desc {
        app.toggle_sort_direction()?;
    }
    Ok(())
}
