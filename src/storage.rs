use crate::config::STORAGE_KEY;
use crate::dlog;
use crate::types::{Activity, ActivityKind, Coords, Workout, WorkoutId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

/// String key-value store, the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// Key-value store backed by a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let display = path.display();
        let conn =
            Connection::open(path).with_context(|| format!("Opening SQLite DB: {display}"))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().context("Opening in-memory SQLite DB")?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        if !table_exists(&conn, "kv")? {
            tracing::info!("creating kv table");
        }
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS kv (
              key    TEXT PRIMARY KEY,
              value  TEXT NOT NULL
            );
            ",
        )
        .context("Ensuring kv schema")?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Reading key {key:?}"))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .with_context(|| format!("Writing key {key:?}"))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .with_context(|| format!("Removing key {key:?}"))?;
        Ok(())
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

/// On-disk shape of one workout. Every field is optional on the way in so that
/// older or hand-edited data still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredWorkout {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub coords: Option<Coords>,
    pub distance: Option<f64>,
    pub duration: Option<f64>,
    #[serde(default, with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<WorkoutId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    pub description: Option<String>,
    pub clicks: Option<u32>,
}

impl From<&Workout> for StoredWorkout {
    fn from(w: &Workout) -> Self {
        let mut rec = Self {
            kind: Some(w.kind().tag().to_string()),
            coords: Some(w.coords),
            distance: Some(w.distance),
            duration: Some(w.duration),
            date: Some(w.date),
            id: Some(w.id.clone()),
            description: Some(w.description.clone()),
            clicks: Some(w.clicks),
            ..Self::default()
        };
        match w.activity {
            Activity::Running { cadence, pace } => {
                rec.cadence = Some(cadence);
                rec.pace = Some(pace);
            }
            Activity::Cycling { elevation, speed } => {
                rec.elevation = Some(elevation);
                rec.speed = Some(speed);
            }
        }
        rec
    }
}

impl StoredWorkout {
    /// Rebuild a workout, recomputing pace/speed and description. Returns
    /// `None` when a required field is missing.
    pub fn into_workout(self) -> Option<Workout> {
        let kind = ActivityKind::from_tag(self.kind.as_deref()?)?;
        let parameter = match kind {
            ActivityKind::Running => self.cadence?,
            ActivityKind::Cycling => self.elevation?,
        };
        let mut w = Workout::with_identity(
            kind,
            self.coords?,
            self.distance?,
            self.duration?,
            parameter,
            self.date.unwrap_or_else(Utc::now),
            self.id.unwrap_or_else(WorkoutId::generate),
        );
        w.clicks = self.clicks.unwrap_or(0);
        Some(w)
    }
}

mod lenient_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value as JsonValue;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(date: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
            None => s.serialize_none(),
        }
    }

    /// RFC 3339 strings or epoch milliseconds; anything else reads as absent.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let v = Option::<JsonValue>::deserialize(d)?;
        Ok(match v {
            Some(JsonValue::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Some(JsonValue::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        })
    }
}

/// Ids were numeric-looking strings in older data; accept bare numbers too.
fn lenient_id<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<WorkoutId>, D::Error> {
    let v = Option::<JsonValue>::deserialize(d)?;
    Ok(match v {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(WorkoutId::from(s)),
        Some(JsonValue::Number(n)) => Some(WorkoutId::from(n.to_string())),
        _ => None,
    })
}

/// Saves and loads the whole workout sequence under one key.
pub struct WorkoutRepository<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> WorkoutRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// Overwrite the stored sequence.
    pub fn save(&mut self, workouts: &[Workout]) -> Result<()> {
        let records: Vec<StoredWorkout> = workouts.iter().map(StoredWorkout::from).collect();
        let json = serde_json::to_string(&records).context("Serializing workouts")?;
        self.store.set(&self.key, &json)?;
        dlog!("saved workouts count={} bytes={}", records.len(), json.len());
        Ok(())
    }

    /// Read the stored sequence. Missing or unreadable data yields an empty list.
    pub fn load(&self) -> Vec<Workout> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(err = %e, "could not read stored workouts");
                return Vec::new();
            }
        };

        let records: Vec<JsonValue> = match serde_json::from_str(&raw) {
            Ok(JsonValue::Array(items)) => items,
            Ok(other) => {
                tracing::warn!(kind = json_kind(&other), "stored workouts are not a list");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(err = %e, "stored workouts are not valid JSON");
                return Vec::new();
            }
        };

        let total = records.len();
        let out: Vec<Workout> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let w = serde_json::from_value::<StoredWorkout>(v)
                    .ok()
                    .and_then(StoredWorkout::into_workout);
                if w.is_none() {
                    tracing::warn!(index = i, "skipping unreadable stored workout");
                }
                w
            })
            .collect();

        dlog!("loaded workouts count={} stored={total}", out.len());
        out
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(&self.key)
    }

    pub const fn store(&self) -> &S {
        &self.store
    }
}

const fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
