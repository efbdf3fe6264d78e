use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::BackupError;

/// Opaque, unique task identifier.
pub type TaskId = String;

/// How important a task is. Drives the second ordering key within a day.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high(0) < medium(1) < low(2).
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

// Stored data is not schema-checked, so anything unrecognised falls back to medium.
impl From<String> for Priority {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}' (use high, medium or low)", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single task attached to one calendar day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, stable for the task's lifetime.
    pub id: TaskId,
    /// What needs doing.
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Creation time in epoch milliseconds. Only used as the last ordering tiebreak.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub priority: Priority,
    /// Wall-clock time of day as `HH:MM`.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    /// Cloned onto the current day each session until completed or deleted.
    #[serde(default)]
    pub recurring: bool,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Input for creating a task. Everything but the text has a default.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub text: String,
    pub priority: Priority,
    pub completed: bool,
    pub time: Option<String>,
    pub recurring: bool,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        NewTask {
            text: text.into(),
            priority: Priority::Medium,
            completed: false,
            time: None,
            recurring: false,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn time(mut self, time: Option<String>) -> Self {
        self.time = time.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }
}

/// Partial update for an existing task. `None` leaves a field untouched;
/// `time: Some(None)` clears the time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub time: Option<Option<String>>,
    pub recurring: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(text) = self.text {
            task.text = text;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(time) = self.time {
            task.time = time.filter(|t| !t.trim().is_empty());
        }
        if let Some(recurring) = self.recurring {
            task.recurring = recurring;
        }
    }
}

/// Calendar coordinates of a day bucket. `month` is 0-based.
///
/// Keys are not validated against the calendar; see [`DayKey::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DayKey {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        DayKey { year, month, day }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DayKey {
            year: date.year(),
            month: date.month0(),
            day: date.day(),
        }
    }

    /// The serialized month bucket key, `YYYY-MM` with a 1-based month.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month + 1)
    }

    /// Absolute date of this key: the first of the month plus `day - 1` days,
    /// so out-of-range days roll over into the neighbouring month.
    pub fn resolve(&self) -> Option<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)?;
        first.checked_add_signed(Duration::days(i64::from(self.day) - 1))
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month + 1, self.day)
    }
}

/// Parses a `YYYY-MM` bucket key into `(year, 0-based month)`.
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month - 1))
}

/// Number of days in a month (0-based), or 0 if the month is out of range.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month + 1, 1) else {
        return 0;
    };
    let next = if month >= 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 2, 1)
    };
    next.map(|n| (n - first).num_days() as u32).unwrap_or(0)
}

/// Everything persisted for one user: every day bucket.
///
/// Serialized as `{"tasks": {"YYYY-MM": {"<day>": [Task, ...]}}}`.
/// Empty buckets are never written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    pub tasks: BTreeMap<DayKey, Vec<Task>>,
}

impl UserData {
    /// Builds a root from an arbitrary JSON value.
    ///
    /// The value must be an object whose `tasks` field is present and not
    /// `null`, `false`, `0` or `""`. Day keys past the end of their month
    /// are moved to the date they resolve to. Below that
    /// level, entries that can't be understood are skipped with a warning.
    pub fn from_value(value: Value) -> Result<Self, BackupError> {
        let Value::Object(mut root) = value else {
            return Err(BackupError::NotAnObject);
        };
        match root.remove("tasks") {
            Some(tasks) if !is_falsy(&tasks) => Ok(Self::from_months(tasks)),
            _ => Err(BackupError::MissingTasks),
        }
    }

    fn from_months(tasks: Value) -> Self {
        let mut data = UserData::default();
        let Value::Object(months) = tasks else {
            tracing::warn!("\"tasks\" is not an object, treating it as empty");
            return data;
        };

        for (month_key, days) in months {
            let Some((year, month)) = parse_month_key(&month_key) else {
                tracing::warn!(key = %month_key, "Skipping unrecognised month key");
                continue;
            };
            let Value::Object(days) = days else {
                tracing::warn!(key = %month_key, "Skipping month bucket that is not an object");
                continue;
            };
            for (day_key, list) in days {
                let Ok(day) = day_key.trim().parse::<u32>() else {
                    tracing::warn!(month = %month_key, day = %day_key, "Skipping unrecognised day key");
                    continue;
                };
                let Value::Array(items) = list else {
                    tracing::warn!(month = %month_key, day, "Skipping day entry that is not a list");
                    continue;
                };
                let raw_key = DayKey::new(year, month, day);
                // Out-of-range days (April 31st) land on the date they resolve to
                let key = raw_key.resolve().map(DayKey::from_date).unwrap_or(raw_key);
                if key != raw_key {
                    tracing::debug!(from = %raw_key, to = %key, "Normalized day key");
                }
                let bucket = data.tasks.entry(key).or_default();
                for item in items {
                    match serde_json::from_value::<Task>(item) {
                        Ok(task) => bucket.push(task),
                        Err(e) => {
                            tracing::warn!(month = %month_key, day, error = %e, "Skipping unreadable task")
                        }
                    }
                }
            }
        }

        data.tasks.retain(|_, tasks| !tasks.is_empty());
        data
    }

    pub fn task_count(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

impl Serialize for UserData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut months: BTreeMap<String, BTreeMap<u32, &Vec<Task>>> = BTreeMap::new();
        for (key, tasks) in &self.tasks {
            if tasks.is_empty() {
                continue;
            }
            months.entry(key.month_key()).or_default().insert(key.day, tasks);
        }
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("tasks", &months)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for UserData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        UserData::from_value(value).map_err(serde::de::Error::custom)
    }
}
