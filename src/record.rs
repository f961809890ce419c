//! Domain records that flow through the sync engine.
//!
//! Three record kinds are reconciled with the remote store, each with its own
//! identity scheme:
//! - [`PreferencesRecord`]: one row per user, keyed by [`UserId`]
//! - [`SnapshotRecord`]: one row per user per day, keyed by [`CalendarDate`]
//! - [`FavoriteRecord`]: keyed by a content hash (see [`crate::identity`])

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current wall-clock time as epoch millis.
pub(crate) fn epoch_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Opaque user identifier issued by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A calendar date in `YYYY-MM-DD` form.
///
/// Lexicographic ordering on the string form matches chronological ordering.
/// The [`sentinel`](Self::sentinel) date is substituted during identity
/// normalization so that the day a record was filed under never affects its
/// content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarDate(String);

impl CalendarDate {
    pub fn new(date: impl Into<String>) -> Self {
        Self(date.into())
    }

    /// Fixed date used by identity normalization.
    #[must_use]
    pub fn sentinel() -> Self {
        Self("0001-01-01".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CalendarDate {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A record kind the engine can reconcile.
///
/// `Key` is the kind-specific merge identity: the user id for preferences,
/// the calendar date for snapshots, the content hash for favorites.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + std::hash::Hash + fmt::Display + Send + Sync + 'static;

    /// Short kind label for logs and metrics.
    const KIND: &'static str;

    fn user_id(&self) -> &UserId;
    fn key(&self) -> Self::Key;
    fn updated_at(&self) -> i64;
}

/// Per-user planner preferences. Single row per user, last-writer-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesRecord {
    pub user_id: UserId,
    /// Daily energy target in kcal.
    pub daily_kcal_target: f64,
    pub protein_target_g: f64,
    pub carbs_target_g: f64,
    pub fat_target_g: f64,
    pub meals_per_day: u8,
    /// Last update timestamp (epoch millis).
    pub updated_at: i64,
}

impl PreferencesRecord {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            daily_kcal_target: 2000.0,
            protein_target_g: 100.0,
            carbs_target_g: 250.0,
            fat_target_g: 70.0,
            meals_per_day: 3,
            updated_at: epoch_millis(),
        }
    }
}

impl SyncRecord for PreferencesRecord {
    type Key = UserId;
    const KIND: &'static str = "preferences";

    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn key(&self) -> UserId {
        self.user_id.clone()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

/// End-of-day snapshot: the preferences and the meal plan as they stood on
/// one calendar date. At most one per user per date; writing the same date
/// again overwrites in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub user_id: UserId,
    pub date: CalendarDate,
    /// Serialized preferences as of `date`.
    pub preferences_json: String,
    /// Serialized plan as of `date`.
    pub plan_json: String,
    /// Last update timestamp (epoch millis).
    pub updated_at: i64,
}

impl SnapshotRecord {
    pub fn new(user_id: UserId, date: CalendarDate, preferences_json: String, plan_json: String) -> Self {
        Self {
            user_id,
            date,
            preferences_json,
            plan_json,
            updated_at: epoch_millis(),
        }
    }
}

impl SyncRecord for SnapshotRecord {
    type Key = CalendarDate;
    const KIND: &'static str = "snapshot";

    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn key(&self) -> CalendarDate {
        self.date.clone()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

/// One line item of a favorited meal. Every field here is nutrition-bearing
/// or structural and therefore participates in the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealComponent {
    pub food_name: String,
    pub grams: f64,
    pub kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// A favorited meal composition.
///
/// Identity is the content hash of the normalized composition, never a
/// device-assigned key: two devices that independently favorite the same
/// meal converge on the same identity without coordination. The `date`,
/// `image_png` and `note` fields are device-local decoration and are
/// excluded from the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: UserId,
    /// The calendar date the meal was favorited under. Incidental.
    pub date: CalendarDate,
    pub name: String,
    pub components: Vec<MealComponent>,
    /// Attached image, if the user added one on this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_png: Option<Vec<u8>>,
    /// Free-text note, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Last update timestamp (epoch millis).
    pub updated_at: i64,
}

impl FavoriteRecord {
    pub fn new(user_id: UserId, date: CalendarDate, name: impl Into<String>, components: Vec<MealComponent>) -> Self {
        Self {
            user_id,
            date,
            name: name.into(),
            components,
            image_png: None,
            note: None,
            updated_at: epoch_millis(),
        }
    }
}
