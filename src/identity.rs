//! Content-addressed identity for favorited meals.
//!
//! Two devices that independently favorite the same composition must agree
//! on its identity without ever exchanging keys. The hash is computed over a
//! normalized projection of the record: the calendar date is forced to the
//! sentinel, attached images and free-text notes are stripped, and only the
//! nutrition-bearing and structural fields of each component are kept.
//!
//! The projection is an explicit value type so no throwaway domain clones
//! are built just to serialize them. Struct field order is fixed at compile
//! time, so `serde_json::to_vec` of the projection is a canonical byte form.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::record::{CalendarDate, FavoriteRecord, SyncRecord, UserId};

/// SHA-256 of a normalized favorite, hex-encoded (64 lowercase chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The hash input. Field order here is the wire contract: changing it (or
/// adding a field) changes every hash, which splits identities across app
/// versions.
#[derive(Serialize)]
struct NormalizedFavorite<'a> {
    date: CalendarDate,
    name: &'a str,
    components: Vec<NormalizedComponent<'a>>,
}

#[derive(Serialize)]
struct NormalizedComponent<'a> {
    food_name: &'a str,
    grams: f64,
    kcal: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
}

/// Compute the stable content identity of a favorite.
///
/// Deterministic across process restarts and devices: same composition in,
/// same hash out. Mutating the date, image or note does not change the
/// result; mutating any nutrition-bearing field does.
#[must_use]
pub fn content_hash(record: &FavoriteRecord) -> ContentHash {
    let normalized = NormalizedFavorite {
        date: CalendarDate::sentinel(),
        name: &record.name,
        components: record
            .components
            .iter()
            .map(|c| NormalizedComponent {
                food_name: &c.food_name,
                grams: c.grams,
                kcal: c.kcal,
                protein_g: c.protein_g,
                carbs_g: c.carbs_g,
                fat_g: c.fat_g,
            })
            .collect(),
    };

    // Projection is plain strings and finite floats; serialization cannot
    // fail for well-formed records, and a NaN macro value is a programmer
    // error upstream.
    let bytes = serde_json::to_vec(&normalized).expect("normalized projection serializes");
    let digest = Sha256::digest(&bytes);
    ContentHash(hex::encode(digest))
}

impl SyncRecord for FavoriteRecord {
    type Key = ContentHash;
    const KIND: &'static str = "favorite";

    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn key(&self) -> ContentHash {
        content_hash(self)
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}
