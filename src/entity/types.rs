//! Entity record and collection definitions.
//!
//! A [`UserEntity`] is a structured, semi-permanent fact about a user
//! (a relationship, a goal, a health condition), addressed by a
//! human-readable slug and carrying a free-form JSON body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of collection buckets an entity can belong to.
///
/// `Misc` is the documented fallback for facts that fit nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCollection {
    /// Name, birth date, identity documents.
    Identity,
    /// Family, friends, relationships.
    Social,
    /// Jobs, career, education.
    Professional,
    /// Conditions, medications, providers.
    Health,
    /// Routines, diet, living situation.
    Lifestyle,
    /// Goals, hobbies, projects.
    Pursuits,
    /// Possessions, finances, subscriptions.
    Resources,
    /// Achievements and life events.
    Milestones,
    /// Anything genuinely unclassifiable.
    Misc,
}

impl EntityCollection {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Social => "social",
            Self::Professional => "professional",
            Self::Health => "health",
            Self::Lifestyle => "lifestyle",
            Self::Pursuits => "pursuits",
            Self::Resources => "resources",
            Self::Milestones => "milestones",
            Self::Misc => "misc",
        }
    }

    /// Lenient parse for boundary input: unknown strings land in `Misc`.
    pub fn parse_or_misc(s: &str) -> Self {
        s.parse().unwrap_or(Self::Misc)
    }
}

impl Default for EntityCollection {
    fn default() -> Self {
        Self::Misc
    }
}

impl std::fmt::Display for EntityCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "social" => Ok(Self::Social),
            "professional" => Ok(Self::Professional),
            "health" => Ok(Self::Health),
            "lifestyle" => Ok(Self::Lifestyle),
            "pursuits" => Ok(Self::Pursuits),
            "resources" => Ok(Self::Resources),
            "milestones" => Ok(Self::Milestones),
            "misc" => Ok(Self::Misc),
            _ => Err(format!("unknown entity collection: {s}")),
        }
    }
}

/// A user entity row, matching the `user_entities` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntity {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Human-readable identifier, unique per user
    /// (e.g. `dave/father` or `dave/goal.marathon-2026`).
    pub slug: String,
    /// Collection bucket.
    pub collection: EntityCollection,
    /// Free-form category within the collection (e.g. `"father"`, `"goal"`).
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Arbitrary JSON body. Carries an `id` mirror and a `meta` object
    /// (`created_source`, `last_updated`, optional `archive_reason`).
    pub data: Value,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp of the last mutation.
    pub updated_at: String,
    /// Set when soft-deleted; `None` means live.
    pub archived_at: Option<String>,
}

impl UserEntity {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
