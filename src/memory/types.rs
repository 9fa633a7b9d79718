//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the three extraction categories), [`MemoryTag`]
//! (the closed labeling vocabulary), [`Memory`] (a persisted record), and
//! [`MemoryCreate`] (the insert request shape).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three memory categories the extraction layer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryType {
    /// Health-related information: symptoms, mood, sleep, nutrition,
    /// medication, hydration, stress, fitness achievements.
    Wellness,
    /// Daily activities and goals: routines, tasks, achievements,
    /// challenges, celebrations.
    Lifestyle,
    /// Personal context and preferences: identity, relationships, work,
    /// location.
    Personal,
}

impl MemoryType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wellness => "WELLNESS",
            Self::Lifestyle => "LIFESTYLE",
            Self::Personal => "PERSONAL",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WELLNESS" => Ok(Self::Wellness),
            "LIFESTYLE" => Ok(Self::Lifestyle),
            "PERSONAL" => Ok(Self::Personal),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Closed labeling vocabulary for memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTag {
    // Wellness
    Mood,
    Symptom,
    Activity,
    Sleep,
    Nutrition,
    Medication,
    Hydration,
    Stress,
    Achievement,
    // Lifestyle
    Goal,
    Routine,
    Task,
    Challenge,
    Celebration,
    // Personal
    Identity,
    Preference,
    Relationship,
    Work,
    Location,
}

impl MemoryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::Symptom => "symptom",
            Self::Activity => "activity",
            Self::Sleep => "sleep",
            Self::Nutrition => "nutrition",
            Self::Medication => "medication",
            Self::Hydration => "hydration",
            Self::Stress => "stress",
            Self::Achievement => "achievement",
            Self::Goal => "goal",
            Self::Routine => "routine",
            Self::Task => "task",
            Self::Challenge => "challenge",
            Self::Celebration => "celebration",
            Self::Identity => "identity",
            Self::Preference => "preference",
            Self::Relationship => "relationship",
            Self::Work => "work",
            Self::Location => "location",
        }
    }
}

impl std::fmt::Display for MemoryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mood" => Ok(Self::Mood),
            "symptom" => Ok(Self::Symptom),
            "activity" => Ok(Self::Activity),
            "sleep" => Ok(Self::Sleep),
            "nutrition" => Ok(Self::Nutrition),
            "medication" => Ok(Self::Medication),
            "hydration" => Ok(Self::Hydration),
            "stress" => Ok(Self::Stress),
            "achievement" => Ok(Self::Achievement),
            "goal" => Ok(Self::Goal),
            "routine" => Ok(Self::Routine),
            "task" => Ok(Self::Task),
            "challenge" => Ok(Self::Challenge),
            "celebration" => Ok(Self::Celebration),
            "identity" => Ok(Self::Identity),
            "preference" => Ok(Self::Preference),
            "relationship" => Ok(Self::Relationship),
            "work" => Ok(Self::Work),
            "location" => Ok(Self::Location),
            _ => Err(format!("unknown memory tag: {s}")),
        }
    }
}

/// A persisted memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Extraction category.
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Natural-language content.
    pub text: String,
    /// Structured side payload (arbitrary JSON object).
    pub data: Value,
    /// Labels from the closed tag vocabulary.
    pub tags: Vec<MemoryTag>,
    /// Embedding vector; `None` until computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// Request shape for inserting a memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCreate {
    pub user_id: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub text: String,
    #[serde(default = "empty_object")]
    pub data: Value,
    #[serde(default)]
    pub tags: Vec<MemoryTag>,
    #[serde(default)]
    pub deleted: bool,
    /// Creation timestamp; filled with "now" at insert time when absent.
    #[serde(default)]
    pub created_at: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl MemoryCreate {
    pub fn new(user_id: &str, memory_type: MemoryType, text: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            memory_type,
            text: text.to_string(),
            data: empty_object(),
            tags: Vec::new(),
            deleted: false,
            created_at: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_tags(mut self, tags: Vec<MemoryTag>) -> Self {
        self.tags = tags;
        self
    }
}

/// Join tags into the comma-separated form used by vector metadata.
pub fn join_tags(tags: &[MemoryTag]) -> Vec<String> {
    tags.iter().map(|t| t.as_str().to_string()).collect()
}
