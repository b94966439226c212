//! Person and member records
//!
//! A [`Person`] is what a caller describes; a [`Member`] is a person once the
//! collection has stored it and handed out an identifier.

use super::property::{lookup_path, PropertyMap, PropertyValue};
use super::types::{NodeId, Position};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Descriptive record of one individual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Person {
    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    /// Lineage depth relative to an arbitrary zero point; `None` when unknown
    #[serde(default)]
    pub generation: Option<i64>,

    /// Free-form descriptive fields
    #[serde(default)]
    pub attributes: PropertyMap,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Person {
            first_name: first_name.into(),
            last_name: last_name.into(),
            generation: None,
            attributes: PropertyMap::new(),
        }
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A person stored in the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: NodeId,
    pub person: Person,

    /// Coordinates from the most recent layout pass
    pub position: Option<Position>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Member {
    pub fn new(id: NodeId, person: Person) -> Self {
        Member {
            id,
            person,
            position: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Generation used for layout; an unset generation counts as 0
    pub fn generation(&self) -> i64 {
        self.person.generation.unwrap_or(0)
    }

    /// Textual value of a named field, used for pattern search.
    ///
    /// `id`, `first_name`, `last_name` and `generation` address the member
    /// itself; every other path is resolved inside `attributes`.
    pub fn field_text(&self, path: &str) -> Option<String> {
        match path {
            "id" => Some(self.id.as_u64().to_string()),
            "first_name" => Some(self.person.first_name.clone()),
            "last_name" => Some(self.person.last_name.clone()),
            "generation" => self.person.generation.map(|g| g.to_string()),
            _ => lookup_path(&self.person.attributes, path).and_then(|v| v.match_text()),
        }
    }

    pub fn matches(&self, field: &str, pattern: &Regex) -> bool {
        self.field_text(field)
            .map(|text| pattern.is_match(&text))
            .unwrap_or(false)
    }
}

/// Partial update of a stored member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MemberPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub generation: Option<i64>,
    #[serde(default)]
    pub position: Option<Position>,

    /// Merged into the existing attributes key by key
    #[serde(default)]
    pub attributes: PropertyMap,
}

impl MemberPatch {
    pub fn position(position: Position) -> Self {
        MemberPatch {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.generation.is_none()
            && self.position.is_none()
            && self.attributes.is_empty()
    }

    pub fn apply(&self, member: &mut Member) {
        if let Some(first_name) = &self.first_name {
            member.person.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            member.person.last_name = last_name.clone();
        }
        if let Some(generation) = self.generation {
            member.person.generation = Some(generation);
        }
        if let Some(position) = self.position {
            member.position = Some(position);
        }
        for (key, value) in &self.attributes {
            member.person.attributes.insert(key.clone(), value.clone());
        }
    }
}
