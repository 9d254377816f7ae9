// marksync/src/domain/tag.rs
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::{DomainError, DomainResult};

/// Represents a single tag as a value object.
///
/// Storage is case-preserving ("Rust" stays "Rust"), but identity is
/// case-insensitive: "rust" and "Rust" are the same tag for membership,
/// filtering and counting.
#[derive(Debug, Clone)]
pub struct Tag {
    value: String,
}

impl Tag {
    /// Creates a new Tag with validation
    pub fn new<S: AsRef<str>>(value: S) -> DomainResult<Self> {
        let value = value.as_ref().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::InvalidTag("Tag cannot be empty".to_string()));
        }

        if value.contains(',') {
            return Err(DomainError::InvalidTag(
                "Tag cannot contain commas".to_string(),
            ));
        }

        Ok(Self { value })
    }

    /// Get the tag value as stored (original casing)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Case-insensitive match against a raw string
    pub fn matches(&self, other: &str) -> bool {
        self.value.eq_ignore_ascii_case(other.trim())
    }

    /// Deduplicate a list of raw strings into tags, preserving selection order.
    /// Later case-variants of an already-seen tag are ignored.
    pub fn parse_list<S: AsRef<str>>(values: &[S]) -> DomainResult<Vec<Tag>> {
        let mut result: Vec<Tag> = Vec::with_capacity(values.len());

        for value in values {
            let tag = Tag::new(value)?;
            if !result.contains(&tag) {
                result.push(tag);
            }
        }

        Ok(result)
    }

    /// Check whether a tag list contains the given name, case-insensitively
    pub fn list_contains(tags: &[Tag], name: &str) -> bool {
        tags.iter().any(|tag| tag.matches(name))
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

// wire values go through the same validation as constructed ones
impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tag::new(&raw).map_err(D::Error::custom)
    }
}
