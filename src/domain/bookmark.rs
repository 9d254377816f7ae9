// marksync/src/domain/bookmark.rs
use std::fmt;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::category::Category;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tag::Tag;

/// Trim-normalization applied to every url before comparison or storage.
pub fn normalize_url(url: &str) -> &str {
    url.trim()
}

/// Case-insensitive equality of two urls after normalization; this is the
/// duplicate criterion, mirroring the store's uniqueness constraint.
pub fn urls_collide(a: &str, b: &str) -> bool {
    normalize_url(a).eq_ignore_ascii_case(normalize_url(b))
}

/// Represents a bookmark domain entity.
///
/// A record is either canonical (store-assigned id) or provisional (client
/// generated id awaiting confirmation); both carry the same shape, the
/// reconciler swaps one for the other.
/// Serde names follow the backend's column names, so the same shape moves
/// through the REST gateway and the change feed unchanged.
#[derive(Builder, Clone, PartialEq, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct Bookmark {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub owner: Uuid,
    pub title: String,
    pub url: String,
    // nullable column; anything unknown or absent is uncategorized
    #[builder(default)]
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: Category,
    #[builder(default = "false")]
    pub is_favorite: bool,
    #[builder(default)]
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Category, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(Category::from_wire).unwrap_or_default())
}

fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Tag>, D::Error> {
    Ok(Option::<Vec<Tag>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Bookmark {
    /// Build the provisional record for an optimistic insert: fresh client id,
    /// never favorite, current timestamps.
    pub fn provisional(draft: &NewBookmark) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: draft.owner,
            title: draft.title.clone(),
            url: draft.url.clone(),
            category: draft.category,
            is_favorite: false,
            tags: draft.tags.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive membership check against the tag list
    pub fn has_tag(&self, name: &str) -> bool {
        Tag::list_contains(&self.tags, name)
    }

    /// Case-insensitive substring match against title or url
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&q) || self.url.to_lowercase().contains(&q)
    }

    /// Apply confirmed fields in place. `id` and `owner` never change here.
    pub fn apply_patch(&mut self, patch: &BookmarkPatch) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(url) = &patch.url {
            self.url = normalize_url(url).to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.id,
            self.title,
            self.url,
            self.tags
                .iter()
                .map(Tag::to_string)
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

impl fmt::Debug for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bookmark")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("category", &self.category)
            .field("is_favorite", &self.is_favorite)
            .field("tags", &self.tags)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Canonical fields sent to the store for an insert. The provisional id is
/// deliberately not part of this type.
#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub owner: Uuid,
    pub title: String,
    pub url: String,
    pub category: Category,
    pub tags: Vec<Tag>,
}

impl NewBookmark {
    pub fn new(
        owner: Uuid,
        title: &str,
        url: &str,
        category: Category,
        tags: Vec<Tag>,
    ) -> DomainResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::Validation("Title is required".to_string()));
        }

        let url = normalize_url(url);
        if url.is_empty() {
            return Err(DomainError::Validation("URL is required".to_string()));
        }

        Ok(Self {
            owner,
            title: title.to_string(),
            url: url.to_string(),
            category,
            tags,
        })
    }
}

/// Partial update of the editable fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct BookmarkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub category: Option<Category>,
    pub tags: Option<Vec<Tag>>,
    pub is_favorite: Option<bool>,
}

impl BookmarkPatch {
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// The one-field patch used by the favorite toggle
    pub fn favorite(value: bool) -> Self {
        Self {
            is_favorite: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.is_favorite.is_none()
    }

    /// A patch may not blank out title or url.
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(DomainError::Validation("Title is required".to_string()));
            }
        }
        if let Some(url) = &self.url {
            if normalize_url(url).is_empty() {
                return Err(DomainError::Validation("URL is required".to_string()));
            }
        }
        Ok(())
    }
}
