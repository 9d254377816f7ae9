// marksync/src/domain/category.rs
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::bookmark::Bookmark;

/// Fixed category assignment of a bookmark. `All` doubles as "uncategorized".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Work,
    Learning,
    Personal,
}

// Unknown values coming off the wire collapse to All, matching the backend's
// nullable column semantics.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::from_wire(&raw))
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Work => "work",
            Category::Learning => "learning",
            Category::Personal => "personal",
        }
    }

    /// Lenient wire decoding: anything unrecognized is uncategorized.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "work" => Category::Work,
            "learning" => Category::Learning,
            "personal" => Category::Personal,
            _ => Category::All,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chip filter over the list: the category chips plus the favorites chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Favorites,
    Work,
    Learning,
    Personal,
}

impl Filter {
    /// Exhaustive dispatch keeps the compiler honest when chips change.
    pub fn accepts(&self, bookmark: &Bookmark) -> bool {
        match self {
            Filter::All => true,
            Filter::Favorites => bookmark.is_favorite,
            Filter::Work => bookmark.category == Category::Work,
            Filter::Learning => bookmark.category == Category::Learning,
            Filter::Personal => bookmark.category == Category::Personal,
        }
    }
}

/// Default list ordering, driven by `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    pub fn ascending(&self) -> bool {
        matches!(self, SortOrder::OldestFirst)
    }
}
