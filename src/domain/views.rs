// marksync/src/domain/views.rs
//! Derived views over the bookmark collection.
//!
//! Everything here is a pure function of a collection snapshot plus the active
//! filter state. Nothing is cached; callers recompute whenever an input changes
//! so there is never a second source of truth.

use itertools::Itertools;

use crate::domain::bookmark::Bookmark;
use crate::domain::category::{Category, Filter};
use crate::domain::tag::Tag;

/// Active filter state of the list view: free-text query, chip, selected tag.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub query: String,
    pub filter: Filter,
    pub selected_tag: Option<String>,
}

impl ListFilter {
    fn accepts(&self, bookmark: &Bookmark) -> bool {
        let matches_tag = match &self.selected_tag {
            Some(tag) => bookmark.has_tag(tag),
            None => true,
        };

        bookmark.matches_query(&self.query) && self.filter.accepts(bookmark) && matches_tag
    }
}

/// One pass over the snapshot; order of the input is preserved.
pub fn visible<'a>(items: &'a [Bookmark], filter: &ListFilter) -> Vec<&'a Bookmark> {
    items.iter().filter(|b| filter.accepts(b)).collect()
}

/// Sidebar counts: total, favorites and the three real categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SidebarCounts {
    pub all: usize,
    pub favorites: usize,
    pub work: usize,
    pub learning: usize,
    pub personal: usize,
}

pub fn counts(items: &[Bookmark]) -> SidebarCounts {
    let mut counts = SidebarCounts {
        all: items.len(),
        ..SidebarCounts::default()
    };

    for bookmark in items {
        if bookmark.is_favorite {
            counts.favorites += 1;
        }
        match bookmark.category {
            Category::Work => counts.work += 1,
            Category::Learning => counts.learning += 1,
            Category::Personal => counts.personal += 1,
            Category::All => {}
        }
    }

    counts
}

/// The preset sidebar vocabulary; callers may pass their own to `tag_summary`.
pub fn default_vocabulary() -> Vec<Tag> {
    ["development", "learning", "news", "website", "others"]
        .iter()
        .map(|name| Tag::new(name).expect("preset tags are valid"))
        .collect()
}

/// Usage count per vocabulary tag (case-insensitive membership), in vocabulary
/// order. Tags outside the vocabulary are not reported here.
pub fn tag_summary(items: &[Bookmark], vocabulary: &[Tag]) -> Vec<(Tag, usize)> {
    vocabulary
        .iter()
        .map(|tag| {
            let count = items.iter().filter(|b| b.has_tag(tag.value())).count();
            (tag.clone(), count)
        })
        .collect()
}

/// Frequency of every tag present in the collection, most used first, ties
/// broken alphabetically.
pub fn tag_usage(items: &[Bookmark]) -> Vec<(Tag, usize)> {
    items
        .iter()
        .flat_map(|b| b.tags.iter().cloned())
        .counts()
        .into_iter()
        .sorted_by(|(a, ca), (b, cb)| {
            cb.cmp(ca)
                .then_with(|| a.value().to_lowercase().cmp(&b.value().to_lowercase()))
        })
        .collect()
}
