// marksync/src/application/services/reconciler.rs
//! The bookmark list reconciler.
//!
//! Owns the in-memory, insertion-ordered collection and mediates every
//! mutation between optimistic local application and backend confirmation,
//! while merging change-feed notifications into the same collection. All
//! state changes happen under one mutex; the lock is never held across an
//! await, so independent mutations proceed concurrently.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::bookmark::{urls_collide, Bookmark, BookmarkPatch, NewBookmark};
use crate::domain::category::{Category, SortOrder};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::gateways::change_feed::ChangeEvent;
use crate::domain::gateways::store::BookmarkStore;
use crate::domain::tag::Tag;

#[derive(Debug, Default)]
struct ListState {
    items: Vec<Bookmark>,
    loading: bool,
    // monotonic reload tag; a result older than the newest started reload
    // is discarded (last-reload-wins)
    reload_seq: u64,
    last_order: SortOrder,
}

#[derive(Debug)]
pub struct BookmarkReconciler {
    owner: Uuid,
    store: Arc<dyn BookmarkStore>,
    state: Mutex<ListState>,
}

impl BookmarkReconciler {
    pub fn new(owner: Uuid, store: Arc<dyn BookmarkStore>) -> Self {
        Self {
            owner,
            store,
            state: Mutex::new(ListState::default()),
        }
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read-only copy for rendering and derived views
    pub fn snapshot(&self) -> Vec<Bookmark> {
        self.state().items.clone()
    }

    /// True only while the newest reload is in flight
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Replace the collection wholesale from the store.
    ///
    /// Any not-yet-confirmed optimistic row is discarded by the replacement;
    /// callers must not reload while a mutation is outstanding if they need it
    /// preserved. Safe to fire repeatedly: if a newer reload has started by
    /// the time this one's rows arrive, they are dropped.
    #[instrument(skip(self), level = "debug")]
    pub async fn reload(&self, order: SortOrder) -> DomainResult<()> {
        let seq = {
            let mut state = self.state();
            state.loading = true;
            state.last_order = order;
            state.reload_seq += 1;
            state.reload_seq
        };

        let result = self.store.fetch_all(self.owner, order).await;

        let mut state = self.state();
        if state.reload_seq != seq {
            debug!("discarding stale reload result (seq {})", seq);
            return Ok(());
        }
        state.loading = false;

        match result {
            Ok(rows) => {
                state.items = rows;
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Optimistic insert: provisional row first, canonical row (or rollback)
    /// after the store answers.
    ///
    /// The provisional row goes to the front regardless of the active sort;
    /// an oldest-first display shows a transient inversion until the next
    /// reload. After this call settles no provisional row from it remains.
    #[instrument(skip(self, tags), level = "debug", fields(url = %url))]
    pub async fn insert(
        &self,
        title: &str,
        url: &str,
        category: Category,
        tags: Vec<Tag>,
    ) -> DomainResult<Bookmark> {
        let draft = NewBookmark::new(self.owner, title, url, category, tags)?;
        let provisional = Bookmark::provisional(&draft);
        let provisional_id = provisional.id;

        {
            let mut state = self.state();
            if state.items.iter().any(|b| urls_collide(&b.url, &draft.url)) {
                return Err(DomainError::DuplicateConflict);
            }
            state.items.insert(0, provisional);
        }

        match self.store.insert(&draft).await {
            Ok(canonical) => {
                let mut state = self.state();
                state.items.retain(|b| b.id != provisional_id);
                state.items.insert(0, canonical.clone());
                Ok(canonical)
            }
            Err(error) => {
                debug!("insert rejected by store, rolling back: {}", error);
                let mut state = self.state();
                state.items.retain(|b| b.id != provisional_id);
                Err(error.into())
            }
        }
    }

    /// Store-first update: confirmed fields only are applied locally, so an
    /// unvalidated edit is never displayed. On store failure the collection
    /// is untouched.
    #[instrument(skip(self, patch), level = "debug")]
    pub async fn update(&self, id: Uuid, patch: &BookmarkPatch) -> DomainResult<()> {
        patch.validate()?;

        if !self.state().items.iter().any(|b| b.id == id) {
            return Err(DomainError::NotFound(id));
        }
        if patch.is_empty() {
            return Ok(());
        }

        self.store.update(id, patch).await.map_err(DomainError::from)?;

        let mut state = self.state();
        match state.items.iter_mut().find(|b| b.id == id) {
            Some(bookmark) => bookmark.apply_patch(patch),
            // deleted underneath us between confirm and apply; the change
            // feed delivers the authoritative outcome
            None => debug!("updated bookmark {} vanished locally", id),
        }
        Ok(())
    }

    /// Optimistic flip; a store failure is rolled back by reloading, which
    /// also absorbs any interleaved remote change. Returns the confirmed
    /// favorite state.
    #[instrument(skip(self), level = "debug")]
    pub async fn toggle_favorite(&self, id: Uuid) -> DomainResult<bool> {
        let next = {
            let mut state = self.state();
            let bookmark = state
                .items
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or(DomainError::NotFound(id))?;
            bookmark.is_favorite = !bookmark.is_favorite;
            bookmark.is_favorite
        };

        match self.store.update(id, &BookmarkPatch::favorite(next)).await {
            Ok(()) => Ok(next),
            Err(error) => {
                let order = self.state().last_order;
                if let Err(reload_error) = self.reload(order).await {
                    warn!("resynchronizing reload failed: {}", reload_error);
                }
                Err(error.into())
            }
        }
    }

    /// Optimistic delete with positional rollback. A missing id is a no-op
    /// success: the record is already gone, which is what the caller wanted.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let (removed, position) = {
            let mut state = self.state();
            match state.items.iter().position(|b| b.id == id) {
                None => return Ok(()),
                Some(position) => (state.items.remove(position), position),
            }
        };

        match self.store.delete(id).await {
            Ok(()) => Ok(()),
            Err(error) => {
                debug!("delete rejected by store, restoring: {}", error);
                let mut state = self.state();
                let position = position.min(state.items.len());
                state.items.insert(position, removed);
                Err(error.into())
            }
        }
    }

    /// Merge one change-feed notification. Purely local, idempotent and
    /// order-tolerant; never contacts the store.
    ///
    /// Row events replace the local record wholesale (last-delivered-wins,
    /// no field merge), so a stale remote update can overwrite a confirmed
    /// local edit; that race is accepted. Rows of a foreign owner never enter
    /// the collection.
    pub fn apply_remote(&self, event: ChangeEvent) {
        let mut state = self.state();
        match event {
            ChangeEvent::Deleted(id) => {
                state.items.retain(|b| b.id != id);
            }
            ChangeEvent::Inserted(row) | ChangeEvent::Updated(row) => {
                if row.owner != self.owner {
                    debug!("dropping change-feed row of foreign owner");
                    return;
                }
                match state.items.iter_mut().find(|b| b.id == row.id) {
                    Some(existing) => *existing = row,
                    None => state.items.insert(0, row),
                }
            }
        }
    }

    /// Raw-payload entry point for hosts that own the feed transport.
    /// Malformed payloads are dropped without touching the collection.
    pub fn apply_remote_payload(&self, payload: &Value) {
        match ChangeEvent::from_payload(payload) {
            Some(event) => self.apply_remote(event),
            None => debug!("dropping malformed change-feed payload"),
        }
    }
}
