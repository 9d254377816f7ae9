// marksync/src/infrastructure/gateways/memory.rs
//! In-process store, feed and session doubles.
//!
//! The memory store enforces the same per-owner url uniqueness constraint as
//! the backend and publishes a change event for every confirmed mutation, so
//! several reconcilers over one store observe each other exactly like browser
//! tabs sharing a hosted database.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use crate::domain::bookmark::{urls_collide, Bookmark, BookmarkPatch, NewBookmark};
use crate::domain::category::SortOrder;
use crate::domain::error::DomainResult;
use crate::domain::gateways::change_feed::{ChangeEvent, ChangeFeed, FeedHandle};
use crate::domain::gateways::session::{AuthToken, SessionProvider};
use crate::domain::gateways::store::{BookmarkStore, StoreError, StoreResult};

const FEED_BUFFER: usize = 64;

#[derive(Debug)]
pub struct MemoryBookmarkStore {
    rows: Mutex<Vec<Bookmark>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryBookmarkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(FEED_BUFFER);
        Self {
            rows: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Change feed fed by this store's confirmed mutations
    pub fn feed(&self) -> MemoryChangeFeed {
        MemoryChangeFeed {
            events: self.events.clone(),
        }
    }

    /// Pre-populate rows without emitting events
    pub fn seed(&self, rows: Vec<Bookmark>) {
        self.rows().extend(rows);
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    fn rows(&self) -> MutexGuard<'_, Vec<Bookmark>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: ChangeEvent) {
        // nobody subscribed is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn fetch_all(&self, owner: Uuid, order: SortOrder) -> StoreResult<Vec<Bookmark>> {
        let mut rows: Vec<Bookmark> = self
            .rows()
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.created_at);
        if !order.ascending() {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn insert(&self, draft: &NewBookmark) -> StoreResult<Bookmark> {
        let canonical = {
            let mut rows = self.rows();
            let duplicate = rows
                .iter()
                .any(|b| b.owner == draft.owner && urls_collide(&b.url, &draft.url));
            if duplicate {
                return Err(StoreError::conflict(
                    "duplicate key value violates unique constraint \"bookmarks_user_id_url_key\"",
                ));
            }

            let now = Utc::now();
            let canonical = Bookmark {
                id: Uuid::new_v4(),
                owner: draft.owner,
                title: draft.title.clone(),
                url: draft.url.clone(),
                category: draft.category,
                is_favorite: false,
                tags: draft.tags.clone(),
                created_at: now,
                updated_at: now,
            };
            rows.push(canonical.clone());
            canonical
        };

        self.publish(ChangeEvent::Inserted(canonical.clone()));
        Ok(canonical)
    }

    async fn update(&self, id: Uuid, patch: &BookmarkPatch) -> StoreResult<()> {
        let updated = {
            let mut rows = self.rows();
            match rows.iter_mut().find(|b| b.id == id) {
                Some(row) => {
                    row.apply_patch(patch);
                    Some(row.clone())
                }
                // matching PostgREST: a patch over no rows is not an error
                None => None,
            }
        };

        if let Some(row) = updated {
            self.publish(ChangeEvent::Updated(row));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let removed = {
            let mut rows = self.rows();
            let before = rows.len();
            rows.retain(|b| b.id != id);
            rows.len() < before
        };

        if removed {
            self.publish(ChangeEvent::Deleted(id));
        }
        Ok(())
    }
}

/// Feed of the memory store's confirmed mutations, filtered per owner.
#[derive(Debug, Clone)]
pub struct MemoryChangeFeed {
    events: broadcast::Sender<ChangeEvent>,
}

#[async_trait]
impl ChangeFeed for MemoryChangeFeed {
    async fn subscribe(&self, owner: Uuid, _token: Option<AuthToken>) -> DomainResult<FeedHandle> {
        let mut source = self.events.subscribe();
        let (tx, out) = mpsc::channel(FEED_BUFFER);

        let forward = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        let matches = match &event {
                            ChangeEvent::Inserted(row) | ChangeEvent::Updated(row) => {
                                row.owner == owner
                            }
                            // delete events carry only the id; unknown ids are
                            // no-ops on the receiving side anyway
                            ChangeEvent::Deleted(_) => true,
                        };
                        if matches && tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let abort = forward.abort_handle();
        Ok(FeedHandle::new(
            out,
            // in-process feed needs no re-authorization
            Box::new(|_| {}),
            Box::new(move || abort.abort()),
        ))
    }
}

/// Session double holding a rotatable token.
#[derive(Debug)]
pub struct StaticSessionProvider {
    token: watch::Sender<Option<AuthToken>>,
}

impl StaticSessionProvider {
    pub fn new(token: Option<AuthToken>) -> Self {
        let (tx, _) = watch::channel(token);
        Self { token: tx }
    }

    /// Simulate a refresh: observers see the new token. `send_replace` keeps
    /// the stored value current even with no subscriber around.
    pub fn rotate(&self, token: Option<AuthToken>) {
        self.token.send_replace(token);
    }
}

impl SessionProvider for StaticSessionProvider {
    fn current_token(&self) -> Option<AuthToken> {
        self.token.borrow().clone()
    }

    fn watch_token(&self) -> watch::Receiver<Option<AuthToken>> {
        self.token.subscribe()
    }
}
