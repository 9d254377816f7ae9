// marksync/src/infrastructure/di/service_container.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::ApplicationResult;
use crate::application::services::realtime::RealtimeSync;
use crate::application::services::reconciler::BookmarkReconciler;
use crate::config::Settings;
use crate::domain::category::SortOrder;
use crate::domain::gateways::change_feed::ChangeFeed;
use crate::domain::gateways::session::SessionProvider;
use crate::domain::gateways::store::BookmarkStore;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::gateways::memory::{MemoryBookmarkStore, MemoryChangeFeed, StaticSessionProvider};
use crate::infrastructure::gateways::rest::RestBookmarkStore;

/// Explicitly constructed dependency set: store, feed and session are passed
/// in rather than reached through a process-wide client handle, so tests
/// substitute doubles at the same seams production uses.
pub struct ServiceContainer {
    pub store: Arc<dyn BookmarkStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub session: Arc<dyn SessionProvider>,
}

impl ServiceContainer {
    /// Wiring against the hosted backend. The realtime transport is owned by
    /// the host application, which passes its feed implementation in.
    pub fn hosted(
        settings: &Settings,
        session: Arc<dyn SessionProvider>,
        feed: Arc<dyn ChangeFeed>,
    ) -> ApplicationResult<Self> {
        if settings.service_url.is_empty() {
            return Err(InfrastructureError::Configuration(
                "service URL is not configured".to_string(),
            )
            .into());
        }

        let store = RestBookmarkStore::new(
            &settings.service_url,
            &settings.table,
            &settings.api_key,
            session.clone(),
        )?;

        Ok(Self {
            store: Arc::new(store),
            feed,
            session,
        })
    }

    /// Self-contained in-process wiring: memory store, its feed, a static
    /// session. Useful for tests and offline demos.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryBookmarkStore::new());
        let feed: Arc<MemoryChangeFeed> = Arc::new(store.feed());
        Self {
            store,
            feed,
            session: Arc::new(StaticSessionProvider::new(None)),
        }
    }

    pub fn reconciler(&self, owner: Uuid) -> Arc<BookmarkReconciler> {
        Arc::new(BookmarkReconciler::new(owner, self.store.clone()))
    }

    /// Reconciler plus running realtime pump for one owner/session
    pub async fn realtime(&self, owner: Uuid, order: SortOrder) -> ApplicationResult<RealtimeSync> {
        RealtimeSync::start(
            self.reconciler(owner),
            self.feed.clone(),
            self.session.clone(),
            order,
        )
        .await
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("store", &self.store)
            .field("feed", &self.feed)
            .finish()
    }
}
