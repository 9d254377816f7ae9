// marksync/src/application/services/realtime.rs
//! Realtime subscription lifecycle.
//!
//! One `RealtimeSync` per active owner/session: it performs the initial load,
//! holds the single feed subscription, pumps notifications into the
//! reconciler, re-authorizes when the session token rotates, and releases the
//! subscription exactly once on shutdown or drop. An owner change means
//! tearing this instance down and starting a new one.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::reconciler::BookmarkReconciler;
use crate::domain::category::SortOrder;
use crate::domain::gateways::change_feed::ChangeFeed;
use crate::domain::gateways::session::SessionProvider;

#[derive(Debug)]
pub struct RealtimeSync {
    reconciler: Arc<BookmarkReconciler>,
    task: Option<JoinHandle<()>>,
    stop: watch::Sender<bool>,
}

impl RealtimeSync {
    /// Authorize, load, then listen — the same order a fresh client session
    /// goes through.
    #[instrument(skip_all, fields(owner = %reconciler.owner()))]
    pub async fn start(
        reconciler: Arc<BookmarkReconciler>,
        feed: Arc<dyn ChangeFeed>,
        session: Arc<dyn SessionProvider>,
        order: SortOrder,
    ) -> ApplicationResult<Self> {
        reconciler.reload(order).await?;

        let mut handle = feed
            .subscribe(reconciler.owner(), session.current_token())
            .await
            .map_err(|error| ApplicationError::Subscription(error.to_string()))?;

        let (stop, mut stopped) = watch::channel(false);
        let mut token_rx = session.watch_token();
        let worker = reconciler.clone();

        let task = tokio::spawn(async move {
            // stops polling the token watch once the provider is gone, the
            // feed keeps running on the last credential
            let mut token_alive = true;
            loop {
                let mut rotated = false;
                tokio::select! {
                    event = handle.next_event() => match event {
                        Some(event) => worker.apply_remote(event),
                        None => {
                            debug!("change feed ended upstream");
                            break;
                        }
                    },
                    changed = token_rx.changed(), if token_alive => match changed {
                        Ok(()) => rotated = true,
                        Err(_) => token_alive = false,
                    },
                    _ = stopped.changed() => break,
                }
                if rotated {
                    if let Some(token) = token_rx.borrow_and_update().clone() {
                        handle.set_auth(&token);
                    }
                }
            }
            handle.close();
        });

        Ok(Self {
            reconciler,
            task: Some(task),
            stop,
        })
    }

    pub fn reconciler(&self) -> &Arc<BookmarkReconciler> {
        &self.reconciler
    }

    /// Graceful teardown: stops the pump and waits for the subscription to be
    /// released. Dropping without calling this releases it as well.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RealtimeSync {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}
