// marksync/src/domain/gateways/change_feed.rs
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::bookmark::Bookmark;
use crate::domain::error::DomainResult;
use crate::domain::gateways::session::AuthToken;

/// Row-level change notification for the current owner. Delivery is
/// at-least-once and may be reordered relative to local operations.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Inserted(Bookmark),
    Updated(Bookmark),
    Deleted(Uuid),
}

impl ChangeEvent {
    /// Decode a raw feed payload. The feed is an untrusted best-effort
    /// channel: anything malformed (unknown kind, missing row, missing id)
    /// yields `None` and is dropped by the caller without mutation.
    ///
    /// Accepts both the generic shape `{type, row|id}` and the
    /// postgres-changes shape `{eventType, new, old: {id}}`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let kind = payload
            .get("type")
            .or_else(|| payload.get("eventType"))?
            .as_str()?
            .to_ascii_uppercase();

        let row = || {
            payload
                .get("row")
                .or_else(|| payload.get("new"))
                .or_else(|| payload.get("record"))
                .and_then(|v| serde_json::from_value::<Bookmark>(v.clone()).ok())
        };

        match kind.as_str() {
            "INSERT" => row().map(ChangeEvent::Inserted),
            "UPDATE" => row().map(ChangeEvent::Updated),
            "DELETE" => {
                let id = payload
                    .get("id")
                    .or_else(|| payload.get("old").and_then(|old| old.get("id")))
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok())?;
                Some(ChangeEvent::Deleted(id))
            }
            other => {
                debug!("ignoring change-feed payload of kind {}", other);
                None
            }
        }
    }
}

/// Live subscription to the change feed.
///
/// The handle is the owned resource from the subscription lifecycle: events
/// are pulled until the feed ends, re-authorization happens in place (buffered
/// events are kept), and the underlying subscription is released exactly once,
/// on `close` or on drop, whichever comes first.
pub struct FeedHandle {
    events: mpsc::Receiver<ChangeEvent>,
    on_auth: Box<dyn Fn(&AuthToken) + Send + Sync>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl FeedHandle {
    pub fn new(
        events: mpsc::Receiver<ChangeEvent>,
        on_auth: Box<dyn Fn(&AuthToken) + Send + Sync>,
        on_close: Box<dyn FnOnce() + Send>,
    ) -> Self {
        Self {
            events,
            on_auth,
            on_close: Some(on_close),
        }
    }

    /// Next notification, or `None` once the feed is closed upstream
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Re-authorize the running subscription without resubscribing
    pub fn set_auth(&self, token: &AuthToken) {
        (self.on_auth)(token);
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedHandle")
            .field("open", &self.on_close.is_some())
            .finish()
    }
}

/// Source of change-feed subscriptions, one per owner/session.
#[async_trait]
pub trait ChangeFeed: Send + Sync + std::fmt::Debug {
    async fn subscribe(&self, owner: Uuid, token: Option<AuthToken>) -> DomainResult<FeedHandle>;
}
