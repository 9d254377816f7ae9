// marksync/src/domain/gateways/session.rs
use std::fmt;

use tokio::sync::watch;

/// Opaque credential authorizing the change-feed subscription. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(***)")
    }
}

/// Supplies the current credential and signals rotation.
///
/// Token refresh itself happens elsewhere; the core only needs to observe
/// changes so the feed subscription can be re-authorized in place.
pub trait SessionProvider: Send + Sync + std::fmt::Debug {
    fn current_token(&self) -> Option<AuthToken>;

    /// Rotation signal; receivers see the latest token value.
    fn watch_token(&self) -> watch::Receiver<Option<AuthToken>>;
}
