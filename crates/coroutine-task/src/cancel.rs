use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

const DEFAULT_REASON: &str = "cancellation requested";

/// Why a coroutine was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason(Arc<str>);

impl CancelReason {
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        CancelReason(reason.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cooperative cancellation request, safe to trigger from any thread.
///
/// Wraps a [`CancellationToken`] so a coroutine can be tied into the same
/// token tree as the rest of the program. The first reason given wins.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel_with(DEFAULT_REASON);
    }

    pub fn cancel_with(&self, reason: impl Into<Arc<str>>) {
        // Reason is stored before the token flips so a reader that observes
        // the cancellation always finds it.
        self.reason.set(CancelReason::new(reason)).ok();
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason, once cancellation has been requested.
    pub fn reason(&self) -> Option<CancelReason> {
        if !self.token.is_cancelled() {
            return None;
        }
        Some(self.reason.get().cloned()
            .unwrap_or_else(|| CancelReason::new(DEFAULT_REASON)))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Signal that is cancelled with this one, but can also be cancelled alone.
    pub fn child(&self) -> Self {
        CancelSignal {
            token: self.token.child_token(),
            reason: Arc::default(),
        }
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        CancelSignal {
            token,
            reason: Arc::default(),
        }
    }
}
