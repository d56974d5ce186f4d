use std::sync::Arc;

use serde::Serialize;

use crate::engine::Shared;

/// Authenticated identity as reported by the identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Session change delivered by the identity subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Principal),
    SignedOut,
}

/// An explicit login, registration or account-link flow.
///
/// While one is alive, passive session events are ignored so the listener and
/// the operation cannot race to write conflicting state. The operation applies
/// its own outcome through [`IdentityOperation::complete`]; dropping it without
/// completing simply releases the lock.
pub struct IdentityOperation {
    shared: Arc<Shared>,
}

impl IdentityOperation {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Apply the session the operation ended in, release the lock, then load the sources.
    pub async fn complete(self, event: SessionEvent) {
        let shared = self.shared.clone();
        let change = shared.transition_session(&event);
        drop(self);
        if let Some(change) = change {
            shared.load_for(change).await;
        }
    }
}

impl Drop for IdentityOperation {
    fn drop(&mut self) {
        self.shared.identity_op.release();
    }
}
