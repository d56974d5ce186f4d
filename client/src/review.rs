use std::sync::Arc;

use crate::engine::Shared;

/// Capability held by the plan review screen. Its leave action is the only way
/// to set `has_seen_pending_approval`; nothing automated can reach the setter.
pub struct ReviewScreen {
    shared: Arc<Shared>,
}

impl ReviewScreen {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// The user navigated away from the review screen. Returns whether the flag changed.
    pub fn leave(self) -> bool {
        self.shared.mark_pending_approval_seen()
    }
}
