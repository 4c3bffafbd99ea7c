use std::sync::OnceLock;

use tracing::warn;

/// Who the relay is on Discord.
///
/// The user id may be configured up front; the gateway `ready` payload fills
/// in whatever was not.
#[derive(Debug, Default)]
pub struct BotIdentity {
    configured_user_id: Option<u64>,
    user_id: OnceLock<u64>,
    application_id: OnceLock<u64>,
}

impl BotIdentity {
    pub fn new(configured_user_id: Option<u64>) -> Self {
        Self {
            configured_user_id,
            ..Self::default()
        }
    }

    /// Record the ids announced by the gateway.
    pub fn learn(&self, user_id: u64, application_id: u64) {
        if let Some(configured) = self.configured_user_id
            && configured != user_id
        {
            warn!(
                configured,
                gateway = user_id,
                "configured bot id differs from the gateway identity"
            );
        }
        let _ = self.user_id.set(user_id);
        let _ = self.application_id.set(application_id);
    }

    pub fn user_id(&self) -> Option<u64> {
        self.configured_user_id.or_else(|| self.user_id.get().copied())
    }

    fn is_own_id(&self, id: u64) -> bool {
        self.user_id() == Some(id)
            || self.user_id.get() == Some(&id)
            || self.application_id.get() == Some(&id)
    }

    /// Whether a message came from the relay: either its own account, or a
    /// webhook that belongs to its application.
    pub fn is_self_authored(
        &self,
        author_id: u64,
        webhook: bool,
        application_id: Option<u64>,
    ) -> bool {
        if self.is_own_id(author_id) {
            return true;
        }
        webhook && application_id.is_some_and(|id| self.is_own_id(id))
    }
}
