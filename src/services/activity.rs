use std::sync::Arc;

use uuid::Uuid;

use crate::models::NewActivityLog;
use crate::session::SessionContext;
use crate::store::Store;

/// Best-effort audit trail writer. Failures are logged and never surface to
/// the caller.
#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn Store>,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns whether the entry was written.
    pub async fn log(
        &self,
        actor: &SessionContext,
        action: &str,
        details: Option<String>,
        target_type: &str,
        target_id: Option<Uuid>,
    ) -> bool {
        let entry = NewActivityLog::new(actor.user_id, action, details, target_type, target_id);
        match self.store.insert_activity(entry).await {
            Ok(_) => true,
            Err(err) => {
                log::warn!("Failed to record activity '{action}' for {target_type}: {err:?}");
                false
            }
        }
    }
}
