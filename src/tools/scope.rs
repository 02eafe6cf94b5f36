//! Handle acquisition shared by the tool handlers.
//!
//! With a session id the handle comes from the registry. Without one an ad
//! hoc session is opened for the single operation and closed afterwards,
//! whatever the outcome.

use crate::db::{Connector, SessionGuard, SessionRegistry};
use crate::error::DbResult;
use crate::models::ConnectionConfig;

/// An exclusive handle for the length of one operation.
pub(crate) struct ScopedHandle<C: Connector> {
    pub session_id: String,
    pub guard: SessionGuard<C::Handle>,
    ad_hoc: bool,
}

impl<C: Connector> ScopedHandle<C> {
    pub async fn acquire(
        registry: &SessionRegistry<C>,
        config: &ConnectionConfig,
        session_id: Option<&str>,
    ) -> DbResult<Self> {
        match session_id {
            Some(id) => Ok(Self {
                session_id: id.to_string(),
                guard: registry.get(id).await?,
                ad_hoc: false,
            }),
            None => {
                let (session_id, guard) = registry.connect(config, None).await?;
                Ok(Self {
                    session_id,
                    guard,
                    ad_hoc: true,
                })
            }
        }
    }

    /// Give the handle back, closing the session if it was opened ad hoc.
    pub async fn release(self, registry: &SessionRegistry<C>) {
        let Self {
            session_id,
            guard,
            ad_hoc,
        } = self;
        // close() locks the handle itself
        drop(guard);
        if ad_hoc {
            registry.close(&session_id).await;
        }
    }
}
