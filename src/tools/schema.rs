//! Schema introspection tools.
//!
//! - `get_schema`: describe the current database at a chosen detail level
//! - `find_relationships`: declared foreign keys plus inferred ones

use crate::db::{Connector, RelationshipInferencer, SchemaIntrospector, SessionRegistry};
use crate::error::codes;
use crate::models::{
    ConnectionConfig, DetailLevel, FindRelationshipsParams, GetSchemaParams, Response,
    table_filter,
};
use crate::tools::dispatcher::{failure, rejected, success};
use crate::tools::scope::ScopedHandle;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Handler for schema tools.
pub struct SchemaToolHandler<C: Connector> {
    registry: Arc<SessionRegistry<C>>,
}

impl<C: Connector> SchemaToolHandler<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>) -> Self {
        Self { registry }
    }

    pub async fn get_schema(
        &self,
        config: &ConnectionConfig,
        session_id: Option<&str>,
        params: GetSchemaParams,
    ) -> Response {
        let start = Instant::now();

        let detail_level = match params.detail_level.as_deref() {
            None => DetailLevel::default(),
            Some(name) => match DetailLevel::parse(name) {
                Some(level) => level,
                None => {
                    return rejected(
                        codes::INVALID_PARAMETERS,
                        "Invalid detail_level parameter",
                        &format!("detail_level must be one of: {}", DetailLevel::VALID_VALUES),
                    );
                }
            },
        };

        let mut scope = match ScopedHandle::acquire(&self.registry, config, session_id).await {
            Ok(scope) => scope,
            Err(e) => return failure(&e, start),
        };

        let result = SchemaIntrospector::get_schema(
            &mut *scope.guard,
            detail_level,
            params.include_relationships,
            table_filter(params.tables.as_ref()),
        )
        .await;
        scope.release(&self.registry).await;

        match result {
            Ok(schema) => {
                info!(
                    database = %schema.database,
                    tables = schema.tables.len(),
                    detail_level = ?detail_level,
                    "Schema retrieved"
                );
                success(&schema, start)
            }
            Err(e) => failure(&e, start),
        }
    }

    pub async fn find_relationships(
        &self,
        config: &ConnectionConfig,
        session_id: Option<&str>,
        params: FindRelationshipsParams,
    ) -> Response {
        let start = Instant::now();

        let mut scope = match ScopedHandle::acquire(&self.registry, config, session_id).await {
            Ok(scope) => scope,
            Err(e) => return failure(&e, start),
        };

        let result = RelationshipInferencer::find_relationships(
            &mut *scope.guard,
            table_filter(params.tables.as_ref()),
            params.include_implicit,
        )
        .await;
        scope.release(&self.registry).await;

        match result {
            Ok(relationships) => {
                info!(
                    explicit = relationships.explicit.len(),
                    implicit = relationships.implicit.len(),
                    "Relationships retrieved"
                );
                success(&relationships, start)
            }
            Err(e) => failure(&e, start),
        }
    }
}
