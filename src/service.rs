// Ingestion and query operations over a shared store

use crate::config::Config;
use crate::error::{IngestionError, QueryError};
use crate::ingest::{self, IngestReport};
use crate::projection::{self, Projection};
use crate::query::{Interpreter, QueryFilter};
use crate::shape::{ChartKind, Dataset};
use crate::store::SnapshotStore;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a successful query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub filter: QueryFilter,
    pub dataset: Dataset,
    /// Non-fatal conditions, such as requested countries matching nothing.
    #[serde(serialize_with = "serialize_messages")]
    pub warnings: Vec<QueryError>,
}

fn serialize_messages<S: Serializer>(
    errors: &[QueryError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

/// Entry point for both operations. Cheap to share across threads: every
/// query takes one snapshot handle from the store and works on it alone.
pub struct Service {
    store: Arc<dyn SnapshotStore>,
    config: Config,
    interpreter: Interpreter,
}

impl Service {
    pub fn new(store: Arc<dyn SnapshotStore>, config: Config) -> Self {
        let interpreter = Interpreter::new(&config.query);
        Self {
            store,
            config,
            interpreter,
        }
    }

    /// Normalize `content` and replace the stored snapshot.
    pub fn ingest(&self, content: &[u8]) -> Result<IngestReport, IngestionError> {
        ingest::ingest(self.store.as_ref(), content, &self.config.ingest)
    }

    pub fn interpret(&self, text: &str) -> QueryFilter {
        self.interpreter.interpret(text)
    }

    /// Interpret `text` and apply it to the current snapshot.
    pub fn select(&self, text: &str) -> Result<(QueryFilter, Projection), QueryError> {
        let snapshot = self.store.read()?;
        let filter = self.interpret(text);
        let projection = projection::project(&snapshot, &filter);
        debug!(
            rows = projection.rows.len(),
            years = projection.years.len(),
            "projected snapshot"
        );
        Ok((filter, projection))
    }

    /// Answer a free-text query with a dataset shaped for `kind`.
    pub fn query(&self, text: &str, kind: ChartKind) -> Result<QueryResponse, QueryError> {
        let (filter, projection) = self.select(text)?;

        let warnings: Vec<QueryError> = projection.no_country_match().into_iter().collect();
        for warning in &warnings {
            warn!(%warning, "query warning");
        }

        let dataset = kind.shape(&projection).map_err(|reason| {
            warn!(chart = %kind, %reason, "cannot shape projection");
            QueryError::from(reason)
        })?;

        Ok(QueryResponse {
            filter,
            dataset,
            warnings,
        })
    }
}
