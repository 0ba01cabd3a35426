//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use medic_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("first_aid_manual", 768).await?;
//! store.upsert("first_aid_manual", &points).await?;
//! let hits = store.search("first_aid_manual", &query_embedding, 5).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{RagError, Result};
use crate::vectorstore::{
    IndexOutcome, PayloadIndex, PayloadIndexKind, Point, ScoredPoint, VectorStore,
};

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Wraps a [`qdrant_client::Qdrant`] client and maps collections to Qdrant
/// collections with cosine distance. Upserts wait for the server to apply
/// the operation before returning.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Connect with an optional API key and an explicit request timeout.
    pub fn connect(url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .timeout(timeout)
            .build()
            .map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Connect using the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::connect(
            &config.qdrant_url,
            config.qdrant_api_key.as_deref(),
            config.request_timeout,
        )
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: QdrantError) -> RagError {
        if is_transient(&e) {
            RagError::Transient { service: BACKEND.to_string(), message: e.to_string() }
        } else {
            RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
        }
    }

    async fn has_payload_index(&self, collection: &str, field: &str) -> Result<bool> {
        let info = self.client.collection_info(collection).await.map_err(Self::map_err)?;
        Ok(info.result.is_some_and(|info| info.payload_schema.contains_key(field)))
    }
}

/// Timeouts, unreachable servers and rate limiting are worth retrying.
fn is_transient(e: &QdrantError) -> bool {
    match e {
        QdrantError::ResponseError { status } => {
            let code = format!("{:?}", status.code());
            matches!(code.as_str(), "Unavailable" | "DeadlineExceeded" | "Cancelled")
        }
        QdrantError::ResourceExhaustedError { .. } => true,
        other => {
            let message = other.to_string().to_lowercase();
            message.contains("timed out") || message.contains("transport error")
        }
    }
}

fn field_type(kind: PayloadIndexKind) -> FieldType {
    match kind {
        PayloadIndexKind::Keyword => FieldType::Keyword,
        PayloadIndexKind::Integer => FieldType::Integer,
        PayloadIndexKind::Text => FieldType::Text,
    }
}

/// Convert a Qdrant payload value back into JSON.
fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d).map_or(Value::Null, Value::Number),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => {
            Value::Object(s.fields.into_iter().map(|(k, v)| (k, to_json(v))).collect())
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.client.list_collections().await.map_err(Self::map_err)?;
        let mut names: Vec<String> = response.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.client.collection_exists(name).await.map_err(Self::map_err)
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if !self.collection_exists(name).await? {
            return Ok(());
        }
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        index: PayloadIndex,
    ) -> Result<IndexOutcome> {
        if self.has_payload_index(collection, index.field).await? {
            return Ok(IndexOutcome::AlreadyExists);
        }

        let request =
            CreateFieldIndexCollectionBuilder::new(collection, index.field, field_type(index.kind))
                .wait(true);
        match self.client.create_field_index(request).await {
            Ok(_) => {
                debug!(
                    collection,
                    field = index.field,
                    kind = %index.kind,
                    "created payload index"
                );
                Ok(IndexOutcome::Created)
            }
            // Another writer may have created it between the check and the call.
            Err(e) if e.to_string().contains("already exists") => Ok(IndexOutcome::AlreadyExists),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let points = points
            .iter()
            .map(|point| {
                let payload = Payload::try_from(Value::Object(point.payload.clone())).map_err(
                    |e| RagError::VectorStoreError {
                        backend: BACKEND.to_string(),
                        message: format!("invalid payload for point '{}': {e}", point.id),
                    },
                )?;
                Ok(PointStruct::new(point.id.clone(), point.vector.clone(), payload))
            })
            .collect::<Result<Vec<PointStruct>>>()?;
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count, "upserted points to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .and_then(|pid| match pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();
                let payload: Map<String, Value> =
                    scored.payload.into_iter().map(|(k, v)| (k, to_json(v))).collect();

                ScoredPoint { id, score: scored.score, payload }
            })
            .collect();

        Ok(results)
    }
}
