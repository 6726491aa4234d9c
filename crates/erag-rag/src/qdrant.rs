//! Qdrant index engine over gRPC

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
    FieldType, PayloadIncludeSelector, PointId, PointStruct, ScoredPoint, SearchParamsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder, WithPayloadSelector,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use erag_core::{
    CONTENT_FIELD, CollectionSchema, Document, ID_FIELD, IndexBackend, IndexError, IndexParams,
    Metric, SearchConfig, SearchResult,
};

use crate::config::IndexConfig;

/// Namespace for name-based point ids derived from document ids
const POINT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_9b4d_5e07_8c21_d4f0_a7b3_e915);

/// Qdrant-backed index engine
///
/// Document ids live in the payload next to the content; the point id is a
/// name-based UUID of the document id, so a repeated id overwrites its point.
pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    pub fn connect(url: &str) -> Result<Self, IndexError> {
        info!("Connecting to Qdrant at {}", url);
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| IndexError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self, IndexError> {
        Self::connect(&config.url())
    }

    fn point_id(document_id: &str) -> String {
        Uuid::new_v5(&POINT_ID_NAMESPACE, document_id.as_bytes()).to_string()
    }

    fn distance(metric: Metric) -> Distance {
        match metric {
            Metric::Cosine => Distance::Cosine,
        }
    }
}

/// Payload fields returned with search hits: id and content only
fn result_payload() -> WithPayloadSelector {
    WithPayloadSelector {
        selector_options: Some(SelectorOptions::Include(PayloadIncludeSelector {
            fields: vec![ID_FIELD.to_string(), CONTENT_FIELD.to_string()],
        })),
    }
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    match payload.get(key) {
        Some(Value { kind: Some(Kind::StringValue(s)) }) => Some(s.as_str()),
        _ => None,
    }
}

fn point_id_string(id: Option<&PointId>) -> String {
    match id.and_then(|p| p.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => "unknown".to_string(),
    }
}

fn to_search_result(point: ScoredPoint) -> SearchResult {
    let id = payload_str(&point.payload, ID_FIELD)
        .map(str::to_string)
        .unwrap_or_else(|| point_id_string(point.id.as_ref()));
    let content = payload_str(&point.payload, CONTENT_FIELD).unwrap_or("").to_string();
    SearchResult::new(id, point.score, content)
}

#[async_trait]
impl IndexBackend for QdrantBackend {
    async fn has_collection(&self, name: &str) -> Result<bool, IndexError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError> {
        let vectors =
            VectorParamsBuilder::new(schema.dimension() as u64, Self::distance(Metric::Cosine));
        self.client
            .create_collection(CreateCollectionBuilder::new(schema.name.clone()).vectors_config(vectors))
            .await
            .map_err(|e| IndexError::Schema(e.to_string()))?;

        info!("Created Qdrant collection: {}", schema.name);
        Ok(())
    }

    async fn has_index(&self, collection: &str) -> Result<bool, IndexError> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        Ok(info
            .result
            .is_some_and(|c| c.payload_schema.contains_key(ID_FIELD)))
    }

    async fn create_index(&self, collection: &str, params: &IndexParams) -> Result<(), IndexError> {
        // HNSW over the vector field is built with the collection; only the
        // keyword index on the id payload is added here.
        debug!(
            "Vector index on '{}' uses HNSW in place of {:?}",
            params.field, params.kind
        );

        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(collection, ID_FIELD, FieldType::Keyword)
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Schema(e.to_string()))?;
        Ok(())
    }

    async fn insert(&self, collection: &str, document: &Document) -> Result<(), IndexError> {
        let payload = Payload::try_from(json!({
            ID_FIELD: document.id,
            CONTENT_FIELD: document.content,
        }))
        .map_err(|e| IndexError::Write(e.to_string()))?;

        let point = PointStruct::new(Self::point_id(&document.id), document.vector.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
            .await
            .map_err(|e| IndexError::Write(e.to_string()))?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let request = SearchPointsBuilder::new(collection, vector.to_vec(), config.top_k as u64)
            .with_payload(
                result_payload()
                    .selector_options
                    .expect("result_payload always sets selector_options"),
            )
            .params(SearchParamsBuilder::default().hnsw_ef(config.nprobe as u64));

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| IndexError::Search(e.to_string()))?;

        Ok(response.result.into_iter().map(to_search_result).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize, IndexError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        Ok(response.result.map_or(0, |r| r.count as usize))
    }
}
