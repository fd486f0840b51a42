pub mod manager;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ResourceSchema;
use crate::query::{Filter, FindQuery, Projection};

pub use manager::DatabaseManager;
pub use memory::{MemoryCollection, MemoryStore};
pub use postgres::{PgCollection, PgStore};

/// A stored resource record
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Millisecond UTC timestamps, so lexical order is chronological order
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Look up a dotted path (`location.city`) inside a document
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// The stored (lowercase hyphenated) form of an id; `None` if it is not a UUID
pub fn canonical_id(id: &str) -> Option<String> {
    Uuid::parse_str(id).ok().map(|id| id.to_string())
}

/// Keep only the projected top-level fields; `_id` is always kept
pub fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::All => doc,
        Projection::Fields(fields) => doc
            .into_iter()
            .filter(|(key, _)| key == ID_FIELD || fields.iter().any(|f| f == key))
            .collect(),
    }
}

/// Assign `_id` and `createdAt` to a new document when missing
pub fn stamp_new(mut doc: Document) -> Result<(Uuid, Document), StoreError> {
    let id = match doc.get(ID_FIELD) {
        Some(Value::String(s)) => Uuid::parse_str(s).map_err(|_| StoreError::InvalidDocument(format!("invalid _id '{}'", s)))?,
        Some(other) => return Err(StoreError::InvalidDocument(format!("invalid _id {}", other))),
        None => Uuid::new_v4(),
    };
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc.entry(CREATED_AT_FIELD.to_string())
        .or_insert_with(|| Value::String(format_timestamp(Utc::now())));
    Ok((id, doc))
}

/// One resource collection of the document store
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert(&self, doc: Document) -> Result<Document, StoreError>;

    /// Merge `changes` into the top level of the document; `None` if absent
    async fn update(&self, id: &str, changes: Document) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let query = FindQuery {
            filter: filter.clone(),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find(&query).await?.into_iter().next())
    }

    /// Ids that are not UUIDs never match
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let Some(id) = canonical_id(id) else {
            return Ok(None);
        };
        self.find_one(&Filter::new().eq(ID_FIELD, id)).await
    }
}

/// Handle to the configured document store backend
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(Arc<MemoryStore>),
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(Arc::new(MemoryStore::new()))
    }

    pub fn collection(&self, schema: &ResourceSchema) -> Arc<dyn Collection> {
        match self {
            Store::Postgres(store) => Arc::new(store.collection(schema.collection)),
            Store::Memory(store) => store.collection(schema),
        }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        match self {
            Store::Postgres(store) => store.health_check().await,
            Store::Memory(_) => Ok(()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }
}
