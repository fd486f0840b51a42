use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{canonical_id, document_id, get_path, project, stamp_new, Collection, Document, StoreError, ID_FIELD};
use crate::models::{ResourceSchema, ALL_SCHEMAS};
use crate::query::{CompareOp, Condition, Filter, FindQuery, SortDirection};

/// In-process document store with one collection per resource schema
pub struct MemoryStore {
    collections: HashMap<&'static str, Arc<MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let collections = ALL_SCHEMAS
            .iter()
            .map(|schema| {
                let collection = MemoryCollection::new(schema.collection, schema.unique_keys());
                (schema.collection, Arc::new(collection))
            })
            .collect();
        Self { collections }
    }

    pub fn collection(&self, schema: &ResourceSchema) -> Arc<dyn Collection> {
        match self.collections.get(schema.collection) {
            Some(collection) => collection.clone(),
            None => {
                tracing::warn!("No memory collection registered for '{}', using a detached one", schema.collection);
                Arc::new(MemoryCollection::new(schema.collection, schema.unique_keys()))
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryCollection {
    name: String,
    unique_keys: Vec<Vec<&'static str>>,
    docs: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, unique_keys: Vec<Vec<&'static str>>) -> Self {
        Self {
            name: name.into(),
            unique_keys,
            docs: RwLock::new(Vec::new()),
        }
    }

    fn check_unique(&self, docs: &[Document], candidate: &Document) -> Result<(), StoreError> {
        let candidate_id = document_id(candidate);
        for key in &self.unique_keys {
            // Keys with a missing part are not constrained
            let Some(values) = key
                .iter()
                .map(|field| candidate.get(*field).filter(|v| !v.is_null()))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let taken = docs.iter().filter(|d| document_id(d) != candidate_id).any(|d| {
                key.iter()
                    .zip(&values)
                    .all(|(field, value)| d.get(*field).is_some_and(|other| values_equal(other, value)))
            });
            if taken {
                return Err(StoreError::Duplicate(key.join("_")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        let mut matched: Vec<&Document> = docs.iter().filter(|d| matches_filter(d, &query.filter)).collect();

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| {
                for key in &query.sort {
                    let ordering = compare_for_sort(get_path(a, &key.field), get_path(b, &key.field));
                    let ordering = match key.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| project(d.clone(), &query.projection))
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| matches_filter(d, filter)).count() as u64)
    }

    async fn insert(&self, doc: Document) -> Result<Document, StoreError> {
        let (_, doc) = stamp_new(doc)?;
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| document_id(d) == document_id(&doc)) {
            return Err(StoreError::Duplicate(ID_FIELD.to_string()));
        }
        self.check_unique(&docs, &doc)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, id: &str, changes: Document) -> Result<Option<Document>, StoreError> {
        let Some(id) = canonical_id(id) else {
            return Ok(None);
        };
        let mut docs = self.docs.write().await;
        let Some(index) = docs.iter().position(|d| document_id(d) == Some(id.as_str())) else {
            return Ok(None);
        };

        let mut updated = docs[index].clone();
        for (key, value) in changes {
            if key != ID_FIELD {
                updated.insert(key, value);
            }
        }
        self.check_unique(&docs, &updated)?;
        docs[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(id) = canonical_id(id) else {
            return Ok(false);
        };
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id.as_str()));
        Ok(docs.len() != before)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| !matches_filter(d, filter));
        Ok((before - docs.len()) as u64)
    }
}

fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    filter.conditions.iter().all(|c| matches_condition(doc, c))
}

fn matches_condition(doc: &Document, condition: &Condition) -> bool {
    let stored = get_path(doc, condition.field());
    match condition {
        Condition::Eq { value, .. } => matches_eq(stored, value),
        Condition::In { values, .. } => values.iter().any(|v| matches_eq(stored, v)),
        Condition::Compare { op, value, .. } => match stored {
            Some(Value::Array(items)) => items.iter().any(|item| matches_compare(item, *op, value)),
            Some(item) => matches_compare(item, *op, value),
            None => false,
        },
        Condition::WithinRadius { lng, lat, radius, .. } => match stored.and_then(point) {
            Some((doc_lng, doc_lat)) => central_angle(*lng, *lat, doc_lng, doc_lat) <= *radius,
            None => false,
        },
    }
}

fn matches_eq(stored: Option<&Value>, value: &Value) -> bool {
    match stored {
        None | Some(Value::Null) => value.is_null(),
        Some(Value::Array(items)) if !value.is_array() => items.iter().any(|item| values_equal(item, value)),
        Some(stored) => values_equal(stored, value),
    }
}

fn matches_compare(stored: &Value, op: CompareOp, value: &Value) -> bool {
    let ordering = match (stored, value) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match (ordering, op) {
        (Some(o), CompareOp::Gt) => o == Ordering::Greater,
        (Some(o), CompareOp::Gte) => o != Ordering::Less,
        (Some(o), CompareOp::Lt) => o == Ordering::Less,
        (Some(o), CompareOp::Lte) => o != Ordering::Greater,
        (None, _) => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Missing values sort first, then by type, then by value
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn point(value: &Value) -> Option<(f64, f64)> {
    let coords = value.as_array()?;
    Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
}

/// Great-circle angle in radians between two lng/lat points given in degrees
fn central_angle(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = phi2 - phi1;
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}
