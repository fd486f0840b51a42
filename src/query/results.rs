use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::params::{QueryParser, RawParams};
use super::types::{Condition, Filter, FindQuery, PageRef, Pagination, Projection, QuerySpec};
use crate::config::QueryConfig;
use crate::database::{document_id, Document, Store, ID_FIELD};
use crate::error::ApiError;
use crate::models::ResourceSchema;

/// Related documents inlined into results, read-only
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// Children whose `foreign_key` references the parent, stored under `field`
    HasMany {
        field: &'static str,
        schema: &'static ResourceSchema,
        foreign_key: &'static str,
    },
    /// Replace the id held in `field` with the referenced document, projected to `select`
    BelongsTo {
        field: &'static str,
        schema: &'static ResourceSchema,
        select: &'static [&'static str],
    },
}

/// One page of results with the filtered total and neighbouring page refs
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated {
    pub items: Vec<Document>,
    pub total_count: u64,
    pub pagination: Pagination,
}

impl Paginated {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}

/// `next` when more records follow this page, `prev` when this is not the first
pub fn paginate(spec: &QuerySpec, total_count: u64) -> Pagination {
    Pagination {
        next: (spec.end_index() < total_count).then(|| PageRef {
            page: spec.page + 1,
            limit: spec.limit,
        }),
        prev: (spec.start_index() > 0).then(|| PageRef {
            page: spec.page - 1,
            limit: spec.limit,
        }),
    }
}

/// Filter, select, sort and paginate a collection from request parameters
pub struct AdvancedResults<'a> {
    store: &'a Store,
    schema: &'static ResourceSchema,
    relations: Vec<Relation>,
    scope: Filter,
}

impl<'a> AdvancedResults<'a> {
    pub fn new(store: &'a Store, schema: &'static ResourceSchema) -> Self {
        Self {
            store,
            schema,
            relations: Vec::new(),
            scope: Filter::new(),
        }
    }

    pub fn populate(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Constrain every result to `scope`, e.g. the courses of one bootcamp
    pub fn scoped(mut self, scope: Filter) -> Self {
        self.scope = scope;
        self
    }

    pub async fn execute(self, params: &RawParams, config: &QueryConfig) -> Result<Paginated, ApiError> {
        let mut spec = QueryParser::new(self.schema, config).parse(params)?;
        let mut conditions = self.scope.conditions;
        conditions.append(&mut spec.filter.conditions);
        spec.filter.conditions = conditions;
        debug!("{} query: {:?}", self.schema.collection, spec);

        let collection = self.store.collection(self.schema);
        let query = spec.to_find_query();
        let (total_count, docs) = futures::try_join!(collection.count(&spec.filter), collection.find(&query))?;

        let mut items: Vec<Document> = docs.into_iter().map(|doc| self.schema.public_view(doc)).collect();
        populate_documents(self.store, &mut items, &self.relations).await?;

        Ok(Paginated {
            items,
            total_count,
            pagination: paginate(&spec, total_count),
        })
    }
}

/// Inline each relation into `docs`, one store query per relation
pub async fn populate_documents(store: &Store, docs: &mut [Document], relations: &[Relation]) -> Result<(), ApiError> {
    if docs.is_empty() {
        return Ok(());
    }

    for relation in relations {
        match *relation {
            Relation::HasMany { field, schema, foreign_key } => {
                let ids: Vec<Value> = docs
                    .iter()
                    .filter_map(document_id)
                    .map(|id| Value::String(id.to_string()))
                    .collect();
                let children = store
                    .collection(schema)
                    .find(&FindQuery::filtered(Filter::new().is_in(foreign_key, ids)))
                    .await?;

                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                for child in children {
                    if let Some(parent) = child.get(foreign_key).and_then(Value::as_str) {
                        let parent = parent.to_string();
                        grouped
                            .entry(parent)
                            .or_default()
                            .push(Value::Object(schema.public_view(child)));
                    }
                }

                for doc in docs.iter_mut() {
                    let children = document_id(doc).and_then(|id| grouped.remove(id)).unwrap_or_default();
                    doc.insert(field.to_string(), Value::Array(children));
                }
            }
            Relation::BelongsTo { field, schema, select } => {
                let mut ids: Vec<Value> = Vec::new();
                for doc in docs.iter() {
                    if let Some(Value::String(id)) = doc.get(field) {
                        let id = Value::String(id.clone());
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
                if ids.is_empty() {
                    continue;
                }

                let query = FindQuery {
                    filter: Filter {
                        conditions: vec![Condition::In {
                            field: ID_FIELD.to_string(),
                            values: ids,
                        }],
                    },
                    projection: Projection::Fields(select.iter().map(|s| s.to_string()).collect()),
                    ..Default::default()
                };
                let parents: HashMap<String, Document> = store
                    .collection(schema)
                    .find(&query)
                    .await?
                    .into_iter()
                    .filter_map(|parent| document_id(&parent).map(str::to_string).map(|id| (id, parent)))
                    .collect();

                for doc in docs.iter_mut() {
                    let parent = doc
                        .get(field)
                        .and_then(Value::as_str)
                        .and_then(|id| parents.get(id))
                        .cloned();
                    if let Some(parent) = parent {
                        doc.insert(field.to_string(), Value::Object(schema.public_view(parent)));
                    }
                }
            }
        }
    }
    Ok(())
}
