use serde::Serialize;
use serde_json::Value;

/// Comparison operators accepted in `field[op]=value` query syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// One constraint of a filter expression; all conditions of a filter must hold
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Exact match, or membership when the stored value is a list
    Eq { field: String, value: Value },
    Compare { field: String, op: CompareOp, value: Value },
    /// Any of the candidate values matches
    In { field: String, values: Vec<Value> },
    /// A GeoJSON `[lng, lat]` point at `field` lies within `radius` radians of the center
    WithinRadius { field: String, lng: f64, lat: f64, radius: f64 },
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq { field, .. }
            | Condition::Compare { field, .. }
            | Condition::In { field, .. }
            | Condition::WithinRadius { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq { field: field.into(), value: value.into() });
        self
    }

    pub fn is_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In { field: field.into(), values });
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projection {
    #[default]
    All,
    /// Only these top-level fields, plus `_id`
    Fields(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// A fully-resolved read against one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn filtered(filter: Filter) -> Self {
        Self { filter, ..Default::default() }
    }
}

/// Normalized filter, projection, sort and paging derived from a request
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub filter: Filter,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
}

/// Largest row index a store backend can address (Postgres `bigint`)
pub const MAX_INDEX: u64 = i64::MAX as u64;

impl QuerySpec {
    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).min(MAX_INDEX)
    }

    pub fn end_index(&self) -> u64 {
        self.page.saturating_mul(self.limit).min(MAX_INDEX)
    }

    pub fn to_find_query(&self) -> FindQuery {
        FindQuery {
            filter: self.filter.clone(),
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.start_index(),
            limit: Some(self.limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}
