use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, types::Json, PgPool, Row};
use uuid::Uuid;

use super::{project, stamp_new, Collection, Document, StoreError, ID_FIELD};
use crate::models::ResourceSchema;
use crate::query::types::MAX_INDEX;
use crate::query::{Condition, Filter, FindQuery, SortDirection, SortKey};

/// Every resource lives in one JSONB document table keyed by collection
const DOCUMENTS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id UUID NOT NULL,
        body JSONB NOT NULL,
        PRIMARY KEY (collection, id)
    )
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn collection(&self, name: &str) -> PgCollection {
        PgCollection {
            name: name.to_string(),
            pool: self.pool.clone(),
        }
    }

    /// Create the document table and per-collection unique indexes
    pub async fn migrate(&self, schemas: &[&ResourceSchema]) -> Result<(), StoreError> {
        sqlx::query(DOCUMENTS_DDL).execute(&self.pool).await?;
        for schema in schemas {
            for key in schema.unique_keys() {
                sqlx::query(&unique_index_ddl(schema.collection, &key))
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Collection and field names come from static schemas, never from requests
fn unique_index_ddl(collection: &str, key: &[&str]) -> String {
    let columns: Vec<String> = key.iter().map(|field| format!("(body ->> '{}')", field)).collect();
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS \"{}\" ON documents ({}) WHERE collection = '{}'",
        unique_index_name(collection, key),
        columns.join(", "),
        collection
    )
}

fn unique_index_name(collection: &str, key: &[&str]) -> String {
    format!("documents_{}_{}_key", collection, key.join("_"))
}

/// Bind values collected while rendering SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Path(Vec<String>),
    Json(Value),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Renders filters into a WHERE clause over `body`, numbering parameters as it goes
struct WhereBuilder {
    params: Vec<SqlParam>,
}

impl WhereBuilder {
    fn new(collection: &str) -> Self {
        Self {
            params: vec![SqlParam::Text(collection.to_string())],
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn path(&mut self, field: &str) -> String {
        let parts = field.split('.').map(str::to_string).collect();
        format!("body #> {}::text[]", self.param(SqlParam::Path(parts)))
    }

    fn build(&mut self, filter: &Filter) -> String {
        let mut clauses = vec!["collection = $1".to_string()];
        for condition in &filter.conditions {
            clauses.push(self.condition(condition));
        }
        clauses.join(" AND ")
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Eq { field, value } => {
                let path = self.path(field);
                if value.is_null() {
                    return format!("({path} IS NULL OR {path} = 'null'::jsonb)");
                }
                let value = self.param(SqlParam::Json(value.clone()));
                format!("({path} = {value}::jsonb OR {path} @> jsonb_build_array({value}::jsonb))")
            }
            Condition::Compare { field, op, value } => {
                let path = self.path(field);
                let value = self.param(SqlParam::Json(value.clone()));
                format!(
                    "(jsonb_typeof({path}) = jsonb_typeof({value}::jsonb) AND {path} {} {value}::jsonb)",
                    op.to_sql()
                )
            }
            Condition::In { field, values } => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let path = self.path(field);
                let values = self.param(SqlParam::Json(Value::Array(values.clone())));
                format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements({values}::jsonb) AS candidate(value) \
                     WHERE {path} = candidate.value OR {path} @> jsonb_build_array(candidate.value))"
                )
            }
            Condition::WithinRadius { field, lng, lat, radius } => {
                let path = self.path(field);
                let lng = self.param(SqlParam::Float(*lng));
                let lat = self.param(SqlParam::Float(*lat));
                let radius = self.param(SqlParam::Float(*radius));
                let doc_lng = format!("(({path}) ->> 0)::float8");
                let doc_lat = format!("(({path}) ->> 1)::float8");
                format!(
                    "(jsonb_typeof({path}) = 'array' AND 2 * asin(least(1, sqrt(\
                     power(sin(radians({doc_lat} - {lat}::float8) / 2), 2) + \
                     cos(radians({lat}::float8)) * cos(radians({doc_lat})) * \
                     power(sin(radians({doc_lng} - {lng}::float8) / 2), 2)))) <= {radius}::float8)"
                )
            }
        }
    }

    fn order_by(&mut self, sort: &[SortKey]) -> String {
        let mut parts: Vec<String> = sort
            .iter()
            .map(|key| {
                let path = self.path(&key.field);
                let nulls = match key.direction {
                    SortDirection::Asc => "NULLS FIRST",
                    SortDirection::Desc => "NULLS LAST",
                };
                format!("{} {} {}", path, key.direction.to_sql(), nulls)
            })
            .collect();
        // Stable paging across equal sort keys
        parts.push("id ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }
}

pub fn select_sql(collection: &str, query: &FindQuery) -> SqlQuery {
    let mut builder = WhereBuilder::new(collection);
    let where_clause = builder.build(&query.filter);
    let order_clause = builder.order_by(&query.sort);
    let skip = query.skip.min(MAX_INDEX);
    let limit_clause = match query.limit {
        Some(limit) => format!("LIMIT {} OFFSET {}", limit.min(MAX_INDEX), skip),
        None => format!("OFFSET {}", skip),
    };

    let sql = format!(
        "SELECT body FROM documents WHERE {} {} {}",
        where_clause, order_clause, limit_clause
    );
    SqlQuery { sql, params: builder.params }
}

pub fn count_sql(collection: &str, filter: &Filter) -> SqlQuery {
    let mut builder = WhereBuilder::new(collection);
    let where_clause = builder.build(filter);
    SqlQuery {
        sql: format!("SELECT COUNT(*) AS count FROM documents WHERE {}", where_clause),
        params: builder.params,
    }
}

pub fn delete_sql(collection: &str, filter: &Filter) -> SqlQuery {
    let mut builder = WhereBuilder::new(collection);
    let where_clause = builder.build(filter);
    SqlQuery {
        sql: format!("DELETE FROM documents WHERE {}", where_clause),
        params: builder.params,
    }
}

fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for param in params {
        q = match param {
            SqlParam::Text(s) => q.bind(s),
            SqlParam::Path(parts) => q.bind(parts.as_slice()),
            SqlParam::Json(v) => q.bind(Json(v)),
            SqlParam::Float(f) => q.bind(*f),
        };
    }
    q
}

fn body_from_row(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let Json(body): Json<Value> = row.try_get("body")?;
    match body {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!("stored body is not an object: {}", other))),
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            let field = db
                .constraint()
                .and_then(|c| c.strip_suffix("_key"))
                .and_then(|c| c.rsplit('_').next())
                .unwrap_or("unknown")
                .to_string();
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Sqlx(err)
}

pub struct PgCollection {
    name: String,
    pool: PgPool,
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let sql = select_sql(&self.name, query);
        tracing::debug!("{}: {}", self.name, sql.sql);
        let rows = bind_params(sqlx::query(&sql.sql), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| body_from_row(row).map(|doc| project(doc, &query.projection)))
            .collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let sql = count_sql(&self.name, filter);
        let row = bind_params(sqlx::query(&sql.sql), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, doc: Document) -> Result<Document, StoreError> {
        let (id, doc) = stamp_new(doc)?;
        let row = sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) RETURNING body")
            .bind(&self.name)
            .bind(id)
            .bind(Json(Value::Object(doc)))
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        body_from_row(&row)
    }

    async fn update(&self, id: &str, mut changes: Document) -> Result<Option<Document>, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        changes.remove(ID_FIELD);
        let row = sqlx::query(
            "UPDATE documents SET body = body || $3 WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(&self.name)
        .bind(id)
        .bind(Json(Value::Object(changes)))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.as_ref().map(body_from_row).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(&self.name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let sql = delete_sql(&self.name, filter);
        let result = bind_params(sqlx::query(&sql.sql), &sql.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CompareOp, Projection};
    use serde_json::json;

    #[test]
    fn empty_filter_scopes_to_collection() {
        let sql = count_sql("bootcamps", &Filter::new());
        assert_eq!(sql.sql, "SELECT COUNT(*) AS count FROM documents WHERE collection = $1");
        assert_eq!(sql.params, vec![SqlParam::Text("bootcamps".into())]);
    }

    #[test]
    fn comparison_binds_path_and_json_value() {
        let mut filter = Filter::new();
        filter.push(Condition::Compare { field: "weeks".into(), op: CompareOp::Gt, value: json!(4) });
        let sql = count_sql("courses", &filter);
        assert!(sql.sql.contains("body #> $2::text[] > $3::jsonb"), "{}", sql.sql);
        assert!(sql.sql.contains("jsonb_typeof(body #> $2::text[]) = jsonb_typeof($3::jsonb)"));
        assert_eq!(
            sql.params,
            vec![
                SqlParam::Text("courses".into()),
                SqlParam::Path(vec!["weeks".into()]),
                SqlParam::Json(json!(4)),
            ]
        );
    }

    #[test]
    fn equality_matches_scalars_and_list_members() {
        let sql = count_sql("bootcamps", &Filter::new().eq("location.state", "MA"));
        assert!(sql.sql.contains("(body #> $2::text[] = $3::jsonb OR body #> $2::text[] @> jsonb_build_array($3::jsonb))"));
        assert_eq!(sql.params[1], SqlParam::Path(vec!["location".into(), "state".into()]));
    }

    #[test]
    fn empty_in_matches_nothing() {
        let sql = count_sql("courses", &Filter::new().is_in("bootcamp", vec![]));
        assert!(sql.sql.ends_with("AND FALSE"));
    }

    #[test]
    fn select_renders_order_and_paging() {
        let query = FindQuery {
            filter: Filter::new().eq("housing", true),
            projection: Projection::Fields(vec!["name".into()]),
            sort: vec![SortKey::desc("createdAt"), SortKey::asc("name")],
            skip: 25,
            limit: Some(25),
        };
        let sql = select_sql("bootcamps", &query);
        assert!(sql.sql.starts_with("SELECT body FROM documents WHERE collection = $1 AND"));
        assert!(sql
            .sql
            .contains("ORDER BY body #> $4::text[] DESC NULLS LAST, body #> $5::text[] ASC NULLS FIRST, id ASC"));
        assert!(sql.sql.ends_with("LIMIT 25 OFFSET 25"));
        assert_eq!(sql.params.len(), 5);
    }

    #[test]
    fn huge_offsets_stay_within_bigint() {
        let query = FindQuery {
            skip: u64::MAX,
            limit: Some(25),
            ..Default::default()
        };
        let sql = select_sql("courses", &query);
        assert!(sql.sql.ends_with(&format!("LIMIT 25 OFFSET {}", i64::MAX)));
    }

    #[test]
    fn radius_binds_center_as_floats() {
        let mut filter = Filter::new();
        filter.push(Condition::WithinRadius { field: "location.coordinates".into(), lng: -71.1, lat: 42.3, radius: 0.01 });
        let sql = count_sql("bootcamps", &filter);
        assert!(sql.params.contains(&SqlParam::Float(-71.1)));
        assert!(sql.params.contains(&SqlParam::Float(0.01)));
        assert!(sql.sql.contains("<= $5::float8"));
    }

    #[test]
    fn unique_index_names_round_trip_to_field() {
        assert_eq!(unique_index_name("users", &["email"]), "documents_users_email_key");
        assert!(unique_index_ddl("users", &["email"]).contains("((body ->> 'email'))"));
    }

    #[test]
    fn compound_unique_index_covers_every_part() {
        let ddl = unique_index_ddl("reviews", &["bootcamp", "user"]);
        assert!(ddl.contains("\"documents_reviews_bootcamp_user_key\""));
        assert!(ddl.contains("((body ->> 'bootcamp'), (body ->> 'user'))"));
    }
}
