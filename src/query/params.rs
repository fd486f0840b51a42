use serde_json::Value;

use super::error::QueryError;
use super::order::parse_sort;
use super::types::{CompareOp, Condition, Filter, Projection, QuerySpec, SortKey};
use crate::config::QueryConfig;
use crate::database::CREATED_AT_FIELD;
use crate::models::ResourceSchema;

/// Keys that shape the query instead of filtering it
pub const RESERVED_KEYS: &[&str] = &["select", "sort", "page", "limit"];

pub const DEFAULT_PAGE: u64 = 1;

/// Query-string pairs in request order, repeated keys preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParams {
    pairs: Vec<(String, String)>,
}

impl RawParams {
    pub fn from_query(query: Option<&str>) -> Self {
        let pairs = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Last value wins for reserved keys
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Pairs that remain once the reserved keys are removed
    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamOp {
    Eq,
    Compare(CompareOp),
    In,
}

/// Split `weeks[gt]` into the field and its operator
fn split_key(key: &str) -> Result<(&str, ParamOp), QueryError> {
    let Some((field, rest)) = key.split_once('[') else {
        return Ok((key, ParamOp::Eq));
    };
    let operator = rest.strip_suffix(']').unwrap_or(rest);
    let op = match operator {
        "gt" => ParamOp::Compare(CompareOp::Gt),
        "gte" => ParamOp::Compare(CompareOp::Gte),
        "lt" => ParamOp::Compare(CompareOp::Lt),
        "lte" => ParamOp::Compare(CompareOp::Lte),
        "in" => ParamOp::In,
        other => {
            return Err(QueryError::UnsupportedOperator {
                field: field.to_string(),
                operator: other.to_string(),
            })
        }
    };
    Ok((field, op))
}

/// Lenient positive integer parse; anything else yields the default
fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
        .unwrap_or(default)
}

/// Turns raw, untrusted request parameters into a validated query specification
pub struct QueryParser<'a> {
    schema: &'a ResourceSchema,
    config: &'a QueryConfig,
}

impl<'a> QueryParser<'a> {
    pub fn new(schema: &'a ResourceSchema, config: &'a QueryConfig) -> Self {
        Self { schema, config }
    }

    pub fn parse(&self, params: &RawParams) -> Result<QuerySpec, QueryError> {
        let filter = self.parse_filter(params)?;
        let projection = match params.get("select") {
            Some(raw) => self.parse_select(raw)?,
            None => Projection::All,
        };
        let sort = match params.get("sort") {
            Some(raw) => self.parse_sort(raw)?,
            None => vec![],
        };
        let sort = if sort.is_empty() { vec![SortKey::desc(CREATED_AT_FIELD)] } else { sort };

        let page = positive_or(params.get("page"), DEFAULT_PAGE);
        let requested = positive_or(params.get("limit"), self.config.default_limit);
        let limit = if requested > self.config.max_limit {
            tracing::debug!("limit {} exceeds max {}, capping", requested, self.config.max_limit);
            self.config.max_limit
        } else {
            requested
        };

        Ok(QuerySpec {
            filter,
            projection,
            sort,
            page,
            limit,
        })
    }

    fn parse_filter(&self, params: &RawParams) -> Result<Filter, QueryError> {
        let mut filter = Filter::new();
        // `in` candidates merge across repeated keys: careers[in]=a&careers[in]=b
        let mut in_lists: Vec<(String, Vec<Value>)> = Vec::new();

        for (key, raw) in params.filters() {
            let (field, op) = split_key(key)?;
            let kind = self
                .schema
                .path_kind(field)
                .ok_or_else(|| QueryError::UnknownField(field.to_string()))?;
            let coerce = |raw: &str| {
                kind.coerce_param(raw).ok_or_else(|| QueryError::InvalidValue {
                    field: field.to_string(),
                    value: raw.to_string(),
                })
            };

            match op {
                ParamOp::Eq => filter.push(Condition::Eq {
                    field: field.to_string(),
                    value: coerce(raw)?,
                }),
                ParamOp::Compare(op) => filter.push(Condition::Compare {
                    field: field.to_string(),
                    op,
                    value: coerce(raw)?,
                }),
                ParamOp::In => {
                    let values = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(coerce)
                        .collect::<Result<Vec<_>, _>>()?;
                    match in_lists.iter_mut().find(|(f, _)| f == field) {
                        Some((_, existing)) => existing.extend(values),
                        None => in_lists.push((field.to_string(), values)),
                    }
                }
            }
        }

        for (field, values) in in_lists {
            filter.push(Condition::In { field, values });
        }
        Ok(filter)
    }

    fn parse_select(&self, raw: &str) -> Result<Projection, QueryError> {
        let mut fields: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match self.schema.field(name) {
                Some(field) if !field.hidden => {
                    if !fields.iter().any(|f| f == name) {
                        fields.push(name.to_string());
                    }
                }
                _ => return Err(QueryError::UnknownField(name.to_string())),
            }
        }
        if fields.is_empty() {
            Ok(Projection::All)
        } else {
            Ok(Projection::Fields(fields))
        }
    }

    fn parse_sort(&self, raw: &str) -> Result<Vec<SortKey>, QueryError> {
        let keys = parse_sort(raw)?;
        for key in &keys {
            if self.schema.path_kind(&key.field).is_none() {
                return Err(QueryError::UnknownField(key.field.clone()));
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::{BOOTCAMP_SCHEMA, COURSE_SCHEMA, USER_SCHEMA};
    use serde_json::json;

    fn parse(schema: &ResourceSchema, query: &str) -> Result<QuerySpec, QueryError> {
        let config = AppConfig::development().query;
        QueryParser::new(schema, &config).parse(&RawParams::from_query(Some(query)))
    }

    #[test]
    fn defaults_without_params() {
        let spec = parse(&COURSE_SCHEMA, "").unwrap();
        assert!(spec.filter.is_empty());
        assert_eq!(spec.projection, Projection::All);
        assert_eq!(spec.sort, vec![SortKey::desc("createdAt")]);
        assert_eq!((spec.page, spec.limit), (1, 25));
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let spec = parse(&COURSE_SCHEMA, "select=title&sort=title&page=2&limit=5").unwrap();
        assert!(spec.filter.is_empty());
    }

    #[test]
    fn bracket_operators_become_comparisons() {
        let spec = parse(&COURSE_SCHEMA, "weeks%5Bgt%5D=4&tuition[lte]=10000&minimumSkill=beginner").unwrap();
        assert_eq!(
            spec.filter.conditions,
            vec![
                Condition::Compare { field: "weeks".into(), op: CompareOp::Gt, value: json!(4) },
                Condition::Compare { field: "tuition".into(), op: CompareOp::Lte, value: json!(10000) },
                Condition::Eq { field: "minimumSkill".into(), value: json!("beginner") },
            ]
        );
    }

    #[test]
    fn in_lists_merge_and_split() {
        let spec = parse(&BOOTCAMP_SCHEMA, "careers[in]=Business,UI/UX&careers[in]=Other").unwrap();
        assert_eq!(
            spec.filter.conditions,
            vec![Condition::In {
                field: "careers".into(),
                values: vec![json!("Business"), json!("UI/UX"), json!("Other")],
            }]
        );
    }

    #[test]
    fn nested_paths_filter_as_text() {
        let spec = parse(&BOOTCAMP_SCHEMA, "location.state=MA").unwrap();
        assert_eq!(spec.filter.conditions, vec![Condition::Eq { field: "location.state".into(), value: json!("MA") }]);
    }

    #[test]
    fn unknown_field_or_operator_is_rejected() {
        assert_eq!(parse(&COURSE_SCHEMA, "colour=red").unwrap_err(), QueryError::UnknownField("colour".into()));
        assert!(matches!(
            parse(&COURSE_SCHEMA, "weeks[ne]=4").unwrap_err(),
            QueryError::UnsupportedOperator { operator, .. } if operator == "ne"
        ));
        // `$where`-style injection never reaches the store
        assert!(parse(&COURSE_SCHEMA, "$where=1").is_err());
    }

    #[test]
    fn uncoercible_value_is_rejected() {
        assert!(matches!(
            parse(&COURSE_SCHEMA, "weeks[gt]=four").unwrap_err(),
            QueryError::InvalidValue { field, .. } if field == "weeks"
        ));
    }

    #[test]
    fn invalid_page_and_limit_fall_back_to_defaults() {
        for query in ["page=0&limit=0", "page=-3&limit=-1", "page=abc&limit=x1", "page=&limit=", "page=1.5&limit=2.5"] {
            let spec = parse(&COURSE_SCHEMA, query).unwrap();
            assert_eq!((spec.page, spec.limit), (1, 25), "query {}", query);
        }
        let spec = parse(&COURSE_SCHEMA, "page=3&limit=10").unwrap();
        assert_eq!((spec.page, spec.limit, spec.start_index(), spec.end_index()), (3, 10, 20, 30));
    }

    #[test]
    fn huge_page_clamps_the_offset() {
        let spec = parse(&COURSE_SCHEMA, &format!("page={}", i64::MAX)).unwrap();
        assert_eq!(spec.page, i64::MAX as u64);
        assert_eq!(spec.start_index(), i64::MAX as u64);
        assert_eq!(spec.end_index(), i64::MAX as u64);
    }

    #[test]
    fn limit_is_capped() {
        let spec = parse(&COURSE_SCHEMA, "limit=100000").unwrap();
        assert_eq!(spec.limit, 1000);
    }

    #[test]
    fn select_splits_every_comma() {
        let spec = parse(&BOOTCAMP_SCHEMA, "select=name,description,housing").unwrap();
        assert_eq!(
            spec.projection,
            Projection::Fields(vec!["name".into(), "description".into(), "housing".into()])
        );
    }

    #[test]
    fn sort_reads_sort_not_select() {
        let spec = parse(&BOOTCAMP_SCHEMA, "select=name,description&sort=-averageCost").unwrap();
        assert_eq!(spec.sort, vec![SortKey::desc("averageCost")]);
    }

    #[test]
    fn hidden_fields_cannot_be_selected_or_filtered() {
        assert!(parse(&USER_SCHEMA, "select=name,password").is_err());
        assert!(parse(&USER_SCHEMA, "password=123456").is_err());
        assert!(parse(&USER_SCHEMA, "sort=password").is_err());
    }
}
