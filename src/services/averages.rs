use serde_json::{Map, Value};
use tracing::debug;

use crate::database::{Store, StoreError};
use crate::models::{BOOTCAMP_SCHEMA, COURSE_SCHEMA, REVIEW_SCHEMA};
use crate::query::{Filter, FindQuery};

/// Mean of a numeric field across the children of one bootcamp
async fn mean_of(store: &Store, schema: &crate::models::ResourceSchema, bootcamp_id: &str, field: &str) -> Result<Option<f64>, StoreError> {
    let children = store
        .collection(schema)
        .find(&FindQuery::filtered(Filter::new().eq("bootcamp", bootcamp_id)))
        .await?;
    let values: Vec<f64> = children.iter().filter_map(|c| c.get(field).and_then(Value::as_f64)).collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

async fn store_on_bootcamp(store: &Store, bootcamp_id: &str, field: &str, value: Value) -> Result<(), StoreError> {
    debug!("Bootcamp {} {} -> {}", bootcamp_id, field, value);
    let mut changes = Map::new();
    changes.insert(field.to_string(), value);
    store.collection(&BOOTCAMP_SCHEMA).update(bootcamp_id, changes).await?;
    Ok(())
}

/// Average course tuition, rounded up to the next ten
pub async fn refresh_average_cost(store: &Store, bootcamp_id: &str) -> Result<(), StoreError> {
    let value = match mean_of(store, &COURSE_SCHEMA, bootcamp_id, "tuition").await? {
        Some(mean) => Value::from(((mean / 10.0).ceil() * 10.0) as i64),
        None => Value::Null,
    };
    store_on_bootcamp(store, bootcamp_id, "averageCost", value).await
}

/// Average review rating
pub async fn refresh_average_rating(store: &Store, bootcamp_id: &str) -> Result<(), StoreError> {
    let value = mean_of(store, &REVIEW_SCHEMA, bootcamp_id, "rating")
        .await?
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null);
    store_on_bootcamp(store, bootcamp_id, "averageRating", value).await
}
