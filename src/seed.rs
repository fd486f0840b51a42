use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{Document, Store, ID_FIELD};
use crate::models::bootcamp::slugify;
use crate::models::user::{hash_password, PASSWORD_FIELD};
use crate::models::{ResourceSchema, ALL_SCHEMAS, BOOTCAMP_SCHEMA};
use crate::query::{Filter, FindQuery};
use crate::services::{refresh_average_cost, refresh_average_rating};

/// Fields holding document ids, rewritten together so references survive import
const REFERENCE_FIELDS: &[&str] = &[ID_FIELD, "user", "bootcamp"];

/// Maps foreign ids (e.g. 24-hex ObjectIds) in seed files to UUIDs
#[derive(Debug, Default)]
pub struct IdMap {
    ids: HashMap<String, String>,
}

impl IdMap {
    fn resolve(&mut self, raw: &str) -> String {
        if let Ok(id) = Uuid::parse_str(raw) {
            return id.to_string();
        }
        self.ids
            .entry(raw.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    fn rewrite(&mut self, doc: &mut Document) {
        for field in REFERENCE_FIELDS {
            if let Some(Value::String(raw)) = doc.get(*field) {
                let id = self.resolve(raw);
                doc.insert(field.to_string(), Value::String(id));
            }
        }
    }
}

/// Per-collection counts from one import
#[derive(Debug, Default, PartialEq)]
pub struct SeedReport {
    pub imported: Vec<(&'static str, usize)>,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.imported.iter().map(|(_, n)| n).sum()
    }
}

/// Prepare a trusted seed record: ids remapped, derived fields filled, password hashed
fn prepare(schema: &ResourceSchema, value: Value, ids: &mut IdMap) -> Result<Document> {
    let Value::Object(mut doc) = value else {
        anyhow::bail!("{} seed entries must be JSON objects", schema.collection);
    };
    ids.rewrite(&mut doc);

    if schema.collection == BOOTCAMP_SCHEMA.collection && !doc.contains_key("slug") {
        if let Some(name) = doc.get("name").and_then(Value::as_str) {
            let slug = slugify(name);
            doc.insert("slug".to_string(), Value::String(slug));
        }
    }

    if let Some(Value::String(plain)) = doc.get(PASSWORD_FIELD) {
        if !plain.starts_with("$argon2") {
            let hash = hash_password(plain).map_err(|e| anyhow::anyhow!("hashing seed password: {}", e))?;
            doc.insert(PASSWORD_FIELD.to_string(), Value::String(hash));
        }
    }
    Ok(doc)
}

/// Insert seed records into one collection
pub async fn import_documents(store: &Store, schema: &ResourceSchema, records: Vec<Value>, ids: &mut IdMap) -> Result<usize> {
    let collection = store.collection(schema);
    let mut count = 0;
    for record in records {
        let doc = prepare(schema, record, ids)?;
        collection
            .insert(doc)
            .await
            .with_context(|| format!("inserting into {}", schema.collection))?;
        count += 1;
    }
    Ok(count)
}

/// Import `<collection>.json` files from `dir`; missing files are skipped
pub async fn import_dir(store: &Store, dir: &Path) -> Result<SeedReport> {
    let mut ids = IdMap::default();
    let mut report = SeedReport::default();

    for schema in ALL_SCHEMAS {
        let path = dir.join(format!("{}.json", schema.collection));
        if !path.exists() {
            warn!("No seed file {}", path.display());
            continue;
        }
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let records: Vec<Value> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let count = import_documents(store, schema, records, &mut ids).await?;
        info!("Imported {} {}", count, schema.collection);
        report.imported.push((schema.collection, count));
    }

    refresh_all_averages(store).await?;
    Ok(report)
}

async fn refresh_all_averages(store: &Store) -> Result<()> {
    let bootcamps = store.collection(&BOOTCAMP_SCHEMA).find(&FindQuery::default()).await?;
    for bootcamp in &bootcamps {
        if let Some(id) = crate::database::document_id(bootcamp) {
            refresh_average_cost(store, id).await?;
            refresh_average_rating(store, id).await?;
        }
    }
    Ok(())
}

/// Remove every document from every collection
pub async fn delete_all(store: &Store) -> Result<u64> {
    let mut total = 0;
    for schema in ALL_SCHEMAS.iter().rev() {
        let removed = store.collection(schema).delete_many(&Filter::new()).await?;
        info!("Deleted {} {}", removed, schema.collection);
        total += removed;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::document_id;
    use crate::models::{COURSE_SCHEMA, USER_SCHEMA};
    use serde_json::json;

    #[tokio::test]
    async fn object_ids_are_remapped_consistently() {
        let store = Store::memory();
        let mut ids = IdMap::default();
        import_documents(
            &store,
            &BOOTCAMP_SCHEMA,
            vec![json!({ "_id": "5d713995b721c3bb38c1f5d0", "name": "Devworks Bootcamp", "user": "5c8a1d5b0190b214360dc031" })],
            &mut ids,
        )
        .await
        .unwrap();
        import_documents(
            &store,
            &COURSE_SCHEMA,
            vec![json!({ "title": "Front End", "tuition": 8000, "bootcamp": "5d713995b721c3bb38c1f5d0" })],
            &mut ids,
        )
        .await
        .unwrap();

        let camps = store.collection(&BOOTCAMP_SCHEMA).find(&FindQuery::default()).await.unwrap();
        let courses = store.collection(&COURSE_SCHEMA).find(&FindQuery::default()).await.unwrap();
        assert_eq!(camps[0]["slug"], json!("devworks-bootcamp"));
        assert_eq!(courses[0]["bootcamp"].as_str(), document_id(&camps[0]));
    }

    #[tokio::test]
    async fn plaintext_passwords_are_hashed() {
        let store = Store::memory();
        import_documents(
            &store,
            &USER_SCHEMA,
            vec![json!({ "name": "Admin", "email": "admin@gmail.com", "role": "admin", "password": "123456" })],
            &mut IdMap::default(),
        )
        .await
        .unwrap();
        let users = store.collection(&USER_SCHEMA).find(&FindQuery::default()).await.unwrap();
        let hash = users[0][PASSWORD_FIELD].as_str().unwrap();
        assert!(crate::models::user::verify_password("123456", hash));
    }

    #[tokio::test]
    async fn delete_all_empties_every_collection() {
        let store = Store::memory();
        import_documents(&store, &COURSE_SCHEMA, vec![json!({ "title": "a" }), json!({ "title": "b" })], &mut IdMap::default())
            .await
            .unwrap();
        assert_eq!(delete_all(&store).await.unwrap(), 2);
    }
}
