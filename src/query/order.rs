use super::error::QueryError;
use super::types::SortKey;

/// Parse `sort=-createdAt,name` into ordered keys; a leading `-` means descending
pub fn parse_sort(raw: &str) -> Result<Vec<SortKey>, QueryError> {
    let mut keys = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = match trimmed.strip_prefix('-') {
            Some(field) => SortKey::desc(field.trim()),
            None => SortKey::asc(trimmed.strip_prefix('+').unwrap_or(trimmed).trim()),
        };
        if key.field.is_empty() || key.field.starts_with('-') {
            return Err(QueryError::InvalidSort(trimmed.to_string()));
        }
        keys.push(key);
    }
    Ok(keys)
}
