use chrono::DateTime;
use serde_json::{Map, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::database::{Document, CREATED_AT_FIELD, ID_FIELD};

/// Storage kind of a resource field, used for coercing request input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    /// Reference to another document's `_id`
    Id,
    /// RFC 3339 timestamp
    Date,
    TextList,
    /// Free-form nested object, addressable with dotted paths
    Object,
}

impl FieldKind {
    /// Coerce a raw query-string value
    pub fn coerce_param(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            FieldKind::Text | FieldKind::TextList => Some(Value::String(raw.to_string())),
            FieldKind::Number => parse_number(raw),
            FieldKind::Bool => match raw {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            FieldKind::Id => Uuid::parse_str(raw).ok().map(|id| Value::String(id.to_string())),
            FieldKind::Date => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| Value::String(crate::database::format_timestamp(dt.into()))),
            // Leaves of nested objects carry no declared kind and match as text
            FieldKind::Object => Some(Value::String(raw.to_string())),
        }
    }

    /// Coerce a JSON body value
    pub fn coerce_json(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (FieldKind::Text, Value::String(s)) => Some(Value::String(s.trim().to_string())),
            (FieldKind::Text, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldKind::Number, Value::Number(_)) => Some(value.clone()),
            (FieldKind::Bool, Value::Bool(_)) => Some(value.clone()),
            (FieldKind::TextList, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(|s| Value::String(s.trim().to_string())))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            (FieldKind::TextList, Value::String(s)) => Some(Value::Array(vec![Value::String(s.trim().to_string())])),
            (FieldKind::Object, Value::Object(_)) => Some(value.clone()),
            (kind, Value::String(s)) => kind.coerce_param(s),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Number => "a number",
            FieldKind::Bool => "a boolean",
            FieldKind::Id => "a valid id",
            FieldKind::Date => "an RFC 3339 timestamp",
            FieldKind::TextList => "a list of strings",
            FieldKind::Object => "an object",
        }
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Bool(bool),
    Text(&'static str),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Text(s) => Value::String(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    /// Never rendered in responses nor selectable
    pub hidden: bool,
    /// Accepted from request bodies; system-managed fields are not
    pub writable: bool,
    pub max_len: Option<usize>,
    pub min_len: Option<usize>,
    pub range: Option<(f64, f64)>,
    pub choices: &'static [&'static str],
    pub email: bool,
    pub default: Option<DefaultValue>,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
            hidden: false,
            writable: true,
            max_len: None,
            min_len: None,
            range: None,
            choices: &[],
            email: false,
            default: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub const fn id(name: &'static str) -> Self {
        Self::new(name, FieldKind::Id)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn system(mut self) -> Self {
        self.writable = false;
        self
    }

    pub const fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub const fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub const fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }

    pub const fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub const fn default_to(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.required {
                let article = if self.name.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
                Err(format!("Please add {} {}", article, self.name))
            } else {
                Ok(())
            };
        }

        let texts: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => vec![],
        };

        for text in &texts {
            if let Some(max) = self.max_len {
                if text.chars().count() > max {
                    return Err(format!("{} cannot be more than {} characters", self.name, max));
                }
            }
            if let Some(min) = self.min_len {
                if text.chars().count() < min {
                    return Err(format!("{} must be at least {} characters", self.name, min));
                }
            }
            if !self.choices.is_empty() && !self.choices.contains(text) {
                return Err(format!("{} must be one of: {}", self.name, self.choices.join(", ")));
            }
            if self.email && !looks_like_email(text) {
                return Err("Please add a valid email".to_string());
            }
        }

        if self.required && self.kind == FieldKind::TextList && texts.is_empty() {
            return Err(format!("Please add at least one {}", self.name));
        }

        if let (Some((min, max)), Some(n)) = (self.range, value.as_f64()) {
            if n < min || n > max {
                return Err(format!("{} must be between {} and {}", self.name, min, max));
            }
        }

        Ok(())
    }
}

const EMAIL_PATTERN: &str = r"^(?-u:\w)+([.-]?(?-u:\w)+)*@(?-u:\w)+([.-]?(?-u:\w)+)*(\.(?-u:\w){2,3})+$";

fn looks_like_email(text: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

/// Per-field validation failures collected while checking a request body
#[derive(Debug, Default)]
pub struct ValidationErrors {
    pub fields: HashMap<String, String>,
}

impl ValidationErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Comma-joined messages sorted by field, for the error body
    pub fn summary(&self) -> String {
        let mut entries: Vec<_> = self.fields.iter().collect();
        entries.sort();
        entries.into_iter().map(|(_, msg)| msg.as_str()).collect::<Vec<_>>().join(", ")
    }
}

const SYSTEM_FIELDS: &[FieldDef] = &[
    FieldDef::id(ID_FIELD).system(),
    FieldDef::new(CREATED_AT_FIELD, FieldKind::Date).system(),
];

/// Field allowlist and constraints of one resource collection
#[derive(Debug)]
pub struct ResourceSchema {
    /// Collection name in the store
    pub collection: &'static str,
    /// Singular display name used in messages
    pub label: &'static str,
    pub fields: &'static [FieldDef],
    /// Fields whose combined values may appear only once
    pub unique_together: &'static [&'static str],
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        SYSTEM_FIELDS.iter().chain(self.fields.iter()).find(|f| f.name == name)
    }

    /// Resolve a possibly dotted path (`location.city`) to the kind used for coercion
    pub fn path_kind(&self, path: &str) -> Option<FieldKind> {
        match path.split_once('.') {
            None => self.field(path).filter(|f| !f.hidden).map(|f| f.kind),
            Some((head, rest)) if !rest.is_empty() => self
                .field(head)
                .filter(|f| !f.hidden && f.kind == FieldKind::Object)
                .map(|_| FieldKind::Object),
            _ => None,
        }
    }

    /// Unique single fields, then the compound key when there is one
    pub fn unique_keys(&self) -> Vec<Vec<&'static str>> {
        let mut keys: Vec<Vec<&'static str>> =
            self.fields.iter().filter(|f| f.unique).map(|f| vec![f.name]).collect();
        if !self.unique_together.is_empty() {
            keys.push(self.unique_together.to_vec());
        }
        keys
    }

    pub fn hidden_fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().filter(|f| f.hidden).map(|f| f.name)
    }

    /// Validate a create body: coerce known fields, apply defaults, enforce required
    pub fn validate_create(&self, body: &Value) -> Result<Document, ValidationErrors> {
        let mut doc = self.coerce_body(body)?;
        let mut errors = ValidationErrors::default();

        for field in self.fields.iter().filter(|f| f.writable) {
            // An explicit null counts as absent
            if doc.get(field.name).is_some_and(Value::is_null) {
                doc.remove(field.name);
            }
            if !doc.contains_key(field.name) {
                if let Some(default) = field.default {
                    doc.insert(field.name.to_string(), default.to_value());
                }
            }
            let value = doc.get(field.name).unwrap_or(&Value::Null);
            if let Err(msg) = field.check(value) {
                errors.add(field.name, msg);
            }
        }

        if errors.is_empty() {
            Ok(doc)
        } else {
            Err(errors)
        }
    }

    /// Validate a partial update body; only the supplied fields are checked
    pub fn validate_update(&self, body: &Value) -> Result<Document, ValidationErrors> {
        let doc = self.coerce_body(body)?;
        let mut errors = ValidationErrors::default();

        for (key, value) in &doc {
            if let Some(field) = self.field(key) {
                if value.is_null() && field.default.is_some() {
                    errors.add(key, format!("{} cannot be empty", key));
                } else if let Err(msg) = field.check(value) {
                    errors.add(key, msg);
                }
            }
        }

        if errors.is_empty() {
            Ok(doc)
        } else {
            Err(errors)
        }
    }

    fn coerce_body(&self, body: &Value) -> Result<Document, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(input) = body.as_object() else {
            errors.add("body", "Request body must be a JSON object");
            return Err(errors);
        };

        let mut doc = Map::new();
        for (key, value) in input {
            // Unknown and system-managed fields are dropped
            let Some(field) = self.fields.iter().find(|f| f.name == key && f.writable) else {
                continue;
            };
            match field.kind.coerce_json(value) {
                Some(coerced) => {
                    doc.insert(key.clone(), coerced);
                }
                None => errors.add(key, format!("{} must be {}", key, field.kind.describe())),
            }
        }

        if errors.is_empty() {
            Ok(doc)
        } else {
            Err(errors)
        }
    }

    /// Remove hidden fields before a document leaves the service
    pub fn public_view(&self, mut doc: Document) -> Document {
        for hidden in self.hidden_fields() {
            doc.remove(hidden);
        }
        doc
    }
}
