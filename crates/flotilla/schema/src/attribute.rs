//! Attribute descriptors
//!
//! An [`Attribute`] declares the kind of one spec item, whether it is
//! required, its default, and (for maps and lists) the schema of its entries.

use crate::error::{Result, ValidationError};
use crate::schema::{Schema, UnknownKeyPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Value kinds a spec item may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    String,
    Integer,
    Boolean,
    Map,
    List,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::String => "String",
            AttributeKind::Integer => "Integer",
            AttributeKind::Boolean => "Boolean",
            AttributeKind::Map => "Map",
            AttributeKind::List => "List",
        };
        f.write_str(name)
    }
}

/// Structure of the entries inside a Map or List attribute
#[derive(Debug, Clone)]
pub enum Nested {
    /// Named fields of a Map
    Fields(Schema),
    /// Descriptor every List element must satisfy
    Element(Box<Attribute>),
}

/// Descriptor for one spec item
#[derive(Debug, Clone)]
pub struct Attribute {
    kind: AttributeKind,
    description: String,
    required: bool,
    default: Option<Value>,
    nested: Option<Nested>,
}

impl Attribute {
    fn of_kind(kind: AttributeKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            required: false,
            default: None,
            nested: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::of_kind(AttributeKind::String, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::of_kind(AttributeKind::Integer, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::of_kind(AttributeKind::Boolean, description)
    }

    /// Map attribute; free-form unless [`Attribute::fields`] is set
    pub fn map(description: impl Into<String>) -> Self {
        Self::of_kind(AttributeKind::Map, description)
    }

    /// List attribute; elements unchecked unless [`Attribute::of`] is set
    pub fn list(description: impl Into<String>) -> Self {
        Self::of_kind(AttributeKind::List, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Declare the named fields of a Map attribute
    pub fn fields(mut self, schema: Schema) -> Self {
        self.nested = Some(Nested::Fields(schema));
        self
    }

    /// Declare the element descriptor of a List attribute
    pub fn of(mut self, element: Attribute) -> Self {
        self.nested = Some(Nested::Element(Box::new(element)));
        self
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn nested(&self) -> Option<&Nested> {
        self.nested.as_ref()
    }

    /// Resolve the value for this attribute at `path`.
    ///
    /// `None` and JSON `null` both mean "not provided".
    pub(crate) fn resolve(
        &self,
        path: &str,
        raw: Option<&Value>,
        policy: UnknownKeyPolicy,
    ) -> Result<Value> {
        match raw.filter(|v| !v.is_null()) {
            Some(value) => self.check(path, value, policy),
            None => match &self.default {
                Some(default) => self.check(path, default, policy),
                None if self.required => Err(ValidationError::MissingRequired {
                    path: path.to_string(),
                }),
                None => Ok(Value::Null),
            },
        }
    }

    /// Check a present value against the kind, normalising scalar forms.
    ///
    /// Integers and booleans also accept their string spellings (`"120"`,
    /// `"true"`) since specs are frequently authored as YAML or form input.
    fn check(&self, path: &str, value: &Value, policy: UnknownKeyPolicy) -> Result<Value> {
        match (self.kind, value) {
            (AttributeKind::String, Value::String(_)) => Ok(value.clone()),
            (AttributeKind::Integer, Value::Number(n)) => n
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| ValidationError::invalid_value(path, format!("'{}' is not an integer", n))),
            (AttributeKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| ValidationError::invalid_value(path, format!("'{}' is not an integer", s))),
            (AttributeKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (AttributeKind::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(ValidationError::invalid_value(path, format!("'{}' is not a boolean", s))),
            },
            (AttributeKind::Map, Value::Object(entries)) => self.check_map(path, entries, policy),
            (AttributeKind::List, Value::Array(items)) => self.check_list(path, items, policy),
            (expected, other) => Err(ValidationError::TypeMismatch {
                path: path.to_string(),
                expected,
                actual: json_type_name(other),
            }),
        }
    }

    fn check_map(&self, path: &str, entries: &Map<String, Value>, policy: UnknownKeyPolicy) -> Result<Value> {
        match &self.nested {
            Some(Nested::Fields(schema)) => schema.resolve_entries(path, entries, policy).map(Value::Object),
            Some(Nested::Element(element)) => {
                let mut resolved = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let entry_path = format!("{}.{}", path, key);
                    resolved.insert(key.clone(), element.check(&entry_path, value, policy)?);
                }
                Ok(Value::Object(resolved))
            }
            None => Ok(Value::Object(entries.clone())),
        }
    }

    fn check_list(&self, path: &str, items: &[Value], policy: UnknownKeyPolicy) -> Result<Value> {
        let element = match &self.nested {
            Some(Nested::Element(element)) => element,
            Some(Nested::Fields(_)) => {
                return Err(ValidationError::invalid_value(
                    path,
                    "list attribute declared with map fields",
                ))
            }
            None => return Ok(Value::Array(items.to_vec())),
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let item_path = format!("{}[{}]", path, index);
                if item.is_null() {
                    return Err(ValidationError::MissingRequired { path: item_path });
                }
                element.check(&item_path, item, policy)
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    /// JSON description of this attribute, for listing profile types
    pub fn describe(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), Value::String(self.kind.to_string()));
        out.insert("description".into(), Value::String(self.description.clone()));
        out.insert("required".into(), Value::Bool(self.required));
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        match &self.nested {
            Some(Nested::Fields(schema)) => {
                out.insert("schema".into(), schema.describe());
            }
            Some(Nested::Element(element)) => {
                out.insert("schema".into(), element.describe());
            }
            None => {}
        }
        Value::Object(out)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
