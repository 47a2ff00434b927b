//! Schemas and validation
//!
//! A [`Schema`] keeps its attributes in declaration order so that validation
//! errors and descriptions are reported deterministically.

use crate::attribute::Attribute;
use crate::error::{Result, ValidationError};
use crate::spec_data::SpecData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What to do with spec keys the schema does not declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeyPolicy {
    /// Fail validation, naming the unknown key
    #[default]
    Reject,
    /// Accept the spec and drop the key from the resolved data
    Ignore,
}

/// Ordered mapping from attribute name to descriptor
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: Vec<(String, Attribute)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute. Redeclaring a name replaces the earlier entry
    /// in place.
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        let name = name.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = attribute,
            None => self.attributes.push((name, attribute)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, attr)| attr)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Validate a raw spec, which must be a JSON object
    pub fn validate(&self, raw: &Value, policy: UnknownKeyPolicy) -> Result<SpecData> {
        match raw {
            Value::Object(entries) => self.validate_map(entries, policy),
            Value::Null => self.validate_map(&Map::new(), policy),
            _ => Err(ValidationError::invalid_value("<spec>", "spec must be a map")),
        }
    }

    /// Validate a raw spec given as a map of items
    pub fn validate_map(&self, raw: &Map<String, Value>, policy: UnknownKeyPolicy) -> Result<SpecData> {
        self.resolve_entries("", raw, policy).map(SpecData::from_resolved)
    }

    /// Resolve every declared attribute of `raw`, prefixing paths with
    /// `prefix` (empty at the top level).
    pub(crate) fn resolve_entries(
        &self,
        prefix: &str,
        raw: &Map<String, Value>,
        policy: UnknownKeyPolicy,
    ) -> Result<Map<String, Value>> {
        if policy == UnknownKeyPolicy::Reject {
            if let Some(unknown) = raw.keys().find(|key| !self.contains(key)) {
                return Err(ValidationError::UnknownKey {
                    path: join_path(prefix, unknown),
                });
            }
        }

        let mut resolved = Map::with_capacity(self.attributes.len());
        for (name, attribute) in &self.attributes {
            let path = join_path(prefix, name);
            let value = attribute.resolve(&path, raw.get(name), policy)?;
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    /// JSON description of every attribute, keyed by name
    pub fn describe(&self) -> Value {
        Value::Object(
            self.attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.describe()))
                .collect(),
        )
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn server_like() -> Schema {
        Schema::new()
            .attribute("flavor", Attribute::string("Flavor").required())
            .attribute("name", Attribute::string("Name").required())
            .attribute("auto_disk_config", Attribute::boolean("Auto disk").with_default(json!(true)))
            .attribute("timeout", Attribute::integer("Timeout").with_default(json!(120)))
            .attribute("key_name", Attribute::string("Key pair"))
            .attribute(
                "networks",
                Attribute::list("Networks").of(
                    Attribute::map("Network").fields(
                        Schema::new()
                            .attribute("port", Attribute::string("Port"))
                            .attribute("fixed-ip", Attribute::string("Fixed IP")),
                    ),
                ),
            )
            .attribute(
                "personality",
                Attribute::list("Files").of(
                    Attribute::map("File").fields(
                        Schema::new()
                            .attribute("path", Attribute::string("Path").required())
                            .attribute("contents", Attribute::string("Contents").required()),
                    ),
                ),
            )
    }

    #[test]
    fn test_missing_required_names_attribute() {
        let err = server_like()
            .validate(&json!({"name": "web"}), UnknownKeyPolicy::Reject)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingRequired { path: "flavor".into() });
    }

    #[test]
    fn test_defaults_filled() {
        let data = server_like()
            .validate(&json!({"name": "web", "flavor": "m1"}), UnknownKeyPolicy::Reject)
            .unwrap();
        assert_eq!(data.get_bool("auto_disk_config"), Some(true));
        assert_eq!(data.get_i64("timeout"), Some(120));
        assert!(data.is_set("flavor"));
        assert!(!data.is_set("key_name"));
        assert_eq!(data.len(), server_like().len());
    }

    #[test]
    fn test_nested_error_has_indexed_path() {
        let raw = json!({
            "name": "web",
            "flavor": "m1",
            "personality": [
                {"path": "/etc/motd", "contents": "hi"},
                {"path": "/etc/issue"}
            ]
        });
        let err = server_like().validate(&raw, UnknownKeyPolicy::Reject).unwrap_err();
        assert_eq!(err.path(), "personality[1].contents");
    }

    #[test]
    fn test_nested_type_error_has_dotted_path() {
        let raw = json!({"name": "web", "flavor": "m1", "networks": [{"port": 80}]});
        let err = server_like().validate(&raw, UnknownKeyPolicy::Reject).unwrap_err();
        assert_eq!(err.path(), "networks[0].port");
    }

    #[test]
    fn test_unknown_key_policy() {
        let raw = json!({"name": "web", "flavor": "m1", "colour": "blue"});

        let err = server_like().validate(&raw, UnknownKeyPolicy::Reject).unwrap_err();
        assert_eq!(err, ValidationError::UnknownKey { path: "colour".into() });

        let data = server_like().validate(&raw, UnknownKeyPolicy::Ignore).unwrap();
        assert!(data.get("colour").is_none());
    }

    #[test]
    fn test_unknown_nested_key_rejected() {
        let raw = json!({"name": "web", "flavor": "m1", "networks": [{"port": "p", "vlan": 3}]});
        let err = server_like().validate(&raw, UnknownKeyPolicy::Reject).unwrap_err();
        assert_eq!(err.path(), "networks[0].vlan");
    }

    #[test]
    fn test_non_map_spec_rejected() {
        let err = server_like().validate(&json!([1, 2]), UnknownKeyPolicy::Reject).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let raw = json!({"name": "web", "flavor": "m1", "timeout": "60"});
        let first = server_like().validate(&raw, UnknownKeyPolicy::Reject).unwrap();
        let second = server_like().validate(&raw, UnknownKeyPolicy::Reject).unwrap();
        assert_eq!(first, second);

        // Resolved data is itself a valid spec and resolves to the same thing
        let again = server_like()
            .validate(&first.to_value(), UnknownKeyPolicy::Reject)
            .unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_redeclared_attribute_replaces() {
        let schema = Schema::new()
            .attribute("a", Attribute::string("first"))
            .attribute("a", Attribute::integer("second"));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("a").unwrap().description(), "second");
    }

    fn optional_schema(defaults: &[i64]) -> Schema {
        defaults.iter().enumerate().fold(
            Schema::new().attribute("req", Attribute::string("required").required()),
            |schema, (i, d)| schema.attribute(format!("opt{}", i), Attribute::integer("optional").with_default(json!(d))),
        )
    }

    proptest! {
        #[test]
        fn property_absent_optionals_get_defaults(
            defaults in proptest::collection::vec(any::<i64>(), 0..8),
            present in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let schema = optional_schema(&defaults);
            let mut raw = Map::new();
            raw.insert("req".into(), json!("x"));
            for (i, _) in defaults.iter().enumerate() {
                if present[i] {
                    raw.insert(format!("opt{}", i), json!(-1));
                }
            }

            let data = schema.validate_map(&raw, UnknownKeyPolicy::Reject).unwrap();
            for (i, d) in defaults.iter().enumerate() {
                let expected = if present[i] { -1 } else { *d };
                prop_assert_eq!(data.get_i64(&format!("opt{}", i)), Some(expected));
            }
        }

        #[test]
        fn property_missing_required_is_named(defaults in proptest::collection::vec(any::<i64>(), 0..8)) {
            let schema = optional_schema(&defaults);
            let err = schema.validate_map(&Map::new(), UnknownKeyPolicy::Ignore).unwrap_err();
            prop_assert_eq!(err.path(), "req");
        }
    }
}
