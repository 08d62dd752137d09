use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// OpenAPI Schema definition
///
/// Schemas are loaded from schema modules by a [`crate::resolver::SchemaProvider`] and are
/// never mutated once loaded; combining two partial schemas produces a new value through
/// [`Schema::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "date-time", "uuid")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    /// Required field names for object types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Items schema for array types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values for enum types
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Reference to another schema
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A single problem found by [`Schema::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending value; empty for the root
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl Schema {
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::of_type("object")
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type("array")
        }
    }

    /// Adds a property, marking it required when asked.
    pub fn with_property(mut self, name: &str, schema: Schema, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// An object of required string fields, each using its own name as the example.
    ///
    /// Used for middleware that contributes fixed fields (an auth header, a tenant id)
    /// without a schema module of its own.
    pub fn string_fields<S: AsRef<str>>(names: &[S]) -> Self {
        names.iter().fold(Self::object(), |schema, name| {
            let name = name.as_ref();
            let field = Schema {
                example: Some(Value::String(name.to_string())),
                ..Self::of_type("string")
            };
            schema.with_property(name, field, true)
        })
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    /// Combines two partial schemas into one.
    ///
    /// Properties are unioned; a property declared by `other` replaces the one in `self`
    /// under the same name, and `other` decides whether that property is required.
    /// Scalar attributes present in `other` override those of `self`.
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut merged = self.clone();

        override_with(&mut merged.schema_type, &other.schema_type);
        override_with(&mut merged.format, &other.format);
        override_with(&mut merged.description, &other.description);
        override_with(&mut merged.items, &other.items);
        override_with(&mut merged.enum_values, &other.enum_values);
        override_with(&mut merged.example, &other.example);
        override_with(&mut merged.nullable, &other.nullable);
        override_with(&mut merged.reference, &other.reference);

        merged
            .required
            .retain(|name| !other.properties.contains_key(name));
        for (name, property) in &other.properties {
            merged.properties.insert(name.clone(), property.clone());
        }
        for name in &other.required {
            if !merged.is_required(name) {
                merged.required.push(name.clone());
            }
        }

        merged
    }

    /// Checks a JSON value against this schema.
    ///
    /// `$ref` schemas are not followed and accept any value.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        self.collect_issues(value, "", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    fn collect_issues(&self, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
        let issue = |message: String| ValidationIssue {
            path: path.to_string(),
            message,
        };

        if self.reference.is_some() || (value.is_null() && self.nullable == Some(true)) {
            return;
        }

        if let Some(expected) = self.schema_type.as_deref() {
            if !type_matches(expected, value) {
                issues.push(issue(format!(
                    "expected {}, found {}",
                    expected,
                    type_name(value)
                )));
                return;
            }
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                issues.push(issue(format!("{} is not one of the allowed values", value)));
            }
        }

        match value {
            Value::Object(fields) => {
                for name in &self.required {
                    if !fields.contains_key(name) {
                        issues.push(ValidationIssue {
                            path: child_path(path, name),
                            message: "missing required property".to_string(),
                        });
                    }
                }
                for (name, property) in &self.properties {
                    if let Some(field) = fields.get(name) {
                        property.collect_issues(field, &child_path(path, name), issues);
                    }
                }
            }
            Value::Array(elements) => {
                if let Some(items) = &self.items {
                    for (index, element) in elements.iter().enumerate() {
                        let path = format!("{}[{}]", path, index);
                        items.collect_issues(element, &path, issues);
                    }
                }
            }
            _ => {}
        }
    }
}

fn override_with<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        target.clone_from(source);
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
