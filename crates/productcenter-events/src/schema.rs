//! Schema definition types and the recursive payload validator.
//!
//! A schema is a flat list of [`FieldSpec`]s over a closed vocabulary of
//! [`FieldKind`]s. One recursive routine interprets the vocabulary, so the
//! required/optional/open-metadata semantics live in exactly one place and
//! validation is a pure function of (schema, payload).
//!
//! Unknown fields are rejected everywhere except inside [`FieldKind::Map`]
//! fields, which are open key/value maps by contract. Update objects
//! ([`FieldKind::Update`]) carry partial-update semantics: every inner field
//! is optional and an empty object is a valid no-op.

use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};

/// The closed set of field kinds a schema may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A UTF-8 string.
    Text,
    /// An integer (no fractional part on the wire).
    Integer,
    /// Any JSON number.
    Number,
    /// A boolean.
    Boolean,
    /// A string in email form (`local@domain.tld`).
    Email,
    /// A string drawn from a closed set of values.
    Enum(&'static [&'static str]),
    /// An open key/value map: any keys, any JSON values.
    Map,
    /// A nested partial-update object. Every inner field is optional; an
    /// empty object is accepted and means "no changes".
    Update(Vec<FieldSpec>),
}

impl FieldKind {
    /// Builds an [`FieldKind::Update`] from `(name, kind)` pairs.
    ///
    /// The only constructor for update objects: it forces every inner field
    /// to be optional, so partial-update semantics cannot be violated by a
    /// schema definition.
    #[must_use]
    pub fn update(fields: Vec<(&'static str, FieldKind)>) -> Self {
        FieldKind::Update(
            fields
                .into_iter()
                .map(|(name, kind)| FieldSpec::optional(name, kind))
                .collect(),
        )
    }
}

/// One field of a schema: name, kind, and whether it must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    required: bool,
}

impl FieldSpec {
    /// A field that must be present.
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    /// A field that may be absent.
    #[must_use]
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    /// Returns the field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// The structural contract for one topic's payloads.
///
/// Immutable once registered; built by [`SchemaRegistry::with_catalog`] at
/// process start.
///
/// [`SchemaRegistry::with_catalog`]: crate::registry::SchemaRegistry::with_catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSchema {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl EventSchema {
    /// Creates an empty schema with the given name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::required(name, kind));
        self
    }

    /// Adds an optional field.
    #[must_use]
    pub fn optional(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::optional(name, kind));
        self
    }

    /// Returns the schema name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the field specs.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validates a payload against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedPayload`] if the payload root is not
    /// an object, or [`SchemaError::Violation`] with the offending dotted
    /// field path on any structural mismatch.
    pub fn validate(&self, payload: &Value) -> SchemaResult<()> {
        let Some(object) = payload.as_object() else {
            return Err(SchemaError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                type_name(payload)
            )));
        };
        validate_object(&self.fields, object, "")
    }
}

/// Validates one object level against its field specs.
fn validate_object(specs: &[FieldSpec], object: &Map<String, Value>, path: &str) -> SchemaResult<()> {
    for spec in specs {
        let field_path = join_path(path, spec.name);
        match object.get(spec.name) {
            Some(value) => check_value(&spec.kind, value, &field_path)?,
            None if spec.required => {
                return Err(SchemaError::violation(field_path, "missing required field"));
            }
            None => {}
        }
    }

    // Extra keys are rejected at every level; open maps are handled inside
    // check_value and never reach this loop.
    for key in object.keys() {
        if !specs.iter().any(|spec| spec.name == key) {
            return Err(SchemaError::violation(join_path(path, key), "unknown field"));
        }
    }

    Ok(())
}

/// Checks one present value against its declared kind.
fn check_value(kind: &FieldKind, value: &Value, path: &str) -> SchemaResult<()> {
    match kind {
        FieldKind::Text => expect(value.is_string(), value, path, "expected a string"),
        FieldKind::Integer => expect(
            value.as_i64().is_some() || value.as_u64().is_some(),
            value,
            path,
            "expected an integer",
        ),
        FieldKind::Number => expect(value.is_number(), value, path, "expected a number"),
        FieldKind::Boolean => expect(value.is_boolean(), value, path, "expected a boolean"),
        FieldKind::Email => {
            let Some(text) = value.as_str() else {
                return Err(type_violation(value, path, "expected a string"));
            };
            if is_email(text) {
                Ok(())
            } else {
                Err(SchemaError::violation(
                    path,
                    "not a well-formed email address",
                ))
            }
        }
        FieldKind::Enum(allowed) => {
            let Some(text) = value.as_str() else {
                return Err(type_violation(value, path, "expected a string"));
            };
            if allowed.contains(&text) {
                Ok(())
            } else {
                Err(SchemaError::violation(
                    path,
                    format!("'{}' is not one of {:?}", text, allowed),
                ))
            }
        }
        FieldKind::Map => expect(value.is_object(), value, path, "expected an object"),
        FieldKind::Update(inner) => {
            let Some(object) = value.as_object() else {
                return Err(type_violation(value, path, "expected an object"));
            };
            // Empty object = no-op update; valid by contract.
            validate_object(inner, object, path)
        }
    }
}

fn expect(ok: bool, value: &Value, path: &str, problem: &str) -> SchemaResult<()> {
    if ok {
        Ok(())
    } else {
        Err(type_violation(value, path, problem))
    }
}

fn type_violation(value: &Value, path: &str, problem: &str) -> SchemaError {
    SchemaError::violation(path, format!("{}, got {}", problem, type_name(value)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Minimal structural email check: one `@`, non-empty local part, domain
/// with an interior dot, no whitespace.
fn is_email(text: &str) -> bool {
    let mut parts = text.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.len() >= 3
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !text.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// A payload that has passed validation for its topic.
///
/// Only the registry can mint one, so a `ValidatedPayload` in hand is
/// proof the contract was checked. The inner value is immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayload {
    value: Value,
}

impl ValidatedPayload {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }

    /// Returns the validated JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Returns a top-level field, if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// Consumes the wrapper, returning the inner value.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.value
    }
}

impl serde::Serialize for ValidatedPayload {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
