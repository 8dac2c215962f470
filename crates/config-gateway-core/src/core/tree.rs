// crates/config-gateway-core/src/core/tree.rs
// ============================================================================
// Module: Configuration Tree Conversion
// Description: Flat JSON documents and nested TOML configuration trees.
// Purpose: Convert caller documents to registry trees and back without loss.
// Dependencies: serde_json, thiserror, toml
// ============================================================================

//! ## Overview
//! Callers exchange a [`ConfigurationDocument`], a JSON object whose values
//! may themselves be objects or arrays. The registry persists a
//! [`ConfigurationTree`], a nested TOML table. Conversion is structure
//! preserving: every key path and leaf present on one side is reachable at the
//! same path on the other.
//!
//! TOML has no null and only signed 64-bit integers, so documents containing
//! `null` or integers above `i64::MAX` cannot be represented and fail with
//! [`ConversionError`]. TOML datetimes have no JSON counterpart and are
//! rendered as strings on the way out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Number;
use serde_json::Value as JsonValue;
use thiserror::Error;
use toml::Table;
use toml::Value as TomlValue;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Flat key/value document exchanged with callers.
pub type ConfigurationDocument = Map<String, JsonValue>;

/// Nested configuration tree persisted by the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationTree(Table);

impl ConfigurationTree {
    /// Wraps an existing TOML table.
    #[must_use]
    pub const fn from_table(table: Table) -> Self {
        Self(table)
    }

    /// Converts a caller document into a configuration tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when a value has no TOML representation.
    pub fn from_document(document: &ConfigurationDocument) -> Result<Self, ConversionError> {
        table_from_object(document, "").map(Self)
    }

    /// Converts the tree back into a caller document.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when a float is not finite.
    pub fn to_document(&self) -> Result<ConfigurationDocument, ConversionError> {
        object_from_table(&self.0, "")
    }

    /// Returns the value at a dotted path such as `Writable.LogLevel`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&TomlValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns the underlying table.
    #[must_use]
    pub const fn as_table(&self) -> &Table {
        &self.0
    }

    /// Consumes the tree and returns the underlying table.
    #[must_use]
    pub fn into_table(self) -> Table {
        self.0
    }

    /// Returns true when the tree holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<TomlValue> for ConfigurationTree {
    type Error = TypeCheckError;

    fn try_from(value: TomlValue) -> Result<Self, Self::Error> {
        match value {
            TomlValue::Table(table) => Ok(Self(table)),
            other => Err(TypeCheckError {
                found: other.type_str(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Values that cannot cross between JSON and TOML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// JSON null has no TOML representation.
    #[error("null value at `{path}` cannot be stored in a configuration tree")]
    NullValue {
        /// Dotted key path of the offending value.
        path: String,
    },
    /// Integer outside the signed 64-bit range.
    #[error("integer at `{path}` is out of range for a configuration tree")]
    IntegerOutOfRange {
        /// Dotted key path of the offending value.
        path: String,
    },
    /// Float that JSON cannot encode.
    #[error("non-finite float at `{path}` cannot be encoded as JSON")]
    NonFiniteFloat {
        /// Dotted key path of the offending value.
        path: String,
    },
}

/// Registry value that is not a configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected a configuration table, found {found}")]
pub struct TypeCheckError {
    /// TOML type name of the value actually returned.
    pub found: &'static str,
}

// ============================================================================
// SECTION: Value Conversion
// ============================================================================

/// Converts one JSON value into a TOML value.
///
/// # Errors
///
/// Returns [`ConversionError`] for `null` or out-of-range integers.
pub fn value_from_json(value: &JsonValue) -> Result<TomlValue, ConversionError> {
    convert_json(value, "")
}

/// Converts one TOML value into a JSON value.
///
/// # Errors
///
/// Returns [`ConversionError`] for non-finite floats.
pub fn value_to_json(value: &TomlValue) -> Result<JsonValue, ConversionError> {
    convert_toml(value, "")
}

/// Converts a JSON object into a TOML table.
fn table_from_object(object: &Map<String, JsonValue>, prefix: &str) -> Result<Table, ConversionError> {
    let mut table = Table::new();
    for (key, value) in object {
        let path = join_path(prefix, key);
        table.insert(key.clone(), convert_json(value, &path)?);
    }
    Ok(table)
}

/// Converts a TOML table into a JSON object.
fn object_from_table(table: &Table, prefix: &str) -> Result<Map<String, JsonValue>, ConversionError> {
    let mut object = Map::new();
    for (key, value) in table {
        let path = join_path(prefix, key);
        object.insert(key.clone(), convert_toml(value, &path)?);
    }
    Ok(object)
}

/// Converts a JSON value found at `path`.
fn convert_json(value: &JsonValue, path: &str) -> Result<TomlValue, ConversionError> {
    match value {
        JsonValue::Null => Err(ConversionError::NullValue {
            path: path.to_string(),
        }),
        JsonValue::Bool(flag) => Ok(TomlValue::Boolean(*flag)),
        JsonValue::Number(number) => convert_number(number, path),
        JsonValue::String(text) => Ok(TomlValue::String(text.clone())),
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| convert_json(item, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(TomlValue::Array),
        JsonValue::Object(object) => table_from_object(object, path).map(TomlValue::Table),
    }
}

/// Converts a JSON number, keeping integers integral.
fn convert_number(number: &Number, path: &str) -> Result<TomlValue, ConversionError> {
    if let Some(integer) = number.as_i64() {
        return Ok(TomlValue::Integer(integer));
    }
    if number.is_u64() {
        return Err(ConversionError::IntegerOutOfRange {
            path: path.to_string(),
        });
    }
    number.as_f64().map(TomlValue::Float).ok_or_else(|| ConversionError::IntegerOutOfRange {
        path: path.to_string(),
    })
}

/// Converts a TOML value found at `path`.
fn convert_toml(value: &TomlValue, path: &str) -> Result<JsonValue, ConversionError> {
    match value {
        TomlValue::String(text) => Ok(JsonValue::String(text.clone())),
        TomlValue::Integer(integer) => Ok(JsonValue::Number(Number::from(*integer))),
        TomlValue::Float(float) => {
            Number::from_f64(*float).map(JsonValue::Number).ok_or_else(|| {
                ConversionError::NonFiniteFloat {
                    path: path.to_string(),
                }
            })
        }
        TomlValue::Boolean(flag) => Ok(JsonValue::Bool(*flag)),
        TomlValue::Datetime(datetime) => Ok(JsonValue::String(datetime.to_string())),
        TomlValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| convert_toml(item, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        TomlValue::Table(table) => object_from_table(table, path).map(JsonValue::Object),
    }
}

/// Appends a key to a dotted path.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
