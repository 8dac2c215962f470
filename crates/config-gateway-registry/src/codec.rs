// crates/config-gateway-registry/src/codec.rs
// ============================================================================
// Module: Key/Value Tree Codec
// Description: Flattening configuration trees into key/value leaves and back.
// Purpose: Map nested TOML tables onto slash-separated registry keys.
// Dependencies: config-gateway-core, serde_json, toml
// ============================================================================

//! ## Overview
//! Key/value registries store one text value per key. A configuration tree is
//! flattened so that each leaf lives at `<base>/<segment>/.../<leaf>`; empty
//! tables are kept as folder keys ending in `/`. Table keys must be usable as a
//! single path segment, so empty keys, keys containing `/`, and `.` or `..` are
//! refused rather than silently restructured.
//!
//! Leaf text is typed on the way back only when it is exactly the text the
//! encoder would produce for that type: `48095` reads as an integer, while
//! `007`, `+5` and `1e3` stay strings. A string whose text equals the encoding
//! of a boolean, number, datetime or array (for example `"true"` or `"[1,2]"`)
//! cannot be told apart from that value and reads back typed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use config_gateway_core::RegistryError;
use config_gateway_core::value_from_json;
use config_gateway_core::value_to_json;
use serde_json::Value as JsonValue;
use toml::Table;
use toml::Value as TomlValue;
use toml::value::Datetime;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One key/value pair ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    /// Full registry key; folder keys end with `/`.
    pub key: String,
    /// Leaf text (empty for folder keys).
    pub value: String,
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Flattens a table rooted at `base` into registry entries.
///
/// # Errors
///
/// Returns [`RegistryError::Data`] when a key is not a valid path segment or
/// a leaf cannot be encoded.
pub fn flatten_table(base: &str, table: &Table) -> Result<Vec<FlatEntry>, RegistryError> {
    let mut entries = Vec::new();
    if table.is_empty() {
        entries.push(folder_entry(base));
        return Ok(entries);
    }
    flatten_into(base, table, &mut entries)?;
    Ok(entries)
}

/// Recursively appends the leaves of `table` under `prefix`.
fn flatten_into(
    prefix: &str,
    table: &Table,
    entries: &mut Vec<FlatEntry>,
) -> Result<(), RegistryError> {
    for (key, value) in table {
        if !is_path_segment(key) {
            return Err(RegistryError::Data(format!(
                "configuration key `{key}` is not a valid registry path segment"
            )));
        }
        let path = format!("{prefix}/{key}");
        match value {
            TomlValue::Table(child) if child.is_empty() => entries.push(folder_entry(&path)),
            TomlValue::Table(child) => flatten_into(&path, child, entries)?,
            leaf => entries.push(FlatEntry {
                key: path,
                value: encode_leaf(leaf)?,
            }),
        }
    }
    Ok(())
}

/// Returns true when `key` can name exactly one registry path segment.
#[must_use]
pub fn is_path_segment(key: &str) -> bool {
    !key.is_empty() && !key.contains('/') && key != "." && key != ".."
}

/// Builds the folder key for an empty table.
fn folder_entry(path: &str) -> FlatEntry {
    FlatEntry {
        key: format!("{path}/"),
        value: String::new(),
    }
}

/// Renders a leaf value as registry text.
///
/// # Errors
///
/// Returns [`RegistryError::Data`] when an array cannot be encoded as JSON.
pub fn encode_leaf(value: &TomlValue) -> Result<String, RegistryError> {
    match value {
        TomlValue::String(text) => Ok(text.clone()),
        TomlValue::Integer(integer) => Ok(integer.to_string()),
        TomlValue::Float(float) => Ok(format!("{float:?}")),
        TomlValue::Boolean(flag) => Ok(flag.to_string()),
        TomlValue::Datetime(datetime) => Ok(datetime.to_string()),
        TomlValue::Array(_) | TomlValue::Table(_) => {
            let json = value_to_json(value).map_err(|err| RegistryError::Data(err.to_string()))?;
            serde_json::to_string(&json).map_err(|err| RegistryError::Data(err.to_string()))
        }
    }
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Recovers a typed leaf value from registry text.
///
/// A typed reading is kept only when re-encoding it yields `text` again.
#[must_use]
pub fn decode_leaf(text: &str) -> TomlValue {
    match typed_leaf(text) {
        Some(value) if encode_leaf(&value).is_ok_and(|encoded| encoded == text) => value,
        _ => TomlValue::String(text.to_string()),
    }
}

/// Parses `text` as a non-string leaf, if it has that shape.
fn typed_leaf(text: &str) -> Option<TomlValue> {
    match text {
        "true" => return Some(TomlValue::Boolean(true)),
        "false" => return Some(TomlValue::Boolean(false)),
        _ => {}
    }
    if let Ok(integer) = text.parse::<i64>() {
        return Some(TomlValue::Integer(integer));
    }
    if let Ok(float) = text.parse::<f64>()
        && float.is_finite()
    {
        return Some(TomlValue::Float(float));
    }
    if let Ok(datetime) = text.parse::<Datetime>() {
        return Some(TomlValue::Datetime(datetime));
    }
    if text.starts_with('[')
        && let Ok(json @ JsonValue::Array(_)) = serde_json::from_str::<JsonValue>(text)
    {
        return value_from_json(&json).ok();
    }
    None
}

/// Rebuilds the value stored under `base` from `(key, text)` pairs.
///
/// Keys outside `base` are ignored. A key equal to `base` yields a bare leaf.
///
/// # Errors
///
/// Returns [`RegistryError::Data`] when a key is both a leaf and a prefix.
pub fn build_value<I>(base: &str, entries: I) -> Result<TomlValue, RegistryError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = format!("{base}/");
    let mut root = Table::new();
    let mut bare = None;
    for (key, text) in entries {
        if key == base {
            bare = Some(decode_leaf(&text));
            continue;
        }
        let Some(relative) = key.strip_prefix(&prefix) else {
            continue;
        };
        insert_relative(&mut root, relative, &text)?;
    }
    match bare {
        Some(_) if !root.is_empty() => Err(conflict(base)),
        Some(leaf) => Ok(leaf),
        None => Ok(TomlValue::Table(root)),
    }
}

/// Returns true when `key` is `base` or lies beneath it.
#[must_use]
pub fn is_within(base: &str, key: &str) -> bool {
    key == base || key.strip_prefix(base).is_some_and(|rest| rest.starts_with('/'))
}

/// Inserts one relative key into the tree.
fn insert_relative(root: &mut Table, relative: &str, text: &str) -> Result<(), RegistryError> {
    let (folder, path) = match relative.strip_suffix('/') {
        Some(path) => (true, path),
        None => (false, relative),
    };
    if path.is_empty() {
        return Ok(());
    }
    let mut segments: Vec<&str> = path.split('/').collect();
    let last = if folder { None } else { segments.pop() };
    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| TomlValue::Table(Table::new()));
        current = match slot {
            TomlValue::Table(table) => table,
            _ => return Err(conflict(path)),
        };
    }
    if let Some(leaf) = last {
        if current.get(leaf).is_some_and(TomlValue::is_table) {
            return Err(conflict(path));
        }
        current.insert(leaf.to_string(), decode_leaf(text));
    }
    Ok(())
}

/// Builds the leaf/prefix conflict error.
fn conflict(path: &str) -> RegistryError {
    RegistryError::Data(format!("registry key `{path}` is both a value and a folder"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
