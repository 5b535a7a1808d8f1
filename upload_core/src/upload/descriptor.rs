use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::code::UploadErrorCode;

/// Per-field record describing a submitted file, or the absence of one.
///
/// Every field is optional: `None` stands for a key that was missing, null, or
/// held a container where a scalar was expected. The validator only reads
/// descriptors; hosts build them once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadDescriptor {
    pub error: Option<UploadErrorCode>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    #[serde(rename = "tmp_name")]
    pub temp_path: Option<PathBuf>,
    pub size: Option<u64>,
}

impl UploadDescriptor {
    pub fn received(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        temp_path: impl Into<PathBuf>,
        size: u64,
    ) -> Self {
        Self {
            error: Some(UploadErrorCode::Ok),
            name: Some(name.into()),
            mime_type: Some(mime_type.into()),
            temp_path: Some(temp_path.into()),
            size: Some(size),
        }
    }

    /// A file part the host could not keep. The temp path is empty, as hosts
    /// report it for failed parts.
    pub fn failed(
        error: UploadErrorCode,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error),
            name: Some(name.into()),
            mime_type: Some(mime_type.into()),
            temp_path: Some(PathBuf::new()),
            size: Some(0),
        }
    }

    pub fn not_submitted() -> Self {
        Self::failed(UploadErrorCode::NoFile, "", "")
    }

    /// Builds a descriptor from a loosely-typed form table entry such as
    /// `{"error": 0, "name": "a.png", "type": "image/png", "tmp_name": "...", "size": 12}`.
    pub fn from_value(value: &Value) -> Self {
        let Some(entry) = value.as_object() else {
            return Self::default();
        };

        Self {
            error: entry
                .get("error")
                .and_then(scalar_i64)
                .map(UploadErrorCode::from_code),
            name: entry.get("name").and_then(scalar_string),
            mime_type: entry.get("type").and_then(scalar_string),
            temp_path: entry
                .get("tmp_name")
                .and_then(scalar_string)
                .map(PathBuf::from),
            size: entry.get("size").and_then(scalar_u64),
        }
    }

    /// The recorded error code. A missing code is never treated as success.
    pub fn error_code(&self) -> UploadErrorCode {
        self.error.unwrap_or(UploadErrorCode::Other(-1))
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

fn scalar_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The uploads of one request, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileTable {
    entries: BTreeMap<String, UploadDescriptor>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &Value) -> Self {
        let entries = value
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .map(|(field, entry)| (field.clone(), UploadDescriptor::from_value(entry)))
                    .collect()
            })
            .unwrap_or_default();

        Self { entries }
    }

    /// Adds or replaces a field's descriptor, returning the replaced one.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        descriptor: UploadDescriptor,
    ) -> Option<UploadDescriptor> {
        self.entries.insert(field.into(), descriptor)
    }

    pub fn get(&self, field: &str) -> Option<&UploadDescriptor> {
        self.entries.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadDescriptor)> {
        self.entries.iter().map(|(field, d)| (field.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
