//! The root application entity and its dynamic nested shape.
//!
//! Outside of `application_id` and `application_status`, the stored record
//! has no fixed schema: the `documents` map and the nested sections vary per
//! applicant. Everything irregular lives in `fields`, with typed accessors
//! for the walks the resolver and consolidator need.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::status::ApplicationStatus;

/// Identifier wrapper for submitted applications. Never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored application document.
///
/// `fields` is flattened so the wire shape matches the stored row: the
/// `documents` locator map, extracted `*_content` fields, and nested
/// sections all sit beside `application_id` and `application_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    #[serde(rename = "application_status", default)]
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ApplicationRecord {
    pub fn new(application_id: ApplicationId) -> Self {
        Self {
            application_id,
            status: ApplicationStatus::New,
            fields: Map::new(),
        }
    }

    /// The flat document-type -> locator map, when present.
    pub fn documents(&self) -> Option<&Map<String, Value>> {
        self.fields.get("documents").and_then(Value::as_object)
    }

    /// Read-only walk to an arbitrary nested value.
    pub fn value_at(&self, path: &[&str]) -> Option<&Value> {
        let mut current = self.fields.get(*path.first()?)?;
        for segment in &path[1..] {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// Top-level write used for `main` document content.
    pub fn set_field(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Walk to an object at `path`, creating empty intermediate objects on
    /// demand. Returns `None` if an existing value along the path is not an
    /// object (the record shape is never coerced).
    pub fn object_at_mut(&mut self, path: &[&str]) -> Option<&mut Map<String, Value>> {
        let mut current = &mut self.fields;
        for segment in path {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry.as_object_mut()?;
        }
        Some(current)
    }

    /// Locate one element of a list section by the index captured at
    /// resolution time. Never creates containers or elements; a missing
    /// list or out-of-range index yields `None`.
    pub fn list_element_mut(
        &mut self,
        path: &[&str],
        index: usize,
    ) -> Option<&mut Map<String, Value>> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get_mut(*first)?;
        for segment in rest {
            current = current.as_object_mut()?.get_mut(*segment)?;
        }
        current.as_array_mut()?.get_mut(index)?.as_object_mut()
    }
}
