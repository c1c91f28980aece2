use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

use super::{ConfigEntityKind, Value};

pub type Attributes = BTreeMap<String, Value>;

/// One configuration entity as the console sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRecord {
    pub kind: ConfigEntityKind,
    pub key: String,
    pub is_active: bool,
    pub attributes: Attributes,
    /// Server fields no schema declares; carried through untouched
    pub extra: Map<String, Json>,
}

impl ConfigRecord {
    pub fn new(kind: ConfigEntityKind, key: impl Into<String>, is_active: bool) -> Self {
        Self {
            kind,
            key: key.into(),
            is_active,
            attributes: Attributes::new(),
            extra: Map::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Wire payload: attributes, unmodeled server fields, and `isActive`
    pub fn to_json(&self) -> Json {
        let mut obj = self.extra.clone();
        for (name, value) in &self.attributes {
            obj.insert(name.clone(), value.to_json());
        }
        obj.insert("isActive".to_string(), Json::Bool(self.is_active));
        Json::Object(obj)
    }

    /// Same key, same activity flag, same attributes
    pub fn same_content(&self, other: &ConfigRecord) -> bool {
        self.kind == other.kind
            && self.key == other.key
            && self.is_active == other.is_active
            && self.attributes == other.attributes
    }
}

/// Changes requested by an update: attributes to overwrite and optionally the active flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub attributes: Attributes,
    pub is_active: Option<bool>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn toggle_of(record: &ConfigRecord) -> Self {
        Self::new().active(!record.is_active)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.is_active.is_none()
    }
}
