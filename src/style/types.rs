//! declarative style document model
//!
//! only the keys this crate reads or writes are typed; everything else on a
//! document, source or layer is carried through `extra` untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// style format version emitted for every document
pub const STYLE_VERSION: u8 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sources: BTreeMap<String, Source>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_version() -> u8 {
    STYLE_VERSION
}

impl StyleDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: STYLE_VERSION,
            name: name.into(),
            sources: BTreeMap::new(),
            layers: Vec::new(),
            extra: Map::new(),
        }
    }

    /// add a vector source pointing at a tile archive
    pub fn with_vector_source(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.sources.insert(name.into(), Source::vector(url));
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type", default = "default_source_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_source_type() -> String {
    "vector".to_string()
}

impl Source {
    pub fn vector(url: impl Into<String>) -> Self {
        Self {
            kind: default_source_type(),
            url: Some(url.into()),
            minzoom: None,
            maxzoom: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "source-layer", default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, JsonValue>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Layer {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            source: None,
            source_layer: None,
            filter: None,
            paint: Map::new(),
            metadata: None,
            extra: Map::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>, source_layer: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self.source_layer = Some(source_layer.into());
        self
    }

    pub fn with_filter(mut self, filter: Option<JsonValue>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_paint(mut self, key: &str, value: JsonValue) -> Self {
        self.paint.insert(key.to_string(), value);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: JsonValue) -> Self {
        self.set_metadata(key, value);
        self
    }

    /// set one metadata key, creating the container if needed
    pub fn set_metadata(&mut self, key: &str, value: JsonValue) {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
    }

    pub fn metadata_value(&self, key: &str) -> Option<&JsonValue> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    /// convenience accessor for the injected label
    pub fn label(&self) -> Option<&str> {
        self.metadata_value("label").and_then(JsonValue::as_str)
    }
}

/// one entry of the legend list attached to compiled layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}
