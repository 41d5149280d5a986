//! Framed and compacted JSON-LD graph model.
//!
//! The converter consumes linked-data descriptions that have already been
//! framed (context and prefix resolution done) and compacted (short-form
//! property keys) by an external JSON-LD processor. This module models that
//! predictable shape: a [`Graph`] of top-level [`GraphObject`]s, each a
//! property bag of [`PropertyValue`]s.
//!
//! Property values form a small tagged union — scalar, nested object, or
//! list — with "absent" kept distinct from "present but empty": JSON `null`
//! values are dropped on load, so a property either exists with a concrete
//! value or is not in the bag at all.

use crate::error::{BibmuxError, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;

/// Property keys treated as object identity rather than data.
const ID_KEYS: [&str; 2] = ["id", "@id"];
/// Property keys treated as object type rather than data.
const TYPE_KEYS: [&str; 2] = ["type", "@type"];

/// A framed/compacted linked-data graph: top-level objects in document order.
///
/// Cross-reference lookup is a linear scan of the object list, repeated once
/// per lookup. Graphs here are single bibliographic description sets, so this
/// O(lookups × graph size) cost is a documented scaling limit; an id index
/// could be added without changing observable behavior (first match wins).
#[derive(Debug, Clone, Default)]
pub struct Graph {
    objects: Vec<GraphObject>,
}

/// A top-level or nested object in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphObject {
    id: Option<String>,
    types: Vec<String>,
    properties: IndexMap<String, PropertyValue>,
}

/// A property value: scalar, inline object reference, or list of either.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A literal value (strings, plus numbers and booleans rendered as text).
    Scalar(String),
    /// A nested object, typically an inline reference carrying its own `id`.
    Object(Box<GraphObject>),
    /// A list of values.
    List(Vec<PropertyValue>),
}

impl Graph {
    /// Parse a framed/compacted JSON-LD document.
    ///
    /// Accepts either an object with an `@graph` array (any `@context` is
    /// ignored — framing already resolved it) or a bare array of objects.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::InvalidGraph`] if the JSON does not parse or
    /// does not have the framed shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| BibmuxError::InvalidGraph(format!("not valid JSON: {e}")))?;
        Self::from_json_value(&value)
    }

    /// Read and parse a framed/compacted JSON-LD document from a file.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::Io`] if the file cannot be read, or
    /// [`BibmuxError::InvalidGraph`] if the content is not a framed graph.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Build a graph from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::InvalidGraph`] if the value is not an object
    /// with an `@graph` array or a bare array of objects.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let items = match value {
            Value::Object(map) => map
                .get("@graph")
                .and_then(Value::as_array)
                .ok_or_else(|| BibmuxError::InvalidGraph("missing @graph array".to_string()))?,
            Value::Array(items) => items,
            _ => {
                return Err(BibmuxError::InvalidGraph(
                    "expected a JSON object or array".to_string(),
                ))
            },
        };
        let objects = items
            .iter()
            .map(GraphObject::from_json_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Graph { objects })
    }

    /// Iterate over top-level objects in document order.
    pub fn objects(&self) -> impl Iterator<Item = &GraphObject> {
        self.objects.iter()
    }

    /// Find the first top-level object with the given id (linear scan).
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&GraphObject> {
        self.objects.iter().find(|obj| obj.id() == Some(id))
    }

    /// Number of top-level objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the graph holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl GraphObject {
    /// Build an object from a JSON value, which must be a JSON object.
    ///
    /// `id`/`@id` and `type`/`@type` keys become object identity; all other
    /// keys become properties, in document key order. `null` values are
    /// dropped so absence stays observable.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::InvalidGraph`] on non-object values or
    /// malformed `id`/`type` shapes.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| BibmuxError::InvalidGraph("graph node is not an object".to_string()))?;

        let mut id = None;
        let mut types = Vec::new();
        let mut properties = IndexMap::new();

        for (key, val) in map {
            if ID_KEYS.contains(&key.as_str()) {
                id = Some(val.as_str().map(str::to_string).ok_or_else(|| {
                    BibmuxError::InvalidGraph(format!("non-string id: {val}"))
                })?);
            } else if TYPE_KEYS.contains(&key.as_str()) {
                types = parse_types(val)?;
            } else if !val.is_null() {
                properties.insert(key.clone(), PropertyValue::from_json_value(val)?);
            }
        }

        Ok(GraphObject {
            id,
            types,
            properties,
        })
    }

    /// The object's id, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// All type values on the object.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// True if the object carries the given type (scalar or any list element).
    #[must_use]
    pub fn has_type(&self, rdf_type: &str) -> bool {
        self.types.iter().any(|t| t == rdf_type)
    }

    /// Get a property value by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Get a property's scalar value, if the property is a scalar.
    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(PropertyValue::as_scalar)
    }

    /// Get a property's nested object, if the property is an object.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<&GraphObject> {
        self.property(key).and_then(PropertyValue::as_object)
    }

    /// Get the id of the object referenced under a property.
    ///
    /// Returns `None` when the property is absent, not an object, or an
    /// inline object without an id.
    #[must_use]
    pub fn reference_id(&self, key: &str) -> Option<&str> {
        self.object(key).and_then(GraphObject::id)
    }
}

impl PropertyValue {
    /// Build a property value from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::InvalidGraph`] on `null` (callers drop nulls
    /// before reaching here) or nested invalid objects.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(PropertyValue::Scalar(s.clone())),
            Value::Number(n) => Ok(PropertyValue::Scalar(n.to_string())),
            Value::Bool(b) => Ok(PropertyValue::Scalar(b.to_string())),
            Value::Object(_) => Ok(PropertyValue::Object(Box::new(
                GraphObject::from_json_value(value)?,
            ))),
            Value::Array(items) => Ok(PropertyValue::List(
                items
                    .iter()
                    .map(PropertyValue::from_json_value)
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Null => Err(BibmuxError::InvalidGraph(
                "null property value".to_string(),
            )),
        }
    }

    /// The scalar text, if this value is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The nested object, if this value is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&GraphObject> {
        match self {
            PropertyValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The list elements, if this value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Parse a `type` value: a single string or a list of strings.
fn parse_types(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    BibmuxError::InvalidGraph(format!("non-string type value: {item}"))
                })
            })
            .collect(),
        _ => Err(BibmuxError::InvalidGraph(format!(
            "type value must be a string or list of strings, got {value}"
        ))),
    }
}
