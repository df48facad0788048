//! Typed views over annotation documents.
//!
//! The document itself stays weakly typed (see [`crate::value`]); these
//! structs describe the persisted shape and are used to build new content
//! and to read well-formed documents conveniently.

use crate::value::{Map, Value};
use serde::{Deserialize, Serialize, Serializer};

/// Root record for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    pub frame: FrameRef,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    /// Top-level keys added from the properties panel
    #[serde(flatten)]
    pub extra: Map,
}

impl Metadata {
    pub fn new(name: impl Into<String>, frame: FrameRef) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
            frame,
            annotations: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Image the annotations were drawn on
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameRef {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(flatten)]
    pub extra: Map,
}

impl FrameRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// One labeled region of a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub component_type: String,
    pub bounding_box: BoundingBox,
    pub color: String,

    #[serde(rename = "isSelected")]
    pub is_selected: bool,

    pub hidden: bool,

    #[serde(default)]
    pub attributes: Map,

    #[serde(default)]
    pub children: Vec<Value>,
}

impl Annotation {
    /// Fresh annotation as created from the annotations panel
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: "name".to_string(),
            parent_id: None,
            component_type: "unset".to_string(),
            bounding_box: BoundingBox::default(),
            color: "#FF0000".to_string(),
            is_selected: false,
            hidden: false,
            attributes: Map::new(),
            children: Vec::new(),
        }
    }

    /// Panel title, e.g. `{3} [1] car`
    pub fn title(&self) -> String {
        annotation_title(self.id, self.parent_id, &self.name)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::Int(self.id));
        map.insert("name".into(), self.name.clone().into());
        map.insert(
            "parent_id".into(),
            self.parent_id.map(Value::Int).unwrap_or(Value::Null),
        );
        map.insert("component_type".into(), self.component_type.clone().into());
        map.insert("bounding_box".into(), self.bounding_box.into());
        map.insert("color".into(), self.color.clone().into());
        map.insert("isSelected".into(), Value::Bool(self.is_selected));
        map.insert("hidden".into(), Value::Bool(self.hidden));
        map.insert("attributes".into(), Value::Map(self.attributes.clone()));
        map.insert("children".into(), Value::List(self.children.clone()));
        Value::Map(map)
    }
}

/// Title for an annotation as shown in the annotations panel.
///
/// A missing or zero parent is omitted and an empty name reads `Annotation`.
pub fn annotation_title(id: i64, parent_id: Option<i64>, name: &str) -> String {
    let name = if name.is_empty() { "Annotation" } else { name };
    match parent_id {
        Some(parent) if parent != 0 => format!("{{{}}} [{}] {}", id, parent, name),
        _ => format!("{{{}}} {}", id, name),
    }
}

/// Axis-aligned box in unscaled frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(serialize_with = "pixel")]
    pub x: f64,
    #[serde(serialize_with = "pixel")]
    pub y: f64,
    #[serde(serialize_with = "pixel")]
    pub width: f64,
    #[serde(serialize_with = "pixel")]
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Read a box out of a document value, if it has all four coordinates
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            x: value.get("x")?.as_f64()?,
            y: value.get("y")?.as_f64()?,
            width: value.get("width")?.as_f64()?,
            height: value.get("height")?.as_f64()?,
        })
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(200.0, 200.0, 200.0, 200.0)
    }
}

impl From<BoundingBox> for Value {
    fn from(b: BoundingBox) -> Self {
        let mut map = Map::new();
        map.insert("x".into(), Value::number(b.x));
        map.insert("y".into(), Value::number(b.y));
        map.insert("width".into(), Value::number(b.width));
        map.insert("height".into(), Value::number(b.height));
        Value::Map(map)
    }
}

/// Whole pixel values are written as JSON integers
fn pixel<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match Value::number(*n) {
        Value::Int(i) => serializer.serialize_i64(i),
        _ => serializer.serialize_f64(*n),
    }
}
