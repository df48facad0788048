//! # Document Paths
//!
//! Edits address the document with dot-separated paths such as
//! `$.annotations.0.bounding_box.x`. The first segment is a root marker and
//! is discarded; the remaining segments are mapping keys or, inside lists,
//! non-negative integer indices.
//!
//! Writes may name keys that do not exist yet. Missing intermediate
//! containers are created on demand, and the kind of each new container is
//! inferred from the segment that follows it: a numeric segment means a
//! list, anything else a mapping.

use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Conventional root marker
pub const ROOT: &str = "$";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Path '{0}' does not address anything below the root")]
    Empty(String),

    #[error("Path '{path}' has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },

    #[error("Cannot resolve '{segment}' in '{path}': value is a {kind}, not a container")]
    NotAContainer {
        path: String,
        segment: String,
        kind: &'static str,
    },

    #[error("Segment '{segment}' in '{path}' is not a list index")]
    InvalidIndex { path: String, segment: String },

    #[error("Index {index} in '{path}' is out of range for a list of length {len}")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

/// Parsed path, root marker stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

/// Kind of container created for a missing intermediate key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Map,
}

impl ContainerKind {
    /// Infer the container that must hold `next_segment`
    pub fn for_segment(next_segment: &str) -> Self {
        if is_index(next_segment) {
            ContainerKind::List
        } else {
            ContainerKind::Map
        }
    }

    pub fn empty(self) -> Value {
        match self {
            ContainerKind::List => Value::List(Vec::new()),
            ContainerKind::Map => Value::Map(Map::new()),
        }
    }
}

/// Whether a segment is a non-negative integer literal
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

impl Path {
    /// Parse a path; the first segment is the root marker
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut parts = raw.split('.');
        // Root marker, whatever its spelling
        parts.next();

        let segments: Vec<String> = parts.map(str::to_string).collect();
        if segments.is_empty() {
            return Err(PathError::Empty(raw.to_string()));
        }
        if let Some(position) = segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment {
                path: raw.to_string(),
                position: position + 1,
            });
        }

        Ok(Self { segments })
    }

    /// Build a path from segments below the root
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let path = Self { segments };
        if path.segments.is_empty() {
            return Err(PathError::Empty(path.to_string()));
        }
        if let Some(position) = path.segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment {
                path: path.to_string(),
                position: position + 1,
            });
        }
        Ok(path)
    }

    /// `$.annotations.<index>` followed by `fields`
    pub fn annotation(index: usize, fields: &[&str]) -> Path {
        let mut segments = vec!["annotations".to_string(), index.to_string()];
        segments.extend(fields.iter().map(|field| field.to_string()));
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final segment (the key being written)
    pub fn last(&self) -> &str {
        // Parsing guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Path of the containing value, `None` when the parent is the root
    pub fn parent(&self) -> Option<Path> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Sibling path with the final segment replaced
    pub fn with_last(&self, segment: &str) -> Path {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last = segment.to_string();
        }
        Self { segments }
    }

    /// Child path
    pub fn join(&self, segment: impl fmt::Display) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    pub(crate) fn index_in(&self, segment: &str, len: usize) -> Result<usize, PathError> {
        if !is_index(segment) {
            return Err(PathError::InvalidIndex {
                path: self.to_string(),
                segment: segment.to_string(),
            });
        }
        // Digit strings that overflow usize are out of range for any list
        segment
            .parse::<usize>()
            .map_err(|_| PathError::IndexOutOfRange {
                path: self.to_string(),
                index: usize::MAX,
                len,
            })
    }

    pub(crate) fn not_a_container(&self, segment: &str, value: &Value) -> PathError {
        PathError::NotAContainer {
            path: self.to_string(),
            segment: segment.to_string(),
            kind: value.kind(),
        }
    }

    pub(crate) fn out_of_range(&self, index: usize, len: usize) -> PathError {
        PathError::IndexOutOfRange {
            path: self.to_string(),
            index,
            len,
        }
    }

    /// Read the value at this path
    ///
    /// Missing keys resolve to `Ok(None)`; walking through a scalar is an
    /// error.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<Option<&'a Value>, PathError> {
        let mut scope = root;
        for segment in &self.segments {
            let next = match scope {
                Value::Map(map) => map.get(segment),
                Value::List(items) => {
                    let index = self.index_in(segment, items.len())?;
                    items.get(index)
                }
                other => return Err(self.not_a_container(segment, other)),
            };
            match next {
                Some(value) => scope = value,
                None => return Ok(None),
            }
        }
        Ok(Some(scope))
    }

    /// Dry run of a write: reports every error a write would hit, without
    /// touching the document.
    pub fn check_writable(&self, root: &Value) -> Result<(), PathError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(PathError::Empty(self.to_string()));
        };

        let mut probe = Probe::Existing(root);
        for (i, segment) in parents.iter().enumerate() {
            let next = &self.segments[i + 1];
            probe = match probe {
                Probe::Existing(Value::Map(map)) => match map.get(segment) {
                    Some(value) => Probe::Existing(value),
                    None => Probe::Created(ContainerKind::for_segment(next)),
                },
                Probe::Existing(Value::List(items)) => {
                    let index = self.index_in(segment, items.len())?;
                    match index.cmp(&items.len()) {
                        std::cmp::Ordering::Less => Probe::Existing(&items[index]),
                        std::cmp::Ordering::Equal => {
                            Probe::Created(ContainerKind::for_segment(next))
                        }
                        std::cmp::Ordering::Greater => {
                            return Err(self.out_of_range(index, items.len()))
                        }
                    }
                }
                Probe::Existing(other) => return Err(self.not_a_container(segment, other)),
                Probe::Created(ContainerKind::Map) => {
                    Probe::Created(ContainerKind::for_segment(next))
                }
                Probe::Created(ContainerKind::List) => {
                    let index = self.index_in(segment, 0)?;
                    if index != 0 {
                        return Err(self.out_of_range(index, 0));
                    }
                    Probe::Created(ContainerKind::for_segment(next))
                }
            };
        }

        match probe {
            Probe::Existing(Value::Map(_)) | Probe::Created(ContainerKind::Map) => Ok(()),
            Probe::Existing(Value::List(items)) => {
                let index = self.index_in(last, items.len())?;
                if index > items.len() {
                    return Err(self.out_of_range(index, items.len()));
                }
                Ok(())
            }
            Probe::Created(ContainerKind::List) => {
                let index = self.index_in(last, 0)?;
                if index != 0 {
                    return Err(self.out_of_range(index, 0));
                }
                Ok(())
            }
            Probe::Existing(other) => Err(self.not_a_container(last, other)),
        }
    }
}

/// Position reached during a dry run
enum Probe<'a> {
    Existing(&'a Value),
    Created(ContainerKind),
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT)?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Path::parse(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_strips_root() {
        let path = Path::parse("$.annotations.0.name").unwrap();
        assert_eq!(path.segments(), &["annotations", "0", "name"]);
        assert_eq!(path.to_string(), "$.annotations.0.name");
        assert_eq!(path.last(), "name");
    }

    #[test]
    fn test_parse_rejects_root_only_and_empty_segments() {
        assert!(matches!(Path::parse("$"), Err(PathError::Empty(_))));
        assert!(matches!(
            Path::parse("$.a..b"),
            Err(PathError::EmptySegment { position: 2, .. })
        ));
    }

    #[test]
    fn test_annotation_paths() {
        assert_eq!(Path::annotation(2, &[]).to_string(), "$.annotations.2");
        assert_eq!(
            Path::annotation(0, &["bounding_box", "x"]).to_string(),
            "$.annotations.0.bounding_box.x"
        );
    }

    #[test]
    fn test_container_kind_inference() {
        assert_eq!(ContainerKind::for_segment("0"), ContainerKind::List);
        assert_eq!(ContainerKind::for_segment("12"), ContainerKind::List);
        assert_eq!(ContainerKind::for_segment("-1"), ContainerKind::Map);
        assert_eq!(ContainerKind::for_segment("1.5"), ContainerKind::Map);
        assert_eq!(ContainerKind::for_segment("name"), ContainerKind::Map);
    }

    #[test]
    fn test_resolve() {
        let root = doc(r#"{"annotations": [{"id": 4}]}"#);
        let id = Path::parse("$.annotations.0.id").unwrap().resolve(&root).unwrap();
        assert_eq!(id, Some(&Value::Int(4)));

        let missing = Path::parse("$.annotations.3.id").unwrap().resolve(&root).unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_resolve_through_scalar_fails() {
        let root = doc(r#"{"name": "frame"}"#);
        let err = Path::parse("$.name.first").unwrap().resolve(&root).unwrap_err();
        assert!(matches!(err, PathError::NotAContainer { kind: "string", .. }));
    }

    #[test]
    fn test_check_writable_accepts_new_branches() {
        let root = doc(r#"{"annotations": []}"#);
        assert!(Path::parse("$.annotations.0").unwrap().check_writable(&root).is_ok());
        assert!(Path::parse("$.attributes.tags.0").unwrap().check_writable(&root).is_ok());
        assert!(Path::parse("$.a.0.b.0.c").unwrap().check_writable(&root).is_ok());
    }

    #[test]
    fn test_check_writable_rejects_gaps_and_scalars() {
        let root = doc(r#"{"keywords": ["a"], "name": "x"}"#);
        assert!(matches!(
            Path::parse("$.keywords.5").unwrap().check_writable(&root),
            Err(PathError::IndexOutOfRange { index: 5, len: 1, .. })
        ));
        assert!(matches!(
            Path::parse("$.keywords.first").unwrap().check_writable(&root),
            Err(PathError::InvalidIndex { .. })
        ));
        assert!(matches!(
            Path::parse("$.name.first").unwrap().check_writable(&root),
            Err(PathError::NotAContainer { .. })
        ));
        assert!(matches!(
            Path::parse("$.fresh.3.x").unwrap().check_writable(&root),
            Err(PathError::IndexOutOfRange { index: 3, len: 0, .. })
        ));
    }

    #[test]
    fn test_path_serde_roundtrip_as_string() {
        let path = Path::parse("$.frame.width").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""$.frame.width""#);
    }
}
