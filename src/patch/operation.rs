//! Wire types of the partial-update protocol.
//!
//! A patch is an ordered `PatchOperation[]` sent as the body of an HTTP
//! PATCH with content type [`PATCH_CONTENT_TYPE`]. The body is plain JSON;
//! only `replace` is produced by the console editors.

use crate::core::{DeskError, Result, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content type label carried by every patch request.
pub const PATCH_CONTENT_TYPE: &str = "application/json-path+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Replace,
    Add,
    Remove,
    Copy,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl PatchOperation {
    pub fn replace(field: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: FieldPath::new(field).to_pointer(),
            value: value.into(),
            from: None,
        }
    }

    pub fn add(field: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Add,
            ..Self::replace(field, value)
        }
    }

    pub fn remove(field: &str) -> Self {
        Self {
            op: PatchOp::Remove,
            ..Self::replace(field, Value::Null)
        }
    }

    pub fn copy(from: &str, to: &str) -> Self {
        Self {
            op: PatchOp::Copy,
            from: Some(FieldPath::new(from).to_pointer()),
            ..Self::replace(to, Value::Null)
        }
    }
}

/// A single-segment pointer to a top-level entity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    field: String,
}

impl FieldPath {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Parses a `/`-prefixed pointer, honouring the `~0` and `~1` escapes.
    ///
    /// Entity records are flat, so pointers with more than one segment
    /// are rejected.
    pub fn parse(pointer: &str) -> Result<Self> {
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(DeskError::validation(format!(
                "Invalid path '{}': must start with '/'",
                pointer
            )));
        };
        if rest.is_empty() {
            return Err(DeskError::validation("Invalid path '/': field name is empty"));
        }
        if rest.contains('/') {
            return Err(DeskError::validation(format!(
                "Invalid path '{}': nested paths are not supported",
                pointer
            )));
        }
        if has_dangling_tilde(rest) {
            return Err(DeskError::validation(format!(
                "Invalid path '{}': bad escape sequence",
                pointer
            )));
        }

        Ok(Self {
            field: rest.replace("~1", "/").replace("~0", "~"),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn to_pointer(&self) -> String {
        format!("/{}", self.field.replace('~', "~0").replace('/', "~1"))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

fn has_dangling_tilde(segment: &str) -> bool {
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_op_path_value_triple() {
        let op = PatchOperation::replace("tag", "y");
        assert_eq!(
            serde_json::to_string(&op).unwrap(),
            r#"{"op":"replace","path":"/tag","value":"y"}"#
        );
    }

    #[test]
    fn remove_without_value_deserializes_to_null() {
        let op: PatchOperation = serde_json::from_str(r#"{"op":"remove","path":"/x"}"#).unwrap();
        assert_eq!(op.op, PatchOp::Remove);
        assert!(op.value.is_null());
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(serde_json::from_str::<PatchOperation>(r#"{"op":"move","path":"/x"}"#).is_err());
    }

    #[test]
    fn field_path_parse_rules() {
        assert_eq!(FieldPath::parse("/name").unwrap().field(), "name");
        assert_eq!(FieldPath::parse("/a~1b~0c").unwrap().field(), "a/b~c");
        assert!(FieldPath::parse("name").is_err());
        assert!(FieldPath::parse("/").is_err());
        assert!(FieldPath::parse("/dates/start").is_err());
        assert!(FieldPath::parse("/bad~2").is_err());
        assert_eq!(FieldPath::new("a/b").to_pointer(), "/a~1b");
    }
}
