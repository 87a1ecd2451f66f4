//! Maps JSON Schema `type` + `format` pairs to target scalar kinds.

use std::fmt;

/// Target scalar type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Date,
    DateTime,
    /// Base64-encoded bytes (`format: byte`).
    Byte,
    Uuid,
    /// Kubernetes `x-kubernetes-int-or-string`.
    IntOrString,
    /// Untyped placeholder for values the schema does not constrain.
    Any,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            Self::Boolean => "boolean",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Byte => "byte",
            Self::Uuid => "uuid",
            Self::IntOrString => "int-or-string",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// Returns true if the format indicates a UUID (uuid, uuid1..uuid8, case-insensitive).
fn is_uuid_format(format: &str) -> bool {
    matches!(
        format.to_lowercase().as_str(),
        "uuid" | "uuid1" | "uuid2" | "uuid3" | "uuid4" | "uuid5" | "uuid6" | "uuid7" | "uuid8"
    )
}

/// Maps a scalar `type` and optional `format` to its primitive kind.
///
/// Returns `None` when `type_name` is not one of `string`, `integer`, `number`
/// or `boolean`. Unknown formats fall back to the plain kind for the type.
#[must_use]
pub fn map_primitive(type_name: &str, format: Option<&str>) -> Option<PrimitiveKind> {
    let format: &str = format.unwrap_or("");
    let kind: PrimitiveKind = match type_name {
        "boolean" => PrimitiveKind::Boolean,
        "integer" => {
            if format == "int32" {
                PrimitiveKind::Int32
            } else {
                PrimitiveKind::Int64
            }
        }
        "number" => {
            if format == "float" {
                PrimitiveKind::Float
            } else {
                PrimitiveKind::Double
            }
        }
        "string" => match format {
            "date" => PrimitiveKind::Date,
            "date-time" => PrimitiveKind::DateTime,
            "byte" => PrimitiveKind::Byte,
            f if is_uuid_format(f) => PrimitiveKind::Uuid,
            _ => PrimitiveKind::String,
        },
        _ => return None,
    };
    Some(kind)
}
