use std::path::PathBuf;

use thiserror::Error;

/// A schema node could not be turned into a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaResolutionError {
    /// `$ref` points at a schema missing from the registry.
    #[error("{path}: unresolved reference `{canonical}`")]
    UnresolvedRef { canonical: String, path: String },

    /// `type: array` without an `items` schema.
    #[error("{path}: array schema has no `items`")]
    MissingItems { path: String },

    /// `type` names something outside the JSON Schema primitive set.
    #[error("{path}: unsupported type `{type_name}`")]
    UnsupportedType { type_name: String, path: String },

    /// Named schemas that are nothing but `$ref`s to each other.
    #[error("{path}: `{class}` is an alias of itself")]
    AliasCycle { class: String, path: String },
}

/// Two structurally different classes claim the same fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("class `{name}` is defined differently by {first_source} and {second_source}")]
pub struct NameCollisionError {
    pub name: String,
    pub first_source: String,
    pub second_source: String,
}

/// A keyword combination the engine does not turn into a class model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedSchemaConstructError {
    /// `oneOf`/`anyOf`/`allOf` (or nothing at all) where a type is expected.
    #[error("{path}: cannot derive a type from `{keyword}`")]
    Composition { keyword: String, path: String },

    /// `default` literal does not fit the field's resolved type.
    #[error("{path}: default `{value}` is not a valid {expected}")]
    DefaultMismatch {
        value: String,
        expected: String,
        path: String,
    },

    /// `pattern` is not an ECMA-262 regular expression.
    #[error("{path}: invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
        path: String,
    },
}

/// Failure of one root schema during generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Resolution(#[from] SchemaResolutionError),

    #[error(transparent)]
    NameCollision(#[from] NameCollisionError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedSchemaConstructError),
}

impl GenerateError {
    /// Short error-kind label used in user-facing reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "SchemaResolutionError",
            Self::NameCollision(_) => "NameCollisionError",
            Self::Unsupported(_) => "UnsupportedSchemaConstructError",
        }
    }
}

/// Error reading or recognising an input document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither a CRD nor an OpenAPI/Swagger document.
    #[error("document {index} is neither a CustomResourceDefinition nor an OpenAPI document")]
    Unrecognized { index: usize },

    /// A CRD without the fields needed to name and place its classes.
    #[error("CustomResourceDefinition is missing `{field}`")]
    MalformedCrd { field: &'static str },
}

/// Error writing emitted sources.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot render {}", path.display())]
    Render {
        path: PathBuf,
        source: std::fmt::Error,
    },
}
