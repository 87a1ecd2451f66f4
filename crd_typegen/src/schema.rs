use indexmap::IndexMap;
use serde::Deserialize;

/// Wraps the JSON Schema `default` keyword to preserve `null`.
/// Serde deserializes `Option<Value>` with JSON null as `None`; we need to
/// distinguish absent key from `"default": null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DefaultKeyword {
    /// Key "default" was absent from the schema.
    #[default]
    Absent,
    /// Key "default" was present; the value may be `Value::Null`.
    Present(serde_json::Value),
}

impl DefaultKeyword {
    #[must_use]
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Absent => None,
            Self::Present(value) => Some(value),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultKeyword {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v: serde_json::Value = Deserialize::deserialize(deserializer)?;
        Ok(DefaultKeyword::Present(v))
    }
}

/// `additionalProperties`: either a flag or a schema for the map values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// A JSON Schema node as found in CRD `openAPIV3Schema` blocks and OpenAPI
/// component schemas.
///
/// Only the keywords Kubernetes schemas actually use are modeled; extra keys are
/// ignored. `properties` keeps declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchemaNode {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub r#type: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub properties: IndexMap<String, SchemaNode>,

    #[serde(default)]
    pub required: Vec<String>,

    #[serde(default)]
    pub items: Option<Box<SchemaNode>>,

    #[serde(default, rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default)]
    pub r#enum: Vec<serde_json::Value>,

    #[serde(default, rename = "$ref")]
    pub reference: Option<String>,

    #[serde(default)]
    pub default: DefaultKeyword,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default, rename = "oneOf")]
    pub one_of: Vec<SchemaNode>,

    #[serde(default, rename = "anyOf")]
    pub any_of: Vec<SchemaNode>,

    #[serde(default, rename = "allOf")]
    pub all_of: Vec<SchemaNode>,

    #[serde(default, rename = "x-kubernetes-int-or-string")]
    pub int_or_string: bool,

    #[serde(default, rename = "x-kubernetes-preserve-unknown-fields")]
    pub preserve_unknown_fields: bool,
}

/// Classification of a schema node. The resolver dispatches on this tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaShape<'a> {
    Ref(&'a str),
    Enum(&'a [serde_json::Value]),
    IntOrString,
    Array(Option<&'a SchemaNode>),
    /// Object with declared properties; the optional schema types extra keys.
    Object(Option<&'a SchemaNode>),
    /// Object with no declared properties but an explicit `additionalProperties: false`.
    Closed,
    /// Object without declared properties; `None` means untyped values.
    Map(Option<&'a SchemaNode>),
    Scalar(&'a str, Option<&'a str>),
    /// Only composition keywords; names the first one present.
    Composition(&'static str),
    Untyped,
}

impl SchemaNode {
    /// Classifies the node; the first matching rule wins.
    #[must_use]
    pub fn classify(&self) -> SchemaShape<'_> {
        if let Some(reference) = self.reference.as_deref() {
            return SchemaShape::Ref(reference);
        }
        if !self.r#enum.is_empty() {
            return SchemaShape::Enum(&self.r#enum);
        }
        if self.int_or_string {
            return SchemaShape::IntOrString;
        }

        let inferred: Option<&str> = match self.r#type.as_deref() {
            Some(t) => Some(t),
            None if !self.properties.is_empty() => Some("object"),
            None if self.items.is_some() => Some("array"),
            None => None,
        };

        match inferred {
            Some("array") => SchemaShape::Array(self.items.as_deref()),
            Some("object") => {
                let extra: Option<&SchemaNode> = match &self.additional_properties {
                    Some(AdditionalProperties::Schema(schema)) => Some(schema.as_ref()),
                    _ => None,
                };
                if !self.properties.is_empty() {
                    SchemaShape::Object(extra)
                } else if self.additional_properties == Some(AdditionalProperties::Allowed(false))
                {
                    SchemaShape::Closed
                } else {
                    SchemaShape::Map(extra)
                }
            }
            Some(t) => SchemaShape::Scalar(t, self.format.as_deref()),
            None => self.composition_keyword().map_or(
                if self.preserve_unknown_fields {
                    SchemaShape::Map(None)
                } else {
                    SchemaShape::Untyped
                },
                SchemaShape::Composition,
            ),
        }
    }

    fn composition_keyword(&self) -> Option<&'static str> {
        if !self.one_of.is_empty() {
            Some("oneOf")
        } else if !self.any_of.is_empty() {
            Some("anyOf")
        } else if !self.all_of.is_empty() {
            Some("allOf")
        } else {
            None
        }
    }

    /// Trimmed description, `None` when empty or whitespace.
    #[must_use]
    pub fn normalized_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string)
    }

    /// Trimmed title, `None` when empty or whitespace.
    #[must_use]
    pub fn usable_title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}
