//! Class model assembly for one root schema.

use std::sync::Arc;

use crate::error::{GenerateError, UnsupportedSchemaConstructError};
use crate::json_pointer;
use crate::model::{
    ClassDefinition, ClassKind, EnumConstant, FieldDefinition, QualifiedName, TypeReference,
};
use crate::naming::{NameKind, enum_literal_text, sanitize};
use crate::primitive::PrimitiveKind;
use crate::registry::{SchemaRegistry, ref_class_location};
use crate::resolver::{ResolveContext, Resolver};
use crate::schema::SchemaNode;
use crate::settings::{BuildConfig, GenerateSettings};
use crate::trace::{Decision, Trace};

/// Root class name when neither a title nor a configured root name is usable.
const FALLBACK_ROOT_NAME: &str = "Root";

/// One root schema plus everything needed to build it.
#[derive(Debug, Clone)]
pub struct RootSchema {
    /// Shown in reports, e.g. `crds/foo.yaml#v1`.
    pub label: String,
    pub schema: SchemaNode,
    pub config: BuildConfig,
    pub registry: Arc<SchemaRegistry>,
    /// Canonical pointer of the root when it is itself a named schema. Such a
    /// root is named like a `$ref` target: from the pointer, without title,
    /// prefix or suffix.
    pub source: Option<String>,
}

impl RootSchema {
    #[must_use]
    pub fn new(label: impl Into<String>, schema: SchemaNode, config: BuildConfig) -> Self {
        Self {
            label: label.into(),
            schema,
            config,
            registry: Arc::new(SchemaRegistry::new()),
            source: None,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Classes produced from one root.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub root: ClassDefinition,
    /// Named classes for `$ref` targets reached from the root.
    pub referenced: Vec<ClassDefinition>,
}

/// Builds the class model of `schema`.
///
/// # Errors
///
/// Returns the first `GenerateError` met while resolving the schema.
pub fn build(
    schema: &SchemaNode,
    config: &BuildConfig,
    registry: &SchemaRegistry,
    settings: &GenerateSettings,
    trace: &dyn Trace,
) -> Result<BuildOutput, GenerateError> {
    build_at(schema, json_pointer::ROOT, config, registry, settings, trace)
}

/// Builds a [`RootSchema`], using its source pointer as its identity.
///
/// # Errors
///
/// Returns the first `GenerateError` met while resolving the schema.
pub fn build_root(
    root: &RootSchema,
    settings: &GenerateSettings,
    trace: &dyn Trace,
) -> Result<BuildOutput, GenerateError> {
    let identity: &str = root.source.as_deref().unwrap_or(json_pointer::ROOT);
    build_at(
        &root.schema,
        identity,
        &root.config,
        &root.registry,
        settings,
        trace,
    )
}

fn build_at(
    schema: &SchemaNode,
    identity: &str,
    config: &BuildConfig,
    registry: &SchemaRegistry,
    settings: &GenerateSettings,
    trace: &dyn Trace,
) -> Result<BuildOutput, GenerateError> {
    let mut resolver = Resolver::new(registry, settings, trace, config.package.as_str());
    let (package, decorated): (String, String) = if identity == json_pointer::ROOT {
        (config.package.clone(), root_class_candidate(schema, config))
    } else {
        // Named schemas keep their registry name so `$ref`s from other roots
        // land on the same class.
        ref_class_location(identity, &config.package)
    };
    let simple: String = resolver.names.allocate(
        NameKind::Class,
        &decorated,
        &json_pointer::segments(identity),
        &package,
    );
    let name = QualifiedName::new(package, simple);

    let root: ClassDefinition = resolver.named_class(schema, name, identity)?;
    Ok(BuildOutput {
        root,
        referenced: resolver.into_referenced(),
    })
}

/// `prefix + (title | root name | "Root") + suffix`.
fn root_class_candidate(schema: &SchemaNode, config: &BuildConfig) -> String {
    let candidate: &str = schema
        .usable_title()
        .or_else(|| Some(config.root_name.trim()).filter(|n| !n.is_empty()))
        .unwrap_or(FALLBACK_ROOT_NAME);
    format!(
        "{}{}{}",
        config.class_name_prefix,
        sanitize(NameKind::Class, candidate),
        config.class_name_suffix
    )
}

impl Resolver<'_> {
    /// One field per property in declaration order; inline object and enum
    /// properties become nested classes in the class's own package.
    pub(crate) fn object_class(
        &mut self,
        node: &SchemaNode,
        name: QualifiedName,
        extra: Option<&SchemaNode>,
        path: &str,
    ) -> Result<ClassDefinition, GenerateError> {
        let nested_package: String = name.nested_package();
        let scope: String = name.to_string();
        let properties_path: String = json_pointer::format(path, "properties");
        let mut fields: Vec<FieldDefinition> = Vec::with_capacity(node.properties.len());
        let mut nested: Vec<ClassDefinition> = Vec::new();

        for (key, property) in &node.properties {
            let property_path: String = json_pointer::format(&properties_path, key);
            let field_name: String =
                self.names
                    .allocate(NameKind::Field, key, std::slice::from_ref(key), &scope);
            let ctx = ResolveContext {
                package: &nested_package,
                path: &property_path,
                name_hint: key,
            };
            let (type_ref, class): (TypeReference, Option<ClassDefinition>) =
                self.resolve(property, &ctx)?.into_parts();
            nested.extend(class);

            let required: bool = node.required.iter().any(|r| r == key);
            let default: Option<serde_json::Value> =
                self.field_default(property, &type_ref, required, &property_path)?;
            fields.push(FieldDefinition {
                name: field_name,
                json_key: key.clone(),
                type_ref,
                required,
                nullable: property.nullable,
                default,
                description: property.normalized_description(),
                source_path: property_path,
            });
        }

        let additional_properties: Option<TypeReference> = match extra {
            Some(values) => {
                let values_path: String = json_pointer::format(path, "additionalProperties");
                let hint: String = format!("{}Value", name.name);
                let ctx = ResolveContext {
                    package: &nested_package,
                    path: &values_path,
                    name_hint: &hint,
                };
                let (type_ref, class): (TypeReference, Option<ClassDefinition>) =
                    self.resolve(values, &ctx)?.into_parts();
                nested.extend(class);
                Some(type_ref)
            }
            None => None,
        };

        self.note(
            path,
            &Decision::Object {
                class: name.clone(),
                fields: fields.len(),
            },
        );
        Ok(ClassDefinition {
            name,
            kind: ClassKind::Object {
                fields,
                additional_properties,
            },
            nested,
            description: node.normalized_description(),
            source_path: path.to_string(),
        })
    }

    /// One constant per distinct literal, in source order.
    pub(crate) fn enum_class(
        &mut self,
        node: &SchemaNode,
        values: &[serde_json::Value],
        name: QualifiedName,
        path: &str,
    ) -> ClassDefinition {
        let scope: String = name.to_string();
        let mut constants: Vec<EnumConstant> = Vec::with_capacity(values.len());
        for value in values {
            if constants.iter().any(|c| &c.value == value) {
                continue;
            }
            let constant_name: String = self.names.allocate(
                NameKind::EnumConstant,
                &enum_literal_text(value),
                &[value.to_string()],
                &scope,
            );
            constants.push(EnumConstant {
                name: constant_name,
                value: value.clone(),
            });
        }

        self.enum_values.insert(
            name.clone(),
            constants.iter().map(|c| c.value.clone()).collect(),
        );
        self.note(
            path,
            &Decision::Enum {
                class: name.clone(),
                constants: constants.len(),
            },
        );
        ClassDefinition {
            name,
            kind: ClassKind::Enum { constants },
            nested: Vec::new(),
            description: node.normalized_description(),
            source_path: path.to_string(),
        }
    }

    /// The property's `default`, checked against the field type. An explicit
    /// `null` is kept for optional or nullable fields and dropped otherwise.
    fn field_default(
        &self,
        property: &SchemaNode,
        type_ref: &TypeReference,
        required: bool,
        path: &str,
    ) -> Result<Option<serde_json::Value>, UnsupportedSchemaConstructError> {
        let Some(value) = property.default.value() else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok((!required || property.nullable).then_some(serde_json::Value::Null));
        }
        self.check_default(value, type_ref, property.pattern.as_deref(), path)?;
        Ok(Some(value.clone()))
    }

    fn check_default(
        &self,
        value: &serde_json::Value,
        type_ref: &TypeReference,
        pattern: Option<&str>,
        path: &str,
    ) -> Result<(), UnsupportedSchemaConstructError> {
        let fits: bool = match type_ref {
            TypeReference::Primitive(kind) => primitive_accepts(*kind, value),
            TypeReference::ListOf(item) => match value.as_array() {
                Some(elements) => {
                    for element in elements {
                        self.check_default(element, item, None, path)?;
                    }
                    true
                }
                None => false,
            },
            TypeReference::MapOf(item) => match value.as_object() {
                Some(entries) => {
                    for entry in entries.values() {
                        self.check_default(entry, item, None, path)?;
                    }
                    true
                }
                None => false,
            },
            TypeReference::EnumRef(name) => self
                .enum_values
                .get(name)
                .is_some_and(|literals| literals.contains(value)),
            TypeReference::ClassRef(name) => {
                if let Some(target) = self.alias_target(name) {
                    return self.check_default(value, target, pattern, path);
                }
                value.is_object()
            }
        };
        if !fits {
            return Err(UnsupportedSchemaConstructError::DefaultMismatch {
                value: value.to_string(),
                expected: type_ref.to_string(),
                path: path.to_string(),
            });
        }

        if let (Some(pattern), Some(text)) = (pattern, value.as_str()) {
            let regex: regress::Regex = regress::Regex::new(pattern).map_err(|error| {
                UnsupportedSchemaConstructError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: error.to_string(),
                    path: path.to_string(),
                }
            })?;
            if regex.find(text).is_none() {
                return Err(UnsupportedSchemaConstructError::DefaultMismatch {
                    value: value.to_string(),
                    expected: format!("string matching `{pattern}`"),
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn primitive_accepts(kind: PrimitiveKind, value: &serde_json::Value) -> bool {
    match kind {
        PrimitiveKind::Boolean => value.is_boolean(),
        PrimitiveKind::Int32 => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
        PrimitiveKind::Int64 => value.is_i64(),
        PrimitiveKind::Float | PrimitiveKind::Double => value.is_number(),
        PrimitiveKind::String
        | PrimitiveKind::Date
        | PrimitiveKind::DateTime
        | PrimitiveKind::Byte => value.is_string(),
        PrimitiveKind::Uuid => uuid_accepts(value),
        PrimitiveKind::IntOrString => value.is_i64() || value.is_u64() || value.is_string(),
        PrimitiveKind::Any => true,
    }
}

#[cfg(feature = "uuid")]
fn uuid_accepts(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| uuid::Uuid::parse_str(s).is_ok())
}

#[cfg(not(feature = "uuid"))]
fn uuid_accepts(value: &serde_json::Value) -> bool {
    value.is_string()
}
