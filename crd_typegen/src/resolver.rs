//! Schema node → type resolution.
//!
//! One `Resolver` lives for one root schema. It owns the memoization cache that
//! maps a canonical schema identity (the `$ref` pointer, or the root's own
//! pointer) to the type fields use to refer to it. The cache entry is written
//! before the target's children are visited, so a schema that reaches itself
//! again sees a `ClassRef` to itself instead of recursing.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GenerateError, SchemaResolutionError, UnsupportedSchemaConstructError};
use crate::json_pointer;
use crate::model::{ClassDefinition, ClassKind, QualifiedName, TypeReference};
use crate::naming::{NameAllocator, NameKind};
use crate::primitive::{PrimitiveKind, map_primitive};
use crate::registry::{SchemaRegistry, ref_class_location};
use crate::schema::{SchemaNode, SchemaShape};
use crate::settings::GenerateSettings;
use crate::trace::{Decision, Trace, TraceRecord};

/// Location of the node being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'c> {
    /// Package that receives a synthetic class created for this node.
    pub package: &'c str,
    /// Pointer of the node.
    pub path: &'c str,
    /// Name candidate for a synthetic class when the node has no title.
    pub name_hint: &'c str,
}

/// Outcome of resolving one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A synthetic class was created here; the caller owns it as a nested class.
    /// `type_ref` may wrap the class (e.g. a list of it).
    Class {
        class: ClassDefinition,
        type_ref: TypeReference,
    },
    /// A named (`$ref`) class, or a list/map around one.
    Reference(TypeReference),
    /// A scalar, or a list/map of scalars.
    Primitive(TypeReference),
}

impl Resolved {
    #[must_use]
    pub fn type_ref(&self) -> &TypeReference {
        match self {
            Self::Class { type_ref, .. }
            | Self::Reference(type_ref)
            | Self::Primitive(type_ref) => type_ref,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (TypeReference, Option<ClassDefinition>) {
        match self {
            Self::Class { class, type_ref } => (type_ref, Some(class)),
            Self::Reference(type_ref) | Self::Primitive(type_ref) => (type_ref, None),
        }
    }

    fn wrap(self, wrap: impl FnOnce(TypeReference) -> TypeReference) -> Self {
        match self {
            Self::Class { class, type_ref } => Self::Class {
                class,
                type_ref: wrap(type_ref),
            },
            Self::Reference(type_ref) => Self::Reference(wrap(type_ref)),
            Self::Primitive(type_ref) => Self::Primitive(wrap(type_ref)),
        }
    }
}

pub struct Resolver<'a> {
    pub(crate) registry: &'a SchemaRegistry,
    pub(crate) settings: &'a GenerateSettings,
    trace: &'a dyn Trace,
    /// Package for `$ref` targets whose name carries none.
    pub(crate) default_package: String,
    pub(crate) names: NameAllocator,
    cache: BTreeMap<String, TypeReference>,
    /// Literals of every enum class built so far, for default checks.
    pub(crate) enum_values: BTreeMap<QualifiedName, Vec<serde_json::Value>>,
    /// Targets of every alias class built so far, for default checks.
    pub(crate) alias_targets: BTreeMap<QualifiedName, TypeReference>,
    referenced: Vec<ClassDefinition>,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(
        registry: &'a SchemaRegistry,
        settings: &'a GenerateSettings,
        trace: &'a dyn Trace,
        default_package: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            settings,
            trace,
            default_package: default_package.into(),
            names: NameAllocator::new(),
            cache: BTreeMap::new(),
            enum_values: BTreeMap::new(),
            alias_targets: BTreeMap::new(),
            referenced: Vec::new(),
        }
    }

    /// Classes created for `$ref` targets, in the order they were first reached.
    #[must_use]
    pub fn into_referenced(self) -> Vec<ClassDefinition> {
        self.referenced
    }

    pub(crate) fn note(&self, path: &str, decision: &Decision) {
        self.trace.record(TraceRecord { path, decision });
    }

    /// Resolves `node` into a type, creating synthetic classes for inline
    /// object and enum schemas and named classes for `$ref` targets.
    ///
    /// # Errors
    ///
    /// `SchemaResolutionError` for unresolvable references, arrays without
    /// `items` and unknown `type` names; `UnsupportedSchemaConstructError` for
    /// untyped nodes in strict mode and for mistyped defaults.
    pub fn resolve(
        &mut self,
        node: &SchemaNode,
        ctx: &ResolveContext<'_>,
    ) -> Result<Resolved, GenerateError> {
        match node.classify() {
            SchemaShape::Ref(reference) => {
                self.resolve_ref(reference, ctx).map(Resolved::Reference)
            }
            SchemaShape::Enum(values) => {
                let name: QualifiedName = self.synthetic_name(node, ctx);
                let class: ClassDefinition = self.enum_class(node, values, name, ctx.path);
                Ok(Resolved::Class {
                    type_ref: class.type_ref(),
                    class,
                })
            }
            SchemaShape::IntOrString => Ok(self.scalar(PrimitiveKind::IntOrString, ctx.path)),
            SchemaShape::Array(items) => {
                let Some(items) = items else {
                    return Err(SchemaResolutionError::MissingItems {
                        path: ctx.path.to_string(),
                    }
                    .into());
                };
                let items_path: String = json_pointer::format(ctx.path, "items");
                let item_ctx = ResolveContext {
                    path: &items_path,
                    ..*ctx
                };
                let resolved: Resolved = self.resolve(items, &item_ctx)?;
                self.note(ctx.path, &Decision::Array);
                Ok(resolved.wrap(TypeReference::list_of))
            }
            SchemaShape::Object(extra) => {
                let name: QualifiedName = self.synthetic_name(node, ctx);
                let class: ClassDefinition = self.object_class(node, name, extra, ctx.path)?;
                Ok(Resolved::Class {
                    type_ref: class.type_ref(),
                    class,
                })
            }
            SchemaShape::Closed => {
                let name: QualifiedName = self.synthetic_name(node, ctx);
                let class: ClassDefinition = self.object_class(node, name, None, ctx.path)?;
                Ok(Resolved::Class {
                    type_ref: class.type_ref(),
                    class,
                })
            }
            SchemaShape::Map(None) => {
                self.note(ctx.path, &Decision::Map { typed: false });
                Ok(Resolved::Primitive(TypeReference::map_of(
                    TypeReference::Primitive(PrimitiveKind::Any),
                )))
            }
            SchemaShape::Map(Some(values)) => {
                let values_path: String = json_pointer::format(ctx.path, "additionalProperties");
                let hint: String = format!("{}Value", ctx.name_hint);
                let value_ctx = ResolveContext {
                    path: &values_path,
                    name_hint: &hint,
                    ..*ctx
                };
                let resolved: Resolved = self.resolve(values, &value_ctx)?;
                self.note(ctx.path, &Decision::Map { typed: true });
                Ok(resolved.wrap(TypeReference::map_of))
            }
            SchemaShape::Scalar(type_name, format) => {
                let kind: PrimitiveKind = map_primitive(type_name, format).ok_or_else(|| {
                    SchemaResolutionError::UnsupportedType {
                        type_name: type_name.to_string(),
                        path: ctx.path.to_string(),
                    }
                })?;
                Ok(self.scalar(kind, ctx.path))
            }
            SchemaShape::Composition("allOf") if node.all_of.len() == 1 => {
                let member_path: String =
                    json_pointer::format(&json_pointer::format(ctx.path, "allOf"), "0");
                let member_ctx = ResolveContext {
                    path: &member_path,
                    ..*ctx
                };
                self.resolve(&node.all_of[0], &member_ctx)
            }
            SchemaShape::Composition(keyword) => self.untyped(keyword, ctx.path),
            SchemaShape::Untyped => self.untyped("no type", ctx.path),
        }
    }

    fn scalar(&self, kind: PrimitiveKind, path: &str) -> Resolved {
        self.note(path, &Decision::Scalar(kind));
        Resolved::Primitive(TypeReference::Primitive(kind))
    }

    fn untyped(&self, keyword: &str, path: &str) -> Result<Resolved, GenerateError> {
        if self.settings.deny_unsupported_constructs {
            return Err(UnsupportedSchemaConstructError::Composition {
                keyword: keyword.to_string(),
                path: path.to_string(),
            }
            .into());
        }
        self.note(
            path,
            &Decision::Untyped {
                reason: keyword.to_string(),
            },
        );
        Ok(Resolved::Primitive(TypeReference::Primitive(
            PrimitiveKind::Any,
        )))
    }

    /// Name for a class created inline at `ctx`: the node's title, else the hint.
    fn synthetic_name(&mut self, node: &SchemaNode, ctx: &ResolveContext<'_>) -> QualifiedName {
        let candidate: &str = node.usable_title().unwrap_or(ctx.name_hint);
        let simple: String = self.names.allocate(
            NameKind::Class,
            candidate,
            &json_pointer::segments(ctx.path),
            ctx.package,
        );
        QualifiedName::new(ctx.package, simple)
    }

    fn resolve_ref(
        &mut self,
        reference: &str,
        ctx: &ResolveContext<'_>,
    ) -> Result<TypeReference, GenerateError> {
        let canonical: String = json_pointer::canonicalize(reference);
        if let Some(cached) = self.cache.get(&canonical) {
            let cached: TypeReference = cached.clone();
            self.note(ctx.path, &Decision::ReusedReference { canonical });
            return Ok(cached);
        }

        let registry: &'a SchemaRegistry = self.registry;
        let target: &'a SchemaNode =
            registry
                .get(&canonical)
                .ok_or_else(|| SchemaResolutionError::UnresolvedRef {
                    canonical: canonical.clone(),
                    path: ctx.path.to_string(),
                })?;

        let (package, base): (String, String) =
            ref_class_location(&canonical, &self.default_package);
        let simple: String = self.names.allocate(
            NameKind::Class,
            &base,
            &json_pointer::segments(&canonical),
            &package,
        );
        let name = QualifiedName::new(package, simple);
        let class: ClassDefinition = self.named_class(target, name, &canonical)?;
        let type_ref: TypeReference = class.type_ref();
        self.note(
            ctx.path,
            &Decision::ResolvedReference {
                canonical,
                class: class.name.clone(),
            },
        );
        self.referenced.push(class);
        Ok(type_ref)
    }

    /// Builds the class named `name` for a schema with identity `identity`.
    ///
    /// The identity is cached before any child is visited. Object and enum
    /// schemas become classes of that kind; anything else becomes an alias of
    /// its resolved type.
    pub(crate) fn named_class(
        &mut self,
        node: &SchemaNode,
        name: QualifiedName,
        identity: &str,
    ) -> Result<ClassDefinition, GenerateError> {
        let shape: SchemaShape<'_> = node.classify();
        let type_ref: TypeReference = match shape {
            SchemaShape::Enum(_) => TypeReference::EnumRef(name.clone()),
            _ => TypeReference::ClassRef(name.clone()),
        };
        self.cache.insert(identity.to_string(), type_ref);

        match shape {
            SchemaShape::Enum(values) => Ok(self.enum_class(node, values, name, identity)),
            SchemaShape::Object(extra) => self.object_class(node, name, extra, identity),
            SchemaShape::Closed => self.object_class(node, name, None, identity),
            _ => {
                let package: String = name.nested_package();
                let ctx = ResolveContext {
                    package: &package,
                    path: identity,
                    name_hint: &name.name,
                };
                let (target, nested): (TypeReference, Option<ClassDefinition>) =
                    self.resolve(node, &ctx)?.into_parts();
                self.alias_targets.insert(name.clone(), target.clone());
                if self.alias_chain_returns_to(&name) {
                    return Err(SchemaResolutionError::AliasCycle {
                        class: name.to_string(),
                        path: identity.to_string(),
                    }
                    .into());
                }
                self.note(identity, &Decision::Alias { class: name.clone() });
                Ok(ClassDefinition {
                    name,
                    kind: ClassKind::Alias { target },
                    nested: nested.into_iter().collect(),
                    description: node.normalized_description(),
                    source_path: identity.to_string(),
                })
            }
        }
    }

    /// True if following alias targets that are plain class references from
    /// `name` ends at `name` again.
    fn alias_chain_returns_to(&self, name: &QualifiedName) -> bool {
        let mut seen: BTreeSet<&QualifiedName> = BTreeSet::new();
        let mut current: &QualifiedName = name;
        while let Some(TypeReference::ClassRef(next)) = self.alias_targets.get(current) {
            if next == name {
                return true;
            }
            if !seen.insert(next) {
                return false;
            }
            current = next;
        }
        false
    }

    /// Final target of the alias chain starting at `name`, or `None` if `name`
    /// is no alias or the chain loops.
    pub(crate) fn alias_target(&self, name: &QualifiedName) -> Option<&TypeReference> {
        let mut seen: BTreeSet<&QualifiedName> = BTreeSet::new();
        let mut current: &QualifiedName = name;
        loop {
            if !seen.insert(current) {
                return None;
            }
            match self.alias_targets.get(current)? {
                TypeReference::ClassRef(next) if self.alias_targets.contains_key(next) => {
                    current = next;
                }
                target => return Some(target),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{CollectTrace, NoTrace};

    fn node(value: serde_json::Value) -> SchemaNode {
        serde_json::from_value(value).expect("valid schema")
    }

    fn ctx<'c>(path: &'c str, hint: &'c str) -> ResolveContext<'c> {
        ResolveContext {
            package: "com.example",
            path,
            name_hint: hint,
        }
    }

    #[test]
    fn scalar_resolves_to_primitive() {
        let registry = SchemaRegistry::new();
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "com.example");

        let resolved: Resolved = resolver
            .resolve(
                &node(serde_json::json!({ "type": "string", "format": "date-time" })),
                &ctx("#/properties/t", "t"),
            )
            .expect("resolves");
        assert_eq!(
            Resolved::Primitive(TypeReference::Primitive(PrimitiveKind::DateTime)),
            resolved
        );
    }

    #[test]
    fn map_inference_generates_no_class() {
        let registry = SchemaRegistry::new();
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "com.example");

        let resolved: Resolved = resolver
            .resolve(
                &node(serde_json::json!({
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                })),
                &ctx("#/properties/labels", "labels"),
            )
            .expect("resolves");
        assert_eq!(
            Resolved::Primitive(TypeReference::map_of(TypeReference::Primitive(
                PrimitiveKind::String
            ))),
            resolved
        );
    }

    #[test]
    fn array_of_inline_objects_yields_list_of_synthetic_class() {
        let registry = SchemaRegistry::new();
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "com.example");

        let resolved: Resolved = resolver
            .resolve(
                &node(serde_json::json!({
                    "type": "array",
                    "items": { "type": "object", "properties": { "port": { "type": "integer" } } }
                })),
                &ctx("#/properties/ports", "ports"),
            )
            .expect("resolves");
        let expected_name = QualifiedName::new("com.example", "Ports");
        assert_eq!(
            &TypeReference::list_of(TypeReference::ClassRef(expected_name.clone())),
            resolved.type_ref()
        );
        let (_, class) = resolved.into_parts();
        let class: ClassDefinition = class.expect("synthetic class");
        assert_eq!(expected_name, class.name);
        assert_eq!("#/properties/ports/items", class.source_path);
    }

    #[test]
    fn array_without_items_is_a_resolution_error() {
        let registry = SchemaRegistry::new();
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "com.example");

        let error: GenerateError = resolver
            .resolve(
                &node(serde_json::json!({ "type": "array" })),
                &ctx("#/properties/xs", "xs"),
            )
            .expect_err("missing items");
        assert_eq!(
            GenerateError::Resolution(SchemaResolutionError::MissingItems {
                path: "#/properties/xs".to_string()
            }),
            error
        );
    }

    #[test]
    fn unresolved_ref_names_the_canonical_path() {
        let registry = SchemaRegistry::new();
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "com.example");

        let error: GenerateError = resolver
            .resolve(
                &node(serde_json::json!({ "$ref": "/definitions/Gone" })),
                &ctx("#/properties/g", "g"),
            )
            .expect_err("unresolved");
        assert_eq!(
            GenerateError::Resolution(SchemaResolutionError::UnresolvedRef {
                canonical: "#/definitions/Gone".to_string(),
                path: "#/properties/g".to_string(),
            }),
            error
        );
    }

    #[test]
    fn ref_is_resolved_once_and_then_reused() {
        let mut registry = SchemaRegistry::new();
        registry.insert(
            "#/Time",
            node(serde_json::json!({ "type": "string", "format": "date-time" })),
        );
        let settings = GenerateSettings::default();
        let trace = CollectTrace::new();
        let mut resolver = Resolver::new(&registry, &settings, &trace, "");

        let reference: SchemaNode = node(serde_json::json!({ "$ref": "#/Time" }));
        let first: Resolved = resolver
            .resolve(&reference, &ctx("#/properties/a", "a"))
            .expect("resolves");
        let second: Resolved = resolver
            .resolve(&reference, &ctx("#/properties/b", "b"))
            .expect("resolves");

        let time = TypeReference::ClassRef(QualifiedName::new("", "Time"));
        assert_eq!(Resolved::Reference(time.clone()), first);
        assert_eq!(Resolved::Reference(time), second);

        let referenced: Vec<ClassDefinition> = resolver.into_referenced();
        assert_eq!(1, referenced.len());
        assert_eq!(
            ClassKind::Alias {
                target: TypeReference::Primitive(PrimitiveKind::DateTime)
            },
            referenced[0].kind
        );
        assert!(trace.take().contains(&(
            "#/properties/b".to_string(),
            Decision::ReusedReference {
                canonical: "#/Time".to_string()
            }
        )));
    }

    #[test]
    fn composition_policy() {
        let registry = SchemaRegistry::new();
        let one_of: SchemaNode = node(serde_json::json!({
            "oneOf": [{ "type": "string" }, { "type": "integer" }]
        }));

        let lenient = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &lenient, &NoTrace, "com.example");
        assert_eq!(
            Resolved::Primitive(TypeReference::Primitive(PrimitiveKind::Any)),
            resolver
                .resolve(&one_of, &ctx("#/properties/u", "u"))
                .expect("lenient")
        );

        let strict = GenerateSettings {
            deny_unsupported_constructs: true,
        };
        let mut resolver = Resolver::new(&registry, &strict, &NoTrace, "com.example");
        assert_eq!(
            GenerateError::Unsupported(UnsupportedSchemaConstructError::Composition {
                keyword: "oneOf".to_string(),
                path: "#/properties/u".to_string(),
            }),
            resolver
                .resolve(&one_of, &ctx("#/properties/u", "u"))
                .expect_err("strict")
        );
    }

    #[test]
    fn single_all_of_resolves_its_member() {
        let mut registry = SchemaRegistry::new();
        registry.insert("#/definitions/Name", node(serde_json::json!({ "type": "string" })));
        let settings = GenerateSettings {
            deny_unsupported_constructs: true,
        };
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "");

        let resolved: Resolved = resolver
            .resolve(
                &node(serde_json::json!({ "allOf": [{ "$ref": "#/definitions/Name" }] })),
                &ctx("#/properties/n", "n"),
            )
            .expect("resolves");
        assert_eq!(
            Resolved::Reference(TypeReference::ClassRef(QualifiedName::new("", "Name"))),
            resolved
        );
    }

    #[test]
    fn refs_that_only_point_at_each_other_are_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.insert(
            "#/definitions/A",
            node(serde_json::json!({ "$ref": "#/definitions/B" })),
        );
        registry.insert(
            "#/definitions/B",
            node(serde_json::json!({ "$ref": "#/definitions/A" })),
        );
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "");

        let error: GenerateError = resolver
            .resolve(
                &node(serde_json::json!({ "$ref": "#/definitions/A" })),
                &ctx("#/properties/a", "a"),
            )
            .expect_err("alias cycle");
        assert_eq!(
            GenerateError::Resolution(SchemaResolutionError::AliasCycle {
                class: "A".to_string(),
                path: "#/definitions/A".to_string(),
            }),
            error
        );
    }

    #[test]
    fn recursive_alias_through_a_list_is_accepted() {
        let mut registry = SchemaRegistry::new();
        registry.insert(
            "#/definitions/Tree",
            node(serde_json::json!({ "type": "array", "items": { "$ref": "#/definitions/Tree" } })),
        );
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "");

        let resolved: Resolved = resolver
            .resolve(
                &node(serde_json::json!({ "$ref": "#/definitions/Tree" })),
                &ctx("#/properties/t", "t"),
            )
            .expect("resolves");
        let tree = QualifiedName::new("", "Tree");
        assert_eq!(Resolved::Reference(TypeReference::ClassRef(tree.clone())), resolved);
        assert_eq!(
            Some(&TypeReference::list_of(TypeReference::ClassRef(tree.clone()))),
            resolver.alias_target(&tree)
        );
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let registry = SchemaRegistry::new();
        let settings = GenerateSettings::default();
        let mut resolver = Resolver::new(&registry, &settings, &NoTrace, "com.example");

        let error: GenerateError = resolver
            .resolve(
                &node(serde_json::json!({ "type": "strnig" })),
                &ctx("#/properties/s", "s"),
            )
            .expect_err("unknown type");
        assert_eq!("SchemaResolutionError", error.kind());
    }
}
