//! The class model: what the resolver produces and emitters consume.

use std::fmt;

use crate::primitive::PrimitiveKind;

/// Package plus simple name. The package is dotted and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Package that holds the synthetic classes nested under this class.
    #[must_use]
    pub fn nested_package(&self) -> String {
        let segment: String = self.name.to_lowercase();
        if self.package.is_empty() {
            segment
        } else {
            format!("{}.{segment}", self.package)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Resolved type of a field. Cycles go through class names, never through
/// nested `TypeReference`s.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeReference {
    Primitive(PrimitiveKind),
    ClassRef(QualifiedName),
    ListOf(Box<TypeReference>),
    /// Map with string keys.
    MapOf(Box<TypeReference>),
    EnumRef(QualifiedName),
}

impl TypeReference {
    #[must_use]
    pub fn list_of(item: TypeReference) -> Self {
        Self::ListOf(Box::new(item))
    }

    #[must_use]
    pub fn map_of(value: TypeReference) -> Self {
        Self::MapOf(Box::new(value))
    }

    /// The class this type points at directly, without looking through lists or maps.
    #[must_use]
    pub fn direct_class(&self) -> Option<&QualifiedName> {
        match self {
            Self::ClassRef(name) | Self::EnumRef(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::ClassRef(name) | Self::EnumRef(name) => write!(f, "{name}"),
            Self::ListOf(item) => write!(f, "list<{item}>"),
            Self::MapOf(value) => write!(f, "map<string, {value}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Identifier in the generated source.
    pub name: String,
    /// Property name as it appears on the wire.
    pub json_key: String,
    pub type_ref: TypeReference,
    pub required: bool,
    /// Explicit `null` is a valid value (`nullable: true`).
    pub nullable: bool,
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,
    /// Schema pointer of the property, for diagnostics.
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassKind {
    Object {
        fields: Vec<FieldDefinition>,
        /// Value type of undeclared keys, when the schema types them.
        additional_properties: Option<TypeReference>,
    },
    Enum {
        constants: Vec<EnumConstant>,
    },
    Alias {
        target: TypeReference,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub name: QualifiedName,
    pub kind: ClassKind,
    /// Synthetic classes for inline schemas, owned by this class.
    pub nested: Vec<ClassDefinition>,
    pub description: Option<String>,
    pub source_path: String,
}

impl ClassDefinition {
    /// How fields refer to this class.
    #[must_use]
    pub fn type_ref(&self) -> TypeReference {
        match self.kind {
            ClassKind::Enum { .. } => TypeReference::EnumRef(self.name.clone()),
            _ => TypeReference::ClassRef(self.name.clone()),
        }
    }

    /// Appends this class and, depth-first, every nested class.
    pub fn flatten_into(&self, out: &mut Vec<ClassDefinition>) {
        out.push(self.clone());
        for nested in &self.nested {
            nested.flatten_into(out);
        }
    }

    /// Structural equality: everything except source paths and descriptions.
    #[must_use]
    pub fn same_shape(&self, other: &ClassDefinition) -> bool {
        self.name == other.name
            && kind_same_shape(&self.kind, &other.kind)
            && self.nested.len() == other.nested.len()
            && self
                .nested
                .iter()
                .zip(&other.nested)
                .all(|(a, b)| a.same_shape(b))
    }
}

fn kind_same_shape(a: &ClassKind, b: &ClassKind) -> bool {
    match (a, b) {
        (
            ClassKind::Object {
                fields: fields_a,
                additional_properties: extra_a,
            },
            ClassKind::Object {
                fields: fields_b,
                additional_properties: extra_b,
            },
        ) => {
            extra_a == extra_b
                && fields_a.len() == fields_b.len()
                && fields_a.iter().zip(fields_b).all(|(x, y)| {
                    x.name == y.name
                        && x.json_key == y.json_key
                        && x.type_ref == y.type_ref
                        && x.required == y.required
                        && x.nullable == y.nullable
                        && x.default == y.default
                })
        }
        (ClassKind::Enum { constants: a }, ClassKind::Enum { constants: b }) => a == b,
        (ClassKind::Alias { target: a }, ClassKind::Alias { target: b }) => a == b,
        _ => false,
    }
}

/// Output of one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorResult {
    /// Root classes and `$ref` target classes, in discovery order.
    pub top_level: Vec<ClassDefinition>,
    /// Every class (top-level and nested) exactly once, in depth-first order.
    pub classes: Vec<ClassDefinition>,
}

impl GeneratorResult {
    #[must_use]
    pub fn find(&self, name: &QualifiedName) -> Option<&ClassDefinition> {
        self.classes.iter().find(|class| &class.name == name)
    }

    /// Looks a class up by its dotted fully-qualified name.
    #[must_use]
    pub fn find_by_name(&self, qualified: &str) -> Option<&ClassDefinition> {
        self.classes
            .iter()
            .find(|class| class.name.to_string() == qualified)
    }
}
