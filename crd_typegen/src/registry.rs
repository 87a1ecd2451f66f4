//! Named schemas addressable by `$ref`.

use std::collections::BTreeMap;

use crate::json_pointer;
use crate::schema::SchemaNode;

/// Canonical `$ref` pointer to schema node, for one input document.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, SchemaNode>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` under the canonical form of `reference`.
    pub fn insert(&mut self, reference: &str, schema: SchemaNode) {
        self.schemas
            .insert(json_pointer::canonicalize(reference), schema);
    }

    /// Registers every entry of a named-schema section (`components/schemas`,
    /// `definitions`) under `#/<section...>/<name>`.
    pub fn insert_section<'a>(
        &mut self,
        section: &[&str],
        schemas: impl IntoIterator<Item = (&'a String, &'a SchemaNode)>,
    ) {
        let base: String = section
            .iter()
            .fold(json_pointer::ROOT.to_string(), |path, segment| {
                json_pointer::format(&path, segment)
            });
        for (name, schema) in schemas {
            self.schemas
                .insert(json_pointer::format(&base, name), schema.clone());
        }
    }

    /// Looks up an already canonical pointer.
    #[must_use]
    pub fn get(&self, canonical: &str) -> Option<&SchemaNode> {
        self.schemas.get(canonical)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<(String, SchemaNode)> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = (String, SchemaNode)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (reference, schema) in iter {
            registry.insert(&reference, schema);
        }
        registry
    }
}

/// Splits a canonical pointer into the package and name of the class it becomes.
///
/// The last segment names the class; a dotted segment such as
/// `io.k8s.apimachinery.pkg.apis.meta.v1.Time` also carries the package.
/// Otherwise `default_package` is used.
#[must_use]
pub fn ref_class_location(canonical: &str, default_package: &str) -> (String, String) {
    let last: String = json_pointer::segments(canonical)
        .pop()
        .unwrap_or_default();
    match last.rsplit_once('.') {
        Some((package, name)) if !package.is_empty() && !name.is_empty() => {
            (package.to_string(), name.to_string())
        }
        _ => (default_package.to_string(), last),
    }
}
