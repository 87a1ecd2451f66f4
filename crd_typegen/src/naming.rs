//! Deterministic, collision-free identifiers for classes, fields and enum constants.

use std::collections::{BTreeMap, BTreeSet};

use heck::{ToSnakeCase, ToUpperCamelCase};

/// What an identifier names. Each kind has its own casing and namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NameKind {
    /// `UpperCamelCase`, unique per package.
    Class,
    /// `snake_case`, unique per class.
    Field,
    /// `UpperCamelCase`, unique per enum class.
    EnumConstant,
}

/// Pointer segments that describe schema structure rather than a name.
const STRUCTURAL_SEGMENTS: &[&str] = &[
    "#",
    "properties",
    "items",
    "additionalProperties",
    "definitions",
    "components",
    "schemas",
    "allOf",
];

/// Hands out identifiers for one generation run.
///
/// Allocation is memoized on `(kind, scope, context)`: asking again for the same
/// location returns the same name. Collisions inside a scope are resolved from
/// the location's own path, so the outcome only depends on what else lives in
/// that scope.
#[derive(Debug, Default)]
pub struct NameAllocator {
    memo: BTreeMap<(NameKind, String, Vec<String>), String>,
    taken: BTreeMap<(NameKind, String), BTreeSet<String>>,
}

impl NameAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a name for `candidate` found at `context` inside `scope`.
    ///
    /// `scope` is the package for classes and the owning class's qualified
    /// name for fields and enum constants.
    pub fn allocate(
        &mut self,
        kind: NameKind,
        candidate: &str,
        context: &[String],
        scope: &str,
    ) -> String {
        let key: (NameKind, String, Vec<String>) = (kind, scope.to_string(), context.to_vec());
        if let Some(existing) = self.memo.get(&key) {
            return existing.clone();
        }

        let base: String = sanitize(kind, candidate);
        let taken: &mut BTreeSet<String> = self.taken.entry((kind, scope.to_string())).or_default();
        let name: String = disambiguate(kind, &base, context, taken);
        taken.insert(name.clone());
        self.memo.insert(key, name.clone());
        name
    }

    /// True if `name` is already allocated in `scope`.
    #[must_use]
    pub fn is_taken(&self, kind: NameKind, scope: &str, name: &str) -> bool {
        self.taken
            .get(&(kind, scope.to_string()))
            .is_some_and(|names| names.contains(name))
    }
}

fn disambiguate(
    kind: NameKind,
    base: &str,
    context: &[String],
    taken: &BTreeSet<String>,
) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    // Walk back from the end of the path, past the segment the candidate came
    // from (a title is not taken from the path, so nothing is skipped for it).
    let from_last: bool = context
        .last()
        .is_some_and(|last| sanitize(kind, last).ends_with(base));
    let mut name: String = base.to_string();
    let parents = context
        .iter()
        .rev()
        .skip(usize::from(from_last))
        .filter(|segment| !is_structural(segment));
    for segment in parents {
        let suffix: String = sanitize_fragment(kind, segment);
        if suffix.is_empty() {
            continue;
        }
        name = match kind {
            NameKind::Field => format!("{name}_{suffix}"),
            NameKind::Class | NameKind::EnumConstant => format!("{name}{suffix}"),
        };
        if !taken.contains(&name) {
            return name;
        }
    }

    (2_usize..)
        .map(|n| match kind {
            NameKind::Field => format!("{base}_{n}"),
            NameKind::Class | NameKind::EnumConstant => format!("{base}{n}"),
        })
        .find(|numbered| !taken.contains(numbered))
        .unwrap_or_else(|| base.to_string())
}

fn is_structural(segment: &str) -> bool {
    STRUCTURAL_SEGMENTS.contains(&segment) || segment.chars().all(|c| c.is_ascii_digit())
}

/// Casing for `kind`, restricted to ASCII identifier characters.
fn sanitize_fragment(kind: NameKind, raw: &str) -> String {
    let cased: String = match kind {
        NameKind::Field => raw.to_snake_case(),
        NameKind::Class | NameKind::EnumConstant => raw.to_upper_camel_case(),
    };
    cased
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Converts a raw schema name into a valid identifier of the given kind.
/// Examples: `"The Widget_Settings Schema"` -> `"TheWidgetSettingsSchema"` (class),
/// `"apiVersion"` -> `"api_version"` (field), `"123"` -> `"E123"` (enum constant).
#[must_use]
pub fn sanitize(kind: NameKind, raw: &str) -> String {
    let cased: String = sanitize_fragment(kind, raw);
    let (fallback, digit_prefix): (&str, &str) = match kind {
        NameKind::Class => ("Anonymous", "T"),
        NameKind::Field => ("field", "_"),
        NameKind::EnumConstant => ("Empty", "E"),
    };
    if cased.is_empty() || cased.chars().all(|c| c == '_') {
        fallback.to_string()
    } else if cased.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{digit_prefix}{cased}")
    } else {
        cased
    }
}

/// Candidate text for an enum literal.
#[must_use]
pub fn enum_literal_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn class_names_sanitize_spaces_and_underscores() {
        assert_eq!("TheWidgetSchema", sanitize(NameKind::Class, "The Widget Schema"));
        assert_eq!("TheFooBarSchema", sanitize(NameKind::Class, "The Foo_Bar Schema"));
        assert_eq!("FooBarBaz", sanitize(NameKind::Class, "foo-bar-baz"));
        assert_eq!("Metadata", sanitize(NameKind::Class, "Metadata"));
    }

    #[test]
    fn class_names_never_start_with_digit_or_end_up_empty() {
        assert_eq!("T3dModel", sanitize(NameKind::Class, "3d-model"));
        assert_eq!("Anonymous", sanitize(NameKind::Class, "$$"));
    }

    #[test]
    fn field_names_are_snake_case() {
        assert_eq!("api_version", sanitize(NameKind::Field, "apiVersion"));
        assert_eq!("foo_bar", sanitize(NameKind::Field, "foo-bar"));
        assert_eq!("_1st", sanitize(NameKind::Field, "1st"));
        assert_eq!("field", sanitize(NameKind::Field, "--"));
    }

    #[test]
    fn enum_constants() {
        assert_eq!("BlackjackA", sanitize(NameKind::EnumConstant, "blackjack-a"));
        assert_eq!("E123", sanitize(NameKind::EnumConstant, "123"));
        assert_eq!("Pending", sanitize(NameKind::EnumConstant, "PENDING"));
        assert_eq!("Empty", sanitize(NameKind::EnumConstant, ""));
    }

    #[test]
    fn enum_literal_text_for_non_strings() {
        assert_eq!("a", enum_literal_text(&serde_json::json!("a")));
        assert_eq!("42", enum_literal_text(&serde_json::json!(42)));
        assert_eq!("null", enum_literal_text(&serde_json::Value::Null));
    }

    #[test]
    fn same_location_gets_same_name() {
        let mut names = NameAllocator::new();
        let context: Vec<String> = path(&["definitions", "Foo"]);
        let first: String = names.allocate(NameKind::Class, "Foo", &context, "pkg");
        let second: String = names.allocate(NameKind::Class, "Foo", &context, "pkg");
        assert_eq!(first, second);
        assert_eq!("Foo", first);
    }

    #[test]
    fn collision_takes_suffix_from_parent_path_segment() {
        let mut names = NameAllocator::new();
        let a: String = names.allocate(
            NameKind::Class,
            "Spec",
            &path(&["properties", "spec"]),
            "pkg",
        );
        let b: String = names.allocate(
            NameKind::Class,
            "Spec",
            &path(&["properties", "template", "properties", "spec"]),
            "pkg",
        );
        assert_eq!("Spec", a);
        assert_eq!("SpecTemplate", b);
    }

    #[test]
    fn titled_collision_takes_suffix_from_its_own_property() {
        let mut names = NameAllocator::new();
        let a: String = names.allocate(
            NameKind::Class,
            "Config",
            &path(&["properties", "a"]),
            "pkg",
        );
        let b: String = names.allocate(
            NameKind::Class,
            "Config",
            &path(&["properties", "b"]),
            "pkg",
        );
        assert_eq!("Config", a);
        assert_eq!("ConfigB", b);
    }

    #[test]
    fn collision_falls_back_to_numeric_suffix() {
        let mut names = NameAllocator::new();
        let a: String = names.allocate(NameKind::Field, "foo-bar", &path(&["foo-bar"]), "C");
        let b: String = names.allocate(NameKind::Field, "foo_bar", &path(&["foo_bar"]), "C");
        let c: String = names.allocate(NameKind::Field, "fooBar", &path(&["fooBar"]), "C");
        assert_eq!(vec!["foo_bar", "foo_bar_2", "foo_bar_3"], vec![a, b, c]);
    }

    #[test]
    fn scopes_are_independent() {
        let mut names = NameAllocator::new();
        let a: String = names.allocate(NameKind::Class, "Spec", &path(&["spec"]), "a");
        let b: String = names.allocate(NameKind::Class, "Spec", &path(&["spec"]), "b");
        assert_eq!(a, b);
        assert!(names.is_taken(NameKind::Class, "a", "Spec"));
        assert!(!names.is_taken(NameKind::Field, "a", "Spec"));
    }

    #[test]
    fn enum_constant_collisions_are_numbered() {
        let mut names = NameAllocator::new();
        let actual: Vec<String> = ["PENDING", "pending", "Pending"]
            .iter()
            .map(|v| names.allocate(NameKind::EnumConstant, v, &path(&[v]), "pkg.Status"))
            .collect();
        assert_eq!(vec!["Pending", "Pending2", "Pending3"], actual);
    }
}
