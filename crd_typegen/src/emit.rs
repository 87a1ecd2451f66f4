//! Writes a class model out as source files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use rayon::prelude::*;

use crate::error::EmitError;
use crate::model::{
    ClassDefinition, ClassKind, EnumConstant, FieldDefinition, GeneratorResult, QualifiedName,
    TypeReference,
};
use crate::naming::{NameKind, sanitize};
use crate::primitive::PrimitiveKind;

/// Turns classes into source text for one target language.
pub trait Emitter: Sync {
    /// File, relative to the output directory, that holds `name`.
    fn file_path(&self, name: &QualifiedName) -> PathBuf;

    /// Appends the source of `classes`, which all map to the same file.
    ///
    /// # Errors
    ///
    /// Only propagates errors of `out`.
    fn render(
        &self,
        classes: &[&ClassDefinition],
        model: &GeneratorResult,
        out: &mut String,
    ) -> fmt::Result;

    /// Text placed at the top of files before any class, keyed by file path.
    /// Paths that hold no class are still written.
    fn preludes(&self, _model: &GeneratorResult) -> BTreeMap<PathBuf, String> {
        BTreeMap::new()
    }
}

/// Renders every class of `model`, grouped by file, in model order.
///
/// # Errors
///
/// Returns `EmitError::Render` if the emitter fails.
pub fn render_all(
    emitter: &dyn Emitter,
    model: &GeneratorResult,
) -> Result<BTreeMap<PathBuf, String>, EmitError> {
    let mut groups: BTreeMap<PathBuf, Vec<&ClassDefinition>> = BTreeMap::new();
    for class in &model.classes {
        groups
            .entry(emitter.file_path(&class.name))
            .or_default()
            .push(class);
    }

    let mut files: BTreeMap<PathBuf, String> = emitter.preludes(model);
    for (path, classes) in groups {
        let text: &mut String = files.entry(path.clone()).or_default();
        emitter
            .render(&classes, model, text)
            .map_err(|source| EmitError::Render { path, source })?;
    }
    Ok(files)
}

/// Renders `model` and writes every file under `out_dir`. Distinct files are
/// written in parallel. Returns the written paths in sorted order.
///
/// # Errors
///
/// Returns `EmitError` if rendering fails or a file or directory cannot be written.
pub fn write_all(
    emitter: &dyn Emitter,
    model: &GeneratorResult,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, EmitError> {
    let files: BTreeMap<PathBuf, String> = render_all(emitter, model)?;
    let written: Vec<PathBuf> = files
        .par_iter()
        .map(|(relative, text)| {
            let path: PathBuf = out_dir.join(relative);
            write_file(&path, text)?;
            Ok(path)
        })
        .collect::<Result<Vec<PathBuf>, EmitError>>()?;
    tracing::info!(files = written.len(), out = %out_dir.display(), "sources written");
    Ok(written)
}

fn write_file(path: &Path, text: &str) -> Result<(), EmitError> {
    let io_error = |source: std::io::Error| EmitError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, text).map_err(io_error)
}

const HEADER: &str = "//! Generated by crdtypegen. Do not edit manually.\n";

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "try", "type", "unsafe", "use", "where",
    "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv", "typeof",
    "unsized", "virtual", "yield",
];

/// Keywords that cannot be raw identifiers.
const RESERVED_PATH_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

/// Identifier as it must be written in Rust source.
fn rust_ident(name: &str) -> String {
    if RESERVED_PATH_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Escape a string for use inside a Rust double-quoted attribute.
fn escape_for_rust_attr(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Raw string literal that holds `text` verbatim.
fn raw_string_literal(text: &str) -> String {
    let mut hashes: usize = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence: String = "#".repeat(hashes);
    format!("r{fence}\"{text}\"{fence}")
}

fn emit_doc_comment(out: &mut String, description: Option<&str>, line_prefix: &str) -> fmt::Result {
    let Some(desc) = description else {
        return Ok(());
    };
    for line in desc.trim().lines() {
        writeln!(out, "{line_prefix}/// {line}")?;
    }
    Ok(())
}

/// Emits serde-annotated Rust: one module per package.
///
/// Package `com.example.v1` becomes `com/example/v1.rs`; the empty package is
/// the module root itself (`lib.rs` for `crate`, `mod.rs` otherwise). Types in
/// other packages are referred to through `module_root`.
#[derive(Debug, Clone)]
pub struct RustEmitter {
    module_root: String,
}

impl Default for RustEmitter {
    fn default() -> Self {
        Self::new("crate")
    }
}

impl RustEmitter {
    /// `module_root` is the Rust path of the output directory's module, e.g.
    /// `crate` or `crate::generated`.
    #[must_use]
    pub fn new(module_root: impl Into<String>) -> Self {
        Self {
            module_root: module_root.into(),
        }
    }

    fn root_file(&self) -> &'static str {
        if self.module_root == "crate" {
            "lib.rs"
        } else {
            "mod.rs"
        }
    }

    fn package_file(&self, package: &str) -> PathBuf {
        let segments: Vec<String> = module_segments(package);
        match segments.split_last() {
            None => PathBuf::from(self.root_file()),
            Some((last, parents)) => {
                let mut path: PathBuf = parents.iter().collect();
                path.push(format!("{last}.rs"));
                path
            }
        }
    }

    fn class_path(&self, name: &QualifiedName, from_package: &str) -> String {
        let ident: String = rust_ident(&name.name);
        if name.package == from_package {
            return ident;
        }
        let mut path: String = self.module_root.clone();
        for segment in module_segments(&name.package) {
            path.push_str("::");
            path.push_str(&rust_ident(&segment));
        }
        format!("{path}::{ident}")
    }

    fn type_text(&self, type_ref: &TypeReference, from_package: &str) -> String {
        match type_ref {
            TypeReference::Primitive(kind) => primitive_text(*kind).to_string(),
            TypeReference::ClassRef(name) | TypeReference::EnumRef(name) => {
                self.class_path(name, from_package)
            }
            TypeReference::ListOf(item) => format!("Vec<{}>", self.type_text(item, from_package)),
            TypeReference::MapOf(value) => {
                format!("BTreeMap<String, {}>", self.type_text(value, from_package))
            }
        }
    }

    fn emit_struct(
        &self,
        out: &mut String,
        class: &ClassDefinition,
        fields: &[FieldDefinition],
        additional_properties: Option<&TypeReference>,
        cycles: &CycleIndex<'_>,
    ) -> fmt::Result {
        let package: &str = &class.name.package;
        let struct_name: String = rust_ident(&class.name.name);
        let mut default_fns: Vec<(String, String, String)> = Vec::new();

        emit_doc_comment(out, class.description.as_deref(), "")?;
        writeln!(out, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]")?;
        writeln!(out, "pub struct {struct_name} {{")?;
        for field in fields {
            let ident: String = rust_ident(&field.name);
            let mut type_str: String = self.type_text(&field.type_ref, package);
            if let TypeReference::ClassRef(target) = &field.type_ref
                && cycles.leads_back(target, &class.name)
            {
                type_str = format!("Box<{type_str}>");
            }
            if !field.required || field.nullable {
                type_str = format!("Option<{type_str}>");
            }

            let mut serde_args: Vec<String> = Vec::new();
            if ident.trim_start_matches("r#") != field.json_key {
                serde_args.push(format!(
                    "rename = \"{}\"",
                    escape_for_rust_attr(&field.json_key)
                ));
            }
            if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
                let fn_name: String = format!(
                    "default_{}_{}",
                    class.name.name.to_snake_case(),
                    field.name
                );
                serde_args.push(format!("default = \"{fn_name}\""));
                default_fns.push((fn_name, type_str.clone(), default.to_string()));
            }
            if !field.required {
                serde_args.push("skip_serializing_if = \"Option::is_none\"".to_string());
            }

            emit_doc_comment(out, field.description.as_deref(), "    ")?;
            if !serde_args.is_empty() {
                writeln!(out, "    #[serde({})]", serde_args.join(", "))?;
            }
            writeln!(out, "    pub {ident}: {type_str},")?;
        }
        if let Some(values) = additional_properties {
            let name: &str = if fields.iter().any(|f| f.name == "additional_properties") {
                "additional_properties_"
            } else {
                "additional_properties"
            };
            writeln!(out, "    #[serde(flatten)]")?;
            writeln!(
                out,
                "    pub {name}: BTreeMap<String, {}>,",
                self.type_text(values, package)
            )?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        for (fn_name, return_type, literal) in default_fns {
            let literal: String = raw_string_literal(&literal);
            writeln!(out, "fn {fn_name}() -> {return_type} {{")?;
            if return_type.starts_with("Option<") {
                writeln!(out, "    serde_json::from_str({literal}).ok()")?;
            } else {
                writeln!(
                    out,
                    "    serde_json::from_str({literal}).expect(\"default matches the field type\")"
                )?;
            }
            writeln!(out, "}}")?;
            writeln!(out)?;
        }
        Ok(())
    }
}

fn emit_enum(out: &mut String, class: &ClassDefinition, constants: &[EnumConstant]) -> fmt::Result {
    let name: String = rust_ident(&class.name.name);
    emit_doc_comment(out, class.description.as_deref(), "")?;
    if constants.iter().all(|c| c.value.is_string()) {
        writeln!(
            out,
            "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]"
        )?;
        writeln!(out, "pub enum {name} {{")?;
        for constant in constants {
            let value: &str = constant.value.as_str().unwrap_or_default();
            writeln!(out, "    #[serde(rename = \"{}\")]", escape_for_rust_attr(value))?;
            writeln!(out, "    {},", rust_ident(&constant.name))?;
        }
        writeln!(out, "}}")?;
    } else {
        // serde cannot rename variants to non-string literals.
        let allowed: Vec<String> = constants.iter().map(|c| format!("`{}`", c.value)).collect();
        writeln!(out, "/// One of {}.", allowed.join(", "))?;
        writeln!(out, "pub type {name} = serde_json::Value;")?;
    }
    writeln!(out)
}

fn primitive_text(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Boolean => "bool",
        PrimitiveKind::Int32 => "i32",
        PrimitiveKind::Int64 => "i64",
        PrimitiveKind::Float => "f32",
        PrimitiveKind::Double => "f64",
        PrimitiveKind::String
        | PrimitiveKind::Date
        | PrimitiveKind::DateTime
        | PrimitiveKind::Byte
        | PrimitiveKind::Uuid => "String",
        PrimitiveKind::IntOrString | PrimitiveKind::Any => "serde_json::Value",
    }
}

/// Module names of a dotted package, without raw-identifier escapes.
fn module_segments(package: &str) -> Vec<String> {
    package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| sanitize(NameKind::Field, segment))
        .collect()
}

/// Every package holding a class, plus all their ancestors (the empty package included).
fn all_packages(model: &GeneratorResult) -> BTreeSet<String> {
    let mut packages: BTreeSet<String> = BTreeSet::new();
    packages.insert(String::new());
    for class in &model.classes {
        let mut package: &str = class.name.package.as_str();
        while !package.is_empty() {
            packages.insert(package.to_string());
            package = package.rsplit_once('.').map_or("", |(parent, _)| parent);
        }
    }
    packages
}

/// Every class named anywhere in `type_ref`, lists and maps included.
fn mentioned_classes<'t>(type_ref: &'t TypeReference, out: &mut Vec<&'t QualifiedName>) {
    match type_ref {
        TypeReference::ClassRef(name) | TypeReference::EnumRef(name) => out.push(name),
        TypeReference::ListOf(inner) | TypeReference::MapOf(inner) => {
            mentioned_classes(inner, out);
        }
        TypeReference::Primitive(_) => {}
    }
}

/// Class-to-class edges for finding recursive fields and recursive aliases.
struct CycleIndex<'m> {
    /// Direct (unboxed) edges.
    edges: BTreeMap<&'m QualifiedName, Vec<&'m QualifiedName>>,
    /// Every class an alias mentions, wrapped or not.
    aliases: BTreeMap<&'m QualifiedName, Vec<&'m QualifiedName>>,
}

impl<'m> CycleIndex<'m> {
    fn new(model: &'m GeneratorResult) -> Self {
        let mut edges: BTreeMap<&'m QualifiedName, Vec<&'m QualifiedName>> = BTreeMap::new();
        let mut aliases: BTreeMap<&'m QualifiedName, Vec<&'m QualifiedName>> = BTreeMap::new();
        for class in &model.classes {
            if let ClassKind::Alias { target } = &class.kind {
                let mut mentioned: Vec<&QualifiedName> = Vec::new();
                mentioned_classes(target, &mut mentioned);
                aliases.insert(&class.name, mentioned);
            }
            let targets: Vec<&QualifiedName> = match &class.kind {
                ClassKind::Object { fields, .. } => fields
                    .iter()
                    .filter_map(|f| match &f.type_ref {
                        TypeReference::ClassRef(name) => Some(name),
                        _ => None,
                    })
                    .collect(),
                ClassKind::Alias { target } => target.direct_class().into_iter().collect(),
                ClassKind::Enum { .. } => Vec::new(),
            };
            edges.insert(&class.name, targets);
        }
        Self { edges, aliases }
    }

    /// True if expanding alias `name` runs into `name` again. Such an alias
    /// cannot be a `type` alias.
    fn alias_is_recursive(&self, name: &QualifiedName) -> bool {
        let mut seen: BTreeSet<&QualifiedName> = BTreeSet::new();
        let mut stack: Vec<&QualifiedName> = self.aliases.get(name).cloned().unwrap_or_default();
        while let Some(current) = stack.pop() {
            if current == name {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(next) = self.aliases.get(current) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    /// True if `from` is `to` or contains it by value.
    fn leads_back(&self, from: &QualifiedName, to: &QualifiedName) -> bool {
        let mut seen: BTreeSet<&QualifiedName> = BTreeSet::new();
        let mut stack: Vec<&QualifiedName> = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(next) = self.edges.get(current) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }
}

impl Emitter for RustEmitter {
    fn file_path(&self, name: &QualifiedName) -> PathBuf {
        self.package_file(&name.package)
    }

    fn render(
        &self,
        classes: &[&ClassDefinition],
        model: &GeneratorResult,
        out: &mut String,
    ) -> fmt::Result {
        writeln!(out, "use serde::{{Deserialize, Serialize}};")?;
        let needs_btreemap: bool = classes.iter().any(|class| match &class.kind {
            ClassKind::Object {
                fields,
                additional_properties,
            } => {
                additional_properties.is_some()
                    || fields.iter().any(|f| mentions_map(&f.type_ref))
            }
            ClassKind::Alias { target } => mentions_map(target),
            ClassKind::Enum { .. } => false,
        });
        if needs_btreemap {
            writeln!(out, "use std::collections::BTreeMap;")?;
        }
        writeln!(out)?;

        let cycles = CycleIndex::new(model);
        for class in classes {
            match &class.kind {
                ClassKind::Object {
                    fields,
                    additional_properties,
                } => self.emit_struct(out, class, fields, additional_properties.as_ref(), &cycles)?,
                ClassKind::Enum { constants } => emit_enum(out, class, constants)?,
                ClassKind::Alias { target } => {
                    let name: String = rust_ident(&class.name.name);
                    let target_text: String = self.type_text(target, &class.name.package);
                    emit_doc_comment(out, class.description.as_deref(), "")?;
                    if cycles.alias_is_recursive(&class.name) {
                        writeln!(
                            out,
                            "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]"
                        )?;
                        writeln!(out, "#[serde(transparent)]")?;
                        writeln!(out, "pub struct {name}(pub {target_text});")?;
                    } else {
                        writeln!(out, "pub type {name} = {target_text};")?;
                    }
                    writeln!(out)?;
                }
            }
        }
        Ok(())
    }

    /// The generated-file header and `pub mod` declarations of each package.
    fn preludes(&self, model: &GeneratorResult) -> BTreeMap<PathBuf, String> {
        let packages: BTreeSet<String> = all_packages(model);
        let mut preludes: BTreeMap<PathBuf, String> = BTreeMap::new();
        for package in &packages {
            let children: Vec<String> = packages
                .iter()
                .filter(|candidate| !candidate.is_empty())
                .filter(|candidate| {
                    candidate.rsplit_once('.').map_or("", |(parent, _)| parent) == package.as_str()
                })
                .filter_map(|child| module_segments(child).pop())
                .collect();
            let mut text: String = HEADER.to_string();
            if !children.is_empty() {
                text.push('\n');
                for child in children {
                    text.push_str("pub mod ");
                    text.push_str(&rust_ident(&child));
                    text.push_str(";\n");
                }
            }
            text.push('\n');
            preludes.insert(self.package_file(package), text);
        }
        preludes
    }
}

fn mentions_map(type_ref: &TypeReference) -> bool {
    match type_ref {
        TypeReference::MapOf(_) => true,
        TypeReference::ListOf(item) => mentions_map(item),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, key: &str, type_ref: TypeReference, required: bool) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            json_key: key.to_string(),
            type_ref,
            required,
            nullable: false,
            default: None,
            description: None,
            source_path: format!("#/properties/{key}"),
        }
    }

    fn object(package: &str, name: &str, fields: Vec<FieldDefinition>) -> ClassDefinition {
        ClassDefinition {
            name: QualifiedName::new(package, name),
            kind: ClassKind::Object {
                fields,
                additional_properties: None,
            },
            nested: Vec::new(),
            description: None,
            source_path: "#".to_string(),
        }
    }

    fn model(classes: Vec<ClassDefinition>) -> GeneratorResult {
        GeneratorResult {
            top_level: classes.clone(),
            classes,
        }
    }

    fn render_one(emitter: &RustEmitter, model: &GeneratorResult, path: &str) -> String {
        let files: BTreeMap<PathBuf, String> = render_all(emitter, model).expect("renders");
        files.get(Path::new(path)).cloned().unwrap_or_default()
    }

    #[test]
    fn package_file_layout() {
        let emitter = RustEmitter::default();
        assert_eq!(
            PathBuf::from("com/example/v1.rs"),
            emitter.file_path(&QualifiedName::new("com.example.v1", "Widget"))
        );
        assert_eq!(
            PathBuf::from("lib.rs"),
            emitter.file_path(&QualifiedName::new("", "Time"))
        );
        assert_eq!(
            PathBuf::from("mod.rs"),
            RustEmitter::new("crate::generated").file_path(&QualifiedName::new("", "Time"))
        );
    }

    #[test]
    fn module_declarations_cover_every_ancestor() {
        let model: GeneratorResult = model(vec![object("com.example.v1", "Widget", Vec::new())]);
        let files: BTreeMap<PathBuf, String> =
            render_all(&RustEmitter::default(), &model).expect("renders");
        for path in ["lib.rs", "com.rs", "com/example.rs", "com/example/v1.rs"] {
            assert!(files.contains_key(Path::new(path)), "missing {path}");
        }
        assert_eq!(4, files.len());
        assert!(files[Path::new("lib.rs")].contains("pub mod com;"));
        assert!(files[Path::new("com/example.rs")].contains("pub mod v1;"));
        assert!(files[Path::new("com/example/v1.rs")].contains("pub struct Widget {"));
    }

    #[test]
    fn struct_fields_renames_and_options() {
        let widget: ClassDefinition = object(
            "",
            "Widget",
            vec![
                field(
                    "api_version",
                    "apiVersion",
                    TypeReference::Primitive(PrimitiveKind::String),
                    true,
                ),
                field("type", "type", TypeReference::Primitive(PrimitiveKind::Int32), false),
            ],
        );
        let actual: String = render_one(&RustEmitter::default(), &model(vec![widget]), "lib.rs");
        let expected: &str = r#"//! Generated by crdtypegen. Do not edit manually.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<i32>,
}

"#;
        assert_eq!(expected, actual);
    }

    #[test]
    fn cross_package_references_use_module_root() {
        let time = ClassDefinition {
            name: QualifiedName::new("io.k8s.meta.v1", "Time"),
            kind: ClassKind::Alias {
                target: TypeReference::Primitive(PrimitiveKind::DateTime),
            },
            nested: Vec::new(),
            description: Some("RFC 3339 timestamp.".to_string()),
            source_path: "#/Time".to_string(),
        };
        let event: ClassDefinition = object(
            "com.example",
            "Event",
            vec![field(
                "at",
                "at",
                TypeReference::ClassRef(time.name.clone()),
                true,
            )],
        );
        let model: GeneratorResult = model(vec![event, time]);
        let emitter = RustEmitter::new("crate::generated");

        let event_file: String = render_one(&emitter, &model, "com/example.rs");
        assert!(event_file.contains("    pub at: crate::generated::io::k8s::meta::v1::Time,\n"));
        let time_file: String = render_one(&emitter, &model, "io/k8s/meta/v1.rs");
        assert!(time_file.contains("/// RFC 3339 timestamp.\npub type Time = String;\n"));
    }

    #[test]
    fn recursive_fields_are_boxed() {
        let node: ClassDefinition = object(
            "",
            "Node",
            vec![
                field(
                    "next",
                    "next",
                    TypeReference::ClassRef(QualifiedName::new("", "Node")),
                    false,
                ),
                field(
                    "children",
                    "children",
                    TypeReference::list_of(TypeReference::ClassRef(QualifiedName::new("", "Node"))),
                    false,
                ),
            ],
        );
        let actual: String = render_one(&RustEmitter::default(), &model(vec![node]), "lib.rs");
        assert!(actual.contains("pub next: Option<Box<Node>>,"));
        assert!(actual.contains("pub children: Option<Vec<Node>>,"));
    }

    #[test]
    fn enums_and_defaults() {
        let phase = ClassDefinition {
            name: QualifiedName::new("", "Phase"),
            kind: ClassKind::Enum {
                constants: vec![EnumConstant {
                    name: "Running".to_string(),
                    value: serde_json::json!("running"),
                }],
            },
            nested: Vec::new(),
            description: None,
            source_path: "#/properties/phase".to_string(),
        };
        let level = ClassDefinition {
            name: QualifiedName::new("", "Level"),
            kind: ClassKind::Enum {
                constants: vec![
                    EnumConstant {
                        name: "E1".to_string(),
                        value: serde_json::json!(1),
                    },
                    EnumConstant {
                        name: "E2".to_string(),
                        value: serde_json::json!(2),
                    },
                ],
            },
            nested: Vec::new(),
            description: None,
            source_path: "#/properties/level".to_string(),
        };
        let mut replicas: FieldDefinition =
            field("replicas", "replicas", TypeReference::Primitive(PrimitiveKind::Int64), false);
        replicas.default = Some(serde_json::json!(3));
        let job: ClassDefinition = object("", "BatchJob", vec![replicas]);

        let actual: String =
            render_one(&RustEmitter::default(), &model(vec![job, phase, level]), "lib.rs");
        assert!(actual.contains("    #[serde(rename = \"running\")]\n    Running,\n"));
        assert!(actual.contains("/// One of `1`, `2`.\npub type Level = serde_json::Value;"));
        assert!(actual.contains(
            "    #[serde(default = \"default_batch_job_replicas\", skip_serializing_if = \"Option::is_none\")]\n"
        ));
        assert!(actual.contains(
            "fn default_batch_job_replicas() -> Option<i64> {\n    serde_json::from_str(r#\"3\"#).ok()\n}\n"
        ));
    }

    #[test]
    fn additional_properties_are_flattened() {
        let mut labels: ClassDefinition = object("", "Labels", Vec::new());
        labels.kind = ClassKind::Object {
            fields: Vec::new(),
            additional_properties: Some(TypeReference::Primitive(PrimitiveKind::String)),
        };
        let actual: String = render_one(&RustEmitter::default(), &model(vec![labels]), "lib.rs");
        assert!(actual.contains("use std::collections::BTreeMap;"));
        assert!(actual.contains(
            "    #[serde(flatten)]\n    pub additional_properties: BTreeMap<String, String>,\n"
        ));
    }

    fn alias(name: &str, target: TypeReference) -> ClassDefinition {
        ClassDefinition {
            name: QualifiedName::new("", name),
            kind: ClassKind::Alias { target },
            nested: Vec::new(),
            description: None,
            source_path: format!("#/definitions/{name}"),
        }
    }

    #[test]
    fn recursive_aliases_become_newtypes() {
        let tree_ref = TypeReference::ClassRef(QualifiedName::new("", "Tree"));
        let model: GeneratorResult = model(vec![
            alias("Tree", TypeReference::list_of(tree_ref.clone())),
            alias("Forest", TypeReference::map_of(tree_ref)),
        ]);
        let actual: String = render_one(&RustEmitter::default(), &model, "lib.rs");
        assert!(actual.contains(
            "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n#[serde(transparent)]\npub struct Tree(pub Vec<Tree>);\n"
        ));
        assert!(actual.contains("pub type Forest = BTreeMap<String, Tree>;\n"));
    }

    #[test]
    fn nullable_required_field_is_optional_but_always_serialized() {
        let mut note: FieldDefinition =
            field("note", "note", TypeReference::Primitive(PrimitiveKind::String), true);
        note.nullable = true;
        let actual: String = render_one(
            &RustEmitter::default(),
            &model(vec![object("", "Memo", vec![note])]),
            "lib.rs",
        );
        assert!(actual.contains("pub struct Memo {\n    pub note: Option<String>,\n}\n"));
    }

    #[test]
    fn suffixed_keyword_fields_keep_their_wire_key() {
        let link: ClassDefinition = object(
            "",
            "Link",
            vec![
                field("self", "self", TypeReference::Primitive(PrimitiveKind::String), true),
                field("type", "type", TypeReference::Primitive(PrimitiveKind::String), true),
            ],
        );
        let actual: String = render_one(&RustEmitter::default(), &model(vec![link]), "lib.rs");
        assert!(actual.contains("    #[serde(rename = \"self\")]\n    pub self_: String,\n"));
        assert!(actual.contains("    pub r#type: String,\n"));
        assert!(!actual.contains("rename = \"type\""));
    }

    #[test]
    fn raw_string_literal_picks_enough_hashes() {
        assert_eq!("r#\"1\"#", raw_string_literal("1"));
        assert_eq!("r##\"\"#\"\"##", raw_string_literal("\"#\""));
    }

    #[test]
    fn keywords_become_raw_or_suffixed() {
        assert_eq!("r#type", rust_ident("type"));
        assert_eq!("self_", rust_ident("self"));
        assert_eq!("Self_", rust_ident("Self"));
        assert_eq!("kind", rust_ident("kind"));
    }
}
