//! Builds many roots and merges them into one class model.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::builder::{BuildOutput, RootSchema, build_root};
use crate::error::{GenerateError, NameCollisionError};
use crate::model::{ClassDefinition, GeneratorResult, QualifiedName};
use crate::settings::GenerateSettings;
use crate::trace::Trace;

/// What happened to one root.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOutcome {
    pub label: String,
    /// Fully-qualified names of the top-level classes the root contributed
    /// (its own class first), or why it was rejected.
    pub status: Result<Vec<QualifiedName>, GenerateError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub result: GeneratorResult,
    /// One entry per root, in input order.
    pub outcomes: Vec<RootOutcome>,
}

impl GenerationReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.is_err())
    }

    /// Labels and errors of the rejected roots.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &GenerateError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            Ok(_) => None,
            Err(error) => Some((o.label.as_str(), error)),
        })
    }
}

/// Builds every root and merges the results.
///
/// Roots are built in parallel; merging happens afterwards in input order, so
/// the same input always yields the same report. A failing root contributes
/// nothing and never stops the others.
#[must_use]
pub fn generate(
    roots: &[RootSchema],
    settings: &GenerateSettings,
    trace: &dyn Trace,
) -> GenerationReport {
    let built: Vec<Result<BuildOutput, GenerateError>> = roots
        .par_iter()
        .map(|root| build_root(root, settings, trace))
        .collect();

    let mut merger = Merger::default();
    let mut outcomes: Vec<RootOutcome> = Vec::with_capacity(roots.len());
    for (root, output) in roots.iter().zip(built) {
        let status: Result<Vec<QualifiedName>, GenerateError> =
            output.and_then(|output| merger.merge(&root.label, output).map_err(Into::into));
        match &status {
            Ok(names) => {
                tracing::info!(root = %root.label, classes = names.len(), "root generated");
            }
            Err(error) => {
                tracing::warn!(root = %root.label, kind = error.kind(), %error, "root rejected");
            }
        }
        outcomes.push(RootOutcome {
            label: root.label.clone(),
            status,
        });
    }

    GenerationReport {
        result: merger.finish(),
        outcomes,
    }
}

#[derive(Debug, Default)]
struct Merger {
    top_level: Vec<ClassDefinition>,
    classes: Vec<ClassDefinition>,
    /// Fully-qualified name to the label of the root that first produced it.
    owners: BTreeMap<QualifiedName, String>,
}

impl Merger {
    /// Adds one root's classes, or none of them.
    fn merge(
        &mut self,
        label: &str,
        output: BuildOutput,
    ) -> Result<Vec<QualifiedName>, NameCollisionError> {
        let BuildOutput { root, referenced } = output;
        let candidates: Vec<ClassDefinition> = std::iter::once(root).chain(referenced).collect();

        let mut fresh: Vec<ClassDefinition> = Vec::new();
        let mut fresh_flat: Vec<ClassDefinition> = Vec::new();
        for class in &candidates {
            if let Some(existing) = self.top_level.iter().find(|c| c.name == class.name) {
                if existing.same_shape(class) {
                    continue;
                }
                return Err(self.collision(&class.name, label));
            }
            let mut flat: Vec<ClassDefinition> = Vec::new();
            class.flatten_into(&mut flat);
            for candidate in &flat {
                let clashes: bool = self.owners.contains_key(&candidate.name)
                    || fresh_flat.iter().any(|c| c.name == candidate.name);
                if clashes {
                    return Err(self.collision(&candidate.name, label));
                }
            }
            fresh_flat.extend(flat);
            fresh.push(class.clone());
        }

        for class in &fresh_flat {
            self.owners.insert(class.name.clone(), label.to_string());
        }
        self.classes.extend(fresh_flat);
        self.top_level.extend(fresh);
        Ok(candidates.into_iter().map(|c| c.name).collect())
    }

    fn collision(&self, name: &QualifiedName, label: &str) -> NameCollisionError {
        NameCollisionError {
            name: name.to_string(),
            first_source: self.owners.get(name).cloned().unwrap_or_else(|| label.to_string()),
            second_source: label.to_string(),
        }
    }

    fn finish(self) -> GeneratorResult {
        GeneratorResult {
            top_level: self.top_level,
            classes: self.classes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{ClassKind, TypeReference};
    use crate::registry::SchemaRegistry;
    use crate::schema::SchemaNode;
    use crate::settings::BuildConfig;
    use crate::trace::NoTrace;

    fn root(label: &str, schema: serde_json::Value, config: BuildConfig) -> RootSchema {
        let schema: SchemaNode = serde_json::from_value(schema).expect("valid schema");
        RootSchema::new(label, schema, config)
    }

    fn time_registry() -> Arc<SchemaRegistry> {
        let time: SchemaNode = serde_json::from_value(serde_json::json!({
            "type": "string",
            "format": "date-time"
        }))
        .expect("valid schema");
        Arc::new(std::iter::once(("#/Time".to_string(), time)).collect())
    }

    fn with_time(label: &str, kind: &str) -> RootSchema {
        root(
            label,
            serde_json::json!({
                "type": "object",
                "properties": { "time": { "$ref": "#/Time" } }
            }),
            BuildConfig::new("", kind),
        )
        .with_registry(time_registry())
    }

    #[test]
    fn shared_reference_is_emitted_once() {
        let report: GenerationReport = generate(
            &[with_time("a", "A"), with_time("b", "B")],
            &GenerateSettings::default(),
            &NoTrace,
        );
        assert!(!report.has_failures());

        let actual: Vec<String> = report
            .result
            .top_level
            .iter()
            .map(|c| c.name.to_string())
            .collect();
        assert_eq!(vec!["A", "Time", "B"], actual);
        assert_eq!(
            Ok(vec![QualifiedName::new("", "B"), QualifiedName::new("", "Time")]),
            report.outcomes[1].status
        );
    }

    #[test]
    fn divergent_redefinition_rejects_only_that_root() {
        let first = root(
            "first.yaml",
            serde_json::json!({ "type": "object", "properties": { "a": { "type": "string" } } }),
            BuildConfig::new("com.example", "Widget"),
        );
        let second = root(
            "second.yaml",
            serde_json::json!({ "type": "object", "properties": { "a": { "type": "integer" } } }),
            BuildConfig::new("com.example", "Widget"),
        );
        let third = root(
            "third.yaml",
            serde_json::json!({ "type": "object", "properties": { "b": { "type": "boolean" } } }),
            BuildConfig::new("com.example", "Gadget"),
        );

        let report: GenerationReport =
            generate(&[first, second, third], &GenerateSettings::default(), &NoTrace);

        assert!(report.has_failures());
        assert_eq!(
            Err(GenerateError::NameCollision(NameCollisionError {
                name: "com.example.Widget".to_string(),
                first_source: "first.yaml".to_string(),
                second_source: "second.yaml".to_string(),
            })),
            report.outcomes[1].status
        );
        assert!(report.outcomes[2].status.is_ok());
        let failures: Vec<&str> = report.failures().map(|(label, _)| label).collect();
        assert_eq!(vec!["second.yaml"], failures);
        assert_eq!(2, report.result.top_level.len());
    }

    #[test]
    fn failing_root_contributes_nothing() {
        let bad = root(
            "bad",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "ok": { "type": "object", "properties": { "x": { "type": "string" } } },
                    "broken": { "$ref": "#/Missing" }
                }
            }),
            BuildConfig::new("", "Bad"),
        );
        let report: GenerationReport =
            generate(&[bad, with_time("good", "Good")], &GenerateSettings::default(), &NoTrace);

        assert_eq!(
            "SchemaResolutionError",
            report.outcomes[0]
                .status
                .as_ref()
                .expect_err("unresolved ref")
                .kind()
        );
        assert!(report.result.find_by_name("bad.Ok").is_none());
        assert!(report.result.find_by_name("Good").is_some());
    }

    #[test]
    fn identical_input_gives_identical_report() {
        let roots: Vec<RootSchema> = (0..16)
            .map(|i| with_time(&format!("root-{i}"), &format!("Kind{i}")))
            .collect();
        let first: GenerationReport = generate(&roots, &GenerateSettings::default(), &NoTrace);
        let second: GenerationReport = generate(&roots, &GenerateSettings::default(), &NoTrace);
        assert_eq!(first, second);
        assert_eq!(17, first.result.top_level.len());
    }

    #[test]
    fn nested_class_names_are_unique_across_roots() {
        let a = root(
            "a",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "spec": { "type": "object", "properties": { "x": { "type": "string" } } }
                }
            }),
            BuildConfig::new("pkg", "Widget"),
        );
        let b = root(
            "b",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "spec": { "type": "object", "properties": { "y": { "type": "string" } } }
                }
            }),
            BuildConfig::new("pkg", "Other"),
        );
        let report: GenerationReport = generate(&[a, b], &GenerateSettings::default(), &NoTrace);
        assert!(!report.has_failures());

        assert!(report.result.find_by_name("pkg.widget.Spec").is_some());
        assert!(report.result.find_by_name("pkg.other.Spec").is_some());
        let spec = TypeReference::ClassRef(QualifiedName::new("pkg.widget", "Spec"));
        assert!(matches!(
            report.result.find_by_name("pkg.Widget").map(|c| &c.kind),
            Some(ClassKind::Object { fields, .. }) if fields[0].type_ref == spec
        ));
    }
}
