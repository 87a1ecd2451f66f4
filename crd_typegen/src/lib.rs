//! Generate strongly-typed class models from Kubernetes CRD and OpenAPI schemas.
//!
//! The pipeline is: [`document`] loads CRDs and OpenAPI documents into
//! [`RootSchema`]s, [`generate`] resolves each root into classes (in parallel)
//! and merges them into one [`GeneratorResult`], and an [`Emitter`] such as
//! [`RustEmitter`] writes the classes out.
//!
//! ```
//! use crd_typegen::{BuildConfig, GenerateSettings, NoTrace, RootSchema, SchemaNode, generate};
//!
//! let schema: SchemaNode = serde_json::from_value(serde_json::json!({
//!     "type": "object",
//!     "properties": { "replicas": { "type": "integer" } }
//! }))
//! .unwrap();
//! let root = RootSchema::new("widget", schema, BuildConfig::new("com.example", "Widget"));
//! let report = generate(&[root], &GenerateSettings::default(), &NoTrace);
//! assert!(report.result.find_by_name("com.example.Widget").is_some());
//! ```

mod aggregate;
mod builder;
pub mod document;
mod emit;
mod error;
pub mod json_pointer;
mod model;
mod naming;
mod primitive;
mod registry;
mod resolver;
mod schema;
mod settings;
mod trace;

pub use aggregate::{GenerationReport, RootOutcome, generate};
pub use builder::{BuildOutput, RootSchema, build, build_root};
pub use emit::{Emitter, RustEmitter, render_all, write_all};
pub use error::{
    EmitError, GenerateError, LoadError, NameCollisionError, SchemaResolutionError,
    UnsupportedSchemaConstructError,
};
pub use model::{
    ClassDefinition, ClassKind, EnumConstant, FieldDefinition, GeneratorResult, QualifiedName,
    TypeReference,
};
pub use naming::{NameAllocator, NameKind, sanitize};
pub use primitive::{PrimitiveKind, map_primitive};
pub use registry::{SchemaRegistry, ref_class_location};
pub use resolver::{ResolveContext, Resolved, Resolver};
pub use schema::{AdditionalProperties, DefaultKeyword, SchemaNode, SchemaShape};
pub use settings::{BuildConfig, GenerateSettings};
pub use trace::{CollectTrace, Decision, NoTrace, Trace, TraceRecord, TracingTrace};
