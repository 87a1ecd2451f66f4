//! Structured decision log of the resolver.

use std::fmt;
use std::sync::Mutex;

use crate::model::QualifiedName;
use crate::primitive::PrimitiveKind;

/// What the resolver decided for one schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// `$ref` already resolved in this run; the cached type was reused.
    ReusedReference { canonical: String },
    /// `$ref` resolved for the first time into a named class.
    ResolvedReference {
        canonical: String,
        class: QualifiedName,
    },
    Enum { class: QualifiedName, constants: usize },
    Object { class: QualifiedName, fields: usize },
    Alias { class: QualifiedName },
    Array,
    Map { typed: bool },
    Scalar(PrimitiveKind),
    /// No type could be derived; the untyped placeholder was used.
    Untyped { reason: String },
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReusedReference { canonical } => write!(f, "reuse {canonical}"),
            Self::ResolvedReference { canonical, class } => {
                write!(f, "resolve {canonical} as {class}")
            }
            Self::Enum { class, constants } => write!(f, "enum {class} ({constants} constants)"),
            Self::Object { class, fields } => write!(f, "object {class} ({fields} fields)"),
            Self::Alias { class } => write!(f, "alias {class}"),
            Self::Array => f.write_str("array"),
            Self::Map { typed: true } => f.write_str("typed map"),
            Self::Map { typed: false } => f.write_str("untyped map"),
            Self::Scalar(kind) => write!(f, "scalar {kind}"),
            Self::Untyped { reason } => write!(f, "untyped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TraceRecord<'a> {
    pub path: &'a str,
    pub decision: &'a Decision,
}

/// Receives resolver decisions. Shared across worker threads.
pub trait Trace: Sync {
    fn record(&self, record: TraceRecord<'_>);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl Trace for NoTrace {
    fn record(&self, _record: TraceRecord<'_>) {}
}

/// Forwards records to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTrace;

impl Trace for TracingTrace {
    fn record(&self, record: TraceRecord<'_>) {
        tracing::debug!(path = record.path, decision = %record.decision, "schema decision");
    }
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectTrace {
    records: Mutex<Vec<(String, Decision)>>,
}

impl CollectTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the collected `(path, decision)` pairs.
    #[must_use]
    pub fn take(&self) -> Vec<(String, Decision)> {
        match self.records.lock() {
            Ok(mut records) => std::mem::take(&mut *records),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Trace for CollectTrace {
    fn record(&self, record: TraceRecord<'_>) {
        let entry: (String, Decision) = (record.path.to_string(), record.decision.clone());
        match self.records.lock() {
            Ok(mut records) => records.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
