//! Settings for class model generation.

/// Settings that apply to a whole generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateSettings {
    /// When true, a node with no derivable type (only `oneOf`/`anyOf`/`allOf`,
    /// or no recognizable keyword at all) fails its root with
    /// `UnsupportedSchemaConstructError`.
    ///
    /// **Default: false.** The lenient default maps such nodes to the untyped
    /// placeholder and records the decision on the trace channel.
    pub deny_unsupported_constructs: bool,
}

/// Per-root placement and naming options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Dotted target namespace, e.g. `com.example.v1`. May be empty.
    pub package: String,
    /// Prepended to the root class name only.
    pub class_name_prefix: String,
    /// Appended to the root class name only.
    pub class_name_suffix: String,
    /// Root class name when the schema has no usable `title`.
    pub root_name: String,
}

impl BuildConfig {
    #[must_use]
    pub fn new(package: impl Into<String>, root_name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            root_name: root_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_name_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.class_name_suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }
}
