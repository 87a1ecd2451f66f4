//! JSON Pointer helpers (RFC 6901).
//!
//! Schema locations are tracked as URI-fragment pointers (`#/properties/spec`).
//! The same form is the canonical key for `$ref` targets.
//! Segments are `/`-separated, with `~` escaped as `~0` and `/` escaped as `~1`.

/// Pointer of a document root.
pub const ROOT: &str = "#";

/// Appends a segment to a pointer, applying RFC 6901 escaping.
pub fn push_segment(path: &mut String, segment: &str) {
    path.push('/');
    for c in segment.chars() {
        match c {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            other => path.push(other),
        }
    }
}

/// Returns a new pointer by appending a segment to the given pointer.
#[must_use]
pub fn format(path: &str, segment: &str) -> String {
    let mut result: String = path.to_string();
    push_segment(&mut result, segment);
    result
}

/// Normalizes a `$ref` value into its canonical pointer form.
///
/// Surrounding whitespace is dropped and a missing `#` fragment marker is added,
/// so `/definitions/Foo`, `#/definitions/Foo` and ` #/definitions/Foo ` agree.
#[must_use]
pub fn canonicalize(reference: &str) -> String {
    let trimmed: &str = reference.trim();
    if trimmed.starts_with('#') {
        trimmed.to_string()
    } else if trimmed.starts_with('/') {
        format!("{ROOT}{trimmed}")
    } else {
        format!("{ROOT}/{trimmed}")
    }
}

/// Splits a pointer into its unescaped segments. The leading `#` is not a segment.
#[must_use]
pub fn segments(path: &str) -> Vec<String> {
    let body: &str = path.strip_prefix('#').unwrap_or(path);
    let body: &str = body.strip_prefix('/').unwrap_or(body);
    if body.is_empty() {
        return Vec::new();
    }
    body.split('/')
        .map(|raw| raw.replace("~1", "/").replace("~0", "~"))
        .collect()
}
