//! Bind marker allocation.
//!
//! A [`BindMarkerFactory`] describes a placeholder style and hands out one
//! [`BindMarkers`] allocator per statement. Markers from one allocator never
//! collide: indexed and named markers render distinct text, anonymous `?`
//! markers are told apart by their position.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid marker hint pattern"));

/// Where a marker's value goes on the execution side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindTarget {
    /// Zero-based position among the statement's markers.
    Index(usize),
    /// Driver-visible parameter name, without the marker prefix.
    Name(String),
}

/// A placeholder token in rendered SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindMarker {
    placeholder: String,
    target: BindTarget,
    ordinal: usize,
}

impl BindMarker {
    /// Text inserted into the statement.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn target(&self) -> &BindTarget {
        &self.target
    }

    /// Allocation order within the statement.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl std::fmt::Display for BindMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.placeholder)
    }
}

/// Placeholder style of a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindMarkerFactory {
    /// `<prefix><n>` with `n` counting up from `start`.
    Indexed { prefix: String, start: usize },
    /// The same placeholder for every marker, bound by position.
    Anonymous { placeholder: String },
    /// `<prefix><name_prefix><n>`, or `<prefix><hint>` when a hint is given.
    Named {
        prefix: String,
        name_prefix: String,
        max_length: usize,
    },
}

impl BindMarkerFactory {
    pub fn indexed(prefix: impl Into<String>, start: usize) -> Self {
        BindMarkerFactory::Indexed {
            prefix: prefix.into(),
            start,
        }
    }

    pub fn anonymous(placeholder: impl Into<String>) -> Self {
        BindMarkerFactory::Anonymous {
            placeholder: placeholder.into(),
        }
    }

    pub fn named(prefix: impl Into<String>, name_prefix: impl Into<String>, max_length: usize) -> Self {
        BindMarkerFactory::Named {
            prefix: prefix.into(),
            name_prefix: name_prefix.into(),
            max_length,
        }
    }

    /// Starts a fresh allocator for one statement.
    pub fn create(&self) -> BindMarkers {
        BindMarkers {
            style: self.clone(),
            counter: 0,
            used: HashSet::new(),
        }
    }

    /// Whether markers render distinct, referencable text.
    pub fn identifiable_placeholders(&self) -> bool {
        !matches!(self, BindMarkerFactory::Anonymous { .. })
    }
}

/// Marker allocator scoped to a single statement build.
#[derive(Debug)]
pub struct BindMarkers {
    style: BindMarkerFactory,
    counter: usize,
    used: HashSet<String>,
}

impl BindMarkers {
    /// Allocates the next marker.
    pub fn next(&mut self) -> BindMarker {
        self.allocate(None)
    }

    /// Allocates the next marker, naming it after `hint` where the style allows.
    pub fn next_for(&mut self, hint: &str) -> BindMarker {
        self.allocate(Some(hint))
    }

    /// Number of markers handed out so far.
    pub fn allocated(&self) -> usize {
        self.counter
    }

    fn allocate(&mut self, hint: Option<&str>) -> BindMarker {
        let ordinal = self.counter;
        self.counter += 1;

        let (placeholder, target) = match &self.style {
            BindMarkerFactory::Indexed { prefix, start } => (
                format!("{prefix}{}", start + ordinal),
                BindTarget::Index(ordinal),
            ),
            BindMarkerFactory::Anonymous { placeholder } => {
                (placeholder.clone(), BindTarget::Index(ordinal))
            }
            BindMarkerFactory::Named {
                prefix,
                name_prefix,
                max_length,
            } => {
                let name = match hint.map(|h| sanitize(h, *max_length)) {
                    Some(base) if !base.is_empty() => {
                        unique_name(&self.used, base, ordinal, *max_length)
                    }
                    _ => unique_name(
                        &self.used,
                        format!("{name_prefix}{ordinal}"),
                        ordinal,
                        *max_length,
                    ),
                };
                self.used.insert(name.clone());
                (format!("{prefix}{name}"), BindTarget::Name(name))
            }
        };

        BindMarker {
            placeholder,
            target,
            ordinal,
        }
    }
}

fn sanitize(hint: &str, max_length: usize) -> String {
    let mut name = NON_IDENTIFIER.replace_all(hint, "").into_owned();
    name.truncate(max_length);
    name
}

/// Names are ASCII after sanitizing, so byte truncation is safe. The base is
/// shortened so `base_suffix` stays within `max_length`.
fn unique_name(used: &HashSet<String>, base: String, ordinal: usize, max_length: usize) -> String {
    if !used.contains(&base) {
        return base;
    }
    let mut suffix = ordinal;
    loop {
        let tail = format!("_{suffix}");
        let keep = base.len().min(max_length.saturating_sub(tail.len()));
        let candidate = format!("{}{tail}", &base[..keep]);
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
