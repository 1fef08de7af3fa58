//! Annotation sanitization.
//!
//! Turns the raw per-category annotation collections of a record into
//! sorted, non-overlapping, in-bounds annotation lists. Each category is
//! cleaned in four steps:
//!
//! 1. normalize the representation (absent, structured or JSON-encoded),
//!    dropping list entries that are not annotation objects
//! 2. coerce offsets to integers
//! 3. drop out-of-bounds and repeated spans, then sort by start
//! 4. merge overlapping spans
//!
//! A failing step only affects its own category. The category keeps the
//! best result available before the failure and a [`SanitizeWarning`] is
//! recorded.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde_json::Value;

use crate::error::SanitizeError;
use crate::types::{attribute_text, Annotation, RawAnnotation, RawAnnotations};

/// Sanitization step that produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeStep {
    Normalize,
    Coerce,
}

impl SanitizeStep {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Coerce => "coerce",
        }
    }
}

/// A recoverable problem with one annotation category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeWarning {
    pub category: String,
    pub step: SanitizeStep,
    pub error: SanitizeError,
}

impl fmt::Display for SanitizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} annotations ({}): {}",
            self.category,
            self.step.as_str(),
            self.error
        )
    }
}

/// Sanitized annotations of one record, keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedAnnotations {
    categories: BTreeMap<String, Vec<Annotation>>,
}

impl SanitizedAnnotations {
    /// Annotations of a category; empty when the category is missing.
    #[must_use]
    pub fn get(&self, category: &str) -> &[Annotation] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replace the annotations of a category.
    pub fn insert(&mut self, category: impl Into<String>, annotations: Vec<Annotation>) {
        self.categories.insert(category.into(), annotations);
    }
}

/// An annotation whose offsets are integers but not yet bounds-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CoercedAnnotation {
    start: i64,
    end: i64,
    attributes: BTreeMap<String, String>,
}

/// Sanitize every category of a record.
///
/// # Arguments
/// * `raw` - Raw annotation collections keyed by category
/// * `text_len` - Length of the source text in characters
///
/// # Returns
/// The sanitized categories and any per-category warnings
pub fn sanitize_annotations(
    raw: &BTreeMap<String, Option<RawAnnotations>>,
    text_len: usize,
) -> (SanitizedAnnotations, Vec<SanitizeWarning>) {
    let mut sanitized = SanitizedAnnotations::default();
    let mut warnings = Vec::new();

    for (category, annotations) in raw {
        let (clean, category_warnings) =
            sanitize_category(category, annotations.as_ref(), text_len);
        sanitized.insert(category.clone(), clean);
        warnings.extend(category_warnings);
    }

    (sanitized, warnings)
}

/// Sanitize the annotations of one category.
pub fn sanitize_category(
    category: &str,
    raw: Option<&RawAnnotations>,
    text_len: usize,
) -> (Vec<Annotation>, Vec<SanitizeWarning>) {
    let mut warnings = Vec::new();
    let mut warn = |step: SanitizeStep, error: SanitizeError| {
        tracing::warn!(
            category = %category,
            step = step.as_str(),
            error = %error,
            "failed to sanitize annotations"
        );
        warnings.push(SanitizeWarning {
            category: category.to_string(),
            step,
            error,
        });
    };

    let (normalized, error) = normalize(raw);
    if let Some(error) = error {
        warn(SanitizeStep::Normalize, error);
    }

    let (coerced, error) = coerce_offsets(&normalized);
    if let Some(error) = error {
        warn(SanitizeStep::Coerce, error);
    }

    let filtered = filter_and_dedup(coerced, text_len);
    let merged = merge_overlapping(filtered);

    (merged, warnings)
}

/// Resolve a raw collection into a list of raw annotations.
///
/// Encoded collections are parsed as strict JSON. Entries that are not
/// annotation objects are dropped one by one; the returned error reports
/// what was lost.
fn normalize(raw: Option<&RawAnnotations>) -> (Vec<RawAnnotation>, Option<SanitizeError>) {
    match raw {
        None => (Vec::new(), None),
        Some(RawAnnotations::Structured(list)) => (list.clone(), None),
        Some(RawAnnotations::Encoded(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value) => entries_from_value(value),
            Err(e) => (Vec::new(), Some(SanitizeError::Decode(e.to_string()))),
        },
        Some(RawAnnotations::Malformed(value)) => entries_from_value(value.clone()),
    }
}

fn entries_from_value(value: Value) -> (Vec<RawAnnotation>, Option<SanitizeError>) {
    let items = match value {
        Value::Null => return (Vec::new(), None),
        Value::Array(items) => items,
        other => return (Vec::new(), Some(SanitizeError::NotAList(json_kind(&other)))),
    };

    let mut entries = Vec::with_capacity(items.len());
    let mut dropped = 0;
    let mut first: Option<String> = None;

    for item in items {
        match serde_json::from_value::<RawAnnotation>(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                dropped += 1;
                first.get_or_insert_with(|| e.to_string());
            }
        }
    }

    let error = first.map(|first| SanitizeError::Entries { dropped, first });
    (entries, error)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Coerce offsets to integers and attribute values to text.
///
/// Entries with non-integer offsets are dropped; the returned error
/// reports how many were lost.
fn coerce_offsets(raw: &[RawAnnotation]) -> (Vec<CoercedAnnotation>, Option<SanitizeError>) {
    let mut coerced = Vec::with_capacity(raw.len());
    let mut dropped = 0;
    let mut first: Option<String> = None;

    for ann in raw {
        let start = ann.start.as_ref().and_then(|o| o.to_integer());
        let end = ann.end.as_ref().and_then(|o| o.to_integer());

        let (Some(start), Some(end)) = (start, end) else {
            dropped += 1;
            if first.is_none() {
                first = Some(format!("start = {:?}, end = {:?}", ann.start, ann.end));
            }
            continue;
        };

        let attributes = ann
            .attributes
            .iter()
            .flatten()
            .filter_map(|(k, v)| attribute_text(v).map(|text| (k.clone(), text)))
            .collect();

        coerced.push(CoercedAnnotation {
            start,
            end,
            attributes,
        });
    }

    let error = first.map(|first| SanitizeError::Offsets { dropped, first });
    (coerced, error)
}

/// Keep spans with `0 <= start < end <= text_len`, drop repeated
/// `(start, end)` pairs (first wins) and sort by start.
fn filter_and_dedup(coerced: Vec<CoercedAnnotation>, text_len: usize) -> Vec<Annotation> {
    let text_len = i64::try_from(text_len).unwrap_or(i64::MAX);
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut kept: Vec<Annotation> = Vec::with_capacity(coerced.len());

    for ann in coerced {
        let in_bounds = 0 <= ann.start && ann.start < ann.end && ann.end <= text_len;
        if !in_bounds || !seen.insert((ann.start, ann.end)) {
            continue;
        }

        // Both offsets are non-negative here.
        kept.push(Annotation {
            start: ann.start as usize,
            end: ann.end as usize,
            attributes: ann.attributes,
        });
    }

    kept.sort_by_key(|a| a.start);
    kept
}

/// Merge overlapping annotations of a list sorted by start.
///
/// An annotation merges into the previous one when it starts strictly
/// before the previous end; adjacent spans stay separate. On attribute key
/// collisions the earlier annotation's value is kept.
#[must_use]
pub fn merge_overlapping(annotations: Vec<Annotation>) -> Vec<Annotation> {
    let mut merged: Vec<Annotation> = Vec::with_capacity(annotations.len());

    for current in annotations {
        match merged.last_mut() {
            Some(prev) if current.start < prev.end => {
                prev.end = prev.end.max(current.end);
                for (key, value) in current.attributes {
                    prev.attributes.entry(key).or_insert(value);
                }
            }
            _ => merged.push(current),
        }
    }

    merged
}
