//! Core data types for the parser.
//!
//! Raw types mirror one line of the S2ORC corpus as it arrives. Output types
//! form the hierarchical document emitted per record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw corpus record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Semantic Scholar corpus identifier.
    pub corpusid: i64,

    /// External identifiers (DOI, ArXiv, MAG, ...).
    #[serde(default)]
    pub externalids: BTreeMap<String, Option<String>>,

    /// Full text and annotations.
    pub content: RawContent,
}

/// Text and annotation spans of a raw record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    /// Full paper text; `None` is treated as empty text.
    #[serde(default)]
    pub text: Option<String>,

    /// Annotations keyed by category name.
    #[serde(default)]
    pub annotations: BTreeMap<String, Option<RawAnnotations>>,
}

/// A raw annotation collection for one category.
///
/// A missing collection is represented as `None` by the surrounding map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnnotations {
    /// A list that is already structured.
    Structured(Vec<RawAnnotation>),

    /// A list encoded as JSON text.
    Encoded(String),

    /// Anything else: a list with malformed entries, a number, an object.
    ///
    /// Kept so that one damaged category never fails the whole record.
    Malformed(Value),
}

impl From<&[Annotation]> for RawAnnotations {
    fn from(annotations: &[Annotation]) -> Self {
        Self::Structured(annotations.iter().map(RawAnnotation::from).collect())
    }
}

/// A single raw annotation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnnotation {
    #[serde(default)]
    pub start: Option<RawOffset>,

    #[serde(default)]
    pub end: Option<RawOffset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Value>>,
}

impl From<&Annotation> for RawAnnotation {
    fn from(annotation: &Annotation) -> Self {
        let attributes = if annotation.attributes.is_empty() {
            None
        } else {
            Some(
                annotation
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )
        };

        Self {
            start: Some(RawOffset::Integer(annotation.start as i64)),
            end: Some(RawOffset::Integer(annotation.end as i64)),
            attributes,
        }
    }
}

/// A span offset as found in the corpus: numeric or numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOffset {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl RawOffset {
    /// Coerce to an integer offset.
    ///
    /// # Examples
    /// ```
    /// use s2orc_parser::types::RawOffset;
    ///
    /// assert_eq!(RawOffset::Text(" 12 ".to_string()).to_integer(), Some(12));
    /// assert_eq!(RawOffset::Float(3.0).to_integer(), Some(3));
    /// assert_eq!(RawOffset::Float(3.5).to_integer(), None);
    /// ```
    #[must_use]
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

/// Render an attribute value as text; `null` has no text.
#[must_use]
pub fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A sanitized annotation within one category.
///
/// Offsets count characters of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    pub attributes: BTreeMap<String, String>,
}

impl Annotation {
    /// Create an annotation without attributes.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute, treating empty values as absent.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// A character range of the source text together with the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Kind of in-text pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Bibref,
    Figureref,
    Tableref,
    Formula,
}

impl RefType {
    /// All reference kinds, in the order their categories are collected.
    pub const ALL: [RefType; 4] = [
        RefType::Bibref,
        RefType::Figureref,
        RefType::Tableref,
        RefType::Formula,
    ];

    /// Annotation category holding references of this kind.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Bibref => "bibref",
            Self::Figureref => "figureref",
            Self::Tableref => "tableref",
            Self::Formula => "formula",
        }
    }
}

/// A cross-reference attached to a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub ref_id: Option<String>,
    pub ref_type: RefType,
    pub start: usize,
    pub end: usize,
    pub text: String,

    /// Offset of `start` from the paragraph start.
    pub relative_start: usize,

    /// Offset of `end` from the paragraph start.
    pub relative_end: usize,
}

/// A body paragraph and the references it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub refs: Vec<Reference>,
}

/// A document section.
///
/// The synthetic leading section has no header and an empty numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Numbering label such as "2.1", empty when unnumbered.
    pub numbering: String,

    pub header: Option<Span>,

    #[serde(default)]
    pub subsections: Vec<Section>,

    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl Section {
    /// Create a section for a header.
    #[must_use]
    pub fn with_header(numbering: impl Into<String>, header: Span) -> Self {
        Self {
            numbering: numbering.into(),
            header: Some(header),
            subsections: Vec::new(),
            paragraphs: Vec::new(),
        }
    }

    /// Create the synthetic headerless section.
    #[must_use]
    pub fn synthetic() -> Self {
        Self {
            numbering: String::new(),
            header: None,
            subsections: Vec::new(),
            paragraphs: Vec::new(),
        }
    }

    /// This section followed by all its descendants, in document order.
    #[must_use]
    pub fn sections_flat(&self) -> Vec<&Section> {
        flatten(std::slice::from_ref(self))
    }
}

/// A referenced figure, table or formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedItem {
    pub ref_id: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographyEntry {
    pub ref_id: String,
    pub text: String,
    pub start: usize,
    pub end: usize,

    /// Corpus id of the matched paper, if the entry was linked.
    pub corpusid: Option<i64>,

    /// Remaining attributes of the entry.
    pub externalids: BTreeMap<String, String>,
}

/// The hierarchical document built from one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub corpusid: i64,
    pub externalids: BTreeMap<String, Option<String>>,
    pub title: Option<Span>,

    #[serde(rename = "abstract")]
    pub abstract_: Option<Span>,

    /// Top-level sections.
    pub sections: Vec<Section>,

    pub bibliography: BTreeMap<String, BibliographyEntry>,
    pub figures: BTreeMap<String, ReferencedItem>,
    pub tables: BTreeMap<String, ReferencedItem>,
    pub formulas: BTreeMap<String, ReferencedItem>,

    /// Non-fatal problems met while building (not serialized).
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Document {
    /// All sections at any depth, in document order.
    #[must_use]
    pub fn sections_flat(&self) -> Vec<&Section> {
        flatten(&self.sections)
    }

    /// All paragraphs at any depth, in document order.
    #[must_use]
    pub fn paragraphs_flat(&self) -> Vec<&Paragraph> {
        self.sections_flat()
            .into_iter()
            .flat_map(|s| s.paragraphs.iter())
            .collect()
    }
}

/// Pre-order walk over a section forest without recursion.
fn flatten(roots: &[Section]) -> Vec<&Section> {
    let mut out = Vec::new();
    let mut stack: Vec<&Section> = roots.iter().rev().collect();

    while let Some(section) = stack.pop() {
        out.push(section);
        stack.extend(section.subsections.iter().rev());
    }

    out
}
