//! Configuration constants and settings for the parser.

use regex::Regex;
use std::sync::LazyLock;

/// Annotation category holding the paper title.
pub const TITLE: &str = "title";

/// Annotation category holding the abstract.
pub const ABSTRACT: &str = "abstract";

/// Annotation category holding body paragraphs.
pub const PARAGRAPH: &str = "paragraph";

/// Annotation category holding section headers.
pub const SECTION_HEADER: &str = "sectionheader";

/// Annotation category holding bibliography entries.
pub const BIB_ENTRY: &str = "bibentry";

/// Annotation category holding formulas.
pub const FORMULA: &str = "formula";

/// Annotation category holding figures and tables.
pub const FIGURE: &str = "figure";

/// Attribute naming a section's numbering label (e.g. "2.1").
pub const ATTR_NUMBERING: &str = "n";

/// Attribute carrying the identifier of a referenced item.
pub const ATTR_ID: &str = "id";

/// Attribute carrying the identifier a reference points to.
pub const ATTR_REF_ID: &str = "ref_id";

/// Attribute linking a bibliography entry to a corpus paper.
pub const ATTR_MATCHED_PAPER_ID: &str = "matched_paper_id";

/// Attribute distinguishing tables from figures in the `figure` category.
pub const ATTR_TYPE: &str = "type";

/// Prefix of identifiers minted for items without an explicit id.
pub const UNREF_PREFIX: &str = "unref_";

/// Categories whose spans must never be treated as, or overlap, a section.
pub const NONSECTION_CATEGORIES: &[&str] = &[
    "title",
    "abstract",
    "publisher",
    "venue",
    "author",
    "authoraffiliation",
    "authorfirstname",
    "authorlastname",
    "bibauthor",
    "bibauthorfirstname",
    "bibauthorlastname",
    "bibentry",
    "bibtitle",
    "bibvenue",
    "figure",
    "figurecaption",
    "table",
];

/// Number of raw lines handed to the worker pool at once.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Numbering labels made of dot-separated integers, optionally dot-terminated.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NUMBERING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*\.?$").expect("valid regex"));

/// Check whether a numbering label is well-formed.
///
/// Malformed labels are still used for nesting, compared as opaque text.
///
/// # Examples
/// ```
/// use s2orc_parser::config::is_well_formed_numbering;
///
/// assert!(is_well_formed_numbering("2.1.3"));
/// assert!(is_well_formed_numbering("4."));
/// assert!(!is_well_formed_numbering("A.1"));
/// ```
#[must_use]
pub fn is_well_formed_numbering(numbering: &str) -> bool {
    NUMBERING_PATTERN.is_match(numbering)
}

/// Settings for the batch driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Worker threads; `None` uses one per available core.
    pub workers: Option<usize>,

    /// Lines processed per parallel chunk.
    pub chunk_size: usize,

    /// Whether every document is checked against the schema before writing.
    pub validate: bool,
}

impl BatchConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            validate: true,
        }
    }

    /// Create a configuration from `S2ORC_WORKERS` and `S2ORC_CHUNK_SIZE`.
    ///
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let workers = std::env::var("S2ORC_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0);

        let chunk_size = std::env::var("S2ORC_CHUNK_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_CHUNK_SIZE);

        Self {
            workers,
            chunk_size,
            validate: true,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new()
    }
}
