//! S2ORC Parser - Turn flat annotated full-text records into hierarchical documents.
//!
//! A corpus record carries a paper's full text plus flat, possibly
//! overlapping annotation spans per category. This crate sanitizes those
//! spans and rebuilds the document: titled sections nested by their
//! numbering, paragraphs with their in-text references, and indexes of the
//! bibliography, figures, tables and formulas.
//!
//! # Example
//!
//! ```
//! use s2orc_parser::{build_document, RawRecord};
//!
//! let record: RawRecord = serde_json::from_str(
//!     r#"{"corpusid": 1, "externalids": {},
//!         "content": {"text": "Hello world.",
//!                     "annotations": {"paragraph": [{"start": 0, "end": 12}]}}}"#,
//! )
//! .unwrap();
//!
//! let document = build_document(&record).unwrap();
//! assert_eq!(document.paragraphs_flat()[0].text, "Hello world.");
//! ```
//!
//! # Architecture
//!
//! The parser is organized into several modules:
//!
//! - [`config`]: Category names, attribute keys and batch settings
//! - [`types`]: Raw input records and the output document model
//! - [`error`]: Error types and Result alias
//! - [`text`]: Character-offset slicing of the source text
//! - [`sanitize`]: Annotation normalization, filtering and merging
//! - [`references`]: Bibliography, figure, table and formula indexes
//! - [`paragraphs`]: Paragraph assembly and reference attachment
//! - [`sections`]: Section assignment, filtering and nesting
//! - [`document`]: The end-to-end document builder
//! - [`schema`]: JSON schema validation of built documents
//! - [`batch`]: Parallel JSONL batch driver
//! - [`cli`]: Command-line interface

pub mod batch;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod paragraphs;
pub mod references;
pub mod sanitize;
pub mod schema;
pub mod sections;
pub mod text;
pub mod types;

// Re-export main functions
pub use batch::{process_bytes, process_line, run_batch, BatchRunner, BatchStats, LineOutcome};
pub use document::build_document;

// Re-export commonly used items
pub use config::BatchConfig;
pub use error::{ParserError, Result};
pub use schema::SchemaValidator;
pub use types::{
    BibliographyEntry, Document, Paragraph, RawRecord, RefType, Reference, ReferencedItem,
    Section, Span,
};
