//! Section construction for parsed documents.
//!
//! Paragraphs are grouped under section headers, sections overlapping
//! front matter or back matter are discarded, and the remaining sections
//! are nested by their dot-notation numbering (e.g. "2.1" under "2").

mod assign;
mod filter;
mod nest;

pub use assign::assign_paragraphs_to_sections;
pub use filter::{remove_nonsection_sections, section_range};
pub use nest::{nest_sections, numbering_components};
