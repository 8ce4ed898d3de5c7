//! bibfetch Core Library
//!
//! Fetches BibTeX records by DOI from Crossref and rewrites them into a
//! consistent shape: citation keys of the form
//! `{journal acronym}_{volume}_{year}_{surname}`, abbreviated journal names,
//! cleaned titles, and keys that are unique within a batch.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`bibtex`] - BibTeX parsing and serialization
//! - [`normalize`] - Citation keys, title cleanup, key de-duplication (no I/O)
//! - [`parser`] - DOI detection and validation
//! - [`resolver`] - Crossref and journal abbreviation clients
//! - [`cache`] - SQLite-backed HTTP response cache
//! - [`pipeline`] - Sequential fetch-and-normalize flows
//! - [`pdf`] - DOI extraction from PDF files (feature `pdf`)
//! - [`rename`] - Renaming PDFs after their citation keys
//! - [`duplicates`] - Duplicate detection across BibTeX files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bibtex;
pub mod cache;
pub mod duplicates;
pub mod normalize;
pub mod parser;
pub mod pdf;
pub mod pipeline;
pub mod rename;
pub mod resolver;
mod user_agent;

// Re-export commonly used types
pub use bibtex::{BibEntry, Bibliography, parse_bibliography, write_bibliography};
pub use cache::{CacheError, ResponseCache, resolve_default_cache_path};
pub use duplicates::{DuplicateGroup, DuplicateReason, LocatedEntry, find_duplicates};
pub use normalize::{Normalizer, RecordOutcome, TracingSink};
pub use parser::{ParseError, parse_doi};
pub use pdf::{PdfDoiExtractor, PdfError, PdfSupport};
pub use pipeline::{Pipeline, PipelineError};
pub use rename::{RenamePlan, confirm_and_rename};
pub use resolver::{
    AbbrevisoClient, BibliographySource, CrossrefClient, FetchError, HttpFetcher, Lookup,
};
