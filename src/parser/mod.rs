//! DOI parsing for command arguments and scanned PDF text.

mod doi;
mod error;

pub use doi::{DoiExtractionResult, DoiMatch, extract_dois, parse_doi};
pub use error::ParseError;
