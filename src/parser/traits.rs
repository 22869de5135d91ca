//! Parser trait definition

#[cfg(test)]
use mockall::automock;

use crate::parser::types::RetractionRange;

/// Trait for extracting retractions from a module descriptor
#[cfg_attr(test, automock)]
pub trait ManifestParser: Send + Sync {
    /// Parse the descriptor and return every retracted range it declares
    fn parse_retractions(&self, content: &[u8]) -> Result<Vec<RetractionRange>, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The descriptor is not UTF-8
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// Invalid syntax in the file
    #[error("Invalid syntax at line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },
}
