//! go.mod retraction parser
//!
//! Extracts `retract` directives from go.mod files. Other directives are skipped.
//!
//! Format examples:
//! - Single: `retract v1.0.1 // published by mistake`
//! - Range: `retract [v1.0.0, v1.2.0]`
//! - Block:
//!   ```text
//!   retract (
//!       v1.0.1
//!       [v1.1.0, v1.1.5] // broken build
//!   )
//!   ```

use regex::Regex;

use crate::parser::traits::{ManifestParser, ParseError};
use crate::parser::types::RetractionRange;
use crate::version::semver::is_valid;

/// Parser for go.mod files
pub struct GoModParser {
    /// Regex for single-line retract: `retract <version or interval>`
    single_retract_re: Regex,
    /// Regex for retract block start: `retract (`
    block_start_re: Regex,
    /// Regex for any other block start, e.g. `require (`
    other_block_re: Regex,
    /// Regex for a version interval: `[low, high]`
    range_re: Regex,
}

impl GoModParser {
    pub fn new() -> Self {
        Self {
            single_retract_re: Regex::new(r"^retract\s+([^(\s].*)$").unwrap(),
            block_start_re: Regex::new(r"^retract\s*\(\s*$").unwrap(),
            other_block_re: Regex::new(r"^[A-Za-z]+\s*\(\s*$").unwrap(),
            range_re: Regex::new(r"^\[\s*([^,\s]+)\s*,\s*([^\]\s]+)\s*\]$").unwrap(),
        }
    }

    /// Parse one retraction entry: a version or a `[low, high]` interval.
    fn parse_entry(&self, entry: &str, line: usize) -> Result<RetractionRange, ParseError> {
        let entry = entry.trim();
        if let Some(caps) = self.range_re.captures(entry) {
            let low = check_version(&caps[1], line)?;
            let high = check_version(&caps[2], line)?;
            return Ok(RetractionRange::new(&low, &high));
        }
        if entry.starts_with('[') || entry.contains(char::is_whitespace) {
            return Err(ParseError::InvalidSyntax {
                line,
                message: format!("malformed retraction {:?}", entry),
            });
        }
        let version = check_version(entry, line)?;
        Ok(RetractionRange::single(&version))
    }
}

impl Default for GoModParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestParser for GoModParser {
    fn parse_retractions(&self, content: &[u8]) -> Result<Vec<RetractionRange>, ParseError> {
        let content = std::str::from_utf8(content)?;
        let mut results = Vec::new();
        let mut in_retract_block = false;
        let mut in_other_block = false;
        let mut block_start_line = 0;

        for (line_num, line) in content.lines().enumerate() {
            let line_no = line_num + 1;
            let trimmed = strip_comment(line).trim();

            // Skip empty lines and comments
            if trimmed.is_empty() {
                continue;
            }

            // Check for block end
            if (in_retract_block || in_other_block) && trimmed == ")" {
                in_retract_block = false;
                in_other_block = false;
                continue;
            }

            if in_retract_block {
                results.push(self.parse_entry(trimmed, line_no)?);
                continue;
            }
            if in_other_block {
                continue;
            }

            // Check for block start
            if self.block_start_re.is_match(trimmed) {
                in_retract_block = true;
                block_start_line = line_no;
                continue;
            }
            if self.other_block_re.is_match(trimmed) {
                in_other_block = true;
                block_start_line = line_no;
                continue;
            }

            if let Some(caps) = self.single_retract_re.captures(trimmed) {
                results.push(self.parse_entry(&caps[1], line_no)?);
            } else if trimmed == "retract" {
                return Err(ParseError::InvalidSyntax {
                    line: line_no,
                    message: "retract without version".to_string(),
                });
            }
        }

        if in_retract_block || in_other_block {
            return Err(ParseError::InvalidSyntax {
                line: block_start_line,
                message: "unterminated block".to_string(),
            });
        }

        Ok(results)
    }
}

/// Removes a trailing `//` comment.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Unquotes and validates a version token.
fn check_version(token: &str, line: usize) -> Result<String, ParseError> {
    let version = token.trim_matches('"');
    if !is_valid(version) {
        return Err(ParseError::InvalidSyntax {
            line,
            message: format!("invalid version {:?}", token),
        });
    }
    Ok(version.to_string())
}
