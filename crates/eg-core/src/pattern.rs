//! Pattern Compiler
//!
//! Turns raw user input into a compiled [`Pattern`]. Flags are fixed:
//! every match is found (global), matching ignores case, and `^`/`$` match at
//! line boundaries (multiline). `.` does not match `\n`. Look-around and
//! backreferences are supported.

use std::fmt;
use std::ops::Range;

use fancy_regex::Regex;
use log::warn;

/// Inline flags prepended to every pattern: case-insensitive, multiline.
const FLAGS: &str = "(?im)";

/// Error type for pattern compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid pattern '{pattern}': {message}")]
    Invalid { pattern: String, message: String },
}

/// A compiled search pattern.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// The raw input this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte ranges of every non-overlapping, non-empty match in `text`, left to right.
    ///
    /// Zero-width matches are dropped since a marker must wrap at least one character.
    /// A match that exceeds the backtracking limit ends the scan of `text`; the
    /// matches found before it are kept.
    pub fn find_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        for found in self.regex.find_iter(text) {
            match found {
                Ok(m) if m.start() < m.end() => ranges.push(m.range()),
                Ok(_) => {}
                Err(e) => {
                    warn!("pattern '{}' gave up on a text node: {}", self.source, e);
                    break;
                }
            }
        }
        ranges
    }

    /// Number of matches `find_ranges` would report.
    pub fn count(&self, text: &str) -> usize {
        self.find_ranges(text).len()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern").field("source", &self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

/// Compile raw input into a pattern.
///
/// Empty (or whitespace-only) input yields `Ok(None)` without touching the regex engine.
pub fn compile(raw: &str) -> Result<Option<Pattern>, PatternError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let regex = Regex::new(&format!("{}{}", FLAGS, raw)).map_err(|e| PatternError::Invalid {
        pattern: raw.to_string(),
        message: e.to_string(),
    })?;

    Ok(Some(Pattern {
        source: raw.to_string(),
        regex,
    }))
}
