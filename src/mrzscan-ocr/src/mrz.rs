//! MRZ isolation from raw recognizer output
//!
//! MRZ lines all share one fixed width (44 characters on passports). Text
//! recognized above the zone rarely lands on exactly that width, so the
//! trailing run of lines as long as the last line is taken as the MRZ,
//! without knowing the document's line count or width in advance.

use serde::Serialize;
use std::fmt;

/// Candidate MRZ block: zero or more lines of identical length
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MrzText {
    lines: Vec<String>,
}

impl MrzText {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Character count shared by every line
    pub fn line_length(&self) -> Option<usize> {
        self.lines.first().map(|line| line.chars().count())
    }
}

impl fmt::Display for MrzText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Keep the trailing run of lines whose length equals the last line's
///
/// Empty input, or input whose last line is empty, yields an empty block.
pub fn extract_mrz(raw: &str) -> MrzText {
    let lines: Vec<&str> = raw.split('\n').collect();
    let mrz_length = lines.last().map(|line| line.chars().count()).unwrap_or(0);
    if mrz_length == 0 {
        return MrzText::default();
    }

    let run = lines
        .iter()
        .rev()
        .take_while(|line| line.chars().count() == mrz_length)
        .count();

    MrzText {
        lines: lines[lines.len() - run..]
            .iter()
            .map(|line| line.to_string())
            .collect(),
    }
}
