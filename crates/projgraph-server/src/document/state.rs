use projgraph_core::{Location, NormalizedPath, ProjectError, Result};
use serde::Deserialize;

/// Canonical record of a tracked source path.
///
/// A document exists from its first reference (open, or discovery through
/// reference resolution) until it is neither open nor owned by any project.
/// Owner projects are not stored here; see `project::MembershipIndex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: NormalizedPath,
    content: String,
    version: u32,
    open: bool,
}

impl Document {
    /// Creates a closed document at version 1.
    pub fn new(path: NormalizedPath, content: String) -> Self {
        Self {
            path,
            content,
            version: 1,
            open: false,
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Replaces content and bumps the version. Returns false when the
    /// content is unchanged, in which case nothing is modified. A document
    /// already at `u32::MAX` cannot take another implicit bump.
    pub(crate) fn replace_content(&mut self, content: String) -> Result<bool> {
        if self.content == content {
            return Ok(false);
        }
        let next = self
            .version
            .checked_add(1)
            .ok_or_else(|| ProjectError::VersionOrderingViolation {
                path: self.path.to_string(),
                current: self.version,
                attempted: self.version,
            })?;
        self.content = content;
        self.version = next;
        Ok(true)
    }

    /// Applies an edit carrying an explicit version.
    pub(crate) fn apply_edit(&mut self, change: &TextChange, version: u32) -> Result<()> {
        if version <= self.version {
            return Err(ProjectError::VersionOrderingViolation {
                path: self.path.to_string(),
                current: self.version,
                attempted: version,
            });
        }
        let updated = change.apply(&self.path, &self.content)?;
        self.content = updated;
        self.version = version;
        Ok(())
    }
}

/// A content change sent by the editor.
///
/// Positions are one-based line/offset pairs, offsets counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TextChange {
    /// Replaces the whole text.
    Full { text: String },
    /// Replaces the half-open span `start..end`.
    Range {
        start: Location,
        end: Location,
        text: String,
    },
}

impl TextChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self::Full { text: text.into() }
    }

    pub fn range(start: Location, end: Location, text: impl Into<String>) -> Self {
        Self::Range {
            start,
            end,
            text: text.into(),
        }
    }

    /// Produces the edited text, or [`ProjectError::InvalidEdit`] when a
    /// position lies outside `content`.
    pub fn apply(&self, path: &NormalizedPath, content: &str) -> Result<String> {
        match self {
            Self::Full { text } => Ok(text.clone()),
            Self::Range { start, end, text } => {
                let invalid = |reason: String| ProjectError::InvalidEdit {
                    path: path.to_string(),
                    reason,
                };
                let from = byte_offset(content, *start).ok_or_else(|| {
                    invalid(format!("start {}:{} out of range", start.line, start.offset))
                })?;
                let to = byte_offset(content, *end).ok_or_else(|| {
                    invalid(format!("end {}:{} out of range", end.line, end.offset))
                })?;
                if to < from {
                    return Err(invalid("end precedes start".into()));
                }

                let mut updated = String::with_capacity(content.len() - (to - from) + text.len());
                updated.push_str(&content[..from]);
                updated.push_str(text);
                updated.push_str(&content[to..]);
                Ok(updated)
            }
        }
    }
}

/// Converts a one-based position into a byte index of `text`.
fn byte_offset(text: &str, at: Location) -> Option<usize> {
    if at.line == 0 || at.offset == 0 {
        return None;
    }

    let mut line_start = 0;
    for _ in 1..at.line {
        let newline = text[line_start..].find('\n')?;
        line_start += newline + 1;
    }
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |i| line_start + i);
    let line = &text[line_start..line_end];

    let column = (at.offset - 1) as usize;
    if column == line.chars().count() {
        return Some(line_end);
    }
    line.char_indices().nth(column).map(|(i, _)| line_start + i)
}
