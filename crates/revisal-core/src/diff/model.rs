use serde::{Deserialize, Serialize};

/// Structured old/new pair of raw values for one field
///
/// A side absent from its contents appears as `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// Aggregate line-change statistics across all diffed fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffStatistics {
    pub inserted: usize,
    pub deleted: usize,
    pub unmodified: usize,
    /// Sum of per-field changed ratios (1.0 = a fully replaced field)
    pub changed_ratio: f64,
}

impl DiffStatistics {
    /// Accumulate another field's statistics into this aggregate
    pub fn absorb(&mut self, other: &DiffStatistics) {
        self.inserted += other.inserted;
        self.deleted += other.deleted;
        self.unmodified += other.unmodified;
        self.changed_ratio += other.changed_ratio;
    }
}

/// Rendered output flavor for per-field diffs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderFlavor {
    /// Unified text diff (`@@` hunks)
    Unified,
    /// Contextual text diff (`***`/`---` sections)
    Context,
    /// JSON-encoded hunk structure
    JsonText,
    /// Combined HTML table (removals and insertions interleaved)
    Combined,
    /// Inline HTML with `<del>`/`<ins>` markers
    Inline,
    /// JSON-encoded hunk structure with HTML-escaped contents
    JsonHtml,
    /// Two-column HTML table
    SideBySide,
}

impl RenderFlavor {
    /// Output for a field whose two sides are equal
    pub fn empty_output(&self) -> &'static str {
        match self {
            RenderFlavor::JsonHtml => "[]",
            _ => "",
        }
    }
}

/// Options forwarded to the line differ and preprocessing
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    /// Context lines around each hunk
    pub context_lines: usize,
    /// Strip structural markup tags from string values before diffing
    pub strip_tags: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            strip_tags: false,
        }
    }
}
