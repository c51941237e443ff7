//! Per-field diff assembly over two versions.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use super::model::{DiffOptions, DiffStatistics, FieldDiff, RenderFlavor};
use super::render;
use crate::contents::Contents;
use crate::model::Version;
use crate::strategy::VersionStrategy;

/// A computed difference between two versions of one owner
///
/// Construction canonicalizes direction: the chronologically earlier version
/// plays the "old" role regardless of argument order, so `diff(a, b)` and
/// `diff(b, a)` assign old/new identically.
#[derive(Debug, Clone)]
pub struct Diff {
    new_version: Version,
    old_version: Version,
    strategy: VersionStrategy,
    previous_of_new: Vec<Version>,
    options: DiffOptions,
}

impl Diff {
    /// Build a diff between `new_version` and `old_version`
    ///
    /// `chain` is the owner's live chain in chain order; it supplies the
    /// predecessor contents that DIFF-mode comparisons are synthesized from.
    pub fn new(
        new_version: Version,
        old_version: Version,
        chain: &[Version],
        strategy: VersionStrategy,
        options: DiffOptions,
    ) -> Self {
        let (old_version, new_version) = if new_version.chain_cmp(&old_version) == Ordering::Less {
            (new_version, old_version)
        } else {
            (old_version, new_version)
        };

        let previous_of_new: Vec<Version> = chain
            .iter()
            .filter(|v| v.chain_cmp(&new_version) == Ordering::Less)
            .cloned()
            .collect();

        Self {
            new_version,
            old_version,
            strategy,
            previous_of_new,
            options,
        }
    }

    /// The version playing the "new" role after canonicalization
    pub fn new_version(&self) -> &Version {
        &self.new_version
    }

    /// The version playing the "old" role after canonicalization
    pub fn old_version(&self) -> &Version {
        &self.old_version
    }

    /// Assemble the old/new content pair per the owner's capture mode
    ///
    /// SNAPSHOT comparisons use each version's contents directly. DIFF
    /// comparisons synthesize the old side by overlaying every version
    /// strictly before the new one, oldest first (the same accumulation
    /// order the revert engine replays in), filtered down to the keys the
    /// new version touches.
    pub fn contents_pair(&self) -> (Contents, Contents) {
        let new_contents = self.new_version.contents.clone();

        let old_contents = match self.strategy {
            VersionStrategy::Snapshot => self.old_version.contents.clone(),
            VersionStrategy::Diff => {
                let mut merged = Contents::new();
                for version in &self.previous_of_new {
                    merged.merge(&version.contents);
                }
                let keys: Vec<String> = new_contents.keys().cloned().collect();
                merged.only(&keys)
            }
        };

        if self.options.strip_tags {
            (strip_contents(&old_contents), strip_contents(&new_contents))
        } else {
            (old_contents, new_contents)
        }
    }

    /// Structured per-field raw-value pairs
    ///
    /// Every old-side key and every new-only key appears; a side missing a
    /// key contributes `Value::Null`.
    pub fn to_field_diffs(&self) -> BTreeMap<String, FieldDiff> {
        let (old_contents, new_contents) = self.contents_pair();
        let mut out = BTreeMap::new();

        for (key, old_value) in old_contents.iter() {
            out.insert(
                key.clone(),
                FieldDiff {
                    old: old_value.clone(),
                    new: new_contents.get(key).cloned().unwrap_or(Value::Null),
                },
            );
        }
        for (key, new_value) in new_contents.iter() {
            if !old_contents.contains_key(key) {
                out.insert(
                    key.clone(),
                    FieldDiff {
                        old: Value::Null,
                        new: new_value.clone(),
                    },
                );
            }
        }

        out
    }

    /// Render every field in the given flavor
    ///
    /// Equal sides produce the flavor's empty output. Non-string values are
    /// serialized with the stable JSON encoding before line diffing.
    pub fn render(&self, flavor: RenderFlavor) -> BTreeMap<String, String> {
        let (old_contents, new_contents) = self.contents_pair();
        let mut out = BTreeMap::new();

        for (key, old_value) in old_contents.iter() {
            let new_value = new_contents.get(key).cloned().unwrap_or(Value::Null);
            out.insert(key.clone(), self.render_field(flavor, old_value, &new_value));
        }
        for (key, new_value) in new_contents.iter() {
            if !old_contents.contains_key(key) {
                out.insert(key.clone(), self.render_field(flavor, &Value::Null, new_value));
            }
        }

        out
    }

    fn render_field(&self, flavor: RenderFlavor, old: &Value, new: &Value) -> String {
        let old_text = value_to_text(old);
        let new_text = value_to_text(new);
        if old_text == new_text {
            return flavor.empty_output().to_string();
        }
        render::render(flavor, &old_text, &new_text, &self.options)
    }

    /// Unified text rendering
    pub fn to_text(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::Unified)
    }

    /// Contextual text rendering
    pub fn to_context_text(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::Context)
    }

    /// JSON-structured text rendering
    pub fn to_json_text(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::JsonText)
    }

    /// Combined HTML rendering
    pub fn to_html(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::Combined)
    }

    /// Inline HTML rendering
    pub fn to_inline_html(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::Inline)
    }

    /// JSON-structured HTML rendering
    pub fn to_json_html(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::JsonHtml)
    }

    /// Side-by-side HTML rendering
    pub fn to_side_by_side_html(&self) -> BTreeMap<String, String> {
        self.render(RenderFlavor::SideBySide)
    }

    /// Aggregate line statistics across all fields of the new contents
    ///
    /// A key absent from the old side counts as fully inserted: one line per
    /// newline-separated segment of a string value, exactly one line for a
    /// non-string. Equal values contribute nothing.
    pub fn statistics(&self) -> DiffStatistics {
        let (old_contents, new_contents) = self.contents_pair();
        let mut total = DiffStatistics::default();

        for (key, new_value) in new_contents.iter() {
            match old_contents.get(key) {
                None => {
                    let inserted = match new_value {
                        Value::String(s) => s.matches('\n').count() + 1,
                        _ => 1,
                    };
                    total.absorb(&DiffStatistics {
                        inserted,
                        deleted: 0,
                        unmodified: 0,
                        changed_ratio: 1.0,
                    });
                }
                Some(old_value) if old_value != new_value => {
                    total.absorb(&render::line_statistics(
                        &value_to_text(old_value),
                        &value_to_text(new_value),
                    ));
                }
                Some(_) => {}
            }
        }

        total
    }
}

/// Text form fed to the line differ: strings pass through, everything else
/// is serialized with the stable JSON encoding
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Remove structural markup tags from string values; non-strings untouched
fn strip_contents(contents: &Contents) -> Contents {
    contents
        .iter()
        .map(|(key, value)| {
            let stripped = match value {
                Value::String(s) => Value::String(strip_tags(s)),
                other => other.clone(),
            };
            (key.clone(), stripped)
        })
        .collect()
}

/// Drop `<...>` tag spans from a string, keeping the text between them
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
