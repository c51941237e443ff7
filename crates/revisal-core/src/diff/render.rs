//! Line-diff renderers over the injected diff algorithm.
//!
//! All flavors run the patience algorithm from `similar` and differ only in
//! how hunks are serialized. Inputs are already text at this point; the
//! engine serializes non-string values before calling in.

use serde::Serialize;
use similar::{Algorithm, ChangeTag, TextDiff};

use super::model::{DiffOptions, DiffStatistics, RenderFlavor};

/// Change classification for a rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum LineTag {
    Context,
    Removed,
    Added,
}

/// A rendered line within a hunk
#[derive(Debug, Clone, Serialize)]
struct HunkLine {
    tag: LineTag,
    content: String,
}

/// A contiguous group of changes with surrounding context
#[derive(Debug, Clone, Serialize)]
struct Hunk {
    old_start: usize,
    old_count: usize,
    new_start: usize,
    new_count: usize,
    lines: Vec<HunkLine>,
}

fn text_diff<'a>(old: &'a str, new: &'a str) -> TextDiff<'a, 'a, 'a, str> {
    TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new)
}

/// Extract hunks with `context` lines of surrounding context
fn hunks(old: &str, new: &str, context: usize) -> Vec<Hunk> {
    let diff = text_diff(old, new);
    let mut out = Vec::new();

    for group in diff.grouped_ops(context) {
        let Some(first) = group.first() else {
            continue;
        };
        let old_range = first.old_range();
        let new_range = first.new_range();
        let last = group.last().unwrap_or(first);

        let mut lines = Vec::new();
        for op in &group {
            for change in diff.iter_changes(op) {
                let tag = match change.tag() {
                    ChangeTag::Equal => LineTag::Context,
                    ChangeTag::Delete => LineTag::Removed,
                    ChangeTag::Insert => LineTag::Added,
                };
                lines.push(HunkLine {
                    tag,
                    content: change.value().trim_end_matches('\n').to_string(),
                });
            }
        }

        out.push(Hunk {
            old_start: old_range.start + 1,
            old_count: last.old_range().end - old_range.start,
            new_start: new_range.start + 1,
            new_count: last.new_range().end - new_range.start,
            lines,
        });
    }

    out
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a single field's diff in the requested flavor
pub(crate) fn render(flavor: RenderFlavor, old: &str, new: &str, options: &DiffOptions) -> String {
    match flavor {
        RenderFlavor::Unified => render_unified(old, new, options),
        RenderFlavor::Context => render_context(old, new, options),
        RenderFlavor::JsonText => render_json(old, new, options, false),
        RenderFlavor::JsonHtml => render_json(old, new, options, true),
        RenderFlavor::Combined => render_combined(old, new, options),
        RenderFlavor::Inline => render_inline(old, new, options),
        RenderFlavor::SideBySide => render_side_by_side(old, new, options),
    }
}

fn render_unified(old: &str, new: &str, options: &DiffOptions) -> String {
    text_diff(old, new)
        .unified_diff()
        .context_radius(options.context_lines)
        .missing_newline_hint(false)
        .to_string()
}

fn render_context(old: &str, new: &str, options: &DiffOptions) -> String {
    let mut out = String::new();
    for hunk in hunks(old, new, options.context_lines) {
        out.push_str("***************\n");
        out.push_str(&format!(
            "*** {},{} ****\n",
            hunk.old_start,
            hunk.old_start + hunk.old_count.saturating_sub(1)
        ));
        for line in &hunk.lines {
            match line.tag {
                LineTag::Context => out.push_str(&format!("  {}\n", line.content)),
                LineTag::Removed => out.push_str(&format!("- {}\n", line.content)),
                LineTag::Added => {}
            }
        }
        out.push_str(&format!(
            "--- {},{} ----\n",
            hunk.new_start,
            hunk.new_start + hunk.new_count.saturating_sub(1)
        ));
        for line in &hunk.lines {
            match line.tag {
                LineTag::Context => out.push_str(&format!("  {}\n", line.content)),
                LineTag::Added => out.push_str(&format!("+ {}\n", line.content)),
                LineTag::Removed => {}
            }
        }
    }
    out
}

fn render_json(old: &str, new: &str, options: &DiffOptions, escape: bool) -> String {
    let mut hunks = hunks(old, new, options.context_lines);
    if escape {
        for hunk in &mut hunks {
            for line in &mut hunk.lines {
                line.content = html_escape(&line.content);
            }
        }
    }
    serde_json::to_string(&hunks).unwrap_or_else(|_| "[]".to_string())
}

fn render_combined(old: &str, new: &str, options: &DiffOptions) -> String {
    let mut out = String::from("<table class=\"diff diff-combined\">\n");
    for hunk in hunks(old, new, options.context_lines) {
        out.push_str(&format!(
            "<tbody><tr class=\"hunk\"><th>@@ -{},{} +{},{} @@</th></tr>\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for line in &hunk.lines {
            let row = match line.tag {
                LineTag::Context => format!("<tr><td>{}</td></tr>\n", html_escape(&line.content)),
                LineTag::Removed => format!(
                    "<tr class=\"del\"><td><del>{}</del></td></tr>\n",
                    html_escape(&line.content)
                ),
                LineTag::Added => format!(
                    "<tr class=\"ins\"><td><ins>{}</ins></td></tr>\n",
                    html_escape(&line.content)
                ),
            };
            out.push_str(&row);
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>");
    out
}

fn render_inline(old: &str, new: &str, options: &DiffOptions) -> String {
    let mut out = String::from("<table class=\"diff diff-inline\">\n");
    for hunk in hunks(old, new, options.context_lines) {
        for line in &hunk.lines {
            let row = match line.tag {
                LineTag::Context => format!("<tr><td>{}</td></tr>\n", html_escape(&line.content)),
                LineTag::Removed => format!(
                    "<tr class=\"del\"><td><del>{}</del></td></tr>\n",
                    html_escape(&line.content)
                ),
                LineTag::Added => format!(
                    "<tr class=\"ins\"><td><ins>{}</ins></td></tr>\n",
                    html_escape(&line.content)
                ),
            };
            out.push_str(&row);
        }
    }
    out.push_str("</table>");
    out
}

fn render_side_by_side(old: &str, new: &str, options: &DiffOptions) -> String {
    let mut out = String::from("<table class=\"diff diff-side-by-side\">\n");
    for hunk in hunks(old, new, options.context_lines) {
        for line in &hunk.lines {
            let row = match line.tag {
                LineTag::Context => format!(
                    "<tr><td>{0}</td><td>{0}</td></tr>\n",
                    html_escape(&line.content)
                ),
                LineTag::Removed => format!(
                    "<tr><td class=\"del\"><del>{}</del></td><td></td></tr>\n",
                    html_escape(&line.content)
                ),
                LineTag::Added => format!(
                    "<tr><td></td><td class=\"ins\"><ins>{}</ins></td></tr>\n",
                    html_escape(&line.content)
                ),
            };
            out.push_str(&row);
        }
    }
    out.push_str("</table>");
    out
}

/// Line-level statistics for one field
///
/// The changed ratio is 1.0 minus the differ's similarity ratio, so a fully
/// replaced value contributes 1.0.
pub(crate) fn line_statistics(old: &str, new: &str) -> DiffStatistics {
    let diff = text_diff(old, new);
    let mut stats = DiffStatistics::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.inserted += 1,
            ChangeTag::Delete => stats.deleted += 1,
            ChangeTag::Equal => stats.unmodified += 1,
        }
    }
    stats.changed_ratio = 1.0 - f64::from(diff.ratio());
    stats
}
