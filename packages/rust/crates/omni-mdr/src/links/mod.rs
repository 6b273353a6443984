//! Link extraction from markdown bodies.
//!
//! Two syntaxes are recognized per line:
//! - inline links `[text](target)` to local notes (external URLs skipped)
//! - wiki links `[[target]]` and `[[target|display]]`
//!
//! Lines inside fenced code blocks are skipped unless disabled.

mod outline;
mod preview;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use outline::{Heading, extract_outline, slugify};
pub use preview::{DEFAULT_PREVIEW_CHARS, preview, strip_markdown};

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static MARKDOWN_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[([^\]]+)\]\(([^)]+)\)"));
static WIKI_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]"));

const NOTE_SUFFIX: &str = ".md";

/// Syntax a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// `[text](target)`
    Markdown,
    /// `[[target]]` / `[[target|text]]`
    Wiki,
}

/// One outgoing reference found in a note, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkReference {
    /// Target as written, anchor stripped; wiki targets carry a `.md` suffix.
    pub target_raw: String,
    /// Visible link text.
    pub text: String,
    /// 1-based line number.
    pub line_number: u32,
    /// Whole source line, trimmed.
    pub context_line: String,
    /// Syntax used.
    pub kind: LinkKind,
}

/// Extraction switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Ignore lines inside ``` / ~~~ fenced blocks.
    pub skip_code_fences: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            skip_code_fences: true,
        }
    }
}

/// Extract references with default options.
#[must_use]
pub fn extract_links(text: &str) -> Vec<LinkReference> {
    extract_links_with(text, ExtractOptions::default())
}

/// Extract references in line order, left to right within a line.
#[must_use]
pub fn extract_links_with(text: &str, options: ExtractOptions) -> Vec<LinkReference> {
    let mut out = Vec::new();
    let mut in_code_fence = false;
    for (index, line) in text.split('\n').enumerate() {
        if options.skip_code_fences {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_code_fence = !in_code_fence;
                continue;
            }
            if in_code_fence {
                continue;
            }
        }
        let line_number = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let mut found = scan_line(line);
        found.sort_by_key(|(start, _, _, _)| *start);
        let context_line = line.trim();
        out.extend(
            found
                .into_iter()
                .map(|(_, target_raw, text, kind)| LinkReference {
                    target_raw,
                    text,
                    line_number,
                    context_line: context_line.to_string(),
                    kind,
                }),
        );
    }
    out
}

fn scan_line(line: &str) -> Vec<(usize, String, String, LinkKind)> {
    let mut found = Vec::new();
    for caps in MARKDOWN_LINK_REGEX.captures_iter(line) {
        let (Some(whole), Some(text), Some(target)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let target = target.as_str();
        if !is_local_target(target) {
            continue;
        }
        let stripped = strip_anchor(target);
        if stripped.is_empty() {
            continue;
        }
        found.push((
            whole.start(),
            stripped.to_string(),
            text.as_str().to_string(),
            LinkKind::Markdown,
        ));
    }
    for caps in WIKI_LINK_REGEX.captures_iter(line) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let target = strip_anchor(target.as_str().trim()).trim();
        if target.is_empty() {
            continue;
        }
        let text = caps
            .get(2)
            .map_or_else(|| target.to_string(), |display| display.as_str().to_string());
        found.push((
            whole.start(),
            format!("{target}{NOTE_SUFFIX}"),
            text,
            LinkKind::Wiki,
        ));
    }
    found
}

fn is_local_target(target: &str) -> bool {
    target.ends_with(NOTE_SUFFIX) || target.contains(".md#") || !target.contains("://")
}

fn strip_anchor(target: &str) -> &str {
    target.split('#').next().unwrap_or(target)
}
