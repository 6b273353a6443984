use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One ATX heading with a document-unique anchor slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    /// 1..=6
    pub level: usize,
    /// Heading text with closing hashes removed.
    pub text: String,
    /// Anchor slug, suffixed `-1`, `-2`, ... on repeats.
    pub slug: String,
    /// 1-based line number.
    pub line_number: u32,
}

fn parse_markdown_heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|ch| *ch == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    if text.is_empty() {
        return None;
    }
    Some((level, text.split_whitespace().collect::<Vec<_>>().join(" ")))
}

/// Lowercase, hyphenated anchor for a heading.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "heading".to_string()
    } else {
        slug
    }
}

/// Headings of a note in document order, skipping fenced code.
#[must_use]
pub fn extract_outline(text: &str) -> Vec<Heading> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headings = Vec::new();
    let mut in_code_fence = false;
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code_fence = !in_code_fence;
            continue;
        }
        if in_code_fence {
            continue;
        }
        let Some((level, text)) = parse_markdown_heading(trimmed) else {
            continue;
        };
        let base = slugify(&text);
        let count = seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        headings.push(Heading {
            level,
            text,
            slug,
            line_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
        });
    }
    headings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_punctuation_and_spaces() {
        assert_eq!(slugify("  Getting Started!  "), "getting-started");
        assert_eq!(slugify("A -- B"), "a-b");
        assert_eq!(slugify("???"), "heading");
    }

    #[test]
    fn hashes_need_a_space_to_be_a_heading() {
        assert_eq!(parse_markdown_heading("#tag"), None);
        assert_eq!(
            parse_markdown_heading("## Title ##"),
            Some((2, "Title".to_string()))
        );
    }
}
