//! Plain-text previews for file cards.

use std::sync::LazyLock;

use regex::Regex;

use super::compile_regex;

/// Preview length used by file cards.
pub const DEFAULT_PREVIEW_CHARS: usize = 120;
const PREVIEW_SOURCE_CHARS: usize = 300;

static HEADING_MARKS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^#{1,6}\s+"));
static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\*\*([^*]+)\*\*"));
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"__([^_]+)__"));
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\*([^*]+)\*"));
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"_([^_]+)_"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"`([^`]+)`"));
static IMAGES: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"!\[[^\]]*\]\([^)]+\)"));
static LINKS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\[([^\]]+)\]\([^)]+\)"));
static WIKI_LINKS: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]"));
static BLOCKQUOTES: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^>\s*"));
static RULES: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^[-*_]{3,}\s*$"));
static BULLETS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^\s*[-*+]\s+"));
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^\s*\d+\.\s+"));
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s+"));

/// Remove markdown syntax, keeping link and emphasis text.
#[must_use]
pub fn strip_markdown(markdown: &str) -> String {
    let steps: [(&LazyLock<Regex>, &str); 12] = [
        (&HEADING_MARKS, ""),
        (&BOLD_STARS, "$1"),
        (&BOLD_UNDERSCORES, "$1"),
        (&ITALIC_STAR, "$1"),
        (&ITALIC_UNDERSCORE, "$1"),
        (&INLINE_CODE, "$1"),
        (&IMAGES, ""),
        (&LINKS, "$1"),
        (&BLOCKQUOTES, ""),
        (&RULES, ""),
        (&BULLETS, ""),
        (&NUMBERED, ""),
    ];
    let mut text = markdown.to_string();
    for (regex, replacement) in steps {
        text = regex.replace_all(&text, replacement).into_owned();
    }
    text = WIKI_LINKS
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            caps.get(2)
                .or_else(|| caps.get(1))
                .map_or_else(String::new, |m| m.as_str().to_string())
        })
        .into_owned();
    WHITESPACE_RUNS.replace_all(&text, " ").trim().to_string()
}

/// First `max_chars` characters of the stripped note head, `...` appended when cut.
#[must_use]
pub fn preview(markdown: &str, max_chars: usize) -> String {
    let head: String = markdown.chars().take(PREVIEW_SOURCE_CHARS).collect();
    let clean = strip_markdown(&head);
    if clean.chars().count() > max_chars {
        let cut: String = clean.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_syntax_but_keeps_words() {
        let text = "# Title\n\n**Bold** and _it_ with [link](a.md) and ![img](x.png)\n\n- item\n1. one\n> quote";
        assert_eq!(
            strip_markdown(text),
            "Title Bold and it with link and item one quote"
        );
    }

    #[test]
    fn wiki_links_show_display_text() {
        assert_eq!(strip_markdown("see [[b|Bee]] or [[c]]"), "see Bee or c");
    }

    #[test]
    fn long_previews_are_truncated_with_ellipsis() {
        let body = "word ".repeat(60);
        let out = preview(&body, 20);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 23);
        assert_eq!(preview("short note", 20), "short note");
    }
}
