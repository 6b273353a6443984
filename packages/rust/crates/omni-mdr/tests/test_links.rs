//! Integration tests for link extraction, outlines and previews.

use omni_mdr::links::{ExtractOptions, extract_links_with, preview};
use omni_mdr::{LinkKind, extract_links, extract_outline};

#[test]
fn test_extract_links_mixed_syntaxes_in_line_order() {
    let text = "# Title\n\nSee [[alpha|the alpha note]] and [beta](beta.md#usage).\n\
                External [site](https://example.com) is skipped.\n[[gamma#part]] last";
    let links = extract_links(text);

    let targets: Vec<&str> = links.iter().map(|link| link.target_raw.as_str()).collect();
    assert_eq!(targets, vec!["alpha.md", "beta.md", "gamma.md"]);

    assert_eq!(links[0].kind, LinkKind::Wiki);
    assert_eq!(links[0].text, "the alpha note");
    assert_eq!(links[0].line_number, 3);
    assert_eq!(
        links[0].context_line,
        "See [[alpha|the alpha note]] and [beta](beta.md#usage)."
    );
    assert_eq!(links[1].kind, LinkKind::Markdown);
    assert_eq!(links[1].text, "beta");
    assert_eq!(links[2].text, "gamma");
    assert_eq!(links[2].line_number, 5);
}

#[test]
fn test_extract_links_fence_handling_is_configurable() {
    let text = "[[real]]\n```\n[[in-code]]\n```\n[[after]]";

    let skipped: Vec<String> = extract_links(text)
        .into_iter()
        .map(|link| link.target_raw)
        .collect();
    assert_eq!(skipped, vec!["real.md", "after.md"]);

    let kept = extract_links_with(
        text,
        ExtractOptions {
            skip_code_fences: false,
        },
    );
    assert_eq!(kept.len(), 3);
    assert_eq!(kept[1].target_raw, "in-code.md");
    assert_eq!(kept[1].line_number, 3);
}

#[test]
fn test_extract_links_drops_bare_anchors() {
    let links = extract_links("Jump to [intro](#intro) or [[#local]].");
    assert!(links.is_empty());
}

#[test]
fn test_outline_slugs_are_unique() {
    let headings = extract_outline("# Intro\n## Setup\n```\n# not a heading\n```\n## Setup\n#nospace");
    let slugs: Vec<&str> = headings.iter().map(|h| h.slug.as_str()).collect();
    assert_eq!(slugs, vec!["intro", "setup", "setup-1"]);
    assert_eq!(headings[1].level, 2);
    assert_eq!(headings[2].line_number, 6);
}

#[test]
fn test_preview_strips_markup_and_truncates() {
    let md = "# Welcome\n\nThis is **bold** and a [link](other.md) to [[notes|Notes]].";
    assert_eq!(
        preview(md, 200),
        "Welcome This is bold and a link to Notes."
    );
    let short = preview(md, 10);
    assert!(short.ends_with("..."));
    assert!(short.chars().count() <= 13);
}
