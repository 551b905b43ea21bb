//! Changelog conversion.
//!
//! CurseForge serves changelogs as HTML. Discord embeds render a subset of
//! markdown, so the HTML is flattened to markdown-like text.

use std::sync::LazyLock;

use fancy_regex::{Captures, Regex};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("changelog pattern is valid")
}

static SCRIPT_OR_STYLE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<(script|style)\b[^>]*>.*?</\1\s*>"));
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<br\s*/?>"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<h([1-6])\b[^>]*>(.*?)</h\1\s*>"));
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<li\b[^>]*>"));
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)</(p|div|ul|ol|blockquote|pre|table|tr)\s*>"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?is)<a\b[^>]*?href\s*=\s*"([^"]*)"[^>]*>(.*?)</a\s*>"#));
static BOLD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</?(strong|b)\s*>"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</?(em|i)\s*>"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<[^>]+>"));
static TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)[ \t]+$"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| compile(r"\n{3,}"));

/// Convert a CurseForge HTML changelog into markdown-like plain text.
pub fn html_to_markdown(html: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(html, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level = caps[1].parse::<usize>().unwrap_or(1);
        format!("\n{} {}\n", "#".repeat(level), caps[2].trim())
    });
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = BLOCK_END.replace_all(&text, "\n");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        let label = caps[2].trim();
        if label.is_empty() {
            caps[1].to_string()
        } else {
            format!("[{}]({})", label, &caps[1])
        }
    });
    let text = BOLD.replace_all(&text, "**");
    let text = ITALIC.replace_all(&text, "*");
    let text = ANY_TAG.replace_all(&text, "");

    let text = decode_entities(&text);
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Decode the handful of HTML entities CurseForge emits.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(html_to_markdown("Fixed a crash"), "Fixed a crash");
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        let html = "<p>First line<br>Second line</p><p>Next</p>";
        assert_eq!(html_to_markdown(html), "First line\nSecond line\nNext");
    }

    #[test]
    fn test_list_items() {
        let html = "<ul><li>Added dinos</li><li>Removed bugs</li></ul>";
        assert_eq!(html_to_markdown(html), "- Added dinos\n- Removed bugs");
    }

    #[test]
    fn test_headings_and_emphasis() {
        let html = "<h2>Changes</h2><p><strong>Big</strong> and <em>small</em></p>";
        assert_eq!(html_to_markdown(html), "## Changes\n**Big** and *small*");
    }

    #[test]
    fn test_links() {
        let html = r#"See <a href="https://example.com/notes" rel="nofollow">notes</a>"#;
        assert_eq!(html_to_markdown(html), "See [notes](https://example.com/notes)");
    }

    #[test]
    fn test_entities_and_nbsp() {
        let html = "Tom&nbsp;&amp;&nbsp;Jerry\u{a0}&lt;3";
        assert_eq!(html_to_markdown(html), "Tom & Jerry <3");
    }

    #[test]
    fn test_scripts_are_stripped() {
        let html = "<p>Safe</p><script>alert('x')</script><style>p{}</style>";
        assert_eq!(html_to_markdown(html), "Safe");
    }

    #[test]
    fn test_blank_runs_collapse() {
        let html = "<p>A</p><p></p><p></p><p>B</p>";
        assert_eq!(html_to_markdown(html), "A\n\nB");
    }
}
