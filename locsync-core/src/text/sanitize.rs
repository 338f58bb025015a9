use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HASH_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\{([^}]+)\}#").unwrap());
static HTML_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\s+[^>]*>(.*?)</a>").unwrap());
pub(crate) static MD_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static CLASS_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\sclass="[^"]*""#).unwrap());
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+([,.;:!?])").unwrap());
static REPEATED_SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static TAG_OR_EMPTY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static NBSP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)&nbsp;").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static EM_RUN_RE: Lazy<Regex> = Lazy::new(|| adjacent_run_regex("em"));
static STRONG_RUN_RE: Lazy<Regex> = Lazy::new(|| adjacent_run_regex("strong"));

/// Removes hyperlink wrappers and `class` attributes, keeping the visible text.
pub fn strip_links(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut result = HASH_PLACEHOLDER_RE.replace_all(text, "${1}").into_owned();
    result = result.replace("#{", "");

    while HTML_LINK_RE.is_match(&result) {
        result = HTML_LINK_RE.replace_all(&result, "${1}").into_owned();
    }

    result = MD_LINK_RE.replace_all(&result, "${1}").into_owned();
    result = CLASS_ATTR_RE.replace_all(&result, "").into_owned();
    result = SPACE_BEFORE_PUNCT_RE.replace_all(&result, "${1}").into_owned();
    REPEATED_SPACES_RE.replace_all(&result, " ").into_owned()
}

pub fn sanitize_html(text: &str) -> String {
    let cleaned = strip_links(text);
    let cleaned = collapse_adjacent_inline_tags(&cleaned, InlineTag::Em);
    collapse_adjacent_inline_tags(&cleaned, InlineTag::Strong)
}

pub fn sanitize_name(text: &str) -> String {
    strip_links(text).trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineTag {
    Em,
    Strong,
}

impl InlineTag {
    fn name(self) -> &'static str {
        match self {
            InlineTag::Em => "em",
            InlineTag::Strong => "strong",
        }
    }

    fn run_regex(self) -> &'static Regex {
        match self {
            InlineTag::Em => &EM_RUN_RE,
            InlineTag::Strong => &STRONG_RUN_RE,
        }
    }
}

fn adjacent_run_regex(tag: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)<{tag}([^>]*)>([^<]*)</{tag}>((?:\s|&nbsp;)+)<{tag}([^>]*)>([^<]*)</{tag}>"
    ))
    .unwrap()
}

/// Merges `<em>a</em> <em>b</em>` into `<em>a b</em>` until no adjacent pair is left.
pub fn collapse_adjacent_inline_tags(html: &str, tag: InlineTag) -> String {
    if html.is_empty() {
        return String::new();
    }

    let re = tag.run_regex();
    let name = tag.name();
    let mut result = html.to_string();

    loop {
        let next = re
            .replace_all(&result, |caps: &Captures| {
                let attrs_left = &caps[1];
                let attrs = if attrs_left.is_empty() { &caps[4] } else { attrs_left };
                let left = caps[2].trim_end();
                let right = caps[5].trim_start();

                let spacer = if caps[3].contains("&nbsp;") {
                    "&nbsp;"
                } else if left.is_empty()
                    || right.is_empty()
                    || left.ends_with(['(', '[', '{', '«'])
                    || right.starts_with([')', ']', '}', ',', '.', ':', ';', '!', '?'])
                {
                    ""
                } else {
                    " "
                };

                format!("<{name}{attrs}>{left}{spacer}{right}</{name}>")
            })
            .into_owned();

        if next == result {
            return result;
        }
        result = next;
    }
}

/// Tag-free, whitespace-free, lowercased text. Two fragments with the same plain text
/// are treated as the same content.
pub fn extract_plain_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let without_tags = TAG_RE.replace_all(html, " ");
    without_tags
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

pub fn has_visible_text(html: &str) -> bool {
    let plain = TAG_OR_EMPTY_RE.replace_all(html, "");
    let plain = NBSP_RE.replace_all(&plain, " ");
    !plain.trim().is_empty()
}

pub fn fragment_has_question(html: &str) -> bool {
    if html.is_empty() {
        return false;
    }
    TAG_RE.replace_all(html, " ").contains('?')
}

pub fn extract_visible_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = strip_links(html);
    let text = TAG_RE.replace_all(&text, " ");
    let text = NBSP_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Lowercased visible text with single spaces, used to fingerprint action slots.
pub fn normalise_html_for_comparison(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = TAG_OR_EMPTY_RE.replace_all(html, " ");
    WHITESPACE_RE
        .replace_all(&text, " ")
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_links_keeps_anchor_and_markdown_text() {
        let html = r#"<p>See <a href="/rules" class="x">the <em>rules</em></a> and [Hope](https://example.com) .</p>"#;
        assert_eq!(strip_links(html), "<p>See the <em>rules</em> and Hope.</p>");
    }

    #[test]
    fn strip_links_unwraps_hash_placeholders() {
        assert_eq!(strip_links("Roll #{1d6}# now"), "Roll 1d6 now");
        assert_eq!(strip_links("broken #{ marker"), "broken marker");
    }

    #[test]
    fn strip_links_drops_class_attributes() {
        assert_eq!(
            strip_links(r#"<section class="secret" id="s1"><p>x</p></section>"#),
            r#"<section id="s1"><p>x</p></section>"#
        );
    }

    #[test]
    fn collapses_adjacent_emphasis_runs() {
        let html = "<p><em>first</em> <em>second</em> <em>third</em></p>";
        assert_eq!(
            collapse_adjacent_inline_tags(html, InlineTag::Em),
            "<p><em>first second third</em></p>"
        );
    }

    #[test]
    fn collapse_respects_punctuation_and_nbsp() {
        assert_eq!(
            collapse_adjacent_inline_tags("<strong>(</strong> <strong>x</strong>", InlineTag::Strong),
            "<strong>(x</strong>"
        );
        assert_eq!(
            collapse_adjacent_inline_tags("<em>a</em> <em>, b</em>", InlineTag::Em),
            "<em>a, b</em>"
        );
        assert_eq!(
            collapse_adjacent_inline_tags("<em>a</em>&nbsp;<em>b</em>", InlineTag::Em),
            "<em>a&nbsp;b</em>"
        );
    }

    #[test]
    fn collapse_keeps_left_attributes() {
        assert_eq!(
            collapse_adjacent_inline_tags(r#"<em data-a="1">a</em> <em data-b="2">b</em>"#, InlineTag::Em),
            r#"<em data-a="1">a b</em>"#
        );
    }

    #[test]
    fn plain_text_ignores_tags_whitespace_and_case() {
        assert_eq!(extract_plain_text("<p>Hello <strong>World</strong></p>"), "helloworld");
        assert_eq!(
            extract_plain_text("<p>Hello</p>\n<p>world</p>"),
            extract_plain_text("<p>hello world</p>")
        );
    }

    #[test]
    fn visible_text_checks() {
        assert!(!has_visible_text("<p>&nbsp;</p>"));
        assert!(!has_visible_text("<p></p><ul></ul>"));
        assert!(has_visible_text("<p>x</p>"));
        assert!(fragment_has_question("<p><em>Who?</em></p>"));
        assert!(!fragment_has_question("<p>Nobody.</p>"));
        assert_eq!(
            extract_visible_text("<p>One&nbsp;<a href=\"#\">two</a></p>\n<p>three</p>"),
            "One two three"
        );
    }
}
