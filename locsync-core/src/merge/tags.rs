//! Carries embedded Foundry directives from the previous html into regenerated html.
//!
//! Recognised directives: `@Template[...]`, inline rolls `[[/r ...]]`, document links
//! `@UUID[path]{label}` and secret sections. Placement degrades from positional anchoring to
//! text matching to a trailing append.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use super::secrets::{normalize_secret_sections, rewrap_section, secret_blocks, section_inner};
use crate::text::sanitize::{extract_plain_text, fragment_has_question};

static TEMPLATE_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@Template\[[^\]]+\]").unwrap());
static INLINE_ROLL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\[/([a-z]+)\s*([^\]]+)\]\]").unwrap());
static UUID_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@UUID\[([^\]]+)\]\{([^}]*)\}").unwrap());
static FOUNDRY_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@[A-Za-z]+\[|\[\[/r|<section[^>]+class=['"]secret"#).unwrap()
});
static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(?:p|ul|ol)[^>]*>[\s\S]*?</(?:p|ul|ol)>").unwrap());
static SECTION_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<section\b").unwrap());
static STRONG_OPEN_TAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<strong[^>]*>$").unwrap());
static STRONG_CLOSE_HEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^</strong>").unwrap());
static EM_OPEN_TAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<em[^>]*>$").unwrap());
static EM_CLOSE_HEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^</em>").unwrap());
static TRAILING_EM_PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(<p[^>]*><em>[\s\S]*?</em></p>)\s*$").unwrap());
static TRAILING_PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(<p[^>]*>[\s\S]*?</p>)\s*$").unwrap());

/// Inserts `fragments` in front of the first `<section`, or at the end.
pub fn append_before_secret(html: &str, fragments: &[String]) -> String {
    if fragments.is_empty() {
        return html.to_string();
    }
    let block = fragments.concat();
    match SECTION_START_RE.find(html) {
        Some(m) => format!("{}{}{}", &html[..m.start()], block, &html[m.start()..]),
        None => format!("{}{}", html.trim_end(), block),
    }
}

/// Index of the last block (`p`/`ul`/`ol`) that ends at or before `offset`.
pub fn find_block_index(html: &str, offset: usize) -> Option<usize> {
    let mut position = None;
    for (current, m) in BLOCK_RE.find_iter(html).enumerate() {
        if m.end() <= offset {
            position = Some(current);
        } else {
            break;
        }
    }
    position
}

pub fn insert_after_block_index(html: &str, block_index: usize, snippet: &str) -> Option<String> {
    if html.is_empty() || snippet.is_empty() {
        return None;
    }
    BLOCK_RE.find_iter(html).nth(block_index).map(|m| {
        format!("{}{}{}", &html[..m.end()], snippet, &html[m.end()..])
    })
}

fn merge_templates(source: &str, mut result: String) -> String {
    let mut pending = Vec::new();
    let mut seen = HashSet::new();

    for m in TEMPLATE_TAG_RE.find_iter(source) {
        let tag = m.as_str();
        if !seen.insert(tag) || result.contains(tag) {
            continue;
        }
        let snippet = format!("<p>{tag}</p>");
        let anchored = find_block_index(source, m.start())
            .and_then(|index| insert_after_block_index(&result, index, &snippet));
        match anchored {
            Some(updated) => result = updated,
            None => pending.push(snippet),
        }
    }

    append_before_secret(&result, &pending)
}

fn wrapper_tags(source: &str, start: usize, end: usize) -> Vec<&'static str> {
    let before = &source[..start];
    let after = &source[end..];
    let mut tags = Vec::new();
    if STRONG_OPEN_TAIL_RE.is_match(before) && STRONG_CLOSE_HEAD_RE.is_match(after) {
        tags.push("strong");
    }
    if EM_OPEN_TAIL_RE.is_match(before) && EM_CLOSE_HEAD_RE.is_match(after) {
        tags.push("em");
    }
    tags
}

fn replace_wrapped_expression(result: &str, tag: &str, expr: &str, full: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"(?i)(<{tag}[^>]*>)\s*{}\s*(</{tag}>)",
        regex::escape(expr)
    ))
    .ok()?;
    if !re.is_match(result) {
        return None;
    }
    Some(
        re.replacen(result, 1, |caps: &Captures| format!("{}{}{}", &caps[1], full, &caps[2]))
            .into_owned(),
    )
}

fn merge_inline_rolls(source: &str, mut result: String) -> String {
    let mut appended = Vec::new();
    let mut appended_set = HashSet::new();

    for caps in INLINE_ROLL_RE.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        let full = whole.as_str();
        let expr = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        if expr.is_empty() || result.contains(full) {
            continue;
        }

        let wrapped = wrapper_tags(source, whole.start(), whole.end())
            .into_iter()
            .find_map(|tag| replace_wrapped_expression(&result, tag, expr, full));
        if let Some(updated) = wrapped {
            result = updated;
            continue;
        }

        if let Ok(bare) = Regex::new(&format!("(?i){}", regex::escape(expr))) {
            if bare.is_match(&result) {
                result = bare.replacen(&result, 1, NoExpand(full)).into_owned();
                continue;
            }
        }

        if appended_set.insert(full.to_string()) {
            appended.push(format!("<p>{full}</p>"));
        }
    }

    append_before_secret(&result, &appended)
}

/// Re-links the first occurrence of each label. A label that no longer appears verbatim is
/// dropped together with its link.
fn merge_uuid_links(source: &str, mut result: String) -> String {
    for caps in UUID_TAG_RE.captures_iter(source) {
        let full = &caps[0];
        let path = &caps[1];
        let label = caps[2].trim();
        if path.is_empty() || label.is_empty() || result.contains(full) {
            continue;
        }
        if result.contains(label) {
            result = result.replacen(label, &format!("@UUID[{path}]{{{label}}}"), 1);
        }
    }
    result
}

fn merge_secret_blocks(source: &str, mut result: String) -> String {
    let mut appended: Vec<String> = Vec::new();
    let mut seen = HashSet::new();

    for block in secret_blocks(source) {
        let block = block.trim();
        if block.is_empty() || !seen.insert(block) || result.contains(block) {
            continue;
        }

        let inner = section_inner(block);
        if !inner.is_empty() {
            if let Some(idx) = result.find(inner) {
                let rewrapped = rewrap_section(block, inner);
                result = format!("{}{}{}", &result[..idx], rewrapped, &result[idx + inner.len()..]);
                continue;
            }
        }

        if fragment_has_question(inner) {
            if let Some(updated) = wrap_trailing_question(&result, block) {
                result = updated;
                continue;
            }
        }

        appended.push(block.to_string());
    }

    if appended.is_empty() {
        result
    } else {
        format!("{}{}", result.trim_end(), appended.concat())
    }
}

/// Moves a trailing question paragraph (italic first, then any) into the secret block.
fn wrap_trailing_question(result: &str, block: &str) -> Option<String> {
    for re in [&*TRAILING_EM_PARAGRAPH_RE, &*TRAILING_PARAGRAPH_RE] {
        let Some(caps) = re.captures(result) else { continue };
        let paragraph = &caps[1];
        if !fragment_has_question(paragraph) {
            continue;
        }
        let rewrapped = rewrap_section(block, paragraph);
        return Some(re.replacen(result, 1, NoExpand(&rewrapped)).into_owned());
    }
    None
}

/// Merges directives of `old_html` into `new_html`.
///
/// When both have the same plain text but only the old one carries directives, the old html
/// is returned unchanged.
pub fn merge_foundry_tags(old_html: &str, new_html: &str) -> String {
    if new_html.is_empty() {
        return String::new();
    }

    let source = old_html;
    let mut result = new_html.to_string();

    result = merge_templates(source, result);
    result = merge_inline_rolls(source, result);
    result = merge_uuid_links(source, result);
    result = merge_secret_blocks(source, result);

    if !source.is_empty() {
        let plain_source = extract_plain_text(source);
        let plain_result = extract_plain_text(&result);
        if !plain_source.is_empty()
            && plain_source == plain_result
            && FOUNDRY_TAG_RE.is_match(source)
            && !FOUNDRY_TAG_RE.is_match(&result)
        {
            return source.to_string();
        }
    }

    normalize_secret_sections(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_keeps_its_paragraph_position() {
        let old = "<p>One.</p><p>@Template[type:cone|range:close]</p><p>Two.</p>";
        let new = "<p>Uno.</p><p>Dos.</p>";
        assert_eq!(
            merge_foundry_tags(old, new),
            "<p>Uno.</p><p>@Template[type:cone|range:close]</p><p>Dos.</p>"
        );
    }

    #[test]
    fn unanchored_template_goes_before_secret() {
        let old = "@Template[type:ray] <p>x</p>";
        let new = r#"<p>y</p><section class="secret"><p>z</p></section>"#;
        assert_eq!(
            merge_foundry_tags(old, new),
            r#"<p>y</p><p>@Template[type:ray]</p><section class="secret"><p>z</p></section>"#
        );
    }

    #[test]
    fn inline_roll_replaces_wrapped_expression() {
        let old = "<p>Deal <strong>[[/r 1d6+2]]</strong> damage.</p>";
        let new = "<p>Нанесите <strong>1d6+2</strong> урона.</p>";
        assert_eq!(
            merge_foundry_tags(old, new),
            "<p>Нанесите <strong>[[/r 1d6+2]]</strong> урона.</p>"
        );
    }

    #[test]
    fn inline_roll_without_anchor_is_appended_once() {
        let old = "<p>[[/r 2d8]] and again [[/r 2d8]]</p>";
        let new = "<p>Нет броска.</p>";
        assert_eq!(merge_foundry_tags(old, new), "<p>Нет броска.</p><p>[[/r 2d8]]</p>");
    }

    #[test]
    fn uuid_link_wraps_label_or_is_dropped() {
        let old = "<p>Use @UUID[Compendium.x.Item.abc]{Без доспехов}.</p>";
        assert_eq!(
            merge_foundry_tags(old, "<p>Наденьте Без доспехов сейчас.</p>"),
            "<p>Наденьте @UUID[Compendium.x.Item.abc]{Без доспехов} сейчас.</p>"
        );
        assert_eq!(
            merge_foundry_tags(old, "<p>Совсем другой текст.</p>"),
            "<p>Совсем другой текст.</p>"
        );
    }

    #[test]
    fn secret_is_rewrapped_in_place() {
        let old = r#"<p>A.</p><section class="secret"><p>Hidden.</p></section>"#;
        let new = "<p>B.</p><p>Hidden.</p>";
        assert_eq!(
            merge_foundry_tags(old, new),
            r#"<p>B.</p><section class="secret"><p>Hidden.</p></section>"#
        );
    }

    #[test]
    fn question_secret_takes_trailing_question_paragraph() {
        let old = r#"<p>A.</p><section class="secret"><p><em>Old question?</em></p></section>"#;
        let new = "<p>B.</p><p><em>New question?</em></p>";
        assert_eq!(
            merge_foundry_tags(old, new),
            r#"<p>B.</p><section class="secret"><p><em>New question?</em></p></section>"#
        );
    }

    #[test]
    fn unmatched_secret_is_appended() {
        let old = r#"<section class="secret"><p>GM note.</p></section>"#;
        let new = "<p>Text.</p>\n";
        assert_eq!(merge_foundry_tags(old, new), format!("<p>Text.</p>{old}"));
    }

    #[test]
    fn same_plain_text_keeps_directive_source() {
        let old = r#"<section class="secretive"><p>Скрыто</p></section>"#;
        assert_eq!(merge_foundry_tags(old, "<p>скрыто</p>"), old);
    }

    #[test]
    fn template_anchors_after_matching_block() {
        let old = "<p>Hidden</p><p>@Template[a]</p>";
        assert_eq!(merge_foundry_tags(old, "<p>Hidden</p>"), old);
    }

    #[test]
    fn block_index_helpers() {
        let html = "<p>a</p><ul><li>b</li></ul><p>c</p>";
        assert_eq!(find_block_index(html, 0), None);
        assert_eq!(find_block_index(html, 8), Some(0));
        assert_eq!(find_block_index(html, html.len()), Some(2));
        assert_eq!(
            insert_after_block_index(html, 1, "<p>x</p>").as_deref(),
            Some("<p>a</p><ul><li>b</li></ul><p>x</p><p>c</p>")
        );
        assert_eq!(insert_after_block_index(html, 5, "<p>x</p>"), None);
    }
}
