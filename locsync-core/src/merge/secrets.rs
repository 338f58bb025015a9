//! Handling of `<section class="secret">` blocks (GM-only content).

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use crate::text::sanitize::{extract_visible_text, fragment_has_question};

pub(crate) static SECRET_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<section\b[^>]*class=['"][^'"]*\bsecret\b[^'"]*['"][^>]*>[\s\S]*?</section>"#)
        .unwrap()
});
static SECRET_WRAPPER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(<section\b[^>]*class=['"][^'"]*\bsecret\b[^'"]*['"][^>]*>)([\s\S]*?)(</section>)"#,
    )
    .unwrap()
});
static SECTION_INNER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<section[^>]*>([\s\S]*?)</section>$").unwrap());
static SECTION_BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)>([\s\S]*?)</section>").unwrap());
static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<p[^>]*>[\s\S]*?</p>").unwrap());
static ID_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bid=['"]([^'"]+)['"]"#).unwrap());

/// Secret blocks in document order.
pub fn secret_blocks(html: &str) -> Vec<&str> {
    SECRET_SECTION_RE.find_iter(html).map(|m| m.as_str()).collect()
}

/// Trimmed inner html of a `<section>…</section>` block.
pub fn section_inner(block: &str) -> &str {
    SECTION_INNER_RE
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or("")
}

/// Rebuilds `block` around new inner html, keeping its opening tag.
pub fn rewrap_section(block: &str, inner: &str) -> String {
    SECTION_BODY_RE
        .replacen(block, 1, |_: &Captures| format!(">{inner}</section>"))
        .into_owned()
}

pub fn extract_secret_texts(html: &str) -> Vec<String> {
    secret_blocks(html)
        .into_iter()
        .map(|block| extract_visible_text(section_inner(block)))
        .filter(|text| !text.is_empty())
        .collect()
}

fn placeholder(index: usize) -> String {
    format!("__SECRET_BLOCK_{index}__")
}

/// Removes the first occurrence of `plain` that sits outside every secret block.
pub fn remove_plain_text_outside_secrets(html: &str, plain: &str) -> Option<String> {
    if html.is_empty() || plain.is_empty() {
        return None;
    }

    let mut sections = Vec::new();
    let transformed = SECRET_SECTION_RE
        .replace_all(html, |caps: &Captures| {
            let token = placeholder(sections.len());
            sections.push(caps[0].to_string());
            token
        })
        .into_owned();

    if !transformed.contains(plain) {
        return None;
    }

    let mut restored = transformed.replacen(plain, "", 1);
    for (index, section) in sections.iter().enumerate() {
        restored = restored.replacen(&placeholder(index), section, 1);
    }
    Some(restored)
}

/// Drops visible text that is duplicated outside of the secret block holding it.
pub fn dedupe_secret_content(html: &str) -> String {
    let blocks: Vec<String> = secret_blocks(html).into_iter().map(str::to_string).collect();
    let mut result = html.to_string();

    for block in &blocks {
        let inner = section_inner(block);
        if inner.is_empty() {
            continue;
        }
        let plain = extract_visible_text(inner);
        if plain.is_empty() {
            continue;
        }
        if let Some(updated) = remove_plain_text_outside_secrets(&result, &plain) {
            result = updated;
        }
    }

    result
}

/// Moves the opening tag of each secret down to its first question paragraph, so intro
/// paragraphs in front of the question stay visible.
pub fn normalize_secret_sections(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    SECRET_WRAPPER_RE
        .replace_all(html, |caps: &Captures| {
            let full = caps[0].to_string();
            let (open, inner, close) = (&caps[1], &caps[2], &caps[3]);

            let question = PARAGRAPH_RE
                .find_iter(inner)
                .enumerate()
                .find(|(_, m)| fragment_has_question(m.as_str()));

            let anchor = match question {
                Some((index, m)) if index > 0 && m.start() > 0 => m.start(),
                _ => return full,
            };

            let before = &inner[..anchor];
            if before.trim().is_empty() {
                return full;
            }
            format!("{before}{open}{}{close}", &inner[anchor..])
        })
        .into_owned()
}

/// Re-attaches secret blocks of the previous html to freshly generated html.
///
/// A block with an `id` replaces the same-id section in the new html; otherwise its text is
/// removed from the visible part and the block is appended at the end.
pub fn preserve_secret_sections_from_source(new_html: &str, old_html: &str) -> String {
    if new_html.is_empty() || old_html.is_empty() {
        return new_html.to_string();
    }

    let mut result = new_html.to_string();
    let mut pending: Vec<String> = Vec::new();

    for block in secret_blocks(old_html) {
        let block = block.trim();
        if block.is_empty() || result.contains(block) {
            continue;
        }

        if let Some(id) = ID_ATTR_RE.captures(block).map(|c| c[1].to_string()) {
            let by_id = Regex::new(&format!(
                r#"(?i)<section\b[^>]*id=['"]{}['"][^>]*>[\s\S]*?</section>"#,
                regex::escape(&id)
            ));
            if let Ok(by_id) = by_id {
                if by_id.is_match(&result) {
                    result = by_id.replacen(&result, 1, NoExpand(block)).into_owned();
                    continue;
                }
            }
        }

        let inner = section_inner(block);
        if !inner.is_empty() {
            if result.contains(inner) {
                result = result.replacen(inner, "", 1);
            } else {
                let plain = extract_visible_text(inner);
                if let Some(updated) = remove_plain_text_outside_secrets(&result, &plain) {
                    result = updated;
                }
            }
        }
        pending.push(block.to_string());
    }

    if !pending.is_empty() {
        result = format!("{}{}", result.trim_end(), pending.concat());
    }
    result
}
