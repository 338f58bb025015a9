use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::tags::merge_foundry_tags;
use crate::model::{action_html, ActionValue, Entry, EntryFields};
use crate::text::sanitize::{
    collapse_adjacent_inline_tags, extract_plain_text, has_visible_text, sanitize_html, InlineTag,
    MD_LINK_RE,
};

static ANCHOR_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a[\s>]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Prefix,
    Suffix,
}

/// Merges freshly generated html into the previous raw value of a field.
///
/// Returns `None` when the field should be removed: the incoming html sanitizes to nothing,
/// or nothing visible survives the merge. When the plain text did not change, the previous
/// value is returned as-is (or its sanitized form, if that only dropped link markup).
pub fn merge_html(existing_raw: &str, incoming: &str) -> Option<String> {
    let sanitized = sanitize_html(incoming);
    if sanitized.is_empty() {
        return None;
    }

    let existing_sanitized = if existing_raw.is_empty() {
        String::new()
    } else {
        sanitize_html(existing_raw)
    };

    let merged = merge_foundry_tags(existing_raw, &sanitized);
    let merged = collapse_adjacent_inline_tags(&merged, InlineTag::Em);
    let merged = collapse_adjacent_inline_tags(&merged, InlineTag::Strong);
    if !has_visible_text(&merged) {
        return None;
    }

    if !existing_raw.is_empty() {
        let existing_plain = if existing_sanitized.is_empty() {
            extract_plain_text(existing_raw)
        } else {
            extract_plain_text(&existing_sanitized)
        };
        let merged_plain = extract_plain_text(&merged);
        if !existing_plain.is_empty() && existing_plain == merged_plain {
            let has_links = ANCHOR_TAG_RE.is_match(existing_raw) || MD_LINK_RE.is_match(existing_raw);
            if has_links && !existing_sanitized.is_empty() && existing_sanitized != existing_raw {
                return Some(existing_sanitized);
            }
            return Some(existing_raw.to_string());
        }
    }

    Some(merged)
}

/// Writes `html` into `entry[key]` through [`merge_html`]; `None` removes the field.
pub fn set_html_field(entry: &mut Entry, key: &str, html: Option<&str>) {
    let Some(html) = html else {
        entry.remove_field(key);
        return;
    };
    let existing = entry.str_field(key).unwrap_or("").to_string();
    match merge_html(&existing, html) {
        Some(merged) => entry.set_str(key, merged),
        None => entry.remove_field(key),
    }
}

/// Same as [`set_html_field`] for an action slot, keeping the slot's shape.
pub fn set_action_html(actions: &mut Map<String, Value>, id: &str, html: Option<&str>) {
    if id.is_empty() {
        return;
    }
    let Some(html) = html else {
        actions.shift_remove(id);
        return;
    };

    let existing = action_html(actions, id);
    let processed = match merge_html(&existing, html) {
        Some(p) if !p.is_empty() => p,
        _ => {
            actions.shift_remove(id);
            return;
        }
    };

    let slot = ActionValue::from_value(actions.get(id));
    actions.insert(id.to_string(), slot.with_html(processed));
}

/// Adds `fragment` unless it, or its plain text, is already part of `html`.
pub fn ensure_html_fragment(html: &str, fragment: &str, position: Position) -> String {
    if fragment.is_empty() || html.contains(fragment) {
        return html.to_string();
    }
    let base_plain = extract_plain_text(html);
    let fragment_plain = extract_plain_text(fragment);
    if !fragment_plain.is_empty() && !base_plain.is_empty() && base_plain.contains(&fragment_plain) {
        return html.to_string();
    }
    match position {
        Position::Prefix => format!("{fragment}{html}"),
        Position::Suffix => format!("{html}{fragment}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> Entry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn plain_update_replaces_description() {
        let mut e = entry(json!({"name": "Bard", "description": "<p>Old</p>"}));
        set_html_field(&mut e, "description", Some("<p>Тестовое описание.</p>"));
        assert_eq!(e.str_field("description"), Some("<p>Тестовое описание.</p>"));
    }

    #[test]
    fn missing_or_invisible_html_removes_field() {
        let mut e = entry(json!({"name": "a", "description": "<p>x</p>", "tail": 1}));
        set_html_field(&mut e, "description", Some("<p>&nbsp;</p>"));
        assert!(e.get("description").is_none());

        let mut e = entry(json!({"description": "<p>x</p>"}));
        set_html_field(&mut e, "description", None);
        assert!(e.is_empty());
    }

    #[test]
    fn unchanged_plain_text_keeps_previous_markup() {
        let mut e = entry(json!({"description": "<p>Same <em>text</em>.</p>"}));
        set_html_field(&mut e, "description", Some("<p>Same text.</p>"));
        assert_eq!(e.str_field("description"), Some("<p>Same <em>text</em>.</p>"));
    }

    #[test]
    fn unchanged_plain_text_drops_stale_links() {
        let mut e = entry(json!({"description": "<p>See <a href=\"/x\">rules</a>.</p>"}));
        set_html_field(&mut e, "description", Some("<p>See rules.</p>"));
        assert_eq!(e.str_field("description"), Some("<p>See rules.</p>"));
    }

    #[test]
    fn repeated_application_is_stable() {
        let mut e = entry(json!({"description": "<p>Roll [[/r 1d6]] now.</p>"}));
        set_html_field(&mut e, "description", Some("<p>Бросьте 1d6 сейчас.</p>"));
        let first = e.clone();
        set_html_field(&mut e, "description", Some("<p>Бросьте 1d6 сейчас.</p>"));
        assert_eq!(e, first);
        assert_eq!(e.str_field("description"), Some("<p>Бросьте [[/r 1d6]] сейчас.</p>"));
    }

    #[test]
    fn action_slot_keeps_object_shape() {
        let mut actions = entry(json!({
            "a": {"name": "Attack", "description": "<p>old</p>"},
            "b": "<p>old</p>"
        }));
        set_action_html(&mut actions, "a", Some("<p>new</p>"));
        set_action_html(&mut actions, "b", Some("<p>new</p>"));
        set_action_html(&mut actions, "c", Some("<p>fresh</p>"));
        assert_eq!(
            Value::Object(actions),
            json!({
                "a": {"name": "Attack", "description": "<p>new</p>"},
                "b": "<p>new</p>",
                "c": "<p>fresh</p>"
            })
        );
    }

    #[test]
    fn fragment_is_added_once() {
        let suffix = "<p>Note.</p>";
        let once = ensure_html_fragment("<p>Body</p>", suffix, Position::Suffix);
        assert_eq!(once, "<p>Body</p><p>Note.</p>");
        assert_eq!(ensure_html_fragment(&once, suffix, Position::Suffix), once);
        assert_eq!(
            ensure_html_fragment("<p>Body</p>", "<p><strong>Hi</strong></p>", Position::Prefix),
            "<p><strong>Hi</strong></p><p>Body</p>"
        );
        assert_eq!(
            ensure_html_fragment("<p>Body. <em>Note.</em></p>", suffix, Position::Suffix),
            "<p>Body. <em>Note.</em></p>"
        );
    }
}
