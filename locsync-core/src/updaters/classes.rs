use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{apply_description, apply_feature_generated_actions, truthy_str, EntryRef};
use crate::config::overrides::{PatchSection, CLASS_ITEM_OVERRIDES};
use crate::lookup::{Catalog, FeatureScope};
use crate::merge::{apply_action_overrides, apply_manual_description_patches, apply_manual_entry_patches};
use crate::model::{Entry, EntryFields, SourceEntity};
use crate::text::sanitize_name;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h\d\b").unwrap());
static SPACER_HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<p>\s*</p>\s*<h\d\b").unwrap());

const RALLY: &str = "rally";
const RALLY_LEVEL_5: &str = "rallylevel5";
const RALLY_LEVEL_5_SUFFIX: &str = " (уровень 5)";

fn patched(key: &str, description: Option<&str>) -> Option<String> {
    description.map(|html| {
        if html.is_empty() {
            String::new()
        } else {
            apply_manual_description_patches(PatchSection::Classes, key, html)
        }
    })
}

/// Keeps the hand-written heading section at the end of the previous description when the
/// incoming text has no headings of its own.
fn keep_heading_tail(existing: Option<&str>, incoming: &str) -> String {
    let Some(existing) = existing.filter(|e| !e.is_empty()) else {
        return incoming.to_string();
    };
    if !HEADING_RE.is_match(existing) || HEADING_RE.is_match(incoming) {
        return incoming.to_string();
    }
    let index = SPACER_HEADING_RE
        .find(existing)
        .or_else(|| HEADING_RE.find(existing))
        .map(|m| m.start());
    match index {
        Some(index) if index > 0 => format!("{incoming}{}", &existing[index..]),
        _ => incoming.to_string(),
    }
}

fn question_list(values: &[String]) -> Option<Value> {
    let cleaned: Vec<Value> = values
        .iter()
        .map(|v| sanitize_name(v))
        .filter(|v| !v.is_empty())
        .map(Value::String)
        .collect();
    (!cleaned.is_empty()).then_some(Value::Array(cleaned))
}

fn apply_question_lists(entry: &mut Entry, raw: &SourceEntity) {
    match question_list(&raw.background_questions) {
        Some(list) => {
            entry.insert("backgroundQuestions".to_string(), list);
        }
        None => entry.remove_field("backgroundQuestions"),
    }
    match question_list(&raw.connection_questions) {
        Some(list) => {
            entry.insert("connections".to_string(), list);
        }
        None => entry.remove_field("connections"),
    }
}

pub fn update_entry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let key = target.key;
    let mut handled = false;

    if let Some(info) = catalog.classes.get(norm) {
        entry.set_str("name", sanitize_name(&info.name));
        match info.description.as_deref() {
            None => {}
            Some("") => entry.remove_field("description"),
            Some(incoming) => {
                let merged = keep_heading_tail(entry.str_field("description"), incoming);
                let merged = apply_manual_description_patches(PatchSection::Classes, key, &merged);
                apply_description(entry, Some(&merged));
            }
        }
        apply_question_lists(entry, info.raw);
        entry.remove_field("actions");
        handled = true;
    }

    let feature = catalog.feature(FeatureScope::Class, norm);
    if let Some(info) = feature {
        if !info.name.is_empty() {
            entry.set_str("name", sanitize_name(&info.name));
        }
        apply_description(entry, patched(key, info.description.as_deref()).as_deref());
        handled = true;
    }

    if norm == RALLY_LEVEL_5 {
        if let Some(rally) = catalog.feature(FeatureScope::Class, RALLY) {
            entry.set_str("name", format!("{}{RALLY_LEVEL_5_SUFFIX}", sanitize_name(&rally.name)));
            match patched(key, rally.description.as_deref()).filter(|d| !d.is_empty()) {
                Some(html) => apply_description(entry, Some(&html)),
                None => entry.remove_field("description"),
            }
            handled = true;
            apply_feature_generated_actions(entry, rally.raw);
        }
    }

    if let Some(info) = feature {
        apply_feature_generated_actions(entry, info.raw);
    }

    if let Some(name) = catalog.class_items.get(norm) {
        entry.set_str("name", name.clone());
        entry.remove_field("actions");
        handled = true;
    }

    if let Some(item) = CLASS_ITEM_OVERRIDES.get(key) {
        if !item.name.is_empty() {
            entry.set_str("name", item.name);
        }
        if let Some(description) = item.description {
            apply_description(entry, patched(key, Some(description)).as_deref());
        }
        entry.remove_field("actions");
        handled = true;
    }

    if let Some(rule) = catalog.rules.get(norm) {
        if !handled || !truthy_str(entry, "description") {
            entry.set_str("name", sanitize_name(&rule.name));
            apply_description(entry, patched(key, rule.description.as_deref()).as_deref());
            handled = true;
        }
    }

    apply_manual_entry_patches(PatchSection::Classes, key, entry);
    apply_action_overrides(entry);
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bilingual, Sources};
    use crate::updaters::test_support::{entities, entry};
    use serde_json::json;

    fn sources() -> Sources {
        Sources {
            classes: Bilingual {
                en: entities(json!([{
                    "slug": "bard", "name": "Bard", "description": "Sing.",
                    "class_items": ["A Romance Novel", "Whispering Orb"],
                    "features": [
                        {"id": 10, "name": "Rally", "main_body": "Inspire allies."},
                        {"id": 147, "name": "Make a Scene", "main_body": "- a\n- b"}
                    ]
                }])),
                ru: entities(json!([{
                    "slug": "bard", "name": "Бард", "description": "Тестовое описание.",
                    "background_questions": ["Кто вы?", " "],
                    "class_items": ["Любовный роман", "Шепчущая сфера"],
                    "features": [
                        {"id": 10, "name": "Сплочение", "main_body": "Вдохновите союзников."},
                        {"id": 147, "name": "Устроить сцену", "main_body": "- **Первое.** А\n- **Второе.** Б"}
                    ]
                }])),
            },
            rules: Bilingual {
                en: entities(json!([{"id": 1, "name": "Evasion", "description": "Dodge."}])),
                ru: entities(json!([{"id": 1, "name": "Уклонение", "description": "Уклоняйтесь."}])),
            },
            ..Sources::default()
        }
    }

    #[test]
    fn class_description_gets_manual_prefix_and_questions() {
        let sources = sources();
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({"name": "Bard", "description": "<p>Old</p>", "actions": {"x": "y"}}));
        assert!(update_entry(&catalog, &EntryRef::new("Bard"), &mut e));

        assert_eq!(e.str_field("name"), Some("Бард"));
        let description = e.str_field("description").unwrap();
        assert!(description.starts_with("<p><strong>Примечание:</strong>"));
        assert!(description.ends_with("<p>Тестовое описание.</p>"));
        assert_eq!(e["backgroundQuestions"], json!(["Кто вы?"]));
        assert!(!e.contains_key("connections"));
        assert!(!e.contains_key("actions"));
    }

    #[test]
    fn heading_tail_survives_new_description() {
        let merged = keep_heading_tail(
            Some("<p>Старое.</p><p></p><h2>Советы</h2><p>Текст</p>"),
            "<p>Новое.</p>",
        );
        assert_eq!(merged, "<p>Новое.</p><p></p><h2>Советы</h2><p>Текст</p>");
        assert_eq!(keep_heading_tail(Some("<h2>Only</h2>"), "<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn rally_level_five_borrows_base_feature() {
        let sources = sources();
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({"name": "Rally Level 5"}));
        assert!(update_entry(&catalog, &EntryRef::new("Rally Level 5"), &mut e));
        assert_eq!(e.str_field("name"), Some("Сплочение (уровень 5)"));
        assert_eq!(e.str_field("description"), Some("<p>Вдохновите союзников.</p>"));
    }

    #[test]
    fn generated_feature_actions_and_class_items() {
        let sources = sources();
        let catalog = Catalog::build(&sources);

        let mut scene = entry(json!({"name": "Make a Scene", "actions": {"one": "", "two": ""}}));
        assert!(update_entry(&catalog, &EntryRef::new("Make a Scene"), &mut scene));
        let actions = scene.object("actions").unwrap();
        assert_eq!(actions["one"], "<p><strong>Первое.</strong> А</p>");
        assert_eq!(actions["two"], "<p><strong>Второе.</strong> Б</p>");

        let mut orb = entry(json!({"name": "Whispering Orb", "actions": {}}));
        assert!(update_entry(&catalog, &EntryRef::new("Whispering Orb"), &mut orb));
        assert_eq!(orb.str_field("name"), Some("Шепчущая сфера"));
        assert!(!orb.contains_key("actions"));

        let mut book = entry(json!({"name": "Untranslated Book"}));
        assert!(update_entry(&catalog, &EntryRef::new("Untranslated Book"), &mut book));
        assert_eq!(book.str_field("name"), Some("Непереведенная книга"));
        assert_eq!(book.str_field("description"), Some("<p>Книга, которую вы пытаетесь перевести.</p>"));
    }

    #[test]
    fn rules_fill_in_and_unknown_keys_are_missing() {
        let sources = sources();
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({"name": "Evasion"}));
        assert!(update_entry(&catalog, &EntryRef::new("Evasion"), &mut e));
        assert_eq!(e.str_field("name"), Some("Уклонение"));

        let mut unknown = entry(json!({"name": "Nobody", "description": "<p>keep</p>"}));
        assert!(!update_entry(&catalog, &EntryRef::new("Nobody"), &mut unknown));
        assert_eq!(unknown, entry(json!({"name": "Nobody", "description": "<p>keep</p>"})));
    }
}
