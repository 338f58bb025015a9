use std::collections::HashMap;

use serde_json::{Map, Value};

use super::EntryRef;
use crate::config::overrides::{ItemOverride, ATTACK_NAME_TRANSLATIONS, EQUIPMENT_NAME_ALIASES};
use crate::lookup::EquipmentMap;
use crate::merge::set_html_field;
use crate::model::{Entry, EntryFields, TranslationDocument};
use crate::text::{resolve_alias, sanitize_name};

/// How one equipment file is updated.
#[derive(Debug, Clone, Copy)]
pub struct EquipmentRules<'a> {
    pub map: &'a EquipmentMap,
    pub overrides: Option<&'a HashMap<&'static str, ItemOverride>>,
    /// Copy the snapshot description when the map entry has none.
    pub preserve_fallback_description: bool,
}

/// Pre-run entries of an equipment file, used when the API no longer knows an item.
pub fn snapshot_entries(doc: &TranslationDocument) -> Map<String, Value> {
    doc.entries().cloned().unwrap_or_default()
}

fn translate_attack(entry: &mut Entry) {
    let Some(attack) = entry.str_field("attack") else {
        return;
    };
    let trimmed = attack.trim();
    if trimmed.is_empty() {
        return;
    }
    if let Some(translated) = ATTACK_NAME_TRANSLATIONS.get(trimmed.to_lowercase().as_str()) {
        entry.set_str("attack", sanitize_name(translated));
    }
}

fn copy_from_snapshot(entry: &mut Entry, fallback: &Entry) {
    if let Some(name) = fallback.get("name") {
        entry.insert("name".to_string(), name.clone());
    }
    match fallback.get("description").filter(|d| is_truthy(d)) {
        Some(description) => {
            entry.insert("description".to_string(), description.clone());
        }
        None => entry.remove_field("description"),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn update_entry(
    rules: &EquipmentRules<'_>,
    fallback: &Map<String, Value>,
    target: &EntryRef<'_>,
    entry: &mut Entry,
) -> bool {
    let key = target.key;
    let fallback_entry = fallback.get(key).and_then(Value::as_object);

    if let Some(item) = rules.overrides.and_then(|o| o.get(key)) {
        let name = if item.name.is_empty() {
            entry.str_field("name").unwrap_or("").to_string()
        } else {
            item.name.to_string()
        };
        entry.set_str("name", sanitize_name(&name));
        match item.description.filter(|d| !d.is_empty()) {
            Some(html) => set_html_field(entry, "description", Some(html)),
            None => entry.remove_field("description"),
        }
        translate_attack(entry);
        return true;
    }

    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let info = rules
        .map
        .get(norm)
        .or_else(|| rules.map.get(resolve_alias(norm, &EQUIPMENT_NAME_ALIASES)));

    let Some(info) = info else {
        return match fallback_entry {
            Some(fallback_entry) => {
                copy_from_snapshot(entry, fallback_entry);
                translate_attack(entry);
                true
            }
            None => false,
        };
    };

    entry.set_str("name", sanitize_name(&info.name));
    let preserved = fallback_entry
        .filter(|_| rules.preserve_fallback_description)
        .and_then(|f| f.get("description"))
        .filter(|d| is_truthy(d));
    match (info.description.as_deref().filter(|d| !d.is_empty()), preserved) {
        (Some(html), _) => set_html_field(entry, "description", Some(html)),
        (None, Some(description)) => {
            entry.insert("description".to_string(), description.clone());
        }
        (None, None) => entry.remove_field("description"),
    }
    translate_attack(entry);
    true
}
