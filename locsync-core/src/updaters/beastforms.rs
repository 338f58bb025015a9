use serde_json::Value;

use super::{set_or_remove_description, truthy_str, update_feature, EntryRef};
use crate::lookup::{build_feature_description, Catalog, FeatureScope};
use crate::merge::{apply_action_overrides, set_html_field};
use crate::model::{Entry, EntryFields, SourceEntity, SubFeature};
use crate::text::{markdown_to_html, sanitize_html, sanitize_name, strip_links};

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_advantages(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(sanitize_name)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

/// Pairs item entries with features by position, stopping at the shorter list.
fn apply_items(entry: &mut Entry, features: &[SubFeature]) {
    let Some(items) = entry.object_mut("items") else {
        return;
    };
    for (item, feature) in items.values_mut().zip(features) {
        let Value::Object(item) = item else { continue };
        item.set_str("name", sanitize_name(feature.name_or_empty()));
        let body = markdown_to_html(feature.main_body_or_empty());
        set_or_remove_description(item, &body);
    }
}

fn apply_form(entry: &mut Entry, name: &str, description: Option<&str>, raw: &SourceEntity) {
    entry.set_str("name", sanitize_name(name));

    let item_count = entry.object("items").map_or(0, |items| items.len());
    let allow_description = truthy_str(entry, "description") && item_count > 0;

    if !raw.features.is_empty() && item_count == 0 {
        match build_feature_description(&raw.features).filter(|_| allow_description) {
            Some(html) => set_html_field(entry, "description", Some(&html)),
            None => entry.remove_field("description"),
        }
    } else {
        match description.filter(|d| allow_description && !d.is_empty()) {
            Some(html) => set_html_field(entry, "description", Some(html)),
            None => entry.remove_field("description"),
        }
        if !raw.features.is_empty() && item_count > 0 {
            apply_items(entry, &raw.features);
        }
    }

    if entry.contains_key("advantageOn") {
        let advantages = parse_advantages(raw.advantages.as_deref());
        if !advantages.is_empty() {
            let list = advantages.iter().map(|a| Value::String(capitalize_first(a))).collect();
            entry.insert("advantageOn".to_string(), Value::Array(list));
        }
    }

    if entry.contains_key("examples") {
        if let Some(examples) = raw.examples.as_deref().filter(|e| !e.is_empty()) {
            let examples = sanitize_html(&strip_links(examples));
            if !examples.is_empty() {
                entry.set_str("examples", examples);
            }
        }
    }
}

pub fn update_entry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };

    let handled = if let Some(info) = catalog.beastforms.get(norm) {
        apply_form(entry, &info.name, info.description.as_deref(), info.raw);
        true
    } else if let Some(feature) = catalog.feature(FeatureScope::Beastform, norm) {
        update_feature(entry, feature);
        true
    } else {
        false
    };

    apply_action_overrides(entry);
    handled
}
