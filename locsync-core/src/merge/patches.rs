//! Post-merge hand edits: manual description patches and literal action overrides.

use serde_json::Value;

use super::field::{ensure_html_fragment, set_action_html, Position};
use crate::config::overrides::{ManualPatch, PatchSection, ACTION_OVERRIDES, MANUAL_ENTRY_PATCHES};
use crate::model::{action_html, Entry, EntryFields};

fn manual_patch(section: PatchSection, key: &str) -> Option<&'static ManualPatch> {
    MANUAL_ENTRY_PATCHES.get(&section)?.get(key)
}

/// Applies the configured replacements, prefix and suffix to a description.
pub fn apply_manual_description_patches(section: PatchSection, key: &str, html: &str) -> String {
    let Some(patch) = manual_patch(section, key) else {
        return html.to_string();
    };

    let mut updated = html.to_string();
    if !updated.is_empty() {
        for replacement in &patch.replacements {
            updated = replacement
                .pattern
                .replace_all(&updated, replacement.value)
                .into_owned();
        }
    }
    if let Some(prefix) = patch.description_prefix {
        updated = ensure_html_fragment(&updated, prefix, Position::Prefix);
    }
    if let Some(suffix) = patch.description_suffix {
        updated = ensure_html_fragment(&updated, suffix, Position::Suffix);
    }
    updated
}

/// Patches the description and, when configured, every action of an entry.
pub fn apply_manual_entry_patches(section: PatchSection, key: &str, entry: &mut Entry) {
    let Some(patch) = manual_patch(section, key) else {
        return;
    };

    if let Some(description) = entry.str_field("description").map(str::to_string) {
        let patched = apply_manual_description_patches(section, key, &description);
        entry.set_str("description", patched);
    }

    if patch.action_prefix.is_none() && patch.action_suffix.is_none() {
        return;
    }
    let Some(actions) = entry.object_mut("actions") else {
        return;
    };
    let ids: Vec<String> = actions.keys().cloned().collect();
    for id in ids {
        let mut html = action_html(actions, &id);
        if let Some(prefix) = patch.action_prefix {
            html = ensure_html_fragment(&html, prefix, Position::Prefix);
        }
        if let Some(suffix) = patch.action_suffix {
            html = ensure_html_fragment(&html, suffix, Position::Suffix);
        }
        set_action_html(actions, &id, Some(&html));
    }
}

/// Forces the literal override html onto every action id listed in the override table.
pub fn apply_action_overrides(entry: &mut Entry) {
    let Some(actions) = entry.object_mut("actions") else {
        return;
    };
    let ids: Vec<String> = actions
        .keys()
        .filter(|id| ACTION_OVERRIDES.contains_key(id.as_str()))
        .cloned()
        .collect();
    for id in ids {
        let html = ACTION_OVERRIDES[id.as_str()];
        match actions.get_mut(&id) {
            Some(Value::Object(slot)) => {
                slot.insert("description".to_string(), Value::String(html.to_string()));
            }
            Some(slot) => *slot = Value::String(html.to_string()),
            None => {}
        }
    }
}
