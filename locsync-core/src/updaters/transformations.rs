use serde_json::{Map, Value};

use super::{set_or_remove_description, EntryRef};
use crate::config::overrides::{TRANSFORMATION_ACTION_NAME_TRANSLATIONS, TRANSFORMATION_ENTRY_ALIASES};
use crate::lookup::{append_uuid_paragraphs, render_transformation_description, Catalog};
use crate::merge::apply_action_overrides;
use crate::model::{Entry, EntryFields};
use crate::text::{resolve_alias, sanitize_name};

fn translate_action_names(actions: &mut Map<String, Value>) {
    for action in actions.values_mut() {
        let Some(action) = action.as_object_mut() else { continue };
        let Some(name) = action.str_field("name") else { continue };
        if let Some(translated) = TRANSFORMATION_ACTION_NAME_TRANSLATIONS.get(name.trim().to_lowercase().as_str()) {
            action.set_str("name", *translated);
        }
    }
}

pub fn update_entry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let lookup = resolve_alias(norm, &TRANSFORMATION_ENTRY_ALIASES);
    let Some(info) = catalog.transformations.get(lookup) else {
        return false;
    };

    if !info.name.is_empty() {
        entry.set_str("name", sanitize_name(&info.name));
    }
    let previous = entry.str_field("description").unwrap_or("").to_string();
    let description = append_uuid_paragraphs(&render_transformation_description(info), &previous);
    set_or_remove_description(entry, &description);

    if let Some(actions) = entry.object_mut("actions") {
        translate_action_names(actions);
    }
    apply_action_overrides(entry);
    true
}
