use serde_json::Value;

use super::adversaries::{self, clean_item_name};
use super::{set_or_remove_description, update_feature, EntryRef};
use crate::lookup::{Catalog, FeatureScope, TopEntry};
use crate::merge::secrets::extract_secret_texts;
use crate::merge::{apply_action_overrides, dedupe_secret_content, preserve_secret_sections_from_source, set_html_field};
use crate::model::{Entry, EntryFields, SubFeature};
use crate::text::sanitize::{extract_plain_text, extract_visible_text};
use crate::text::{markdown_to_html, sanitize_name};

/// New item body, unless the previous one already carries the same text or its secrets.
fn reconcile_item_body(next: String, previous: Option<&str>) -> String {
    let Some(previous) = previous.filter(|p| !p.is_empty()) else {
        return next;
    };

    let next_visible = extract_visible_text(&next);
    let keeps_secret = !next_visible.is_empty()
        && extract_secret_texts(previous)
            .iter()
            .any(|secret| next_visible.contains(secret.as_str()));
    if keeps_secret {
        return previous.to_string();
    }

    let previous_plain = extract_plain_text(previous);
    let next_plain = extract_plain_text(&next);
    if !previous_plain.is_empty() && previous_plain == next_plain {
        return previous.to_string();
    }
    preserve_secret_sections_from_source(&next, previous)
}

fn apply_item(item: &mut Entry, feature: &SubFeature) {
    let body = reconcile_item_body(
        markdown_to_html(feature.main_body_or_empty()),
        item.str_field("description"),
    );

    item.set_str("name", sanitize_name(&clean_item_name(feature.name_or_empty())));

    if body.is_empty() {
        item.remove_field("description");
        return;
    }
    set_html_field(item, "description", Some(&body));
    if let Some(description) = item.str_field("description").filter(|d| !d.is_empty()) {
        let deduped = dedupe_secret_content(description);
        item.set_str("description", deduped);
    }
}

fn apply_potential_adversaries(entry: &mut Entry, labels: &[String]) {
    let Some(groups) = entry.object_mut("potentialAdversaries") else {
        return;
    };
    for (group, label) in groups.values_mut().zip(labels) {
        if label.is_empty() {
            continue;
        }
        if let Value::Object(group) = group {
            group.set_str("label", sanitize_name(label));
        }
    }
}

fn apply_environment(catalog: &Catalog<'_>, info: &TopEntry<'_>, entry: &mut Entry) {
    entry.set_str("name", sanitize_name(&info.name));
    let raw = info.raw;

    let summary = raw
        .short_description
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(raw.main_body.as_deref())
        .unwrap_or("");
    set_or_remove_description(entry, &markdown_to_html(summary));

    if let Some(items) = entry.object_mut("items") {
        for (item, feature) in items.values_mut().zip(&raw.features) {
            if let Value::Object(item) = item {
                apply_item(item, feature);
            }
        }
    }

    if let Some(impulses) = raw.impulses.as_deref().filter(|i| !i.is_empty()) {
        set_html_field(entry, "impulses", Some(impulses));
    }

    let labels = raw
        .slug
        .as_deref()
        .and_then(|slug| catalog.potential_labels.get(slug));
    if let Some(labels) = labels {
        apply_potential_adversaries(entry, labels);
    }
}

pub fn update_entry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };

    let handled = if let Some(info) = catalog.environments.get(norm) {
        apply_environment(catalog, info, entry);
        true
    } else if let Some(feature) = catalog.feature(FeatureScope::Environment, norm) {
        update_feature(entry, feature);
        true
    } else {
        false
    };

    apply_action_overrides(entry);
    handled
}

/// Entries of a file that mixes adversaries and environments go to whichever side knows them.
pub fn update_mixed_entry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let known = |top: bool, scope: FeatureScope| top || catalog.feature(scope, norm).is_some();

    if known(catalog.adversaries.contains_key(norm), FeatureScope::Adversary) {
        adversaries::update_entry(catalog, None, target, entry)
    } else if known(catalog.environments.contains_key(norm), FeatureScope::Environment) {
        update_entry(catalog, target, entry)
    } else {
        false
    }
}
