use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::{set_or_remove_description, update_feature, EntryRef};
use crate::config::overrides::{AdversaryFeatureRenderer, ADVERSARY_FEATURE_RENDERERS};
use crate::lookup::{Catalog, FeatureScope};
use crate::merge::{apply_action_overrides, set_action_html, set_html_field};
use crate::model::{Entry, EntryFields, FeatureId, SourceEntity, SubFeature, TranslationDocument};
use crate::splitter::{generate_bullet_actions, render_battle_box_random_tactics, strip_leading_strong_label};
use crate::text::{markdown_to_html, normalize_key, sanitize_name};

static EXPERIENCE_BONUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[+\-]\d+\s*$").unwrap());
static ITEM_KIND_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[-–—]\s*(?:action|reaction|passive|действие|реакция|пассив\S*)$").unwrap()
});

const BATTLE_BOX_SLUG: &str = "battle-box";

/// Previous-revision adversary entries by normalized key.
pub type OriginalAdversaries = HashMap<String, Entry>;

pub fn index_originals(doc: &TranslationDocument) -> OriginalAdversaries {
    doc.entries()
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| Some((normalize_key(key)?, value.as_object()?.clone())))
        .collect()
}

fn strip_experience_bonus(name: &str) -> String {
    EXPERIENCE_BONUS_RE.replace(name, "").trim().to_string()
}

/// Drops a trailing ` - Action` / ` - Реакция` style kind marker.
pub(crate) fn clean_item_name(name: &str) -> String {
    ITEM_KIND_SUFFIX_RE.replace(name, "").trim().to_string()
}

fn render_feature(feature: &SubFeature) -> Option<String> {
    let renderer = feature
        .id
        .as_ref()
        .and_then(FeatureId::as_number)
        .and_then(|id| ADVERSARY_FEATURE_RENDERERS.get(&id));
    match renderer {
        Some(AdversaryFeatureRenderer::BattleBoxRandomTactics) => render_battle_box_random_tactics(feature),
        None => Some(markdown_to_html(feature.main_body_or_empty())),
    }
}

fn apply_feature_to_item(item: &mut Entry, feature: &SubFeature) {
    let name = sanitize_name(&clean_item_name(feature.name_or_empty()));
    if !name.is_empty() {
        item.set_str("name", name);
    }
    set_or_remove_description(item, &render_feature(feature).unwrap_or_default());
}

fn apply_to_item_at(items: &mut Map<String, Value>, key: &str, feature: &SubFeature) {
    if let Some(Value::Object(item)) = items.get_mut(key) {
        apply_feature_to_item(item, feature);
    }
}

/// The battle box lists each random tactic as its own item, between the fixed features.
fn apply_battle_box(entry: &mut Entry, features: &[SubFeature]) {
    let Some(items) = entry.object_mut("items") else {
        return;
    };
    let keys: Vec<String> = items.keys().cloned().collect();
    if keys.len() < 2 || features.len() < 2 {
        return;
    }

    apply_to_item_at(items, &keys[0], &features[0]);
    apply_to_item_at(items, &keys[1], &features[1]);

    let tactics = generate_bullet_actions(&features[1]);
    for (key, html) in keys[2..].iter().zip(&tactics) {
        let html = strip_leading_strong_label(html);
        if html.is_empty() {
            continue;
        }
        let Some(Value::Object(target)) = items.get_mut(key) else { continue };
        set_html_field(target, "description", Some(&html));
        if let Some(actions) = target.object_mut("actions") {
            let ids: Vec<String> = actions.keys().cloned().collect();
            for id in ids {
                set_action_html(actions, &id, Some(&html));
            }
        }
    }

    if let Some(overload) = features.get(2) {
        apply_to_item_at(items, &keys[keys.len() - 2], overload);
    }
    if let Some(death_quake) = features.get(3) {
        apply_to_item_at(items, &keys[keys.len() - 1], death_quake);
    }
}

fn pair_items_by_position(items: &mut Map<String, Value>, features: &[SubFeature]) {
    for (item, feature) in items.values_mut().zip(features) {
        if let Value::Object(item) = item {
            apply_feature_to_item(item, feature);
        }
    }
}

/// Matches items to features through the English item names of the previous revision;
/// unmatched items take the next unused feature.
fn pair_items_by_original_names(
    items: &mut Map<String, Value>,
    original_items: &Map<String, Value>,
    en: &SourceEntity,
    ru_features: &[SubFeature],
) {
    let ru_by_id: HashMap<&FeatureId, &SubFeature> = ru_features
        .iter()
        .filter_map(|f| f.id.as_ref().map(|id| (id, f)))
        .collect();

    let mut by_english_name: HashMap<String, &SubFeature> = HashMap::new();
    for en_feature in &en.features {
        let Some(ru_feature) = en_feature.id.as_ref().and_then(|id| ru_by_id.get(id).copied()) else {
            continue;
        };
        if let Some(key) = normalize_key(&clean_item_name(en_feature.name_or_empty())) {
            by_english_name.entry(key).or_insert(ru_feature);
        }
    }

    let mut remaining: Vec<&SubFeature> = ru_features.iter().collect();
    for (item_id, item) in items.iter_mut() {
        let Value::Object(item) = item else { continue };
        let original_name = original_items
            .get(item_id)
            .and_then(Value::as_object)
            .and_then(|o| o.str_field("name"))
            .unwrap_or("");
        let matched = normalize_key(&clean_item_name(original_name)).and_then(|k| by_english_name.get(&k).copied());

        let next = match matched {
            Some(feature) => {
                if let Some(index) = remaining.iter().position(|r| std::ptr::eq(*r, feature)) {
                    remaining.remove(index);
                }
                Some(feature)
            }
            None if !remaining.is_empty() => Some(remaining.remove(0)),
            None => None,
        };
        let Some(feature) = next else { break };
        apply_feature_to_item(item, feature);
    }
}

fn apply_experiences(entry: &mut Entry, experiences: &str) {
    let values: Vec<&str> = experiences
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    let Some(slots) = entry.object_mut("experiences") else {
        return;
    };
    for (i, slot) in slots.values_mut().enumerate() {
        let value = values.get(i).copied().unwrap_or(experiences);
        if value.is_empty() {
            continue;
        }
        if let Value::Object(slot) = slot {
            slot.set_str("name", sanitize_name(&strip_experience_bonus(value)));
        }
    }
}

pub fn update_entry(
    catalog: &Catalog<'_>,
    originals: Option<&OriginalAdversaries>,
    target: &EntryRef<'_>,
    entry: &mut Entry,
) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };

    let Some(info) = catalog.adversaries.get(norm) else {
        let handled = match catalog.feature(FeatureScope::Adversary, norm) {
            Some(feature) => {
                update_feature(entry, feature);
                true
            }
            None => false,
        };
        apply_action_overrides(entry);
        return handled;
    };

    entry.set_str("name", sanitize_name(&info.name));
    let raw = info.raw;
    let summary = raw
        .short_description
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(raw.main_body.as_deref())
        .unwrap_or("");
    set_or_remove_description(entry, &markdown_to_html(summary));

    if let Some(motives) = raw.motives.as_deref().filter(|m| !m.is_empty()) {
        set_html_field(entry, "motivesAndTactics", Some(motives));
    }
    if let Some(weapon) = raw.weapon_name.as_deref().filter(|w| !w.is_empty()) {
        entry.set_str("attack", sanitize_name(weapon));
    }
    if let Some(experiences) = raw.experiences.as_deref().filter(|e| !e.is_empty()) {
        apply_experiences(entry, experiences);
    }

    if raw.slug.as_deref() == Some(BATTLE_BOX_SLUG) {
        apply_battle_box(entry, &raw.features);
    } else if let Some(items) = entry.object_mut("items") {
        let en = originals.and(raw.slug.as_deref()).and_then(|slug| catalog.adversaries_en.get(slug));
        let original_items = originals
            .and_then(|o| o.get(norm))
            .and_then(|o| o.object("items"));
        match (en, original_items) {
            (Some(en), Some(original_items)) if !raw.features.is_empty() && !en.features.is_empty() => {
                pair_items_by_original_names(items, original_items, en, &raw.features);
            }
            _ => pair_items_by_position(items, &raw.features),
        }
    }

    apply_action_overrides(entry);
    true
}
