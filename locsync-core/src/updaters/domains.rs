use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{set_or_remove_description, update_feature, EntryRef};
use crate::config::overrides::{BARE_BONES_ARMOR_UUID, BARE_BONES_DOMAIN_SNIPPET, FEATURE_NAME_ALIASES};
use crate::lookup::{Catalog, FeatureScope};
use crate::merge::{apply_action_overrides, merge_foundry_tags, set_html_field};
use crate::model::{action_html, Entry, EntryFields, SubFeature, TranslationDocument};
use crate::splitter::{
    assign_segments, build_segments_for_actions, render_markdown_segments, SlotPlan, SplitInput,
    DOMAIN_SPLITTERS,
};
use crate::text::sanitize::{collapse_adjacent_inline_tags, extract_plain_text, InlineTag};
use crate::text::{markdown_to_html, resolve_alias, sanitize_html, sanitize_name};

const BARE_BONES: &str = "Bare Bones";

/// Action maps of a domain file as they were before the run, by entry key.
pub type ActionSnapshot = HashMap<String, Map<String, Value>>;

pub fn snapshot_actions(doc: &TranslationDocument) -> ActionSnapshot {
    doc.entries()
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| {
            let actions = value.as_object()?.object("actions")?;
            Some((key.clone(), actions.clone()))
        })
        .collect()
}

/// Main body, else the features as `**name:** body` paragraphs.
fn full_description_source(main_body: Option<&str>, features: &[SubFeature]) -> String {
    if let Some(body) = main_body.filter(|b| !b.is_empty()) {
        return body.to_string();
    }
    features
        .iter()
        .map(|feature| {
            let name = match feature.name.as_deref() {
                Some(name) if !name.is_empty() => format!("**{}:** ", sanitize_name(name)),
                _ => String::new(),
            };
            format!("{name}{}", feature.main_body_or_empty())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Plain text the description will have after the merge, directives included.
fn merged_plain_text(existing: &str, full_html: &str) -> String {
    let incoming = if full_html.is_empty() {
        String::new()
    } else {
        sanitize_html(full_html)
    };
    let merged = if incoming.is_empty() {
        String::new()
    } else {
        let merged = merge_foundry_tags(existing, &incoming);
        let merged = collapse_adjacent_inline_tags(&merged, InlineTag::Em);
        collapse_adjacent_inline_tags(&merged, InlineTag::Strong)
    };
    extract_plain_text(if merged.is_empty() { full_html } else { &merged })
}

struct CardText<'a> {
    norm: &'a str,
    markdown: &'a str,
    html: &'a str,
    features: &'a [SubFeature],
}

fn refresh_actions(actions: &mut Map<String, Value>, previous: Option<&Map<String, Value>>, card: &CardText<'_>) {
    let described: Vec<String> = actions
        .keys()
        .filter(|id| {
            let before = previous.map(|p| action_html(p, id)).unwrap_or_default();
            !before.trim().is_empty() || !action_html(actions, id).trim().is_empty()
        })
        .cloned()
        .collect();
    if described.is_empty() {
        return;
    }

    let splitter = DOMAIN_SPLITTERS.get(card.norm);
    let plan = match splitter {
        Some(s) if s.force_unique => SlotPlan::all_unique(&described),
        _ => SlotPlan::derive(&described, previous, actions),
    };
    let desired = plan.unique.len();

    let mut segments = Vec::new();
    if let Some(splitter) = splitter {
        let custom = (splitter.split)(&SplitInput {
            markdown: card.markdown,
            features: card.features,
        });
        segments = render_markdown_segments(&custom, desired);
    }
    if segments.is_empty() {
        if desired <= 1 {
            if desired == 1 && !card.html.is_empty() {
                segments.push(card.html.to_string());
            }
        } else {
            segments = build_segments_for_actions(card.features, card.markdown, desired);
        }
    }
    if segments.is_empty() && !card.html.is_empty() && desired > 0 {
        segments = vec![card.html.to_string(); desired];
    }

    assign_segments(actions, &plan, &segments, card.html);
}

pub fn update_entry(
    catalog: &Catalog<'_>,
    previous_actions: &ActionSnapshot,
    target: &EntryRef<'_>,
    entry: &mut Entry,
) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let key = target.key;
    let lookup = resolve_alias(norm, &FEATURE_NAME_ALIASES);
    let mut handled = false;

    if let Some(info) = catalog.domains.get(lookup) {
        entry.set_str("name", sanitize_name(&info.name));
        let raw = info.raw;

        let markdown = full_description_source(raw.main_body.as_deref(), &raw.features);
        let html = markdown_to_html(&markdown);
        let existing = entry.str_field("description").unwrap_or("").to_string();
        let previous_plain = extract_plain_text(&existing);
        let api_plain = merged_plain_text(&existing, &html);
        let needs_refresh = !api_plain.is_empty() && previous_plain != api_plain;

        set_or_remove_description(entry, &html);

        if key == BARE_BONES {
            if let Some(description) = entry.str_field("description").filter(|d| !d.is_empty()) {
                if !description.contains(BARE_BONES_ARMOR_UUID) {
                    let appended = format!("{}{BARE_BONES_DOMAIN_SNIPPET}", description.trim_end());
                    set_html_field(entry, "description", Some(&appended));
                }
            }
        }

        if needs_refresh {
            if let Some(actions) = entry.object_mut("actions").filter(|a| !a.is_empty()) {
                let card = CardText {
                    norm,
                    markdown: &markdown,
                    html: &html,
                    features: &raw.features,
                };
                refresh_actions(actions, previous_actions.get(key), &card);
            }
        }
        handled = true;
    }

    if !handled {
        if let Some(feature) = catalog
            .feature(FeatureScope::DomainCard, lookup)
            .or_else(|| catalog.feature(FeatureScope::DomainCard, norm))
        {
            update_feature(entry, feature);
            handled = true;
        }
    }

    apply_action_overrides(entry);
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bilingual, Sources};
    use crate::updaters::test_support::{entities, entry};
    use serde_json::json;

    fn sources(ru_body: &str) -> Sources {
        Sources {
            domains: Bilingual {
                en: entities(json!([
                    {"slug": "volley", "name": "Volley", "main_body": "Shoot twice."},
                    {"slug": "bare-bones", "name": "Bare Bones", "main_body": "No armor."},
                    {"slug": "rain", "name": "Rain of Blades", "main_body": "Blades fall. If hit, bleed."}
                ])),
                ru: entities(json!([
                    {"slug": "volley", "name": "Залп", "main_body": ru_body},
                    {"slug": "bare-bones", "name": "Голые кости", "main_body": "Без брони."},
                    {"slug": "rain", "name": "Дождь клинков", "main_body": "Клинки падают. Если цель ранена, она истекает кровью."}
                ])),
            },
            ..Sources::default()
        }
    }

    #[test]
    fn duplicate_slots_stay_identical() {
        let sources = sources("Стреляйте дважды.");
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({
            "name": "Volley",
            "description": "<p>X</p>",
            "actions": {"a": "<p>X</p>", "b": "<p>X</p>"}
        }));
        let previous = HashMap::from([("Volley".to_string(), e.object("actions").unwrap().clone())]);

        assert!(update_entry(&catalog, &previous, &EntryRef::new("Volley"), &mut e));
        assert_eq!(e.str_field("description"), Some("<p>Стреляйте дважды.</p>"));
        assert_eq!(e["actions"], json!({"a": "<p>Стреляйте дважды.</p>", "b": "<p>Стреляйте дважды.</p>"}));
    }

    #[test]
    fn unchanged_description_leaves_actions_alone() {
        let sources = sources("Стреляйте дважды.");
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({
            "name": "Залп",
            "description": "<p>Стреляйте дважды.</p>",
            "actions": {"a": "<p>Ручная правка</p>"}
        }));
        let before = e.clone();
        update_entry(&catalog, &ActionSnapshot::new(), &EntryRef::new("Volley"), &mut e);
        assert_eq!(e, before);
    }

    #[test]
    fn bare_bones_gets_armor_link_once() {
        let sources = sources("x");
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({"name": "Bare Bones"}));
        update_entry(&catalog, &ActionSnapshot::new(), &EntryRef::new("Bare Bones"), &mut e);
        let first = e.str_field("description").unwrap().to_string();
        assert!(first.starts_with("<p>Без брони.</p><p>Наденьте"));
        assert_eq!(first.matches(BARE_BONES_ARMOR_UUID).count(), 1);

        update_entry(&catalog, &ActionSnapshot::new(), &EntryRef::new("Bare Bones"), &mut e);
        assert_eq!(e.str_field("description"), Some(first.as_str()));
    }

    #[test]
    fn registered_splitter_gives_each_slot_its_part() {
        let sources = sources("x");
        let catalog = Catalog::build(&sources);
        let mut e = entry(json!({
            "name": "Rain of Blades",
            "actions": {"hit": {"name": "Hit", "description": "<p>old</p>"}, "bleed": {"name": "Bleed", "description": "<p>old</p>"}}
        }));
        update_entry(&catalog, &ActionSnapshot::new(), &EntryRef::new("Rain of Blades"), &mut e);
        let actions = e.object("actions").unwrap();
        assert_eq!(actions["hit"]["description"], "<p>Клинки падают.</p>");
        assert_eq!(actions["bleed"]["description"], "<p>Если цель ранена, она истекает кровью.</p>");
        assert_eq!(actions["bleed"]["name"], "Bleed");
    }

    #[test]
    fn snapshot_collects_only_entries_with_actions() {
        let doc = TranslationDocument::parse(
            r#"{"entries":{"A":{"actions":{"x":"<p>1</p>"}},"B":{"name":"b"},"C":3}}"#,
        )
        .unwrap();
        let snapshot = snapshot_actions(&doc);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["A"]["x"], "<p>1</p>");
    }
}
