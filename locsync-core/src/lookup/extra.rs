//! Category-specific lookup tables and description builders.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::overrides::DEFAULT_OTHER_LABEL;
use crate::model::{SourceEntity, SubFeature};
use crate::text::normalize::normalise_text;
use crate::text::{markdown_to_html, normalize_key, sanitize_html, sanitize_name, strip_links};

static SINGLE_PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^<p>(.*)</p>$").unwrap());
static LEADING_ARTICLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:an?\s+)").unwrap());
static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());
static ANCESTRY_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\n!\[[^\]]*\]\([^)]*\)|\n<img[^>]*>").unwrap());
static MD_IMAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static HTML_IMAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img[^>]*>").unwrap());
static POTENTIAL_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^,()]+)\([^)]*\)").unwrap());
static TRAILING_COLON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:：]+$").unwrap());
static SEPARATORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,.\s]+").unwrap());
static PARAGRAPH_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<p[^>]*>").unwrap());
static UUID_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@UUID\[[^\]]+\]").unwrap());

/// `<p>x</p>` becomes `x`. The match is greedy, so `<p>a</p><p>b</p>` yields `a</p><p>b`.
pub fn unwrap_single_paragraph(html: &str) -> String {
    match SINGLE_PARAGRAPH_RE.captures(html) {
        Some(caps) => caps[1].to_string(),
        None => html.to_string(),
    }
}

/// `<p><strong>Name</strong>: body</p>` per feature.
pub fn build_feature_description(features: &[SubFeature]) -> Option<String> {
    let chunks: Vec<String> = features
        .iter()
        .filter_map(|feature| {
            let title = sanitize_name(feature.name_or_empty());
            let body = sanitize_html(&markdown_to_html(feature.main_body_or_empty()));
            let inner = unwrap_single_paragraph(&body);
            if !title.is_empty() && !inner.is_empty() {
                Some(format!("<p><strong>{title}</strong>: {inner}</p>"))
            } else if !title.is_empty() {
                Some(format!("<p><strong>{title}</strong></p>"))
            } else if !body.is_empty() {
                Some(body)
            } else {
                None
            }
        })
        .collect();
    (!chunks.is_empty()).then(|| chunks.concat())
}

/// Ancestry body: text before the first image, first two paragraphs, else the short description.
pub fn prepare_ancestry_main_body(entity: &SourceEntity, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let truncated = match ANCESTRY_IMAGE_RE.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    };
    let normalised = truncated.replace("\r\n", "\n");
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK_RE
        .split(&normalised)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .take(2)
        .collect();
    if paragraphs.is_empty() {
        return entity.short_description.as_deref().unwrap_or("").trim().to_string();
    }
    paragraphs.join("\n\n")
}

/// Community body: images dropped, first paragraph plus a following italic one.
pub fn prepare_community_main_body(_entity: &SourceEntity, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let without_images = MD_IMAGE_RE.replace_all(value, "");
    let without_images = HTML_IMAGE_RE.replace_all(&without_images, "");
    let chunks: Vec<&str> = PARAGRAPH_BREAK_RE
        .split(&without_images)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .take(2)
        .collect();
    match chunks.as_slice() {
        [] => String::new(),
        [first, second] if second.starts_with('*') => format!("{first}\n\n{second}"),
        [first, ..] => first.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationEntry {
    pub name: String,
    pub short_description: String,
    pub feature_name: String,
    pub feature_body: String,
}

/// One entry per transformation feature, keyed by normalized `"<entity> - <feature>"`.
pub fn build_transformation_map(en: &[SourceEntity], ru: &[SourceEntity]) -> HashMap<String, TransformationEntry> {
    let ru_by_key: HashMap<String, &SourceEntity> = ru
        .iter()
        .filter_map(|entry| entry.source_key().map(|key| (key, entry)))
        .collect();

    let mut map = HashMap::new();
    for en_entry in en {
        let Some(key) = en_entry.source_key() else { continue };
        let Some(ru_entry) = ru_by_key.get(&key) else { continue };

        let short_description = ru_entry.short_description.clone().unwrap_or_default();
        let base_name = sanitize_name(
            ru_entry
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(en_entry.name_or_empty()),
        );

        for feature in &en_entry.features {
            let Some(id) = feature.id.as_ref() else { continue };
            let Some(ru_feature) = ru_entry.features.iter().find(|f| f.id.as_ref() == Some(id)) else {
                continue;
            };
            let key_name = format!("{} - {}", en_entry.name_or_empty(), feature.name_or_empty());
            let Some(norm) = normalize_key(key_name.trim()) else { continue };

            let feature_name = sanitize_name(
                ru_feature
                    .name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(feature.name_or_empty()),
            );
            let name = if feature_name.is_empty() {
                base_name.clone()
            } else {
                format!("{base_name} - {feature_name}")
            };
            map.insert(
                norm,
                TransformationEntry {
                    name,
                    short_description: short_description.clone(),
                    feature_name,
                    feature_body: ru_feature.main_body_or_empty().to_string(),
                },
            );
        }
    }
    map
}

/// Short description, then `"<feature>: <body>"`.
pub fn render_transformation_description(info: &TransformationEntry) -> String {
    let mut sections = String::new();
    sections.push_str(&markdown_to_html(&info.short_description));
    let body = info.feature_body.trim();
    if !body.is_empty() {
        let markdown = if info.feature_name.is_empty() {
            body.to_string()
        } else {
            format!("{}: {body}", info.feature_name)
        };
        sections.push_str(&markdown_to_html(&markdown));
    }
    sections
}

/// Paragraphs of `html` that carry an `@UUID[...]` link.
pub fn extract_uuid_paragraphs(html: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(open) = PARAGRAPH_OPEN_RE.find_at(html, cursor) {
        let Some(close_offset) = html[open.end()..].find("</p>") else {
            break;
        };
        let end = open.end() + close_offset + "</p>".len();
        let paragraph = &html[open.start()..end];
        let inner = &html[open.end()..open.end() + close_offset];
        if UUID_REF_RE.is_match(inner) {
            found.push(paragraph);
        }
        cursor = end;
    }
    found
}

/// Re-appends link paragraphs of `legacy` that `html` no longer contains.
pub fn append_uuid_paragraphs(html: &str, legacy: &str) -> String {
    let mut result = html.to_string();
    for fragment in extract_uuid_paragraphs(legacy) {
        if !result.contains(fragment) {
            result.push_str(fragment);
        }
    }
    result
}

/// Normalized English class item name to its Russian name, by list position.
pub fn build_class_item_map(en: &[SourceEntity], ru: &[SourceEntity]) -> HashMap<String, String> {
    let ru_by_slug: HashMap<&str, &SourceEntity> = ru
        .iter()
        .filter_map(|entry| entry.slug.as_deref().map(|slug| (slug, entry)))
        .collect();

    let mut map = HashMap::new();
    for en_entry in en {
        let Some(slug) = en_entry.slug.as_deref() else { continue };
        let Some(ru_entry) = ru_by_slug.get(slug) else { continue };

        for (en_item, ru_item) in en_entry.class_items.iter().zip(&ru_entry.class_items) {
            let ru_name = sanitize_name(ru_item);
            let key = normalize_key(en_item);
            if let Some(key) = &key {
                map.insert(key.clone(), ru_name.clone());
            }
            let article_free = LEADING_ARTICLE_RE.replace(en_item, "");
            if let Some(no_article) = normalize_key(&article_free) {
                if key.as_ref() != Some(&no_article) {
                    map.insert(no_article, ru_name);
                }
            }
        }
    }
    map
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentEntry {
    pub name: String,
    pub description: Option<String>,
}

pub type EquipmentMap = HashMap<String, EquipmentEntry>;

/// Builds the description of one equipment entry from its Russian and English variants.
pub type DescriptionBuilder = fn(&SourceEntity, &SourceEntity) -> Option<String>;

/// Main body, when it is actually translated.
pub fn default_equipment_description(ru: &SourceEntity, en: &SourceEntity) -> Option<String> {
    let ru_body = normalise_text(ru.main_body_or_empty());
    let en_body = normalise_text(en.main_body_or_empty());
    if !ru_body.is_empty() && (en_body.is_empty() || ru_body != en_body) {
        return Some(markdown_to_html(ru.main_body_or_empty()));
    }
    None
}

pub fn armor_description(ru: &SourceEntity, _en: &SourceEntity) -> Option<String> {
    build_feature_description(&ru.features)
}

pub fn weapon_description(ru: &SourceEntity, en: &SourceEntity) -> Option<String> {
    let from_features = build_feature_description(&ru.features);
    if en.type_slug.as_deref() == Some("combat-wheelchair") {
        return from_features.or_else(|| default_equipment_description(ru, en));
    }
    from_features
}

pub fn build_equipment_map(
    en: &[SourceEntity],
    ru: &[SourceEntity],
    type_slugs: &[&str],
    describe: DescriptionBuilder,
) -> EquipmentMap {
    let ru_by_slug: HashMap<&str, &SourceEntity> = ru
        .iter()
        .filter_map(|entry| entry.slug.as_deref().map(|slug| (slug, entry)))
        .collect();

    let mut map = EquipmentMap::new();
    for en_entry in en {
        let Some(type_slug) = en_entry.type_slug.as_deref() else { continue };
        if !type_slugs.contains(&type_slug) {
            continue;
        }
        let Some(ru_entry) = en_entry.slug.as_deref().and_then(|slug| ru_by_slug.get(slug)) else {
            continue;
        };
        let Some(norm) = normalize_key(en_entry.name_or_empty()) else { continue };

        let description = describe(ru_entry, en_entry)
            .filter(|d| !d.is_empty())
            .map(|d| sanitize_html(&d));
        let name = ru_entry
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(en_entry.name_or_empty());
        map.insert(
            norm,
            EquipmentEntry {
                name: sanitize_name(name),
                description,
            },
        );
    }
    map
}

/// Group labels of a `potential_adversaries` text such as `"Beasts (Bear, Wolf), Guard"`.
pub fn parse_potential_labels(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let cleaned = strip_links(text);
    let mut labels = Vec::new();
    let mut seen = HashSet::new();

    for caps in POTENTIAL_GROUP_RE.captures_iter(&cleaned) {
        let label = sanitize_name(&TRAILING_COLON_RE.replace(&caps[1], ""));
        if !label.is_empty() && seen.insert(label.clone()) {
            labels.push(label);
        }
    }

    let remainder = POTENTIAL_GROUP_RE.replace_all(&cleaned, "");
    let remainder = SEPARATORS_RE.replace_all(&remainder, " ");
    if !remainder.trim().is_empty() {
        labels.push(DEFAULT_OTHER_LABEL.to_string());
    }
    labels
}

/// Environment slug to its ordered potential-adversary group labels.
pub fn build_potential_adversary_labels(entries: &[SourceEntity]) -> HashMap<String, Vec<String>> {
    entries
        .iter()
        .filter_map(|entry| {
            let slug = entry.slug.as_deref().filter(|s| !s.is_empty())?;
            let labels = parse_potential_labels(entry.potential_adversaries.as_deref().unwrap_or(""));
            (!labels.is_empty()).then(|| (slug.to_string(), labels))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entities(value: serde_json::Value) -> Vec<SourceEntity> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn feature_description_inlines_single_paragraphs() {
        let features: Vec<SubFeature> = serde_json::from_value(json!([
            {"id": 1, "name": "Heavy", "main_body": "−1 to Evasion."},
            {"id": 2, "name": "Quiet", "main_body": ""}
        ]))
        .unwrap();
        assert_eq!(
            build_feature_description(&features).as_deref(),
            Some("<p><strong>Heavy</strong>: −1 to Evasion.</p><p><strong>Quiet</strong></p>")
        );
        assert_eq!(build_feature_description(&[]), None);
    }

    #[test]
    fn ancestry_body_stops_at_image() {
        let entity = SourceEntity::default();
        let body = "First.\n\nSecond.\n\nThird.";
        assert_eq!(prepare_ancestry_main_body(&entity, body), "First.\n\nSecond.");
        let with_image = "Intro.\n![map](x.png)\n\nLater.";
        assert_eq!(prepare_ancestry_main_body(&entity, with_image), "Intro.");

        let entity: SourceEntity = serde_json::from_value(json!({"short_description": " Short. "})).unwrap();
        assert_eq!(prepare_ancestry_main_body(&entity, "\n![x](y)"), "Short.");
    }

    #[test]
    fn community_body_keeps_italic_follow_up() {
        let entity = SourceEntity::default();
        assert_eq!(
            prepare_community_main_body(&entity, "Lead.\n\n*Quote.*\n\nRest."),
            "Lead.\n\n*Quote.*"
        );
        assert_eq!(prepare_community_main_body(&entity, "<img src=x>Lead.\n\nPlain."), "Lead.");
    }

    #[test]
    fn transformation_entries_render_feature_line() {
        let en = entities(json!([{"slug": "demigod", "name": "Demigod", "features": [
            {"id": 9, "name": "Ichor of the Gods", "main_body": "Heal."}
        ]}]));
        let ru = entities(json!([{"slug": "demigod", "name": "Полубог", "short_description": "Божественно.", "features": [
            {"id": 9, "name": "Ихор богов", "main_body": "Лечите."}
        ]}]));
        let map = build_transformation_map(&en, &ru);
        let info = &map["demigodichorofthegods"];
        assert_eq!(info.name, "Полубог - Ихор богов");
        assert_eq!(
            render_transformation_description(info),
            "<p>Божественно.</p><p>Ихор богов: Лечите.</p>"
        );
    }

    #[test]
    fn uuid_paragraphs_are_carried_over() {
        let legacy = r#"<p>Old.</p><p class="x">See @UUID[Compendium.a.b]{Link}</p>"#;
        assert_eq!(
            extract_uuid_paragraphs(legacy),
            vec![r#"<p class="x">See @UUID[Compendium.a.b]{Link}</p>"#]
        );
        let merged = append_uuid_paragraphs("<p>New.</p>", legacy);
        assert_eq!(merged, r#"<p>New.</p><p class="x">See @UUID[Compendium.a.b]{Link}</p>"#);
        assert_eq!(append_uuid_paragraphs(&merged, legacy), merged);
    }

    #[test]
    fn class_items_are_keyed_with_and_without_article() {
        let en = entities(json!([{"slug": "wizard", "name": "Wizard", "class_items": ["A Whispering Orb", "Torch"]}]));
        let ru = entities(json!([{"slug": "wizard", "name": "Волшебник", "class_items": ["Шепчущая сфера"]}]));
        let map = build_class_item_map(&en, &ru);
        assert_eq!(map["awhisperingorb"], "Шепчущая сфера");
        assert_eq!(map["whisperingorb"], "Шепчущая сфера");
        assert!(!map.contains_key("torch"));
    }

    #[test]
    fn equipment_maps_filter_by_type() {
        let en = entities(json!([
            {"slug": "chair", "name": "Combat Wheelchair", "type_slug": "combat-wheelchair", "main_body": "Roll."},
            {"slug": "axe", "name": "Axe", "type_slug": "primary-weapon"},
            {"slug": "potion", "name": "Potion", "type_slug": "consumable", "main_body": "Drink."}
        ]));
        let ru = entities(json!([
            {"slug": "chair", "name": "Боевое кресло", "main_body": "Катитесь."},
            {"slug": "axe", "name": "Топор"},
            {"slug": "potion", "name": "Зелье", "main_body": "Drink."}
        ]));
        let weapons = build_equipment_map(
            &en,
            &ru,
            &["primary-weapon", "secondary-weapon", "combat-wheelchair"],
            weapon_description,
        );
        assert_eq!(weapons["combatwheelchair"].description.as_deref(), Some("<p>Катитесь.</p>"));
        assert_eq!(weapons["axe"].description, None);
        assert!(!weapons.contains_key("potion"));

        let consumables = build_equipment_map(&en, &ru, &["consumable"], default_equipment_description);
        assert_eq!(consumables["potion"].name, "Зелье");
        assert_eq!(consumables["potion"].description, None);
    }

    #[test]
    fn potential_labels_group_and_other() {
        assert_eq!(
            parse_potential_labels("Звери (Медведь, Волк), Стражи:(Капитан), Разбойник."),
            vec!["Звери", "Стражи", DEFAULT_OTHER_LABEL]
        );
        assert_eq!(parse_potential_labels("Звери (Медведь)"), vec!["Звери"]);
    }
}
