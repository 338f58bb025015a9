use std::collections::HashMap;

use indexmap::IndexSet;

use crate::model::{FeatureId, FeatureList, SourceEntity, SubFeature, TextField};
use crate::text::normalize::normalise_text;
use crate::text::{markdown_to_html, normalize_key, sanitize_name};

/// Rewrites the main field of an entity before it joins the description.
pub type MainFieldProcessor = fn(&SourceEntity, &str) -> String;

#[derive(Debug, Clone, Copy)]
pub struct MainField {
    pub field: TextField,
    pub processor: Option<MainFieldProcessor>,
}

impl MainField {
    pub const fn plain(field: TextField) -> Self {
        Self {
            field,
            processor: None,
        }
    }

    pub const fn processed(field: TextField, processor: MainFieldProcessor) -> Self {
        Self {
            field,
            processor: Some(processor),
        }
    }
}

/// Translated entity keyed by its normalized English name.
#[derive(Debug, Clone)]
pub struct TopEntry<'s> {
    pub name: String,
    /// `None` when the translated text equals the English one.
    pub description: Option<String>,
    pub raw: &'s SourceEntity,
}

pub type TopMap<'s> = HashMap<String, TopEntry<'s>>;

#[derive(Debug, Clone)]
pub struct FeatureEntry<'s> {
    pub name: String,
    pub description: Option<String>,
    pub raw: &'s SubFeature,
}

pub type FeatureMap<'s> = HashMap<String, FeatureEntry<'s>>;

/// Category a feature map is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureScope {
    Class,
    Subclass,
    Ancestry,
    Community,
    DomainCard,
    Beastform,
    Adversary,
    Environment,
}

impl FeatureScope {
    pub const ALL: [FeatureScope; 8] = [
        FeatureScope::Class,
        FeatureScope::Subclass,
        FeatureScope::Ancestry,
        FeatureScope::Community,
        FeatureScope::DomainCard,
        FeatureScope::Beastform,
        FeatureScope::Adversary,
        FeatureScope::Environment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FeatureScope::Class => "class",
            FeatureScope::Subclass => "subclass",
            FeatureScope::Ancestry => "ancestry",
            FeatureScope::Community => "community",
            FeatureScope::DomainCard => "domain-card",
            FeatureScope::Beastform => "beastform",
            FeatureScope::Adversary => "adversary",
            FeatureScope::Environment => "environment",
        }
    }

    pub fn lists(self) -> &'static [FeatureList] {
        match self {
            FeatureScope::Subclass => &[
                FeatureList::Foundation,
                FeatureList::Specialization,
                FeatureList::Mastery,
            ],
            _ => &[FeatureList::Features],
        }
    }
}

/// Two parents that translate the same feature name differently. The first one wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conflict {
    pub feature: String,
    pub scope: &'static str,
    pub first_scope: &'static str,
}

fn by_source_key(entries: &[SourceEntity]) -> HashMap<String, &SourceEntity> {
    entries
        .iter()
        .filter_map(|entry| entry.source_key().map(|key| (key, entry)))
        .collect()
}

fn collect_part(value: Option<&str>, parts: &mut Vec<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }
}

fn main_field_text(entity: &SourceEntity, main: &MainField) -> Option<String> {
    let value = entity.text(main.field)?;
    match main.processor {
        Some(process) if !value.is_empty() => Some(process(entity, value)),
        _ => Some(value.to_string()),
    }
}

/// Pairs English and Russian entities by slug and joins the given fields into a description.
pub fn build_top_level_map<'s>(
    en: &[SourceEntity],
    ru: &'s [SourceEntity],
    description_fields: &[TextField],
    main: Option<MainField>,
) -> TopMap<'s> {
    let ru_by_key = by_source_key(ru);
    let mut map = TopMap::new();

    for en_entry in en {
        let Some(key) = en_entry.source_key() else { continue };
        let Some(ru_entry) = ru_by_key.get(&key).copied() else { continue };
        let Some(norm) = normalize_key(en_entry.name_or_empty()) else { continue };

        let mut ru_parts = Vec::new();
        let mut en_parts = Vec::new();
        for field in description_fields {
            collect_part(ru_entry.text(*field), &mut ru_parts);
            collect_part(en_entry.text(*field), &mut en_parts);
        }
        if let Some(main) = main.as_ref() {
            collect_part(main_field_text(ru_entry, main).as_deref(), &mut ru_parts);
            collect_part(main_field_text(en_entry, main).as_deref(), &mut en_parts);
        }
        let desc_ru = ru_parts.join("\n\n");
        let desc_en = en_parts.join("\n\n");

        let same_text = !desc_ru.is_empty()
            && !desc_en.is_empty()
            && normalise_text(&desc_ru) == normalise_text(&desc_en);
        let description = (!desc_ru.is_empty() && !same_text).then(|| markdown_to_html(&desc_ru));

        let name = match ru_entry.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => en_entry.name_or_empty(),
        };
        map.insert(
            norm,
            TopEntry {
                name: sanitize_name(name),
                description,
                raw: ru_entry,
            },
        );
    }
    map
}

/// Feature translations for one scope, matched by feature id inside the same parent.
pub fn build_feature_map<'s>(
    en: &[SourceEntity],
    ru: &'s [SourceEntity],
    scope: FeatureScope,
    conflicts: &mut IndexSet<Conflict>,
) -> FeatureMap<'s> {
    let ru_by_key = by_source_key(ru);
    let mut map = FeatureMap::new();
    let mut first_scope: HashMap<String, &'static str> = HashMap::new();

    for en_entry in en {
        let Some(key) = en_entry.source_key() else { continue };
        let Some(ru_entry) = ru_by_key.get(&key).copied() else { continue };

        for list in scope.lists() {
            let ru_features: HashMap<&FeatureId, &'s SubFeature> = ru_entry
                .features_of(*list)
                .iter()
                .filter_map(|f| f.id.as_ref().map(|id| (id, f)))
                .collect();

            for feature in en_entry.features_of(*list) {
                let Some(id) = feature.id.as_ref() else { continue };
                let Some(ru_feature) = ru_features.get(id).copied() else { continue };

                let name_en = feature.name_or_empty();
                let Some(norm) = normalize_key(name_en) else { continue };

                let ru_name = match ru_feature.name.as_deref() {
                    Some(name) if !name.is_empty() => sanitize_name(name),
                    _ => sanitize_name(name_en),
                };
                let ru_body = normalise_text(ru_feature.main_body_or_empty());
                let en_body = normalise_text(feature.main_body_or_empty());
                let same_name = ru_name.is_empty() || ru_name == name_en;
                let same_body = !ru_body.is_empty() && !en_body.is_empty() && ru_body == en_body;
                if same_name && same_body {
                    continue;
                }

                let description = (!same_body).then(|| markdown_to_html(ru_feature.main_body_or_empty()));
                let candidate = FeatureEntry {
                    name: if ru_name.is_empty() { name_en.to_string() } else { ru_name },
                    description,
                    raw: ru_feature,
                };

                if let Some(existing) = map.get(&norm) {
                    let differs = match (&candidate.description, &existing.description) {
                        (Some(new), Some(old)) => !new.is_empty() && !old.is_empty() && new != old,
                        _ => false,
                    };
                    if differs {
                        conflicts.insert(Conflict {
                            feature: name_en.to_string(),
                            scope: scope.label(),
                            first_scope: first_scope.get(&norm).copied().unwrap_or(scope.label()),
                        });
                    }
                    continue;
                }

                first_scope.insert(norm.clone(), scope.label());
                map.insert(norm, candidate);
            }
        }
    }
    map
}
