//! Read-only lookup maps built once per run from the bilingual source data.

pub mod extra;
pub mod top;

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::model::{SourceEntity, Sources, TextField};

pub use extra::{
    append_uuid_paragraphs, build_class_item_map, build_equipment_map, build_feature_description,
    build_potential_adversary_labels, build_transformation_map, render_transformation_description,
    EquipmentEntry, EquipmentMap, TransformationEntry,
};
pub use top::{
    build_feature_map, build_top_level_map, Conflict, FeatureEntry, FeatureMap, FeatureScope, MainField,
    TopEntry, TopMap,
};

/// Every map the category updaters read from.
#[derive(Debug)]
pub struct Catalog<'s> {
    pub classes: TopMap<'s>,
    pub subclasses: TopMap<'s>,
    pub ancestries: TopMap<'s>,
    pub communities: TopMap<'s>,
    pub domains: TopMap<'s>,
    pub beastforms: TopMap<'s>,
    pub adversaries: TopMap<'s>,
    pub environments: TopMap<'s>,
    pub rules: TopMap<'s>,
    pub transformations: HashMap<String, TransformationEntry>,
    pub features: HashMap<FeatureScope, FeatureMap<'s>>,
    pub conflicts: IndexSet<Conflict>,
    pub class_items: HashMap<String, String>,
    pub armors: EquipmentMap,
    pub weapons: EquipmentMap,
    pub consumables: EquipmentMap,
    pub loot: EquipmentMap,
    pub potential_labels: HashMap<String, Vec<String>>,
    /// English adversaries by slug, for pairing items by their English names.
    pub adversaries_en: HashMap<String, &'s SourceEntity>,
}

impl<'s> Catalog<'s> {
    pub fn build(sources: &'s Sources) -> Self {
        use TextField::{Description, MainBody, ShortDescription};

        let top = |data: &'s crate::model::Bilingual, fields: &[TextField], main: Option<MainField>| {
            build_top_level_map(&data.en, &data.ru, fields, main)
        };

        let mut conflicts = IndexSet::new();
        let mut features = HashMap::new();
        for scope in FeatureScope::ALL {
            let data = match scope {
                FeatureScope::Class => &sources.classes,
                FeatureScope::Subclass => &sources.subclasses,
                FeatureScope::Ancestry => &sources.ancestries,
                FeatureScope::Community => &sources.communities,
                FeatureScope::DomainCard => &sources.domains,
                FeatureScope::Beastform => &sources.beastforms,
                FeatureScope::Adversary => &sources.adversaries,
                FeatureScope::Environment => &sources.environments,
            };
            features.insert(scope, build_feature_map(&data.en, &data.ru, scope, &mut conflicts));
        }

        let equipment = &sources.equipment;
        Self {
            classes: top(&sources.classes, &[Description], None),
            subclasses: top(&sources.subclasses, &[Description], None),
            ancestries: top(
                &sources.ancestries,
                &[ShortDescription, Description],
                Some(MainField::processed(MainBody, extra::prepare_ancestry_main_body)),
            ),
            communities: top(
                &sources.communities,
                &[Description, ShortDescription],
                Some(MainField::processed(MainBody, extra::prepare_community_main_body)),
            ),
            domains: top(&sources.domains, &[], Some(MainField::plain(MainBody))),
            beastforms: top(&sources.beastforms, &[MainBody, ShortDescription], None),
            adversaries: top(&sources.adversaries, &[ShortDescription], None),
            environments: top(&sources.environments, &[ShortDescription], None),
            rules: top(&sources.rules, &[Description], Some(MainField::plain(MainBody))),
            transformations: build_transformation_map(&sources.transformations.en, &sources.transformations.ru),
            features,
            conflicts,
            class_items: build_class_item_map(&sources.classes.en, &sources.classes.ru),
            armors: build_equipment_map(&equipment.en, &equipment.ru, &["armor"], extra::armor_description),
            weapons: build_equipment_map(
                &equipment.en,
                &equipment.ru,
                &["primary-weapon", "secondary-weapon", "combat-wheelchair"],
                extra::weapon_description,
            ),
            consumables: build_equipment_map(
                &equipment.en,
                &equipment.ru,
                &["consumable"],
                extra::default_equipment_description,
            ),
            loot: build_equipment_map(&equipment.en, &equipment.ru, &["item"], extra::default_equipment_description),
            potential_labels: build_potential_adversary_labels(&sources.environments.ru),
            adversaries_en: sources
                .adversaries
                .en
                .iter()
                .filter_map(|entry| {
                    let slug = entry.slug.as_deref().filter(|s| !s.is_empty())?;
                    Some((slug.to_string(), entry))
                })
                .collect(),
        }
    }

    pub fn feature(&self, scope: FeatureScope, norm: &str) -> Option<&FeatureEntry<'s>> {
        self.features.get(&scope)?.get(norm)
    }
}
