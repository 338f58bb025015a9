//! Ancestries and communities: a top-level entity plus its features in one file.

use std::collections::HashMap;

use super::{apply_description, update_feature, EntryRef};
use crate::config::overrides::{PatchSection, FEATURE_NAME_ALIASES, LEGACY_ANCESTRY_KEYS};
use crate::lookup::{Catalog, FeatureScope, TopMap};
use crate::merge::apply_manual_entry_patches;
use crate::model::{Entry, EntryFields};
use crate::services::report::FileStats;
use crate::text::{resolve_alias, sanitize_name};

fn update_top_with_features(
    catalog: &Catalog<'_>,
    top: &TopMap<'_>,
    scope: FeatureScope,
    aliases: Option<&HashMap<&'static str, &'static str>>,
    target: &EntryRef<'_>,
    entry: &mut Entry,
) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let lookup = match aliases {
        Some(aliases) => resolve_alias(norm, aliases),
        None => norm,
    };
    let mut handled = false;

    if let Some(info) = top.get(lookup) {
        entry.set_str("name", sanitize_name(&info.name));
        apply_description(entry, info.description.as_deref());
        entry.remove_field("actions");
        handled = true;
    }

    if let Some(feature) = catalog
        .feature(scope, lookup)
        .or_else(|| catalog.feature(scope, norm))
    {
        update_feature(entry, feature);
        handled = true;
    }
    handled
}

pub fn update_ancestry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    update_top_with_features(
        catalog,
        &catalog.ancestries,
        FeatureScope::Ancestry,
        Some(&FEATURE_NAME_ALIASES),
        target,
        entry,
    )
}

pub fn update_community(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let handled = update_top_with_features(
        catalog,
        &catalog.communities,
        FeatureScope::Community,
        None,
        target,
        entry,
    );
    apply_manual_entry_patches(PatchSection::Communities, target.key, entry);
    handled
}

/// Legacy ancestry keys are expected to stay unmatched: they leave both the missing list and
/// the total.
pub fn exclude_legacy_ancestry_keys(stats: &mut FileStats, missing: Vec<String>) -> Vec<String> {
    let before = stats.missing.len();
    stats.missing.retain(|key| !LEGACY_ANCESTRY_KEYS.contains(key.as_str()));
    stats.total -= before - stats.missing.len();
    missing
        .into_iter()
        .filter(|key| !LEGACY_ANCESTRY_KEYS.contains(key.as_str()))
        .collect()
}
