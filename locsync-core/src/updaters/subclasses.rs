use super::{apply_description, apply_feature_generated_actions, update_feature, EntryRef};
use crate::config::overrides::SUBCLASS_NAME_ALIASES;
use crate::lookup::{Catalog, FeatureScope};
use crate::merge::apply_action_overrides;
use crate::model::{Entry, EntryFields};
use crate::text::{resolve_alias, sanitize_name};

pub fn update_entry(catalog: &Catalog<'_>, target: &EntryRef<'_>, entry: &mut Entry) -> bool {
    let Some(norm) = target.norm.as_deref() else {
        return false;
    };
    let lookup = resolve_alias(norm, &SUBCLASS_NAME_ALIASES);
    let mut handled = false;

    if let Some(info) = catalog.subclasses.get(lookup) {
        entry.set_str("name", sanitize_name(&info.name));
        apply_description(entry, info.description.as_deref());
        entry.remove_field("actions");
        handled = true;
    }

    let feature = catalog
        .feature(FeatureScope::Subclass, lookup)
        .or_else(|| catalog.feature(FeatureScope::Subclass, norm));
    if let Some(info) = feature {
        update_feature(entry, info);
        handled = true;
        apply_feature_generated_actions(entry, info.raw);
    }

    apply_action_overrides(entry);
    handled
}
