//! Category updaters. Each one rewrites the entries of one destination file in place and
//! reports whether a source entity was found for the key.

pub mod adversaries;
pub mod beastforms;
pub mod classes;
pub mod domains;
pub mod environments;
pub mod equipment;
pub mod heritage;
pub mod subclasses;
pub mod transformations;

use std::path::Path;

use serde_json::Value;

use crate::config::overrides::{FeatureActionGenerator, FEATURE_ACTION_GENERATORS};
use crate::error::Result;
use crate::lookup::FeatureEntry;
use crate::merge::{set_action_html, set_html_field};
use crate::model::{Entry, EntryFields, SubFeature};
use crate::services::report::FileStats;
use crate::services::store::{read_document, write_document};
use crate::splitter::generate_bullet_actions;
use crate::text::{normalize_key, sanitize_name};

/// Destination key as seen by an updater.
#[derive(Debug, Clone)]
pub struct EntryRef<'k> {
    pub key: &'k str,
    pub norm: Option<String>,
}

impl<'k> EntryRef<'k> {
    pub fn new(key: &'k str) -> Self {
        Self {
            key,
            norm: normalize_key(key),
        }
    }
}

/// Runs `updater` over every entry of the file at `path` and writes the file back.
///
/// Returns the keys that were not handled. Entries that are not JSON objects count as missing.
pub fn update_entries<F>(path: &Path, stats: &mut FileStats, mut updater: F) -> Result<Vec<String>>
where
    F: FnMut(&EntryRef<'_>, &mut Entry) -> bool,
{
    let mut doc = read_document(path)?;
    let mut missing = Vec::new();

    if let Some(entries) = doc.entries_mut() {
        for (key, value) in entries.iter_mut() {
            stats.total += 1;
            let target = EntryRef::new(key);
            let handled = match value {
                Value::Object(entry) => {
                    let before = serde_json::to_string(&*entry).ok();
                    let handled = updater(&target, entry);
                    if handled {
                        stats.processed += 1;
                        if before == serde_json::to_string(&*entry).ok() {
                            stats.unchanged.push(key.clone());
                        } else {
                            stats.updated += 1;
                        }
                    }
                    handled
                }
                _ => false,
            };
            if !handled {
                missing.push(key.clone());
                stats.missing.push(key.clone());
            }
        }
    }

    write_document(path, &doc)?;
    Ok(missing)
}

/// `None` leaves the description alone, an empty string removes it.
pub(crate) fn apply_description(entry: &mut Entry, description: Option<&str>) {
    match description {
        None => {}
        Some("") => entry.remove_field("description"),
        Some(html) => set_html_field(entry, "description", Some(html)),
    }
}

pub(crate) fn set_or_remove_description(entry: &mut Entry, html: &str) {
    set_html_field(entry, "description", (!html.is_empty()).then_some(html));
}

/// Name and description of a standalone feature entry.
pub(crate) fn update_feature(entry: &mut Entry, info: &FeatureEntry<'_>) {
    if !info.name.is_empty() {
        entry.set_str("name", sanitize_name(&info.name));
    }
    apply_description(entry, info.description.as_deref());
}

/// Distributes generated bullet actions over the entry's action slots, by position.
pub(crate) fn apply_feature_generated_actions(entry: &mut Entry, feature: &SubFeature) {
    let Some(id) = feature.id.as_ref().and_then(|id| id.as_number()) else {
        return;
    };
    let generated = match FEATURE_ACTION_GENERATORS.get(&id) {
        Some(FeatureActionGenerator::BulletActions) => generate_bullet_actions(feature),
        None => return,
    };
    if generated.is_empty() {
        return;
    }
    let Some(actions) = entry.object_mut("actions") else {
        return;
    };
    let ids: Vec<String> = actions.keys().cloned().collect();
    for (id, html) in ids.iter().zip(&generated) {
        if !html.is_empty() {
            set_action_html(actions, id, Some(html));
        }
    }
}

pub(crate) fn truthy_str(entry: &Entry, key: &str) -> bool {
    entry.str_field(key).is_some_and(|s| !s.is_empty())
}
