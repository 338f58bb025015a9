//! One sync run: load the cached sources, rewrite every translation file, report.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, error, warn};
use serde_json::{Map, Value};

use super::cache::load_sources;
use super::report::{log_conflicts, log_failures, log_missing, log_summary, FileStats, RunReport, TaskOutcome};
use super::store::{read_document, write_document};
use crate::config::overrides::{ARMOR_OVERRIDES, LABEL_OVERRIDES, VOID_TRANSLATION_PREFIX};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::lookup::Catalog;
use crate::model::{Sources, TranslationDocument};
use crate::updaters::adversaries::{self, OriginalAdversaries};
use crate::updaters::domains::{self, ActionSnapshot};
use crate::updaters::equipment::{self, EquipmentRules};
use crate::updaters::{
    beastforms, classes, environments, heritage, subclasses, transformations, update_entries,
};

/// Task key and file name of every base translation file, in report order.
pub const TRANSLATION_FILES: &[(&str, &str)] = &[
    ("classes", "daggerheart.classes.json"),
    ("subclasses", "daggerheart.subclasses.json"),
    ("ancestries", "daggerheart.ancestries.json"),
    ("communities", "daggerheart.communities.json"),
    ("domains", "daggerheart.domains.json"),
    ("weapons", "daggerheart.weapons.json"),
    ("armors", "daggerheart.armors.json"),
    ("loot", "daggerheart.loot.json"),
    ("consumables", "daggerheart.consumables.json"),
    ("beastforms", "daggerheart.beastforms.json"),
    ("adversaries", "daggerheart.adversaries.json"),
    ("environments", "daggerheart.environments.json"),
];

/// Order in which the base files are rewritten.
const TASK_ORDER: &[&str] = &[
    "classes",
    "subclasses",
    "ancestries",
    "communities",
    "domains",
    "beastforms",
    "adversaries",
    "environments",
    "armors",
    "weapons",
    "consumables",
    "loot",
];

/// Optional pack files, `the-void-unofficial.<suffix>.json`.
pub const VOID_TRANSLATION_SUFFIXES: &[&str] = &[
    "classes",
    "subclasses",
    "ancestries",
    "communities",
    "domains",
    "transformations",
    "weapons",
    "adversaries--environments",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Classes,
    Subclasses,
    Ancestries,
    Communities,
    Domains,
    Beastforms,
    Transformations,
    Adversaries,
    Environments,
    Mixed,
    Armors,
    Weapons,
    Consumables,
    Loot,
}

impl Category {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "classes" => Category::Classes,
            "subclasses" => Category::Subclasses,
            "ancestries" => Category::Ancestries,
            "communities" => Category::Communities,
            "domains" => Category::Domains,
            "beastforms" => Category::Beastforms,
            "transformations" => Category::Transformations,
            "adversaries" => Category::Adversaries,
            "environments" => Category::Environments,
            "adversaries--environments" => Category::Mixed,
            "armors" => Category::Armors,
            "weapons" => Category::Weapons,
            "consumables" => Category::Consumables,
            "loot" => Category::Loot,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
struct FileTask {
    key: String,
    file: String,
    path: PathBuf,
    category: Category,
    /// Pack files get no help from the `original/` adversary snapshot.
    pack: bool,
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Base files in task order, followed by whichever pack files exist.
fn plan_tasks(translations_dir: &Path) -> Vec<FileTask> {
    let mut tasks: Vec<FileTask> = TASK_ORDER
        .iter()
        .filter_map(|key| {
            let (_, file) = TRANSLATION_FILES.iter().find(|(k, _)| k == key)?;
            Some(FileTask {
                key: key.to_string(),
                file: file.to_string(),
                path: translations_dir.join(file),
                category: Category::from_name(key)?,
                pack: false,
            })
        })
        .collect();

    for suffix in VOID_TRANSLATION_SUFFIXES {
        let file = format!("{VOID_TRANSLATION_PREFIX}{suffix}.json");
        let path = translations_dir.join(&file);
        if !path.is_file() {
            continue;
        }
        let Some(category) = Category::from_name(suffix) else { continue };
        debug!("found pack file {file}");
        tasks.push(FileTask {
            key: format!("void{}", capitalize_first(suffix)),
            file,
            path,
            category,
            pack: true,
        });
    }
    tasks
}

/// Previous-revision adversaries from `<original_dir>/daggerheart.adversaries.json`, if present.
fn load_original_adversaries(original_dir: &Path) -> OriginalAdversaries {
    let path = original_dir.join("daggerheart.adversaries.json");
    if !path.is_file() {
        return OriginalAdversaries::new();
    }
    match read_document(&path) {
        Ok(doc) => adversaries::index_originals(&doc),
        Err(err) => {
            warn!("ignoring original adversaries: {err}");
            OriginalAdversaries::new()
        }
    }
}

struct RunContext<'c, 's> {
    catalog: &'c Catalog<'s>,
    originals: OriginalAdversaries,
    /// Every file as it was before the run, by task key.
    snapshots: HashMap<String, TranslationDocument>,
}

impl RunContext<'_, '_> {
    fn previous_actions(&self, key: &str) -> ActionSnapshot {
        self.snapshots.get(key).map(domains::snapshot_actions).unwrap_or_default()
    }

    fn previous_entries(&self, key: &str) -> Map<String, Value> {
        self.snapshots.get(key).map(equipment::snapshot_entries).unwrap_or_default()
    }
}

fn run_task(ctx: &RunContext<'_, '_>, task: &FileTask, stats: &mut FileStats) -> Result<Vec<String>> {
    let catalog = ctx.catalog;
    let path = task.path.as_path();

    match task.category {
        Category::Classes => update_entries(path, stats, |t, e| classes::update_entry(catalog, t, e)),
        Category::Subclasses => update_entries(path, stats, |t, e| subclasses::update_entry(catalog, t, e)),
        Category::Ancestries => {
            let missing = update_entries(path, stats, |t, e| heritage::update_ancestry(catalog, t, e))?;
            Ok(heritage::exclude_legacy_ancestry_keys(stats, missing))
        }
        Category::Communities => update_entries(path, stats, |t, e| heritage::update_community(catalog, t, e)),
        Category::Domains => {
            let previous = ctx.previous_actions(&task.key);
            update_entries(path, stats, |t, e| domains::update_entry(catalog, &previous, t, e))
        }
        Category::Beastforms => update_entries(path, stats, |t, e| beastforms::update_entry(catalog, t, e)),
        Category::Transformations => {
            update_entries(path, stats, |t, e| transformations::update_entry(catalog, t, e))
        }
        Category::Adversaries => {
            let originals = (!task.pack).then_some(&ctx.originals);
            update_entries(path, stats, |t, e| adversaries::update_entry(catalog, originals, t, e))
        }
        Category::Environments => update_entries(path, stats, |t, e| environments::update_entry(catalog, t, e)),
        Category::Mixed => update_entries(path, stats, |t, e| environments::update_mixed_entry(catalog, t, e)),
        Category::Armors | Category::Weapons | Category::Consumables | Category::Loot => {
            let rules = match task.category {
                Category::Armors => EquipmentRules {
                    map: &catalog.armors,
                    overrides: Some(&*ARMOR_OVERRIDES),
                    preserve_fallback_description: false,
                },
                Category::Weapons => EquipmentRules {
                    map: &catalog.weapons,
                    overrides: None,
                    preserve_fallback_description: true,
                },
                Category::Consumables => EquipmentRules {
                    map: &catalog.consumables,
                    overrides: None,
                    preserve_fallback_description: true,
                },
                _ => EquipmentRules {
                    map: &catalog.loot,
                    overrides: None,
                    preserve_fallback_description: true,
                },
            };
            let fallback = ctx.previous_entries(&task.key);
            update_entries(path, stats, |t, e| equipment::update_entry(&rules, &fallback, t, e))
        }
    }
}

/// Rewrites the `label` of a file when it differs from `label`. Returns whether it changed.
pub fn apply_label_override(path: &Path, label: &str) -> Result<bool> {
    if label.is_empty() {
        return Ok(false);
    }
    let mut doc = read_document(path)?;
    if doc.label() == Some(label) {
        return Ok(false);
    }
    doc.set_label(label);
    write_document(path, &doc)?;
    Ok(true)
}

/// Full run: loads the cache, then rewrites the translation files.
pub fn run(config: &SyncConfig) -> Result<RunReport> {
    let sources = load_sources(config)?;
    Ok(run_with_sources(config, &sources))
}

/// Rewrites every translation file from already loaded sources.
///
/// A file that cannot be read or written fails its own task only; the failure is
/// logged and recorded in the report while the other files are still processed.
pub fn run_with_sources(config: &SyncConfig, sources: &Sources) -> RunReport {
    let catalog = Catalog::build(sources);
    log_conflicts(&catalog.conflicts);

    let tasks = plan_tasks(&config.translations_dir);
    let snapshots = tasks
        .iter()
        .filter_map(|task| match read_document(&task.path) {
            Ok(doc) => Some((task.key.clone(), doc)),
            Err(err) => {
                debug!("no snapshot for {}: {err}", task.key);
                None
            }
        })
        .collect();
    let ctx = RunContext {
        catalog: &catalog,
        originals: load_original_adversaries(&config.original_dir),
        snapshots,
    };

    let mut stats: IndexMap<String, FileStats> = TRANSLATION_FILES
        .iter()
        .map(|(key, file)| (key.to_string(), FileStats::new(*file)))
        .collect();
    for task in tasks.iter().filter(|t| t.pack) {
        stats.insert(task.key.clone(), FileStats::new(task.file.clone()));
    }

    let mut report = RunReport::default();
    for task in &tasks {
        debug!("updating {}", task.file);
        let file_stats = stats
            .entry(task.key.clone())
            .or_insert_with(|| FileStats::new(task.file.clone()));
        let outcome = match run_task(&ctx, task, file_stats) {
            Ok(missing) => TaskOutcome {
                key: task.key.clone(),
                file: task.file.clone(),
                missing,
                error: None,
            },
            Err(err) => {
                error!("{}: {err}", task.file);
                TaskOutcome {
                    key: task.key.clone(),
                    file: task.file.clone(),
                    missing: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        };
        report.tasks.push(outcome);
    }
    report.stats = stats.into_iter().collect();

    log_summary(&report);

    for (file, label) in LABEL_OVERRIDES {
        let path = config.translations_dir.join(file);
        if let Err(err) = apply_label_override(&path, label) {
            error!("{file}: {err}");
            report.tasks.push(TaskOutcome {
                key: "labels".to_string(),
                file: file.to_string(),
                missing: Vec::new(),
                error: Some(err.to_string()),
            });
        }
    }

    log_missing(&report);
    log_failures(&report);
    report
}
