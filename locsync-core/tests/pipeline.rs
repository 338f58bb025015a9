use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use locsync_core::services::cache::Endpoint;
use locsync_core::services::pipeline::TRANSLATION_FILES;
use locsync_core::{run, SyncConfig, SyncError};

struct Workspace {
    _dir: TempDir,
    config: SyncConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            translations_dir: dir.path().join("module").join("translations"),
            cache_dir: dir.path().join("tmp_data").join("api"),
            original_dir: dir.path().join("original"),
            ..SyncConfig::default()
        };
        fs::create_dir_all(&config.translations_dir).unwrap();
        Self { _dir: dir, config }
    }

    fn cache(&self, endpoint: Endpoint, en: Value, ru: Value) {
        for (lang, data) in [("en", en), ("ru", ru)] {
            let path = self.config.cache_file(lang, endpoint.as_str());
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, json!({ "data": data }).to_string()).unwrap();
        }
    }

    fn empty_cache(&self) {
        for endpoint in Endpoint::ALL {
            self.cache(endpoint, json!([]), json!([]));
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.config.translations_dir.join(file)
    }

    fn write(&self, file: &str, label: &str, entries: Value, trailing_newline: bool) {
        let doc = json!({ "label": label, "entries": entries });
        let mut text = serde_json::to_string_pretty(&doc).unwrap();
        if trailing_newline {
            text.push('\n');
        }
        fs::write(self.path(file), text).unwrap();
    }

    fn read(&self, file: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(self.path(file)).unwrap()).unwrap()
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        let mut files: Vec<(String, String)> = fs::read_dir(&self.config.translations_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .map(|p| (file_name(&p), fs::read_to_string(&p).unwrap()))
            .collect();
        files.sort();
        files
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

/// A small but complete dataset touching every category the scenarios check.
fn seeded() -> Workspace {
    let ws = Workspace::new();
    ws.empty_cache();

    ws.cache(
        Endpoint::Class,
        json!([{"slug": "bard", "name": "Bard", "description": "Test description."}]),
        json!([{"slug": "bard", "name": "Бард", "description": "Тестовое описание."}]),
    );
    ws.cache(
        Endpoint::DomainCard,
        json!([
            {"slug": "volley", "name": "Volley", "main_body": "Shoot twice."},
            {"slug": "zone", "name": "Zone", "main_body": "One.\n\nTwo."},
            {"slug": "wings", "name": "Wings", "main_body": "Fly."}
        ]),
        json!([
            {"slug": "volley", "name": "Залп", "main_body": "Стреляйте дважды."},
            {"slug": "zone", "name": "Зона", "main_body": "Раз.\n\nДва."},
            {"slug": "wings", "name": "Крылья", "main_body": "Летите."}
        ]),
    );
    ws.cache(
        Endpoint::Equipment,
        json!([{"slug": "longsword", "name": "Longsword", "type_slug": "primary-weapon"}]),
        json!([{"slug": "longsword", "name": "Длинный меч", "type_slug": "primary-weapon"}]),
    );
    ws.cache(
        Endpoint::Adversary,
        json!([{"slug": "wolf", "name": "Wolf", "short_description": "Hungry."}]),
        json!([{"slug": "wolf", "name": "Волк", "short_description": "Голодный."}]),
    );

    ws.write(
        "daggerheart.classes.json",
        "Classes",
        json!({
            "Bard": {"name": "Bard", "description": "<p>Old</p>"},
            "Unknown Thing": {"name": "Unknown Thing", "description": "<p>Keep me</p>"}
        }),
        true,
    );
    ws.write(
        "daggerheart.domains.json",
        "Domains",
        json!({
            "Volley": {"name": "Volley", "description": "<p>X</p>", "actions": {"a": "<p>X</p>", "b": "<p>X</p>"}},
            "Zone": {"name": "Zone", "description": "<p>One.</p><p>@Template[type:cone|range:close]</p><p>Two.</p>"},
            "Wings": {"name": "Wings", "description": "<p>Fly.</p>",
                      "actions": {"rg2sLCTqY2rTo861": {"name": "Carry", "description": "<p>Fly.</p>"}}}
        }),
        false,
    );
    ws.write(
        "daggerheart.weapons.json",
        "Weapons",
        json!({"Longsword": {"name": "Longsword", "attack": "Attack"}}),
        true,
    );
    for (_, file) in TRANSLATION_FILES {
        if !ws.path(file).exists() {
            ws.write(file, "Untranslated", json!({}), true);
        }
    }
    ws
}

#[test]
fn classes_get_translated_text_and_manual_patch() {
    let ws = seeded();
    let report = run(&ws.config).unwrap();
    assert!(!report.has_failures());

    let bard = &ws.read("daggerheart.classes.json")["entries"]["Bard"];
    assert_eq!(bard["name"], "Бард");
    let description = bard["description"].as_str().unwrap();
    assert!(description.starts_with("<p><strong>Примечание:</strong>"));
    assert!(description.ends_with("<p>Тестовое описание.</p>"));
}

#[test]
fn unresolved_keys_are_reported_and_left_alone() {
    let ws = seeded();
    let report = run(&ws.config).unwrap();

    let classes = report.tasks.iter().find(|t| t.key == "classes").unwrap();
    assert_eq!(classes.missing, vec!["Unknown Thing".to_string()]);
    assert_eq!(report.stats_for("classes").unwrap().missing, vec!["Unknown Thing".to_string()]);

    let entry = &ws.read("daggerheart.classes.json")["entries"]["Unknown Thing"];
    assert_eq!(entry, &json!({"name": "Unknown Thing", "description": "<p>Keep me</p>"}));
}

#[test]
fn duplicate_slots_stay_identical() {
    let ws = seeded();
    run(&ws.config).unwrap();

    let volley = &ws.read("daggerheart.domains.json")["entries"]["Volley"];
    assert_eq!(volley["actions"]["a"], "<p>Стреляйте дважды.</p>");
    assert_eq!(volley["actions"]["a"], volley["actions"]["b"]);
}

#[test]
fn directives_survive_new_text() {
    let ws = seeded();
    run(&ws.config).unwrap();

    let zone = &ws.read("daggerheart.domains.json")["entries"]["Zone"];
    assert_eq!(
        zone["description"],
        "<p>Раз.</p><p>@Template[type:cone|range:close]</p><p>Два.</p>"
    );
}

#[test]
fn action_overrides_win() {
    let ws = seeded();
    run(&ws.config).unwrap();

    let action = &ws.read("daggerheart.domains.json")["entries"]["Wings"]["actions"]["rg2sLCTqY2rTo861"];
    assert_eq!(action["name"], "Carry");
    assert!(action["description"]
        .as_str()
        .unwrap()
        .starts_with("<p><strong>Отметьте Стресс</strong>, чтобы во время полёта"));
}

#[test]
fn second_run_changes_nothing() {
    let ws = seeded();
    run(&ws.config).unwrap();
    let first = ws.snapshot();

    let report = run(&ws.config).unwrap();
    assert_eq!(ws.snapshot(), first);
    assert_eq!(report.stats_for("domains").unwrap().updated, 0);
}

#[test]
fn labels_and_trailing_newlines() {
    let ws = seeded();
    run(&ws.config).unwrap();

    assert_eq!(ws.read("daggerheart.ancestries.json")["label"], "Родословные");
    assert_eq!(ws.read("daggerheart.classes.json")["label"], "Classes");

    let classes = fs::read_to_string(ws.path("daggerheart.classes.json")).unwrap();
    let domains = fs::read_to_string(ws.path("daggerheart.domains.json")).unwrap();
    assert!(classes.ends_with("}\n"));
    assert!(domains.ends_with('}'));
    assert!(domains.starts_with("{\n  \"label\": \"Domains\",\n  \"entries\": {\n    \"Volley\""));
}

#[test]
fn weapon_names_and_attacks() {
    let ws = seeded();
    run(&ws.config).unwrap();

    let sword = &ws.read("daggerheart.weapons.json")["entries"]["Longsword"];
    assert_eq!(sword["name"], "Длинный меч");
    assert_eq!(sword["attack"], "Атака");
}

#[test]
fn pack_files_are_picked_up() {
    let ws = seeded();
    ws.write(
        "the-void-unofficial.adversaries--environments.json",
        "The Void",
        json!({"Wolf": {"name": "Wolf"}, "Ghost": {"name": "Ghost"}}),
        true,
    );
    let report = run(&ws.config).unwrap();

    let wolf = &ws.read("the-void-unofficial.adversaries--environments.json")["entries"]["Wolf"];
    assert_eq!(wolf["name"], "Волк");
    assert_eq!(wolf["description"], "<p>Голодный.</p>");
    let pack = report.tasks.iter().find(|t| t.key == "voidAdversaries--environments").unwrap();
    assert_eq!(pack.missing, vec!["Ghost".to_string()]);
}

#[test]
fn broken_file_does_not_block_the_others() {
    let ws = seeded();
    fs::write(ws.path("daggerheart.loot.json"), "{ not json").unwrap();

    let report = run(&ws.config).unwrap();
    assert!(report.has_failures());
    let failed: Vec<&str> = report.failed().map(|t| t.key.as_str()).collect();
    assert_eq!(failed, ["loot"]);
    assert_eq!(ws.read("daggerheart.classes.json")["entries"]["Bard"]["name"], "Бард");
    assert_eq!(fs::read_to_string(ws.path("daggerheart.loot.json")).unwrap(), "{ not json");
}

#[test]
fn missing_cache_aborts_before_writing() {
    let ws = seeded();
    fs::remove_file(ws.config.cache_file("ru", "rule")).unwrap();
    let before = ws.snapshot();

    let err = run(&ws.config).unwrap_err();
    assert!(matches!(err, SyncError::MissingCache { .. }));
    assert_eq!(ws.snapshot(), before);
}
