//! Hand-maintained tables compiled into the binary. Built once, read-only afterwards.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_OTHER_LABEL: &str = "Прочие";

pub const VOID_TRANSLATION_PREFIX: &str = "the-void-unofficial.";

pub const BARE_BONES_ARMOR_UUID: &str = "Compendium.daggerheart.armors.Item.ITAjcigTcUw5pMCN";

pub const BARE_BONES_DOMAIN_SNIPPET: &str = "<p>Наденьте указанные ниже доспехи, чтобы использовать эту способность.</p><p>@UUID[Compendium.daggerheart.armors.Item.ITAjcigTcUw5pMCN]{Без доспехов}</p>";

/// Name + optional description that replace whatever the API provides.
#[derive(Debug, Clone, Copy)]
pub struct ItemOverride {
    pub name: &'static str,
    pub description: Option<&'static str>,
}

const fn named(name: &'static str) -> ItemOverride {
    ItemOverride {
        name,
        description: None,
    }
}

pub static CLASS_ITEM_OVERRIDES: Lazy<HashMap<&'static str, ItemOverride>> = Lazy::new(|| {
    HashMap::from([
        ("50ft of Rope", named("Верёвка (15 м)")),
        ("A Romance Novel", named("Любовный роман")),
        ("A Sharpening Stone", named("Точильный камень")),
        ("Basic Supplies", named("Базовые припасы")),
        ("Torch", named("Факел")),
        ("Bundle of Offerings", named("Связка подношений")),
        ("Drawing Of A Lover", named("Рисунок возлюбленного")),
        ("Family Heirloom", named("Семейная реликвия")),
        ("Grappling Hook", named("Крюк кошка")),
        ("Letter(Never Opened)", named("Письмо (никогда не вскрывалось)")),
        ("Secret Key", named("Секретный ключ")),
        ("Set of Forgery Tools", named("Набор для фальсификации")),
        ("Sigil of Your God", named("Символ вашего бога")),
        ("Small Bag (Rocks & Bones)", named("Маленький мешочек с камнями и костями")),
        ("Strange Dirty Penant", named("Странный кулон, найденный в грязи")),
        (
            "Tiny Elemental Pet",
            ItemOverride {
                name: "Маленький питомец элементаль",
                description: Some("Маленький безобидный питомец элементаль"),
            },
        ),
        ("Totem from Mentor", named("Тотем от вашего наставника")),
        ("Trophy from your First Kill", named("Трофей вашего первого убийства")),
        (
            "Untranslated Book",
            ItemOverride {
                name: "Непереведенная книга",
                description: Some("<p>Книга, которую вы пытаетесь перевести.</p>"),
            },
        ),
        ("Broken Compass", named("Кажущийся сломанным компас")),
    ])
});

pub static ARMOR_OVERRIDES: Lazy<HashMap<&'static str, ItemOverride>> = Lazy::new(|| {
    HashMap::from([(
        "Bare Bones",
        ItemOverride {
            name: "Без доспехов",
            description: Some("<p>Благодаря карте домена <strong>«Ничего лишнего»</strong>, пока на вас не экипирована броня, ваш базовый Показатель Брони равен 3 + ваша Сила, а также вы используете следующие значения как ваши базовые пороги урона:</p><ul><li><strong><em>Ранг 1:</em></strong> 9/19</li><li><strong><em>Ранг 2:</em></strong> 11/24</li><li><strong><em>Ранг 3:</em></strong> 13/31</li><li><strong><em>Ранг 4:</em></strong> 15/38</li></ul>"),
        },
    )])
});

/// Literal html that always wins over generated text for these action ids.
pub static ACTION_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Elementalist foundation
        (
            "rxuFLfHP1FILDpds",
            "<p><strong>Потратьте Надежду</strong>, опишите, как контроль над вашей стихией помогает в броске действия, который вы собираетесь сделать, и получите +2 к броску действия.</p>",
        ),
        (
            "S7HvFD3qIR3ifJRL",
            "<p><strong>Потратьте Надежду</strong>, опишите, как контроль над вашей стихией помогает в броске действия, который вы собираетесь сделать, и получите +3 к броску урона.</p>",
        ),
        // Sparing Touch
        (
            "aanLNQkeO2ZTIqBl",
            "<p>Один раз до следующего Продолжительного отдыха коснитесь существа и очистите ему 2 Раны.</p>",
        ),
        (
            "cWdzCQJv8RFfi2NR",
            "<p>Один раз до следующего Продолжительного отдыха коснитесь существа и очистите ему 2 Стресса.</p>",
        ),
        // Weapon Specialist
        (
            "vay9rVXJS3iksaVR",
            "<p>Вы владеете многими видами оружия с ужасающей легкостью. Когда вы преуспеваете в атаке, вы можете <strong>потратить Надежду</strong>, чтобы добавить одну из костей урона от вашего вторичного оружия к Броску Урона.</p>",
        ),
        (
            "1bBFfxmywJpx5tfk",
            "<p>Кроме того, один раз до следующего Продолжительного отдыха, когда вы бросаете Кости Истребления, перебросьте любые выпавшие <strong>1</strong>.</p>",
        ),
        // Wings of Light
        (
            "rg2sLCTqY2rTo861",
            "<p><strong>Отметьте Стресс</strong>, чтобы во время полёта поднять и нести союзника вашего размера или меньше.</p>",
        ),
        (
            "1qjnoz5I7NqrWMkp",
            "<p><strong>Потратьте Надежду</strong>, чтобы нанести дополнительный <strong>1d8</strong> урона при успешной атаке в полёте.</p>",
        ),
    ])
});

/// Features whose body is a bullet list, one action per bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureActionGenerator {
    BulletActions,
}

pub static FEATURE_ACTION_GENERATORS: Lazy<HashMap<i64, FeatureActionGenerator>> =
    Lazy::new(|| {
        [147, 159, 160, 161]
            .into_iter()
            .map(|id| (id, FeatureActionGenerator::BulletActions))
            .collect()
    });

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdversaryFeatureRenderer {
    BattleBoxRandomTactics,
}

pub static ADVERSARY_FEATURE_RENDERERS: Lazy<HashMap<i64, AdversaryFeatureRenderer>> =
    Lazy::new(|| HashMap::from([(1599, AdversaryFeatureRenderer::BattleBoxRandomTactics)]));

pub static SUBCLASS_NAME_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("comaraderie", "camaraderie"),
        ("partnerinarms", "partnersinarms"),
        ("draininginvoaction", "draininginvocation"),
    ])
});

pub static FEATURE_NAME_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("unshakeable", "unshakable"),
        ("wailingleap", "jumpscare"),
        ("umbraveil", "umbralveil"),
    ])
});

pub static TRANSFORMATION_ENTRY_ALIASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("demigodichorofthegod", "demigodichorofthegods")]));

pub static EQUIPMENT_NAME_ALIASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(HashMap::new);

#[derive(Debug)]
pub struct Replacement {
    pub pattern: Regex,
    pub value: &'static str,
}

/// Literal edits applied to a description (and optionally every action) after the merge.
#[derive(Debug, Default)]
pub struct ManualPatch {
    pub replacements: Vec<Replacement>,
    pub description_prefix: Option<&'static str>,
    pub description_suffix: Option<&'static str>,
    pub action_prefix: Option<&'static str>,
    pub action_suffix: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchSection {
    Classes,
    Communities,
}

const COMMUNITY_SWAP_PARAGRAPH: &str = "<p>В любой момент, когда вы найдете сообщество, частью которого вы когда-то были, или присоединитесь к новому сообществу, вы можете навсегда обменять эту карту сообщества на новую.</p>";

pub static MANUAL_ENTRY_PATCHES: Lazy<HashMap<PatchSection, HashMap<&'static str, ManualPatch>>> =
    Lazy::new(|| {
        let classes = HashMap::from([
            (
                "Bard",
                ManualPatch {
                    description_prefix: Some("<p><strong>Примечание:</strong> Начиная с 5-го уровня, используйте способность «Сплочение (уровень 5)» вместо базовой. На данный момент система не производит замену автоматически.</p>"),
                    ..ManualPatch::default()
                },
            ),
            (
                "Evolution",
                ManualPatch {
                    description_suffix: Some("<p><strong>Примечание:</strong> включите один из эффектов «Эволюция: ...» на вкладке эффектов, например «Эволюция: Проворность», чтобы применить бонус.</p>"),
                    ..ManualPatch::default()
                },
            ),
        ]);

        let communities = HashMap::from([
            (
                "Found Family",
                ManualPatch {
                    replacements: vec![Replacement {
                        pattern: Regex::new(&format!("(?i){}", regex::escape(COMMUNITY_SWAP_PARAGRAPH)))
                            .unwrap(),
                        value: "",
                    }],
                    ..ManualPatch::default()
                },
            ),
            (
                "Reborne",
                ManualPatch {
                    description_suffix: Some(COMMUNITY_SWAP_PARAGRAPH),
                    ..ManualPatch::default()
                },
            ),
        ]);

        HashMap::from([
            (PatchSection::Classes, classes),
            (PatchSection::Communities, communities),
        ])
    });

pub static LEGACY_ANCESTRY_KEYS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["Fearless", "Unshakeable"]));

/// Canonical `label` values restored after every run.
pub const LABEL_OVERRIDES: &[(&str, &str)] = &[
    ("daggerheart.ancestries.json", "Родословные"),
    ("daggerheart.beastforms.json", "Звериные формы"),
    ("daggerheart.consumables.json", "Расходники"),
    ("daggerheart.environments.json", "Окружения"),
];

pub static ATTACK_NAME_TRANSLATIONS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("attack", "Атака")]));

pub static TRANSFORMATION_ACTION_NAME_TRANSLATIONS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("mark stress", "Отметить Стресс"), ("damage", "Урон")]));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_family_pattern_matches_its_paragraph_case_insensitively() {
        let patch = &MANUAL_ENTRY_PATCHES[&PatchSection::Communities]["Found Family"];
        let html = format!("<p>Семья.</p>{}", COMMUNITY_SWAP_PARAGRAPH.to_uppercase());
        let cleaned = patch.replacements[0].pattern.replace_all(&html, patch.replacements[0].value);
        assert_eq!(cleaned, "<p>Семья.</p>");
    }

    #[test]
    fn generator_ids_cover_bullet_features() {
        for id in [147, 159, 160, 161] {
            assert_eq!(
                FEATURE_ACTION_GENERATORS.get(&id),
                Some(&FeatureActionGenerator::BulletActions)
            );
        }
        assert!(!FEATURE_ACTION_GENERATORS.contains_key(&1599));
    }
}
