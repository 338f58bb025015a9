//! Hand-written splitters for domain cards whose text the generic heuristics cut wrong.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{normalize_markdown_source, split_before, split_markdown_paragraphs};
use crate::model::SubFeature;
use crate::text::{normalize_key, strip_links};

static EXOTA_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Совершите").unwrap());
static CHAIN_LIGHTNING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Дополнительные|Additional\s+targets?").unwrap());
static ENRAPTURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Один раз").unwrap());
static RAIN_OF_BLADES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Если").unwrap());
static WOUNDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)2\s*[Рр]ан").unwrap());
static STRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Стресс").unwrap());
static HEAL_CHOICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)2\s*[Рр]ан[аыё]\s+или\s+2\s*[Сс]тресс[аыё]").unwrap());
static TOUCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)прикоснитесь").unwrap());
static CONDITION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)состояни|заболеван").unwrap());
static MARK_STRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\*\*\s*(?:Отметьте|Mark\s+Stress)[\s\S]*").unwrap());
static LEADING_DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-+\s*").unwrap());

/// What a splitter sees: the card's full Markdown and its sub-features.
#[derive(Debug, Clone, Copy)]
pub struct SplitInput<'a> {
    pub markdown: &'a str,
    pub features: &'a [SubFeature],
}

#[derive(Debug, Clone, Copy)]
pub struct DomainSplitter {
    /// Every described slot gets its own segment, even if slots share text.
    pub force_unique: bool,
    pub split: fn(&SplitInput<'_>) -> Vec<String>,
}

/// Splitters keyed by the normalized English card name.
pub static DOMAIN_SPLITTERS: Lazy<HashMap<String, DomainSplitter>> = Lazy::new(|| {
    let entries: [(&str, fn(&SplitInput<'_>) -> Vec<String>); 9] = [
        ("Book of Exota", split_book_of_exota),
        ("Chain Lightning", |input| split_before(input.markdown, &CHAIN_LIGHTNING_RE)),
        ("Chokehold", |input| split_markdown_paragraphs(input.markdown)),
        ("Cinder Grasp", |input| split_markdown_paragraphs(input.markdown)),
        ("Codex-Touched", split_codex_touched),
        ("Enrapture", |input| split_before(input.markdown, &ENRAPTURE_RE)),
        ("Rain of Blades", |input| split_before(input.markdown, &RAIN_OF_BLADES_RE)),
        ("Restoration", |input| split_restoration(input.markdown)),
        ("Unleash Chaos", |input| split_unleash_chaos(input.markdown)),
    ];

    entries
        .into_iter()
        .filter_map(|(name, split)| {
            normalize_key(name).map(|key| {
                (
                    key,
                    DomainSplitter {
                        force_unique: true,
                        split,
                    },
                )
            })
        })
        .collect()
});

fn split_book_of_exota(input: &SplitInput<'_>) -> Vec<String> {
    let mut segments = Vec::new();
    if let Some(first) = input.features.first().and_then(|f| f.main_body.as_deref()) {
        if !first.is_empty() {
            segments.push(first.to_string());
        }
    }
    if let Some(second) = input.features.get(1).and_then(|f| f.main_body.as_deref()) {
        let second = normalize_markdown_source(second);
        if !second.is_empty() {
            let parts = split_before(&second, &EXOTA_MARKER_RE);
            if parts.len() > 1 {
                segments.push(parts[0].clone());
                segments.push(parts[1..].join(" ").trim().to_string());
            } else {
                segments.push(second);
            }
        }
    }
    segments
}

fn split_codex_touched(input: &SplitInput<'_>) -> Vec<String> {
    normalize_markdown_source(input.markdown)
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("- "))
        .map(|line| LEADING_DASHES_RE.replace(line, "").trim().to_string())
        .collect()
}

fn strip_intro(text: &str) -> String {
    match TOUCH_RE.find(text) {
        Some(m) => text[m.start()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Healing paragraph (split into a wounds and a stress variant when it offers the choice),
/// then the condition-clearing paragraph.
fn split_restoration(markdown: &str) -> Vec<String> {
    let paragraphs = split_markdown_paragraphs(markdown);
    let Some(first) = paragraphs.first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let healing = paragraphs
        .iter()
        .find(|p| WOUNDS_RE.is_match(p) && STRESS_RE.is_match(p))
        .unwrap_or(first);
    let healing_plain = strip_links(healing);
    if HEAL_CHOICE_RE.is_match(&healing_plain) {
        segments.push(strip_intro(&HEAL_CHOICE_RE.replace(&healing_plain, "2 Раны")));
        segments.push(strip_intro(&HEAL_CHOICE_RE.replace(&healing_plain, "2 Стресса")));
    } else {
        segments.push(strip_intro(&healing_plain));
    }

    if let Some(condition) = paragraphs.iter().find(|p| CONDITION_RE.is_match(p)) {
        segments.push(strip_links(condition).trim().to_string());
    }
    segments
}

/// First two paragraphs as one segment, with a trailing "mark a Stress" clause split off.
fn split_unleash_chaos(markdown: &str) -> Vec<String> {
    let paragraphs = split_markdown_paragraphs(markdown);
    match paragraphs.as_slice() {
        [] => Vec::new(),
        [only] => vec![only.clone()],
        [first, second, ..] => {
            let (main_second, stress) = match MARK_STRESS_RE.find(second) {
                Some(m) => (second[..m.start()].trim(), m.as_str().trim()),
                None => (second.as_str(), ""),
            };
            let combined = if main_second.is_empty() {
                first.clone()
            } else {
                format!("{first}\n\n{main_second}")
            };
            let mut segments = vec![combined];
            if !stress.is_empty() {
                segments.push(stress.to_string());
            }
            segments
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(name: &str, markdown: &str, features: &[SubFeature]) -> Vec<String> {
        let key = normalize_key(name).unwrap();
        let splitter = DOMAIN_SPLITTERS.get(&key).unwrap();
        assert!(splitter.force_unique);
        (splitter.split)(&SplitInput { markdown, features })
    }

    #[test]
    fn registered_under_normalized_names() {
        assert!(DOMAIN_SPLITTERS.contains_key("codextouched"));
        assert!(DOMAIN_SPLITTERS.contains_key("rainofblades"));
        assert_eq!(DOMAIN_SPLITTERS.len(), 9);
    }

    #[test]
    fn chain_lightning_splits_additional_targets() {
        assert_eq!(
            run("Chain Lightning", "Молния бьёт цель. Дополнительные цели получают урон.", &[]),
            vec!["Молния бьёт цель.", "Дополнительные цели получают урон."]
        );
    }

    #[test]
    fn codex_touched_takes_bullets() {
        assert_eq!(
            run("Codex-Touched", "Intro\n- first\n-- second\nnot a bullet", &[]),
            vec!["first"]
        );
    }

    #[test]
    fn book_of_exota_splits_second_feature() {
        let features: Vec<SubFeature> = serde_json::from_value(json!([
            {"id": 1, "name": "A", "main_body": "Первое."},
            {"id": 2, "name": "B", "main_body": "Вступление. Совершите бросок. Совершите ещё."}
        ]))
        .unwrap();
        assert_eq!(
            run("Book of Exota", "", &features),
            vec!["Первое.", "Вступление.", "Совершите бросок. Совершите ещё."]
        );
    }

    #[test]
    fn restoration_offers_both_heal_variants() {
        let md = "Вы целитель. Прикоснитесь к союзнику и очистите 2 Раны или 2 Стресса.\n\nТакже снимите состояние.";
        assert_eq!(
            run("Restoration", md, &[]),
            vec![
                "Прикоснитесь к союзнику и очистите 2 Раны.",
                "Прикоснитесь к союзнику и очистите 2 Стресса.",
                "Также снимите состояние.",
            ]
        );
    }

    #[test]
    fn unleash_chaos_splits_stress_clause() {
        let md = "Первый абзац.\n\nВторой абзац. **Отметьте Стресс**, чтобы усилить.";
        assert_eq!(
            run("Unleash Chaos", md, &[]),
            vec![
                "Первый абзац.\n\nВторой абзац.",
                "**Отметьте Стресс**, чтобы усилить.",
            ]
        );
    }
}
