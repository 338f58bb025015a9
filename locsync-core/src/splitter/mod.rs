//! Action-set splitter: distributes one source text over the action slots of an entry.

pub mod domain;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::merge::set_action_html;
use crate::model::{action_html, SubFeature};
use crate::text::sanitize::normalise_html_for_comparison;
use crate::text::{markdown_to_html, sanitize_html, sanitize_name};

pub use domain::{DomainSplitter, SplitInput, DOMAIN_SPLITTERS};

static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());
static SECTION_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static LEADING_STRONG_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<p><strong>[^<]+?\.</strong>\s*").unwrap());
static BULLET_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-\s*").unwrap());
static LIST_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n-\s").unwrap());
static BOLD_BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\s+\*\*(.+?)\*\*").unwrap());

pub fn normalize_markdown_source(markdown: &str) -> String {
    markdown.replace("\r\n", "\n").trim().to_string()
}

pub fn split_markdown_paragraphs(markdown: &str) -> Vec<String> {
    let source = normalize_markdown_source(markdown);
    if source.is_empty() {
        return Vec::new();
    }
    PARAGRAPH_BREAK_RE
        .split(&source)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits `markdown` in front of every match of `marker` (except at offset 0).
pub fn split_before(markdown: &str, marker: &Regex) -> Vec<String> {
    let source = normalize_markdown_source(markdown);
    if source.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut last = 0;
    for m in marker.find_iter(&source) {
        if m.start() > last {
            parts.push(&source[last..m.start()]);
            last = m.start();
        }
    }
    parts.push(&source[last..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fits `segments` to `desired` slots: surplus segments are folded into the last one, a
/// shortfall repeats the last one. `desired == 0` leaves the list alone.
pub fn reconcile_segment_count(mut segments: Vec<String>, desired: usize) -> Vec<String> {
    if desired == 0 || segments.is_empty() {
        return segments;
    }
    while segments.len() > desired {
        if let Some(extra) = segments.pop() {
            if let Some(last) = segments.last_mut() {
                last.push_str(&extra);
            }
        }
    }
    if let Some(filler) = segments.last().cloned() {
        while segments.len() < desired {
            segments.push(filler.clone());
        }
    }
    segments
}

/// Renders Markdown segments produced by a custom splitter and fits them to `desired`.
pub fn render_markdown_segments(segments: &[String], desired: usize) -> Vec<String> {
    let chunks: Vec<String> = segments
        .iter()
        .map(|segment| segment.trim())
        .filter(|segment| !segment.is_empty())
        .map(markdown_to_html)
        .collect();
    reconcile_segment_count(chunks, desired)
}

fn split_markdown_to_html_sections(markdown: &str) -> Vec<String> {
    let prepared = normalize_markdown_source(markdown);
    if prepared.is_empty() {
        return Vec::new();
    }
    SECTION_BREAK_RE
        .split(&prepared)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(markdown_to_html)
        .filter(|html| !html.is_empty())
        .collect()
}

/// One action's html from a sub-feature, with its bold name as lead-in.
pub fn build_action_html_from_feature(feature: &SubFeature) -> Option<String> {
    let body = markdown_to_html(feature.main_body_or_empty());
    if body.is_empty() {
        return None;
    }
    let name = sanitize_name(feature.name_or_empty());
    if name.is_empty() {
        return Some(body);
    }
    if body.starts_with("<p>") {
        return Some(body.replacen("<p>", &format!("<p><strong>{name}:</strong> "), 1));
    }
    Some(format!("<p><strong>{name}:</strong></p>{body}"))
}

/// Generic segmentation: one segment per sub-feature, else per paragraph, else the whole
/// text, then fitted to `desired`.
pub fn build_segments_for_actions(features: &[SubFeature], full_markdown: &str, desired: usize) -> Vec<String> {
    let mut segments: Vec<String> = features
        .iter()
        .filter_map(build_action_html_from_feature)
        .collect();

    if segments.is_empty() && !full_markdown.is_empty() {
        segments = split_markdown_to_html_sections(full_markdown);
    }
    if segments.is_empty() && !full_markdown.is_empty() {
        let html = markdown_to_html(full_markdown);
        if !html.is_empty() {
            segments.push(html);
        }
    }
    if segments.is_empty() || desired == 0 {
        return segments;
    }

    if segments.len() < desired && !full_markdown.is_empty() {
        let fallback = split_markdown_to_html_sections(full_markdown);
        if fallback.len() >= desired {
            segments = fallback;
        }
    }

    reconcile_segment_count(segments, desired)
}

/// Which slots get their own segment and which mirror an earlier slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPlan {
    pub unique: Vec<String>,
    /// `(duplicate id, id of the slot it mirrors)`
    pub duplicates: Vec<(String, String)>,
}

impl SlotPlan {
    pub fn all_unique(ids: &[String]) -> Self {
        Self {
            unique: ids.to_vec(),
            duplicates: Vec::new(),
        }
    }

    /// Groups slots by the fingerprint of their previous content; a slot without a previous
    /// value is fingerprinted by its current one.
    pub fn derive(ids: &[String], previous: Option<&Map<String, Value>>, current: &Map<String, Value>) -> Self {
        let mut plan = Self::default();
        let mut seen: Vec<(String, String)> = Vec::new();

        for id in ids {
            let source = match previous {
                Some(prev) if prev.contains_key(id) => action_html(prev, id),
                _ => action_html(current, id),
            };
            let key = slot_fingerprint(&source, id);
            match seen.iter().find(|(fp, _)| *fp == key) {
                Some((_, first)) => plan.duplicates.push((id.clone(), first.clone())),
                None => {
                    seen.push((key, id.clone()));
                    plan.unique.push(id.clone());
                }
            }
        }
        plan
    }
}

fn slot_fingerprint(html: &str, id: &str) -> String {
    let normalised = normalise_html_for_comparison(html);
    if normalised.is_empty() {
        return format!("id:{id}");
    }
    hex::encode(Sha256::digest(normalised.as_bytes()))
}

/// Writes segment `i` to unique slot `i`, then copies each duplicate from its merged original.
pub fn assign_segments(actions: &mut Map<String, Value>, plan: &SlotPlan, segments: &[String], fallback: &str) {
    if segments.is_empty() {
        return;
    }
    for (i, id) in plan.unique.iter().enumerate() {
        let html = segments
            .get(i)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback);
        if !html.is_empty() {
            set_action_html(actions, id, Some(html));
        }
    }
    for (dup, original) in &plan.duplicates {
        let mut cloned = action_html(actions, original);
        if cloned.is_empty() {
            cloned = fallback.to_string();
        }
        if !cloned.is_empty() {
            set_action_html(actions, dup, Some(&cloned));
        }
    }
}

/// One action per `- ` bullet of the feature body.
pub fn generate_bullet_actions(feature: &SubFeature) -> Vec<String> {
    let source = feature.main_body_or_empty().replace("\r\n", "\n");
    let content_end = source.trim_end_matches('\n').len();

    let mut bullets = Vec::new();
    let mut cursor = 0;
    while let Some(found) = source[cursor..].find("- ") {
        let start = cursor + found;
        let scan_from = start + 2;
        let end = source[scan_from..]
            .find("\n- ")
            .map(|i| scan_from + i)
            .unwrap_or(content_end)
            .min(content_end)
            .max(scan_from);
        bullets.push(&source[start..end]);
        cursor = end;
    }

    bullets
        .into_iter()
        .map(|segment| {
            let cleaned = BULLET_PREFIX_RE.replace(segment, "").replace("***", "**");
            sanitize_html(&markdown_to_html(cleaned.trim()))
        })
        .collect()
}

/// Intro paragraph followed by an ordered list of the bold bullet names.
pub fn render_battle_box_random_tactics(feature: &SubFeature) -> Option<String> {
    let source = normalize_markdown_source(feature.main_body_or_empty());
    if source.is_empty() {
        return None;
    }

    let intro = LIST_START_RE.split(&source).next().unwrap_or("").trim();
    let intro_html = if intro.is_empty() {
        String::new()
    } else {
        markdown_to_html(intro)
    };

    let items: String = BOLD_BULLET_RE
        .captures_iter(&source)
        .filter_map(|caps| {
            let name = sanitize_name(caps[1].trim_end_matches('.').trim());
            (!name.is_empty()).then(|| format!("<li><p><strong>{name}</strong></p></li>"))
        })
        .collect();
    let list_html = if items.is_empty() {
        String::new()
    } else {
        format!("<ol>{items}</ol>")
    };

    let combined = format!("{intro_html}{list_html}");
    (!combined.is_empty()).then_some(combined)
}

/// Drops a leading `<strong>Label.</strong>` from the first paragraph.
pub fn strip_leading_strong_label(html: &str) -> String {
    LEADING_STRONG_LABEL_RE.replace(html, "<p>").into_owned()
}
