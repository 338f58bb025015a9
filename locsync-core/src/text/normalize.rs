use std::collections::HashMap;

/// Join key shared by English entity names, destination keys and aliases.
///
/// Quote variants are unified, case is folded and everything outside `[a-z0-9]` is dropped,
/// so "Rain of Blades", "rain-of-blades" and "Rain of Blades " collide on purpose.
pub fn normalize_key(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let mut s = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '’' | '‘' | 'ʼ' | '`' => s.push('\''),
            '“' | '”' => s.push('"'),
            _ => s.push(ch),
        }
    }

    let s = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    let key: String = s
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();

    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

pub fn resolve_alias<'a>(norm: &'a str, aliases: &'a HashMap<&'static str, &'static str>) -> &'a str {
    aliases.get(norm).copied().unwrap_or(norm)
}

/// CRLF to LF plus trim. Used to decide whether two language variants carry the same text.
pub fn normalise_text(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}
