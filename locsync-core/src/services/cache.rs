use std::path::Path;
use std::thread;

use log::debug;

use super::encoding::decode_text;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::model::{Bilingual, SourceEntity, SourceEnvelope, Sources};

/// API collections mirrored into the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Class,
    Subclass,
    Ancestry,
    Community,
    DomainCard,
    Equipment,
    Beastform,
    Transformation,
    Adversary,
    Environment,
    Rule,
}

impl Endpoint {
    pub const ALL: [Endpoint; 11] = [
        Endpoint::Class,
        Endpoint::Subclass,
        Endpoint::Ancestry,
        Endpoint::Community,
        Endpoint::DomainCard,
        Endpoint::Equipment,
        Endpoint::Beastform,
        Endpoint::Transformation,
        Endpoint::Adversary,
        Endpoint::Environment,
        Endpoint::Rule,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Class => "class",
            Endpoint::Subclass => "subclass",
            Endpoint::Ancestry => "ancestry",
            Endpoint::Community => "community",
            Endpoint::DomainCard => "domain-card",
            Endpoint::Equipment => "equipment",
            Endpoint::Beastform => "beastform",
            Endpoint::Transformation => "transformation",
            Endpoint::Adversary => "adversary",
            Endpoint::Environment => "environment",
            Endpoint::Rule => "rule",
        }
    }

    fn slot(self, sources: &mut Sources) -> &mut Bilingual {
        match self {
            Endpoint::Class => &mut sources.classes,
            Endpoint::Subclass => &mut sources.subclasses,
            Endpoint::Ancestry => &mut sources.ancestries,
            Endpoint::Community => &mut sources.communities,
            Endpoint::DomainCard => &mut sources.domains,
            Endpoint::Equipment => &mut sources.equipment,
            Endpoint::Beastform => &mut sources.beastforms,
            Endpoint::Transformation => &mut sources.transformations,
            Endpoint::Adversary => &mut sources.adversaries,
            Endpoint::Environment => &mut sources.environments,
            Endpoint::Rule => &mut sources.rules,
        }
    }
}

/// Reads one cached dataset (`{ "data": [...] }`).
pub fn load_dataset(path: &Path) -> Result<Vec<SourceEntity>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyncError::MissingCache {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(SyncError::io(path, e)),
    };
    let text = decode_text(&bytes);
    let envelope: SourceEnvelope = serde_json::from_str(&text).map_err(|e| SyncError::json(path, e))?;
    debug!("loaded {} records from {}", envelope.data.len(), path.display());
    Ok(envelope.data)
}

/// Loads every endpoint in both languages. The reads run in parallel and all of them
/// finish before the first error is returned.
pub fn load_sources(config: &SyncConfig) -> Result<Sources> {
    let source_lang = config.languages.source.as_str();
    let target_lang = config.languages.target.as_str();

    let results: Vec<(Endpoint, Result<Vec<SourceEntity>>, Result<Vec<SourceEntity>>)> =
        thread::scope(|scope| {
            let handles: Vec<_> = Endpoint::ALL
                .iter()
                .map(|&endpoint| {
                    let en_path = config.cache_file(source_lang, endpoint.as_str());
                    let ru_path = config.cache_file(target_lang, endpoint.as_str());
                    let en = scope.spawn(move || load_dataset(&en_path));
                    let ru = scope.spawn(move || load_dataset(&ru_path));
                    (endpoint, en, ru)
                })
                .collect();

            handles
                .into_iter()
                .map(|(endpoint, en, ru)| (endpoint, join(en), join(ru)))
                .collect()
        });

    let mut sources = Sources::default();
    for (endpoint, en, ru) in results {
        let slot = endpoint.slot(&mut sources);
        slot.en = en?;
        slot.ru = ru?;
    }
    Ok(sources)
}

fn join(handle: thread::ScopedJoinHandle<'_, Result<Vec<SourceEntity>>>) -> Result<Vec<SourceEntity>> {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
