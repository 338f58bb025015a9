use std::fs;
use std::path::{Path, PathBuf};

use super::encoding::decode_text;
use crate::error::{Result, SyncError};
use crate::model::TranslationDocument;

pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| SyncError::io(path, e))?;
    Ok(decode_text(&bytes).into_owned())
}

/// Reads a translation file. The root must be an object holding an `entries` object.
pub fn read_document(path: &Path) -> Result<TranslationDocument> {
    let text = read_text(path)?;
    let doc = TranslationDocument::parse(&text).map_err(|e| SyncError::json(path, e))?;
    if doc.root.contains_key("entries") && doc.entries().is_none() {
        return Err(SyncError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "`entries` is not an object".into(),
        });
    }
    Ok(doc)
}

pub fn write_document(path: &Path, doc: &TranslationDocument) -> Result<()> {
    let text = doc.render().map_err(|e| SyncError::json(path, e))?;
    write_atomic(path, text.as_bytes())
}

/// Writes through a sibling temp file so a crash never leaves a half-written file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }

    fs::write(&tmp, bytes).map_err(|e| SyncError::io(&tmp, e))?;

    if path.exists() {
        fs::remove_file(path).map_err(|e| SyncError::io(path, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| SyncError::io(path, e))?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "locsync".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_keeps_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("daggerheart.classes.json");
        let doc = TranslationDocument::parse("{\n  \"label\": \"Классы\",\n  \"entries\": {}\n}\n").unwrap();

        write_document(&path, &doc).unwrap();
        assert!(!dir.path().join("nested").join("daggerheart.classes.json.tmp").exists());

        let back = read_document(&path).unwrap();
        assert_eq!(back, doc);
        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
    }

    #[test]
    fn rejects_non_object_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"label":"x","entries":[]}"#).unwrap();
        assert!(matches!(read_document(&path), Err(SyncError::InvalidDocument { .. })));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_document(&path), Err(SyncError::Json { .. })));
    }
}
