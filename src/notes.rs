//! Local text notes.
//!
//! Lists the top level of the notes directory (no recursion), filtered by
//! the configured include globs and sorted by file name. A missing
//! directory is an empty notebook rather than an error.
//!
//! Note files come from many editors, so reading accepts UTF-8 with or
//! without a byte-order mark, UTF-16 with a BOM, and falls back to lossy
//! UTF-8 for anything else.

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use hub_core::source::{NotesSource, SourceError, SourceResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::NotesConfig;

pub struct FsNotes {
    dir: PathBuf,
    include: GlobSet,
}

impl FsNotes {
    pub fn new(dir: impl Into<PathBuf>, include_globs: &[String]) -> anyhow::Result<Self> {
        Ok(Self {
            dir: dir.into(),
            include: build_globset(include_globs)?,
        })
    }

    pub fn from_config(config: &NotesConfig) -> anyhow::Result<Self> {
        Self::new(&config.dir, &config.include_globs)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl NotesSource for FsNotes {
    async fn list_notes(&self) -> SourceResult<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SourceError::Transient(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.include.is_match(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn read_note(&self, name: &str) -> SourceResult<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SourceError::NotFound(name.to_string()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(SourceError::NotFound(name.to_string()));
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SourceError::Transient(format!("{}: {}", path.display(), e)))?;
        Ok(decode_text(&bytes))
    }
}

/// Decode note bytes: UTF-8 (BOM stripped), UTF-16 LE/BE with BOM, else
/// lossy UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn notes(dir: &Path) -> FsNotes {
        FsNotes::new(dir, &["*.txt".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_list_is_sorted_filtered_and_flat() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("c.md"), "c").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/d.txt"), "d").unwrap();

        let names = notes(tmp.path()).list_notes().await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let names = notes(&tmp.path().join("nope")).list_notes().await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_and_traversal_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let source = notes(tmp.path());
        assert!(matches!(
            source.read_note("ghost.txt").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.read_note("../etc/passwd").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_strips_utf8_bom() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bom.txt"), b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(notes(tmp.path()).read_note("bom.txt").await.unwrap(), "hello");
    }

    #[test]
    fn test_decode_utf16_le() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "héllo".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "héllo");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        assert_eq!(decode_text(b"ok\xFFok"), "ok\u{FFFD}ok");
    }
}
