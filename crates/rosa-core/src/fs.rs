//! Filesystem helpers exposed to scripts

use std::fs;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub is_directory: bool,
    /// File name including extension
    pub name: String,
    /// File name without the final extension
    pub stem: String,
    /// Final extension with its leading dot, or empty
    pub extension: String,
}

/// Entries of a directory, sorted by name
pub fn list_directory(path: impl AsRef<Path>) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        let text = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        let extension = text(path.extension());
        entries.push(DirEntry {
            is_directory: entry.file_type()?.is_dir(),
            name: text(path.file_name()),
            stem: text(path.file_stem()),
            extension: if extension.is_empty() {
                extension
            } else {
                format!(".{extension}")
            },
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Create a directory and its parents; returns whether anything was created
pub fn create_directory(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("init.lua"), "").unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        fs::create_dir(dir.path().join("modes")).unwrap();

        let entries = list_directory(dir.path()).unwrap();
        assert_eq!(entries.len(), 3);

        let script = entries.iter().find(|e| e.name == "init.lua").unwrap();
        assert!(!script.is_directory);
        assert_eq!(script.stem, "init");
        assert_eq!(script.extension, ".lua");

        let readme = entries.iter().find(|e| e.name == "README").unwrap();
        assert_eq!(readme.extension, "");

        let modes = entries.iter().find(|e| e.name == "modes").unwrap();
        assert!(modes.is_directory);
    }

    #[test]
    fn test_list_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_directory(dir.path().join("missing")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_directory_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        assert!(create_directory(&nested).unwrap());
        assert!(nested.is_dir());
        assert!(!create_directory(&nested).unwrap());
    }
}
