//! Local filesystem [`Backend`].

use std::fs;
use std::io::{Read, Write};
use std::path::Path as StdPath;

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};

use crate::path::Backend;

/// Characters that make a glob pattern non-literal. Used to short-circuit
/// `each_child` into a single `exists` check when the caller asked for one
/// exact name rather than a wildcard.
const GLOB_METACHARACTERS: &[char] = &['*', '?', '[', ']'];

fn is_literal_pattern(pattern: &str) -> bool {
    !pattern.chars().any(|c| GLOB_METACHARACTERS.contains(&c))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Backs a [`crate::path::Path`] with ordinary `std::fs` calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl Backend for LocalBackend {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(StdPath::new(path).exists())
    }

    fn size(&self, path: &str) -> Result<u64> {
        let meta = fs::metadata(path).with_context(|| format!("stat {path}"))?;
        Ok(meta.len())
    }

    fn delete(&self, path: &str) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("delete {path}"))
    }

    fn delete_all(&self, path: &str) -> Result<()> {
        let meta = fs::metadata(path).with_context(|| format!("stat {path}"))?;
        if meta.is_dir() {
            fs::remove_dir_all(path).with_context(|| format!("delete_all {path}"))
        } else {
            fs::remove_file(path).with_context(|| format!("delete_all {path}"))
        }
    }

    fn mkpath(&self, path: &str) -> Result<()> {
        if let Some(parent) = StdPath::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| format!("mkpath {}", parent.display()))?;
            }
        }
        Ok(())
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("mkdir {path}"))
    }

    fn each_child(
        &self,
        path: &str,
        pattern: Option<&str>,
        case_sensitive: bool,
        directories: bool,
        hidden: bool,
    ) -> Result<Vec<String>> {
        // A literal (wildcard-free) pattern names one child directly; skip
        // the directory scan entirely.
        if let Some(p) = pattern {
            if is_literal_pattern(p) {
                let candidate = StdPath::new(path).join(p);
                return Ok(if candidate.exists() { vec![candidate.to_string_lossy().into_owned()] } else { Vec::new() });
            }
        }

        let compiled = pattern
            .map(Pattern::new)
            .transpose()
            .with_context(|| format!("invalid glob pattern {pattern:?}"))?;
        let options = MatchOptions {
            case_sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: !hidden,
        };

        let mut out = Vec::new();
        let entries = fs::read_dir(path).with_context(|| format!("read_dir {path}"))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read_dir entry under {path}"))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !hidden && is_hidden(&name) {
                continue;
            }
            let file_type = entry.file_type().with_context(|| format!("file_type for {name}"))?;
            if file_type.is_dir() && !directories {
                continue;
            }
            if file_type.is_file() && directories {
                continue;
            }
            if let Some(ref compiled) = compiled {
                if !compiled.matches_with(&name, options) {
                    continue;
                }
            }
            out.push(entry.path().to_string_lossy().into_owned());
        }
        out.sort();
        Ok(out)
    }

    fn reader(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path).with_context(|| format!("open {path} for reading"))?))
    }

    fn writer(&self, path: &str) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(fs::File::create(path).with_context(|| format!("create {path} for writing"))?))
    }

    fn partial_files_visible(&self) -> bool {
        true
    }

    fn realpath(&self, path: &str) -> Result<String> {
        let canonical = fs::canonicalize(path).with_context(|| format!("canonicalize {path}"))?;
        Ok(canonical.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn mkpath_creates_parent_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("nested/deep/file.txt").to_string_lossy().into_owned();
        let backend = LocalBackend;
        backend.mkpath(&target)?;
        assert!(StdPath::new(&target).parent().unwrap().is_dir());
        Ok(())
    }

    #[test]
    fn each_child_filters_hidden_and_sorts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::File::create(dir.path().join("b.csv"))?;
        fs::File::create(dir.path().join("a.csv"))?;
        fs::File::create(dir.path().join(".hidden.csv"))?;
        fs::create_dir(dir.path().join("subdir"))?;

        let backend = LocalBackend;
        let children = backend.each_child(dir.path().to_str().unwrap(), Some("*.csv"), true, false, false)?;
        assert_eq!(children.len(), 2);
        assert!(children[0].ends_with("a.csv"));
        assert!(children[1].ends_with("b.csv"));
        Ok(())
    }

    #[test]
    fn each_child_can_include_hidden_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::File::create(dir.path().join(".hidden.csv"))?;
        let backend = LocalBackend;
        let children = backend.each_child(dir.path().to_str().unwrap(), Some("*.csv"), true, false, true)?;
        assert_eq!(children.len(), 1);
        Ok(())
    }

    #[test]
    fn each_child_with_literal_pattern_skips_scan() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut f = fs::File::create(dir.path().join("exact.csv"))?;
        f.write_all(b"data")?;
        let backend = LocalBackend;
        let children = backend.each_child(dir.path().to_str().unwrap(), Some("exact.csv"), true, false, false)?;
        assert_eq!(children.len(), 1);
        let none = backend.each_child(dir.path().to_str().unwrap(), Some("missing.csv"), true, false, false)?;
        assert!(none.is_empty());
        Ok(())
    }

    #[test]
    fn delete_all_removes_directory_tree() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested)?;
        fs::File::create(nested.join("f.txt"))?;
        let backend = LocalBackend;
        backend.delete_all(dir.path().join("a").to_str().unwrap())?;
        assert!(!dir.path().join("a").exists());
        Ok(())
    }
}
