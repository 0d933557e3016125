//! Listing of tile trees whose folders and files are named by numbers.
//!
//! Entries are ordered by their parsed value, so `9` sorts before `10`.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// A directory entry named by a number.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumericEntry {
    pub number: u32,
    pub path: PathBuf,
}

/// Returns the first run of ASCII digits in `name`, parsed.
///
/// `"tile_0042.png"` gives 42, `"abc"` gives `None`.
pub fn embedded_number(name: &str) -> Option<u32> {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().ok()
}

/// Subdirectories of `dir` whose whole name is a number, sorted by that number.
/// Other subdirectories are skipped with a warning; files are ignored.
pub fn numeric_dirs(dir: &Path) -> Result<Vec<NumericEntry>> {
    list(dir, true, |name| name.parse().ok())
}

/// Files of `dir` whose name embeds a number, sorted by that number.
/// Files without a number are skipped with a warning; directories are ignored.
pub fn numeric_files(dir: &Path) -> Result<Vec<NumericEntry>> {
    list(dir, false, embedded_number)
}

fn list(dir: &Path, dirs: bool, number: impl Fn(&str) -> Option<u32>) -> Result<Vec<NumericEntry>> {
    let mut entries = Vec::new();

    let read = fs::read_dir(dir).with_context(|| format!("failed listing {}", dir.display()))?;
    for entry in read {
        let entry = entry.with_context(|| format!("failed listing {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() != dirs {
            continue;
        }

        let name = entry.file_name();
        match name.to_str().and_then(&number) {
            Some(n) => entries.push(NumericEntry { number: n, path }),
            None => log::warn!("ignored {}", path.display()),
        }
    }

    entries.sort_by_key(|e| e.number);
    Ok(entries)
}
