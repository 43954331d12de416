//! Discovery of PHP installations across package-manager layouts.
//!
//! Strategies are plain data (a root, optional filters, a label for the
//! logs) layered over two traversal modes: probing a directory as an
//! installation root, and a bounded walk that prunes at the first matching
//! directory level.

use std::collections::HashSet;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use crate::store::PhpStore;
use crate::version::PhpVersion;

mod inspect;
#[cfg(not(windows))]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
use unix as platform;
#[cfg(windows)]
use windows as platform;

/// Full discovery sweep: the default install prefixes, then the PATH
/// directories (the first version found there becomes the system default),
/// then the platform's package-manager strategy set.
pub(crate) fn discover(store: &mut PhpStore) {
    platform::discover_default_prefixes(store);

    // Under $PATH
    let paths = path_directories(store.config_dir());
    debug!("Looking for PHP in the PATH ({:?})", paths);
    for path in paths {
        for version in find_versions_in_dir(&path, None, "PATH") {
            let idx = store.add_version(version);
            // the first one is the default/system PHP binary
            if !store.has_system_version() {
                store.mark_system(idx);
                debug!("  System PHP version (first in PATH)");
            }
        }
    }

    platform::discover_package_managers(store);
}

/// Walk under `root`, treating the first directory level whose relative path
/// matches `path_filter` (or any first level, without a filter) as an
/// installation root. The walk depth is bounded by the number of path
/// separators in the filter pattern; unreadable entries are skipped.
pub(crate) fn probe_tree(
    store: &mut PhpStore,
    root: &Path,
    name_filter: Option<&Regex>,
    path_filter: Option<&Regex>,
    why: &str,
) {
    let mut max_depth = 1;
    if let Some(re) = path_filter {
        max_depth += re.as_str().matches('/').count();
    }

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth + 1)
        .into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            // permission errors or race-deleted entries must not abort the walk
            Err(_) => continue,
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!(
            "Looking for PHP in {} ({:?}) -- {}",
            entry.path().display(),
            path_filter.map(Regex::as_str),
            why
        );
        if path_filter.map_or(true, |re| re.is_match(&rel)) {
            probe_dir(store, entry.path(), name_filter, why);
            walker.skip_current_dir();
        }
    }
}

/// Probe a single directory as an installation root, feeding everything it
/// yields into the store.
pub(crate) fn probe_dir(store: &mut PhpStore, dir: &Path, name_filter: Option<&Regex>, why: &str) {
    for version in find_versions_in_dir(dir, name_filter, why) {
        store.add_version(version);
    }
}

/// Inspect one installation root. A root that is itself a `bin` directory is
/// scanned in place with its parent as the installation root; otherwise
/// candidates live in `bin/` (except on Windows, where the layout is flat).
pub(crate) fn find_versions_in_dir(
    dir: &Path,
    name_filter: Option<&Regex>,
    why: &str,
) -> Vec<PhpVersion> {
    debug!(
        "Looking for PHP in {} ({:?}) -- {}",
        dir.display(),
        name_filter.map(Regex::as_str),
        why
    );

    let mut install_dir = dir.to_path_buf();
    let mut bin_dir = dir.to_path_buf();
    if dir.file_name() == Some(OsStr::new("bin")) {
        if let Some(parent) = dir.parent() {
            install_dir = parent.to_path_buf();
        }
    } else if !cfg!(windows) {
        bin_dir = dir.join("bin");
    }

    let name_filter = match name_filter {
        Some(re) => re,
        None => return inspect::inspect(&install_dir, "php").into_iter().collect(),
    };

    let entries = match fs::read_dir(&bin_dir) {
        Ok(entries) => entries,
        Err(_) => {
            debug!("  Skipping {} as it does not exist", bin_dir.display());
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().map_or(false, |t| t.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    let mut found = Vec::new();
    for name in names {
        if name_filter.is_match(&name) {
            if let Some(version) = inspect::inspect(&install_dir, &name) {
                found.push(version);
            }
        }
    }
    found
}

/// The PATH directories to scan, symlink-resolved, in first-occurrence
/// order, with our own shim directory and duplicate targets dropped.
pub(crate) fn path_directories(config_dir: &Path) -> Vec<PathBuf> {
    let shim_dir = config_dir.join("bin");
    let path_var = env::var_os("PATH").unwrap_or_default();

    let mut dirs = Vec::new();
    let mut seen = HashSet::new();
    for dir in env::split_paths(&path_var) {
        let dir = expand_user_profile(dir);
        let resolved = match fs::canonicalize(&dir) {
            Ok(resolved) => resolved,
            Err(_) => continue,
        };
        if resolved == shim_dir {
            continue;
        }
        if !seen.insert(resolved.clone()) {
            if dir != resolved {
                debug!(
                    "  Skipping {} (alias of {}), already in the PATH",
                    dir.display(),
                    resolved.display()
                );
            } else {
                debug!("  Skipping {}, already in the PATH", dir.display());
            }
            continue;
        }
        dirs.push(resolved);
    }
    dirs
}

#[cfg(windows)]
fn expand_user_profile(dir: PathBuf) -> PathBuf {
    match env::var("USERPROFILE") {
        Ok(profile) => PathBuf::from(
            dir.to_string_lossy().replacen("%USERPROFILE%", &profile, 1),
        ),
        Err(_) => dir,
    }
}

#[cfg(not(windows))]
fn expand_user_profile(dir: PathBuf) -> PathBuf {
    dir
}

/// Best-effort capability query: the trimmed stdout of a helper command, or
/// `None` when the command is missing, fails, or prints nothing.
pub(crate) fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}
