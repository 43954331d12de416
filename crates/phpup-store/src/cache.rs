//! On-disk cache of the discovered version list.

use std::fs;
use std::path::Path;

use log::debug;

use crate::version::{parse_version, PhpVersion};

pub(crate) const CACHE_FILE: &str = "php_versions.json";

/// Load the cached version list, re-deriving each record's parsed version.
/// Records whose version string no longer parses are dropped; an unreadable
/// or malformed file yields `None` so the caller re-discovers.
pub(crate) fn load(path: &Path) -> Option<Vec<PhpVersion>> {
    let contents = fs::read_to_string(path).ok()?;
    let entries: Vec<PhpVersion> = serde_json::from_str(&contents).ok()?;

    let mut versions = Vec::with_capacity(entries.len());
    for mut entry in entries {
        match parse_version(&entry.version) {
            Some(full) => {
                entry.full_version = full;
                versions.push(entry);
            }
            None => {
                // someone messed up with the cache
                debug!("Dropping cached entry with unparseable version {:?}", entry.version);
            }
        }
    }
    Some(versions)
}

/// Persist the sorted version list, best-effort.
pub(crate) fn save(path: &Path, versions: &[PhpVersion]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(contents) = serde_json::to_string_pretty(versions) {
        let _ = fs::write(path, contents);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::version::PhpVersion;

    fn record(version: &str, php_path: &str) -> PhpVersion {
        let full = parse_version(version).unwrap();
        PhpVersion::new(PathBuf::from("/test"), full, PathBuf::from(php_path))
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);

        let mut fpm = record("8.0.26", "/php/8.0.26/bin/php");
        fpm.fpm_path = Some(PathBuf::from("/php/8.0.26/sbin/php-fpm"));
        let mut system = record("8.2.1", "/usr/bin/php");
        system.is_system = true;

        save(&path, &[fpm.clone(), system.clone()]);
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].version, "8.0.26");
        assert_eq!(loaded[0].full_version, fpm.full_version);
        assert_eq!(loaded[0].fpm_path, fpm.fpm_path);
        assert_eq!(loaded[0].cgi_path, None);
        assert_eq!(loaded[1].version, "8.2.1");
        assert!(loaded[1].is_system);
    }

    #[test]
    fn test_missing_tool_paths_serialize_as_empty_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        save(&path, &[record("8.1.2", "/usr/bin/php")]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""fpm_path": """#));
        assert!(raw.contains(r#""phpdbg_path": """#));
        assert!(raw.contains(r#""is_system": false"#));
    }

    #[test]
    fn test_corrupted_entry_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        let mut broken = record("8.1.2", "/usr/bin/php");
        broken.version = "not-a-version".to_string();

        save(&path, &[record("8.0.27", "/php/8.0.27/bin/php"), broken]);
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].version, "8.0.27");
    }

    #[test]
    fn test_malformed_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        std::fs::write(&path, "{ this is not json").unwrap();
        assert!(load(&path).is_none());
        assert!(load(&dir.path().join("missing.json")).is_none());
    }
}
