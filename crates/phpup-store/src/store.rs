//! Store of all locally installed PHP versions and the version matching
//! algorithm on top of it.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache;
use crate::discovery;
use crate::project;
use crate::version::{self, PhpVersion, ServerKind};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no PHP binaries detected")]
    NoPhpBinaries,
}

/// A successful version resolution: the matched installation, where the
/// requirement came from, and an optional non-fatal warning to display.
#[derive(Debug)]
pub struct Match<'a> {
    pub version: &'a PhpVersion,
    pub source: String,
    pub warning: Option<String>,
}

/// Result of the numeric part of a lookup, before any flavor fallback.
struct NumericMatch<'a> {
    version: Option<&'a PhpVersion>,
    warning: Option<String>,
    prefix: String,
}

/// Stores information about all locally installed PHP versions.
///
/// Built once, either from the on-disk cache or by running a full discovery
/// sweep; read-only afterward.
pub struct PhpStore {
    config_dir: PathBuf,
    versions: Vec<PhpVersion>,
    seen: HashMap<PathBuf, usize>,
}

impl PhpStore {
    /// Create a store for the given configuration directory. `reload` drops
    /// the cached version list and forces a fresh discovery.
    pub fn new(config_dir: impl Into<PathBuf>, reload: bool) -> Self {
        let mut store = PhpStore {
            config_dir: config_dir.into(),
            versions: Vec::new(),
            seen: HashMap::new(),
        };
        if reload {
            let _ = fs::remove_file(store.cache_path());
        }
        store.load_versions();
        store
    }

    /// All available PHP versions, ascending.
    pub fn versions(&self) -> &[PhpVersion] {
        &self.versions
    }

    pub(crate) fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn is_version_available(&self, version: &str) -> bool {
        // start from the end as versions are always sorted
        self.versions
            .iter()
            .rev()
            .any(|v| v.version == version || v.version.starts_with(version))
    }

    /// Returns the configured PHP version for the given directory, from the
    /// first project signal that yields one: the forced-version environment
    /// variable, a `.php-version` pin, a `composer.json` platform field, a
    /// `.php-version` pin above the working directory, or a cloud descriptor.
    pub fn best_version_for_dir(&self, dir: &Path) -> Result<Match<'_>, StoreError> {
        // forced version?
        if let Ok(forced) = env::var("FORCED_PHP_VERSION") {
            if !forced.is_empty() {
                let minor = forced.split('.').take(2).collect::<Vec<_>>().join(".");
                if version::is_version_prefix(&minor) {
                    return self.best_version(&minor, "internal forced version");
                }
            }
        }

        // .php-version for the given dir and up
        if let Some((pin, found)) = project::version_file_for_dir(dir, ".php-version") {
            let file = found.join(".php-version");
            return self.best_version(&pin, &format!(".php-version from current dir: {}", file.display()));
        }

        // composer.json for the given dir and up
        if let Some((contents, found)) = project::version_file_for_dir(dir, "composer.json") {
            if let Some(php) = project::platform_php_requirement(&contents) {
                let file = found.join("composer.json");
                return self.best_version(&php, &format!("composer.json from current dir: {}", file.display()));
            }
        }

        // .php-version for the current working directory and up
        if let Ok(wd) = env::current_dir() {
            if let Some((pin, found)) = project::version_file_for_dir(&wd, ".php-version") {
                let file = found.join(".php-version");
                return self.best_version(&pin, &format!(".php-version from working dir: {}", file.display()));
            }
        }

        // cloud platform descriptors for the given dir and up
        if let Some((contents, found)) = project::version_file_for_dir(dir, ".symfony.cloud.yaml") {
            if let Some(php) = project::cloud_php_requirement(&contents) {
                let file = found.join(".symfony.cloud.yaml");
                return self.best_version(&php, &format!("SymfonyCloud: {}", file.display()));
            }
        }
        if let Some((contents, found)) = project::version_file_for_dir(dir, ".platform.app.yaml") {
            if let Some(php) = project::cloud_php_requirement(&contents) {
                let file = found.join(".platform.app.yaml");
                return self.best_version(&php, &format!("Platform.sh: {}", file.display()));
            }
        }

        self.fallback_version(None)
    }

    /// Returns the latest patch version for the given major (X), minor (X.Y),
    /// or patch (X.Y.Z) request, optionally qualified with a serving flavor
    /// (e.g. `8.1-fpm`).
    ///
    /// If the asked version is a patch one (X.Y.Z) and is not available, the
    /// lookup falls back to the last patch version of the minor (X.Y) with a
    /// warning. There is no fallback to the major version: PHP is known to
    /// occasionally break BC in minor versions, so that would not be safe.
    pub fn best_version(&self, requested: &str, source: &str) -> Result<Match<'_>, StoreError> {
        let (numeric, flavor) = split_flavor(requested);

        let mut result = self.match_numeric(numeric, source, flavor);
        if result.version.is_none() {
            if let Some(kind) = flavor {
                // nothing with the requested flavor: match on version alone
                let mut retry = self.match_numeric(numeric, source, None);
                if retry.version.is_some() {
                    let note = format!(
                        "the current dir requires a {} build of PHP {} ({}), but none is available: picking the best version match instead",
                        kind, numeric, source
                    );
                    retry.warning = Some(match retry.warning.take() {
                        Some(warning) => format!("{}; {}", warning, note),
                        None => note,
                    });
                }
                result = retry;
            }
        }

        match result.version {
            Some(v) => Ok(Match {
                version: v,
                source: source.to_string(),
                warning: result.warning,
            }),
            None => self.fallback_version(Some(format!(
                "the current dir requires PHP {} ({}), but this version is not available",
                result.prefix, source
            ))),
        }
    }

    /// Numeric prefix lookup, independent of the flavor qualifier syntax.
    fn match_numeric(&self, requested: &str, source: &str, flavor: Option<ServerKind>) -> NumericMatch<'_> {
        let mut prefix = requested;
        let mut warning = None;

        let dots: Vec<usize> = prefix.match_indices('.').map(|(i, _)| i).collect();
        if dots.len() >= 2 {
            let pos = dots[dots.len() - 1];
            if &prefix[pos + 1..] == "99" {
                // `X.Y.99` means any patch of this minor
                prefix = &prefix[..pos];
            } else {
                // exact patch request: look for a literal match first, the
                // order does not matter here
                for v in &self.versions {
                    if v.version == prefix && flavor.map_or(true, |kind| v.supports(kind)) {
                        return NumericMatch {
                            version: Some(v),
                            warning: None,
                            prefix: prefix.to_string(),
                        };
                    }
                }

                let truncated = &prefix[..pos];
                warning = Some(format!(
                    "the current dir requires PHP {} ({}), but this version is not available: fallback to {}",
                    prefix, source, truncated
                ));
                prefix = truncated;
            }
        }

        // start from the end as versions are always sorted
        for v in self.versions.iter().rev() {
            if v.version.starts_with(prefix) && flavor.map_or(true, |kind| v.supports(kind)) {
                return NumericMatch {
                    version: Some(v),
                    warning,
                    prefix: prefix.to_string(),
                };
            }
        }

        NumericMatch {
            version: None,
            warning,
            prefix: prefix.to_string(),
        }
    }

    fn fallback_version(&self, warning: Option<String>) -> Result<Match<'_>, StoreError> {
        if let Some(v) = self.versions.iter().find(|v| v.is_system) {
            return Ok(Match {
                version: v,
                source: "default version in $PATH".to_string(),
                warning,
            });
        }
        match self.versions.last() {
            Some(v) => Ok(Match {
                version: v,
                source: "most recent PHP version".to_string(),
                warning,
            }),
            None => Err(StoreError::NoPhpBinaries),
        }
    }

    fn cache_path(&self) -> PathBuf {
        self.config_dir.join(cache::CACHE_FILE)
    }

    fn load_versions(&mut self) {
        if let Some(cached) = cache::load(&self.cache_path()) {
            self.versions = cached;
            self.sort_versions();
            return;
        }
        discovery::discover(self);
        self.sort_versions();
        cache::save(&self.cache_path(), &self.versions);
    }

    /// Stable sort, so equal versions keep their discovery order.
    fn sort_versions(&mut self) {
        self.versions.sort_by(|a, b| a.full_version.cmp(&b.full_version));
    }

    /// Adds a discovered version, keeping all versions unique in the store.
    ///
    /// A symlink and its target are recognized as the same installation even
    /// when discovered through different strategies; on collision the record
    /// with the richer serving capability wins.
    pub(crate) fn add_version(&mut self, version: PhpVersion) -> usize {
        let resolved = fs::canonicalize(&version.php_path).ok();
        let mut existing = self.seen.get(&version.php_path).copied();
        if existing.is_none() {
            // double-check that this is not just a symlink to a known version
            if let Some(resolved) = &resolved {
                existing = self.seen.get(resolved).copied();
            }
        }

        let idx = match existing {
            None => {
                self.versions.push(version);
                let idx = self.versions.len() - 1;
                self.seen.insert(self.versions[idx].php_path.clone(), idx);
                if let Some(resolved) = resolved {
                    self.seen.insert(resolved, idx);
                }
                return idx;
            }
            Some(idx) => idx,
        };

        if version.capability_score() > self.versions[idx].capability_score() {
            // the system flag stays with the stored slot, not the record
            let is_system = self.versions[idx].is_system;
            self.versions[idx] = version;
            self.versions[idx].is_system = is_system;
        }
        idx
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests() -> Self {
        PhpStore {
            config_dir: PathBuf::from("/test/config"),
            versions: Vec::new(),
            seen: HashMap::new(),
        }
    }

    pub(crate) fn mark_system(&mut self, idx: usize) {
        self.versions[idx].is_system = true;
    }

    pub(crate) fn has_system_version(&self) -> bool {
        self.versions.iter().any(|v| v.is_system)
    }
}

/// Split an optional flavor qualifier (`8.1-fpm`) off a version request.
/// The qualifier is opaque to the numeric matcher; unknown qualifiers are
/// dropped rather than treated as part of the version.
fn split_flavor(requested: &str) -> (&str, Option<ServerKind>) {
    match requested.find('-') {
        Some(pos) => (&requested[..pos], ServerKind::from_qualifier(&requested[pos + 1..])),
        None => (requested, None),
    }
}
