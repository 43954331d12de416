//! Model of a single installed PHP runtime.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use semver::Version as SemVersion;
use serde::{Deserialize, Serialize};

/// Serving mode of a PHP installation, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    FrankenPhp,
    Fpm,
    Cgi,
    Cli,
}

impl ServerKind {
    /// Parse a flavor qualifier as it appears in a version request suffix.
    pub(crate) fn from_qualifier(qualifier: &str) -> Option<Self> {
        match qualifier {
            "frankenphp" => Some(ServerKind::FrankenPhp),
            "fpm" => Some(ServerKind::Fpm),
            "cgi" => Some(ServerKind::Cgi),
            "cli" => Some(ServerKind::Cli),
            _ => None,
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() keeps the caller's width/alignment flags working
        let label = match self {
            ServerKind::FrankenPhp => "FrankenPHP",
            ServerKind::Fpm => "PHP FPM",
            ServerKind::Cgi => "PHP CGI",
            ServerKind::Cli => "PHP CLI",
        };
        f.pad(label)
    }
}

/// One installed PHP version.
///
/// The serialized field set is the on-disk cache contract; `full_version` is
/// re-derived from `version` whenever a record is loaded back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhpVersion {
    #[serde(skip, default = "zero_version")]
    pub full_version: SemVersion,
    pub version: String,
    pub path: PathBuf,
    pub php_path: PathBuf,
    #[serde(with = "path_or_empty", default)]
    pub fpm_path: Option<PathBuf>,
    #[serde(with = "path_or_empty", default)]
    pub cgi_path: Option<PathBuf>,
    #[serde(with = "path_or_empty", default)]
    pub php_config_path: Option<PathBuf>,
    #[serde(with = "path_or_empty", default)]
    pub phpize_path: Option<PathBuf>,
    #[serde(with = "path_or_empty", default)]
    pub phpdbg_path: Option<PathBuf>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub frankenphp: bool,
}

fn zero_version() -> SemVersion {
    SemVersion::new(0, 0, 0)
}

impl PhpVersion {
    pub(crate) fn new(path: PathBuf, full_version: SemVersion, php_path: PathBuf) -> Self {
        PhpVersion {
            version: full_version.to_string(),
            full_version,
            path,
            php_path,
            fpm_path: None,
            cgi_path: None,
            php_config_path: None,
            phpize_path: None,
            phpdbg_path: None,
            is_system: false,
            frankenphp: false,
        }
    }

    /// The serving flavor of this installation. Single derivation point for
    /// the FrankenPHP > FPM > CGI > CLI precedence.
    pub fn server_kind(&self) -> ServerKind {
        if self.frankenphp {
            ServerKind::FrankenPhp
        } else if self.fpm_path.is_some() {
            ServerKind::Fpm
        } else if self.cgi_path.is_some() {
            ServerKind::Cgi
        } else {
            ServerKind::Cli
        }
    }

    /// The executable to launch when serving; FrankenPHP embeds the runtime
    /// and has no separate server binary.
    pub fn server_path(&self) -> Option<&Path> {
        match self.server_kind() {
            ServerKind::Fpm => self.fpm_path.as_deref(),
            ServerKind::Cgi => self.cgi_path.as_deref(),
            ServerKind::FrankenPhp => None,
            ServerKind::Cli => Some(&self.php_path),
        }
    }

    /// Whether this installation can serve with the given flavor. A
    /// FrankenPHP runtime embeds the server and cannot serve plain CLI.
    pub fn supports(&self, kind: ServerKind) -> bool {
        match kind {
            ServerKind::FrankenPhp => self.frankenphp,
            ServerKind::Fpm => self.fpm_path.is_some(),
            ServerKind::Cgi => self.cgi_path.is_some(),
            ServerKind::Cli => !self.frankenphp,
        }
    }

    /// Rank used on deduplication: a record with FPM beats CGI beats CLI-only.
    pub(crate) fn capability_score(&self) -> u8 {
        if self.fpm_path.is_some() {
            2
        } else if self.cgi_path.is_some() {
            1
        } else {
            0
        }
    }

    /// Attach the auxiliary tool paths that actually exist, symlink-resolved.
    pub(crate) fn set_server(
        &mut self,
        fpm: &Path,
        cgi: &Path,
        php_config: &Path,
        phpize: &Path,
        phpdbg: &Path,
    ) {
        let mut msg = format!("  Found PHP: {}", self.php_path.display());
        if let Ok(fpm) = fs::canonicalize(fpm) {
            msg += &format!(", with FPM: {}", fpm.display());
            self.fpm_path = Some(fpm);
        }
        if let Ok(cgi) = fs::canonicalize(cgi) {
            msg += &format!(", with CGI: {}", cgi.display());
            self.cgi_path = Some(cgi);
        }
        if let Ok(php_config) = fs::canonicalize(php_config) {
            msg += &format!(", with php-config: {}", php_config.display());
            self.php_config_path = Some(php_config);
        }
        if let Ok(phpize) = fs::canonicalize(phpize) {
            msg += &format!(", with phpize: {}", phpize.display());
            self.phpize_path = Some(phpize);
        }
        if let Ok(phpdbg) = fs::canonicalize(phpdbg) {
            msg += &format!(", with phpdbg: {}", phpdbg.display());
            self.phpdbg_path = Some(phpdbg);
        }
        log::debug!("{}", msg);
    }
}

/// Decompose a 5-digit vernum `XYYZZ` into its dotted `X.YY.ZZ` form.
/// Any other length is a validation failure so non-standard build-config
/// files are rejected instead of producing a bogus version.
pub(crate) fn split_vernum(raw: &str) -> Option<String> {
    if raw.len() != 5 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}.{}.{}", &raw[..1], &raw[1..3], &raw[3..5]))
}

/// Parse a 5-digit vernum into a comparable version.
pub(crate) fn version_from_vernum(raw: &str) -> Option<SemVersion> {
    parse_version(&split_vernum(raw)?)
}

/// Re-encode a version banner's components as a vernum, zero-padding the
/// minor and patch to two digits.
pub(crate) fn vernum_from_parts(major: &str, minor: &str, patch: &str) -> String {
    format!("{}{:0>2}{:0>2}", major, minor, patch)
}

/// Parse a dotted `X.Y.Z` version, tolerating zero-padded components.
pub(crate) fn parse_version(value: &str) -> Option<SemVersion> {
    let mut parts = value.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(SemVersion::new(major, minor, patch))
}

/// True if the string is a plain 1 to 3 component numeric version prefix.
pub(crate) fn is_version_prefix(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    (1..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Serialize optional tool paths as plain strings, absent ones as `""`,
/// matching the cache file contract.
mod path_or_empty {
    use std::path::PathBuf;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(path) => serializer.serialize_str(&path.to_string_lossy()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(raw)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(version: &str) -> PhpVersion {
        let full = parse_version(version).unwrap();
        PhpVersion::new(PathBuf::from("/usr"), full, PathBuf::from("/usr/bin/php"))
    }

    #[test]
    fn test_split_vernum() {
        assert_eq!(split_vernum("80102").as_deref(), Some("8.01.02"));
        assert_eq!(split_vernum("70433").as_deref(), Some("7.04.33"));
        assert_eq!(split_vernum("81002").as_deref(), Some("8.10.02"));
    }

    #[test]
    fn test_split_vernum_rejects_non_standard() {
        assert_eq!(split_vernum("8010"), None);
        assert_eq!(split_vernum("801021"), None);
        assert_eq!(split_vernum("8x102"), None);
        assert_eq!(split_vernum(""), None);
    }

    #[test]
    fn test_version_from_vernum_drops_padding() {
        assert_eq!(
            version_from_vernum("80102"),
            Some(SemVersion::new(8, 1, 2))
        );
        assert_eq!(
            version_from_vernum("74033"),
            Some(SemVersion::new(7, 40, 33))
        );
    }

    #[test]
    fn test_vernum_from_parts() {
        assert_eq!(vernum_from_parts("8", "1", "2"), "80102");
        assert_eq!(vernum_from_parts("8", "1", "14"), "80114");
        assert_eq!(vernum_from_parts("7", "4", "33"), "70433");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("8.1.2"), Some(SemVersion::new(8, 1, 2)));
        assert_eq!(parse_version("8.01.02"), Some(SemVersion::new(8, 1, 2)));
        assert_eq!(parse_version("8.1"), None);
        assert_eq!(parse_version("8.1.x"), None);
        assert_eq!(parse_version("8.1.2.3"), None);
    }

    #[test]
    fn test_is_version_prefix() {
        assert!(is_version_prefix("8"));
        assert!(is_version_prefix("8.1"));
        assert!(is_version_prefix("8.1.2"));
        assert!(!is_version_prefix("8.1.2.3"));
        assert!(!is_version_prefix("8.1-fpm"));
        assert!(!is_version_prefix(""));
        assert!(!is_version_prefix("8."));
    }

    #[test]
    fn test_server_kind_precedence() {
        let mut v = record("8.1.2");
        assert_eq!(v.server_kind(), ServerKind::Cli);
        assert_eq!(v.server_path(), Some(Path::new("/usr/bin/php")));

        v.cgi_path = Some(PathBuf::from("/usr/bin/php-cgi"));
        assert_eq!(v.server_kind(), ServerKind::Cgi);

        v.fpm_path = Some(PathBuf::from("/usr/sbin/php-fpm"));
        assert_eq!(v.server_kind(), ServerKind::Fpm);
        assert_eq!(v.server_path(), Some(Path::new("/usr/sbin/php-fpm")));

        v.frankenphp = true;
        assert_eq!(v.server_kind(), ServerKind::FrankenPhp);
        assert_eq!(v.server_path(), None);
    }

    #[test]
    fn test_supports_flavor() {
        let all = [
            ServerKind::FrankenPhp,
            ServerKind::Fpm,
            ServerKind::Cgi,
            ServerKind::Cli,
        ];
        let cases: [(PhpVersion, &[ServerKind]); 4] = [
            (
                {
                    let mut v = record("8.1.0");
                    v.fpm_path = Some(PathBuf::from("/usr/bin/php-fpm8.1"));
                    v
                },
                &[ServerKind::Fpm, ServerKind::Cli],
            ),
            (
                {
                    let mut v = record("8.2.0");
                    v.cgi_path = Some(PathBuf::from("/usr/bin/php-cgi8.2"));
                    v
                },
                &[ServerKind::Cgi, ServerKind::Cli],
            ),
            (record("8.3.0"), &[ServerKind::Cli]),
            (
                {
                    let mut v = record("8.4.0");
                    v.frankenphp = true;
                    v
                },
                &[ServerKind::FrankenPhp],
            ),
        ];
        for (version, expected) in &cases {
            for kind in all {
                assert_eq!(
                    version.supports(kind),
                    expected.contains(&kind),
                    "{} should {}support {}",
                    version.version,
                    if expected.contains(&kind) { "" } else { "not " },
                    kind
                );
            }
        }
    }

    #[test]
    fn test_capability_score() {
        let mut v = record("8.1.2");
        assert_eq!(v.capability_score(), 0);
        v.cgi_path = Some(PathBuf::from("/usr/bin/php-cgi"));
        assert_eq!(v.capability_score(), 1);
        v.fpm_path = Some(PathBuf::from("/usr/sbin/php-fpm"));
        assert_eq!(v.capability_score(), 2);
    }
}
