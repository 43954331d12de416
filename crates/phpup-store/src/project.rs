//! Extraction of version requirements from project files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Deserialize)]
struct ComposerJson {
    #[serde(default)]
    config: ComposerConfig,
}

#[derive(Deserialize, Default)]
struct ComposerConfig {
    #[serde(default)]
    platform: ComposerPlatform,
}

#[derive(Deserialize, Default)]
struct ComposerPlatform {
    #[serde(default)]
    php: String,
}

#[derive(Deserialize)]
struct CloudApp {
    #[serde(rename = "type", default)]
    app_type: String,
}

/// Walk up from `dir` until a directory contains `filename`; return the
/// trimmed file contents and the directory it was found in.
pub(crate) fn version_file_for_dir(dir: &Path, filename: &str) -> Option<(String, PathBuf)> {
    let mut dir = dir.to_path_buf();
    loop {
        if let Ok(contents) = fs::read_to_string(dir.join(filename)) {
            return Some((contents.trim().to_string(), dir));
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// The `config.platform.php` field of a `composer.json`, if any.
pub(crate) fn platform_php_requirement(contents: &str) -> Option<String> {
    let composer: ComposerJson = serde_json::from_str(contents).ok()?;
    if composer.config.platform.php.is_empty() {
        None
    } else {
        Some(composer.config.platform.php)
    }
}

/// The version from a cloud descriptor's `type: php:<version>` field, if any.
pub(crate) fn cloud_php_requirement(contents: &str) -> Option<String> {
    let app: CloudApp = serde_yaml::from_str(contents).ok()?;
    app.app_type
        .strip_prefix("php:")
        .map(|version| version.to_string())
}
