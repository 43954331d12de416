//! PHP discovery strategies for Unix-like systems: default prefixes,
//! user-level version managers and OS-specific installers.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::{command_stdout, probe_dir, probe_tree};
use crate::store::PhpStore;

lazy_static! {
    static ref PHPENV_VERSION_DIR: Regex =
        Regex::new(r"^[\d\.]+(?:RC|BETA|snapshot)?$").unwrap();
    static ref HOMEBREW_KEG_VERSIONED: Regex =
        Regex::new(r"^php@(?:[\d\.]+)/(?:[\d\._]+)$").unwrap();
    static ref HOMEBREW_KEG: Regex = Regex::new(r"^php/(?:[\d\._]+)$").unwrap();
}

#[cfg(target_os = "macos")]
lazy_static! {
    static ref LIIP_DIR: Regex =
        Regex::new(r"^php5\-[\d\.]+(?:RC|BETA)?\d*\-\d+\-\d+$").unwrap();
    static ref MAMP_DIR: Regex = Regex::new(r"^php[\d\.]+(?:RC|BETA)?$").unwrap();
    static ref MACPORTS_BIN: Regex = Regex::new(r"^php(?:[\d\.]+)$").unwrap();
}

#[cfg(target_os = "linux")]
lazy_static! {
    static ref VERSIONED_PHP_BIN: Regex = Regex::new(r"^php(?:[\d\.]+)$").unwrap();
    static ref REMI_DIR: Regex = Regex::new(r"^php(?:\d+)/root/usr$").unwrap();
}

/// The common install prefixes every Unix system may carry.
pub(crate) fn discover_default_prefixes(store: &mut PhpStore) {
    probe_dir(store, Path::new("/usr"), None, "*nix");
    probe_dir(store, Path::new("/usr/local"), None, "*nix");
}

/// Version managers and OS-specific installers.
pub(crate) fn discover_package_managers(store: &mut PhpStore) {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    if let Some(home) = &home {
        // phpbrew
        probe_tree(store, &home.join(".phpbrew").join("php"), None, None, "phpbrew");

        // phpenv
        probe_tree(
            store,
            &home.join(".phpenv").join("versions"),
            None,
            Some(&*PHPENV_VERSION_DIR),
            "phpenv",
        );
    }

    // XAMPP
    probe_dir(store, Path::new("/opt/lampp"), None, "XAMPP");

    // homebrew
    if let Some(cellar) = command_stdout("brew", &["--cellar"]) {
        // keg example: php@5.6/5.6.33_9
        probe_tree(store, Path::new(&cellar), None, Some(&*HOMEBREW_KEG_VERSIONED), "homebrew");
        // keg example: php/7.2.11
        probe_tree(store, Path::new(&cellar), None, Some(&*HOMEBREW_KEG), "homebrew");
    }

    #[cfg(target_os = "macos")]
    {
        // Liip PHP (e.g. php5-7.2.0RC1-20170907-205032/bin/php)
        probe_tree(store, Path::new("/usr/local"), None, Some(&*LIIP_DIR), "Liip PHP");

        // MAMP
        probe_tree(
            store,
            Path::new("/Applications/MAMP/bin/php"),
            None,
            Some(&*MAMP_DIR),
            "MAMP",
        );

        // MacPorts (/opt/local/bin/php71, /opt/local/sbin/php-fpm71)
        probe_tree(store, Path::new("/opt/local"), Some(&*MACPORTS_BIN), None, "MacPorts");
    }

    #[cfg(target_os = "linux")]
    {
        // Ondrej PPA (bin/php7.2)
        probe_tree(store, Path::new("/usr"), Some(&*VERSIONED_PHP_BIN), None, "Ondrej PPA");

        // Remi's RPM repository
        probe_tree(store, Path::new("/opt/remi"), None, Some(&*REMI_DIR), "Remi's RPM");
    }

    // asdf-vm reports the installed version dir, its parent holds them all
    if let Some(install) = command_stdout("asdf", &["where", "php"]) {
        if let Some(parent) = Path::new(&install).parent() {
            probe_tree(store, parent, None, None, "asdf-vm");
        }
    }
}
