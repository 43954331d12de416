//! PHP discovery strategies for Windows, covering the installer layouts the
//! Composer Windows setup knows about.

use std::env;
use std::path::{Component, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use super::{probe_dir, probe_tree};
use crate::store::PhpStore;

lazy_static! {
    static ref CHOCOLATEY_DIR: Regex = Regex::new(r"^php\d+$").unwrap();
    static ref VERSIONED_PHP_DIR: Regex = Regex::new(r"^php[\d\.]+$").unwrap();
    static ref HERD_BIN: Regex = Regex::new(r"^php\d{2}$").unwrap();
}

/// The fixed installer locations on the system drive.
pub(crate) fn discover_default_prefixes(store: &mut PhpStore) {
    let drive = system_drive();

    // XAMPP
    probe_dir(store, &drive.join("xampp").join("php"), None, "XAMPP");

    // Cygwin
    probe_dir(store, &drive.join("cygwin64").join("bin"), None, "Cygwin");
    probe_dir(store, &drive.join("cygwin").join("bin"), None, "Cygwin");
}

/// Package managers and bundled server stacks.
pub(crate) fn discover_package_managers(store: &mut PhpStore) {
    let drive = system_drive();

    // Chocolatey
    probe_tree(store, &drive.join("tools"), None, Some(&*CHOCOLATEY_DIR), "Chocolatey");

    // WAMP
    probe_tree(
        store,
        &drive.join("wamp64").join("bin").join("php"),
        None,
        Some(&*VERSIONED_PHP_DIR),
        "WAMP",
    );
    probe_tree(
        store,
        &drive.join("wamp").join("bin").join("php"),
        None,
        Some(&*VERSIONED_PHP_DIR),
        "WAMP",
    );

    // MAMP
    probe_tree(
        store,
        &drive.join("mamp").join("bin").join("php"),
        None,
        Some(&*VERSIONED_PHP_DIR),
        "MAMP",
    );

    // Herd
    if let Some(dirs) = directories::BaseDirs::new() {
        let herd = dirs.home_dir().join(".config").join("herd").join("bin");
        probe_tree(store, &herd, None, Some(&*HERD_BIN), "Herd");
    }
}

/// The drive the current directory lives on, `C:\` when it cannot be told.
fn system_drive() -> PathBuf {
    if let Ok(cwd) = env::current_dir() {
        if let Some(Component::Prefix(prefix)) = cwd.components().next() {
            let mut drive = prefix.as_os_str().to_os_string();
            drive.push("\\");
            return PathBuf::from(drive);
        }
    }
    PathBuf::from("C:\\")
}
