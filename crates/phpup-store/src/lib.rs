//! Discovery and resolution of locally installed PHP runtimes.
//!
//! The store scans the machine for PHP installations across a dozen
//! package-manager layouts, deduplicates and sorts them, caches the result
//! on disk, and resolves "which PHP should run this project" from layered
//! project signals: a forced-version environment variable, `.php-version`
//! pins, the `composer.json` platform config, and cloud platform
//! descriptors.
//!
//! ```no_run
//! use std::path::Path;
//! use phpup_store::PhpStore;
//!
//! let store = PhpStore::new("/home/user/.config/phpup", false);
//! let m = store.best_version_for_dir(Path::new("/srv/app"))?;
//! println!("{} ({})", m.version.php_path.display(), m.source);
//! # Ok::<(), phpup_store::StoreError>(())
//! ```

mod cache;
mod discovery;
mod project;
mod store;
mod version;

pub use store::{Match, PhpStore, StoreError};
pub use version::{PhpVersion, ServerKind};
