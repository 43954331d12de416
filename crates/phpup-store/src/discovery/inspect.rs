//! Determines the concrete version and tool paths of a candidate
//! installation, preferring the `php-config` script over executing the
//! binary (slower, but always works).

use std::fs;
use std::path::Path;
use std::process::Command;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::version::{self, PhpVersion};

lazy_static! {
    static ref VERSION_BANNER: Regex = Regex::new(r"PHP (\d+)\.(\d+)\.(\d+)").unwrap();
}

/// Inspect the installation rooted at `dir` for a binary called `bin_name`.
pub(crate) fn inspect(dir: &Path, bin_name: &str) -> Option<PhpVersion> {
    if cfg!(windows) {
        // php-config does not exist on Windows
        return inspect_via_binary(dir, bin_name);
    }

    let php_config = dir.join("bin").join(bin_name.replacen("php", "php-config", 1));
    let metadata = match fs::symlink_metadata(&php_config) {
        Ok(metadata) => metadata,
        Err(_) => return inspect_via_binary(dir, bin_name),
    };

    // when managed through alternatives, php-config does not point to the
    // right PHP version, so it cannot be used
    if metadata.file_type().is_symlink() {
        if let Ok(target) = fs::read_link(&php_config) {
            if target.to_string_lossy().contains("/alternatives/") {
                return inspect_via_binary(dir, bin_name);
            }
        }
    }

    inspect_via_php_config(dir, bin_name)
}

/// Run the candidate binary and parse its version banner.
pub(crate) fn inspect_via_binary(dir: &Path, bin_name: &str) -> Option<PhpVersion> {
    let (bin_name, php) = if cfg!(windows) {
        let name = format!("{}.exe", bin_name);
        let path = dir.join(&name);
        (name, path)
    } else {
        (bin_name.to_string(), dir.join("bin").join(bin_name))
    };

    if !php.exists() {
        return None;
    }

    let output = match Command::new(&php).arg("--version").output() {
        Ok(output) => output,
        Err(err) => {
            debug!("  Unable to run \"{} --version\": {}", php.display(), err);
            return None;
        }
    };
    if !output.status.success() {
        debug!("  Unable to run \"{} --version\": {}", php.display(), output.status);
        return None;
    }
    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    let combined = String::from_utf8_lossy(&combined);

    let captures = match VERSION_BANNER.captures(&combined) {
        Some(captures) => captures,
        None => {
            debug!("  {} is not a PHP binary", php.display());
            return None;
        }
    };

    let php = match fs::canonicalize(&php) {
        Ok(php) => php,
        Err(_) => {
            debug!("  {} is not a valid symlink", php.display());
            return None;
        }
    };

    // funnel the banner through the vernum encoding so non-standard
    // versions are rejected the same way as in php-config parsing
    let vernum = version::vernum_from_parts(&captures[1], &captures[2], &captures[3]);
    let full = match version::version_from_vernum(&vernum) {
        Some(full) => full,
        None => {
            debug!(
                "  Unable to parse version {} for PHP at {}: version is non-standard",
                vernum,
                dir.display()
            );
            return None;
        }
    };

    let mut record = PhpVersion::new(dir.to_path_buf(), full, php);
    if cfg!(windows) {
        record.set_server(
            &dir.join(bin_name.replacen("php", "php-fpm", 1)),
            &dir.join(bin_name.replacen("php", "php-cgi", 1)),
            &dir.join(bin_name.replacen("php", "php-config", 1)),
            &dir.join(bin_name.replacen("php", "phpize", 1)),
            &dir.join(bin_name.replacen("php", "phpdbg", 1)),
        );
    } else {
        let mut fpm = dir.join("sbin").join(bin_name.replacen("php", "php-fpm", 1));
        if !fpm.exists() {
            fpm = dir.join("bin").join(bin_name.replacen("php", "php-fpm", 1));
        }
        record.set_server(
            &fpm,
            &dir.join("bin").join(bin_name.replacen("php", "php-cgi", 1)),
            &dir.join("bin").join(bin_name.replacen("php", "php-config", 1)),
            &dir.join("bin").join(bin_name.replacen("php", "phpize", 1)),
            &dir.join("bin").join(bin_name.replacen("php", "phpdbg", 1)),
        );
    }
    Some(record)
}

/// Parse the line-oriented `php-config` script next to the binary. All five
/// keys must be present and the vernum must parse, else the candidate is
/// rejected.
pub(crate) fn inspect_via_php_config(dir: &Path, bin_name: &str) -> Option<PhpVersion> {
    let php_config = dir.join("bin").join(bin_name.replacen("php", "php-config", 1));
    let contents = match fs::read_to_string(&php_config) {
        Ok(contents) => contents,
        Err(err) => {
            debug!("  Unable to open {}: {}", php_config.display(), err);
            return None;
        }
    };

    let mut full = None;
    let mut program_prefix = String::new();
    let mut program_suffix = String::new();
    let mut exe_extension = String::new();
    let mut php_cgi_binary = String::new();
    let mut all_found = 0;

    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("vernum=") {
            let vernum = value.trim_matches('"');
            full = version::version_from_vernum(vernum);
            if full.is_none() {
                debug!(
                    "  Unable to parse version {} for PHP at {}: version is non-standard",
                    vernum,
                    dir.display()
                );
                return None;
            }
            all_found += 1;
        } else if let Some(value) = line.strip_prefix("program_prefix=") {
            program_prefix = value.trim_matches('"').to_string();
            all_found += 1;
        } else if let Some(value) = line.strip_prefix("program_suffix=") {
            program_suffix = value.trim_matches('"').to_string();
            all_found += 1;
        } else if let Some(value) = line.strip_prefix("    php_cgi_binary=") {
            php_cgi_binary = value.trim_matches('"').to_string();
            all_found += 1;
        } else if let Some(value) = line.strip_prefix("exe_extension=") {
            exe_extension = value.trim_matches('"').to_string();
            all_found += 1;
        }
    }

    let full = match full {
        Some(full) => full,
        None => {
            debug!("  Unable to find version in {}", php_config.display());
            return None;
        }
    };
    if all_found != 5 {
        debug!("  Unable to parse all information from {}", php_config.display());
        return None;
    }

    if php_cgi_binary.is_empty() {
        php_cgi_binary = format!("{}php{}-cgi{}", program_prefix, program_suffix, exe_extension);
    } else {
        php_cgi_binary = php_cgi_binary
            .replacen("${program_prefix}", &program_prefix, 1)
            .replacen("${program_suffix}", &program_suffix, 1)
            .replacen("${exe_extension}", &exe_extension, 1)
            .replacen("${exec_prefix}/", "", 1)
            .replacen("bin/", "", 1);
    }

    let php_path = dir
        .join("bin")
        .join(format!("{}php{}{}", program_prefix, program_suffix, exe_extension));
    let mut record = PhpVersion::new(dir.to_path_buf(), full, php_path);
    record.set_server(
        &dir.join("sbin")
            .join(format!("{}php-fpm{}{}", program_prefix, program_suffix, exe_extension)),
        &dir.join("bin").join(&php_cgi_binary),
        &dir.join("bin")
            .join(format!("{}php-config{}{}", program_prefix, program_suffix, exe_extension)),
        &dir.join("bin")
            .join(format!("{}phpize{}{}", program_prefix, program_suffix, exe_extension)),
        &dir.join("bin")
            .join(format!("{}phpdbg{}{}", program_prefix, program_suffix, exe_extension)),
    );
    Some(record)
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn write_executable(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }

    fn write_php_script(bin_dir: &Path, name: &str, banner: &str) {
        fs::create_dir_all(bin_dir).unwrap();
        write_executable(
            &bin_dir.join(name),
            &format!("#!/bin/sh\necho \"{}\"\n", banner),
        );
    }

    const PHP_CONFIG_80027: &str = concat!(
        "#!/bin/sh\n",
        "vernum=\"80027\"\n",
        "program_prefix=\"\"\n",
        "program_suffix=\"\"\n",
        "exe_extension=\"\"\n",
        "    php_cgi_binary=\"${exec_prefix}/bin/php-cgi\"\n",
    );

    #[test]
    fn test_inspect_via_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        write_php_script(&bin, "php", "PHP 8.2.1 (cli) (built: Jan  1 2024 00:00:00)");
        fs::write(bin.join("php-cgi"), "").unwrap();

        let record = inspect_via_binary(dir.path(), "php").unwrap();
        assert_eq!(record.version, "8.2.1");
        assert_eq!(record.path, dir.path());
        assert_eq!(record.php_path, fs::canonicalize(bin.join("php")).unwrap());
        assert!(record.cgi_path.is_some());
        assert!(record.fpm_path.is_none());
    }

    #[test]
    fn test_inspect_via_binary_prefers_sbin_fpm() {
        let dir = tempfile::tempdir().unwrap();
        write_php_script(&dir.path().join("bin"), "php", "PHP 8.1.2 (cli)");
        let sbin = dir.path().join("sbin");
        fs::create_dir_all(&sbin).unwrap();
        fs::write(sbin.join("php-fpm"), "").unwrap();

        let record = inspect_via_binary(dir.path(), "php").unwrap();
        assert_eq!(
            record.fpm_path,
            Some(fs::canonicalize(sbin.join("php-fpm")).unwrap())
        );
    }

    #[test]
    fn test_inspect_via_binary_rejects_non_php() {
        let dir = tempfile::tempdir().unwrap();
        write_php_script(&dir.path().join("bin"), "php", "Python 3.12.1");
        assert!(inspect_via_binary(dir.path(), "php").is_none());
    }

    #[test]
    fn test_inspect_via_binary_rejects_failing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_executable(&bin.join("php"), "#!/bin/sh\nexit 1\n");
        assert!(inspect_via_binary(dir.path(), "php").is_none());
    }

    #[test]
    fn test_inspect_via_binary_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect_via_binary(dir.path(), "php").is_none());
    }

    #[test]
    fn test_inspect_via_php_config() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_executable(&bin.join("php-config"), PHP_CONFIG_80027);
        fs::write(bin.join("php-cgi"), "").unwrap();

        let record = inspect_via_php_config(dir.path(), "php").unwrap();
        assert_eq!(record.version, "8.0.27");
        assert_eq!(record.php_path, bin.join("php"));
        // the ${exec_prefix}/bin/ placeholder chain collapses to a bin/ name
        assert_eq!(
            record.cgi_path,
            Some(fs::canonicalize(bin.join("php-cgi")).unwrap())
        );
        assert!(record.php_config_path.is_some());
    }

    #[test]
    fn test_inspect_via_php_config_requires_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_executable(
            &bin.join("php-config"),
            "#!/bin/sh\nvernum=\"80027\"\nprogram_prefix=\"\"\n",
        );
        assert!(inspect_via_php_config(dir.path(), "php").is_none());
    }

    #[test]
    fn test_inspect_via_php_config_rejects_non_standard_vernum() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_executable(
            &bin.join("php-config"),
            "#!/bin/sh\nvernum=\"801\"\nprogram_prefix=\"\"\nprogram_suffix=\"\"\nexe_extension=\"\"\n    php_cgi_binary=\"\"\n",
        );
        assert!(inspect_via_php_config(dir.path(), "php").is_none());
    }

    #[test]
    fn test_inspect_prefers_php_config() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        write_php_script(&bin, "php", "PHP 8.2.1 (cli)");
        write_executable(&bin.join("php-config"), PHP_CONFIG_80027);

        let record = inspect(dir.path(), "php").unwrap();
        assert_eq!(record.version, "8.0.27");
    }

    #[test]
    fn test_inspect_falls_back_to_binary() {
        let dir = tempfile::tempdir().unwrap();
        write_php_script(&dir.path().join("bin"), "php", "PHP 8.2.1 (cli)");

        let record = inspect(dir.path(), "php").unwrap();
        assert_eq!(record.version, "8.2.1");
    }

    #[test]
    fn test_inspect_skips_alternatives_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        write_php_script(&bin, "php", "PHP 8.1.2 (cli)");
        let alternatives = dir.path().join("alternatives");
        fs::create_dir_all(&alternatives).unwrap();
        write_executable(&alternatives.join("php-config"), PHP_CONFIG_80027);
        std::os::unix::fs::symlink(alternatives.join("php-config"), bin.join("php-config"))
            .unwrap();

        // the banner wins over the alternatives-managed php-config
        let record = inspect(dir.path(), "php").unwrap();
        assert_eq!(record.version, "8.1.2");
    }
}
