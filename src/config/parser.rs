use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Settings written when no configuration file exists yet
pub const DEFAULT_CONFIG: &str = r#"# profesia-crawler settings

[site]
base-url = "https://www.profesia.sk/"
expected-title = "PROFESIA.SK | Práca, zamestnanie, ponuka práce, brigády, voľné pracovné miesta"
results-heading-prefix = "PONUKY PRÁCE"
freshness-marker = "Aktualizované"

[timing]
page-load-timeout-secs = 15
settle-delay-ms = 500
continuous-delay-secs = 6

# Deduplicating store, used with -r
[store]
database-path = "./listings.db"

# Append-only CSV files, used without -r
[table]
output-dir = "."
"#;

/// Reads the settings file at `path`
///
/// Missing sections and keys fall back to their defaults; the result is
/// validated before it is returned.
///
/// # Returns
///
/// * `Ok(Config)` - Validated settings
/// * `Err(ConfigError)` - The file is unreadable, not TOML, or fails validation
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is logged at startup so runs can be tied to the settings they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Loads a configuration together with the hash of the file it came from
///
/// The file is read once so the hash always matches the parsed settings.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hex::encode(Sha256::digest(content.as_bytes()))))
}

/// Writes [`DEFAULT_CONFIG`] to `path` unless a file already exists there
///
/// Returns `true` when a new file was created.
pub fn write_default_config(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}

/// Where the settings for a run came from
#[derive(Debug)]
pub enum ConfigSource {
    /// Read from the settings file, with the hash of its content
    Loaded { config: Config, hash: String },

    /// No settings file; the built-in defaults apply
    Defaults(Config),

    /// No settings file and the run needs one; a default file was written
    CreatedDefault,
}

/// Loads the settings file, falling back when it does not exist
///
/// A missing file is only an obstacle when `file_required` is set (the
/// deduplicating store needs its location reviewed before first use). In
/// that case a default file is written and the caller should stop. Otherwise
/// the built-in defaults are used and nothing is written.
pub fn load_or_default_config(
    path: &Path,
    file_required: bool,
) -> Result<ConfigSource, ConfigError> {
    if path.exists() {
        let (config, hash) = load_config_with_hash(path)?;
        return Ok(ConfigSource::Loaded { config, hash });
    }

    if file_required {
        write_default_config(path)?;
        Ok(ConfigSource::CreatedDefault)
    } else {
        Ok(ConfigSource::Defaults(Config::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let file = settings_file(
            r#"
[site]
base-url = "https://jobs.example.com/"
freshness-marker = "Updated"

[selectors]
next-page = "a.pager-next"

[timing]
page-load-timeout-secs = 30
settle-delay-ms = 200

[store]
database-path = "/var/lib/crawler/jobs.db"
"#,
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.base_url, "https://jobs.example.com/");
        assert_eq!(config.site.freshness_marker, "Updated");
        assert_eq!(config.selectors.next_page, "a.pager-next");
        assert_eq!(config.selectors.listing_row, "main.col-sm-6 li.list-row");
        assert_eq!(config.timing.page_load_timeout_secs, 30);
        assert_eq!(config.timing.continuous_delay_secs, 6);
        assert_eq!(config.store.database_path, "/var/lib/crawler/jobs.db");
        assert_eq!(config.table.output_dir, ".");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.site.freshness_marker, "Aktualizované");
        assert_eq!(config.site.results_heading_prefix, "PONUKY PRÁCE");
        assert_eq!(config.timing.page_load_timeout_secs, 15);
    }

    #[test]
    fn test_default_config_file_is_valid() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.site.base_url, "https://www.profesia.sk/");
        assert_eq!(config.store.database_path, "./listings.db");
    }

    #[test]
    fn test_load_errors_by_kind() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/settings.toml")),
            Err(ConfigError::Io(_))
        ));

        let garbage = settings_file("[site\nbase-url = ");
        assert!(matches!(
            load_config(garbage.path()),
            Err(ConfigError::Parse(_))
        ));

        let slow = settings_file("[timing]\nsettle-delay-ms = 5000\n");
        assert!(matches!(
            load_config(slow.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_write_default_config_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        assert!(write_default_config(&path).unwrap());
        std::fs::write(&path, "[site]\n").unwrap();
        assert!(!write_default_config(&path).unwrap());

        // The operator's edits survive a second call
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[site]\n");
    }

    #[test]
    fn test_missing_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let source = load_or_default_config(&path, false).unwrap();
        match source {
            ConfigSource::Defaults(config) => {
                assert_eq!(config.site.base_url, "https://www.profesia.sk/")
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_settings_written_when_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let source = load_or_default_config(&path, true).unwrap();
        assert!(matches!(source, ConfigSource::CreatedDefault));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        // The next run reads the file it left behind
        let source = load_or_default_config(&path, true).unwrap();
        assert!(matches!(source, ConfigSource::Loaded { .. }));
    }

    #[test]
    fn test_existing_settings_loaded_regardless_of_requirement() {
        let file = settings_file("[table]\noutput-dir = \"out\"\n");

        match load_or_default_config(file.path(), false).unwrap() {
            ConfigSource::Loaded { config, hash } => {
                assert_eq!(config.table.output_dir, "out");
                assert_eq!(hash, compute_config_hash(file.path()).unwrap());
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_hash_tracks_file_content() {
        let defaults = settings_file(DEFAULT_CONFIG);
        let edited = settings_file(
            &DEFAULT_CONFIG.replace("settle-delay-ms = 500", "settle-delay-ms = 250"),
        );

        let (_, hash) = load_config_with_hash(defaults.path()).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(defaults.path()).unwrap());

        let (config, edited_hash) = load_config_with_hash(edited.path()).unwrap();
        assert_eq!(config.timing.settle_delay_ms, 250);
        assert_ne!(hash, edited_hash);
    }
}
