// Configuration loading and parsing (config/dashboard.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// dashboard.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire dashboard.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DashboardFile {
    data: DataConfig,
    cache: CacheConfig,
    #[serde(default)]
    filters: FiltersConfig,
    #[serde(default)]
    players: PlayersSection,
}

/// Where the match CSV and its optional side files live.
///
/// Exactly one of `csv_url` / `csv_path` must be set. The side-file paths are
/// all optional; a missing file degrades to an empty default at load time.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub csv_url: Option<String>,
    #[serde(default)]
    pub csv_path: Option<String>,
    #[serde(default)]
    pub roles_path: Option<String>,
    #[serde(default)]
    pub players_path: Option<String>,
    #[serde(default)]
    pub awards_tables_path: Option<String>,
}

/// Normalized-row cache settings. When `path` is omitted the cache lands in
/// the platform cache directory (resolved at startup).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
}

/// Initial filter state applied after each dataset load.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FiltersConfig {
    /// Pin the default date range to this year when the dataset covers it.
    #[serde(default)]
    pub default_year: Option<i32>,
    #[serde(default)]
    pub only_listed_players: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PlayersSection {
    /// Alias -> canonical player name. Keys are matched case-insensitively.
    #[serde(default)]
    aliases: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub filters: FiltersConfig,
    /// Lowercased alias -> canonical player name.
    pub player_aliases: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/dashboard.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("dashboard.toml");
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;

    let file: DashboardFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let player_aliases = file
        .players
        .aliases
        .into_iter()
        .map(|(alias, canonical)| (alias.trim().to_lowercase(), canonical))
        .collect();

    let config = Config {
        data: file.data,
        cache: file.cache,
        filters: file.filters,
        player_aliases,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, keep the user's copy
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying default config files first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let has_url = config
        .data
        .csv_url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty());
    let has_path = config
        .data
        .csv_path
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());

    match (has_url, has_path) {
        (false, false) => {
            return Err(ConfigError::ValidationError {
                field: "data.csv_url".into(),
                message: "either data.csv_url or data.csv_path must be set".into(),
            });
        }
        (true, true) => {
            return Err(ConfigError::ValidationError {
                field: "data.csv_url".into(),
                message: "data.csv_url and data.csv_path are mutually exclusive".into(),
            });
        }
        _ => {}
    }

    if let Some(path) = config.cache.path.as_deref() {
        if config.cache.enabled && path.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "cache.path".into(),
                message: "must not be empty when the cache is enabled".into(),
            });
        }
    }

    if let Some(year) = config.filters.default_year {
        if !(2000..=2100).contains(&year) {
            return Err(ConfigError::ValidationError {
                field: "filters.default_year".into(),
                message: format!("must be between 2000 and 2100, got {year}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_TOML: &str = r#"
[data]
csv_path = "data/structured_data.csv"
roles_path = "resources/hero_roles.json"
players_path = "resources/players.txt"
awards_tables_path = "resources/tablas_awards.csv"

[cache]
enabled = true
path = "nexus-stats-cache.db"

[filters]
default_year = 2025
only_listed_players = true

[players.aliases]
swift = "WatchdogMan"
Chapel = "ChapelHots"
"#;

    /// Helper: create a temp project dir containing config/dashboard.toml.
    fn write_config(dir_name: &str, toml_text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(dir_name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("dashboard.toml"), toml_text).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config() {
        let tmp = write_config("nexus_config_valid", VALID_TOML);
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(
            config.data.csv_path.as_deref(),
            Some("data/structured_data.csv")
        );
        assert!(config.data.csv_url.is_none());
        assert_eq!(
            config.data.roles_path.as_deref(),
            Some("resources/hero_roles.json")
        );
        assert!(config.cache.enabled);
        assert_eq!(config.cache.path.as_deref(), Some("nexus-stats-cache.db"));
        assert_eq!(config.filters.default_year, Some(2025));
        assert!(config.filters.only_listed_players);

        // Alias keys are lowercased
        assert_eq!(
            config.player_aliases.get("swift").map(String::as_str),
            Some("WatchdogMan")
        );
        assert_eq!(
            config.player_aliases.get("chapel").map(String::as_str),
            Some("ChapelHots")
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn url_source_is_accepted() {
        let toml_text = r#"
[data]
csv_url = "https://example.com/structured_data.csv"

[cache]
enabled = false
"#;
        let tmp = write_config("nexus_config_url", toml_text);
        let config = load_config_from(&tmp).expect("url source should be valid");
        assert_eq!(
            config.data.csv_url.as_deref(),
            Some("https://example.com/structured_data.csv")
        );
        assert!(!config.cache.enabled);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_missing_source() {
        let toml_text = r#"
[data]

[cache]
enabled = false
"#;
        let tmp = write_config("nexus_config_no_source", toml_text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "data.csv_url");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_both_sources() {
        let toml_text = r#"
[data]
csv_url = "https://example.com/data.csv"
csv_path = "data/data.csv"

[cache]
enabled = false
"#;
        let tmp = write_config("nexus_config_both_sources", toml_text);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_cache_path_when_enabled() {
        let toml_text = r#"
[data]
csv_path = "data/data.csv"

[cache]
enabled = true
path = "  "
"#;
        let tmp = write_config("nexus_config_blank_cache", toml_text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "cache.path"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_implausible_default_year() {
        let toml_text = r#"
[data]
csv_path = "data/data.csv"

[cache]
enabled = false

[filters]
default_year = 1980
"#;
        let tmp = write_config("nexus_config_bad_year", toml_text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "filters.default_year");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_filters_and_players_sections_default() {
        let toml_text = r#"
[data]
csv_path = "data/data.csv"

[cache]
enabled = false
"#;
        let tmp = write_config("nexus_config_minimal", toml_text);
        let config = load_config_from(&tmp).expect("minimal config should load");
        assert!(config.filters.default_year.is_none());
        assert!(!config.filters.only_listed_players);
        assert!(config.player_aliases.is_empty());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("nexus_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("dashboard.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = write_config("nexus_config_invalid", "this is not valid [[[ toml");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("dashboard.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("nexus_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("dashboard.toml"), VALID_TOML).unwrap();
        // .example files are templates, never copied
        fs::write(defaults_dir.join("dashboard.toml.example"), "# template\n").unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/dashboard.toml").exists());
        assert!(!tmp.join("config/dashboard.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("nexus_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();

        fs::write(defaults_dir.join("dashboard.toml"), VALID_TOML).unwrap();
        fs::write(config_dir.join("dashboard.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        let content = fs::read_to_string(config_dir.join("dashboard.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("nexus_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }
}
