//! Settings loader for omni-mdr.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/mdr.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/mdr.yaml` (or `--conf <file>`)
//! - Environment:     `MDR_CACHE_TTL_SECONDS`, `MDR_SEARCH_LIMIT`
//!
//! Later layers win; unset keys keep the built-in defaults.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogOptions;
use crate::links::ExtractOptions;
use crate::search::SearchOptions;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/mdr.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/mdr.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_LAYOUT_ITERATIONS: usize = 100;
const POSITIONS_FILE_RELATIVE_PATH: &str = "omni-mdr/positions.json";

/// Env var overriding the index cache TTL in seconds.
pub const ENV_CACHE_TTL_SECONDS: &str = "MDR_CACHE_TTL_SECONDS";
/// Env var overriding the default search result limit.
pub const ENV_SEARCH_LIMIT: &str = "MDR_SEARCH_LIMIT";

static CONFIG_FILE_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Resolved settings with every default filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MdrSettings {
    /// What counts as a note.
    pub catalog: CatalogOptions,
    /// How long a built index stays fresh without an explicit invalidation.
    pub cache_ttl: Duration,
    /// Fuzzy search tuning.
    pub search: SearchOptions,
    /// Link extraction behavior.
    pub links: ExtractOptions,
    /// Whiteboard layout defaults.
    pub layout: LayoutSettings,
}

/// Layout defaults for the whiteboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutSettings {
    /// Simulation steps run after seeding when edges exist.
    pub iterations: usize,
    /// JSON file holding saved positions for every folder.
    pub positions_file: PathBuf,
}

impl Default for MdrSettings {
    fn default() -> Self {
        Self {
            catalog: CatalogOptions::default(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            search: SearchOptions::default(),
            links: ExtractOptions::default(),
            layout: LayoutSettings::default(),
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let positions_file = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".mdr"))
            .join(POSITIONS_FILE_RELATIVE_PATH);
        Self {
            iterations: DEFAULT_LAYOUT_ITERATIONS,
            positions_file,
        }
    }
}

/// One YAML layer; every key optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    pub catalog: RawCatalogSettings,
    #[serde(default)]
    pub cache: RawCacheSettings,
    #[serde(default)]
    pub search: RawSearchSettings,
    #[serde(default)]
    pub links: RawLinkSettings,
    #[serde(default)]
    pub layout: RawLayoutSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawCatalogSettings {
    pub extensions: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
    pub max_file_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawCacheSettings {
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSearchSettings {
    pub threshold: Option<f64>,
    pub name_weight: Option<f64>,
    pub content_weight: Option<f64>,
    pub min_match_chars: Option<usize>,
    pub default_limit: Option<usize>,
    pub max_line_matches: Option<usize>,
    pub read_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawLinkSettings {
    pub skip_code_fences: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawLayoutSettings {
    pub iterations: Option<usize>,
    pub positions_file: Option<PathBuf>,
}

impl RawSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            catalog: self.catalog.merge(overlay.catalog),
            cache: RawCacheSettings {
                ttl_seconds: overlay.cache.ttl_seconds.or(self.cache.ttl_seconds),
            },
            search: self.search.merge(overlay.search),
            links: RawLinkSettings {
                skip_code_fences: overlay
                    .links
                    .skip_code_fences
                    .or(self.links.skip_code_fences),
            },
            layout: RawLayoutSettings {
                iterations: overlay.layout.iterations.or(self.layout.iterations),
                positions_file: overlay.layout.positions_file.or(self.layout.positions_file),
            },
        }
    }

    /// Fill unset keys with defaults.
    #[must_use]
    fn resolve(self) -> MdrSettings {
        let defaults = MdrSettings::default();
        MdrSettings {
            catalog: CatalogOptions {
                extensions: self
                    .catalog
                    .extensions
                    .filter(|list| !list.is_empty())
                    .unwrap_or(defaults.catalog.extensions),
                exclude_dirs: self
                    .catalog
                    .exclude_dirs
                    .unwrap_or(defaults.catalog.exclude_dirs),
                max_file_bytes: self
                    .catalog
                    .max_file_bytes
                    .unwrap_or(defaults.catalog.max_file_bytes),
                single_file: None,
            },
            cache_ttl: self
                .cache
                .ttl_seconds
                .map_or(defaults.cache_ttl, Duration::from_secs),
            search: SearchOptions {
                threshold: self
                    .search
                    .threshold
                    .map_or(defaults.search.threshold, |value| value.clamp(0.0, 1.0)),
                name_weight: self.search.name_weight.unwrap_or(defaults.search.name_weight),
                content_weight: self
                    .search
                    .content_weight
                    .unwrap_or(defaults.search.content_weight),
                min_match_chars: self
                    .search
                    .min_match_chars
                    .unwrap_or(defaults.search.min_match_chars),
                default_limit: self
                    .search
                    .default_limit
                    .unwrap_or(defaults.search.default_limit),
                max_line_matches: self
                    .search
                    .max_line_matches
                    .unwrap_or(defaults.search.max_line_matches),
                read_concurrency: self
                    .search
                    .read_concurrency
                    .filter(|value| *value > 0)
                    .unwrap_or(defaults.search.read_concurrency),
            },
            links: ExtractOptions {
                skip_code_fences: self
                    .links
                    .skip_code_fences
                    .unwrap_or(defaults.links.skip_code_fences),
            },
            layout: LayoutSettings {
                iterations: self.layout.iterations.unwrap_or(defaults.layout.iterations),
                positions_file: self
                    .layout
                    .positions_file
                    .unwrap_or(defaults.layout.positions_file),
            },
        }
    }
}

impl RawCatalogSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            extensions: overlay.extensions.or(self.extensions),
            exclude_dirs: overlay.exclude_dirs.or(self.exclude_dirs),
            max_file_bytes: overlay.max_file_bytes.or(self.max_file_bytes),
        }
    }
}

impl RawSearchSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            threshold: overlay.threshold.or(self.threshold),
            name_weight: overlay.name_weight.or(self.name_weight),
            content_weight: overlay.content_weight.or(self.content_weight),
            min_match_chars: overlay.min_match_chars.or(self.min_match_chars),
            default_limit: overlay.default_limit.or(self.default_limit),
            max_line_matches: overlay.max_line_matches.or(self.max_line_matches),
            read_concurrency: overlay.read_concurrency.or(self.read_concurrency),
        }
    }
}

/// Load merged settings (env over user over system over defaults).
#[must_use]
pub fn load_settings() -> MdrSettings {
    let (system_path, user_path) = settings_paths();
    let mut settings = load_settings_from_paths(&system_path, &user_path);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

#[doc(hidden)]
#[must_use]
pub fn settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = CONFIG_FILE_OVERRIDE.get().map_or_else(
        || resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH),
        |path| absolutize(&root, path.clone()),
    );
    (system_path, user_path)
}

#[doc(hidden)]
#[must_use]
pub fn load_settings_from_paths(system: &Path, user: &Path) -> MdrSettings {
    load_one(system).merge(load_one(user)).resolve()
}

/// Apply `MDR_*` overrides read through `lookup`.
pub fn apply_env_overrides(settings: &mut MdrSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(secs) = parse_env::<u64>(&lookup, ENV_CACHE_TTL_SECONDS) {
        settings.cache_ttl = Duration::from_secs(secs);
    }
    if let Some(limit) = parse_env::<usize>(&lookup, ENV_SEARCH_LIMIT) {
        settings.search.default_limit = limit;
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %trimmed, "invalid env override; ignoring");
            None
        }
    }
}

fn load_one(path: &Path) -> RawSettings {
    if !path.exists() {
        return RawSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RawSettings::default();
        }
    };
    match serde_yaml::from_str::<RawSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RawSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Set the user settings file override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_file_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_FILE_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_FILE_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config file override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn user_layer_overrides_system_layer() -> TestResult {
        let dir = tempfile::tempdir()?;
        let system = dir.path().join("system.yaml");
        let user = dir.path().join("user.yaml");
        std::fs::write(
            &system,
            "cache:\n  ttl_seconds: 60\nsearch:\n  threshold: 0.4\n  default_limit: 20\n",
        )?;
        std::fs::write(&user, "search:\n  default_limit: 7\n")?;

        let settings = load_settings_from_paths(&system, &user);
        assert_eq!(settings.cache_ttl, Duration::from_secs(60));
        assert!((settings.search.threshold - 0.4).abs() < f64::EPSILON);
        assert_eq!(settings.search.default_limit, 7);
        assert_eq!(settings.catalog.extensions, vec!["md".to_string()]);
        Ok(())
    }

    #[test]
    fn broken_yaml_falls_back_to_defaults() -> TestResult {
        let dir = tempfile::tempdir()?;
        let system = dir.path().join("system.yaml");
        std::fs::write(&system, "search: [not, a, map")?;
        let settings = load_settings_from_paths(&system, &dir.path().join("missing.yaml"));
        assert_eq!(settings, MdrSettings::default());
        Ok(())
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let mut settings = MdrSettings::default();
        apply_env_overrides(&mut settings, |key| match key {
            ENV_CACHE_TTL_SECONDS => Some("5".to_string()),
            ENV_SEARCH_LIMIT => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(settings.cache_ttl, Duration::from_secs(5));
        assert_eq!(settings.search.default_limit, 50);
    }
}
