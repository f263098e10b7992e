//! notion-ics configuration.
//!
//! Layered with the `config` crate: built-in defaults, then
//! `~/.config/notion-ics/config.toml` (or an explicit path), then
//! `NOTION_ICS_*` environment variables (`__` separates nested keys, e.g.
//! `NOTION_ICS_PROPERTIES__DATE`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IcsError, IcsResult};
use crate::ics::SerializeOptions;
use crate::source::PropertyMap;

static DEFAULT_CALENDAR_NAME: &str = "Notion";
static ENV_PREFIX: &str = "NOTION_ICS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calendar name for `pages` output. Bundles passed to `convert` carry
    /// their own.
    pub calendar_name: String,
    pub display_time_zone: String,
    pub uid_namespace: String,
    pub escape_text: bool,
    pub fold_lines: bool,
    /// Where to write the calendar. `~` is expanded. Stdout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub properties: PropertyMap,
}

impl Default for Config {
    fn default() -> Self {
        let options = SerializeOptions::default();
        Config {
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            display_time_zone: options.display_time_zone,
            uid_namespace: options.uid_namespace,
            escape_text: options.escape_text,
            fold_lines: options.fold_lines,
            output: None,
            properties: PropertyMap::default(),
        }
    }
}

impl Config {
    /// ~/.config/notion-ics/config.toml
    pub fn config_path() -> IcsResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IcsError::Config("Could not determine config directory".into()))?
            .join("notion-ics");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration. An explicit `path` must exist; the default
    /// location is optional.
    pub fn load(path: Option<&Path>) -> IcsResult<Self> {
        Self::load_with(path, Self::environment())
    }

    /// `NOTION_ICS_UID_NAMESPACE`, `NOTION_ICS_PROPERTIES__DATE`, ...
    fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(path: Option<&Path>, environment: ::config::Environment) -> IcsResult<Self> {
        let file = match path {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::from(Self::config_path()?).required(false),
        };

        ::config::Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| IcsError::Config(e.to_string()))
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            display_time_zone: self.display_time_zone.clone(),
            uid_namespace: self.uid_namespace.clone(),
            escape_text: self.escape_text,
            fold_lines: self.fold_lines,
        }
    }

    /// Output path with `~` expanded.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }

    /// Write the current values to `path`.
    pub fn save(&self, path: &Path) -> IcsResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| IcsError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| IcsError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a config file with every option commented out.
    pub fn create_default_config(path: &Path) -> IcsResult<()> {
        let defaults = Config::default();
        let contents = format!(
            "\
# notion-ics configuration

# Calendar name for `notion-ics pages`:
# calendar_name = \"{}\"

# Shown by clients as the calendar's zone. Times are always written in UTC.
# display_time_zone = \"{}\"

# UIDs are written as <page id>@<uid_namespace>:
# uid_namespace = \"{}\"

# Escape , ; \\ and newlines in text fields:
# escape_text = true

# Fold lines longer than 75 octets:
# fold_lines = true

# Write here instead of stdout:
# output = \"~/calendars/notion.ics\"

# Page properties, by name or by property ID:
# [properties]
# title = \"{}\"
# date = \"{}\"
# description = \"Description\"
# location = \"Location\"
# url = \"URL\"
",
            defaults.calendar_name,
            defaults.display_time_zone,
            defaults.uid_namespace,
            defaults.properties.title,
            defaults.properties.date,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IcsError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| IcsError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
calendar_name = "Team"
uid_namespace = "example.org"
escape_text = false

[properties]
title = "Task"
date = "Due"
url = "Link"
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();

        assert_eq!(config.calendar_name, "Team");
        assert_eq!(config.uid_namespace, "example.org");
        assert!(!config.escape_text);
        assert!(config.fold_lines);
        assert_eq!(config.display_time_zone, "America/Chicago");
        assert_eq!(config.properties.date, "Due");
        assert_eq!(config.properties.url.as_deref(), Some("Link"));
        assert_eq!(config.properties.location, None);

        let options = config.serialize_options();
        assert!(!options.escape_text);
        assert_eq!(options.uid_namespace, "example.org");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
uid_namespace = "example.org"
fold_lines = true

[properties]
title = "Task"
date = "Date"
"#,
        )
        .unwrap();

        let vars: ::config::Map<String, String> = [
            ("NOTION_ICS_UID_NAMESPACE", "env.example"),
            ("NOTION_ICS_FOLD_LINES", "false"),
            ("NOTION_ICS_PROPERTIES__DATE", "Due"),
            ("OTHER_UID_NAMESPACE", "other.example"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let environment = Config::environment().source(Some(vars));

        let config = Config::load_with(Some(path.as_path()), environment).unwrap();

        assert_eq!(config.uid_namespace, "env.example");
        assert!(!config.fold_lines);
        assert_eq!(config.properties.date, "Due");
        assert_eq!(config.properties.title, "Task");
        assert_eq!(config.calendar_name, "Notion");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("missing.toml").as_path())).unwrap_err();
        assert!(matches!(err, IcsError::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_default_config_file_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        Config::create_default_config(&path).unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            calendar_name: "Team".to_string(),
            output: Some("/tmp/team.ics".to_string()),
            ..Config::default()
        };

        config.save(&path).unwrap();

        assert_eq!(Config::load(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_output_path_expands_tilde() {
        let config = Config {
            output: Some("~/cal.ics".to_string()),
            ..Config::default()
        };
        let path = config.output_path().unwrap();

        assert!(!path.starts_with("~"), "not expanded: {}", path.display());
        assert!(path.ends_with("cal.ics"));
    }
}
