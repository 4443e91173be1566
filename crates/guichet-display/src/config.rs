use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use directories::ProjectDirs;
use serde::{Deserialize, de::Deserializer};
use tracing::{error, warn};

use crate::action::Action;

/// Tenant used when nothing was ever provided. Matches the backend's
/// public demo organization.
pub const DEFAULT_TENANT: &str = "demo";

pub fn project_name() -> &'static String {
    static PROJECT_NAME: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    PROJECT_NAME.get_or_init(|| env!("CARGO_CRATE_NAME").to_uppercase().to_string())
}

fn data_folder() -> &'static Option<PathBuf> {
    static DATA_FOLDER: std::sync::OnceLock<Option<PathBuf>> = std::sync::OnceLock::new();
    DATA_FOLDER.get_or_init(|| {
        std::env::var(format!("{}_DATA", project_name()))
            .ok()
            .map(PathBuf::from)
    })
}

fn config_folder() -> &'static Option<PathBuf> {
    static CONFIG_FOLDER: std::sync::OnceLock<Option<PathBuf>> = std::sync::OnceLock::new();
    CONFIG_FOLDER.get_or_init(|| {
        std::env::var(format!("{}_CONFIG", project_name()))
            .ok()
            .map(PathBuf::from)
    })
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
    /// Fallback tenant slug when neither the flag nor a persisted slug
    /// exists.
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub keybindings: KeyBindings,
}

impl Config {
    pub fn new() -> color_eyre::Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_str().unwrap())?
            .set_default("config_dir", config_dir.to_str().unwrap())?;

        // Try to load config files
        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.json", config::FileFormat::Json),
            ("config.yaml", config::FileFormat::Yaml),
            ("config.toml", config::FileFormat::Toml),
            ("config.ini", config::FileFormat::Ini),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            error!("No configuration file found. Using default settings.");
        }

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        if cfg.keybindings.0.is_empty() {
            cfg.keybindings = KeyBindings::defaults().map_err(config::ConfigError::Message)?;
        }

        Ok(cfg)
    }
}

/// Resolves the tenant slug the way the public web display does: explicit
/// value first (persisted for the next launch), then the persisted
/// fallback, then the configured default. No authentication is involved.
pub fn resolve_tenant(flag: Option<&str>, config: &Config, data_dir: &Path) -> String {
    let persisted = data_dir.join("tenant");
    if let Some(slug) = flag {
        if let Err(err) = std::fs::create_dir_all(data_dir)
            .and_then(|()| std::fs::write(&persisted, slug))
        {
            warn!("could not persist tenant slug: {err}");
        }
        return slug.to_string();
    }
    if let Ok(contents) = std::fs::read_to_string(&persisted) {
        let slug = contents.trim();
        if !slug.is_empty() {
            return slug.to_string();
        }
    }
    config
        .config
        .tenant
        .clone()
        .unwrap_or_else(|| DEFAULT_TENANT.to_string())
}

pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = data_folder().clone() {
        dir
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = config_folder().clone() {
        dir
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "guichet", env!("CARGO_PKG_NAME"))
}

/// The display has a single mode, so bindings are one flat map from key
/// sequence to action.
#[derive(Clone, Debug, Default)]
pub struct KeyBindings(pub HashMap<Vec<KeyEvent>, Action>);

impl KeyBindings {
    pub fn get(&self, sequence: &[KeyEvent]) -> Option<&Action> {
        self.0.get(sequence)
    }

    fn defaults() -> Result<Self, String> {
        let bindings = [
            ("q", Action::Quit),
            ("<ctrl-c>", Action::Quit),
            ("<ctrl-z>", Action::Suspend),
            ("r", Action::Refresh),
            ("m", Action::ToggleMute),
            ("?", Action::Help),
        ]
        .into_iter()
        .map(|(raw, action)| Ok((parse_key_sequence(raw)?, action)))
        .collect::<Result<_, String>>()?;
        Ok(Self(bindings))
    }
}

impl<'de> Deserialize<'de> for KeyBindings {
    fn deserialize<D>(deserializer: D) -> color_eyre::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed_map = HashMap::<String, Action>::deserialize(deserializer)?;

        let keybindings = parsed_map
            .into_iter()
            .map(|(key_str, cmd)| {
                let sequence = parse_key_sequence(&key_str).map_err(serde::de::Error::custom)?;
                Ok((sequence, cmd))
            })
            .collect::<Result<_, D::Error>>()?;

        Ok(KeyBindings(keybindings))
    }
}

fn parse_key_event(raw: &str) -> color_eyre::Result<KeyEvent, String> {
    let raw_lower = raw.to_ascii_lowercase();
    let (remaining, modifiers) = extract_modifiers(&raw_lower);
    parse_key_code_with_modifiers(remaining, modifiers)
}

fn extract_modifiers(raw: &str) -> (&str, KeyModifiers) {
    let mut modifiers = KeyModifiers::empty();
    let mut current = raw;

    loop {
        match current {
            rest if rest.starts_with("ctrl-") => {
                modifiers.insert(KeyModifiers::CONTROL);
                current = &rest[5..];
            }
            rest if rest.starts_with("alt-") => {
                modifiers.insert(KeyModifiers::ALT);
                current = &rest[4..];
            }
            rest if rest.starts_with("shift-") => {
                modifiers.insert(KeyModifiers::SHIFT);
                current = &rest[6..];
            }
            _ => break,
        };
    }

    (current, modifiers)
}

fn parse_key_code_with_modifiers(
    raw: &str,
    mut modifiers: KeyModifiers,
) -> color_eyre::Result<KeyEvent, String> {
    let c = match raw {
        "esc" => KeyCode::Esc,
        "enter" => KeyCode::Enter,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "backtab" => {
            modifiers.insert(KeyModifiers::SHIFT);
            KeyCode::BackTab
        }
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        "space" => KeyCode::Char(' '),
        "tab" => KeyCode::Tab,
        c if c.len() == 1 => {
            let mut c = c.chars().next().unwrap();
            if modifiers.contains(KeyModifiers::SHIFT) {
                c = c.to_ascii_uppercase();
            }
            KeyCode::Char(c)
        }
        _ => return Err(format!("Unable to parse {raw}")),
    };
    Ok(KeyEvent::new(c, modifiers))
}

pub fn parse_key_sequence(raw: &str) -> color_eyre::Result<Vec<KeyEvent>, String> {
    if raw.chars().filter(|c| *c == '>').count() != raw.chars().filter(|c| *c == '<').count() {
        return Err(format!("Unable to parse `{}`", raw));
    }
    let raw = if !raw.contains("><") {
        let raw = raw.strip_prefix('<').unwrap_or(raw);
        let raw = raw.strip_suffix('>').unwrap_or(raw);
        raw
    } else {
        raw
    };
    let sequences = raw
        .split("><")
        .map(|seq| {
            if let Some(s) = seq.strip_prefix('<') {
                s
            } else if let Some(s) = seq.strip_suffix('>') {
                s
            } else {
                seq
            }
        })
        .collect::<Vec<_>>();

    sequences.into_iter().map(parse_key_event).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_plain_and_modified_keys() {
        assert_eq!(
            parse_key_sequence("q").unwrap(),
            vec![KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty())]
        );
        assert_eq!(
            parse_key_sequence("<ctrl-c>").unwrap(),
            vec![KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)]
        );
        assert!(parse_key_sequence("<nope>").is_err());
    }

    #[test]
    fn default_bindings_cover_the_display_actions() {
        let bindings = KeyBindings::defaults().unwrap();
        let q = parse_key_sequence("q").unwrap();
        assert_eq!(bindings.get(&q), Some(&Action::Quit));
        let m = parse_key_sequence("m").unwrap();
        assert_eq!(bindings.get(&m), Some(&Action::ToggleMute));
    }

    #[test]
    fn tenant_resolution_prefers_flag_then_persisted_then_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();

        // Nothing anywhere: the default slug.
        assert_eq!(resolve_tenant(None, &config, dir.path()), DEFAULT_TENANT);

        // An explicit flag wins and is persisted.
        assert_eq!(resolve_tenant(Some("acme"), &config, dir.path()), "acme");
        assert_eq!(resolve_tenant(None, &config, dir.path()), "acme");

        // A configured fallback only applies when nothing was persisted.
        let dir2 = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.config.tenant = Some("globex".to_string());
        assert_eq!(resolve_tenant(None, &config, dir2.path()), "globex");
    }
}
