use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend default for `auto_refresh_seconds` when the display has none
/// configured.
pub const DEFAULT_REFRESH_SECONDS: u64 = 10;

/// Lower bound on the poll period. A misconfigured display cannot make the
/// client poll faster than this.
pub const MIN_REFRESH_SECONDS: u64 = 2;

/// Which of the two fixed layouts a display renders with. Selection is
/// driven purely by backend configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutVariant {
    /// Split view: a hero pane for the latest call plus a recent-call list.
    #[default]
    Modern,
    /// Single-column list of recent calls.
    Classic,
}

/// Theme colors as `#rrggbb` strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

fn default_primary() -> String {
    "#2563eb".to_string()
}

fn default_accent() -> String {
    "#f59e0b".to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            accent: default_accent(),
        }
    }
}

/// Static and configurable attributes of one display. Owned by the backend,
/// read-only to the client, replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub layout: LayoutVariant,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default = "default_refresh_seconds")]
    pub auto_refresh_seconds: u64,
    /// Free-form banner text shown in the footer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Per-queue `#rrggbb` overrides for ticket coloring.
    #[serde(default)]
    pub queue_colors: HashMap<Uuid, String>,
}

fn default_refresh_seconds() -> u64 {
    DEFAULT_REFRESH_SECONDS
}

impl DisplayConfig {
    /// Poll period for this display, clamped to [`MIN_REFRESH_SECONDS`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_seconds.max(MIN_REFRESH_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let config: DisplayConfig = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","name":"Accueil"}"#,
        )
        .unwrap();

        assert_eq!(config.layout, LayoutVariant::Modern);
        assert_eq!(config.auto_refresh_seconds, DEFAULT_REFRESH_SECONDS);
        assert_eq!(config.theme, ThemeConfig::default());
        assert!(config.queue_colors.is_empty());
    }

    #[test]
    fn refresh_interval_is_clamped() {
        let mut config: DisplayConfig = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","name":"Accueil"}"#,
        )
        .unwrap();

        config.auto_refresh_seconds = 0;
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));

        config.auto_refresh_seconds = 5;
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
    }
}
