//! Configuration file: shortcuts, their actions and notification layout

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::constants::paths;
use crate::notification::{NotificationButton, NotificationSettings};

/// What happens when a shortcut is activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShortcutAction {
    /// Show a notification with id `shortcut:<sequence>`
    Notify {
        title: String,
        #[serde(default)]
        message: String,
        /// Auto-close delay; `None` keeps the notification until clicked
        #[serde(default)]
        timeout_ms: Option<u64>,
        /// Buttons whose `data` is run as a command line when clicked
        #[serde(default)]
        buttons: Vec<NotificationButton>,
    },
    /// Spawn a program without waiting for it
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    /// Key sequence text, e.g. `Ctrl+Alt+V`
    pub sequence: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub action: ShortcutAction,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Send Shift+Insert once the keys of an activated shortcut are released
    pub paste_on_release: bool,
    pub shortcuts: Vec<ShortcutConfig>,
    pub notifications: NotificationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paste_on_release: false,
            shortcuts: vec![ShortcutConfig {
                sequence: "Ctrl+Alt+V".to_string(),
                enabled: true,
                action: ShortcutAction::Notify {
                    title: "clipdesk".to_string(),
                    message: "Shortcut activated".to_string(),
                    timeout_ms: Some(3000),
                    buttons: Vec::new(),
                },
            }],
            notifications: NotificationSettings::default(),
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/clipdesk/clipdesk.json`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(dir.join(paths::CONFIG_DIR).join(paths::CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .context(format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), shortcuts = config.shortcuts.len(), "Loaded config");
        Ok(config.sanitized())
    }

    /// Load `path`, writing the defaults there first if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        info!(path = %path.display(), "Wrote default config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, text).context(format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        self.notifications = self.notifications.sanitized();
        self
    }
}
