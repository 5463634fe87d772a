//! WirdBot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, WirdError};

/// Env var that overrides `telegram.bot_token`.
pub const TOKEN_ENV: &str = "WIRDBOT_TELEGRAM_TOKEN";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirdConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub prayer: PrayerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
}

impl WirdConfig {
    /// Load config from the default path (~/.wirdbot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default().with_env())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WirdError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| WirdError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config.with_env())
    }

    /// Save config to a path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| WirdError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn with_env(mut self) -> Self {
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            self.telegram.bot_token = token;
        }
        self
    }

    /// Reject settings the scheduler cannot honour.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        if s.corpus_size == 0 || s.run_length == 0 {
            return Err(WirdError::Config(
                "scheduler.corpus_size and scheduler.run_length must be positive".into(),
            ));
        }
        if s.run_length > s.corpus_size {
            return Err(WirdError::Config(format!(
                "scheduler.run_length ({}) exceeds corpus_size ({})",
                s.run_length, s.corpus_size
            )));
        }
        if s.fire_window_mins * 60 <= s.tick_secs {
            return Err(WirdError::Config(format!(
                "scheduler.fire_window_mins ({}m) must be longer than tick_secs ({}s)",
                s.fire_window_mins, s.tick_secs
            )));
        }
        if s.dedup_margin_mins * 60 <= s.tick_secs {
            return Err(WirdError::Config(format!(
                "scheduler.dedup_margin_mins ({}m) must be longer than tick_secs ({}s)",
                s.dedup_margin_mins, s.tick_secs
            )));
        }
        if !self.content.page_url_template.contains("{page}") {
            return Err(WirdError::Config(
                "content.page_url_template must contain {page}".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the WirdBot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wirdbot")
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_api_base() -> String { "https://api.telegram.org".into() }
fn default_poll_timeout() -> u64 { 30 }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Tick loop, gate and cycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// How long after a prayer time a release may still go out.
    #[serde(default = "default_fire_window")]
    pub fire_window_mins: u64,
    /// Two instants closer than this are the same trigger.
    #[serde(default = "default_dedup_margin")]
    pub dedup_margin_mins: u64,
    /// Pages per release.
    #[serde(default = "default_run_length")]
    pub run_length: u32,
    /// Pages in the mushaf.
    #[serde(default = "default_corpus_size")]
    pub corpus_size: u32,
    /// Cap on releases per tenant per tick after downtime. None = all due.
    #[serde(default)]
    pub max_catch_up: Option<usize>,
}

fn default_tick_secs() -> u64 { 60 }
fn default_fire_window() -> u64 { 5 }
fn default_dedup_margin() -> u64 { 10 }
fn default_run_length() -> u32 { 5 }
fn default_corpus_size() -> u32 { 604 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            fire_window_mins: default_fire_window(),
            dedup_margin_mins: default_dedup_margin(),
            run_length: default_run_length(),
            corpus_size: default_corpus_size(),
            max_catch_up: None,
        }
    }
}

/// What gets sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Page image URL; `{page}` is replaced by the page number.
    #[serde(default = "default_page_url_template")]
    pub page_url_template: String,
    #[serde(default = "default_completion_text")]
    pub completion_text: String,
    #[serde(default = "default_restart_text")]
    pub restart_text: String,
    #[serde(default)]
    pub completion_image_url: Option<String>,
    /// Sent after the Fajr release.
    #[serde(default)]
    pub morning_adhkar_url: Option<String>,
    /// Sent after the Asr release.
    #[serde(default)]
    pub evening_adhkar_url: Option<String>,
}

fn default_page_url_template() -> String {
    "https://quran.ksu.edu.sa/ayat/safahat1/{page}.png".into()
}
fn default_completion_text() -> String { "تم بحمد الله و فضله الختم! ✅".into() }
fn default_restart_text() -> String { "☪️ فلنبدأ ختمة جديدة على بركة الله ☪️".into() }

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            page_url_template: default_page_url_template(),
            completion_text: default_completion_text(),
            restart_text: default_restart_text(),
            completion_image_url: None,
            morning_adhkar_url: None,
            evening_adhkar_url: None,
        }
    }
}

impl ContentConfig {
    pub fn page_url(&self, page: u32) -> String {
        self.page_url_template.replace("{page}", &page.to_string())
    }
}

/// Prayer-times service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrayerConfig {
    #[serde(default = "default_prayer_base_url")]
    pub base_url: String,
    /// Aladhan calculation method (2 = ISNA).
    #[serde(default = "default_method")]
    pub method: u8,
    #[serde(default = "default_prayer_timeout")]
    pub timeout_secs: u64,
}

fn default_prayer_base_url() -> String { "https://api.aladhan.com".into() }
fn default_method() -> u8 { 2 }
fn default_prayer_timeout() -> u64 { 15 }

impl Default for PrayerConfig {
    fn default() -> Self {
        Self {
            base_url: default_prayer_base_url(),
            method: default_method(),
            timeout_secs: default_prayer_timeout(),
        }
    }
}

/// Where tenant records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String { "~/.wirdbot/data".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

impl StorageConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).to_string())
    }
}

/// Who may run operator commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub usernames: Vec<String>,
}

impl OperatorConfig {
    pub fn is_operator(&self, username: Option<&str>) -> bool {
        username.is_some_and(|u| {
            let u = u.trim_start_matches('@');
            self.usernames
                .iter()
                .any(|allowed| allowed.trim_start_matches('@').eq_ignore_ascii_case(u))
        })
    }
}
