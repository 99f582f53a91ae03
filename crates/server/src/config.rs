use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use organizer::{OrganizerOptions, DEFAULT_DESCRIPTION_FOOTER};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_USER_DATA_PATH: &str = "user_data.redb";
const DEFAULT_CATALOG_API_URL: &str = "https://api.spotify.com/v1";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub version: u32,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,
    pub user_data_path: String,
    pub catalog_api_url: String,
    pub catalog_timeout_secs: u64,
    pub min_playlists: usize,
    pub max_playlists: usize,
    pub library_page_size: usize,
    pub artist_batch_size: usize,
    pub track_batch_size: usize,
    pub batch_delay_ms: u64,
    pub sync_buffer_secs: u64,
    pub library_count_ttl_secs: u64,
    pub description_footer: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            port: DEFAULT_PORT,
            bind_addr: None,
            user_data_path: DEFAULT_USER_DATA_PATH.to_string(),
            catalog_api_url: DEFAULT_CATALOG_API_URL.to_string(),
            catalog_timeout_secs: 30,
            min_playlists: 1,
            max_playlists: 50,
            library_page_size: 50,
            artist_batch_size: 50,
            track_batch_size: 100,
            batch_delay_ms: 100,
            sync_buffer_secs: 60,
            library_count_ttl_secs: 5 * 60,
            description_footer: DEFAULT_DESCRIPTION_FOOTER.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn organizer_options(&self) -> OrganizerOptions {
        OrganizerOptions {
            min_playlists: self.min_playlists,
            max_playlists: self.max_playlists,
            library_page_size: self.library_page_size,
            artist_batch_size: self.artist_batch_size,
            track_batch_size: self.track_batch_size,
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            sync_buffer: Duration::from_secs(self.sync_buffer_secs),
            description_footer: self.description_footer.clone(),
        }
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        match self.bind_addr.as_deref().map(str::trim) {
            Some(addr) if !addr.is_empty() => addr.to_string(),
            _ => format!("0.0.0.0:{}", self.port),
        }
    }

    /// Replaces zero or blank values with defaults.
    fn normalize(&mut self) {
        let defaults = ServerConfig::default();
        if self.version < CONFIG_VERSION {
            self.version = CONFIG_VERSION;
        }
        if self.port == 0 {
            self.port = self
                .bind_addr
                .as_deref()
                .and_then(parse_port)
                .unwrap_or(defaults.port);
        }
        if self.user_data_path.trim().is_empty() {
            self.user_data_path = defaults.user_data_path;
        }
        let api_url = self.catalog_api_url.trim().trim_end_matches('/');
        self.catalog_api_url = if api_url.is_empty() {
            defaults.catalog_api_url
        } else {
            api_url.to_string()
        };
        if self.catalog_timeout_secs == 0 {
            self.catalog_timeout_secs = defaults.catalog_timeout_secs;
        }
        if self.min_playlists == 0 {
            self.min_playlists = defaults.min_playlists;
        }
        if self.max_playlists < self.min_playlists {
            self.max_playlists = defaults.max_playlists.max(self.min_playlists);
        }
        if self.library_page_size == 0 {
            self.library_page_size = defaults.library_page_size;
        }
        if self.artist_batch_size == 0 {
            self.artist_batch_size = defaults.artist_batch_size;
        }
        if self.track_batch_size == 0 {
            self.track_batch_size = defaults.track_batch_size;
        }
        if self.sync_buffer_secs == 0 {
            self.sync_buffer_secs = defaults.sync_buffer_secs;
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("ORGANIZER_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&contents)?;
        config.normalize();
        return Ok((config, false));
    }

    let config = ServerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

fn parse_port(value: &str) -> Option<u16> {
    let port = value.rsplit(':').next()?.trim();
    port.parse::<u16>().ok()
}
