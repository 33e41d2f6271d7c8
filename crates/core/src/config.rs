//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Request
//! handlers never read process-wide environment variables.

use crate::constants::{
    DEFAULT_DATA_ROOT, DEFAULT_HOST, DEFAULT_MAX_REQUESTS_PER_MINUTE, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_MOUNT_PATH, DEFAULT_PORT, DEFAULT_SAVE_SECONDS,
};
use crate::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    host: String,
    port: u16,
    data_root: PathBuf,
    save_seconds: u64,
    max_requests_per_minute: u64,
    mount_path: String,
    max_upload_bytes: usize,
    require_auth: bool,
    gui_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a configuration with defaults for everything except the data root.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            data_root: data_root.into(),
            save_seconds: DEFAULT_SAVE_SECONDS,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            mount_path: DEFAULT_MOUNT_PATH.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            require_auth: false,
            gui_dir: None,
        }
    }

    /// Resolve configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `HTTP_HOST` (default `0.0.0.0`)
    /// - `HTTP_PORT` (default `3000`)
    /// - `DATA_ROOT` (default `/app/data`)
    /// - `SAVE_SECONDS` (default `60`, `0` disables autosave)
    /// - `MAX_REQUESTS_PER_MINUTE` (default `60`)
    /// - `CONTENT_MOUNT_PATH` (default `/content`)
    /// - `MAX_UPLOAD_BYTES` (default 100 MiB)
    /// - `REQUIRE_AUTH` (default `false`)
    /// - `GUI_DIR` (default unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup` instead of the process environment.
    ///
    /// Empty or whitespace-only values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_root = get("DATA_ROOT").unwrap_or_else(|| DEFAULT_DATA_ROOT.into());
        let mut cfg = Self::new(data_root);

        if let Some(host) = get("HTTP_HOST") {
            cfg.host = host;
        }
        cfg.port = parse_number("HTTP_PORT", get("HTTP_PORT"), DEFAULT_PORT)?;
        cfg.save_seconds = parse_number("SAVE_SECONDS", get("SAVE_SECONDS"), DEFAULT_SAVE_SECONDS)?;
        cfg.max_requests_per_minute = parse_number(
            "MAX_REQUESTS_PER_MINUTE",
            get("MAX_REQUESTS_PER_MINUTE"),
            DEFAULT_MAX_REQUESTS_PER_MINUTE,
        )?;
        if cfg.max_requests_per_minute == 0 {
            return Err(invalid(
                "MAX_REQUESTS_PER_MINUTE",
                "0",
                "must be greater than zero",
            ));
        }
        cfg.max_upload_bytes = parse_number(
            "MAX_UPLOAD_BYTES",
            get("MAX_UPLOAD_BYTES"),
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;
        if let Some(mount) = get("CONTENT_MOUNT_PATH") {
            cfg.mount_path = normalise_mount_path(&mount)?;
        }
        if let Some(flag) = get("REQUIRE_AUTH") {
            cfg.require_auth = parse_flag("REQUIRE_AUTH", &flag)?;
        }
        cfg.gui_dir = get("GUI_DIR").map(PathBuf::from);

        Ok(cfg)
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_save_seconds(mut self, save_seconds: u64) -> Self {
        self.save_seconds = save_seconds;
        self
    }

    pub fn with_max_requests_per_minute(mut self, max: u64) -> Self {
        self.max_requests_per_minute = max.max(1);
        self
    }

    /// Set the mount path for the content endpoints.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] if the path does not start with `/` or is the root.
    pub fn with_mount_path(mut self, mount_path: &str) -> Result<Self, ConfigError> {
        self.mount_path = normalise_mount_path(mount_path)?;
        Ok(self)
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    pub fn with_gui_dir(mut self, gui_dir: Option<PathBuf>) -> Self {
        self.gui_dir = gui_dir;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, ready for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn save_seconds(&self) -> u64 {
        self.save_seconds
    }

    pub fn max_requests_per_minute(&self) -> u64 {
        self.max_requests_per_minute
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn require_auth(&self) -> bool {
        self.require_auth
    }

    pub fn gui_dir(&self) -> Option<&Path> {
        self.gui_dir.as_deref()
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_number<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse::<T>().map_err(|e| invalid(key, &v, e.to_string())),
        None => Ok(default),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

/// Mount paths start with `/`, never end with one, and are never the root itself.
fn normalise_mount_path(value: &str) -> Result<String, ConfigError> {
    const KEY: &str = "CONTENT_MOUNT_PATH";

    if !value.starts_with('/') {
        return Err(invalid(KEY, value, "must start with '/'"));
    }
    let trimmed = value.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(KEY, value, "must not be the root path"));
    }
    Ok(trimmed.to_string())
}
