//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/cloudpan/config.toml`
//! - Windows: `%APPDATA%/cloudpan/config.toml`
//!
//! `CLOUDPAN_*` environment variables override the credential fields after
//! the file is read. Overrides are never written back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cloudpan_client::Credentials;
use cloudpan_protocol::ConflictPolicy;
use cloudpan_transfer::join_remote;
use cloudpan_upload::default_workers;
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth credentials. A refresh token plus client id and secret enable
    /// automatic renewal.
    #[serde(default)]
    pub credentials: Credentials,

    /// Files uploaded concurrently in directory mode.
    #[serde(default = "default_workers")]
    pub file_workers: usize,

    /// Blocks uploaded concurrently per file.
    #[serde(default = "default_workers")]
    pub chunk_workers: usize,

    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Exclude patterns applied to every directory upload.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Remote root for relative remote paths.
    #[serde(default = "default_app_dir")]
    pub app_dir: String,
}

fn default_app_dir() -> String {
    "/apps/cloudpan".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            file_workers: default_workers(),
            chunk_workers: default_workers(),
            conflict_policy: ConflictPolicy::default(),
            exclude: Vec::new(),
            app_dir: default_app_dir(),
        }
    }
}

impl Config {
    /// `path` if given, otherwise the platform default location.
    pub fn path_or_default(path: Option<&Path>) -> anyhow::Result<PathBuf> {
        match path {
            Some(p) => Ok(p.to_path_buf()),
            None => config_path(),
        }
    }

    /// Loads configuration from `path`, creating a default file if none
    /// exists, then applies environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Replaces the credentials stored at `path`, leaving the other fields
    /// as the file has them.
    pub fn store_credentials(path: &Path, credentials: &Credentials) -> anyhow::Result<()> {
        let mut config = Self::read_file(path)?;
        config.credentials = credentials.clone();
        config.save_to(path)
    }

    /// Saves the configuration to `path` with owner-only permissions.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies `CLOUDPAN_*` overrides. Empty values are ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let creds = &mut self.credentials;

        if let Some(v) = get("CLOUDPAN_ACCESS_TOKEN") {
            creds.access_token = v;
        }
        if let Some(v) = get("CLOUDPAN_REFRESH_TOKEN") {
            creds.refresh_token = v;
        }
        if let Some(v) = get("CLOUDPAN_CLIENT_ID") {
            creds.client_id = v;
        }
        if let Some(v) = get("CLOUDPAN_CLIENT_SECRET") {
            creds.client_secret = v;
        }
        if let Some(v) = get("CLOUDPAN_EXPIRES_AT") {
            creds.expires_at = Some(parse_expiry(&v)?);
        }
        Ok(())
    }

    /// Absolute remote paths pass through; relative ones are placed under
    /// `app_dir`.
    pub fn resolve_remote(&self, remote: &str) -> String {
        if remote.starts_with('/') {
            remote.to_string()
        } else {
            join_remote(&self.app_dir, remote)
        }
    }
}

/// Accepts RFC 3339 or Unix seconds.
fn parse_expiry(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| anyhow::anyhow!("expiry out of range: {value}"));
    }
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("cloudpan").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cloudpan")
            .join("config.toml"))
    }
}
