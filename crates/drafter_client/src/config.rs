//! Client configuration and credential storage.
//!
//! Credentials resolve from `DRAFTER_CLIENT_ID` / `DRAFTER_CLIENT_SECRET`
//! first, then from `~/.config/drafter/credentials.json` (0600 on Unix).

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DrafterError, Result};

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_BASE_URL: &str = "https://cogs-staging-drafter.publishmydata.com";
pub const DEFAULT_TOKEN_URL: &str = "https://swirrl-staging.eu.auth0.com/oauth/token";
pub const DEFAULT_AUDIENCE: &str = "https://pmd";
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";

const ENV_BASE_URL: &str = "DRAFTER_BASE_URL";
const ENV_TOKEN_URL: &str = "DRAFTER_TOKEN_URL";
const ENV_CLIENT_ID: &str = "DRAFTER_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "DRAFTER_CLIENT_SECRET";

// ── ClientConfig ────────────────────────────────────────────────────

/// Where the service lives and how the token is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service root, without the `/v1` prefix
    pub base_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
    pub audience: String,
    pub grant_type: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            grant_type: DEFAULT_GRANT_TYPE.to_string(),
            timeout: None,
            user_agent: concat!("drafter-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Point the client at another service root (trailing slashes trimmed).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Defaults, overridden by `DRAFTER_BASE_URL` / `DRAFTER_TOKEN_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base) = non_empty(lookup(ENV_BASE_URL)) {
            config = config.with_base_url(base);
        }
        if let Some(token) = non_empty(lookup(ENV_TOKEN_URL)) {
            config = config.with_token_url(token);
        }
        config
    }
}

// ── Credentials ─────────────────────────────────────────────────────

/// OAuth2 client credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read `DRAFTER_CLIENT_ID` / `DRAFTER_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client_id = non_empty(lookup(ENV_CLIENT_ID)).ok_or_else(|| {
            DrafterError::Config(format!("missing client id (set {})", ENV_CLIENT_ID))
        })?;
        let client_secret = non_empty(lookup(ENV_CLIENT_SECRET)).ok_or_else(|| {
            DrafterError::Config(format!("missing client secret (set {})", ENV_CLIENT_SECRET))
        })?;
        Ok(Self { client_id, client_secret })
    }

    /// Environment first, then the default credentials file.
    pub fn resolve() -> Result<Self> {
        if let Ok(creds) = Self::from_env() {
            return Ok(creds);
        }
        let path = credentials_file_path().ok_or_else(|| {
            DrafterError::Config("could not determine config directory".into())
        })?;
        load_credentials(&path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Credentials file ────────────────────────────────────────────────

/// Returns the path to the credentials file.
pub fn credentials_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("drafter/credentials.json"))
}

/// Load credentials from a JSON file.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DrafterError::Config(format!("cannot read credentials file {}: {}", path.display(), e))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                log::warn!(
                    "credentials file {} is accessible by others (mode {:o}), consider chmod 600",
                    path.display(),
                    mode & 0o777,
                );
            }
        }
    }

    serde_json::from_str(&content).map_err(|e| {
        DrafterError::Config(format!("invalid credentials JSON in {}: {}", path.display(), e))
    })
}

/// Save credentials, creating the parent directory. 0600 on Unix.
pub fn save_credentials(creds: &Credentials, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DrafterError::Io(format!("failed to create config directory: {}", e)))?;
    }

    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| DrafterError::Parse(format!("failed to serialize credentials: {}", e)))?;

    let write_err =
        |e: std::io::Error| DrafterError::Io(format!("failed to write {}: {}", path.display(), e));

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(write_err)?;

    // `mode` only applies on creation; tighten a file that already existed.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| DrafterError::Io(format!("failed to set file permissions: {}", e)))?;
    }

    file.write_all(contents.as_bytes()).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.audience, "https://pmd");
        assert_eq!(config.grant_type, "client_credentials");
        assert!(config.timeout.is_none());
        assert!(config.user_agent.starts_with("drafter-client/"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig::default().with_base_url("http://localhost:3001//");
        assert_eq!(config.base_url, "http://localhost:3001");
    }

    #[test]
    fn test_config_env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DRAFTER_BASE_URL", "https://drafter.example/"),
            ("DRAFTER_TOKEN_URL", "  "),
        ]));
        assert_eq!(config.base_url, "https://drafter.example");
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
    }

    #[test]
    fn test_credentials_from_env() {
        let creds = Credentials::from_lookup(lookup(&[
            ("DRAFTER_CLIENT_ID", "  cid  "),
            ("DRAFTER_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(creds, Credentials::new("cid", "secret"));
    }

    #[test]
    fn test_credentials_from_env_missing_secret() {
        let err = Credentials::from_lookup(lookup(&[("DRAFTER_CLIENT_ID", "cid")])).unwrap_err();
        assert!(matches!(err, DrafterError::Config(_)));
        assert!(err.to_string().contains("DRAFTER_CLIENT_SECRET"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("cid", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("cid"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_file_path() {
        let path = credentials_file_path().unwrap();
        assert!(path.to_string_lossy().contains("drafter"));
        assert!(path.to_string_lossy().ends_with("credentials.json"));
    }

    #[test]
    fn test_save_and_load_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/credentials.json");

        let creds = Credentials::new("cid", "csec");
        save_credentials(&creds, &path).unwrap();
        let loaded = load_credentials(&path).unwrap();
        assert_eq!(loaded, creds);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_save_credentials_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "a much longer previous content that must be truncated").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let creds = Credentials::new("cid", "csec");
        save_credentials(&creds, &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_credentials(&path).unwrap(), creds);
    }

    #[test]
    fn test_load_credentials_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_credentials(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read credentials file"));
    }

    #[test]
    fn test_load_credentials_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_credentials(&path).unwrap_err();
        assert!(err.to_string().contains("invalid credentials JSON"));
    }
}
