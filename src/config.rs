use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::SyncError;

pub const DEFAULT_LIST: &str = "Uncategorized";
pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const TRELLO_API_URL: &str = "https://api.trello.com/1";
pub const BUFFER_API_URL: &str = "https://api.bufferapp.com/1";

/// On-disk config file. Every value is optional; empty strings count as unset.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub trello: TrelloSection,
    #[serde(default)]
    pub buffer: BufferSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct GitHubSection {
    pub username: Option<String>,
    pub password: Option<String>,
    pub org: Option<String>,
    pub repo: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TrelloSection {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub auth_token: Option<String>,
    pub board_id: Option<String>,
    pub default_list: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BufferSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub api_url: Option<String>,
}

/// Values given on the command line for this invocation.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub github_org: Option<String>,
    pub github_repo: Option<String>,
    pub trello_board: Option<String>,
}

/// Fully resolved settings for one process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github_username: Option<String>,
    pub github_password: Option<String>,
    pub github_org: Option<String>,
    pub github_repo: Option<String>,
    pub github_api_url: String,

    pub trello_app_key: Option<String>,
    pub trello_app_secret: Option<String>,
    pub trello_auth_token: Option<String>,
    pub trello_board_id: Option<String>,
    pub trello_default_list: String,
    pub trello_api_url: String,

    pub buffer_client_id: Option<String>,
    pub buffer_client_secret: Option<String>,
    pub buffer_access_token: Option<String>,
    pub buffer_api_url: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    /// Resolve every setting with precedence flag > environment > file > default.
    pub fn resolve<F>(overrides: &Overrides, env: F, file: &FileConfig) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |flag: Option<&String>, var: &str, from_file: &Option<String>| {
            non_empty(flag.cloned())
                .or_else(|| non_empty(env(var)))
                .or_else(|| non_empty(from_file.clone()))
        };

        let gh = &file.github;
        let tr = &file.trello;
        let bf = &file.buffer;

        Self {
            github_username: pick(None, "GITHUB_USERNAME", &gh.username),
            github_password: pick(None, "GITHUB_PASSWORD", &gh.password),
            github_org: pick(overrides.github_org.as_ref(), "GITHUB_ORG", &gh.org),
            github_repo: pick(overrides.github_repo.as_ref(), "GITHUB_REPO", &gh.repo),
            github_api_url: pick(None, "GITHUB_API_URL", &gh.api_url)
                .unwrap_or_else(|| GITHUB_API_URL.to_string()),

            trello_app_key: pick(None, "TRELLO_APP_KEY", &tr.app_key),
            trello_app_secret: pick(None, "TRELLO_APP_SECRET", &tr.app_secret),
            trello_auth_token: pick(None, "TRELLO_AUTH_TOKEN", &tr.auth_token),
            trello_board_id: pick(overrides.trello_board.as_ref(), "TRELLO_BOARD_ID", &tr.board_id),
            trello_default_list: pick(None, "TRELLO_DEFAULT_LIST", &tr.default_list)
                .unwrap_or_else(|| DEFAULT_LIST.to_string()),
            trello_api_url: pick(None, "TRELLO_API_URL", &tr.api_url)
                .unwrap_or_else(|| TRELLO_API_URL.to_string()),

            buffer_client_id: pick(None, "BUFFER_CLIENT_ID", &bf.client_id),
            buffer_client_secret: pick(None, "BUFFER_CLIENT_SECRET", &bf.client_secret),
            buffer_access_token: pick(None, "BUFFER_ACCESS_TOKEN", &bf.access_token),
            buffer_api_url: pick(None, "BUFFER_API_URL", &bf.api_url)
                .unwrap_or_else(|| BUFFER_API_URL.to_string()),
        }
    }

    /// The `(org, repo)` pair every GitHub command targets.
    pub fn require_github_target(&self) -> Result<(String, String), SyncError> {
        let org = self
            .github_org
            .clone()
            .ok_or_else(|| SyncError::Configuration("GitHub org (--github-org or GITHUB_ORG)".into()))?;
        let repo = self
            .github_repo
            .clone()
            .ok_or_else(|| SyncError::Configuration("GitHub repo (--github-repo or GITHUB_REPO)".into()))?;
        Ok((org, repo))
    }

    pub fn require_trello_board(&self) -> Result<String, SyncError> {
        self.trello_board_id
            .clone()
            .ok_or_else(|| SyncError::Configuration("Trello board (--trello-board or TRELLO_BOARD_ID)".into()))
    }
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("trolley")
        .join("trolley.toml")
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Load the config file and resolve settings against the process environment.
pub fn load_settings(path: &Path, overrides: &Overrides) -> Result<Settings> {
    let file = load_file_config(path)?;
    Ok(Settings::resolve(overrides, |var| std::env::var(var).ok(), &file))
}

const TEMPLATE: &str = r#"[github]
username = ""
password = ""
org = ""
repo = ""

[trello]
app_key = ""
app_secret = ""
auth_token = ""
board_id = ""
default_list = "Uncategorized"

[buffer]
client_id = ""
client_secret = ""
access_token = ""
"#;

/// Write an empty config template unless a file is already there.
/// Returns `true` when a new file was written.
pub fn create_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
