use tokio::sync::OnceCell;

use super::buffer::BufferClient;
use super::github::GitHubClient;
use super::trello::TrelloClient;
use crate::config::Settings;
use crate::error::SyncError;

/// Authenticated clients for one process.
///
/// Built once by command dispatch and passed by reference to adapters. Each
/// service logs in on the first call that needs it and the client is reused
/// after that, so commands that never touch a service never need its
/// credentials.
pub struct Session {
    settings: Settings,
    github: OnceCell<GitHubClient>,
    trello: OnceCell<TrelloClient>,
    buffer: OnceCell<BufferClient>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            github: OnceCell::new(),
            trello: OnceCell::new(),
            buffer: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn github(&self) -> Result<&GitHubClient, SyncError> {
        self.github
            .get_or_try_init(|| GitHubClient::login(&self.settings))
            .await
    }

    pub async fn trello(&self) -> Result<&TrelloClient, SyncError> {
        self.trello
            .get_or_try_init(|| TrelloClient::login(&self.settings))
            .await
    }

    pub async fn buffer(&self) -> Result<&BufferClient, SyncError> {
        self.buffer
            .get_or_try_init(|| BufferClient::login(&self.settings))
            .await
    }
}

pub(crate) fn credential(value: &Option<String>, name: &str) -> Result<String, SyncError> {
    value
        .clone()
        .ok_or_else(|| SyncError::Authentication(format!("{name} is not set")))
}
