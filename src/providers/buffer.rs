use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::session::credential;
use crate::config::Settings;
use crate::error::{check_status, SyncError};

const SERVICE: &str = "Buffer";
const PAGE_SIZE: usize = 100;

/// Logged-in Buffer client. Only used to inspect pending updates.
#[derive(Debug)]
pub struct BufferClient {
    http: reqwest::Client,
    api_url: String,
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub formatted_username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Unix timestamp in seconds.
    pub scheduled_at: Option<i64>,
}

impl Update {
    pub fn scheduled(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

#[derive(Deserialize)]
struct Updates {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    updates: Vec<Update>,
}

impl BufferClient {
    pub async fn login(settings: &Settings) -> Result<Self, SyncError> {
        // The client id and secret are only needed to mint a token; both
        // still have to be configured.
        credential(&settings.buffer_client_id, "BUFFER_CLIENT_ID")?;
        credential(&settings.buffer_client_secret, "BUFFER_CLIENT_SECRET")?;
        let access_token = credential(&settings.buffer_access_token, "BUFFER_ACCESS_TOKEN")?;

        let client = Self {
            http: reqwest::Client::new(),
            api_url: settings.buffer_api_url.trim_end_matches('/').to_string(),
            access_token,
        };
        client
            .get::<serde_json::Value>("/user.json", "Buffer user", &[])
            .await?;
        info!("logged in to Buffer");
        Ok(client)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
        query: &[(&str, String)],
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(%url, "Buffer request");
        let resp = self
            .http
            .get(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .query(query)
            .send()
            .await?;
        let resp = check_status(SERVICE, what, resp).await?;
        Ok(resp.json().await?)
    }

    /// Profiles connected to `service` ("twitter", "facebook", ...).
    pub async fn profiles(&self, service: &str) -> Result<Vec<Profile>, SyncError> {
        let profiles: Vec<Profile> = self.get("/profiles.json", "Buffer profiles", &[]).await?;
        Ok(profiles
            .into_iter()
            .filter(|p| p.service.eq_ignore_ascii_case(service))
            .collect())
    }

    /// The whole pending queue of a profile, fetched page by page.
    pub async fn pending_updates(&self, profile_id: &str) -> Result<Vec<Update>, SyncError> {
        let path = format!("/profiles/{profile_id}/updates/pending.json");
        let what = format!("pending updates of profile {profile_id}");
        let mut updates = Vec::new();
        let mut page = 1;
        loop {
            let query = [
                ("count", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            let batch: Updates = self.get(&path, &what, &query).await?;
            let short = batch.updates.len() < PAGE_SIZE;
            updates.extend(batch.updates);
            if short || updates.len() >= batch.total {
                break;
            }
            page += 1;
        }
        Ok(updates)
    }
}
