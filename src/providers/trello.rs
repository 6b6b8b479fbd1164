use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::session::credential;
use super::{RemoteCollection, Session};
use crate::config::Settings;
use crate::error::{check_status, SyncError};
use crate::model::{Board, Card, Label, Organization, TrelloList};

const SERVICE: &str = "Trello";
// Largest page the board labels endpoint returns; the default is 50.
const LABEL_LIMIT: &str = "1000";

/// Logged-in Trello REST client.
#[derive(Debug)]
pub struct TrelloClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    token: String,
    username: String,
}

#[derive(Deserialize)]
struct Member {
    username: String,
}

#[derive(Deserialize)]
struct TrBoard {
    id: String,
    name: String,
    #[serde(default)]
    closed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrOrganization {
    id: String,
    name: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct TrList {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct TrLabel {
    id: String,
    name: Option<String>,
    color: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrCard {
    id: String,
    name: String,
    desc: Option<String>,
    id_list: Option<String>,
    #[serde(default)]
    labels: Vec<TrLabel>,
}

impl From<TrCard> for Card {
    fn from(card: TrCard) -> Self {
        Card {
            id: Some(card.id),
            title: card.name,
            body: card.desc.unwrap_or_default(),
            labels: card
                .labels
                .into_iter()
                .filter_map(|l| l.name)
                .filter(|name| !name.is_empty())
                .collect(),
            list_id: card.id_list,
        }
    }
}

impl TrelloClient {
    pub async fn login(settings: &Settings) -> Result<Self, SyncError> {
        let api_key = credential(&settings.trello_app_key, "TRELLO_APP_KEY")?;
        let token = credential(&settings.trello_auth_token, "TRELLO_AUTH_TOKEN")?;

        let mut client = Self {
            http: reqwest::Client::new(),
            api_url: settings.trello_api_url.trim_end_matches('/').to_string(),
            api_key,
            token,
            username: String::new(),
        };

        let member: Member = client
            .call(Method::GET, "/members/me", "Trello member", &[])
            .await?;
        info!(username = %member.username, "logged in to Trello");
        client.username = member.username;
        Ok(client)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn auth_params(&self) -> [(&str, &str); 2] {
        [("key", self.api_key.as_str()), ("token", self.token.as_str())]
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        what: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, SyncError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(%method, %url, "Trello request");
        let resp = self
            .http
            .request(method, &url)
            .query(&self.auth_params())
            .query(query)
            .send()
            .await?;
        check_status(SERVICE, what, resp).await
    }

    /// POST with the fields in a form body; only the credentials go in the
    /// query string. Card descriptions can be far longer than a URL allows.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
        form: &[(&str, &str)],
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(%url, "Trello form request");
        let resp = self
            .http
            .post(&url)
            .query(&self.auth_params())
            .form(form)
            .send()
            .await?;
        let resp = check_status(SERVICE, what, resp).await?;
        Ok(resp.json().await?)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        what: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SyncError> {
        let resp = self.request(method, path, what, query).await?;
        Ok(resp.json().await?)
    }

    pub async fn boards(&self) -> Result<Vec<Board>, SyncError> {
        let boards: Vec<TrBoard> = self
            .call(
                Method::GET,
                "/members/me/boards",
                "Trello boards",
                &[("fields", "id,name,closed")],
            )
            .await?;
        Ok(boards
            .into_iter()
            .map(|b| Board {
                id: b.id,
                name: b.name,
                closed: b.closed,
            })
            .collect())
    }

    pub async fn organizations(&self) -> Result<Vec<Organization>, SyncError> {
        let orgs: Vec<TrOrganization> = self
            .call(
                Method::GET,
                "/members/me/organizations",
                "Trello organizations",
                &[("fields", "id,name,displayName")],
            )
            .await?;
        Ok(orgs
            .into_iter()
            .map(|o| Organization {
                id: o.id,
                name: o.display_name.filter(|n| !n.is_empty()).unwrap_or(o.name),
            })
            .collect())
    }
}

/// The lists, cards and labels of one board.
pub struct TrelloBoard<'a> {
    session: &'a Session,
    board_id: String,
}

impl<'a> TrelloBoard<'a> {
    pub fn new(session: &'a Session, board_id: impl Into<String>) -> Self {
        Self {
            session,
            board_id: board_id.into(),
        }
    }

    fn path(&self, tail: &str) -> String {
        format!("/boards/{}/{}", self.board_id, tail)
    }

    fn what(&self, kind: &str) -> String {
        format!("{kind} of board {}", self.board_id)
    }
}

#[async_trait]
impl<'a> RemoteCollection<Card> for TrelloBoard<'a> {
    /// Open cards only; archived cards do not count as present.
    async fn list(&self) -> Result<Vec<Card>, SyncError> {
        let trello = self.session.trello().await?;
        let cards: Vec<TrCard> = trello
            .call(
                Method::GET,
                &self.path("cards"),
                &self.what("cards"),
                &[("filter", "open"), ("fields", "id,name,desc,idList,labels")],
            )
            .await?;
        Ok(cards.into_iter().map(Card::from).collect())
    }

    async fn create(&self, item: &Card) -> Result<Card, SyncError> {
        let list_id = item.list_id.as_deref().ok_or_else(|| {
            SyncError::Configuration(format!("no target list for card \"{}\"", item.title))
        })?;
        if !item.labels.is_empty() {
            warn!(card = %item.title, labels = ?item.labels, "card labels are not applied");
        }

        let trello = self.session.trello().await?;
        let created: TrCard = trello
            .post_form(
                "/cards",
                &format!("list {list_id}"),
                &[
                    ("idList", list_id),
                    ("name", item.title.as_str()),
                    ("desc", item.body.as_str()),
                ],
            )
            .await?;
        Ok(created.into())
    }

    async fn delete(&self, item: &Card) -> Result<(), SyncError> {
        let id = match &item.id {
            Some(id) => id.clone(),
            None => RemoteCollection::<Card>::find_by_name(self, &item.title)
                .await?
                .and_then(|c| c.id)
                .ok_or_else(|| SyncError::NotFound(format!("card \"{}\"", item.title)))?,
        };
        let trello = self.session.trello().await?;
        trello
            .request(Method::DELETE, &format!("/cards/{id}"), &format!("card {id}"), &[])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<'a> RemoteCollection<TrelloList> for TrelloBoard<'a> {
    async fn list(&self) -> Result<Vec<TrelloList>, SyncError> {
        let trello = self.session.trello().await?;
        let lists: Vec<TrList> = trello
            .call(
                Method::GET,
                &self.path("lists"),
                &self.what("lists"),
                &[("filter", "open"), ("fields", "id,name")],
            )
            .await?;
        Ok(lists
            .into_iter()
            .map(|l| TrelloList {
                id: Some(l.id),
                name: l.name,
            })
            .collect())
    }

    async fn create(&self, item: &TrelloList) -> Result<TrelloList, SyncError> {
        let trello = self.session.trello().await?;
        let created: TrList = trello
            .call(
                Method::POST,
                &self.path("lists"),
                &self.what("lists"),
                &[("name", item.name.as_str()), ("pos", "bottom")],
            )
            .await?;
        Ok(TrelloList {
            id: Some(created.id),
            name: created.name,
        })
    }

    /// Trello has no list deletion; the list is archived instead.
    async fn delete(&self, item: &TrelloList) -> Result<(), SyncError> {
        let id = match &item.id {
            Some(id) => id.clone(),
            None => RemoteCollection::<TrelloList>::find_by_name(self, &item.name)
                .await?
                .and_then(|l| l.id)
                .ok_or_else(|| SyncError::NotFound(format!("list \"{}\"", item.name)))?,
        };
        let trello = self.session.trello().await?;
        trello
            .request(
                Method::PUT,
                &format!("/lists/{id}/closed"),
                &format!("list {id}"),
                &[("value", "true")],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<'a> RemoteCollection<Label> for TrelloBoard<'a> {
    async fn list(&self) -> Result<Vec<Label>, SyncError> {
        let trello = self.session.trello().await?;
        let labels: Vec<TrLabel> = trello
            .call(
                Method::GET,
                &self.path("labels"),
                &self.what("labels"),
                &[("fields", "id,name,color"), ("limit", LABEL_LIMIT)],
            )
            .await?;
        Ok(labels
            .into_iter()
            .map(|l| Label {
                id: Some(l.id),
                name: l.name.unwrap_or_default(),
                color: l.color.unwrap_or_default(),
            })
            .collect())
    }

    async fn create(&self, item: &Label) -> Result<Label, SyncError> {
        Err(SyncError::Unsupported(format!(
            "creating Trello label \"{}\"",
            item.name
        )))
    }

    async fn delete(&self, item: &Label) -> Result<(), SyncError> {
        Err(SyncError::Unsupported(format!(
            "deleting Trello label \"{}\"",
            item.name
        )))
    }
}
