use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::session::credential;
use super::{RemoteCollection, Session};
use crate::config::Settings;
use crate::error::{check_status, SyncError};
use crate::model::{Entity, Issue, Label, Milestone};

const SERVICE: &str = "GitHub";
const PER_PAGE: usize = 100;

/// Logged-in GitHub REST client.
#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    username: String,
    password: String,
    login: String,
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

impl GitHubClient {
    pub async fn login(settings: &Settings) -> Result<Self, SyncError> {
        let username = credential(&settings.github_username, "GITHUB_USERNAME")?;
        let password = credential(&settings.github_password, "GITHUB_PASSWORD")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("trolley/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;

        let mut client = Self {
            http,
            api_url: settings.github_api_url.trim_end_matches('/').to_string(),
            username,
            password,
            login: String::new(),
        };

        let user: GhUser = client.send(Method::GET, "/user", "GitHub user", None::<&()>).await?;
        info!(login = %user.login, "logged in to GitHub");
        client.login = user.login;
        Ok(client)
    }

    /// The account the session authenticated as.
    pub fn account(&self) -> &str {
        &self.login
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        what: &str,
        body: Option<&B>,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, SyncError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(%method, %url, "GitHub request");
        let mut req = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        check_status(SERVICE, what, resp).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        what: &str,
        body: Option<&B>,
    ) -> Result<T, SyncError> {
        let resp = self.request(method, path, what, body, &[]).await?;
        Ok(resp.json().await?)
    }

    async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        what: &str,
        body: Option<&B>,
    ) -> Result<(), SyncError> {
        self.request(method, path, what, body, &[]).await?;
        Ok(())
    }

    /// GET every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, SyncError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let mut params: Vec<(&str, String)> =
                query.iter().map(|(k, v)| (*k, v.to_string())).collect();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let resp = self
                .request(Method::GET, path, what, None::<&()>, &params)
                .await?;
            let batch: Vec<T> = resp.json().await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

/// One repository's issues, labels and milestones.
pub struct GitHubRepo<'a> {
    session: &'a Session,
    org: String,
    repo: String,
}

impl<'a> GitHubRepo<'a> {
    pub fn new(session: &'a Session, org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            session,
            org: org.into(),
            repo: repo.into(),
        }
    }

    fn path(&self, tail: &str) -> String {
        format!("/repos/{}/{}/{}", self.org, self.repo, tail)
    }

    fn slug(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    pull_request: Option<serde_json::Value>,
}

impl From<GhIssue> for Issue {
    fn from(issue: GhIssue) -> Self {
        Issue {
            number: Some(issue.number),
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
    #[serde(default)]
    color: String,
}

#[derive(Deserialize)]
struct GhMilestone {
    number: u64,
    title: String,
}

#[async_trait]
impl<'a> RemoteCollection<Issue> for GitHubRepo<'a> {
    /// Open issues; the issues endpoint also returns pull requests, which are
    /// dropped.
    async fn list(&self) -> Result<Vec<Issue>, SyncError> {
        let gh = self.session.github().await?;
        let what = format!("issues of {}", self.slug());
        let issues: Vec<GhIssue> = gh
            .get_all(&self.path("issues"), &what, &[("state", "open")])
            .await?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(Issue::from)
            .collect())
    }

    async fn create(&self, item: &Issue) -> Result<Issue, SyncError> {
        let gh = self.session.github().await?;
        let body = NewIssue {
            title: &item.title,
            body: &item.body,
            labels: &item.labels,
        };
        let created: GhIssue = gh
            .send(Method::POST, &self.path("issues"), &self.slug(), Some(&body))
            .await?;
        Ok(created.into())
    }

    /// Issues cannot be deleted through the API, so this closes them.
    async fn delete(&self, item: &Issue) -> Result<(), SyncError> {
        let number = match item.number {
            Some(n) => n,
            None => RemoteCollection::<Issue>::find_by_name(self, item.key())
                .await?
                .and_then(|i| i.number)
                .ok_or_else(|| SyncError::NotFound(format!("issue \"{}\"", item.title)))?,
        };
        let gh = self.session.github().await?;
        gh.send_empty(
            Method::PATCH,
            &self.path(&format!("issues/{number}")),
            &format!("issue #{number}"),
            Some(&serde_json::json!({ "state": "closed" })),
        )
        .await
    }
}

#[async_trait]
impl<'a> RemoteCollection<Label> for GitHubRepo<'a> {
    async fn list(&self) -> Result<Vec<Label>, SyncError> {
        let gh = self.session.github().await?;
        let what = format!("labels of {}", self.slug());
        let labels: Vec<GhLabel> = gh.get_all(&self.path("labels"), &what, &[]).await?;
        Ok(labels
            .into_iter()
            .map(|l| Label::new(l.name, l.color))
            .collect())
    }

    async fn create(&self, item: &Label) -> Result<Label, SyncError> {
        let gh = self.session.github().await?;
        let body = serde_json::json!({ "name": item.name, "color": item.color });
        let created: GhLabel = gh
            .send(Method::POST, &self.path("labels"), &self.slug(), Some(&body))
            .await?;
        Ok(Label::new(created.name, created.color))
    }

    async fn delete(&self, item: &Label) -> Result<(), SyncError> {
        let gh = self.session.github().await?;
        let name = urlencoding::encode(&item.name);
        gh.send_empty(
            Method::DELETE,
            &self.path(&format!("labels/{name}")),
            &format!("label \"{}\"", item.name),
            None::<&()>,
        )
        .await
    }
}

#[async_trait]
impl<'a> RemoteCollection<Milestone> for GitHubRepo<'a> {
    async fn list(&self) -> Result<Vec<Milestone>, SyncError> {
        let gh = self.session.github().await?;
        let what = format!("milestones of {}", self.slug());
        let milestones: Vec<GhMilestone> = gh
            .get_all(&self.path("milestones"), &what, &[("state", "open")])
            .await?;
        Ok(milestones
            .into_iter()
            .map(|m| Milestone {
                number: Some(m.number),
                title: m.title,
            })
            .collect())
    }

    async fn create(&self, item: &Milestone) -> Result<Milestone, SyncError> {
        let gh = self.session.github().await?;
        let body = serde_json::json!({ "title": item.title });
        let created: GhMilestone = gh
            .send(Method::POST, &self.path("milestones"), &self.slug(), Some(&body))
            .await?;
        Ok(Milestone {
            number: Some(created.number),
            title: created.title,
        })
    }

    async fn delete(&self, item: &Milestone) -> Result<(), SyncError> {
        let number = match item.number {
            Some(n) => n,
            None => RemoteCollection::<Milestone>::find_by_name(self, item.key())
                .await?
                .and_then(|m| m.number)
                .ok_or_else(|| SyncError::NotFound(format!("milestone \"{}\"", item.title)))?,
        };
        let gh = self.session.github().await?;
        gh.send_empty(
            Method::DELETE,
            &self.path(&format!("milestones/{number}")),
            &format!("milestone #{number}"),
            None::<&()>,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with_login() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octo"})))
            .mount(&server)
            .await;
        server
    }

    fn session_for(server: &MockServer) -> Session {
        let uri = server.uri();
        let settings = Settings::resolve(
            &Overrides::default(),
            |var| match var {
                "GITHUB_USERNAME" => Some("octo".into()),
                "GITHUB_PASSWORD" => Some("secret".into()),
                "GITHUB_API_URL" => Some(uri.clone()),
                _ => None,
            },
            &FileConfig::default(),
        );
        Session::new(settings)
    }

    #[tokio::test]
    async fn list_issues_skips_pull_requests() {
        let server = server_with_login().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"number": 1, "title": "Bug", "body": null, "labels": [{"name": "bug", "color": "d55e00"}]},
                {"number": 2, "title": "A PR", "body": "x", "pull_request": {"url": "..."}}
            ])))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        let issues: Vec<Issue> = repo.list().await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, Some(1));
        assert_eq!(issues[0].body, "");
        assert_eq!(issues[0].labels, ["bug"]);
    }

    #[tokio::test]
    async fn list_follows_pages() {
        let server = server_with_login().await;
        let full_page: Vec<_> = (0..PER_PAGE)
            .map(|i| json!({"name": format!("label-{i}"), "color": "000000"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/labels"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/labels"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"name": "last", "color": "ffffff"}])),
            )
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        let labels: Vec<Label> = repo.list().await.unwrap();

        assert_eq!(labels.len(), PER_PAGE + 1);
        assert_eq!(labels.last().unwrap().name, "last");
    }

    #[tokio::test]
    async fn create_issue_posts_labels() {
        let server = server_with_login().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/issues"))
            .and(body_json(json!({"title": "B", "body": "hi", "labels": ["bug", "urgent"]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(
                json!({"number": 7, "title": "B", "body": "hi", "labels": [{"name": "bug"}, {"name": "urgent"}]}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        let issue = Issue::new("B", "hi", vec!["bug".into(), "urgent".into()]);
        let created = repo.create(&issue).await.unwrap();
        assert_eq!(created.number, Some(7));
    }

    #[tokio::test]
    async fn invalid_label_is_rejected() {
        let server = server_with_login().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/labels"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        let err = repo.create(&Label::new("bug", "nope")).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteRejected { status: 422, .. }));
    }

    #[tokio::test]
    async fn delete_label_encodes_name() {
        let server = server_with_login().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/widgets/labels/help%20wanted"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        repo.delete(&Label::new("help wanted", "")).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_vanished_milestone_is_not_found() {
        let server = server_with_login().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/widgets/milestones/3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        let milestone = Milestone {
            number: Some(3),
            title: "v1".into(),
        };
        let err = repo.delete(&milestone).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn close_issue_by_title() {
        let server = server_with_login().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"number": 9, "title": "Old", "body": ""}])),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/widgets/issues/9"))
            .and(body_json(json!({"state": "closed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let repo = GitHubRepo::new(&session, "acme", "widgets");
        repo.delete(&Issue::new("Old", "", vec![])).await.unwrap();
    }
}
