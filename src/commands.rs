use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::Confirm;

use crate::cli::{Cli, Command};
use crate::config::{self, Settings};
use crate::error::SyncError;
use crate::model::{Card, Issue, Label, Milestone, TrelloList};
use crate::providers::github::GitHubRepo;
use crate::providers::trello::TrelloBoard;
use crate::providers::{RemoteCollection, Session};
use crate::sync::lookup::default_list_id;
use crate::sync::{prepare_labels, reconcile, remove_all, PassReport};
use crate::util::records::load_or_default;

pub const GITHUB_ISSUES: &str = include_str!("../etc/default_github_issues.csv");
pub const GITHUB_LABELS: &str = include_str!("../etc/default_github_labels.csv");
pub const GITHUB_MILESTONES: &str = include_str!("../etc/default_github_milestones.csv");
pub const TRELLO_CARDS: &str = include_str!("../etc/default_trello_cards.csv");
pub const TRELLO_LABELS: &str = include_str!("../etc/default_trello_labels.csv");
pub const TRELLO_LISTS: &str = include_str!("../etc/default_trello_lists.csv");

/// Resolve settings, build the session and run one subcommand.
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut out = std::io::stdout();

    if let Command::CreateConfig = cli.command {
        return create_config(&config_path, &mut out);
    }

    let settings = config::load_settings(&config_path, &cli.command.overrides())?;
    let session = Session::new(settings);
    dispatch(&session, cli.command, &config_path, &mut out).await
}

pub async fn dispatch<W: Write>(
    session: &Session,
    command: Command,
    config_path: &Path,
    out: &mut W,
) -> Result<()> {
    let report = match command {
        Command::Bootstrap { force, .. } => {
            if !confirm(force, "Do you really want to delete all existing GitHub labels and bootstrap the repo?")? {
                return aborted(out);
            }
            bootstrap(session, out).await?
        }
        Command::CloseExistingGithubIssues { force, .. } => {
            if !confirm(force, "Do you really want to close all of your existing GitHub issues?")? {
                return aborted(out);
            }
            close_existing_github_issues(session, out).await?
        }
        Command::CreateGithubIssues { filename, .. } => {
            create_github_issues(session, filename.as_deref(), out).await?
        }
        Command::CreateGithubLabels { filename, .. } => {
            create_github_labels(session, filename.as_deref(), out).await?
        }
        Command::CreateGithubMilestones { filename, .. } => {
            create_github_milestones(session, filename.as_deref(), out).await?
        }
        Command::CreateTrelloCards { filename, .. } => {
            create_trello_cards(session, filename.as_deref(), out).await?
        }
        Command::CreateTrelloLabels { filename, .. } => {
            create_trello_labels(session, filename.as_deref(), out).await?
        }
        Command::CreateTrelloLists { filename, .. } => {
            create_trello_lists(session, filename.as_deref(), out).await?
        }
        Command::DeleteExistingGithubLabels { force, .. } => {
            if !confirm(force, "Do you really want to delete all of the existing GitHub labels?")? {
                return aborted(out);
            }
            delete_existing_github_labels(session, out).await?
        }
        Command::DeleteExistingGithubMilestones { force, .. } => {
            if !confirm(force, "Do you really want to delete all of the existing GitHub milestones?")? {
                return aborted(out);
            }
            delete_existing_github_milestones(session, out).await?
        }
        Command::SyncGithubIssuesToTrelloCards { .. } => {
            sync_github_issues_to_trello_cards(session, out).await?
        }
        Command::SyncTrelloCardsToGithubIssues { .. } => {
            sync_trello_cards_to_github_issues(session, out).await?
        }
        Command::ListTrelloBoards => return list_trello_boards(session, out).await,
        Command::ListTrelloCards { .. } => return list_trello_cards(session, out).await,
        Command::ListTrelloOrganizations => return list_trello_organizations(session, out).await,
        Command::TestGithub => return test_github(session, out).await,
        Command::TestTrello => return test_trello(session, out).await,
        Command::TestBuffer => return test_buffer(session, out).await,
        Command::CreateConfig => return create_config(config_path, out),
    };
    report.finish(out)?;
    Ok(())
}

fn confirm(force: bool, prompt: &str) -> Result<bool> {
    if force {
        return Ok(true);
    }
    let answer = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    Ok(answer)
}

fn aborted<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Action aborted")?;
    Ok(())
}

fn github_repo(session: &Session) -> Result<GitHubRepo<'_>, SyncError> {
    let (org, repo) = session.settings().require_github_target()?;
    Ok(GitHubRepo::new(session, org, repo))
}

fn trello_board(session: &Session) -> Result<TrelloBoard<'_>, SyncError> {
    let board_id = session.settings().require_trello_board()?;
    Ok(TrelloBoard::new(session, board_id))
}

fn default_list(settings: &Settings) -> &str {
    &settings.trello_default_list
}

pub async fn bootstrap<W: Write>(session: &Session, out: &mut W) -> Result<PassReport> {
    github_repo(session)?;
    let mut report = delete_existing_github_labels(session, out).await?;
    report.merge(create_github_labels(session, None, out).await?);
    report.merge(create_github_issues(session, None, out).await?);
    report.merge(create_github_milestones(session, None, out).await?);
    Ok(report)
}

pub async fn close_existing_github_issues<W: Write>(session: &Session, out: &mut W) -> Result<PassReport> {
    let repo = github_repo(session)?;
    Ok(remove_all::<Issue, _, _>(&repo, "closing", out).await?)
}

pub async fn delete_existing_github_labels<W: Write>(session: &Session, out: &mut W) -> Result<PassReport> {
    let repo = github_repo(session)?;
    Ok(remove_all::<Label, _, _>(&repo, "removing", out).await?)
}

pub async fn delete_existing_github_milestones<W: Write>(
    session: &Session,
    out: &mut W,
) -> Result<PassReport> {
    let repo = github_repo(session)?;
    Ok(remove_all::<Milestone, _, _>(&repo, "removing", out).await?)
}

pub async fn create_github_issues<W: Write>(
    session: &Session,
    filename: Option<&Path>,
    out: &mut W,
) -> Result<PassReport> {
    let repo = github_repo(session)?;
    let records = load_or_default(filename, GITHUB_ISSUES).context("Failed to read issues CSV")?;
    let desired: Vec<Issue> = records.iter().map(Issue::from_record).collect();
    Ok(reconcile(&repo, desired, out).await?)
}

pub async fn create_github_labels<W: Write>(
    session: &Session,
    filename: Option<&Path>,
    out: &mut W,
) -> Result<PassReport> {
    let repo = github_repo(session)?;
    let records = load_or_default(filename, GITHUB_LABELS).context("Failed to read labels CSV")?;
    let desired = prepare_labels(
        records.iter().map(Label::from_record).collect(),
        &mut rand::thread_rng(),
    );
    Ok(reconcile(&repo, desired, out).await?)
}

pub async fn create_github_milestones<W: Write>(
    session: &Session,
    filename: Option<&Path>,
    out: &mut W,
) -> Result<PassReport> {
    let repo = github_repo(session)?;
    let records =
        load_or_default(filename, GITHUB_MILESTONES).context("Failed to read milestones CSV")?;
    let desired: Vec<Milestone> = records.iter().map(Milestone::from_record).collect();
    Ok(reconcile(&repo, desired, out).await?)
}

pub async fn create_trello_cards<W: Write>(
    session: &Session,
    filename: Option<&Path>,
    out: &mut W,
) -> Result<PassReport> {
    let board = trello_board(session)?;
    let records = load_or_default(filename, TRELLO_CARDS).context("Failed to read cards CSV")?;
    let list_id = default_list_id(&board, default_list(session.settings()), out).await?;
    let desired: Vec<Card> = records
        .iter()
        .map(|r| Card::from_record(r).in_list(list_id.as_str()))
        .collect();
    Ok(reconcile(&board, desired, out).await?)
}

/// Labels that already exist are reported; creating a missing one fails with
/// `Unsupported`.
pub async fn create_trello_labels<W: Write>(
    session: &Session,
    filename: Option<&Path>,
    out: &mut W,
) -> Result<PassReport> {
    let board = trello_board(session)?;
    let records = load_or_default(filename, TRELLO_LABELS).context("Failed to read labels CSV")?;
    let desired: Vec<Label> = records.iter().map(Label::from_record).collect();
    Ok(reconcile(&board, desired, out).await?)
}

pub async fn create_trello_lists<W: Write>(
    session: &Session,
    filename: Option<&Path>,
    out: &mut W,
) -> Result<PassReport> {
    let board = trello_board(session)?;
    let records = load_or_default(filename, TRELLO_LISTS).context("Failed to read lists CSV")?;
    let desired: Vec<TrelloList> = records.iter().map(TrelloList::from_record).collect();
    Ok(reconcile(&board, desired, out).await?)
}

pub async fn sync_github_issues_to_trello_cards<W: Write>(
    session: &Session,
    out: &mut W,
) -> Result<PassReport> {
    let repo = github_repo(session)?;
    let board = trello_board(session)?;
    let report = crate::sync::sync_issues_to_cards(
        &repo,
        &board,
        &board,
        default_list(session.settings()),
        out,
    )
    .await?;
    Ok(report)
}

pub async fn sync_trello_cards_to_github_issues<W: Write>(
    session: &Session,
    out: &mut W,
) -> Result<PassReport> {
    let board = trello_board(session)?;
    let repo = github_repo(session)?;
    Ok(crate::sync::sync_cards_to_issues(&board, &repo, out).await?)
}

pub async fn list_trello_boards<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let trello = session.trello().await?;
    for board in trello.boards().await? {
        let closed = if board.closed { " (closed)" } else { "" };
        writeln!(out, "{}: {}{}", board.id, board.name, closed)?;
    }
    Ok(())
}

pub async fn list_trello_cards<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let board = trello_board(session)?;
    let cards = RemoteCollection::<Card>::list(&board).await?;
    for card in cards {
        writeln!(out, "{}: {}", card.id.as_deref().unwrap_or_default(), card.title)?;
        if !card.body.is_empty() {
            writeln!(out, "{}", card.body)?;
        }
    }
    Ok(())
}

pub async fn list_trello_organizations<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let trello = session.trello().await?;
    for org in trello.organizations().await? {
        writeln!(out, "{}: {}", org.id, org.name)?;
    }
    Ok(())
}

pub async fn test_github<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let github = session.github().await?;
    writeln!(out, "logged in to GitHub as {}", github.account())?;
    Ok(())
}

pub async fn test_trello<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let trello = session.trello().await?;
    writeln!(out, "logged in to Trello as {}", trello.username())?;
    Ok(())
}

pub async fn test_buffer<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let buffer = session.buffer().await?;
    let profile = buffer
        .profiles("twitter")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound("Buffer twitter profile".into()))?;

    writeln!(out, "{} ({})", profile.formatted_username, profile.id)?;
    for update in buffer.pending_updates(&profile.id).await? {
        let when = update
            .scheduled()
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unscheduled".into());
        writeln!(out, "{}  {}  {}", update.id, when, update.text)?;
    }
    Ok(())
}

pub fn create_config<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    if config::create_config(path)? {
        writeln!(out, "created {}", path.display())?;
    } else {
        writeln!(out, "{} already exists", path.display())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};
    use crate::util::records::parse_records;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(vars: Vec<(&'static str, String)>) -> Session {
        let settings = Settings::resolve(
            &Overrides::default(),
            |var| vars.iter().find(|(k, _)| *k == var).map(|(_, v)| v.clone()),
            &FileConfig::default(),
        );
        Session::new(settings)
    }

    fn github_session(server: &MockServer) -> Session {
        session(vec![
            ("GITHUB_USERNAME", "octo".into()),
            ("GITHUB_PASSWORD", "secret".into()),
            ("GITHUB_ORG", "acme".into()),
            ("GITHUB_REPO", "widgets".into()),
            ("GITHUB_API_URL", server.uri()),
        ])
    }

    async fn login(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octo"})))
            .mount(server)
            .await;
    }

    #[test]
    fn bundled_csvs_parse() {
        for (data, column) in [
            (GITHUB_ISSUES, "title"),
            (GITHUB_LABELS, "name"),
            (GITHUB_MILESTONES, "title"),
            (TRELLO_CARDS, "title"),
            (TRELLO_LABELS, "name"),
            (TRELLO_LISTS, "title"),
        ] {
            let records = parse_records(data.as_bytes()).unwrap();
            assert!(!records.is_empty());
            assert!(records.iter().all(|r| !r.get(column).is_empty()));
        }
    }

    #[tokio::test]
    async fn missing_repo_fails_before_any_request() {
        let server = MockServer::start().await;
        let session = session(vec![
            ("GITHUB_USERNAME", "octo".into()),
            ("GITHUB_PASSWORD", "secret".into()),
            ("GITHUB_ORG", "acme".into()),
            ("GITHUB_API_URL", server.uri()),
        ]);

        let err = create_github_issues(&session, None, &mut Vec::new()).await.unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), 2);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trello_commands_do_not_need_github_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "jeff"})))
            .mount(&server)
            .await;
        let session = session(vec![
            ("TRELLO_APP_KEY", "k".into()),
            ("TRELLO_AUTH_TOKEN", "t".into()),
            ("TRELLO_API_URL", server.uri()),
        ]);

        let mut out = Vec::new();
        test_trello(&session, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "logged in to Trello as jeff\n");
    }

    #[tokio::test]
    async fn forced_label_delete_issues_one_call_per_label() {
        let server = MockServer::start().await;
        login(&server).await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "bug", "color": "d55e00"},
                {"name": "ui", "color": "56b4e9"},
                {"name": "docs", "color": "0072b2"}
            ])))
            .mount(&server)
            .await;
        for name in ["bug", "ui", "docs"] {
            Mock::given(method("DELETE"))
                .and(path(format!("/repos/acme/widgets/labels/{name}")))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;
        }

        let session = github_session(&server);
        let command = Command::DeleteExistingGithubLabels {
            force: true,
            github: Default::default(),
        };
        let mut out = Vec::new();
        dispatch(&session, command, Path::new("unused.toml"), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some("removing 3 labels"));
        assert_eq!(text.lines().count(), 4);
    }

    #[tokio::test]
    async fn rejected_creates_fail_the_command_after_the_pass() {
        let server = MockServer::start().await;
        login(&server).await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/milestones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/milestones"))
            .respond_with(ResponseTemplate::new(422).set_body_string("already_exists"))
            .expect(3)
            .mount(&server)
            .await;

        let session = github_session(&server);
        let command = Command::CreateGithubMilestones {
            filename: None,
            github: Default::default(),
        };
        let mut out = Vec::new();
        let err = dispatch(&session, command, Path::new("unused.toml"), &mut out).await.unwrap_err();

        assert_eq!(crate::error::exit_code_for(&err), 4);
        assert!(String::from_utf8(out).unwrap().contains("3 failed:"));
    }

    #[tokio::test]
    async fn unsupported_trello_label_exits_with_its_own_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "jeff"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/boards/b1/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let session = session(vec![
            ("TRELLO_APP_KEY", "k".into()),
            ("TRELLO_AUTH_TOKEN", "t".into()),
            ("TRELLO_BOARD_ID", "b1".into()),
            ("TRELLO_API_URL", server.uri()),
        ]);

        let err = create_trello_labels(&session, None, &mut Vec::new()).await.unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), 6);
    }

    #[tokio::test]
    async fn list_cards_prints_descriptions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "jeff"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/boards/b1/cards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "c1", "name": "With desc", "desc": "details"},
                {"id": "c2", "name": "Bare", "desc": ""}
            ])))
            .mount(&server)
            .await;
        let session = session(vec![
            ("TRELLO_APP_KEY", "k".into()),
            ("TRELLO_AUTH_TOKEN", "t".into()),
            ("TRELLO_BOARD_ID", "b1".into()),
            ("TRELLO_API_URL", server.uri()),
        ]);

        let mut out = Vec::new();
        list_trello_cards(&session, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "c1: With desc\ndetails\nc2: Bare\n"
        );
    }

    #[tokio::test]
    async fn dispatched_create_config_uses_the_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trolley.toml");
        let session = session(vec![]);

        let mut out = Vec::new();
        dispatch(&session, Command::CreateConfig, &path, &mut out).await.unwrap();

        assert!(path.exists());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("created {}\n", path.display())
        );
    }

    #[test]
    fn create_config_reports_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trolley.toml");

        let mut out = Vec::new();
        create_config(&path, &mut out).unwrap();
        create_config(&path, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("created "));
        assert!(text.trim_end().ends_with("already exists"));
    }
}
