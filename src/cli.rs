use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

/// Trolley syncs issues between CSV files, GitHub and Trello.
#[derive(Parser, Debug)]
#[command(name = "trolley", version, about)]
pub struct Cli {
    /// Config file to read instead of ~/.config/trolley/trolley.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GitHubTarget {
    /// GitHub organization or user owning the repository.
    #[arg(long)]
    pub github_org: Option<String>,

    #[arg(long)]
    pub github_repo: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TrelloTarget {
    /// Trello board id.
    #[arg(long)]
    pub trello_board: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete all labels, then create the default labels, issues and milestones.
    #[command(name = "bootstrap")]
    Bootstrap {
        #[command(flatten)]
        github: GitHubTarget,
        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Close all existing GitHub issues.
    #[command(name = "close_existing_github_issues")]
    CloseExistingGithubIssues {
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// Create GitHub issues from a CSV file.
    #[command(name = "create_github_issues")]
    CreateGithubIssues {
        #[arg(long)]
        filename: Option<PathBuf>,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// Create GitHub labels from a CSV file.
    #[command(name = "create_github_labels")]
    CreateGithubLabels {
        #[arg(long)]
        filename: Option<PathBuf>,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// Create GitHub milestones from a CSV file.
    #[command(name = "create_github_milestones")]
    CreateGithubMilestones {
        #[arg(long)]
        filename: Option<PathBuf>,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// Create Trello cards from a CSV file.
    #[command(name = "create_trello_cards")]
    CreateTrelloCards {
        #[arg(long)]
        filename: Option<PathBuf>,
        #[command(flatten)]
        trello: TrelloTarget,
    },

    /// Create Trello labels from a CSV file (not supported by Trello sync yet).
    #[command(name = "create_trello_labels")]
    CreateTrelloLabels {
        #[arg(long)]
        filename: Option<PathBuf>,
        #[command(flatten)]
        trello: TrelloTarget,
    },

    /// Create Trello lists from a CSV file.
    #[command(name = "create_trello_lists")]
    CreateTrelloLists {
        #[arg(long)]
        filename: Option<PathBuf>,
        #[command(flatten)]
        trello: TrelloTarget,
    },

    /// Delete all labels from a GitHub repo.
    #[command(name = "delete_existing_github_labels")]
    DeleteExistingGithubLabels {
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// Delete all milestones from a GitHub repo.
    #[command(name = "delete_existing_github_milestones")]
    DeleteExistingGithubMilestones {
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// Convert your GitHub issues to Trello cards.
    #[command(name = "sync_github_issues_to_trello_cards")]
    SyncGithubIssuesToTrelloCards {
        #[command(flatten)]
        github: GitHubTarget,
        #[command(flatten)]
        trello: TrelloTarget,
    },

    /// Convert your Trello cards to GitHub issues.
    #[command(name = "sync_trello_cards_to_github_issues")]
    SyncTrelloCardsToGithubIssues {
        #[command(flatten)]
        trello: TrelloTarget,
        #[command(flatten)]
        github: GitHubTarget,
    },

    /// List your Trello boards.
    #[command(name = "list_trello_boards")]
    ListTrelloBoards,

    /// List the open cards of a Trello board.
    #[command(name = "list_trello_cards")]
    ListTrelloCards {
        #[command(flatten)]
        trello: TrelloTarget,
    },

    /// List your Trello organizations.
    #[command(name = "list_trello_organizations")]
    ListTrelloOrganizations,

    /// Write an empty config file if there is none yet.
    #[command(name = "create_config")]
    CreateConfig,

    /// Check the GitHub credentials.
    #[command(name = "test_github")]
    TestGithub,

    /// Check the Trello credentials.
    #[command(name = "test_trello")]
    TestTrello,

    /// Show pending Buffer updates for the Twitter profile.
    #[command(name = "test_buffer")]
    TestBuffer,
}

impl Command {
    /// Command-line values that take precedence over env and config file.
    pub fn overrides(&self) -> Overrides {
        let (github, trello) = match self {
            Command::Bootstrap { github, .. }
            | Command::CloseExistingGithubIssues { github, .. }
            | Command::CreateGithubIssues { github, .. }
            | Command::CreateGithubLabels { github, .. }
            | Command::CreateGithubMilestones { github, .. }
            | Command::DeleteExistingGithubLabels { github, .. }
            | Command::DeleteExistingGithubMilestones { github, .. } => (Some(github), None),
            Command::CreateTrelloCards { trello, .. }
            | Command::CreateTrelloLabels { trello, .. }
            | Command::CreateTrelloLists { trello, .. }
            | Command::ListTrelloCards { trello } => (None, Some(trello)),
            Command::SyncGithubIssuesToTrelloCards { github, trello }
            | Command::SyncTrelloCardsToGithubIssues { trello, github } => {
                (Some(github), Some(trello))
            }
            Command::ListTrelloBoards
            | Command::ListTrelloOrganizations
            | Command::CreateConfig
            | Command::TestGithub
            | Command::TestTrello
            | Command::TestBuffer => (None, None),
        };

        Overrides {
            github_org: github.and_then(|g| g.github_org.clone()),
            github_repo: github.and_then(|g| g.github_repo.clone()),
            trello_board: trello.and_then(|t| t.trello_board.clone()),
        }
    }
}
