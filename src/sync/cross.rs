use std::io::Write;

use super::lookup::default_list_id;
use super::reconcile::reconcile;
use super::PassReport;
use crate::error::SyncError;
use crate::model::{Card, Issue, TrelloList};
use crate::providers::RemoteCollection;

/// Issue title and body become card name and description. Labels stay behind.
pub fn card_from_issue(issue: Issue, list_id: &str) -> Card {
    Card::new(issue.title, issue.body, Vec::new()).in_list(list_id)
}

pub fn issue_from_card(card: Card) -> Issue {
    Issue::new(card.title, card.body, card.labels)
}

/// One-way pass: every open GitHub issue should exist as a card in the
/// board's default list.
pub async fn sync_issues_to_cards<G, T, L, W>(
    issues: &G,
    cards: &T,
    lists: &L,
    default_list: &str,
    out: &mut W,
) -> Result<PassReport, SyncError>
where
    G: RemoteCollection<Issue> + ?Sized,
    T: RemoteCollection<Card> + ?Sized,
    L: RemoteCollection<TrelloList> + ?Sized,
    W: Write,
{
    let list_id = default_list_id(lists, default_list, out).await?;
    let desired: Vec<Card> = issues
        .list()
        .await?
        .into_iter()
        .map(|issue| card_from_issue(issue, &list_id))
        .collect();
    reconcile(cards, desired, out).await
}

/// One-way pass: every open card should exist as a GitHub issue.
pub async fn sync_cards_to_issues<T, G, W>(
    cards: &T,
    issues: &G,
    out: &mut W,
) -> Result<PassReport, SyncError>
where
    T: RemoteCollection<Card> + ?Sized,
    G: RemoteCollection<Issue> + ?Sized,
    W: Write,
{
    let desired: Vec<Issue> = cards.list().await?.into_iter().map(issue_from_card).collect();
    reconcile(issues, desired, out).await
}
