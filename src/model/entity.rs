use serde::{Deserialize, Serialize};

use super::labels::parse_labels;
use crate::util::records::Record;

/// A record that lives in a remote collection and is identified by one field.
pub trait Entity: Clone + Send + Sync {
    /// Singular noun used in trace output ("issue", "label", ...).
    const KIND: &'static str;

    /// Identity key. Two entities with equal keys are the same entity.
    fn key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Remote issue number, `None` until created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Issue {
    pub fn new(title: impl Into<String>, body: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            number: None,
            title: title.into(),
            body: body.into(),
            labels,
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self::new(
            record.get("title"),
            record.get("body"),
            parse_labels(record.get("labels")),
        )
    }
}

impl Entity for Issue {
    const KIND: &'static str = "issue";

    fn key(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Remote id on services that address labels by id (Trello).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Opaque color token; empty means "pick one from the palette".
    #[serde(default)]
    pub color: String,
}

impl Label {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self::new(record.get("name"), record.get("color").trim())
    }
}

impl Entity for Label {
    const KIND: &'static str = "label";

    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    pub title: String,
}

impl Milestone {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            number: None,
            title: title.into(),
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self::new(record.get("title"))
    }
}

impl Entity for Milestone {
    const KIND: &'static str = "milestone";

    fn key(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrelloList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

impl TrelloList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self::new(record.get("title"))
    }
}

impl Entity for TrelloList {
    const KIND: &'static str = "list";

    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Label names. Not applied when creating cards.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Target list for creation, or the list a listed card sits in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
}

impl Card {
    pub fn new(title: impl Into<String>, body: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            body: body.into(),
            labels,
            list_id: None,
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self::new(
            record.get("title"),
            record.get("body"),
            parse_labels(record.get("labels")),
        )
    }

    pub fn in_list(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }
}

impl Entity for Card {
    const KIND: &'static str = "card";

    fn key(&self) -> &str {
        &self.title
    }
}

/// A Trello board as shown by `list_trello_boards`.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
}
