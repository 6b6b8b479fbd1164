use std::collections::HashMap;
use std::io::Write;

use crate::error::SyncError;
use crate::model::TrelloList;
use crate::providers::RemoteCollection;

/// Board lists by name and by id. Rebuilt from the remote whenever needed.
#[derive(Debug, Default)]
pub struct ListLookup {
    by_name: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

impl ListLookup {
    pub fn from_lists(lists: impl IntoIterator<Item = TrelloList>) -> Self {
        let mut lookup = Self::default();
        for list in lists {
            if let Some(id) = list.id {
                lookup.insert(list.name, id);
            }
        }
        lookup
    }

    /// Later lists with a repeated name replace earlier ones by name.
    pub fn insert(&mut self, name: String, id: String) {
        self.by_name.insert(name.clone(), id.clone());
        self.by_id.insert(id, name);
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Fetch the board's lists, creating `default_list` when it is missing.
    pub async fn fetch<C, W>(lists: &C, default_list: &str, out: &mut W) -> Result<Self, SyncError>
    where
        C: RemoteCollection<TrelloList> + ?Sized,
        W: Write,
    {
        let mut lookup = Self::from_lists(lists.list().await?);
        if lookup.id_of(default_list).is_none() {
            writeln!(out, "creating list \"{default_list}\"")?;
            let created = lists.create(&TrelloList::new(default_list)).await?;
            let id = created
                .id
                .ok_or_else(|| SyncError::NotFound(format!("id of new list \"{default_list}\"")))?;
            lookup.insert(created.name, id);
        }
        Ok(lookup)
    }
}

/// Id of `default_list` on the board, creating the list if needed.
pub async fn default_list_id<C, W>(lists: &C, default_list: &str, out: &mut W) -> Result<String, SyncError>
where
    C: RemoteCollection<TrelloList> + ?Sized,
    W: Write,
{
    let lookup = ListLookup::fetch(lists, default_list, out).await?;
    lookup
        .id_of(default_list)
        .map(str::to_string)
        .ok_or_else(|| SyncError::NotFound(format!("list \"{default_list}\"")))
}
