pub mod buffer;
pub mod github;
pub mod session;
pub mod trello;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::model::Entity;

pub use session::Session;

/// One remote collection of entities of type `E` (a repo's issues, a board's
/// lists, ...).
#[async_trait]
pub trait RemoteCollection<E: Entity>: Send + Sync {
    /// Every entity currently present. Implementations follow pagination.
    async fn list(&self) -> Result<Vec<E>, SyncError>;

    async fn create(&self, item: &E) -> Result<E, SyncError>;

    /// Remove (or close) an entity previously returned by `list`.
    /// `NotFound` when it is already gone.
    async fn delete(&self, item: &E) -> Result<(), SyncError>;

    /// Linear scan of `list`; none of the services index by name.
    async fn find_by_name(&self, name: &str) -> Result<Option<E>, SyncError> {
        let items = self.list().await?;
        Ok(items.into_iter().find(|item| item.key() == name))
    }
}
