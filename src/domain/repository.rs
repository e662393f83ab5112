use async_trait::async_trait;
use uuid::Uuid;

use super::entity::user::{User, UserChanges};
use crate::error::persistence::PersistenceError;

/// Persistence operations available to the use cases.
///
/// The repository is the only component allowed to reach the store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All active users, in store order.
    async fn list(&self) -> Result<Vec<User>, PersistenceError>;

    /// Users whose id is in `ids`, each at most once. Empty `ids` yields no users.
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, PersistenceError>;

    /// Inserts a new user.
    ///
    /// Fails with [`PersistenceError::Conflict`] when the id is already taken.
    async fn save(&self, user: &User) -> Result<User, PersistenceError>;

    /// Applies the changes and returns the stored user.
    ///
    /// Fails with [`PersistenceError::NotFound`] when no user has the id.
    async fn update(&self, changes: &UserChanges) -> Result<User, PersistenceError>;

    /// Deletes by id. Returns true if a user was deleted.
    async fn remove(&self, id: Uuid) -> Result<bool, PersistenceError>;
}
