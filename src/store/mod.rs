mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every method is a single atomic unit against the database.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_token_identifier(&self, token_identifier: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn upsert_membership(&self, user_id: &str, membership: &OrgMembership) -> Result<()>;
    fn delete_membership(&self, user_id: &str, org_id: &str) -> Result<bool>;

    // Identity token operations
    fn create_token(&self, token: &IdentityToken) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<IdentityToken>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<IdentityToken>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // File operations
    fn create_file(&self, file: &File) -> Result<()>;
    fn get_file(&self, id: &str) -> Result<Option<File>>;
    fn get_file_by_key(&self, file_key: &str) -> Result<Option<File>>;
    fn list_org_files(&self, org_id: &str) -> Result<Vec<File>>;
    fn list_files_marked_for_deletion(&self) -> Result<Vec<File>>;
    fn set_file_should_delete(&self, id: &str, should_delete: bool) -> Result<bool>;
    /// Marks every global file that expired before `now` for deletion.
    fn mark_expired_global_files(&self, now: DateTime<Utc>) -> Result<usize>;
    fn delete_file(&self, id: &str) -> Result<bool>;
    /// Deletes the file only while it is still marked for deletion.
    fn delete_marked_file(&self, id: &str) -> Result<bool>;

    // Favorite operations (unique per user, org and file)
    fn insert_favorite(&self, favorite: &Favorite) -> Result<()>;
    fn get_favorite(&self, user_id: &str, org_id: &str, file_id: &str)
    -> Result<Option<Favorite>>;
    fn delete_favorite(&self, user_id: &str, org_id: &str, file_id: &str) -> Result<bool>;
    fn list_favorites(&self, user_id: &str, org_id: &str) -> Result<Vec<Favorite>>;
}
