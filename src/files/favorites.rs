//! Per-user, per-org starred files.

use chrono::Utc;

use super::access::{resolve_file_access, resolve_org_access};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Favorite, Identity};

/// Flips the caller's favorite on a file and returns the new state.
///
/// Two concurrent toggles that both try to insert leave one row; the loser
/// gets `Conflict` and may retry.
pub fn toggle(store: &dyn Store, identity: Option<&Identity>, file_id: &str) -> Result<bool> {
    let (user, file) = resolve_file_access(store, identity, file_id)?;
    // resolve_file_access only yields org-scoped files
    let org_id = file.org_id.ok_or(Error::NotFound)?;

    if store.get_favorite(&user.id, &org_id, &file.id)?.is_some() {
        store.delete_favorite(&user.id, &org_id, &file.id)?;
        return Ok(false);
    }

    store.insert_favorite(&Favorite {
        user_id: user.id,
        org_id,
        file_id: file.id,
        created_at: Utc::now(),
    })?;

    Ok(true)
}

/// Lists the caller's favorites in an org. Empty when the caller has no access.
pub fn list(store: &dyn Store, identity: Option<&Identity>, org_id: &str) -> Result<Vec<Favorite>> {
    match resolve_org_access(store, identity, org_id) {
        Ok(user) => store.list_favorites(&user.id, org_id),
        Err(Error::Unauthenticated | Error::Forbidden) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
