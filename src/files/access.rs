//! Access guard for org-scoped files.
//!
//! Every org-scoped read or mutation resolves the caller here first. The guard
//! never mutates state.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{File, Identity, User};

/// Resolves the caller into a user record.
///
/// Fails `Unauthenticated` when there is no identity or no user bound to it.
pub fn resolve_user(store: &dyn Store, identity: Option<&Identity>) -> Result<User> {
    let identity = identity.ok_or(Error::Unauthenticated)?;

    store
        .get_user_by_token_identifier(&identity.token_identifier)?
        .ok_or(Error::Unauthenticated)
}

/// Returns true if the user may act inside `org_id`.
///
/// Membership grants access. So does `org_id` appearing anywhere inside the
/// user's token identifier: personal namespaces use the subject as their org id.
#[must_use]
pub fn has_org_access(user: &User, org_id: &str) -> bool {
    user.memberships.iter().any(|m| m.org_id == org_id) || user.token_identifier.contains(org_id)
}

/// Resolves the caller and checks they may act inside `org_id`.
pub fn resolve_org_access(
    store: &dyn Store,
    identity: Option<&Identity>,
    org_id: &str,
) -> Result<User> {
    let user = resolve_user(store, identity)?;

    if !has_org_access(&user, org_id) {
        return Err(Error::Forbidden);
    }

    Ok(user)
}

/// Resolves the caller and a file they may access.
///
/// Global files have no org and are never reachable here.
pub fn resolve_file_access(
    store: &dyn Store,
    identity: Option<&Identity>,
    file_id: &str,
) -> Result<(User, File)> {
    let file = store.get_file(file_id)?.ok_or(Error::NotFound)?;
    let org_id = file.org_id.as_deref().ok_or(Error::NotFound)?;

    let user = resolve_org_access(store, identity, org_id)?;

    Ok((user, file))
}

/// Checks the user may trash, restore, or purge the file.
///
/// Owners always may; otherwise the user needs a role in the file's org that
/// can manage other people's files.
pub fn assert_can_mutate_destructive(user: &User, file: &File) -> Result<()> {
    if file.owner_user_id == user.id {
        return Ok(());
    }

    let can_manage = file
        .org_id
        .as_deref()
        .and_then(|org_id| user.role_in(org_id))
        .is_some_and(|role| role.can_manage_others_files());

    if !can_manage {
        return Err(Error::Forbidden);
    }

    Ok(())
}
