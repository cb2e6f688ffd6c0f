use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::files::access::resolve_user;
use crate::store::Store;
use crate::types::{Identity, OrgMembership, Role, User, UserProfile};

/// Returns the user bound to `identity`, creating it on first contact.
pub fn ensure_user(store: &dyn Store, identity: &Identity, name: &str) -> Result<User> {
    if let Some(user) = store.get_user_by_token_identifier(&identity.token_identifier)? {
        return Ok(user);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        token_identifier: identity.token_identifier.clone(),
        name: name.to_string(),
        image_url: None,
        memberships: Vec::new(),
        created_at: Utc::now(),
    };

    match store.create_user(&user) {
        Ok(()) => {
            info!(user_id = %user.id, subject = %identity.subject, "Created user on first contact");
            Ok(user)
        }
        // Lost a race with another first request for the same identity
        Err(Error::Conflict(_)) => store
            .get_user_by_token_identifier(&identity.token_identifier)?
            .ok_or(Error::NotFound),
        Err(e) => Err(e),
    }
}

/// Returns the caller's own user record.
pub fn me(store: &dyn Store, identity: Option<&Identity>) -> Result<User> {
    resolve_user(store, identity)
}

/// Returns the public profile of any user.
pub fn profile(store: &dyn Store, user_id: &str) -> Result<UserProfile> {
    store
        .get_user(user_id)?
        .map(|user| user.profile())
        .ok_or(Error::NotFound)
}

/// Gives the identity's user `role` in `org_id`, creating the user if needed.
pub fn set_membership(
    store: &dyn Store,
    identity: &Identity,
    org_id: &str,
    role: Role,
) -> Result<User> {
    if org_id.is_empty() {
        return Err(Error::BadRequest("org id cannot be empty".into()));
    }

    let user = ensure_user(store, identity, &identity.subject)?;
    store.upsert_membership(
        &user.id,
        &OrgMembership {
            org_id: org_id.to_string(),
            role,
        },
    )?;
    info!(user_id = %user.id, org_id, %role, "Org membership set");

    store.get_user(&user.id)?.ok_or(Error::NotFound)
}

/// Removes the identity's membership in `org_id`. Returns false if there was none.
pub fn remove_membership(store: &dyn Store, identity: &Identity, org_id: &str) -> Result<bool> {
    match store.get_user_by_token_identifier(&identity.token_identifier)? {
        Some(user) => store.delete_membership(&user.id, org_id),
        None => Ok(false),
    }
}
