use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FileType, Role};

/// Caller identity as issued by the identity provider.
///
/// Passed explicitly into every file operation; `None` means the caller is
/// unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub token_identifier: String,
}

impl Identity {
    #[must_use]
    pub fn new(issuer: &str, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self {
            token_identifier: format!("{issuer}|{subject}"),
            subject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembership {
    pub org_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub token_identifier: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub memberships: Vec<OrgMembership>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn role_in(&self, org_id: &str) -> Option<Role> {
        self.memberships
            .iter()
            .find(|m| m.org_id == org_id)
            .map(|m| m.role)
    }

    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Public display profile of a user, safe to show to anyone who can see their files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// An identity-provider token. Admin tokens carry no subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityToken {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Active,
    Trashed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    pub file_type: FileType,
    pub owner_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    pub should_delete: bool,
    pub is_global: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub blob_ref: String,
    pub created_at: DateTime<Utc>,
}

impl File {
    /// Builds an org-scoped file in the active state.
    #[must_use]
    pub fn org_scoped(
        id: String,
        name: String,
        file_type: FileType,
        owner_user_id: String,
        org_id: String,
        blob_ref: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            file_type,
            owner_user_id,
            org_id: Some(org_id),
            should_delete: false,
            is_global: false,
            file_key: None,
            expires_at: None,
            blob_ref,
            created_at,
        }
    }

    /// Builds a global file reachable only through `file_key` until `expires_at`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn global(
        id: String,
        name: String,
        file_type: FileType,
        owner_user_id: String,
        file_key: String,
        blob_ref: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            file_type,
            owner_user_id,
            org_id: None,
            should_delete: false,
            is_global: true,
            file_key: Some(file_key),
            expires_at: Some(expires_at),
            blob_ref,
            created_at,
        }
    }

    #[must_use]
    pub fn state(&self) -> FileState {
        if self.should_delete {
            FileState::Trashed
        } else {
            FileState::Active
        }
    }

    /// Global files past their expiry behave as absent.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// A file annotated with a transient download URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWithUrl {
    #[serde(flatten)]
    pub file: File,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub org_id: String,
    pub file_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalShare {
    pub file_key: String,
    pub expires_at: DateTime<Utc>,
}
