//! Org-scoped file lifecycle: create, trash, restore, purge and list.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::access::{
    assert_can_mutate_destructive, resolve_file_access, resolve_org_access, resolve_user,
};
use crate::blob::BlobStore;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{File, FileType, FileWithUrl, Identity};

pub const MAX_FILE_NAME_LEN: usize = 200;

/// Input for creating an org-scoped file. The blob must already be uploaded.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub file_type: FileType,
    pub org_id: String,
    pub blob_ref: String,
}

/// Filters for listing an org's files.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Case-insensitive substring match on the name.
    pub query: Option<String>,
    pub file_type: Option<FileType>,
    /// `true` selects the trash view, `false` the normal view.
    pub trash: bool,
    pub favorites_only: bool,
}

pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest("file name cannot be empty".into()));
    }
    if name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(Error::BadRequest(format!(
            "file name cannot exceed {MAX_FILE_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn require_blob(blobs: &dyn BlobStore, blob_ref: &str) -> Result<()> {
    if blobs.download_url(blob_ref).is_none() {
        return Err(Error::BadRequest("blob has not been uploaded".into()));
    }
    Ok(())
}

/// Returns an upload URL for the blob store. Any authenticated user may upload.
pub fn generate_upload_url(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
) -> Result<String> {
    resolve_user(store, identity)?;
    blobs.generate_upload_url()
}

/// Creates an active file in `new_file.org_id`, owned by the caller.
pub fn create(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
    new_file: NewFile,
) -> Result<File> {
    let user = resolve_org_access(store, identity, &new_file.org_id)?;

    validate_file_name(&new_file.name)?;
    require_blob(blobs, &new_file.blob_ref)?;

    let file = File::org_scoped(
        Uuid::new_v4().to_string(),
        new_file.name,
        new_file.file_type,
        user.id,
        new_file.org_id,
        new_file.blob_ref,
        Utc::now(),
    );

    store.create_file(&file)?;

    Ok(file)
}

/// Moves a file to the trash. Trashing a trashed file succeeds without change.
pub fn move_to_trash(store: &dyn Store, identity: Option<&Identity>, file_id: &str) -> Result<File> {
    set_trashed(store, identity, file_id, true)
}

/// Restores a trashed file. Restoring an active file succeeds without change.
pub fn restore(store: &dyn Store, identity: Option<&Identity>, file_id: &str) -> Result<File> {
    set_trashed(store, identity, file_id, false)
}

fn set_trashed(
    store: &dyn Store,
    identity: Option<&Identity>,
    file_id: &str,
    should_delete: bool,
) -> Result<File> {
    let (user, mut file) = resolve_file_access(store, identity, file_id)?;
    assert_can_mutate_destructive(&user, &file)?;

    if file.should_delete != should_delete {
        if !store.set_file_should_delete(&file.id, should_delete)? {
            return Err(Error::NotFound);
        }
        file.should_delete = should_delete;
    }

    Ok(file)
}

/// Deletes the blob, then the record. Safe to retry if the record delete fails.
pub fn permanently_delete(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
    file_id: &str,
) -> Result<()> {
    let (user, file) = resolve_file_access(store, identity, file_id)?;
    assert_can_mutate_destructive(&user, &file)?;

    purge(store, blobs, &file)?;
    info!(file_id = %file.id, user_id = %user.id, "File permanently deleted");

    Ok(())
}

/// Blob-then-record deletion. Returns false if the record was already gone.
fn purge(store: &dyn Store, blobs: &dyn BlobStore, file: &File) -> Result<bool> {
    blobs.delete(&file.blob_ref)?;
    store.delete_file(&file.id)
}

/// Lists an org's files. Unauthenticated or unauthorized callers get an empty list.
pub fn list(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
    org_id: &str,
    filter: &FileFilter,
) -> Result<Vec<FileWithUrl>> {
    let user = match resolve_org_access(store, identity, org_id) {
        Ok(user) => user,
        Err(Error::Unauthenticated | Error::Forbidden) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = store.list_org_files(org_id)?;

    if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
        let query = query.to_lowercase();
        files.retain(|f| f.name.to_lowercase().contains(&query));
    }

    if filter.favorites_only {
        let favorites = store.list_favorites(&user.id, org_id)?;
        files.retain(|f| favorites.iter().any(|fav| fav.file_id == f.id));
    }

    files.retain(|f| f.should_delete == filter.trash);

    if let Some(file_type) = filter.file_type {
        files.retain(|f| f.file_type == file_type);
    }

    Ok(files.into_iter().map(|file| with_url(blobs, file)).collect())
}

/// Returns a download URL for a file the caller can access.
pub fn file_url(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
    file_id: &str,
) -> Result<Option<String>> {
    let (_, file) = resolve_file_access(store, identity, file_id)?;
    Ok(blobs.download_url(&file.blob_ref))
}

pub(crate) fn with_url(blobs: &dyn BlobStore, file: File) -> FileWithUrl {
    let url = blobs.download_url(&file.blob_ref);
    if url.is_none() {
        warn!(file_id = %file.id, "No download URL for file blob");
    }
    FileWithUrl { file, url }
}
