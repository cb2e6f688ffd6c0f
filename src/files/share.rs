//! Global files: shared outside any org, addressed by a short key that
//! expires a fixed time after creation.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use super::access::resolve_user;
use super::lifecycle::{require_blob, validate_file_name, with_url};
use crate::blob::BlobStore;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{File, FileType, FileWithUrl, GlobalShare, Identity};

pub const FILE_KEY_LENGTH: usize = 6;

// No 0/O or 1/I so keys survive being read aloud
const FILE_KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const MAX_KEY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct NewGlobalFile {
    pub name: String,
    pub file_type: FileType,
    pub blob_ref: String,
}

#[must_use]
pub fn generate_file_key() -> String {
    let mut rng = rand::thread_rng();
    (0..FILE_KEY_LENGTH)
        .map(|_| FILE_KEY_ALPHABET[rng.gen_range(0..FILE_KEY_ALPHABET.len())] as char)
        .collect()
}

/// Stores a global file and returns its key. Requires only an authenticated caller.
pub fn create_global(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
    new_file: NewGlobalFile,
    ttl: Duration,
) -> Result<GlobalShare> {
    create_global_at(store, blobs, identity, new_file, ttl, Utc::now())
}

pub fn create_global_at(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    identity: Option<&Identity>,
    new_file: NewGlobalFile,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<GlobalShare> {
    let user = resolve_user(store, identity)?;

    validate_file_name(&new_file.name)?;
    require_blob(blobs, &new_file.blob_ref)?;

    let expires_at = now + ttl;

    for _ in 0..MAX_KEY_ATTEMPTS {
        let file_key = generate_file_key();
        let file = File::global(
            Uuid::new_v4().to_string(),
            new_file.name.clone(),
            new_file.file_type,
            user.id.clone(),
            file_key.clone(),
            new_file.blob_ref.clone(),
            now,
            expires_at,
        );

        match store.create_file(&file) {
            Ok(()) => {
                info!(file_id = %file.id, %expires_at, "Global file shared");
                return Ok(GlobalShare {
                    file_key,
                    expires_at,
                });
            }
            Err(Error::FileKeyCollision) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::Conflict("could not allocate a unique file key".into()))
}

/// Looks up a global file by key. Expired keys resolve to `NotFound` even
/// before the sweep has removed the record.
pub fn resolve_by_key(store: &dyn Store, file_key: &str, now: DateTime<Utc>) -> Result<File> {
    let file = store.get_file_by_key(file_key)?.ok_or(Error::NotFound)?;

    if !file.is_global || file.is_expired_at(now) {
        return Err(Error::NotFound);
    }

    Ok(file)
}

/// Resolves a key and annotates the file with a download URL.
pub fn get_file_by_key(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    file_key: &str,
    now: DateTime<Utc>,
) -> Result<FileWithUrl> {
    resolve_by_key(store, file_key, now).map(|file| with_url(blobs, file))
}

/// Lists global files. Keys are not enumerable: without a key nothing is returned.
pub fn list_global(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    file_key: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<FileWithUrl>> {
    let Some(file_key) = file_key.filter(|k| !k.is_empty()) else {
        return Ok(Vec::new());
    };

    match get_file_by_key(store, blobs, file_key, now) {
        Ok(file) => Ok(vec![file]),
        Err(Error::NotFound) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
