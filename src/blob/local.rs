use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

use super::BlobStore;
use crate::error::{Error, Result};

const UPLOAD_TICKET_TTL_MINUTES: i64 = 15;
const DOWNLOAD_URL_TTL_MINUTES: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// Blob storage on the local filesystem.
///
/// Blobs live at `<root>/<aa>/<bb>/<blob_ref>`. Upload URLs carry one-time
/// tickets held in memory; download URLs are signed with a per-process secret.
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
    secret: [u8; 32],
    tickets: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);

        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tickets(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.tickets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn blob_path(&self, blob_ref: &str) -> Result<PathBuf> {
        validate_blob_ref(blob_ref)?;
        Ok(self
            .root
            .join(&blob_ref[0..2])
            .join(&blob_ref[2..4])
            .join(blob_ref))
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join("tmp").join(Uuid::new_v4().to_string())
    }

    /// Consumes an upload ticket. Each ticket is valid for a single upload.
    pub fn redeem_ticket(&self, ticket: &str) -> Result<()> {
        let now = Utc::now();
        let mut tickets = self.tickets();
        match tickets.remove(ticket) {
            Some(expires_at) if expires_at >= now => Ok(()),
            _ => Err(Error::NotFound),
        }
    }

    /// Writes a new blob and returns its reference.
    pub async fn put(&self, data: &[u8]) -> Result<String> {
        let blob_ref = Uuid::new_v4().to_string();

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        let final_path = self.blob_path(&blob_ref)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&temp_path, &final_path).await?;

        Ok(blob_ref)
    }

    /// Opens a blob for streaming.
    pub async fn open(&self, blob_ref: &str) -> Result<(BufReader<File>, u64)> {
        let path = self.blob_path(blob_ref)?;
        let file = File::open(&path).await.map_err(not_found_or_io)?;
        let size = file.metadata().await?.len();
        Ok((BufReader::new(file), size))
    }

    fn mac(&self, blob_ref: &str, expires: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Blob(format!("HMAC key error: {e}")))?;
        mac.update(blob_ref.as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn signature(&self, blob_ref: &str, expires: i64) -> Result<String> {
        let mac = self.mac(blob_ref, expires)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Checks a download URL's signature and expiry.
    #[must_use]
    pub fn verify_download(&self, blob_ref: &str, expires: i64, sig: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() > expires {
            return false;
        }
        let Ok(sig) = hex::decode(sig) else {
            return false;
        };
        self.mac(blob_ref, expires)
            .is_ok_and(|mac| mac.verify_slice(&sig).is_ok())
    }

    fn signed_download_url(&self, blob_ref: &str, now: DateTime<Utc>) -> Result<String> {
        let expires = (now + Duration::minutes(DOWNLOAD_URL_TTL_MINUTES)).timestamp();
        let sig = self.signature(blob_ref, expires)?;
        Ok(format!(
            "{}/blobs/{blob_ref}?expires={expires}&sig={sig}",
            self.base_url
        ))
    }
}

impl BlobStore for LocalBlobStore {
    fn generate_upload_url(&self) -> Result<String> {
        let now = Utc::now();
        let ticket = Uuid::new_v4().to_string();

        let mut tickets = self.tickets();
        tickets.retain(|_, expires_at| *expires_at >= now);
        tickets.insert(
            ticket.clone(),
            now + Duration::minutes(UPLOAD_TICKET_TTL_MINUTES),
        );

        Ok(format!("{}/blobs/upload/{ticket}", self.base_url))
    }

    fn download_url(&self, blob_ref: &str) -> Option<String> {
        let path = self.blob_path(blob_ref).ok()?;
        if !path.is_file() {
            return None;
        }
        self.signed_download_url(blob_ref, Utc::now()).ok()
    }

    fn delete(&self, blob_ref: &str) -> Result<()> {
        let path = self.blob_path(blob_ref)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Blob(format!("failed to delete blob {blob_ref}: {e}"))),
        }
    }
}

fn not_found_or_io(e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::NotFound
    } else {
        Error::Io(e)
    }
}

/// Blob refs are hyphenated UUIDs; anything else could escape the root.
fn validate_blob_ref(blob_ref: &str) -> Result<()> {
    Uuid::parse_str(blob_ref)
        .ok()
        .filter(|uuid| uuid.hyphenated().to_string() == blob_ref)
        .map(|_| ())
        .ok_or_else(|| Error::BadRequest("invalid blob reference".into()))
}
