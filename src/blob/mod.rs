mod local;

pub use local::LocalBlobStore;

use crate::error::Result;

/// BlobStore is the interface to raw file bytes.
///
/// File records only hold an opaque `blob_ref`; everything about where the
/// bytes live stays behind this trait.
pub trait BlobStore: Send + Sync {
    /// Returns a URL the caller can POST the file bytes to.
    fn generate_upload_url(&self) -> Result<String>;

    /// Returns a transient download URL, or `None` if the blob is missing.
    fn download_url(&self, blob_ref: &str) -> Option<String>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    fn delete(&self, blob_ref: &str) -> Result<()>;
}
