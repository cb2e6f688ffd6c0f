//! Shared fixtures for integration tests.
//!
//! Each test gets its own temp directory holding a SQLite database and a blob
//! root, so tests can run in parallel safely.

#![allow(dead_code)]

use std::sync::Arc;

use filedrop::blob::LocalBlobStore;
use filedrop::config::ServerConfig;
use filedrop::files::{self, NewFile};
use filedrop::server::AppState;
use filedrop::store::{SqliteStore, Store};
use filedrop::types::{File, FileType, Identity, Role};
use filedrop::users;
use tempfile::TempDir;

pub const ISSUER: &str = "filedrop";
pub const BASE_URL: &str = "http://files.test";

pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub blobs: Arc<LocalBlobStore>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("filedrop.db")).expect("open store");
        store.initialize().expect("initialize store");
        let blobs = LocalBlobStore::new(temp_dir.path().join("blobs"), BASE_URL);

        Self {
            temp_dir,
            store: Arc::new(store),
            blobs: Arc::new(blobs),
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn blobs(&self) -> &LocalBlobStore {
        &self.blobs
    }

    /// An identity whose user exists, with no memberships.
    pub fn user(&self, subject: &str) -> Identity {
        let identity = Identity::new(ISSUER, subject);
        users::ensure_user(self.store(), &identity, subject).expect("ensure user");
        identity
    }

    /// An identity holding `role` in `org_id`.
    pub fn member(&self, subject: &str, org_id: &str, role: Role) -> Identity {
        let identity = Identity::new(ISSUER, subject);
        users::set_membership(self.store(), &identity, org_id, role).expect("set membership");
        identity
    }

    pub async fn upload(&self, contents: &[u8]) -> String {
        self.blobs.put(contents).await.expect("put blob")
    }

    pub async fn create_file(
        &self,
        identity: &Identity,
        org_id: &str,
        name: &str,
        file_type: FileType,
    ) -> File {
        let blob_ref = self.upload(name.as_bytes()).await;
        files::lifecycle::create(
            self.store(),
            self.blobs(),
            Some(identity),
            NewFile {
                name: name.to_string(),
                file_type,
                org_id: org_id.to_string(),
                blob_ref,
            },
        )
        .expect("create file")
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            store: Arc::clone(&self.store) as Arc<dyn Store>,
            blobs: Arc::clone(&self.blobs),
            config: ServerConfig {
                data_dir: self.temp_dir.path().to_path_buf(),
                public_base_url: Some(BASE_URL.to_string()),
                ..ServerConfig::default()
            },
        })
    }
}
