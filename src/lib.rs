//! # filedrop
//!
//! A multi-tenant file sharing server, usable both as a standalone binary and
//! as a library.
//!
//! Files belong to an organization, move through a soft-delete trash before
//! being purged by a background sweep, can be favorited per user, and can be
//! shared outside any org under a short key that expires.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! filedrop = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use filedrop::blob::LocalBlobStore;
//! use filedrop::config::ServerConfig;
//! use filedrop::server::{AppState, create_router};
//! use filedrop::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     blobs: Arc::new(LocalBlobStore::new(config.blob_dir(), config.base_url())),
//!     config,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `filedrop` binary. Disable with `default-features = false`.

pub mod auth;
pub mod blob;
pub mod config;
pub mod error;
pub mod files;
pub mod server;
pub mod store;
pub mod types;
pub mod users;
