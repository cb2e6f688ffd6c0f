//! CLI integration tests for filedrop admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use filedrop::blob::LocalBlobStore;
use filedrop::files::{NewFile, lifecycle};
use filedrop::store::{SqliteStore, Store};
use filedrop::types::{FileType, Identity, Role};
use filedrop::users;
use predicates::prelude::*;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("filedrop").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn open_store(&self) -> SqliteStore {
        let store = SqliteStore::new(self.data_dir().join("filedrop.db")).expect("open store");
        store.initialize().expect("initialize store");
        store
    }
}

#[test]
fn init_writes_admin_token_once() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin token"))
        .stdout(predicate::str::contains("filedrop_"));

    let token = std::fs::read_to_string(ctx.data_dir().join(".admin_token")).unwrap();
    assert!(token.starts_with("filedrop_"));
    assert!(ctx.data_dir().join("filedrop.db").exists());

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn commands_require_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "identity",
            "--data-dir",
            &ctx.data_dir_str(),
            "--subject",
            "alice",
            "--name",
            "Alice",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));

    ctx.cmd()
        .args(["sweep", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn identity_prints_a_token() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "identity",
            "--data-dir",
            &ctx.data_dir_str(),
            "--subject",
            "alice",
            "--name",
            "Alice",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Identity token for 'alice'"))
        .stdout(predicate::str::contains("filedrop_"));

    ctx.cmd()
        .args([
            "admin",
            "identity",
            "--data-dir",
            &ctx.data_dir_str(),
            "--subject",
            "bad|subject",
            "--name",
            "Bad",
        ])
        .assert()
        .failure();
}

#[test]
fn member_sets_role() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "member",
            "--data-dir",
            &ctx.data_dir_str(),
            "--subject",
            "alice",
            "--org",
            "org_acme",
            "--role",
            "admin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now admin of org_acme"));

    let user = ctx
        .open_store()
        .get_user_by_token_identifier("filedrop|alice")
        .unwrap()
        .expect("user created");
    assert_eq!(user.role_in("org_acme"), Some(Role::Admin));

    ctx.cmd()
        .args([
            "admin",
            "member",
            "--data-dir",
            &ctx.data_dir_str(),
            "--subject",
            "alice",
            "--org",
            "org_acme",
            "--role",
            "owner",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown role"));
}

#[tokio::test]
async fn sweep_purges_trashed_files() {
    let ctx = TestContext::new();
    ctx.init().success();

    let file_id = {
        let store = ctx.open_store();
        let blobs = LocalBlobStore::new(ctx.data_dir().join("blobs"), "http://127.0.0.1:8080");
        let identity = Identity::new("filedrop", "alice");
        users::set_membership(&store, &identity, "org_acme", Role::Member).unwrap();

        let blob_ref = blobs.put(b"old data").await.unwrap();
        let file = lifecycle::create(
            &store,
            &blobs,
            Some(&identity),
            NewFile {
                name: "old.txt".into(),
                file_type: FileType::Text,
                org_id: "org_acme".into(),
                blob_ref,
            },
        )
        .unwrap();
        lifecycle::move_to_trash(&store, Some(&identity), &file.id).unwrap();
        file.id
    };

    ctx.cmd()
        .args(["sweep", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("purged: 1"));

    assert!(ctx.open_store().get_file(&file_id).unwrap().is_none());

    ctx.cmd()
        .args(["sweep", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("purged: 0"));
}

#[test]
fn invalid_config_file_is_reported() {
    let ctx = TestContext::new();
    ctx.init().success();

    std::fs::write(ctx.data_dir().join("filedrop.toml"), "colour = \"red\"\n").unwrap();

    ctx.cmd()
        .args(["sweep", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("filedrop.toml"));
}
