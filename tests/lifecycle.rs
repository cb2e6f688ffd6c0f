//! File lifecycle against a real SQLite store and local blob store.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use filedrop::blob::{BlobStore, LocalBlobStore};
use filedrop::error::{Error, Result};
use filedrop::files::sweep::sweep;
use filedrop::files::{FileFilter, NewFile, NewGlobalFile, SweepReport, favorites, lifecycle, share};
use filedrop::store::Store;
use filedrop::types::{FileState, FileType, Role};

use common::TestEnv;

const ACME: &str = "org_acme";
const GLOBEX: &str = "org_globex";

fn active() -> FileFilter {
    FileFilter::default()
}

fn trash() -> FileFilter {
    FileFilter {
        trash: true,
        ..FileFilter::default()
    }
}

/// Blob store whose deletes can be switched to fail.
struct FlakyBlobs<'a> {
    inner: &'a LocalBlobStore,
    fail_deletes: AtomicBool,
}

impl BlobStore for FlakyBlobs<'_> {
    fn generate_upload_url(&self) -> Result<String> {
        self.inner.generate_upload_url()
    }

    fn download_url(&self, blob_ref: &str) -> Option<String> {
        self.inner.download_url(blob_ref)
    }

    fn delete(&self, blob_ref: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Blob("storage unavailable".into()));
        }
        self.inner.delete(blob_ref)
    }
}

/// Blob store that restores the file in the store as its blob is deleted.
struct RestoringBlobs<'a> {
    inner: &'a LocalBlobStore,
    store: &'a dyn Store,
    file_id: String,
}

impl BlobStore for RestoringBlobs<'_> {
    fn generate_upload_url(&self) -> Result<String> {
        self.inner.generate_upload_url()
    }

    fn download_url(&self, blob_ref: &str) -> Option<String> {
        self.inner.download_url(blob_ref)
    }

    fn delete(&self, blob_ref: &str) -> Result<()> {
        self.store.set_file_should_delete(&self.file_id, false)?;
        self.inner.delete(blob_ref)
    }
}

#[tokio::test]
async fn outsider_sees_nothing_and_cannot_mutate() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let mallory = env.member("mallory", GLOBEX, Role::Admin);

    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    let listed = lifecycle::list(env.store(), env.blobs(), Some(&mallory), ACME, &active()).unwrap();
    assert!(listed.is_empty());
    assert!(favorites::list(env.store(), Some(&mallory), ACME).unwrap().is_empty());

    assert!(matches!(
        lifecycle::move_to_trash(env.store(), Some(&mallory), &file.id),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        lifecycle::permanently_delete(env.store(), env.blobs(), Some(&mallory), &file.id),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        favorites::toggle(env.store(), Some(&mallory), &file.id),
        Err(Error::Forbidden)
    ));

    let blob_ref = env.upload(b"sneaky").await;
    let result = lifecycle::create(
        env.store(),
        env.blobs(),
        Some(&mallory),
        NewFile {
            name: "sneaky.txt".into(),
            file_type: FileType::Text,
            org_id: ACME.into(),
            blob_ref,
        },
    );
    assert!(matches!(result, Err(Error::Forbidden)));

    // State untouched
    let stored = env.store().get_file(&file.id).unwrap().unwrap();
    assert_eq!(stored, file);
}

#[tokio::test]
async fn unauthenticated_reads_are_empty_and_writes_fail() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    let listed = lifecycle::list(env.store(), env.blobs(), None, ACME, &active()).unwrap();
    assert!(listed.is_empty());

    assert!(matches!(
        lifecycle::move_to_trash(env.store(), None, &file.id),
        Err(Error::Unauthenticated)
    ));
    assert!(matches!(
        lifecycle::generate_upload_url(env.store(), env.blobs(), None),
        Err(Error::Unauthenticated)
    ));

    // An identity the store has never seen is no better than none
    let stranger = filedrop::types::Identity::new(common::ISSUER, "stranger");
    assert!(matches!(
        favorites::toggle(env.store(), Some(&stranger), &file.id),
        Err(Error::Unauthenticated)
    ));
}

#[tokio::test]
async fn personal_namespace_uses_subject_as_org() {
    let env = TestEnv::new();
    let alice = env.user("alice");

    let file = env.create_file(&alice, "alice", "notes.txt", FileType::Text).await;

    let listed = lifecycle::list(env.store(), env.blobs(), Some(&alice), "alice", &active()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file.id, file.id);
}

#[tokio::test]
async fn toggle_favorite_twice_restores_state() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    assert!(favorites::toggle(env.store(), Some(&alice), &file.id).unwrap());
    let favs = favorites::list(env.store(), Some(&alice), ACME).unwrap();
    assert_eq!(favs.len(), 1);
    assert_eq!(favs[0].file_id, file.id);

    assert!(!favorites::toggle(env.store(), Some(&alice), &file.id).unwrap());
    assert!(favorites::list(env.store(), Some(&alice), ACME).unwrap().is_empty());
}

#[tokio::test]
async fn favorites_are_per_user() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let bob = env.member("bob", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    favorites::toggle(env.store(), Some(&alice), &file.id).unwrap();

    assert!(favorites::list(env.store(), Some(&bob), ACME).unwrap().is_empty());

    let only_favs = FileFilter {
        favorites_only: true,
        ..FileFilter::default()
    };
    let for_alice = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &only_favs).unwrap();
    let for_bob = lifecycle::list(env.store(), env.blobs(), Some(&bob), ACME, &only_favs).unwrap();
    assert_eq!(for_alice.len(), 1);
    assert!(for_bob.is_empty());
}

#[tokio::test]
async fn trash_then_restore_round_trips() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    let trashed = lifecycle::move_to_trash(env.store(), Some(&alice), &file.id).unwrap();
    assert_eq!(trashed.state(), FileState::Trashed);

    // Idempotent
    let again = lifecycle::move_to_trash(env.store(), Some(&alice), &file.id).unwrap();
    assert_eq!(again, trashed);

    let in_trash = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &trash()).unwrap();
    assert_eq!(in_trash.len(), 1);
    let normal = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &active()).unwrap();
    assert!(normal.is_empty());

    let restored = lifecycle::restore(env.store(), Some(&alice), &file.id).unwrap();
    assert_eq!(restored, file);
    assert_eq!(env.store().get_file(&file.id).unwrap().unwrap(), file);
}

#[tokio::test]
async fn only_owner_or_org_admin_may_trash() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let bob = env.member("bob", ACME, Role::Member);
    let carol = env.member("carol", ACME, Role::Admin);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    assert!(matches!(
        lifecycle::move_to_trash(env.store(), Some(&bob), &file.id),
        Err(Error::Forbidden)
    ));
    assert!(!env.store().get_file(&file.id).unwrap().unwrap().should_delete);

    let trashed = lifecycle::move_to_trash(env.store(), Some(&carol), &file.id).unwrap();
    assert!(trashed.should_delete);

    assert!(matches!(
        lifecycle::restore(env.store(), Some(&bob), &file.id),
        Err(Error::Forbidden)
    ));
}

#[tokio::test]
async fn permanent_delete_removes_record_and_blob() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;
    favorites::toggle(env.store(), Some(&alice), &file.id).unwrap();

    lifecycle::move_to_trash(env.store(), Some(&alice), &file.id).unwrap();
    lifecycle::permanently_delete(env.store(), env.blobs(), Some(&alice), &file.id).unwrap();

    assert!(env.store().get_file(&file.id).unwrap().is_none());
    assert!(env.blobs().download_url(&file.blob_ref).is_none());
    for filter in [active(), trash()] {
        let listed = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &filter).unwrap();
        assert!(listed.is_empty());
    }
    assert!(favorites::list(env.store(), Some(&alice), ACME).unwrap().is_empty());

    assert!(matches!(
        lifecycle::permanently_delete(env.store(), env.blobs(), Some(&alice), &file.id),
        Err(Error::NotFound)
    ));
}

#[tokio::test]
async fn blob_cannot_be_reattached_by_another_member() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let bob = env.member("bob", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;

    assert!(matches!(
        lifecycle::permanently_delete(env.store(), env.blobs(), Some(&bob), &file.id),
        Err(Error::Forbidden)
    ));

    // Bob can see the blob ref, but cannot claim it as his own file
    let listed = lifecycle::list(env.store(), env.blobs(), Some(&bob), ACME, &active()).unwrap();
    let blob_ref = listed[0].file.blob_ref.clone();

    let result = lifecycle::create(
        env.store(),
        env.blobs(),
        Some(&bob),
        NewFile {
            name: "mine.pdf".into(),
            file_type: FileType::Pdf,
            org_id: "bob".into(),
            blob_ref: blob_ref.clone(),
        },
    );
    assert!(matches!(result, Err(Error::Conflict(_))));

    let result = share::create_global(
        env.store(),
        env.blobs(),
        Some(&bob),
        NewGlobalFile {
            name: "mine.pdf".into(),
            file_type: FileType::Pdf,
            blob_ref,
        },
        Duration::seconds(600),
    );
    assert!(matches!(result, Err(Error::Conflict(_))));

    let report = sweep(env.store(), env.blobs(), Utc::now() + Duration::days(1)).unwrap();
    assert_eq!(report.purged, 0);
    assert!(env.blobs().download_url(&file.blob_ref).is_some());
    let listed = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &active()).unwrap();
    assert!(listed[0].url.is_some());
}

#[tokio::test]
async fn type_filter_applies_regardless_of_query() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    env.create_file(&alice, ACME, "Report.pdf", FileType::Pdf).await;
    env.create_file(&alice, ACME, "report.csv", FileType::Csv).await;
    env.create_file(&alice, ACME, "invoice.pdf", FileType::Pdf).await;

    let pdfs = FileFilter {
        file_type: Some(FileType::Pdf),
        ..FileFilter::default()
    };
    let listed = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &pdfs).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|f| f.file.file_type == FileType::Pdf));

    let report_pdfs = FileFilter {
        query: Some("REPORT".into()),
        ..pdfs
    };
    let listed = lifecycle::list(env.store(), env.blobs(), Some(&alice), ACME, &report_pdfs).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file.name, "Report.pdf");
    assert!(listed[0].url.is_some());
}

#[tokio::test]
async fn create_rejects_missing_blob() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);

    let result = lifecycle::create(
        env.store(),
        env.blobs(),
        Some(&alice),
        NewFile {
            name: "ghost.pdf".into(),
            file_type: FileType::Pdf,
            org_id: ACME.into(),
            blob_ref: uuid::Uuid::new_v4().to_string(),
        },
    );
    assert!(matches!(result, Err(Error::BadRequest(_))));
}

#[tokio::test]
async fn sweep_purges_trash_and_second_run_is_noop() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let keep = env.create_file(&alice, ACME, "keep.pdf", FileType::Pdf).await;
    let drop_a = env.create_file(&alice, ACME, "a.pdf", FileType::Pdf).await;
    let drop_b = env.create_file(&alice, ACME, "b.pdf", FileType::Pdf).await;

    lifecycle::move_to_trash(env.store(), Some(&alice), &drop_a.id).unwrap();
    lifecycle::move_to_trash(env.store(), Some(&alice), &drop_b.id).unwrap();

    let report = sweep(env.store(), env.blobs(), Utc::now()).unwrap();
    assert_eq!(report.purged, 2);
    assert_eq!(report.failed, 0);

    assert!(env.store().get_file(&keep.id).unwrap().is_some());
    assert!(env.store().get_file(&drop_a.id).unwrap().is_none());
    assert!(env.blobs().download_url(&drop_b.blob_ref).is_none());
    assert!(env.blobs().download_url(&keep.blob_ref).is_some());

    let second = sweep(env.store(), env.blobs(), Utc::now()).unwrap();
    assert_eq!(second, SweepReport::default());
}

#[tokio::test]
async fn sweep_leaves_failed_files_for_next_run() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "a.pdf", FileType::Pdf).await;
    lifecycle::move_to_trash(env.store(), Some(&alice), &file.id).unwrap();

    let flaky = FlakyBlobs {
        inner: env.blobs(),
        fail_deletes: AtomicBool::new(true),
    };

    let report = sweep(env.store(), &flaky, Utc::now()).unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.purged, 0);
    assert!(env.store().get_file(&file.id).unwrap().is_some());

    flaky.fail_deletes.store(false, Ordering::SeqCst);
    let report = sweep(env.store(), &flaky, Utc::now()).unwrap();
    assert_eq!(report.purged, 1);
    assert!(env.store().get_file(&file.id).unwrap().is_none());
}

#[tokio::test]
async fn global_key_expires_after_ttl() {
    let env = TestEnv::new();
    let alice = env.user("alice");
    let blob_ref = env.upload(b"shared").await;
    let t0 = Utc::now();

    let share = share::create_global_at(
        env.store(),
        env.blobs(),
        Some(&alice),
        NewGlobalFile {
            name: "shared.zip".into(),
            file_type: FileType::Zip,
            blob_ref,
        },
        Duration::seconds(600),
        t0,
    )
    .unwrap();
    assert_eq!(share.file_key.len(), share::FILE_KEY_LENGTH);
    assert_eq!(share.expires_at, t0 + Duration::seconds(600));

    let at_300 = t0 + Duration::seconds(300);
    let file = share::resolve_by_key(env.store(), &share.file_key, at_300).unwrap();
    assert!(file.is_global);
    assert!(file.org_id.is_none());
    let listed = share::list_global(env.store(), env.blobs(), Some(&share.file_key), at_300).unwrap();
    assert_eq!(listed.len(), 1);

    let at_601 = t0 + Duration::seconds(601);
    assert!(matches!(
        share::resolve_by_key(env.store(), &share.file_key, at_601),
        Err(Error::NotFound)
    ));
    assert!(share::list_global(env.store(), env.blobs(), Some(&share.file_key), at_601)
        .unwrap()
        .is_empty());

    // Not reachable through org-scoped paths either
    assert!(matches!(
        lifecycle::move_to_trash(env.store(), Some(&alice), &file.id),
        Err(Error::NotFound)
    ));

    let report = sweep(env.store(), env.blobs(), at_601).unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.purged, 1);
    assert!(env.store().get_file_by_key(&share.file_key).unwrap().is_none());
}

#[tokio::test]
async fn global_listing_requires_a_key() {
    let env = TestEnv::new();
    let now = Utc::now();

    assert!(share::list_global(env.store(), env.blobs(), None, now).unwrap().is_empty());
    assert!(share::list_global(env.store(), env.blobs(), Some(""), now).unwrap().is_empty());
    assert!(share::list_global(env.store(), env.blobs(), Some("ZZZZZZ"), now)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn create_global_requires_authentication() {
    let env = TestEnv::new();
    let blob_ref = env.upload(b"shared").await;

    let result = share::create_global(
        env.store(),
        env.blobs(),
        None,
        NewGlobalFile {
            name: "shared.zip".into(),
            file_type: FileType::Zip,
            blob_ref,
        },
        Duration::seconds(600),
    );
    assert!(matches!(result, Err(Error::Unauthenticated)));
}

#[tokio::test]
async fn sweep_keeps_record_restored_mid_purge() {
    let env = TestEnv::new();
    let alice = env.member("alice", ACME, Role::Member);
    let file = env.create_file(&alice, ACME, "plan.pdf", FileType::Pdf).await;
    lifecycle::move_to_trash(env.store(), Some(&alice), &file.id).unwrap();

    let blobs = RestoringBlobs {
        inner: env.blobs(),
        store: env.store(),
        file_id: file.id.clone(),
    };
    let report = sweep(env.store(), &blobs, Utc::now()).unwrap();
    assert_eq!(report.purged, 0);
    assert_eq!(report.skipped, 1);

    let stored = env.store().get_file(&file.id).unwrap().unwrap();
    assert!(!stored.should_delete);
}
