//! Integration tests for root enumeration and search

mod common;

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    DriveScope, DynAsyncRead, FilePage, FileRecord, RemoteDriveClient, SortOrder,
};
use bytes::Bytes;
use common::*;
use core_documents::{DocumentId, DocumentsError};
use mockall::mock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteDriveClient for Remote {
        async fn refresh_drive_metadata(&self, user_id: i64) -> Result<()>;
        async fn search(
            &self,
            scope: &DriveScope,
            query: &str,
            cursor: Option<String>,
        ) -> Result<FilePage>;
        async fn get_file(&self, scope: &DriveScope, file_id: i64) -> Result<FileRecord>;
        async fn download(&self, scope: &DriveScope, file_id: i64) -> Result<Box<DynAsyncRead>>;
        async fn thumbnail(&self, scope: &DriveScope, file_id: i64) -> Result<Bytes>;
        async fn create_folder(&self, scope: &DriveScope, parent_id: i64, name: &str) -> Result<FileRecord>;
        async fn create_file(&self, scope: &DriveScope, parent_id: i64, name: &str) -> Result<FileRecord>;
        async fn rename(&self, scope: &DriveScope, file_id: i64, new_name: &str) -> Result<FileRecord>;
        async fn copy(&self, scope: &DriveScope, file_id: i64, target_parent_id: i64) -> Result<FileRecord>;
        async fn move_file(&self, scope: &DriveScope, file_id: i64, target_parent_id: i64) -> Result<FileRecord>;
        async fn delete(&self, scope: &DriveScope, file_id: i64) -> Result<()>;
    }
}

async fn list_and_wait(harness: &Harness, parent: &str) {
    let table = harness
        .engine
        .list_children(&DocumentId::from(parent), SortOrder::NameAsc)
        .unwrap();
    table.wait_until_loaded().await;
}

#[tokio::test]
async fn test_list_roots_one_per_account() {
    let harness = Harness::new(2);

    let roots = harness.roots.list_roots().await.unwrap();

    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].root_id, "7");
    assert_eq!(roots[0].document_id.as_str(), "7");
    assert_eq!(roots[0].title, "Drive");
    assert_eq!(roots[1].summary.as_deref(), Some("user8@example.com"));
}

#[tokio::test]
async fn test_list_roots_survives_refresh_failure() {
    let harness = Harness::new(2);
    harness.remote.fail_refresh.store(true, Ordering::SeqCst);

    let roots = harness.roots.list_roots().await.unwrap();
    assert_eq!(roots.len(), 2);

    eventually(|| harness.remote.refresh_calls.load(Ordering::SeqCst) == 2).await;
}

#[tokio::test]
async fn test_search_requires_concrete_context() {
    let harness = Harness::new(2).with_work_drive().await;

    let err = harness.roots.search("7", "report").unwrap_err();
    assert!(matches!(err, DocumentsError::SelectionRequired));

    for context in ["7", "7/-1", "7/-2"] {
        list_and_wait(&harness, context).await;
        let err = harness.roots.search("7", "report").unwrap_err();
        assert!(
            matches!(err, DocumentsError::SelectionRequired),
            "context {context}"
        );
    }

    core_async::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(harness.remote.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_rejects_other_account() {
    let harness = Harness::new(2).with_work_drive().await.with_folder_of_five().await;
    list_and_wait(&harness, "7/Work@42/1/5").await;

    assert!(matches!(
        harness.roots.search("8", "a"),
        Err(DocumentsError::SelectionRequired)
    ));
    assert_eq!(harness.remote.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_in_folder_context() {
    let harness = Harness::new(2).with_work_drive().await.with_folder_of_five().await;
    harness
        .remote
        .put_file(FileRecord::file(21, 5, DRIVE_ID, "report-2023.pdf", 1, NOW), b"")
        .await;
    harness
        .remote
        .put_file(FileRecord::file(22, 9, DRIVE_ID, "report-2024.pdf", 1, NOW), b"")
        .await;
    list_and_wait(&harness, "7/Work@42/1/5").await;

    let results = harness.roots.search("7", "report").unwrap();
    let duplicate = harness.roots.search("7", "report").unwrap();
    assert!(duplicate.is_restored());

    results.wait_until_loaded().await;
    let ids: Vec<String> = results
        .rows()
        .iter()
        .map(|row| row.document_id.to_string())
        .collect();
    assert_eq!(ids, vec!["7/Work@42/1/5/21", "7/Work@42/1/5/22"]);
    assert_eq!(harness.remote.search_calls.load(Ordering::SeqCst), 1);

    // The listing context survives a search.
    assert_eq!(
        harness.registry.listing_context(),
        Some(DocumentId::from("7/Work@42/1/5"))
    );
}

#[tokio::test]
async fn test_search_targets_shared_scope() {
    let mut remote = MockRemote::new();
    remote
        .expect_search()
        .withf(|scope, query, _cursor| {
            scope.shared_with_me && scope.drive_id == 5 && query.to_string() == "tax"
        })
        .times(1)
        .returning(|_, _, _| {
            Ok((
                vec![FileRecord::file(40, 33, 5, "tax.pdf", 3, NOW)],
                None,
            ))
        });

    let harness = Harness::with_remote(2, Arc::new(FakeRemote::new()), Some(Arc::new(remote)));
    harness
        .mirror
        .put(
            DriveScope::shared(USER_ID, 5),
            FileRecord::folder(33, 1, 5, "Team"),
        )
        .await;
    list_and_wait(&harness, "7/-2/Team@5/33").await;

    let results = harness.roots.search("7", "tax").unwrap();
    results.wait_until_loaded().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results.rows()[0].document_id.as_str(), "7/-2/Team@5/33/40");
}

#[tokio::test]
async fn test_search_network_failure_ends_session() {
    let harness = Harness::new(2).with_work_drive().await.with_folder_of_five().await;
    list_and_wait(&harness, "7/Work@42/1/5").await;
    harness.remote.network_down.store(true, Ordering::SeqCst);

    let results = harness.roots.search("7", "report").unwrap();
    results.wait_until_loaded().await;

    assert!(results.is_empty());
    assert!(!results.is_loading());
}
