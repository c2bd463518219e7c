//! Exercises the repository façade against an in-memory SQLite store,
//! covering the round-trip and idempotence properties in SPEC_FULL.md §8.

use chrono::Utc;
use wiki_archivist::models::{FileChange, FileRecord, Link, LinkType, Page, Revision, RunType};
use wiki_archivist::repository::Repository;

fn sample_page(page_id: i64, title: &str) -> Page {
    Page::new(page_id, 0, title, false)
}

fn sample_revision(page_id: i64, revision_id: i64) -> Revision {
    Revision {
        revision_id,
        page_id,
        parent_revision_id: None,
        timestamp: Utc::now(),
        user: Some("Alice".to_string()),
        user_id: Some(1),
        comment: "edit".to_string(),
        size: 128,
        sha1: Some("deadbeef".to_string()),
        tags: vec![],
        content: Some("hello world".to_string()),
    }
}

#[test]
fn upserting_the_same_page_twice_is_idempotent() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    let page = sample_page(1, "Example");

    repo.upsert_pages(&[page.clone()]).unwrap();
    repo.upsert_pages(&[page.clone()]).unwrap();

    let ids = repo.stream_page_ids(false).unwrap();
    assert_eq!(ids, vec![1]);
}

#[test]
fn inserting_the_same_revision_twice_is_ignored_not_duplicated() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    repo.upsert_pages(&[sample_page(1, "Example")]).unwrap();
    let revision = sample_revision(1, 100);

    let first = repo.upsert_revisions(&[revision.clone()]).unwrap();
    let second = repo.upsert_revisions(&[revision]).unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(repo.revision_ids_for_page(1).unwrap(), vec![100]);
}

#[test]
fn replacing_outgoing_links_twice_with_same_set_is_idempotent() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    repo.upsert_pages(&[sample_page(1, "Example"), sample_page(2, "Target")]).unwrap();

    let links = vec![Link {
        source_page_id: 1,
        target_title: "Target".to_string(),
        target_page_id: Some(2),
        link_type: LinkType::Wikilink,
    }];

    repo.replace_outgoing_links(1, &links).unwrap();
    repo.replace_outgoing_links(1, &links).unwrap();

    let broken = repo.broken_links_sample(10).unwrap();
    assert!(broken.is_empty(), "Target exists, so the link should not be reported broken");
}

#[test]
fn broken_link_to_nonexistent_page_is_reported() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    repo.upsert_pages(&[sample_page(1, "Example")]).unwrap();

    let links = vec![Link {
        source_page_id: 1,
        target_title: "DoesNotExist".to_string(),
        target_page_id: None,
        link_type: LinkType::Wikilink,
    }];
    repo.replace_outgoing_links(1, &links).unwrap();

    let broken = repo.broken_links_sample(10).unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].target_title, "DoesNotExist");
}

#[test]
fn file_change_classification_round_trips_through_storage() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    let file = FileRecord {
        title: "Example.png".to_string(),
        url: "https://example.test/Example.png".to_string(),
        description_url: "https://example.test/File:Example.png".to_string(),
        sha1: "abc123".to_string(),
        size: 1024,
        width: Some(100),
        height: Some(100),
        mime_type: "image/png".to_string(),
        uploaded_at: Utc::now(),
        uploader: Some("Bob".to_string()),
        local_path: None,
        is_deleted: false,
    };

    assert_eq!(repo.classify_file_change(&file).unwrap(), FileChange::New);
    repo.record_file_change(&FileChange::New, &file).unwrap();
    assert_eq!(repo.classify_file_change(&file).unwrap(), FileChange::Unchanged);

    let mut modified = file.clone();
    modified.sha1 = "def456".to_string();
    assert_eq!(repo.classify_file_change(&modified).unwrap(), FileChange::Modified);
}

#[test]
fn deleted_page_is_excluded_from_default_page_stream() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    repo.upsert_pages(&[sample_page(1, "Example")]).unwrap();
    repo.mark_page_deleted(1, Utc::now()).unwrap();

    assert!(repo.stream_page_ids(false).unwrap().is_empty());
    assert_eq!(repo.stream_page_ids(true).unwrap(), vec![1]);
}

#[test]
fn run_lifecycle_tracks_last_successful_end_time() {
    let repo = Repository::open_in_memory().expect("in-memory repo");
    assert!(!repo.has_any_successful_run().unwrap());

    let run_id = repo.begin_run(RunType::Full).unwrap();
    repo.finish_run(
        run_id,
        wiki_archivist::models::RunStatus::Completed,
        10,
        20,
        1,
        10,
        0,
        0,
        0,
        None,
    )
    .unwrap();

    assert!(repo.has_any_successful_run().unwrap());
    assert!(repo.last_successful_run_end_time().unwrap().is_some());
}
