//! Batch walking tests: extension filtering, per-file failure isolation,
//! and archive workspace cleanup.

mod common;

use std::fs;
use std::sync::Arc;

use doc_intake::config::WalkerConfig;
use doc_intake::pipeline::Pipeline;
use doc_intake::walker;
use tempfile::TempDir;

use common::{build_zip, leftover_archive_workspaces, minimal_pdf, setup_db, FailingModel};

#[tokio::test]
async fn batch_processes_supported_files_and_skips_the_rest() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_db(&tmp).await;
    let pipeline = Pipeline::new(pool, Arc::new(FailingModel));

    let folder = tmp.path().join("inbox");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("site-notes.txt"), b"roof measurements").unwrap();
    fs::write(folder.join("leads.csv"), b"name,email\n").unwrap();
    fs::write(folder.join("scan.pdf"), minimal_pdf("hello")).unwrap();
    fs::write(folder.join("setup.exe"), b"MZ").unwrap();
    fs::write(folder.join("backup.bak"), b"x").unwrap();

    let summary = walker::process_folder(&pipeline, &folder, &WalkerConfig::default(), "tester")
        .await
        .unwrap();

    // Three supported files processed; .exe and .bak ignored silently.
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);

    let names: Vec<_> = summary.results.iter().map(|r| r.file_name.as_str()).collect();
    assert!(names.contains(&"site-notes.txt"));
    assert!(names.contains(&"leads.csv"));
    assert!(names.contains(&"scan.pdf"));
    assert!(!names.contains(&"setup.exe"));
}

#[tokio::test]
async fn one_corrupt_file_does_not_abort_the_batch() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_db(&tmp).await;
    let pipeline = Pipeline::new(pool, Arc::new(FailingModel));

    let folder = tmp.path().join("inbox");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("good.txt"), b"fine").unwrap();
    fs::write(folder.join("broken.pdf"), b"not a pdf at all").unwrap();

    let summary = walker::process_folder(&pipeline, &folder, &WalkerConfig::default(), "tester")
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let failure = summary
        .results
        .iter()
        .find(|r| r.file_name == "broken.pdf")
        .unwrap();
    assert!(failure.error.is_some());
    assert!(failure.path.ends_with("broken.pdf"));
}

#[tokio::test]
async fn archives_are_expanded_and_workspaces_cleaned_up() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_db(&tmp).await;
    let pipeline = Pipeline::new(pool, Arc::new(FailingModel));

    let folder = tmp.path().join("inbox");
    fs::create_dir_all(&folder).unwrap();
    let archive = build_zip(&[
        ("inner-notes.txt", b"inside the archive".as_slice()),
        ("nested/inner-leads.csv", b"name,email\n".as_slice()),
        ("ignored.bin", b"\x00\x01".as_slice()),
    ]);
    fs::write(folder.join("bundle.zip"), archive).unwrap();
    fs::write(folder.join("outer.txt"), b"outside").unwrap();

    let summary = walker::process_folder(&pipeline, &folder, &WalkerConfig::default(), "tester")
        .await
        .unwrap();

    // outer.txt + two supported entries inside the zip; ignored.bin skipped.
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);

    let names: Vec<_> = summary.results.iter().map(|r| r.file_name.as_str()).collect();
    assert!(names.contains(&"inner-notes.txt"));
    assert!(names.contains(&"inner-leads.csv"));
    assert!(names.contains(&"outer.txt"));

    assert!(
        leftover_archive_workspaces().is_empty(),
        "archive workspaces must be removed after the batch"
    );
}

#[tokio::test]
async fn corrupt_archive_is_a_per_file_failure_and_leaves_no_workspace() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_db(&tmp).await;
    let pipeline = Pipeline::new(pool, Arc::new(FailingModel));

    let folder = tmp.path().join("inbox");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("broken.zip"), b"definitely not a zip").unwrap();
    fs::write(folder.join("good.txt"), b"fine").unwrap();

    let summary = walker::process_folder(&pipeline, &folder, &WalkerConfig::default(), "tester")
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(leftover_archive_workspaces().is_empty());
}

#[tokio::test]
async fn nested_archives_are_recursed() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_db(&tmp).await;
    let pipeline = Pipeline::new(pool, Arc::new(FailingModel));

    let inner_zip = build_zip(&[("deep.txt", b"deepest note".as_slice())]);
    let outer_zip = build_zip(&[("inner.zip", inner_zip.as_slice())]);

    let folder = tmp.path().join("inbox");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("outer.zip"), outer_zip).unwrap();

    let summary = walker::process_folder(&pipeline, &folder, &WalkerConfig::default(), "tester")
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.results[0].file_name, "deep.txt");
    assert!(leftover_archive_workspaces().is_empty());
}
