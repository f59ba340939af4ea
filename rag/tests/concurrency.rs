mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{BagOfWords, Echo, Gated, SlowStore, Workspace};
use quarry_rag::{
    BuildStage, DirectorySnapshotStore, Pipeline, PipelineState, RagError, SnapshotStore,
};
use tokio::sync::Notify;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn questions_during_a_build_use_the_previous_snapshot() {
    let ws = Workspace::new();
    ws.write("policy.txt", "Refunds are issued within fourteen days.");
    let embedder = Gated::new();
    let gate = embedder.gate.clone();
    let config = ws.config().top_k(1).build();
    let pipeline = Pipeline::open(embedder, Echo::new(), config).await.unwrap();
    pipeline.build_from_directory(ws.docs()).await.unwrap();
    let before = pipeline.ask("When are refunds issued?").await.unwrap();

    ws.write("update.txt", "This gated update changes the warranty terms.");
    gate.arm();
    let builder = pipeline.clone();
    let docs = ws.docs();
    let build = tokio::spawn(async move { builder.build_from_directory(docs).await });
    gate.entered.notified().await;

    assert_eq!(pipeline.state(), PipelineState::Building);
    assert!(matches!(
        pipeline.build_from_directory(ws.docs()).await,
        Err(RagError::BuildInProgress)
    ));
    assert!(matches!(
        pipeline.build_from_uploads(Vec::new()).await,
        Err(RagError::BuildInProgress)
    ));
    assert_eq!(pipeline.snapshot_version(), Some(1));
    assert_eq!(pipeline.ask("When are refunds issued?").await.unwrap(), before);

    gate.release.notify_one();
    let report = build.await.unwrap().unwrap();

    assert!(report.success);
    assert_eq!(report.snapshot_version, Some(2));
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(pipeline.snapshot_version(), Some(2));
    let after = pipeline.ask("What changed in the warranty terms?").await.unwrap();
    assert_eq!(after.citations[0].source, "update.txt");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_questions_get_identical_answers() {
    let ws = Workspace::new();
    ws.write(
        "policy.txt",
        "Shipping takes five business days.\u{c}Refunds are issued within fourteen days.\u{c}\
         Support answers email within one day.",
    );
    let pipeline = Pipeline::open(BagOfWords::new(), Echo::new(), ws.config().build())
        .await
        .unwrap();
    pipeline.build_from_directory(ws.docs()).await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.ask("How long until refunds are issued?").await })
        })
        .collect();

    let mut answers = Vec::new();
    for task in tasks {
        answers.push(task.await.unwrap().unwrap());
    }
    assert!(answers.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(answers[0].citations[0].page, Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_save_outlives_a_cancelled_build() {
    let ws = Workspace::new();
    ws.write("policy.txt", "Refunds are issued within fourteen days.");
    let store = SlowStore::new(&ws.index(), Duration::from_millis(300));
    let pipeline = Pipeline::with_store(BagOfWords::new(), Echo::new(), store, ws.config().build())
        .await
        .unwrap();

    let saving = Arc::new(Notify::new());
    let signal = saving.clone();
    let builder = pipeline.clone();
    let docs = ws.docs();
    let build = tokio::spawn(async move {
        builder
            .build_from_directory_with_progress(docs, move |progress| {
                if matches!(progress.stage, BuildStage::Saving) {
                    signal.notify_one();
                }
            })
            .await
    });
    saving.notified().await;
    build.abort();
    assert!(build.await.unwrap_err().is_cancelled());
    assert_eq!(pipeline.state(), PipelineState::Building);

    tokio::time::timeout(Duration::from_secs(5), async {
        while pipeline.state() == PipelineState::Building {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(pipeline.snapshot_version(), Some(1));
    let on_disk = DirectorySnapshotStore::new(ws.index()).load().unwrap().unwrap();
    assert_eq!(on_disk.version(), 1);
}
