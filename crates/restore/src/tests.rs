use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::NaiveDate;
use dcos_backup_domain::{
    config::{RestoreConfig, RestoreSource, StoreTarget},
    model::{Environment, RestoreStatus, SnapshotKey, TrackedService},
    storage::SnapshotStore,
};
use dcos_backup_storage::FsSnapshotStore;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::{run_restore, RestoreError};

#[derive(Clone, Default)]
struct Received(Arc<Mutex<Vec<(String, String)>>>);

impl Received {
    fn paths(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn bodies(&self) -> Vec<Value> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| serde_json::from_str(body).unwrap())
            .collect()
    }

    fn raw_bodies(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

/// Target service that records every POST and rejects the item whose id is
/// `reject_id` with a 400.
fn spawn_target(reject_id: Option<&'static str>) -> (String, Received) {
    let received = Received::default();
    let recorder = received.clone();
    let server = HttpServer::new(move || {
        let recorder = recorder.clone();
        App::new().default_service(web::to(move |req: HttpRequest, body: String| {
            let recorder = recorder.clone();
            async move {
                let item: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                let rejected = reject_id.is_some() && item["id"].as_str() == reject_id;
                recorder
                    .0
                    .lock()
                    .unwrap()
                    .push((req.path().to_string(), body));
                if rejected {
                    HttpResponse::BadRequest().json(json!({"message": "Object is not valid"}))
                } else {
                    HttpResponse::Created().json(json!({"ok": true}))
                }
            }
        }))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind fake target");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    (format!("http://{addr}"), received)
}

/// Writes `body` into a fresh temp dir and returns the dir with the file path.
fn snapshot_file(name: &str, body: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write snapshot file");
    (dir, path)
}

#[actix_web::test]
async fn restores_marathon_file_without_uris() {
    let (url, received) = spawn_target(None);
    let (_dir, path) = snapshot_file(
        "marathon.json",
        br#"{"apps":[{"id":"/web","uris":["http://x/a.tgz"],"cpus":0.5},{"id":"/db"}]}"#,
    );

    let config =
        RestoreConfig::new(TrackedService::Marathon, &url, RestoreSource::File(path))
            .unwrap();
    let report = run_restore(&config, reqwest::Client::new())
        .await
        .expect("restore runs");

    assert_eq!(report.submitted(), 2);
    assert_eq!(received.paths(), vec!["/v2/apps", "/v2/apps"]);
    assert_eq!(
        received.bodies(),
        vec![json!({"id": "/web", "cpus": 0.5}), json!({"id": "/db"})]
    );
}

#[actix_web::test]
async fn rejected_item_is_recorded_and_the_rest_still_posted() {
    let (url, received) = spawn_target(Some("job2"));
    let (_dir, path) =
        snapshot_file("metronome.json", br#"[{"id":"job1"},{"id":"job2"},{"id":"job3"}]"#);

    let config =
        RestoreConfig::new(TrackedService::Metronome, &url, RestoreSource::File(path))
            .unwrap();
    let report = run_restore(&config, reqwest::Client::new())
        .await
        .expect("restore runs");

    assert_eq!(received.paths().len(), 3);
    assert!(received
        .paths()
        .iter()
        .all(|path| path == "/v0/scheduled-jobs"));
    assert_eq!(report.submitted(), 2);
    assert_eq!(report.failed(), 1);
    match &report.outcomes[1].status {
        RestoreStatus::Rejected { status, body } => {
            assert_eq!(*status, 400);
            assert!(body.contains("Object is not valid"));
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[actix_web::test]
async fn submission_path_override_is_used() {
    let (url, received) = spawn_target(None);
    let (_dir, path) = snapshot_file("jobs.json", br#"[{"id":"job1"}]"#);

    let config =
        RestoreConfig::new(TrackedService::Metronome, &url, RestoreSource::File(path))
            .unwrap()
            .with_submission_path(Some("/v1/jobs"))
            .unwrap();
    run_restore(&config, reqwest::Client::new())
        .await
        .expect("restore runs");

    assert_eq!(received.paths(), vec!["/v1/jobs"]);
}

#[actix_web::test]
async fn restores_stored_snapshot_by_key() {
    let (url, received) = spawn_target(None);
    let root = TempDir::new().unwrap();
    let key = SnapshotKey::new(
        Environment::parse("prod").unwrap(),
        TrackedService::Marathon,
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    );
    FsSnapshotStore::new(root.path())
        .put(&key, br#"{"apps":[{"id":"/a","uris":[]}]}"#.to_vec())
        .await
        .unwrap();

    let config = RestoreConfig::new(
        TrackedService::Marathon,
        &url,
        RestoreSource::Stored {
            store: StoreTarget::Directory(root.path().to_path_buf()),
            key,
        },
    )
    .unwrap();
    let report = run_restore(&config, reqwest::Client::new())
        .await
        .expect("restore runs");

    assert!(report.is_clean());
    assert_eq!(received.bodies(), vec![json!({"id": "/a"})]);
}

#[actix_web::test]
async fn placeholder_snapshot_posts_nothing() {
    let (url, received) = spawn_target(None);
    let (_dir, path) = snapshot_file("placeholder.json", b"null");

    let config =
        RestoreConfig::new(TrackedService::Metronome, &url, RestoreSource::File(path))
            .unwrap();
    let err = run_restore(&config, reqwest::Client::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RestoreError::Shape(_)));
    assert!(received.paths().is_empty());
}

#[actix_web::test]
async fn unreachable_target_fails_each_item() {
    let (_dir, path) = snapshot_file("unreachable.json", br#"[{"id":"job1"},{"id":"job2"}]"#);

    // Port 9 (discard) is not listening on loopback.
    let config = RestoreConfig::new(
        TrackedService::Metronome,
        "http://127.0.0.1:9",
        RestoreSource::File(path),
    )
    .unwrap();
    let report = run_restore(&config, reqwest::Client::new())
        .await
        .expect("restore runs");

    assert_eq!(report.failed(), 2);
    assert!(report
        .outcomes
        .iter()
        .all(|outcome| matches!(outcome.status, RestoreStatus::Transport { .. })));
}

#[actix_web::test]
async fn items_are_resubmitted_with_their_original_text() {
    let (url, received) = spawn_target(None);
    let (_dir, path) = snapshot_file(
        "marathon.json",
        br#"{"apps":[{"id":"/a","z":1,"uris":["x"],"cpus":0.10,"big":123456789012345678901234}]}"#,
    );

    let config =
        RestoreConfig::new(TrackedService::Marathon, &url, RestoreSource::File(path)).unwrap();
    run_restore(&config, reqwest::Client::new())
        .await
        .expect("restore runs");

    assert_eq!(
        received.raw_bodies(),
        vec![r#"{"id":"/a","z":1,"cpus":0.10,"big":123456789012345678901234}"#]
    );
}
