//! End-to-end pipeline tests against a scripted HTTP transport and the
//! real filesystem bridge.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::BridgeError;
use bridge_traits::{FetchedBody, HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_manifest::AssetRecord;
use core_sync::{
    NoopPostProcessor, SyncConfig, SyncError, SyncEvent, SyncOrchestrator, SyncPhase,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::broadcast;

const SCRIPT_URL: &str = "https://script.example/exec";
const MANIFEST_URL: &str = "https://sheets.example/manifest.csv";
const FOLDER_ID: &str = "1pKIJrvFdqV3zNfmC8rYZzgt6yGeWsrE7";

// ============================================================================
// Scripted transport
// ============================================================================

/// Reader that yields one chunk, then stays pending until dropped.
struct StallingReader {
    first: Option<Bytes>,
}

impl tokio::io::AsyncRead for StallingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.first.take() {
            Some(chunk) => {
                buf.put_slice(&chunk);
                Poll::Ready(Ok(()))
            }
            None => Poll::Pending,
        }
    }
}

struct RouterHttpClient {
    script_status: u16,
    script_body: String,
    manifest_csv: String,
    assets: HashMap<String, Vec<u8>>,
    stalled_assets: HashSet<String>,
    trigger_delay: Duration,
    trigger_count: AtomicUsize,
    manifest_fetches: AtomicUsize,
}

impl RouterHttpClient {
    fn new(manifest_csv: &str) -> Self {
        Self {
            script_status: 200,
            script_body: r#"{"status":"ok"}"#.to_string(),
            manifest_csv: manifest_csv.to_string(),
            assets: HashMap::new(),
            stalled_assets: HashSet::new(),
            trigger_delay: Duration::ZERO,
            trigger_count: AtomicUsize::new(0),
            manifest_fetches: AtomicUsize::new(0),
        }
    }

    fn with_asset(mut self, url: &str, body: &[u8]) -> Self {
        self.assets.insert(url.to_string(), body.to_vec());
        self
    }

    fn with_stalled_asset(mut self, url: &str) -> Self {
        self.stalled_assets.insert(url.to_string());
        self
    }

    fn with_script_error(mut self, message: &str) -> Self {
        self.script_body = format!(r#"{{"status":"error","message":"{}"}}"#, message);
        self
    }

    fn with_trigger_delay(mut self, delay: Duration) -> Self {
        self.trigger_delay = delay;
        self
    }
}

#[async_trait]
impl HttpClient for RouterHttpClient {
    async fn execute(&self, request: HttpRequest) -> bridge_traits::Result<HttpResponse> {
        if request.url.starts_with(SCRIPT_URL) {
            self.trigger_count.fetch_add(1, Ordering::SeqCst);
            if !self.trigger_delay.is_zero() {
                tokio::time::sleep(self.trigger_delay).await;
            }
            return Ok(HttpResponse {
                status: self.script_status,
                headers: HashMap::new(),
                body: Bytes::from(self.script_body.clone()),
            });
        }
        if request.url == MANIFEST_URL {
            self.manifest_fetches.fetch_add(1, Ordering::SeqCst);
            return Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from(self.manifest_csv.clone()),
            });
        }
        Err(BridgeError::OperationFailed(format!(
            "unexpected url: {}",
            request.url
        )))
    }

    async fn fetch(&self, url: String) -> bridge_traits::Result<FetchedBody> {
        if self.stalled_assets.contains(&url) {
            return Ok(FetchedBody {
                content_length: Some(1024),
                reader: Box::new(StallingReader {
                    first: Some(Bytes::from_static(b"partial")),
                }),
            });
        }
        match self.assets.get(&url) {
            Some(body) => Ok(FetchedBody {
                content_length: Some(body.len() as u64),
                reader: Box::new(std::io::Cursor::new(body.clone())),
            }),
            None => Err(BridgeError::OperationFailed(format!("404 for {}", url))),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct TestEnv {
    root: PathBuf,
    config: SyncConfig,
}

impl TestEnv {
    fn new() -> Self {
        let root =
            std::env::temp_dir().join(format!("core-sync-pipeline-{}", uuid::Uuid::new_v4()));
        let config = SyncConfig {
            folder_id: FOLDER_ID.to_string(),
            script_url: SCRIPT_URL.to_string(),
            manifest_url: MANIFEST_URL.to_string(),
            manifest_path: root.join("manifest.csv"),
            dest_root: root.join("assets"),
            trigger_timeout_secs: 10,
            download_timeout_secs: 10,
            progress_hold_ms: 0,
            sprite: Default::default(),
        };
        Self { root, config }
    }

    async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.root).await;
    }
}

fn orchestrator(env: &TestEnv, http: RouterHttpClient) -> SyncOrchestrator {
    SyncOrchestrator::new(
        env.config.clone(),
        Arc::new(http),
        Arc::new(TokioFileSystem),
        Arc::new(NoopPostProcessor),
    )
}

/// Receive events until `matcher` returns `Some`, or panic after 5s.
async fn wait_for_event<T>(
    rx: &mut broadcast::Receiver<SyncEvent>,
    matcher: impl Fn(&SyncEvent) -> Option<T>,
) -> T {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if let Some(value) = matcher(&event) {
                return value;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_happy_path_downloads_and_completes() {
    let env = TestEnv::new();
    let csv = "name,link,path\n\
               foo.png,https://assets.example/foo.png,/Art/Icons\n\
               data.txt,https://assets.example/data.txt,/Art\n";
    let http = RouterHttpClient::new(csv)
        .with_asset("https://assets.example/foo.png", b"png-bytes")
        .with_asset("https://assets.example/data.txt", b"text");

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();

    let run_id = orchestrator.start_sync().await.unwrap();

    let (downloaded, failed, deleted) = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Completed {
            run_id: id,
            downloaded,
            failed,
            deleted,
        } if *id == run_id => Some((*downloaded, *failed, *deleted)),
        _ => None,
    })
    .await;

    assert_eq!((downloaded, failed, deleted), (2, 0, 0));
    assert_eq!(orchestrator.status().phase().await, SyncPhase::Completed);

    let foo = tokio::fs::read(env.config.dest_root.join("Icons/foo.png"))
        .await
        .unwrap();
    assert_eq!(foo, b"png-bytes");
    let data = tokio::fs::read(env.config.dest_root.join("data.txt"))
        .await
        .unwrap();
    assert_eq!(data, b"text");

    // Raw manifest text persisted alongside
    let manifest = tokio::fs::read_to_string(&env.config.manifest_path)
        .await
        .unwrap();
    assert!(manifest.contains("foo.png"));

    // Persisted manifest round-trips through the local loader
    let records = orchestrator.local_manifest().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "foo.png");
    assert_eq!(records[0].relative_path, "/Icons");

    env.cleanup().await;
}

#[tokio::test]
async fn test_local_manifest_empty_before_any_run() {
    let env = TestEnv::new();
    let orchestrator = orchestrator(&env, RouterHttpClient::new("name,link,path\n"));

    let records = orchestrator.local_manifest().await.unwrap();
    assert!(records.is_empty());

    env.cleanup().await;
}

#[tokio::test]
async fn test_orphans_deleted_after_run() {
    let env = TestEnv::new();
    tokio::fs::create_dir_all(env.config.dest_root.join("Icons"))
        .await
        .unwrap();
    tokio::fs::write(env.config.dest_root.join("old.png"), b"stale")
        .await
        .unwrap();
    tokio::fs::write(env.config.dest_root.join("Icons/foo.png"), b"stale")
        .await
        .unwrap();

    let csv = "name,link,path\nfoo.png,https://assets.example/foo.png,/Art/Icons\n";
    let http =
        RouterHttpClient::new(csv).with_asset("https://assets.example/foo.png", b"fresh");

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();
    orchestrator.start_sync().await.unwrap();

    let deleted = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Completed { deleted, .. } => Some(*deleted),
        _ => None,
    })
    .await;

    assert_eq!(deleted, 1);
    assert!(!env.config.dest_root.join("old.png").exists());
    let foo = tokio::fs::read(env.config.dest_root.join("Icons/foo.png"))
        .await
        .unwrap();
    assert_eq!(foo, b"fresh");

    env.cleanup().await;
}

#[tokio::test]
async fn test_script_error_fails_run_before_manifest() {
    let env = TestEnv::new();
    let http = Arc::new(RouterHttpClient::new("name,link,path\n").with_script_error("bad folder"));

    let orchestrator = SyncOrchestrator::new(
        env.config.clone(),
        http.clone(),
        Arc::new(TokioFileSystem),
        Arc::new(NoopPostProcessor),
    );
    let mut rx = orchestrator.subscribe();
    orchestrator.start_sync().await.unwrap();

    let message = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Failed { message, .. } => Some(message.clone()),
        _ => None,
    })
    .await;

    assert_eq!(message, "Error: bad folder");
    assert_eq!(orchestrator.status().phase().await, SyncPhase::Failed);
    assert_eq!(http.manifest_fetches.load(Ordering::SeqCst), 0);
    assert!(!env.config.manifest_path.exists());

    env.cleanup().await;
}

#[tokio::test]
async fn test_second_start_rejected_while_running() {
    let env = TestEnv::new();
    let http = RouterHttpClient::new("name,link,path\n")
        .with_trigger_delay(Duration::from_millis(300));

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();
    orchestrator.start_sync().await.unwrap();

    // Wait until the run task is past Idle, then a second start must bounce
    wait_for_event(&mut rx, |e| match e {
        SyncEvent::PhaseChanged { phase, .. } if *phase == SyncPhase::AwaitingRemote => Some(()),
        _ => None,
    })
    .await;

    let err = orchestrator.start_sync().await.unwrap_err();
    assert!(matches!(err, SyncError::SyncInProgress));

    wait_for_event(&mut rx, |e| match e {
        SyncEvent::Completed { .. } => Some(()),
        _ => None,
    })
    .await;

    // A finished run frees the slot
    orchestrator.start_sync().await.unwrap();
    wait_for_event(&mut rx, |e| match e {
        SyncEvent::Completed { .. } => Some(()),
        _ => None,
    })
    .await;

    env.cleanup().await;
}

#[tokio::test]
async fn test_back_to_back_starts_accept_only_one_run() {
    let env = TestEnv::new();
    let http = RouterHttpClient::new("name,link,path\n")
        .with_trigger_delay(Duration::from_millis(200));

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();

    // No await between the two calls beyond the calls themselves: the
    // first run's task may not even be scheduled yet, the second start
    // must still bounce off the claimed run slot
    let first = orchestrator.start_sync().await.unwrap();
    let second = orchestrator.start_sync().await;
    assert!(matches!(second, Err(SyncError::SyncInProgress)));

    // The surviving run keeps its slot and finishes normally
    let finished = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Completed { run_id, .. } => Some(*run_id),
        _ => None,
    })
    .await;
    assert_eq!(finished, first);

    env.cleanup().await;
}

#[tokio::test]
async fn test_cancel_after_last_download_skips_reconcile() {
    let env = TestEnv::new();
    tokio::fs::create_dir_all(&env.config.dest_root).await.unwrap();
    tokio::fs::write(env.config.dest_root.join("orphan.png"), b"stale")
        .await
        .unwrap();

    let csv = "name,link,path\nonly.png,https://assets.example/only.png,/Art\n";
    let http = RouterHttpClient::new(csv).with_asset("https://assets.example/only.png", b"ok");

    // A progress hold keeps the final download's completion visible long
    // enough to land a cancel before the loop hands off to reconciliation
    let mut config = env.config.clone();
    config.progress_hold_ms = 500;
    let orchestrator = SyncOrchestrator::new(
        config,
        Arc::new(http),
        Arc::new(TokioFileSystem),
        Arc::new(NoopPostProcessor),
    );
    let mut rx = orchestrator.subscribe();
    let run_id = orchestrator.start_sync().await.unwrap();

    wait_for_event(&mut rx, |e| match e {
        SyncEvent::AssetCompleted { name } if name == "only.png" => Some(()),
        _ => None,
    })
    .await;

    assert!(orchestrator.cancel().await);

    let completed = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Cancelled {
            run_id: id,
            completed,
        } if *id == run_id => Some(*completed),
        _ => None,
    })
    .await;

    assert_eq!(completed, 1);
    assert_eq!(orchestrator.status().phase().await, SyncPhase::Cancelled);

    // Reconciliation never ran: the orphan is untouched
    assert!(env.config.dest_root.join("orphan.png").exists());
    assert!(env.config.dest_root.join("only.png").exists());

    env.cleanup().await;
}

#[tokio::test]
async fn test_cancellation_during_download_skips_reconcile() {
    let env = TestEnv::new();
    tokio::fs::create_dir_all(&env.config.dest_root).await.unwrap();
    tokio::fs::write(env.config.dest_root.join("orphan.png"), b"stale")
        .await
        .unwrap();

    let csv = "name,link,path\n\
               first.png,https://assets.example/first.png,/Art\n\
               stuck.png,https://assets.example/stuck.png,/Art\n";
    let http = RouterHttpClient::new(csv)
        .with_asset("https://assets.example/first.png", b"ok")
        .with_stalled_asset("https://assets.example/stuck.png");

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();
    let run_id = orchestrator.start_sync().await.unwrap();

    // First asset finishes; the second stalls mid-transfer
    wait_for_event(&mut rx, |e| match e {
        SyncEvent::AssetCompleted { name } if name == "first.png" => Some(()),
        _ => None,
    })
    .await;

    assert!(orchestrator.cancel().await);

    let completed = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Cancelled {
            run_id: id,
            completed,
        } if *id == run_id => Some(*completed),
        _ => None,
    })
    .await;

    assert_eq!(completed, 1);
    let snapshot = orchestrator.status().snapshot().await;
    assert_eq!(snapshot.phase, SyncPhase::Cancelled);
    assert!(snapshot.in_flight.is_empty());
    assert!(snapshot.progress.is_empty());

    // Completed download stays, orphan survives because reconcile was skipped
    assert!(env.config.dest_root.join("first.png").exists());
    assert!(env.config.dest_root.join("orphan.png").exists());
    assert!(!env.config.dest_root.join("stuck.png").exists());

    env.cleanup().await;
}

#[tokio::test]
async fn test_asset_failure_does_not_abort_run() {
    let env = TestEnv::new();
    let csv = "name,link,path\n\
               missing.png,https://assets.example/missing.png,/Art\n\
               good.png,https://assets.example/good.png,/Art\n";
    let http = RouterHttpClient::new(csv).with_asset("https://assets.example/good.png", b"ok");

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();
    orchestrator.start_sync().await.unwrap();

    let (downloaded, failed) = wait_for_event(&mut rx, |e| match e {
        SyncEvent::Completed {
            downloaded, failed, ..
        } => Some((*downloaded, *failed)),
        _ => None,
    })
    .await;

    assert_eq!((downloaded, failed), (1, 1));
    assert!(env.config.dest_root.join("good.png").exists());
    assert!(!env.config.dest_root.join("missing.png").exists());

    env.cleanup().await;
}

#[tokio::test]
async fn test_invalid_config_rejected_without_state_change() {
    let env = TestEnv::new();
    let mut config = env.config.clone();
    config.folder_id = String::new();

    let orchestrator = SyncOrchestrator::new(
        config,
        Arc::new(RouterHttpClient::new("name,link,path\n")),
        Arc::new(TokioFileSystem),
        Arc::new(NoopPostProcessor),
    );

    let err = orchestrator.start_sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(orchestrator.status().phase().await, SyncPhase::Idle);

    env.cleanup().await;
}

#[tokio::test]
async fn test_redownload_single_asset() {
    let env = TestEnv::new();
    let http = RouterHttpClient::new("name,link,path\n")
        .with_asset("https://assets.example/solo.png", b"solo");

    let orchestrator = orchestrator(&env, http);
    let mut rx = orchestrator.subscribe();

    let record = AssetRecord {
        name: "solo.png".to_string(),
        download_url: "https://assets.example/solo.png".to_string(),
        relative_path: "/Icons".to_string(),
    };
    orchestrator.redownload_asset(record).await.unwrap();

    wait_for_event(&mut rx, |e| match e {
        SyncEvent::AssetCompleted { name } if name == "solo.png" => Some(()),
        _ => None,
    })
    .await;

    assert!(env.config.dest_root.join("Icons/solo.png").exists());

    env.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_redownload_rejected_then_cancellable() {
    let env = TestEnv::new();
    let http = RouterHttpClient::new("name,link,path\n")
        .with_stalled_asset("https://assets.example/stuck.png");

    let orchestrator = orchestrator(&env, http);
    let record = AssetRecord {
        name: "stuck.png".to_string(),
        download_url: "https://assets.example/stuck.png".to_string(),
        relative_path: String::new(),
    };

    orchestrator.redownload_asset(record.clone()).await.unwrap();

    // Wait until the spawned task has registered its tracking entry
    tokio::time::timeout(Duration::from_secs(5), async {
        while !orchestrator.status().any_in_flight().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("redownload never started");

    let err = orchestrator.redownload_asset(record).await.unwrap_err();
    assert!(matches!(err, SyncError::DownloadInFlight(_)));

    assert!(orchestrator.cancel_redownload("stuck.png").await);
    assert!(!env.config.dest_root.join("stuck.png").exists());

    env.cleanup().await;
}
