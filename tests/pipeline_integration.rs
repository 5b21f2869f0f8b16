//! End-to-end pipeline scenarios.
//!
//! Each test drives the full stage chain against real files in a temp
//! directory, with the transport mocked out so no network is touched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wakatime::config::StateFile;
use wakatime::deps::DepsStage;
use wakatime::heartbeat::{
    ApiResult, Category, Context, EntityType, FilterConfig, FilterStage, FormatStage, Heartbeat,
    Pipeline, RateLimitStage, SanitizeConfig, SanitizeStage, Transport,
};
use wakatime::language::LanguageStage;
use wakatime::offline::{self, Queue, QueueFallback};
use wakatime::project::{ProjectConfig, ProjectStage};

/// Transport recording what it was asked to send.
#[derive(Clone, Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<Heartbeat>>>,
    requests: Arc<AtomicUsize>,
    fail: bool,
}

impl Transport for RecordingTransport {
    fn send(&self, _ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<ApiResult>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        if self.fail {
            anyhow::bail!("connection refused");
        }

        self.requests.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().extend(batch.iter().cloned());

        Ok(batch
            .into_iter()
            .map(|h| ApiResult {
                status: 201,
                heartbeat: h,
                errors: Vec::new(),
            })
            .collect())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    repo: PathBuf,
    queue_path: PathBuf,
    state: StateFile,
}

/// A git repository at `<tmp>/repo` with `src/main.go` on branch main.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let repo = dir.path().join("repo");
    fs::create_dir_all(repo.join("src")).unwrap();

    let git = repo.join(".git");
    fs::create_dir_all(&git).unwrap();
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();

    fs::write(
        repo.join("src").join("main.go"),
        "package main\n\nimport (\n\t\"fmt\"\n\t\"github.com/spf13/cobra\"\n)\n\nfunc main() { fmt.Println() }\n",
    )
    .unwrap();

    Fixture {
        queue_path: dir.path().join("offline_heartbeats.bdb"),
        state: StateFile::new(dir.path().join("wakatime-internal.cfg")),
        repo,
        _dir: dir,
    }
}

fn build_pipeline(f: &Fixture, transport: RecordingTransport, rate_limit_secs: u64) -> Pipeline {
    Pipeline::new(Box::new(transport))
        .stage(RateLimitStage::new(rate_limit_secs, f.state.clone(), f.queue_path.clone()))
        .stage(ProjectStage::new(ProjectConfig::default()))
        .stage(LanguageStage::new(true))
        .stage(DepsStage::new(Vec::new()))
        .stage(FormatStage::new("vscode/1.90 vscode-wakatime/24.0.0"))
        .stage(FilterStage::new(FilterConfig::default()))
        .stage(SanitizeStage::new(SanitizeConfig::default()))
        .fallback(QueueFallback::new(f.queue_path.clone()))
}

fn file_heartbeat(f: &Fixture, time: f64) -> Heartbeat {
    Heartbeat {
        entity: f.repo.join("src").join("main.go").to_string_lossy().to_string(),
        entity_type: EntityType::File,
        category: Category::Coding,
        time,
        is_write: Some(true),
        ..Default::default()
    }
}

#[test]
fn test_single_heartbeat_successful_send() {
    let f = fixture();
    let transport = RecordingTransport::default();

    let pipeline = build_pipeline(&f, transport.clone(), 0);
    let results = pipeline.run(&Context::default(), vec![file_heartbeat(&f, 1585598060.1)]).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, 201);

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].project.as_deref(), Some("repo"));
    assert_eq!(sent[0].branch.as_deref(), Some("main"));
    assert_eq!(sent[0].language.as_deref(), Some("Go"));
    assert!(sent[0].user_agent.contains("vscode-wakatime"));
    assert!(sent[0]
        .project_path
        .as_deref()
        .is_some_and(|p| p.ends_with('/') || p.ends_with('\\')));
    assert_eq!(
        sent[0].dependencies.as_deref(),
        Some(&["fmt".to_string(), "github.com/spf13/cobra".to_string()][..])
    );

    // Nothing queued on the happy path.
    assert_eq!(Queue::open(&f.queue_path).unwrap().count().unwrap(), 0);
}

#[test]
fn test_offline_enqueue_on_send_failure() {
    let f = fixture();
    let transport = RecordingTransport {
        fail: true,
        ..Default::default()
    };

    let pipeline = build_pipeline(&f, transport, 0);
    let err = pipeline.run(&Context::default(), vec![file_heartbeat(&f, 1585598060.1)]);
    assert!(err.is_err());

    let queue = Queue::open(&f.queue_path).unwrap();
    let queued = queue.read_many(10).unwrap();
    assert_eq!(queued.len(), 1);
    // The queue key begins with the zero-padded heartbeat time.
    assert!(queued[0].id().starts_with("1585598060.100000-"));
    // Enrichment happened before the failed send was queued.
    assert_eq!(queued[0].project.as_deref(), Some("repo"));
}

#[test]
fn test_rate_limited_second_invocation_enqueues() {
    let f = fixture();

    // First invocation sends.
    let first = RecordingTransport::default();
    let pipeline = build_pipeline(&f, first.clone(), 120);
    pipeline.run(&Context::default(), vec![file_heartbeat(&f, 1585598060.1)]).unwrap();
    assert_eq!(first.requests.load(Ordering::SeqCst), 1);

    // Record the send the way the api client would have.
    f.state.record_success().unwrap();

    // Second invocation one second later stays off the network.
    let second = RecordingTransport::default();
    let pipeline = build_pipeline(&f, second.clone(), 120);
    let results = pipeline.run(&Context::default(), vec![file_heartbeat(&f, 1585598061.1)]).unwrap();

    assert!(results.is_empty());
    assert_eq!(second.requests.load(Ordering::SeqCst), 0);
    assert_eq!(Queue::open(&f.queue_path).unwrap().count().unwrap(), 1);
}

#[test]
fn test_project_override_wins_branch_still_detected() {
    let f = fixture();
    let transport = RecordingTransport::default();

    let mut h = file_heartbeat(&f, 1585598060.1);
    h.project_override = Some("Billing".to_string());

    let pipeline = build_pipeline(&f, transport.clone(), 0);
    pipeline.run(&Context::default(), vec![h]).unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent[0].project.as_deref(), Some("Billing"));
    assert_eq!(sent[0].branch.as_deref(), Some("main"));
}

#[test]
fn test_empty_batch_writes_nothing() {
    let f = fixture();
    let transport = RecordingTransport::default();

    let pipeline = build_pipeline(&f, transport.clone(), 0);
    let results = pipeline.run(&Context::default(), Vec::new()).unwrap();

    assert!(results.is_empty());
    assert_eq!(transport.requests.load(Ordering::SeqCst), 0);
    assert_eq!(Queue::open(&f.queue_path).unwrap().count().unwrap(), 0);
}

#[test]
fn test_batch_order_preserved_end_to_end() {
    let f = fixture();

    // A second file in the repo.
    fs::write(f.repo.join("src").join("util.go"), "package main\n").unwrap();

    let transport = RecordingTransport::default();
    let pipeline = build_pipeline(&f, transport.clone(), 0);

    let mut second = file_heartbeat(&f, 1585598061.2);
    second.entity = f.repo.join("src").join("util.go").to_string_lossy().to_string();

    pipeline
        .run(&Context::default(), vec![file_heartbeat(&f, 1585598060.1), second])
        .unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].entity.ends_with("main.go"));
    assert!(sent[1].entity.ends_with("util.go"));
}

/// Seed scenario: queue preloaded with three heartbeats; per-item results
/// 201, 429, 400 leave exactly the 429 one queued.
#[test]
fn test_sync_mixed_results() {
    struct MixedTransport;

    impl Transport for MixedTransport {
        fn send(&self, _ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<ApiResult>> {
            let statuses = [201u16, 429, 400];
            Ok(batch
                .into_iter()
                .zip(statuses)
                .map(|(h, status)| ApiResult {
                    status,
                    heartbeat: h,
                    errors: Vec::new(),
                })
                .collect())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let queue_path = dir.path().join("offline_heartbeats.bdb");

    let hh: Vec<Heartbeat> = (0..3)
        .map(|i| Heartbeat {
            entity: format!("/tmp/file{}.go", i),
            time: 1585598060.0 + i as f64,
            ..Default::default()
        })
        .collect();

    Queue::open(&queue_path).unwrap().push_many(&hh).unwrap();

    offline::sync::run(&Context::default(), &queue_path, 0, &MixedTransport).unwrap();

    let queue = Queue::open(&queue_path).unwrap();
    let remaining = queue.read_many(10).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].entity, "/tmp/file1.go");
}

/// Requeueing an already-present heartbeat collapses onto the same key.
#[test]
fn test_requeue_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let queue_path = dir.path().join("offline_heartbeats.bdb");

    let h = Heartbeat {
        entity: "/tmp/main.go".to_string(),
        time: 1585598060.1,
        ..Default::default()
    };

    let mut queue = Queue::open(&queue_path).unwrap();
    queue.push_many(std::slice::from_ref(&h)).unwrap();
    queue.push_many(std::slice::from_ref(&h)).unwrap();

    assert_eq!(queue.count().unwrap(), 1);

    let popped = queue.pop_many(10).unwrap();
    assert_eq!(popped, vec![h.clone()]);

    // Re-pushing a popped heartbeat restores exactly one record.
    let mut queue = Queue::open(&queue_path).unwrap();
    queue.push_many(&[h]).unwrap();
    assert_eq!(queue.count().unwrap(), 1);
}

/// A dropped entity (exclude pattern) generates no request and no queue
/// record: an explicit discard, not a loss.
#[test]
fn test_excluded_heartbeat_discarded() {
    let f = fixture();
    let transport = RecordingTransport::default();

    let pipeline = Pipeline::new(Box::new(transport.clone()))
        .stage(FilterStage::new(FilterConfig {
            exclude: vec![regex::Regex::new("(?i)main\\.go$").unwrap()],
            ..Default::default()
        }))
        .fallback(QueueFallback::new(f.queue_path.clone()));

    let results = pipeline.run(&Context::default(), vec![file_heartbeat(&f, 1585598060.1)]).unwrap();

    assert!(results.is_empty());
    assert_eq!(transport.requests.load(Ordering::SeqCst), 0);
    assert_eq!(Queue::open(&f.queue_path).unwrap().count().unwrap(), 0);
}

/// Queue path override expansion sanity.
#[test]
fn test_queue_filepath_override() {
    let path = offline::queue_filepath(Some("/tmp/custom-queue.bdb"));
    assert_eq!(path, Path::new("/tmp/custom-queue.bdb"));
}
