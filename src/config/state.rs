//! Persistent rate-limit and backoff state shared across invocations.
//!
//! Lives in its own INI file (`[internal]` section) so the user config is
//! never rewritten by the CLI. Writes go through an advisory lock file and
//! an atomic rename; reads are lock-free because writes are idempotent in
//! effect and a stale read only delays a send by one invocation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use tracing::{debug, warn};

use super::Ini;

const SECTION: &str = "internal";
const KEY_BACKOFF_AT: &str = "backoff_at";
const KEY_BACKOFF_RETRIES: &str = "backoff_retries";
const KEY_LAST_SENT_AT: &str = "heartbeats_last_sent_at";

/// How long to wait for the write lock before giving up.
const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Locks older than this are considered abandoned and stolen.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(10);

/// Parsed `[internal]` state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub backoff_at: Option<DateTime<FixedOffset>>,
    pub backoff_retries: u32,
    pub last_sent_at: Option<DateTime<FixedOffset>>,
}

/// Handle on the internal state file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current state. Missing file or unparseable values read as
    /// defaults; this must never fail an invocation.
    pub fn read(&self) -> State {
        let doc = match Ini::load(&self.path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("failed to load internal state file: {}", e);
                return State::default();
            }
        };

        State {
            backoff_at: doc
                .get(SECTION, KEY_BACKOFF_AT)
                .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok()),
            backoff_retries: doc
                .get(SECTION, KEY_BACKOFF_RETRIES)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            last_sent_at: doc
                .get(SECTION, KEY_LAST_SENT_AT)
                .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok()),
        }
    }

    /// Record a connectivity failure: first failure stamps `backoff_at`,
    /// every failure increments the retry counter.
    pub fn record_failure(&self) -> anyhow::Result<()> {
        self.update(|doc, state| {
            if state.backoff_at.is_none() {
                doc.set(SECTION, KEY_BACKOFF_AT, &now_rfc3339());
            }
            doc.set(SECTION, KEY_BACKOFF_RETRIES, &(state.backoff_retries + 1).to_string());
        })
    }

    /// Record a successful send: clears backoff and stamps the rate-limit
    /// clock.
    pub fn record_success(&self) -> anyhow::Result<()> {
        self.update(|doc, _| {
            doc.set(SECTION, KEY_BACKOFF_AT, "");
            doc.set(SECTION, KEY_BACKOFF_RETRIES, "0");
            doc.set(SECTION, KEY_LAST_SENT_AT, &now_rfc3339());
        })
    }

    /// Stamp the rate-limit clock alone.
    pub fn record_sent_now(&self) -> anyhow::Result<()> {
        self.update(|doc, _| {
            doc.set(SECTION, KEY_LAST_SENT_AT, &now_rfc3339());
        })
    }

    fn update(&self, apply: impl FnOnce(&mut Ini, &State)) -> anyhow::Result<()> {
        let _lock = Lock::acquire(&self.path)?;

        let mut doc = Ini::load(&self.path)?;
        let state = self.read();
        apply(&mut doc, &state);
        doc.save(&self.path)
    }
}

fn now_rfc3339() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Advisory lock file guarding state writes across processes.
struct Lock {
    path: PathBuf,
}

impl Lock {
    fn acquire(target: &Path) -> anyhow::Result<Self> {
        let path = target.with_extension("cfg.lock");

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }

        let deadline = std::time::Instant::now() + LOCK_TIMEOUT;

        loop {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        debug!("stealing stale state lock {:?}", path);
                        let _ = fs::remove_file(&path);
                        continue;
                    }

                    if std::time::Instant::now() >= deadline {
                        anyhow::bail!("timed out waiting for state file lock {:?}", path);
                    }

                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| {
            modified
                .elapsed()
                .map(|age| age > LOCK_STALE_AFTER)
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

impl Drop for Lock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
