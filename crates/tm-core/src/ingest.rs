//! Gateway frame ingestion.
//!
//! Input is newline-delimited JSON gateway frames:
//!
//! ```text
//! {"op": 0, "t": "MESSAGE_CREATE", "s": 42, "d": {...}}
//! ```
//!
//! Only dispatch frames (`op == 0`) carrying an event name are registered,
//! as `(t, d)`. A dedicated thread reads lines and forwards them over a
//! channel, so the session can wake for periodic saves and shutdown requests
//! while input is idle.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::{Registration, SchemaMapper};
use crate::persist::{DatasetFile, PersistError};

/// Gateway opcode for event dispatch.
pub const OP_DISPATCH: i64 = 0;

/// How often the session checks the shutdown flag while input is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One gateway frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GatewayFrame {
    pub op: i64,
    #[serde(default)]
    pub t: Option<String>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub d: Option<Value>,
}

impl GatewayFrame {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Event name and payload, for dispatch frames only.
    pub fn into_dispatch(self) -> Option<(String, Value)> {
        if self.op != OP_DISPATCH {
            return None;
        }
        let event = self.t?;
        Some((event, self.d.unwrap_or(Value::Null)))
    }
}

/// What happened to one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Dispatched(Registration),
    Skipped,
    Malformed,
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: u64,
    pub dispatched: u64,
    pub skipped: u64,
    pub malformed: u64,
    pub saves: u64,
}

/// Feeds gateway frames into a mapper and persists it.
pub struct IngestSession {
    mapper: SchemaMapper,
    dataset: DatasetFile,
    save_interval: Option<Duration>,
    last_save: Instant,
    stats: IngestStats,
}

impl IngestSession {
    /// `save_interval` of `None` disables periodic saves; the store is then
    /// only written at the end of the run.
    pub fn new(mapper: SchemaMapper, dataset: DatasetFile, save_interval: Option<Duration>) -> Self {
        Self {
            mapper,
            dataset,
            save_interval,
            last_save: Instant::now(),
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn mapper(&self) -> &SchemaMapper {
        &self.mapper
    }

    /// Process one input line. Blank lines are ignored.
    pub fn handle_line(&mut self, line: &str) -> Option<FrameOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.stats.lines += 1;

        let frame = match GatewayFrame::parse(line) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.malformed += 1;
                warn!(line = self.stats.lines, error = %e, "skipping malformed frame");
                return Some(FrameOutcome::Malformed);
            }
        };

        let op = frame.op;
        match frame.into_dispatch() {
            Some((event, data)) => {
                if let Err(e) = self.mapper.check(&event, &data) {
                    self.stats.malformed += 1;
                    warn!(
                        line = self.stats.lines,
                        event = %event,
                        error = %e,
                        "skipping sample the dataset cannot store"
                    );
                    return Some(FrameOutcome::Malformed);
                }
                self.stats.dispatched += 1;
                Some(FrameOutcome::Dispatched(self.mapper.register(&event, &data)))
            }
            None => {
                self.stats.skipped += 1;
                debug!(op, "skipping non-dispatch frame");
                Some(FrameOutcome::Skipped)
            }
        }
    }

    /// Save if the store changed since the last save.
    pub fn save(&mut self) -> Result<bool, PersistError> {
        self.last_save = Instant::now();
        if !self.mapper.is_dirty() {
            return Ok(false);
        }
        self.dataset.save(self.mapper.store())?;
        self.mapper.mark_clean();
        self.stats.saves += 1;
        Ok(true)
    }

    /// Periodic save. Failures are logged and retried on the next interval.
    fn save_if_due(&mut self) {
        let Some(interval) = self.save_interval else {
            return;
        };
        if self.last_save.elapsed() < interval {
            return;
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "periodic save failed");
        }
    }

    /// Consume `input` until it ends or `shutdown` is set, then save.
    ///
    /// The final save error, if any, is returned.
    pub fn run<R>(mut self, input: R, shutdown: Arc<AtomicBool>) -> Result<IngestReport, PersistError>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<io::Result<String>>();
        thread::spawn(move || {
            for line in input.lines() {
                let fatal = matches!(&line, Err(e) if e.kind() != io::ErrorKind::InvalidData);
                if tx.send(line).is_err() || fatal {
                    break;
                }
            }
        });

        let mut interrupted = false;
        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested");
                interrupted = true;
                break;
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(line)) => {
                    self.handle_line(&line);
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    self.stats.lines += 1;
                    self.stats.malformed += 1;
                    warn!(error = %e, "skipping undecodable input line");
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "input read failed, stopping");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.save_if_due();
        }

        self.save()?;
        info!(
            lines = self.stats.lines,
            dispatched = self.stats.dispatched,
            skipped = self.stats.skipped,
            malformed = self.stats.malformed,
            saves = self.stats.saves,
            events = self.mapper.store().len(),
            "ingestion finished"
        );
        Ok(IngestReport {
            stats: self.stats,
            events: self.mapper.store().len(),
            entries: self.mapper.store().entry_count(),
            interrupted,
        })
    }
}

/// Summary printed after an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    #[serde(flatten)]
    pub stats: IngestStats,
    pub events: usize,
    pub entries: usize,
    pub interrupted: bool,
}
