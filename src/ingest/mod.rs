//! Incremental Gmail ingestion.
//!
//! A run lists the newest message ids, keeps only those newer than the
//! watermark, fetches them one at a time with pacing, and prepends the
//! results to a bounded newest-first list.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::IngestConfig;
use crate::connectors::gmail_api::map_message_to_detail;
use crate::connectors::{MailApiError, MailSource};
use crate::models::MessageDetail;

pub mod pacing;

pub use pacing::{Delay, TokioDelay};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionState {
    /// Newest first.
    pub messages: Vec<MessageDetail>,
    /// Id of the newest message already ingested.
    pub watermark_id: Option<String>,
    pub is_loading: bool,
    pub is_syncing: bool,
    /// Start time of the most recent run.
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub listed: usize,
    pub attempted: usize,
    pub added: usize,
    pub rate_limited: usize,
    pub errors: Vec<String>,
}

pub struct Ingestor<S, D = TokioDelay> {
    source: S,
    delay: D,
    config: IngestConfig,
}

impl<S: MailSource> Ingestor<S, TokioDelay> {
    pub fn new(source: S) -> Self {
        Self::with_delay(source, TokioDelay, IngestConfig::default())
    }
}

impl<S: MailSource, D: Delay> Ingestor<S, D> {
    pub fn with_delay(source: S, delay: D, config: IngestConfig) -> Self {
        Self {
            source,
            delay,
            config,
        }
    }

    pub async fn ingest(&self, token: &str, state: IngestionState) -> IngestionState {
        self.run(token, state).await.0
    }

    /// One ingestion pass. Never fails: errors are logged and recorded in the
    /// report, and the returned state always has its flags cleared.
    pub async fn run(
        &self,
        token: &str,
        mut state: IngestionState,
    ) -> (IngestionState, IngestReport) {
        let mut report = IngestReport::default();
        state.last_sync = Some(Utc::now());

        let listed = match self
            .source
            .list_recent(token, self.config.page_size, &self.config.category)
            .await
        {
            Ok(ids) => ids,
            Err(error) => {
                error!("{}: listing recent messages failed: {error}", self.source.name());
                report.errors.push(format!("list: {error}"));
                return (settle(state), report);
            }
        };
        report.listed = listed.len();

        let slice = new_slice(&listed, state.watermark_id.as_deref(), self.config.page_size);
        if slice.is_empty() {
            debug!("no messages newer than watermark {:?}", state.watermark_id);
            return (settle(state), report);
        }

        let fetched = self.fetch_slice(token, slice, &mut report).await;
        report.added = fetched.len();
        merge(&mut state, fetched, self.config.max_messages);

        info!(
            "{} ingest: listed={} attempted={} added={} rate_limited={} errors={}",
            self.source.name(),
            report.listed,
            report.attempted,
            report.added,
            report.rate_limited,
            report.errors.len()
        );
        (settle(state), report)
    }

    async fn fetch_slice(
        &self,
        token: &str,
        slice: &[String],
        report: &mut IngestReport,
    ) -> Vec<MessageDetail> {
        let mut fetched = Vec::with_capacity(slice.len());

        for (idx, id) in slice.iter().enumerate() {
            report.attempted += 1;
            match self.source.get_message(token, id).await {
                Ok(message) => fetched.push(map_message_to_detail(id, &message)),
                Err(MailApiError::RateLimited) => {
                    warn!("rate limited fetching message {id}, skipping");
                    report.rate_limited += 1;
                    self.delay.pause(self.config.rate_limit_backoff).await;
                }
                Err(error) => {
                    warn!("failed to fetch message {id}: {error}");
                    report.errors.push(format!("id={id}: {error}"));
                }
            }

            if idx + 1 < slice.len() {
                self.delay.pause(self.config.pace).await;
            }
        }

        fetched
    }
}

/// Ids to fetch this run.
///
/// Without a watermark, or when the watermark is no longer in the listed
/// page, this is the first `limit` ids; already-seen messages may be fetched
/// again in the second case. Otherwise it is every id listed before the
/// watermark.
pub fn new_slice<'a>(listed: &'a [String], watermark: Option<&str>, limit: usize) -> &'a [String] {
    let head = &listed[..listed.len().min(limit)];
    let Some(watermark) = watermark else {
        return head;
    };

    match listed.iter().position(|id| id == watermark) {
        Some(k) => &listed[..k],
        None => {
            debug!("watermark {watermark} not in listed page, refetching newest {limit}");
            head
        }
    }
}

/// Prepend `fetched` (newest first) and cap the list. Ids are not
/// de-duplicated. A non-empty batch moves the watermark to its first id.
pub fn merge(state: &mut IngestionState, fetched: Vec<MessageDetail>, max_messages: usize) {
    let Some(newest) = fetched.first() else {
        return;
    };
    state.watermark_id = Some(newest.id.clone());

    let mut merged = fetched;
    merged.append(&mut state.messages);
    merged.truncate(max_messages);
    state.messages = merged;
}

fn settle(mut state: IngestionState) -> IngestionState {
    state.is_loading = false;
    state.is_syncing = false;
    state
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(IngestReport),
    /// Another run was in flight; this trigger was dropped.
    AlreadyRunning,
    NoToken,
}

/// Owns the ingestion state for one signed-in session and serializes
/// triggers: a sync requested while another is running is rejected.
pub struct GmailIngestor<S, D = TokioDelay> {
    ingestor: Ingestor<S, D>,
    access_token: Option<String>,
    state: Mutex<IngestionState>,
}

impl<S: MailSource, D: Delay> GmailIngestor<S, D> {
    pub fn new(ingestor: Ingestor<S, D>) -> Self {
        Self {
            ingestor,
            access_token: None,
            state: Mutex::new(IngestionState::default()),
        }
    }

    /// Start a session with `token`, discarding any previous state, and run
    /// the initial ingestion.
    pub async fn connect(&mut self, token: impl Into<String>) -> SyncOutcome {
        let token: String = token.into();
        self.access_token = Some(token).filter(|token| !token.trim().is_empty());
        *self.lock_state() = IngestionState::default();
        self.sync().await
    }

    /// End the session. Ingested messages and the watermark are dropped.
    pub fn disconnect(&mut self) {
        self.access_token = None;
        *self.lock_state() = IngestionState::default();
    }

    pub async fn sync(&self) -> SyncOutcome {
        let Some(token) = self.access_token.as_deref() else {
            return SyncOutcome::NoToken;
        };

        let snapshot = {
            let mut state = self.lock_state();
            if state.is_syncing {
                debug!("sync requested while a run is in flight, ignoring");
                return SyncOutcome::AlreadyRunning;
            }
            state.is_syncing = true;
            state.is_loading = true;
            state.clone()
        };

        let _reset = FlagReset { state: &self.state };
        let (next, report) = self.ingestor.run(token, snapshot).await;
        *self.lock_state() = next;
        SyncOutcome::Completed(report)
    }

    pub fn snapshot(&self) -> IngestionState {
        self.lock_state().clone()
    }

    pub fn messages(&self) -> Vec<MessageDetail> {
        self.lock_state().messages.clone()
    }

    pub fn watermark_id(&self) -> Option<String> {
        self.lock_state().watermark_id.clone()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_sync
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    pub fn is_syncing(&self) -> bool {
        self.lock_state().is_syncing
    }

    fn lock_state(&self) -> MutexGuard<'_, IngestionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flags when a sync ends, including when its future is
/// dropped mid-run.
struct FlagReset<'a> {
    state: &'a Mutex<IngestionState>,
}

impl Drop for FlagReset<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.is_loading = false;
        state.is_syncing = false;
    }
}
