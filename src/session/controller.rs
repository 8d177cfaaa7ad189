use serde::Serialize;
use std::collections::HashSet;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::backend::{ConnectionStatus, RawReading};
use crate::error::AppResult;
use crate::pipeline::{render, DashboardView, Reading, RollingWindow, Thresholds};
use crate::session::SessionSubject;

/// Permission to apply one bulk fetch result.
///
/// Tickets are numbered in issue order and bound to the subject generation
/// they were issued under, so a slow response can never overwrite the window
/// after a newer fetch landed or after the subject changed. The append count
/// at issue time marks which window rows arrived while the request was out.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    seq: u64,
    generation: u64,
    appended: u64,
    subject: SessionSubject,
}

impl FetchTicket {
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn subject(&self) -> &SessionSubject {
        &self.subject
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    Failed,
    Stale,
    NoSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Appended,
    OwnershipRejected,
    Duplicate,
    Stale,
}

/// Owns the task pumping realtime events into the session. Dropping the
/// handle aborts the pump, which in turn drops the socket.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    #[must_use]
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// What the presentation layer sees
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSnapshot {
    pub status: ConnectionStatus,
    pub subject: Option<SessionSubject>,
    pub reading_count: usize,
    pub view: Option<DashboardView>,
}

/// Session-scoped state of the live pipeline.
///
/// Every mutation goes through `&mut self`; the async `Session` wrapper puts
/// the controller behind one mutex so fetch completions, realtime events and
/// subject changes apply in arrival order.
#[derive(Debug)]
pub struct SessionController {
    subject: Option<SessionSubject>,
    generation: u64,
    window: RollingWindow,
    thresholds: Thresholds,
    status: ConnectionStatus,
    next_fetch_seq: u64,
    applied_fetch_seq: u64,
    /// Realtime rows appended over the controller's lifetime
    appended: u64,
    subscription: Option<SubscriptionHandle>,
    view: Option<DashboardView>,
}

impl SessionController {
    #[must_use]
    pub fn new(capacity: usize, thresholds: Thresholds) -> Self {
        Self {
            subject: None,
            generation: 0,
            window: RollingWindow::new(capacity),
            thresholds,
            status: ConnectionStatus::Connecting,
            next_fetch_seq: 0,
            applied_fetch_seq: 0,
            appended: 0,
            subscription: None,
            view: None,
        }
    }

    /// Begin a session for `subject`, discarding any previous session state.
    /// Returns the new generation.
    pub fn init(&mut self, subject: SessionSubject) -> u64 {
        self.reset();
        tracing::info!(?subject, generation = self.generation, "Session initialized");
        self.subject = Some(subject);
        self.generation
    }

    /// End the session: drop the subscription and forget all readings.
    pub fn teardown(&mut self) {
        self.reset();
        tracing::info!(generation = self.generation, "Session torn down");
    }

    fn reset(&mut self) {
        // Subscription goes first so no event can land after the clear
        self.subscription = None;
        self.generation += 1;
        self.subject = None;
        self.window.clear();
        self.view = None;
        self.status = ConnectionStatus::Connecting;
        self.applied_fetch_seq = self.next_fetch_seq;
    }

    #[must_use]
    pub fn subject(&self) -> Option<&SessionSubject> {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    #[must_use]
    pub fn has_live_subscription(&self) -> bool {
        self.subscription.as_ref().is_some_and(SubscriptionHandle::is_live)
    }

    /// Replaces any previous handle, aborting it.
    pub fn attach_subscription(&mut self, handle: SubscriptionHandle) {
        self.subscription = Some(handle);
    }

    /// Issue a ticket for a bulk fetch against the current subject.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        let subject = self.subject.clone()?;
        self.next_fetch_seq += 1;
        self.status = ConnectionStatus::Connecting;
        Some(FetchTicket {
            seq: self.next_fetch_seq,
            generation: self.generation,
            appended: self.appended,
            subject,
        })
    }

    /// Apply a bulk fetch result (rows newest first, as the backend returns them).
    ///
    /// On failure the window is left untouched and the status flips to `Error`.
    /// Otherwise the window is replaced wholesale, except for rows pushed over
    /// realtime after the ticket was issued that the result does not already
    /// contain; those are kept after the fetched rows.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: AppResult<Vec<RawReading>>,
    ) -> FetchOutcome {
        if ticket.generation != self.generation || ticket.seq <= self.applied_fetch_seq {
            tracing::debug!(
                seq = ticket.seq,
                applied = self.applied_fetch_seq,
                "Discarding stale bulk fetch result"
            );
            return FetchOutcome::Stale;
        }

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, seq = ticket.seq, "Bulk fetch failed");
                self.status = ConnectionStatus::Error;
                return FetchOutcome::Failed;
            }
        };

        let mut readings: Vec<Reading> = rows.into_iter().rev().map(Reading::from).collect();
        let count = readings.len();

        let in_flight = usize::try_from(self.appended - ticket.appended).unwrap_or(usize::MAX);
        let fetched_ids: HashSet<String> =
            readings.iter().filter_map(|r| r.record_id.clone()).collect();
        let fresher: Vec<Reading> = self
            .window
            .iter()
            .skip(self.window.len().saturating_sub(in_flight))
            .filter(|r| r.record_id.as_ref().is_none_or(|id| !fetched_ids.contains(id)))
            .cloned()
            .collect();
        if !fresher.is_empty() {
            tracing::debug!(kept = fresher.len(), "Keeping realtime readings that arrived during bulk fetch");
        }
        readings.extend(fresher);

        self.window.replace(readings);
        self.applied_fetch_seq = ticket.seq;
        self.status = ConnectionStatus::Connected;
        self.rerender();

        tracing::debug!(seq = ticket.seq, count, window = self.window.len(), "Bulk fetch applied");
        FetchOutcome::Applied { count }
    }

    /// Filter, normalize and append one pushed row.
    pub fn ingest(&mut self, generation: u64, raw: RawReading) -> IngestOutcome {
        if generation != self.generation {
            return IngestOutcome::Stale;
        }
        let Some(subject) = &self.subject else {
            return IngestOutcome::Stale;
        };

        let reading = Reading::from(raw);
        if !subject.accepts(&reading.device_id) {
            tracing::trace!(device_id = %reading.device_id, "Realtime reading filtered out");
            return IngestOutcome::OwnershipRejected;
        }

        if let Some(id) = &reading.record_id {
            if self.window.contains_record(id) {
                return IngestOutcome::Duplicate;
            }
        }

        self.window.append(reading);
        self.appended += 1;
        self.rerender();
        IngestOutcome::Appended
    }

    /// Connectivity transition reported by the subscription of `generation`.
    pub fn set_status(&mut self, generation: u64, status: ConnectionStatus) -> bool {
        if generation != self.generation {
            return false;
        }
        self.status = status;
        true
    }

    #[must_use]
    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            status: self.status,
            subject: self.subject.clone(),
            reading_count: self.window.len(),
            view: self.view.clone(),
        }
    }

    // An empty window leaves the previous frame in place.
    fn rerender(&mut self) {
        if let Some(view) = render(&self.window, &self.thresholds) {
            self.view = Some(view);
        }
    }
}
