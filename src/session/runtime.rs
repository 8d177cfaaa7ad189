use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::backend::{ReadingsBackend, RealtimeEvent};
use crate::pipeline::Thresholds;
use crate::session::controller::{
    DashboardSnapshot, FetchOutcome, IngestOutcome, SessionController, SubscriptionHandle,
};
use crate::session::SessionSubject;

/// Cloneable handle to the live session.
///
/// Owns the controller, the backend used for bulk fetches and subscriptions,
/// and the watch channel every render is published on.
#[derive(Clone)]
pub struct Session {
    controller: Arc<Mutex<SessionController>>,
    backend: Arc<dyn ReadingsBackend>,
    views: Arc<watch::Sender<DashboardSnapshot>>,
}

impl Session {
    #[must_use]
    pub fn new(backend: Arc<dyn ReadingsBackend>, capacity: usize, thresholds: Thresholds) -> Self {
        let controller = SessionController::new(capacity, thresholds);
        let (views, _) = watch::channel(controller.snapshot());

        Self {
            controller: Arc::new(Mutex::new(controller)),
            backend,
            views: Arc::new(views),
        }
    }

    /// Start (or restart) the session for `subject`: tear down whatever was
    /// running, subscribe to realtime inserts, then seed the window.
    pub async fn start(&self, subject: SessionSubject) -> FetchOutcome {
        {
            let mut controller = self.controller.lock().await;
            controller.init(subject);
            self.ensure_subscribed(&mut controller);
            self.publish(&controller);
        }
        self.refresh().await
    }

    /// Re-evaluate the subject, e.g. after a device was linked.
    pub async fn change_subject(&self, subject: SessionSubject) -> FetchOutcome {
        tracing::info!(?subject, "Session subject changed");
        self.start(subject).await
    }

    pub async fn end(&self) {
        let mut controller = self.controller.lock().await;
        controller.teardown();
        self.publish(&controller);
    }

    /// Bulk fetch for the current subject. Also re-subscribes if the realtime
    /// socket has died since the last attempt.
    pub async fn refresh(&self) -> FetchOutcome {
        let (ticket, capacity) = {
            let mut controller = self.controller.lock().await;
            self.ensure_subscribed(&mut controller);
            let ticket = controller.begin_fetch();
            self.publish(&controller);
            (ticket, controller.capacity())
        };
        let Some(ticket) = ticket else {
            return FetchOutcome::NoSession;
        };

        let result = if *ticket.subject() == SessionSubject::Unlinked {
            tracing::debug!("No device linked, skipping bulk fetch");
            Ok(Vec::new())
        } else {
            self.backend
                .fetch_latest_readings(ticket.subject().device_filter(), capacity)
                .await
        };

        let mut controller = self.controller.lock().await;
        let outcome = controller.complete_fetch(ticket, result);
        self.publish(&controller);
        outcome
    }

    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.views.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_views(&self) -> watch::Receiver<DashboardSnapshot> {
        self.views.subscribe()
    }

    pub async fn subject(&self) -> Option<SessionSubject> {
        self.controller.lock().await.subject().cloned()
    }

    /// Run `f` against the controller under the session lock.
    pub async fn inspect<T>(&self, f: impl FnOnce(&SessionController) -> T) -> T {
        let controller = self.controller.lock().await;
        f(&controller)
    }

    /// One subscription per generation; a live one is reused.
    fn ensure_subscribed(&self, controller: &mut SessionController) {
        if controller.has_live_subscription() {
            return;
        }
        match controller.subject() {
            None | Some(SessionSubject::Unlinked) => return,
            Some(_) => {}
        }

        let generation = controller.generation();
        let mut subscription = self.backend.subscribe_readings();
        let session = self.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                session.apply_realtime(generation, event).await;
            }
            tracing::debug!(generation, "Realtime subscription ended");
        });

        tracing::debug!(generation, "Realtime subscription established");
        controller.attach_subscription(SubscriptionHandle::new(task));
    }

    async fn apply_realtime(&self, generation: u64, event: RealtimeEvent) {
        let mut controller = self.controller.lock().await;
        match event {
            RealtimeEvent::Status(status) => {
                if controller.set_status(generation, status) {
                    tracing::debug!(?status, "Realtime connection status");
                }
            }
            RealtimeEvent::Insert(raw) => {
                if controller.ingest(generation, raw) != IngestOutcome::Appended {
                    return;
                }
            }
        }
        self.publish(&controller);
    }

    fn publish(&self, controller: &SessionController) {
        self.views.send_replace(controller.snapshot());
    }
}
