use crate::notify_trait::Notifier;
use crate::signals::EscalationSignals;
use crate::tracker::LocationTracker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vigil_core::{Clock, Contact, Coordinates};

const LOCATION_UNAVAILABLE: &str = "Location unavailable";
const STOP_GRACE: Duration = Duration::from_secs(1);

/// Snapshot of an escalation, for the presentation layer and tests.
#[derive(Debug, Clone)]
pub struct EscalationSession {
    pub recipients: Vec<Contact>,
    pub started_at: u64,
    pub last_position: Option<Coordinates>,
    pub active: bool,
}

struct ActiveSession {
    recipients: Vec<Contact>,
    started_at: u64,
    last_position: Option<Coordinates>,
    epoch: u64,
    update_task: Option<JoinHandle<()>>,
}

/// The escalation state machine: Quiet until a distress verdict raises an
/// alert, Escalated until an explicit stop or the stand-down timer.
///
/// The single locked session slot is the concurrency safety net — the
/// passive monitor and the keyword listener can both fire `raise_alert`
/// around the same time and exactly one escalation results.
pub struct AlertOrchestrator {
    notifier: Arc<dyn Notifier>,
    signals: Arc<dyn EscalationSignals>,
    tracker: Arc<LocationTracker>,
    clock: Arc<dyn Clock>,
    stand_down: Duration,
    update_interval: Duration,
    epoch: AtomicU64,
    session: Mutex<Option<ActiveSession>>,
    last_session: Mutex<Option<EscalationSession>>,
}

impl AlertOrchestrator {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        signals: Arc<dyn EscalationSignals>,
        tracker: Arc<LocationTracker>,
        clock: Arc<dyn Clock>,
        stand_down: Duration,
        update_interval: Duration,
    ) -> Self {
        Self {
            notifier,
            signals,
            tracker,
            clock,
            stand_down,
            update_interval,
            epoch: AtomicU64::new(0),
            session: Mutex::new(None),
            last_session: Mutex::new(None),
        }
    }

    pub fn is_escalated(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    pub fn session_snapshot(&self) -> Option<EscalationSession> {
        self.session.lock().unwrap().as_ref().map(|s| EscalationSession {
            recipients: s.recipients.clone(),
            started_at: s.started_at,
            last_position: s.last_position,
            active: true,
        })
    }

    /// The most recently ended session, `active = false`.
    pub fn last_session(&self) -> Option<EscalationSession> {
        self.last_session.lock().unwrap().clone()
    }

    fn alert_text(location: Option<&Coordinates>) -> String {
        let target = match location {
            Some(position) => position.maps_url(),
            None => LOCATION_UNAVAILABLE.to_string(),
        };
        format!("EMERGENCY ALERT! View location: {target}")
    }

    fn update_text(position: &Coordinates) -> String {
        format!("Live Location Update: View location: {}", position.maps_url())
    }

    /// Send one text to every recipient. A failed send is logged and the
    /// remaining recipients are still notified.
    async fn fan_out(&self, recipients: &[Contact], text: &str) {
        for contact in recipients {
            match self.notifier.send(contact, text).await {
                Ok(id) => {
                    tracing::debug!(to = %contact.number, message_id = %id.0, "alert sent")
                }
                Err(e) => {
                    tracing::error!(to = %contact.number, "failed to send alert: {e}")
                }
            }
        }
    }

    fn epoch_active(&self, epoch: u64) -> bool {
        matches!(
            self.session.lock().unwrap().as_ref(),
            Some(s) if s.epoch == epoch
        )
    }

    fn record_position(&self, epoch: u64, position: Coordinates) {
        let mut guard = self.session.lock().unwrap();
        if let Some(session) = guard.as_mut() {
            if session.epoch == epoch {
                session.last_position = Some(position);
            }
        }
    }

    /// Quiet → Escalated. Empty recipients is a documented no-op (there is
    /// no one to notify); a call while already Escalated is a no-op.
    /// Returns whether a new escalation started.
    pub async fn raise_alert(
        self: &Arc<Self>,
        recipients: Vec<Contact>,
        location: Option<Coordinates>,
    ) -> bool {
        if recipients.is_empty() {
            tracing::warn!("raise_alert with no recipients, nothing to do");
            return false;
        }

        let epoch = {
            let mut guard = self.session.lock().unwrap();
            if guard.is_some() {
                tracing::debug!("escalation already active, ignoring duplicate alert");
                return false;
            }
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            *guard = Some(ActiveSession {
                recipients: recipients.clone(),
                started_at: self.clock.now_unix(),
                last_position: location,
                epoch,
                update_task: None,
            });
            epoch
        };
        tracing::info!(recipients = recipients.len(), "escalation started");

        self.fan_out(&recipients, &Self::alert_text(location.as_ref()))
            .await;

        self.signals.escalation_started();

        // Live-location stream: tracker fixes → texts to the same set.
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        self.tracker.start_periodic(self.update_interval, update_tx);
        let this = Arc::clone(self);
        let update_recipients = recipients;
        let update_task = tokio::spawn(async move {
            while let Some(position) = update_rx.recv().await {
                if !this.epoch_active(epoch) {
                    break;
                }
                this.record_position(epoch, position);
                this.fan_out(&update_recipients, &Self::update_text(&position))
                    .await;
            }
        });
        {
            let mut guard = self.session.lock().unwrap();
            match guard.as_mut() {
                Some(session) if session.epoch == epoch => {
                    session.update_task = Some(update_task)
                }
                // Stopped while we were sending the initial batch.
                _ => update_task.abort(),
            }
        }

        let this = Arc::clone(self);
        let stand_down = self.stand_down;
        tokio::spawn(async move {
            tokio::time::sleep(stand_down).await;
            this.stop_session(Some(epoch)).await;
        });

        true
    }

    /// Explicit Escalated → Quiet. A no-op while Quiet.
    pub async fn stop(&self) {
        self.stop_session(None).await;
    }

    /// `expected` carries the stand-down timer's epoch so a stale timer
    /// cannot kill a later session.
    async fn stop_session(&self, expected: Option<u64>) {
        let mut session = {
            let mut guard = self.session.lock().unwrap();
            match (guard.as_ref(), expected) {
                (None, _) => return,
                (Some(s), Some(epoch)) if s.epoch != epoch => return,
                _ => guard.take().unwrap(),
            }
        };

        self.tracker.stop_periodic().await;
        if let Some(handle) = session.update_task.take() {
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                tracing::warn!("live update task did not quiesce in time");
            }
        }

        *self.last_session.lock().unwrap() = Some(EscalationSession {
            recipients: session.recipients,
            started_at: session.started_at,
            last_position: session.last_position,
            active: false,
        });

        self.signals.escalation_ended();
        tracing::info!("escalation ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_trait::Geolocator;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use vigil_core::{DeliveryError, MessageId, SystemClock};
    use vigil_store::{MemoryStore, RecordStore};

    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail_numbers: Vec<String>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_numbers: Vec::new(),
            }
        }

        fn failing_for(numbers: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_numbers: numbers.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn initialize(&mut self, _config: toml::Value) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn send(&self, contact: &Contact, text: &str) -> Result<MessageId, DeliveryError> {
            if self.fail_numbers.contains(&contact.number) {
                return Err(DeliveryError::SendFailed("provider rejected".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((contact.number.clone(), text.to_string()));
            Ok(MessageId("m".to_string()))
        }

        fn is_healthy(&self) -> bool {
            true
        }

        async fn shutdown(&self) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingSignals {
        started: AtomicUsize,
        ended: AtomicUsize,
    }

    impl EscalationSignals for CountingSignals {
        fn escalation_started(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn escalation_ended(&self) {
            self.ended.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FixedGeolocator(Option<Coordinates>);

    #[async_trait]
    impl Geolocator for FixedGeolocator {
        async fn current_position(&self) -> Option<Coordinates> {
            self.0
        }
    }

    fn pos(lat: f64, lon: f64) -> Coordinates {
        Coordinates {
            latitude: lat,
            longitude: lon,
            captured_at: 0,
        }
    }

    fn guardians() -> Vec<Contact> {
        vec![Contact::new("A", "+910001"), Contact::new("B", "+910002")]
    }

    struct Fixture {
        notifier: Arc<RecordingNotifier>,
        signals: Arc<CountingSignals>,
        tracker: Arc<LocationTracker>,
        orchestrator: Arc<AlertOrchestrator>,
    }

    fn fixture_with(notifier: RecordingNotifier, fix: Option<Coordinates>) -> Fixture {
        let notifier = Arc::new(notifier);
        let signals = Arc::new(CountingSignals::default());
        let store = Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>;
        let tracker = Arc::new(LocationTracker::new(
            Arc::new(FixedGeolocator(fix)),
            store,
            1,
        ));
        let orchestrator = Arc::new(AlertOrchestrator::new(
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&signals) as Arc<dyn EscalationSignals>,
            Arc::clone(&tracker),
            Arc::new(SystemClock),
            Duration::from_secs(300),
            Duration::from_secs(30),
        ));
        Fixture {
            notifier,
            signals,
            tracker,
            orchestrator,
        }
    }

    fn fixture() -> Fixture {
        // No live fix and an empty store: the tracker stays silent, so
        // tests over the initial batch see exactly those sends.
        fixture_with(RecordingNotifier::new(), None)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_recipients_is_noop() {
        let f = fixture();
        let raised = f.orchestrator.raise_alert(Vec::new(), None).await;

        assert!(!raised);
        assert!(!f.orchestrator.is_escalated());
        assert!(f.notifier.sent().is_empty());
        assert_eq!(f.signals.started.load(Ordering::SeqCst), 0);
        assert!(!f.tracker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_raise_alert_notifies_every_recipient() {
        let f = fixture();
        let raised = f
            .orchestrator
            .raise_alert(guardians(), Some(pos(12.9, 77.6)))
            .await;

        assert!(raised);
        assert!(f.orchestrator.is_escalated());
        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "+910001");
        assert_eq!(sent[1].0, "+910002");
        for (_, text) in &sent {
            assert!(text.contains("https://www.google.com/maps?q=12.9,77.6"));
            assert!(text.starts_with("EMERGENCY ALERT!"));
        }
        assert_eq!(f.signals.started.load(Ordering::SeqCst), 1);

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_raise_alert_without_location_marks_unavailable() {
        let f = fixture();
        f.orchestrator.raise_alert(guardians(), None).await;

        for (_, text) in f.notifier.sent() {
            assert!(text.contains("Location unavailable"));
        }

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_raise_is_single_batch() {
        let f = fixture();
        let first = f
            .orchestrator
            .raise_alert(guardians(), Some(pos(12.9, 77.6)))
            .await;
        let second = f
            .orchestrator
            .raise_alert(guardians(), Some(pos(12.9, 77.6)))
            .await;

        assert!(first);
        assert!(!second);
        assert_eq!(f.notifier.sent().len(), 2);
        assert_eq!(f.signals.started.load(Ordering::SeqCst), 1);

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_raises_yield_one_session() {
        let f = fixture();
        let a = {
            let orch = Arc::clone(&f.orchestrator);
            tokio::spawn(async move { orch.raise_alert(guardians(), None).await })
        };
        let b = {
            let orch = Arc::clone(&f.orchestrator);
            tokio::spawn(async move { orch.raise_alert(guardians(), None).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b, "exactly one raise may win");
        assert_eq!(f.notifier.sent().len(), 2);
        assert_eq!(f.signals.started.load(Ordering::SeqCst), 1);

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_failure_isolated_per_recipient() {
        let f = fixture_with(RecordingNotifier::failing_for(&["+910001"]), None);
        let raised = f.orchestrator.raise_alert(guardians(), None).await;

        assert!(raised);
        assert!(f.orchestrator.is_escalated());
        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+910002");

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_session_and_tracker() {
        let f = fixture();
        f.orchestrator.raise_alert(guardians(), None).await;
        assert!(f.tracker.is_running());

        f.orchestrator.stop().await;

        assert!(!f.orchestrator.is_escalated());
        assert!(!f.tracker.is_running());
        assert_eq!(f.signals.ended.load(Ordering::SeqCst), 1);

        let last = f.orchestrator.last_session().unwrap();
        assert!(!last.active);
        assert_eq!(last.recipients.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_quiet_is_noop() {
        let f = fixture();
        f.orchestrator.stop().await;
        assert_eq!(f.signals.ended.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stand_down_expires_session() {
        let f = fixture();
        f.orchestrator.raise_alert(guardians(), None).await;
        settle().await;

        tokio::time::advance(Duration::from_secs(250)).await;
        settle().await;
        assert!(f.orchestrator.is_escalated());

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;

        assert!(!f.orchestrator.is_escalated());
        assert!(!f.tracker.is_running());
        assert_eq!(f.signals.ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_stand_down_timer_spares_new_session() {
        let f = fixture();
        f.orchestrator.raise_alert(guardians(), None).await;

        // Stop early, then start a second session before the first
        // timer would have fired.
        tokio::time::advance(Duration::from_secs(100)).await;
        settle().await;
        f.orchestrator.stop().await;
        f.orchestrator.raise_alert(guardians(), None).await;

        // Past the first session's 300s mark but well inside the second's.
        tokio::time::advance(Duration::from_secs(210)).await;
        settle().await;
        assert!(f.orchestrator.is_escalated());
        assert_eq!(f.signals.ended.load(Ordering::SeqCst), 1);

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_updates_stream_to_recipients() {
        let f = fixture_with(RecordingNotifier::new(), Some(pos(12.9, 77.6)));
        f.orchestrator
            .raise_alert(guardians(), Some(pos(12.9, 77.6)))
            .await;
        settle().await;

        // The tracker's immediate first fix becomes a live update.
        let sent = f.notifier.sent();
        let updates: Vec<_> = sent
            .iter()
            .filter(|(_, text)| text.starts_with("Live Location Update:"))
            .collect();
        assert_eq!(updates.len(), 2);
        for (_, text) in &updates {
            assert!(text.contains("https://www.google.com/maps?q=12.9,77.6"));
        }

        let session = f.orchestrator.session_snapshot().unwrap();
        assert_eq!(session.last_position.unwrap().latitude, 12.9);

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_notifications_after_stop_returns() {
        let f = fixture_with(RecordingNotifier::new(), Some(pos(1.0, 2.0)));
        f.orchestrator.raise_alert(guardians(), None).await;
        settle().await;

        f.orchestrator.stop().await;
        let sent_at_stop = f.notifier.sent().len();

        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(f.notifier.sent().len(), sent_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_recipients_fixed_at_creation() {
        let f = fixture();
        f.orchestrator
            .raise_alert(vec![Contact::new("A", "+910001")], None)
            .await;

        let session = f.orchestrator.session_snapshot().unwrap();
        assert_eq!(session.recipients, vec![Contact::new("A", "+910001")]);
        assert!(session.active);

        f.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reescalation_after_stand_down_works() {
        let f = fixture();
        f.orchestrator.raise_alert(guardians(), None).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(301)).await;
        settle().await;
        assert!(!f.orchestrator.is_escalated());

        let raised = f.orchestrator.raise_alert(guardians(), None).await;
        assert!(raised);
        assert_eq!(f.signals.started.load(Ordering::SeqCst), 2);

        f.orchestrator.stop().await;
    }
}
