use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vigil_alert::{AlertOrchestrator, LocationTracker};
use vigil_audio::{AmplitudeGate, AudioSource, RecordingWindow};
use vigil_core::Contact;
use vigil_detect::ClassificationAdapter;
use vigil_store::RecordStore;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;

const STOP_GRACE: Duration = Duration::from_secs(1);

pub struct MonitorSettings {
    pub user_id: u64,
    pub record_seconds: u32,
    pub country_code: String,
}

/// The passive monitoring loop: pull chunks in capture order, gate on
/// amplitude, record and classify on trigger, raise the alert on a
/// distress verdict.
///
/// `start` while running and `stop` while idle are no-ops. `stop` blocks
/// (bounded) until the loop has quiesced; no capture, classification or
/// notification happens after it returns.
pub struct AudioMonitor {
    gate: AmplitudeGate,
    window: Arc<RecordingWindow>,
    adapter: Arc<ClassificationAdapter>,
    store: Arc<dyn RecordStore>,
    tracker: Arc<LocationTracker>,
    orchestrator: Arc<AlertOrchestrator>,
    settings: Arc<MonitorSettings>,
    state: Arc<AtomicU8>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AudioMonitor {
    pub fn new(
        gate: AmplitudeGate,
        window: Arc<RecordingWindow>,
        adapter: Arc<ClassificationAdapter>,
        store: Arc<dyn RecordStore>,
        tracker: Arc<LocationTracker>,
        orchestrator: Arc<AlertOrchestrator>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            gate,
            window,
            adapter,
            store,
            tracker,
            orchestrator,
            settings: Arc::new(settings),
            state: Arc::new(AtomicU8::new(STATE_IDLE)),
            stop_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_RUNNING
    }

    /// Idle → Running. A no-op while already running.
    pub fn start<S: AudioSource + 'static>(&self, source: S) {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("audio monitoring already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        *self.stop_tx.lock().unwrap() = Some(stop_tx);

        let loop_ctx = MonitorLoop {
            gate: self.gate,
            window: Arc::clone(&self.window),
            adapter: Arc::clone(&self.adapter),
            store: Arc::clone(&self.store),
            tracker: Arc::clone(&self.tracker),
            orchestrator: Arc::clone(&self.orchestrator),
            settings: Arc::clone(&self.settings),
            state: Arc::clone(&self.state),
        };
        let handle = tokio::spawn(loop_ctx.run(source, stop_rx));
        *self.task.lock().unwrap() = Some(handle);
        tracing::info!(user_id = self.settings.user_id, "audio monitoring started");
    }

    /// Running → Idle. Blocks (bounded) until the loop has quiesced.
    /// A no-op while idle.
    pub async fn stop(&self) {
        if self
            .state
            .compare_exchange(STATE_RUNNING, STATE_IDLE, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if let Some(stop_tx) = self.stop_tx.lock().unwrap().take() {
            let _ = stop_tx.send(true);
        }
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                tracing::warn!("audio monitoring loop did not quiesce in time");
            }
        }
        tracing::info!("audio monitoring stopped");
    }
}

struct MonitorLoop {
    gate: AmplitudeGate,
    window: Arc<RecordingWindow>,
    adapter: Arc<ClassificationAdapter>,
    store: Arc<dyn RecordStore>,
    tracker: Arc<LocationTracker>,
    orchestrator: Arc<AlertOrchestrator>,
    settings: Arc<MonitorSettings>,
    state: Arc<AtomicU8>,
}

impl MonitorLoop {
    async fn run<S: AudioSource>(self, mut source: S, mut stop_rx: watch::Receiver<bool>) {
        loop {
            if *stop_rx.borrow() {
                break;
            }
            let chunk = tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                chunk = source.next_chunk() => chunk,
            };
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Capture failures are fatal to this loop only.
                    tracing::error!("audio capture failed, monitoring stops: {e}");
                    self.state.store(STATE_IDLE, Ordering::SeqCst);
                    break;
                }
            };

            if !self.gate.should_trigger(&chunk) {
                continue;
            }

            if let Err(e) = self.handle_trigger(&mut source, &mut stop_rx).await {
                tracing::error!("audio capture failed, monitoring stops: {e}");
                self.state.store(STATE_IDLE, Ordering::SeqCst);
                break;
            }
        }
        tracing::debug!("audio monitoring loop ended");
    }

    async fn handle_trigger<S: AudioSource>(
        &self,
        source: &mut S,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), vigil_core::CaptureError> {
        let recorded = match self
            .window
            .capture(
                source,
                self.settings.record_seconds,
                0,
                "emergency",
                stop_rx,
            )
            .await?
        {
            Some(recorded) => recorded,
            None => return Ok(()),
        };

        match self.adapter.classify(&recorded.handle).await {
            Ok(verdict) if verdict.is_distress => {
                self.escalate().await;
            }
            Ok(verdict) => {
                tracing::debug!(score = verdict.raw_score, "no distress detected");
            }
            Err(e) => {
                // Failure, not a negative verdict; logged apart so the two
                // stay distinguishable downstream.
                tracing::warn!("classification failed, not escalating: {e}");
            }
        }
        Ok(())
    }

    async fn escalate(&self) {
        let guardians = match self.store.get_guardians(self.settings.user_id).await {
            Ok(guardians) => guardians,
            Err(e) => {
                tracing::error!("failed to load guardians: {e}");
                return;
            }
        };
        if guardians.is_empty() {
            tracing::warn!(user_id = self.settings.user_id, "no guardians registered");
            return;
        }

        let recipients: Vec<Contact> = guardians
            .iter()
            .map(|g| g.normalized(&self.settings.country_code))
            .collect();
        let location = self.tracker.poll_once().await;
        self.orchestrator.raise_alert(recipients, location).await;
    }
}
