use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vigil_alert::{AlertOrchestrator, LocationTracker};
use vigil_audio::{AudioSource, RecordingWindow};
use vigil_core::Contact;
use vigil_detect::{ClassificationAdapter, Transcriber};
use vigil_store::RecordStore;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;

const STOP_GRACE: Duration = Duration::from_secs(1);

pub struct ListenerSettings {
    pub user_id: u64,
    pub keyword: String,
    pub min_clip_peak: i32,
    pub record_seconds: u32,
    pub cooldown: Duration,
    pub phrase_timeout: Duration,
    pub country_code: String,
    pub emergency_number: String,
}

/// The keyword-listening loop: transcribe speech, and when the trigger
/// phrase occurs, run the same record-classify-alert path as the passive
/// monitor — with a quieter clip floor, the emergency-services contact
/// appended to the recipients, and a cooldown before listening resumes.
///
/// Same lifecycle contract as [`AudioMonitor`](crate::AudioMonitor):
/// start/stop idempotent, stop blocks (bounded) until quiescent.
pub struct KeywordListener {
    window: Arc<RecordingWindow>,
    adapter: Arc<ClassificationAdapter>,
    store: Arc<dyn RecordStore>,
    tracker: Arc<LocationTracker>,
    orchestrator: Arc<AlertOrchestrator>,
    settings: Arc<ListenerSettings>,
    state: Arc<AtomicU8>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl KeywordListener {
    pub fn new(
        window: Arc<RecordingWindow>,
        adapter: Arc<ClassificationAdapter>,
        store: Arc<dyn RecordStore>,
        tracker: Arc<LocationTracker>,
        orchestrator: Arc<AlertOrchestrator>,
        settings: ListenerSettings,
    ) -> Self {
        Self {
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
    pub fn start<T, S>(&self, transcriber: T, source: S)
    where
        T: Transcriber + 'static,
        S: AudioSource + 'static,
    {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("keyword listening already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        *self.stop_tx.lock().unwrap() = Some(stop_tx);

        let loop_ctx = ListenerLoop {
            window: Arc::clone(&self.window),
            adapter: Arc::clone(&self.adapter),
            store: Arc::clone(&self.store),
            tracker: Arc::clone(&self.tracker),
            orchestrator: Arc::clone(&self.orchestrator),
            settings: Arc::clone(&self.settings),
            state: Arc::clone(&self.state),
        };
        let handle = tokio::spawn(loop_ctx.run(transcriber, source, stop_rx));
        *self.task.lock().unwrap() = Some(handle);
        tracing::info!(
            keyword = %self.settings.keyword,
            "keyword listening started"
        );
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
                tracing::warn!("keyword listening loop did not quiesce in time");
            }
        }
        tracing::info!("keyword listening stopped");
    }
}

struct ListenerLoop {
    window: Arc<RecordingWindow>,
    adapter: Arc<ClassificationAdapter>,
    store: Arc<dyn RecordStore>,
    tracker: Arc<LocationTracker>,
    orchestrator: Arc<AlertOrchestrator>,
    settings: Arc<ListenerSettings>,
    state: Arc<AtomicU8>,
}

impl ListenerLoop {
    async fn run<T, S>(self, mut transcriber: T, mut source: S, mut stop_rx: watch::Receiver<bool>)
    where
        T: Transcriber,
        S: AudioSource,
    {
        let keyword = self.settings.keyword.to_lowercase();
        loop {
            if *stop_rx.borrow() {
                break;
            }
            let phrase = tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                phrase = transcriber.listen_phrase(self.settings.phrase_timeout) => phrase,
            };
            match phrase {
                Ok(Some(text)) => {
                    if !text.to_lowercase().contains(&keyword) {
                        continue;
                    }
                    tracing::info!(%text, "trigger phrase heard");
                    if let Err(e) = self.handle_trigger(&text, &mut source, &mut stop_rx).await
                    {
                        tracing::error!("audio capture failed, listening stops: {e}");
                        self.state.store(STATE_IDLE, Ordering::SeqCst);
                        break;
                    }
                    // Cooldown before resuming, so the loop does not
                    // re-trigger on the echo of its own alert flow.
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.cooldown) => {}
                        _ = wait_for_stop(&mut stop_rx) => break,
                    }
                }
                // Timeouts and unintelligible speech are normal iterations.
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!("transcription engine failed, listening stops: {e}");
                    self.state.store(STATE_IDLE, Ordering::SeqCst);
                    break;
                }
            }
        }
        tracing::debug!("keyword listening loop ended");
    }

    async fn handle_trigger<S: AudioSource>(
        &self,
        text: &str,
        source: &mut S,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), vigil_core::CaptureError> {
        let recorded = match self
            .window
            .capture(
                source,
                self.settings.record_seconds,
                self.settings.min_clip_peak,
                "command",
                stop_rx,
            )
            .await?
        {
            Some(recorded) => recorded,
            None => return Ok(()),
        };

        if let Err(e) = self
            .store
            .save_command_sample(self.settings.user_id, text, recorded.handle.clone())
            .await
        {
            tracing::warn!("failed to save command sample: {e}");
        }

        match self.adapter.classify(&recorded.handle).await {
            Ok(verdict) if verdict.is_distress => {
                self.escalate().await;
            }
            Ok(verdict) => {
                tracing::debug!(score = verdict.raw_score, "no distress detected");
            }
            Err(e) => {
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

        let mut recipients: Vec<Contact> = guardians
            .iter()
            .map(|g| g.normalized(&self.settings.country_code))
            .collect();
        // The spoken-trigger path also alerts emergency services.
        recipients.push(Contact::new(
            "Emergency Services",
            &self.settings.emergency_number,
        ));

        let location = self.tracker.poll_once().await;
        self.orchestrator.raise_alert(recipients, location).await;
    }
}

async fn wait_for_stop(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}
