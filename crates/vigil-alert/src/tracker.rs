use crate::geo_trait::Geolocator;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use vigil_core::Coordinates;
use vigil_store::RecordStore;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;

const STOP_GRACE: Duration = Duration::from_secs(1);

/// Polls the geolocation capability and feeds position fixes to the
/// escalation flow while an emergency is active.
///
/// Every successful live fix is durably recorded before it is handed
/// onward, so the fallback path always has the freshest position.
pub struct LocationTracker {
    geolocator: Arc<dyn Geolocator>,
    store: Arc<dyn RecordStore>,
    user_id: u64,
    state: AtomicU8,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocationTracker {
    pub fn new(geolocator: Arc<dyn Geolocator>, store: Arc<dyn RecordStore>, user_id: u64) -> Self {
        Self {
            geolocator,
            store,
            user_id,
            state: AtomicU8::new(STATE_IDLE),
            stop_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_RUNNING
    }

    /// One position lookup: live first, last stored position as fallback.
    /// `None` only when no live or historical position exists.
    pub async fn poll_once(&self) -> Option<Coordinates> {
        Self::poll(&self.geolocator, &self.store, self.user_id).await
    }

    async fn poll(
        geolocator: &Arc<dyn Geolocator>,
        store: &Arc<dyn RecordStore>,
        user_id: u64,
    ) -> Option<Coordinates> {
        if let Some(position) = geolocator.current_position().await {
            if let Err(e) = store.save_position(user_id, position).await {
                tracing::warn!("failed to record position: {e}");
            }
            return Some(position);
        }

        match store.last_position(user_id).await {
            Ok(Some(last)) => {
                tracing::debug!("live lookup failed, using last known position");
                Some(last)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("failed to read last position: {e}");
                None
            }
        }
    }

    /// Start the periodic poll loop. The first poll fires immediately;
    /// each successful poll is pushed into `updates`. A no-op while
    /// already running.
    pub fn start_periodic(&self, interval: Duration, updates: mpsc::UnboundedSender<Coordinates>) {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("location tracking already running");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        *self.stop_tx.lock().unwrap() = Some(stop_tx);

        let geolocator = Arc::clone(&self.geolocator);
        let store = Arc::clone(&self.store);
        let user_id = self.user_id;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Some(position) = Self::poll(&geolocator, &store, user_id).await {
                            if updates.send(position).is_err() {
                                // Consumer gone; nothing left to feed.
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!("location tracking loop ended");
        });
        *self.task.lock().unwrap() = Some(handle);
        tracing::info!(user_id, "location tracking started");
    }

    /// Stop the periodic loop and wait (bounded) for it to quiesce. No
    /// update is handed onward after this returns. A no-op while idle.
    pub async fn stop_periodic(&self) {
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
                tracing::warn!("location tracking loop did not quiesce in time");
            }
        }
        tracing::info!("location tracking stopped");
    }
}
