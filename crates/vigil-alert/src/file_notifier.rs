use crate::notify_trait::Notifier;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vigil_core::{Contact, DeliveryError, MessageId};

/// Appends outbound messages to a file, one `number<TAB>text` line per
/// send. The default transport, so the daemon runs without provider
/// credentials.
pub struct FileNotifier {
    outbox_path: Mutex<Option<PathBuf>>,
    send_count: AtomicUsize,
}

impl FileNotifier {
    pub fn new() -> Self {
        Self {
            outbox_path: Mutex::new(None),
            send_count: AtomicUsize::new(0),
        }
    }

    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::Relaxed)
    }
}

impl Default for FileNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for FileNotifier {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), DeliveryError> {
        let path = config
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DeliveryError::InitializationFailed("missing 'path' in config".to_string())
            })?;
        *self.outbox_path.lock().unwrap() = Some(PathBuf::from(path));
        Ok(())
    }

    async fn send(&self, contact: &Contact, text: &str) -> Result<MessageId, DeliveryError> {
        let path = {
            let guard = self.outbox_path.lock().unwrap();
            guard
                .as_ref()
                .ok_or_else(|| DeliveryError::SendFailed("not initialized".to_string()))?
                .clone()
        };

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        writeln!(file, "{}\t{}", contact.number, text)
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        let count = self.send_count.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(MessageId(format!("file-{count}")))
    }

    fn is_healthy(&self) -> bool {
        self.outbox_path.lock().unwrap().is_some()
    }

    async fn shutdown(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}
