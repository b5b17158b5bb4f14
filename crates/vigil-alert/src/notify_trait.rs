use async_trait::async_trait;
use vigil_core::{Contact, DeliveryError, MessageId};

/// Outbound message transport (SMS provider, or a file in development).
///
/// Implementations are registered via [`NotifierRegistry`](crate::NotifierRegistry).
/// Delivery failures are per-recipient: callers isolate them and keep
/// sending to the remaining recipients.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the notifier's plugin name (e.g. `"file"`).
    fn name(&self) -> &str;
    /// One-time initialisation with notifier-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), DeliveryError>;
    /// Send one message to one contact.
    async fn send(&self, contact: &Contact, text: &str) -> Result<MessageId, DeliveryError>;
    /// Returns `true` if the notifier is currently able to deliver.
    fn is_healthy(&self) -> bool;
    /// Gracefully shut down the notifier, releasing resources.
    async fn shutdown(&self) -> Result<(), DeliveryError>;
}
