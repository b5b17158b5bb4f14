use crate::notify_trait::Notifier;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vigil_core::{Clock, Contact, DeliveryError};

struct IssuedCode {
    code: String,
    issued_at: u64,
}

/// One-time-passcode issuance and verification.
///
/// Codes live in an explicit keyed store with an injected clock, so expiry
/// and reissue behavior are deterministic under test. A successful
/// verification consumes the code; reissuing replaces any previous one.
pub struct OtpService {
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    code_length: u32,
    issued: Mutex<HashMap<String, IssuedCode>>,
}

impl OtpService {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        code_length: u32,
    ) -> Self {
        Self {
            notifier,
            clock,
            ttl,
            code_length: code_length.clamp(4, 9),
            issued: Mutex::new(HashMap::new()),
        }
    }

    fn generate_code(&self) -> String {
        let low = 10u64.pow(self.code_length - 1);
        let high = 10u64.pow(self.code_length);
        let code = rand::thread_rng().gen_range(low..high);
        code.to_string()
    }

    /// Generate and deliver a fresh code, replacing any outstanding one.
    pub async fn issue_code(&self, contact: &Contact) -> Result<(), DeliveryError> {
        let code = self.generate_code();
        {
            let mut issued = self.issued.lock().unwrap();
            issued.insert(
                contact.number.clone(),
                IssuedCode {
                    code: code.clone(),
                    issued_at: self.clock.now_unix(),
                },
            );
        }

        let text = format!("Your verification code is {code}");
        self.notifier.send(contact, &text).await?;
        tracing::info!(to = %contact.number, "verification code issued");
        Ok(())
    }

    /// True iff `code` matches the outstanding code for this number and it
    /// has not expired. Success consumes the code.
    pub fn verify_code(&self, contact: &Contact, code: &str) -> bool {
        let mut issued = self.issued.lock().unwrap();
        let Some(entry) = issued.get(&contact.number) else {
            return false;
        };

        if self.clock.now_unix() > entry.issued_at + self.ttl.as_secs() {
            issued.remove(&contact.number);
            tracing::debug!(to = %contact.number, "verification code expired");
            return false;
        }

        if entry.code != code {
            return false;
        }

        issued.remove(&contact.number);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use vigil_core::MessageId;

    struct TestClock(AtomicU64);

    impl TestClock {
        fn advance(&self, secs: u64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now_unix(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Records sent texts so tests can pull the delivered code back out.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let (_, text) = sent.last().expect("nothing sent");
            text.rsplit(' ').next().unwrap().to_string()
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
            self.sent
                .lock()
                .unwrap()
                .push((contact.number.clone(), text.to_string()));
            Ok(MessageId("test".to_string()))
        }

        fn is_healthy(&self) -> bool {
            true
        }

        async fn shutdown(&self) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn service() -> (Arc<RecordingNotifier>, Arc<TestClock>, OtpService) {
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(TestClock(AtomicU64::new(1000)));
        let otp = OtpService::new(
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(300),
            6,
        );
        (notifier, clock, otp)
    }

    #[tokio::test]
    async fn test_otp_issue_sends_six_digit_code() {
        let (notifier, _clock, otp) = service();
        let contact = Contact::new("A", "+910001");
        otp.issue_code(&contact).await.unwrap();

        let code = notifier.last_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        let sent = notifier.sent.lock().unwrap();
        assert!(sent[0].1.starts_with("Your verification code is "));
    }

    #[tokio::test]
    async fn test_otp_verify_correct_code_once() {
        let (notifier, _clock, otp) = service();
        let contact = Contact::new("A", "+910001");
        otp.issue_code(&contact).await.unwrap();
        let code = notifier.last_code();

        assert!(otp.verify_code(&contact, &code));
        // Consumed: the same code no longer verifies.
        assert!(!otp.verify_code(&contact, &code));
    }

    #[tokio::test]
    async fn test_otp_verify_wrong_code_fails_without_consuming() {
        let (notifier, _clock, otp) = service();
        let contact = Contact::new("A", "+910001");
        otp.issue_code(&contact).await.unwrap();
        let code = notifier.last_code();

        assert!(!otp.verify_code(&contact, "000000x"));
        assert!(otp.verify_code(&contact, &code));
    }

    #[test]
    fn test_otp_verify_unknown_number_fails() {
        let (_notifier, _clock, otp) = service();
        assert!(!otp.verify_code(&Contact::new("B", "+910099"), "123456"));
    }

    #[tokio::test]
    async fn test_otp_expired_code_fails() {
        let (notifier, clock, otp) = service();
        let contact = Contact::new("A", "+910001");
        otp.issue_code(&contact).await.unwrap();
        let code = notifier.last_code();

        clock.advance(301);
        assert!(!otp.verify_code(&contact, &code));
    }

    #[tokio::test]
    async fn test_otp_code_valid_at_ttl_boundary() {
        let (notifier, clock, otp) = service();
        let contact = Contact::new("A", "+910001");
        otp.issue_code(&contact).await.unwrap();
        let code = notifier.last_code();

        clock.advance(300);
        assert!(otp.verify_code(&contact, &code));
    }

    #[tokio::test]
    async fn test_otp_reissue_replaces_previous_code() {
        let (notifier, _clock, otp) = service();
        let contact = Contact::new("A", "+910001");

        otp.issue_code(&contact).await.unwrap();
        let first = notifier.last_code();
        otp.issue_code(&contact).await.unwrap();
        let second = notifier.last_code();

        if first != second {
            assert!(!otp.verify_code(&contact, &first));
        }
        assert!(otp.verify_code(&contact, &second));
    }

    #[tokio::test]
    async fn test_otp_codes_are_per_number() {
        let (notifier, _clock, otp) = service();
        let a = Contact::new("A", "+910001");
        let b = Contact::new("B", "+910002");

        otp.issue_code(&a).await.unwrap();
        let code_a = notifier.last_code();
        otp.issue_code(&b).await.unwrap();
        let code_b = notifier.last_code();

        assert!(otp.verify_code(&a, &code_a));
        assert!(otp.verify_code(&b, &code_b));
    }
}
