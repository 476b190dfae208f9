//! Outbound email.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Welcome,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub first_name: String,
    pub subject: String,
    pub kind: EmailKind,
    /// Link the message points the reader to.
    pub url: String,
}

impl Email {
    pub fn welcome(to: &str, first_name: &str, url: String) -> Self {
        Self {
            to: to.to_string(),
            first_name: first_name.to_string(),
            subject: "Welcome to the Tourbook family!".to_string(),
            kind: EmailKind::Welcome,
            url,
        }
    }

    pub fn password_reset(to: &str, first_name: &str, url: String) -> Self {
        Self {
            to: to.to_string(),
            first_name: first_name.to_string(),
            subject: "Your password reset token (valid for only 10 minutes)".to_string(),
            kind: EmailKind::PasswordReset,
            url,
        }
    }

    /// Plain-text body.
    pub fn text(&self) -> String {
        match self.kind {
            EmailKind::Welcome => format!(
                "Hi {},\n\nWelcome to Tourbook, we're glad to have you!\nUpload your user photo at {}\n",
                self.first_name, self.url
            ),
            EmailKind::PasswordReset => format!(
                "Hi {},\n\nForgot your password? Submit a PATCH request with your new password and passwordConfirm to: {}\nIf you didn't forget your password, please ignore this email.\n",
                self.first_name, self.url
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes each message to the log instead of delivering it.
///
/// Only the envelope is logged at info. Bodies go to debug, and password
/// reset bodies (which carry a live token) only when links are revealed.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
    reveal_links: bool,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            reveal_links: false,
        }
    }

    /// Log reset links at debug level. For local development only.
    pub fn revealing_links(mut self, reveal: bool) -> Self {
        self.reveal_links = reveal;
        self
    }

    fn record(&self, email: &Email) {
        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            kind = ?email.kind,
            "email sent"
        );
        if email.kind != EmailKind::PasswordReset || self.reveal_links {
            debug!(to = %email.to, body = %email.text(), "email body");
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.record(&email);
        Ok(())
    }
}

/// Keeps every message in memory; can be switched to fail deliveries.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn fail_deliveries(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Delivery(format!("refused message to {}", email.to)));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Delivery("mailbox lock poisoned".into()))?
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use tracing::Level;

    use super::*;

    const RESET_TOKEN: &str = "4f1c0a9e7d2b";

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged(mailer: &LogMailer, email: &Email, level: Level) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || mailer.record(email));
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn reset_email() -> Email {
        Email::password_reset(
            "a@b.io",
            "Ann",
            format!("http://x/api/v1/users/reset-password/{RESET_TOKEN}"),
        )
    }

    #[test]
    fn reset_token_stays_out_of_info_logs() {
        let out = logged(&LogMailer::new("ops@tourbook.io"), &reset_email(), Level::INFO);
        assert!(out.contains("email sent"));
        assert!(out.contains("a@b.io"));
        assert!(!out.contains(RESET_TOKEN));
    }

    #[test]
    fn reset_body_needs_revealed_links_even_at_debug() {
        let hidden = logged(&LogMailer::new("ops@tourbook.io"), &reset_email(), Level::DEBUG);
        assert!(!hidden.contains(RESET_TOKEN));

        let mailer = LogMailer::new("ops@tourbook.io").revealing_links(true);
        let shown = logged(&mailer, &reset_email(), Level::DEBUG);
        assert!(shown.contains(RESET_TOKEN));
        assert!(!logged(&mailer, &reset_email(), Level::INFO).contains(RESET_TOKEN));
    }

    #[test]
    fn welcome_body_is_debug_only() {
        let email = Email::welcome("a@b.io", "Ann", "http://x/me".into());
        let mailer = LogMailer::new("ops@tourbook.io");
        assert!(!logged(&mailer, &email, Level::INFO).contains("http://x/me"));
        assert!(logged(&mailer, &email, Level::DEBUG).contains("http://x/me"));
    }

    #[tokio::test]
    async fn recording_mailer_records_and_fails_on_demand() {
        let mailer = RecordingMailer::new();
        mailer
            .send(Email::welcome("a@b.io", "Ann", "http://x/me".into()))
            .await
            .unwrap();
        assert_eq!(mailer.sent().len(), 1);

        mailer.fail_deliveries(true);
        let reset = Email::password_reset("a@b.io", "Ann", "http://x/reset/abc".into());
        assert!(mailer.send(reset).await.is_err());
        assert_eq!(mailer.sent().len(), 1);
    }

    #[test]
    fn reset_text_carries_the_link() {
        let email = Email::password_reset("a@b.io", "Ann", "http://x/reset/abc".into());
        assert!(email.text().contains("http://x/reset/abc"));
        assert!(email.text().starts_with("Hi Ann"));
    }
}
