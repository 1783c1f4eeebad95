//! Outgoing account emails.
//!
//! Bodies are rendered from askama templates under `templates/emails/`.
//! Without an `[email]` config section messages are only written to the
//! log. The in-memory outbox backend exists for tests.

use askama::Template;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::users::models::User;

pub type MailResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Activation,
    Approval,
    Rejection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub kind: EmailKind,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Template)]
#[template(path = "emails/activation_body.txt")]
struct ActivationEmail<'a> {
    username: &'a str,
    site_name: &'a str,
    activation_url: String,
    moderated: bool,
}

#[derive(Template)]
#[template(path = "emails/approval_body.txt")]
struct ApprovalEmail<'a> {
    username: &'a str,
    site_name: &'a str,
    login_url: String,
}

#[derive(Template)]
#[template(path = "emails/rejection_body.txt")]
struct RejectionEmail<'a> {
    username: &'a str,
    site_name: &'a str,
}

#[derive(Clone)]
enum Backend {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Logs each message and drops it.
    Log,
    Memory(Arc<Mutex<Vec<OutgoingEmail>>>),
}

#[derive(Clone)]
pub struct Mailer {
    site_name: String,
    base_url: String,
    from_address: String,
    backend: Backend,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> MailResult<Self> {
        let Some(email) = &config.email else {
            warn!("Email not configured, messages will only be logged");
            return Ok(Self::log_only(&config.site_name, &config.base_url));
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(&email.smtp_url)
            .map_err(|e| format!("SMTP setup failed: {}", e))?
            .build();

        Ok(Self {
            site_name: config.site_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            from_address: email.from_address.clone(),
            backend: Backend::Smtp(transport),
        })
    }

    pub fn log_only(site_name: &str, base_url: &str) -> Self {
        Self::unconfigured(site_name, base_url, Backend::Log)
    }

    pub fn in_memory(site_name: &str, base_url: &str) -> Self {
        Self::unconfigured(
            site_name,
            base_url,
            Backend::Memory(Arc::new(Mutex::new(Vec::new()))),
        )
    }

    fn unconfigured(site_name: &str, base_url: &str, backend: Backend) -> Self {
        Self {
            site_name: site_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            from_address: format!("no-reply@{}", site_host(base_url)),
            backend,
        }
    }

    /// Messages captured by the in-memory backend; always empty otherwise.
    pub fn outbox(&self) -> Vec<OutgoingEmail> {
        match &self.backend {
            Backend::Memory(outbox) => outbox
                .lock()
                .map(|messages| messages.clone())
                .unwrap_or_default(),
            Backend::Smtp(_) | Backend::Log => Vec::new(),
        }
    }

    pub async fn send_activation_email(
        &self,
        user: &User,
        token: &str,
        moderated: bool,
    ) -> MailResult<()> {
        let body = ActivationEmail {
            username: &user.username,
            site_name: &self.site_name,
            activation_url: format!("{}/api/users/activate/{}", self.base_url, token),
            moderated,
        }
        .render()?;

        self.send(
            EmailKind::Activation,
            &user.email,
            format!("Your signup at {}", self.site_name),
            body,
        )
        .await
    }

    pub async fn send_approval_email(&self, user: &User) -> MailResult<()> {
        let body = ApprovalEmail {
            username: &user.username,
            site_name: &self.site_name,
            login_url: format!("{}/login", self.base_url),
        }
        .render()?;

        self.send(
            EmailKind::Approval,
            &user.email,
            format!("Your account at {} has been approved", self.site_name),
            body,
        )
        .await
    }

    pub async fn send_rejection_email(&self, user: &User) -> MailResult<()> {
        let body = RejectionEmail {
            username: &user.username,
            site_name: &self.site_name,
        }
        .render()?;

        self.send(
            EmailKind::Rejection,
            &user.email,
            format!("Your signup at {} was not approved", self.site_name),
            body,
        )
        .await
    }

    async fn send(
        &self,
        kind: EmailKind,
        to: &str,
        subject: String,
        body: String,
    ) -> MailResult<()> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| format!("Invalid to address {:?}: {}", to, e))?;

        match &self.backend {
            Backend::Smtp(transport) => {
                let email = Message::builder()
                    .from(
                        self.from_address
                            .parse()
                            .map_err(|e| format!("Invalid from address: {}", e))?,
                    )
                    .to(recipient)
                    .subject(subject.as_str())
                    .header(ContentType::TEXT_PLAIN)
                    .body(body)
                    .map_err(|e| format!("Failed to build email: {}", e))?;

                transport
                    .send(email)
                    .await
                    .map_err(|e| format!("Failed to send email: {}", e))?;
            }
            Backend::Log => {
                info!("Email not delivered ({:?} to {}): {}", kind, to, subject);
                debug!("{}", body);
                return Ok(());
            }
            Backend::Memory(outbox) => {
                outbox
                    .lock()
                    .map_err(|e| format!("outbox poisoned: {}", e))?
                    .push(OutgoingEmail {
                        kind,
                        to: to.to_string(),
                        subject: subject.clone(),
                        body,
                    });
            }
        }

        info!("Sent {:?} email to {}: {}", kind, to, subject);
        Ok(())
    }
}

fn site_host(base_url: &str) -> &str {
    let without_scheme = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);
    without_scheme
        .split(['/', ':'])
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or("localhost")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: 1,
            username: "marie".to_string(),
            email: "marie@example.com".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            is_superuser: false,
            is_active: false,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_site_host() {
        assert_eq!(site_host("https://example.org/path"), "example.org");
        assert_eq!(site_host("http://localhost:3000"), "localhost");
        assert_eq!(site_host(""), "localhost");
    }

    #[test]
    fn test_approval_email_lands_in_outbox() {
        let mailer = Mailer::in_memory("Test Site", "http://example.org/");
        tokio_test::block_on(mailer.send_approval_email(&user())).unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].kind, EmailKind::Approval);
        assert_eq!(outbox[0].to, "marie@example.com");
        assert!(outbox[0].body.contains("http://example.org/login"));
        assert!(outbox[0].body.contains("Hello marie"));
    }

    #[test]
    fn test_activation_email_contains_link() {
        let mailer = Mailer::in_memory("Test Site", "http://example.org");
        tokio_test::block_on(mailer.send_activation_email(&user(), "tok", true)).unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox[0].kind, EmailKind::Activation);
        assert!(outbox[0]
            .body
            .contains("http://example.org/api/users/activate/tok"));
        assert!(outbox[0].body.contains("member of staff"));
    }

    #[test]
    fn test_log_only_mailer_keeps_nothing() {
        let mailer = Mailer::log_only("Test Site", "http://example.org");
        for _ in 0..3 {
            tokio_test::block_on(mailer.send_activation_email(&user(), "tok", false)).unwrap();
        }
        assert!(mailer.outbox().is_empty());
    }

    #[test]
    fn test_unconfigured_mailer_does_not_retain_messages() {
        let mailer = Mailer::new(&AppConfig::default()).unwrap();
        tokio_test::block_on(mailer.send_approval_email(&user())).unwrap();
        assert!(mailer.outbox().is_empty());
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        let mailer = Mailer::in_memory("Test Site", "http://example.org");
        let mut broken = user();
        broken.email = "not-an-address".to_string();

        assert!(tokio_test::block_on(mailer.send_rejection_email(&broken)).is_err());
        assert!(mailer.outbox().is_empty());
    }

    #[test]
    fn test_clones_share_outbox() {
        let mailer = Mailer::in_memory("Test Site", "http://example.org");
        let clone = mailer.clone();
        tokio_test::block_on(clone.send_rejection_email(&user())).unwrap();

        assert_eq!(mailer.outbox().len(), 1);
        assert_eq!(mailer.outbox()[0].kind, EmailKind::Rejection);
    }
}
