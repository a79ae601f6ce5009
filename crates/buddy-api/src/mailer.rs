use anyhow::{Context, Result};
use async_trait::async_trait;
use buddy_db::models::UnnotifiedGroup;
use lettre::message::{Mailbox, header::ContentType};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::MailConfig;

/// Outgoing email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(&self, email: &str, username: &str, code: &str) -> Result<()>;

    /// One email to the receiver listing the sender's unread messages.
    async fn send_message_notification(&self, group: &UnnotifiedGroup) -> Result<()>;
}

// -- Email content --

pub const VERIFICATION_SUBJECT: &str = "Email verification for Buddy Brno";

pub fn notification_subject(sender: &str) -> String {
    format!("{sender} sent you a message on Buddy Brno")
}

pub fn verification_text(app_url: &str, username: &str, code: &str) -> String {
    format!(
        "Hello {username},\n\n\
         welcome to Buddy Brno. Please verify your email address at\n\n\
         {app_url}/verify-email/{username}/{code}\n\n\
         or enter the code {code} in the app.\n"
    )
}

pub fn notification_text(app_url: &str, group: &UnnotifiedGroup) -> String {
    let mut text = format!(
        "Hello {},\n\n{} sent you {}:\n\n",
        group.receiver,
        group.sender,
        if group.messages.len() > 1 {
            "new messages"
        } else {
            "a new message"
        }
    );
    for message in &group.messages {
        text.push_str(&format!("> {}\n\n", message.body.replace('\n', "\n> ")));
    }
    text.push_str(&format!(
        "Reply at {app_url}/messages/{}\n",
        group.sender
    ));
    text
}

// -- SMTP --

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    app_url: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, host: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(config.smtp_port)
            .build();
        let from = config
            .from
            .parse()
            .with_context(|| format!("Invalid sender address {}", config.from))?;

        Ok(Self {
            transport,
            from,
            app_url: config.app_url.clone(),
        })
    }

    async fn send(&self, to: &str, subject: String, body: String) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().with_context(|| format!("Invalid recipient {to}"))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_email(&self, email: &str, username: &str, code: &str) -> Result<()> {
        self.send(
            email,
            VERIFICATION_SUBJECT.to_string(),
            verification_text(&self.app_url, username, code),
        )
        .await?;
        info!("Sent verification email to {}", username);
        Ok(())
    }

    async fn send_message_notification(&self, group: &UnnotifiedGroup) -> Result<()> {
        self.send(
            &group.receiver_email,
            notification_subject(&group.sender),
            notification_text(&self.app_url, group),
        )
        .await?;
        info!("Notified {} about messages from {}", group.receiver, group.sender);
        Ok(())
    }
}

// -- Log only --

/// Writes mail to the log instead of sending it. Used when no SMTP host is set.
pub struct LogMailer {
    app_url: String,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            app_url: config.app_url.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_email(&self, email: &str, username: &str, _code: &str) -> Result<()> {
        info!("Verification email for {} <{}> (SMTP disabled)", username, email);
        Ok(())
    }

    async fn send_message_notification(&self, group: &UnnotifiedGroup) -> Result<()> {
        info!(
            "{} to <{}>: {} message(s), see {}/messages/{} (SMTP disabled)",
            notification_subject(&group.sender),
            group.receiver_email,
            group.messages.len(),
            self.app_url,
            group.sender
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buddy_db::models::UnnotifiedMessage;

    fn group(bodies: &[&str]) -> UnnotifiedGroup {
        UnnotifiedGroup {
            sender: "bud".into(),
            receiver: "com".into(),
            receiver_email: "com@example.com".into(),
            messages: bodies
                .iter()
                .enumerate()
                .map(|(i, body)| UnnotifiedMessage {
                    id: i.to_string(),
                    body: body.to_string(),
                    created: i as i64,
                })
                .collect(),
        }
    }

    #[test]
    fn notification_subject_names_sender() {
        assert_eq!(notification_subject("bud"), "bud sent you a message on Buddy Brno");
    }

    #[test]
    fn notification_text_quotes_every_message() {
        let text = notification_text("https://app", &group(&["hi", "two\nlines"]));
        assert!(text.starts_with("Hello com,"));
        assert!(text.contains("new messages"));
        assert!(text.contains("> hi\n"));
        assert!(text.contains("> two\n> lines\n"));
        assert!(text.ends_with("https://app/messages/bud\n"));
    }

    #[test]
    fn verification_text_contains_code() {
        let text = verification_text("https://app", "anna", "abc123");
        assert!(text.contains("https://app/verify-email/anna/abc123"));
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let config = MailConfig {
            smtp_host: Some("localhost".into()),
            smtp_port: 25,
            from: "not an address".into(),
            app_url: "https://app".into(),
        };
        assert!(SmtpMailer::new(&config, "localhost").is_err());
    }
}
