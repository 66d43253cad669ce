use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;
use std::time::Duration;

use crate::error::AppError;
use crate::models::ContactPayload;

const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

/// A composed contact-form message, independent of transport
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivers contact-form messages
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<(), AppError>;
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn compose_contact_message(app_name: &str, payload: &ContactPayload) -> ContactMessage {
    let phone = payload
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("-");

    let subject = format!("[{}] New Contact Form - {}", app_name, payload.name);
    let text_body = format!(
        "name: {}\nemail: {}\nphone: {}\nmessage:\n{}\n",
        payload.name, payload.email, phone, payload.message
    );
    let html_body = format!(
        "<h2>New contact form submission</h2>\n\
         <table>\n\
         <tr><th align=\"left\">Name</th><td>{}</td></tr>\n\
         <tr><th align=\"left\">Email</th><td>{}</td></tr>\n\
         <tr><th align=\"left\">Phone</th><td>{}</td></tr>\n\
         </table>\n\
         <p style=\"white-space: pre-wrap\">{}</p>\n",
        escape_html(&payload.name),
        escape_html(&payload.email),
        escape_html(phone),
        escape_html(&payload.message)
    );

    ContactMessage {
        subject,
        text_body,
        html_body,
    }
}

/// STARTTLS SMTP delivery to a fixed recipient
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        mail_to: &str,
    ) -> Result<Self, AppError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(SmtpCredentials::new(
                username.to_string(),
                password.to_string(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Self {
            transport,
            from: username.parse()?,
            to: mail_to.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &ContactMessage) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))?;
        self.transport.send(email).await?;
        info!("Contact mail sent: {}", message.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(phone: Option<&str>) -> ContactPayload {
        ContactPayload {
            name: "Ann <script>".to_string(),
            email: "ann@example.com".to_string(),
            message: "Hello & welcome".to_string(),
            phone: phone.map(str::to_string),
            captcha_token: "token".to_string(),
        }
    }

    #[test]
    fn test_compose_text_body() {
        let msg = compose_contact_message("example.com", &payload(Some(" 555-1234 ")));
        assert_eq!(msg.subject, "[example.com] New Contact Form - Ann <script>");
        assert_eq!(
            msg.text_body,
            "name: Ann <script>\nemail: ann@example.com\nphone: 555-1234\nmessage:\nHello & welcome\n"
        );
    }

    #[test]
    fn test_blank_phone_becomes_dash() {
        let msg = compose_contact_message("site", &payload(Some("   ")));
        assert!(msg.text_body.contains("phone: -\n"));
        let msg = compose_contact_message("site", &payload(None));
        assert!(msg.text_body.contains("phone: -\n"));
    }

    #[test]
    fn test_html_body_is_escaped() {
        let msg = compose_contact_message("site", &payload(None));
        assert!(msg.html_body.contains("Ann &lt;script&gt;"));
        assert!(msg.html_body.contains("Hello &amp; welcome"));
        assert!(!msg.html_body.contains("<script>"));
    }
}
