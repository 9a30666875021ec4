//! Notification service implementation
//!
//! This service renders the booking confirmation and event reminder emails
//! from templates and delivers them over SMTP. Delivery is best-effort: the
//! caller logs a failure and carries on.

use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{Duration, NaiveTime};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};
use url::Url;
use crate::config::settings::{EmailConfig, Settings};
use crate::models::{Event, UserContact};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::format_event_date;

const CALENDAR_BASE_URL: &str = "https://www.google.com/calendar/render";
const CALENDAR_EVENT_HOURS: i64 = 2;

pub const TEMPLATE_BOOKING_CONFIRMED: &str = "booking_confirmed";
pub const TEMPLATE_EVENT_REMINDER: &str = "event_reminder";

/// Delivers booking and reminder notifications to users
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_booking_confirmed(&self, user: &UserContact, event: &Event) -> Result<()>;
    async fn notify_event_reminder(&self, user: &UserContact, event: &Event) -> Result<()>;
}

/// Email template with `{placeholder}` parameters in subject and body
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub key: String,
    pub subject: String,
    pub body: String,
}

/// Rendered email ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// SMTP backed notification service
#[derive(Clone)]
pub struct NotificationService {
    config: EmailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    templates: HashMap<String, MessageTemplate>,
}

impl NotificationService {
    /// Create a new NotificationService; without email enabled it only logs
    pub fn new(settings: &Settings) -> Result<Self> {
        let config = settings.email.clone();
        let transport = if settings.features.email_notifications && config.enabled {
            Some(Self::build_transport(&config)?)
        } else {
            None
        };

        Ok(Self {
            config,
            transport,
            templates: Self::load_default_templates(),
        })
    }

    fn build_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| EventHubError::Email(format!("SMTP relay error: {}", e)))?
            .port(config.smtp_port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(builder.build())
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Render a template, replacing every `{key}` with its parameter
    pub fn format_message(&self, template_key: &str, parameters: &HashMap<String, String>) -> Result<RenderedMessage> {
        let template = self.templates.get(template_key)
            .ok_or_else(|| EventHubError::InvalidInput(format!("Template not found: {}", template_key)))?;

        let mut subject = template.subject.clone();
        let mut body = template.body.clone();

        for (key, value) in parameters {
            let placeholder = format!("{{{}}}", key);
            subject = subject.replace(&placeholder, value);
            body = body.replace(&placeholder, &escape_html(value));
        }

        Ok(RenderedMessage { subject, body })
    }

    /// Add or update a template
    pub fn add_template(&mut self, template: MessageTemplate) {
        self.templates.insert(template.key.clone(), template);
    }

    pub fn get_template_keys(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    fn event_parameters(user: &UserContact, event: &Event) -> HashMap<String, String> {
        let mut parameters = HashMap::new();
        parameters.insert("user_name".to_string(), user.name.clone());
        parameters.insert("event_name".to_string(), event.name.clone());
        parameters.insert("event_date".to_string(), format_event_date(event.date));
        parameters.insert("event_time".to_string(), event.time.clone());
        parameters.insert("event_location".to_string(), event.location.clone());
        parameters
    }

    async fn send(&self, to: &UserContact, message: RenderedMessage) -> Result<()> {
        let Some(transport) = &self.transport else {
            warn!(to = %to.email, subject = %message.subject, "Email service is not configured, skipping message");
            return Ok(());
        };

        let from = Mailbox::new(
            Some(self.config.from_name.clone()),
            self.config.from_address.parse()
                .map_err(|e| EventHubError::Email(format!("Invalid from address: {}", e)))?,
        );
        let recipient = Mailbox::new(
            Some(to.name.clone()),
            to.email.parse()
                .map_err(|e| EventHubError::Email(format!("Invalid to address: {}", e)))?,
        );

        let email = Message::builder()
            .from(from)
            .to(recipient)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(message.body)
            .map_err(|e| EventHubError::Email(format!("Failed to build email: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| EventHubError::Email(format!("Failed to send email: {}", e)))?;

        info!(to = %to.email, subject = %message.subject, "Email sent");
        Ok(())
    }

    fn load_default_templates() -> HashMap<String, MessageTemplate> {
        let mut templates = HashMap::new();

        templates.insert(TEMPLATE_BOOKING_CONFIRMED.to_string(), MessageTemplate {
            key: TEMPLATE_BOOKING_CONFIRMED.to_string(),
            subject: "Booking Confirmed: {event_name}".to_string(),
            body: r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: auto; padding: 20px; border: 1px solid #ddd; border-radius: 10px; background-color: #f9f9f9;">
    <h2 style="color: #4CAF50;">Booking Confirmed!</h2>
    <p>Hi <strong>{user_name}</strong>,</p>
    <p>Your booking for the event <strong>{event_name}</strong> has been successfully confirmed.</p>
    <div style="background-color: #fff; padding: 15px; border-radius: 8px; margin: 20px 0; border: 1px solid #eee;">
        <p><strong>Event Details:</strong></p>
        <p>Date: {event_date} {event_time}</p>
        <p>Location: {event_location}</p>
    </div>
    <div style="text-align: center; margin: 30px 0;">
        <a href="{calendar_url}" target="_blank" style="background-color: #4285F4; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; font-weight: bold;">Add to Google Calendar</a>
    </div>
    <p>We look forward to seeing you there!</p>
    <p style="margin-top: 30px; font-size: 12px; color: #777;">This is an automated email. Please do not reply.</p>
</div>"#.to_string(),
        });

        templates.insert(TEMPLATE_EVENT_REMINDER.to_string(), MessageTemplate {
            key: TEMPLATE_EVENT_REMINDER.to_string(),
            subject: "Reminder: {event_name} is coming up!".to_string(),
            body: r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: auto; padding: 20px; border: 1px solid #ddd; border-radius: 10px; background-color: #fff3e0;">
    <h2 style="color: #e65100;">Event Reminder</h2>
    <p>Hi <strong>{user_name}</strong>,</p>
    <p>This is a reminder that the event <strong>{event_name}</strong> takes place on {event_date}.</p>
    <div style="background-color: #fff; padding: 15px; border-radius: 8px; margin: 20px 0; border: 1px solid #eee;">
        <p><strong>Event Details:</strong></p>
        <p>Date: {event_date} {event_time}</p>
        <p>Location: {event_location}</p>
    </div>
    <p>Don't forget to mark your calendar!</p>
    <p style="margin-top: 30px; font-size: 12px; color: #777;">This is an automated email. Please do not reply.</p>
</div>"#.to_string(),
        });

        templates
    }
}

#[async_trait]
impl NotificationDispatcher for NotificationService {
    async fn notify_booking_confirmed(&self, user: &UserContact, event: &Event) -> Result<()> {
        debug!(user_id = user.id, event_id = event.id, "Sending booking confirmation");

        let mut parameters = Self::event_parameters(user, event);
        parameters.insert("calendar_url".to_string(), calendar_link(event)?);

        let message = self.format_message(TEMPLATE_BOOKING_CONFIRMED, &parameters)?;
        self.send(user, message).await
    }

    async fn notify_event_reminder(&self, user: &UserContact, event: &Event) -> Result<()> {
        debug!(user_id = user.id, event_id = event.id, "Sending event reminder");

        let parameters = Self::event_parameters(user, event);
        let message = self.format_message(TEMPLATE_EVENT_REMINDER, &parameters)?;
        self.send(user, message).await
    }
}

/// "Add to Google Calendar" link for an event.
///
/// `time` is free text, so the entry starts at midnight UTC on the event date
/// and the text goes into the details.
pub fn calendar_link(event: &Event) -> Result<String> {
    let start = event.date.and_time(NaiveTime::MIN);
    let end = start + Duration::hours(CALENDAR_EVENT_HOURS);
    let dates = format!(
        "{}/{}",
        start.format("%Y%m%dT%H%M%SZ"),
        end.format("%Y%m%dT%H%M%SZ")
    );
    let details = format!("{}\nTime: {}", event.description, event.time);

    let url = Url::parse_with_params(
        CALENDAR_BASE_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", event.name.as_str()),
            ("dates", dates.as_str()),
            ("details", details.as_str()),
            ("location", event.location.as_str()),
        ],
    )
    .map_err(|e| EventHubError::InvalidInput(format!("Invalid calendar link: {}", e)))?;

    Ok(url.into())
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
