use axum::{extract::State, Json};
use common::{ContactEmailForm, ContactTelegramForm};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials as SmtpCredentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::{json, Value};

use crate::config::{SmtpConfig, TelegramConfig};
use crate::error::AppError;
use crate::response;
use crate::web_server::AppState;

// --- Templates ---

fn render_inquiry_email(form: &ContactEmailForm) -> String {
    format!(
        "<html>\n<body>\n\
         <h2>New inquiry from the website</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Phone:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Service:</strong> {}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{}</p>\n\
         </body>\n</html>",
        form.name, form.phone, form.email, form.service, form.message
    )
}

fn render_bot_message(form: &ContactTelegramForm) -> String {
    format!(
        "🏠 <b>New inquiry from the website</b>\n\n\
         👤 <b>Name:</b> {}\n\
         📱 <b>Preferred channel:</b> {}\n\
         💬 <b>Contact:</b> {}\n\
         🔑 <b>Service:</b> {}\n\n\
         ✉️ <b>Message:</b>\n{}",
        form.name, form.contact_method, form.contact, form.service, form.message
    )
}

// --- API Handlers ---

/// ## Forward a contact form to the agency mailbox
/// Delivery is synchronous and at-most-once; there is no retry queue.
#[utoipa::path(
    post,
    path = "/api/contact/email",
    request_body = ContactEmailForm,
    responses(
        (status = 200, description = "Mail accepted by the relay"),
        (status = 400, description = "Missing name, phone or email"),
        (status = 500, description = "Mail relay not configured or delivery failed")
    )
)]
pub async fn submit_email(
    State(state): State<AppState>,
    Json(form): Json<ContactEmailForm>,
) -> Result<Json<Value>, AppError> {
    if form.name.trim().is_empty()
        || form.phone.trim().is_empty()
        || form.email.trim().is_empty()
    {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    let smtp = state
        .config
        .smtp
        .as_ref()
        .ok_or_else(|| AppError::Config("Mail delivery not configured".to_string()))?;

    tracing::info!("Forwarding contact form from {} by email", form.name);

    let message = build_email(smtp, &form)?;
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        .map_err(|e| AppError::Upstream(format!("Failed to send email: {e}")))?
        .port(smtp.port)
        .credentials(SmtpCredentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ))
        .build();

    mailer
        .send(message)
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to send email: {e}")))?;

    Ok(response::ok(json!({ "message": "Email sent successfully" })))
}

fn build_email(smtp: &SmtpConfig, form: &ContactEmailForm) -> Result<Message, AppError> {
    Message::builder()
        .from(
            smtp.username
                .parse()
                .map_err(|_| AppError::Config("Invalid SMTP sender address".to_string()))?,
        )
        .to(smtp
            .recipient
            .parse()
            .map_err(|_| AppError::Config("Invalid SMTP recipient address".to_string()))?)
        .subject(format!("New website inquiry from {}", form.name))
        .header(ContentType::TEXT_HTML)
        .body(render_inquiry_email(form))
        .map_err(|e| AppError::Upstream(format!("Failed to build email: {e}")))
}

/// ## Forward a contact form to the messaging bot
#[utoipa::path(
    post,
    path = "/api/contact/telegram",
    request_body = ContactTelegramForm,
    responses(
        (status = 200, description = "Message accepted by the bot API"),
        (status = 400, description = "Missing name or contact"),
        (status = 500, description = "Bot not configured or delivery failed")
    )
)]
pub async fn submit_telegram(
    State(state): State<AppState>,
    Json(form): Json<ContactTelegramForm>,
) -> Result<Json<Value>, AppError> {
    if form.name.trim().is_empty() || form.contact.trim().is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    let telegram = state
        .config
        .telegram
        .as_ref()
        .ok_or_else(|| AppError::Config("Bot token or chat ID not configured".to_string()))?;

    tracing::info!("Forwarding contact form from {} to the bot", form.name);

    send_bot_message(&state, telegram, &render_bot_message(&form)).await?;

    Ok(response::ok(json!({
        "message": "Request forwarded to Telegram"
    })))
}

async fn send_bot_message(
    state: &AppState,
    telegram: &TelegramConfig,
    text: &str,
) -> Result<(), AppError> {
    let url = format!(
        "{}/bot{}/sendMessage",
        telegram.api_base, telegram.bot_token
    );

    let reply: Value = state
        .http_client
        .post(&url)
        .form(&[
            ("chat_id", telegram.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
        ])
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to send to Telegram: {e}")))?
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to send to Telegram: {e}")))?;

    if !reply.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Err(AppError::Upstream(format!("Telegram API error: {reply}")));
    }

    Ok(())
}
