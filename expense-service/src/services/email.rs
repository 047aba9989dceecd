//! Expense email delivery over SMTP.
//!
//! Builds a branded multipart message (HTML + plain text) with the
//! receipt image attached, addressed to the treasury with the submitter
//! CC'd, plus the branch's validated unit email when known.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use service_core::error::AppError;
use std::sync::Mutex;

/// Decoded receipt image ready for attachment.
#[derive(Debug, Clone)]
pub struct ReceiptImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Everything needed to render and send one expense email.
#[derive(Debug, Clone)]
pub struct ExpenseEmail {
    pub user_email: String,
    pub date: String,
    pub branch: String,
    pub expense_type: String,
    pub amount: String,
    pub description: Option<String>,
    pub image: ReceiptImage,
    pub file_name: String,
    pub group_name: String,
    pub unit_email: Option<String>,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send the expense email; returns the SMTP message id when available.
    async fn send_expense(&self, email: &ExpenseEmail) -> Result<String, AppError>;
}

/// SMTP provider backed by lettre's async transport.
pub struct SmtpEmailService {
    config: SmtpConfig,
    treasury_email: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    pub fn new(config: SmtpConfig, treasury_email: String) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::EmailError(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            treasury_email,
            transport,
        })
    }

    fn build_message(&self, email: &ExpenseEmail) -> Result<Message, AppError> {
        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| AppError::EmailError(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = self
            .treasury_email
            .parse()
            .map_err(|e| AppError::EmailError(format!("Invalid treasury address: {}", e)))?;

        let submitter: Mailbox = email
            .user_email
            .parse()
            .map_err(|e| AppError::EmailError(format!("Invalid submitter address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .cc(submitter)
            .subject(format!(
                "Expense receipt - {} - {}",
                email.branch, email.date
            ));

        if let Some(unit_email) = &email.unit_email {
            let unit: Mailbox = unit_email
                .parse()
                .map_err(|e| AppError::EmailError(format!("Invalid unit address: {}", e)))?;
            builder = builder.cc(unit);
        }

        let content_type = ContentType::parse(&email.image.mime)
            .map_err(|e| AppError::EmailError(format!("Invalid attachment type: {}", e)))?;
        let attachment =
            Attachment::new(email.file_name.clone()).body(email.image.bytes.clone(), content_type);

        builder
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_PLAIN)
                                    .body(render_text(email)),
                            )
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(render_html(email)),
                            ),
                    )
                    .singlepart(attachment),
            )
            .map_err(|e| AppError::EmailError(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_expense(&self, email: &ExpenseEmail) -> Result<String, AppError> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| AppError::EmailError(format!("Failed to send email: {}", e)))?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_default();

        tracing::info!(
            branch = %email.branch,
            amount = %email.amount,
            "Expense email sent"
        );

        Ok(message_id)
    }
}

/// Recording mock used in tests and when SMTP is disabled.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<ExpenseEmail>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ExpenseEmail> {
        self.sent.lock().expect("mock email lock poisoned").clone()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_expense(&self, email: &ExpenseEmail) -> Result<String, AppError> {
        tracing::info!(to = %email.user_email, branch = %email.branch, "Mock email send");
        self.sent
            .lock()
            .expect("mock email lock poisoned")
            .push(email.clone());
        Ok(format!("mock-{}", uuid::Uuid::new_v4()))
    }
}

/// Decode a receipt image from a data URL or a raw base64 string.
pub fn decode_receipt_image(input: &str) -> Result<ReceiptImage, AppError> {
    if input.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Receipt image missing")));
    }

    let (mime, base64_part) = if let Some(rest) = input.strip_prefix("data:") {
        let (mime, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Malformed image data URL")))?;
        if !mime.starts_with("image/") {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Attachment must be an image"
            )));
        }
        (mime.to_string(), data)
    } else {
        ("image/jpeg".to_string(), input)
    };

    let cleaned: String = base64_part
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Image is not valid base64")))?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Image is empty")));
    }

    Ok(ReceiptImage { bytes, mime })
}

/// Header color per branch; unknown branches fall back to a neutral blue.
pub fn branch_color(branch: &str) -> &'static str {
    match branch {
        "Pionniers-Caravelles" => "#E30613",
        "Scouts" | "Guides" => "#0072CE",
        "Louveteaux" | "Jeannettes" => "#F28C00",
        "Compagnons" => "#00A19A",
        "Farfadets" => "#6CC24A",
        _ => "#1E3A8A",
    }
}

pub fn render_html(email: &ExpenseEmail) -> String {
    let primary = branch_color(&email.branch);
    let accent = "#FBB042";

    let description_row = email
        .description
        .as_deref()
        .map(|d| {
            format!(
                r#"<tr>
              <td style="padding: 10px 0; font-weight: bold; color: #374151; vertical-align: top;">Description:</td>
              <td style="padding: 10px 0; color: #374151;">{}</td>
            </tr>"#,
                d
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
      <div style="background-color: {primary}; color: #ffffff; padding: 20px; text-align: center;">
        <h1 style="margin: 0; font-size: 24px;">Expense receipt</h1>
        <p style="margin: 10px 0 0 0; opacity: 0.9;">{group}</p>
      </div>
      <div style="padding: 30px; background-color: #f9f9f9;">
        <h2 style="color: {primary}; margin-top: 0;">New receipt</h2>
        <div style="background-color: white; padding: 20px; border-radius: 8px; margin: 20px 0;">
          <table style="width: 100%; border-collapse: collapse;">
            <tr>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; font-weight: bold; color: #374151;">Date:</td>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; color: #374151;">{date}</td>
            </tr>
            <tr>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; font-weight: bold; color: #374151;">Branch:</td>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; color: #374151;">{branch}</td>
            </tr>
            <tr>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; font-weight: bold; color: #374151;">Type:</td>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; color: #374151;">{expense_type}</td>
            </tr>
            <tr>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; font-weight: bold; color: {primary};">Amount:</td>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; color: {primary}; font-weight: bold; font-size: 18px;">{amount} EUR</td>
            </tr>
            <tr>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; font-weight: bold; color: #374151;">Submitted by:</td>
              <td style="padding: 10px 0; border-bottom: 1px solid #eee; color: #374151;">{user_email}</td>
            </tr>
            {description_row}
          </table>
        </div>
        <div style="background-color: {accent}; color: {primary}; padding: 15px; border-radius: 8px; margin: 20px 0;">
          <strong>Receipt attached:</strong> {file_name}
        </div>
        <p style="color: #6B7280; font-size: 14px; margin-top: 30px;">
          Sent automatically by the expense service.
        </p>
      </div>
    </div>"#,
        primary = primary,
        accent = accent,
        group = email.group_name,
        date = email.date,
        branch = email.branch,
        expense_type = email.expense_type,
        amount = email.amount,
        user_email = email.user_email,
        description_row = description_row,
        file_name = email.file_name,
    )
}

pub fn render_text(email: &ExpenseEmail) -> String {
    let description = email
        .description
        .as_deref()
        .map(|d| format!("Description: {}\n", d))
        .unwrap_or_default();

    format!(
        "Expense receipt - {group}\n\n\
         New receipt\n\n\
         Date: {date}\n\
         Branch: {branch}\n\
         Type: {expense_type}\n\
         Amount: {amount} EUR\n\
         Submitted by: {user_email}\n\
         {description}\n\
         Receipt attached: {file_name}\n\n\
         Sent automatically by the expense service.\n",
        group = email.group_name,
        date = email.date,
        branch = email.branch,
        expense_type = email.expense_type,
        amount = email.amount,
        user_email = email.user_email,
        description = description,
        file_name = email.file_name,
    )
}
