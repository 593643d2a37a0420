use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::{json, Value};
use std::time::Duration;

use crate::workflow::context::ExecutionContext;
use crate::workflow::errors::NodeError;
use crate::workflow::models::Node;
use crate::workflow::template;

const SMTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RELAY_HOST: &str = "smtp.gmail.com";
const DEFAULT_RELAY_PORT: u16 = 587;

const REQUIRED_PARAMETERS: [&str; 5] = ["from_email", "app_password", "to", "subject", "body"];

struct EmailParams {
    from_email: String,
    app_password: String,
    to: String,
    subject: String,
    body: String,
}

impl EmailParams {
    fn from_node(node: &Node) -> Result<Self, NodeError> {
        for parameter in REQUIRED_PARAMETERS {
            if node.string_parameter(parameter).is_none() {
                return Err(NodeError::execution(format!(
                    "Missing required parameter: {parameter}"
                )));
            }
        }

        let params = Self {
            from_email: node.string_parameter("from_email").unwrap_or_default().to_string(),
            app_password: node.string_parameter("app_password").unwrap_or_default().to_string(),
            to: node.string_parameter("to").unwrap_or_default().to_string(),
            subject: node.string_parameter("subject").unwrap_or_default().to_string(),
            body: node.string_parameter("body").unwrap_or_default().to_string(),
        };

        if !validator::validate_email(&params.from_email) {
            return Err(NodeError::execution(format!(
                "Invalid email address: {}",
                params.from_email
            )));
        }
        if !validator::validate_email(&params.to) {
            return Err(NodeError::execution(format!(
                "Invalid email address: {}",
                params.to
            )));
        }

        Ok(params)
    }
}

pub fn validate_parameters(node: &Node) -> Result<(), NodeError> {
    EmailParams::from_node(node).map(|_| ())
}

/// Sends templated mail through an authenticated STARTTLS relay. The relay
/// defaults to Gmail's submission endpoint; credentials come from the node's
/// own `from_email`/`app_password` parameters.
pub struct EmailSender {
    relay_host: String,
    relay_port: u16,
}

impl EmailSender {
    pub fn from_env() -> Self {
        let relay_host =
            std::env::var("SMTP_RELAY_HOST").unwrap_or_else(|_| DEFAULT_RELAY_HOST.to_string());
        let relay_port = std::env::var("SMTP_RELAY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_RELAY_PORT);
        Self {
            relay_host,
            relay_port,
        }
    }

    pub async fn execute(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
    ) -> Result<Value, NodeError> {
        let params = EmailParams::from_node(node)?;

        let subject = template::render(&params.subject, &context.data)?;
        let body = template::render(&params.body, &context.data)?;

        tracing::info!(node = %node.name, to = %params.to, "sending email");

        let message = Message::builder()
            .from(params.from_email.parse().map_err(|_| {
                NodeError::execution(format!("Invalid email address: {}", params.from_email))
            })?)
            .to(params.to.parse().map_err(|_| {
                NodeError::execution(format!("Invalid email address: {}", params.to))
            })?)
            .subject(subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(body.clone())
            .map_err(|e| NodeError::unexpected(format!("Failed to build email message: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.relay_host)
            .map_err(|e| NodeError::unexpected(format!("SMTP relay setup failed: {e}")))?
            .port(self.relay_port)
            .credentials(Credentials::new(
                params.from_email.clone(),
                params.app_password.clone(),
            ))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        if let Err(e) = transport.send(message).await {
            let message = format!("Failed to send email via gmail: {e}");
            context.add_error(message.clone());
            return Err(NodeError::execution(message));
        }

        Ok(json!({
            "success": true,
            "provider": "gmail",
            "sent_to": params.to,
            "subject": subject,
            "body": body,
        }))
    }
}
