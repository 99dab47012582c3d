//! Live delivery through an HTTP mail relay.
//!
//! The relay exposes two endpoints, both authenticated with HTTP basic auth
//! using the sender credentials:
//!
//! - `GET  {endpoint}/verify` answers 2xx when the relay can accept mail.
//! - `POST {endpoint}/send` takes an [`OutgoingMail`] JSON document and
//!   answers 2xx with a `{"message_id": ...}` receipt.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{reject_incomplete, DeliveryBackend, DeliveryFuture};
use crate::composer;
use crate::config::LiveConfig;
use crate::models::delivery::DeliveryResult;
use crate::models::reminder::ReminderMessage;
use crate::{AppError, Result};

/// Sender address and secret used to authenticate with the relay.
#[derive(Clone, PartialEq, Eq)]
pub struct SenderCredentials {
    /// Sender mailbox address; also the basic-auth user.
    pub address: String,
    /// Relay password or app secret.
    pub secret: String,
}

impl SenderCredentials {
    /// Build a credential pair.
    #[must_use]
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }
}

impl Debug for SenderCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// `From` header of an outgoing mail.
#[derive(Debug, Serialize)]
pub struct MailSender<'a> {
    /// Display name.
    pub name: &'a str,
    /// Mailbox address.
    pub address: &'a str,
}

/// JSON document posted to the relay's send endpoint.
#[derive(Debug, Serialize)]
pub struct OutgoingMail<'a> {
    /// Sender.
    pub from: MailSender<'a>,
    /// Recipient address.
    pub to: &'a str,
    /// Subject line.
    pub subject: &'a str,
    /// Plain-text part.
    pub text: &'a str,
    /// HTML part.
    pub html: String,
}

#[derive(Debug, Deserialize)]
struct RelayReceipt {
    message_id: String,
}

/// [`DeliveryBackend`] that sends through an HTTP mail relay.
pub struct LiveMailBackend {
    client: reqwest::Client,
    endpoint: String,
    sender_name: String,
    credentials: SenderCredentials,
    send_interval: Duration,
}

impl LiveMailBackend {
    /// Build the backend and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the endpoint is empty or the HTTP
    /// client cannot be created.
    pub fn new(config: &LiveConfig, credentials: SenderCredentials) -> Result<Self> {
        let endpoint = config.endpoint.trim().trim_end_matches('/').to_owned();
        if endpoint.is_empty() {
            return Err(AppError::Config("live.endpoint must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        info!(%endpoint, sender = %credentials.address, "live mail backend initialized");

        Ok(Self {
            client,
            endpoint,
            sender_name: config.sender_name.clone(),
            credentials,
            send_interval: config.send_interval(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    async fn post_mail(&self, message: &ReminderMessage) -> std::result::Result<String, String> {
        let mail = OutgoingMail {
            from: MailSender {
                name: &self.sender_name,
                address: &self.credentials.address,
            },
            to: &message.recipient,
            subject: &message.subject,
            text: &message.body,
            html: composer::render_html(&message.subject, &message.body),
        };

        let response = self
            .client
            .post(self.url("send"))
            .basic_auth(&self.credentials.address, Some(&self.credentials.secret))
            .json(&mail)
            .send()
            .await
            .map_err(|err| format!("transport error: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail = detail.trim();
            return Err(if detail.is_empty() {
                format!("relay responded {status}")
            } else {
                format!("relay responded {status}: {detail}")
            });
        }

        let receipt: RelayReceipt = response
            .json()
            .await
            .map_err(|err| format!("unreadable relay receipt: {err}"))?;
        if receipt.message_id.trim().is_empty() {
            return Err("relay receipt has an empty message_id".into());
        }
        Ok(receipt.message_id)
    }
}

impl Debug for LiveMailBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveMailBackend")
            .field("endpoint", &self.endpoint)
            .field("sender_name", &self.sender_name)
            .field("credentials", &self.credentials)
            .field("send_interval", &self.send_interval)
            .finish_non_exhaustive()
    }
}

impl DeliveryBackend for LiveMailBackend {
    fn name(&self) -> &'static str {
        "live"
    }

    fn send_interval(&self) -> Duration {
        self.send_interval
    }

    fn verify_connectivity(&self) -> DeliveryFuture<'_, bool> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url("verify"))
                .basic_auth(&self.credentials.address, Some(&self.credentials.secret))
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    info!(endpoint = %self.endpoint, "mail relay connection verified");
                    true
                }
                Ok(response) => {
                    error!(
                        endpoint = %self.endpoint,
                        status = %response.status(),
                        "mail relay rejected handshake"
                    );
                    false
                }
                Err(err) => {
                    error!(endpoint = %self.endpoint, %err, "mail relay handshake failed");
                    false
                }
            }
        })
    }

    fn send_one<'a>(&'a self, message: &'a ReminderMessage) -> DeliveryFuture<'a, DeliveryResult> {
        Box::pin(async move {
            if let Some(rejected) = reject_incomplete(message) {
                return rejected;
            }

            info!(recipient = %message.recipient, task_id = %message.task_id, "sending reminder");
            match self.post_mail(message).await {
                Ok(message_id) => {
                    info!(recipient = %message.recipient, %message_id, "reminder sent");
                    DeliveryResult::delivered(message.recipient.clone(), message_id)
                }
                Err(description) => {
                    warn!(recipient = %message.recipient, error = %description, "reminder send failed");
                    DeliveryResult::failed(message.recipient.clone(), description)
                }
            }
        })
    }
}
