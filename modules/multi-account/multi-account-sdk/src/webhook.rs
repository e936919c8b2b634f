//! Webhook boundary models.

use std::collections::HashMap;

use bytes::Bytes;

use crate::secret::SecretString;

/// Raw webhook delivery as received from the provider.
#[derive(Debug, Clone, Default)]
pub struct WebhookPayload {
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl WebhookPayload {
    #[must_use]
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// Response the dispatcher wants sent back to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub body: String,
}

impl WebhookReply {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: String::new(),
        }
    }
}

/// Endpoint created on the provider side.
///
/// The signing secret is only returned on creation.
#[derive(Debug, Clone)]
pub struct WebhookEndpoint {
    pub id: String,
    pub secret: Option<SecretString>,
}
