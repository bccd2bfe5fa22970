//! Content handlers: one per payload kind, each turning a `Classification`
//! into the action a front end would offer the user.
//!
//! Presentation is left to the caller. A handler only decides what the action
//! is and what it carries.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::classify::{normalize_url, Classification, PayloadKind, VCard, WiFiCredential};

const MASK: &str = "********";

/// What the user is offered for one detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContentAction {
    ConnectWifi {
        credential: WiFiCredential,
    },
    OpenUrl {
        url: String,
    },
    SaveContact {
        contact: VCard,
        file_name: String,
        vcard: String,
    },
    OpenLocation {
        uri: String,
        latitude: Option<String>,
        longitude: Option<String>,
        query: Option<String>,
    },
    ComposeEmail {
        uri: String,
        address: Option<String>,
        subject: Option<String>,
        body: Option<String>,
    },
    SendSms {
        number: Option<String>,
        message: Option<String>,
    },
    ShowText {
        text: String,
    },
}

impl ContentAction {
    pub fn kind(&self) -> PayloadKind {
        match self {
            ContentAction::ConnectWifi { .. } => PayloadKind::Wifi,
            ContentAction::OpenUrl { .. } => PayloadKind::Url,
            ContentAction::SaveContact { .. } => PayloadKind::Vcard,
            ContentAction::OpenLocation { .. } => PayloadKind::Geo,
            ContentAction::ComposeEmail { .. } => PayloadKind::Email,
            ContentAction::SendSms { .. } => PayloadKind::Sms,
            ContentAction::ShowText { .. } => PayloadKind::Text,
        }
    }

    /// One-line description for prompts and logs. Passwords are masked.
    pub fn summary(&self) -> String {
        match self {
            ContentAction::ConnectWifi { credential } => {
                let mut line = format!(
                    "Connect to WiFi '{}' ({}",
                    credential.ssid, credential.security
                );
                if credential.has_password() {
                    line.push_str(&format!(", password {}", MASK));
                }
                if credential.hidden {
                    line.push_str(", hidden");
                }
                line.push(')');
                line
            }
            ContentAction::OpenUrl { url } => format!("Open {}", url),
            ContentAction::SaveContact {
                contact, file_name, ..
            } => match &contact.full_name {
                Some(name) => format!("Save contact '{}' as {}", name, file_name),
                None => format!("Save contact as {}", file_name),
            },
            ContentAction::OpenLocation {
                uri,
                latitude,
                longitude,
                ..
            } => match (latitude, longitude) {
                (Some(lat), Some(lon)) => format!("Open location {}, {}", lat, lon),
                _ => format!("Open location {}", uri),
            },
            ContentAction::ComposeEmail {
                uri,
                address,
                subject,
                ..
            } => {
                let to = address.as_deref().unwrap_or(uri.as_str());
                match subject {
                    Some(subject) => format!("Compose email to {} ({})", to, subject),
                    None => format!("Compose email to {}", to),
                }
            }
            ContentAction::SendSms { number, message } => {
                let to = number.as_deref().unwrap_or("(no number)");
                match message {
                    Some(message) => format!("Send SMS to {}: {}", to, message),
                    None => format!("Send SMS to {}", to),
                }
            }
            ContentAction::ShowText { text } => format!("Text: {}", text),
        }
    }
}

impl fmt::Display for ContentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

pub trait ContentHandler: Send + Sync {
    fn kind(&self) -> PayloadKind;

    /// `None` when the payload lacks what this handler needs; the registry
    /// then falls back to text handling.
    fn handle(&self, classification: &Classification) -> Option<ContentAction>;
}

fn field(c: &Classification, key: &str) -> Option<String> {
    c.field(key).map(str::to_string)
}

pub struct WifiHandler;

impl ContentHandler for WifiHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Wifi
    }

    fn handle(&self, classification: &Classification) -> Option<ContentAction> {
        WiFiCredential::from_classification(classification)
            .map(|credential| ContentAction::ConnectWifi { credential })
    }
}

pub struct UrlHandler;

impl ContentHandler for UrlHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Url
    }

    fn handle(&self, classification: &Classification) -> Option<ContentAction> {
        let url = classification
            .field("url")
            .map(str::to_string)
            .unwrap_or_else(|| normalize_url(&classification.raw));
        Some(ContentAction::OpenUrl { url })
    }
}

pub struct VcardHandler;

impl ContentHandler for VcardHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Vcard
    }

    fn handle(&self, classification: &Classification) -> Option<ContentAction> {
        let contact = VCard::from_fields(&classification.fields);
        Some(ContentAction::SaveContact {
            file_name: contact.suggested_file_name(),
            contact,
            vcard: classification.raw.clone(),
        })
    }
}

pub struct GeoHandler;

impl ContentHandler for GeoHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Geo
    }

    fn handle(&self, c: &Classification) -> Option<ContentAction> {
        Some(ContentAction::OpenLocation {
            uri: c.raw.clone(),
            latitude: field(c, "latitude"),
            longitude: field(c, "longitude"),
            query: field(c, "query"),
        })
    }
}

pub struct EmailHandler;

impl ContentHandler for EmailHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Email
    }

    fn handle(&self, c: &Classification) -> Option<ContentAction> {
        Some(ContentAction::ComposeEmail {
            uri: c.raw.clone(),
            address: field(c, "address"),
            subject: field(c, "subject"),
            body: field(c, "body"),
        })
    }
}

pub struct SmsHandler;

impl ContentHandler for SmsHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Sms
    }

    fn handle(&self, c: &Classification) -> Option<ContentAction> {
        Some(ContentAction::SendSms {
            number: field(c, "number"),
            message: field(c, "message"),
        })
    }
}

pub struct TextHandler;

impl ContentHandler for TextHandler {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Text
    }

    fn handle(&self, c: &Classification) -> Option<ContentAction> {
        Some(ContentAction::ShowText {
            text: c.raw.clone(),
        })
    }
}

/// Handlers keyed by payload kind.
pub struct HandlerRegistry {
    handlers: HashMap<PayloadKind, Box<dyn ContentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// One built-in handler for each of the seven kinds.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WifiHandler));
        registry.register(Box::new(UrlHandler));
        registry.register(Box::new(VcardHandler));
        registry.register(Box::new(GeoHandler));
        registry.register(Box::new(EmailHandler));
        registry.register(Box::new(SmsHandler));
        registry.register(Box::new(TextHandler));
        registry
    }

    /// Install a handler, replacing any handler for the same kind.
    pub fn register(&mut self, handler: Box<dyn ContentHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn has_handler(&self, kind: PayloadKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route a classification to its handler. Payloads the handler rejects,
    /// such as a WIFI payload without an SSID, are shown as text.
    pub fn dispatch(&self, classification: &Classification) -> ContentAction {
        let action = self
            .handlers
            .get(&classification.kind)
            .and_then(|handler| handler.handle(classification));
        match action {
            Some(action) => action,
            None => {
                log::debug!(
                    "{} payload not handled as such; showing as text",
                    classification.kind
                );
                self.handlers
                    .get(&PayloadKind::Text)
                    .and_then(|handler| handler.handle(classification))
                    .unwrap_or_else(|| ContentAction::ShowText {
                        text: classification.raw.clone(),
                    })
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
