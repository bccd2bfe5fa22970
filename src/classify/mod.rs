//! Payload classification.
//!
//! `classify` is a deterministic, total function from decoded text to a
//! `Classification`. Kinds are tried in a fixed precedence order and the first
//! match wins:
//!
//! 1. `WIFI`: `WIFI:` prefix (case-insensitive)
//! 2. `VCARD`: `BEGIN:VCARD` prefix (case-insensitive)
//! 3. `GEO`: `geo:` prefix (case-insensitive)
//! 4. `EMAIL`: `mailto:` prefix (case-insensitive)
//! 5. `SMS`: `smsto:` prefix (case-insensitive)
//! 6. `URL`: http(s)/ftp URL, or a bare `www.<domain>.<tld>`
//! 7. `TEXT`: fallback
//!
//! The kind depends only on the prefix/shape of the text. Field extraction is
//! best-effort: a `WIFI` payload without an SSID still classifies as `WIFI`
//! with empty fields, and the handler layer falls back to text handling.

pub mod uri;
pub mod vcard;
pub mod wifi;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub use vcard::VCard;
pub use wifi::{Security, WiFiCredential};

/// Semantic payload type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayloadKind {
    Wifi,
    Url,
    Text,
    Vcard,
    Geo,
    Email,
    Sms,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 7] = [
        PayloadKind::Wifi,
        PayloadKind::Url,
        PayloadKind::Text,
        PayloadKind::Vcard,
        PayloadKind::Geo,
        PayloadKind::Email,
        PayloadKind::Sms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Wifi => "WIFI",
            PayloadKind::Url => "URL",
            PayloadKind::Text => "TEXT",
            PayloadKind::Vcard => "VCARD",
            PayloadKind::Geo => "GEO",
            PayloadKind::Email => "EMAIL",
            PayloadKind::Sms => "SMS",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed interpretation of decoded text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: PayloadKind,
    pub fields: BTreeMap<String, String>,
    /// The decoded text exactly as classified.
    pub raw: String,
}

impl Classification {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

static URL_PATTERN: OnceLock<Regex> = OnceLock::new();
static WWW_PATTERN: OnceLock<Regex> = OnceLock::new();

fn url_pattern() -> &'static Regex {
    URL_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(https?|ftp)://[^\s/$.?#].[^\s]*$").expect("static URL regex")
    })
}

fn www_pattern() -> &'static Regex {
    WWW_PATTERN.get_or_init(|| Regex::new(r"(?i)^www\..+\..+$").expect("static www regex"))
}

/// Case-insensitive ASCII prefix test that never splits a UTF-8 sequence.
pub(crate) fn has_prefix_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Determine the payload kind. Precedence order is fixed; see module docs.
pub fn classify_kind(text: &str) -> PayloadKind {
    if has_prefix_ignore_case(text, "WIFI:") {
        PayloadKind::Wifi
    } else if has_prefix_ignore_case(text, "BEGIN:VCARD") {
        PayloadKind::Vcard
    } else if has_prefix_ignore_case(text, "geo:") {
        PayloadKind::Geo
    } else if has_prefix_ignore_case(text, "mailto:") {
        PayloadKind::Email
    } else if has_prefix_ignore_case(text, "smsto:") {
        PayloadKind::Sms
    } else if url_pattern().is_match(text) || www_pattern().is_match(text) {
        PayloadKind::Url
    } else {
        PayloadKind::Text
    }
}

/// Classify decoded text and extract the fields for its kind.
///
/// Empty input is not a valid call and is rejected.
pub fn classify(text: &str) -> Result<Classification> {
    if text.is_empty() {
        return Err(anyhow!("cannot classify an empty payload"));
    }
    let kind = classify_kind(text);
    let fields = match kind {
        PayloadKind::Wifi => wifi::parse_fields(text),
        PayloadKind::Vcard => VCard::parse(text).to_fields(),
        PayloadKind::Geo => uri::parse_geo(text),
        PayloadKind::Email => uri::parse_mailto(text),
        PayloadKind::Sms => uri::parse_smsto(text),
        PayloadKind::Url => BTreeMap::from([("url".to_string(), normalize_url(text))]),
        PayloadKind::Text => BTreeMap::from([("text".to_string(), text.to_string())]),
    };
    Ok(Classification {
        kind,
        fields,
        raw: text.to_string(),
    })
}

/// Give scheme-less `www.` URLs an https scheme so they can be opened directly.
pub fn normalize_url(text: &str) -> String {
    if text.contains("://") {
        text.to_string()
    } else {
        format!("https://{}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order_is_fixed() {
        assert_eq!(classify_kind("WIFI:S:x;;"), PayloadKind::Wifi);
        assert_eq!(classify_kind("wifi:S:x;;"), PayloadKind::Wifi);
        assert_eq!(classify_kind("BEGIN:VCARD\nFN:A\nEND:VCARD"), PayloadKind::Vcard);
        assert_eq!(classify_kind("GEO:1,2"), PayloadKind::Geo);
        assert_eq!(classify_kind("MailTo:a@b.com"), PayloadKind::Email);
        assert_eq!(classify_kind("SMSTO:+1555:hi"), PayloadKind::Sms);
        assert_eq!(classify_kind("ftp://files.example.com/x"), PayloadKind::Url);
        assert_eq!(classify_kind("plain words"), PayloadKind::Text);
    }

    #[test]
    fn url_shapes() {
        assert_eq!(classify_kind("https://example.com/path"), PayloadKind::Url);
        assert_eq!(classify_kind("HTTP://EXAMPLE.COM"), PayloadKind::Url);
        assert_eq!(classify_kind("www.example.com"), PayloadKind::Url);
        assert_eq!(classify_kind("not a url at all"), PayloadKind::Text);
        assert_eq!(classify_kind("https://exa mple.com"), PayloadKind::Text);
        assert_eq!(classify_kind("www.example"), PayloadKind::Text);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(classify("").is_err());
        assert_eq!(classify(" ").map(|c| c.kind).ok(), Some(PayloadKind::Text));
    }

    #[test]
    fn short_and_multibyte_inputs_do_not_panic() {
        assert_eq!(classify_kind("W"), PayloadKind::Text);
        assert_eq!(classify_kind("Wé"), PayloadKind::Text);
        assert_eq!(classify_kind("ééééééééééééé"), PayloadKind::Text);
    }

    #[test]
    fn www_urls_are_normalized() -> Result<()> {
        let c = classify("www.example.com")?;
        assert_eq!(c.field("url"), Some("https://www.example.com"));
        let c = classify("ftp://files.example.com/a")?;
        assert_eq!(c.field("url"), Some("ftp://files.example.com/a"));
        Ok(())
    }

    #[test]
    fn text_fallback_carries_text_field() -> Result<()> {
        let c = classify("hello")?;
        assert_eq!(c.kind, PayloadKind::Text);
        assert_eq!(c.field("text"), Some("hello"));
        assert_eq!(c.raw, "hello");
        Ok(())
    }
}
