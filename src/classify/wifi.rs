//! `WIFI:` payload parsing.
//!
//! Payload grammar: `WIFI:` followed by `KEY:VALUE` segments separated by `;`.
//! A `;` directly after a backslash never separates. Values then unescape
//! `\\`, `\;` and `\:` in that order. Recognised keys (case-insensitive):
//! `S` ssid (required), `P` password, `T` security, `H` hidden.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::{has_prefix_ignore_case, Classification, PayloadKind};

const PREFIX: &str = "WIFI:";

/// Network security declared by the payload's `T` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Security {
    Wpa,
    Wpa2,
    Wpa3,
    Wep,
    NoPass,
    /// Any other declared value, kept verbatim.
    Other(String),
}

impl Security {
    /// Parse a `T` value. Absent or empty values mean WPA.
    pub fn parse(value: Option<&str>) -> Self {
        let value = value.map(str::trim).unwrap_or("");
        match value.to_ascii_uppercase().as_str() {
            "" | "WPA" => Security::Wpa,
            "WPA2" => Security::Wpa2,
            "WPA3" => Security::Wpa3,
            "WEP" => Security::Wep,
            "NOPASS" => Security::NoPass,
            _ => Security::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Security::Wpa => "WPA",
            Security::Wpa2 => "WPA2",
            Security::Wpa3 => "WPA3",
            Security::Wep => "WEP",
            Security::NoPass => "nopass",
            Security::Other(value) => value,
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed WIFI credentials. `ssid` is never empty.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct WiFiCredential {
    pub ssid: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub security: Security,
    pub hidden: bool,
}

impl WiFiCredential {
    /// Parse a full `WIFI:` payload. `None` when the prefix or SSID is missing.
    pub fn parse(text: &str) -> Option<Self> {
        Self::from_fields(&parse_fields(text))
    }

    /// Build from a `WIFI` classification, `None` for any other kind or an
    /// invalid payload.
    pub fn from_classification(classification: &Classification) -> Option<Self> {
        if classification.kind != PayloadKind::Wifi {
            return None;
        }
        Self::from_fields(&classification.fields)
    }

    fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        let ssid = fields.get("S").filter(|s| !s.is_empty())?.clone();
        Some(Self {
            ssid,
            password: fields.get("P").cloned().unwrap_or_default(),
            security: Security::parse(fields.get("T").map(String::as_str)),
            hidden: fields
                .get("H")
                .is_some_and(|h| h.trim().eq_ignore_ascii_case("true")),
        })
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Encode back to a `WIFI:` payload that parses to an equal credential.
    pub fn to_payload(&self) -> String {
        let mut payload = format!(
            "{}T:{};S:{};",
            PREFIX,
            escape_wifi_value(self.security.as_str()),
            escape_wifi_value(&self.ssid)
        );
        if self.has_password() {
            payload.push_str(&format!("P:{};", escape_wifi_value(&self.password)));
        }
        if self.hidden {
            payload.push_str("H:true;");
        }
        payload.push(';');
        payload
    }
}

impl fmt::Debug for WiFiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiFiCredential")
            .field("ssid", &self.ssid)
            .field("password", &if self.has_password() { "<redacted>" } else { "" })
            .field("security", &self.security)
            .field("hidden", &self.hidden)
            .finish()
    }
}

/// Extract `KEY → value` pairs from a `WIFI:` payload.
///
/// Keys are upper-cased with backslashes stripped. Segments without a `:` are
/// ignored; a later duplicate key overrides an earlier one.
pub fn parse_fields(text: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    if !has_prefix_ignore_case(text, PREFIX) {
        return params;
    }
    for segment in split_unescaped(&text[PREFIX.len()..]) {
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        let key = key.replace('\\', "").to_ascii_uppercase();
        params.insert(key, unescape_wifi_value(value));
    }
    params
}

/// Split on `;` separators not directly preceded by a backslash. Escapes are
/// kept in the returned segments for `unescape_wifi_value`.
fn split_unescaped(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut prev = None;
    for (i, ch) in body.char_indices() {
        if ch == ';' && prev != Some('\\') {
            segments.push(&body[start..i]);
            start = i + 1;
        }
        prev = Some(ch);
    }
    segments.push(&body[start..]);
    segments
}

/// Resolve `\\`, then `\;`, then `\:`. The order matters: a value
/// written as `\\:` ends up as `:`.
pub fn unescape_wifi_value(value: &str) -> String {
    value
        .replace("\\\\", "\\")
        .replace("\\;", ";")
        .replace("\\:", ":")
}

/// Escape `\`, `;` and `:` so the value survives `parse_fields`.
///
/// A value ending in a backslash cannot round-trip: its escaped form ends in
/// `\\` and the separator after it reads as escaped.
pub fn escape_wifi_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ';' | ':') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
