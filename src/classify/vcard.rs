//! vCard field extraction.
//!
//! Only the handful of fields the contact prompt shows are pulled out, each
//! via a line-anchored match against the raw text. Missing fields are `None`.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VCard {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

struct Patterns {
    full_name: Regex,
    phone: Regex,
    email: Regex,
    organization: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        full_name: Regex::new(r"(?m)^FN:(.*)$").expect("static FN regex"),
        phone: Regex::new(r"(?m)^TEL.*:(.*)$").expect("static TEL regex"),
        email: Regex::new(r"(?m)^EMAIL.*:(.*)$").expect("static EMAIL regex"),
        organization: Regex::new(r"(?m)^ORG:(.*)$").expect("static ORG regex"),
    })
}

fn first_match(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

impl VCard {
    pub fn parse(text: &str) -> Self {
        let p = patterns();
        Self {
            full_name: first_match(&p.full_name, text),
            phone: first_match(&p.phone, text),
            email: first_match(&p.email, text),
            organization: first_match(&p.organization, text),
        }
    }

    /// Fields keyed by their vCard property names (`FN`, `TEL`, `EMAIL`, `ORG`).
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        [
            ("FN", &self.full_name),
            ("TEL", &self.phone),
            ("EMAIL", &self.email),
            ("ORG", &self.organization),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }

    pub fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        Self {
            full_name: fields.get("FN").cloned(),
            phone: fields.get("TEL").cloned(),
            email: fields.get("EMAIL").cloned(),
            organization: fields.get("ORG").cloned(),
        }
    }

    /// File name offered when saving the contact: the full name with anything
    /// outside `[A-Za-z0-9.-]` replaced by `_`, plus `.vcf`.
    pub fn suggested_file_name(&self) -> String {
        let base = self.full_name.as_deref().unwrap_or("contact");
        let sanitized: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}.vcf", sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Ada Lovelace\r\nORG:Analytical Engines\r\nTEL;TYPE=CELL:+44 20 7946 0000\r\nTEL;TYPE=WORK:+44 20 7946 1111\r\nEMAIL;TYPE=INTERNET:ada@example.org\r\nEND:VCARD";

    #[test]
    fn extracts_first_matching_lines() {
        let card = VCard::parse(SAMPLE);
        assert_eq!(card.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(card.organization.as_deref(), Some("Analytical Engines"));
        assert_eq!(card.phone.as_deref(), Some("+44 20 7946 0000"));
        assert_eq!(card.email.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn missing_fields_are_absent_not_errors() {
        let card = VCard::parse("BEGIN:VCARD\nFN:Solo\nEND:VCARD");
        assert_eq!(card.full_name.as_deref(), Some("Solo"));
        assert_eq!(card.phone, None);
        assert_eq!(card.to_fields().len(), 1);
    }

    #[test]
    fn suggested_file_name_is_sanitized() {
        let card = VCard::parse(SAMPLE);
        assert_eq!(card.suggested_file_name(), "Ada_Lovelace.vcf");
        assert_eq!(VCard::default().suggested_file_name(), "contact.vcf");
    }
}
