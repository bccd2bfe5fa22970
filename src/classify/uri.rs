//! Field extraction for `geo:`, `mailto:` and `smsto:` payloads.
//!
//! Every parser returns at least the `uri` field; the rest are filled when the
//! payload is well formed.

use std::collections::BTreeMap;

fn base_fields(text: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("uri".to_string(), text.to_string())])
}

/// `geo:<lat>,<lon>[,<alt>][;params][?q=<query>]`
pub fn parse_geo(text: &str) -> BTreeMap<String, String> {
    let mut fields = base_fields(text);
    let body = text.get("geo:".len()..).unwrap_or_default();
    let (coords, query) = match body.split_once('?') {
        Some((coords, query)) => (coords, Some(query)),
        None => (body, None),
    };
    let coords = coords.split(';').next().unwrap_or_default();
    let parts: Vec<&str> = coords.split(',').map(str::trim).collect();
    let valid = |part: &str, limit: f64| part.parse::<f64>().is_ok_and(|v| v.abs() <= limit);
    if parts.len() >= 2 && valid(parts[0], 90.0) && valid(parts[1], 180.0) {
        fields.insert("latitude".into(), parts[0].to_string());
        fields.insert("longitude".into(), parts[1].to_string());
        if let Some(alt) = parts.get(2).filter(|a| a.parse::<f64>().is_ok()) {
            fields.insert("altitude".into(), alt.to_string());
        }
    }
    if let Some(q) = query.and_then(|q| query_value(q, "q")) {
        fields.insert("query".into(), q);
    }
    fields
}

/// `mailto:<address>[?subject=…&body=…]`
pub fn parse_mailto(text: &str) -> BTreeMap<String, String> {
    let mut fields = base_fields(text);
    let Ok(url) = url::Url::parse(text) else {
        return fields;
    };
    let address = url.path().trim();
    if !address.is_empty() {
        fields.insert("address".into(), address.to_string());
    }
    for (key, value) in url.query_pairs() {
        let key = key.to_ascii_lowercase();
        if matches!(key.as_str(), "subject" | "body" | "cc" | "bcc") && !value.is_empty() {
            fields.entry(key).or_insert_with(|| value.into_owned());
        }
    }
    fields
}

/// `smsto:<number>[:<message>]`
pub fn parse_smsto(text: &str) -> BTreeMap<String, String> {
    let mut fields = base_fields(text);
    let body = text.get("smsto:".len()..).unwrap_or_default();
    let (number, message) = match body.split_once(':') {
        Some((number, message)) => (number, Some(message)),
        None => (body, None),
    };
    let number = number.trim();
    if !number.is_empty() {
        fields.insert("number".into(), number.to_string());
    }
    if let Some(message) = message.filter(|m| !m.is_empty()) {
        fields.insert("message".into(), message.to_string());
    }
    fields
}

fn query_value(query: &str, wanted: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == wanted)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_coordinates_and_query() {
        let fields = parse_geo("geo:37.7,-122.4,15?q=Ferry%20Building");
        assert_eq!(fields["latitude"], "37.7");
        assert_eq!(fields["longitude"], "-122.4");
        assert_eq!(fields["altitude"], "15");
        assert_eq!(fields["query"], "Ferry Building");
    }

    #[test]
    fn geo_out_of_range_keeps_only_uri() {
        let fields = parse_geo("geo:123,456");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["uri"], "geo:123,456");
    }

    #[test]
    fn mailto_address_and_decoded_subject() {
        let fields = parse_mailto("mailto:a@b.com?subject=Hello%20there&body=Hi");
        assert_eq!(fields["address"], "a@b.com");
        assert_eq!(fields["subject"], "Hello there");
        assert_eq!(fields["body"], "Hi");
    }

    #[test]
    fn bare_mailto_has_address_only() {
        let fields = parse_mailto("mailto:a@b.com");
        assert_eq!(fields["address"], "a@b.com");
        assert!(!fields.contains_key("subject"));
    }

    #[test]
    fn smsto_number_and_message() {
        let fields = parse_smsto("SMSTO:+15551234:See you at 10: bring coffee");
        assert_eq!(fields["number"], "+15551234");
        assert_eq!(fields["message"], "See you at 10: bring coffee");

        let fields = parse_smsto("smsto:+15551234");
        assert!(!fields.contains_key("message"));
    }
}
