use anyhow::Result;

use qr_wifi_scanner::classify::wifi::escape_wifi_value;
use qr_wifi_scanner::{classify, ContentAction, HandlerRegistry, PayloadKind, Security, WiFiCredential};

#[test]
fn documented_examples_classify_as_expected() -> Result<()> {
    let cases = [
        ("WIFI:S:TestNet;T:WPA2;P:secret123;;", PayloadKind::Wifi),
        ("https://example.com/path", PayloadKind::Url),
        ("www.example.com", PayloadKind::Url),
        ("not a url at all", PayloadKind::Text),
        ("mailto:a@b.com", PayloadKind::Email),
        ("geo:37.7,-122.4", PayloadKind::Geo),
        ("SMSTO:+15551234:hi", PayloadKind::Sms),
        ("BEGIN:VCARD\nFN:A\nEND:VCARD", PayloadKind::Vcard),
    ];
    for (text, kind) in cases {
        assert_eq!(classify(text)?.kind, kind, "{text}");
    }
    Ok(())
}

#[test]
fn classification_is_deterministic() -> Result<()> {
    for text in ["WIFI:S:a;;", "www.example.com", "plain", "geo:1,2?q=x"] {
        assert_eq!(classify(text)?, classify(text)?);
    }
    Ok(())
}

#[test]
fn prefix_precedence_beats_url_shape() -> Result<()> {
    // Looks like a URL after the prefix, but the prefix decides.
    assert_eq!(classify("WIFI:S:https://example.com;;")?.kind, PayloadKind::Wifi);
    assert_eq!(classify("mailto:https://example.com")?.kind, PayloadKind::Email);
    Ok(())
}

#[test]
fn wifi_fields_are_exposed() -> Result<()> {
    let c = classify("WIFI:S:TestNet;T:WPA2;P:secret123;;")?;
    assert_eq!(c.field("S"), Some("TestNet"));
    assert_eq!(c.field("T"), Some("WPA2"));
    assert_eq!(c.field("P"), Some("secret123"));

    let cred = WiFiCredential::from_classification(&c).expect("valid wifi");
    assert_eq!(cred.security, Security::Wpa2);
    Ok(())
}

#[test]
fn empty_ssid_is_handled_as_text() -> Result<()> {
    let c = classify("WIFI:S:;")?;
    assert_eq!(c.kind, PayloadKind::Wifi);
    assert!(WiFiCredential::from_classification(&c).is_none());
    let action = HandlerRegistry::with_builtin().dispatch(&c);
    assert_eq!(action.kind(), PayloadKind::Text);
    Ok(())
}

#[test]
fn escaped_password_round_trips() -> Result<()> {
    let password = "a;b:c\\d;;";
    let payload = format!("WIFI:S:Net;T:WPA;P:{};;", escape_wifi_value(password));
    let c = classify(&payload)?;
    let cred = WiFiCredential::from_classification(&c).expect("valid wifi");
    assert_eq!(cred.password, password);
    Ok(())
}

#[test]
fn classification_serializes_for_cli_output() -> Result<()> {
    let json = serde_json::to_value(classify("geo:37.7,-122.4")?)?;
    assert_eq!(json["kind"], "GEO");
    assert_eq!(json["fields"]["latitude"], "37.7");
    Ok(())
}

#[test]
fn wifi_action_serialization_omits_password() -> Result<()> {
    let c = classify("WIFI:S:Home;P:hunter2;;")?;
    let action = HandlerRegistry::with_builtin().dispatch(&c);
    assert!(matches!(action, ContentAction::ConnectWifi { .. }));
    let json = serde_json::to_string(&action)?;
    assert!(json.contains("connect_wifi"));
    assert!(!json.contains("hunter2"));
    Ok(())
}
