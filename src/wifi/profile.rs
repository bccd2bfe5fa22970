//! Windows WLAN profile descriptor.

use std::borrow::Cow;

use quick_xml::escape::escape;

use crate::classify::wifi::{Security, WiFiCredential};

const WLAN_PROFILE_NS: &str = "http://www.microsoft.com/networking/WLAN/profile/v1";

/// Authentication/encryption pair written into the profile's security block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfileSecurity {
    pub authentication: &'static str,
    pub encryption: &'static str,
    pub include_key: bool,
}

impl ProfileSecurity {
    pub fn for_security(security: &Security) -> Self {
        let (authentication, encryption, include_key) = match security {
            Security::Wpa3 => ("WPA3PSK", "AES", true),
            Security::Wpa | Security::Wpa2 => ("WPA2PSK", "AES", true),
            Security::Wep => ("open", "WEP", true),
            Security::NoPass | Security::Other(_) => ("open", "none", false),
        };
        Self {
            authentication,
            encryption,
            include_key,
        }
    }
}

/// Render the profile XML imported by `netsh wlan add profile`. The profile
/// is named after the SSID. SSID and key material are XML-escaped.
pub fn render_profile(credential: &WiFiCredential) -> String {
    let sec = ProfileSecurity::for_security(&credential.security);
    let ssid: Cow<'_, str> = escape(credential.ssid.as_str());
    let key_material = if sec.include_key {
        format!(
            "<keyMaterial>{}</keyMaterial>",
            escape(credential.password.as_str())
        )
    } else {
        String::new()
    };
    format!(
        concat!(
            "<?xml version=\"1.0\"?>",
            "<WLANProfile xmlns=\"{ns}\">",
            "<name>{ssid}</name>",
            "<SSIDConfig><SSID><name>{ssid}</name></SSID>{hidden}</SSIDConfig>",
            "<connectionType>ESS</connectionType>",
            "<connectionMode>auto</connectionMode>",
            "<MSM><security>",
            "<authEncryption>",
            "<authentication>{auth}</authentication>",
            "<encryption>{enc}</encryption>",
            "<useOneX>false</useOneX>",
            "</authEncryption>",
            "<sharedKey><keyType>passPhrase</keyType><protected>false</protected>{key}</sharedKey>",
            "</security></MSM>",
            "</WLANProfile>"
        ),
        ns = WLAN_PROFILE_NS,
        ssid = ssid,
        hidden = if credential.hidden {
            "<nonBroadcast>true</nonBroadcast>"
        } else {
            ""
        },
        auth = sec.authentication,
        enc = sec.encryption,
        key = key_material,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::collections::BTreeMap;

    /// Collect element text by local name; repeated names keep every value.
    fn element_text(xml: &str) -> BTreeMap<String, Vec<String>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut current: Option<String> = None;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    current = Some(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                }
                Ok(Event::Text(t)) => {
                    if let Some(name) = &current {
                        let text = t.unescape().expect("valid text").to_string();
                        out.entry(name.clone()).or_default().push(text);
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(e) => panic!("profile is not well-formed: {e}"),
                _ => {}
            }
        }
        out
    }

    fn credential(ssid: &str, password: &str, security: Security) -> WiFiCredential {
        WiFiCredential {
            ssid: ssid.into(),
            password: password.into(),
            security,
            hidden: false,
        }
    }

    #[test]
    fn security_mapping_table() {
        let cases = [
            (Security::Wpa3, ("WPA3PSK", "AES", true)),
            (Security::Wpa2, ("WPA2PSK", "AES", true)),
            (Security::Wpa, ("WPA2PSK", "AES", true)),
            (Security::Wep, ("open", "WEP", true)),
            (Security::NoPass, ("open", "none", false)),
            (Security::Other("SAE".into()), ("open", "none", false)),
        ];
        for (security, (auth, enc, key)) in cases {
            let sec = ProfileSecurity::for_security(&security);
            assert_eq!((sec.authentication, sec.encryption, sec.include_key), (auth, enc, key));
        }
    }

    #[test]
    fn profile_carries_required_fields() {
        let xml = render_profile(&credential("Home Net", "secret123", Security::Wpa2));
        let fields = element_text(&xml);
        assert_eq!(fields["name"], vec!["Home Net", "Home Net"]);
        assert_eq!(fields["connectionType"], vec!["ESS"]);
        assert_eq!(fields["connectionMode"], vec!["auto"]);
        assert_eq!(fields["authentication"], vec!["WPA2PSK"]);
        assert_eq!(fields["encryption"], vec!["AES"]);
        assert_eq!(fields["keyMaterial"], vec!["secret123"]);
    }

    #[test]
    fn open_network_has_no_key_material() {
        let xml = render_profile(&credential("Cafe", "", Security::NoPass));
        assert!(!xml.contains("keyMaterial"));
    }

    #[test]
    fn markup_in_ssid_and_key_is_escaped() {
        let xml = render_profile(&credential("A&B <lab>", "p<w>&\"'", Security::Wpa3));
        let fields = element_text(&xml);
        assert_eq!(fields["name"][0], "A&B <lab>");
        assert_eq!(fields["keyMaterial"], vec!["p<w>&\"'"]);
    }

    #[test]
    fn hidden_network_is_marked_non_broadcast() {
        let mut cred = credential("Stealth", "pw", Security::Wpa2);
        cred.hidden = true;
        let fields = element_text(&render_profile(&cred));
        assert_eq!(fields["nonBroadcast"], vec!["true"]);
    }
}
