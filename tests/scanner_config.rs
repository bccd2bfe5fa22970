use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use qr_wifi_scanner::config::{Overrides, ScannerConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "QRSCAN_CONFIG",
        "QRSCAN_SOURCE",
        "QRSCAN_INTERVAL_MS",
        "QRSCAN_COOLDOWN_MS",
        "QRSCAN_DECODER",
        "QRSCAN_WIFI_INTERFACE",
        "QRSCAN_COMMAND_TIMEOUT_SECS",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    let cfg = ScannerConfig::load().expect("load defaults");
    assert_eq!(cfg.source, "stub://camera");
    assert_eq!(cfg.decoder, "stub");
    assert_eq!(cfg.scan.interval, Duration::from_millis(333));
    assert_eq!(cfg.scan.cooldown, Duration::from_millis(2000));
    assert_eq!(cfg.wifi.mac_interface, "en0");
    assert_eq!(cfg.wifi.command_timeout, Duration::from_secs(15));
    assert_eq!(cfg.wifi.settle, None);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    let file = write_config(
        r#"{
            "source": "/tmp/a.png,/tmp/b.png",
            "decoder": "stub",
            "scan": { "interval_ms": 250, "cooldown_ms": 1500 },
            "wifi": { "mac_interface": "en1", "command_timeout_secs": 20, "settle_ms": 10 }
        }"#,
    );
    std::env::set_var("QRSCAN_CONFIG", file.path());
    std::env::set_var("QRSCAN_SOURCE", "stub://desk?payload=hello");
    std::env::set_var("QRSCAN_COOLDOWN_MS", "3000");

    let cfg = ScannerConfig::load().expect("load config");

    assert_eq!(cfg.source, "stub://desk?payload=hello");
    assert_eq!(cfg.decoder, "stub");
    assert_eq!(cfg.scan.interval, Duration::from_millis(250));
    assert_eq!(cfg.scan.cooldown, Duration::from_millis(3000));
    assert_eq!(cfg.wifi.mac_interface, "en1");
    assert_eq!(cfg.wifi.command_timeout, Duration::from_secs(20));
    assert_eq!(cfg.wifi.settle, Some(Duration::from_millis(10)));

    let options = cfg.provision_options();
    assert_eq!(options.mac_interface, "en1");
    assert_eq!(options.settle_override, Some(Duration::from_millis(10)));

    clear_env();
}

#[test]
fn interval_below_floor_is_clamped() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();
    std::env::set_var("QRSCAN_INTERVAL_MS", "10");

    let cfg = ScannerConfig::load().expect("load config");
    assert_eq!(cfg.scan.interval, Duration::from_millis(100));
    assert_eq!(cfg.scan_config().interval, Duration::from_millis(100));

    clear_env();
}

#[test]
fn rejects_zero_cooldown_and_timeout() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    std::env::set_var("QRSCAN_COOLDOWN_MS", "0");
    assert!(ScannerConfig::load().is_err());
    clear_env();

    std::env::set_var("QRSCAN_COMMAND_TIMEOUT_SECS", "0");
    assert!(ScannerConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_malformed_values() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    std::env::set_var("QRSCAN_INTERVAL_MS", "fast");
    let err = ScannerConfig::load().expect_err("non-numeric interval");
    assert!(err.to_string().contains("QRSCAN_INTERVAL_MS"));
    clear_env();

    let file = write_config(r#"{ "scan": { "interval": 5 } }"#);
    std::env::set_var("QRSCAN_CONFIG", file.path());
    assert!(ScannerConfig::load().is_err());
    clear_env();
}

#[test]
fn decoder_follows_source_unless_named() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    let cfg = ScannerConfig::load_with(Overrides {
        source: Some("/dev/video0".into()),
        ..Overrides::default()
    })
    .expect("camera source");
    assert_eq!(cfg.decoder, "rqrr");

    std::env::set_var("QRSCAN_DECODER", "rqrr");
    let cfg = ScannerConfig::load().expect("explicit decoder");
    assert_eq!(cfg.source, "stub://camera");
    assert_eq!(cfg.decoder, "rqrr");

    clear_env();
}

#[test]
fn command_line_overrides_are_validated() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    let cfg = ScannerConfig::load_with(Overrides {
        interval: Some(Duration::from_millis(5)),
        decoder: Some("stub".into()),
        ..Overrides::default()
    })
    .expect("load with overrides");
    assert_eq!(cfg.scan.interval, Duration::from_millis(100));
    assert_eq!(cfg.decoder, "stub");

    let err = ScannerConfig::load_with(Overrides {
        interval: Some(Duration::from_millis(u64::MAX)),
        ..Overrides::default()
    })
    .expect_err("interval past the cap");
    assert!(err.to_string().contains("interval"));
}

#[test]
fn rejects_values_past_upper_bounds() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_env();

    std::env::set_var("QRSCAN_COOLDOWN_MS", u64::MAX.to_string());
    let err = ScannerConfig::load().expect_err("cooldown past the cap");
    assert!(err.to_string().contains("cooldown"));
    clear_env();

    std::env::set_var("QRSCAN_COMMAND_TIMEOUT_SECS", u64::MAX.to_string());
    assert!(ScannerConfig::load().is_err());
    clear_env();

    let file = write_config(r#"{ "wifi": { "settle_ms": 18446744073709551615 } }"#);
    std::env::set_var("QRSCAN_CONFIG", file.path());
    assert!(ScannerConfig::load().is_err());
    clear_env();
}
