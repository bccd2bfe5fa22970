//! qrscan - QR scanner and WiFi provisioning CLI.

fn main() -> anyhow::Result<()> {
    qr_wifi_scanner::cli::run()
}
