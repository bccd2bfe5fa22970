//! qrscan - scan QR codes from a camera or still images, classify the
//! payload, and join WiFi networks from `WIFI:` codes.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::classify::{classify, WiFiCredential};
use crate::config::{Overrides, ScannerConfig};
use crate::decode::{Decoder, DecoderRegistry};
use crate::handlers::{ContentAction, HandlerRegistry};
use crate::ingest::{file::load_frame, open_source};
use crate::scan::signal::InFlightGuard;
use crate::scan::{ScanEvent, ScanLoop};
use crate::ui::Ui;
use crate::wifi::{Platform, WifiProvisioner};

#[derive(Parser, Debug)]
#[command(name = "qrscan", version, about = "Scan QR codes and act on their content")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Milliseconds between capture attempts (floor 100)
    #[arg(long, global = true, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Frame source: stub://name, /dev/videoN, or image paths
    #[arg(long, global = true, value_name = "URI")]
    source: Option<String>,

    /// Decoder backend name
    #[arg(long, global = true, value_name = "NAME")]
    decoder: Option<String>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, global = true, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the configured source until Ctrl-C
    Watch {
        /// Join WiFi networks from detected codes without asking
        #[arg(long)]
        connect: bool,
    },

    /// Decode still images
    File {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
        /// Join WiFi networks from decoded codes
        #[arg(long)]
        connect: bool,
    },

    /// Classify text and print the result as JSON
    Classify { text: String },

    /// Join the network described by a WIFI: payload
    Connect { payload: String },

    /// Print the detected platform
    Platform,

    /// List decoder backends
    Decoders,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_flag(&args.ui, std::io::stderr().is_terminal());

    let cfg = ScannerConfig::load_with(Overrides {
        source: args.source,
        decoder: args.decoder,
        interval: args.interval_ms.map(Duration::from_millis),
    })?;

    match args.command {
        Command::Watch { connect } => watch(&cfg, connect),
        Command::File { paths, connect } => decode_files(&cfg, &ui, &paths, connect),
        Command::Classify { text } => {
            let classification = classify(&text)?;
            println!("{}", serde_json::to_string_pretty(&classification)?);
            Ok(())
        }
        Command::Connect { payload } => {
            let credential = WiFiCredential::parse(&payload)
                .ok_or_else(|| anyhow!("not a valid WIFI payload (missing or empty S:)"))?;
            connect_now(&provisioner(&cfg), &ui, &credential)
        }
        Command::Platform => {
            let platform = Platform::current();
            println!(
                "{}{}",
                platform,
                if platform.is_supported() { "" } else { " - WiFi provisioning unavailable" }
            );
            Ok(())
        }
        Command::Decoders => {
            let registry = DecoderRegistry::with_builtin();
            for name in registry.list() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn provisioner(cfg: &ScannerConfig) -> WifiProvisioner {
    WifiProvisioner::for_host(cfg.provision_options(), cfg.wifi.command_timeout)
}

fn decoder_for(cfg: &ScannerConfig) -> Result<Arc<dyn Decoder>> {
    DecoderRegistry::with_builtin().require(&cfg.decoder)
}

fn connect_now(provisioner: &WifiProvisioner, ui: &Ui, credential: &WiFiCredential) -> Result<()> {
    let outcome = {
        let _stage = ui.stage(&format!("Connecting to '{}'", credential.ssid));
        provisioner.connect(credential)
    };
    println!("{}", outcome.message);
    if outcome.success {
        Ok(())
    } else {
        Err(anyhow!("provisioning failed"))
    }
}

fn watch(cfg: &ScannerConfig, connect: bool) -> Result<()> {
    let source = open_source(&cfg.source)?;
    let decoder = decoder_for(cfg)?;
    let handlers = HandlerRegistry::with_builtin();
    let provisioning = connect.then(|| Provisioning::new(provisioner(cfg)));
    let workers: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));

    let worker_list = workers.clone();
    let mut handle = ScanLoop::new(source, decoder).start(cfg.scan_config(), move |event| {
        if let Some(worker) = on_detection(&handlers, provisioning.as_ref(), event) {
            let mut list = worker_list.lock().unwrap_or_else(|p| p.into_inner());
            list.retain(|w| !w.is_finished());
            list.push(worker);
        }
    })?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!("qrscan watching {} (Ctrl-C to stop)", cfg.source);
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping scan loop...");
    handle.stop()?;

    let stats = handle.stats();
    log::info!(
        "scanned {} frames, {} decodes, {} detections",
        stats.frames,
        stats.decodes,
        stats.events
    );

    let pending: Vec<_> = workers
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .drain(..)
        .collect();
    if !pending.is_empty() {
        log::info!("waiting for {} provisioning task(s)", pending.len());
    }
    for worker in pending {
        let _ = worker.join();
    }
    Ok(())
}

/// Provisioner shared by `watch` detections. At most one join runs at a time.
struct Provisioning {
    provisioner: Arc<WifiProvisioner>,
    busy: Arc<AtomicBool>,
}

impl Provisioning {
    fn new(provisioner: WifiProvisioner) -> Self {
        Self {
            provisioner: Arc::new(provisioner),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Print the detection; WiFi joins run on their own thread so the scan loop
/// keeps going through multi-second provisioning waits. A WIFI detection
/// that arrives while a join is still running is skipped.
fn on_detection(
    handlers: &HandlerRegistry,
    provisioning: Option<&Provisioning>,
    event: ScanEvent,
) -> Option<JoinHandle<()>> {
    let classification = match classify(&event.text) {
        Ok(c) => c,
        Err(err) => {
            log::debug!("ignoring detection: {}", err);
            return None;
        }
    };
    let action = handlers.dispatch(&classification);
    log::info!("detected {} payload", action.kind());
    println!("[{}] {}", action.kind(), action.summary());

    let (ContentAction::ConnectWifi { credential }, Some(provisioning)) = (action, provisioning)
    else {
        return None;
    };
    let Some(slot) = InFlightGuard::try_acquire(&provisioning.busy) else {
        log::info!("still joining a network; skipping '{}'", credential.ssid);
        return None;
    };
    let provisioner = provisioning.provisioner.clone();
    std::thread::Builder::new()
        .name("qr-provision".into())
        .spawn(move || {
            let _slot = slot;
            let outcome = provisioner.connect(&credential);
            println!("[WIFI] {}", outcome.message);
        })
        .map_err(|e| log::error!("could not start provisioning: {}", e))
        .ok()
}

fn decode_files(cfg: &ScannerConfig, ui: &Ui, paths: &[PathBuf], connect: bool) -> Result<()> {
    let decoder = decoder_for(cfg)?;
    let handlers = HandlerRegistry::with_builtin();
    let provisioner = connect.then(|| provisioner(cfg));
    let mut progress = ui.batch(paths.len() as u64);
    let mut found = 0usize;
    let mut wifi = Vec::new();

    for path in paths {
        let label = path.display().to_string();
        let text = load_frame(path).and_then(|frame| decoder.decode(&frame));
        match text.map(|result| result.into_payload()) {
            Ok(Some(text)) => match classify(&text) {
                Ok(classification) => {
                    found += 1;
                    let action = handlers.dispatch(&classification);
                    progress.println(&format!("{}: [{}] {}", label, action.kind(), action.summary()));
                    if let ContentAction::ConnectWifi { credential } = action {
                        wifi.push(credential);
                    }
                }
                Err(err) => progress.println(&format!("{}: {}", label, err)),
            },
            Ok(None) => progress.println(&format!("{}: no code found", label)),
            Err(err) => progress.println(&format!("{}: {:#}", label, err)),
        }
        progress.advance(&label);
    }
    progress.finish();
    eprintln!("{} of {} file(s) contained a code", found, paths.len());

    if let Some(provisioner) = provisioner {
        for credential in &wifi {
            connect_now(&provisioner, ui, credential)?;
        }
    }
    Ok(())
}
