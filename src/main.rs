use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, eyre};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wifiman::{
    config::{self, CoordinatorOptions},
    wifi::{
        ChannelListener, ConnectionCoordinator, ListenerEvent, NetworkCredential, NetworkIdentity,
        SecurityMode, SimulatedProvider, saved_network_id,
    },
};

/// Networks in range of the simulated radio: (SSID, capabilities, saved)
const DEMO_NETWORKS: &[(&str, &str, bool)] = &[
    ("HomeNet", "[WPA2-PSK-CCMP][ESS]", true),
    ("CoffeeShop", "[ESS]", false),
    ("Office", "[WPA-PSK-TKIP][WPA2-PSK-CCMP][ESS]", false),
    ("Legacy", "[WEP][ESS]", false),
];

/// Wi-Fi connection coordinator, driven against a simulated network provider
#[derive(Parser, Debug)]
#[command(
    name = "wifiman",
    about = "Scan, connect, forget and toggle Wi-Fi through the connection coordinator.\n\nRuns against an in-memory provider seeded with demo networks.",
    long_about = None,
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// Seconds to wait for an association before failing an attempt
    #[arg(long, default_value_t = config::CONNECTION_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Start already associated with this SSID
    #[arg(long)]
    associated: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List networks in range
    Scan,
    /// Connect to a network
    Connect {
        ssid: String,

        /// Password or pre-shared key
        #[arg(short, long)]
        password: Option<String>,

        /// Security mode; inferred from the scan when omitted
        #[arg(long, value_enum)]
        security: Option<SecurityArg>,
    },
    /// Delete a saved network
    Forget { ssid: String },
    /// Turn the radio on or off
    Radio {
        #[arg(value_enum)]
        state: RadioArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SecurityArg {
    Open,
    Wep,
    Wpa,
}

impl From<SecurityArg> for SecurityMode {
    fn from(arg: SecurityArg) -> Self {
        match arg {
            SecurityArg::Open => SecurityMode::Open,
            SecurityArg::Wep => SecurityMode::Wep,
            SecurityArg::Wpa => SecurityMode::Wpa,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RadioArg {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (listener_tx, mut listener_rx) = mpsc::unbounded_channel();

    let provider = DEMO_NETWORKS.iter().fold(
        SimulatedProvider::new().with_events(event_tx),
        |provider, (ssid, capabilities, _)| provider.with_network(ssid, capabilities),
    );
    for (ssid, _, saved) in DEMO_NETWORKS {
        if *saved {
            provider.save_profile(ssid);
        }
    }
    if let Some(ssid) = &args.associated {
        provider.associate(ssid);
    }

    let listener = Arc::new(ChannelListener::new(listener_tx));
    let options =
        CoordinatorOptions::default().with_connect_timeout(Duration::from_secs(args.timeout_secs));
    let coordinator = Arc::new(
        ConnectionCoordinator::new(provider)
            .with_connect_listener(listener.clone())
            .with_enabled_listener(listener)
            .with_options(options),
    );

    let runner = Arc::clone(&coordinator);
    let event_loop = tokio::spawn(async move { runner.run(event_rx).await });

    let result = match args.command {
        Command::Scan => {
            for network in coordinator.scan() {
                let id = coordinator.network_id_for(&network);
                let saved = if id.is_valid() {
                    format!("saved as {id}")
                } else {
                    "not saved".to_string()
                };
                println!(
                    "{:<12} {:<9} {}",
                    network.ssid,
                    coordinator.security_mode(&network).as_str(),
                    saved
                );
            }
            Ok(())
        }
        Command::Connect {
            ssid,
            password,
            security,
        } => {
            let scanned = coordinator
                .scan()
                .into_iter()
                .find(|network| network.ssid == ssid);
            let mode = security
                .map(SecurityMode::from)
                .or_else(|| scanned.map(|network| network.security_mode()))
                .unwrap_or(SecurityMode::Open);
            let identity = NetworkIdentity::new(ssid, mode);
            let credential = password.map(NetworkCredential::from);

            coordinator.request_connection(&identity, credential.as_ref());

            let mut connected = false;
            while let Some(event) = listener_rx.recv().await {
                match event {
                    ListenerEvent::Start(ssid) => println!("Connecting to {ssid}..."),
                    ListenerEvent::Success => connected = true,
                    ListenerEvent::Finish => break,
                    ListenerEvent::Failure | ListenerEvent::RadioEnabled(_) => {}
                }
            }

            if connected {
                println!("Connected to {}", identity.ssid());
                Ok(())
            } else {
                match coordinator.last_failure() {
                    Some(reason) => Err(eyre!("Failed to connect: {reason}")),
                    None => Err(eyre!("Failed to connect to {}", identity.ssid())),
                }
            }
        }
        Command::Forget { ssid } => match saved_network_id(coordinator.provider(), &ssid)? {
            Some(id) if coordinator.delete_configuration(id) => {
                println!("Forgot {ssid}");
                Ok(())
            }
            Some(_) => Err(eyre!("Failed to forget {ssid}")),
            None => Err(eyre!("{ssid} is not saved")),
        },
        Command::Radio { state } => {
            let changed = match state {
                RadioArg::On => coordinator.open_radio(),
                RadioArg::Off => coordinator.close_radio(),
            };
            if changed {
                let enabled =
                    tokio::time::timeout(Duration::from_secs(1), async {
                        while let Some(event) = listener_rx.recv().await {
                            if let ListenerEvent::RadioEnabled(enabled) = event {
                                return Some(enabled);
                            }
                        }
                        None
                    })
                    .await
                    .ok()
                    .flatten();
                match enabled {
                    Some(true) => println!("Wi-Fi enabled"),
                    Some(false) => println!("Wi-Fi disabled"),
                    None => println!("Radio change requested"),
                }
            } else {
                println!(
                    "Wi-Fi already {}",
                    if coordinator.is_radio_enabled() { "on" } else { "off" }
                );
            }
            Ok(())
        }
    };

    event_loop.abort();
    result
}
