use clap::{Parser, Subcommand, ValueEnum};
use psx_pad_host::{icd::Settings, report, UsbClient};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "psx-pad", about = "PlayStation pad adapter console")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show hardware and firmware versions
    Info,
    /// Show transaction and sampling statistics
    Stats,
    /// Zero all statistics counters
    ResetStats,
    /// Show the acknowledge timing in use
    Ack,
    /// Read or change the persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print statistics and acknowledge timing periodically
    Watch {
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Get,
    Set {
        #[arg(long)]
        debug: Option<Switch>,
        #[arg(long)]
        latching: Option<Switch>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(value: Switch) -> Self {
        matches!(value, Switch::On)
    }
}

fn merge(
    current: Settings,
    debug: Option<Switch>,
    latching: Option<Switch>,
) -> Settings {
    Settings {
        debug: debug.map_or(current.debug, bool::from),
        latching: latching.map_or(current.latching, bool::from),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let args = Args::parse();

    tracing::info!("Connecting to psx-pad via USB...");
    let client = UsbClient::try_new()?;
    tracing::info!("Connected.");

    match args.command {
        Command::Info => {
            print!("{}", report::device_info(&client.get_device_info().await?));
        }
        Command::Stats => {
            print!("{}", report::stats(&client.get_stats().await?));
        }
        Command::ResetStats => {
            client.reset_stats().await?;
            println!("Statistics reset.");
        }
        Command::Ack => {
            print!("{}", report::ack_status(&client.get_ack_status().await?));
        }
        Command::Settings { action: SettingsAction::Get } => {
            print!("{}", report::settings(&client.get_settings().await?));
        }
        Command::Settings { action: SettingsAction::Set { debug, latching } } => {
            let current = client.get_settings().await?;
            let updated = merge(current, debug, latching);
            if updated == current {
                tracing::info!("Settings unchanged, not writing");
            } else {
                client.set_settings(updated).await?;
            }
            print!("{}", report::settings(&updated));
        }
        Command::Watch { interval_ms } => {
            watch(&client, Duration::from_millis(interval_ms)).await?;
        }
    }

    Ok(())
}

async fn watch(
    client: &UsbClient,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut ticker = tokio::time::interval(period);
    let mut round: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = client.wait_closed() => {
                tracing::warn!("Device disconnected");
                return Ok(());
            }
        }
        round += 1;
        let stats = client.get_stats().await?;
        let ack = client.get_ack_status().await?;
        println!("\n=== Stats ({round}) ===");
        print!("{}", report::stats(&stats));
        print!("{}", report::ack_status(&ack));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_unspecified_fields() {
        let current = Settings { debug: false, latching: true };
        assert_eq!(merge(current, None, None), current);
        assert_eq!(
            merge(current, Some(Switch::On), None),
            Settings { debug: true, latching: true }
        );
        assert_eq!(
            merge(current, None, Some(Switch::Off)),
            Settings { debug: false, latching: false }
        );
    }

    #[test]
    fn cli_parses_settings_set() {
        let args = Args::try_parse_from([
            "psx-pad", "settings", "set", "--debug", "on", "--latching", "off",
        ])
        .unwrap();
        match args.command {
            Command::Settings {
                action: SettingsAction::Set { debug, latching },
            } => {
                assert!(matches!(debug, Some(Switch::On)));
                assert!(matches!(latching, Some(Switch::Off)));
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn watch_interval_defaults_to_two_seconds() {
        let args = Args::try_parse_from(["psx-pad", "watch"]).unwrap();
        assert!(matches!(args.command, Command::Watch { interval_ms: 2000 }));
    }
}
