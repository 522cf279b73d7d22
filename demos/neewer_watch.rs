//! CLI for connecting to a Neewer light and watching or changing its state.
//!
//! Run with: cargo run --example neewer_watch -- --help

use clap::{Parser, Subcommand};
use futures::StreamExt;
use neewer_rs::{Config, Event, Neewer, StateKind, Temperature, event_channel};
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "neewer-watch")]
#[command(about = "Talk to a Neewer light over UDP", long_about = None)]
struct Cli {
    /// IP address of the light
    #[arg(short, long, required_unless_present = "config")]
    ip: Option<Ipv4Addr>,

    /// IP address of this machine, as seen by the light
    #[arg(short, long, required_unless_present = "config")]
    client_ip: Option<Ipv4Addr>,

    /// JSON config file, used instead of the addresses above
    #[arg(long, conflicts_with_all = ["ip", "client_ip"])]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every event until interrupted
    Watch,

    /// Turn the light on
    On,

    /// Turn the light off
    Off,

    /// Set brightness (0-100) and color temperature in Kelvin (2900-7000)
    Light {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        brightness: u8,
        #[arg(value_parser = clap::value_parser!(u16).range(2900..=7000))]
        kelvin: u16,
    },

    /// Print diagnostics after the light has had a moment to answer
    Diagnostics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match (&cli.config, cli.ip, cli.client_ip) {
        (Some(path), _, _) => Config::from_json(&std::fs::read_to_string(path)?)?,
        (None, Some(ip), Some(client_ip)) => Config::new(ip, client_ip),
        _ => return Err("--ip and --client-ip are required without --config".into()),
    };

    let (observer, mut events) = event_channel();
    let mut light = Neewer::connect(config, observer).await?;
    println!("Listening on {:?}", light.local_addr());

    // Commands only make sense once the light answers.
    let wait_alive = async {
        while let Some(event) = events.next().await {
            if event == Event::AliveChanged(true) {
                return true;
            }
        }
        false
    };
    if !matches!(tokio::time::timeout(Duration::from_secs(10), wait_alive).await, Ok(true)) {
        eprintln!("Light did not answer within 10s");
        light.close().await;
        return Ok(());
    }
    println!("Light is alive");

    match cli.command {
        Commands::Watch => {
            while let Some(event) = events.next().await {
                match event {
                    Event::StateChanged(state) => {
                        println!("{}", serde_json::to_string(&state)?)
                    }
                    other => println!("{other:?}"),
                }
            }
        }
        Commands::On => light.set_power(true).await?,
        Commands::Off => light.set_power(false).await?,
        Commands::Light { brightness, kelvin } => {
            let temperature = Temperature::from_kelvin(kelvin).ok_or("temperature out of range")?;
            light.set_light(brightness, temperature.value()).await?;
        }
        Commands::Diagnostics => {
            light.query(StateKind::Light).await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
            println!("{}", serde_json::to_string_pretty(&light.diagnostics().await)?);
        }
    }

    // Give the writer time to flush before tearing down.
    tokio::time::sleep(Duration::from_millis(500)).await;
    light.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_replaces_addresses() {
        assert!(Cli::try_parse_from(["neewer-watch", "--config", "light.json", "watch"]).is_ok());
        assert!(
            Cli::try_parse_from(["neewer-watch", "-i", "10.0.0.5", "-c", "10.0.0.2", "on"]).is_ok()
        );
        assert!(Cli::try_parse_from(["neewer-watch", "-i", "10.0.0.5", "watch"]).is_err());
        assert!(Cli::try_parse_from(["neewer-watch", "watch"]).is_err());
    }
}
