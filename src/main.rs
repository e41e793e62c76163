//! BLE provisioning command-line tool

use std::time::Duration;

use ble_provisioning_client::{
    BluerTransport, ConnectionWait, HubConfigPayload, ProvisioningClient, WaitOptions, WifiStatus,
    find_provisionable_devices,
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ble_provisioning_client::config::{CliArgs, Command, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ble_provisioning_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from(CliArgs::parse());
    debug!(?settings, "starting");

    match settings.command.clone() {
        Command::Scan { duration } => run_scan(settings.json, duration).await,
        Command::Networks { device, pop } => run_networks(settings.json, &device, &pop).await,
        Command::Provision {
            device,
            pop,
            ssid,
            passphrase,
            mqtt_uri,
            hub_url,
            timeout_ms,
            interval_ms,
        } => {
            run_provision(
                settings.json,
                &device,
                &pop,
                &ssid,
                &passphrase,
                HubConfigPayload { mqtt_uri, hub_url },
                Duration::from_millis(timeout_ms),
                Duration::from_millis(interval_ms),
            )
            .await
        }
        Command::Status { device, pop } => run_status(settings.json, &device, &pop).await,
    }
}

async fn run_scan(json: bool, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    let transport = BluerTransport::new().await?;
    let devices =
        find_provisionable_devices(&transport, Duration::from_secs(duration)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if devices.is_empty() {
        println!("No devices found");
    } else {
        for device in devices {
            let name = device.name.as_deref().unwrap_or("(unnamed)");
            match device.rssi {
                Some(rssi) => println!("{}  {}  {} dBm", device.id, name, rssi),
                None => println!("{}  {}", device.id, name),
            }
        }
    }
    Ok(())
}

async fn run_networks(
    json: bool,
    device: &str,
    pop: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect_secured(device, pop).await?;
    let networks = client.scan_wifi_networks().await?;
    client.disconnect().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&networks)?);
    } else if networks.is_empty() {
        println!("No networks visible to the device");
    } else {
        for network in networks {
            println!(
                "{:32}  ch {:3}  {:4} dBm  auth {}",
                network.ssid, network.channel, network.rssi, network.auth
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_provision(
    json: bool,
    device: &str,
    pop: &str,
    ssid: &str,
    passphrase: &str,
    hub: HubConfigPayload,
    timeout: Duration,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect_secured(device, pop).await?;

    client.send_wifi_config(ssid, passphrase).await?;
    client.apply_wifi_config().await?;
    info!(ssid, "credentials applied, waiting for connection");

    let (tx, mut rx) = mpsc::unbounded_channel::<WifiStatus>();
    let progress = tokio::spawn(async move {
        while let Some(status) = rx.recv().await {
            debug!(state = ?status.sta_state, "device status");
        }
    });

    let wait = client
        .wait_for_wifi_connection(WaitOptions {
            timeout,
            interval,
            progress: Some(tx),
        })
        .await?;
    let _ = progress.await;

    if wait.connected {
        match client.send_hub_config(&hub).await? {
            Some(response) if !response.ok => {
                info!(status = %response.status, "hub configuration rejected");
            }
            Some(_) => info!("hub configuration accepted"),
            None => {}
        }
    }

    client.disconnect().await?;
    report_wait(json, &wait);

    if wait.connected {
        Ok(())
    } else {
        Err("device did not connect to the network".into())
    }
}

async fn run_status(
    json: bool,
    device: &str,
    pop: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect_secured(device, pop).await?;
    let status = client.fetch_wifi_status().await?;
    client.disconnect().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("state: {:?}", status.sta_state);
        if let Some(ip) = &status.ip4_addr {
            println!("ip: {ip}");
        }
        if let Some(reason) = status.fail_reason {
            println!("fail reason: {reason}");
        }
        if let Some(remaining) = status.attempts_remaining {
            println!("attempts remaining: {remaining}");
        }
    }
    Ok(())
}

async fn connect_secured(
    device: &str,
    pop: &str,
) -> Result<ProvisioningClient<BluerTransport>, Box<dyn std::error::Error>> {
    let transport = BluerTransport::new().await?;
    let mut client = ProvisioningClient::connect(transport, device).await?;

    let info = client.protocol_info().await?;
    info!(version = %info.version, capabilities = ?info.capabilities, "device protocol");

    client.establish_session(pop).await?;
    Ok(client)
}

fn report_wait(json: bool, wait: &ConnectionWait) {
    if json {
        let value = serde_json::json!({
            "connected": wait.connected,
            "status": wait.last_status,
        });
        println!("{value}");
    } else if wait.connected {
        let ip = wait
            .last_status
            .as_ref()
            .and_then(|status| status.ip4_addr.clone());
        match ip {
            Some(ip) => println!("Connected ({ip})"),
            None => println!("Connected"),
        }
    } else {
        println!("Not connected");
    }
}
